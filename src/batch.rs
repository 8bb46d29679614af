use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use rayon::prelude::*;
use tracing::warn;

use crate::pipeline::Pipeline;
use crate::source::read_content_file;
use crate::view::ContentView;

const CHUNK: usize = 200;

pub struct BatchCounts {
    pub rendered: usize,
    pub skipped: usize,
    pub references: usize,
}

impl BatchCounts {
    pub fn print(&self) {
        println!(
            "Rendered {} contents ({} skipped), {} references.",
            self.rendered, self.skipped, self.references,
        );
    }
}

/// Render every `*.json` content export in `in_dir` into `out_dir`.
pub fn render_dir(pipeline: &Pipeline, in_dir: &Path, out_dir: &Path) -> Result<BatchCounts> {
    let files = list_json(in_dir)?;
    fs::create_dir_all(out_dir)
        .with_context(|| format!("failed to create output directory: {}", out_dir.display()))?;

    let pb = ProgressBar::new(files.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({per_sec})")?
            .progress_chars("#>-"),
    );

    let mut counts = BatchCounts {
        rendered: 0,
        skipped: 0,
        references: 0,
    };

    for chunk in files.chunks(CHUNK) {
        let results: Vec<_> = chunk
            .par_iter()
            .map(|path| (path, read_content_file(path).map(|c| pipeline.process(&c))))
            .collect();

        for (path, result) in results {
            match result {
                Ok(view) => {
                    write_outputs(out_dir, &file_stem(path), &view)?;
                    counts.rendered += 1;
                    counts.references += view.references().len();
                }
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "skipping content file");
                    counts.skipped += 1;
                }
            }
        }
        pb.inc(chunk.len() as u64);
    }

    pb.finish_and_clear();
    Ok(counts)
}

fn list_json(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files: Vec<PathBuf> = fs::read_dir(dir)
        .with_context(|| format!("failed to read input directory: {}", dir.display()))?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| p.is_file() && p.extension().is_some_and(|ext| ext == "json"))
        .collect();
    files.sort();
    Ok(files)
}

fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn write_outputs(out_dir: &Path, stem: &str, view: &ContentView) -> Result<()> {
    let write = |suffix: &str, data: &str| -> Result<()> {
        let path = out_dir.join(format!("{stem}.{suffix}"));
        fs::write(&path, data).with_context(|| format!("failed to write {}", path.display()))
    };
    write("original.html", view.original_html())?;
    write("mobile.html", view.mobile_html())?;
    write("copy.txt", view.copy_text())?;
    write("refs.json", &serde_json::to_string_pretty(view.references())?)?;
    Ok(())
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::Reference;

    #[test]
    fn renders_directory() {
        let input = tempfile::tempdir().unwrap();
        let output = tempfile::tempdir().unwrap();
        fs::copy("tests/fixtures/content_42.json", input.path().join("42.json")).unwrap();
        fs::write(
            input.path().join("7.json"),
            r#"{"id": 7, "title": "t", "content": "본문\n## 참고 자료\n- [A](https://a.test)"}"#,
        )
        .unwrap();
        fs::write(input.path().join("broken.json"), "{not json").unwrap();
        fs::write(input.path().join("notes.txt"), "ignored").unwrap();

        let counts = render_dir(&Pipeline::default(), input.path(), output.path()).unwrap();
        assert_eq!(counts.rendered, 2);
        assert_eq!(counts.skipped, 1);
        assert_eq!(counts.references, 5);

        let copy = fs::read_to_string(output.path().join("7.copy.txt")).unwrap();
        assert_eq!(copy, "본문");
        let refs: Vec<Reference> =
            serde_json::from_str(&fs::read_to_string(output.path().join("7.refs.json")).unwrap()).unwrap();
        assert_eq!(refs[0].url, "https://a.test");
        assert!(output.path().join("42.mobile.html").exists());
        assert!(!output.path().join("broken.original.html").exists());
    }

    #[test]
    fn missing_input_dir_is_an_error() {
        let output = tempfile::tempdir().unwrap();
        assert!(render_dir(&Pipeline::default(), Path::new("does/not/exist"), output.path()).is_err());
    }
}
