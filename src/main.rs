use std::path::PathBuf;
use std::time::Instant;

use anyhow::Context;
use clap::{Parser, Subcommand};

use blog_view::batch;
use blog_view::content::Content;
use blog_view::pipeline::copy::{self, Clipboard, CopyEvent};
use blog_view::settings::Settings;
use blog_view::source::{
    ContentLoader, ContentSource, FetchError, FetchState, FileContentSource, HttpContentSource,
};
use blog_view::view::{Rendered, ViewMode};

#[derive(Parser)]
#[command(name = "blog_view", about = "View, reformat and copy generated blog posts")]
struct Cli {
    /// Config file (default: ./blog_view.toml if present)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print a content in the chosen view mode, with its references
    Show {
        id: String,
        #[arg(short, long, value_enum, default_value_t = ViewMode::Original)]
        mode: ViewMode,
        /// Read `<dir>/<id>.json` instead of calling the content service
        #[arg(short, long)]
        dir: Option<PathBuf>,
    },
    /// Print the references of a content as JSON
    Refs {
        id: String,
        #[arg(short, long)]
        dir: Option<PathBuf>,
    },
    /// Copy the main body (without references) to the clipboard
    Copy {
        id: String,
        #[arg(short, long)]
        dir: Option<PathBuf>,
        /// Print the text instead of touching the clipboard
        #[arg(long)]
        stdout: bool,
    },
    /// Render every content export in a directory
    Batch { input: PathBuf, output: PathBuf },
}

enum Source {
    Http(HttpContentSource),
    File(FileContentSource),
}

impl ContentSource for Source {
    async fn get_content(&self, id: &str) -> Result<Content, FetchError> {
        match self {
            Source::Http(s) => s.get_content(id).await,
            Source::File(s) => s.get_content(id).await,
        }
    }
}

struct SystemClipboard(arboard::Clipboard);

impl Clipboard for SystemClipboard {
    fn write_text(&mut self, text: &str) -> anyhow::Result<()> {
        self.0.set_text(text.to_owned())?;
        Ok(())
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let t0 = Instant::now();
    let cli = Cli::parse();
    let settings = match &cli.config {
        Some(path) => Settings::from_file(path),
        None => Settings::load(),
    }
    .context("failed to load settings")?;
    let pipeline = settings.pipeline();

    match cli.command {
        Commands::Show { id, mode, dir } => {
            let content = fetch(&settings, dir, &id).await?;
            let view = pipeline.process(&content);

            println!("{}", view.title());
            println!("{}\n", view.meta_line());
            match view.render(mode) {
                Rendered::Original(html) | Rendered::Mobile(html) => println!("{html}"),
                Rendered::Split { original, mobile } => {
                    println!("--- original ---\n{original}\n");
                    println!("--- mobile ---\n{mobile}");
                }
            }

            if !view.references().is_empty() {
                println!("\n--- references ({:?}) ---", view.reference_origin());
                for r in view.references() {
                    println!("  {} <{}>", r.display_title(), r.url);
                }
            }
        }
        Commands::Refs { id, dir } => {
            let content = fetch(&settings, dir, &id).await?;
            let view = pipeline.process(&content);
            println!("{}", serde_json::to_string_pretty(view.references())?);
        }
        Commands::Copy { id, dir, stdout } => {
            let content = fetch(&settings, dir, &id).await?;
            let view = pipeline.process(&content);
            if stdout {
                println!("{}", view.copy_text());
                return Ok(());
            }
            let mut clipboard = SystemClipboard(
                arboard::Clipboard::new().context("failed to open system clipboard")?,
            );
            match copy::copy_text(view.copy_text(), &mut clipboard) {
                CopyEvent::Copied { chars } => println!("Copied main body ({chars} chars)."),
                CopyEvent::Nothing => println!("Nothing to copy: main body is empty."),
                CopyEvent::Failed { reason } => anyhow::bail!("copy failed: {reason}"),
            }
        }
        Commands::Batch { input, output } => {
            let counts = batch::render_dir(&pipeline, &input, &output)?;
            counts.print();
        }
    }

    let elapsed = t0.elapsed();
    if elapsed.as_secs() >= 1 {
        eprintln!("\nDone in {:.1}s", elapsed.as_secs_f64());
    }
    Ok(())
}

async fn fetch(settings: &Settings, dir: Option<PathBuf>, id: &str) -> anyhow::Result<Content> {
    let source = match dir {
        Some(dir) => Source::File(FileContentSource::new(dir)),
        None => Source::Http(HttpContentSource::new(
            &settings.api_base_url,
            settings.request_timeout(),
        )?),
    };
    let loader = ContentLoader::new(source);

    match loader.load(id).await {
        FetchState::Loaded(content) => Ok(content),
        FetchState::Failed(e) => {
            eprintln!("{} [{}]", e.user_message(), e.recovery().label());
            Err(e).with_context(|| format!("failed to load content {id:?}"))
        }
        FetchState::Pending => anyhow::bail!("content {id:?} is still loading"),
    }
}
