use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::content::{Content, Reference};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ViewMode {
    #[default]
    Original,
    Mobile,
    Split,
}

impl fmt::Display for ViewMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ViewMode::Original => "original",
            ViewMode::Mobile => "mobile",
            ViewMode::Split => "split",
        })
    }
}

/// Current view selection. Starts at `Original`; any mode can follow any
/// other.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ViewState {
    mode: ViewMode,
}

impl ViewState {
    pub fn mode(&self) -> ViewMode {
        self.mode
    }

    pub fn select(&mut self, mode: ViewMode) {
        self.mode = mode;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ReferenceOrigin {
    Supplied,
    Extracted,
}

/// What a view mode puts on screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rendered<'a> {
    Original(&'a str),
    Mobile(&'a str),
    Split { original: &'a str, mobile: &'a str },
}

/// Every display output for one content, precomputed by the pipeline.
#[derive(Debug, Clone)]
pub struct ContentView {
    id: String,
    title: String,
    keyword: Option<String>,
    created_at: Option<DateTime<Utc>>,
    word_count: u64,
    morpheme_count: u64,
    raw_body: String,
    original_html: String,
    mobile_html: String,
    copy_text: String,
    references: Vec<Reference>,
    reference_origin: ReferenceOrigin,
}

impl ContentView {
    pub(crate) fn new(
        content: &Content,
        original_html: String,
        mobile_html: String,
        copy_text: String,
        references: Vec<Reference>,
        reference_origin: ReferenceOrigin,
    ) -> Self {
        Self {
            id: content.id.clone(),
            title: content.title.clone(),
            keyword: content.keyword.clone(),
            created_at: content.created_at,
            word_count: content.word_count.unwrap_or(0),
            morpheme_count: content.morpheme_count.unwrap_or(0),
            raw_body: content.body.clone(),
            original_html,
            mobile_html,
            copy_text,
            references,
            reference_origin,
        }
    }

    pub fn render(&self, mode: ViewMode) -> Rendered<'_> {
        match mode {
            ViewMode::Original => Rendered::Original(&self.original_html),
            ViewMode::Mobile => Rendered::Mobile(&self.mobile_html),
            ViewMode::Split => Rendered::Split {
                original: &self.original_html,
                mobile: &self.mobile_html,
            },
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    /// Main body as HTML with `<br>` breaks.
    pub fn original_html(&self) -> &str {
        &self.original_html
    }

    pub fn mobile_html(&self) -> &str {
        &self.mobile_html
    }

    pub fn copy_text(&self) -> &str {
        &self.copy_text
    }

    pub fn references(&self) -> &[Reference] {
        &self.references
    }

    pub fn reference_origin(&self) -> ReferenceOrigin {
        self.reference_origin
    }

    pub fn references_html(&self) -> String {
        references_html(&self.references)
    }

    /// Untransformed body for the image and shorts-script generators.
    pub fn generator_input(&self) -> &str {
        &self.raw_body
    }

    pub fn meta_line(&self) -> String {
        let keyword = self.keyword.as_deref().unwrap_or("n/a");
        let date = self
            .created_at
            .map(|d| d.format("%Y-%m-%d").to_string())
            .unwrap_or_else(|| "-".into());
        format!(
            "keyword: {keyword} | created: {date} | words: {} | morphemes: {}",
            self.word_count, self.morpheme_count
        )
    }
}

/// `<ul>` of outbound links; empty when there is nothing to list.
pub fn references_html(refs: &[Reference]) -> String {
    if refs.is_empty() {
        return String::new();
    }
    let items: String = refs
        .iter()
        .map(|r| {
            format!(
                r#"<li><a href="{}" target="_blank" rel="noopener noreferrer">{}</a></li>"#,
                escape_html(&r.url),
                escape_html(r.display_title())
            )
        })
        .collect();
    format!("<ul>{items}</ul>")
}

pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::Pipeline;

    fn sample() -> ContentView {
        let json = std::fs::read_to_string("tests/fixtures/content_42.json").unwrap();
        let content: Content = serde_json::from_str(&json).unwrap();
        Pipeline::default().process(&content)
    }

    #[test]
    fn view_state_transitions() {
        let mut state = ViewState::default();
        assert_eq!(state.mode(), ViewMode::Original);
        state.select(ViewMode::Split);
        assert_eq!(state.mode(), ViewMode::Split);
        state.select(ViewMode::Mobile);
        state.select(ViewMode::Original);
        assert_eq!(state.mode(), ViewMode::Original);
    }

    #[test]
    fn render_selects_precomputed_outputs() {
        let view = sample();
        assert_eq!(view.render(ViewMode::Original), Rendered::Original(view.original_html()));
        assert_eq!(view.render(ViewMode::Mobile), Rendered::Mobile(view.mobile_html()));
        assert_eq!(
            view.render(ViewMode::Split),
            Rendered::Split {
                original: view.original_html(),
                mobile: view.mobile_html(),
            }
        );
        assert_ne!(view.original_html(), view.mobile_html());
    }

    #[test]
    fn meta_line_from_fixture() {
        let view = sample();
        assert_eq!(
            view.meta_line(),
            "keyword: 치과 임플란트 | created: 2025-03-14 | words: 1520 | morphemes: 0"
        );
        assert_eq!(view.title(), "임플란트 비용 총정리");
    }

    #[test]
    fn references_rendered_escaped() {
        let refs = vec![
            Reference {
                title: "A & <B>".into(),
                url: "https://a.test/?q=1&r=\"2\"".into(),
            },
            Reference {
                title: String::new(),
                url: "https://b.test".into(),
            },
        ];
        assert_eq!(
            references_html(&refs),
            "<ul><li><a href=\"https://a.test/?q=1&amp;r=&quot;2&quot;\" target=\"_blank\" rel=\"noopener noreferrer\">A &amp; &lt;B&gt;</a></li>\
             <li><a href=\"https://b.test\" target=\"_blank\" rel=\"noopener noreferrer\">https://b.test</a></li></ul>"
        );
        assert_eq!(references_html(&[]), "");
    }

    #[test]
    fn view_mode_display_and_serde() {
        assert_eq!(ViewMode::Split.to_string(), "split");
        assert_eq!(serde_json::to_string(&ViewMode::Mobile).unwrap(), "\"mobile\"");
    }
}
