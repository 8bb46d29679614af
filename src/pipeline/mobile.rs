use std::borrow::Cow;
use std::sync::LazyLock;

use regex::{Captures, Regex};
use serde::Deserialize;
use tracing::debug;
use unicode_width::UnicodeWidthStr;

use super::breaks::{self, BR};

static TAG_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"</?[A-Za-z!][^>]*>").unwrap());
static TAG_NAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^<(/?)\s*([A-Za-z][A-Za-z0-9]*)").unwrap());
static MD_HEADING_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^(#{1,6})\s+(.+)$").unwrap());
static HTML_HEADING_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)<(/?)h([1-6])(\s[^>]*)?>").unwrap());
static ENTITY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"&(?:#[0-9]+|#[xX][0-9a-fA-F]+|[A-Za-z][A-Za-z0-9]*);").unwrap());

/// Tags that start a new visual line. Anything else is inline markup and is
/// carried through untouched with zero width.
const BLOCK_TAGS: &[&str] = &[
    "address", "article", "aside", "blockquote", "dd", "div", "dl", "dt", "figcaption", "figure",
    "footer", "h1", "h2", "h3", "h4", "h5", "h6", "header", "hr", "img", "li", "ol", "p", "pre",
    "section", "table", "tbody", "td", "tfoot", "th", "thead", "tr", "ul",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct MobileOptions {
    /// Display columns per visual line. Wide (CJK) characters count as two.
    /// The budget is at least one column: the formatter reads 0 as 1 and
    /// `Settings` rejects 0 outright.
    pub max_line_width: usize,
    /// Shallowest heading level kept; `h1`/`h2` are demoted to `h3` by default.
    pub heading_floor: u8,
    /// Empty lines allowed in a row.
    pub max_blank_lines: usize,
}

impl Default for MobileOptions {
    fn default() -> Self {
        Self {
            max_line_width: 40,
            heading_floor: 3,
            max_blank_lines: 1,
        }
    }
}

pub fn format_for_mobile(html: &str) -> String {
    format_with(html, &MobileOptions::default())
}

/// Rewrite HTML for a narrow viewport. Applying it twice changes nothing.
pub fn format_with(html: &str, opts: &MobileOptions) -> String {
    let floor = opts.heading_floor.clamp(1, 6);
    let width = opts.max_line_width.max(1);
    let normalized = breaks::to_html_breaks(html);
    let releveled = relevel_headings(&normalized, floor);

    let mut lines: Vec<String> = Vec::new();
    let mut blank_run = 0usize;

    for line in releveled.split(BR) {
        // Words split on ASCII whitespace only, so trim the same set
        let line = line.trim_matches(|c: char| c.is_ascii_whitespace());
        if line.is_empty() {
            blank_run += 1;
            continue;
        }
        if !lines.is_empty() {
            let blanks = blank_run.min(opts.max_blank_lines);
            lines.resize(lines.len() + blanks, String::new());
        }
        blank_run = 0;

        let line = markdown_heading(line, floor);
        lines.push(wrap_line(&line, width));
    }

    debug!(lines = lines.len(), width, "mobile formatting done");
    lines.join(BR)
}

fn relevel_headings(html: &str, floor: u8) -> Cow<'_, str> {
    HTML_HEADING_RE.replace_all(html, |caps: &Captures<'_>| {
        let level = (caps[2].as_bytes()[0] - b'0').max(floor);
        let attrs = caps.get(3).map_or("", |m| m.as_str());
        format!("<{}h{}{}>", &caps[1], level, attrs)
    })
}

fn markdown_heading(line: &str, floor: u8) -> Cow<'_, str> {
    match MD_HEADING_RE.captures(line) {
        Some(caps) => {
            let level = u8::try_from(caps[1].len()).unwrap_or(6).max(floor);
            Cow::Owned(format!("<h{level}>{}</h{level}>", caps[2].trim()))
        }
        None => Cow::Borrowed(line),
    }
}

fn wrap_line(line: &str, max_width: usize) -> String {
    let mut wrapper = LineWrapper::new(max_width);
    let mut last = 0;
    for m in TAG_RE.find_iter(line) {
        wrapper.push_text(&line[last..m.start()]);
        wrapper.push_tag(m.as_str());
        last = m.end();
    }
    wrapper.push_text(&line[last..]);
    wrapper.finish()
}

#[derive(Debug, PartialEq, Eq)]
enum TagKind {
    Block,
    InlineOpen,
    InlineClose,
}

fn tag_kind(tag: &str) -> TagKind {
    let Some(caps) = TAG_NAME_RE.captures(tag) else {
        return TagKind::InlineOpen; // comments, doctype
    };
    let name = caps[2].to_ascii_lowercase();
    if BLOCK_TAGS.contains(&name.as_str()) {
        TagKind::Block
    } else if &caps[1] == "/" {
        TagKind::InlineClose
    } else {
        TagKind::InlineOpen
    }
}

/// Visible width: tags are excluded by the caller, entities count as one.
fn display_width(word: &str) -> usize {
    ENTITY_RE.replace_all(word, "x").width()
}

/// Greedy word wrap over a tokenized line. Opening inline tags are held back
/// until the next word so a break never lands between a tag and its text.
struct LineWrapper {
    out: String,
    max_width: usize,
    width: usize,
    has_content: bool,
    pending_space: bool,
    pending_tags: String,
}

impl LineWrapper {
    fn new(max_width: usize) -> Self {
        Self {
            out: String::new(),
            max_width,
            width: 0,
            has_content: false,
            pending_space: false,
            pending_tags: String::new(),
        }
    }

    fn push_text(&mut self, text: &str) {
        if text.starts_with(|c: char| c.is_ascii_whitespace()) {
            self.pending_space = true;
        }
        let mut words = text
            .split(|c: char| c.is_ascii_whitespace())
            .filter(|w| !w.is_empty())
            .peekable();
        while let Some(word) = words.next() {
            self.push_word(word);
            if words.peek().is_some() {
                self.pending_space = true;
            }
        }
        if text.ends_with(|c: char| c.is_ascii_whitespace()) {
            self.pending_space = true;
        }
    }

    fn push_word(&mut self, word: &str) {
        let w = display_width(word);
        let mut broke = false;
        if self.has_content && self.pending_space {
            if self.width + 1 + w > self.max_width {
                self.out.push_str(BR);
                self.width = 0;
                broke = true;
            } else {
                self.out.push(' ');
                self.width += 1;
            }
        }
        self.pending_space = false;
        self.flush_tags();
        // A wrapped line must not read as a markdown heading on the next pass
        match word.strip_prefix('#') {
            Some(rest) if broke => {
                self.out.push_str("&#35;");
                self.out.push_str(rest);
            }
            _ => self.out.push_str(word),
        }
        self.width += w;
        self.has_content = true;
    }

    fn push_tag(&mut self, tag: &str) {
        match tag_kind(tag) {
            TagKind::Block => {
                self.flush_tags();
                self.out.push_str(tag);
                self.width = 0;
                self.has_content = false;
                self.pending_space = false;
            }
            TagKind::InlineClose if self.pending_tags.is_empty() => self.out.push_str(tag),
            _ => self.pending_tags.push_str(tag),
        }
    }

    fn flush_tags(&mut self) {
        self.out.push_str(&self.pending_tags);
        self.pending_tags.clear();
    }

    fn finish(mut self) -> String {
        self.flush_tags();
        self.out
    }
}

// ── Tests ──
