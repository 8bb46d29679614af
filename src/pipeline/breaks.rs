use std::sync::LazyLock;

use regex::Regex;

static BR_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)<br\s*/?>").unwrap());
static LEADING_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\A(?:\s|<br\s*/?>)+").unwrap());
static TRAILING_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(?:\s|<br\s*/?>)+\z").unwrap());

/// The single break marker emitted by every HTML-producing step.
pub const BR: &str = "<br>";

/// `<br>` variants and `\r\n` become plain `\n`.
pub fn to_newlines(text: &str) -> String {
    BR_RE.replace_all(&text.replace("\r\n", "\n"), "\n").into_owned()
}

/// Native newlines and every `<br>` spelling become the canonical `<br>`.
pub fn to_html_breaks(text: &str) -> String {
    let unified = BR_RE.replace_all(text, BR);
    unified.replace("\r\n", "\n").replace('\n', BR)
}

/// Split on any break convention. Lines are returned untrimmed.
pub fn lines(text: &str) -> Vec<&str> {
    BR_RE
        .split(text)
        .flat_map(|chunk| chunk.split('\n'))
        .map(|line| line.strip_suffix('\r').unwrap_or(line))
        .collect()
}

/// Trim whitespace and break markers from both ends.
pub fn trim_breaks(text: &str) -> &str {
    let start = LEADING_RE.find(text).map_or(0, |m| m.end());
    let rest = &text[start..];
    let end = TRAILING_RE.find(rest).map_or(rest.len(), |m| m.start());
    &rest[..end]
}
