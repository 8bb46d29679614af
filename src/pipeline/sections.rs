use tracing::debug;

use super::breaks;

/// Heading that opens the generated reference appendix.
pub const SECTION_MARKER: &str = "## 참고 자료";

/// Body text divided at the section marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Split<'a> {
    /// Everything before the marker, trimmed of whitespace and break markers.
    pub main_body: &'a str,
    /// The marker and everything after it; empty when there is no marker.
    pub appendix: &'a str,
}

impl Split<'_> {
    pub fn has_appendix(&self) -> bool {
        !self.appendix.is_empty()
    }
}

/// Owns the active section marker. Every consumer that needs the main body
/// goes through here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Splitter {
    marker: String,
}

impl Default for Splitter {
    fn default() -> Self {
        Self::new(SECTION_MARKER)
    }
}

impl Splitter {
    pub fn new(marker: impl Into<String>) -> Self {
        Self {
            marker: marker.into(),
        }
    }

    pub fn marker(&self) -> &str {
        &self.marker
    }

    /// Split on the first occurrence of the marker. The marker itself holds
    /// no break syntax, so `\n` and `<br>` inputs split at the same place.
    pub fn split<'a>(&self, raw: &'a str) -> Split<'a> {
        let found = if self.marker.is_empty() {
            None
        } else {
            raw.find(&self.marker)
        };

        match found {
            Some(idx) => {
                debug!(offset = idx, "section marker found");
                Split {
                    main_body: breaks::trim_breaks(&raw[..idx]),
                    appendix: &raw[idx..],
                }
            }
            None => Split {
                main_body: breaks::trim_breaks(raw),
                appendix: "",
            },
        }
    }

    /// Text after the marker line, or the whole input when there is no
    /// marker (the caller already isolated the appendix).
    pub fn appendix_entries<'a>(&self, raw: &'a str) -> &'a str {
        let split = self.split(raw);
        if split.has_appendix() {
            &split.appendix[self.marker.len()..]
        } else {
            raw
        }
    }
}

/// Split with the default marker.
pub fn split(raw: &str) -> Split<'_> {
    Splitter::default().split(raw)
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_marker_is_whole_trimmed_text() {
        let s = split("  \nJust a body.\nSecond line.\n\n");
        assert_eq!(s.main_body, "Just a body.\nSecond line.");
        assert_eq!(s.appendix, "");
        assert!(!s.has_appendix());
    }

    #[test]
    fn splits_on_marker() {
        let s = split("Para one.\nPara two.\n## 참고 자료\n- [Site](http://x.test)");
        assert_eq!(s.main_body, "Para one.\nPara two.");
        assert!(s.appendix.starts_with(SECTION_MARKER));
        assert!(s.appendix.ends_with("- [Site](http://x.test)"));
    }

    #[test]
    fn first_marker_wins() {
        let raw = format!("intro \n{SECTION_MARKER}\nfirst\n{SECTION_MARKER}\nsecond");
        let s = split(&raw);
        assert_eq!(s.main_body, "intro");
        assert_eq!(s.appendix.matches(SECTION_MARKER).count(), 2);
    }

    #[test]
    fn break_convention_agnostic() {
        let newline = split("Para one.\nPara two.\n## 참고 자료\n- a");
        let html = split("Para one.<br>Para two.<br/>## 참고 자료<br>- a");
        assert_eq!(newline.main_body, "Para one.\nPara two.");
        assert_eq!(html.main_body, "Para one.<br>Para two.");
        assert_eq!(
            breaks::to_newlines(html.main_body),
            newline.main_body,
        );
        assert_eq!(breaks::to_newlines(html.appendix), newline.appendix);
    }

    #[test]
    fn marker_at_start_leaves_empty_body() {
        let s = split("## 참고 자료\n- x");
        assert_eq!(s.main_body, "");
        assert_eq!(s.appendix, "## 참고 자료\n- x");
    }

    #[test]
    fn custom_marker() {
        let splitter = Splitter::new("## Sources");
        let s = splitter.split("body\n## Sources\n- a");
        assert_eq!(s.main_body, "body");
        assert_eq!(splitter.appendix_entries("body\n## Sources\n- a"), "\n- a");
    }

    #[test]
    fn empty_marker_never_splits() {
        let s = Splitter::new("").split(" body ");
        assert_eq!(s.main_body, "body");
        assert!(!s.has_appendix());
    }

    #[test]
    fn appendix_entries_without_marker_is_input() {
        let splitter = Splitter::default();
        assert_eq!(splitter.appendix_entries("- [a](http://a.test)"), "- [a](http://a.test)");
    }

    #[test]
    fn fixture_post() {
        let md = std::fs::read_to_string("tests/fixtures/post_with_refs.md").unwrap();
        let s = split(&md);
        assert!(s.has_appendix());
        assert!(!s.main_body.contains(SECTION_MARKER));
        assert!(!s.main_body.contains("https://"));
        assert!(s.main_body.ends_with("감사합니다."));
    }
}
