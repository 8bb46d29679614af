use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

use super::breaks;
use super::sections::Splitter;
use crate::content::Reference;

/// `[title](url)` with one level of balanced parens in the url and an
/// optional quoted link title.
static MD_LINK_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"\[([^\]]*)\]\(\s*<?((?:[^()\s<>]|\([^()\s<>]*\))*)>?(?:\s+(?:"[^"]*"|'[^']*'))?\s*\)"#,
    )
    .unwrap()
});
static ANCHOR_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?is)<a\s[^>]*?href\s*=\s*["']([^"']*)["'][^>]*>(.*?)</a\s*>"#).unwrap()
});
static BARE_URL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?i)\b(?:https?://|www\.)[^\s<>"']+"#).unwrap());
static BULLET_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?:[-*+•·]|\d{1,3}[.)])\s+").unwrap());
static TAG_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]*>").unwrap());

/// Pull `(title, url)` pairs out of the reference appendix using the
/// default marker.
pub fn extract_references(text: &str) -> Vec<Reference> {
    extract_with(&Splitter::default(), text)
}

/// Best-effort extraction: entries in source order, duplicates kept, entries
/// without a usable URL dropped.
pub fn extract_with(splitter: &Splitter, text: &str) -> Vec<Reference> {
    let entries = splitter.appendix_entries(text);
    let mut refs = Vec::new();

    for line in breaks::lines(entries) {
        let line = strip_bullet(line.trim());
        if line.is_empty() {
            continue;
        }
        parse_line(line, &mut refs);
    }

    debug!(count = refs.len(), "references extracted");
    refs
}

fn parse_line(line: &str, refs: &mut Vec<Reference>) {
    let mut structured = false;

    for caps in MD_LINK_RE.captures_iter(line) {
        structured = true;
        if let Some(url) = resolve_url(&caps[2]) {
            refs.push(reference(&caps[1], url));
        }
    }

    for caps in ANCHOR_RE.captures_iter(line) {
        structured = true;
        if let Some(url) = resolve_url(&caps[1]) {
            refs.push(reference(&caps[2], url));
        }
    }

    if structured {
        return;
    }

    // Plain `Label: https://…` lines, possibly several URLs per line
    let mut label_start = 0;
    for m in BARE_URL_RE.find_iter(line) {
        let label = clean_label(&line[label_start..m.start()]);
        label_start = m.end();
        if let Some(url) = resolve_url(m.as_str()) {
            refs.push(reference(label, url));
        }
    }
}

fn reference(title: &str, url: String) -> Reference {
    let title = TAG_RE.replace_all(title, "");
    let title = title.trim();
    Reference {
        title: if title.is_empty() {
            url.clone()
        } else {
            title.to_string()
        },
        url,
    }
}

/// Only absolute http(s) targets count; `www.` gets an https scheme.
fn resolve_url(raw: &str) -> Option<String> {
    let url = trim_trailing_punctuation(raw.trim());
    let lower = url.to_ascii_lowercase();

    let resolved = if lower.starts_with("http://") || lower.starts_with("https://") {
        url.to_string()
    } else if lower.starts_with("www.") {
        format!("https://{url}")
    } else {
        return None;
    };

    let host = resolved.split("//").nth(1).unwrap_or_default();
    if host.is_empty() || host.starts_with('/') {
        None
    } else {
        Some(resolved)
    }
}

/// Sentence punctuation after a url is not part of it. A closing bracket is
/// kept while it balances an opening one inside the url.
fn trim_trailing_punctuation(url: &str) -> &str {
    let mut url = url;
    loop {
        let Some(last) = url.chars().last() else {
            return url;
        };
        let strip = match last {
            '.' | ',' | ';' | ':' | '!' | '?' => true,
            ')' => url.matches('(').count() < url.matches(')').count(),
            ']' => url.matches('[').count() < url.matches(']').count(),
            _ => false,
        };
        if !strip {
            return url;
        }
        url = &url[..url.len() - last.len_utf8()];
    }
}

fn strip_bullet(line: &str) -> &str {
    let line = line
        .strip_prefix("<li>")
        .or_else(|| line.strip_prefix("<LI>"))
        .unwrap_or(line)
        .trim_start();
    let line = line
        .strip_suffix("</li>")
        .or_else(|| line.strip_suffix("</LI>"))
        .unwrap_or(line)
        .trim_end();
    BULLET_RE
        .find(line)
        .map_or(line, |m| &line[m.end()..])
}

fn clean_label(raw: &str) -> &str {
    raw.trim()
        .trim_end_matches(|c: char| c.is_whitespace() || matches!(c, ':' | '-' | '–' | '—' | '|' | '('))
        .trim()
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;

    fn titles(refs: &[Reference]) -> Vec<&str> {
        refs.iter().map(|r| r.title.as_str()).collect()
    }

    #[test]
    fn three_entries_in_order() {
        let text = "## 참고 자료\n- [One](https://one.test)\n- [Two](https://two.test/a)\n- [Three](http://three.test)";
        let refs = extract_references(text);
        assert_eq!(refs.len(), 3);
        assert_eq!(titles(&refs), vec!["One", "Two", "Three"]);
        assert_eq!(refs[1].url, "https://two.test/a");
    }

    #[test]
    fn missing_title_uses_url() {
        let refs = extract_references("## 참고 자료\n- [](https://one.test)\n- https://two.test");
        assert_eq!(refs.len(), 2);
        assert_eq!(refs[0].title, "https://one.test");
        assert_eq!(refs[1].title, "https://two.test");
    }

    #[test]
    fn entry_without_url_dropped() {
        let full = "## 참고 자료\n- [One](https://one.test)\n- [Two](https://two.test)\n- [Three](https://three.test)";
        let broken = "## 참고 자료\n- [One](https://one.test)\n- [Two]()\n- [Three](https://three.test)";
        assert_eq!(extract_references(full).len(), 3);
        let refs = extract_references(broken);
        assert_eq!(refs.len(), 2);
        assert_eq!(titles(&refs), vec!["One", "Three"]);
    }

    #[test]
    fn plain_title_line_without_url_dropped() {
        let refs = extract_references("## 참고 자료\n- 국립국어원 표준국어대사전\n- [A](https://a.test)");
        assert_eq!(titles(&refs), vec!["A"]);
    }

    #[test]
    fn relative_links_are_not_resolvable() {
        let refs = extract_references("## 참고 자료\n- [local](/contents/3)\n- [anchor](#top)");
        assert!(refs.is_empty());
    }

    #[test]
    fn duplicates_are_kept() {
        let refs = extract_references("## 참고 자료\n- [A](https://a.test)\n- [A](https://a.test)");
        assert_eq!(refs.len(), 2);
        assert_eq!(refs[0], refs[1]);
    }

    #[test]
    fn html_anchor_list() {
        let text = r#"## 참고 자료<br><ul><br><li><a href="https://a.test/x" target="_blank"><b>Alpha</b></a></li><br><li><a href='https://b.test'></a></li><br></ul>"#;
        let refs = extract_references(text);
        assert_eq!(refs.len(), 2);
        assert_eq!(refs[0].title, "Alpha");
        assert_eq!(refs[0].url, "https://a.test/x");
        assert_eq!(refs[1].title, "https://b.test");
    }

    #[test]
    fn labelled_bare_urls() {
        let text = "## 참고 자료\n1. 통계청 자료: https://kostat.test/data.\n2) 뉴스 - www.news.test/article";
        let refs = extract_references(text);
        assert_eq!(refs.len(), 2);
        assert_eq!(refs[0].title, "통계청 자료");
        assert_eq!(refs[0].url, "https://kostat.test/data");
        assert_eq!(refs[1].title, "뉴스");
        assert_eq!(refs[1].url, "https://www.news.test/article");
    }

    #[test]
    fn parenthesized_url_kept_whole() {
        let text = "## 참고 자료\n- [위키](https://ko.wikipedia.org/wiki/임플란트_(치과))\n- 위키 문서: https://ko.wikipedia.org/wiki/치아_(해부학).";
        let refs = extract_references(text);
        assert_eq!(refs.len(), 2);
        assert_eq!(refs[0].title, "위키");
        assert_eq!(refs[0].url, "https://ko.wikipedia.org/wiki/임플란트_(치과)");
        assert_eq!(refs[1].title, "위키 문서");
        assert_eq!(refs[1].url, "https://ko.wikipedia.org/wiki/치아_(해부학)");
    }

    #[test]
    fn unbalanced_closing_paren_trimmed() {
        let refs = extract_references("## 참고 자료\n- 통계 (출처 https://stat.test/a)");
        assert_eq!(refs.len(), 1);
        assert_eq!(refs[0].url, "https://stat.test/a");
    }

    #[test]
    fn markdown_link_title_ignored() {
        let text = "## 참고 자료\n- [T](https://t.test \"title\")\n- [U](<https://u.test/x> 'u title')";
        let refs = extract_references(text);
        assert_eq!(titles(&refs), vec!["T", "U"]);
        assert_eq!(refs[0].url, "https://t.test");
        assert_eq!(refs[1].url, "https://u.test/x");
    }

    #[test]
    fn body_links_before_marker_ignored() {
        let text = "See [body link](https://body.test).\n## 참고 자료\n- [Ref](https://ref.test)";
        let refs = extract_references(text);
        assert_eq!(titles(&refs), vec!["Ref"]);
    }

    #[test]
    fn malformed_input_degrades() {
        let refs = extract_references("## 참고 자료\n- [broken(https://x.test\n- ](\n- []");
        assert_eq!(refs.len(), 1);
        assert_eq!(refs[0].url, "https://x.test");
        assert!(extract_references("").is_empty());
        assert!(extract_references("## 참고 자료").is_empty());
    }

    #[test]
    fn end_to_end_scenario() {
        let body = "Para one.\nPara two.\n## 참고 자료\n- [Site](http://x.test)";
        let split = crate::pipeline::sections::split(body);
        let refs = extract_references(split.appendix);
        assert_eq!(
            refs,
            vec![Reference {
                title: "Site".into(),
                url: "http://x.test".into(),
            }]
        );
    }

    #[test]
    fn fixture_post() {
        let md = std::fs::read_to_string("tests/fixtures/post_with_refs.md").unwrap();
        let refs = extract_references(&md);
        assert_eq!(refs.len(), 4);
        assert_eq!(refs[0].title, "건강보험심사평가원 진료비 통계");
        assert_eq!(refs[2].title, refs[2].url);
        assert!(refs.iter().all(|r| r.url.starts_with("http")));
    }
}
