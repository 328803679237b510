//! Turning raw model output into a title and an HTML body.
//!
//! Every function here is pure; the generator composes them.

use std::sync::LazyLock;

use regex::Regex;

/// Suffix appended to the topic when the output carries no `<h1>`.
const SYNTHETIC_TITLE_SUFFIX: &str = "A Complete Guide";

/// Remove markdown code-fence markers (```` ```html ````, ```` ``` ````).
pub fn strip_code_fences(text: &str) -> String {
    static FENCE_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"```[A-Za-z0-9_-]*").expect("valid regex"));

    FENCE_RE.replace_all(text, "").trim().to_string()
}

/// Split on the first `<h1>…</h1>`: returns the heading text and everything after it.
///
/// Returns `None` when there is no complete `<h1>` element or its text is blank.
pub fn extract_title(html: &str) -> Option<(String, String)> {
    static H1_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"(?is)<h1\b[^>]*>(.*?)</h1\s*>").expect("valid regex"));
    static TAG_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]*>").expect("valid regex"));

    let caps = H1_RE.captures(html)?;
    let whole = caps.get(0)?;
    let title = TAG_RE.replace_all(&caps[1], "").trim().to_string();
    if title.is_empty() {
        return None;
    }

    let body = html[whole.end()..].trim().to_string();
    Some((title, body))
}

/// Title used when the model output has no heading.
pub fn synthesize_title(topic: &str) -> String {
    format!("{topic}: {SYNTHETIC_TITLE_SUFFIX}")
}

/// Full parse step: fences stripped, then title extracted or synthesized.
pub fn parse_article(raw: &str, topic: &str) -> (String, String) {
    let cleaned = strip_code_fences(raw);
    match extract_title(&cleaned) {
        Some((title, body)) => (title, body),
        None => (synthesize_title(topic), cleaned),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_html_fence() {
        let raw = "```html\n<h1>Title</h1>\n<p>Body</p>\n```";
        assert_eq!(strip_code_fences(raw), "<h1>Title</h1>\n<p>Body</p>");
    }

    #[test]
    fn extracts_first_h1() {
        let (title, body) =
            extract_title("<h1>Saving 101</h1>\n<p>Intro</p><h1>Second</h1>").expect("title");
        assert_eq!(title, "Saving 101");
        assert_eq!(body, "<p>Intro</p><h1>Second</h1>");
    }

    #[test]
    fn h1_with_attributes_and_inner_tags() {
        let (title, body) =
            extract_title(r#"<H1 class="t"><strong>Bold</strong> move</H1><p>x</p>"#).unwrap();
        assert_eq!(title, "Bold move");
        assert_eq!(body, "<p>x</p>");
    }

    #[test]
    fn content_before_h1_is_dropped() {
        let (_, body) = extract_title("<p>preamble</p><h1>T</h1><p>kept</p>").unwrap();
        assert_eq!(body, "<p>kept</p>");
    }

    #[test]
    fn missing_or_unclosed_h1_is_none() {
        assert!(extract_title("<h2>Only h2</h2>").is_none());
        assert!(extract_title("<h1>never closed").is_none());
        assert!(extract_title("<h1>  </h1><p>x</p>").is_none());
    }

    #[test]
    fn parse_synthesizes_title_without_h1() {
        let (title, body) = parse_article("<p>Just a body</p>", "Budgeting");
        assert_eq!(title, "Budgeting: A Complete Guide");
        assert_eq!(body, "<p>Just a body</p>");
    }
}
