//! Deterministic fallback article used whenever generation is unavailable.

use pbnforge_shared::escape_html;

/// `model_used` value for template-built articles.
pub const FALLBACK_MODEL: &str = "template-fallback";

/// Build the fallback `(title, body_html)` from the task inputs only.
///
/// Same inputs always give byte-identical output.
pub fn fallback_article(topic: &str, target_url: &str, anchor: &str) -> (String, String) {
    let topic_html = escape_html(topic);
    let anchor_html = escape_html(anchor);
    let href = escape_html(target_url);

    let title = format!("{topic}: What You Need to Know");
    let body = format!(
        "<h2>Why {topic_html} matters</h2>\n\
         <p>{topic_html} comes up in everyday decisions more often than most people notice. \
         Understanding the basics helps you make better choices and avoid common mistakes.</p>\n\
         <h2>Getting started</h2>\n\
         <p>Begin with reliable sources and a clear plan. For a deeper look, see \
         <a href=\"{href}\">{anchor_html}</a>.</p>\n\
         <h2>Key takeaways</h2>\n\
         <p>Small, consistent steps add up. Review your approach regularly and adjust it as you \
         learn more about {topic_html}.</p>"
    );

    (title, body)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fallback_is_deterministic() {
        let a = fallback_article("Budgeting", "https://main.example/b", "budget tips");
        let b = fallback_article("Budgeting", "https://main.example/b", "budget tips");
        assert_eq!(a, b);
    }

    #[test]
    fn fallback_embeds_link_and_topic() {
        let (title, body) = fallback_article("Budgeting", "https://main.example/b", "budget tips");
        assert_eq!(title, "Budgeting: What You Need to Know");
        assert!(body.contains(r#"<a href="https://main.example/b">budget tips</a>"#));
        assert!(body.contains("Why Budgeting matters"));
    }

    #[test]
    fn fallback_escapes_markup() {
        let (_, body) = fallback_article("Tips & <Tricks>", "https://x.example/?a=1&b=\"2\"", "A&B");
        assert!(body.contains("Tips &amp; &lt;Tricks&gt;"));
        assert!(body.contains(r#"href="https://x.example/?a=1&amp;b=&quot;2&quot;""#));
        assert!(body.contains(">A&amp;B</a>"));
    }
}
