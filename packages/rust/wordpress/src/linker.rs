//! Internal linking: insert one link to the target into a recent post.
//!
//! A post is a candidate when it has fewer than `max_links_per_post`
//! anchors, mentions the topic (case-insensitive) and does not already
//! link to the target. The first candidate, in API order, whose text (not
//! markup, not an existing link) contains the exact topic string gets that
//! occurrence wrapped in a link.

use std::sync::LazyLock;

use regex::Regex;
use tracing::{debug, info, instrument};

use pbnforge_shared::{Credentials, Result, escape_html};

use crate::client::WpClient;

/// Result of one internal-linking attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkOutcome {
    /// A link was inserted and the post update was confirmed.
    Inserted { post_id: u64, post_url: String },
    /// No recent post qualified.
    NoEligiblePost,
    /// A post qualified but the site refused the update.
    UpdateRejected { post_id: u64 },
}

impl LinkOutcome {
    /// Public URL of the updated post, if any.
    pub fn post_url(&self) -> Option<&str> {
        match self {
            Self::Inserted { post_url, .. } => Some(post_url),
            _ => None,
        }
    }
}

/// Number of `<a …>` opening tags in `html`.
pub fn count_links(html: &str) -> usize {
    static ANCHOR_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"(?i)<a[\s>]").expect("valid regex"));
    ANCHOR_RE.find_iter(html).count()
}

/// The three eligibility checks applied to each candidate post.
pub fn is_candidate(content: &str, topic: &str, target_url: &str, max_links: usize) -> bool {
    count_links(content) < max_links
        && content.to_lowercase().contains(&topic.to_lowercase())
        && !links_to(content, target_url)
}

/// Whether rendered `content` already contains `target_url`, either raw or
/// with `&` written as one of the entities WordPress emits in attributes.
fn links_to(content: &str, target_url: &str) -> bool {
    if content.contains(target_url) {
        return true;
    }
    target_url.contains('&')
        && ["&amp;", "&#038;", "&#38;"]
            .iter()
            .any(|entity| content.contains(&target_url.replace('&', entity)))
}

/// Wrap the first text occurrence of `topic` in a link.
///
/// Occurrences inside tags, comments, existing `<a>` elements and
/// `<script>`/`<style>` bodies are never touched. The href and anchor are
/// HTML-escaped. Returns `None` when no occurrence is available.
pub fn insert_link(content: &str, topic: &str, target_url: &str, anchor: &str) -> Option<String> {
    static MARKUP_RE: LazyLock<Regex> = LazyLock::new(|| {
        Regex::new(
            r#"(?s)<!--.*?-->|<(/?)([A-Za-z][A-Za-z0-9-]*)\b(?:[^>"']|"[^"]*"|'[^']*')*>|<[^>]*>"#,
        )
        .expect("valid regex")
    });

    if topic.is_empty() {
        return None;
    }

    let link = format!(
        r#"<a href="{}">{}</a>"#,
        escape_html(target_url),
        escape_html(anchor)
    );
    let splice = |pos: usize| {
        format!(
            "{}{}{}",
            &content[..pos],
            link,
            &content[pos + topic.len()..]
        )
    };

    let mut anchor_depth = 0usize;
    let mut in_raw_text = false;
    let mut cursor = 0usize;

    for caps in MARKUP_RE.captures_iter(content) {
        let Some(whole) = caps.get(0) else { continue };

        if anchor_depth == 0 && !in_raw_text {
            if let Some(found) = content[cursor..whole.start()].find(topic) {
                return Some(splice(cursor + found));
            }
        }

        if let Some(name) = caps.get(2) {
            let closing = caps.get(1).is_some_and(|c| !c.as_str().is_empty());
            match name.as_str().to_ascii_lowercase().as_str() {
                "a" if closing => anchor_depth = anchor_depth.saturating_sub(1),
                "a" => anchor_depth += 1,
                "script" | "style" => in_raw_text = !closing,
                _ => {}
            }
        }

        cursor = whole.end();
    }

    if anchor_depth == 0 && !in_raw_text {
        if let Some(found) = content[cursor..].find(topic) {
            return Some(splice(cursor + found));
        }
    }

    None
}

impl WpClient {
    /// Try to add a link to `target_url` into one of the site's recent posts.
    ///
    /// Transport and decoding failures are returned as `Err`; the caller
    /// decides whether they matter.
    #[instrument(skip_all, fields(site = %site_url, topic = %topic))]
    pub async fn try_insert_internal_link(
        &self,
        site_url: &str,
        credentials: &Credentials,
        target_url: &str,
        anchor: &str,
        topic: &str,
    ) -> Result<LinkOutcome> {
        let posts = self.list_recent_posts(site_url, credentials).await?;

        for post in &posts {
            let content = &post.content.rendered;

            if !is_candidate(content, topic, target_url, self.max_links_per_post) {
                debug!(post_id = post.id, "post not eligible for linking");
                continue;
            }

            let Some(updated) = insert_link(content, topic, target_url, anchor) else {
                debug!(post_id = post.id, "topic only appears inside markup");
                continue;
            };

            return match self
                .update_post_content(site_url, credentials, post.id, &updated)
                .await?
            {
                Some(saved) => {
                    let post_url = if saved.link.is_empty() {
                        post.link.clone()
                    } else {
                        saved.link
                    };
                    info!(post_id = post.id, %post_url, "internal link inserted");
                    Ok(LinkOutcome::Inserted {
                        post_id: post.id,
                        post_url,
                    })
                }
                None => Ok(LinkOutcome::UpdateRejected { post_id: post.id }),
            };
        }

        debug!(checked = posts.len(), "no eligible post for internal link");
        Ok(LinkOutcome::NoEligiblePost)
    }
}
