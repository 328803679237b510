//! Core domain types: site tasks, generated articles and publish results.

use std::fmt;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// AuthorStyle
// ---------------------------------------------------------------------------

/// Persona preset controlling the tone of generated content.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthorStyle {
    /// Dry, analytical, fact-heavy.
    Expert,
    /// Personal, emotional, blog-like.
    Lifestyle,
    /// Balanced news-portal tone.
    #[default]
    Neutral,
}

impl AuthorStyle {
    /// Lenient parse: unknown or empty values resolve to [`AuthorStyle::Neutral`].
    pub fn parse_lenient(value: Option<&str>) -> Self {
        match value.map(|v| v.trim().to_ascii_lowercase()).as_deref() {
            Some("expert") => Self::Expert,
            Some("lifestyle") => Self::Lifestyle,
            _ => Self::Neutral,
        }
    }

    /// Lowercase name used in logs and reports.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Expert => "expert",
            Self::Lifestyle => "lifestyle",
            Self::Neutral => "neutral",
        }
    }
}

impl fmt::Display for AuthorStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// SiteTask
// ---------------------------------------------------------------------------

/// One unit of work as read from the tasks JSON file.
///
/// Every field is optional on input; [`SiteTask::validate`] decides whether
/// the task can run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SiteTask {
    #[serde(default)]
    pub site_url: Option<String>,
    #[serde(default)]
    pub login: Option<String>,
    #[serde(default)]
    pub app_password: Option<String>,
    #[serde(default)]
    pub target_url: Option<String>,
    #[serde(default)]
    pub anchor: Option<String>,
    #[serde(default)]
    pub topic: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author_style: Option<String>,
}

/// A task whose required fields are all present and non-empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidTask {
    pub site_url: String,
    pub credentials: Credentials,
    pub target_url: String,
    pub anchor: String,
    pub topic: String,
    pub style: AuthorStyle,
}

impl SiteTask {
    /// Check required fields. On failure returns the names of the missing ones.
    ///
    /// Values are trimmed except `site_url`, which is kept as given so the
    /// results manifest reports it verbatim.
    pub fn validate(&self) -> std::result::Result<ValidTask, Vec<&'static str>> {
        fn take(value: &Option<String>) -> Option<String> {
            value
                .as_deref()
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(String::from)
        }

        let fields = [
            ("site_url", take(&self.site_url)),
            ("login", take(&self.login)),
            ("app_password", take(&self.app_password)),
            ("target_url", take(&self.target_url)),
            ("anchor", take(&self.anchor)),
            ("topic", take(&self.topic)),
        ];

        let missing: Vec<&'static str> = fields
            .iter()
            .filter(|(_, v)| v.is_none())
            .map(|(name, _)| *name)
            .collect();
        if !missing.is_empty() {
            return Err(missing);
        }

        let [_, login, app_password, target_url, anchor, topic] =
            fields.map(|(_, v)| v.unwrap_or_default());
        let site_url = self.site_url.clone().unwrap_or_default();

        Ok(ValidTask {
            site_url,
            credentials: Credentials {
                username: login,
                app_password,
            },
            target_url,
            anchor,
            topic,
            style: AuthorStyle::parse_lenient(self.author_style.as_deref()),
        })
    }
}

// ---------------------------------------------------------------------------
// Credentials
// ---------------------------------------------------------------------------

/// WordPress login plus application password, sent as HTTP Basic auth.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub app_password: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("app_password", &"***")
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Articles and results
// ---------------------------------------------------------------------------

/// A freshly generated article, ready for publishing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedArticle {
    pub title: String,
    pub body_html: String,
    /// Model name, or the fallback sentinel when the template was used.
    pub model_used: String,
}

/// Outcome status stored in the results manifest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PublishStatus {
    Success,
    Error,
}

/// One entry in `results.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublishResult {
    /// The task's `site_url`, verbatim.
    pub site: String,
    pub status: PublishStatus,
    pub new_post_url: Option<String>,
    /// Public URL of an older post that received an internal link.
    pub updated_old_post: Option<String>,
}

impl PublishResult {
    pub fn is_success(&self) -> bool {
        self.status == PublishStatus::Success
    }
}

/// Per-task details kept alongside the manifest entry, consumed by the
/// per-task reporting sinks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskRecord {
    /// Zero-based position in the input task list.
    pub index: usize,
    pub topic: String,
    pub style: AuthorStyle,
    pub model_used: String,
    pub result: PublishResult,
}

/// A task that failed validation and was not executed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedTask {
    pub index: usize,
    pub missing: Vec<&'static str>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn full_task() -> SiteTask {
        SiteTask {
            site_url: Some("https://satellite1.example".into()),
            login: Some("admin_bot".into()),
            app_password: Some("xxxx xxxx xxxx xxxx".into()),
            target_url: Some("https://main.example/page1".into()),
            anchor: Some("best finance tips".into()),
            topic: Some("Personal finance".into()),
            author_style: None,
        }
    }

    #[test]
    fn valid_task_defaults_to_neutral() {
        let task = full_task().validate().expect("valid");
        assert_eq!(task.style, AuthorStyle::Neutral);
        assert_eq!(task.credentials.username, "admin_bot");
        assert_eq!(task.site_url, "https://satellite1.example");
    }

    #[test]
    fn missing_and_blank_fields_are_reported() {
        let task = SiteTask {
            anchor: None,
            topic: Some("   ".into()),
            ..full_task()
        };
        let missing = task.validate().unwrap_err();
        assert_eq!(missing, vec!["anchor", "topic"]);
    }

    #[test]
    fn site_url_is_kept_verbatim() {
        let task = SiteTask {
            site_url: Some(" https://s.example/ ".into()),
            anchor: Some("  best finance tips ".into()),
            ..full_task()
        };
        let valid = task.validate().unwrap();
        assert_eq!(valid.site_url, " https://s.example/ ");
        assert_eq!(valid.anchor, "best finance tips");
    }

    #[test]
    fn style_parsing_is_lenient() {
        assert_eq!(AuthorStyle::parse_lenient(Some("Expert")), AuthorStyle::Expert);
        assert_eq!(AuthorStyle::parse_lenient(Some(" lifestyle ")), AuthorStyle::Lifestyle);
        assert_eq!(AuthorStyle::parse_lenient(Some("pirate")), AuthorStyle::Neutral);
        assert_eq!(AuthorStyle::parse_lenient(None), AuthorStyle::Neutral);
    }

    #[test]
    fn credentials_debug_hides_password() {
        let task = full_task().validate().unwrap();
        let dbg = format!("{:?}", task.credentials);
        assert!(dbg.contains("admin_bot"));
        assert!(!dbg.contains("xxxx"));
    }

    #[test]
    fn publish_result_serializes_with_null_urls() {
        let result = PublishResult {
            site: "https://satellite1.example".into(),
            status: PublishStatus::Error,
            new_post_url: None,
            updated_old_post: None,
        };
        let json = serde_json::to_value(&result).expect("serialize");
        assert_eq!(json["status"], "error");
        assert!(json["new_post_url"].is_null());
        assert!(json["updated_old_post"].is_null());
    }

    #[test]
    fn tasks_fixture_parses() {
        let fixture = std::fs::read_to_string("../../../fixtures/json/tasks.fixture.json")
            .expect("read fixture");
        let tasks: Vec<SiteTask> = serde_json::from_str(&fixture).expect("parse tasks");
        assert_eq!(tasks.len(), 3);
        assert!(tasks[0].validate().is_ok());
        assert_eq!(tasks[1].validate().unwrap_err(), vec!["anchor"]);
        assert_eq!(
            tasks[2].validate().unwrap().style,
            AuthorStyle::Lifestyle
        );
    }
}
