//! Article generation for pbnforge.
//!
//! [`ArticleGenerator::generate`] never fails: when the text-generation
//! capability is missing or misbehaves, a deterministic template article is
//! returned instead. Every attempt is appended to the generation log.

pub mod gemini;
pub mod log;
pub mod parser;
pub mod persona;
pub mod template;

use tracing::{info, instrument, warn};

use pbnforge_shared::{AuthorStyle, GeneratedArticle, GenerationConfig, Result};

pub use gemini::{GeminiClient, GenerationError, TextGenerator};
pub use log::{GenerationLog, GenerationLogEntry, read_log};
pub use parser::{extract_title, parse_article, strip_code_fences};
pub use persona::{PromptInput, build_prompt};
pub use template::{FALLBACK_MODEL, fallback_article};

/// Persona-aware article generator with template fallback.
pub struct ArticleGenerator {
    backend: Option<Box<dyn TextGenerator>>,
    target_words: u32,
    log: GenerationLog,
}

impl ArticleGenerator {
    /// Create a generator around an optional backend.
    pub fn new(
        backend: Option<Box<dyn TextGenerator>>,
        target_words: u32,
        log: GenerationLog,
    ) -> Self {
        Self {
            backend,
            target_words,
            log,
        }
    }

    /// Build from config: a Gemini backend when an API key is present,
    /// otherwise template-only.
    pub fn from_config(config: &GenerationConfig, api_key: Option<&str>) -> Result<Self> {
        let backend: Option<Box<dyn TextGenerator>> = match api_key {
            Some(key) => Some(Box::new(GeminiClient::new(config, key)?)),
            None => {
                info!("no generation API key configured, articles will use the template");
                None
            }
        };
        Ok(Self::new(
            backend,
            config.target_words,
            GenerationLog::new(&config.log_path),
        ))
    }

    /// Generate an article for one task.
    #[instrument(skip_all, fields(topic = %topic, style = %style))]
    pub async fn generate(
        &self,
        topic: &str,
        target_url: &str,
        anchor: &str,
        style: AuthorStyle,
    ) -> GeneratedArticle {
        let prompt = build_prompt(&PromptInput {
            topic,
            target_url,
            anchor,
            style,
            target_words: self.target_words,
        });

        let attempt = match &self.backend {
            Some(backend) => backend
                .generate_text(&prompt)
                .await
                .map(|text| (text, backend.model().to_string())),
            None => Err(GenerationError::NotConfigured),
        };

        let (article, raw_response) = match attempt {
            Ok((raw, model)) => {
                let (title, body_html) = parse_article(&raw, topic);
                if body_html.trim().is_empty() {
                    warn!("generated text has no body, falling back to template");
                    (self.fallback(topic, target_url, anchor), raw)
                } else {
                    info!(%model, chars = body_html.chars().count(), "article generated");
                    (
                        GeneratedArticle {
                            title,
                            body_html,
                            model_used: model,
                        },
                        raw,
                    )
                }
            }
            Err(GenerationError::NotConfigured) => {
                (self.fallback(topic, target_url, anchor), String::new())
            }
            Err(e) => {
                warn!(error = %e, "generation failed, falling back to template");
                (self.fallback(topic, target_url, anchor), String::new())
            }
        };

        let entry = GenerationLogEntry::now(
            topic,
            style.as_str(),
            &prompt,
            &raw_response,
            &article.model_used,
        );
        if let Err(e) = self.log.append(&entry) {
            warn!(path = %self.log.path().display(), error = %e, "failed to write generation log");
        }

        article
    }

    fn fallback(&self, topic: &str, target_url: &str, anchor: &str) -> GeneratedArticle {
        let (title, body_html) = fallback_article(topic, target_url, anchor);
        GeneratedArticle {
            title,
            body_html,
            model_used: FALLBACK_MODEL.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use uuid::Uuid;

    /// Backend returning a canned result.
    struct Canned(std::result::Result<&'static str, fn() -> GenerationError>);

    #[async_trait]
    impl TextGenerator for Canned {
        fn model(&self) -> &str {
            "canned-model"
        }

        async fn generate_text(
            &self,
            _prompt: &str,
        ) -> std::result::Result<String, GenerationError> {
            match &self.0 {
                Ok(text) => Ok((*text).to_string()),
                Err(make) => Err(make()),
            }
        }
    }

    fn temp_log() -> GenerationLog {
        GenerationLog::new(std::env::temp_dir().join(format!("pbn_gen_{}.jsonl", Uuid::now_v7())))
    }

    fn generator(backend: Option<Box<dyn TextGenerator>>) -> ArticleGenerator {
        ArticleGenerator::new(backend, 600, temp_log())
    }

    #[tokio::test]
    async fn uses_model_output_when_available() {
        let generator = generator(Some(Box::new(Canned(Ok(
            "```html\n<h1>Smart Saving</h1><p>Save <a href=\"https://t.example\">now</a></p>\n```",
        )))));
        let article = generator
            .generate("Saving", "https://t.example", "now", AuthorStyle::Expert)
            .await;
        assert_eq!(article.title, "Smart Saving");
        assert_eq!(article.body_html, "<p>Save <a href=\"https://t.example\">now</a></p>");
        assert_eq!(article.model_used, "canned-model");
    }

    #[tokio::test]
    async fn no_backend_uses_template_and_logs_once() {
        let generator = generator(None);
        let article = generator
            .generate("Budgeting", "https://t.example", "tips", AuthorStyle::Neutral)
            .await;

        let (title, body) = fallback_article("Budgeting", "https://t.example", "tips");
        assert_eq!(article.title, title);
        assert_eq!(article.body_html, body);
        assert_eq!(article.model_used, FALLBACK_MODEL);

        let entries = read_log(generator.log.path()).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].style, "neutral");
        assert_eq!(entries[0].response, "");
        assert!(entries[0].prompt.contains("Budgeting"));
    }

    #[tokio::test]
    async fn failures_fall_back_identically() {
        let failing = generator(Some(Box::new(Canned(Err(|| {
            GenerationError::Network("refused".into())
        })))));
        let empty = generator(Some(Box::new(Canned(Ok("```html\n```")))));
        let absent = generator(None);

        let a = failing
            .generate("Budgeting", "https://t.example", "tips", AuthorStyle::Lifestyle)
            .await;
        let b = empty
            .generate("Budgeting", "https://t.example", "tips", AuthorStyle::Lifestyle)
            .await;
        let c = absent
            .generate("Budgeting", "https://t.example", "tips", AuthorStyle::Lifestyle)
            .await;

        assert_eq!(a, b);
        assert_eq!(b, c);
        assert_eq!(a.model_used, FALLBACK_MODEL);
    }

    #[tokio::test]
    async fn log_failure_does_not_block_generation() {
        let log = GenerationLog::new(
            std::env::temp_dir()
                .join(format!("pbn_no_such_dir_{}", Uuid::now_v7()))
                .join("log.jsonl"),
        );
        let generator = ArticleGenerator::new(None, 600, log);
        let article = generator
            .generate("Budgeting", "https://t.example", "tips", AuthorStyle::Neutral)
            .await;
        assert_eq!(article.model_used, FALLBACK_MODEL);
    }

    #[test]
    fn from_config_without_key_has_no_backend() {
        let generator = ArticleGenerator::from_config(&GenerationConfig::default(), None).unwrap();
        assert!(generator.backend.is_none());
        assert_eq!(generator.target_words, 600);
    }
}
