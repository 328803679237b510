//! Telegram Bot API notifier for the daily summary.

use std::time::Duration;

use chrono::{Local, NaiveDate};
use serde::Serialize;
use tracing::{info, warn};

use pbnforge_shared::{PbnError, Result, Secrets, TelegramConfig};

use crate::dashboard::DashboardMetrics;

const SEND_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Serialize)]
struct SendMessage<'a> {
    chat_id: &'a str,
    text: &'a str,
    parse_mode: &'static str,
}

/// Markdown summary of the execution metrics.
pub fn format_report(metrics: &DashboardMetrics, date: NaiveDate) -> String {
    let mut text = format!("📊 *PBN Daily Report* ({})\n\n", date.format("%Y-%m-%d"));
    for (metric, value, _) in metrics.summary_rows() {
        text.push_str(&format!("• {metric}: *{value}*\n"));
    }
    text
}

pub struct TelegramNotifier {
    http: reqwest::Client,
    endpoint: String,
    chat_id: String,
}

impl TelegramNotifier {
    pub fn new(api_base: &str, token: &str, chat_id: impl Into<String>) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(SEND_TIMEOUT)
            .build()
            .map_err(|e| PbnError::Network(e.to_string()))?;
        Ok(Self {
            http,
            endpoint: format!("{}/bot{token}/sendMessage", api_base.trim_end_matches('/')),
            chat_id: chat_id.into(),
        })
    }

    /// `None` when the bot token or chat id is not set.
    pub fn from_config(config: &TelegramConfig, secrets: &Secrets) -> Result<Option<Self>> {
        match (&secrets.telegram_token, &secrets.telegram_chat_id) {
            (Some(token), Some(chat_id)) => {
                Self::new(&config.api_base, token, chat_id.clone()).map(Some)
            }
            _ => Ok(None),
        }
    }

    /// Send one Markdown message. Anything but HTTP 200 is an error.
    pub async fn send(&self, text: &str) -> Result<()> {
        let response = self
            .http
            .post(&self.endpoint)
            .json(&SendMessage {
                chat_id: &self.chat_id,
                text,
                parse_mode: "Markdown",
            })
            .send()
            .await
            .map_err(|e| PbnError::Network(e.without_url().to_string()))?;

        let status = response.status();
        if status != reqwest::StatusCode::OK {
            let body = response.text().await.unwrap_or_default();
            return Err(PbnError::Report(format!(
                "telegram returned {}: {body}",
                status.as_u16()
            )));
        }
        Ok(())
    }
}

/// Send today's report if the notifier is configured. Never fails.
pub async fn notify_report(config: &TelegramConfig, secrets: &Secrets, metrics: &DashboardMetrics) {
    let notifier = match TelegramNotifier::from_config(config, secrets) {
        Ok(Some(n)) => n,
        Ok(None) => {
            info!("telegram credentials not set, skipping report");
            return;
        }
        Err(e) => {
            warn!(error = %e, "failed to set up telegram notifier");
            return;
        }
    };

    let text = format_report(metrics, Local::now().date_naive());
    match notifier.send(&text).await {
        Ok(()) => info!("telegram report sent"),
        Err(e) => warn!(error = %e, "telegram report failed"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dashboard::StyleAccumulator;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn metrics() -> DashboardMetrics {
        DashboardMetrics {
            total_sites: 3,
            successful: 2,
            errors: 1,
            old_posts_updated: 1,
            new_posts_created: 2,
            estimated_cost_usd: 0.0,
            styles: StyleAccumulator::default(),
        }
    }

    #[test]
    fn report_format() {
        let date = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap();
        let text = format_report(&metrics(), date);
        assert!(text.starts_with("📊 *PBN Daily Report* (2024-05-01)\n\n"));
        assert!(text.contains("• Total Sites: *3*\n"));
        assert!(text.contains("• Errors: *1*\n"));
        assert!(text.ends_with("• New Posts Created: *2*\n"));
    }

    #[test]
    fn unconfigured_is_none() {
        let secrets = Secrets {
            telegram_token: Some("t".into()),
            ..Default::default()
        };
        let notifier = TelegramNotifier::from_config(&TelegramConfig::default(), &secrets).unwrap();
        assert!(notifier.is_none());
    }

    #[tokio::test]
    async fn sends_markdown_message() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/botTOKEN/sendMessage"))
            .and(body_json(serde_json::json!({
                "chat_id": "42",
                "text": "hello",
                "parse_mode": "Markdown"
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"ok": true})))
            .expect(1)
            .mount(&server)
            .await;

        let notifier = TelegramNotifier::new(&server.uri(), "TOKEN", "42").unwrap();
        notifier.send("hello").await.unwrap();
    }

    #[tokio::test]
    async fn non_200_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(400).set_body_string("chat not found"))
            .mount(&server)
            .await;

        let notifier = TelegramNotifier::new(&server.uri(), "TOKEN", "42").unwrap();
        let err = notifier.send("hello").await.unwrap_err();
        assert!(err.to_string().contains("chat not found"));
    }
}
