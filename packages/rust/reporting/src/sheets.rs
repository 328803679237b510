//! Google Sheets per-task logger.
//!
//! Authenticates as a service account (RS256-signed JWT exchanged for an
//! OAuth access token) and appends one row per task record through the
//! Sheets v4 `values:append` endpoint.

use std::time::Duration;

use chrono::{Local, NaiveDateTime, Utc};
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};
use url::Url;

use pbnforge_shared::{PbnError, Result, Secrets, SheetsConfig, TaskRecord};

const SCOPE: &str = "https://www.googleapis.com/auth/spreadsheets";
const JWT_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
/// Range used when the configured tab is rejected: the first sheet.
const FIRST_SHEET_RANGE: &str = "A1";

// ---------------------------------------------------------------------------
// Service account
// ---------------------------------------------------------------------------

/// The fields of a service-account JSON key that the logger needs.
#[derive(Clone, Deserialize)]
pub struct ServiceAccountKey {
    pub client_email: String,
    pub private_key: String,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

fn default_token_uri() -> String {
    "https://oauth2.googleapis.com/token".into()
}

impl ServiceAccountKey {
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json)
            .map_err(|e| PbnError::parse(format!("invalid service account key: {e}")))
    }
}

impl std::fmt::Debug for ServiceAccountKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceAccountKey")
            .field("client_email", &self.client_email)
            .field("private_key", &"***")
            .field("token_uri", &self.token_uri)
            .finish()
    }
}

#[derive(Serialize)]
struct Claims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: i64,
    exp: i64,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
}

#[derive(Serialize)]
struct AppendBody<'a> {
    values: [&'a [String]; 1],
}

// ---------------------------------------------------------------------------
// Rows
// ---------------------------------------------------------------------------

/// `[timestamp, site, topic, link, status, model]` for one task.
pub fn format_row(record: &TaskRecord, at: NaiveDateTime) -> Vec<String> {
    let result = &record.result;
    vec![
        at.format("%Y-%m-%d %H:%M:%S").to_string(),
        result.site.clone(),
        record.topic.clone(),
        result.new_post_url.clone().unwrap_or_else(|| "N/A".into()),
        if result.is_success() {
            "✅ Success".into()
        } else {
            "❌ Error".into()
        },
        record.model_used.clone(),
    ]
}

// ---------------------------------------------------------------------------
// Logger
// ---------------------------------------------------------------------------

pub struct SheetsLogger {
    http: reqwest::Client,
    api_base: String,
    spreadsheet_id: String,
    worksheet: String,
    key: ServiceAccountKey,
}

impl SheetsLogger {
    pub fn new(config: &SheetsConfig, key: ServiceAccountKey) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| PbnError::Network(e.to_string()))?;
        Ok(Self {
            http,
            api_base: config.api_base.clone(),
            spreadsheet_id: config.spreadsheet_id.clone(),
            worksheet: config.worksheet.clone(),
            key,
        })
    }

    /// `None` when no spreadsheet or no credential is configured.
    pub fn from_config(config: &SheetsConfig, secrets: &Secrets) -> Result<Option<Self>> {
        if config.spreadsheet_id.trim().is_empty() {
            return Ok(None);
        }
        let Some(json) = secrets.google_credentials.as_deref() else {
            return Ok(None);
        };
        let key = ServiceAccountKey::from_json(json)?;
        Self::new(config, key).map(Some)
    }

    fn signed_assertion(&self) -> Result<String> {
        let now = Utc::now().timestamp();
        let claims = Claims {
            iss: &self.key.client_email,
            scope: SCOPE,
            aud: &self.key.token_uri,
            iat: now,
            exp: now + 3600,
        };
        let key = EncodingKey::from_rsa_pem(self.key.private_key.as_bytes())
            .map_err(|e| PbnError::config(format!("invalid service account private key: {e}")))?;
        jsonwebtoken::encode(&Header::new(Algorithm::RS256), &claims, &key)
            .map_err(|e| PbnError::Report(format!("failed to sign token request: {e}")))
    }

    /// Exchange a signed assertion for an OAuth access token.
    pub async fn access_token(&self) -> Result<String> {
        let assertion = self.signed_assertion()?;
        let response = self
            .http
            .post(&self.key.token_uri)
            .form(&[("grant_type", JWT_GRANT), ("assertion", assertion.as_str())])
            .send()
            .await
            .map_err(|e| PbnError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(PbnError::Report(format!(
                "token exchange returned {}: {body}",
                status.as_u16()
            )));
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| PbnError::parse(format!("invalid token response: {e}")))?;
        Ok(token.access_token)
    }

    fn append_url(&self, range: &str) -> Result<Url> {
        let mut url = Url::parse(&self.api_base)
            .map_err(|e| PbnError::config(format!("invalid sheets api_base: {e}")))?;
        url.path_segments_mut()
            .map_err(|_| PbnError::config("sheets api_base cannot hold a path"))?
            .pop_if_empty()
            .push("spreadsheets")
            .push(&self.spreadsheet_id)
            .push("values")
            .push(&format!("{range}:append"));
        url.query_pairs_mut()
            .append_pair("valueInputOption", "USER_ENTERED");
        Ok(url)
    }

    async fn append_to(&self, token: &str, range: &str, row: &[String]) -> Result<reqwest::Response> {
        self.http
            .post(self.append_url(range)?)
            .bearer_auth(token)
            .json(&AppendBody { values: [row] })
            .send()
            .await
            .map_err(|e| PbnError::Network(e.to_string()))
    }

    /// Append one row to the configured tab, or to the first sheet when the
    /// tab range is rejected.
    pub async fn append_row(&self, token: &str, row: &[String]) -> Result<()> {
        let mut response = self.append_to(token, &self.worksheet, row).await?;

        if response.status() == reqwest::StatusCode::BAD_REQUEST {
            debug!(worksheet = %self.worksheet, "worksheet rejected, using first sheet");
            response = self.append_to(token, FIRST_SHEET_RANGE, row).await?;
        }

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(PbnError::Report(format!(
                "sheets append returned {}: {body}",
                status.as_u16()
            )));
        }
        Ok(())
    }

    /// Log every record, continuing past individual failures. Returns the
    /// number of rows written.
    #[instrument(skip_all, fields(records = records.len()))]
    pub async fn log_records(&self, records: &[TaskRecord]) -> Result<usize> {
        let token = self.access_token().await?;
        let mut written = 0;
        for record in records {
            let row = format_row(record, Local::now().naive_local());
            match self.append_row(&token, &row).await {
                Ok(()) => written += 1,
                Err(e) => warn!(index = record.index, error = %e, "failed to log row to sheet"),
            }
        }
        Ok(written)
    }
}

/// Log the run to the spreadsheet if configured. Never fails.
pub async fn log_run(config: &SheetsConfig, secrets: &Secrets, records: &[TaskRecord]) {
    let logger = match SheetsLogger::from_config(config, secrets) {
        Ok(Some(logger)) => logger,
        Ok(None) => {
            info!("spreadsheet logging not configured, skipping");
            return;
        }
        Err(e) => {
            warn!(error = %e, "failed to set up spreadsheet logger");
            return;
        }
    };

    match logger.log_records(records).await {
        Ok(written) => info!(written, "rows logged to spreadsheet"),
        Err(e) => warn!(error = %e, "spreadsheet logging failed"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use pbnforge_shared::{AuthorStyle, PublishResult, PublishStatus};
    use wiremock::matchers::{body_string_contains, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const TEST_KEY: &str = include_str!("../../../../fixtures/keys/test_service_account.pem");

    fn record(status: PublishStatus, url: Option<&str>) -> TaskRecord {
        TaskRecord {
            index: 0,
            topic: "Personal finance".into(),
            style: AuthorStyle::Expert,
            model_used: "gemini-1.5-flash".into(),
            result: PublishResult {
                site: "https://satellite1.example".into(),
                status,
                new_post_url: url.map(String::from),
                updated_old_post: None,
            },
        }
    }

    fn logger(server: &MockServer) -> SheetsLogger {
        let config = SheetsConfig {
            spreadsheet_id: "SHEET".into(),
            api_base: format!("{}/v4", server.uri()),
            ..Default::default()
        };
        let key = ServiceAccountKey {
            client_email: "bot@project.iam.gserviceaccount.com".into(),
            private_key: TEST_KEY.into(),
            token_uri: format!("{}/token", server.uri()),
        };
        SheetsLogger::new(&config, key).unwrap()
    }

    async fn mount_token(server: &MockServer) {
        Mock::given(method("POST"))
            .and(path("/token"))
            .and(body_string_contains("grant_type=urn%3Aietf%3Aparams%3Aoauth%3Agrant-type%3Ajwt-bearer"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "access_token": "ya29.test",
                "expires_in": 3600,
                "token_type": "Bearer"
            })))
            .mount(server)
            .await;
    }

    #[test]
    fn row_layout() {
        let at = NaiveDate::from_ymd_opt(2024, 5, 1)
            .unwrap()
            .and_hms_opt(9, 30, 0)
            .unwrap();
        let ok = format_row(&record(PublishStatus::Success, Some("https://s/p/")), at);
        assert_eq!(
            ok,
            vec![
                "2024-05-01 09:30:00",
                "https://satellite1.example",
                "Personal finance",
                "https://s/p/",
                "✅ Success",
                "gemini-1.5-flash",
            ]
        );

        let failed = format_row(&record(PublishStatus::Error, None), at);
        assert_eq!(failed[3], "N/A");
        assert_eq!(failed[4], "❌ Error");
    }

    #[test]
    fn unconfigured_logger_is_none() {
        let secrets = Secrets {
            google_credentials: Some("{}".into()),
            ..Default::default()
        };
        assert!(SheetsLogger::from_config(&SheetsConfig::default(), &secrets).unwrap().is_none());

        let config = SheetsConfig {
            spreadsheet_id: "SHEET".into(),
            ..Default::default()
        };
        assert!(SheetsLogger::from_config(&config, &Secrets::default()).unwrap().is_none());
    }

    #[test]
    fn bad_credential_json_is_an_error() {
        let config = SheetsConfig {
            spreadsheet_id: "SHEET".into(),
            ..Default::default()
        };
        let secrets = Secrets {
            google_credentials: Some("not json".into()),
            ..Default::default()
        };
        assert!(SheetsLogger::from_config(&config, &secrets).is_err());
    }

    #[tokio::test]
    async fn appends_to_report_tab() {
        let server = MockServer::start().await;
        mount_token(&server).await;
        Mock::given(method("POST"))
            .and(path("/v4/spreadsheets/SHEET/values/Report:append"))
            .and(query_param("valueInputOption", "USER_ENTERED"))
            .and(header("authorization", "Bearer ya29.test"))
            .and(body_string_contains("✅ Success"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({})))
            .expect(1)
            .mount(&server)
            .await;

        let written = logger(&server)
            .log_records(&[record(PublishStatus::Success, Some("https://s/p/"))])
            .await
            .unwrap();
        assert_eq!(written, 1);
    }

    #[tokio::test]
    async fn falls_back_to_first_sheet() {
        let server = MockServer::start().await;
        mount_token(&server).await;
        Mock::given(method("POST"))
            .and(path("/v4/spreadsheets/SHEET/values/Report:append"))
            .respond_with(ResponseTemplate::new(400).set_body_string("Unable to parse range"))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/v4/spreadsheets/SHEET/values/A1:append"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({})))
            .expect(1)
            .mount(&server)
            .await;

        let written = logger(&server)
            .log_records(&[record(PublishStatus::Error, None)])
            .await
            .unwrap();
        assert_eq!(written, 1);
    }

    #[tokio::test]
    async fn token_failure_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/token"))
            .respond_with(ResponseTemplate::new(401).set_body_string("invalid_grant"))
            .mount(&server)
            .await;

        let result = logger(&server)
            .log_records(&[record(PublishStatus::Success, None)])
            .await;
        assert!(result.is_err());
    }
}
