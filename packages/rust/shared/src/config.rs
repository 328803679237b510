//! Application configuration for pbnforge.
//!
//! User config lives at `~/.pbnforge/pbnforge.toml`.
//! CLI flags override config file values, which override defaults.
//! Secrets never live in the file: it only names the environment
//! variables they are read from, once, into [`Secrets`].

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{PbnError, Result};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "pbnforge.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".pbnforge";

// ---------------------------------------------------------------------------
// Config structs (matching pbnforge.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Article generation (Gemini) settings.
    #[serde(default)]
    pub generation: GenerationConfig,

    /// WordPress REST settings.
    #[serde(default)]
    pub wordpress: WordPressConfig,

    /// Output file locations.
    #[serde(default)]
    pub output: OutputConfig,

    /// Dashboard and metrics settings.
    #[serde(default)]
    pub reporting: ReportingConfig,

    /// Telegram notifier.
    #[serde(default)]
    pub telegram: TelegramConfig,

    /// Google Sheets logger.
    #[serde(default)]
    pub sheets: SheetsConfig,
}

/// `[generation]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationConfig {
    /// Name of the env var holding the Gemini API key.
    #[serde(default = "default_gemini_key_env")]
    pub api_key_env: String,

    /// Gemini model name.
    #[serde(default = "default_model")]
    pub model: String,

    /// Base URL of the Generative Language API.
    #[serde(default = "default_gemini_base_url")]
    pub base_url: String,

    /// Approximate article length requested in the prompt.
    #[serde(default = "default_target_words")]
    pub target_words: u32,

    /// Request timeout for a single generation call.
    #[serde(default = "default_generation_timeout")]
    pub timeout_secs: u64,

    /// Append-only NDJSON log of every generation attempt.
    #[serde(default = "default_generation_log")]
    pub log_path: PathBuf,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            api_key_env: default_gemini_key_env(),
            model: default_model(),
            base_url: default_gemini_base_url(),
            target_words: default_target_words(),
            timeout_secs: default_generation_timeout(),
            log_path: default_generation_log(),
        }
    }
}

fn default_gemini_key_env() -> String {
    "GEMINI_API_KEY".into()
}
fn default_model() -> String {
    "gemini-1.5-flash".into()
}
fn default_gemini_base_url() -> String {
    "https://generativelanguage.googleapis.com/v1beta".into()
}
fn default_target_words() -> u32 {
    600
}
fn default_generation_timeout() -> u64 {
    60
}
fn default_generation_log() -> PathBuf {
    PathBuf::from("generation_logs.jsonl")
}

/// `[wordpress]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WordPressConfig {
    /// Per-request timeout.
    #[serde(default = "default_wp_timeout")]
    pub timeout_secs: u64,

    /// How many recent posts are inspected for internal linking.
    #[serde(default = "default_recent_posts")]
    pub recent_posts: u32,

    /// Posts with this many links (or more) never get another one.
    #[serde(default = "default_max_links")]
    pub max_links_per_post: usize,

    /// Status given to newly created posts.
    #[serde(default = "default_post_status")]
    pub post_status: String,
}

impl Default for WordPressConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_wp_timeout(),
            recent_posts: default_recent_posts(),
            max_links_per_post: default_max_links(),
            post_status: default_post_status(),
        }
    }
}

fn default_wp_timeout() -> u64 {
    30
}
fn default_recent_posts() -> u32 {
    5
}
fn default_max_links() -> usize {
    4
}
fn default_post_status() -> String {
    "publish".into()
}

/// `[output]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Results manifest written after every run.
    #[serde(default = "default_results_path")]
    pub results_path: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            results_path: default_results_path(),
        }
    }
}

fn default_results_path() -> PathBuf {
    PathBuf::from("results.json")
}

/// `[reporting]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportingConfig {
    /// libSQL metrics database.
    #[serde(default = "default_metrics_db")]
    pub metrics_db: PathBuf,

    /// Overall performance CSV.
    #[serde(default = "default_summary_csv")]
    pub summary_csv: PathBuf,

    /// Per-persona CSV.
    #[serde(default = "default_persona_csv")]
    pub persona_csv: PathBuf,

    /// Generation price in USD per million tokens.
    #[serde(default = "default_price")]
    pub price_per_million_tokens: f64,

    /// Characters per token used for the cost estimate.
    #[serde(default = "default_chars_per_token")]
    pub chars_per_token: f64,
}

impl Default for ReportingConfig {
    fn default() -> Self {
        Self {
            metrics_db: default_metrics_db(),
            summary_csv: default_summary_csv(),
            persona_csv: default_persona_csv(),
            price_per_million_tokens: default_price(),
            chars_per_token: default_chars_per_token(),
        }
    }
}

fn default_metrics_db() -> PathBuf {
    PathBuf::from("pbn_metrics.db")
}
fn default_summary_csv() -> PathBuf {
    PathBuf::from("execution_summary.csv")
}
fn default_persona_csv() -> PathBuf {
    PathBuf::from("persona_analytics.csv")
}
fn default_price() -> f64 {
    0.075
}
fn default_chars_per_token() -> f64 {
    2.0
}

/// `[telegram]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelegramConfig {
    #[serde(default = "default_telegram_token_env")]
    pub token_env: String,
    #[serde(default = "default_telegram_chat_env")]
    pub chat_id_env: String,
    #[serde(default = "default_telegram_api")]
    pub api_base: String,
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            token_env: default_telegram_token_env(),
            chat_id_env: default_telegram_chat_env(),
            api_base: default_telegram_api(),
        }
    }
}

fn default_telegram_token_env() -> String {
    "TELEGRAM_BOT_TOKEN".into()
}
fn default_telegram_chat_env() -> String {
    "TELEGRAM_CHAT_ID".into()
}
fn default_telegram_api() -> String {
    "https://api.telegram.org".into()
}

/// `[sheets]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SheetsConfig {
    /// Env var holding the service-account JSON key.
    #[serde(default = "default_sheets_credentials_env")]
    pub credentials_env: String,

    /// Target spreadsheet ID (from its URL). Empty disables the logger.
    #[serde(default)]
    pub spreadsheet_id: String,

    /// Tab to append rows to; the first sheet is used if it is missing.
    #[serde(default = "default_worksheet")]
    pub worksheet: String,

    #[serde(default = "default_sheets_api")]
    pub api_base: String,
}

impl Default for SheetsConfig {
    fn default() -> Self {
        Self {
            credentials_env: default_sheets_credentials_env(),
            spreadsheet_id: String::new(),
            worksheet: default_worksheet(),
            api_base: default_sheets_api(),
        }
    }
}

fn default_sheets_credentials_env() -> String {
    "GOOGLE_CREDENTIALS".into()
}
fn default_worksheet() -> String {
    "Report".into()
}
fn default_sheets_api() -> String {
    "https://sheets.googleapis.com/v4".into()
}

// ---------------------------------------------------------------------------
// Secrets (resolved once at startup)
// ---------------------------------------------------------------------------

/// Secret values read from the environment variables named in [`AppConfig`].
///
/// Each is optional: a missing secret disables the matching integration.
#[derive(Clone, Default)]
pub struct Secrets {
    pub gemini_api_key: Option<String>,
    pub telegram_token: Option<String>,
    pub telegram_chat_id: Option<String>,
    pub google_credentials: Option<String>,
}

impl Secrets {
    /// Read every secret from the process environment.
    pub fn from_env(config: &AppConfig) -> Self {
        Self::from_lookup(config, |name| std::env::var(name).ok())
    }

    /// Read secrets through an arbitrary lookup (used by tests).
    pub fn from_lookup(config: &AppConfig, lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        Self {
            gemini_api_key: get(&config.generation.api_key_env),
            telegram_token: get(&config.telegram.token_env),
            telegram_chat_id: get(&config.telegram.chat_id_env),
            google_credentials: get(&config.sheets.credentials_env),
        }
    }
}

impl std::fmt::Debug for Secrets {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let flag = |v: &Option<String>| if v.is_some() { "set" } else { "unset" };
        f.debug_struct("Secrets")
            .field("gemini_api_key", &flag(&self.gemini_api_key))
            .field("telegram_token", &flag(&self.telegram_token))
            .field("telegram_chat_id", &flag(&self.telegram_chat_id))
            .field("google_credentials", &flag(&self.google_credentials))
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.pbnforge/`).
pub fn config_dir() -> Result<PathBuf> {
    let home =
        dirs::home_dir().ok_or_else(|| PbnError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.pbnforge/pbnforge.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| PbnError::io(path, e))?;

    toml::from_str(&content)
        .map_err(|e| PbnError::config(format!("failed to parse {}: {e}", path.display())))
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| PbnError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content = toml::to_string_pretty(&config).map_err(|e| PbnError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| PbnError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_serializes() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize default config");
        assert!(toml_str.contains("GEMINI_API_KEY"));
        assert!(toml_str.contains("results.json"));
    }

    #[test]
    fn config_roundtrip() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize");
        let parsed: AppConfig = toml::from_str(&toml_str).expect("deserialize");
        assert_eq!(parsed.wordpress.timeout_secs, 30);
        assert_eq!(parsed.wordpress.recent_posts, 5);
        assert_eq!(parsed.wordpress.max_links_per_post, 4);
        assert_eq!(parsed.generation.target_words, 600);
    }

    #[test]
    fn partial_config_fills_defaults() {
        let toml_str = r#"
[generation]
model = "gemini-2.0-flash"

[sheets]
spreadsheet_id = "sheet-123"
"#;
        let config: AppConfig = toml::from_str(toml_str).expect("parse");
        assert_eq!(config.generation.model, "gemini-2.0-flash");
        assert_eq!(config.generation.api_key_env, "GEMINI_API_KEY");
        assert_eq!(config.sheets.spreadsheet_id, "sheet-123");
        assert_eq!(config.sheets.worksheet, "Report");
        assert_eq!(config.output.results_path, PathBuf::from("results.json"));
    }

    #[test]
    fn secrets_resolve_from_named_vars() {
        let mut config = AppConfig::default();
        config.generation.api_key_env = "MY_GEMINI".into();
        let secrets = Secrets::from_lookup(&config, |name| match name {
            "MY_GEMINI" => Some("abc".into()),
            "TELEGRAM_BOT_TOKEN" => Some("  ".into()),
            _ => None,
        });
        assert_eq!(secrets.gemini_api_key.as_deref(), Some("abc"));
        assert!(secrets.telegram_token.is_none());
        assert!(secrets.google_credentials.is_none());
        assert!(!format!("{secrets:?}").contains("abc"));
    }
}
