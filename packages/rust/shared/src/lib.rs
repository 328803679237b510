//! Shared types, error model, and configuration for pbnforge.
//!
//! This crate is the foundation depended on by all other pbnforge crates.
//! It provides:
//! - [`PbnError`]: the unified error type
//! - Domain types ([`SiteTask`], [`ValidTask`], [`GeneratedArticle`], [`PublishResult`])
//! - Configuration ([`AppConfig`], [`Secrets`], config loading)

pub mod config;
pub mod error;
pub mod html;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, GenerationConfig, OutputConfig, ReportingConfig, Secrets, SheetsConfig,
    TelegramConfig, WordPressConfig, config_dir, config_file_path, init_config, load_config,
    load_config_from,
};
pub use error::{PbnError, Result};
pub use html::escape_html;
pub use types::{
    AuthorStyle, Credentials, GeneratedArticle, PublishResult, PublishStatus, SiteTask,
    SkippedTask, TaskRecord, ValidTask,
};
