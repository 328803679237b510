//! Reporting sinks for pbnforge runs.
//!
//! - [`dashboard`]: metrics, CSV reports and the libSQL metrics store
//! - [`sheets`]: per-task rows in a Google spreadsheet
//! - [`telegram`]: daily summary message
//!
//! Every sink except the CSV reports is best-effort.

pub mod dashboard;
pub mod sheets;
pub mod telegram;

pub use dashboard::{
    DashboardMetrics, StyleAccumulator, StyleStats, estimate_cost, generate_dashboard,
    record_metrics, write_persona_csv, write_summary_csv,
};
pub use sheets::{ServiceAccountKey, SheetsLogger, format_row, log_run};
pub use telegram::{TelegramNotifier, format_report, notify_report};
