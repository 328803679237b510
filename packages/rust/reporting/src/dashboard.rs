//! Executive dashboard: run metrics, persona analytics and cost estimate.
//!
//! Inputs are the results manifest and the generation log. Outputs are two
//! CSV reports plus a row in the metrics store.

use std::collections::BTreeMap;
use std::path::Path;

use chrono::Utc;
use tracing::{info, instrument, warn};

use pbnforge_generator::{GenerationLogEntry, read_log};
use pbnforge_shared::{PbnError, PublishResult, ReportingConfig, Result};
use pbnforge_storage::{MetricsStore, PersonaStat, PublicationRecord};

// ---------------------------------------------------------------------------
// Persona accumulation
// ---------------------------------------------------------------------------

/// Running totals for one persona.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StyleStats {
    pub count: u64,
    /// Sum of response lengths, in characters.
    pub total_length: u64,
}

impl StyleStats {
    /// Integer average length, 0 for an empty bucket.
    pub fn average_length(&self) -> u64 {
        if self.count == 0 {
            0
        } else {
            self.total_length / self.count
        }
    }
}

/// Per-style totals built from the generation log.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StyleAccumulator {
    styles: BTreeMap<String, StyleStats>,
}

impl StyleAccumulator {
    pub fn from_log(entries: &[GenerationLogEntry]) -> Self {
        let mut acc = Self::default();
        for entry in entries {
            acc.add(&entry.style, entry.response.chars().count() as u64);
        }
        acc
    }

    pub fn add(&mut self, style: &str, length: u64) {
        let stats = self.styles.entry(style.to_string()).or_default();
        stats.count += 1;
        stats.total_length += length;
    }

    pub fn get(&self, style: &str) -> Option<&StyleStats> {
        self.styles.get(style)
    }

    /// Styles in alphabetical order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &StyleStats)> {
        self.styles.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn total_chars(&self) -> u64 {
        self.styles.values().map(|s| s.total_length).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.styles.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Metrics
// ---------------------------------------------------------------------------

/// Everything the dashboard reports for one run.
#[derive(Debug, Clone, PartialEq)]
pub struct DashboardMetrics {
    pub total_sites: u64,
    pub successful: u64,
    pub errors: u64,
    pub old_posts_updated: u64,
    pub new_posts_created: u64,
    pub estimated_cost_usd: f64,
    pub styles: StyleAccumulator,
}

/// Estimated generation cost in USD.
pub fn estimate_cost(total_chars: u64, chars_per_token: f64, price_per_million_tokens: f64) -> f64 {
    if chars_per_token <= 0.0 {
        return 0.0;
    }
    let tokens = total_chars as f64 / chars_per_token;
    tokens / 1_000_000.0 * price_per_million_tokens
}

impl DashboardMetrics {
    pub fn compute(
        results: &[PublishResult],
        log: &[GenerationLogEntry],
        config: &ReportingConfig,
    ) -> Self {
        let total_sites = results.len() as u64;
        let successful = results.iter().filter(|r| r.is_success()).count() as u64;
        let old_posts_updated = results
            .iter()
            .filter(|r| r.updated_old_post.is_some())
            .count() as u64;
        let styles = StyleAccumulator::from_log(log);
        let estimated_cost_usd = estimate_cost(
            styles.total_chars(),
            config.chars_per_token,
            config.price_per_million_tokens,
        );

        Self {
            total_sites,
            successful,
            errors: total_sites - successful,
            old_posts_updated,
            new_posts_created: successful,
            estimated_cost_usd,
            styles,
        }
    }

    /// `(metric, value, description)` rows of the execution summary.
    pub fn summary_rows(&self) -> Vec<(&'static str, u64, &'static str)> {
        vec![
            ("Total Sites", self.total_sites, "Sites in the task list"),
            ("Successful Posts", self.successful, "Published without errors"),
            ("Errors", self.errors, "Failures (timeouts, bad passwords)"),
            (
                "Old Posts Updated",
                self.old_posts_updated,
                "Links added to existing content",
            ),
            (
                "New Posts Created",
                self.new_posts_created,
                "New pages created from scratch",
            ),
        ]
    }
}

// ---------------------------------------------------------------------------
// CSV reports
// ---------------------------------------------------------------------------

fn csv_err(path: &Path, e: impl std::fmt::Display) -> PbnError {
    PbnError::Report(format!("{}: {e}", path.display()))
}

/// `expert` → `Expert`.
fn capitalize(style: &str) -> String {
    let lower = style.to_lowercase();
    let mut chars = lower.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Write `execution_summary.csv`.
pub fn write_summary_csv(path: &Path, metrics: &DashboardMetrics) -> Result<()> {
    let mut writer = csv::Writer::from_path(path).map_err(|e| csv_err(path, e))?;
    writer
        .write_record(["Metric", "Value", "Description"])
        .map_err(|e| csv_err(path, e))?;
    for (metric, value, description) in metrics.summary_rows() {
        let value = value.to_string();
        writer
            .write_record([metric, value.as_str(), description])
            .map_err(|e| csv_err(path, e))?;
    }
    writer.flush().map_err(|e| PbnError::io(path, e))
}

/// Write `persona_analytics.csv`.
pub fn write_persona_csv(path: &Path, metrics: &DashboardMetrics) -> Result<()> {
    let mut writer = csv::Writer::from_path(path).map_err(|e| csv_err(path, e))?;
    writer
        .write_record(["Persona", "Posts", "Avg Length (chars)"])
        .map_err(|e| csv_err(path, e))?;
    for (style, stats) in metrics.styles.iter() {
        writer
            .write_record([
                capitalize(style),
                stats.count.to_string(),
                stats.average_length().to_string(),
            ])
            .map_err(|e| csv_err(path, e))?;
    }
    writer.flush().map_err(|e| PbnError::io(path, e))
}

// ---------------------------------------------------------------------------
// Metrics store
// ---------------------------------------------------------------------------

/// Append this run's aggregates to the metrics store.
pub async fn record_metrics(store: &MetricsStore, metrics: &DashboardMetrics) -> Result<()> {
    store
        .record_publication(&PublicationRecord {
            timestamp: Utc::now(),
            success_count: metrics.successful,
            error_count: metrics.errors,
            links_inserted: metrics.old_posts_updated,
            cost_usd: metrics.estimated_cost_usd,
        })
        .await?;

    let stats: Vec<PersonaStat> = metrics
        .styles
        .iter()
        .map(|(style, s)| PersonaStat {
            persona: style.to_string(),
            posts_count: s.count,
            avg_length: s.average_length(),
        })
        .collect();
    store.record_persona_stats(&stats).await
}

/// Compute metrics, write both CSV reports and sync the metrics store.
///
/// CSV failures are returned; a metrics store failure is only logged.
#[instrument(skip_all, fields(results = results.len(), log = %log_path.display()))]
pub async fn generate_dashboard(
    results: &[PublishResult],
    log_path: &Path,
    config: &ReportingConfig,
) -> Result<DashboardMetrics> {
    let log = read_log(log_path)?;
    let metrics = DashboardMetrics::compute(results, &log, config);

    write_summary_csv(&config.summary_csv, &metrics)?;
    write_persona_csv(&config.persona_csv, &metrics)?;
    info!(
        summary = %config.summary_csv.display(),
        personas = %config.persona_csv.display(),
        "CSV reports written"
    );

    match MetricsStore::open(&config.metrics_db).await {
        Ok(store) => match record_metrics(&store, &metrics).await {
            Ok(()) => info!(db = %config.metrics_db.display(), "metrics store updated"),
            Err(e) => warn!(error = %e, "failed to record metrics"),
        },
        Err(e) => warn!(error = %e, "failed to open metrics store"),
    }

    Ok(metrics)
}
