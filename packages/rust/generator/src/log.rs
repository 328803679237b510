//! Append-only NDJSON log of generation attempts.
//!
//! The log feeds the persona analytics in the dashboard. Writing to it is
//! best-effort: the generator logs and ignores any error returned here.

use std::fs::OpenOptions;
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use chrono::Utc;
use serde::{Deserialize, Serialize};

use pbnforge_shared::{PbnError, Result};

/// One line of `generation_logs.jsonl`.
///
/// Every field defaults on read so partially written or older entries
/// still contribute to reports.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationLogEntry {
    #[serde(default)]
    pub timestamp: String,
    #[serde(default)]
    pub topic: String,
    #[serde(default = "unknown_style")]
    pub style: String,
    #[serde(default)]
    pub prompt: String,
    /// Raw model text; empty when the attempt failed.
    #[serde(default)]
    pub response: String,
    #[serde(default)]
    pub model: String,
}

fn unknown_style() -> String {
    "unknown".into()
}

impl GenerationLogEntry {
    /// New entry stamped with the current time.
    pub fn now(
        topic: &str,
        style: &str,
        prompt: &str,
        response: &str,
        model: &str,
    ) -> Self {
        Self {
            timestamp: Utc::now().to_rfc3339(),
            topic: topic.to_string(),
            style: style.to_string(),
            prompt: prompt.to_string(),
            response: response.to_string(),
            model: model.to_string(),
        }
    }
}

/// Handle to the log file.
#[derive(Debug, Clone)]
pub struct GenerationLog {
    path: PathBuf,
}

impl GenerationLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one entry as a single line.
    pub fn append(&self, entry: &GenerationLogEntry) -> Result<()> {
        let line = serde_json::to_string(entry).map_err(|e| PbnError::parse(e.to_string()))?;

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| PbnError::io(&self.path, e))?;

        writeln!(file, "{line}").map_err(|e| PbnError::io(&self.path, e))
    }
}

/// Read every parseable entry from a log file, skipping malformed lines.
///
/// A missing file yields an empty list.
pub fn read_log(path: &Path) -> Result<Vec<GenerationLogEntry>> {
    if !path.exists() {
        return Ok(Vec::new());
    }

    let file = std::fs::File::open(path).map_err(|e| PbnError::io(path, e))?;
    let mut entries = Vec::new();

    for line in BufReader::new(file).lines() {
        let line = line.map_err(|e| PbnError::io(path, e))?;
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<GenerationLogEntry>(&line) {
            Ok(entry) => entries.push(entry),
            Err(e) => tracing::debug!(error = %e, "skipping malformed generation log line"),
        }
    }

    Ok(entries)
}
