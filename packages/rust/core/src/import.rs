//! Spreadsheet CSV export → tasks JSON.

use std::path::Path;

use serde::Deserialize;
use tracing::{debug, info};

use pbnforge_shared::{AuthorStyle, PbnError, Result, SiteTask};

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct CsvRow {
    #[serde(rename = "Site URL")]
    site_url: String,
    #[serde(rename = "Login")]
    login: String,
    #[serde(rename = "App Password")]
    app_password: String,
    #[serde(rename = "Target Link")]
    target_url: String,
    #[serde(rename = "Anchor Text")]
    anchor: String,
    #[serde(rename = "Article Topic")]
    topic: String,
    #[serde(rename = "Author Style (expert/lifestyle/neutral)")]
    author_style: String,
}

impl CsvRow {
    /// `None` when the row lacks a site URL or application password.
    fn into_task(self) -> Option<SiteTask> {
        let site_url = self.site_url.trim().to_string();
        let app_password = self.app_password.trim().to_string();
        if site_url.is_empty() || app_password.is_empty() {
            return None;
        }

        let style = self.author_style.trim().to_lowercase();
        let style = if style.is_empty() {
            AuthorStyle::Neutral.as_str().to_string()
        } else {
            style
        };

        Some(SiteTask {
            site_url: Some(site_url),
            login: Some(self.login.trim().to_string()),
            app_password: Some(app_password),
            target_url: Some(self.target_url.trim().to_string()),
            anchor: Some(self.anchor.trim().to_string()),
            topic: Some(self.topic.trim().to_string()),
            author_style: Some(style),
        })
    }
}

/// Parse CSV rows into tasks, dropping incomplete rows.
pub fn parse_csv<R: std::io::Read>(reader: R) -> Result<Vec<SiteTask>> {
    let mut csv = csv::ReaderBuilder::new().flexible(true).from_reader(reader);
    let mut tasks = Vec::new();

    for (line, row) in csv.deserialize::<CsvRow>().enumerate() {
        let row = row.map_err(|e| PbnError::parse(format!("invalid CSV row {}: {e}", line + 1)))?;
        match row.into_task() {
            Some(task) => tasks.push(task),
            None => debug!(row = line + 1, "dropping row without site URL or app password"),
        }
    }
    Ok(tasks)
}

/// Convert `csv_path` into a tasks JSON file at `json_path`. Returns the
/// number of imported rows.
pub fn import_csv(csv_path: &Path, json_path: &Path) -> Result<usize> {
    let file = std::fs::File::open(csv_path).map_err(|e| PbnError::io(csv_path, e))?;
    let tasks = parse_csv(file)?;

    let json = serde_json::to_string_pretty(&tasks)
        .map_err(|e| PbnError::parse(format!("failed to serialize tasks: {e}")))?;
    std::fs::write(json_path, json).map_err(|e| PbnError::io(json_path, e))?;

    info!(
        from = %csv_path.display(),
        to = %json_path.display(),
        count = tasks.len(),
        "tasks imported"
    );
    Ok(tasks.len())
}
