//! Task list loading.

use std::path::Path;

use tracing::info;

use pbnforge_shared::{PbnError, Result, SiteTask};

/// Parse a JSON array of tasks.
pub fn parse_tasks(json: &str) -> Result<Vec<SiteTask>> {
    serde_json::from_str(json).map_err(|e| PbnError::parse(format!("invalid task list: {e}")))
}

/// Load tasks from `path`. No path means an empty batch.
///
/// Unreadable or malformed input is an error so the run aborts before any
/// task executes.
pub fn load_tasks(path: Option<&Path>) -> Result<Vec<SiteTask>> {
    let Some(path) = path else {
        info!("no task file given, nothing to run");
        return Ok(Vec::new());
    };

    let json = std::fs::read_to_string(path).map_err(|e| PbnError::io(path, e))?;
    let tasks = parse_tasks(&json)?;
    info!(path = %path.display(), count = tasks.len(), "tasks loaded");
    Ok(tasks)
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn null_and_missing_fields_are_accepted() {
        let tasks = parse_tasks(r#"[{"site_url": "https://s.example", "anchor": null}, {}]"#).unwrap();
        assert_eq!(tasks.len(), 2);
        assert_eq!(tasks[0].site_url.as_deref(), Some("https://s.example"));
        assert!(tasks[0].anchor.is_none());
        assert_eq!(tasks[1], SiteTask::default());
    }

    #[test]
    fn non_array_is_rejected() {
        assert!(parse_tasks(r#"{"site_url": "x"}"#).is_err());
        assert!(parse_tasks("[{").is_err());
    }

    #[test]
    fn no_path_is_empty() {
        assert!(load_tasks(None).unwrap().is_empty());
    }

    #[test]
    fn missing_file_is_an_error() {
        let path = std::env::temp_dir().join(format!("pbn_missing_{}.json", Uuid::now_v7()));
        let err = load_tasks(Some(&path)).unwrap_err();
        assert!(matches!(err, PbnError::Io { .. }));
    }
}
