//! `results.json`: the ordered list of publish results for the last run.

use std::path::Path;

use pbnforge_shared::{PbnError, PublishResult, Result};

/// Write the manifest as pretty-printed JSON, replacing any previous file.
pub fn write_results(path: &Path, results: &[PublishResult]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| PbnError::io(parent, e))?;
    }
    let json = serde_json::to_string_pretty(results)
        .map_err(|e| PbnError::parse(format!("failed to serialize results: {e}")))?;
    std::fs::write(path, json).map_err(|e| PbnError::io(path, e))
}

/// Read a manifest. A missing file is an error.
pub fn read_results(path: &Path) -> Result<Vec<PublishResult>> {
    let json = std::fs::read_to_string(path).map_err(|e| PbnError::io(path, e))?;
    serde_json::from_str(&json)
        .map_err(|e| PbnError::parse(format!("invalid results file {}: {e}", path.display())))
}
