use std::fs;
use std::path::Path;

use crate::error::{HarnessError, Result};
use crate::report::RunReport;

pub fn save_report(report: &RunReport, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|source| HarnessError::Io {
            path: parent.to_path_buf(),
            source,
        })?;
    }

    let raw = report.to_json()?;
    fs::write(path, raw).map_err(|source| HarnessError::Io {
        path: path.to_path_buf(),
        source,
    })
}

pub fn load_report(path: &Path) -> Result<RunReport> {
    let raw = fs::read_to_string(path).map_err(|source| HarnessError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&raw).map_err(|e| {
        HarnessError::config(format!("Failed to parse report file `{}`: {e}", path.display()))
    })
}
