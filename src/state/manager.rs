//! Atomic persistence of run reports.

use super::RunReport;
use crate::error::{Result, StateError};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

/// Writes run reports to a fixed path
#[derive(Debug, Clone)]
pub struct StateManager {
    report_path: PathBuf,
}

/// Result of a save
#[derive(Debug)]
pub struct SaveStateResult {
    /// Size of the written file in bytes
    pub file_size_bytes: u64,
    /// Time spent saving
    pub save_duration: Duration,
}

impl StateManager {
    /// Manager writing to `report_path`
    pub fn new<P: AsRef<Path>>(report_path: P) -> Self {
        Self {
            report_path: report_path.as_ref().to_path_buf(),
        }
    }

    /// Target path
    pub fn path(&self) -> &Path {
        &self.report_path
    }

    /// Save via temp file + rename so readers never see a partial report
    pub fn save(&self, report: &RunReport) -> Result<SaveStateResult> {
        let start = Instant::now();
        let fail = |reason: String| StateError::SaveFailed {
            path: self.report_path.clone(),
            reason,
        };

        let serialized = serde_json::to_string_pretty(report)
            .map_err(|e| fail(format!("Failed to serialize report: {e}")))?;

        if let Some(parent) = self.report_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .map_err(|e| fail(format!("Failed to create directory: {e}")))?;
        }

        let temp_path = self.report_path.with_extension("tmp");
        {
            let mut file = fs::File::create(&temp_path)
                .map_err(|e| fail(format!("Failed to create temp file: {e}")))?;
            file.write_all(serialized.as_bytes())
                .map_err(|e| fail(format!("Failed to write report: {e}")))?;
            file.sync_all()
                .map_err(|e| fail(format!("Failed to sync file: {e}")))?;
        }

        fs::rename(&temp_path, &self.report_path)
            .map_err(|e| fail(format!("Failed to rename temp file: {e}")))?;

        Ok(SaveStateResult {
            file_size_bytes: serialized.len() as u64,
            save_duration: start.elapsed(),
        })
    }
}
