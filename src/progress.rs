#![forbid(unsafe_code)]

//! JSON progress file polled by whoever launched the run.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressReport {
    pub progress: u8,
    pub message: String,
}

/// Writes [`ProgressReport`]s with a tmp-file swap so readers never see a
/// half-written document. Failures are logged and otherwise ignored.
#[derive(Debug, Clone)]
pub struct ProgressWriter {
    path: PathBuf,
}

impl ProgressWriter {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn write(&self, progress: u8, message: &str) {
        let report = ProgressReport {
            progress: progress.min(100),
            message: message.to_string(),
        };

        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
            && let Err(err) = fs::create_dir_all(parent)
        {
            warn!(path = %parent.display(), error = %err, "could not create progress dir");
            return;
        }

        let payload = match serde_json::to_vec(&report) {
            Ok(payload) => payload,
            Err(err) => {
                warn!(error = %err, "could not serialize progress report");
                return;
            }
        };

        let tmp_path = self.path.with_extension("tmp");
        if let Err(err) = fs::write(&tmp_path, payload) {
            warn!(path = %tmp_path.display(), error = %err, "could not write progress file");
            return;
        }
        if let Err(err) = fs::rename(&tmp_path, &self.path) {
            warn!(path = %self.path.display(), error = %err, "could not finalize progress file");
        }
    }
}

pub fn update_progress(progress: Option<&ProgressWriter>, percent: u8, message: &str) {
    if let Some(writer) = progress {
        writer.write(percent, message);
    }
}

/// Reads the last report, if any. Missing or malformed files yield `None`.
pub fn read_progress(path: &Path) -> Option<ProgressReport> {
    let data = fs::read(path).ok()?;
    serde_json::from_slice(&data).ok()
}
