#![forbid(unsafe_code)]

//! Fetches accepted candidates one at a time and records each success in the
//! ledger before moving on.

use crate::error::DownloadError;
use crate::extractor::Extractor;
use crate::layout::{StorageLayout, output_template};
use crate::ledger::Ledger;
use crate::progress::{ProgressWriter, update_progress};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

const SHORTS_URL_BASE: &str = "https://www.youtube.com/shorts";

/// An identifier selected for download and its 1-based place in the batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub id: String,
    pub position: usize,
}

impl Candidate {
    /// Numbers `ids` from 1 in the order given.
    pub fn batch(ids: Vec<String>) -> Vec<Self> {
        ids.into_iter()
            .enumerate()
            .map(|(index, id)| Self {
                id,
                position: index + 1,
            })
            .collect()
    }
}

/// A file written by a successful download.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Artifact {
    pub id: String,
    pub position: usize,
    pub path: PathBuf,
    /// Public location under the file-serving prefix.
    pub url: String,
}

/// Per-candidate outcome. Failures are recorded here rather than returned.
#[derive(Debug, Clone, Serialize)]
pub struct DownloadResult {
    pub id: String,
    pub position: usize,
    pub success: bool,
    pub artifact: Option<Artifact>,
    pub error: Option<String>,
}

pub struct Downloader<'a, E> {
    extractor: E,
    layout: &'a StorageLayout,
}

impl<'a, E: Extractor> Downloader<'a, E> {
    pub fn new(extractor: E, layout: &'a StorageLayout) -> Self {
        Self { extractor, layout }
    }

    /// Downloads one candidate into `destination` as
    /// `<position>_<id>_combined.<ext>` and records the id in `ledger`.
    pub fn download(
        &self,
        candidate: &Candidate,
        destination: &Path,
        ledger: &mut Ledger,
    ) -> Result<Artifact, DownloadError> {
        let id = candidate.id.as_str();
        if !is_safe_identifier(id) {
            return Err(DownloadError::InvalidIdentifier(id.to_string()));
        }

        let item_url = format!("{SHORTS_URL_BASE}/{id}");
        let template = output_template(destination, candidate.position, id);
        let path = self
            .extractor
            .fetch(&item_url, &template)
            .map_err(|source| DownloadError::Fetch {
                id: id.to_string(),
                source,
            })?;

        ledger
            .add_and_persist(id)
            .map_err(|source| DownloadError::Ledger {
                id: id.to_string(),
                source,
            })?;

        let url = self
            .layout
            .public_url(&path)
            .unwrap_or_else(|| path.to_string_lossy().into_owned());

        Ok(Artifact {
            id: id.to_string(),
            position: candidate.position,
            path,
            url,
        })
    }

    /// Runs every candidate strictly in order. One failure never stops the
    /// rest of the batch.
    pub fn run_batch(
        &self,
        candidates: &[Candidate],
        destination: &Path,
        ledger: &mut Ledger,
        progress: Option<&ProgressWriter>,
    ) -> Vec<DownloadResult> {
        let total = candidates.len();
        let mut results = Vec::with_capacity(total);

        for candidate in candidates {
            info!(
                position = candidate.position,
                total,
                id = %candidate.id,
                "downloading video"
            );

            let result = match self.download(candidate, destination, ledger) {
                Ok(artifact) => {
                    info!(path = %artifact.path.display(), "downloaded video");
                    DownloadResult {
                        id: candidate.id.clone(),
                        position: candidate.position,
                        success: true,
                        artifact: Some(artifact),
                        error: None,
                    }
                }
                Err(err) => {
                    warn!(id = %candidate.id, error = %err, "download failed, skipping");
                    DownloadResult {
                        id: candidate.id.clone(),
                        position: candidate.position,
                        success: false,
                        artifact: None,
                        error: Some(err.to_string()),
                    }
                }
            };
            results.push(result);

            if total > 0 {
                let percent = 20 + (results.len() * 80 / total) as u8;
                update_progress(
                    progress,
                    percent.min(99),
                    &format!("Downloaded {}/{}", results.len(), total),
                );
            }
        }

        results
    }
}

/// Platform ids are `[A-Za-z0-9_-]`; anything else could escape the
/// destination directory or collide with the template syntax.
fn is_safe_identifier(id: &str) -> bool {
    !id.is_empty()
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}
