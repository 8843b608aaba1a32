#![forbid(unsafe_code)]

//! Error taxonomy shared by every stage of a run.

use std::path::PathBuf;
use thiserror::Error;

/// Failures reported by an extractor backend (yt-dlp or a test double).
#[derive(Debug, Error)]
pub enum ExtractorError {
    #[error("failed to launch {program}: {source}")]
    Spawn {
        program: String,
        source: std::io::Error,
    },

    #[error("extractor failed for {target} ({status}): {stderr}")]
    Failed {
        target: String,
        status: String,
        stderr: String,
    },

    #[error("could not parse extractor output for {target}: {source}")]
    Parse {
        target: String,
        source: serde_json::Error,
    },

    #[error("extractor reported no output file for {target}")]
    MissingOutput { target: String },
}

/// Failures while reading or writing the dedup ledger file.
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("reading ledger {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("ledger {} is not a JSON array of strings: {source}", .path.display())]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("writing ledger {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// A single candidate could not be fetched or recorded. Never aborts a batch.
#[derive(Debug, Error)]
pub enum DownloadError {
    #[error("refusing to build a file name from identifier {0:?}")]
    InvalidIdentifier(String),

    #[error("downloading {id}: {source}")]
    Fetch { id: String, source: ExtractorError },

    #[error("recording {id} in the ledger: {source}")]
    Ledger { id: String, source: LedgerError },
}

/// Terminal outcome of a run. Surfaced to the caller as-is, never retried.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("invalid channel: {reason}")]
    InvalidChannel { reason: String },

    #[error("no videos found: {reason}")]
    NoVideosFound { reason: String },

    #[error("failed to download any of the {attempted} selected videos")]
    BatchFailed { attempted: usize },

    /// Display stays generic; the cause is only reachable through `source()`.
    #[error("unexpected error occurred")]
    Unexpected {
        #[source]
        source: Box<dyn std::error::Error + Send + Sync + 'static>,
    },
}

impl PipelineError {
    pub fn unexpected(source: impl Into<Box<dyn std::error::Error + Send + Sync + 'static>>) -> Self {
        Self::Unexpected {
            source: source.into(),
        }
    }

    /// Stable tag handed to the API layer alongside the message.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidChannel { .. } => "invalid_channel",
            Self::NoVideosFound { .. } => "no_videos_found",
            Self::BatchFailed { .. } => "batch_failed",
            Self::Unexpected { .. } => "unexpected",
        }
    }
}

impl From<LedgerError> for PipelineError {
    fn from(err: LedgerError) -> Self {
        Self::unexpected(err)
    }
}
