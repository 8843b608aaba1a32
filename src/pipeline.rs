#![forbid(unsafe_code)]

//! One discovery, dedup and download run, from request to artifact list.
//!
//! Stages run strictly in order:
//! `Init -> ResolvingTarget (channel only) -> PreparingStorage -> LoadingLedger
//! -> Searching -> Downloading -> Done`. Any terminal condition moves the run
//! to `Failed` and is returned as a [`PipelineError`]. Nothing is retried.

use crate::channel::sanitize_channel_name;
use crate::download::{Artifact, Candidate, DownloadResult, Downloader};
use crate::error::PipelineError;
use crate::extractor::{Extractor, ListQuery};
use crate::layout::StorageLayout;
use crate::ledger::Ledger;
use crate::progress::{ProgressWriter, update_progress};
use crate::request::SearchRequest;
use crate::search::{DEFAULT_MAX_PAGE_ATTEMPTS, DEFAULT_PAGE_SIZE, Paginator};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use std::path::PathBuf;
use tracing::{debug, error, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Init,
    ResolvingTarget,
    PreparingStorage,
    LoadingLedger,
    Searching,
    Downloading,
    Done,
    Failed,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Init => "init",
            Self::ResolvingTarget => "resolving_target",
            Self::PreparingStorage => "preparing_storage",
            Self::LoadingLedger => "loading_ledger",
            Self::Searching => "searching",
            Self::Downloading => "downloading",
            Self::Done => "done",
            Self::Failed => "failed",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub layout: StorageLayout,
    pub ledger_path: PathBuf,
    pub page_size: usize,
    pub max_page_attempts: usize,
}

impl PipelineSettings {
    pub fn new(layout: StorageLayout, ledger_path: impl Into<PathBuf>) -> Self {
        Self {
            layout,
            ledger_path: ledger_path.into(),
            page_size: DEFAULT_PAGE_SIZE,
            max_page_attempts: DEFAULT_MAX_PAGE_ATTEMPTS,
        }
    }
}

/// Outcome of a run that reached `Done`.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub destination: PathBuf,
    pub channel_name: Option<String>,
    pub results: Vec<DownloadResult>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl RunReport {
    /// Successful downloads in position order.
    pub fn artifacts(&self) -> impl Iterator<Item = &Artifact> {
        self.results
            .iter()
            .filter_map(|result| result.artifact.as_ref())
    }

    pub fn video_urls(&self) -> Vec<String> {
        self.artifacts().map(|artifact| artifact.url.clone()).collect()
    }

    pub fn failed(&self) -> usize {
        self.results.iter().filter(|result| !result.success).count()
    }
}

pub struct Pipeline<E> {
    extractor: E,
    settings: PipelineSettings,
    progress: Option<ProgressWriter>,
}

impl<E: Extractor> Pipeline<E> {
    pub fn new(extractor: E, settings: PipelineSettings) -> Self {
        Self {
            extractor,
            settings,
            progress: None,
        }
    }

    pub fn with_progress(mut self, progress: Option<ProgressWriter>) -> Self {
        self.progress = progress;
        self
    }

    pub fn settings(&self) -> &PipelineSettings {
        &self.settings
    }

    pub fn run(&self, request: &SearchRequest) -> Result<RunReport, PipelineError> {
        let started_at = Utc::now();
        self.enter(Stage::Init, 0, "Starting");

        match self.run_stages(request, started_at) {
            Ok(report) => {
                self.enter(Stage::Done, 100, "Done");
                info!(
                    downloaded = report.artifacts().count(),
                    failed = report.failed(),
                    destination = %report.destination.display(),
                    "run finished"
                );
                Ok(report)
            }
            Err(err) => {
                self.enter(Stage::Failed, 100, &err.to_string());
                match &err {
                    PipelineError::Unexpected { source } => {
                        error!(kind = err.kind(), cause = %source, "run failed")
                    }
                    _ => error!(kind = err.kind(), error = %err, "run failed"),
                }
                Err(err)
            }
        }
    }

    fn run_stages(
        &self,
        request: &SearchRequest,
        started_at: DateTime<Utc>,
    ) -> Result<RunReport, PipelineError> {
        let channel_name = match request {
            SearchRequest::Channel { channel, .. } => {
                self.enter(Stage::ResolvingTarget, 2, "Resolving channel");
                Some(self.channel_name(&channel.to_url())?)
            }
            SearchRequest::Keyword { .. } => None,
        };

        self.enter(Stage::PreparingStorage, 5, "Preparing storage");
        let layout = &self.settings.layout;
        let destination = layout.destination(channel_name.as_deref());
        layout
            .prepare(&destination)
            .map_err(PipelineError::unexpected)?;

        self.enter(Stage::LoadingLedger, 8, "Loading download history");
        let mut ledger = Ledger::load(&self.settings.ledger_path)?;
        debug!(known = ledger.len(), path = %ledger.path().display(), "ledger loaded");

        self.enter(Stage::Searching, 10, "Searching for videos");
        let paginator = Paginator::new(
            &self.extractor,
            self.settings.page_size,
            self.settings.max_page_attempts,
        );
        let candidates = Candidate::batch(paginator.find_candidates(request, ledger.ids())?);
        info!(count = candidates.len(), "selected videos to download");

        self.enter(Stage::Downloading, 20, "Downloading videos");
        let downloader = Downloader::new(&self.extractor, layout);
        let results = downloader.run_batch(
            &candidates,
            &destination,
            &mut ledger,
            self.progress.as_ref(),
        );

        if !results.is_empty() && results.iter().all(|result| !result.success) {
            return Err(PipelineError::BatchFailed {
                attempted: results.len(),
            });
        }

        Ok(RunReport {
            destination,
            channel_name,
            results,
            started_at,
            finished_at: Utc::now(),
        })
    }

    /// Looks up the channel's display name and turns it into a directory
    /// name. Any failure here means the channel reference is unusable.
    fn channel_name(&self, channel_url: &str) -> Result<String, PipelineError> {
        let listing = self
            .extractor
            .list(&ListQuery::window(channel_url, 1, 1))
            .map_err(|err| PipelineError::InvalidChannel {
                reason: format!("could not look up channel {channel_url}: {err}"),
            })?;

        let name = listing
            .display_name()
            .and_then(sanitize_channel_name)
            .ok_or_else(|| PipelineError::InvalidChannel {
                reason: format!("could not determine a name for channel {channel_url}"),
            })?;
        info!(channel = %name, "resolved channel");
        Ok(name)
    }

    fn enter(&self, stage: Stage, percent: u8, message: &str) {
        info!(%stage, "entering stage");
        update_progress(self.progress.as_ref(), percent, message);
    }
}
