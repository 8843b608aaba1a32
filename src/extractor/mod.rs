#![forbid(unsafe_code)]

//! The extractor capability: platform search/listing and media retrieval.
//! The pipeline only talks to this trait; `ytdlp` is the real backend.

pub mod ytdlp;

use crate::error::ExtractorError;
use std::path::{Path, PathBuf};

/// One metadata-only listing request against a search URL or playlist.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListQuery {
    pub target: String,
    /// 1-based inclusive `(start, end)` slice of the playlist, when the
    /// backend supports true offset paging.
    pub window: Option<(usize, usize)>,
}

impl ListQuery {
    pub fn whole(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            window: None,
        }
    }

    pub fn window(target: impl Into<String>, start: usize, end: usize) -> Self {
        Self {
            target: target.into(),
            window: Some((start, end)),
        }
    }
}

/// Flat listing: playlist-level names plus shallow entries.
#[derive(Debug, Clone, Default)]
pub struct Listing {
    pub title: Option<String>,
    pub uploader: Option<String>,
    pub channel: Option<String>,
    pub entries: Vec<ListingEntry>,
}

impl Listing {
    /// Best human-readable owner name: uploader, then channel, then title.
    pub fn display_name(&self) -> Option<&str> {
        [&self.uploader, &self.channel, &self.title]
            .into_iter()
            .filter_map(|value| value.as_deref())
            .map(str::trim)
            .find(|value| !value.is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingEntry {
    pub id: String,
    pub url: Option<String>,
    pub title: Option<String>,
}

impl ListingEntry {
    /// Whether the listing URL points at the short-form category.
    pub fn is_short(&self) -> bool {
        self.url
            .as_deref()
            .is_some_and(|url| url.to_ascii_lowercase().contains("shorts"))
    }
}

pub trait Extractor: Send + Sync {
    /// Metadata-only, flat listing. Never downloads media.
    fn list(&self, query: &ListQuery) -> Result<Listing, ExtractorError>;

    /// Downloads `item_url` using `output_template` (which may contain the
    /// `%(ext)s` placeholder) and returns the path actually written.
    fn fetch(&self, item_url: &str, output_template: &Path) -> Result<PathBuf, ExtractorError>;
}

impl<E: Extractor + ?Sized> Extractor for &E {
    fn list(&self, query: &ListQuery) -> Result<Listing, ExtractorError> {
        (**self).list(query)
    }

    fn fetch(&self, item_url: &str, output_template: &Path) -> Result<PathBuf, ExtractorError> {
        (**self).fetch(item_url, output_template)
    }
}
