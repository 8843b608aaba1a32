#![forbid(unsafe_code)]

//! Pages through keyword search results or a channel's Shorts tab until
//! enough unseen candidates are collected.

use crate::channel::ChannelReference;
use crate::error::PipelineError;
use crate::extractor::{Extractor, ListQuery, ListingEntry};
use crate::request::SearchRequest;
use std::collections::HashSet;
use tracing::{debug, info, warn};

pub const DEFAULT_PAGE_SIZE: usize = 50;
pub const DEFAULT_MAX_PAGE_ATTEMPTS: usize = 10;

/// Result of asking the extractor for one page.
enum Page {
    /// Every entry in the page window, before ledger filtering.
    Entries(Vec<ListingEntry>),
    Failed,
}

pub struct Paginator<E> {
    extractor: E,
    page_size: usize,
    max_page_attempts: usize,
}

impl<E: Extractor> Paginator<E> {
    pub fn new(extractor: E, page_size: usize, max_page_attempts: usize) -> Self {
        Self {
            extractor,
            page_size: page_size.max(1),
            max_page_attempts: max_page_attempts.max(1),
        }
    }

    /// Collects up to `request.max_results()` identifiers that are not in
    /// `already_seen`, in discovery order and without duplicates.
    ///
    /// Stops at the target count, on the first page that adds nothing new
    /// (including a first page whose videos were all seen before), or after
    /// `max_page_attempts` pages. A page whose listing fails is logged and
    /// skipped; it still uses up an attempt. An empty or failed first page
    /// means the query or channel itself is bad.
    pub fn find_candidates(
        &self,
        request: &SearchRequest,
        already_seen: &HashSet<String>,
    ) -> Result<Vec<String>, PipelineError> {
        let wanted = request.max_results();
        let mut accepted: Vec<String> = Vec::new();
        let mut page = 1;

        info!(mode = request.mode(), wanted, "searching for videos");

        while accepted.len() < wanted && page <= self.max_page_attempts {
            debug!(page, "requesting page");
            let entries = match self.fetch_page(request, page) {
                Page::Entries(entries) => entries,
                Page::Failed if page == 1 => {
                    return Err(PipelineError::NoVideosFound {
                        reason: "the first search page could not be retrieved".into(),
                    });
                }
                Page::Failed => {
                    page += 1;
                    continue;
                }
            };

            if entries.is_empty() {
                if page == 1 {
                    return Err(PipelineError::NoVideosFound {
                        reason: "no videos matched the search criteria".into(),
                    });
                }
                debug!(page, "no more results");
                break;
            }

            let before = accepted.len();
            let fresh = entries
                .into_iter()
                .map(|entry| entry.id)
                .filter(|id| !already_seen.contains(id));
            accepted.extend(fresh);
            dedup_preserving_order(&mut accepted);

            if accepted.len() == before {
                debug!(page, "page had no new videos");
                break;
            }

            info!(page, found = accepted.len(), wanted, "collected unique videos");
            page += 1;
        }

        accepted.truncate(wanted);
        Ok(accepted)
    }

    fn fetch_page(&self, request: &SearchRequest, page: usize) -> Page {
        let start = (page - 1) * self.page_size;
        let end = start + self.page_size;

        let result = match request {
            // The search endpoint always restarts from the top, so ask for
            // everything up to this page and drop what earlier pages saw.
            SearchRequest::Keyword { query, .. } => self
                .extractor
                .list(&ListQuery::whole(keyword_target(query, end)))
                .map(|listing| listing.entries.into_iter().skip(start).collect::<Vec<_>>()),
            SearchRequest::Channel { channel, .. } => self
                .extractor
                .list(&channel_page_query(channel, start, end))
                .map(|listing| {
                    listing
                        .entries
                        .into_iter()
                        .take(self.page_size)
                        .filter(ListingEntry::is_short)
                        .collect::<Vec<_>>()
                }),
        };

        match result {
            Ok(entries) => Page::Entries(entries),
            Err(err) => {
                warn!(page, error = %err, "search page failed");
                Page::Failed
            }
        }
    }
}

fn keyword_target(query: &str, count: usize) -> String {
    format!("ytsearch{count}:{query} shorts")
}

fn channel_page_query(channel: &ChannelReference, start: usize, end: usize) -> ListQuery {
    ListQuery::window(channel.shorts_url(), start + 1, end)
}

/// Keeps the first occurrence of every id.
fn dedup_preserving_order(ids: &mut Vec<String>) {
    let mut seen = HashSet::with_capacity(ids.len());
    ids.retain(|id| seen.insert(id.clone()));
}
