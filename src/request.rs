#![forbid(unsafe_code)]

//! Request and response shapes exchanged with the API layer.

use crate::channel::ChannelReference;
use crate::error::PipelineError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const MAX_RESULTS_LIMIT: u32 = 100;
const SUCCESS_MESSAGE: &str = "Video downloaded successfully";

/// What to search for. Exactly one mode per request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchRequest {
    Keyword { query: String, max_results: u32 },
    Channel { channel: ChannelReference, max_results: u32 },
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RequestError {
    #[error("query must not be empty")]
    EmptyQuery,

    #[error("channel_url must not be empty")]
    EmptyChannel,

    #[error("max_results must be between 1 and {MAX_RESULTS_LIMIT}, got {0}")]
    MaxResultsOutOfRange(u32),
}

impl SearchRequest {
    pub fn keyword(query: &str, max_results: u32) -> Result<Self, RequestError> {
        let query = query.trim();
        if query.is_empty() {
            return Err(RequestError::EmptyQuery);
        }
        Ok(Self::Keyword {
            query: query.to_string(),
            max_results: check_max_results(max_results)?,
        })
    }

    /// Resolves `channel_url` into a [`ChannelReference`]; unrecognised input
    /// is kept verbatim for the extractor to interpret.
    pub fn channel(channel_url: &str, max_results: u32) -> Result<Self, RequestError> {
        let channel_url = channel_url.trim();
        if channel_url.is_empty() {
            return Err(RequestError::EmptyChannel);
        }
        Ok(Self::Channel {
            channel: ChannelReference::resolve(channel_url),
            max_results: check_max_results(max_results)?,
        })
    }

    pub fn max_results(&self) -> usize {
        match self {
            Self::Keyword { max_results, .. } | Self::Channel { max_results, .. } => {
                *max_results as usize
            }
        }
    }

    pub fn mode(&self) -> &'static str {
        match self {
            Self::Keyword { .. } => "keyword",
            Self::Channel { .. } => "channel",
        }
    }
}

fn check_max_results(value: u32) -> Result<u32, RequestError> {
    if (1..=MAX_RESULTS_LIMIT).contains(&value) {
        Ok(value)
    } else {
        Err(RequestError::MaxResultsOutOfRange(value))
    }
}

/// Wire shape of `POST /videos/download`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "search_type", rename_all = "snake_case")]
pub enum DownloadRequest {
    Keyword { query: String, max_results: u32 },
    Channel { channel_url: String, max_results: u32 },
}

impl TryFrom<DownloadRequest> for SearchRequest {
    type Error = RequestError;

    fn try_from(request: DownloadRequest) -> Result<Self, Self::Error> {
        match request {
            DownloadRequest::Keyword { query, max_results } => Self::keyword(&query, max_results),
            DownloadRequest::Channel {
                channel_url,
                max_results,
            } => Self::channel(&channel_url, max_results),
        }
    }
}

/// Payload returned to the API layer for both outcomes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DownloadResponse {
    Success {
        success: bool,
        message: String,
        video_urls: Vec<String>,
    },
    Failure {
        success: bool,
        kind: String,
        message: String,
    },
}

impl DownloadResponse {
    pub fn success(video_urls: Vec<String>) -> Self {
        Self::Success {
            success: true,
            message: SUCCESS_MESSAGE.to_string(),
            video_urls,
        }
    }

    pub fn failure(kind: &str, message: impl Into<String>) -> Self {
        Self::Failure {
            success: false,
            kind: kind.to_string(),
            message: message.into(),
        }
    }

    pub fn invalid_request(err: &RequestError) -> Self {
        Self::failure("invalid_request", err.to_string())
    }

    pub fn from_error(err: &PipelineError) -> Self {
        Self::failure(err.kind(), err.to_string())
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::ChannelKind;
    use serde_json::json;

    #[test]
    fn parses_keyword_request() {
        let request: DownloadRequest = serde_json::from_value(json!({
            "search_type": "keyword",
            "query": "cats",
            "max_results": 3
        }))
        .unwrap();
        let search = SearchRequest::try_from(request).unwrap();
        assert_eq!(
            search,
            SearchRequest::Keyword {
                query: "cats".into(),
                max_results: 3
            }
        );
        assert_eq!(search.max_results(), 3);
        assert_eq!(search.mode(), "keyword");
    }

    #[test]
    fn parses_channel_request_and_resolves_reference() {
        let request: DownloadRequest = serde_json::from_value(json!({
            "search_type": "channel",
            "channel_url": "https://x.com/@foo",
            "max_results": 100
        }))
        .unwrap();
        match SearchRequest::try_from(request).unwrap() {
            SearchRequest::Channel {
                channel,
                max_results,
            } => {
                assert_eq!(channel.kind, ChannelKind::Handle);
                assert_eq!(channel.value, "@foo");
                assert_eq!(max_results, 100);
            }
            other => panic!("unexpected request {other:?}"),
        }
    }

    #[test]
    fn rejects_unknown_search_type() {
        let parsed = serde_json::from_value::<DownloadRequest>(json!({
            "search_type": "playlist",
            "query": "x",
            "max_results": 1
        }));
        assert!(parsed.is_err());
    }

    #[test]
    fn validates_bounds_and_empty_fields() {
        assert_eq!(
            SearchRequest::keyword("cats", 0).unwrap_err(),
            RequestError::MaxResultsOutOfRange(0)
        );
        assert_eq!(
            SearchRequest::keyword("cats", 101).unwrap_err(),
            RequestError::MaxResultsOutOfRange(101)
        );
        assert_eq!(
            SearchRequest::keyword("   ", 5).unwrap_err(),
            RequestError::EmptyQuery
        );
        assert_eq!(
            SearchRequest::channel("", 5).unwrap_err(),
            RequestError::EmptyChannel
        );
        assert!(SearchRequest::keyword("cats", 1).is_ok());
        assert!(SearchRequest::keyword("cats", 100).is_ok());
    }

    #[test]
    fn response_payloads_serialize_like_the_api() {
        let ok = DownloadResponse::success(vec!["/videosList/1_a_combined.mp4".into()]);
        assert_eq!(
            serde_json::to_value(&ok).unwrap(),
            json!({
                "success": true,
                "message": "Video downloaded successfully",
                "video_urls": ["/videosList/1_a_combined.mp4"]
            })
        );

        let failed = DownloadResponse::from_error(&PipelineError::BatchFailed { attempted: 2 });
        assert!(!failed.is_success());
        assert_eq!(
            serde_json::to_value(&failed).unwrap(),
            json!({
                "success": false,
                "kind": "batch_failed",
                "message": "failed to download any of the 2 selected videos"
            })
        );
    }
}
