#![forbid(unsafe_code)]

//! Discovers Shorts by keyword or channel, skips the ones already fetched and
//! downloads the rest into a predictable directory tree.

pub mod channel;
pub mod config;
pub mod download;
pub mod error;
pub mod extractor;
pub mod layout;
pub mod ledger;
pub mod logging;
pub mod pipeline;
pub mod progress;
pub mod request;
pub mod search;
pub mod security;

pub use channel::{ChannelKind, ChannelReference};
pub use error::{DownloadError, ExtractorError, LedgerError, PipelineError};
pub use extractor::{Extractor, ytdlp::YtDlp};
pub use ledger::Ledger;
pub use pipeline::{Pipeline, RunReport};
pub use request::SearchRequest;
