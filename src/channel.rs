#![forbid(unsafe_code)]

//! Channel reference parsing. Pure string work, no network access.

use serde::{Deserialize, Serialize};
use url::Url;

const PLATFORM_BASE: &str = "https://www.youtube.com";
const SHORTS_TAB: &str = "/shorts";

/// Which URL shape a channel reference was recognised from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChannelKind {
    Id,
    Custom,
    Handle,
    User,
    Unknown,
}

/// Normalized `(kind, value)` pair. For `Unknown` the value is the raw input,
/// untouched, so the extractor can still try to interpret it directly.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelReference {
    pub kind: ChannelKind,
    pub value: String,
}

impl ChannelReference {
    /// Recognised shapes, in priority order: `channel/<id>`, `c/<name>`,
    /// `@handle`, `user/<name>`. Anything else falls through to `Unknown`.
    pub fn resolve(raw: &str) -> Self {
        let segments = path_segments(raw);
        let first = segments.first().map(String::as_str);
        let second = segments.get(1).cloned();

        match (first, second) {
            (Some("channel"), Some(id)) => Self::new(ChannelKind::Id, id),
            (Some("c"), Some(name)) => Self::new(ChannelKind::Custom, name),
            (Some(handle), _) if handle.starts_with('@') => {
                Self::new(ChannelKind::Handle, handle.to_string())
            }
            (Some("user"), Some(name)) => Self::new(ChannelKind::User, name),
            _ => Self::new(ChannelKind::Unknown, raw.to_string()),
        }
    }

    fn new(kind: ChannelKind, value: String) -> Self {
        Self { kind, value }
    }

    /// Canonical platform URL for this reference.
    pub fn to_url(&self) -> String {
        match self.kind {
            ChannelKind::Id => format!("{PLATFORM_BASE}/channel/{}", self.value),
            ChannelKind::Custom => format!("{PLATFORM_BASE}/c/{}", self.value),
            ChannelKind::Handle => format!("{PLATFORM_BASE}/{}", self.value),
            ChannelKind::User => format!("{PLATFORM_BASE}/user/{}", self.value),
            ChannelKind::Unknown => self.value.clone(),
        }
    }

    /// Listing URL for the channel's Shorts tab.
    pub fn shorts_url(&self) -> String {
        shorts_tab_url(&self.to_url())
    }
}

/// Splits the path of a URL-like input into its non-empty segments. Inputs
/// without a scheme (`@handle`, `channel/UC123`) are treated as bare paths;
/// anything that still fails to parse yields no segments.
fn path_segments(raw: &str) -> Vec<String> {
    let trimmed = raw.trim();
    match Url::parse(trimmed) {
        Ok(url) => url
            .path_segments()
            .map(|segments| {
                segments
                    .filter(|segment| !segment.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default(),
        Err(url::ParseError::RelativeUrlWithoutBase) => {
            let path = trimmed
                .split(['?', '#'])
                .next()
                .unwrap_or_default();
            path.split('/')
                .filter(|segment| !segment.is_empty())
                .map(str::to_string)
                .collect()
        }
        Err(_) => Vec::new(),
    }
}

/// Points a channel URL at its Shorts tab without doubling the suffix. Query
/// and fragment are kept. Input that is not an absolute URL gets the suffix
/// appended as plain text.
pub fn shorts_tab_url(channel_url: &str) -> String {
    let channel_url = channel_url.trim();
    match Url::parse(channel_url) {
        Ok(mut url) if !url.cannot_be_a_base() => {
            let path = with_shorts_tab(url.path());
            url.set_path(&path);
            url.into()
        }
        _ => with_shorts_tab(channel_url),
    }
}

fn with_shorts_tab(path: &str) -> String {
    let path = path.trim_end_matches('/');
    if path.ends_with(SHORTS_TAB) {
        path.to_string()
    } else {
        format!("{path}{SHORTS_TAB}")
    }
}

/// Turns a channel display name into a single safe directory name: drops
/// `<>:"/\|?*` and swaps spaces for underscores. Returns `None` when nothing
/// usable is left.
pub fn sanitize_channel_name(name: &str) -> Option<String> {
    let cleaned: String = name
        .trim()
        .chars()
        .filter(|c| !matches!(c, '<' | '>' | ':' | '"' | '/' | '\\' | '|' | '?' | '*'))
        .filter(|c| !c.is_control())
        .map(|c| if c == ' ' { '_' } else { c })
        .collect();

    match cleaned.as_str() {
        "" | "." | ".." => None,
        _ => Some(cleaned),
    }
}
