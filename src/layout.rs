#![forbid(unsafe_code)]

//! On-disk layout of downloaded Shorts:
//! `<root>/[<channel_name>/]<position>_<id>_combined.<ext>`.

use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};

pub const DEFAULT_PUBLIC_PREFIX: &str = "/videosList";
const COMBINED_SUFFIX: &str = "_combined";

/// Where artifacts land and how the file-serving layer exposes them.
#[derive(Debug, Clone)]
pub struct StorageLayout {
    root: PathBuf,
    public_prefix: String,
}

impl StorageLayout {
    pub fn new(root: impl Into<PathBuf>, public_prefix: impl Into<String>) -> Self {
        let prefix = public_prefix.into();
        Self {
            root: root.into(),
            public_prefix: prefix.trim_end_matches('/').to_string(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Per-channel subdirectory, or the root itself for keyword runs.
    pub fn destination(&self, channel_name: Option<&str>) -> PathBuf {
        match channel_name {
            Some(name) => self.root.join(name),
            None => self.root.clone(),
        }
    }

    /// Creates the destination directory (and the root) if needed.
    pub fn prepare(&self, destination: &Path) -> io::Result<()> {
        fs::create_dir_all(destination)
    }

    /// Public URL for a file under the root, e.g.
    /// `/videosList/Some_Channel/1_abc_combined.mp4`. `None` when the path is
    /// outside the root.
    pub fn public_url(&self, path: &Path) -> Option<String> {
        let relative = path.strip_prefix(&self.root).ok()?;
        let mut url = self.public_prefix.clone();
        for component in relative.components() {
            match component {
                Component::Normal(part) => {
                    url.push('/');
                    url.push_str(&part.to_string_lossy());
                }
                Component::CurDir => {}
                _ => return None,
            }
        }
        Some(url)
    }
}

/// Output template handed to the extractor; `position` keeps batch order and
/// `id` keeps distinct candidates from colliding.
pub fn output_template(destination: &Path, position: usize, id: &str) -> PathBuf {
    destination.join(format!("{position}_{id}{COMBINED_SUFFIX}.%(ext)s"))
}
