#![forbid(unsafe_code)]

//! Persisted set of identifiers that were already downloaded.
//!
//! The file is a plain JSON array of strings. Every successful download
//! re-reads the file, merges the new id and rewrites the whole array through
//! a temp file + rename, so a crash leaves either the old or the new set on
//! disk, never a torn one.

use crate::error::LedgerError;
use std::collections::{BTreeSet, HashSet};
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

#[derive(Debug, Clone)]
pub struct Ledger {
    path: PathBuf,
    ids: HashSet<String>,
}

impl Ledger {
    /// Loads the ledger at `path`. A missing file is an empty ledger.
    pub fn load(path: &Path) -> Result<Self, LedgerError> {
        Ok(Self {
            path: path.to_path_buf(),
            ids: read_ids(path)?,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn contains(&self, id: &str) -> bool {
        self.ids.contains(id)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn ids(&self) -> &HashSet<String> {
        &self.ids
    }

    /// Records `id` and immediately rewrites the file. Ids written by anyone
    /// else since `load` are kept.
    pub fn add_and_persist(&mut self, id: &str) -> Result<(), LedgerError> {
        let mut on_disk = read_ids(&self.path)?;
        on_disk.extend(self.ids.iter().cloned());
        on_disk.insert(id.to_owned());
        write_ids(&self.path, &on_disk)?;
        self.ids = on_disk;
        Ok(())
    }
}

fn read_ids(path: &Path) -> Result<HashSet<String>, LedgerError> {
    let raw = match fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(err) if err.kind() == ErrorKind::NotFound => return Ok(HashSet::new()),
        Err(source) => {
            return Err(LedgerError::Read {
                path: path.to_path_buf(),
                source,
            });
        }
    };

    if raw.trim().is_empty() {
        return Ok(HashSet::new());
    }

    let ids: Vec<String> = serde_json::from_str(&raw).map_err(|source| LedgerError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(ids.into_iter().collect())
}

fn write_ids(path: &Path, ids: &HashSet<String>) -> Result<(), LedgerError> {
    let write_err = |source: std::io::Error| LedgerError::Write {
        path: path.to_path_buf(),
        source,
    };

    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(dir).map_err(write_err)?;

    // Sorted so the file diffs cleanly between runs.
    let ordered: BTreeSet<&String> = ids.iter().collect();
    let payload = serde_json::to_vec(&ordered).map_err(|err| write_err(err.into()))?;

    let mut tmp = NamedTempFile::new_in(dir).map_err(write_err)?;
    tmp.write_all(&payload).map_err(write_err)?;
    tmp.as_file().sync_all().map_err(write_err)?;
    tmp.persist(path).map_err(|err| write_err(err.error))?;
    Ok(())
}
