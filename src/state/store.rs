//! JSON persistence for crawl snapshots
//!
//! Snapshots are written whole, never incrementally: the state is
//! reserialized, written to a sibling temp file and renamed over the previous
//! snapshot.

use crate::state::crawl_state::{CrawlState, DetailState, ItemId};
use crate::StateError;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::BTreeSet;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// A state value that can be persisted by a `StateStore`
pub trait Snapshot: Serialize + DeserializeOwned + Default {
    /// Ids to export next to the snapshot
    fn ids(&self) -> &BTreeSet<ItemId>;

    /// Records the save time in the snapshot
    fn stamp(&mut self);
}

impl Snapshot for CrawlState {
    fn ids(&self) -> &BTreeSet<ItemId> {
        self.seen_ids()
    }

    fn stamp(&mut self) {
        self.touch();
    }
}

impl Snapshot for DetailState {
    fn ids(&self) -> &BTreeSet<ItemId> {
        self.crawled_ids()
    }

    fn stamp(&mut self) {
        self.touch();
    }
}

/// On-disk location of a snapshot and its optional id export
#[derive(Debug, Clone)]
pub struct StateStore {
    path: PathBuf,
    ids_path: Option<PathBuf>,
}

impl StateStore {
    /// Creates a store for the snapshot at `path`
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            ids_path: None,
        }
    }

    /// Also writes the snapshot's ids as a JSON array to `ids_path` on save
    ///
    /// The detail crawl reads this file to know which games to fetch.
    pub fn with_ids_export(mut self, ids_path: impl Into<PathBuf>) -> Self {
        self.ids_path = Some(ids_path.into());
        self
    }

    /// Path of the snapshot file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads the snapshot
    ///
    /// A missing file is not an error: it yields an empty state. A file that
    /// exists but cannot be read or parsed is.
    pub fn load<T: Snapshot>(&self) -> Result<T, StateError> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                tracing::warn!(
                    "No state file at {}, starting from scratch",
                    self.path.display()
                );
                return Ok(T::default());
            }
            Err(source) => {
                return Err(StateError::Read {
                    path: self.path.clone(),
                    source,
                })
            }
        };

        let state = serde_json::from_str(&content).map_err(|source| StateError::Corrupt {
            path: self.path.clone(),
            source,
        })?;

        tracing::info!("Loaded crawl state from {}", self.path.display());
        Ok(state)
    }

    /// Writes the whole snapshot, replacing any previous one
    pub fn save<T: Snapshot>(&self, state: &mut T) -> Result<(), StateError> {
        state.stamp();

        let json = serde_json::to_string_pretty(state).map_err(StateError::Serialize)?;
        write_atomic(&self.path, json.as_bytes())?;
        tracing::info!("Saved crawl state to {}", self.path.display());

        if let Some(ids_path) = &self.ids_path {
            let ids: Vec<ItemId> = state.ids().iter().copied().collect();
            let json = serde_json::to_string(&ids).map_err(StateError::Serialize)?;
            write_atomic(ids_path, json.as_bytes())?;
            tracing::info!("Saved {} ids to {}", ids.len(), ids_path.display());
        }

        Ok(())
    }

    /// Deletes the snapshot so the next load starts from scratch
    pub fn reset(&self) -> Result<(), StateError> {
        match fs::remove_file(&self.path) {
            Ok(()) => {
                tracing::info!("Removed previous state file {}", self.path.display());
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(source) => Err(StateError::Write {
                path: self.path.clone(),
                source,
            }),
        }
    }
}

/// Writes `content` to a temp file next to `path`, then renames it into place
fn write_atomic(path: &Path, content: &[u8]) -> Result<(), StateError> {
    let to_write_error = |source| StateError::Write {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(to_write_error)?;
    }

    let mut tmp_name = path.file_name().unwrap_or_default().to_os_string();
    tmp_name.push(".tmp");
    let tmp_path = path.with_file_name(tmp_name);

    fs::write(&tmp_path, content).map_err(to_write_error)?;
    fs::rename(&tmp_path, path).map_err(to_write_error)?;

    Ok(())
}
