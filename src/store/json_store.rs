//! JSON file checkpoint store
//!
//! Records are kept in memory and every write replaces the whole file: the
//! array is written to a sibling temporary file, synced, then renamed over the
//! store. A crash at any point leaves either the previous or the new complete
//! array on disk, never a torn one.

use crate::normalize::Record;
use crate::state::ContinuationToken;
use crate::store::entry::{split_entries, Checkpoint, StoreView, TrailingEntry};
use crate::store::{StoreError, StoreResult};
use serde_json::Value;
use std::collections::HashSet;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// Contents of an existing store, as read on startup
#[derive(Debug, Clone, PartialEq)]
pub struct OpenedStore {
    pub records: Vec<Record>,
    pub trailing: TrailingEntry,
}

impl OpenedStore {
    /// Returns true if the file holds nothing a prior run produced
    pub fn is_empty(&self) -> bool {
        self.records.is_empty() && self.trailing == TrailingEntry::Missing
    }
}

/// Persisted sequence of records with a single trailing checkpoint
///
/// All records stay in memory and every append rewrites and syncs the whole
/// file, so the I/O of a run grows quadratically with the number of pages.
/// In exchange the file on disk is a complete JSON array after every write.
#[derive(Debug)]
pub struct CheckpointStore {
    path: PathBuf,
    records: Vec<Record>,
    checkpoint: Option<Checkpoint>,
    resumed_records: usize,
}

impl CheckpointStore {
    /// Reads an existing store
    ///
    /// # Returns
    ///
    /// * `Ok(OpenedStore)` - The records and whatever trails them
    /// * `Err(StoreError::NotFound)` - No file, or a file with no content
    /// * `Err(StoreError::Corrupt)` - The file is not a JSON array
    /// * `Err(StoreError::InvalidEntry)` - An entry is out of place
    pub fn open(path: &Path) -> StoreResult<OpenedStore> {
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(StoreError::NotFound(path.to_path_buf()));
            }
            Err(e) => return Err(e.into()),
        };

        if content.trim().is_empty() {
            return Err(StoreError::NotFound(path.to_path_buf()));
        }

        let entries: Vec<Value> =
            serde_json::from_str(&content).map_err(|source| StoreError::Corrupt {
                path: path.to_path_buf(),
                source,
            })?;

        let (records, trailing) =
            split_entries(entries).map_err(|e| StoreError::InvalidEntry {
                path: path.to_path_buf(),
                index: e.index,
                reason: e.reason,
            })?;

        Ok(OpenedStore { records, trailing })
    }

    /// Opens the store for a run and decides where the run starts
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the store file
    /// * `overwrite` - Discard any prior store and start from an empty sequence
    /// * `start_token` - Explicit start token; overrides the stored checkpoint
    ///
    /// # Returns
    ///
    /// The store, ready for appends, and the token of the first fetch.
    /// A prior store whose checkpoint is missing or malformed is refused with
    /// `StoreError::ResumeIntegrity` unless `start_token` or `overwrite` is given.
    pub fn open_or_reset(
        path: &Path,
        overwrite: bool,
        start_token: Option<ContinuationToken>,
    ) -> StoreResult<(Self, Option<ContinuationToken>)> {
        let start_token = start_token.filter(|token| !token.is_empty());

        if overwrite {
            tracing::info!("Overwriting store {}", path.display());
            let store = Self::create_empty(path)?;
            return Ok((store, start_token));
        }

        let opened = match Self::open(path) {
            Ok(opened) if !opened.is_empty() => opened,
            Ok(_) | Err(StoreError::NotFound(_)) => {
                tracing::info!("No prior store at {}, starting fresh", path.display());
                let store = Self::create_empty(path)?;
                return Ok((store, start_token));
            }
            Err(e) => return Err(e),
        };

        let OpenedStore { records, trailing } = opened;
        let resumed_records = records.len();

        let (checkpoint, token) = match (trailing, start_token) {
            (TrailingEntry::Checkpoint(checkpoint), Some(token)) => {
                tracing::info!(
                    "Starting from explicit cursor instead of stored checkpoint '{}'",
                    checkpoint.cursor
                );
                (Some(checkpoint), Some(token))
            }
            (TrailingEntry::Checkpoint(checkpoint), None) => {
                let token = checkpoint.token();
                (Some(checkpoint), token)
            }
            (TrailingEntry::Missing, Some(token)) => {
                tracing::warn!("Store has no checkpoint; continuing from explicit cursor");
                (None, Some(token))
            }
            (TrailingEntry::Malformed(reason), Some(token)) => {
                tracing::warn!(
                    "Discarding malformed checkpoint ({}); continuing from explicit cursor",
                    reason
                );
                (None, Some(token))
            }
            (TrailingEntry::Missing, None) => {
                return Err(StoreError::ResumeIntegrity {
                    path: path.to_path_buf(),
                    reason: "last entry is not a checkpoint".to_string(),
                });
            }
            (TrailingEntry::Malformed(reason), None) => {
                return Err(StoreError::ResumeIntegrity {
                    path: path.to_path_buf(),
                    reason,
                });
            }
        };

        tracing::info!(
            "Resuming store {} with {} records",
            path.display(),
            resumed_records
        );

        let store = Self {
            path: path.to_path_buf(),
            records,
            checkpoint,
            resumed_records,
        };

        Ok((store, token))
    }

    fn create_empty(path: &Path) -> StoreResult<Self> {
        let store = Self {
            path: path.to_path_buf(),
            records: Vec::new(),
            checkpoint: None,
            resumed_records: 0,
        };
        store.write()?;
        Ok(store)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// All records, resumed ones first
    pub fn records(&self) -> &[Record] {
        &self.records
    }

    /// Number of records carried over from a prior run
    pub fn resumed_records(&self) -> usize {
        self.resumed_records
    }

    pub fn checkpoint(&self) -> Option<&Checkpoint> {
        self.checkpoint.as_ref()
    }

    /// Identifiers of the last `window` records carried over from a prior run
    ///
    /// Records written by this run are never included.
    pub fn resumed_identifiers(&self, window: usize) -> HashSet<String> {
        let resumed = &self.records[..self.resumed_records.min(self.records.len())];
        resumed
            .iter()
            .rev()
            .take(window)
            .filter_map(|record| record.identifier().map(str::to_owned))
            .collect()
    }

    /// Adds a page of records and moves the checkpoint to that page's token
    ///
    /// The records are buffered before the write is attempted, so a failed
    /// write loses nothing: the next successful write includes them.
    pub fn append(
        &mut self,
        records: Vec<Record>,
        token: Option<ContinuationToken>,
    ) -> StoreResult<()> {
        self.records.extend(records);
        self.checkpoint = Some(Checkpoint::new(token));
        self.write()
    }

    /// Writes the final checkpoint and closes the store
    ///
    /// Returns the total number of records in the finalized store.
    pub fn finalize(mut self, token: Option<ContinuationToken>) -> StoreResult<usize> {
        self.checkpoint = Some(Checkpoint::new(token));
        self.write()?;
        tracing::debug!(
            "Finalized store {} with {} records",
            self.path.display(),
            self.records.len()
        );
        Ok(self.records.len())
    }

    fn write(&self) -> StoreResult<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let temp_path = temp_path_for(&self.path);
        let view = StoreView {
            records: &self.records,
            checkpoint: self.checkpoint.as_ref(),
        };

        let file = File::create(&temp_path)?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer(&mut writer, &view)?;
        writer.flush()?;
        writer.get_ref().sync_all()?;
        drop(writer);

        fs::rename(&temp_path, &self.path)?;
        Ok(())
    }
}

fn temp_path_for(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|name| name.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}
