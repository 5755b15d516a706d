//! Store module for persisting harvested records
//!
//! This module handles the on-disk JSON store, including:
//! - Reading a prior store and classifying its trailing checkpoint
//! - Refusing to resume from a store whose checkpoint is missing or malformed
//! - Appending pages of records with atomic whole-file replacement
//! - Finalizing the store with the last persisted continuation token

mod entry;
mod json_store;

pub use entry::{split_entries, Checkpoint, EntryError, TrailingEntry, CHECKPOINT_KEY};
pub use json_store::{CheckpointStore, OpenedStore};

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur during store operations
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Store not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("Store {} is not a JSON array: {source}", path.display())]
    Corrupt {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("Store {} has an invalid entry at index {index}: {reason}", path.display())]
    InvalidEntry {
        path: PathBuf,
        index: usize,
        reason: String,
    },

    #[error(
        "Refusing to resume from {}: {reason} (pass --overwrite or --cursor to proceed)",
        path.display()
    )]
    ResumeIntegrity { path: PathBuf, reason: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl StoreError {
    /// Returns true for errors that make an existing store unusable for resuming
    pub fn is_integrity_error(&self) -> bool {
        matches!(
            self,
            Self::Corrupt { .. } | Self::InvalidEntry { .. } | Self::ResumeIntegrity { .. }
        )
    }
}

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;
