//! Scratchpad-Harvest: a resumable paginated listing harvester
//!
//! This crate pages through a remote scratchpad listing, normalizes every item
//! into a persisted record, and keeps a JSON store that can be resumed from its
//! trailing checkpoint after an interruption.

pub mod config;
pub mod harvester;
pub mod listing;
pub mod normalize;
pub mod state;
pub mod store;

use thiserror::Error;

/// Main error type for Scratchpad-Harvest operations
#[derive(Debug, Error)]
pub enum HarvestError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Store error: {0}")]
    Store(#[from] store::StoreError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("Invalid run phase transition: {from} -> {to}")]
    InvalidTransition {
        from: state::ShutdownPhase,
        to: state::ShutdownPhase,
    },
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

/// Result type alias for Scratchpad-Harvest operations
pub type Result<T> = std::result::Result<T, HarvestError>;

// Re-export commonly used types
pub use config::Config;
pub use harvester::{harvest, RunSummary, StopReason};
pub use normalize::{normalize, Record};
pub use state::{ContinuationToken, RunState, ShutdownPhase};
pub use store::CheckpointStore;
