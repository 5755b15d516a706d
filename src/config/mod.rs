//! Configuration module for Scratchpad-Harvest
//!
//! This module handles loading, merging, and validating the harvester configuration.
//! Settings come from an optional TOML file, with command-line values layered on top.
//!
//! # Example
//!
//! ```no_run
//! use scratchpad_harvest::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("harvest.toml")).unwrap();
//! println!("Harvesting into: {}", config.output.path);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    Config, ListingConfig, OutputConfig, PagingConfig, RetryConfig, UserAgentConfig,
    DEFAULT_LISTING_URL, DEFAULT_PAGE_SIZE, DEFAULT_TOPIC_ID,
};

// Re-export parser functions
pub use parser::{load_config, output_file_name, resolve_config, ConfigOverrides};
