//! # Cache Error Types
//!
//! Lookups never fail; a miss is `None`. Errors only come from loading
//! configuration.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while configuring a cache.
#[derive(Error, Debug)]
pub enum CacheError {
    /// The config file could not be read.
    #[error("failed to read config {}: {source}", .path.display())]
    Io {
        /// Path that was being read.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The config file is not valid TOML or has unknown keys.
    #[error("invalid config syntax: {0}")]
    Parse(#[from] toml::de::Error),

    /// The config parsed but holds an unusable value.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Result type for cache configuration.
pub type CacheResult<T> = Result<T, CacheError>;
