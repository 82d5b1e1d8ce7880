//! # Cache Configuration
//!
//! Loaded once at startup. Every key is optional:
//!
//! ```toml
//! initial_capacity = 1024
//! miss_lock_stripes = 32
//! ```

use std::path::Path;

use serde::Deserialize;

use crate::error::{CacheError, CacheResult};

/// Tuning for an [`IdentityTypeCache`](crate::IdentityTypeCache).
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CacheConfig {
    /// Number of entries the map is pre-sized for.
    pub initial_capacity: usize,
    /// Number of striped locks serializing the miss path. Must be non-zero.
    pub miss_lock_stripes: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            initial_capacity: 256,
            miss_lock_stripes: 64,
        }
    }
}

impl CacheConfig {
    /// Config for a cache only ever touched from the main thread.
    ///
    /// A single stripe is enough when there are no concurrent misses.
    #[must_use]
    pub const fn single_threaded() -> Self {
        Self {
            initial_capacity: 256,
            miss_lock_stripes: 1,
        }
    }

    /// Parses and validates a config from TOML text.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::Parse`] for malformed TOML or unknown keys and
    /// [`CacheError::InvalidConfig`] for out-of-range values.
    pub fn from_toml_str(text: &str) -> CacheResult<Self> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a config file.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::Io`] if the file cannot be read, otherwise the
    /// same errors as [`CacheConfig::from_toml_str`].
    pub fn load(path: impl AsRef<Path>) -> CacheResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| CacheError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    /// Checks value ranges.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::InvalidConfig`] if `miss_lock_stripes` is zero.
    pub fn validate(&self) -> CacheResult<()> {
        if self.miss_lock_stripes == 0 {
            return Err(CacheError::InvalidConfig(
                "miss_lock_stripes must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_toml_gives_defaults() {
        let config = CacheConfig::from_toml_str("").unwrap();
        assert_eq!(config, CacheConfig::default());
    }

    #[test]
    fn test_partial_toml() {
        let config = CacheConfig::from_toml_str("miss_lock_stripes = 8").unwrap();
        assert_eq!(config.miss_lock_stripes, 8);
        assert_eq!(config.initial_capacity, 256);
    }

    #[test]
    fn test_zero_stripes_rejected() {
        let err = CacheConfig::from_toml_str("miss_lock_stripes = 0").unwrap_err();
        assert!(matches!(err, CacheError::InvalidConfig(_)));
    }

    #[test]
    fn test_unknown_key_rejected() {
        let err = CacheConfig::from_toml_str("max_entries = 10").unwrap_err();
        assert!(matches!(err, CacheError::Parse(_)));
    }

    #[test]
    fn test_load_missing_file() {
        let path = std::env::temp_dir().join("compcache_missing_config_7f3a.toml");
        let err = CacheConfig::load(&path).unwrap_err();
        assert!(matches!(err, CacheError::Io { .. }));
        assert!(err.to_string().contains("compcache_missing_config_7f3a.toml"));
    }

    #[test]
    fn test_load_from_file() {
        let id = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap()
            .as_nanos();
        let path = std::env::temp_dir().join(format!("compcache_config_{id}.toml"));
        std::fs::write(&path, "initial_capacity = 4096\nmiss_lock_stripes = 16\n").unwrap();

        let config = CacheConfig::load(&path).unwrap();
        assert_eq!(config.initial_capacity, 4096);
        assert_eq!(config.miss_lock_stripes, 16);

        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn test_single_threaded_is_valid() {
        assert!(CacheConfig::single_threaded().validate().is_ok());
    }
}
