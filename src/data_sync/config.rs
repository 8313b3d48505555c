use crate::utils::constants::{
    DEFAULT_CACHE_KEY_PREFIX, DEFAULT_MAX_HOPS, DEFAULT_PATHS_CACHE_TTL_SECS, DEFAULT_SYNC_CHUNK_SIZE, DEFAULT_SYNC_INTERVAL_SECS,
};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for graph synchronization and the path cache
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Seconds between two sync cycles
    pub sync_interval_secs: u64,
    /// Maximum pools applied between two checkpoint advances
    pub chunk_size: usize,
    /// Lifetime of computed path sets in the cache
    pub paths_cache_ttl_secs: u64,
    /// First segment of every backing-store key
    pub key_prefix: String,
    /// Hop ceiling used when filling the path cache
    pub max_hops: u8,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            sync_interval_secs: DEFAULT_SYNC_INTERVAL_SECS,
            chunk_size: DEFAULT_SYNC_CHUNK_SIZE,
            paths_cache_ttl_secs: DEFAULT_PATHS_CACHE_TTL_SECS,
            key_prefix: DEFAULT_CACHE_KEY_PREFIX.to_string(),
            max_hops: DEFAULT_MAX_HOPS,
        }
    }
}

impl SyncConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> eyre::Result<Self> {
        let mut config = Self::default();

        if let Ok(interval_str) = std::env::var("SYNC_INTERVAL_SECS") {
            config.sync_interval_secs = interval_str.parse().map_err(|e| eyre::eyre!("Invalid SYNC_INTERVAL_SECS: {}", e))?;
        }

        if let Ok(chunk_size_str) = std::env::var("SYNC_CHUNK_SIZE") {
            config.chunk_size = chunk_size_str.parse().map_err(|e| eyre::eyre!("Invalid SYNC_CHUNK_SIZE: {}", e))?;
        }

        if let Ok(ttl_str) = std::env::var("PATHS_CACHE_TTL_SECS") {
            config.paths_cache_ttl_secs = ttl_str.parse().map_err(|e| eyre::eyre!("Invalid PATHS_CACHE_TTL_SECS: {}", e))?;
        }

        if let Ok(key_prefix) = std::env::var("CACHE_KEY_PREFIX") {
            config.key_prefix = key_prefix;
        }

        if let Ok(max_hops_str) = std::env::var("MAX_HOPS") {
            config.max_hops = max_hops_str.parse().map_err(|e| eyre::eyre!("Invalid MAX_HOPS: {}", e))?;
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> eyre::Result<()> {
        if self.chunk_size == 0 {
            return Err(eyre::eyre!("chunk_size must be positive"));
        }
        if self.sync_interval_secs == 0 {
            return Err(eyre::eyre!("sync_interval_secs must be positive"));
        }
        if self.max_hops == 0 {
            return Err(eyre::eyre!("max_hops must be positive"));
        }
        if self.key_prefix.is_empty() || self.key_prefix.contains(':') {
            return Err(eyre::eyre!("key_prefix must be non-empty and must not contain ':'"));
        }
        Ok(())
    }

    pub fn sync_interval(&self) -> Duration {
        Duration::from_secs(self.sync_interval_secs)
    }

    pub fn paths_cache_ttl(&self) -> Duration {
        Duration::from_secs(self.paths_cache_ttl_secs)
    }
}
