//! Configuration Module
//!
//! Typed options for the memory and tiered caches, and server configuration
//! loaded from environment variables.

use std::env;
use std::time::Duration;

use crate::cache::{
    DEFAULT_CAPACITY, DEFAULT_COMPRESSION_THRESHOLD, DEFAULT_SWEEP_INTERVAL, DEFAULT_TTL,
    MIN_SWEEP_INTERVAL,
};

// == Memory Cache Options ==
/// Options for a [`MemoryCache`](crate::cache::MemoryCache).
#[derive(Debug, Clone)]
pub struct MemoryConfig {
    /// Soft admission limit on the number of entries
    pub capacity: usize,
    /// TTL applied to entries that don't request one
    pub default_ttl: Duration,
    /// Interval between background sweeps
    pub sweep_interval: Duration,
    /// Whether the cache starts enabled
    pub active: bool,
}

impl MemoryConfig {
    /// Preset for ring/queue use: larger, short-lived.
    pub fn stack() -> Self {
        Self {
            capacity: 2000,
            default_ttl: Duration::from_secs(60),
            sweep_interval: Duration::from_secs(30),
            active: true,
        }
    }

    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    pub fn with_default_ttl(mut self, ttl: Duration) -> Self {
        self.default_ttl = ttl;
        self
    }

    /// Sets the sweep interval, clamped to a floor to rule out a busy loop.
    pub fn with_sweep_interval(mut self, interval: Duration) -> Self {
        self.sweep_interval = interval.max(MIN_SWEEP_INTERVAL);
        self
    }

    pub fn with_active(mut self, active: bool) -> Self {
        self.active = active;
        self
    }
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CAPACITY,
            default_ttl: DEFAULT_TTL,
            sweep_interval: DEFAULT_SWEEP_INTERVAL,
            active: true,
        }
    }
}

// == Tiered Cache Options ==
/// Options for a [`TieredCache`](crate::cache::TieredCache).
#[derive(Debug, Clone)]
pub struct TieredConfig {
    /// Prefix prepended to every key sent to the remote store
    pub key_prefix: String,
    /// Whether hit/miss counters are maintained
    pub stats_enabled: bool,
    /// Payloads at or above this size are compressed
    pub compression_threshold: usize,
    /// TTL applied to entries that don't request one
    pub default_ttl: Duration,
}

impl TieredConfig {
    pub fn with_key_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.key_prefix = prefix.into();
        self
    }

    pub fn with_stats(mut self, enabled: bool) -> Self {
        self.stats_enabled = enabled;
        self
    }

    pub fn with_compression_threshold(mut self, threshold: usize) -> Self {
        self.compression_threshold = threshold;
        self
    }

    pub fn with_default_ttl(mut self, ttl: Duration) -> Self {
        self.default_ttl = ttl;
        self
    }
}

impl Default for TieredConfig {
    fn default() -> Self {
        Self {
            key_prefix: String::new(),
            stats_enabled: true,
            compression_threshold: DEFAULT_COMPRESSION_THRESHOLD,
            default_ttl: DEFAULT_TTL,
        }
    }
}

// == Server Config ==
/// Server configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// Registered adapter name to serve
    pub adapter: String,
    /// Maximum number of entries the cache can hold
    pub max_entries: usize,
    /// Default TTL in seconds for entries without explicit TTL
    pub default_ttl: u64,
    /// Background sweep interval in seconds
    pub sweep_interval: u64,
    /// HTTP server port
    pub server_port: u16,
    /// Prefix for remote keys
    pub key_prefix: String,
    /// Whether tiered hit/miss counters are maintained
    pub stats_enabled: bool,
    /// Compression threshold in bytes
    pub compression_threshold: usize,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `CACHE_ADAPTER` - Adapter name (default: memory)
    /// - `MAX_ENTRIES` - Maximum cache entries (default: 1000)
    /// - `DEFAULT_TTL` - Default TTL in seconds (default: 3600)
    /// - `SWEEP_INTERVAL` - Sweep frequency in seconds (default: 30)
    /// - `SERVER_PORT` - HTTP server port (default: 3000)
    /// - `KEY_PREFIX` - Remote key prefix (default: empty)
    /// - `STATS_ENABLED` - Tiered hit/miss counters (default: true)
    /// - `COMPRESSION_THRESHOLD` - Compression threshold in bytes (default: 64)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            adapter: env::var("CACHE_ADAPTER").unwrap_or(defaults.adapter),
            max_entries: parse_env("MAX_ENTRIES").unwrap_or(defaults.max_entries),
            default_ttl: parse_env("DEFAULT_TTL").unwrap_or(defaults.default_ttl),
            sweep_interval: parse_env("SWEEP_INTERVAL").unwrap_or(defaults.sweep_interval),
            server_port: parse_env("SERVER_PORT").unwrap_or(defaults.server_port),
            key_prefix: env::var("KEY_PREFIX").unwrap_or(defaults.key_prefix),
            stats_enabled: parse_env("STATS_ENABLED").unwrap_or(defaults.stats_enabled),
            compression_threshold: parse_env("COMPRESSION_THRESHOLD")
                .unwrap_or(defaults.compression_threshold),
        }
    }

    /// Options for the memory cache built from this configuration.
    pub fn memory_config(&self) -> MemoryConfig {
        MemoryConfig::default()
            .with_capacity(self.max_entries)
            .with_default_ttl(Duration::from_secs(self.default_ttl))
            .with_sweep_interval(Duration::from_secs(self.sweep_interval))
    }

    /// Options for the tiered cache built from this configuration.
    pub fn tiered_config(&self) -> TieredConfig {
        TieredConfig::default()
            .with_key_prefix(self.key_prefix.clone())
            .with_stats(self.stats_enabled)
            .with_compression_threshold(self.compression_threshold)
            .with_default_ttl(Duration::from_secs(self.default_ttl))
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            adapter: "memory".to_string(),
            max_entries: DEFAULT_CAPACITY,
            default_ttl: DEFAULT_TTL.as_secs(),
            sweep_interval: DEFAULT_SWEEP_INTERVAL.as_secs(),
            server_port: 3000,
            key_prefix: String::new(),
            stats_enabled: true,
            compression_threshold: DEFAULT_COMPRESSION_THRESHOLD,
        }
    }
}

fn parse_env<T: std::str::FromStr>(name: &str) -> Option<T> {
    env::var(name).ok().and_then(|v| v.parse().ok())
}
