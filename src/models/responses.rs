//! Response DTOs for the cache server API
//!
//! Defines the structure of outgoing HTTP response bodies.

use serde::Serialize;

use crate::cache::{CacheStats, Ttl};

/// Response body for the GET operation (GET /get/:key)
#[derive(Debug, Clone, Serialize)]
pub struct GetResponse {
    /// The requested key
    pub key: String,
    /// The stored value
    pub value: serde_json::Value,
}

impl GetResponse {
    /// Creates a new GetResponse
    pub fn new(key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// Response body for the SET operation (PUT /set)
#[derive(Debug, Clone, Serialize)]
pub struct SetResponse {
    /// Adapter that accepted the write
    pub adapter: String,
    pub key: String,
    /// Requested lifetime: `default`, `never`, `expired` or a duration
    pub ttl: String,
    pub message: String,
}

impl SetResponse {
    pub fn new(adapter: impl Into<String>, key: impl Into<String>, ttl: Ttl) -> Self {
        let adapter = adapter.into();
        let key = key.into();
        Self {
            message: format!("Key '{}' stored in the {} cache", key, adapter),
            ttl: describe_ttl(ttl),
            adapter,
            key,
        }
    }
}

fn describe_ttl(ttl: Ttl) -> String {
    match ttl {
        Ttl::Default => "default".to_string(),
        Ttl::Never => "never".to_string(),
        Ttl::Expired => "expired".to_string(),
        Ttl::After(duration) => format!("{:?}", duration),
    }
}

/// Response body for the DELETE operation (DELETE /del/:key)
#[derive(Debug, Clone, Serialize)]
pub struct DeleteResponse {
    pub adapter: String,
    pub key: String,
    pub message: String,
}

impl DeleteResponse {
    pub fn new(adapter: impl Into<String>, key: impl Into<String>) -> Self {
        let adapter = adapter.into();
        let key = key.into();
        Self {
            message: format!("Key '{}' deleted from the {} cache", key, adapter),
            adapter,
            key,
        }
    }
}

/// Response body for the keys endpoint (GET /keys)
#[derive(Debug, Clone, Serialize)]
pub struct KeysResponse {
    /// Keys, most recently used first
    pub keys: Vec<String>,
    pub count: usize,
}

impl KeysResponse {
    pub fn new(keys: Vec<String>) -> Self {
        Self {
            count: keys.len(),
            keys,
        }
    }
}

/// Response body for the stats endpoint (GET /stats)
#[derive(Debug, Clone, Serialize)]
pub struct StatsResponse {
    /// Adapter serving the cache
    pub adapter: String,
    /// Number of cache hits
    pub hits: u64,
    /// Number of cache misses
    pub misses: u64,
    /// Number of capacity evictions
    pub evictions: u64,
    /// Number of TTL expirations
    pub expirations: u64,
    /// Current number of entries in cache
    pub total_entries: usize,
    /// Hit rate (hits / (hits + misses))
    pub hit_rate: f64,
}

impl StatsResponse {
    /// Creates a new StatsResponse from a stats snapshot
    pub fn new(adapter: impl Into<String>, stats: &CacheStats) -> Self {
        Self {
            adapter: adapter.into(),
            hits: stats.hits,
            misses: stats.misses,
            evictions: stats.evictions,
            expirations: stats.expirations,
            total_entries: stats.total_entries,
            hit_rate: stats.hit_rate(),
        }
    }
}

/// Response body for the health endpoint (GET /health)
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// `healthy`, or `inactive` while the cache refuses traffic
    pub status: String,
    pub adapter: String,
    /// Current timestamp in ISO 8601 format
    pub timestamp: String,
}

impl HealthResponse {
    pub fn new(adapter: impl Into<String>, active: bool) -> Self {
        Self {
            status: if active { "healthy" } else { "inactive" }.to_string(),
            adapter: adapter.into(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// Error response body for all error conditions
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    /// Error message describing what went wrong
    pub error: String,
}

impl ErrorResponse {
    /// Creates a new ErrorResponse
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}
