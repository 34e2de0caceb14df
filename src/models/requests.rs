//! Request DTOs for the cache server API
//!
//! Defines the structure of incoming HTTP request bodies.

use std::time::Duration;

use serde::Deserialize;

use crate::cache::{CacheEntry, Ttl, WriteMode};

/// Write directive accepted on the wire.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SetMode {
    #[default]
    Always,
    IfExists,
    IfAbsent,
}

impl From<SetMode> for WriteMode {
    fn from(mode: SetMode) -> Self {
        match mode {
            SetMode::Always => WriteMode::Always,
            SetMode::IfExists => WriteMode::OnlyIfExists,
            SetMode::IfAbsent => WriteMode::OnlyIfAbsent,
        }
    }
}

/// Request body for the SET operation (PUT /set)
///
/// # Fields
/// - `key`: The cache key to store the value under
/// - `value`: The value to store
/// - `ttl`: Optional TTL in seconds; negative expires immediately, 0 uses the default
/// - `persist`: Store without expiry, overriding `ttl`
/// - `mode`: `always`, `if_exists` or `if_absent`
/// - `skip_local_cache`: Bypass the local tier of a tiered cache
#[derive(Debug, Clone, Deserialize)]
pub struct SetRequest {
    /// The cache key
    pub key: String,
    /// The value to store
    pub value: String,
    /// Optional TTL in seconds
    #[serde(default)]
    pub ttl: Option<i64>,
    #[serde(default)]
    pub persist: bool,
    #[serde(default)]
    pub mode: SetMode,
    #[serde(default)]
    pub skip_local_cache: bool,
}

impl SetRequest {
    /// Validates the request data
    ///
    /// Returns an error message if validation fails, None if valid.
    pub fn validate(&self) -> Option<String> {
        if self.key.is_empty() {
            return Some("Key cannot be empty".to_string());
        }
        if self.key.len() > 256 {
            return Some("Key exceeds maximum length of 256 characters".to_string());
        }
        None
    }

    /// Resolves the requested lifetime.
    pub fn ttl(&self) -> Ttl {
        if self.persist {
            return Ttl::Never;
        }
        match self.ttl {
            Some(secs) => Ttl::from_secs(secs),
            None => Ttl::Default,
        }
    }

    /// Converts the request into a cache entry carrying its directives.
    pub fn into_entry(self) -> CacheEntry {
        let ttl = self.ttl();
        let mut entry = CacheEntry::new(self.key, self.value)
            .with_ttl(ttl)
            .with_write_mode(self.mode.into());
        if self.skip_local_cache {
            entry = entry.skipping_local_cache();
        }
        entry
    }
}
