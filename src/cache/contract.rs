//! Cache Contract Module
//!
//! The capability interface every cache implementation satisfies.

use async_trait::async_trait;

use crate::cache::{CacheEntry, CacheStats, Target, Value};
use crate::error::Result;

/// Common operations shared by the memory and tiered caches.
///
/// Cancellation and deadlines are expressed by dropping the returned future
/// (or wrapping it in `tokio::time::timeout`); no context value is threaded
/// through the calls.
#[async_trait]
pub trait Cache: Send + Sync {
    /// Identifies the implementation, e.g. `"memory"`.
    fn name(&self) -> &'static str;

    /// Reports whether the cache is enabled.
    fn is_active(&self) -> bool;

    /// Enables or disables the cache.
    fn set_active(&self, active: bool);

    /// Reads the value for `key` in the requested shape.
    async fn get(&self, key: &str, target: Target) -> Result<Value>;

    /// Writes an entry, honouring its TTL and write directives.
    async fn set(&self, entry: CacheEntry) -> Result<()>;

    async fn exists(&self, key: &str) -> bool;

    async fn delete(&self, key: &str) -> Result<()>;

    async fn keys(&self) -> Vec<String>;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    async fn clear(&self) -> Result<()>;

    async fn close(&self) -> Result<()>;

    /// Snapshot of the cache's counters.
    fn stats(&self) -> CacheStats {
        CacheStats {
            total_entries: self.len(),
            ..CacheStats::default()
        }
    }
}
