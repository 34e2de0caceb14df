//! Cache Module
//!
//! Provides the cache contract and its two implementations: a concurrent
//! in-memory cache with TTL sweeping, and a tiered cache that fronts a
//! remote store with a local memory tier.

mod codec;
mod contract;
mod entry;
mod memory;
pub(crate) mod order;
mod remote;
mod stats;
mod tiered;
mod value;

#[cfg(test)]
mod property_tests;

use std::time::Duration;

// Re-export public types
pub use codec::{Codec, DefaultCodec, LZ4_COMPRESSION, NO_COMPRESSION};
pub use contract::Cache;
pub use entry::{CacheEntry, Expiry, Ttl, WriteMode};
pub use memory::{MemoryCache, SweepReport};
pub use remote::{InMemoryRemote, RemoteClient};
pub use stats::{CacheStats, StatsCounters};
pub use tiered::{TieredCache, TieredCacheBuilder};
pub use value::{Counter, Target, Value};

// == Public Constants ==
/// TTL applied when an entry doesn't request one
pub const DEFAULT_TTL: Duration = Duration::from_secs(3600);

/// Requested TTLs below this fall back to the default
pub const MIN_TTL: Duration = Duration::from_secs(1);

/// Default soft capacity of a memory cache
pub const DEFAULT_CAPACITY: usize = 1000;

/// Default interval between background sweeps
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(30);

/// Lower bound on the sweep interval
pub const MIN_SWEEP_INTERVAL: Duration = Duration::from_millis(50);

/// Payloads at or above this many bytes are compressed
pub const DEFAULT_COMPRESSION_THRESHOLD: usize = 64;
