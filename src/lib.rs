//! tiercache - pluggable caching engine
//!
//! A concurrent in-memory cache with TTL sweeping and stack-style access,
//! and a tiered cache that fronts a remote key-value store with a local
//! memory tier. Adapters are built by name through a [`Registry`].

pub mod api;
pub mod cache;
pub mod config;
pub mod error;
pub mod models;
pub mod registry;
pub mod tasks;

pub use api::AppState;
pub use cache::{Cache, CacheEntry, MemoryCache, TieredCache, Ttl, Value, WriteMode};
pub use config::Config;
pub use error::{CacheError, Result};
pub use registry::Registry;
pub use tasks::spawn_sweep_task;
