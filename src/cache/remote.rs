//! Remote Store Module
//!
//! Minimal client contract for the shared remote key-value store, plus an
//! in-process implementation.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use parking_lot::Mutex;

/// Client for a remote key-value store.
///
/// Implementations must be safe for concurrent use. A `ttl` of `None` stores
/// the value without expiry.
#[async_trait]
pub trait RemoteClient: Send + Sync {
    /// Returns `None` when the key is absent.
    async fn get(&self, key: &str) -> anyhow::Result<Option<Vec<u8>>>;

    /// Unconditional upsert.
    async fn set(&self, key: &str, value: &[u8], ttl: Option<Duration>) -> anyhow::Result<()>;

    /// Writes only if the key exists. Returns whether it was written.
    async fn set_if_exists(
        &self,
        key: &str,
        value: &[u8],
        ttl: Option<Duration>,
    ) -> anyhow::Result<bool>;

    /// Writes only if the key is absent. Returns whether it was written.
    async fn set_if_absent(
        &self,
        key: &str,
        value: &[u8],
        ttl: Option<Duration>,
    ) -> anyhow::Result<bool>;

    /// Deletes keys, returning how many existed.
    async fn delete(&self, keys: &[String]) -> anyhow::Result<u64>;
}

// == In-Memory Remote ==
#[derive(Debug, Clone)]
struct Stored {
    value: Vec<u8>,
    expires_at: Option<Instant>,
}

impl Stored {
    fn new(value: &[u8], ttl: Option<Duration>) -> Self {
        Self {
            value: value.to_vec(),
            expires_at: ttl.map(|ttl| Instant::now() + ttl),
        }
    }

    fn is_live(&self, now: Instant) -> bool {
        self.expires_at.map_or(true, |expires| now < expires)
    }
}

/// Remote store kept in process memory, for tests and loopback setups.
#[derive(Debug, Default)]
pub struct InMemoryRemote {
    data: Mutex<HashMap<String, Stored>>,
    reads: AtomicU64,
    writes: AtomicU64,
    deletes: AtomicU64,
}

impl InMemoryRemote {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of `get` calls served.
    pub fn reads(&self) -> u64 {
        self.reads.load(Ordering::Relaxed)
    }

    /// Number of write calls served, applied or not.
    pub fn writes(&self) -> u64 {
        self.writes.load(Ordering::Relaxed)
    }

    pub fn deletes(&self) -> u64 {
        self.deletes.load(Ordering::Relaxed)
    }

    /// Reads a raw value without counting it as a client read.
    pub fn peek(&self, key: &str) -> Option<Vec<u8>> {
        let now = Instant::now();
        self.data
            .lock()
            .get(key)
            .filter(|stored| stored.is_live(now))
            .map(|stored| stored.value.clone())
    }

    /// TTL the key was last written with, if any.
    pub fn expires_at(&self, key: &str) -> Option<Instant> {
        self.data.lock().get(key).and_then(|stored| stored.expires_at)
    }

    pub fn len(&self) -> usize {
        let now = Instant::now();
        self.data
            .lock()
            .values()
            .filter(|stored| stored.is_live(now))
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn write_if(
        &self,
        key: &str,
        value: &[u8],
        ttl: Option<Duration>,
        must_exist: bool,
    ) -> bool {
        self.writes.fetch_add(1, Ordering::Relaxed);
        let now = Instant::now();
        let mut data = self.data.lock();
        let exists = data.get(key).is_some_and(|stored| stored.is_live(now));
        if exists != must_exist {
            return false;
        }
        data.insert(key.to_string(), Stored::new(value, ttl));
        true
    }
}

#[async_trait]
impl RemoteClient for InMemoryRemote {
    async fn get(&self, key: &str) -> anyhow::Result<Option<Vec<u8>>> {
        self.reads.fetch_add(1, Ordering::Relaxed);
        Ok(self.peek(key))
    }

    async fn set(&self, key: &str, value: &[u8], ttl: Option<Duration>) -> anyhow::Result<()> {
        self.writes.fetch_add(1, Ordering::Relaxed);
        self.data
            .lock()
            .insert(key.to_string(), Stored::new(value, ttl));
        Ok(())
    }

    async fn set_if_exists(
        &self,
        key: &str,
        value: &[u8],
        ttl: Option<Duration>,
    ) -> anyhow::Result<bool> {
        Ok(self.write_if(key, value, ttl, true))
    }

    async fn set_if_absent(
        &self,
        key: &str,
        value: &[u8],
        ttl: Option<Duration>,
    ) -> anyhow::Result<bool> {
        Ok(self.write_if(key, value, ttl, false))
    }

    async fn delete(&self, keys: &[String]) -> anyhow::Result<u64> {
        self.deletes.fetch_add(1, Ordering::Relaxed);
        let mut data = self.data.lock();
        let removed = keys.iter().filter(|key| data.remove(*key).is_some()).count();
        Ok(removed as u64)
    }
}
