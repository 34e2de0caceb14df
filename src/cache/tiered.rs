//! Tiered Cache Module
//!
//! A remote key-value store optionally fronted by a local [`MemoryCache`].
//! Both tiers hold the same marshaled payload for a key.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use crate::cache::{
    Cache, CacheEntry, CacheStats, Codec, DefaultCodec, Expiry, MemoryCache, RemoteClient,
    StatsCounters, Target, Ttl, Value, WriteMode,
};
use crate::config::TieredConfig;
use crate::error::{CacheError, Result};

// == Builder ==
/// Wires the tiers and codec of a [`TieredCache`].
pub struct TieredCacheBuilder {
    config: TieredConfig,
    remote: Option<Arc<dyn RemoteClient>>,
    local: Option<Arc<MemoryCache>>,
    codec: Option<Arc<dyn Codec>>,
}

impl TieredCacheBuilder {
    pub fn remote(mut self, remote: Arc<dyn RemoteClient>) -> Self {
        self.remote = Some(remote);
        self
    }

    pub fn local(mut self, local: Arc<MemoryCache>) -> Self {
        self.local = Some(local);
        self
    }

    /// Replaces the default MessagePack + LZ4 codec.
    pub fn codec(mut self, codec: Arc<dyn Codec>) -> Self {
        self.codec = Some(codec);
        self
    }

    pub fn build(self) -> TieredCache {
        let threshold = self.config.compression_threshold;
        let codec = self
            .codec
            .unwrap_or_else(|| Arc::new(DefaultCodec::new(threshold)) as Arc<dyn Codec>);

        TieredCache {
            remote: self.remote,
            local: self.local,
            codec,
            key_prefix: self.config.key_prefix,
            default_ttl: self.config.default_ttl,
            stats_enabled: self.config.stats_enabled,
            active: AtomicBool::new(true),
            stats: StatsCounters::new(),
        }
    }
}

// == Tiered Cache ==
/// Cache that reads through a local tier to a remote store and writes both.
pub struct TieredCache {
    remote: Option<Arc<dyn RemoteClient>>,
    local: Option<Arc<MemoryCache>>,
    codec: Arc<dyn Codec>,
    key_prefix: String,
    default_ttl: Duration,
    stats_enabled: bool,
    active: AtomicBool,
    stats: StatsCounters,
}

impl fmt::Debug for TieredCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TieredCache")
            .field("remote", &self.remote.is_some())
            .field("local", &self.local)
            .field("codec", &self.codec)
            .field("key_prefix", &self.key_prefix)
            .field("default_ttl", &self.default_ttl)
            .field("stats_enabled", &self.stats_enabled)
            .finish()
    }
}

impl TieredCache {
    pub fn builder(config: TieredConfig) -> TieredCacheBuilder {
        TieredCacheBuilder {
            config,
            remote: None,
            local: None,
            codec: None,
        }
    }

    /// Local-only cache over `local`.
    pub fn local_only(config: TieredConfig, local: Arc<MemoryCache>) -> Self {
        Self::builder(config).local(local).build()
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    pub fn set_active(&self, active: bool) {
        self.active.store(active, Ordering::Release);
    }

    pub fn local(&self) -> Option<&Arc<MemoryCache>> {
        self.local.as_ref()
    }

    pub fn stats(&self) -> CacheStats {
        self.stats.snapshot(self.len())
    }

    pub fn len(&self) -> usize {
        self.local.as_ref().map_or(0, |local| local.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    // == Get ==
    /// Reads `key`, trying the local tier before the remote store.
    pub async fn get(&self, key: &str, target: Target) -> Result<Value> {
        let payload = self.fetch(key, false).await?;
        self.codec.unmarshal(&payload, target)
    }

    /// Reads `key` straight from the remote store.
    pub async fn get_skipping_local_cache(&self, key: &str, target: Target) -> Result<Value> {
        let payload = self.fetch(key, true).await?;
        self.codec.unmarshal(&payload, target)
    }

    /// Reads and deserializes a value stored with [`set_object`](Self::set_object).
    pub async fn get_object<T: DeserializeOwned>(&self, key: &str) -> Result<T> {
        self.get(key, Target::Any).await?.into_object()
    }

    // == Set ==
    /// Marshals the entry's value and writes it to both tiers.
    ///
    /// The local tier receives the marshaled bytes, never the typed value.
    /// Exactly one remote write primitive runs, chosen by the write mode.
    pub async fn set(&self, mut entry: CacheEntry) -> Result<()> {
        if !self.is_active() {
            return Err(CacheError::Inactive);
        }
        if entry.key.is_empty() {
            return Err(CacheError::InvalidRequest(
                "Key cannot be empty".to_string(),
            ));
        }
        self.ensure_configured()?;
        entry.ttl = self.pinned_ttl(entry.ttl.normalized(&entry.key));

        let payload = self.codec.marshal(&entry.value)?;

        let Some(remote) = &self.remote else {
            return self.set_local_only(entry, payload);
        };

        if let Some(local) = self.local_tier(entry.skip_local_cache) {
            let local_entry = entry.clone_with_value(Value::Bytes(payload.clone()));
            if let Err(e) = local.try_set(local_entry) {
                debug!(key = %entry.key, "local tier rejected write: {}", e);
            }
        }

        let ttl = match entry.ttl.resolve(self.default_ttl) {
            Expiry::Immediately => return Ok(()),
            Expiry::Never => None,
            Expiry::After(ttl) => Some(ttl),
        };

        let remote_key = self.remote_key(&entry.key);
        let applied = match entry.write_mode {
            WriteMode::Always => {
                remote
                    .set(&remote_key, &payload, ttl)
                    .await
                    .map_err(CacheError::Remote)?;
                true
            }
            WriteMode::OnlyIfExists => remote
                .set_if_exists(&remote_key, &payload, ttl)
                .await
                .map_err(CacheError::Remote)?,
            WriteMode::OnlyIfAbsent => remote
                .set_if_absent(&remote_key, &payload, ttl)
                .await
                .map_err(CacheError::Remote)?,
        };

        if !applied {
            debug!(key = %entry.key, mode = ?entry.write_mode, "conditional write not applied");
            // Drop the local copy so the next read sees the remote value
            if let Some(local) = self.local_tier(entry.skip_local_cache) {
                let _ = local.delete(&entry.key);
            }
        }

        Ok(())
    }

    /// Serializes `value` and stores it under `key`.
    pub async fn set_object<T: Serialize>(&self, key: &str, value: &T, ttl: Ttl) -> Result<()> {
        let entry = CacheEntry::new(key, Value::object(value)?).with_ttl(ttl);
        self.set(entry).await
    }

    // == Delete ==
    /// Removes `key` from both tiers.
    pub async fn delete(&self, key: &str) -> Result<()> {
        self.ensure_configured()?;

        let Some(remote) = &self.remote else {
            return self.delete_from_local_cache(key);
        };

        if let Some(local) = &self.local {
            let _ = local.delete(key);
        }
        remote
            .delete(&[self.remote_key(key)])
            .await
            .map_err(CacheError::Remote)?;
        Ok(())
    }

    /// Removes `key` from the local tier only.
    pub fn delete_from_local_cache(&self, key: &str) -> Result<()> {
        match &self.local {
            Some(local) => local.delete(key),
            None => Err(CacheError::Configuration(
                "no local cache configured".to_string(),
            )),
        }
    }

    /// Presence check across both tiers; does not touch hit/miss counters.
    pub async fn exists(&self, key: &str) -> bool {
        if !self.is_active() {
            return false;
        }
        if self.local.as_ref().is_some_and(|local| local.exists(key)) {
            return true;
        }
        match &self.remote {
            Some(remote) => matches!(remote.get(&self.remote_key(key)).await, Ok(Some(_))),
            None => false,
        }
    }

    // == Internals ==
    fn ensure_configured(&self) -> Result<()> {
        if self.remote.is_none() && self.local.is_none() {
            return Err(CacheError::Configuration(
                "neither a remote store nor a local cache is configured".to_string(),
            ));
        }
        Ok(())
    }

    fn local_tier(&self, skip: bool) -> Option<&Arc<MemoryCache>> {
        if skip {
            None
        } else {
            self.local.as_ref()
        }
    }

    fn remote_key(&self, key: &str) -> String {
        format!("{}{}", self.key_prefix, key)
    }

    fn record_hit(&self) {
        if self.stats_enabled {
            self.stats.record_hit();
        }
    }

    fn record_miss(&self) {
        if self.stats_enabled {
            self.stats.record_miss();
        }
    }

    /// Local-only write: success is whatever the local tier reports.
    /// Replaces `Ttl::Default` with this cache's default so the local tier
    /// ages entries the same way the remote store does.
    fn pinned_ttl(&self, ttl: Ttl) -> Ttl {
        match ttl {
            Ttl::Default => Ttl::After(self.default_ttl),
            other => other,
        }
    }

    fn set_local_only(&self, entry: CacheEntry, payload: Vec<u8>) -> Result<()> {
        let local = self.local_tier(entry.skip_local_cache).ok_or_else(|| {
            CacheError::Configuration(
                "no remote store configured and the local cache was skipped".to_string(),
            )
        })?;

        let present = local.exists(&entry.key);
        match entry.write_mode {
            WriteMode::OnlyIfExists if !present => return Ok(()),
            WriteMode::OnlyIfAbsent if present => return Ok(()),
            _ => {}
        }

        local.try_set(entry.clone_with_value(Value::Bytes(payload)))
    }

    /// Returns the raw payload for `key`.
    async fn fetch(&self, key: &str, skip_local: bool) -> Result<Vec<u8>> {
        if !self.is_active() {
            return Err(CacheError::Inactive);
        }
        self.ensure_configured()?;

        if let Some(local) = self.local_tier(skip_local) {
            match local.get(key, Target::Bytes) {
                Ok(Value::Bytes(payload)) => {
                    self.record_hit();
                    return Ok(payload);
                }
                Ok(other) => {
                    return Err(CacheError::CorruptPayload(format!(
                        "local tier holds a {} value for '{}'",
                        other.kind(),
                        key
                    )));
                }
                Err(e) if e.is_miss() || matches!(e, CacheError::Inactive) => {}
                Err(e) => return Err(e),
            }
        }

        let Some(remote) = &self.remote else {
            if skip_local {
                return Err(CacheError::Configuration(
                    "no remote store configured and the local cache was skipped".to_string(),
                ));
            }
            self.record_miss();
            return Err(CacheError::CacheMiss(key.to_string()));
        };

        let payload = match remote.get(&self.remote_key(key)).await {
            Ok(Some(payload)) => payload,
            Ok(None) => {
                self.record_miss();
                return Err(CacheError::CacheMiss(key.to_string()));
            }
            Err(e) => {
                self.record_miss();
                return Err(CacheError::Remote(e));
            }
        };
        self.record_hit();

        if let Some(local) = self.local_tier(skip_local) {
            let entry = CacheEntry::new(key, Value::Bytes(payload.clone()))
                .with_ttl(self.pinned_ttl(Ttl::Default));
            if let Err(e) = local.try_set(entry) {
                debug!(key = %key, "failed to repopulate local tier: {}", e);
            }
        }

        Ok(payload)
    }
}

#[async_trait]
impl Cache for TieredCache {
    fn name(&self) -> &'static str {
        "tiered"
    }

    fn is_active(&self) -> bool {
        TieredCache::is_active(self)
    }

    fn set_active(&self, active: bool) {
        TieredCache::set_active(self, active)
    }

    async fn get(&self, key: &str, target: Target) -> Result<Value> {
        TieredCache::get(self, key, target).await
    }

    async fn set(&self, entry: CacheEntry) -> Result<()> {
        TieredCache::set(self, entry).await
    }

    async fn exists(&self, key: &str) -> bool {
        TieredCache::exists(self, key).await
    }

    async fn delete(&self, key: &str) -> Result<()> {
        TieredCache::delete(self, key).await
    }

    async fn keys(&self) -> Vec<String> {
        self.local.as_ref().map(|local| local.keys()).unwrap_or_default()
    }

    fn len(&self) -> usize {
        TieredCache::len(self)
    }

    async fn clear(&self) -> Result<()> {
        if let Some(local) = &self.local {
            local.clear();
        }
        Ok(())
    }

    /// Closes the local tier. The remote client is not owned and stays open.
    async fn close(&self) -> Result<()> {
        match &self.local {
            Some(local) => Cache::close(local.as_ref()).await,
            None => Ok(()),
        }
    }

    fn stats(&self) -> CacheStats {
        TieredCache::stats(self)
    }
}
