//! Memory Cache Module
//!
//! In-process cache combining a key index with an ordered list of entries.
//! Expiry is enforced by a periodic sweep rather than on the read path.
//!
//! Two lock domains protect the structure: `index` (key -> handle) and
//! `order` (the list). Structural mutators always take `index` before
//! `order`, so the two never disagree on membership once a call returns.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};

use crate::cache::order::{Handle, OrderList};
use crate::cache::{
    Cache, CacheEntry, CacheStats, Counter, Expiry, StatsCounters, Target, Ttl, Value,
    MIN_SWEEP_INTERVAL,
};
use crate::config::MemoryConfig;
use crate::error::{CacheError, Result};
use crate::tasks::{spawn_sweep_task, SweepTask};

// == Sweep Report ==
/// Outcome of one sweep pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    /// Entries whose TTL had elapsed
    pub expired: usize,
    /// Near-expiry entries trimmed to get back under capacity
    pub trimmed: usize,
    /// Nodes no longer referenced by the key index
    pub orphaned: usize,
}

impl SweepReport {
    pub fn removed(&self) -> usize {
        self.expired + self.trimmed + self.orphaned
    }
}

enum Visit {
    Keep,
    Expired,
    Orphaned,
    NearExpiry(Duration),
}

// == Memory Cache ==
/// Concurrent in-memory cache with TTL sweeping and stack-style access.
#[derive(Debug)]
pub struct MemoryCache {
    default_ttl: Duration,
    sweep_interval: Duration,
    active: AtomicBool,
    capacity: AtomicUsize,
    index: RwLock<HashMap<String, Handle>>,
    order: RwLock<OrderList>,
    stats: StatsCounters,
    sweeper: Mutex<Option<SweepTask>>,
}

impl MemoryCache {
    // == Constructor ==
    /// Creates a cache without a background sweeper; call [`sweep`](Self::sweep)
    /// manually or use [`start`](Self::start).
    pub fn new(config: MemoryConfig) -> Self {
        Self {
            default_ttl: config.default_ttl,
            sweep_interval: config.sweep_interval.max(MIN_SWEEP_INTERVAL),
            active: AtomicBool::new(config.active),
            capacity: AtomicUsize::new(config.capacity),
            index: RwLock::new(HashMap::new()),
            order: RwLock::new(OrderList::new()),
            stats: StatsCounters::new(),
            sweeper: Mutex::new(None),
        }
    }

    /// Creates a shared cache and starts its background sweeper.
    pub fn start(config: MemoryConfig) -> Arc<Self> {
        let cache = Arc::new(Self::new(config));
        cache.start_sweeper();
        cache
    }

    /// Starts the background sweeper if it isn't running yet.
    ///
    /// The task only holds a weak reference, so dropping the last `Arc`
    /// ends it. Returns false when no Tokio runtime is available.
    pub fn start_sweeper(self: &Arc<Self>) -> bool {
        let mut sweeper = self.sweeper.lock();
        if sweeper.is_some() {
            return true;
        }
        *sweeper = spawn_sweep_task(Arc::downgrade(self), self.sweep_interval);
        sweeper.is_some()
    }

    /// Stops the background sweeper and waits for it to finish.
    pub async fn shutdown(&self) {
        let task = self.sweeper.lock().take();
        if let Some(task) = task {
            task.stop().await;
        }
    }

    pub fn is_sweeping(&self) -> bool {
        self.sweeper.lock().is_some()
    }

    // == Settings ==
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    pub fn set_active(&self, active: bool) {
        self.active.store(active, Ordering::Release);
    }

    pub fn capacity(&self) -> usize {
        self.capacity.load(Ordering::Relaxed)
    }

    /// Changes the soft capacity; the next sweep trims down to it.
    pub fn set_capacity(&self, capacity: usize) {
        self.capacity.store(capacity, Ordering::Relaxed);
    }

    pub fn default_ttl(&self) -> Duration {
        self.default_ttl
    }

    pub fn sweep_interval(&self) -> Duration {
        self.sweep_interval
    }

    // == Get ==
    /// Retrieves a value by key and promotes it to the front.
    ///
    /// TTL is not checked here: an expired entry stays readable until the
    /// next sweep removes it.
    pub fn get(&self, key: &str, target: Target) -> Result<Value> {
        if !self.is_active() {
            return Err(CacheError::Inactive);
        }

        let handle = self.index.read().get(key).copied();
        let value = handle.and_then(|handle| {
            let mut order = self.order.write();
            let value = order.get_mut(handle).map(|entry| {
                entry.touch();
                entry.value.clone()
            });
            if value.is_some() {
                order.move_to_front(handle);
            }
            value
        });

        match value {
            Some(value) => {
                self.stats.record_hit();
                value.into_target(target)
            }
            None => {
                self.stats.record_miss();
                Err(CacheError::CacheMiss(key.to_string()))
            }
        }
    }

    // == Set ==
    /// Stores an entry, silently dropping it when the cache is inactive or
    /// full. Use [`try_set`](Self::try_set) to learn whether it was admitted.
    pub fn set(&self, entry: CacheEntry) -> Result<()> {
        match self.try_set(entry) {
            Err(CacheError::Inactive) | Err(CacheError::CacheFull(_)) => Ok(()),
            other => other,
        }
    }

    /// Stores an entry, reporting rejection by admission control.
    ///
    /// An existing key is replaced in place without moving it. A new key is
    /// inserted at the front. An already-expired TTL stores nothing and
    /// removes any previous entry for the key. A TTL under one second is
    /// replaced by the default here, once, with a warning.
    pub fn try_set(&self, mut entry: CacheEntry) -> Result<()> {
        if !self.is_active() {
            return Err(CacheError::Inactive);
        }
        if entry.key.is_empty() {
            return Err(CacheError::InvalidRequest(
                "Key cannot be empty".to_string(),
            ));
        }
        if entry.ttl == Ttl::Expired {
            self.remove_key(&entry.key);
            return Ok(());
        }

        entry.ttl = entry.ttl.normalized(&entry.key);
        entry.touch();
        let mut index = self.index.write();

        if let Some(handle) = index.get(&entry.key).copied() {
            let mut order = self.order.write();
            if let Some(slot) = order.get_mut(handle) {
                *slot = entry;
                return Ok(());
            }
            index.remove(&entry.key);
        }

        let mut order = self.order.write();
        if order.len() >= self.capacity() {
            return Err(CacheError::CacheFull(format!(
                "capacity of {} entries reached",
                self.capacity()
            )));
        }
        let key = entry.key.clone();
        let handle = order.push_front(entry);
        index.insert(key, handle);
        Ok(())
    }

    // == Delete ==
    /// Removes an entry by key.
    pub fn delete(&self, key: &str) -> Result<()> {
        self.remove_key(key)
            .map(|_| ())
            .ok_or_else(|| CacheError::NotFound(key.to_string()))
    }

    // == Exists ==
    /// Presence check; does not refresh access time.
    pub fn exists(&self, key: &str) -> bool {
        self.is_active() && self.index.read().contains_key(key)
    }

    // == Keys ==
    /// Keys in recency order, most recent first.
    pub fn keys(&self) -> Vec<String> {
        if !self.is_active() {
            return Vec::new();
        }
        self.order
            .read()
            .iter()
            .filter(|(_, entry)| !entry.key.is_empty())
            .map(|(_, entry)| entry.key.clone())
            .collect()
    }

    // == Length ==
    /// Number of entries, keyed and pushed.
    pub fn len(&self) -> usize {
        self.order.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.read().is_empty()
    }

    // == Clear ==
    pub fn clear(&self) {
        let mut index = self.index.write();
        let mut order = self.order.write();
        index.clear();
        order.clear();
    }

    // == Stats ==
    pub fn stats(&self) -> CacheStats {
        self.stats.snapshot(self.len())
    }

    // == List Access ==
    /// Peeks the front entry, refreshing its access time.
    pub fn front(&self) -> Option<CacheEntry> {
        self.peek(|order| order.front())
    }

    /// Peeks the back entry, refreshing its access time.
    pub fn back(&self) -> Option<CacheEntry> {
        self.peek(|order| order.back())
    }

    /// Promotes `key` to the front; no-op if absent.
    pub fn move_to_front(&self, key: &str) {
        let handle = self.index.read().get(key).copied();
        if let Some(handle) = handle {
            self.order.write().move_to_front(handle);
        }
    }

    /// Demotes `key` to the back; no-op if absent.
    pub fn move_to_back(&self, key: &str) {
        let handle = self.index.read().get(key).copied();
        if let Some(handle) = handle {
            self.order.write().move_to_back(handle);
        }
    }

    // == Stack Access ==
    /// Appends a keyless entry to the back. Rejected when inactive or full.
    pub fn push(&self, value: impl Into<Value>) -> bool {
        if !self.is_active() {
            return false;
        }
        let mut order = self.order.write();
        if order.len() >= self.capacity() {
            return false;
        }
        order.push_back(CacheEntry::anonymous(value.into()));
        true
    }

    /// Removes the front entry and returns its value.
    pub fn shift(&self) -> Option<Value> {
        self.take(|order| order.front())
    }

    /// Removes the back entry and returns its value.
    pub fn pop(&self) -> Option<Value> {
        self.take(|order| order.back())
    }

    // == Counters ==
    /// Increments an integer value in place.
    pub fn incr(&self, key: &str) -> Result<Counter> {
        self.step_counter(key, Counter::incremented)
    }

    /// Decrements an integer value in place; unsigned values stop at zero.
    pub fn decr(&self, key: &str) -> Result<Counter> {
        self.step_counter(key, Counter::decremented)
    }

    // == Sweep ==
    /// Runs one eviction pass.
    ///
    /// Walks the list front to back once, removing expired entries and
    /// remembering fresh ones (idle for less than a third of their TTL). If
    /// the cache is still over capacity afterwards, those candidates are
    /// evicted soonest-to-expire first until it fits. Never-expiring entries
    /// are never trimmed.
    pub fn sweep(&self) -> SweepReport {
        let mut report = SweepReport::default();
        if !self.is_active() || self.is_empty() {
            return report;
        }

        let now = Instant::now();
        let mut candidates: Vec<(Duration, Handle)> = Vec::new();
        let mut cursor = self.order.read().front();

        while let Some(handle) = cursor {
            // Locks are released between nodes so writers aren't starved
            let (visit, next) = {
                let index = self.index.read();
                let order = self.order.read();
                let Some(entry) = order.get(handle) else {
                    break;
                };
                (self.visit(&index, handle, entry, now), order.next(handle))
            };

            match visit {
                Visit::Keep => {}
                Visit::NearExpiry(remaining) => candidates.push((remaining, handle)),
                Visit::Orphaned => {
                    if self.evict_if(handle, |_| true) {
                        report.orphaned += 1;
                    }
                }
                Visit::Expired => {
                    let default_ttl = self.default_ttl;
                    if self.evict_if(handle, |entry| entry.is_expired(default_ttl, now)) {
                        report.expired += 1;
                    }
                }
            }
            cursor = next;
        }

        let over = self.len().saturating_sub(self.capacity());
        if over > 0 {
            candidates.sort_by_key(|(remaining, _)| *remaining);
            for (_, handle) in candidates {
                if report.trimmed >= over {
                    break;
                }
                if self.evict_if(handle, |_| true) {
                    report.trimmed += 1;
                }
            }
        }

        self.stats.record_expirations(report.expired as u64);
        self.stats.record_evictions(report.trimmed as u64);
        report
    }

    /// Checks that every keyed node is indexed and every index entry is
    /// linked exactly once.
    pub fn is_consistent(&self) -> bool {
        let index = self.index.read();
        let order = self.order.read();

        let mut keyed = 0;
        for (handle, entry) in order.iter() {
            if entry.key.is_empty() {
                continue;
            }
            if index.get(&entry.key) != Some(&handle) {
                return false;
            }
            keyed += 1;
        }
        keyed == index.len() && index.values().all(|handle| order.contains(*handle))
    }

    // == Internals ==
    fn visit(
        &self,
        index: &HashMap<String, Handle>,
        handle: Handle,
        entry: &CacheEntry,
        now: Instant,
    ) -> Visit {
        if !entry.key.is_empty() && index.get(&entry.key) != Some(&handle) {
            return Visit::Orphaned;
        }
        match entry.expiry(self.default_ttl) {
            Expiry::Never => Visit::Keep,
            Expiry::Immediately => Visit::Expired,
            Expiry::After(ttl) => {
                let idle = entry.idle(now);
                if idle >= ttl {
                    Visit::Expired
                } else if idle < ttl / 3 {
                    Visit::NearExpiry(ttl - idle)
                } else {
                    Visit::Keep
                }
            }
        }
    }

    fn remove_key(&self, key: &str) -> Option<CacheEntry> {
        let mut index = self.index.write();
        let handle = index.remove(key)?;
        self.order.write().remove(handle)
    }

    /// Removes the node behind `handle` if it still exists and passes the
    /// check, keeping the index in step.
    fn evict_if(&self, handle: Handle, should_evict: impl FnOnce(&CacheEntry) -> bool) -> bool {
        let mut index = self.index.write();
        let mut order = self.order.write();

        if !order.get(handle).is_some_and(should_evict) {
            return false;
        }
        let Some(entry) = order.remove(handle) else {
            return false;
        };
        if !entry.key.is_empty() && index.get(&entry.key) == Some(&handle) {
            index.remove(&entry.key);
        }
        true
    }

    fn peek(&self, locate: impl FnOnce(&OrderList) -> Option<Handle>) -> Option<CacheEntry> {
        if !self.is_active() {
            return None;
        }
        let mut order = self.order.write();
        let handle = locate(&order)?;
        let entry = order.get_mut(handle)?;
        entry.touch();
        Some(entry.clone())
    }

    fn take(&self, locate: impl FnOnce(&OrderList) -> Option<Handle>) -> Option<Value> {
        if !self.is_active() {
            return None;
        }
        let mut index = self.index.write();
        let mut order = self.order.write();
        let handle = locate(&order)?;
        let entry = order.remove(handle)?;
        if !entry.key.is_empty() && index.get(&entry.key) == Some(&handle) {
            index.remove(&entry.key);
        }
        Some(entry.value)
    }

    fn step_counter(&self, key: &str, step: fn(Counter) -> Result<Counter>) -> Result<Counter> {
        let handle = self
            .index
            .read()
            .get(key)
            .copied()
            .ok_or_else(|| CacheError::NotFound(key.to_string()))?;

        let mut order = self.order.write();
        let entry = order
            .get_mut(handle)
            .ok_or_else(|| CacheError::NotFound(key.to_string()))?;
        let Value::Counter(counter) = entry.value else {
            return Err(CacheError::TypeMismatch(format!(
                "value for key {} is {}, not an integer",
                key,
                entry.value.kind()
            )));
        };

        let next = step(counter)?;
        entry.value = Value::Counter(next);
        entry.touch();
        Ok(next)
    }
}

impl Drop for MemoryCache {
    fn drop(&mut self) {
        if let Some(task) = self.sweeper.get_mut().take() {
            task.cancel();
        }
    }
}

#[async_trait]
impl Cache for MemoryCache {
    fn name(&self) -> &'static str {
        "memory"
    }

    fn is_active(&self) -> bool {
        MemoryCache::is_active(self)
    }

    fn set_active(&self, active: bool) {
        MemoryCache::set_active(self, active)
    }

    async fn get(&self, key: &str, target: Target) -> Result<Value> {
        MemoryCache::get(self, key, target)
    }

    async fn set(&self, entry: CacheEntry) -> Result<()> {
        MemoryCache::set(self, entry)
    }

    async fn exists(&self, key: &str) -> bool {
        MemoryCache::exists(self, key)
    }

    async fn delete(&self, key: &str) -> Result<()> {
        MemoryCache::delete(self, key)
    }

    async fn keys(&self) -> Vec<String> {
        MemoryCache::keys(self)
    }

    fn len(&self) -> usize {
        MemoryCache::len(self)
    }

    async fn clear(&self) -> Result<()> {
        MemoryCache::clear(self);
        Ok(())
    }

    /// Clears the cache and stops its sweeper.
    async fn close(&self) -> Result<()> {
        MemoryCache::clear(self);
        self.shutdown().await;
        Ok(())
    }

    fn stats(&self) -> CacheStats {
        MemoryCache::stats(self)
    }
}
