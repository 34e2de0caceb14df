//! Cache Entry Module
//!
//! Defines the unit of storage together with its TTL and write directives.

use std::time::{Duration, Instant};

use tracing::warn;

use crate::cache::{Value, MIN_TTL};

// == TTL ==
/// Requested lifetime of an entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Ttl {
    /// Use the cache's default TTL
    #[default]
    Default,
    /// Never expire
    Never,
    /// Already expired: never stored, immediately evictable
    Expired,
    /// Expire after the given duration of inactivity
    After(Duration),
}

/// A TTL after resolution against a cache default.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Expiry {
    Never,
    Immediately,
    After(Duration),
}

impl Ttl {
    /// Builds a TTL from signed seconds: negative is expired, zero is the default.
    pub fn from_secs(secs: i64) -> Self {
        match secs {
            s if s < 0 => Ttl::Expired,
            0 => Ttl::Default,
            s => Ttl::After(Duration::from_secs(s as u64)),
        }
    }

    /// Normalizes a requested TTL before it is stored.
    ///
    /// Durations under one second are too short to be meaningful and fall
    /// back to the default with a warning rather than an error.
    pub fn normalized(self, key: &str) -> Ttl {
        match self {
            Ttl::After(ttl) if ttl.is_zero() => Ttl::Default,
            Ttl::After(ttl) if ttl < MIN_TTL => {
                warn!(key = %key, ttl = ?ttl, "too short TTL, using the default instead");
                Ttl::Default
            }
            other => other,
        }
    }

    /// Resolves the TTL against `default`.
    ///
    /// Expects a [`normalized`](Self::normalized) TTL; anything shorter than
    /// the minimum still maps to the default, silently.
    pub fn resolve(self, default: Duration) -> Expiry {
        match self {
            Ttl::Default => Expiry::After(default),
            Ttl::Never => Expiry::Never,
            Ttl::Expired => Expiry::Immediately,
            Ttl::After(ttl) if ttl < MIN_TTL => Expiry::After(default),
            Ttl::After(ttl) => Expiry::After(ttl),
        }
    }
}

// == Write Mode ==
/// Directive controlling whether a write is unconditional or conditional.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WriteMode {
    #[default]
    Always,
    OnlyIfExists,
    OnlyIfAbsent,
}

// == Cache Entry ==
/// Represents a single cache entry with value and metadata.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    /// Unique key; empty for entries appended with `push`
    pub key: String,
    /// The stored value
    pub value: Value,
    /// Last read or write
    pub last_access: Instant,
    /// Requested lifetime
    pub ttl: Ttl,
    /// Write directive, not persisted state
    pub write_mode: WriteMode,
    /// Write directive for the tiered cache, not persisted state
    pub skip_local_cache: bool,
}

impl CacheEntry {
    // == Constructor ==
    /// Creates an entry with the default TTL and an unconditional write mode.
    pub fn new(key: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
            last_access: Instant::now(),
            ttl: Ttl::Default,
            write_mode: WriteMode::Always,
            skip_local_cache: false,
        }
    }

    /// Creates a keyless entry for stack-style use.
    pub(crate) fn anonymous(value: Value) -> Self {
        Self::new(String::new(), value)
    }

    pub fn with_ttl(mut self, ttl: Ttl) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn with_write_mode(mut self, write_mode: WriteMode) -> Self {
        self.write_mode = write_mode;
        self
    }

    /// Marks the write as bypassing the local tier.
    pub fn skipping_local_cache(mut self) -> Self {
        self.skip_local_cache = true;
        self
    }

    /// Copies every field but swaps in a different value.
    pub fn clone_with_value(&self, value: Value) -> Self {
        Self {
            key: self.key.clone(),
            value,
            last_access: self.last_access,
            ttl: self.ttl,
            write_mode: self.write_mode,
            skip_local_cache: self.skip_local_cache,
        }
    }

    // == Access Bookkeeping ==
    /// Records an access now.
    pub fn touch(&mut self) {
        self.last_access = Instant::now();
    }

    /// Time elapsed since the last access.
    pub fn idle(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.last_access)
    }

    // == Expiry ==
    /// Resolves this entry's TTL against the cache default.
    pub fn expiry(&self, default: Duration) -> Expiry {
        self.ttl.resolve(default)
    }

    /// Checks if the entry has expired.
    ///
    /// Boundary condition: an entry is expired once its idle time reaches or
    /// exceeds its TTL.
    pub fn is_expired(&self, default: Duration, now: Instant) -> bool {
        match self.expiry(default) {
            Expiry::Never => false,
            Expiry::Immediately => true,
            Expiry::After(ttl) => self.idle(now) >= ttl,
        }
    }

    /// Returns remaining TTL, or None if the entry never expires.
    ///
    /// # Returns
    /// - `Some(Duration::ZERO)` if the entry has expired
    /// - `Some(remaining)` if the entry has a TTL and hasn't expired
    /// - `None` if the entry never expires
    pub fn ttl_remaining(&self, default: Duration, now: Instant) -> Option<Duration> {
        match self.expiry(default) {
            Expiry::Never => None,
            Expiry::Immediately => Some(Duration::ZERO),
            Expiry::After(ttl) => Some(ttl.saturating_sub(self.idle(now))),
        }
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;

    const DEFAULT: Duration = Duration::from_secs(3600);

    #[test]
    fn test_entry_creation_defaults() {
        let entry = CacheEntry::new("key", "test_value");

        assert_eq!(entry.key, "key");
        assert_eq!(entry.value.as_text(), Some("test_value"));
        assert_eq!(entry.ttl, Ttl::Default);
        assert_eq!(entry.write_mode, WriteMode::Always);
        assert!(!entry.skip_local_cache);
    }

    #[test]
    fn test_ttl_resolution() {
        assert_eq!(Ttl::Default.resolve(DEFAULT), Expiry::After(DEFAULT));
        assert_eq!(Ttl::Never.resolve(DEFAULT), Expiry::Never);
        assert_eq!(Ttl::Expired.resolve(DEFAULT), Expiry::Immediately);
        assert_eq!(
            Ttl::After(Duration::ZERO).resolve(DEFAULT),
            Expiry::After(DEFAULT)
        );
        assert_eq!(
            Ttl::After(Duration::from_secs(5)).resolve(DEFAULT),
            Expiry::After(Duration::from_secs(5))
        );
    }

    #[test]
    fn test_too_short_ttl_falls_back_to_default() {
        let expiry = Ttl::After(Duration::from_millis(500)).resolve(DEFAULT);
        assert_eq!(expiry, Expiry::After(DEFAULT));
    }

    #[test]
    fn test_ttl_normalization() {
        assert_eq!(Ttl::After(Duration::from_millis(500)).normalized("k"), Ttl::Default);
        assert_eq!(Ttl::After(Duration::ZERO).normalized("k"), Ttl::Default);
        assert_eq!(
            Ttl::After(Duration::from_secs(5)).normalized("k"),
            Ttl::After(Duration::from_secs(5))
        );
        assert_eq!(Ttl::Never.normalized("k"), Ttl::Never);
        assert_eq!(Ttl::Expired.normalized("k"), Ttl::Expired);
    }

    #[test]
    fn test_ttl_from_secs() {
        assert_eq!(Ttl::from_secs(-1), Ttl::Expired);
        assert_eq!(Ttl::from_secs(0), Ttl::Default);
        assert_eq!(Ttl::from_secs(60), Ttl::After(Duration::from_secs(60)));
    }

    #[test]
    fn test_expiration_boundary_condition() {
        let entry = CacheEntry::new("k", "v").with_ttl(Ttl::After(Duration::from_secs(2)));
        let later = entry.last_access + Duration::from_secs(2);

        assert!(!entry.is_expired(DEFAULT, entry.last_access));
        assert!(entry.is_expired(DEFAULT, later), "Entry should be expired at boundary");
    }

    #[test]
    fn test_never_expire_entry() {
        let entry = CacheEntry::new("k", "v").with_ttl(Ttl::Never);
        let much_later = entry.last_access + Duration::from_secs(86_400 * 365);

        assert!(!entry.is_expired(DEFAULT, much_later));
        assert!(entry.ttl_remaining(DEFAULT, much_later).is_none());
    }

    #[test]
    fn test_ttl_remaining() {
        let entry = CacheEntry::new("k", "v").with_ttl(Ttl::After(Duration::from_secs(10)));
        let now = entry.last_access + Duration::from_secs(4);

        assert_eq!(
            entry.ttl_remaining(DEFAULT, now),
            Some(Duration::from_secs(6))
        );
        assert_eq!(
            entry.ttl_remaining(DEFAULT, now + Duration::from_secs(20)),
            Some(Duration::ZERO)
        );
    }

    #[test]
    fn test_clone_with_value_keeps_directives() {
        let entry = CacheEntry::new("k", "v")
            .with_ttl(Ttl::Never)
            .with_write_mode(WriteMode::OnlyIfAbsent)
            .skipping_local_cache();
        let copy = entry.clone_with_value(Value::Bytes(vec![1, 2, 3]));

        assert_eq!(copy.key, "k");
        assert_eq!(copy.value, Value::Bytes(vec![1, 2, 3]));
        assert_eq!(copy.ttl, Ttl::Never);
        assert_eq!(copy.write_mode, WriteMode::OnlyIfAbsent);
        assert!(copy.skip_local_cache);
        assert_eq!(entry.value.as_text(), Some("v"));
    }
}
