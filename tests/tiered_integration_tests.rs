//! Integration Tests for the Cache Adapters
//!
//! Exercises the memory and tiered caches through their public API,
//! including concurrent use from many tasks.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tiercache::cache::{InMemoryRemote, Target, TieredCache, Value};
use tiercache::config::{MemoryConfig, TieredConfig};
use tiercache::{Cache, CacheEntry, CacheError, MemoryCache, Ttl};

const WRITERS: usize = 5;
const WRITES_PER_TASK: usize = 1000;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Session {
    user: String,
    roles: Vec<String>,
    visits: u32,
}

fn tiered(remote: &Arc<InMemoryRemote>, local: &Arc<MemoryCache>) -> TieredCache {
    TieredCache::builder(TieredConfig::default().with_key_prefix("test:"))
        .remote(remote.clone())
        .local(local.clone())
        .build()
}

// == Tier Consistency ==

#[tokio::test]
async fn test_tier_consistency_scenario() {
    let remote = Arc::new(InMemoryRemote::new());
    let local = Arc::new(MemoryCache::new(MemoryConfig::default()));
    let cache = tiered(&remote, &local);

    cache.set(CacheEntry::new("k", "hello")).await.unwrap();

    // Same wire bytes in both tiers
    let local_bytes = local.get("k", Target::Bytes).unwrap();
    assert_eq!(local_bytes.as_bytes(), remote.peek("test:k").as_deref());

    let value = cache.get("k", Target::Text).await.unwrap();
    assert_eq!(value, Value::from("hello"));
    assert_eq!(remote.reads(), 0, "read should be served by the local tier");

    cache.delete("k").await.unwrap();
    let err = cache.get("k", Target::Text).await.unwrap_err();
    assert!(matches!(err, CacheError::CacheMiss(_)));
    assert!(remote.peek("test:k").is_none());
}

#[tokio::test]
async fn test_shared_remote_between_instances() {
    let remote = Arc::new(InMemoryRemote::new());
    let local_a = Arc::new(MemoryCache::new(MemoryConfig::default()));
    let local_b = Arc::new(MemoryCache::new(MemoryConfig::default()));
    let a = tiered(&remote, &local_a);
    let b = tiered(&remote, &local_b);

    let session = Session {
        user: "ada".to_string(),
        roles: vec!["admin".to_string(), "ops".to_string()],
        visits: 3,
    };
    a.set_object("session", &session, Ttl::Default).await.unwrap();

    // The second instance misses locally, then fills its local tier from remote
    assert!(!local_b.exists("session"));
    assert_eq!(b.get_object::<Session>("session").await.unwrap(), session);
    assert!(local_b.exists("session"));

    // A stale local copy is visible until invalidated
    let updated = Session {
        visits: 4,
        ..session.clone()
    };
    a.set_object("session", &updated, Ttl::Default).await.unwrap();
    assert_eq!(b.get_object::<Session>("session").await.unwrap(), session);

    b.delete_from_local_cache("session").unwrap();
    assert_eq!(b.get_object::<Session>("session").await.unwrap(), updated);
}

#[tokio::test]
async fn test_adapters_are_interchangeable() {
    let remote = Arc::new(InMemoryRemote::new());
    let local = Arc::new(MemoryCache::new(MemoryConfig::default()));
    let adapters: Vec<Arc<dyn Cache>> = vec![
        Arc::new(MemoryCache::new(MemoryConfig::default())),
        Arc::new(tiered(&remote, &local)),
    ];

    for cache in adapters {
        cache.set(CacheEntry::new("a", "1")).await.unwrap();
        cache.set(CacheEntry::new("b", "2")).await.unwrap();

        assert!(cache.exists("a").await, "{}", cache.name());
        assert_eq!(
            cache.get("b", Target::Text).await.unwrap(),
            Value::from("2"),
            "{}",
            cache.name()
        );
        assert_eq!(cache.len(), 2, "{}", cache.name());

        cache.delete("a").await.unwrap();
        assert!(!cache.exists("a").await, "{}", cache.name());

        cache.clear().await.unwrap();
        assert!(cache.is_empty(), "{}", cache.name());
    }
}

// == Concurrent Stress ==

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_writers_fill_to_capacity() {
    for capacity in [WRITERS * WRITES_PER_TASK * 2, 3000] {
        let cache = Arc::new(MemoryCache::new(
            MemoryConfig::default().with_capacity(capacity),
        ));

        let mut handles = Vec::new();
        for writer in 0..WRITERS {
            let cache = cache.clone();
            handles.push(tokio::spawn(async move {
                for i in 0..WRITES_PER_TASK {
                    cache
                        .set(CacheEntry::new(format!("w{}-{}", writer, i), "v"))
                        .unwrap();
                }
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        cache.sweep();
        assert_eq!(cache.len(), (WRITERS * WRITES_PER_TASK).min(capacity));
        assert_eq!(cache.keys().len(), cache.len());
        assert!(cache.is_consistent());
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_reads_keep_length_in_step() {
    let capacity = 1500;
    let cache = Arc::new(MemoryCache::new(
        MemoryConfig::default().with_capacity(capacity),
    ));

    let mut handles = Vec::new();
    for writer in 0..WRITERS {
        let cache = cache.clone();
        handles.push(tokio::spawn(async move {
            for i in 0..WRITES_PER_TASK {
                let key = format!("w{}-{}", writer, i);
                cache.set(CacheEntry::new(key.clone(), "v")).unwrap();
                // Re-read older keys so recency promotions interleave with inserts
                for back in [1, 7, 31] {
                    if i >= back {
                        let _ = cache.get(&format!("w{}-{}", writer, i - back), Target::Any);
                    }
                }
            }
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }

    assert_eq!(cache.len(), capacity);
    assert_eq!(cache.keys().len(), cache.len());
    assert!(cache.is_consistent());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_tiered_writers() {
    let remote = Arc::new(InMemoryRemote::new());
    let local = Arc::new(MemoryCache::new(MemoryConfig::default().with_capacity(2000)));
    let cache = Arc::new(tiered(&remote, &local));

    let mut handles = Vec::new();
    for writer in 0..WRITERS {
        let cache = cache.clone();
        handles.push(tokio::spawn(async move {
            for i in 0..WRITES_PER_TASK {
                let key = format!("w{}-{}", writer, i);
                cache
                    .set(CacheEntry::new(key.clone(), Value::from(i as u64)))
                    .await
                    .unwrap();
                if i % 10 == 0 {
                    let value = cache.get(&key, Target::Any).await.unwrap();
                    assert_eq!(value, Value::from(i as u64));
                }
            }
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }

    assert_eq!(remote.len(), WRITERS * WRITES_PER_TASK);
    assert_eq!(local.len(), 2000);
    assert!(local.is_consistent());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_stack_access_under_contention() {
    let cache = Arc::new(MemoryCache::new(MemoryConfig::stack()));

    let mut producers = Vec::new();
    for _ in 0..4 {
        let cache = cache.clone();
        producers.push(tokio::spawn(async move {
            let mut pushed = 0;
            for i in 0..500u64 {
                if cache.push(i) {
                    pushed += 1;
                }
            }
            pushed
        }));
    }

    let mut total_pushed = 0;
    for handle in producers {
        total_pushed += handle.await.unwrap();
    }
    assert_eq!(total_pushed, 2000);

    let mut drained = 0;
    while cache.shift().is_some() {
        drained += 1;
    }
    assert_eq!(drained, total_pushed);
    assert!(cache.pop().is_none());
    assert!(cache.is_empty());
}
