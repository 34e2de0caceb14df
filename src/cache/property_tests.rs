//! Property-Based Tests for Cache Module
//!
//! Uses proptest to check the memory cache against simple models, and the
//! codec and tiered cache for round-trip fidelity.

use proptest::prelude::*;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;

use crate::cache::{
    CacheEntry, Codec, Counter, DefaultCodec, InMemoryRemote, MemoryCache, Target, TieredCache,
    Value,
};
use crate::config::{MemoryConfig, TieredConfig};
use crate::error::CacheError;

// == Test Configuration ==
const TEST_CAPACITY: usize = 200;

fn memory(capacity: usize) -> MemoryCache {
    MemoryCache::new(MemoryConfig::default().with_capacity(capacity))
}

// == Strategies ==
/// Generates valid cache keys
fn valid_key_strategy() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9_]{1,64}"
}

/// Generates text values
fn valid_value_strategy() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9 ]{1,256}"
}

/// Generates structured values spanning both sides of the compression threshold
fn object_strategy() -> impl Strategy<Value = serde_json::Value> {
    (
        "[a-z]{0,200}",
        prop::collection::vec(any::<i64>(), 0..40),
        any::<bool>(),
    )
        .prop_map(|(name, numbers, flag)| {
            serde_json::json!({ "name": name, "numbers": numbers, "flag": flag })
        })
}

fn counter_strategy() -> impl Strategy<Value = Counter> {
    prop_oneof![
        any::<i32>().prop_map(Counter::I32),
        any::<i64>().prop_map(Counter::I64),
        any::<u32>().prop_map(Counter::U32),
        any::<u64>().prop_map(Counter::U64),
    ]
}

/// Generates a sequence of keyed cache operations
#[derive(Debug, Clone)]
enum CacheOp {
    Set { key: String, value: String },
    Get { key: String },
    Delete { key: String },
}

/// Keys are drawn from a small pool so operations collide.
fn cache_op_strategy() -> impl Strategy<Value = CacheOp> {
    let key = "k[0-9]{1,2}";
    prop_oneof![
        (key, valid_value_strategy()).prop_map(|(key, value)| CacheOp::Set { key, value }),
        key.prop_map(|key| CacheOp::Get { key }),
        key.prop_map(|key| CacheOp::Delete { key }),
    ]
}

/// Stack-style operations
#[derive(Debug, Clone)]
enum StackOp {
    Push(String),
    Shift,
    Pop,
}

fn stack_op_strategy() -> impl Strategy<Value = StackOp> {
    prop_oneof![
        valid_value_strategy().prop_map(StackOp::Push),
        Just(StackOp::Shift),
        Just(StackOp::Pop),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    // Hits and misses reflect exactly the reads that found or missed a key.
    #[test]
    fn prop_statistics_accuracy(ops in prop::collection::vec(cache_op_strategy(), 1..50)) {
        let cache = memory(TEST_CAPACITY);
        let mut expected_hits: u64 = 0;
        let mut expected_misses: u64 = 0;

        for op in ops {
            match op {
                CacheOp::Set { key, value } => {
                    cache.set(CacheEntry::new(key, value)).unwrap();
                }
                CacheOp::Get { key } => match cache.get(&key, Target::Any) {
                    Ok(_) => expected_hits += 1,
                    Err(_) => expected_misses += 1,
                },
                CacheOp::Delete { key } => {
                    let _ = cache.delete(&key);
                }
            }
        }

        let stats = cache.stats();
        prop_assert_eq!(stats.hits, expected_hits, "Hits mismatch");
        prop_assert_eq!(stats.misses, expected_misses, "Misses mismatch");
        prop_assert_eq!(stats.total_entries, cache.len(), "Total entries mismatch");
    }

    // The cache behaves like a map under any sequence of keyed operations,
    // and the index and list never disagree.
    #[test]
    fn prop_matches_map_model(ops in prop::collection::vec(cache_op_strategy(), 1..100)) {
        let cache = memory(TEST_CAPACITY);
        let mut model: HashMap<String, String> = HashMap::new();

        for op in ops {
            match op {
                CacheOp::Set { key, value } => {
                    cache.set(CacheEntry::new(key.clone(), value.clone())).unwrap();
                    model.insert(key, value);
                }
                CacheOp::Get { key } => {
                    let actual = cache.get(&key, Target::Text).ok();
                    let expected = model.get(&key).map(|v| Value::Text(v.clone()));
                    prop_assert_eq!(actual, expected);
                }
                CacheOp::Delete { key } => {
                    let deleted = cache.delete(&key).is_ok();
                    prop_assert_eq!(deleted, model.remove(&key).is_some());
                }
            }
            prop_assert!(cache.is_consistent());
        }

        prop_assert_eq!(cache.len(), model.len());
        let keys: HashSet<String> = cache.keys().into_iter().collect();
        let expected: HashSet<String> = model.keys().cloned().collect();
        prop_assert_eq!(keys, expected);
    }

    // A read returns exactly what was last written.
    #[test]
    fn prop_roundtrip_storage(key in valid_key_strategy(), first in valid_value_strategy(), second in valid_value_strategy()) {
        let cache = memory(TEST_CAPACITY);

        cache.set(CacheEntry::new(key.clone(), first.clone())).unwrap();
        prop_assert_eq!(cache.get(&key, Target::Text).unwrap(), Value::Text(first));

        cache.set(CacheEntry::new(key.clone(), second.clone())).unwrap();
        prop_assert_eq!(cache.get(&key, Target::Text).unwrap(), Value::Text(second));
        prop_assert_eq!(cache.len(), 1);
    }

    // Admission control never lets the cache grow past its capacity.
    #[test]
    fn prop_capacity_enforcement(capacity in 1usize..20, keys in prop::collection::hash_set(valid_key_strategy(), 1..60)) {
        let cache = memory(capacity);

        for key in &keys {
            cache.set(CacheEntry::new(key.clone(), "v")).unwrap();
            prop_assert!(cache.len() <= capacity);
        }
        prop_assert_eq!(cache.len(), keys.len().min(capacity));
    }

    // Shrinking the capacity is honoured by the next sweep.
    #[test]
    fn prop_sweep_trims_to_capacity(count in 1usize..60, capacity in 0usize..30) {
        let cache = memory(TEST_CAPACITY);
        for i in 0..count {
            cache.set(CacheEntry::new(format!("key{}", i), "v")).unwrap();
        }

        cache.set_capacity(capacity);
        let report = cache.sweep();

        prop_assert_eq!(cache.len(), count.min(capacity));
        prop_assert_eq!(report.trimmed, count.saturating_sub(capacity));
        prop_assert!(cache.is_consistent());
    }

    // Push/Shift/Pop behave like a double-ended queue.
    #[test]
    fn prop_stack_matches_deque(ops in prop::collection::vec(stack_op_strategy(), 1..80)) {
        let cache = memory(TEST_CAPACITY);
        let mut model: VecDeque<String> = VecDeque::new();

        for op in ops {
            match op {
                StackOp::Push(value) => {
                    let pushed = cache.push(value.clone());
                    prop_assert_eq!(pushed, model.len() < TEST_CAPACITY);
                    if pushed {
                        model.push_back(value);
                    }
                }
                StackOp::Shift => {
                    prop_assert_eq!(cache.shift(), model.pop_front().map(Value::Text));
                }
                StackOp::Pop => {
                    prop_assert_eq!(cache.pop(), model.pop_back().map(Value::Text));
                }
            }
        }

        prop_assert_eq!(cache.len(), model.len());
        prop_assert!(cache.is_consistent());
    }

    // Incrementing then decrementing a counter restores it, unless a bound was hit.
    #[test]
    fn prop_counter_incr_decr(counter in counter_strategy()) {
        let cache = memory(TEST_CAPACITY);
        cache.set(CacheEntry::new("n", counter)).unwrap();

        match cache.incr("n") {
            Ok(next) => {
                prop_assert_eq!(next, counter.incremented().unwrap());
                prop_assert_eq!(cache.decr("n").unwrap(), counter);
            }
            Err(CacheError::Overflow(_)) => {
                prop_assert_eq!(cache.get("n", Target::Any).unwrap(), Value::Counter(counter));
            }
            Err(e) => prop_assert!(false, "unexpected error: {}", e),
        }
    }

    // Text and bytes survive the codec untouched.
    #[test]
    fn prop_codec_raw_roundtrip(text in ".{0,300}", bytes in prop::collection::vec(any::<u8>(), 1..300)) {
        let codec = DefaultCodec::default();

        let payload = codec.marshal(&Value::Text(text.clone())).unwrap();
        let expected = if text.is_empty() { Value::Nil } else { Value::Text(text) };
        prop_assert_eq!(codec.unmarshal(&payload, Target::Text).unwrap(), expected);

        let payload = codec.marshal(&Value::Bytes(bytes.clone())).unwrap();
        prop_assert_eq!(codec.unmarshal(&payload, Target::Bytes).unwrap(), Value::Bytes(bytes));
    }

    // Structured values round-trip below and above the compression threshold.
    #[test]
    fn prop_codec_object_roundtrip(object in object_strategy(), counter in counter_strategy()) {
        let codec = DefaultCodec::default();

        let value = Value::Object(object);
        let payload = codec.marshal(&value).unwrap();
        prop_assert_eq!(codec.unmarshal(&payload, Target::Any).unwrap(), value);

        let value = Value::Counter(counter);
        let payload = codec.marshal(&value).unwrap();
        prop_assert_eq!(codec.unmarshal(&payload, Target::Any).unwrap(), value);
    }

    // Whatever tier serves the read, the tiered cache returns what was written.
    #[test]
    fn prop_tiered_roundtrip(key in valid_key_strategy(), object in object_strategy(), skip_local in any::<bool>()) {
        let remote = Arc::new(InMemoryRemote::new());
        let local = Arc::new(memory(TEST_CAPACITY));
        let cache = TieredCache::builder(TieredConfig::default())
            .remote(remote.clone())
            .local(local.clone())
            .build();

        let mut entry = CacheEntry::new(key.clone(), Value::Object(object.clone()));
        if skip_local {
            entry = entry.skipping_local_cache();
        }

        let value = tokio_test::block_on(async {
            cache.set(entry).await.unwrap();
            cache.get(&key, Target::Any).await.unwrap()
        });

        prop_assert_eq!(value, Value::Object(object));
        // Both tiers hold the same bytes once the read settles
        let local_bytes = local.get(&key, Target::Bytes).unwrap();
        let remote_bytes = remote.peek(&key);
        prop_assert_eq!(local_bytes.as_bytes(), remote_bytes.as_deref());
    }
}
