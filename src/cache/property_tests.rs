//! Property-Based Tests for Cache Module
//!
//! Uses proptest to check the engine's ordering, capacity and statistics
//! properties over random operation sequences.

use proptest::prelude::*;
use std::collections::HashSet;
use std::sync::Arc;
use std::thread;

use crate::cache::CacheEngine;

// == Test Configuration ==
const TEST_CAPACITY: usize = 100;

// == Strategies ==
/// Generates cache keys from a small alphabet so operations collide often
fn key_strategy() -> impl Strategy<Value = String> {
    "[a-h]{1,2}".prop_map(|s| s)
}

fn value_strategy() -> impl Strategy<Value = u32> {
    any::<u32>()
}

/// Generates a sequence of cache operations for testing
#[derive(Debug, Clone)]
enum CacheOp {
    Put { key: String, value: u32 },
    Get { key: String },
    Remove { key: String },
}

fn cache_op_strategy() -> impl Strategy<Value = CacheOp> {
    prop_oneof![
        (key_strategy(), value_strategy()).prop_map(|(key, value)| CacheOp::Put { key, value }),
        key_strategy().prop_map(|key| CacheOp::Get { key }),
        key_strategy().prop_map(|key| CacheOp::Remove { key }),
    ]
}

/// Applies `op` to the engine and to a reference model, where the model is
/// a Vec of keys ordered most recent first.
fn apply(
    cache: &CacheEngine<String, u32>,
    model: &mut Vec<(String, u32)>,
    capacity: usize,
    op: CacheOp,
) -> Option<bool> {
    match op {
        CacheOp::Put { key, value } => {
            cache.put(key.clone(), value);
            if capacity > 0 {
                model.retain(|(k, _)| *k != key);
                model.insert(0, (key, value));
                model.truncate(capacity);
            }
            None
        }
        CacheOp::Get { key } => {
            let got = cache.get(&key);
            let expected = model.iter().position(|(k, _)| *k == key).map(|pos| {
                let item = model.remove(pos);
                let value = item.1;
                model.insert(0, item);
                value
            });
            assert_eq!(got, expected, "get({}) disagrees with model", key);
            Some(got.is_some())
        }
        CacheOp::Remove { key } => {
            let removed = cache.remove(&key);
            let before = model.len();
            model.retain(|(k, _)| *k != key);
            assert_eq!(removed, model.len() != before, "remove({}) disagrees", key);
            None
        }
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    // *For any* sequence of put/get/remove, the size never exceeds the
    // capacity and the recency order matches a reference LRU model.
    #[test]
    fn prop_matches_lru_model(
        capacity in 0usize..6,
        ops in prop::collection::vec(cache_op_strategy(), 1..80)
    ) {
        let cache: CacheEngine<String, u32> = CacheEngine::new(capacity);
        let mut model = Vec::new();

        for op in ops {
            apply(&cache, &mut model, capacity, op);
            prop_assert!(cache.len() <= capacity, "size {} exceeds capacity {}", cache.len(), capacity);
            cache.shared.state.read().index.check_invariants();
        }

        let expected: Vec<String> = model.iter().map(|(k, _)| k.clone()).collect();
        prop_assert_eq!(cache.keys_by_recency(), expected);
    }

    // *For any* sequence of operations, hit rate equals hits / gets and is
    // 1.0 before the first get.
    #[test]
    fn prop_statistics_accuracy(ops in prop::collection::vec(cache_op_strategy(), 1..50)) {
        let cache: CacheEngine<String, u32> = CacheEngine::new(TEST_CAPACITY);
        let mut model = Vec::new();
        let mut requests: u64 = 0;
        let mut hits: u64 = 0;

        for op in ops {
            if let Some(hit) = apply(&cache, &mut model, TEST_CAPACITY, op) {
                requests += 1;
                if hit {
                    hits += 1;
                }
            }
        }

        let stats = cache.stats();
        prop_assert_eq!(stats.requests, requests, "Requests mismatch");
        prop_assert_eq!(stats.hits, hits, "Hits mismatch");
        prop_assert_eq!(stats.misses, requests - hits, "Misses mismatch");
        prop_assert_eq!(stats.size, cache.len(), "Size mismatch");

        let expected_rate = if requests == 0 { 1.0 } else { hits as f64 / requests as f64 };
        prop_assert!((cache.hit_rate() - expected_rate).abs() < f64::EPSILON);
    }

    // *For any* key-value pair, a put followed by get returns the value and
    // leaves the key at the head of the recency chain.
    #[test]
    fn prop_put_then_get_is_head(
        prefill in prop::collection::vec((key_strategy(), value_strategy()), 0..10),
        key in key_strategy(),
        value in value_strategy()
    ) {
        let cache: CacheEngine<String, u32> = CacheEngine::new(TEST_CAPACITY);
        for (k, v) in prefill {
            cache.put(k, v);
        }

        cache.put(key.clone(), value);

        prop_assert_eq!(cache.get(&key), Some(value));
        prop_assert_eq!(cache.most_recent_key(), Some(key));
    }

    // *For any* full cache, inserting a new key evicts exactly the entry
    // touched least recently.
    #[test]
    fn prop_lru_eviction_order(
        keys in prop::collection::hash_set("[a-z]{3}", 2..10),
        touched in prop::collection::vec(0usize..10, 0..10),
        new_key in "[0-9]{3}"
    ) {
        let keys: Vec<String> = keys.into_iter().collect();
        let capacity = keys.len();
        let cache: CacheEngine<String, u32> = CacheEngine::new(capacity);
        for (i, key) in keys.iter().enumerate() {
            cache.put(key.clone(), i as u32);
        }

        // Replay touches; the victim is the key touched least recently
        let mut order: Vec<&String> = keys.iter().collect();
        for t in touched {
            let key = &keys[t % capacity];
            cache.get(key);
            order.retain(|k| *k != key);
            order.push(key);
        }
        let victim = order[0].clone();

        cache.put(new_key.clone(), 0);

        prop_assert_eq!(cache.len(), capacity);
        prop_assert!(!cache.contains(&victim), "'{}' should have been evicted", victim);
        prop_assert!(cache.contains(&new_key));
        let survivors: HashSet<&String> = keys.iter().filter(|k| **k != victim).collect();
        for key in survivors {
            prop_assert!(cache.contains(key), "'{}' should have survived", key);
        }
    }

    // *For any* key, remove makes it absent and a second remove reports false
    // without touching anything else.
    #[test]
    fn prop_remove_semantics(
        prefill in prop::collection::vec((key_strategy(), value_strategy()), 1..20),
        key in key_strategy()
    ) {
        let cache: CacheEngine<String, u32> = CacheEngine::new(TEST_CAPACITY);
        for (k, v) in prefill {
            cache.put(k, v);
        }

        cache.remove(&key);
        prop_assert!(!cache.contains(&key));

        let before = cache.keys_by_recency();
        let stats_before = cache.stats();
        prop_assert!(!cache.remove(&key));
        prop_assert_eq!(cache.keys_by_recency(), before);
        prop_assert_eq!(cache.stats(), stats_before);
    }
}

// Fewer cases for the multi-threaded property
proptest! {
    #![proptest_config(ProptestConfig::with_cases(20))]

    // *For any* set of concurrent operations, the capacity bound and the
    // chain/lookup consistency hold once every thread has finished.
    #[test]
    fn prop_concurrent_operation_correctness(
        batches in prop::collection::vec(prop::collection::vec(cache_op_strategy(), 10..40), 2..6)
    ) {
        let capacity = 8;
        let cache = Arc::new(CacheEngine::<String, u32>::new(capacity));

        let handles: Vec<_> = batches
            .into_iter()
            .map(|ops| {
                let cache = Arc::clone(&cache);
                thread::spawn(move || {
                    for op in ops {
                        match op {
                            CacheOp::Put { key, value } => cache.put(key, value),
                            CacheOp::Get { key } => {
                                cache.get(&key);
                            }
                            CacheOp::Remove { key } => {
                                cache.remove(&key);
                            }
                        }
                        assert!(cache.len() <= capacity);
                    }
                })
            })
            .collect();

        for handle in handles {
            prop_assert!(handle.join().is_ok(), "worker thread panicked");
        }

        cache.shared.state.read().index.check_invariants();
        let stats = cache.stats();
        prop_assert!(stats.size <= capacity);
        prop_assert!(stats.hit_rate >= 0.0 && stats.hit_rate <= 1.0);
    }
}

// == Additional Unit Tests for Edge Cases ==
#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Barrier;

    #[test]
    fn test_concurrent_get_or_create_single_entry() {
        let cache = Arc::new(CacheEngine::<String, u32>::new(10));
        let barrier = Arc::new(Barrier::new(2));
        let calls = Arc::new(std::sync::atomic::AtomicU32::new(0));

        let handles: Vec<_> = (0..2)
            .map(|i| {
                let cache = Arc::clone(&cache);
                let barrier = Arc::clone(&barrier);
                let calls = Arc::clone(&calls);
                thread::spawn(move || {
                    barrier.wait();
                    cache.get_or_create("shared".to_string(), || {
                        calls.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
                        thread::sleep(std::time::Duration::from_millis(20));
                        100 + i
                    })
                })
            })
            .collect();

        let values: Vec<u32> = handles
            .into_iter()
            .map(|h| h.join().unwrap().unwrap())
            .collect();

        assert_eq!(values[0], values[1]);
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.peek("shared"), Some(values[0]));
        assert!(calls.load(std::sync::atomic::Ordering::SeqCst) >= 1);
    }
}
