//! Integration Tests for the shared cache
//!
//! Exercises the public cache handle from many tasks at once with a live
//! sweeper attached.

use std::time::Duration;

use summary_cache::{generate_key, spawn_sweeper, KeyParams, MemoCache};
use tokio_test::assert_ok;

fn owner_key(owner: &str, i: u32) -> summary_cache::CacheKey {
    let params = KeyParams::new().with("userId", owner).with("n", i);
    generate_key("report", &params).unwrap()
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_writers_with_sweeper() {
    let cache: MemoCache<u32> = MemoCache::new(Duration::from_secs(60));
    let sweeper = assert_ok!(spawn_sweeper(cache.clone(), Duration::from_millis(5), 8));

    let mut tasks = Vec::new();
    for w in 0..8u32 {
        let cache = cache.clone();
        tasks.push(tokio::spawn(async move {
            let owner = format!("owner{}", w);
            for i in 0..50u32 {
                let key = owner_key(&owner, i);
                // Half of the entries expire almost immediately
                let ttl = if i % 2 == 0 {
                    Duration::from_millis(1)
                } else {
                    Duration::from_secs(60)
                };
                assert_ok!(cache.set_owned(&owner, &key, i, Some(ttl)));
                let _ = assert_ok!(cache.get(key.as_str()));
                if i % 10 == 0 {
                    tokio::task::yield_now().await;
                }
            }
        }));
    }
    for task in tasks {
        task.await.unwrap();
    }

    tokio::time::sleep(Duration::from_millis(50)).await;
    cache.cleanup();

    let stats = assert_ok!(cache.stats());
    assert_eq!(stats.sets, 400);
    assert_eq!(stats.hits + stats.misses, 400);
    assert_eq!(stats.size, 200);
    // The owner index tracks exactly the live entries
    assert_eq!(assert_ok!(cache.indexed_keys()), 200);

    for w in 0..8u32 {
        assert_eq!(assert_ok!(cache.invalidate(&format!("owner{}", w))), 25);
    }
    assert_eq!(assert_ok!(cache.stats()).size, 0);
    assert_eq!(assert_ok!(cache.indexed_keys()), 0);

    sweeper.stop().await;
}

#[tokio::test]
async fn test_stop_then_restart_sweeper() {
    let cache: MemoCache<String> = MemoCache::new(Duration::from_secs(60));

    let first = assert_ok!(spawn_sweeper(cache.clone(), Duration::from_millis(10), 4));
    assert!(spawn_sweeper(cache.clone(), Duration::from_millis(10), 4).is_err());
    first.stop().await;

    assert_ok!(cache.set("short", "v".to_string(), Some(Duration::from_millis(1))));
    let second = assert_ok!(spawn_sweeper(cache.clone(), Duration::from_millis(10), 4));
    tokio::time::sleep(Duration::from_millis(100)).await;

    assert_eq!(second.stop().await, 1);
    let stats = assert_ok!(cache.stats());
    assert_eq!(stats.size, 0);
    assert_eq!(stats.expirations, 1);
}

#[tokio::test]
async fn test_invalidate_namespace_is_narrow() {
    let cache: MemoCache<u32> = MemoCache::new(Duration::from_secs(60));
    let report = owner_key("u1", 1);
    let summary = generate_key("summary", &KeyParams::new().with("userId", "u1")).unwrap();

    assert_ok!(cache.set_owned("u1", &report, 1, None));
    assert_ok!(cache.set_owned("u1", &summary, 2, None));

    assert_eq!(assert_ok!(cache.invalidate_namespace("u1", "summary")), 1);
    assert_eq!(assert_ok!(cache.get(summary.as_str())), None);
    assert_eq!(assert_ok!(cache.get(report.as_str())), Some(1));
    // Unknown owners are a no-op
    assert_eq!(assert_ok!(cache.invalidate("nobody")), 0);
}
