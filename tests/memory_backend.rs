use compute_cache::prelude::*;

use std::time::Duration;
use tokio::time::sleep;

fn backend() -> MemoryBackend<i32, String> {
    MemoryBackend::new()
}

#[tokio::test]
async fn store_and_read() {
    let unit = backend();
    unit.put(1, "TestEntry".to_owned(), CacheExpiration::ETERNAL)
        .await
        .unwrap();
    assert_eq!(unit.get(&1).await.unwrap(), Some("TestEntry".to_owned()));
    assert_eq!(unit.get(&2).await.unwrap(), None);
}

#[tokio::test]
async fn store_with_life_time_expires() {
    let unit = backend();
    unit.put(
        1,
        "TestEntry".to_owned(),
        CacheExpiration::with_life_time(Duration::from_millis(150)),
    )
    .await
    .unwrap();
    sleep(Duration::from_millis(400)).await;
    assert_eq!(unit.get(&1).await.unwrap(), None, "should be expired, but is not");
}

#[tokio::test]
async fn zero_life_time_means_no_bound() {
    let unit = backend();
    unit.put(
        1,
        "TestEntry".to_owned(),
        CacheExpiration::with_life_time(Duration::ZERO),
    )
    .await
    .unwrap();
    sleep(Duration::from_millis(250)).await;
    assert_eq!(unit.get(&1).await.unwrap(), Some("TestEntry".to_owned()));
}

#[tokio::test]
async fn eternal_entries_survive() {
    let unit = backend();
    unit.put(1, "TestEntry".to_owned(), CacheExpiration::ETERNAL)
        .await
        .unwrap();
    sleep(Duration::from_millis(250)).await;
    assert_eq!(unit.get(&1).await.unwrap(), Some("TestEntry".to_owned()));
}

#[tokio::test]
async fn reads_refresh_the_idle_window() {
    let unit = backend();
    unit.put(
        1,
        "TestEntry".to_owned(),
        CacheExpiration::with_idle_time(Duration::from_millis(300)),
    )
    .await
    .unwrap();

    sleep(Duration::from_millis(150)).await;
    assert_eq!(
        unit.get(&1).await.unwrap(),
        Some("TestEntry".to_owned()),
        "entry has idled out too early"
    );

    // The read above renewed the window.
    sleep(Duration::from_millis(150)).await;
    assert_eq!(unit.get(&1).await.unwrap(), Some("TestEntry".to_owned()));

    sleep(Duration::from_millis(700)).await;
    assert_eq!(unit.get(&1).await.unwrap(), None, "should be expired, but is not");
}

#[tokio::test]
async fn life_time_caps_a_busy_reader() {
    let unit = backend();
    unit.put(
        1,
        "TestEntry".to_owned(),
        CacheExpiration::new(Duration::from_millis(600), Duration::from_millis(300)),
    )
    .await
    .unwrap();

    sleep(Duration::from_millis(200)).await;
    assert_eq!(unit.get(&1).await.unwrap(), Some("TestEntry".to_owned()));
    sleep(Duration::from_millis(200)).await;
    assert_eq!(unit.get(&1).await.unwrap(), Some("TestEntry".to_owned()));

    // Still being read, but the life bound has elapsed.
    sleep(Duration::from_millis(300)).await;
    assert_eq!(unit.get(&1).await.unwrap(), None, "should be expired, but is not");
}

#[tokio::test]
async fn remove_returns_the_prior_value() {
    let unit = backend();
    unit.put(1, "TestEntry".to_owned(), CacheExpiration::ETERNAL)
        .await
        .unwrap();
    assert_eq!(unit.remove(&1).await.unwrap(), Some("TestEntry".to_owned()));
    assert_eq!(unit.get(&1).await.unwrap(), None);
    assert_eq!(unit.remove(&1).await.unwrap(), None);
    assert_eq!(unit.remove(&2).await.unwrap(), None);
}

#[tokio::test]
async fn clear_drops_everything() {
    let unit = backend();
    for i in 0..10 {
        unit.put(i, "TestEntry".to_owned(), CacheExpiration::ETERNAL)
            .await
            .unwrap();
    }
    unit.clear().await.unwrap();
    for i in 0..10 {
        assert_eq!(unit.get(&i).await.unwrap(), None);
    }
}

#[tokio::test]
async fn contains_agrees_with_get_without_refreshing() {
    let unit = backend();
    unit.put(1, "TestEntry".to_owned(), CacheExpiration::ETERNAL)
        .await
        .unwrap();
    assert!(unit.contains(&1).await.unwrap());
    assert!(!unit.contains(&2).await.unwrap());

    unit.put(
        3,
        "Expiring".to_owned(),
        CacheExpiration::with_idle_time(Duration::from_millis(200)),
    )
    .await
    .unwrap();
    // contains must not renew the idle window.
    sleep(Duration::from_millis(150)).await;
    assert!(unit.contains(&3).await.unwrap());
    sleep(Duration::from_millis(150)).await;
    assert!(!unit.contains(&3).await.unwrap());
}

#[tokio::test]
async fn keys_snapshot_excludes_expired_entries() {
    let unit = backend();
    unit.put(1, "a".to_owned(), CacheExpiration::ETERNAL)
        .await
        .unwrap();
    unit.put(
        2,
        "b".to_owned(),
        CacheExpiration::with_life_time(Duration::from_millis(150)),
    )
    .await
    .unwrap();

    let mut keys = unit.keys().await.unwrap();
    keys.sort_unstable();
    assert_eq!(keys, vec![1, 2]);

    sleep(Duration::from_millis(400)).await;
    assert_eq!(unit.keys().await.unwrap(), vec![1]);
}
