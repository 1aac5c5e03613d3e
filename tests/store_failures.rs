//! The throttle must keep authentication working when the store misbehaves.

mod common;

use std::net::SocketAddr;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde_json::json;

use common::*;
use twofa_throttle::store::MemoryStore;

#[tokio::test]
async fn test_slow_store_fails_open_within_budget() {
    let (origin, calls) = start_counting_origin(200).await;
    let store = ScriptedStore::default();
    store.inner.insert("10-0-0-1", json!({"failedAttempts": 9}));
    store.set_read_delay(Duration::from_secs(5));
    let throttle = start_throttle(config_for(origin), Arc::new(store.clone())).await;

    let start = Instant::now();
    let res = client()
        .post(throttle.url("/2fa/verify"))
        .header("x-real-ip", "10.0.0.1")
        .send()
        .await
        .unwrap();
    let elapsed = start.elapsed();

    assert_eq!(res.status(), 200);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert!(elapsed >= Duration::from_millis(450), "read budget not used: {:?}", elapsed);
    assert!(elapsed < Duration::from_secs(2), "read not bounded: {:?}", elapsed);
}

#[tokio::test]
async fn test_slow_store_answer_inside_budget_still_blocks() {
    let (origin, calls) = start_counting_origin(200).await;
    let store = ScriptedStore::default();
    store.inner.insert("10-0-0-8", json!({"failedAttempts": 5}));
    store.set_read_delay(Duration::from_millis(200));
    let throttle = start_throttle(config_for(origin), Arc::new(store)).await;

    let res = client()
        .post(throttle.url("/2fa/verify"))
        .header("x-real-ip", "10.0.0.8")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 403);
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_erroring_store_fails_open_and_still_writes() {
    let (origin, calls) = start_counting_origin(401).await;
    let store = ScriptedStore::default();
    store.inner.insert("10-0-0-2", json!({"failedAttempts": 9}));
    store.set_failing(true);
    let throttle = start_throttle(config_for(origin), Arc::new(store.clone())).await;

    let res = client()
        .post(throttle.url("/2fa/verify"))
        .header("x-real-ip", "10.0.0.2")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 401);
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    // The count read at entry was taken as 0, so the write resets it to 1.
    settle().await;
    assert_eq!(store.write_count(), 1);
    assert_eq!(store.inner.peek("10-0-0-2"), Some(json!({"failedAttempts": 1})));
}

#[tokio::test]
async fn test_malformed_record_counts_as_zero() {
    let (origin, calls) = start_counting_origin(401).await;
    let store = MemoryStore::default();
    store.insert("10-0-0-3", json!({"failedAttempts": "many"}));
    let throttle = start_throttle(config_for(origin), Arc::new(store.clone())).await;

    let res = client()
        .post(throttle.url("/2fa/verify"))
        .header("x-real-ip", "10.0.0.3")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 401);
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    settle().await;
    assert_eq!(store.peek("10-0-0-3"), Some(json!({"failedAttempts": 1})));
}

#[tokio::test]
async fn test_unreachable_origin_is_not_counted() {
    // Bind and drop to get a port nothing listens on.
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let dead: SocketAddr = listener.local_addr().unwrap();
    drop(listener);

    let store = ScriptedStore::default();
    let throttle = start_throttle(config_for(dead), Arc::new(store.clone())).await;

    let res = client()
        .post(throttle.url("/2fa/verify"))
        .header("x-real-ip", "10.0.0.4")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 502);

    settle().await;
    assert_eq!(store.write_count(), 0);
}

#[tokio::test]
async fn test_ipv6_client_fails_open_without_colon_substitution() {
    let (origin, calls) = start_counting_origin(401).await;
    let store = ScriptedStore::default();
    let throttle = start_throttle(config_for(origin), Arc::new(store.clone())).await;

    for _ in 0..4 {
        let res = client()
            .post(throttle.url("/2fa/verify"))
            .header("x-real-ip", "2001:db8::1")
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), 401);
    }
    assert_eq!(calls.load(Ordering::SeqCst), 4);

    settle().await;
    assert_eq!(store.write_count(), 0);
    assert!(store.inner.is_empty());
}

#[tokio::test]
async fn test_ipv6_client_is_throttled_with_colon_substitution() {
    let (origin, _) = start_counting_origin(401).await;
    let store = MemoryStore::default();
    let mut config = config_for(origin);
    config.throttle.identity.substitute_colons = true;
    let throttle = start_throttle(config, Arc::new(store.clone())).await;

    let res = client()
        .post(throttle.url("/2fa/verify"))
        .header("x-real-ip", "2001:db8::1")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 401);

    settle().await;
    assert_eq!(store.peek("2001-db8--1"), Some(json!({"failedAttempts": 1})));
}
