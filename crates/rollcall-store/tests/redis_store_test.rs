//! Integration tests for RedisStore.
//!
//! These tests run against a real Redis server using testcontainers.
//! Requires Docker to be available on the system.

use rollcall_config::RedisConfig;
use rollcall_store::{create_pool, CommandReply, KeyValueStore, RedisStore, StoreCommand, SCAN_START};
use std::sync::Arc;
use std::time::Duration;
use testcontainers::{runners::AsyncRunner, ContainerAsync};
use testcontainers_modules::redis::Redis;

/// Test Redis container wrapper.
struct TestRedis {
    _container: ContainerAsync<Redis>,
    store: RedisStore,
}

impl TestRedis {
    async fn new() -> Self {
        let container = Redis::default()
            .start()
            .await
            .expect("Failed to start Redis container");

        let port = container
            .get_host_port_ipv4(6379)
            .await
            .expect("Failed to get Redis port");

        let config = RedisConfig {
            url: format!("redis://127.0.0.1:{}", port),
            pool_size: 4,
            enabled: true,
        };

        let pool = create_pool(&config).await.expect("Failed to create pool");

        Self {
            _container: container,
            store: RedisStore::new(Arc::new(pool)),
        }
    }
}

#[tokio::test]
async fn test_set_get_delete() {
    let redis = TestRedis::new().await;
    let store = &redis.store;

    store.set("User:1", "{\"userId\":\"1\"}", None).await.unwrap();
    assert_eq!(
        store.get("User:1").await.unwrap().as_deref(),
        Some("{\"userId\":\"1\"}")
    );

    assert!(store.delete("User:1").await.unwrap());
    assert!(!store.delete("User:1").await.unwrap());
    assert_eq!(store.get("User:1").await.unwrap(), None);
}

#[tokio::test]
async fn test_expire_on_missing_key() {
    let redis = TestRedis::new().await;
    let store = &redis.store;

    assert!(!store.expire("User:missing", Duration::from_secs(30)).await.unwrap());

    store.set("User:2", "{}", Some(Duration::from_secs(30))).await.unwrap();
    assert!(store.expire("User:2", Duration::from_secs(60)).await.unwrap());
}

#[tokio::test]
async fn test_list_primitives() {
    let redis = TestRedis::new().await;
    let store = &redis.store;

    for id in ["1", "2", "1", "3"] {
        store.list_push_head("UserList:latest", id).await.unwrap();
    }
    assert_eq!(store.list_remove("UserList:latest", "1").await.unwrap(), 2);

    store.list_trim("UserList:latest", 0, 0).await.unwrap();
    assert_eq!(store.list_range("UserList:latest", 0, -1).await.unwrap(), ["3"]);
}

#[tokio::test]
async fn test_batch_returns_replies_in_order() {
    let redis = TestRedis::new().await;
    let store = &redis.store;

    let replies = store
        .batch(vec![
            StoreCommand::set("User:1", "a", Some(Duration::from_secs(60))),
            StoreCommand::list_remove("UserList:latest", "1"),
            StoreCommand::list_push_head("UserList:latest", "1"),
            StoreCommand::list_trim("UserList:latest", 0, 19),
            StoreCommand::get("User:1"),
            StoreCommand::get("User:2"),
        ])
        .await
        .unwrap();

    assert_eq!(
        replies,
        [
            CommandReply::Ok,
            CommandReply::Integer(0),
            CommandReply::Integer(1),
            CommandReply::Ok,
            CommandReply::Value("a".to_string()),
            CommandReply::Absent,
        ]
    );
}

#[tokio::test]
async fn test_batch_keeps_going_after_failed_command() {
    let redis = TestRedis::new().await;
    let store = &redis.store;

    store.list_push_head("UserList:latest", "1").await.unwrap();
    store.set("User:1", "a", None).await.unwrap();

    let replies = store
        .batch(vec![
            StoreCommand::get("UserList:latest"),
            StoreCommand::get("User:1"),
            StoreCommand::get("User:2"),
        ])
        .await
        .unwrap();

    assert_eq!(replies.len(), 3);
    assert!(matches!(&replies[0], CommandReply::Failed(reason) if reason.contains("WRONGTYPE")));
    assert_eq!(replies[1], CommandReply::Value("a".to_string()));
    assert_eq!(replies[2], CommandReply::Absent);
}

#[tokio::test]
async fn test_scan_and_info_memory() {
    let redis = TestRedis::new().await;
    let store = &redis.store;

    for i in 0..30 {
        store.set(&format!("User:{}", i), "{}", None).await.unwrap();
    }
    store.list_push_head("UserList:latest", "0").await.unwrap();

    let mut cursor = SCAN_START;
    let mut seen = std::collections::HashSet::new();
    loop {
        let (next, keys) = store.scan(cursor, "User:*", 10).await.unwrap();
        seen.extend(keys);
        cursor = next;
        if cursor == SCAN_START {
            break;
        }
    }
    assert_eq!(seen.len(), 30);

    let report = store.info_memory().await.unwrap();
    assert!(report.contains("used_memory:"));
}
