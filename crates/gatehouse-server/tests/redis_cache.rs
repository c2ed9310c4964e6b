//! Integration tests for the principal cache backends.
//!
//! Redis tests use testcontainers to spin up a real Redis instance.

use std::time::Duration;

use gatehouse_core::{Principal, Role};
use gatehouse_server::{PrincipalCacheBackend, RedisConfig, create_principal_cache};
use gatehouse_storage::PrincipalCache;
use testcontainers::{ContainerAsync, runners::AsyncRunner};
use testcontainers_modules::redis::Redis;
use tokio::sync::OnceCell;

// Shared Redis container for all tests
static SHARED_REDIS: OnceCell<(ContainerAsync<Redis>, String)> = OnceCell::const_new();

async fn get_redis_url() -> String {
    let (_, url) = SHARED_REDIS
        .get_or_init(|| async {
            let container = Redis::default()
                .start()
                .await
                .expect("start redis container");

            let host_port = container.get_host_port_ipv4(6379).await.expect("get port");
            let url = format!("redis://127.0.0.1:{}", host_port);

            (container, url)
        })
        .await;

    url.clone()
}

fn principal(id: i64) -> Principal {
    Principal::new(
        id,
        format!("user{id}"),
        format!("user{id}@example.com"),
        Role::new(2, "moderator", 2).with_description("A moderator can update other users posts"),
    )
}

async fn redis_backend() -> PrincipalCacheBackend {
    let config = RedisConfig {
        enabled: true,
        url: get_redis_url().await,
        pool_size: 4,
        timeout_ms: 2000,
    };
    create_principal_cache(&config).await
}

#[tokio::test]
async fn test_disabled_redis_uses_local_cache() {
    let backend = create_principal_cache(&RedisConfig::default()).await;
    assert_eq!(backend.mode(), "local");

    let cache = backend.shared();
    let ada = principal(1);
    cache.set(&ada, Duration::from_secs(60)).await.unwrap();
    assert_eq!(cache.get(1).await.unwrap(), Some(ada));
}

#[tokio::test]
async fn test_unreachable_redis_falls_back_to_local() {
    let config = RedisConfig {
        enabled: true,
        url: "redis://127.0.0.1:1".to_string(),
        pool_size: 1,
        timeout_ms: 200,
    };
    let backend = create_principal_cache(&config).await;
    assert_eq!(backend.mode(), "local");
}

#[tokio::test]
async fn test_redis_set_get_remove() {
    let backend = redis_backend().await;
    assert_eq!(backend.mode(), "redis");
    let cache = backend.shared();

    let moderator = principal(101);
    cache.set(&moderator, Duration::from_secs(60)).await.unwrap();
    let cached = cache.get(101).await.unwrap().expect("cached principal");
    assert_eq!(cached, moderator);

    cache.remove(101).await.unwrap();
    assert!(cache.get(101).await.unwrap().is_none());
}

#[tokio::test]
async fn test_redis_health_pings_server() {
    let health = redis_backend().await.health().await;
    assert_eq!(health["mode"], "redis");
    assert_eq!(health["reachable"], true);
    assert!(health.get("hits").is_none());
}

#[tokio::test]
async fn test_redis_miss_is_none() {
    let cache = redis_backend().await.shared();
    assert!(cache.get(999_999).await.unwrap().is_none());
}

#[tokio::test]
async fn test_redis_entry_expires() {
    let cache = redis_backend().await.shared();

    cache.set(&principal(202), Duration::from_secs(1)).await.unwrap();
    assert!(cache.get(202).await.unwrap().is_some());

    tokio::time::sleep(Duration::from_millis(1500)).await;
    assert!(cache.get(202).await.unwrap().is_none());
}

#[tokio::test]
async fn test_redis_is_shared_between_backends() {
    let first = redis_backend().await.shared();
    let second = redis_backend().await.shared();

    let shared = principal(303);
    first.set(&shared, Duration::from_secs(60)).await.unwrap();
    assert_eq!(second.get(303).await.unwrap(), Some(shared));
}
