//! Redis-backed repository tests.
//!
//! These need a running Redis. To run them:
//! 1. Start Redis (e.g. `docker run -p 6379:6379 redis`)
//! 2. Optionally set REDIS_URL (default `redis://127.0.0.1:6379`)
//! 3. Run: cargo test -p user-service -- --ignored
//!
//! Every test works on its own queue address or user id, so they can run in
//! parallel against one server.

use std::time::Duration;

use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use uuid::Uuid;

use common::AppError;
use domain::{user_cache_key, Message, ReceiveMessageOptions, User};
use user_service_lib::repository::{
    MessageQueueRepository, RedisMessageQueue, RedisUserCache, UserCacheRepository,
};

const LEASE: Duration = Duration::from_millis(200);

async fn connection() -> ConnectionManager {
    let url = std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://127.0.0.1:6379".to_string());
    let client = redis::Client::open(url).unwrap();
    ConnectionManager::new(client).await.unwrap()
}

async fn fresh_queue() -> RedisMessageQueue {
    let address = format!("http://localhost:4566/000000000000/test-{}", Uuid::new_v4());
    RedisMessageQueue::new(connection().await, address, LEASE)
}

fn one() -> ReceiveMessageOptions {
    ReceiveMessageOptions {
        max_number_of_messages: 1,
    }
}

#[tokio::test]
#[ignore = "Requires Redis"]
async fn test_receive_on_empty_queue_returns_nothing() {
    let queue = fresh_queue().await;

    let messages = queue.receive_message(one()).await.unwrap();

    assert!(messages.is_empty());
}

#[tokio::test]
#[ignore = "Requires Redis"]
async fn test_leased_message_is_invisible_until_lease_expires() {
    let queue = fresh_queue().await;
    queue.send_message(Message::new("\"payload\"")).await.unwrap();

    let first = queue.receive_message(one()).await.unwrap();
    assert_eq!(first.len(), 1);
    assert_eq!(first[0].body, "\"payload\"");

    // Still leased: nothing to hand out
    assert!(queue.receive_message(one()).await.unwrap().is_empty());

    tokio::time::sleep(LEASE * 2).await;

    let redelivered = queue.receive_message(one()).await.unwrap();
    assert_eq!(redelivered.len(), 1);
    assert_eq!(redelivered[0].body, first[0].body);
    assert_ne!(redelivered[0].receipt_handle, first[0].receipt_handle);
}

#[tokio::test]
#[ignore = "Requires Redis"]
async fn test_reclaimed_receipt_handle_cannot_delete() {
    let queue = fresh_queue().await;
    queue.send_message(Message::new("\"payload\"")).await.unwrap();

    let stale = queue.receive_message(one()).await.unwrap().remove(0);
    tokio::time::sleep(LEASE * 2).await;
    let current = queue.receive_message(one()).await.unwrap().remove(0);

    let err = queue
        .delete_message(&stale.receipt_handle)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Queue(_)));

    queue.delete_message(&current.receipt_handle).await.unwrap();

    tokio::time::sleep(LEASE * 2).await;
    assert!(queue.receive_message(one()).await.unwrap().is_empty());
}

#[tokio::test]
#[ignore = "Requires Redis"]
async fn test_deleted_message_is_never_redelivered() {
    let queue = fresh_queue().await;
    queue.send_message(Message::new("\"a\"")).await.unwrap();
    queue.send_message(Message::new("\"b\"")).await.unwrap();

    let batch = queue
        .receive_message(ReceiveMessageOptions {
            max_number_of_messages: 10,
        })
        .await
        .unwrap();
    let bodies: Vec<&str> = batch.iter().map(|m| m.body.as_str()).collect();
    assert_eq!(bodies, vec!["\"a\"", "\"b\""]);

    for message in &batch {
        queue.delete_message(&message.receipt_handle).await.unwrap();
    }

    tokio::time::sleep(LEASE * 2).await;
    assert!(queue.receive_message(one()).await.unwrap().is_empty());
}

#[tokio::test]
#[ignore = "Requires Redis"]
async fn test_cache_store_find_remove() {
    let cache = RedisUserCache::new(connection().await);
    let user = User::new(Uuid::new_v4(), "cache@example.com");

    cache.store(&user, Duration::from_secs(60)).await.unwrap();
    assert_eq!(cache.find_by_id(user.id).await.unwrap(), Some(user.clone()));

    cache.remove(user.id).await.unwrap();
    assert_eq!(cache.find_by_id(user.id).await.unwrap(), None);
}

#[tokio::test]
#[ignore = "Requires Redis"]
async fn test_undecodable_cache_entry_is_a_miss() {
    let mut conn = connection().await;
    let id = Uuid::new_v4();
    let key = user_cache_key(&id);
    conn.set_ex::<_, _, ()>(&key, "not json", 60).await.unwrap();

    let cache = RedisUserCache::new(conn.clone());
    assert_eq!(cache.find_by_id(id).await.unwrap(), None);

    conn.del::<_, ()>(&key).await.unwrap();
}
