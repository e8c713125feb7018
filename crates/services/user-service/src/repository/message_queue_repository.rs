//! Message queue repository.
//!
//! [`RedisMessageQueue`] implements an at-least-once queue with leases on top
//! of Redis, addressed by the physical queue address resolved at startup:
//!
//! - `queue:{address}:pending`  list of message ids waiting for delivery
//! - `queue:{address}:inflight` sorted set of receipt handles scored by lease expiry (ms)
//! - `queue:{address}:bodies`   hash of message id -> body
//! - `queue:{address}:leases`   hash of receipt handle -> message id
//!
//! Receive and delete run as Lua scripts so a lease is granted or released
//! atomically. Leases that expired without a delete are put back at the head
//! of the pending list on the next receive, which is what makes redelivery
//! happen. A receipt handle stops working once its lease has been reclaimed.

use std::time::Duration;

use async_trait::async_trait;
use redis::{aio::ConnectionManager, RedisError};
use tracing::{debug, warn};
use uuid::Uuid;

use common::{AppError, AppResult};
use domain::{Message, ReceiveMessageOptions};

#[cfg(any(test, feature = "test-utils"))]
use mockall::automock;

/// Largest batch a single receive may return
pub const MAX_RECEIVE_BATCH: u32 = 10;

/// Message queue trait for dependency injection.
#[cfg_attr(any(test, feature = "test-utils"), automock)]
#[async_trait]
pub trait MessageQueueRepository: Send + Sync {
    /// Enqueue a message.
    async fn send_message(&self, message: Message) -> AppResult<()>;

    /// Lease up to `max_number_of_messages` messages. An empty result is not an error.
    async fn receive_message(&self, options: ReceiveMessageOptions) -> AppResult<Vec<Message>>;

    /// Acknowledge one delivery, removing the message for good.
    async fn delete_message(&self, receipt_handle: &str) -> AppResult<()>;
}

const RECEIVE_SCRIPT: &str = r#"
    local now = tonumber(ARGV[1])
    local expired = redis.call("ZRANGEBYSCORE", KEYS[2], "-inf", now)
    for _, receipt in ipairs(expired) do
        local id = redis.call("HGET", KEYS[4], receipt)
        redis.call("ZREM", KEYS[2], receipt)
        redis.call("HDEL", KEYS[4], receipt)
        if id and redis.call("HEXISTS", KEYS[3], id) == 1 then
            redis.call("LPUSH", KEYS[1], id)
        end
    end

    local out = {}
    local max = tonumber(ARGV[3])
    local used = 0
    while used < max do
        local id = redis.call("LPOP", KEYS[1])
        if not id then
            break
        end
        local body = redis.call("HGET", KEYS[3], id)
        if body then
            used = used + 1
            local receipt = ARGV[3 + used]
            redis.call("ZADD", KEYS[2], now + tonumber(ARGV[2]), receipt)
            redis.call("HSET", KEYS[4], receipt, id)
            table.insert(out, receipt)
            table.insert(out, body)
        end
    end
    return out
"#;

const DELETE_SCRIPT: &str = r#"
    local id = redis.call("HGET", KEYS[3], ARGV[1])
    if not id then
        return 0
    end
    redis.call("HDEL", KEYS[3], ARGV[1])
    redis.call("ZREM", KEYS[1], ARGV[1])
    redis.call("HDEL", KEYS[2], id)
    return 1
"#;

/// Redis key names for one queue.
#[derive(Debug, Clone, PartialEq, Eq)]
struct QueueKeys {
    pending: String,
    inflight: String,
    bodies: String,
    leases: String,
}

impl QueueKeys {
    fn for_address(address: &str) -> Self {
        Self {
            pending: format!("queue:{}:pending", address),
            inflight: format!("queue:{}:inflight", address),
            bodies: format!("queue:{}:bodies", address),
            leases: format!("queue:{}:leases", address),
        }
    }
}

/// Lease-based queue stored in Redis.
#[derive(Clone)]
pub struct RedisMessageQueue {
    conn: ConnectionManager,
    queue_url: String,
    keys: QueueKeys,
    visibility_timeout: Duration,
}

impl RedisMessageQueue {
    /// Create a queue handle for one resolved queue address.
    pub fn new(conn: ConnectionManager, queue_url: impl Into<String>, visibility_timeout: Duration) -> Self {
        let queue_url = queue_url.into();
        Self {
            conn,
            keys: QueueKeys::for_address(&queue_url),
            queue_url,
            visibility_timeout,
        }
    }

    /// Physical address this handle talks to.
    pub fn queue_url(&self) -> &str {
        &self.queue_url
    }
}

#[async_trait]
impl MessageQueueRepository for RedisMessageQueue {
    async fn send_message(&self, message: Message) -> AppResult<()> {
        let id = Uuid::new_v4().to_string();
        let mut conn = self.conn.clone();

        let _: () = redis::pipe()
            .atomic()
            .hset(&self.keys.bodies, &id, &message.body)
            .ignore()
            .rpush(&self.keys.pending, &id)
            .ignore()
            .query_async(&mut conn)
            .await
            .map_err(|e| queue_error(&self.queue_url, "send", e))?;

        debug!(queue = %self.queue_url, message_id = %id, "Message sent");
        Ok(())
    }

    async fn receive_message(&self, options: ReceiveMessageOptions) -> AppResult<Vec<Message>> {
        let max = options.max_number_of_messages.clamp(1, MAX_RECEIVE_BATCH);
        let receipts: Vec<String> = (0..max).map(|_| Uuid::new_v4().to_string()).collect();
        let now_ms = chrono::Utc::now().timestamp_millis();
        let visibility_ms = self.visibility_timeout.as_millis() as u64;
        let mut conn = self.conn.clone();

        let reply: Vec<String> = redis::cmd("EVAL")
            .arg(RECEIVE_SCRIPT)
            .arg(4)
            .arg(&self.keys.pending)
            .arg(&self.keys.inflight)
            .arg(&self.keys.bodies)
            .arg(&self.keys.leases)
            .arg(now_ms)
            .arg(visibility_ms)
            .arg(max)
            .arg(&receipts)
            .query_async(&mut conn)
            .await
            .map_err(|e| queue_error(&self.queue_url, "receive", e))?;

        let messages = parse_deliveries(reply)?;
        debug!(queue = %self.queue_url, count = messages.len(), "Messages received");
        Ok(messages)
    }

    async fn delete_message(&self, receipt_handle: &str) -> AppResult<()> {
        let mut conn = self.conn.clone();

        let deleted: i32 = redis::cmd("EVAL")
            .arg(DELETE_SCRIPT)
            .arg(3)
            .arg(&self.keys.inflight)
            .arg(&self.keys.bodies)
            .arg(&self.keys.leases)
            .arg(receipt_handle)
            .query_async(&mut conn)
            .await
            .map_err(|e| queue_error(&self.queue_url, "delete", e))?;

        if deleted == 0 {
            return Err(AppError::queue(format!(
                "receipt handle {} is invalid or its lease has expired",
                receipt_handle
            )));
        }

        debug!(queue = %self.queue_url, receipt_handle = %receipt_handle, "Message deleted");
        Ok(())
    }
}

/// Turn the flat `[receipt, body, receipt, body, ...]` script reply into messages.
fn parse_deliveries(reply: Vec<String>) -> AppResult<Vec<Message>> {
    if reply.len() % 2 != 0 {
        return Err(AppError::queue(format!(
            "malformed receive reply with {} elements",
            reply.len()
        )));
    }

    let mut messages = Vec::with_capacity(reply.len() / 2);
    let mut items = reply.into_iter();
    while let (Some(receipt), Some(body)) = (items.next(), items.next()) {
        messages.push(Message::received(body, receipt));
    }
    Ok(messages)
}

/// Convert Redis error to AppError.
fn queue_error(queue_url: &str, operation: &str, e: RedisError) -> AppError {
    warn!(queue = %queue_url, operation = %operation, error = %e, "Queue operation failed");
    AppError::queue(format!("{} failed on {}: {}", operation, queue_url, e))
}
