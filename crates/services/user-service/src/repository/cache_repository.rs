//! Redis-backed user cache.
//!
//! Entries are JSON snapshots under `user:{id}` written with an explicit TTL.
//! The cache is never the source of truth: a missing or undecodable entry is
//! reported as a miss and callers fall back to the primary store.

use std::time::Duration;

use async_trait::async_trait;
use redis::{aio::ConnectionManager, AsyncCommands, RedisError};
use tracing::warn;
use uuid::Uuid;

use common::{AppError, AppResult};
use domain::{user_cache_key, User};

#[cfg(any(test, feature = "test-utils"))]
use mockall::automock;

/// User cache trait for dependency injection.
#[cfg_attr(any(test, feature = "test-utils"), automock)]
#[async_trait]
pub trait UserCacheRepository: Send + Sync {
    /// Cache a user snapshot for `ttl`, overwriting any previous entry.
    async fn store(&self, user: &User, ttl: Duration) -> AppResult<()>;

    /// Get cached user by ID. `Ok(None)` is a miss.
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<User>>;

    /// Drop the cached entry for a user (no-op when absent).
    async fn remove(&self, id: Uuid) -> AppResult<()>;
}

/// Redis cache wrapper.
#[derive(Clone)]
pub struct RedisUserCache {
    conn: ConnectionManager,
}

impl RedisUserCache {
    /// Wrap an existing connection manager.
    pub fn new(conn: ConnectionManager) -> Self {
        Self { conn }
    }
}

#[async_trait]
impl UserCacheRepository for RedisUserCache {
    async fn store(&self, user: &User, ttl: Duration) -> AppResult<()> {
        let key = user_cache_key(&user.id);
        let json = serde_json::to_string(user)
            .map_err(|e| AppError::serialization(e.to_string()))?;

        // SET EX rejects a zero expiry
        let ttl_seconds = ttl.as_secs().max(1);

        let mut conn = self.conn.clone();
        conn.set_ex::<_, _, ()>(&key, json, ttl_seconds)
            .await
            .map_err(|e| cache_error(&key, e))?;
        Ok(())
    }

    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<User>> {
        let key = user_cache_key(&id);
        let mut conn = self.conn.clone();
        let result: Option<String> = conn.get(&key).await.map_err(|e| cache_error(&key, e))?;

        match result {
            Some(json) => match serde_json::from_str(&json) {
                Ok(user) => Ok(Some(user)),
                Err(e) => {
                    warn!(key = %key, error = %e, "Failed to deserialize cached value");
                    Ok(None) // Treat deserialization errors as cache miss
                }
            },
            None => Ok(None),
        }
    }

    async fn remove(&self, id: Uuid) -> AppResult<()> {
        let key = user_cache_key(&id);
        let mut conn = self.conn.clone();
        conn.del::<_, ()>(&key).await.map_err(|e| cache_error(&key, e))?;
        Ok(())
    }
}

/// Convert Redis error to AppError.
fn cache_error(key: &str, e: RedisError) -> AppError {
    warn!(key = %key, error = %e, "Redis cache operation failed");
    AppError::cache(e.to_string())
}
