//! Process wiring.
//!
//! Builds every long-lived component once at startup: the primary store, the
//! Redis connection shared by the cache and the queue, the queue endpoint map
//! and the interactor on top of them.

use std::sync::Arc;
use std::time::Duration;

use redis::aio::ConnectionManager;
use tracing::info;

use common::{AppError, AppResult};

use crate::config::UserServiceConfig;
use crate::infra::{init_queues, Database, Persistence, QueueEndpoints, QueueKey};
use crate::repository::{RedisMessageQueue, RedisUserCache, UserStore};
use crate::service::{UserInteractor, UserService};
use crate::subscriber::RetryPolicy;

/// Wired components of a running process.
pub struct Dependency {
    user_service: Arc<dyn UserService>,
    endpoints: QueueEndpoints,
    retry_policy: RetryPolicy,
}

impl Dependency {
    /// Connect to every backing store and assemble the interactor.
    ///
    /// Queue endpoints are resolved first so a bad environment fails before
    /// any connection is opened.
    pub async fn build(config: &UserServiceConfig) -> AppResult<Self> {
        let endpoints = init_queues(&config.queue_config())?;
        let sample_queue_url = endpoints.url(QueueKey::Sample)?.to_string();

        let db = Database::connect(&config.database).await?;
        let db_conn = db.get_connection();

        let redis = connect_redis(&config.cache.url).await?;

        let user_repo = Arc::new(UserStore::new(db_conn.clone()));
        let user_cache = Arc::new(RedisUserCache::new(redis.clone()));
        let msg_queue = Arc::new(RedisMessageQueue::new(
            redis,
            sample_queue_url,
            Duration::from_secs(config.consumer.visibility_timeout_seconds),
        ));
        let tx_manager = Arc::new(Persistence::new(db_conn));

        let user_service = Arc::new(
            UserInteractor::new(tx_manager, user_repo, user_cache, msg_queue)
                .with_cache_ttl(Duration::from_secs(config.cache.default_ttl_seconds)),
        );

        info!(environment = %config.environment, "Dependencies initialized");

        Ok(Self {
            user_service,
            endpoints,
            retry_policy: RetryPolicy::fixed(Duration::from_secs(
                config.consumer.retry_delay_seconds,
            )),
        })
    }

    pub fn user_service(&self) -> Arc<dyn UserService> {
        self.user_service.clone()
    }

    pub fn endpoints(&self) -> &QueueEndpoints {
        &self.endpoints
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        self.retry_policy
    }
}

async fn connect_redis(url: &str) -> AppResult<ConnectionManager> {
    let client = redis::Client::open(url)
        .map_err(|e| AppError::config(format!("invalid redis url: {}", e)))?;
    ConnectionManager::new(client)
        .await
        .map_err(|e| AppError::cache(format!("failed to connect to redis: {}", e)))
}
