//! User service configuration.

use std::collections::HashMap;
use std::env;
use std::fmt;
use std::str::FromStr;

use common::{CacheConfig, ConsumerConfig, DatabaseConfig};
use domain::{DEFAULT_SAMPLE_QUEUE_NAME, ENV_LOCAL};

use crate::infra::{QueueConfig, QueueKey};

const DEFAULT_QUEUE_REGION: &str = "ap-northeast-1";
const DEFAULT_QUEUE_ENDPOINT: &str = "http://localhost:4566";

/// User service configuration.
#[derive(Clone)]
pub struct UserServiceConfig {
    pub database: DatabaseConfig,
    pub cache: CacheConfig,
    pub consumer: ConsumerConfig,
    /// Deployment environment (`local`, `test`, ...)
    pub environment: String,
    pub queue_region: String,
    pub queue_endpoint: String,
    pub sample_queue_name: String,
}

impl fmt::Debug for UserServiceConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UserServiceConfig")
            .field("database_url", &"[REDACTED]")
            .field("redis_url", &"[REDACTED]")
            .field("cache_ttl_seconds", &self.cache.default_ttl_seconds)
            .field("consumer", &self.consumer)
            .field("environment", &self.environment)
            .field("queue_region", &self.queue_region)
            .field("queue_endpoint", &self.queue_endpoint)
            .field("sample_queue_name", &self.sample_queue_name)
            .finish()
    }
}

impl UserServiceConfig {
    /// Load configuration from `.env` and environment variables.
    ///
    /// Service specific `USER_SERVICE_*` URLs win over the shared names.
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let defaults = Self::default();

        Self {
            database: DatabaseConfig {
                url: env::var("USER_SERVICE_DATABASE_URL")
                    .or_else(|_| env::var("DATABASE_URL"))
                    .unwrap_or(defaults.database.url),
                ..defaults.database
            },
            cache: CacheConfig {
                url: env::var("USER_SERVICE_REDIS_URL")
                    .or_else(|_| env::var("REDIS_URL"))
                    .unwrap_or(defaults.cache.url),
                default_ttl_seconds: parsed_var("CACHE_TTL_SECONDS")
                    .unwrap_or(defaults.cache.default_ttl_seconds),
            },
            consumer: ConsumerConfig {
                visibility_timeout_seconds: parsed_var("QUEUE_VISIBILITY_TIMEOUT_SECONDS")
                    .unwrap_or(defaults.consumer.visibility_timeout_seconds),
                retry_delay_seconds: parsed_var("SUBSCRIBER_RETRY_DELAY_SECONDS")
                    .unwrap_or(defaults.consumer.retry_delay_seconds),
            },
            environment: env::var("APP_ENV").unwrap_or(defaults.environment),
            queue_region: env::var("QUEUE_REGION").unwrap_or(defaults.queue_region),
            queue_endpoint: env::var("QUEUE_ENDPOINT").unwrap_or(defaults.queue_endpoint),
            sample_queue_name: env::var("QUEUE_NAME_SAMPLE")
                .unwrap_or(defaults.sample_queue_name),
        }
    }

    /// Input for queue endpoint resolution.
    pub fn queue_config(&self) -> QueueConfig {
        QueueConfig {
            environment: self.environment.clone(),
            region: self.queue_region.clone(),
            endpoint: self.queue_endpoint.clone(),
            queue_names: HashMap::from([(QueueKey::Sample, self.sample_queue_name.clone())]),
        }
    }
}

impl Default for UserServiceConfig {
    fn default() -> Self {
        Self {
            database: DatabaseConfig::default(),
            cache: CacheConfig::default(),
            consumer: ConsumerConfig::default(),
            environment: ENV_LOCAL.to_string(),
            queue_region: DEFAULT_QUEUE_REGION.to_string(),
            queue_endpoint: DEFAULT_QUEUE_ENDPOINT.to_string(),
            sample_queue_name: DEFAULT_SAMPLE_QUEUE_NAME.to_string(),
        }
    }
}

fn parsed_var<T: FromStr>(name: &str) -> Option<T> {
    match env::var(name) {
        Ok(raw) => match raw.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(variable = name, value = %raw, "Ignoring unparsable value");
                None
            }
        },
        Err(_) => None,
    }
}
