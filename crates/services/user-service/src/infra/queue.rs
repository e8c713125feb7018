//! Queue endpoint resolution.
//!
//! Maps logical queue keys to physical queue addresses once at startup. The
//! resulting [`QueueEndpoints`] is read-only and shared by every component that
//! needs an address.
//!
//! Only the `local` and `test` environments resolve here: addresses are
//! synthesized as `{endpoint}/000000000000/{queue_name}` without touching the
//! network. Any other environment is rejected, as is a missing endpoint or an
//! empty queue name. Resolution is all-or-nothing.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use common::{AppError, AppResult};
use domain::{ENV_LOCAL, ENV_TEST, LOCAL_QUEUE_ACCOUNT_ID, QUEUE_KEY_SAMPLE};

/// Logical queue identifiers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueueKey {
    Sample,
}

impl QueueKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            QueueKey::Sample => QUEUE_KEY_SAMPLE,
        }
    }
}

impl fmt::Display for QueueKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Input to endpoint resolution.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct QueueConfig {
    pub environment: String,
    pub region: String,
    pub endpoint: String,
    pub queue_names: HashMap<QueueKey, String>,
}

/// Resolved queue addresses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueEndpoints {
    region: String,
    endpoint: String,
    urls: HashMap<QueueKey, String>,
}

impl QueueEndpoints {
    /// Address of a logical queue.
    pub fn url(&self, key: QueueKey) -> AppResult<&str> {
        self.urls
            .get(&key)
            .map(String::as_str)
            .ok_or_else(|| AppError::config(format!("no queue configured for key {}", key)))
    }

    /// All resolved addresses
    pub fn urls(&self) -> &HashMap<QueueKey, String> {
        &self.urls
    }

    pub fn region(&self) -> &str {
        &self.region
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

/// Resolve every configured queue name to its physical address.
pub fn init_queues(config: &QueueConfig) -> AppResult<QueueEndpoints> {
    match config.environment.as_str() {
        ENV_LOCAL | ENV_TEST => resolve_local(config),
        other => Err(AppError::config(format!("invalid environment: {}", other))),
    }
}

fn resolve_local(config: &QueueConfig) -> AppResult<QueueEndpoints> {
    if config.endpoint.trim().is_empty() {
        return Err(AppError::config(
            "queue endpoint is required for local/test environment",
        ));
    }
    let endpoint = config.endpoint.trim().trim_end_matches('/');

    let urls = config
        .queue_names
        .iter()
        .map(|(key, name)| {
            if name.trim().is_empty() {
                return Err(AppError::config(format!("queue name for key {} is empty", key)));
            }
            Ok((*key, format!("{}/{}/{}", endpoint, LOCAL_QUEUE_ACCOUNT_ID, name)))
        })
        .collect::<AppResult<HashMap<_, _>>>()?;

    tracing::info!(
        environment = %config.environment,
        region = %config.region,
        queues = urls.len(),
        "Queue endpoints resolved"
    );

    Ok(QueueEndpoints {
        region: config.region.clone(),
        endpoint: endpoint.to_string(),
        urls,
    })
}
