//! Domain-level constants.
//!
//! These constants define business rules and shared defaults.

// =============================================================================
// Cache
// =============================================================================

/// Default cache TTL in seconds (1 hour)
pub const DEFAULT_CACHE_TTL_SECONDS: u64 = 3600;

/// Cache key prefix for user data
pub const CACHE_PREFIX_USER: &str = "user:";

/// Build the cache key for a user identifier.
pub fn user_cache_key(id: &uuid::Uuid) -> String {
    format!("{}{}", CACHE_PREFIX_USER, id)
}

// =============================================================================
// Pagination
// =============================================================================

/// Default number of users returned by a list query
pub const DEFAULT_PAGE_SIZE: u64 = 20;

/// Maximum allowed items per page to prevent excessive queries
pub const MAX_PAGE_SIZE: u64 = 100;

// =============================================================================
// Message Queue
// =============================================================================

/// Account segment used when synthesizing local queue addresses
pub const LOCAL_QUEUE_ACCOUNT_ID: &str = "000000000000";

/// Logical key of the sample queue
pub const QUEUE_KEY_SAMPLE: &str = "sample";

/// Default physical name of the sample queue
pub const DEFAULT_SAMPLE_QUEUE_NAME: &str = "sample-queue";

/// Default lease granted to a received message, in seconds
pub const DEFAULT_VISIBILITY_TIMEOUT_SECONDS: u64 = 30;

/// Default delay between subscriber iterations after a failure, in seconds
pub const DEFAULT_SUBSCRIBER_RETRY_DELAY_SECONDS: u64 = 5;

// =============================================================================
// Environments
// =============================================================================

/// Developer machine environment
pub const ENV_LOCAL: &str = "local";

/// Automated test environment
pub const ENV_TEST: &str = "test";
