//! Repository layer for data access.
//!
//! One trait per backing store, each with a concrete implementation and a
//! mockall mock behind the `test-utils` feature.

mod cache_repository;
pub mod entities;
mod message_queue_repository;
mod user_repository;

pub use cache_repository::{RedisUserCache, UserCacheRepository};
pub use message_queue_repository::{MessageQueueRepository, RedisMessageQueue, MAX_RECEIVE_BATCH};
pub use user_repository::{UserRepository, UserStore, UserTxRepository};

// Export mocks for tests (both unit and integration)
#[cfg(any(test, feature = "test-utils"))]
pub use cache_repository::MockUserCacheRepository;
#[cfg(any(test, feature = "test-utils"))]
pub use message_queue_repository::MockMessageQueueRepository;
#[cfg(any(test, feature = "test-utils"))]
pub use user_repository::{MockUserRepository, MockUserTxRepository};
