//! Infrastructure layer - database, transactions and queue endpoints.

mod db;
pub mod migrations;
pub mod queue;
pub mod unit_of_work;

pub use db::Database;
pub use migrations::Migrator;
pub use queue::{init_queues, QueueConfig, QueueEndpoints, QueueKey};
pub use unit_of_work::{Persistence, TransactionContext, TransactionManager, TxUserRepository};
