//! User Service Library
//!
//! User use cases over a transactional primary store, a Redis cache-aside
//! layer and a lease-based message queue, plus the subscriber that drives the
//! queue round trip.

pub mod config;
pub mod dependency;
pub mod infra;
pub mod repository;
pub mod service;
pub mod subscriber;

use tokio::sync::watch;
use tracing::info;

use crate::config::UserServiceConfig;
use crate::dependency::Dependency;
use crate::infra::Database;
use crate::service::ProcessMessageInput;
use crate::subscriber::Subscriber;

/// Subscribers the binary can run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubscriberKind {
    Sample,
}

/// Run a subscriber until `shutdown` fires.
pub async fn run_subscriber(
    kind: SubscriberKind,
    shutdown: watch::Receiver<bool>,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = UserServiceConfig::from_env();
    let deps = Dependency::build(&config).await?;

    match kind {
        SubscriberKind::Sample => {
            info!(queues = ?deps.endpoints().urls(), "Starting sample subscriber");
            let mut subscriber = Subscriber::new(deps.user_service(), ProcessMessageInput::default())
                .with_retry_policy(deps.retry_policy());
            subscriber.run(shutdown).await?;
        }
    }

    Ok(())
}

/// Run migrations (for CLI commands).
pub async fn run_migrations(action: MigrateAction) -> Result<(), Box<dyn std::error::Error>> {
    let config = UserServiceConfig::from_env();
    let db = Database::connect_without_migrations(&config.database).await?;

    match action {
        MigrateAction::Up => {
            db.run_migrations().await?;
            info!("Migrations applied successfully");
        }
        MigrateAction::Down => {
            db.rollback_migration().await?;
            info!("Rolled back last migration");
        }
        MigrateAction::Status => {
            let status = db.migration_status().await?;
            for (name, applied) in status {
                let marker = if applied { "[x]" } else { "[ ]" };
                println!("{} {}", marker, name);
            }
        }
        MigrateAction::Fresh => {
            db.fresh_migrations().await?;
            info!("Database reset and migrations applied");
        }
    }

    Ok(())
}

/// Migration action type.
#[derive(Debug, Clone, Copy)]
pub enum MigrateAction {
    Up,
    Down,
    Status,
    Fresh,
}
