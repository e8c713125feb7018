//! Unit of Work - transaction manager for the primary store.
//!
//! A unit of work is a closure run against one open transaction. The closure
//! gets a [`TransactionContext`] exposing the transaction-scoped write
//! repositories. The transaction is committed when the closure returns `Ok` and
//! rolled back when it returns `Err`; the closure's error is handed back
//! unchanged. A failed rollback is logged, never returned, so it cannot hide
//! the error that caused it.
//!
//! If the closure panics, the transaction handle is dropped without being
//! terminated and SeaORM rolls it back on drop.
//!
//! Nesting is not supported: calling `do_in_tx` again from inside the closure
//! opens an unrelated second transaction and its behaviour is undefined.
//! Do not do it.

use async_trait::async_trait;
use futures::future::BoxFuture;
use sea_orm::{
    AccessMode, ActiveModelTrait, DatabaseConnection, DatabaseTransaction, EntityTrait,
    IsolationLevel, Set, TransactionTrait,
};
use uuid::Uuid;

use crate::repository::entities::user::{ActiveModel, Entity as UserEntity};
use crate::repository::UserTxRepository;
use common::{AppError, AppResult};
use domain::user::{next_timestamp, now_micros};
use domain::User;

/// Transaction manager trait for dependency injection.
///
/// Note: This trait is not object safe due to the generic method.
/// For testing, implement it with a double that hands out mock repositories.
#[async_trait]
pub trait TransactionManager: Send + Sync {
    /// Execute a closure within a transaction.
    ///
    /// The transaction is committed on success or rolled back on error.
    async fn do_in_tx<F, T>(&self, f: F) -> AppResult<T>
    where
        F: for<'a> FnOnce(TransactionContext<'a>) -> BoxFuture<'a, AppResult<T>> + Send,
        T: Send;
}

/// Transaction context providing repository access within a transaction.
///
/// All repository operations performed through this context are part of the
/// same transaction. The context borrows the repository, so it cannot escape
/// the closure it was handed to.
#[derive(Clone, Copy)]
pub struct TransactionContext<'a> {
    users: &'a dyn UserTxRepository,
}

impl<'a> TransactionContext<'a> {
    /// Create a new transaction context
    pub fn new(users: &'a dyn UserTxRepository) -> Self {
        Self { users }
    }

    /// Get user repository for this transaction
    pub fn users(&self) -> &'a dyn UserTxRepository {
        self.users
    }
}

/// SeaORM-backed transaction manager
pub struct Persistence {
    db: DatabaseConnection,
    isolation: IsolationLevel,
}

impl Persistence {
    /// Create a transaction manager using ReadCommitted isolation.
    pub fn new(db: DatabaseConnection) -> Self {
        Self::with_isolation(db, IsolationLevel::ReadCommitted)
    }

    /// Create a transaction manager with an explicit isolation level.
    pub fn with_isolation(db: DatabaseConnection, isolation: IsolationLevel) -> Self {
        Self { db, isolation }
    }
}

#[async_trait]
impl TransactionManager for Persistence {
    async fn do_in_tx<F, T>(&self, f: F) -> AppResult<T>
    where
        F: for<'a> FnOnce(TransactionContext<'a>) -> BoxFuture<'a, AppResult<T>> + Send,
        T: Send,
    {
        let txn = self
            .db
            .begin_with_config(Some(self.isolation), Some(AccessMode::ReadWrite))
            .await
            .map_err(AppError::from)?;

        let outcome = {
            let users = TxUserRepository::new(&txn);
            f(TransactionContext::new(&users)).await
        };

        match outcome {
            Ok(result) => {
                txn.commit().await.map_err(AppError::from)?;
                Ok(result)
            }
            Err(e) => {
                if let Err(rollback_err) = txn.rollback().await {
                    tracing::error!(
                        error = %rollback_err,
                        cause = %e,
                        "Transaction rollback failed"
                    );
                }
                Err(e)
            }
        }
    }
}

/// Transaction-aware user repository.
///
/// Executes all operations within the borrowed transaction.
pub struct TxUserRepository<'a> {
    txn: &'a DatabaseTransaction,
}

impl<'a> TxUserRepository<'a> {
    /// Create new transaction-aware repository
    pub fn new(txn: &'a DatabaseTransaction) -> Self {
        Self { txn }
    }

    async fn insert(&self, user: &User) -> AppResult<User> {
        let now = now_micros();
        let active_model = ActiveModel {
            id: Set(Uuid::new_v4()),
            email: Set(user.email.clone()),
            created_at: Set(now),
            updated_at: Set(now),
        };

        let model = active_model.insert(self.txn).await.map_err(AppError::from)?;
        Ok(User::from(model))
    }

    async fn update(&self, user: &User) -> AppResult<User> {
        let current = UserEntity::find_by_id(user.id)
            .one(self.txn)
            .await?
            .ok_or(AppError::NotFound)?;

        // Never let updated_at go backwards, even if the caller's value is stale
        let updated_at = if user.updated_at > current.updated_at {
            user.updated_at
        } else {
            next_timestamp(current.updated_at)
        };

        let mut active: ActiveModel = current.into();
        active.email = Set(user.email.clone());
        active.updated_at = Set(updated_at);

        let model = active.update(self.txn).await.map_err(AppError::from)?;
        Ok(User::from(model))
    }
}

#[async_trait]
impl UserTxRepository for TxUserRepository<'_> {
    async fn save(&self, user: &User) -> AppResult<User> {
        if user.is_persisted() {
            self.update(user).await
        } else {
            self.insert(user).await
        }
    }

    async fn remove(&self, id: Uuid) -> AppResult<Uuid> {
        let result = UserEntity::delete_by_id(id)
            .exec(self.txn)
            .await
            .map_err(AppError::from)?;

        if result.rows_affected == 0 {
            return Err(AppError::NotFound);
        }

        Ok(id)
    }
}

/// Simpler API for executing transactional operations.
///
/// This helper macro reduces boilerplate when using transactions.
#[macro_export]
macro_rules! with_transaction {
    ($tm:expr, |$ctx:ident| $body:expr) => {
        $tm.do_in_tx(|$ctx| Box::pin(async move { $body })).await
    };
}
