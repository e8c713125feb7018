//! User repositories for the primary store.
//!
//! Reads go through [`UserRepository`] on the shared connection. Writes go
//! through [`UserTxRepository`], which is only handed out inside a unit of
//! work (see `infra::unit_of_work`) so every write is part of a transaction.

use async_trait::async_trait;
use sea_orm::{
    ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, QuerySelect,
};
use uuid::Uuid;

use super::entities::user::{self, Entity as UserEntity};
use common::{AppError, AppResult};
use domain::{User, MAX_PAGE_SIZE};

#[cfg(any(test, feature = "test-utils"))]
use mockall::automock;

/// Read side of the user store.
#[cfg_attr(any(test, feature = "test-utils"), automock)]
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Find user by ID
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<User>>;

    /// List users ordered by creation time
    async fn find_all(&self, limit: u64, offset: u64) -> AppResult<Vec<User>>;
}

/// Write side of the user store, bound to an open transaction.
#[cfg_attr(any(test, feature = "test-utils"), automock)]
#[async_trait]
pub trait UserTxRepository: Send + Sync {
    /// Insert a user with a nil ID (assigning ID and timestamps) or update an existing one.
    ///
    /// Returns `NotFound` when updating a user whose row no longer exists.
    async fn save(&self, user: &User) -> AppResult<User>;

    /// Permanently delete a user, returning the removed ID.
    async fn remove(&self, id: Uuid) -> AppResult<Uuid>;
}

/// Concrete implementation of UserRepository
pub struct UserStore {
    db: DatabaseConnection,
}

impl UserStore {
    /// Create new repository instance
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl UserRepository for UserStore {
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<User>> {
        let result = UserEntity::find()
            .filter(user::Column::Id.eq(id))
            .one(&self.db)
            .await
            .map_err(AppError::from)?;

        Ok(result.map(User::from))
    }

    async fn find_all(&self, limit: u64, offset: u64) -> AppResult<Vec<User>> {
        let models = UserEntity::find()
            .order_by_asc(user::Column::CreatedAt)
            .order_by_asc(user::Column::Id)
            .limit(limit.min(MAX_PAGE_SIZE))
            .offset(offset)
            .all(&self.db)
            .await
            .map_err(AppError::from)?;

        Ok(models.into_iter().map(User::from).collect())
    }
}
