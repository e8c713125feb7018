//! User interactor - user use cases over the store, the cache and the queue.
//!
//! Writes go through the transaction manager; the cache is written only after
//! a successful commit. Cache and acknowledgement failures are logged and never
//! fail the use case.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, info, warn};
use uuid::Uuid;

use common::{AppResult, OptionExt};
use domain::{Message, ReceiveMessageOptions, User, DEFAULT_CACHE_TTL_SECONDS, MAX_PAGE_SIZE};

use crate::infra::TransactionManager;
use crate::repository::{MessageQueueRepository, UserCacheRepository, UserRepository};
use crate::with_transaction;

use super::port::{
    CreateUserInput, CreateUserOutput, DeleteUserInput, DeleteUserOutput, GetUserInput,
    GetUserOutput, ListUserInput, ListUserOutput, ProcessMessageInput, ProcessMessageOutput,
    UpdateUserInput, UpdateUserOutput,
};

#[cfg(any(test, feature = "test-utils"))]
use mockall::automock;

/// User use cases.
///
/// Object safe so drivers such as the subscriber can hold `Arc<dyn UserService>`.
#[cfg_attr(any(test, feature = "test-utils"), automock)]
#[async_trait]
pub trait UserService: Send + Sync {
    /// Validate and persist a new user, then cache it.
    async fn create(&self, input: CreateUserInput) -> AppResult<CreateUserOutput>;

    /// Cache-aside read by ID.
    async fn get(&self, input: GetUserInput) -> AppResult<GetUserOutput>;

    /// Page through users straight from the primary store.
    async fn list(&self, input: ListUserInput) -> AppResult<ListUserOutput>;

    /// Change a user's email, then refresh the cache.
    async fn update(&self, input: UpdateUserInput) -> AppResult<UpdateUserOutput>;

    /// Delete a user, then evict it from the cache.
    async fn delete(&self, input: DeleteUserInput) -> AppResult<DeleteUserOutput>;

    /// Send the input ID through the queue, take one message back and ack it.
    ///
    /// `Ok(None)` means the receive returned nothing.
    async fn process_message(
        &self,
        input: ProcessMessageInput,
    ) -> AppResult<Option<ProcessMessageOutput>>;
}

/// Concrete implementation of [`UserService`].
pub struct UserInteractor<T: TransactionManager> {
    tx_manager: Arc<T>,
    repo: Arc<dyn UserRepository>,
    cache: Arc<dyn UserCacheRepository>,
    msg_queue: Arc<dyn MessageQueueRepository>,
    cache_ttl: Duration,
}

impl<T: TransactionManager> UserInteractor<T> {
    pub fn new(
        tx_manager: Arc<T>,
        repo: Arc<dyn UserRepository>,
        cache: Arc<dyn UserCacheRepository>,
        msg_queue: Arc<dyn MessageQueueRepository>,
    ) -> Self {
        Self {
            tx_manager,
            repo,
            cache,
            msg_queue,
            cache_ttl: Duration::from_secs(DEFAULT_CACHE_TTL_SECONDS),
        }
    }

    /// Override the cache entry lifetime.
    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = ttl;
        self
    }

    async fn cache_user(&self, user: &User) {
        if let Err(e) = self.cache.store(user, self.cache_ttl).await {
            warn!(user_id = %user.id, error = %e, "Failed to cache user");
        }
    }

    async fn evict_user(&self, id: Uuid) {
        if let Err(e) = self.cache.remove(id).await {
            warn!(user_id = %id, error = %e, "Failed to evict cached user");
        }
    }

    async fn acknowledge(&self, message: &Message) {
        if let Err(e) = self.msg_queue.delete_message(&message.receipt_handle).await {
            warn!(
                receipt_handle = %message.receipt_handle,
                error = %e,
                "Failed to delete message"
            );
        }
    }
}

#[async_trait]
impl<T: TransactionManager> UserService for UserInteractor<T> {
    async fn create(&self, input: CreateUserInput) -> AppResult<CreateUserOutput> {
        let user = User::new(Uuid::nil(), input.email);
        user.validate()?;

        let created = with_transaction!(self.tx_manager, |tx| tx.users().save(&user).await)?;
        info!(user_id = %created.id, "User created");

        self.cache_user(&created).await;
        Ok(CreateUserOutput { user: created })
    }

    async fn get(&self, input: GetUserInput) -> AppResult<GetUserOutput> {
        match self.cache.find_by_id(input.id).await {
            Ok(Some(user)) => {
                debug!(user_id = %input.id, "Cache hit");
                return Ok(GetUserOutput { user });
            }
            Ok(None) => debug!(user_id = %input.id, "Cache miss"),
            Err(e) => warn!(user_id = %input.id, error = %e, "Cache read failed"),
        }

        let user = self.repo.find_by_id(input.id).await?.ok_or_not_found()?;
        self.cache_user(&user).await;

        Ok(GetUserOutput { user })
    }

    async fn list(&self, input: ListUserInput) -> AppResult<ListUserOutput> {
        let limit = input.limit.min(MAX_PAGE_SIZE);
        let users = self.repo.find_all(limit, input.offset).await?;
        Ok(ListUserOutput { users })
    }

    async fn update(&self, input: UpdateUserInput) -> AppResult<UpdateUserOutput> {
        let current = self.repo.find_by_id(input.id).await?.ok_or_not_found()?;

        let user = current.with_email(input.email);
        user.validate()?;

        let updated = with_transaction!(self.tx_manager, |tx| tx.users().save(&user).await)?;
        info!(user_id = %updated.id, "User updated");

        self.cache_user(&updated).await;
        Ok(UpdateUserOutput { user: updated })
    }

    async fn delete(&self, input: DeleteUserInput) -> AppResult<DeleteUserOutput> {
        let id = input.id;
        let deleted = with_transaction!(self.tx_manager, |tx| tx.users().remove(id).await)?;
        info!(user_id = %deleted, "User deleted");

        self.evict_user(deleted).await;
        Ok(DeleteUserOutput { id: deleted })
    }

    async fn process_message(
        &self,
        input: ProcessMessageInput,
    ) -> AppResult<Option<ProcessMessageOutput>> {
        let outgoing = Message::from_user_id(&input.id)?;
        self.msg_queue.send_message(outgoing).await?;

        let messages = self
            .msg_queue
            .receive_message(ReceiveMessageOptions {
                max_number_of_messages: 1,
            })
            .await?;

        let Some(message) = messages.into_iter().next() else {
            debug!("No message received");
            return Ok(None);
        };

        // Ack regardless of the payload so a malformed message is not redelivered forever
        let decoded = message.user_id();
        self.acknowledge(&message).await;

        let id = decoded?;
        info!(user_id = %id, "Message processed");

        Ok(Some(ProcessMessageOutput { id }))
    }
}
