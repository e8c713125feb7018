//! Use case inputs and outputs.
//!
//! Plain structs so any transport can build them; none is defined here.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use domain::{User, DEFAULT_PAGE_SIZE};

#[derive(Debug, Clone, Deserialize)]
pub struct CreateUserInput {
    pub email: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct CreateUserOutput {
    pub user: User,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct GetUserInput {
    pub id: Uuid,
}

#[derive(Debug, Clone, Serialize)]
pub struct GetUserOutput {
    pub user: User,
}

/// Offset pagination; `limit` is capped at `MAX_PAGE_SIZE`
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct ListUserInput {
    #[serde(default = "default_limit")]
    pub limit: u64,
    #[serde(default)]
    pub offset: u64,
}

fn default_limit() -> u64 {
    DEFAULT_PAGE_SIZE
}

impl Default for ListUserInput {
    fn default() -> Self {
        Self {
            limit: DEFAULT_PAGE_SIZE,
            offset: 0,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ListUserOutput {
    pub users: Vec<User>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpdateUserInput {
    pub id: Uuid,
    pub email: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct UpdateUserOutput {
    pub user: User,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct DeleteUserInput {
    pub id: Uuid,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct DeleteUserOutput {
    pub id: Uuid,
}

/// The subscriber drives this with `Default`, i.e. the nil ID.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct ProcessMessageInput {
    pub id: Uuid,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ProcessMessageOutput {
    pub id: Uuid,
}
