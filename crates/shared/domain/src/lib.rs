//! Domain layer - Core business entities and value objects.
//!
//! This crate contains pure domain logic with no infrastructure dependencies.

pub mod constants;
pub mod error;
pub mod message;
pub mod user;

pub use constants::*;
pub use error::{DomainError, DomainResult};
pub use message::{Message, ReceiveMessageOptions};
pub use user::User;
