//! Service layer - user use cases.

pub mod port;
mod user_service;

pub use port::*;
pub use user_service::{UserInteractor, UserService};

#[cfg(any(test, feature = "test-utils"))]
pub use user_service::MockUserService;
