//! User domain entity and related types.

use chrono::{DateTime, Duration, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::error::{DomainError, DomainResult};

/// User domain entity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct User {
    /// Assigned by the primary store on first save; `Uuid::nil()` until then
    pub id: Uuid,
    #[validate(
        length(min = 1, message = "Email is required"),
        email(message = "Invalid email format")
    )]
    pub email: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Create a user value. Pass `Uuid::nil()` for a user that has not been stored yet.
    pub fn new(id: Uuid, email: impl Into<String>) -> Self {
        let now = now_micros();
        Self {
            id,
            email: email.into(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Check the entity's own construction rules.
    pub fn validate(&self) -> DomainResult<()> {
        Validate::validate(self)
            .map_err(|e| DomainError::validation(format_validation_errors(&e)))
    }

    /// Whether the primary store has assigned an identifier yet
    pub fn is_persisted(&self) -> bool {
        !self.id.is_nil()
    }

    /// Derive the next version of this user with a new email.
    ///
    /// Keeps the identifier and creation time; `updated_at` moves strictly forward.
    pub fn with_email(&self, email: impl Into<String>) -> Self {
        Self {
            id: self.id,
            email: email.into(),
            created_at: self.created_at,
            updated_at: next_timestamp(self.updated_at),
        }
    }
}

/// Current time truncated to the precision the primary store keeps.
pub fn now_micros() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}

/// A timestamp strictly later than `previous`, normally "now".
pub fn next_timestamp(previous: DateTime<Utc>) -> DateTime<Utc> {
    let now = now_micros();
    if now > previous {
        now
    } else {
        previous + Duration::microseconds(1)
    }
}

/// Format validation errors into a user-friendly string
fn format_validation_errors(errors: &validator::ValidationErrors) -> String {
    errors
        .field_errors()
        .iter()
        .flat_map(|(field, errs)| {
            errs.iter().map(move |e| {
                e.message
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| format!("{} is invalid", field))
            })
        })
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_email_passes() {
        let user = User::new(Uuid::nil(), "alice@example.com");
        assert!(user.validate().is_ok());
        assert!(!user.is_persisted());
    }

    #[test]
    fn test_empty_email_is_rejected() {
        let err = User::new(Uuid::nil(), "").validate().unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
        assert!(err.to_string().contains("Email is required"));
    }

    #[test]
    fn test_malformed_email_is_rejected() {
        let err = User::new(Uuid::nil(), "not-an-email").validate().unwrap_err();
        assert!(err.to_string().contains("Invalid email format"));
    }

    #[test]
    fn test_with_email_keeps_identity_and_moves_updated_at_forward() {
        let original = User::new(Uuid::new_v4(), "old@example.com");
        let updated = original.with_email("new@example.com");

        assert_eq!(updated.id, original.id);
        assert_eq!(updated.created_at, original.created_at);
        assert_eq!(updated.email, "new@example.com");
        assert!(updated.updated_at > original.updated_at);
    }

    #[test]
    fn test_next_timestamp_is_strictly_later_than_a_future_value() {
        let future = Utc::now() + Duration::hours(1);
        assert!(next_timestamp(future) > future);
    }
}
