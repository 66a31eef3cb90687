//! Service layer error types
//!
//! The failure taxonomy for the application layer: validation and permission
//! failures surface to the invoking user, state conflicts surface without
//! mutating anything, store failures fail closed, and platform failures are
//! handled at the relay boundaries (logged + swallowed) before they ever
//! become a `ServiceError`.

use modmail_core::DomainError;
use std::fmt;

/// Service layer error type
#[derive(Debug)]
pub enum ServiceError {
    /// Domain rule violation bubbled up from the repositories
    Domain(DomainError),

    /// Resource not found
    NotFound { resource: &'static str, id: String },

    /// Caller lacks the staff role/permission for the operation
    PermissionDenied { permission: String },

    /// Missing or invalid arguments, surfaced verbatim
    Validation(String),

    /// The operation lost a race or hit a state it must not overwrite
    /// (double claim, open-while-banned, close on a missing conversation)
    StateConflict(String),

    /// Internal error
    Internal(String),
}

impl fmt::Display for ServiceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Domain(e) => write!(f, "{e}"),
            Self::NotFound { resource, id } => write!(f, "{resource} not found: {id}"),
            Self::PermissionDenied { permission } => {
                write!(f, "Missing required permission: {permission}")
            }
            Self::Validation(msg) => write!(f, "Validation error: {msg}"),
            Self::StateConflict(msg) => write!(f, "State conflict: {msg}"),
            Self::Internal(msg) => write!(f, "Internal error: {msg}"),
        }
    }
}

impl std::error::Error for ServiceError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Domain(e) => Some(e),
            _ => None,
        }
    }
}

impl ServiceError {
    /// Create a not found error
    pub fn not_found(resource: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            resource,
            id: id.into(),
        }
    }

    /// Create a permission denied error
    pub fn permission_denied(permission: impl Into<String>) -> Self {
        Self::PermissionDenied {
            permission: permission.into(),
        }
    }

    /// Create a validation error
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Create a state conflict error
    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::StateConflict(msg.into())
    }

    /// Create an internal error
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Whether the underlying cause is a store failure that must fail closed
    pub fn is_store_error(&self) -> bool {
        matches!(self, Self::Domain(e) if e.is_store_error())
    }

    /// Whether this should be surfaced to the invoking user verbatim
    pub fn is_user_facing(&self) -> bool {
        matches!(
            self,
            Self::Validation(_) | Self::PermissionDenied { .. } | Self::StateConflict(_)
        ) || matches!(self, Self::Domain(e) if e.is_validation() || e.is_conflict())
    }
}

impl From<DomainError> for ServiceError {
    fn from(err: DomainError) -> Self {
        Self::Domain(err)
    }
}

/// Result type for service operations
pub type ServiceResult<T> = Result<T, ServiceError>;

#[cfg(test)]
mod tests {
    use super::*;
    use modmail_core::Snowflake;

    #[test]
    fn test_not_found_display() {
        let err = ServiceError::not_found("Conversation", "123");
        assert!(err.to_string().contains("Conversation not found: 123"));
    }

    #[test]
    fn test_store_error_classification() {
        let err = ServiceError::from(DomainError::DatabaseError("boom".to_string()));
        assert!(err.is_store_error());
        assert!(!err.is_user_facing());
    }

    #[test]
    fn test_conflict_is_user_facing() {
        assert!(ServiceError::conflict("already claimed").is_user_facing());
        assert!(ServiceError::from(DomainError::AlreadyClaimed(Snowflake::new(1))).is_user_facing());
        assert!(!ServiceError::internal("oops").is_user_facing());
    }
}
