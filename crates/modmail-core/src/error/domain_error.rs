//! Domain errors - error types for the domain layer

use thiserror::Error;

use crate::value_objects::Snowflake;

/// Domain layer errors
#[derive(Debug, Error)]
pub enum DomainError {
    // =========================================================================
    // Not Found Errors
    // =========================================================================
    #[error("Conversation not found for user: {0}")]
    ConversationNotFound(Snowflake),

    #[error("Tracked message not found: {0}")]
    TrackedMessageNotFound(Snowflake),

    #[error("Guild not configured for modmail: {0}")]
    GuildNotConfigured(Snowflake),

    // =========================================================================
    // Validation Errors
    // =========================================================================
    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Message too short: minimum {min} characters")]
    MessageTooShort { min: usize },

    #[error("Invalid ban duration: {0}")]
    InvalidBanDuration(String),

    // =========================================================================
    // State Conflicts
    // =========================================================================
    #[error("Conversation already open for user: {0}")]
    ConversationAlreadyOpen(Snowflake),

    #[error("Conversation already claimed by: {0}")]
    AlreadyClaimed(Snowflake),

    #[error("User is banned from modmail")]
    UserBanned,

    // =========================================================================
    // Infrastructure Errors (wrapped)
    // =========================================================================
    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Cache error: {0}")]
    CacheError(String),
}

impl DomainError {
    /// Check if this is a "not found" error
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::ConversationNotFound(_)
                | Self::TrackedMessageNotFound(_)
                | Self::GuildNotConfigured(_)
        )
    }

    /// Check if this is a validation error
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::ValidationError(_) | Self::MessageTooShort { .. } | Self::InvalidBanDuration(_)
        )
    }

    /// Check if this is a state conflict
    pub fn is_conflict(&self) -> bool {
        matches!(
            self,
            Self::ConversationAlreadyOpen(_) | Self::AlreadyClaimed(_) | Self::UserBanned
        )
    }

    /// Check if this is an infrastructure failure that should fail closed
    pub fn is_store_error(&self) -> bool {
        matches!(self, Self::DatabaseError(_) | Self::CacheError(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classification() {
        assert!(DomainError::ConversationNotFound(Snowflake::new(1)).is_not_found());
        assert!(DomainError::MessageTooShort { min: 50 }.is_validation());
        assert!(DomainError::AlreadyClaimed(Snowflake::new(2)).is_conflict());
        assert!(DomainError::DatabaseError("boom".to_string()).is_store_error());
        assert!(!DomainError::UserBanned.is_store_error());
    }

    #[test]
    fn test_error_display() {
        let err = DomainError::MessageTooShort { min: 50 };
        assert_eq!(err.to_string(), "Message too short: minimum 50 characters");
    }
}
