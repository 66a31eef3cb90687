//! Error handling utilities for repositories

use modmail_core::error::DomainError;
use modmail_core::value_objects::Snowflake;
use sqlx::Error as SqlxError;

/// Convert SQLx error to DomainError
pub fn map_db_error(e: SqlxError) -> DomainError {
    DomainError::DatabaseError(e.to_string())
}

/// Serialize a value for a JSONB bind
pub fn to_jsonb<T: serde::Serialize>(value: &T) -> Result<serde_json::Value, DomainError> {
    serde_json::to_value(value)
        .map_err(|e| DomainError::DatabaseError(format!("jsonb encode failed: {e}")))
}

/// Create a "conversation not found" error
pub fn conversation_not_found(user_id: Snowflake) -> DomainError {
    DomainError::ConversationNotFound(user_id)
}
