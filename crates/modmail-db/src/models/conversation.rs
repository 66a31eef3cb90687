//! Conversation database model

use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::FromRow;

use modmail_core::{Conversation, DomainError, Snowflake, TrackedMessage};

/// Database model for the modmail_conversations table
#[derive(Debug, Clone, FromRow)]
pub struct ConversationModel {
    pub user_id: i64,
    pub guild_id: i64,
    pub thread_id: i64,
    pub thread_channel_id: i64,
    pub user_display_name: String,
    pub user_avatar_url: Option<String>,
    pub claimed_by: Option<i64>,
    pub claimed_at: Option<DateTime<Utc>>,
    pub marked_resolved: bool,
    pub resolved_at: Option<DateTime<Utc>>,
    pub auto_close_scheduled_at: Option<DateTime<Utc>>,
    /// Nullable for rows predating the inactivity fields; the backfill
    /// migration fills it from created_at
    pub last_user_activity_at: Option<DateTime<Utc>>,
    pub inactivity_notification_sent: Option<DateTime<Utc>>,
    pub auto_close_disabled: bool,
    pub created_at: DateTime<Utc>,
    pub messages: Value,
}

impl TryFrom<ConversationModel> for Conversation {
    type Error = DomainError;

    fn try_from(model: ConversationModel) -> Result<Self, Self::Error> {
        let messages: Vec<TrackedMessage> = serde_json::from_value(model.messages)
            .map_err(|e| DomainError::DatabaseError(format!("corrupt message log: {e}")))?;

        Ok(Conversation {
            guild_id: Snowflake::new(model.guild_id),
            user_id: Snowflake::new(model.user_id),
            thread_id: Snowflake::new(model.thread_id),
            thread_channel_id: Snowflake::new(model.thread_channel_id),
            user_display_name: model.user_display_name,
            user_avatar_url: model.user_avatar_url,
            claimed_by: model.claimed_by.map(Snowflake::new),
            claimed_at: model.claimed_at,
            marked_resolved: model.marked_resolved,
            resolved_at: model.resolved_at,
            auto_close_scheduled_at: model.auto_close_scheduled_at,
            last_user_activity_at: model.last_user_activity_at.unwrap_or(model.created_at),
            inactivity_notification_sent: model.inactivity_notification_sent,
            auto_close_disabled: model.auto_close_disabled,
            created_at: model.created_at,
            messages,
        })
    }
}
