//! Conversation entity - one user's active modmail ticket
//!
//! At most one non-closed conversation exists per user. Closing a
//! conversation deletes the row entirely: "closed" is the absence of a row,
//! which keeps "is this user in an open conversation" a single point lookup.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::message::{MessageKind, TrackedMessage};
use crate::value_objects::Snowflake;

/// Maximum number of tracked messages retained per conversation.
///
/// A memory/row-size bound, not a correctness requirement; the oldest entries
/// fall off when the cap is exceeded.
pub const MESSAGE_RETENTION_CAP: usize = 1000;

/// Conversation entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Conversation {
    pub guild_id: Snowflake,
    pub user_id: Snowflake,
    pub thread_id: Snowflake,
    pub thread_channel_id: Snowflake,
    /// Display name snapshot taken at creation, refreshed lazily
    pub user_display_name: String,
    pub user_avatar_url: Option<String>,
    pub claimed_by: Option<Snowflake>,
    pub claimed_at: Option<DateTime<Utc>>,
    pub marked_resolved: bool,
    pub resolved_at: Option<DateTime<Utc>>,
    pub auto_close_scheduled_at: Option<DateTime<Utc>>,
    pub last_user_activity_at: DateTime<Utc>,
    pub inactivity_notification_sent: Option<DateTime<Utc>>,
    pub auto_close_disabled: bool,
    pub created_at: DateTime<Utc>,
    pub messages: Vec<TrackedMessage>,
}

impl Conversation {
    /// Create a new open conversation
    pub fn new(
        guild_id: Snowflake,
        user_id: Snowflake,
        thread_id: Snowflake,
        thread_channel_id: Snowflake,
        user_display_name: String,
        user_avatar_url: Option<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            guild_id,
            user_id,
            thread_id,
            thread_channel_id,
            user_display_name,
            user_avatar_url,
            claimed_by: None,
            claimed_at: None,
            marked_resolved: false,
            resolved_at: None,
            auto_close_scheduled_at: None,
            last_user_activity_at: now,
            inactivity_notification_sent: None,
            auto_close_disabled: false,
            created_at: now,
            messages: Vec::new(),
        }
    }

    /// Check if the conversation has been claimed by a staff member
    #[inline]
    pub fn is_claimed(&self) -> bool {
        self.claimed_by.is_some()
    }

    /// Hours elapsed since the user was last active, clamped to zero.
    ///
    /// The activity timestamp comes from stored data and may sit in the
    /// future after clock skew or a manual edit; negative elapsed time is
    /// treated as "just now" rather than propagated.
    pub fn hours_since_user_activity(&self, now: DateTime<Utc>) -> f64 {
        let secs = (now - self.last_user_activity_at).num_seconds();
        if secs <= 0 {
            0.0
        } else {
            secs as f64 / 3600.0
        }
    }

    /// Hours since the inactivity warning was sent, if one was sent
    pub fn hours_since_warning(&self, now: DateTime<Utc>) -> Option<f64> {
        self.inactivity_notification_sent.map(|sent| {
            let secs = (now - sent).num_seconds();
            if secs <= 0 {
                0.0
            } else {
                secs as f64 / 3600.0
            }
        })
    }

    /// Record user activity: resets the inactivity clock and cancels any
    /// pending warning/auto-close schedule.
    pub fn touch_user_activity(&mut self) {
        self.last_user_activity_at = Utc::now();
        self.inactivity_notification_sent = None;
        self.auto_close_scheduled_at = None;
    }

    /// Find a tracked message by any of its platform-side IDs
    pub fn find_message_by_platform_id(&self, platform_id: Snowflake) -> Option<&TrackedMessage> {
        self.messages
            .iter()
            .find(|m| m.matches_platform_id(platform_id))
    }

    /// Mutable variant of [`Self::find_message_by_platform_id`]
    pub fn find_message_by_platform_id_mut(
        &mut self,
        platform_id: Snowflake,
    ) -> Option<&mut TrackedMessage> {
        self.messages
            .iter_mut()
            .find(|m| m.matches_platform_id(platform_id))
    }

    /// The newest tracked messages, optionally filtered by kind
    pub fn recent_messages(&self, limit: usize, kind: Option<MessageKind>) -> Vec<&TrackedMessage> {
        self.messages
            .iter()
            .rev()
            .filter(|m| kind.is_none_or(|k| m.kind == k))
            .take(limit)
            .collect()
    }
}
