//! Tracked message entity - one relayed message with its edit/delete shadow state
//!
//! A tracked message is embedded in its conversation's log. The same logical
//! message has a different platform ID on each side of the relay, so lookups
//! must check every slot.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::value_objects::Snowflake;

/// Which side of the conversation authored the message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageKind {
    User,
    Staff,
}

/// A relayed message tracked inside a conversation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackedMessage {
    /// Internal message ID (snowflake, independent of platform IDs)
    pub message_id: Snowflake,
    pub kind: MessageKind,
    pub content: String,
    pub author_id: Snowflake,
    pub author_name: String,
    /// Platform ID of the message as originally posted
    pub source_id: Snowflake,
    /// Platform ID of the relayed copy on the other side
    pub mirror_id: Option<Snowflake>,
    /// URL of the originating message (DM or thread)
    pub source_url: Option<String>,
    /// URL of the relayed copy
    pub mirror_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub is_edited: bool,
    pub edited_content: Option<String>,
    pub edited_at: Option<DateTime<Utc>>,
    pub edited_by: Option<Snowflake>,
    pub is_deleted: bool,
    pub deleted_at: Option<DateTime<Utc>>,
    pub deleted_by: Option<Snowflake>,
}

impl TrackedMessage {
    /// Create a new tracked message for a just-relayed event
    pub fn new(
        message_id: Snowflake,
        kind: MessageKind,
        content: String,
        author_id: Snowflake,
        author_name: String,
        source_id: Snowflake,
    ) -> Self {
        Self {
            message_id,
            kind,
            content,
            author_id,
            author_name,
            source_id,
            mirror_id: None,
            source_url: None,
            mirror_url: None,
            created_at: Utc::now(),
            is_edited: false,
            edited_content: None,
            edited_at: None,
            edited_by: None,
            is_deleted: false,
            deleted_at: None,
            deleted_by: None,
        }
    }

    /// Attach the mirror side after the relay call succeeds
    #[must_use]
    pub fn with_mirror(mut self, mirror_id: Snowflake, mirror_url: Option<String>) -> Self {
        self.mirror_id = Some(mirror_id);
        self.mirror_url = mirror_url;
        self
    }

    /// Attach the source URL
    #[must_use]
    pub fn with_source_url(mut self, url: impl Into<String>) -> Self {
        self.source_url = Some(url.into());
        self
    }

    /// Check whether a platform message ID refers to this logical message.
    ///
    /// The originating ID and the mirrored ID both count: an edit event can
    /// arrive for either side.
    pub fn matches_platform_id(&self, platform_id: Snowflake) -> bool {
        self.source_id == platform_id || self.mirror_id == Some(platform_id)
    }

    /// Apply an edit. Idempotent: re-applying the same content is harmless,
    /// and an edit after a delete clears the deleted state.
    pub fn apply_edit(&mut self, new_content: String, editor: Snowflake) {
        self.is_edited = true;
        self.edited_content = Some(new_content);
        self.edited_at = Some(Utc::now());
        self.edited_by = Some(editor);
        self.is_deleted = false;
        self.deleted_at = None;
        self.deleted_by = None;
    }

    /// Apply a delete. Idempotent: a second delete only refreshes the
    /// timestamp.
    pub fn apply_delete(&mut self, deleter: Snowflake) {
        self.is_deleted = true;
        self.deleted_at = Some(Utc::now());
        self.deleted_by = Some(deleter);
    }

    /// The content currently shown on the mirror side
    pub fn current_content(&self) -> &str {
        self.edited_content.as_deref().unwrap_or(&self.content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> TrackedMessage {
        TrackedMessage::new(
            Snowflake::new(1),
            MessageKind::User,
            "hello staff".to_string(),
            Snowflake::new(10),
            "alice".to_string(),
            Snowflake::new(100),
        )
    }

    #[test]
    fn test_matches_source_and_mirror_ids() {
        let msg = sample().with_mirror(Snowflake::new(200), None);
        assert!(msg.matches_platform_id(Snowflake::new(100)));
        assert!(msg.matches_platform_id(Snowflake::new(200)));
        assert!(!msg.matches_platform_id(Snowflake::new(300)));
    }

    #[test]
    fn test_edit_after_delete_clears_deleted_state() {
        let mut msg = sample();
        msg.apply_delete(Snowflake::new(10));
        assert!(msg.is_deleted);

        msg.apply_edit("actually, this".to_string(), Snowflake::new(10));
        assert!(!msg.is_deleted);
        assert!(msg.deleted_at.is_none());
        assert_eq!(msg.current_content(), "actually, this");
    }

    #[test]
    fn test_delete_is_idempotent() {
        let mut msg = sample();
        msg.apply_delete(Snowflake::new(10));
        msg.apply_delete(Snowflake::new(10));
        assert!(msg.is_deleted);
    }

    #[test]
    fn test_current_content_prefers_edit() {
        let mut msg = sample();
        assert_eq!(msg.current_content(), "hello staff");
        msg.apply_edit("hi".to_string(), Snowflake::new(10));
        assert_eq!(msg.current_content(), "hi");
    }
}
