//! Inbound platform events consumed by the modmail core
//!
//! The gateway connection (out of scope here) translates raw platform
//! payloads into this enum; the event router dispatches them.

use serde::{Deserialize, Serialize};

use crate::value_objects::Snowflake;

/// A platform event relevant to modmail
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PlatformEvent {
    /// A message was created in a DM or staff thread
    MessageCreate {
        message_id: Snowflake,
        channel_id: Snowflake,
        author_id: Snowflake,
        author_name: String,
        content: String,
        /// Set when the message arrived in a guild channel rather than a DM
        guild_id: Option<Snowflake>,
        /// Attachment URLs, referenced rather than re-uploaded on relay
        attachment_urls: Vec<String>,
    },

    /// A message's content changed
    MessageUpdate {
        message_id: Snowflake,
        channel_id: Snowflake,
        editor_id: Snowflake,
        content: String,
    },

    /// A message was removed on its originating side
    MessageDelete {
        message_id: Snowflake,
        channel_id: Snowflake,
        deleter_id: Snowflake,
    },

    /// A `modmail_*` button was clicked
    ButtonClick {
        custom_id: String,
        user_id: Snowflake,
        channel_id: Snowflake,
    },

    /// A `modmail_*` modal was submitted
    ModalSubmit {
        custom_id: String,
        user_id: Snowflake,
        channel_id: Snowflake,
        values: Vec<(String, String)>,
    },
}

impl PlatformEvent {
    /// Whether an interaction event belongs to the modmail namespace
    pub fn is_modmail_interaction(&self) -> bool {
        match self {
            Self::ButtonClick { custom_id, .. } | Self::ModalSubmit { custom_id, .. } => {
                custom_id.starts_with("modmail_")
            }
            _ => false,
        }
    }
}
