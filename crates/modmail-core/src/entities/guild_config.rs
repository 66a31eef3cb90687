//! Guild configuration entity
//!
//! Created once by the setup command, read on nearly every modmail operation,
//! so it sits behind a short-TTL cache.

use serde::{Deserialize, Serialize};

use crate::value_objects::Snowflake;

/// Default hours of silence before the inactivity warning
pub const DEFAULT_INACTIVITY_WARNING_HOURS: i64 = 24;

/// Default hours after the warning before auto-close
pub const DEFAULT_AUTO_CLOSE_HOURS: i64 = 168;

/// Per-guild modmail configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuildConfig {
    pub guild_id: Snowflake,
    /// Forum channel that hosts the staff-side threads
    pub forum_channel_id: Snowflake,
    pub staff_role_id: Snowflake,
    /// Relay webhook, created lazily on first use
    pub webhook_id: Option<Snowflake>,
    pub webhook_token: Option<String>,
    pub inactivity_warning_hours: i64,
    pub auto_close_hours: i64,
}

impl GuildConfig {
    /// Create a config with default thresholds and no webhook yet
    pub fn new(guild_id: Snowflake, forum_channel_id: Snowflake, staff_role_id: Snowflake) -> Self {
        Self {
            guild_id,
            forum_channel_id,
            staff_role_id,
            webhook_id: None,
            webhook_token: None,
            inactivity_warning_hours: DEFAULT_INACTIVITY_WARNING_HOURS,
            auto_close_hours: DEFAULT_AUTO_CLOSE_HOURS,
        }
    }

    /// Whether the relay webhook has been provisioned
    #[inline]
    pub fn has_webhook(&self) -> bool {
        self.webhook_id.is_some() && self.webhook_token.is_some()
    }

    /// Webhook credentials, if provisioned
    pub fn webhook(&self) -> Option<(Snowflake, &str)> {
        match (self.webhook_id, self.webhook_token.as_deref()) {
            (Some(id), Some(token)) => Some((id, token)),
            _ => None,
        }
    }
}
