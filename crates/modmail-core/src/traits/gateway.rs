//! Platform gateway port - the chat platform as seen by the domain
//!
//! The REST adapter implements this trait; tests substitute a recording
//! fake. Failures carry enough shape for the service layer to decide between
//! retrying (rate limits) and degrading to a logged no-op (everything else).

use async_trait::async_trait;
use thiserror::Error;

use crate::value_objects::{ChannelCapability, Snowflake};

/// Platform call errors
#[derive(Debug, Error)]
pub enum PlatformError {
    /// Target unreachable: DMs closed, channel deleted, webhook revoked,
    /// thread archived. Not retryable.
    #[error("Platform target unavailable: {0}")]
    Unavailable(String),

    /// Rate limited; retry after the given delay
    #[error("Rate limited, retry after {retry_after_ms}ms")]
    RateLimited { retry_after_ms: u64 },

    /// Transport or unexpected HTTP failure
    #[error("Platform request failed: {0}")]
    Http(String),
}

impl PlatformError {
    /// Whether a bounded retry may succeed
    #[inline]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::RateLimited { .. })
    }
}

/// Result type for gateway operations
pub type GatewayResult<T> = Result<T, PlatformError>;

/// A button attached to an outbound message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundButton {
    pub custom_id: String,
    pub label: String,
}

/// Embed block for staff-attributed replies
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct OutboundEmbed {
    pub author_name: Option<String>,
    pub description: String,
    pub footer: Option<String>,
}

/// An outbound platform message
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct OutboundMessage {
    pub content: Option<String>,
    pub embed: Option<OutboundEmbed>,
    pub buttons: Vec<OutboundButton>,
}

impl OutboundMessage {
    /// Plain text message
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: Some(content.into()),
            ..Self::default()
        }
    }

    /// Embed-only message
    pub fn embed(embed: OutboundEmbed) -> Self {
        Self {
            embed: Some(embed),
            ..Self::default()
        }
    }

    /// Attach a button
    #[must_use]
    pub fn with_button(mut self, custom_id: impl Into<String>, label: impl Into<String>) -> Self {
        self.buttons.push(OutboundButton {
            custom_id: custom_id.into(),
            label: label.into(),
        });
        self
    }
}

/// The platform's record of a message we created
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentMessage {
    pub id: Snowflake,
    pub channel_id: Snowflake,
    pub url: Option<String>,
}

/// Name/avatar the relay webhook posts under
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebhookIdentity {
    pub username: String,
    pub avatar_url: Option<String>,
}

/// Chat platform port
#[async_trait]
pub trait PlatformGateway: Send + Sync {
    /// Open (or reuse) the DM channel with a user
    async fn create_dm_channel(&self, user_id: Snowflake) -> GatewayResult<Snowflake>;

    /// Send a message to a channel or thread
    async fn send_message(
        &self,
        channel_id: Snowflake,
        message: &OutboundMessage,
    ) -> GatewayResult<SentMessage>;

    /// Edit a regular (non-webhook) message
    async fn edit_message(
        &self,
        channel_id: Snowflake,
        message_id: Snowflake,
        content: &str,
    ) -> GatewayResult<()>;

    /// Fetch the current content of a message
    async fn fetch_message_content(
        &self,
        channel_id: Snowflake,
        message_id: Snowflake,
    ) -> GatewayResult<String>;

    /// React to a message (staff-note acknowledgement marker)
    async fn add_reaction(
        &self,
        channel_id: Snowflake,
        message_id: Snowflake,
        emoji: &str,
    ) -> GatewayResult<()>;

    /// Create a thread in the guild's forum channel
    async fn create_thread(
        &self,
        forum_channel_id: Snowflake,
        name: &str,
        initial_message: &OutboundMessage,
    ) -> GatewayResult<SentMessage>;

    /// Rename a thread (status metadata on claim/resolve/close)
    async fn rename_thread(&self, thread_id: Snowflake, name: &str) -> GatewayResult<()>;

    /// Lock and archive a thread. Archiving an already-archived thread
    /// must succeed.
    async fn archive_thread(&self, thread_id: Snowflake, locked: bool) -> GatewayResult<()>;

    /// Create the per-guild relay webhook, returning (id, token)
    async fn create_webhook(
        &self,
        channel_id: Snowflake,
        name: &str,
    ) -> GatewayResult<(Snowflake, String)>;

    /// Post into a thread through the relay webhook under the given identity
    async fn post_as_webhook(
        &self,
        webhook_id: Snowflake,
        webhook_token: &str,
        thread_id: Snowflake,
        identity: &WebhookIdentity,
        message: &OutboundMessage,
    ) -> GatewayResult<SentMessage>;

    /// Edit a webhook-authored message. Webhook messages in a threaded
    /// channel are ambiguous by ID alone, so the owning thread must ride
    /// along.
    async fn edit_webhook_message(
        &self,
        webhook_id: Snowflake,
        webhook_token: &str,
        thread_id: Snowflake,
        message_id: Snowflake,
        content: &str,
    ) -> GatewayResult<()>;

    /// Resolve what a channel can do, once, at this boundary
    async fn channel_capability(&self, channel_id: Snowflake) -> GatewayResult<ChannelCapability>;

    /// Current display name and avatar for a user (lazy snapshot refresh)
    async fn fetch_user_display(
        &self,
        user_id: Snowflake,
    ) -> GatewayResult<(String, Option<String>)>;

    /// Guilds where both the user and the bot are present
    async fn shared_guilds(&self, user_id: Snowflake) -> GatewayResult<Vec<Snowflake>>;
}
