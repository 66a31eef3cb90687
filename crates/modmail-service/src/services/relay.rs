//! Relay engine
//!
//! Mirrors message events from one side of a conversation to the other:
//! user DMs appear in the staff thread under the user's own name via the
//! guild relay webhook, staff replies reach the user as an attributed embed
//! block. Edits re-process content and go through the matching edit API;
//! deletes never remove the mirror, they strike it through in place.
//!
//! Platform failures at any relay boundary are logged and swallowed: a
//! closed DM or archived thread must never abort the caller's wider flow.

use chrono::Utc;
use tracing::{instrument, warn};

use modmail_core::{
    Conversation, MessageKind, OutboundMessage, PlatformError, Snowflake, TrackedMessage,
};

use super::config::ConfigService;
use super::context::ServiceContext;
use super::error::ServiceResult;
use super::format;
use super::tracking::MessageTracker;

/// Reaction acknowledging a silent staff note
const STAFF_NOTE_ACK: &str = "✅";

/// Relay service
pub struct RelayService<'a> {
    ctx: &'a ServiceContext,
}

impl<'a> RelayService<'a> {
    /// Create a new RelayService
    pub fn new(ctx: &'a ServiceContext) -> Self {
        Self { ctx }
    }

    /// Relay a user's DM into the staff thread, posted as the user via the
    /// guild relay webhook. Also resets the inactivity clock: a user message
    /// is activity by definition.
    #[instrument(skip(self, content, attachment_urls))]
    pub async fn relay_user_message(
        &self,
        conversation: &Conversation,
        source_id: Snowflake,
        content: &str,
        attachment_urls: &[String],
    ) -> ServiceResult<()> {
        let tracker = MessageTracker::new(self.ctx);

        self.record_activity(conversation.user_id).await?;

        let body = format::annotate_attachments(content, attachment_urls);
        let body = format::truncate_for_dm(&body);

        let mut tracked = TrackedMessage::new(
            self.ctx.generate_id(),
            MessageKind::User,
            content.to_string(),
            conversation.user_id,
            conversation.user_display_name.clone(),
            source_id,
        );

        match self.post_to_thread(conversation, &body).await {
            Ok(sent) => {
                tracked = tracked.with_mirror(sent.id, sent.url);
            }
            Err(e) => {
                warn!(
                    user_id = %conversation.user_id,
                    thread_id = %conversation.thread_id,
                    error = %e,
                    "Relay to staff thread failed"
                );
            }
        }

        tracker.append(conversation.user_id, &tracked).await?;
        Ok(())
    }

    /// Relay a staff reply from the thread to the user's DM as an attributed
    /// embed block. Messages starting with the staff-note sentinel are never
    /// relayed; they get an acknowledgement reaction and nothing else.
    #[instrument(skip(self, content, attachment_urls))]
    pub async fn relay_staff_message(
        &self,
        conversation: &Conversation,
        source_id: Snowflake,
        staff_id: Snowflake,
        staff_name: &str,
        content: &str,
        attachment_urls: &[String],
    ) -> ServiceResult<()> {
        if format::is_staff_note(content) {
            if let Err(e) = self
                .ctx
                .gateway()
                .add_reaction(conversation.thread_id, source_id, STAFF_NOTE_ACK)
                .await
            {
                warn!(thread_id = %conversation.thread_id, error = %e, "Staff note ack failed");
            }
            return Ok(());
        }

        let tracker = MessageTracker::new(self.ctx);

        let body = format::annotate_attachments(content, attachment_urls);
        let message = OutboundMessage::embed(format::staff_reply_embed(staff_name, &body));

        let mut tracked = TrackedMessage::new(
            self.ctx.generate_id(),
            MessageKind::Staff,
            content.to_string(),
            staff_id,
            staff_name.to_string(),
            source_id,
        );

        match self.send_dm(conversation.user_id, &message).await {
            Ok(sent) => {
                tracked = tracked.with_mirror(sent.id, sent.url);
            }
            Err(e) => {
                warn!(
                    user_id = %conversation.user_id,
                    staff_id = %staff_id,
                    error = %e,
                    "Relay to user DM failed"
                );
            }
        }

        tracker.append(conversation.user_id, &tracked).await?;
        Ok(())
    }

    /// Mirror an edit. The tracked message is resolved by platform id,
    /// content is re-processed under the same rules, and edits to the same
    /// logical message are serialized through a keyed lock so a stale edit
    /// can never overwrite a newer one.
    #[instrument(skip(self, new_content))]
    pub async fn relay_edit(
        &self,
        conversation: &Conversation,
        platform_id: Snowflake,
        editor: Snowflake,
        new_content: &str,
    ) -> ServiceResult<()> {
        let Some(existing) = conversation.find_message_by_platform_id(platform_id) else {
            // Not a relayed message (bot status post, pre-tracking history)
            return Ok(());
        };

        let lock = self.ctx.edit_lock(existing.message_id);
        let _guard = lock.lock().await;

        let tracker = MessageTracker::new(self.ctx);
        let updated = tracker
            .mark_edited(conversation.user_id, platform_id, new_content.to_string(), editor)
            .await?;

        if let Err(e) = self.edit_mirror(conversation, &updated).await {
            warn!(
                user_id = %conversation.user_id,
                message_id = %updated.message_id,
                error = %e,
                "Mirror edit failed"
            );
        }
        Ok(())
    }

    /// Mirror a delete as a visible audit trail: fetch the mirror's current
    /// content, strip any existing strike markup, re-wrap with a deleted
    /// suffix and edit it in place.
    #[instrument(skip(self))]
    pub async fn relay_delete(
        &self,
        conversation: &Conversation,
        platform_id: Snowflake,
        deleter: Snowflake,
    ) -> ServiceResult<()> {
        let Some(existing) = conversation.find_message_by_platform_id(platform_id) else {
            return Ok(());
        };

        let lock = self.ctx.edit_lock(existing.message_id);
        let _guard = lock.lock().await;

        let tracker = MessageTracker::new(self.ctx);
        let updated = tracker
            .mark_deleted(conversation.user_id, platform_id, deleter)
            .await?;

        if let Err(e) = self.strike_mirror(conversation, &updated).await {
            warn!(
                user_id = %conversation.user_id,
                message_id = %updated.message_id,
                error = %e,
                "Mirror strike-through failed"
            );
        }
        Ok(())
    }

    /// Reset the inactivity clock and clear any pending warning schedule
    async fn record_activity(&self, user_id: Snowflake) -> ServiceResult<()> {
        if let Some(cache) = self.ctx.conversation_cache() {
            if let Err(e) = cache.invalidate(user_id).await {
                warn!(%user_id, error = %e, "Conversation cache invalidation failed");
            }
        }
        self.ctx
            .conversation_repo()
            .record_user_activity(user_id, Utc::now())
            .await?;
        Ok(())
    }

    /// Post into the staff thread under the user's identity
    async fn post_to_thread(
        &self,
        conversation: &Conversation,
        body: &str,
    ) -> Result<modmail_core::SentMessage, PlatformError> {
        let config = ConfigService::new(self.ctx);
        let (webhook_id, webhook_token) = config
            .ensure_webhook(conversation.guild_id)
            .await
            .map_err(|e| PlatformError::Unavailable(format!("no relay webhook: {e}")))?;

        let identity = modmail_core::WebhookIdentity {
            username: conversation.user_display_name.clone(),
            avatar_url: conversation.user_avatar_url.clone(),
        };
        self.ctx
            .gateway()
            .post_as_webhook(
                webhook_id,
                &webhook_token,
                conversation.thread_id,
                &identity,
                &OutboundMessage::text(body),
            )
            .await
    }

    /// Open the user's DM channel and send
    async fn send_dm(
        &self,
        user_id: Snowflake,
        message: &OutboundMessage,
    ) -> Result<modmail_core::SentMessage, PlatformError> {
        let channel_id = self.ctx.gateway().create_dm_channel(user_id).await?;
        self.ctx.gateway().send_message(channel_id, message).await
    }

    /// Apply an edit to the mirror side of a tracked message
    async fn edit_mirror(
        &self,
        conversation: &Conversation,
        message: &TrackedMessage,
    ) -> Result<(), PlatformError> {
        let Some(mirror_id) = message.mirror_id else {
            // The original relay never landed; nothing to edit
            return Ok(());
        };
        let content = format::truncate_for_dm(message.current_content());

        match message.kind {
            // User messages mirror as webhook posts in the thread; webhook
            // edits need the owning thread id for disambiguation
            MessageKind::User => {
                let config = ConfigService::new(self.ctx);
                let (webhook_id, webhook_token) = config
                    .ensure_webhook(conversation.guild_id)
                    .await
                    .map_err(|e| PlatformError::Unavailable(format!("no relay webhook: {e}")))?;
                self.ctx
                    .gateway()
                    .edit_webhook_message(
                        webhook_id,
                        &webhook_token,
                        conversation.thread_id,
                        mirror_id,
                        &content,
                    )
                    .await
            }
            // Staff messages mirror as regular bot messages in the DM
            MessageKind::Staff => {
                let channel_id = self
                    .ctx
                    .gateway()
                    .create_dm_channel(conversation.user_id)
                    .await?;
                self.ctx
                    .gateway()
                    .edit_message(channel_id, mirror_id, &content)
                    .await
            }
        }
    }

    /// Strike through the mirror side of a deleted tracked message
    async fn strike_mirror(
        &self,
        conversation: &Conversation,
        message: &TrackedMessage,
    ) -> Result<(), PlatformError> {
        let Some(mirror_id) = message.mirror_id else {
            return Ok(());
        };

        let mirror_channel = match message.kind {
            MessageKind::User => conversation.thread_id,
            MessageKind::Staff => {
                self.ctx
                    .gateway()
                    .create_dm_channel(conversation.user_id)
                    .await?
            }
        };

        let current = self
            .ctx
            .gateway()
            .fetch_message_content(mirror_channel, mirror_id)
            .await?;
        let fallback = message.current_content();
        let base = if current.is_empty() { fallback } else { &current };
        let struck = format::truncate_for_dm(&format::strike_deleted(base));

        match message.kind {
            MessageKind::User => {
                let config = ConfigService::new(self.ctx);
                let (webhook_id, webhook_token) = config
                    .ensure_webhook(conversation.guild_id)
                    .await
                    .map_err(|e| PlatformError::Unavailable(format!("no relay webhook: {e}")))?;
                self.ctx
                    .gateway()
                    .edit_webhook_message(
                        webhook_id,
                        &webhook_token,
                        conversation.thread_id,
                        mirror_id,
                        &struck,
                    )
                    .await
            }
            MessageKind::Staff => {
                self.ctx
                    .gateway()
                    .edit_message(mirror_channel, mirror_id, &struck)
                    .await
            }
        }
    }
}
