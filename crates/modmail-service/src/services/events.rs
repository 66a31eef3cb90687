//! Inbound event router
//!
//! Translates platform events into service calls: DM creates either relay
//! into an existing conversation or start the open flow, thread creates
//! relay back to the user, updates and deletes mirror through the relay
//! engine, and `modmail_*` interactions drive the lifecycle. Events outside
//! the modmail namespace are ignored.

use tracing::{debug, instrument, warn};

use modmail_core::{Conversation, PlatformEvent, Snowflake};

use super::context::ServiceContext;
use super::error::{ServiceError, ServiceResult};
use super::lifecycle::LifecycleService;
use super::relay::RelayService;
use super::tracking::MessageTracker;

/// Button id: user confirms opening a conversation
const CONFIRM_OPEN: &str = "modmail_confirm_open";
/// Button id: user cancels the open prompt
const CANCEL_OPEN: &str = "modmail_cancel_open";
/// Button id prefix: user picks a guild, id appended
const GUILD_PICK_PREFIX: &str = "modmail_guild_";
/// Button id: close the conversation now
const CLOSE_NOW: &str = "modmail_close_now";
/// Button id: clear the resolved state, the user still needs help
const NEED_HELP: &str = "modmail_need_help";

/// Event router
pub struct EventRouter<'a> {
    ctx: &'a ServiceContext,
}

impl<'a> EventRouter<'a> {
    /// Create a new EventRouter
    pub fn new(ctx: &'a ServiceContext) -> Self {
        Self { ctx }
    }

    /// Dispatch one inbound event
    #[instrument(skip(self, event))]
    pub async fn route(&self, event: PlatformEvent) -> ServiceResult<()> {
        match event {
            PlatformEvent::MessageCreate {
                message_id,
                channel_id,
                author_id,
                author_name,
                content,
                guild_id,
                attachment_urls,
            } => {
                if guild_id.is_some() {
                    self.on_guild_message(
                        message_id,
                        channel_id,
                        author_id,
                        &author_name,
                        &content,
                        &attachment_urls,
                    )
                    .await
                } else {
                    self.on_dm(message_id, author_id, &author_name, &content, attachment_urls)
                        .await
                }
            }
            PlatformEvent::MessageUpdate {
                message_id,
                channel_id,
                editor_id,
                content,
            } => self.on_update(message_id, channel_id, editor_id, &content).await,
            PlatformEvent::MessageDelete {
                message_id,
                channel_id,
                deleter_id,
            } => self.on_delete(message_id, channel_id, deleter_id).await,
            event @ (PlatformEvent::ButtonClick { .. } | PlatformEvent::ModalSubmit { .. }) => {
                if !event.is_modmail_interaction() {
                    debug!("Ignoring interaction outside the modmail namespace");
                    return Ok(());
                }
                self.on_interaction(event).await
            }
        }
    }

    /// A DM: relay into the open conversation, or begin the open flow. A DM
    /// sent while a prompt is pending is ignored; the prompt's buttons carry
    /// the flow.
    async fn on_dm(
        &self,
        message_id: Snowflake,
        author_id: Snowflake,
        author_name: &str,
        content: &str,
        attachment_urls: Vec<String>,
    ) -> ServiceResult<()> {
        let tracker = MessageTracker::new(self.ctx);
        if let Some(conversation) = tracker.load_conversation(author_id).await? {
            let relay = RelayService::new(self.ctx);
            return relay
                .relay_user_message(&conversation, message_id, content, &attachment_urls)
                .await;
        }

        if self.ctx.prompts().contains(author_id) {
            debug!(user_id = %author_id, "DM during pending prompt ignored");
            return Ok(());
        }

        let lifecycle = LifecycleService::new(self.ctx);
        lifecycle
            .begin_open(author_id, message_id, author_name, content, attachment_urls)
            .await
    }

    /// A message in a guild channel: relevant only when the channel is a
    /// conversation's staff thread.
    async fn on_guild_message(
        &self,
        message_id: Snowflake,
        channel_id: Snowflake,
        author_id: Snowflake,
        author_name: &str,
        content: &str,
        attachment_urls: &[String],
    ) -> ServiceResult<()> {
        let Some(conversation) = self
            .ctx
            .conversation_repo()
            .find_by_thread(channel_id)
            .await?
        else {
            return Ok(());
        };

        let relay = RelayService::new(self.ctx);
        relay
            .relay_staff_message(
                &conversation,
                message_id,
                author_id,
                author_name,
                content,
                attachment_urls,
            )
            .await
    }

    async fn on_update(
        &self,
        message_id: Snowflake,
        channel_id: Snowflake,
        editor_id: Snowflake,
        content: &str,
    ) -> ServiceResult<()> {
        let Some(conversation) = self.locate_conversation(channel_id, editor_id).await? else {
            return Ok(());
        };
        let relay = RelayService::new(self.ctx);
        relay
            .relay_edit(&conversation, message_id, editor_id, content)
            .await
    }

    async fn on_delete(
        &self,
        message_id: Snowflake,
        channel_id: Snowflake,
        deleter_id: Snowflake,
    ) -> ServiceResult<()> {
        let Some(conversation) = self.locate_conversation(channel_id, deleter_id).await? else {
            return Ok(());
        };
        let relay = RelayService::new(self.ctx);
        relay
            .relay_delete(&conversation, message_id, deleter_id)
            .await
    }

    /// Resolve which conversation an edit/delete belongs to: the channel is
    /// either a staff thread, or a DM where the actor is the user.
    async fn locate_conversation(
        &self,
        channel_id: Snowflake,
        actor_id: Snowflake,
    ) -> ServiceResult<Option<Conversation>> {
        if let Some(conversation) = self
            .ctx
            .conversation_repo()
            .find_by_thread(channel_id)
            .await?
        {
            return Ok(Some(conversation));
        }
        MessageTracker::new(self.ctx).load_conversation(actor_id).await
    }

    async fn on_interaction(&self, event: PlatformEvent) -> ServiceResult<()> {
        let (custom_id, user_id, channel_id) = match &event {
            PlatformEvent::ButtonClick {
                custom_id,
                user_id,
                channel_id,
            } => (custom_id.clone(), *user_id, *channel_id),
            PlatformEvent::ModalSubmit {
                custom_id,
                user_id,
                channel_id,
                ..
            } => (custom_id.clone(), *user_id, *channel_id),
            _ => return Ok(()),
        };

        let lifecycle = LifecycleService::new(self.ctx);
        let result = match custom_id.as_str() {
            CONFIRM_OPEN => lifecycle.confirm_open(user_id).await,
            CANCEL_OPEN => lifecycle.cancel_open(user_id).await,
            CLOSE_NOW => self.close_from_interaction(user_id, channel_id).await,
            NEED_HELP => lifecycle.reopen(user_id).await,
            other => {
                if let Some(raw) = other.strip_prefix(GUILD_PICK_PREFIX) {
                    match raw.parse::<Snowflake>() {
                        Ok(guild_id) => lifecycle.choose_guild(user_id, guild_id).await,
                        Err(_) => Err(ServiceError::validation(format!(
                            "malformed guild pick id: {other}"
                        ))),
                    }
                } else {
                    debug!(custom_id = other, "Unhandled modmail interaction");
                    Ok(())
                }
            }
        };

        // Conflicts here are stale buttons (prompt expired, conversation
        // already closed); log instead of failing the event task
        if let Err(e) = result {
            if e.is_user_facing() {
                warn!(%user_id, custom_id, error = %e, "Interaction rejected");
                return Ok(());
            }
            return Err(e);
        }
        Ok(())
    }

    /// The close-now button lives in DMs (resolve/warning notices) and in
    /// the staff thread; resolve accordingly.
    async fn close_from_interaction(
        &self,
        user_id: Snowflake,
        channel_id: Snowflake,
    ) -> ServiceResult<()> {
        let lifecycle = LifecycleService::new(self.ctx);
        if self
            .ctx
            .conversation_repo()
            .find_by_thread(channel_id)
            .await?
            .is_some()
        {
            return lifecycle.close_by_thread(channel_id, "closed by staff").await;
        }
        lifecycle.close(user_id, "closed by user").await
    }
}
