//! Conversation lifecycle manager
//!
//! The state machine: NONE -> OPEN -> RESOLVED -> NONE, where NONE is the
//! absence of a row. Opening runs through time-boxed confirm/guild-pick
//! prompts, a ban short-circuit and the store-level upsert that serializes
//! concurrent first messages. Closing deletes the row, locks and archives
//! the thread, and notifies both sides best-effort.

use chrono::{Duration, Utc};
use tracing::{info, instrument, warn};

use modmail_core::{Conversation, OutboundMessage, PlatformError, Snowflake};

use super::ban::{parse_duration, BanService};
use super::config::ConfigService;
use super::context::ServiceContext;
use super::error::{ServiceError, ServiceResult};
use super::format::{self, ThreadStatus};
use super::prompts::{PendingPrompt, PromptStage, PROMPT_TIMEOUT};
use super::relay::RelayService;
use super::tracking::MessageTracker;

/// Minimum first-message length before a conversation opens
pub const MIN_OPEN_LENGTH: usize = 50;

/// Token a user can include to bypass the minimum-length guard
pub const OPEN_OVERRIDE_TOKEN: &str = "--force";

/// Hours until auto-close after staff marks a conversation resolved
pub const RESOLVE_AUTO_CLOSE_HOURS: i64 = 24;

/// Close reason recorded when a ban terminates the conversation
const BAN_CLOSE_REASON: &str = "user banned";

/// Conversation lifecycle service
pub struct LifecycleService<'a> {
    ctx: &'a ServiceContext,
}

impl<'a> LifecycleService<'a> {
    /// Create a new LifecycleService
    pub fn new(ctx: &'a ServiceContext) -> Self {
        Self { ctx }
    }

    // ========================================================================
    // Open flow
    // ========================================================================

    /// Entry point for a DM from a user with no open conversation: guard the
    /// message length, register a pending prompt and ask for confirmation.
    #[instrument(skip(self, content, attachment_urls))]
    pub async fn begin_open(
        &self,
        user_id: Snowflake,
        source_id: Snowflake,
        author_name: &str,
        content: &str,
        attachment_urls: Vec<String>,
    ) -> ServiceResult<()> {
        let has_override = content.contains(OPEN_OVERRIDE_TOKEN);
        if content.chars().count() < MIN_OPEN_LENGTH && !has_override {
            self.dm_notice(
                user_id,
                &format!(
                    "Your message is quite short. Please describe your issue in at least \
                     {MIN_OPEN_LENGTH} characters, or include `{OPEN_OVERRIDE_TOKEN}` to \
                     open a conversation anyway."
                ),
            )
            .await;
            return Ok(());
        }

        let content = content.replace(OPEN_OVERRIDE_TOKEN, "").trim().to_string();
        let token = self.ctx.generate_id();
        let prompt = PendingPrompt {
            user_id,
            token,
            source_id,
            stage: PromptStage::AwaitConfirm,
            content,
            attachment_urls,
            author_name: author_name.to_string(),
        };
        self.ctx.prompts().insert(prompt);
        self.spawn_prompt_timeout(user_id, token);

        let confirm = OutboundMessage::text(
            "Do you want to open a support conversation with the staff team?",
        )
        .with_button("modmail_confirm_open", "Open conversation")
        .with_button("modmail_cancel_open", "Cancel");
        self.dm_message(user_id, &confirm).await;
        Ok(())
    }

    /// Timer that cancels an unanswered prompt with a cleanup message
    fn spawn_prompt_timeout(&self, user_id: Snowflake, token: Snowflake) {
        let ctx = self.ctx.clone();
        tokio::spawn(async move {
            tokio::time::sleep(PROMPT_TIMEOUT).await;
            if ctx.prompts().take_if_token(user_id, token).is_some() {
                info!(%user_id, "Open prompt timed out");
                let notice = OutboundMessage::text(
                    "This conversation request timed out. Send your message again to start over.",
                );
                if let Err(e) = send_dm(&ctx, user_id, &notice).await {
                    warn!(%user_id, error = %e, "Prompt timeout notice failed");
                }
            }
        });
    }

    /// The user confirmed: resolve which guilds are candidates and either
    /// proceed directly (one) or ask them to pick (several).
    #[instrument(skip(self))]
    pub async fn confirm_open(&self, user_id: Snowflake) -> ServiceResult<()> {
        let Some(prompt) = self.ctx.prompts().get(user_id) else {
            return Err(ServiceError::conflict("no pending conversation request"));
        };
        if prompt.stage != PromptStage::AwaitConfirm {
            return Err(ServiceError::conflict("request is not awaiting confirmation"));
        }

        let candidates = self.candidate_guilds(user_id).await?;
        match candidates.len() {
            0 => {
                self.ctx.prompts().take(user_id);
                self.dm_notice(
                    user_id,
                    "No shared server has modmail set up, so a conversation cannot be opened.",
                )
                .await;
                Ok(())
            }
            1 => self.open_in_guild(user_id, candidates[0]).await,
            _ => {
                let mut pick = OutboundMessage::text("Which server is this about?");
                for guild_id in &candidates {
                    pick = pick.with_button(format!("modmail_guild_{guild_id}"), guild_id.to_string());
                }
                self.ctx
                    .prompts()
                    .set_stage(user_id, PromptStage::AwaitGuildPick { candidates });
                self.dm_message(user_id, &pick).await;
                Ok(())
            }
        }
    }

    /// The user cancelled the open prompt
    #[instrument(skip(self))]
    pub async fn cancel_open(&self, user_id: Snowflake) -> ServiceResult<()> {
        if self.ctx.prompts().take(user_id).is_some() {
            self.dm_notice(user_id, "Okay, no conversation was opened.").await;
        }
        Ok(())
    }

    /// The user picked a guild from the offered candidates
    #[instrument(skip(self))]
    pub async fn choose_guild(&self, user_id: Snowflake, guild_id: Snowflake) -> ServiceResult<()> {
        let Some(prompt) = self.ctx.prompts().get(user_id) else {
            return Err(ServiceError::conflict("no pending conversation request"));
        };
        match &prompt.stage {
            PromptStage::AwaitGuildPick { candidates } if candidates.contains(&guild_id) => {
                self.open_in_guild(user_id, guild_id).await
            }
            _ => Err(ServiceError::conflict("that server was not offered")),
        }
    }

    /// Guilds shared between the user and the bot where modmail is configured
    async fn candidate_guilds(&self, user_id: Snowflake) -> ServiceResult<Vec<Snowflake>> {
        let shared = self
            .ctx
            .gateway()
            .shared_guilds(user_id)
            .await
            .map_err(|e| ServiceError::internal(format!("guild lookup failed: {e}")))?;

        let config = ConfigService::new(self.ctx);
        let mut candidates = Vec::new();
        for guild_id in shared {
            if config.get(guild_id).await?.is_some() {
                candidates.push(guild_id);
            }
        }
        Ok(candidates)
    }

    /// Create the thread and the conversation row in the chosen guild.
    ///
    /// The ban short-circuit runs before any thread exists; the store upsert
    /// is the serialization point for concurrent first messages, so a lost
    /// race cleans up its orphan thread instead of erroring.
    #[instrument(skip(self))]
    async fn open_in_guild(&self, user_id: Snowflake, guild_id: Snowflake) -> ServiceResult<()> {
        let Some(prompt) = self.ctx.prompts().take(user_id) else {
            return Err(ServiceError::conflict("no pending conversation request"));
        };

        let bans = BanService::new(self.ctx);
        if let Some(ban) = bans.active_ban(guild_id, user_id).await? {
            let notice = match ban.expires_at {
                Some(at) => format!(
                    "You are currently banned from opening conversations. The ban expires {}.",
                    at.format("%Y-%m-%d %H:%M UTC")
                ),
                None => "You are permanently banned from opening conversations.".to_string(),
            };
            self.dm_notice(user_id, &notice).await;
            return Ok(());
        }

        let config = ConfigService::new(self.ctx);
        let guild_config = config.require(guild_id).await?;

        // Snapshot the display identity; fall back to the event's author name
        let (display_name, avatar_url) = match self.ctx.gateway().fetch_user_display(user_id).await
        {
            Ok(display) => display,
            Err(e) => {
                warn!(%user_id, error = %e, "Display lookup failed, using event author name");
                (prompt.author_name.clone(), None)
            }
        };

        let capability = self
            .ctx
            .gateway()
            .channel_capability(guild_config.forum_channel_id)
            .await
            .map_err(|e| ServiceError::internal(format!("channel lookup failed: {e}")))?;
        if !capability.can_spawn_thread() {
            return Err(ServiceError::validation(
                "the configured modmail channel cannot host threads",
            ));
        }

        let header = OutboundMessage::text(format!(
            "New modmail conversation with **{display_name}** (`{user_id}`)."
        ));
        let thread = self
            .ctx
            .gateway()
            .create_thread(
                guild_config.forum_channel_id,
                &format::thread_name(&display_name, ThreadStatus::Open),
                &header,
            )
            .await
            .map_err(|e| ServiceError::internal(format!("thread creation failed: {e}")))?;

        // Provision the relay webhook up front so the first relay cannot race
        // a concurrent creation
        config.ensure_webhook(guild_id).await?;

        let conversation = Conversation::new(
            guild_id,
            user_id,
            thread.channel_id,
            guild_config.forum_channel_id,
            display_name,
            avatar_url,
        );

        if !self.ctx.conversation_repo().try_create(&conversation).await? {
            // Another first message won; this thread is an orphan
            warn!(%user_id, thread_id = %thread.channel_id, "Lost conversation creation race");
            if let Err(e) = self.ctx.gateway().archive_thread(thread.channel_id, true).await {
                warn!(thread_id = %thread.channel_id, error = %e, "Orphan thread cleanup failed");
            }
            self.dm_notice(user_id, "You already have an open conversation.").await;
            return Ok(());
        }

        info!(%user_id, %guild_id, thread_id = %thread.channel_id, "Conversation opened");

        let relay = RelayService::new(self.ctx);
        relay
            .relay_user_message(
                &conversation,
                prompt.source_id,
                &prompt.content,
                &prompt.attachment_urls,
            )
            .await?;

        self.dm_notice(
            user_id,
            "Your conversation with the staff team is open. Anything you send here will be passed on.",
        )
        .await;
        Ok(())
    }

    // ========================================================================
    // Claim / resolve / reopen
    // ========================================================================

    /// Claim the conversation for a staff member. Exactly once: a second
    /// claim is rejected, never overwritten.
    #[instrument(skip(self))]
    pub async fn claim(&self, thread_id: Snowflake, staff_id: Snowflake) -> ServiceResult<()> {
        let conversation = self.require_by_thread(thread_id).await?;

        self.invalidate_cache(conversation.user_id).await;
        let claimed = self
            .ctx
            .conversation_repo()
            .try_claim(conversation.user_id, staff_id, Utc::now())
            .await?;
        if !claimed {
            return Err(ServiceError::conflict("conversation is already claimed"));
        }

        info!(user_id = %conversation.user_id, %staff_id, "Conversation claimed");
        self.rename_thread(&conversation, ThreadStatus::Claimed).await;
        Ok(())
    }

    /// Mark resolved: schedules an auto-close and offers the user the choice
    /// between closing now and reopening.
    #[instrument(skip(self))]
    pub async fn resolve(&self, thread_id: Snowflake, staff_id: Snowflake) -> ServiceResult<()> {
        let conversation = self.require_by_thread(thread_id).await?;
        let auto_close_at = Utc::now() + Duration::hours(RESOLVE_AUTO_CLOSE_HOURS);

        self.invalidate_cache(conversation.user_id).await;
        self.ctx
            .conversation_repo()
            .set_resolved(conversation.user_id, true, Some(auto_close_at))
            .await?;

        info!(user_id = %conversation.user_id, %staff_id, "Conversation marked resolved");
        self.rename_thread(&conversation, ThreadStatus::Resolved).await;

        let notice = OutboundMessage::text(format!(
            "The staff team marked your conversation as resolved. It closes automatically in \
             {RESOLVE_AUTO_CLOSE_HOURS} hours unless you still need help."
        ))
        .with_button("modmail_close_now", "Close now")
        .with_button("modmail_need_help", "I still need help");
        self.dm_message(conversation.user_id, &notice).await;
        Ok(())
    }

    /// The user still needs help: clear the resolved state and its schedule
    #[instrument(skip(self))]
    pub async fn reopen(&self, user_id: Snowflake) -> ServiceResult<()> {
        let conversation = self.require_by_user(user_id).await?;

        self.invalidate_cache(user_id).await;
        self.ctx
            .conversation_repo()
            .set_resolved(user_id, false, None)
            .await?;

        info!(%user_id, "Conversation reopened");
        self.rename_thread(&conversation, ThreadStatus::Open).await;
        self.notify_thread(&conversation, "The user still needs help; the conversation stays open.")
            .await;
        self.dm_notice(user_id, "Okay, the conversation stays open.").await;
        Ok(())
    }

    /// Exempt the conversation from inactivity warnings and auto-close
    #[instrument(skip(self))]
    pub async fn disable_auto_close(&self, thread_id: Snowflake) -> ServiceResult<()> {
        let conversation = self.require_by_thread(thread_id).await?;
        self.invalidate_cache(conversation.user_id).await;
        self.ctx
            .conversation_repo()
            .set_auto_close_disabled(conversation.user_id, true)
            .await?;
        info!(user_id = %conversation.user_id, "Auto-close disabled");
        Ok(())
    }

    // ========================================================================
    // Close
    // ========================================================================

    /// Close the conversation: notices to both sides best-effort, lock and
    /// archive the thread (tolerant of already-archived), delete the row and
    /// invalidate every cache entry keyed by the user.
    #[instrument(skip(self))]
    pub async fn close(&self, user_id: Snowflake, reason: &str) -> ServiceResult<()> {
        let conversation = self.require_by_user(user_id).await?;
        self.close_conversation(&conversation, reason).await
    }

    /// Close addressed from the staff side
    #[instrument(skip(self))]
    pub async fn close_by_thread(&self, thread_id: Snowflake, reason: &str) -> ServiceResult<()> {
        let conversation = self.require_by_thread(thread_id).await?;
        self.close_conversation(&conversation, reason).await
    }

    async fn close_conversation(
        &self,
        conversation: &Conversation,
        reason: &str,
    ) -> ServiceResult<()> {
        let user_id = conversation.user_id;

        self.dm_notice(
            user_id,
            &format!("Your conversation with the staff team was closed. Reason: {reason}"),
        )
        .await;
        self.notify_thread(conversation, &format!("Conversation closed. Reason: {reason}"))
            .await;

        self.rename_thread(conversation, ThreadStatus::Closed).await;
        match self
            .ctx
            .gateway()
            .archive_thread(conversation.thread_id, true)
            .await
        {
            Ok(()) => {}
            // Already archived means already closed on the platform side
            Err(e) => warn!(thread_id = %conversation.thread_id, error = %e, "Thread archive failed"),
        }

        self.invalidate_cache(user_id).await;
        let deleted = self.ctx.conversation_repo().delete(user_id).await?;
        if !deleted {
            return Err(ServiceError::conflict("conversation was already closed"));
        }

        if let Some(cache) = self.ctx.conversation_cache() {
            if let Err(e) = cache.invalidate_user_pattern(user_id).await {
                warn!(%user_id, error = %e, "User cache pattern invalidation failed");
            }
        }

        info!(%user_id, reason, "Conversation closed");
        Ok(())
    }

    /// Ban the user and terminate the conversation. `duration` is the
    /// staff-entered argument (`30m`, `12h`, `7d`, `2w`, `permanent`);
    /// omitting it means permanent. Order matters: the ban ledger write
    /// fails closed, the DM notice and the close are best-effort after it.
    #[instrument(skip(self, reason))]
    pub async fn ban_close(
        &self,
        thread_id: Snowflake,
        staff_id: Snowflake,
        reason: &str,
        duration: Option<&str>,
    ) -> ServiceResult<()> {
        let duration_hours = match duration {
            Some(arg) => parse_duration(arg)?,
            None => None,
        };
        let conversation = self.require_by_thread(thread_id).await?;

        let bans = BanService::new(self.ctx);
        let ban = bans
            .ban(
                conversation.guild_id,
                conversation.user_id,
                staff_id,
                reason,
                duration_hours,
            )
            .await?;

        let notice = match ban.expires_at {
            Some(at) => format!(
                "You have been banned from the modmail system until {}. Reason: {reason}",
                at.format("%Y-%m-%d %H:%M UTC")
            ),
            None => format!("You have been permanently banned from the modmail system. Reason: {reason}"),
        };
        self.dm_notice(conversation.user_id, &notice).await;

        self.close_conversation(&conversation, &format!("{BAN_CLOSE_REASON}: {reason}"))
            .await
    }

    /// History entry point: the newest tracked messages for a user
    pub async fn history(
        &self,
        user_id: Snowflake,
        limit: usize,
        kind: Option<modmail_core::MessageKind>,
    ) -> ServiceResult<Vec<modmail_core::TrackedMessage>> {
        MessageTracker::new(self.ctx)
            .recent_messages(user_id, limit, kind)
            .await
    }

    // ========================================================================
    // Helpers
    // ========================================================================

    async fn require_by_user(&self, user_id: Snowflake) -> ServiceResult<Conversation> {
        MessageTracker::new(self.ctx)
            .load_conversation(user_id)
            .await?
            .ok_or_else(|| ServiceError::conflict("no open conversation for this user"))
    }

    async fn require_by_thread(&self, thread_id: Snowflake) -> ServiceResult<Conversation> {
        self.ctx
            .conversation_repo()
            .find_by_thread(thread_id)
            .await?
            .ok_or_else(|| ServiceError::conflict("no open conversation for this thread"))
    }

    async fn invalidate_cache(&self, user_id: Snowflake) {
        if let Some(cache) = self.ctx.conversation_cache() {
            if let Err(e) = cache.invalidate(user_id).await {
                warn!(%user_id, error = %e, "Conversation cache invalidation failed");
            }
        }
    }

    /// Best-effort DM of a plain notice
    async fn dm_notice(&self, user_id: Snowflake, text: &str) {
        self.dm_message(user_id, &OutboundMessage::text(text)).await;
    }

    /// Best-effort DM of a full message
    async fn dm_message(&self, user_id: Snowflake, message: &OutboundMessage) {
        if let Err(e) = send_dm(self.ctx, user_id, message).await {
            warn!(%user_id, error = %e, "DM notice failed");
        }
    }

    /// Best-effort status post into the staff thread
    async fn notify_thread(&self, conversation: &Conversation, text: &str) {
        if let Err(e) = self
            .ctx
            .gateway()
            .send_message(conversation.thread_id, &OutboundMessage::text(text))
            .await
        {
            warn!(thread_id = %conversation.thread_id, error = %e, "Thread notice failed");
        }
    }

    /// Best-effort thread rename carrying the status metadata
    async fn rename_thread(&self, conversation: &Conversation, status: ThreadStatus) {
        let name = format::thread_name(&conversation.user_display_name, status);
        if let Err(e) = self.ctx.gateway().rename_thread(conversation.thread_id, &name).await {
            warn!(thread_id = %conversation.thread_id, error = %e, "Thread rename failed");
        }
    }
}

/// DM helper shared with the prompt-timeout task
async fn send_dm(
    ctx: &ServiceContext,
    user_id: Snowflake,
    message: &OutboundMessage,
) -> Result<(), PlatformError> {
    let channel_id = ctx.gateway().create_dm_channel(user_id).await?;
    ctx.gateway().send_message(channel_id, message).await?;
    Ok(())
}
