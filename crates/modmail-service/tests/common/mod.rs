//! In-memory fakes and a recording gateway for service integration tests

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use modmail_core::{
    Ban, BanRepository, ChannelCapability, Conversation, ConversationRepository, DomainError,
    GatewayResult, GuildConfig, GuildConfigRepository, OutboundMessage, PlatformError,
    PlatformGateway, RepoResult, SentMessage, Snowflake, SnowflakeGenerator, TrackedMessage,
    WebhookIdentity,
};
use modmail_core::entities::MESSAGE_RETENTION_CAP;
use modmail_service::{ServiceContext, ServiceContextBuilder};

// ============================================================================
// Conversation repository fake
// ============================================================================

#[derive(Default)]
pub struct InMemoryConversationRepository {
    rows: Mutex<HashMap<Snowflake, Conversation>>,
}

impl InMemoryConversationRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, conversation: Conversation) {
        self.rows
            .lock()
            .unwrap()
            .insert(conversation.user_id, conversation);
    }

    pub fn get(&self, user_id: Snowflake) -> Option<Conversation> {
        self.rows.lock().unwrap().get(&user_id).cloned()
    }

    pub fn len(&self) -> usize {
        self.rows.lock().unwrap().len()
    }

    pub fn mutate<F: FnOnce(&mut Conversation)>(&self, user_id: Snowflake, f: F) {
        let mut rows = self.rows.lock().unwrap();
        if let Some(row) = rows.get_mut(&user_id) {
            f(row);
        }
    }
}

#[async_trait]
impl ConversationRepository for InMemoryConversationRepository {
    async fn find_by_user(&self, user_id: Snowflake) -> RepoResult<Option<Conversation>> {
        Ok(self.get(user_id))
    }

    async fn find_by_thread(&self, thread_id: Snowflake) -> RepoResult<Option<Conversation>> {
        Ok(self
            .rows
            .lock()
            .unwrap()
            .values()
            .find(|c| c.thread_id == thread_id)
            .cloned())
    }

    async fn find_all_open(&self) -> RepoResult<Vec<Conversation>> {
        Ok(self.rows.lock().unwrap().values().cloned().collect())
    }

    async fn try_create(&self, conversation: &Conversation) -> RepoResult<bool> {
        let mut rows = self.rows.lock().unwrap();
        if rows.contains_key(&conversation.user_id) {
            return Ok(false);
        }
        rows.insert(conversation.user_id, conversation.clone());
        Ok(true)
    }

    async fn append_message(&self, user_id: Snowflake, message: &TrackedMessage) -> RepoResult<()> {
        let mut rows = self.rows.lock().unwrap();
        let row = rows
            .get_mut(&user_id)
            .ok_or(DomainError::ConversationNotFound(user_id))?;
        row.messages.push(message.clone());
        let overflow = row.messages.len().saturating_sub(MESSAGE_RETENTION_CAP);
        if overflow > 0 {
            row.messages.drain(..overflow);
        }
        Ok(())
    }

    async fn update_message(&self, user_id: Snowflake, message: &TrackedMessage) -> RepoResult<()> {
        let mut rows = self.rows.lock().unwrap();
        let row = rows
            .get_mut(&user_id)
            .ok_or(DomainError::ConversationNotFound(user_id))?;
        let slot = row
            .messages
            .iter_mut()
            .find(|m| m.message_id == message.message_id)
            .ok_or(DomainError::TrackedMessageNotFound(message.message_id))?;
        *slot = message.clone();
        Ok(())
    }

    async fn try_claim(
        &self,
        user_id: Snowflake,
        staff_id: Snowflake,
        at: DateTime<Utc>,
    ) -> RepoResult<bool> {
        let mut rows = self.rows.lock().unwrap();
        let row = rows
            .get_mut(&user_id)
            .ok_or(DomainError::ConversationNotFound(user_id))?;
        if row.claimed_by.is_some() {
            return Ok(false);
        }
        row.claimed_by = Some(staff_id);
        row.claimed_at = Some(at);
        Ok(true)
    }

    async fn set_resolved(
        &self,
        user_id: Snowflake,
        resolved: bool,
        auto_close_at: Option<DateTime<Utc>>,
    ) -> RepoResult<()> {
        let mut rows = self.rows.lock().unwrap();
        let row = rows
            .get_mut(&user_id)
            .ok_or(DomainError::ConversationNotFound(user_id))?;
        row.marked_resolved = resolved;
        row.resolved_at = resolved.then(Utc::now);
        row.auto_close_scheduled_at = auto_close_at;
        Ok(())
    }

    async fn set_auto_close_disabled(&self, user_id: Snowflake, disabled: bool) -> RepoResult<()> {
        let mut rows = self.rows.lock().unwrap();
        let row = rows
            .get_mut(&user_id)
            .ok_or(DomainError::ConversationNotFound(user_id))?;
        row.auto_close_disabled = disabled;
        Ok(())
    }

    async fn record_user_activity(&self, user_id: Snowflake, at: DateTime<Utc>) -> RepoResult<()> {
        let mut rows = self.rows.lock().unwrap();
        let row = rows
            .get_mut(&user_id)
            .ok_or(DomainError::ConversationNotFound(user_id))?;
        row.last_user_activity_at = at;
        row.inactivity_notification_sent = None;
        row.auto_close_scheduled_at = None;
        Ok(())
    }

    async fn try_mark_inactivity_notified(
        &self,
        user_id: Snowflake,
        notified_at: DateTime<Utc>,
        auto_close_at: DateTime<Utc>,
    ) -> RepoResult<bool> {
        let mut rows = self.rows.lock().unwrap();
        let row = rows
            .get_mut(&user_id)
            .ok_or(DomainError::ConversationNotFound(user_id))?;
        if row.inactivity_notification_sent.is_some() {
            return Ok(false);
        }
        row.inactivity_notification_sent = Some(notified_at);
        row.auto_close_scheduled_at = Some(auto_close_at);
        Ok(true)
    }

    async fn update_user_snapshot(
        &self,
        user_id: Snowflake,
        display_name: &str,
        avatar_url: Option<&str>,
    ) -> RepoResult<()> {
        let mut rows = self.rows.lock().unwrap();
        let row = rows
            .get_mut(&user_id)
            .ok_or(DomainError::ConversationNotFound(user_id))?;
        row.user_display_name = display_name.to_string();
        row.user_avatar_url = avatar_url.map(String::from);
        Ok(())
    }

    async fn delete(&self, user_id: Snowflake) -> RepoResult<bool> {
        Ok(self.rows.lock().unwrap().remove(&user_id).is_some())
    }

    async fn backfill_activity_fields(&self) -> RepoResult<u64> {
        Ok(0)
    }
}

// ============================================================================
// Guild config repository fake
// ============================================================================

#[derive(Default)]
pub struct InMemoryGuildConfigRepository {
    rows: Mutex<HashMap<Snowflake, GuildConfig>>,
}

impl InMemoryGuildConfigRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, config: GuildConfig) {
        self.rows.lock().unwrap().insert(config.guild_id, config);
    }

    pub fn get(&self, guild_id: Snowflake) -> Option<GuildConfig> {
        self.rows.lock().unwrap().get(&guild_id).cloned()
    }
}

#[async_trait]
impl GuildConfigRepository for InMemoryGuildConfigRepository {
    async fn find_by_guild(&self, guild_id: Snowflake) -> RepoResult<Option<GuildConfig>> {
        Ok(self.get(guild_id))
    }

    async fn find_all(&self) -> RepoResult<Vec<GuildConfig>> {
        Ok(self.rows.lock().unwrap().values().cloned().collect())
    }

    async fn upsert(&self, config: &GuildConfig) -> RepoResult<()> {
        self.insert(config.clone());
        Ok(())
    }

    async fn set_webhook(
        &self,
        guild_id: Snowflake,
        webhook_id: Snowflake,
        webhook_token: &str,
    ) -> RepoResult<()> {
        let mut rows = self.rows.lock().unwrap();
        let row = rows
            .get_mut(&guild_id)
            .ok_or(DomainError::GuildNotConfigured(guild_id))?;
        row.webhook_id = Some(webhook_id);
        row.webhook_token = Some(webhook_token.to_string());
        Ok(())
    }
}

// ============================================================================
// Ban repository fake
// ============================================================================

#[derive(Default)]
pub struct InMemoryBanRepository {
    rows: Mutex<HashMap<(Snowflake, Snowflake), Ban>>,
}

impl InMemoryBanRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, ban: Ban) {
        self.rows
            .lock()
            .unwrap()
            .insert((ban.guild_id, ban.user_id), ban);
    }

    pub fn get(&self, guild_id: Snowflake, user_id: Snowflake) -> Option<Ban> {
        self.rows.lock().unwrap().get(&(guild_id, user_id)).cloned()
    }
}

#[async_trait]
impl BanRepository for InMemoryBanRepository {
    async fn find(&self, guild_id: Snowflake, user_id: Snowflake) -> RepoResult<Option<Ban>> {
        Ok(self.get(guild_id, user_id))
    }

    async fn upsert(&self, ban: &Ban) -> RepoResult<()> {
        self.insert(ban.clone());
        Ok(())
    }
}

// ============================================================================
// Recording gateway fake
// ============================================================================

/// A webhook post captured by the fake gateway
#[derive(Debug, Clone)]
pub struct WebhookPost {
    pub thread_id: Snowflake,
    pub username: String,
    pub content: String,
    pub message_id: Snowflake,
}

/// A direct message captured by the fake gateway
#[derive(Debug, Clone)]
pub struct RecordedDm {
    pub channel_id: Snowflake,
    pub message: OutboundMessage,
    pub message_id: Snowflake,
}

#[derive(Default)]
pub struct RecordingGateway {
    next_id: AtomicI64,
    /// Guilds reported as shared with every user
    pub shared_guilds: Mutex<Vec<Snowflake>>,
    /// Current content by platform message id, as the platform would store it
    pub contents: Mutex<HashMap<Snowflake, String>>,

    pub webhook_posts: Mutex<Vec<WebhookPost>>,
    pub webhook_edits: Mutex<Vec<(Snowflake, Snowflake, String)>>,
    pub dms: Mutex<Vec<RecordedDm>>,
    pub thread_messages: Mutex<Vec<(Snowflake, OutboundMessage)>>,
    pub edits: Mutex<Vec<(Snowflake, Snowflake, String)>>,
    pub reactions: Mutex<Vec<(Snowflake, Snowflake, String)>>,
    pub created_threads: Mutex<Vec<(Snowflake, String)>>,
    pub archived: Mutex<Vec<(Snowflake, bool)>>,
    pub renames: Mutex<Vec<(Snowflake, String)>>,
    pub webhooks_created: Mutex<Vec<Snowflake>>,

    pub fail_dms: AtomicBool,
    pub fail_webhook_posts: AtomicBool,
}

impl RecordingGateway {
    pub fn new() -> Self {
        Self {
            next_id: AtomicI64::new(1_000_000),
            ..Self::default()
        }
    }

    fn alloc_id(&self) -> Snowflake {
        Snowflake::new(self.next_id.fetch_add(1, Ordering::SeqCst))
    }

    /// Deterministic DM channel per user
    pub fn dm_channel_for(user_id: Snowflake) -> Snowflake {
        Snowflake::new(i64::from(user_id) + 5_000_000)
    }

    pub fn set_shared_guilds(&self, guilds: Vec<Snowflake>) {
        *self.shared_guilds.lock().unwrap() = guilds;
    }

    /// Plain-text contents of every DM sent so far
    pub fn dm_texts(&self) -> Vec<String> {
        self.dms
            .lock()
            .unwrap()
            .iter()
            .filter_map(|dm| dm.message.content.clone())
            .collect()
    }

    pub fn content_of(&self, message_id: Snowflake) -> Option<String> {
        self.contents.lock().unwrap().get(&message_id).cloned()
    }
}

#[async_trait]
impl PlatformGateway for RecordingGateway {
    async fn create_dm_channel(&self, user_id: Snowflake) -> GatewayResult<Snowflake> {
        if self.fail_dms.load(Ordering::SeqCst) {
            return Err(PlatformError::Unavailable("DMs closed".to_string()));
        }
        Ok(Self::dm_channel_for(user_id))
    }

    async fn send_message(
        &self,
        channel_id: Snowflake,
        message: &OutboundMessage,
    ) -> GatewayResult<SentMessage> {
        let id = self.alloc_id();
        if let Some(content) = &message.content {
            self.contents.lock().unwrap().insert(id, content.clone());
        } else if let Some(embed) = &message.embed {
            self.contents
                .lock()
                .unwrap()
                .insert(id, embed.description.clone());
        }

        if i64::from(channel_id) >= 5_000_000 {
            if self.fail_dms.load(Ordering::SeqCst) {
                return Err(PlatformError::Unavailable("DMs closed".to_string()));
            }
            self.dms.lock().unwrap().push(RecordedDm {
                channel_id,
                message: message.clone(),
                message_id: id,
            });
        } else {
            self.thread_messages
                .lock()
                .unwrap()
                .push((channel_id, message.clone()));
        }
        Ok(SentMessage {
            id,
            channel_id,
            url: None,
        })
    }

    async fn edit_message(
        &self,
        channel_id: Snowflake,
        message_id: Snowflake,
        content: &str,
    ) -> GatewayResult<()> {
        self.contents
            .lock()
            .unwrap()
            .insert(message_id, content.to_string());
        self.edits
            .lock()
            .unwrap()
            .push((channel_id, message_id, content.to_string()));
        Ok(())
    }

    async fn fetch_message_content(
        &self,
        _channel_id: Snowflake,
        message_id: Snowflake,
    ) -> GatewayResult<String> {
        self.contents
            .lock()
            .unwrap()
            .get(&message_id)
            .cloned()
            .ok_or_else(|| PlatformError::Unavailable("unknown message".to_string()))
    }

    async fn add_reaction(
        &self,
        channel_id: Snowflake,
        message_id: Snowflake,
        emoji: &str,
    ) -> GatewayResult<()> {
        self.reactions
            .lock()
            .unwrap()
            .push((channel_id, message_id, emoji.to_string()));
        Ok(())
    }

    async fn create_thread(
        &self,
        _forum_channel_id: Snowflake,
        name: &str,
        _initial_message: &OutboundMessage,
    ) -> GatewayResult<SentMessage> {
        let thread_id = self.alloc_id();
        self.created_threads
            .lock()
            .unwrap()
            .push((thread_id, name.to_string()));
        Ok(SentMessage {
            id: thread_id,
            channel_id: thread_id,
            url: None,
        })
    }

    async fn rename_thread(&self, thread_id: Snowflake, name: &str) -> GatewayResult<()> {
        self.renames
            .lock()
            .unwrap()
            .push((thread_id, name.to_string()));
        Ok(())
    }

    async fn archive_thread(&self, thread_id: Snowflake, locked: bool) -> GatewayResult<()> {
        self.archived.lock().unwrap().push((thread_id, locked));
        Ok(())
    }

    async fn create_webhook(
        &self,
        channel_id: Snowflake,
        _name: &str,
    ) -> GatewayResult<(Snowflake, String)> {
        let id = self.alloc_id();
        self.webhooks_created.lock().unwrap().push(channel_id);
        Ok((id, format!("token-{id}")))
    }

    async fn post_as_webhook(
        &self,
        _webhook_id: Snowflake,
        _webhook_token: &str,
        thread_id: Snowflake,
        identity: &WebhookIdentity,
        message: &OutboundMessage,
    ) -> GatewayResult<SentMessage> {
        if self.fail_webhook_posts.load(Ordering::SeqCst) {
            return Err(PlatformError::Unavailable("webhook revoked".to_string()));
        }
        let id = self.alloc_id();
        let content = message.content.clone().unwrap_or_default();
        self.contents.lock().unwrap().insert(id, content.clone());
        self.webhook_posts.lock().unwrap().push(WebhookPost {
            thread_id,
            username: identity.username.clone(),
            content,
            message_id: id,
        });
        Ok(SentMessage {
            id,
            channel_id: thread_id,
            url: None,
        })
    }

    async fn edit_webhook_message(
        &self,
        _webhook_id: Snowflake,
        _webhook_token: &str,
        thread_id: Snowflake,
        message_id: Snowflake,
        content: &str,
    ) -> GatewayResult<()> {
        self.contents
            .lock()
            .unwrap()
            .insert(message_id, content.to_string());
        self.webhook_edits
            .lock()
            .unwrap()
            .push((thread_id, message_id, content.to_string()));
        Ok(())
    }

    async fn channel_capability(&self, channel_id: Snowflake) -> GatewayResult<ChannelCapability> {
        if i64::from(channel_id) >= 5_000_000 {
            return Ok(ChannelCapability::Direct);
        }
        Ok(ChannelCapability::Threadable)
    }

    async fn fetch_user_display(
        &self,
        user_id: Snowflake,
    ) -> GatewayResult<(String, Option<String>)> {
        Ok((format!("user-{user_id}"), None))
    }

    async fn shared_guilds(&self, _user_id: Snowflake) -> GatewayResult<Vec<Snowflake>> {
        Ok(self.shared_guilds.lock().unwrap().clone())
    }
}

// ============================================================================
// Harness
// ============================================================================

/// Everything a service test needs, with handles kept on the fakes
pub struct TestHarness {
    pub ctx: ServiceContext,
    pub conversations: Arc<InMemoryConversationRepository>,
    pub configs: Arc<InMemoryGuildConfigRepository>,
    pub bans: Arc<InMemoryBanRepository>,
    pub gateway: Arc<RecordingGateway>,
}

impl TestHarness {
    pub fn new() -> Self {
        let conversations = Arc::new(InMemoryConversationRepository::new());
        let configs = Arc::new(InMemoryGuildConfigRepository::new());
        let bans = Arc::new(InMemoryBanRepository::new());
        let gateway = Arc::new(RecordingGateway::new());

        let ctx = ServiceContextBuilder::new()
            .conversation_repo(conversations.clone())
            .guild_config_repo(configs.clone())
            .ban_repo(bans.clone())
            .gateway(gateway.clone())
            .snowflake_generator(Arc::new(SnowflakeGenerator::new(0)))
            .build()
            .expect("test context");

        Self {
            ctx,
            conversations,
            configs,
            bans,
            gateway,
        }
    }

    /// Configure a guild and report it as shared with every user
    pub fn with_guild(self, guild_id: Snowflake) -> Self {
        self.configs.insert(GuildConfig::new(
            guild_id,
            Snowflake::new(i64::from(guild_id) * 10),
            Snowflake::new(i64::from(guild_id) * 10 + 1),
        ));
        self.gateway.set_shared_guilds(vec![guild_id]);
        self
    }

    /// Seed an open conversation directly in the store
    pub fn seed_conversation(&self, guild_id: Snowflake, user_id: Snowflake) -> Conversation {
        let thread_id = Snowflake::new(i64::from(user_id) + 700_000);
        let conversation = Conversation::new(
            guild_id,
            user_id,
            thread_id,
            Snowflake::new(i64::from(guild_id) * 10),
            format!("user-{user_id}"),
            None,
        );
        self.conversations.insert(conversation.clone());
        conversation
    }
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}
