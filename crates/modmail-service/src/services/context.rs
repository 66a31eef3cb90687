//! Service context - dependency container for services
//!
//! Holds the repositories, cache stores, platform gateway and shared
//! concurrency primitives the services need. The cache stores are optional:
//! tests build a context from in-memory fakes with no Redis behind it, and
//! every cache path degrades to a plain repository read.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::Mutex;

use modmail_cache::{ConversationCacheStore, GuildConfigCacheStore};
use modmail_core::{
    BanRepository, ConversationRepository, GuildConfigRepository, PlatformGateway, Snowflake,
    SnowflakeGenerator,
};

use super::error::{ServiceError, ServiceResult};
use super::prompts::PendingPromptRegistry;

/// Service context containing all dependencies
#[derive(Clone)]
pub struct ServiceContext {
    // Repositories
    conversation_repo: Arc<dyn ConversationRepository>,
    guild_config_repo: Arc<dyn GuildConfigRepository>,
    ban_repo: Arc<dyn BanRepository>,

    // Platform adapter
    gateway: Arc<dyn PlatformGateway>,

    // Cache stores (absent in tests)
    conversation_cache: Option<ConversationCacheStore>,
    guild_config_cache: Option<GuildConfigCacheStore>,

    // Shared state
    prompts: Arc<PendingPromptRegistry>,
    /// Keyed locks serializing edits to one logical message
    edit_locks: Arc<DashMap<Snowflake, Arc<Mutex<()>>>>,
    snowflake_generator: Arc<SnowflakeGenerator>,
}

impl ServiceContext {
    /// Create a new service context with all dependencies
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        conversation_repo: Arc<dyn ConversationRepository>,
        guild_config_repo: Arc<dyn GuildConfigRepository>,
        ban_repo: Arc<dyn BanRepository>,
        gateway: Arc<dyn PlatformGateway>,
        conversation_cache: Option<ConversationCacheStore>,
        guild_config_cache: Option<GuildConfigCacheStore>,
        snowflake_generator: Arc<SnowflakeGenerator>,
    ) -> Self {
        Self {
            conversation_repo,
            guild_config_repo,
            ban_repo,
            gateway,
            conversation_cache,
            guild_config_cache,
            prompts: Arc::new(PendingPromptRegistry::new()),
            edit_locks: Arc::new(DashMap::new()),
            snowflake_generator,
        }
    }

    /// Get the conversation repository
    pub fn conversation_repo(&self) -> &dyn ConversationRepository {
        self.conversation_repo.as_ref()
    }

    /// Get the guild config repository
    pub fn guild_config_repo(&self) -> &dyn GuildConfigRepository {
        self.guild_config_repo.as_ref()
    }

    /// Get the ban repository
    pub fn ban_repo(&self) -> &dyn BanRepository {
        self.ban_repo.as_ref()
    }

    /// Get the platform gateway
    pub fn gateway(&self) -> &dyn PlatformGateway {
        self.gateway.as_ref()
    }

    /// Get the conversation cache store, if one is wired in
    pub fn conversation_cache(&self) -> Option<&ConversationCacheStore> {
        self.conversation_cache.as_ref()
    }

    /// Get the guild config cache store, if one is wired in
    pub fn guild_config_cache(&self) -> Option<&GuildConfigCacheStore> {
        self.guild_config_cache.as_ref()
    }

    /// Get the pending prompt registry
    pub fn prompts(&self) -> &Arc<PendingPromptRegistry> {
        &self.prompts
    }

    /// The lock serializing edits to one logical message. Created on first
    /// use; entries are small and bounded by the retention cap, so they are
    /// never reaped.
    pub fn edit_lock(&self, message_id: Snowflake) -> Arc<Mutex<()>> {
        self.edit_locks
            .entry(message_id)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Generate a new Snowflake ID
    pub fn generate_id(&self) -> Snowflake {
        self.snowflake_generator.generate()
    }
}

impl std::fmt::Debug for ServiceContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceContext")
            .field("repositories", &"...")
            .field("conversation_cache", &self.conversation_cache.is_some())
            .field("guild_config_cache", &self.guild_config_cache.is_some())
            .finish()
    }
}

/// Builder for creating ServiceContext with custom configuration
#[derive(Default)]
pub struct ServiceContextBuilder {
    conversation_repo: Option<Arc<dyn ConversationRepository>>,
    guild_config_repo: Option<Arc<dyn GuildConfigRepository>>,
    ban_repo: Option<Arc<dyn BanRepository>>,
    gateway: Option<Arc<dyn PlatformGateway>>,
    conversation_cache: Option<ConversationCacheStore>,
    guild_config_cache: Option<GuildConfigCacheStore>,
    snowflake_generator: Option<Arc<SnowflakeGenerator>>,
}

impl ServiceContextBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn conversation_repo(mut self, repo: Arc<dyn ConversationRepository>) -> Self {
        self.conversation_repo = Some(repo);
        self
    }

    pub fn guild_config_repo(mut self, repo: Arc<dyn GuildConfigRepository>) -> Self {
        self.guild_config_repo = Some(repo);
        self
    }

    pub fn ban_repo(mut self, repo: Arc<dyn BanRepository>) -> Self {
        self.ban_repo = Some(repo);
        self
    }

    pub fn gateway(mut self, gateway: Arc<dyn PlatformGateway>) -> Self {
        self.gateway = Some(gateway);
        self
    }

    pub fn conversation_cache(mut self, cache: ConversationCacheStore) -> Self {
        self.conversation_cache = Some(cache);
        self
    }

    pub fn guild_config_cache(mut self, cache: GuildConfigCacheStore) -> Self {
        self.guild_config_cache = Some(cache);
        self
    }

    pub fn snowflake_generator(mut self, generator: Arc<SnowflakeGenerator>) -> Self {
        self.snowflake_generator = Some(generator);
        self
    }

    /// Build the ServiceContext
    ///
    /// # Errors
    /// Returns `ServiceError::Validation` if any required dependency is missing
    pub fn build(self) -> ServiceResult<ServiceContext> {
        Ok(ServiceContext::new(
            self.conversation_repo
                .ok_or_else(|| ServiceError::validation("conversation_repo is required"))?,
            self.guild_config_repo
                .ok_or_else(|| ServiceError::validation("guild_config_repo is required"))?,
            self.ban_repo
                .ok_or_else(|| ServiceError::validation("ban_repo is required"))?,
            self.gateway
                .ok_or_else(|| ServiceError::validation("gateway is required"))?,
            self.conversation_cache,
            self.guild_config_cache,
            self.snowflake_generator
                .ok_or_else(|| ServiceError::validation("snowflake_generator is required"))?,
        ))
    }
}
