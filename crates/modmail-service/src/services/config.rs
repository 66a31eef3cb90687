//! Config & cache facade
//!
//! Guild configs are read on nearly every modmail operation, so reads go
//! through a short-TTL cache. Writes invalidate before touching the store.
//! A guild whose webhook is missing gets one created lazily on first relay
//! and persisted, healing configs from before the webhook field existed.

use tracing::{info, instrument, warn};

use modmail_core::{GuildConfig, Snowflake};

use super::context::ServiceContext;
use super::error::{ServiceError, ServiceResult};

/// Name given to lazily-created relay webhooks
const RELAY_WEBHOOK_NAME: &str = "Modmail Relay";

/// Guild configuration service
pub struct ConfigService<'a> {
    ctx: &'a ServiceContext,
}

impl<'a> ConfigService<'a> {
    /// Create a new ConfigService
    pub fn new(ctx: &'a ServiceContext) -> Self {
        Self { ctx }
    }

    /// Read-through lookup. Absence means modmail is not set up in the guild.
    #[instrument(skip(self))]
    pub async fn get(&self, guild_id: Snowflake) -> ServiceResult<Option<GuildConfig>> {
        if let Some(cache) = self.ctx.guild_config_cache() {
            match cache.get(guild_id).await {
                Ok(Some(config)) => return Ok(Some(config)),
                Ok(None) => {}
                Err(e) => warn!(%guild_id, error = %e, "Guild config cache read failed"),
            }
        }

        let config = self.ctx.guild_config_repo().find_by_guild(guild_id).await?;

        if let (Some(cache), Some(config)) = (self.ctx.guild_config_cache(), &config) {
            if let Err(e) = cache.put(config).await {
                warn!(%guild_id, error = %e, "Guild config cache write failed");
            }
        }

        Ok(config)
    }

    /// Lookup that treats absence as an error
    pub async fn require(&self, guild_id: Snowflake) -> ServiceResult<GuildConfig> {
        self.get(guild_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("GuildConfig", guild_id.to_string()))
    }

    /// Drop the cached entry after a config write
    #[instrument(skip(self))]
    pub async fn invalidate(&self, guild_id: Snowflake) {
        if let Some(cache) = self.ctx.guild_config_cache() {
            if let Err(e) = cache.invalidate(guild_id).await {
                warn!(%guild_id, error = %e, "Guild config cache invalidation failed");
            }
        }
    }

    /// Create or replace a guild's config
    #[instrument(skip(self, config))]
    pub async fn upsert(&self, config: &GuildConfig) -> ServiceResult<()> {
        self.invalidate(config.guild_id).await;
        self.ctx.guild_config_repo().upsert(config).await?;
        Ok(())
    }

    /// Return the guild's relay webhook credentials, creating and persisting
    /// them on first use.
    #[instrument(skip(self))]
    pub async fn ensure_webhook(&self, guild_id: Snowflake) -> ServiceResult<(Snowflake, String)> {
        let config = self.require(guild_id).await?;
        if let Some((id, token)) = config.webhook() {
            return Ok((id, token.to_string()));
        }

        let (webhook_id, webhook_token) = self
            .ctx
            .gateway()
            .create_webhook(config.forum_channel_id, RELAY_WEBHOOK_NAME)
            .await
            .map_err(|e| ServiceError::internal(format!("webhook creation failed: {e}")))?;

        self.invalidate(guild_id).await;
        self.ctx
            .guild_config_repo()
            .set_webhook(guild_id, webhook_id, &webhook_token)
            .await?;

        info!(%guild_id, %webhook_id, "Relay webhook created");
        Ok((webhook_id, webhook_token))
    }
}
