//! PostgreSQL implementation of GuildConfigRepository

use async_trait::async_trait;
use sqlx::PgPool;
use tracing::instrument;

use modmail_core::traits::{GuildConfigRepository, RepoResult};
use modmail_core::value_objects::Snowflake;
use modmail_core::{DomainError, GuildConfig};

use crate::models::GuildConfigModel;

use super::error::map_db_error;

/// PostgreSQL implementation of GuildConfigRepository
#[derive(Clone)]
pub struct PgGuildConfigRepository {
    pool: PgPool,
}

impl PgGuildConfigRepository {
    /// Create a new PgGuildConfigRepository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl GuildConfigRepository for PgGuildConfigRepository {
    #[instrument(skip(self))]
    async fn find_by_guild(&self, guild_id: Snowflake) -> RepoResult<Option<GuildConfig>> {
        let result = sqlx::query_as::<_, GuildConfigModel>(
            r"
            SELECT guild_id, forum_channel_id, staff_role_id, webhook_id, webhook_token,
                   inactivity_warning_hours, auto_close_hours
            FROM modmail_guild_configs
            WHERE guild_id = $1
            ",
        )
        .bind(guild_id.into_inner())
        .fetch_optional(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(result.map(GuildConfig::from))
    }

    #[instrument(skip(self))]
    async fn find_all(&self) -> RepoResult<Vec<GuildConfig>> {
        let results = sqlx::query_as::<_, GuildConfigModel>(
            r"
            SELECT guild_id, forum_channel_id, staff_role_id, webhook_id, webhook_token,
                   inactivity_warning_hours, auto_close_hours
            FROM modmail_guild_configs
            ORDER BY guild_id
            ",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(results.into_iter().map(GuildConfig::from).collect())
    }

    #[instrument(skip(self, config), fields(guild_id = %config.guild_id))]
    async fn upsert(&self, config: &GuildConfig) -> RepoResult<()> {
        sqlx::query(
            r"
            INSERT INTO modmail_guild_configs (
                guild_id, forum_channel_id, staff_role_id, webhook_id, webhook_token,
                inactivity_warning_hours, auto_close_hours
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (guild_id) DO UPDATE SET
                forum_channel_id = $2,
                staff_role_id = $3,
                webhook_id = $4,
                webhook_token = $5,
                inactivity_warning_hours = $6,
                auto_close_hours = $7
            ",
        )
        .bind(config.guild_id.into_inner())
        .bind(config.forum_channel_id.into_inner())
        .bind(config.staff_role_id.into_inner())
        .bind(config.webhook_id.map(Snowflake::into_inner))
        .bind(config.webhook_token.as_deref())
        .bind(config.inactivity_warning_hours)
        .bind(config.auto_close_hours)
        .execute(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(())
    }

    #[instrument(skip(self, webhook_token))]
    async fn set_webhook(
        &self,
        guild_id: Snowflake,
        webhook_id: Snowflake,
        webhook_token: &str,
    ) -> RepoResult<()> {
        let result = sqlx::query(
            r"
            UPDATE modmail_guild_configs
            SET webhook_id = $2, webhook_token = $3
            WHERE guild_id = $1
            ",
        )
        .bind(guild_id.into_inner())
        .bind(webhook_id.into_inner())
        .bind(webhook_token)
        .execute(&self.pool)
        .await
        .map_err(map_db_error)?;

        if result.rows_affected() == 0 {
            return Err(DomainError::GuildNotConfigured(guild_id));
        }

        Ok(())
    }
}
