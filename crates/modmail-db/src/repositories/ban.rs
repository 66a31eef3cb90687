//! PostgreSQL implementation of BanRepository
//!
//! The ledger holds one row per (guild, user); history lives in the
//! previous_bans JSONB column, folded by the service layer before upsert.

use async_trait::async_trait;
use sqlx::PgPool;
use tracing::instrument;

use modmail_core::traits::{BanRepository, RepoResult};
use modmail_core::value_objects::Snowflake;
use modmail_core::Ban;

use crate::models::BanModel;

use super::error::{map_db_error, to_jsonb};

/// PostgreSQL implementation of BanRepository
#[derive(Clone)]
pub struct PgBanRepository {
    pool: PgPool,
}

impl PgBanRepository {
    /// Create a new PgBanRepository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl BanRepository for PgBanRepository {
    #[instrument(skip(self))]
    async fn find(&self, guild_id: Snowflake, user_id: Snowflake) -> RepoResult<Option<Ban>> {
        let result = sqlx::query_as::<_, BanModel>(
            r"
            SELECT guild_id, user_id, banned_by, reason, permanent, duration_hours,
                   expires_at, banned_at, previous_bans
            FROM modmail_bans
            WHERE guild_id = $1 AND user_id = $2
            ",
        )
        .bind(guild_id.into_inner())
        .bind(user_id.into_inner())
        .fetch_optional(&self.pool)
        .await
        .map_err(map_db_error)?;

        result.map(Ban::try_from).transpose()
    }

    #[instrument(skip(self, ban), fields(guild_id = %ban.guild_id, user_id = %ban.user_id))]
    async fn upsert(&self, ban: &Ban) -> RepoResult<()> {
        let previous_bans = to_jsonb(&ban.previous_bans)?;

        sqlx::query(
            r"
            INSERT INTO modmail_bans (
                guild_id, user_id, banned_by, reason, permanent, duration_hours,
                expires_at, banned_at, previous_bans
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            ON CONFLICT (guild_id, user_id) DO UPDATE SET
                banned_by = $3,
                reason = $4,
                permanent = $5,
                duration_hours = $6,
                expires_at = $7,
                banned_at = $8,
                previous_bans = $9
            ",
        )
        .bind(ban.guild_id.into_inner())
        .bind(ban.user_id.into_inner())
        .bind(ban.banned_by.into_inner())
        .bind(&ban.reason)
        .bind(ban.permanent)
        .bind(ban.duration_hours)
        .bind(ban.expires_at)
        .bind(ban.banned_at)
        .bind(previous_bans)
        .execute(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repo_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<PgBanRepository>();
    }
}
