//! PostgreSQL implementation of ConversationRepository
//!
//! The embedded message log lives in a JSONB column; append, edit and the
//! retention cap are each a single UPDATE so no read-modify-write window
//! exists. Conditional writes (create, claim, warn) report whether they won
//! through `rows_affected`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use tracing::instrument;

use modmail_core::entities::MESSAGE_RETENTION_CAP;
use modmail_core::traits::{ConversationRepository, RepoResult};
use modmail_core::value_objects::Snowflake;
use modmail_core::{Conversation, TrackedMessage};

use crate::models::ConversationModel;

use super::error::{conversation_not_found, map_db_error, to_jsonb};

const SELECT_COLUMNS: &str = r"
    user_id, guild_id, thread_id, thread_channel_id, user_display_name,
    user_avatar_url, claimed_by, claimed_at, marked_resolved, resolved_at,
    auto_close_scheduled_at, last_user_activity_at, inactivity_notification_sent,
    auto_close_disabled, created_at, messages
";

/// PostgreSQL implementation of ConversationRepository
#[derive(Clone)]
pub struct PgConversationRepository {
    pool: PgPool,
}

impl PgConversationRepository {
    /// Create a new PgConversationRepository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ConversationRepository for PgConversationRepository {
    #[instrument(skip(self))]
    async fn find_by_user(&self, user_id: Snowflake) -> RepoResult<Option<Conversation>> {
        let result = sqlx::query_as::<_, ConversationModel>(&format!(
            "SELECT {SELECT_COLUMNS} FROM modmail_conversations WHERE user_id = $1"
        ))
        .bind(user_id.into_inner())
        .fetch_optional(&self.pool)
        .await
        .map_err(map_db_error)?;

        result.map(Conversation::try_from).transpose()
    }

    #[instrument(skip(self))]
    async fn find_by_thread(&self, thread_id: Snowflake) -> RepoResult<Option<Conversation>> {
        let result = sqlx::query_as::<_, ConversationModel>(&format!(
            "SELECT {SELECT_COLUMNS} FROM modmail_conversations WHERE thread_id = $1"
        ))
        .bind(thread_id.into_inner())
        .fetch_optional(&self.pool)
        .await
        .map_err(map_db_error)?;

        result.map(Conversation::try_from).transpose()
    }

    #[instrument(skip(self))]
    async fn find_all_open(&self) -> RepoResult<Vec<Conversation>> {
        let results = sqlx::query_as::<_, ConversationModel>(&format!(
            "SELECT {SELECT_COLUMNS} FROM modmail_conversations ORDER BY created_at"
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(map_db_error)?;

        results
            .into_iter()
            .map(Conversation::try_from)
            .collect()
    }

    #[instrument(skip(self, conversation), fields(user_id = %conversation.user_id))]
    async fn try_create(&self, conversation: &Conversation) -> RepoResult<bool> {
        let messages = to_jsonb(&conversation.messages)?;

        let result = sqlx::query(
            r"
            INSERT INTO modmail_conversations (
                user_id, guild_id, thread_id, thread_channel_id, user_display_name,
                user_avatar_url, claimed_by, claimed_at, marked_resolved, resolved_at,
                auto_close_scheduled_at, last_user_activity_at, inactivity_notification_sent,
                auto_close_disabled, created_at, messages
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16)
            ON CONFLICT (user_id) DO NOTHING
            ",
        )
        .bind(conversation.user_id.into_inner())
        .bind(conversation.guild_id.into_inner())
        .bind(conversation.thread_id.into_inner())
        .bind(conversation.thread_channel_id.into_inner())
        .bind(&conversation.user_display_name)
        .bind(conversation.user_avatar_url.as_deref())
        .bind(conversation.claimed_by.map(Snowflake::into_inner))
        .bind(conversation.claimed_at)
        .bind(conversation.marked_resolved)
        .bind(conversation.resolved_at)
        .bind(conversation.auto_close_scheduled_at)
        .bind(conversation.last_user_activity_at)
        .bind(conversation.inactivity_notification_sent)
        .bind(conversation.auto_close_disabled)
        .bind(conversation.created_at)
        .bind(messages)
        .execute(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(result.rows_affected() == 1)
    }

    #[instrument(skip(self, message), fields(message_id = %message.message_id))]
    async fn append_message(&self, user_id: Snowflake, message: &TrackedMessage) -> RepoResult<()> {
        // Appends then keeps only the newest MESSAGE_RETENTION_CAP entries,
        // all inside one statement.
        let appended = to_jsonb(&vec![message])?;

        let result = sqlx::query(
            r"
            UPDATE modmail_conversations
            SET messages = (
                SELECT COALESCE(jsonb_agg(elem ORDER BY ord), '[]'::jsonb)
                FROM jsonb_array_elements(messages || $2::jsonb) WITH ORDINALITY AS t(elem, ord)
                WHERE ord > jsonb_array_length(messages || $2::jsonb) - $3
            )
            WHERE user_id = $1
            ",
        )
        .bind(user_id.into_inner())
        .bind(appended)
        .bind(MESSAGE_RETENTION_CAP as i64)
        .execute(&self.pool)
        .await
        .map_err(map_db_error)?;

        if result.rows_affected() == 0 {
            return Err(conversation_not_found(user_id));
        }

        Ok(())
    }

    #[instrument(skip(self, message), fields(message_id = %message.message_id))]
    async fn update_message(&self, user_id: Snowflake, message: &TrackedMessage) -> RepoResult<()> {
        let replacement = to_jsonb(message)?;

        let result = sqlx::query(
            r"
            UPDATE modmail_conversations
            SET messages = (
                SELECT COALESCE(
                    jsonb_agg(
                        CASE WHEN elem->>'message_id' = $2 THEN $3::jsonb ELSE elem END
                        ORDER BY ord
                    ),
                    '[]'::jsonb
                )
                FROM jsonb_array_elements(messages) WITH ORDINALITY AS t(elem, ord)
            )
            WHERE user_id = $1
            ",
        )
        .bind(user_id.into_inner())
        .bind(message.message_id.to_string())
        .bind(replacement)
        .execute(&self.pool)
        .await
        .map_err(map_db_error)?;

        if result.rows_affected() == 0 {
            return Err(conversation_not_found(user_id));
        }

        Ok(())
    }

    #[instrument(skip(self))]
    async fn try_claim(
        &self,
        user_id: Snowflake,
        staff_id: Snowflake,
        at: DateTime<Utc>,
    ) -> RepoResult<bool> {
        let result = sqlx::query(
            r"
            UPDATE modmail_conversations
            SET claimed_by = $2, claimed_at = $3
            WHERE user_id = $1 AND claimed_by IS NULL
            ",
        )
        .bind(user_id.into_inner())
        .bind(staff_id.into_inner())
        .bind(at)
        .execute(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(result.rows_affected() == 1)
    }

    #[instrument(skip(self))]
    async fn set_resolved(
        &self,
        user_id: Snowflake,
        resolved: bool,
        auto_close_at: Option<DateTime<Utc>>,
    ) -> RepoResult<()> {
        let result = sqlx::query(
            r"
            UPDATE modmail_conversations
            SET marked_resolved = $2,
                resolved_at = CASE WHEN $2 THEN now() ELSE NULL END,
                auto_close_scheduled_at = $3
            WHERE user_id = $1
            ",
        )
        .bind(user_id.into_inner())
        .bind(resolved)
        .bind(auto_close_at)
        .execute(&self.pool)
        .await
        .map_err(map_db_error)?;

        if result.rows_affected() == 0 {
            return Err(conversation_not_found(user_id));
        }

        Ok(())
    }

    #[instrument(skip(self))]
    async fn set_auto_close_disabled(&self, user_id: Snowflake, disabled: bool) -> RepoResult<()> {
        let result = sqlx::query(
            r"
            UPDATE modmail_conversations
            SET auto_close_disabled = $2
            WHERE user_id = $1
            ",
        )
        .bind(user_id.into_inner())
        .bind(disabled)
        .execute(&self.pool)
        .await
        .map_err(map_db_error)?;

        if result.rows_affected() == 0 {
            return Err(conversation_not_found(user_id));
        }

        Ok(())
    }

    #[instrument(skip(self))]
    async fn record_user_activity(&self, user_id: Snowflake, at: DateTime<Utc>) -> RepoResult<()> {
        let result = sqlx::query(
            r"
            UPDATE modmail_conversations
            SET last_user_activity_at = $2,
                inactivity_notification_sent = NULL,
                auto_close_scheduled_at = NULL
            WHERE user_id = $1
            ",
        )
        .bind(user_id.into_inner())
        .bind(at)
        .execute(&self.pool)
        .await
        .map_err(map_db_error)?;

        if result.rows_affected() == 0 {
            return Err(conversation_not_found(user_id));
        }

        Ok(())
    }

    #[instrument(skip(self))]
    async fn try_mark_inactivity_notified(
        &self,
        user_id: Snowflake,
        notified_at: DateTime<Utc>,
        auto_close_at: DateTime<Utc>,
    ) -> RepoResult<bool> {
        let result = sqlx::query(
            r"
            UPDATE modmail_conversations
            SET inactivity_notification_sent = $2,
                auto_close_scheduled_at = $3
            WHERE user_id = $1 AND inactivity_notification_sent IS NULL
            ",
        )
        .bind(user_id.into_inner())
        .bind(notified_at)
        .bind(auto_close_at)
        .execute(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(result.rows_affected() == 1)
    }

    #[instrument(skip(self))]
    async fn update_user_snapshot(
        &self,
        user_id: Snowflake,
        display_name: &str,
        avatar_url: Option<&str>,
    ) -> RepoResult<()> {
        sqlx::query(
            r"
            UPDATE modmail_conversations
            SET user_display_name = $2, user_avatar_url = $3
            WHERE user_id = $1
            ",
        )
        .bind(user_id.into_inner())
        .bind(display_name)
        .bind(avatar_url)
        .execute(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(())
    }

    #[instrument(skip(self))]
    async fn delete(&self, user_id: Snowflake) -> RepoResult<bool> {
        let result = sqlx::query("DELETE FROM modmail_conversations WHERE user_id = $1")
            .bind(user_id.into_inner())
            .execute(&self.pool)
            .await
            .map_err(map_db_error)?;

        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self))]
    async fn backfill_activity_fields(&self) -> RepoResult<u64> {
        let result = sqlx::query(
            r"
            UPDATE modmail_conversations
            SET last_user_activity_at = created_at
            WHERE last_user_activity_at IS NULL
            ",
        )
        .execute(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repo_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<PgConversationRepository>();
    }
}
