//! Repository traits (ports) - define the interface for data access
//!
//! The domain layer defines what it needs, and the infrastructure layer
//! provides the implementation. Conversation writes that serialize concurrent
//! callers (create, claim, warn) are expressed as conditional operations that
//! report whether they won, so the store's atomicity is the only lock.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::entities::{Ban, Conversation, GuildConfig, TrackedMessage};
use crate::error::DomainError;
use crate::value_objects::Snowflake;

/// Result type for repository operations
pub type RepoResult<T> = Result<T, DomainError>;

// ============================================================================
// Conversation Repository
// ============================================================================

#[async_trait]
pub trait ConversationRepository: Send + Sync {
    /// Find the active conversation for a user. Absence means closed.
    async fn find_by_user(&self, user_id: Snowflake) -> RepoResult<Option<Conversation>>;

    /// Find the active conversation owning a staff thread
    async fn find_by_thread(&self, thread_id: Snowflake) -> RepoResult<Option<Conversation>>;

    /// Load every open conversation (scheduler sweep)
    async fn find_all_open(&self) -> RepoResult<Vec<Conversation>>;

    /// Atomically create the conversation unless the user already has one.
    ///
    /// Returns `false` when another writer won the race; the caller must not
    /// treat that as an error.
    async fn try_create(&self, conversation: &Conversation) -> RepoResult<bool>;

    /// Append a tracked message, slicing the log to the retention cap
    async fn append_message(&self, user_id: Snowflake, message: &TrackedMessage) -> RepoResult<()>;

    /// Replace a tracked message in place (edit/delete shadow updates)
    async fn update_message(&self, user_id: Snowflake, message: &TrackedMessage) -> RepoResult<()>;

    /// Claim the conversation for a staff member. Returns `false` if it was
    /// already claimed; an existing claim is never overwritten.
    async fn try_claim(
        &self,
        user_id: Snowflake,
        staff_id: Snowflake,
        at: DateTime<Utc>,
    ) -> RepoResult<bool>;

    /// Set or clear the resolved flag and its auto-close schedule
    async fn set_resolved(
        &self,
        user_id: Snowflake,
        resolved: bool,
        auto_close_at: Option<DateTime<Utc>>,
    ) -> RepoResult<()>;

    /// Exempt or re-include the conversation from inactivity handling
    async fn set_auto_close_disabled(&self, user_id: Snowflake, disabled: bool) -> RepoResult<()>;

    /// Reset the inactivity clock and clear any pending warning/auto-close
    async fn record_user_activity(&self, user_id: Snowflake, at: DateTime<Utc>) -> RepoResult<()>;

    /// Mark the inactivity warning sent and schedule the auto-close.
    ///
    /// Returns `false` if a warning was already recorded, making the
    /// scheduler idempotent across overlapping ticks.
    async fn try_mark_inactivity_notified(
        &self,
        user_id: Snowflake,
        notified_at: DateTime<Utc>,
        auto_close_at: DateTime<Utc>,
    ) -> RepoResult<bool>;

    /// Refresh the cached display name/avatar snapshot
    async fn update_user_snapshot(
        &self,
        user_id: Snowflake,
        display_name: &str,
        avatar_url: Option<&str>,
    ) -> RepoResult<()>;

    /// Delete the row: the only way a conversation closes. Returns `false`
    /// if it was already gone.
    async fn delete(&self, user_id: Snowflake) -> RepoResult<bool>;

    /// One-shot migration: give legacy rows the activity/scheduling fields.
    /// Returns the number of rows touched; safe to re-run.
    async fn backfill_activity_fields(&self) -> RepoResult<u64>;
}

// ============================================================================
// Guild Config Repository
// ============================================================================

#[async_trait]
pub trait GuildConfigRepository: Send + Sync {
    /// Find config for a guild; absence means modmail is not set up there
    async fn find_by_guild(&self, guild_id: Snowflake) -> RepoResult<Option<GuildConfig>>;

    /// List every guild with modmail configured
    async fn find_all(&self) -> RepoResult<Vec<GuildConfig>>;

    /// Create or replace a guild's config
    async fn upsert(&self, config: &GuildConfig) -> RepoResult<()>;

    /// Persist lazily-created webhook credentials
    async fn set_webhook(
        &self,
        guild_id: Snowflake,
        webhook_id: Snowflake,
        webhook_token: &str,
    ) -> RepoResult<()>;
}

// ============================================================================
// Ban Repository
// ============================================================================

#[async_trait]
pub trait BanRepository: Send + Sync {
    /// Find the current ban ledger entry for a user, expired or not
    async fn find(&self, guild_id: Snowflake, user_id: Snowflake) -> RepoResult<Option<Ban>>;

    /// Create or replace the ledger entry. History folding happens in the
    /// service layer before the write.
    async fn upsert(&self, ban: &Ban) -> RepoResult<()>;
}
