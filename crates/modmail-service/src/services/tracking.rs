//! Message tracking store
//!
//! The unit all relay synchronization reads and writes through: an
//! append-only log of relayed messages embedded in the conversation, with
//! edit/delete shadow state. Every write invalidates the per-user cache
//! entry before returning so a stale read can never resurrect old state.

use tracing::{instrument, warn};

use modmail_core::{Conversation, MessageKind, Snowflake, TrackedMessage};

use super::context::ServiceContext;
use super::error::{ServiceError, ServiceResult};

/// Message tracking service
pub struct MessageTracker<'a> {
    ctx: &'a ServiceContext,
}

impl<'a> MessageTracker<'a> {
    /// Create a new MessageTracker
    pub fn new(ctx: &'a ServiceContext) -> Self {
        Self { ctx }
    }

    /// Load a user's conversation through the cache
    pub async fn load_conversation(&self, user_id: Snowflake) -> ServiceResult<Option<Conversation>> {
        if let Some(cache) = self.ctx.conversation_cache() {
            match cache.get(user_id).await {
                Ok(Some(conversation)) => return Ok(Some(conversation)),
                Ok(None) => {}
                Err(e) => warn!(%user_id, error = %e, "Conversation cache read failed"),
            }
        }

        let conversation = self.ctx.conversation_repo().find_by_user(user_id).await?;

        if let (Some(cache), Some(conversation)) = (self.ctx.conversation_cache(), &conversation) {
            if let Err(e) = cache.put(conversation).await {
                warn!(%user_id, error = %e, "Conversation cache write failed");
            }
        }

        Ok(conversation)
    }

    /// Drop the cached entry before a write lands
    async fn invalidate(&self, user_id: Snowflake) {
        if let Some(cache) = self.ctx.conversation_cache() {
            if let Err(e) = cache.invalidate(user_id).await {
                warn!(%user_id, error = %e, "Conversation cache invalidation failed");
            }
        }
    }

    /// Append a relayed message to the conversation's log
    #[instrument(skip(self, message))]
    pub async fn append(&self, user_id: Snowflake, message: &TrackedMessage) -> ServiceResult<()> {
        self.invalidate(user_id).await;
        self.ctx
            .conversation_repo()
            .append_message(user_id, message)
            .await?;
        Ok(())
    }

    /// Find a tracked message by any of its platform-side IDs
    #[instrument(skip(self))]
    pub async fn find_by_source_id(
        &self,
        user_id: Snowflake,
        platform_id: Snowflake,
    ) -> ServiceResult<Option<TrackedMessage>> {
        let Some(conversation) = self.load_conversation(user_id).await? else {
            return Ok(None);
        };
        Ok(conversation
            .find_message_by_platform_id(platform_id)
            .cloned())
    }

    /// Apply an edit to the tracked message and persist the shadow state.
    /// Returns the updated message.
    #[instrument(skip(self, new_content))]
    pub async fn mark_edited(
        &self,
        user_id: Snowflake,
        platform_id: Snowflake,
        new_content: String,
        editor: Snowflake,
    ) -> ServiceResult<TrackedMessage> {
        let mut conversation = self
            .load_conversation(user_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Conversation", user_id.to_string()))?;

        let message = conversation
            .find_message_by_platform_id_mut(platform_id)
            .ok_or_else(|| ServiceError::not_found("Message", platform_id.to_string()))?;
        message.apply_edit(new_content, editor);
        let updated = message.clone();

        self.invalidate(user_id).await;
        self.ctx
            .conversation_repo()
            .update_message(user_id, &updated)
            .await?;
        Ok(updated)
    }

    /// Apply a delete to the tracked message and persist the shadow state.
    /// Returns the updated message.
    #[instrument(skip(self))]
    pub async fn mark_deleted(
        &self,
        user_id: Snowflake,
        platform_id: Snowflake,
        deleter: Snowflake,
    ) -> ServiceResult<TrackedMessage> {
        let mut conversation = self
            .load_conversation(user_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Conversation", user_id.to_string()))?;

        let message = conversation
            .find_message_by_platform_id_mut(platform_id)
            .ok_or_else(|| ServiceError::not_found("Message", platform_id.to_string()))?;
        message.apply_delete(deleter);
        let updated = message.clone();

        self.invalidate(user_id).await;
        self.ctx
            .conversation_repo()
            .update_message(user_id, &updated)
            .await?;
        Ok(updated)
    }

    /// The newest tracked messages for a user, optionally filtered by kind
    #[instrument(skip(self))]
    pub async fn recent_messages(
        &self,
        user_id: Snowflake,
        limit: usize,
        kind: Option<MessageKind>,
    ) -> ServiceResult<Vec<TrackedMessage>> {
        let Some(conversation) = self.load_conversation(user_id).await? else {
            return Ok(Vec::new());
        };
        Ok(conversation
            .recent_messages(limit, kind)
            .into_iter()
            .cloned()
            .collect())
    }

    /// Case-insensitive substring search over the user's message log
    #[instrument(skip(self))]
    pub async fn search(
        &self,
        user_id: Snowflake,
        term: &str,
        limit: usize,
    ) -> ServiceResult<Vec<TrackedMessage>> {
        let Some(conversation) = self.load_conversation(user_id).await? else {
            return Ok(Vec::new());
        };
        let needle = term.to_lowercase();
        Ok(conversation
            .messages
            .iter()
            .rev()
            .filter(|m| m.current_content().to_lowercase().contains(&needle))
            .take(limit)
            .cloned()
            .collect())
    }
}
