//! Conversation cache store
//!
//! Cache-aside entries keyed by user id (the conversation's identifying
//! field). Every conversation write invalidates the entry before the write
//! returns; a stale hit would otherwise resurrect a closed conversation.

use crate::pool::{RedisPool, RedisResult};
use modmail_core::{Conversation, Snowflake};

/// Key prefix for cached conversations
const CONVERSATION_PREFIX: &str = "modmail:conversation:";

/// Default TTL for cached conversations (60 seconds)
const DEFAULT_CONVERSATION_TTL: u64 = 60;

/// Cache-aside store for active conversations
#[derive(Clone)]
pub struct ConversationCacheStore {
    pool: RedisPool,
    ttl_seconds: u64,
}

impl ConversationCacheStore {
    /// Create a new conversation cache store
    #[must_use]
    pub fn new(pool: RedisPool) -> Self {
        Self {
            pool,
            ttl_seconds: DEFAULT_CONVERSATION_TTL,
        }
    }

    /// Create with custom TTL
    #[must_use]
    pub fn with_ttl(pool: RedisPool, ttl_seconds: u64) -> Self {
        Self { pool, ttl_seconds }
    }

    /// Generate the cache key for a user's conversation
    fn key(user_id: Snowflake) -> String {
        format!("{CONVERSATION_PREFIX}{user_id}")
    }

    /// Get a cached conversation
    pub async fn get(&self, user_id: Snowflake) -> RedisResult<Option<Conversation>> {
        self.pool.get_value(&Self::key(user_id)).await
    }

    /// Cache a conversation
    pub async fn put(&self, conversation: &Conversation) -> RedisResult<()> {
        self.pool
            .set(
                &Self::key(conversation.user_id),
                conversation,
                Some(self.ttl_seconds),
            )
            .await
    }

    /// Drop the cached entry. Called before every conversation write and on
    /// close, where it also covers the user-id-pattern invalidation.
    pub async fn invalidate(&self, user_id: Snowflake) -> RedisResult<bool> {
        self.pool.delete(&Self::key(user_id)).await
    }

    /// Drop every cache entry touching a user id (close path)
    pub async fn invalidate_user_pattern(&self, user_id: Snowflake) -> RedisResult<usize> {
        let pattern = format!("modmail:*{user_id}*");
        let keys = self.pool.scan_keys(&pattern, 100).await?;
        let mut removed = 0;
        for key in &keys {
            if self.pool.delete(key).await? {
                removed += 1;
            }
        }
        Ok(removed)
    }
}
