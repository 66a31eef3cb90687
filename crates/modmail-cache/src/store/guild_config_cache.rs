//! Guild config cache store
//!
//! Configs are read on nearly every modmail operation but change only via
//! the setup command, so a short TTL in front of the document store removes
//! most reads. Writers call `invalidate` after persisting.

use crate::pool::{RedisPool, RedisResult};
use modmail_core::{GuildConfig, Snowflake};

/// Key prefix for cached guild configs
const CONFIG_PREFIX: &str = "modmail:config:";

/// Default TTL for cached configs (5 minutes)
const DEFAULT_CONFIG_TTL: u64 = 300;

/// Read-through cache for guild configs
#[derive(Clone)]
pub struct GuildConfigCacheStore {
    pool: RedisPool,
    ttl_seconds: u64,
}

impl GuildConfigCacheStore {
    /// Create a new config cache store
    #[must_use]
    pub fn new(pool: RedisPool) -> Self {
        Self {
            pool,
            ttl_seconds: DEFAULT_CONFIG_TTL,
        }
    }

    /// Create with custom TTL
    #[must_use]
    pub fn with_ttl(pool: RedisPool, ttl_seconds: u64) -> Self {
        Self { pool, ttl_seconds }
    }

    /// Generate the cache key for a guild
    fn key(guild_id: Snowflake) -> String {
        format!("{CONFIG_PREFIX}{guild_id}")
    }

    /// Get a cached config
    pub async fn get(&self, guild_id: Snowflake) -> RedisResult<Option<GuildConfig>> {
        self.pool.get_value(&Self::key(guild_id)).await
    }

    /// Cache a config
    pub async fn put(&self, config: &GuildConfig) -> RedisResult<()> {
        self.pool
            .set(&Self::key(config.guild_id), config, Some(self.ttl_seconds))
            .await
    }

    /// Drop the cached entry after a config write
    pub async fn invalidate(&self, guild_id: Snowflake) -> RedisResult<bool> {
        self.pool.delete(&Self::key(guild_id)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_generation() {
        let key = GuildConfigCacheStore::key(Snowflake::new(42));
        assert_eq!(key, "modmail:config:42");
    }
}
