//! # modmail-cache
//!
//! Redis caching layer: read-through caches for guild configs and
//! conversations, plus the scheduler lease that keeps inactivity processing
//! on a single bot instance.

pub mod lease;
pub mod pool;
pub mod store;

// Re-export pool types
pub use pool::{
    create_shared_pool, RedisPool, RedisPoolConfig, RedisPoolError, RedisResult, SharedRedisPool,
};

// Re-export stores
pub use lease::SchedulerLease;
pub use store::{ConversationCacheStore, GuildConfigCacheStore};
