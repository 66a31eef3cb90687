//! Cache-aside stores for read-mostly documents

mod conversation_cache;
mod guild_config_cache;

pub use conversation_cache::ConversationCacheStore;
pub use guild_config_cache::GuildConfigCacheStore;
