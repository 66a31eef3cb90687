//! PostgreSQL repository implementations

mod ban;
mod conversation;
mod error;
mod guild_config;

pub use ban::PgBanRepository;
pub use conversation::PgConversationRepository;
pub use guild_config::PgGuildConfigRepository;
