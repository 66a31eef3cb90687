//! Database models with SQLx `FromRow` derives

mod ban;
mod conversation;
mod guild_config;

pub use ban::BanModel;
pub use conversation::ConversationModel;
pub use guild_config::GuildConfigModel;
