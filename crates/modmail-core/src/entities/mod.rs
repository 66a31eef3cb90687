//! Domain entities

mod ban;
mod conversation;
mod guild_config;
mod message;

pub use ban::{Ban, BanRecord};
pub use conversation::{Conversation, MESSAGE_RETENTION_CAP};
pub use guild_config::{GuildConfig, DEFAULT_AUTO_CLOSE_HOURS, DEFAULT_INACTIVITY_WARNING_HOURS};
pub use message::{MessageKind, TrackedMessage};
