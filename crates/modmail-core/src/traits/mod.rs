//! Ports - repository and platform gateway traits

mod gateway;
mod repositories;

pub use gateway::{
    GatewayResult, OutboundButton, OutboundEmbed, OutboundMessage, PlatformError, PlatformGateway,
    SentMessage, WebhookIdentity,
};
pub use repositories::{
    BanRepository, ConversationRepository, GuildConfigRepository, RepoResult,
};
