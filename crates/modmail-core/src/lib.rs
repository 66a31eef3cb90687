//! # modmail-core
//!
//! Domain layer containing entities, value objects, repository traits, and
//! the platform gateway port. This crate has zero dependencies on
//! infrastructure (database, Redis, HTTP client, etc.).

pub mod entities;
pub mod error;
pub mod events;
pub mod traits;
pub mod value_objects;

// Re-export commonly used types at crate root
pub use entities::{
    Ban, BanRecord, Conversation, GuildConfig, MessageKind, TrackedMessage,
};
pub use error::DomainError;
pub use events::PlatformEvent;
pub use traits::{
    BanRepository, ConversationRepository, GatewayResult, GuildConfigRepository, OutboundButton,
    OutboundEmbed, OutboundMessage, PlatformError, PlatformGateway, RepoResult, SentMessage,
    WebhookIdentity,
};
pub use value_objects::{
    ChannelCapability, Snowflake, SnowflakeGenerator, SnowflakeParseError,
};
