//! Value objects - immutable domain primitives

mod channel;
mod snowflake;

pub use channel::ChannelCapability;
pub use snowflake::{Snowflake, SnowflakeGenerator, SnowflakeParseError};
