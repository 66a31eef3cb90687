//! Guild config database model

use sqlx::FromRow;

use modmail_core::{GuildConfig, Snowflake};

/// Database model for the modmail_guild_configs table
#[derive(Debug, Clone, FromRow)]
pub struct GuildConfigModel {
    pub guild_id: i64,
    pub forum_channel_id: i64,
    pub staff_role_id: i64,
    pub webhook_id: Option<i64>,
    pub webhook_token: Option<String>,
    pub inactivity_warning_hours: i64,
    pub auto_close_hours: i64,
}

impl From<GuildConfigModel> for GuildConfig {
    fn from(model: GuildConfigModel) -> Self {
        GuildConfig {
            guild_id: Snowflake::new(model.guild_id),
            forum_channel_id: Snowflake::new(model.forum_channel_id),
            staff_role_id: Snowflake::new(model.staff_role_id),
            webhook_id: model.webhook_id.map(Snowflake::new),
            webhook_token: model.webhook_token,
            inactivity_warning_hours: model.inactivity_warning_hours,
            auto_close_hours: model.auto_close_hours,
        }
    }
}
