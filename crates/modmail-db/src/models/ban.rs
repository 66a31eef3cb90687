//! Ban database model

use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::FromRow;

use modmail_core::{Ban, BanRecord, DomainError, Snowflake};

/// Database model for the modmail_bans table
#[derive(Debug, Clone, FromRow)]
pub struct BanModel {
    pub guild_id: i64,
    pub user_id: i64,
    pub banned_by: i64,
    pub reason: String,
    pub permanent: bool,
    pub duration_hours: Option<i64>,
    pub expires_at: Option<DateTime<Utc>>,
    pub banned_at: DateTime<Utc>,
    pub previous_bans: Value,
}

impl TryFrom<BanModel> for Ban {
    type Error = DomainError;

    fn try_from(model: BanModel) -> Result<Self, Self::Error> {
        let previous_bans: Vec<BanRecord> = serde_json::from_value(model.previous_bans)
            .map_err(|e| DomainError::DatabaseError(format!("corrupt ban history: {e}")))?;

        Ok(Ban {
            guild_id: Snowflake::new(model.guild_id),
            user_id: Snowflake::new(model.user_id),
            banned_by: Snowflake::new(model.banned_by),
            reason: model.reason,
            permanent: model.permanent,
            duration_hours: model.duration_hours,
            expires_at: model.expires_at,
            banned_at: model.banned_at,
            previous_bans,
        })
    }
}
