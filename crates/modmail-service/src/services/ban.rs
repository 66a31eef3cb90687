//! Ban ledger service
//!
//! Bans are evaluated lazily: there is no background expiry job, a ban whose
//! `expires_at` has passed is simply inactive at check time. Banning an
//! already-banned user folds the prior record into the new one's history.

use chrono::Utc;
use tracing::{info, instrument};

use modmail_core::{Ban, Snowflake};

use super::context::ServiceContext;
use super::error::{ServiceError, ServiceResult};

/// Ban service
pub struct BanService<'a> {
    ctx: &'a ServiceContext,
}

impl<'a> BanService<'a> {
    /// Create a new BanService
    pub fn new(ctx: &'a ServiceContext) -> Self {
        Self { ctx }
    }

    /// The user's active ban, if any. Expired entries stay in the ledger but
    /// are not returned.
    #[instrument(skip(self))]
    pub async fn active_ban(
        &self,
        guild_id: Snowflake,
        user_id: Snowflake,
    ) -> ServiceResult<Option<Ban>> {
        let ban = self.ctx.ban_repo().find(guild_id, user_id).await?;
        Ok(ban.filter(|b| b.is_active(Utc::now())))
    }

    /// Whether the user is currently banned
    pub async fn is_banned(&self, guild_id: Snowflake, user_id: Snowflake) -> ServiceResult<bool> {
        Ok(self.active_ban(guild_id, user_id).await?.is_some())
    }

    /// Write a ban, folding any existing ledger entry (active or expired)
    /// into the new one's history. The new ban's own fields reflect only
    /// this request.
    #[instrument(skip(self, reason))]
    pub async fn ban(
        &self,
        guild_id: Snowflake,
        user_id: Snowflake,
        banned_by: Snowflake,
        reason: &str,
        duration_hours: Option<i64>,
    ) -> ServiceResult<Ban> {
        let mut ban = match duration_hours {
            Some(hours) if hours <= 0 => {
                return Err(ServiceError::validation(format!(
                    "ban duration must be positive, got {hours}h"
                )))
            }
            Some(hours) => Ban::temporary(guild_id, user_id, banned_by, reason, hours),
            None => Ban::permanent(guild_id, user_id, banned_by, reason),
        };

        if let Some(previous) = self.ctx.ban_repo().find(guild_id, user_id).await? {
            ban = ban.stack_onto(previous);
        }

        self.ctx.ban_repo().upsert(&ban).await?;
        info!(%guild_id, %user_id, %banned_by, permanent = ban.permanent, "User banned");
        Ok(ban)
    }
}

/// Parse a ban duration argument: `30m`, `12h`, `7d`, `2w`, or
/// `permanent`/`perm` for no expiry. Returns hours.
pub fn parse_duration(input: &str) -> ServiceResult<Option<i64>> {
    let input = input.trim().to_lowercase();
    if input == "permanent" || input == "perm" {
        return Ok(None);
    }

    // The unit is the last char; split on its boundary, not the last byte
    let Some(unit) = input.chars().last() else {
        return Err(ServiceError::validation("ban duration is empty"));
    };
    let value = &input[..input.len() - unit.len_utf8()];
    let amount: i64 = value
        .parse()
        .map_err(|_| ServiceError::validation(format!("invalid ban duration: {input}")))?;
    if amount <= 0 {
        return Err(ServiceError::validation(format!(
            "invalid ban duration: {input}"
        )));
    }

    let hours = match unit {
        'm' => (amount + 59) / 60,
        'h' => amount,
        'd' => amount * 24,
        'w' => amount * 24 * 7,
        _ => {
            return Err(ServiceError::validation(format!(
                "invalid ban duration unit: {input}"
            )))
        }
    };
    Ok(Some(hours))
}
