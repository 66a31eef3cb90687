//! Ban entity - modmail ban ledger entry with one level of history
//!
//! Bans are never mutated by the conversation-creation check and there is no
//! background expiry job: a ban whose `expires_at` is in the past is simply
//! inactive when evaluated.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::value_objects::Snowflake;

/// A prior ban, folded verbatim into the current ban's history.
///
/// Deliberately excludes `previous_bans` so history nests exactly one level.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BanRecord {
    pub banned_by: Snowflake,
    pub reason: String,
    pub permanent: bool,
    pub duration_hours: Option<i64>,
    pub expires_at: Option<DateTime<Utc>>,
    pub banned_at: DateTime<Utc>,
}

/// The active ban ledger entry for a user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ban {
    pub guild_id: Snowflake,
    pub user_id: Snowflake,
    pub banned_by: Snowflake,
    pub reason: String,
    pub permanent: bool,
    pub duration_hours: Option<i64>,
    pub expires_at: Option<DateTime<Utc>>,
    pub banned_at: DateTime<Utc>,
    pub previous_bans: Vec<BanRecord>,
}

impl Ban {
    /// Create a permanent ban
    pub fn permanent(
        guild_id: Snowflake,
        user_id: Snowflake,
        banned_by: Snowflake,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            guild_id,
            user_id,
            banned_by,
            reason: reason.into(),
            permanent: true,
            duration_hours: None,
            expires_at: None,
            banned_at: Utc::now(),
            previous_bans: Vec::new(),
        }
    }

    /// Create a temporary ban lasting `duration_hours`
    pub fn temporary(
        guild_id: Snowflake,
        user_id: Snowflake,
        banned_by: Snowflake,
        reason: impl Into<String>,
        duration_hours: i64,
    ) -> Self {
        let now = Utc::now();
        Self {
            guild_id,
            user_id,
            banned_by,
            reason: reason.into(),
            permanent: false,
            duration_hours: Some(duration_hours),
            expires_at: Some(now + Duration::hours(duration_hours)),
            banned_at: now,
            previous_bans: Vec::new(),
        }
    }

    /// Whether the ban is active at `now`. Permanent bans never expire;
    /// temporary bans lapse once `expires_at` passes.
    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        if self.permanent {
            return true;
        }
        self.expires_at.is_some_and(|at| at > now)
    }

    /// Fold an existing ban into this one's history.
    ///
    /// The prior ban's own history is carried over flat, so nesting stays one
    /// level deep and this ban's fields reflect only the new request.
    pub fn stack_onto(mut self, previous: Ban) -> Self {
        let Ban {
            banned_by,
            reason,
            permanent,
            duration_hours,
            expires_at,
            banned_at,
            previous_bans,
            ..
        } = previous;

        self.previous_bans = previous_bans;
        self.previous_bans.push(BanRecord {
            banned_by,
            reason,
            permanent,
            duration_hours,
            expires_at,
            banned_at,
        });
        self
    }
}
