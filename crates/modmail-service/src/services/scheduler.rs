//! Inactivity scheduler
//!
//! A fixed-interval poller owned by a single logical instance: a Redis lease
//! with a heartbeat shorter than its TTL keeps a second process backing off
//! instead of double-processing. Each sweep re-validates the one-time legacy
//! backfill, warns conversations past the guild's warning threshold and
//! auto-closes those whose warning has aged past the auto-close threshold.
//! The conditional warning write makes overlapping sweeps idempotent.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration as StdDuration;

use chrono::{DateTime, Duration, Utc};
use tracing::{error, info, instrument, warn};

use modmail_cache::SchedulerLease;
use modmail_common::SchedulerConfig;
use modmail_core::{Conversation, GuildConfig, OutboundMessage, Snowflake};

use super::config::ConfigService;
use super::context::ServiceContext;
use super::error::ServiceResult;
use super::lifecycle::LifecycleService;

/// Close reason used for scheduler-driven closes
const INACTIVITY_REASON: &str = "inactivity";

/// Close reason when a resolved conversation reaches its scheduled close
const RESOLVED_REASON: &str = "resolved";

/// Warning threshold in testing mode (one minute)
const TESTING_WARNING_HOURS: f64 = 1.0 / 60.0;

/// Auto-close threshold in testing mode (two minutes)
const TESTING_AUTO_CLOSE_HOURS: f64 = 2.0 / 60.0;

/// Outcome of one sweep, for observability and tests
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SweepStats {
    pub warned: usize,
    pub closed: usize,
    pub exempt: usize,
}

/// Inactivity scheduler
pub struct InactivityScheduler {
    ctx: ServiceContext,
    config: SchedulerConfig,
    lease: Option<SchedulerLease>,
    backfill_done: AtomicBool,
}

impl InactivityScheduler {
    /// Create a new scheduler. Pass `None` for the lease only when the
    /// process is known to be the sole instance (tests).
    pub fn new(ctx: ServiceContext, config: SchedulerConfig, lease: Option<SchedulerLease>) -> Self {
        Self {
            ctx,
            config,
            lease,
            backfill_done: AtomicBool::new(false),
        }
    }

    /// Run the tick loop forever. The caller decides when to stop (select
    /// against shutdown) and should call [`Self::shutdown`] afterwards so
    /// the lease moves on immediately.
    pub async fn run(&self) {
        let mut tick = tokio::time::interval(StdDuration::from_secs(self.config.tick_seconds.max(1)));
        let heartbeat_secs = self
            .lease
            .as_ref()
            .map_or(30, SchedulerLease::heartbeat_seconds);
        let mut heartbeat = tokio::time::interval(StdDuration::from_secs(heartbeat_secs));
        let mut owner = self.lease.is_none();

        info!(
            tick_seconds = self.config.tick_seconds,
            testing_mode = self.config.testing_mode,
            "Inactivity scheduler started"
        );

        loop {
            tokio::select! {
                _ = tick.tick() => {
                    if let Some(lease) = &self.lease {
                        owner = match lease.try_acquire().await {
                            Ok(acquired) => acquired,
                            Err(e) => {
                                warn!(error = %e, "Scheduler lease acquisition failed");
                                false
                            }
                        };
                        if !owner {
                            continue;
                        }
                    }

                    match self.sweep_once(Utc::now()).await {
                        Ok(stats) => {
                            if stats.warned > 0 || stats.closed > 0 {
                                info!(warned = stats.warned, closed = stats.closed, "Inactivity sweep done");
                            }
                        }
                        Err(e) => error!(error = %e, "Inactivity sweep failed"),
                    }

                    if let Some(lease) = &self.lease {
                        if let Err(e) = lease.record_sweep().await {
                            warn!(error = %e, "Sweep timestamp write failed");
                        }
                    }
                }
                _ = heartbeat.tick(), if owner && self.lease.is_some() => {
                    if let Some(lease) = &self.lease {
                        match lease.refresh().await {
                            Ok(still_owner) => owner = still_owner,
                            Err(e) => warn!(error = %e, "Scheduler lease refresh failed"),
                        }
                    }
                }
            }
        }
    }

    /// Release the lease on clean shutdown
    pub async fn shutdown(&self) {
        if let Some(lease) = &self.lease {
            if let Err(e) = lease.release().await {
                warn!(error = %e, "Scheduler lease release failed");
            }
        }
    }

    /// One full sweep over every open conversation. Per-conversation
    /// failures are logged and skipped; one broken row must not stall the
    /// rest.
    #[instrument(skip(self))]
    pub async fn sweep_once(&self, now: DateTime<Utc>) -> ServiceResult<SweepStats> {
        self.run_backfill_once().await;

        let conversations = self.ctx.conversation_repo().find_all_open().await?;
        let config_service = ConfigService::new(&self.ctx);
        let mut stats = SweepStats::default();

        for conversation in conversations {
            if conversation.auto_close_disabled {
                stats.exempt += 1;
                continue;
            }

            let guild_config = match config_service.get(conversation.guild_id).await {
                Ok(config) => config,
                Err(e) => {
                    warn!(guild_id = %conversation.guild_id, error = %e, "Config load failed in sweep");
                    None
                }
            };
            let (warn_hours, close_hours) = self.thresholds(guild_config.as_ref());

            match self
                .evaluate(&conversation, now, warn_hours, close_hours)
                .await
            {
                Ok(Action::Warned) => stats.warned += 1,
                Ok(Action::Closed) => stats.closed += 1,
                Ok(Action::None) => {}
                Err(e) => {
                    warn!(
                        user_id = %conversation.user_id,
                        error = %e,
                        "Inactivity evaluation failed for conversation"
                    );
                }
            }
        }

        Ok(stats)
    }

    /// Effective thresholds in hours, honouring testing mode
    fn thresholds(&self, config: Option<&GuildConfig>) -> (f64, f64) {
        if self.config.testing_mode {
            return (TESTING_WARNING_HOURS, TESTING_AUTO_CLOSE_HOURS);
        }
        match config {
            Some(c) => (c.inactivity_warning_hours as f64, c.auto_close_hours as f64),
            None => (
                modmail_core::entities::DEFAULT_INACTIVITY_WARNING_HOURS as f64,
                modmail_core::entities::DEFAULT_AUTO_CLOSE_HOURS as f64,
            ),
        }
    }

    async fn evaluate(
        &self,
        conversation: &Conversation,
        now: DateTime<Utc>,
        warn_hours: f64,
        close_hours: f64,
    ) -> ServiceResult<Action> {
        // A resolved conversation closes at its scheduled time and never
        // takes the inactivity warning path; the user already got the
        // resolve notice with its own close-now/need-help buttons.
        if conversation.marked_resolved {
            if conversation
                .auto_close_scheduled_at
                .is_some_and(|at| at <= now)
            {
                let lifecycle = LifecycleService::new(&self.ctx);
                lifecycle.close(conversation.user_id, RESOLVED_REASON).await?;
                return Ok(Action::Closed);
            }
            return Ok(Action::None);
        }

        if conversation.inactivity_notification_sent.is_none() {
            if conversation.hours_since_user_activity(now) < warn_hours {
                return Ok(Action::None);
            }

            let auto_close_at = now + Duration::seconds((close_hours * 3600.0) as i64);
            if let Some(cache) = self.ctx.conversation_cache() {
                if let Err(e) = cache.invalidate(conversation.user_id).await {
                    warn!(user_id = %conversation.user_id, error = %e, "Cache invalidation failed");
                }
            }
            let won = self
                .ctx
                .conversation_repo()
                .try_mark_inactivity_notified(conversation.user_id, now, auto_close_at)
                .await?;
            if !won {
                // Another sweep already warned this conversation
                return Ok(Action::None);
            }

            self.send_warning(conversation).await;
            return Ok(Action::Warned);
        }

        if conversation
            .hours_since_warning(now)
            .is_some_and(|elapsed| elapsed >= close_hours)
        {
            let lifecycle = LifecycleService::new(&self.ctx);
            lifecycle
                .close(conversation.user_id, INACTIVITY_REASON)
                .await?;
            return Ok(Action::Closed);
        }

        Ok(Action::None)
    }

    /// Warn both sides, best-effort
    async fn send_warning(&self, conversation: &Conversation) {
        let user_notice = OutboundMessage::text(
            "This conversation has been quiet for a while. It will close automatically \
             unless you reply; you can also close it now.",
        )
        .with_button("modmail_close_now", "Close now");
        if let Err(e) = self.send_dm(conversation.user_id, &user_notice).await {
            warn!(user_id = %conversation.user_id, error = %e, "Inactivity warning DM failed");
        }

        let thread_notice =
            OutboundMessage::text("No user activity for a while; this conversation will auto-close soon.");
        if let Err(e) = self
            .ctx
            .gateway()
            .send_message(conversation.thread_id, &thread_notice)
            .await
        {
            warn!(thread_id = %conversation.thread_id, error = %e, "Inactivity warning thread notice failed");
        }
    }

    async fn send_dm(
        &self,
        user_id: Snowflake,
        message: &OutboundMessage,
    ) -> Result<(), modmail_core::PlatformError> {
        let channel_id = self.ctx.gateway().create_dm_channel(user_id).await?;
        self.ctx.gateway().send_message(channel_id, message).await?;
        Ok(())
    }

    /// Idempotent legacy-field backfill; attempted once per process lifetime
    async fn run_backfill_once(&self) {
        if self.backfill_done.swap(true, Ordering::SeqCst) {
            return;
        }
        match self.ctx.conversation_repo().backfill_activity_fields().await {
            Ok(0) => {}
            Ok(touched) => info!(touched, "Backfilled legacy activity fields"),
            Err(e) => {
                // Try again on the next sweep rather than running with
                // rows the thresholds cannot evaluate
                error!(error = %e, "Activity field backfill failed");
                self.backfill_done.store(false, Ordering::SeqCst);
            }
        }
    }
}

/// What the sweep did with one conversation
enum Action {
    None,
    Warned,
    Closed,
}
