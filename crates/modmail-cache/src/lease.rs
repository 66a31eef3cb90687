//! Scheduler lease - single-owner election for the inactivity sweep
//!
//! A short-TTL Redis key acts as the lease. The holder refreshes it on a
//! heartbeat interval shorter than the TTL, so ownership only moves when the
//! holder actually stops. A second process that fails to acquire simply
//! backs off until the next tick.

use crate::pool::{RedisPool, RedisResult};
use tracing::{debug, info, warn};

/// Lease key
const LEASE_KEY: &str = "modmail:scheduler:lease";

/// Timestamp of the last completed sweep, for observability
const LAST_CHECK_KEY: &str = "modmail:scheduler:last_check";

/// Default lease TTL in seconds
const DEFAULT_LEASE_TTL: u64 = 90;

/// Scheduler lease backed by Redis
#[derive(Clone)]
pub struct SchedulerLease {
    pool: RedisPool,
    node_id: String,
    ttl_seconds: u64,
}

impl SchedulerLease {
    /// Create a lease handle for this process
    pub fn new(pool: RedisPool, node_id: impl Into<String>) -> Self {
        Self {
            pool,
            node_id: node_id.into(),
            ttl_seconds: DEFAULT_LEASE_TTL,
        }
    }

    /// Create with a custom TTL (testing)
    pub fn with_ttl(pool: RedisPool, node_id: impl Into<String>, ttl_seconds: u64) -> Self {
        Self {
            pool,
            node_id: node_id.into(),
            ttl_seconds,
        }
    }

    /// The heartbeat interval the holder should refresh on. Kept well under
    /// the TTL to avoid false takeover during normal operation.
    pub fn heartbeat_seconds(&self) -> u64 {
        (self.ttl_seconds / 3).max(1)
    }

    /// Try to acquire or confirm the lease. Returns true if this node holds
    /// it after the call.
    pub async fn try_acquire(&self) -> RedisResult<bool> {
        if self
            .pool
            .set_nx_ex(LEASE_KEY, &self.node_id, self.ttl_seconds)
            .await?
        {
            info!(node_id = %self.node_id, "Acquired scheduler lease");
            return Ok(true);
        }

        // Key exists: we still hold it if it carries our node id.
        let holder = self.pool.get_string(LEASE_KEY).await?;
        Ok(holder.as_deref() == Some(self.node_id.as_str()))
    }

    /// Refresh the lease TTL if we still hold it. Returns false when
    /// ownership was lost.
    pub async fn refresh(&self) -> RedisResult<bool> {
        let holder = self.pool.get_string(LEASE_KEY).await?;
        if holder.as_deref() != Some(self.node_id.as_str()) {
            warn!(node_id = %self.node_id, "Scheduler lease lost");
            return Ok(false);
        }
        self.pool.expire(LEASE_KEY, self.ttl_seconds).await?;
        debug!(node_id = %self.node_id, "Scheduler lease refreshed");
        Ok(true)
    }

    /// Release on clean shutdown so the next owner takes over immediately
    /// instead of waiting out the TTL.
    pub async fn release(&self) -> RedisResult<()> {
        let holder = self.pool.get_string(LEASE_KEY).await?;
        if holder.as_deref() == Some(self.node_id.as_str()) {
            self.pool.delete(LEASE_KEY).await?;
            info!(node_id = %self.node_id, "Released scheduler lease");
        }
        Ok(())
    }

    /// Record the completion time of a sweep
    pub async fn record_sweep(&self) -> RedisResult<()> {
        let now = chrono::Utc::now().to_rfc3339();
        self.pool.set(LAST_CHECK_KEY, &now, None).await
    }

    /// When the last sweep completed, if known
    pub async fn last_sweep(&self) -> RedisResult<Option<String>> {
        self.pool.get_value(LAST_CHECK_KEY).await
    }
}
