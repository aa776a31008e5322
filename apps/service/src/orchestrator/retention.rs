//! Automatic retention and cleanup of probe attempts.
//!
//! The attempt log only feeds the recent-history slots and the events feed,
//! so it is kept short: attempts older than `max_age` (30 minutes by default)
//! are swept every `sweep_interval` (30 seconds by default).

use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::RetentionConfig;
use crate::database::Database;
use crate::database::models::unix_now;

/// Retention policy for the attempt log
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetentionPolicy {
    /// Attempts older than this are deleted
    pub max_age: Duration,
    /// Time between sweeps
    pub sweep_interval: Duration,
}

impl Default for RetentionPolicy {
    fn default() -> Self {
        Self::from_config(&RetentionConfig::default())
    }
}

impl RetentionPolicy {
    pub fn from_config(config: &RetentionConfig) -> Self {
        Self {
            max_age: Duration::from_secs(config.max_age_secs),
            sweep_interval: Duration::from_secs(config.sweep_interval_secs.max(1)),
        }
    }

    /// Unix time before which attempts are expired
    fn cutoff(&self, now: i64) -> i64 {
        now - self.max_age.as_secs() as i64
    }
}

/// Cleanup manager for expired attempts
pub struct RetentionCleanup {
    database: Arc<dyn Database>,
    policy: RetentionPolicy,
}

impl RetentionCleanup {
    /// Create a new retention cleanup manager
    pub fn new(database: Arc<dyn Database>, policy: RetentionPolicy) -> Self {
        Self { database, policy }
    }

    /// Delete expired attempts, returning how many were removed
    pub async fn cleanup_expired_attempts(&self) -> Result<u64> {
        let cutoff = self.policy.cutoff(unix_now());
        let deleted = self.database.prune_attempts(cutoff).await?;
        debug!(cutoff, deleted, "Pruned expired attempts");
        Ok(deleted)
    }

    /// Start the background sweep; it stops when `cancel` fires
    pub fn start_periodic_cleanup(self, cancel: CancellationToken) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            info!(
                max_age_secs = self.policy.max_age.as_secs(),
                sweep_interval_secs = self.policy.sweep_interval.as_secs(),
                "Retention cleanup started"
            );
            let mut interval = tokio::time::interval(self.policy.sweep_interval);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = interval.tick() => {}
                }

                match self.cleanup_expired_attempts().await {
                    Ok(0) => {}
                    Ok(count) => info!("Retention cleanup removed {} attempts", count),
                    Err(e) => warn!("Retention cleanup failed: {}", e),
                }
            }

            debug!("Retention cleanup stopped");
        })
    }
}
