//! Fixed-width recent history for dashboards.
//!
//! Attempts are bucketed onto the monitor's own interval grid, most recent
//! bucket last. Nothing here is persisted; slots are rebuilt on every read.

use serde::{Deserialize, Serialize};

use crate::database::models::{Attempt, Monitor};
use crate::database::{Database, StoreError};

pub const TOTAL_SLOTS: usize = 25;

/// How far back (in intervals) attempts are loaded for rendering. A little
/// wider than the window so the oldest bucket is still filled after
/// quantisation.
const LOOKBACK_INTERVALS: i64 = 27;

/// One bucket of the history
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Slot {
    /// Attempt time in milliseconds, 0 when the bucket is empty
    pub timestamp: i64,
    pub healthy: bool,
    pub monitoring_enabled: bool,
}

/// Build the slot sequence from attempts, in the order given.
///
/// When several attempts fall into one bucket the last one in `attempts`
/// wins.
pub fn generate_slots(attempts: &[Attempt], interval_seconds: i64, now_ms: i64) -> Vec<Slot> {
    let mut slots = vec![Slot::default(); TOTAL_SLOTS];

    if interval_seconds <= 0 {
        return slots;
    }

    let interval_ms = interval_seconds.saturating_mul(1000);
    let reference = now_ms.div_euclid(interval_ms) * interval_ms;
    let last = TOTAL_SLOTS as i64 - 1;

    for attempt in attempts {
        let attempt_ms = attempt.created_at.saturating_mul(1000);
        let intervals_passed = (reference - attempt_ms).div_euclid(interval_ms);
        let index = last - intervals_passed;

        if (0..=last).contains(&index) {
            slots[index as usize] = Slot {
                timestamp: attempt_ms,
                healthy: attempt.healthy,
                monitoring_enabled: true,
            };
        }
    }

    slots
}

/// Load a monitor's recent attempts and render them.
pub async fn load_slots(
    database: &dyn Database,
    monitor: &Monitor,
    now_ms: i64,
) -> Result<Vec<Slot>, StoreError> {
    let interval = monitor.interval_seconds as i64;
    let since = now_ms.div_euclid(1000) - interval.saturating_mul(LOOKBACK_INTERVALS);

    let attempts = database
        .recent_attempts(monitor.id, since, TOTAL_SLOTS)
        .await?;

    Ok(generate_slots(&attempts, interval, now_ms))
}
