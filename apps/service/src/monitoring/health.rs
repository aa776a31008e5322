//! Consecutive-failure tracking with hysteresis.
//!
//! A monitor only alerts once it has failed `threshold` probes in a row, and
//! only recovers (with a recovery alert) when a healthy probe arrives after
//! such a streak. Long outages wrap the counter back to 1 once it passes
//! `3 × threshold`, so the failure alert repeats at most once per
//! `3 × threshold` probes.

use serde::Serialize;

/// Which alert a transition asks for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertKind {
    Failure,
    Recovery,
}

/// Result of feeding one probe into the state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    /// Counter value to persist
    pub failed_attempts: u32,
    pub alert: Option<AlertKind>,
}

/// Apply one probe outcome to the failure counter.
///
/// The failure alert fires only when the counter lands exactly on
/// `threshold`; a counter that steps over it does not alert.
pub fn evaluate(failed_attempts: u32, threshold: u32, healthy: bool) -> Transition {
    let threshold = threshold.max(1);
    let mut failed_attempts = failed_attempts;
    let mut alert = None;

    if !healthy {
        failed_attempts = failed_attempts.saturating_add(1);
    }

    if healthy && failed_attempts >= threshold {
        alert = Some(AlertKind::Recovery);
        failed_attempts = 0;
    }

    if !healthy && failed_attempts > threshold.saturating_mul(3) {
        failed_attempts = 1;
    }

    if !healthy && failed_attempts == threshold {
        alert = Some(AlertKind::Failure);
    }

    Transition { failed_attempts, alert }
}
