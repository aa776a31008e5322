use serde::{Deserialize, Serialize};

use crate::database::models::{Monitor, NewAttempt};

/// Diagnostic recorded when a probe runs out of time. Kept apart from other
/// transport errors so operators can tell a slow target from a dead one.
pub const DEADLINE_EXCEEDED: &str = "request timeout exceeded";

/// Stored response bodies are cut to this many bytes.
pub const MAX_RESPONSE_BYTES: usize = 16 * 1024;

/// Display status of a monitor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MonitorStatus {
    Up,
    Down,
    Paused,
}

impl MonitorStatus {
    pub fn of(monitor: &Monitor) -> Self {
        if !monitor.enabled {
            MonitorStatus::Paused
        } else if monitor.healthy {
            MonitorStatus::Up
        } else {
            MonitorStatus::Down
        }
    }
}

impl std::fmt::Display for MonitorStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MonitorStatus::Up => f.pad("up"),
            MonitorStatus::Down => f.pad("down"),
            MonitorStatus::Paused => f.pad("paused"),
        }
    }
}

/// Classified result of a single probe
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProbeOutcome {
    pub healthy: bool,
    /// 0 when no response was obtained
    pub status_code: u16,
    /// Response body, or a diagnostic when the request failed
    pub response: String,
    pub latency_ms: u64,
}

impl ProbeOutcome {
    /// A response arrived; only 2xx counts as healthy.
    pub fn from_response(status_code: u16, body: String, latency_ms: u64) -> Self {
        Self {
            healthy: (200..300).contains(&status_code),
            status_code,
            response: truncate(body),
            latency_ms,
        }
    }

    /// No response was obtained.
    pub fn failure(diagnostic: impl Into<String>, latency_ms: u64) -> Self {
        Self { healthy: false, status_code: 0, response: diagnostic.into(), latency_ms }
    }

    pub fn to_attempt(&self, monitor_id: i64, created_at: i64) -> NewAttempt {
        NewAttempt {
            monitor_id,
            healthy: self.healthy,
            status_code: self.status_code,
            response: self.response.clone(),
            latency_ms: self.latency_ms,
            created_at,
        }
    }
}

fn truncate(mut body: String) -> String {
    if body.len() > MAX_RESPONSE_BYTES {
        let mut cut = MAX_RESPONSE_BYTES;
        while !body.is_char_boundary(cut) {
            cut -= 1;
        }
        body.truncate(cut);
    }
    body
}
