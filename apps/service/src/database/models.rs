use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Current Unix time in seconds, the unit every stored timestamp uses.
pub fn unix_now() -> i64 {
    chrono::Utc::now().timestamp()
}

/// Current Unix time in milliseconds, used for slot rendering.
pub fn unix_now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Notification channel backing an integration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum IntegrationKind {
    Discord,
    Slack,
}

impl IntegrationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            IntegrationKind::Discord => "DISCORD",
            IntegrationKind::Slack => "SLACK",
        }
    }
}

impl fmt::Display for IntegrationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for IntegrationKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "DISCORD" => Ok(IntegrationKind::Discord),
            "SLACK" => Ok(IntegrationKind::Slack),
            other => Err(format!("unknown integration type '{other}'")),
        }
    }
}

/// Integration model - an external webhook alerts are delivered to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Integration {
    pub id: i64,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: IntegrationKind,
    pub url: String,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Monitor model - a probed endpoint plus its live scheduling and health fields
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Monitor {
    pub id: i64,
    pub name: String,
    pub url: String,
    pub method: String,
    pub interval_seconds: u64,
    pub threshold: u32,
    pub timeout_seconds: u64,
    pub enabled: bool,
    pub running: bool,
    pub healthy: bool,
    pub failed_attempts: u32,
    pub last_run: i64,
    pub created_at: i64,
    pub updated_at: i64,
    pub integrations: Vec<Integration>,
}

impl Monitor {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}

/// Payload for creating a monitor
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewMonitor {
    pub name: String,
    pub url: String,
    pub method: String,
    pub interval_seconds: u64,
    pub threshold: u32,
    pub timeout_seconds: u64,
    #[serde(default)]
    pub integration_ids: Vec<i64>,
}

/// Partial update of a monitor definition.
///
/// `None` means "leave untouched"; a present value is always applied, even
/// when it is falsy.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorPatch {
    pub name: Option<String>,
    pub url: Option<String>,
    pub method: Option<String>,
    pub interval_seconds: Option<u64>,
    pub threshold: Option<u32>,
    pub timeout_seconds: Option<u64>,
    pub enabled: Option<bool>,
    pub integration_ids: Option<Vec<i64>>,
}

impl MonitorPatch {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.url.is_none()
            && self.method.is_none()
            && self.interval_seconds.is_none()
            && self.threshold.is_none()
            && self.timeout_seconds.is_none()
            && self.enabled.is_none()
            && self.integration_ids.is_none()
    }
}

/// Payload for creating an integration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewIntegration {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: IntegrationKind,
    pub url: String,
}

/// Attempt model - one recorded probe outcome
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attempt {
    pub id: i64,
    pub monitor_id: i64,
    pub healthy: bool,
    /// 0 when no response was obtained
    pub status_code: u16,
    pub response: String,
    pub latency_ms: u64,
    pub created_at: i64,
}

/// Attempt about to be appended to the log
#[derive(Debug, Clone)]
pub struct NewAttempt {
    pub monitor_id: i64,
    pub healthy: bool,
    pub status_code: u16,
    pub response: String,
    pub latency_ms: u64,
    pub created_at: i64,
}

/// Unhealthy attempt joined with the name of its monitor, for the events feed
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttemptEvent {
    #[serde(flatten)]
    pub attempt: Attempt,
    pub monitor_name: String,
}

/// Fields written back once a probe has been evaluated
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FinalState {
    pub healthy: bool,
    pub failed_attempts: u32,
    pub last_run: i64,
}
