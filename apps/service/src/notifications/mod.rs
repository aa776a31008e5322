//! Outbound alert delivery.
//!
//! Each integration kind has one [`Notifier`] that renders an [`Alert`] into
//! the channel's webhook payload. The [`AlertDispatcher`] looks notifiers up
//! by kind, so adding a channel means registering another implementation.

pub mod discord;
pub mod slack;

pub use discord::DiscordNotifier;
pub use slack::SlackNotifier;

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::future::join_all;
use reqwest::{Client, StatusCode};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::database::models::{Integration, IntegrationKind};
use crate::monitoring::AlertKind;

/// Footer shown on every message
pub const FOOTER: &str = "🔧 Automatic monitor • Vigil";

/// Channel fields reject very long values; diagnostics are cut to this many
/// characters.
pub const MAX_ERROR_CHARS: usize = 1024;

#[derive(Error, Debug)]
pub enum NotifyError {
    #[error("webhook rejected the message with status {status}: {body}")]
    Rejected { status: u16, body: String },
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("no notifier registered for {0}")]
    Unsupported(IntegrationKind),
}

/// A health transition worth telling someone about
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Alert {
    pub kind: AlertKind,
    pub monitor_name: String,
    /// Consecutive failures at the time of the transition
    pub failed_attempts: u32,
    pub last_error: String,
    pub occurred_at: DateTime<Utc>,
}

impl Alert {
    pub fn new(
        kind: AlertKind,
        monitor_name: impl Into<String>,
        failed_attempts: u32,
        last_error: impl Into<String>,
    ) -> Self {
        let last_error: String = last_error.into();
        let last_error = match last_error.char_indices().nth(MAX_ERROR_CHARS) {
            Some((cut, _)) => last_error[..cut].to_string(),
            None => last_error,
        };

        Self {
            kind,
            monitor_name: monitor_name.into(),
            failed_attempts,
            last_error,
            occurred_at: Utc::now(),
        }
    }

    pub fn is_failure(&self) -> bool {
        self.kind == AlertKind::Failure
    }
}

/// Renders and delivers alerts for one kind of integration
#[async_trait]
pub trait Notifier: Send + Sync {
    fn kind(&self) -> IntegrationKind;

    /// Webhook body for `alert`
    fn render(&self, alert: &Alert) -> serde_json::Value;

    async fn send(&self, url: &str, alert: &Alert) -> Result<(), NotifyError>;
}

/// POST a JSON body; 200 and 204 count as delivered.
pub async fn post_json(
    client: &Client,
    url: &str,
    payload: &serde_json::Value,
) -> Result<(), NotifyError> {
    let response = client.post(url).json(payload).send().await?;
    let status = response.status();

    if status == StatusCode::OK || status == StatusCode::NO_CONTENT {
        return Ok(());
    }

    let body = response.text().await.unwrap_or_default();
    Err(NotifyError::Rejected { status: status.as_u16(), body })
}

/// Delivery counts for one alert
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchReport {
    pub delivered: usize,
    pub failed: usize,
}

/// Fans an alert out to every integration of a monitor
pub struct AlertDispatcher {
    notifiers: HashMap<IntegrationKind, Arc<dyn Notifier>>,
}

impl AlertDispatcher {
    /// An empty dispatcher; every delivery fails until notifiers are registered.
    pub fn new() -> Self {
        Self { notifiers: HashMap::new() }
    }

    /// Discord and Slack sharing one HTTP client.
    pub fn with_defaults(client: Client) -> Self {
        let mut dispatcher = Self::new();
        dispatcher.register(Arc::new(DiscordNotifier::new(client.clone())));
        dispatcher.register(Arc::new(SlackNotifier::new(client)));
        dispatcher
    }

    /// Register a notifier, replacing any previous one of the same kind.
    pub fn register(&mut self, notifier: Arc<dyn Notifier>) {
        self.notifiers.insert(notifier.kind(), notifier);
    }

    /// Deliver `alert` to all `integrations` concurrently.
    ///
    /// Failures are logged per integration and never abort the others.
    pub async fn dispatch(&self, integrations: &[Integration], alert: &Alert) -> DispatchReport {
        let deliveries = integrations.iter().map(|integration| async move {
            let result = match self.notifiers.get(&integration.kind) {
                Some(notifier) => notifier.send(&integration.url, alert).await,
                None => Err(NotifyError::Unsupported(integration.kind)),
            };
            (integration, result)
        });

        let mut report = DispatchReport::default();
        for (integration, result) in join_all(deliveries).await {
            match result {
                Ok(()) => {
                    report.delivered += 1;
                    debug!(
                        integration = %integration.name,
                        kind = %integration.kind,
                        monitor = %alert.monitor_name,
                        "Alert delivered"
                    );
                }
                Err(e) => {
                    report.failed += 1;
                    warn!(
                        integration = %integration.name,
                        kind = %integration.kind,
                        monitor = %alert.monitor_name,
                        "Failed to deliver alert: {}",
                        e
                    );
                }
            }
        }

        if !integrations.is_empty() {
            info!(
                monitor = %alert.monitor_name,
                kind = ?alert.kind,
                delivered = report.delivered,
                failed = report.failed,
                "Alert dispatched"
            );
        }

        report
    }
}

impl Default for AlertDispatcher {
    fn default() -> Self {
        Self::new()
    }
}
