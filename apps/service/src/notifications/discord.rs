use async_trait::async_trait;
use reqwest::Client;
use serde_json::{Value, json};

use super::{Alert, FOOTER, Notifier, NotifyError, post_json};
use crate::database::models::IntegrationKind;

const COLOR_RED: u32 = 15158332;
const COLOR_GREEN: u32 = 3066993;

/// Discord webhook notifier (one embed per message)
pub struct DiscordNotifier {
    client: Client,
}

impl DiscordNotifier {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    fn embed(alert: &Alert) -> Value {
        let footer = json!({ "text": FOOTER });
        let timestamp = alert.occurred_at.to_rfc3339();

        if alert.is_failure() {
            json!({
                "title": "🚨 Ops... Look out!!",
                "description": format!("**{}** failed to respond!", alert.monitor_name),
                "color": COLOR_RED,
                "fields": [
                    { "name": "Status", "value": "❌ Unhealthy", "inline": true },
                    {
                        "name": "Consecutive failures",
                        "value": alert.failed_attempts.to_string(),
                        "inline": true
                    },
                    { "name": "Last error", "value": last_error(alert), "inline": false }
                ],
                "footer": footer,
                "timestamp": timestamp
            })
        } else {
            json!({
                "title": "✅ Uff.. All good now!",
                "description": format!("The service **{}** is back to normal.", alert.monitor_name),
                "color": COLOR_GREEN,
                "fields": [{ "name": "Status", "value": "🟢 Healthy", "inline": true }],
                "footer": footer,
                "timestamp": timestamp
            })
        }
    }
}

/// Discord drops embeds with an empty field value.
fn last_error(alert: &Alert) -> String {
    if alert.last_error.trim().is_empty() {
        "(empty response)".to_string()
    } else {
        alert.last_error.clone()
    }
}

#[async_trait]
impl Notifier for DiscordNotifier {
    fn kind(&self) -> IntegrationKind {
        IntegrationKind::Discord
    }

    fn render(&self, alert: &Alert) -> Value {
        json!({ "content": "@everyone", "embeds": [Self::embed(alert)] })
    }

    async fn send(&self, url: &str, alert: &Alert) -> Result<(), NotifyError> {
        post_json(&self.client, url, &self.render(alert)).await
    }
}
