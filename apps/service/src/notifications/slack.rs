use async_trait::async_trait;
use reqwest::Client;
use serde_json::{Value, json};

use super::{Alert, FOOTER, Notifier, NotifyError, post_json};
use crate::database::models::IntegrationKind;

const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Slack incoming-webhook notifier using Block Kit
pub struct SlackNotifier {
    client: Client,
}

impl SlackNotifier {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

fn mrkdwn(text: String) -> Value {
    json!({ "type": "mrkdwn", "text": text })
}

#[async_trait]
impl Notifier for SlackNotifier {
    fn kind(&self) -> IntegrationKind {
        IntegrationKind::Slack
    }

    fn render(&self, alert: &Alert) -> Value {
        let time = mrkdwn(format!("*Time:*\n{}", alert.occurred_at.format(TIME_FORMAT)));

        let (headline, summary, fields) = if alert.is_failure() {
            (
                "🚨 Ops... Look out!!",
                format!("<!here>\n*{}* failed to respond!", alert.monitor_name),
                vec![
                    mrkdwn("*Status:*\n❌ Unhealthy".to_string()),
                    mrkdwn(format!("*Consecutive failures:*\n{}", alert.failed_attempts)),
                    mrkdwn(format!("*Last error:*\n{}", alert.last_error)),
                    time,
                ],
            )
        } else {
            (
                "✅ Uff.. All good now!",
                format!("The service *{}* is back to normal.", alert.monitor_name),
                vec![mrkdwn("*Status:*\n🟢 Healthy".to_string()), time],
            )
        };

        json!({
            "blocks": [
                { "type": "header", "text": { "type": "plain_text", "text": headline } },
                { "type": "section", "text": mrkdwn(summary) },
                { "type": "section", "fields": fields },
                { "type": "divider" },
                { "type": "context", "elements": [mrkdwn(FOOTER.to_string())] },
            ]
        })
    }

    async fn send(&self, url: &str, alert: &Alert) -> Result<(), NotifyError> {
        post_json(&self.client, url, &self.render(alert)).await
    }
}
