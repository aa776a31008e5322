use anyhow::Result;
use reqwest::Method;
use std::time::Instant;

use super::types::{DEADLINE_EXCEEDED, MAX_RESPONSE_BYTES, ProbeOutcome};
use crate::database::models::Monitor;

/// Checker trait for probing a monitor's target
///
/// Implementations never fail: every remote-side problem is folded into an
/// unhealthy [`ProbeOutcome`].
#[async_trait::async_trait]
pub trait Checker: Send + Sync {
    async fn check(&self, monitor: &Monitor) -> ProbeOutcome;
}

/// HTTP/HTTPS checker
pub struct HttpChecker {
    client: reqwest::Client,
}

impl HttpChecker {
    pub fn new() -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("vigil/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self { client })
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait::async_trait]
impl Checker for HttpChecker {
    async fn check(&self, monitor: &Monitor) -> ProbeOutcome {
        let method = match Method::from_bytes(monitor.method.to_ascii_uppercase().as_bytes()) {
            Ok(method) => method,
            Err(_) => {
                return ProbeOutcome::failure(
                    format!("failed to create http request: invalid method '{}'", monitor.method),
                    0,
                );
            }
        };

        let start = Instant::now();

        // The per-request timeout covers connect, headers and body alike.
        let response = self
            .client
            .request(method, &monitor.url)
            .timeout(monitor.timeout())
            .send()
            .await;

        let response = match response {
            Ok(response) => response,
            Err(e) if e.is_timeout() => {
                return ProbeOutcome::failure(DEADLINE_EXCEEDED, elapsed_ms(start));
            }
            Err(e) => {
                return ProbeOutcome::failure(
                    format!("failed to execute http request: {e}"),
                    elapsed_ms(start),
                );
            }
        };

        let status_code = response.status().as_u16();
        let body = match read_capped(response).await {
            Ok(body) => body,
            Err(e) => format!("failed to read response body: {e}"),
        };

        ProbeOutcome::from_response(status_code, body, elapsed_ms(start))
    }
}

/// Read at most `MAX_RESPONSE_BYTES` of the body; the rest is never buffered.
async fn read_capped(mut response: reqwest::Response) -> reqwest::Result<String> {
    let mut body = Vec::new();
    while let Some(chunk) = response.chunk().await? {
        let room = MAX_RESPONSE_BYTES - body.len();
        if chunk.len() >= room {
            body.extend_from_slice(&chunk[..room]);
            break;
        }
        body.extend_from_slice(&chunk);
    }
    Ok(String::from_utf8_lossy(&body).into_owned())
}

fn elapsed_ms(start: Instant) -> u64 {
    start.elapsed().as_millis() as u64
}
