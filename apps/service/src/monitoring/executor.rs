use std::sync::Arc;

use tracing::{debug, info, warn};

use super::checker::Checker;
use super::health::{AlertKind, Transition, evaluate};
use crate::database::Database;
use crate::database::models::{FinalState, Monitor, unix_now};
use crate::notifications::{Alert, AlertDispatcher};

/// Monitoring executor - runs one full probe cycle for a monitor
pub struct MonitoringExecutor {
    checker: Arc<dyn Checker>,
    database: Arc<dyn Database>,
    dispatcher: Arc<AlertDispatcher>,
}

impl MonitoringExecutor {
    pub fn new(
        checker: Arc<dyn Checker>,
        database: Arc<dyn Database>,
        dispatcher: Arc<AlertDispatcher>,
    ) -> Self {
        Self { checker, database, dispatcher }
    }

    /// Probe, record, evaluate, alert and write back.
    ///
    /// Store and delivery failures are logged; the cycle always completes.
    pub async fn execute(&self, monitor: &Monitor) -> Transition {
        debug!(monitor_id = monitor.id, monitor = %monitor.name, "Executing monitor");

        let outcome = self.checker.check(monitor).await;
        let now = unix_now();

        debug!(
            monitor_id = monitor.id,
            healthy = outcome.healthy,
            status_code = outcome.status_code,
            latency_ms = outcome.latency_ms,
            "Probe completed"
        );

        if let Err(e) = self.database.append_attempt(&outcome.to_attempt(monitor.id, now)).await {
            warn!(monitor_id = monitor.id, "Failed to record attempt: {}", e);
        }

        let transition = evaluate(monitor.failed_attempts, monitor.threshold, outcome.healthy);

        if let Some(kind) = transition.alert {
            // Recovery reports the streak that just ended.
            let failed_attempts = match kind {
                AlertKind::Failure => transition.failed_attempts,
                AlertKind::Recovery => monitor.failed_attempts,
            };

            match kind {
                AlertKind::Failure => info!(
                    monitor_id = monitor.id,
                    monitor = %monitor.name,
                    failed_attempts,
                    "Monitor is down"
                ),
                AlertKind::Recovery => info!(
                    monitor_id = monitor.id,
                    monitor = %monitor.name,
                    failed_attempts,
                    "Monitor recovered"
                ),
            }

            let alert = Alert::new(kind, &monitor.name, failed_attempts, &outcome.response);
            self.dispatcher.dispatch(&monitor.integrations, &alert).await;
        }

        let state = FinalState {
            healthy: outcome.healthy,
            failed_attempts: transition.failed_attempts,
            last_run: now,
        };

        match self.database.write_final_state(monitor.id, &state).await {
            Ok(true) => {}
            Ok(false) => {
                debug!(monitor_id = monitor.id, "Monitor disabled during probe, state not written");
            }
            Err(e) => {
                warn!(monitor_id = monitor.id, "Failed to update monitor state: {}", e);
            }
        }

        transition
    }
}
