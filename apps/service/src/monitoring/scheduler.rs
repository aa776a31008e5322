use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tokio::sync::Semaphore;
use tokio::time::{MissedTickBehavior, interval, timeout};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::executor::MonitoringExecutor;
use crate::config::SchedulerConfig;
use crate::database::Database;
use crate::database::models::unix_now;

/// Monitoring scheduler - selects due monitors on a fixed cadence and hands
/// each one to the executor on its own task
pub struct MonitoringScheduler {
    database: Arc<dyn Database>,
    executor: Arc<MonitoringExecutor>,
    period: Duration,
    permits: Arc<Semaphore>,
    max_permits: usize,
    grace: Duration,
}

impl MonitoringScheduler {
    pub fn new(
        database: Arc<dyn Database>,
        executor: Arc<MonitoringExecutor>,
        config: &SchedulerConfig,
    ) -> Self {
        let max_permits = config.probe_limit();
        Self {
            database,
            executor,
            period: config.tick(),
            permits: Arc::new(Semaphore::new(max_permits)),
            max_permits,
            grace: config.shutdown_grace(),
        }
    }

    /// Number of probes currently in flight
    pub fn in_flight(&self) -> usize {
        self.max_permits - self.permits.available_permits()
    }

    /// Run until `cancel` fires, then wait (bounded) for in-flight probes.
    pub async fn run(&self, cancel: CancellationToken) -> Result<()> {
        // A previous crash may have left monitors claimed.
        match self.database.clear_all_running().await {
            Ok(0) => {}
            Ok(cleared) => info!("Released {} monitors left running by a previous run", cleared),
            Err(e) => warn!("Failed to reset running monitors: {}", e),
        }

        info!(
            tick_ms = self.period.as_millis() as u64,
            max_concurrent_probes = self.max_permits,
            "Monitoring scheduler started"
        );

        let mut ticker = interval(self.period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {
                    self.tick().await;
                }
            }
        }

        self.drain().await;
        Ok(())
    }

    /// One scheduling pass. Returns the number of probes started.
    pub async fn tick(&self) -> usize {
        let now = unix_now();
        let due = match self.database.find_due_monitors(now).await {
            Ok(due) => due,
            Err(e) => {
                warn!("Failed to load due monitors: {}", e);
                return 0;
            }
        };

        let mut started = 0;
        for monitor in due {
            let Ok(permit) = Arc::clone(&self.permits).try_acquire_owned() else {
                debug!(
                    monitor_id = monitor.id,
                    "Probe limit reached, leaving monitor for a later tick"
                );
                break;
            };

            match self.database.mark_running(monitor.id).await {
                Ok(true) => {}
                Ok(false) => {
                    debug!(monitor_id = monitor.id, "Monitor already claimed or disabled");
                    continue;
                }
                Err(e) => {
                    warn!(monitor_id = monitor.id, "Failed to mark monitor running: {}", e);
                    continue;
                }
            }

            let executor = Arc::clone(&self.executor);
            tokio::spawn(async move {
                let _permit = permit;
                executor.execute(&monitor).await;
            });
            started += 1;
        }

        if started > 0 {
            debug!(started, in_flight = self.in_flight(), "Dispatched probes");
        }
        started
    }

    async fn drain(&self) {
        let in_flight = self.in_flight();
        if in_flight == 0 {
            info!("Monitoring scheduler stopped");
            return;
        }

        info!(in_flight, "Waiting for in-flight probes");
        let all = u32::try_from(self.max_permits).unwrap_or(u32::MAX);
        match timeout(self.grace, self.permits.acquire_many(all)).await {
            Ok(_) => info!("Monitoring scheduler stopped"),
            Err(_) => warn!(
                in_flight = self.in_flight(),
                "Shutdown grace period elapsed with probes still running"
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::models::{IntegrationKind, Monitor, NewIntegration};
    use crate::database::testing::{FailingDatabase, Fault, new_monitor, test_database};
    use crate::monitoring::checker::Checker;
    use crate::monitoring::types::ProbeOutcome;
    use crate::notifications::AlertDispatcher;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Healthy after a fixed delay, counting calls.
    struct SlowChecker {
        delay: Duration,
        calls: AtomicUsize,
    }

    #[async_trait::async_trait]
    impl Checker for SlowChecker {
        async fn check(&self, _monitor: &Monitor) -> ProbeOutcome {
            self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(self.delay).await;
            ProbeOutcome::from_response(200, "ok".into(), self.delay.as_millis() as u64)
        }
    }

    fn config(max_concurrent_probes: usize) -> SchedulerConfig {
        SchedulerConfig { tick_ms: 20, max_concurrent_probes, shutdown_grace_secs: 5 }
    }

    async fn setup(
        monitors: usize,
        delay: Duration,
        max_concurrent_probes: usize,
    ) -> (Arc<crate::database::DatabaseImpl>, tempfile::TempDir, Arc<SlowChecker>, MonitoringScheduler)
    {
        let (db, dir) = test_database().await;
        let integration = db
            .create_integration(&NewIntegration {
                name: "ops".into(),
                kind: IntegrationKind::Discord,
                url: "http://127.0.0.1:9/hook".into(),
            })
            .await
            .unwrap();
        for i in 0..monitors {
            db.create_monitor(&new_monitor(&format!("m{i}"), vec![integration.id])).await.unwrap();
        }

        let checker = Arc::new(SlowChecker { delay, calls: AtomicUsize::new(0) });
        let executor = Arc::new(MonitoringExecutor::new(
            checker.clone(),
            db.clone(),
            Arc::new(AlertDispatcher::new()),
        ));
        let scheduler = MonitoringScheduler::new(db.clone(), executor, &config(max_concurrent_probes));
        (db, dir, checker, scheduler)
    }

    #[tokio::test]
    async fn tick_claims_due_monitors_once() {
        let (db, _dir, _checker, scheduler) = setup(2, Duration::from_millis(200), 8).await;

        assert_eq!(scheduler.tick().await, 2);
        // Still running: nothing is due on the next pass.
        assert_eq!(scheduler.tick().await, 0);

        for monitor in db.list_monitors().await.unwrap() {
            assert!(monitor.running);
        }
    }

    #[tokio::test]
    async fn tick_respects_probe_limit() {
        let (_db, _dir, _checker, scheduler) = setup(5, Duration::from_millis(300), 2).await;

        assert_eq!(scheduler.tick().await, 2);
        assert_eq!(scheduler.in_flight(), 2);
        assert_eq!(scheduler.tick().await, 0);
    }

    #[tokio::test]
    async fn run_recovers_stale_claims_and_drains_on_cancel() {
        let (db, _dir, checker, scheduler) = setup(3, Duration::from_millis(100), 8).await;

        // Simulate a crash that left one monitor claimed.
        let stale = db.list_monitors().await.unwrap()[0].id;
        assert!(db.mark_running(stale).await.unwrap());

        let cancel = CancellationToken::new();
        let stopper = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(60)).await;
            stopper.cancel();
        });

        scheduler.run(cancel).await.unwrap();

        assert_eq!(checker.calls.load(Ordering::SeqCst), 3);
        assert_eq!(scheduler.in_flight(), 0);
        for monitor in db.list_monitors().await.unwrap() {
            assert!(!monitor.running);
            assert!(monitor.healthy);
            assert!(monitor.last_run > 0);
        }
    }

    async fn failing_setup(
        monitors: usize,
    ) -> (Arc<FailingDatabase>, tempfile::TempDir, Arc<SlowChecker>, MonitoringScheduler) {
        let (inner, dir, checker, _) = setup(monitors, Duration::from_millis(50), 8).await;
        let db = Arc::new(FailingDatabase::new(inner));
        let executor = Arc::new(MonitoringExecutor::new(
            checker.clone(),
            db.clone(),
            Arc::new(AlertDispatcher::new()),
        ));
        let scheduler = MonitoringScheduler::new(db.clone(), executor, &config(8));
        (db, dir, checker, scheduler)
    }

    #[tokio::test]
    async fn tick_skips_when_due_lookup_fails() {
        let (db, _dir, _checker, scheduler) = failing_setup(2).await;

        db.fail(Fault::FindDue);
        assert_eq!(scheduler.tick().await, 0);
        assert_eq!(scheduler.in_flight(), 0);

        db.heal();
        assert_eq!(scheduler.tick().await, 2);
    }

    #[tokio::test]
    async fn tick_moves_on_when_claim_fails() {
        let (db, _dir, checker, scheduler) = failing_setup(3).await;

        db.fail(Fault::MarkRunning);
        assert_eq!(scheduler.tick().await, 0);
        // Permits taken for failed claims are handed back.
        assert_eq!(scheduler.in_flight(), 0);
        assert_eq!(checker.calls.load(Ordering::SeqCst), 0);
        for monitor in db.list_monitors().await.unwrap() {
            assert!(!monitor.running);
        }

        db.heal();
        assert_eq!(scheduler.tick().await, 3);
    }

    #[tokio::test]
    async fn oversized_probe_limit_is_clamped() {
        let (db, _dir, checker, _) = setup(0, Duration::from_millis(1), 1).await;
        let executor = Arc::new(MonitoringExecutor::new(
            checker,
            db.clone(),
            Arc::new(AlertDispatcher::new()),
        ));
        let scheduler = MonitoringScheduler::new(db, executor, &config(usize::MAX));

        assert_eq!(scheduler.in_flight(), 0);
        assert_eq!(scheduler.tick().await, 0);
        scheduler.drain().await;
    }
}
