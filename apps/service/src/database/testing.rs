//! Throwaway databases for unit and integration tests.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tempfile::{TempDir, tempdir};

use super::error::{StoreError, StoreResult};
use super::models::{
    Attempt, AttemptEvent, FinalState, Integration, Monitor, MonitorPatch, NewAttempt,
    NewIntegration, NewMonitor,
};
use super::{Database, DatabaseImpl, initialize_database};
use crate::pool::open_pool;

/// A migrated database in a temp dir. Keep the `TempDir` alive for the test.
pub async fn test_database() -> (Arc<DatabaseImpl>, TempDir) {
    let dir = tempdir().expect("temp dir");
    let path = dir.path().join("test.db");
    let pool = open_pool(&path.to_string_lossy(), 4).await.expect("pool");

    {
        let conn = pool.get().await.expect("connection");
        initialize_database(&conn).await.expect("migrations");
    }

    (Arc::new(DatabaseImpl::new_from_pool(pool)), dir)
}

pub fn new_monitor(name: &str, integration_ids: Vec<i64>) -> NewMonitor {
    NewMonitor {
        name: name.into(),
        url: "http://127.0.0.1:9/health".into(),
        method: "get".into(),
        interval_seconds: 60,
        threshold: 3,
        timeout_seconds: 5,
        integration_ids,
    }
}

/// Store operations a [`FailingDatabase`] can be told to fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fault {
    FindDue,
    MarkRunning,
    AppendAttempt,
    WriteFinalState,
}

/// Delegates to a real database, except for the operations switched to fail.
pub struct FailingDatabase {
    inner: Arc<DatabaseImpl>,
    faults: Mutex<Vec<Fault>>,
}

impl FailingDatabase {
    pub fn new(inner: Arc<DatabaseImpl>) -> Self {
        Self { inner, faults: Mutex::new(Vec::new()) }
    }

    pub fn fail(&self, fault: Fault) {
        self.faults.lock().unwrap().push(fault);
    }

    pub fn heal(&self) {
        self.faults.lock().unwrap().clear();
    }

    fn check(&self, fault: Fault) -> StoreResult<()> {
        if self.faults.lock().unwrap().contains(&fault) {
            Err(StoreError::Pool(format!("{fault:?} unavailable")))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl Database for FailingDatabase {
    async fn find_due_monitors(&self, now: i64) -> StoreResult<Vec<Monitor>> {
        self.check(Fault::FindDue)?;
        self.inner.find_due_monitors(now).await
    }

    async fn mark_running(&self, id: i64) -> StoreResult<bool> {
        self.check(Fault::MarkRunning)?;
        self.inner.mark_running(id).await
    }

    async fn write_final_state(&self, id: i64, state: &FinalState) -> StoreResult<bool> {
        self.check(Fault::WriteFinalState)?;
        self.inner.write_final_state(id, state).await
    }

    async fn clear_all_running(&self) -> StoreResult<u64> {
        self.inner.clear_all_running().await
    }

    async fn get_monitor(&self, id: i64) -> StoreResult<Option<Monitor>> {
        self.inner.get_monitor(id).await
    }

    async fn list_monitors(&self) -> StoreResult<Vec<Monitor>> {
        self.inner.list_monitors().await
    }

    async fn create_monitor(&self, monitor: &NewMonitor) -> StoreResult<Monitor> {
        self.inner.create_monitor(monitor).await
    }

    async fn update_monitor(&self, id: i64, patch: &MonitorPatch) -> StoreResult<Monitor> {
        self.inner.update_monitor(id, patch).await
    }

    async fn create_integration(&self, integration: &NewIntegration) -> StoreResult<Integration> {
        self.inner.create_integration(integration).await
    }

    async fn list_integrations(&self, search: Option<&str>) -> StoreResult<Vec<Integration>> {
        self.inner.list_integrations(search).await
    }

    async fn append_attempt(&self, attempt: &NewAttempt) -> StoreResult<i64> {
        self.check(Fault::AppendAttempt)?;
        self.inner.append_attempt(attempt).await
    }

    async fn recent_attempts(
        &self,
        monitor_id: i64,
        since: i64,
        limit: usize,
    ) -> StoreResult<Vec<Attempt>> {
        self.inner.recent_attempts(monitor_id, since, limit).await
    }

    async fn recent_failures(&self, limit: usize) -> StoreResult<Vec<AttemptEvent>> {
        self.inner.recent_failures(limit).await
    }

    async fn prune_attempts(&self, before: i64) -> StoreResult<u64> {
        self.inner.prune_attempts(before).await
    }
}
