use async_trait::async_trait;
use libsql::params::Params;
use libsql::{Connection, Row, Value, params};
use std::collections::{BTreeSet, HashMap};

use super::error::{StoreError, StoreResult};
use super::models::{
    Attempt, AttemptEvent, FinalState, Integration, IntegrationKind, Monitor, MonitorPatch,
    NewAttempt, NewIntegration, NewMonitor, unix_now,
};
use crate::pool::LibsqlPool;

const MONITOR_COLUMNS: &str = "id, name, url, method, interval_seconds, threshold, timeout_seconds, \
     enabled, running, healthy, failed_attempts, last_run, created_at, updated_at";

const ATTEMPT_COLUMNS: &str =
    "a.id, a.monitor_id, a.healthy, a.status_code, a.response, a.latency_ms, a.created_at";

/// Database trait for abstracting database operations
///
/// The scheduler only ever touches the live fields (`running`, `healthy`,
/// `failed_attempts`, `last_run`) through the dedicated methods below, so
/// configuration edits and probe write-backs never overwrite each other.
#[async_trait]
pub trait Database: Send + Sync {
    // --- monitor configuration and live state ---

    /// Enabled, idle monitors whose `last_run + interval` is at or before `now`,
    /// integrations included.
    async fn find_due_monitors(&self, now: i64) -> StoreResult<Vec<Monitor>>;

    /// Claim a monitor for a probe. Returns `false` if it was already running
    /// or got disabled in the meantime.
    async fn mark_running(&self, id: i64) -> StoreResult<bool>;

    /// Persist the outcome of a probe and release the claim. Only applies to
    /// monitors that are still enabled; returns whether a row was written.
    async fn write_final_state(&self, id: i64, state: &FinalState) -> StoreResult<bool>;

    /// Release every claim, used once on startup.
    async fn clear_all_running(&self) -> StoreResult<u64>;

    async fn get_monitor(&self, id: i64) -> StoreResult<Option<Monitor>>;

    /// All monitors with integrations, enabled ones first.
    async fn list_monitors(&self) -> StoreResult<Vec<Monitor>>;

    async fn create_monitor(&self, monitor: &NewMonitor) -> StoreResult<Monitor>;

    async fn update_monitor(&self, id: i64, patch: &MonitorPatch) -> StoreResult<Monitor>;

    // --- integrations ---

    async fn create_integration(&self, integration: &NewIntegration) -> StoreResult<Integration>;

    /// Newest first; `search` matches a name prefix and caps the result at 50.
    async fn list_integrations(&self, search: Option<&str>) -> StoreResult<Vec<Integration>>;

    // --- attempt log ---

    async fn append_attempt(&self, attempt: &NewAttempt) -> StoreResult<i64>;

    /// Attempts of one monitor created at or after `since`, newest first.
    async fn recent_attempts(
        &self,
        monitor_id: i64,
        since: i64,
        limit: usize,
    ) -> StoreResult<Vec<Attempt>>;

    /// Latest unhealthy attempts across all monitors.
    async fn recent_failures(&self, limit: usize) -> StoreResult<Vec<AttemptEvent>>;

    /// Delete attempts created before `before`.
    async fn prune_attempts(&self, before: i64) -> StoreResult<u64>;
}

/// LibSQL database implementation
pub struct DatabaseImpl {
    pool: LibsqlPool,
}

impl DatabaseImpl {
    /// Create a new database instance from a pool
    pub fn new_from_pool(pool: LibsqlPool) -> Self {
        Self { pool }
    }

    /// Get a connection from the pool
    async fn get_conn(&self) -> StoreResult<deadpool::managed::Object<crate::pool::LibsqlManager>> {
        Ok(self.pool.get().await?)
    }
}

fn flag(value: bool) -> i64 {
    if value { 1 } else { 0 }
}

fn monitor_from_row(row: &Row) -> StoreResult<Monitor> {
    Ok(Monitor {
        id: row.get(0)?,
        name: row.get(1)?,
        url: row.get(2)?,
        method: row.get(3)?,
        interval_seconds: row.get::<i64>(4)?.max(0) as u64,
        threshold: row.get::<i64>(5)?.max(0) as u32,
        timeout_seconds: row.get::<i64>(6)?.max(0) as u64,
        enabled: row.get::<i64>(7)? != 0,
        running: row.get::<i64>(8)? != 0,
        healthy: row.get::<i64>(9)? != 0,
        failed_attempts: row.get::<i64>(10)?.max(0) as u32,
        last_run: row.get(11)?,
        created_at: row.get(12)?,
        updated_at: row.get(13)?,
        integrations: Vec::new(),
    })
}

fn integration_from_row(row: &Row, offset: i32) -> StoreResult<Integration> {
    let kind: String = row.get(offset + 2)?;
    Ok(Integration {
        id: row.get(offset)?,
        name: row.get(offset + 1)?,
        kind: kind.parse::<IntegrationKind>().map_err(StoreError::Corrupt)?,
        url: row.get(offset + 3)?,
        created_at: row.get(offset + 4)?,
        updated_at: row.get(offset + 5)?,
    })
}

fn attempt_from_row(row: &Row) -> StoreResult<Attempt> {
    Ok(Attempt {
        id: row.get(0)?,
        monitor_id: row.get(1)?,
        healthy: row.get::<i64>(2)? != 0,
        status_code: row.get::<i64>(3)?.clamp(0, u16::MAX as i64) as u16,
        response: row.get(4)?,
        latency_ms: row.get::<i64>(5)?.max(0) as u64,
        created_at: row.get(6)?,
    })
}

fn id_params(ids: &[i64]) -> (String, Params) {
    let placeholders = vec!["?"; ids.len()].join(", ");
    let values = ids.iter().map(|id| Value::Integer(*id)).collect();
    (placeholders, Params::Positional(values))
}

async fn query_monitors(conn: &Connection, sql: &str, params: Params) -> StoreResult<Vec<Monitor>> {
    let mut rows = conn.query(sql, params).await?;
    let mut monitors = Vec::new();
    while let Some(row) = rows.next().await? {
        monitors.push(monitor_from_row(&row)?);
    }
    attach_integrations(conn, &mut monitors).await?;
    Ok(monitors)
}

/// Load integrations for every monitor in one query, ordered by integration id.
async fn attach_integrations(conn: &Connection, monitors: &mut [Monitor]) -> StoreResult<()> {
    if monitors.is_empty() {
        return Ok(());
    }

    let ids: Vec<i64> = monitors.iter().map(|m| m.id).collect();
    let (placeholders, params) = id_params(&ids);
    let sql = format!(
        "SELECT mi.monitor_id, i.id, i.name, i.kind, i.url, i.created_at, i.updated_at \
         FROM monitor_integrations mi JOIN integrations i ON i.id = mi.integration_id \
         WHERE mi.monitor_id IN ({placeholders}) ORDER BY i.id"
    );

    let mut rows = conn.query(&sql, params).await?;
    let mut by_monitor: HashMap<i64, Vec<Integration>> = HashMap::new();
    while let Some(row) = rows.next().await? {
        let monitor_id: i64 = row.get(0)?;
        by_monitor.entry(monitor_id).or_default().push(integration_from_row(&row, 1)?);
    }

    for monitor in monitors.iter_mut() {
        monitor.integrations = by_monitor.remove(&monitor.id).unwrap_or_default();
    }
    Ok(())
}

/// Deduplicate the requested ids and fail if any of them does not exist.
async fn ensure_integrations_exist(conn: &Connection, requested: &[i64]) -> StoreResult<Vec<i64>> {
    let wanted: BTreeSet<i64> = requested.iter().copied().collect();
    if wanted.is_empty() {
        return Ok(Vec::new());
    }

    let ids: Vec<i64> = wanted.iter().copied().collect();
    let (placeholders, params) = id_params(&ids);
    let sql = format!("SELECT id FROM integrations WHERE id IN ({placeholders})");

    let mut rows = conn.query(&sql, params).await?;
    let mut found = BTreeSet::new();
    while let Some(row) = rows.next().await? {
        found.insert(row.get::<i64>(0)?);
    }

    let missing: Vec<i64> = wanted.difference(&found).copied().collect();
    if !missing.is_empty() {
        return Err(StoreError::UnknownIntegrations(missing));
    }
    Ok(ids)
}

/// Escape `LIKE` wildcards so a search matches its text literally.
fn escape_like(prefix: &str) -> String {
    let mut escaped = String::with_capacity(prefix.len());
    for c in prefix.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

async fn link_integrations(conn: &Connection, monitor_id: i64, ids: &[i64]) -> StoreResult<()> {
    for integration_id in ids {
        conn.execute(
            "INSERT INTO monitor_integrations (monitor_id, integration_id) VALUES (?, ?)",
            params![monitor_id, *integration_id],
        )
        .await?;
    }
    Ok(())
}

#[async_trait]
impl Database for DatabaseImpl {
    async fn find_due_monitors(&self, now: i64) -> StoreResult<Vec<Monitor>> {
        let conn = self.get_conn().await?;
        let sql = format!(
            "SELECT {MONITOR_COLUMNS} FROM monitors \
             WHERE enabled = 1 AND running = 0 AND last_run + interval_seconds <= ? \
             ORDER BY last_run ASC, id ASC"
        );
        query_monitors(&conn, &sql, Params::Positional(vec![Value::Integer(now)])).await
    }

    async fn mark_running(&self, id: i64) -> StoreResult<bool> {
        let conn = self.get_conn().await?;
        let changed = conn
            .execute(
                "UPDATE monitors SET running = 1 WHERE id = ? AND running = 0 AND enabled = 1",
                params![id],
            )
            .await?;
        Ok(changed == 1)
    }

    async fn write_final_state(&self, id: i64, state: &FinalState) -> StoreResult<bool> {
        let conn = self.get_conn().await?;
        let changed = conn
            .execute(
                "UPDATE monitors SET healthy = ?, running = 0, failed_attempts = ?, last_run = ? \
                 WHERE id = ? AND enabled = 1",
                params![
                    flag(state.healthy),
                    state.failed_attempts as i64,
                    state.last_run,
                    id
                ],
            )
            .await?;
        Ok(changed == 1)
    }

    async fn clear_all_running(&self) -> StoreResult<u64> {
        let conn = self.get_conn().await?;
        Ok(conn.execute("UPDATE monitors SET running = 0 WHERE running = 1", ()).await?)
    }

    async fn get_monitor(&self, id: i64) -> StoreResult<Option<Monitor>> {
        let conn = self.get_conn().await?;
        let sql = format!("SELECT {MONITOR_COLUMNS} FROM monitors WHERE id = ?");
        let monitors =
            query_monitors(&conn, &sql, Params::Positional(vec![Value::Integer(id)])).await?;
        Ok(monitors.into_iter().next())
    }

    async fn list_monitors(&self) -> StoreResult<Vec<Monitor>> {
        let conn = self.get_conn().await?;
        let sql = format!("SELECT {MONITOR_COLUMNS} FROM monitors ORDER BY enabled DESC, id ASC");
        query_monitors(&conn, &sql, Params::None).await
    }

    async fn create_monitor(&self, monitor: &NewMonitor) -> StoreResult<Monitor> {
        let conn = self.get_conn().await?;
        let integration_ids = ensure_integrations_exist(&conn, &monitor.integration_ids).await?;
        let now = unix_now();

        let tx = conn.transaction().await?;
        tx.execute(
            "INSERT INTO monitors (name, url, method, interval_seconds, threshold, timeout_seconds, created_at, updated_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
            params![
                monitor.name.clone(),
                monitor.url.clone(),
                monitor.method.to_ascii_uppercase(),
                monitor.interval_seconds as i64,
                monitor.threshold as i64,
                monitor.timeout_seconds as i64,
                now,
                now
            ],
        )
        .await?;
        let id = tx.last_insert_rowid();
        link_integrations(&tx, id, &integration_ids).await?;
        tx.commit().await?;

        drop(conn);
        self.get_monitor(id).await?.ok_or(StoreError::NotFound)
    }

    async fn update_monitor(&self, id: i64, patch: &MonitorPatch) -> StoreResult<Monitor> {
        let mut monitor = self.get_monitor(id).await?.ok_or(StoreError::NotFound)?;
        let conn = self.get_conn().await?;

        let integration_ids = match &patch.integration_ids {
            Some(ids) => Some(ensure_integrations_exist(&conn, ids).await?),
            None => None,
        };

        if let Some(name) = &patch.name {
            monitor.name = name.clone();
        }
        if let Some(url) = &patch.url {
            monitor.url = url.clone();
        }
        if let Some(method) = &patch.method {
            monitor.method = method.to_ascii_uppercase();
        }
        if let Some(interval) = patch.interval_seconds {
            monitor.interval_seconds = interval;
        }
        if let Some(threshold) = patch.threshold {
            monitor.threshold = threshold;
        }
        if let Some(timeout) = patch.timeout_seconds {
            monitor.timeout_seconds = timeout;
        }
        if let Some(enabled) = patch.enabled {
            monitor.enabled = enabled;
        }

        let tx = conn.transaction().await?;
        tx.execute(
            "UPDATE monitors SET name = ?, url = ?, method = ?, interval_seconds = ?, threshold = ?, \
             timeout_seconds = ?, enabled = ?, updated_at = ? WHERE id = ?",
            params![
                monitor.name.clone(),
                monitor.url.clone(),
                monitor.method.clone(),
                monitor.interval_seconds as i64,
                monitor.threshold as i64,
                monitor.timeout_seconds as i64,
                flag(monitor.enabled),
                unix_now(),
                id
            ],
        )
        .await?;

        // A disabled monitor is neither running nor healthy. Live fields are
        // left alone otherwise so an in-flight probe keeps its claim.
        if patch.enabled == Some(false) {
            tx.execute("UPDATE monitors SET running = 0, healthy = 0 WHERE id = ?", params![id])
                .await?;
        }

        if let Some(ids) = &integration_ids {
            tx.execute("DELETE FROM monitor_integrations WHERE monitor_id = ?", params![id]).await?;
            link_integrations(&tx, id, ids).await?;
        }
        tx.commit().await?;

        drop(conn);
        self.get_monitor(id).await?.ok_or(StoreError::NotFound)
    }

    async fn create_integration(&self, integration: &NewIntegration) -> StoreResult<Integration> {
        let conn = self.get_conn().await?;
        let now = unix_now();

        conn.execute(
            "INSERT INTO integrations (name, kind, url, created_at, updated_at) VALUES (?, ?, ?, ?, ?)",
            params![
                integration.name.clone(),
                integration.kind.as_str(),
                integration.url.clone(),
                now,
                now
            ],
        )
        .await?;

        Ok(Integration {
            id: conn.last_insert_rowid(),
            name: integration.name.clone(),
            kind: integration.kind,
            url: integration.url.clone(),
            created_at: now,
            updated_at: now,
        })
    }

    async fn list_integrations(&self, search: Option<&str>) -> StoreResult<Vec<Integration>> {
        let conn = self.get_conn().await?;

        let mut rows = match search.map(str::trim).filter(|s| !s.is_empty()) {
            Some(prefix) => {
                conn.query(
                    "SELECT id, name, kind, url, created_at, updated_at FROM integrations \
                     WHERE name LIKE ? || '%' ESCAPE '\\' ORDER BY created_at DESC, id DESC LIMIT 50",
                    params![escape_like(prefix)],
                )
                .await?
            }
            None => {
                conn.query(
                    "SELECT id, name, kind, url, created_at, updated_at FROM integrations \
                     ORDER BY created_at DESC, id DESC",
                    (),
                )
                .await?
            }
        };

        let mut integrations = Vec::new();
        while let Some(row) = rows.next().await? {
            integrations.push(integration_from_row(&row, 0)?);
        }
        Ok(integrations)
    }

    async fn append_attempt(&self, attempt: &NewAttempt) -> StoreResult<i64> {
        let conn = self.get_conn().await?;

        conn.execute(
            "INSERT INTO attempts (monitor_id, healthy, status_code, response, latency_ms, created_at) \
             VALUES (?, ?, ?, ?, ?, ?)",
            params![
                attempt.monitor_id,
                flag(attempt.healthy),
                attempt.status_code as i64,
                attempt.response.clone(),
                attempt.latency_ms as i64,
                attempt.created_at
            ],
        )
        .await?;

        Ok(conn.last_insert_rowid())
    }

    async fn recent_attempts(
        &self,
        monitor_id: i64,
        since: i64,
        limit: usize,
    ) -> StoreResult<Vec<Attempt>> {
        let conn = self.get_conn().await?;
        let sql = format!(
            "SELECT {ATTEMPT_COLUMNS} FROM attempts a \
             WHERE a.monitor_id = ? AND a.created_at >= ? ORDER BY a.id DESC LIMIT ?"
        );

        let mut rows = conn.query(&sql, params![monitor_id, since, limit as i64]).await?;
        let mut attempts = Vec::new();
        while let Some(row) = rows.next().await? {
            attempts.push(attempt_from_row(&row)?);
        }
        Ok(attempts)
    }

    async fn recent_failures(&self, limit: usize) -> StoreResult<Vec<AttemptEvent>> {
        let conn = self.get_conn().await?;
        let sql = format!(
            "SELECT {ATTEMPT_COLUMNS}, m.name FROM attempts a JOIN monitors m ON m.id = a.monitor_id \
             WHERE a.healthy = 0 ORDER BY a.id DESC LIMIT ?"
        );

        let mut rows = conn.query(&sql, params![limit as i64]).await?;
        let mut events = Vec::new();
        while let Some(row) = rows.next().await? {
            events.push(AttemptEvent { attempt: attempt_from_row(&row)?, monitor_name: row.get(7)? });
        }
        Ok(events)
    }

    async fn prune_attempts(&self, before: i64) -> StoreResult<u64> {
        let conn = self.get_conn().await?;
        Ok(conn.execute("DELETE FROM attempts WHERE created_at < ?", params![before]).await?)
    }
}
