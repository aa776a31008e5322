/// Orchestrator module - coordinates all components
///
/// The orchestrator:
/// - Opens and migrates the database
/// - Wires the checker, alert dispatcher and executor together
/// - Runs the monitoring scheduler and the retention sweep until shutdown
pub mod retention;


pub use retention::{RetentionCleanup, RetentionPolicy};

use anyhow::Result;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::config::Config;
use crate::database::{Database, DatabaseImpl, initialize_database};
use crate::monitoring::{HttpChecker, MonitoringExecutor, MonitoringScheduler};
use crate::notifications::AlertDispatcher;
use crate::pool::{LibsqlPool, open_pool};

/// Main orchestrator for the vigil service
pub struct Orchestrator {
    database: Arc<dyn Database>,
    scheduler: MonitoringScheduler,
    retention: RetentionPolicy,
}

impl Orchestrator {
    /// Create and run an orchestrator until Ctrl-C
    pub async fn start(config: Config) -> Result<()> {
        let pool = open_pool(&config.database.path, config.database.pool_size).await?;
        let orchestrator = Self::new(&config, pool).await?;

        let cancel = CancellationToken::new();
        let signal = cancel.clone();
        tokio::spawn(async move {
            match tokio::signal::ctrl_c().await {
                Ok(()) => info!("Shutdown requested"),
                Err(e) => warn!("Failed to listen for shutdown signal: {}", e),
            }
            signal.cancel();
        });

        orchestrator.run(cancel).await
    }

    /// Create a new orchestrator instance over an existing pool
    pub async fn new(config: &Config, pool: LibsqlPool) -> Result<Self> {
        {
            let conn = pool.get().await?;
            info!("Initializing database schema...");
            initialize_database(&conn).await?;
        }

        let database: Arc<dyn Database> = Arc::new(DatabaseImpl::new_from_pool(pool));

        let checker = Arc::new(HttpChecker::new()?);

        let webhook_client = reqwest::Client::builder()
            .timeout(config.notifications.request_timeout())
            .build()?;
        let dispatcher = Arc::new(AlertDispatcher::with_defaults(webhook_client));

        let executor = Arc::new(MonitoringExecutor::new(checker, database.clone(), dispatcher));
        let scheduler = MonitoringScheduler::new(database.clone(), executor, &config.scheduler);

        Ok(Self {
            database,
            scheduler,
            retention: RetentionPolicy::from_config(&config.retention),
        })
    }

    /// Run the scheduler and retention sweep until `cancel` fires
    pub async fn run(self, cancel: CancellationToken) -> Result<()> {
        info!("Starting vigil orchestrator...");

        let cleanup = RetentionCleanup::new(self.database.clone(), self.retention)
            .start_periodic_cleanup(cancel.child_token());

        let result = self.scheduler.run(cancel.clone()).await;

        cancel.cancel();
        if let Err(e) = cleanup.await {
            warn!("Retention task ended abnormally: {}", e);
        }

        info!("Orchestrator stopped");
        result
    }
}
