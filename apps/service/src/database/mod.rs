/// Database abstraction layer
///
/// Monitor definitions, their live scheduling/health fields, notification
/// integrations and the append-only attempt log all live in one libsql file.

pub mod error;
pub mod migrations;
pub mod models;
pub mod repository;

#[cfg(test)]
pub(crate) mod testing;

pub use error::StoreError;
pub use repository::{Database, DatabaseImpl};

use anyhow::Result;

/// Initialize database with schema
pub async fn initialize_database(conn: &libsql::Connection) -> Result<()> {
    migrations::run_migrations(conn).await
}
