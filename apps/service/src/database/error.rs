use deadpool::managed::PoolError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database query failed: {0}")]
    Query(#[from] libsql::Error),

    #[error("Connection pool error: {0}")]
    Pool(String),

    #[error("Record not found")]
    NotFound,

    #[error("Unknown integration ids: {0:?}")]
    UnknownIntegrations(Vec<i64>),

    #[error("Stored row is invalid: {0}")]
    Corrupt(String),
}

impl From<PoolError<libsql::Error>> for StoreError {
    fn from(err: PoolError<libsql::Error>) -> Self {
        match err {
            PoolError::Backend(e) => StoreError::Query(e),
            other => StoreError::Pool(other.to_string()),
        }
    }
}

pub type StoreResult<T> = Result<T, StoreError>;
