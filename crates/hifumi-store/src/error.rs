//! Error types for the configuration and moderation store.

use hifumi_types::ValidationError;

/// Errors returned by store operations.
///
/// Absence of a record is never an error: reads return `None`, an empty set,
/// or a zero count instead.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A key or value was rejected before touching the database.
    #[error("invalid input: {0}")]
    Validation(#[from] ValidationError),

    /// SQLite rejected or failed the operation.
    #[error("store database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// No pooled connection became available in time.
    #[error("failed to check out a database connection: {0}")]
    Pool(#[from] r2d2::Error),

    /// The connection pool could not be created.
    #[error("failed to open database: {0}")]
    Open(#[from] hifumi_db::PoolError),

    /// Schema bootstrap failed.
    #[error("failed to migrate database: {0}")]
    Migration(#[from] hifumi_db::MigrationError),

    /// An async caller gave up waiting for the operation.
    #[error("store operation '{op}' exceeded its deadline")]
    Timeout {
        /// Name of the operation that timed out.
        op: &'static str,
    },

    /// The blocking task running the operation panicked or was cancelled.
    #[error("store operation '{op}' did not complete: {source}")]
    Join {
        /// Name of the operation that failed.
        op: &'static str,
        /// The underlying join failure.
        source: tokio::task::JoinError,
    },
}

impl StoreError {
    /// Returns `true` if the caller supplied invalid input.
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }
}
