//! Deadline-bounded store access for async callers.
//!
//! Store operations are synchronous and do local disk I/O. [`StoreHandle`]
//! moves each call onto tokio's blocking pool so the event loop never
//! blocks on SQLite, and gives up waiting after a fixed deadline. A call
//! that is abandoned keeps running on the blocking pool and either commits
//! or rolls back as a whole.

use std::time::Duration;

use crate::error::StoreError;
use crate::store::Store;

/// A [`Store`] paired with the deadline applied to every call.
#[derive(Debug, Clone)]
pub struct StoreHandle {
    store: Store,
    deadline: Duration,
}

impl StoreHandle {
    pub fn new(store: Store, deadline: Duration) -> Self {
        Self { store, deadline }
    }

    /// The wrapped store, for synchronous callers.
    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn deadline(&self) -> Duration {
        self.deadline
    }

    /// Runs `f` against the store on the blocking pool.
    ///
    /// # Errors
    ///
    /// Returns whatever `f` returns, `StoreError::Timeout` if the deadline
    /// passes first, or `StoreError::Join` if the blocking task panicked.
    pub async fn call<T, F>(&self, op: &'static str, f: F) -> Result<T, StoreError>
    where
        F: FnOnce(&Store) -> Result<T, StoreError> + Send + 'static,
        T: Send + 'static,
    {
        let store = self.store.clone();
        let task = tokio::task::spawn_blocking(move || f(&store));

        match tokio::time::timeout(self.deadline, task).await {
            Ok(Ok(result)) => result,
            Ok(Err(source)) => {
                tracing::error!(op, error = %source, "store task failed");
                Err(StoreError::Join { op, source })
            }
            Err(_) => {
                tracing::warn!(
                    op,
                    deadline_ms = self.deadline.as_millis() as u64,
                    "store operation exceeded its deadline"
                );
                Err(StoreError::Timeout { op })
            }
        }
    }
}
