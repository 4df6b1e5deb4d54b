use anyhow::{ensure, Result};
use std::sync::Arc;
use tokio::sync::{AcquireError, OwnedSemaphorePermit, Semaphore};

/// Admission control for status fetches.
///
/// A fixed pool of permits shared by all fetch tasks of a batch. A permit is
/// given back when the [`Permit`] returned by [`acquire`](Self::acquire) is
/// dropped.
#[derive(Debug, Clone)]
pub struct ConcurrencyLimiter {
    semaphore: Arc<Semaphore>,
    capacity: usize,
}

/// Admission to run one fetch, released on drop
#[derive(Debug)]
pub struct Permit {
    _permit: OwnedSemaphorePermit,
}

impl ConcurrencyLimiter {
    /// Create a limiter with `capacity` permits.
    ///
    /// # Errors
    ///
    /// Fails if `capacity` is zero, which would never admit anything.
    pub fn new(capacity: usize) -> Result<Self> {
        ensure!(capacity >= 1, "Concurrency limit must be at least 1");
        Ok(ConcurrencyLimiter {
            semaphore: Arc::new(Semaphore::new(capacity)),
            capacity,
        })
    }

    /// Wait until a permit is free and take it.
    ///
    /// # Errors
    ///
    /// Only fails if the underlying semaphore has been closed.
    pub async fn acquire(&self) -> Result<Permit, AcquireError> {
        let permit = self.semaphore.clone().acquire_owned().await?;
        Ok(Permit { _permit: permit })
    }

    /// Stop admitting. Pending and later calls to `acquire` fail.
    #[cfg(test)]
    pub(crate) fn close(&self) {
        self.semaphore.close();
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of permits currently free
    pub fn available(&self) -> usize {
        self.semaphore.available_permits()
    }
}
