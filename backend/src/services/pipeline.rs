//! Single-flight execution of the stock import and reconciliation
//!
//! Both operations rebuild shared state from scratch, so only one of them may
//! run at a time across the whole process.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::error::{AppError, AppResult};

/// Exclusive lock guarding `ImportStock` and `Reconcile`
#[derive(Clone, Default)]
pub struct PipelineLock {
    inner: Arc<Mutex<()>>,
}

/// Held while a pipeline operation runs
pub struct PipelineGuard {
    _guard: OwnedMutexGuard<()>,
}

impl PipelineLock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquire the lock or fail with `PipelineBusy` without waiting
    pub fn try_acquire(&self, operation: &str) -> AppResult<PipelineGuard> {
        self.inner
            .clone()
            .try_lock_owned()
            .map(|guard| PipelineGuard { _guard: guard })
            .map_err(|_| {
                tracing::warn!(operation, "Rejected: stock pipeline already running");
                AppError::PipelineBusy(operation.to_string())
            })
    }

    pub fn is_running(&self) -> bool {
        self.inner.try_lock().is_err()
    }
}

/// Run `work` under a time budget; the future is dropped on expiry
pub async fn within_budget<T, F>(operation: &str, budget: Duration, work: F) -> AppResult<T>
where
    F: Future<Output = AppResult<T>>,
{
    match tokio::time::timeout(budget, work).await {
        Ok(result) => result,
        Err(_) => {
            tracing::error!(operation, budget_secs = budget.as_secs(), "Stock pipeline timed out");
            Err(AppError::Timeout(operation.to_string()))
        }
    }
}
