use std::future::Future;
use std::time::Duration;

use rolesync_core::{AppError, AppResult};
use tokio::time::Instant;

use crate::resource_schema::{Operation, ResourceTimeouts};

/// Longest deadline an operation context accepts.
pub const MAX_OPERATION_TIMEOUT: Duration = Duration::from_secs(24 * 60 * 60);

/// Call-scoped deadline for one lifecycle operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OperationContext {
    operation: Operation,
    deadline: Instant,
}

impl OperationContext {
    /// Creates a context with an absolute deadline.
    #[must_use]
    pub fn new(operation: Operation, deadline: Instant) -> Self {
        Self {
            operation,
            deadline,
        }
    }

    /// Creates a context whose deadline is `timeout` from now.
    #[must_use]
    pub fn with_timeout(operation: Operation, timeout: Duration) -> Self {
        let deadline = Instant::now() + timeout.min(MAX_OPERATION_TIMEOUT);
        Self::new(operation, deadline)
    }

    /// Creates a context from the schema budget of `operation`.
    #[must_use]
    pub fn for_operation(timeouts: &ResourceTimeouts, operation: Operation) -> Self {
        Self::with_timeout(operation, timeouts.for_operation(operation))
    }

    /// Returns the operation this context belongs to.
    #[must_use]
    pub fn operation(&self) -> Operation {
        self.operation
    }

    /// Returns the absolute deadline.
    #[must_use]
    pub fn deadline(&self) -> Instant {
        self.deadline
    }

    /// Runs a remote call, failing with [`AppError::DeadlineExceeded`] past the deadline.
    pub async fn run<T, F>(&self, call: F) -> AppResult<T>
    where
        F: Future<Output = AppResult<T>>,
    {
        tokio::time::timeout_at(self.deadline, call)
            .await
            .map_err(|_| {
                AppError::DeadlineExceeded(format!(
                    "{} operation did not finish before its deadline",
                    self.operation
                ))
            })?
    }
}
