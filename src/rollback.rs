//! RollbackCoordinator: reverts a failed update and waits for the revert.
//!
//! Rollback is only reachable through `FailedOperation`, which can only be
//! built from an `Outcome::Failed`. A timed-out or errored run is ambiguous
//! and never triggers a destructive rollback.

use std::time::Duration;

use async_trait::async_trait;

use crate::error::{ClientError, ConfigError, MonitorError};
use crate::monitor::{Operation, OperationMonitor, Outcome, StatusProvider};

/// Platform call that starts a rollback of one resource.
#[async_trait]
pub trait RollbackAction: Send + Sync {
    async fn rollback(&self, operation_id: &str) -> Result<(), ClientError>;
}

/// An operation whose monitor run ended in a confirmed terminal failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailedOperation {
    operation: Operation,
    status: String,
}

impl FailedOperation {
    /// `Some` only for `Outcome::Failed`.
    pub fn from_outcome(operation: &Operation, outcome: &Outcome) -> Option<Self> {
        match outcome {
            Outcome::Failed { status, .. } => Some(Self {
                operation: operation.clone(),
                status: status.clone(),
            }),
            _ => None,
        }
    }

    pub fn operation(&self) -> &Operation {
        &self.operation
    }

    pub fn status(&self) -> &str {
        &self.status
    }
}

/// Submits a rollback and monitors it with its own deadline.
pub struct RollbackCoordinator<'a> {
    monitor: &'a OperationMonitor,
}

impl<'a> RollbackCoordinator<'a> {
    pub fn new(monitor: &'a OperationMonitor) -> Self {
        Self { monitor }
    }

    /// Invoke `action` once, then wait for the rollback to settle.
    ///
    /// The rollback attempt polls the same id through the same provider,
    /// with its own deadline of `timeout` starting now. A rejected rollback
    /// request surfaces as `Outcome::Errored`.
    pub async fn rollback(
        &self,
        failed: &FailedOperation,
        provider: &dyn StatusProvider,
        action: &dyn RollbackAction,
        timeout: Duration,
    ) -> Result<Outcome, ConfigError> {
        let primary = failed.operation();
        let attempt = Operation {
            timeout,
            ..primary.clone()
        };
        attempt.validate()?;

        let sink = self.monitor.sink();
        sink.write_line(&format!(
            "Updated {} {} failure (status {}), will try to rollback",
            primary.kind,
            primary.id,
            failed.status()
        ));
        sink.flush();

        if let Err(e) = action.rollback(&primary.id).await {
            tracing::warn!(
                kind = %primary.kind,
                id = %primary.id,
                error = %e,
                "rollback request rejected"
            );
            sink.write_line(&format!("Rollback request failed: {}", e));
            sink.flush();
            return Ok(Outcome::Errored(MonitorError::RollbackRejected(
                e.to_string(),
            )));
        }

        tracing::info!(kind = %primary.kind, id = %primary.id, "rollback submitted");
        let outcome = self.monitor.wait(provider, &attempt).await?;

        if outcome.is_success() {
            sink.write_line(&format!("Rollback {} {} finished", primary.kind, primary.id));
        } else {
            sink.write_line(&format!(
                "Rollback {} {} {}",
                primary.kind,
                primary.id,
                outcome.label()
            ));
        }
        sink.flush();
        Ok(outcome)
    }
}
