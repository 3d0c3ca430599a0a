//! OperationDriver: submit, wait, roll back, report.
//!
//! One driver shape serves every resource kind. A `ResourceOperation`
//! supplies the kind-specific parts (the mutating call, the status
//! provider, poll cadence, detail link id and optional rollback); the
//! driver turns the monitor outcome into an `OperationResult` or a single
//! `DriverError` carrying the detail link.

use std::time::Duration;

use async_trait::async_trait;

use crate::error::{ClientError, ConfigError, DriverError, MonitorError, RollbackReport};
use crate::links::DetailLinks;
use crate::monitor::{Operation, OperationMonitor, Outcome, ResourceKind, StatusProvider};
use crate::rollback::{FailedOperation, RollbackAction, RollbackCoordinator};

/// Kind-specific half of a driver invocation.
#[async_trait]
pub trait ResourceOperation: Send + Sync {
    fn kind(&self) -> ResourceKind;

    /// Human label for console lines, e.g. `Build:[space/config]`.
    fn label(&self) -> String;

    /// Reject arguments the platform would accept but the monitor cannot
    /// follow. Runs before `submit`.
    fn validate(&self) -> Result<(), ConfigError> {
        Ok(())
    }

    /// Issue the mutating call. Called exactly once per driver invocation.
    async fn submit(&self) -> Result<String, ClientError>;

    fn status_provider(&self) -> &dyn StatusProvider;

    /// Monitor parameters for the submitted operation.
    fn operation(&self, operation_id: &str, timeout: Duration) -> Operation;

    /// Id used in the console detail link.
    fn link_id(&self, operation_id: &str) -> String {
        operation_id.to_string()
    }

    /// Compensating action for a failed update, if the operation has one.
    fn rollback_action(&self) -> Option<&dyn RollbackAction> {
        None
    }
}

/// Caller choices for one invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOptions {
    /// Return right after submit without monitoring.
    pub asynchronous: bool,
    pub timeout: Duration,
    /// Service and component updates only.
    pub rollback_on_fail: bool,
    /// Builds only: report a failed build as a result instead of an error.
    pub ignore_result: bool,
    /// Deadline for the rollback's own monitor run; `None` reuses `timeout`.
    pub rollback_timeout: Option<Duration>,
}

impl RunOptions {
    pub fn wait(timeout: Duration) -> Self {
        Self {
            asynchronous: false,
            timeout,
            rollback_on_fail: false,
            ignore_result: false,
            rollback_timeout: None,
        }
    }

    pub fn fire_and_forget() -> Self {
        Self {
            asynchronous: true,
            ..Self::wait(Duration::ZERO)
        }
    }

    pub fn with_rollback(mut self, rollback_on_fail: bool) -> Self {
        self.rollback_on_fail = rollback_on_fail;
        self
    }

    pub fn with_ignore_result(mut self, ignore_result: bool) -> Self {
        self.ignore_result = ignore_result;
        self
    }

    pub fn validate_for(&self, kind: ResourceKind) -> Result<(), ConfigError> {
        if self.ignore_result && kind != ResourceKind::Build {
            return Err(ConfigError::Unsupported {
                option: "ignore_result",
                kind,
            });
        }
        if self.rollback_on_fail && kind == ResourceKind::Build {
            return Err(ConfigError::Unsupported {
                option: "rollback_on_fail",
                kind,
            });
        }
        if !self.asynchronous && self.timeout.is_zero() {
            return Err(ConfigError::ZeroTimeout);
        }
        if self.rollback_timeout.is_some_and(|t| t.is_zero()) {
            return Err(ConfigError::ZeroTimeout);
        }
        Ok(())
    }
}

/// Successful end of a driver invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationResult {
    pub kind: ResourceKind,
    pub id: String,
    pub detail_link: String,
    /// `None` when the caller did not wait.
    pub outcome: Option<Outcome>,
}

// ---------------------------------------------------------------------------
// OperationDriver
// ---------------------------------------------------------------------------

#[derive(Clone)]
pub struct OperationDriver {
    monitor: OperationMonitor,
    links: DetailLinks,
}

impl OperationDriver {
    pub fn new(monitor: OperationMonitor, links: DetailLinks) -> Self {
        Self { monitor, links }
    }

    pub fn monitor(&self) -> &OperationMonitor {
        &self.monitor
    }

    pub fn links(&self) -> &DetailLinks {
        &self.links
    }

    /// Submit `op` and, unless asynchronous, drive it to a final result.
    pub async fn run(
        &self,
        op: &dyn ResourceOperation,
        options: &RunOptions,
    ) -> Result<OperationResult, DriverError> {
        let kind = op.kind();
        let label = op.label();
        options.validate_for(kind)?;
        op.validate()?;

        let sink = self.monitor.sink();
        sink.write_line(&format!("{} Starting", label));
        sink.flush();

        let id = match op.submit().await {
            Ok(id) if !id.trim().is_empty() => id,
            Ok(_) => {
                tracing::warn!(kind = %kind, label = %label, "submit returned no operation id");
                return Err(DriverError::Submit {
                    label,
                    source: ClientError::Malformed("submit returned an empty operation id".into()),
                });
            }
            Err(source) => {
                tracing::warn!(kind = %kind, label = %label, error = %source, "submit failed");
                return Err(DriverError::Submit { label, source });
            }
        };
        let link = self.links.for_kind(kind, &op.link_id(&id));

        sink.write_line(&format!(
            "{} {} has been started. Show the details -> {}",
            label, id, link
        ));
        tracing::info!(kind = %kind, id = %id, asynchronous = options.asynchronous, "operation submitted");

        if options.asynchronous {
            sink.flush();
            return Ok(OperationResult {
                kind,
                id,
                detail_link: link,
                outcome: None,
            });
        }

        sink.write_line(&format!("{} waiting for completion...", label));
        sink.flush();

        let operation = op.operation(&id, options.timeout);
        let outcome = self.monitor.wait(op.status_provider(), &operation).await?;

        match &outcome {
            Outcome::Succeeded { .. } => {
                sink.write_line(&format!("{} SUCCEED, detail -> {}", label, link));
                sink.flush();
                tracing::info!(kind = %kind, id = %id, "operation succeeded");
                Ok(OperationResult {
                    kind,
                    id,
                    detail_link: link,
                    outcome: Some(outcome),
                })
            }
            Outcome::Failed { status, .. } => {
                if options.ignore_result {
                    sink.write_line(&format!(
                        "{} FAIL (result ignored), detail -> {}",
                        label, link
                    ));
                    sink.flush();
                    tracing::warn!(kind = %kind, id = %id, status = %status, "operation failed, result ignored");
                    return Ok(OperationResult {
                        kind,
                        id,
                        detail_link: link,
                        outcome: Some(outcome),
                    });
                }
                Err(self
                    .fail(op, options, &operation, &outcome, label, id, link)
                    .await?)
            }
            Outcome::TimedOut {
                elapsed,
                last_status,
            } => {
                sink.write_line(&format!("{} TIMEOUT, detail -> {}", label, link));
                sink.flush();
                Err(DriverError::TimedOut {
                    label,
                    id,
                    link,
                    elapsed: *elapsed,
                    last_status: last_status.clone(),
                })
            }
            Outcome::Errored(cause) => {
                sink.write_line(&format!("{} ERROR: {}, detail -> {}", label, cause, link));
                sink.flush();
                Err(DriverError::Errored {
                    label,
                    id,
                    link,
                    cause: cause.clone(),
                })
            }
        }
    }

    /// Build the error for a confirmed failure, rolling back first if asked.
    #[allow(clippy::too_many_arguments)]
    async fn fail(
        &self,
        op: &dyn ResourceOperation,
        options: &RunOptions,
        operation: &Operation,
        outcome: &Outcome,
        label: String,
        id: String,
        link: String,
    ) -> Result<DriverError, ConfigError> {
        let sink = self.monitor.sink();
        sink.write_line(&format!("{} FAIL, detail -> {}", label, link));
        sink.flush();

        let rollback = if !options.rollback_on_fail {
            RollbackReport::NotRequested
        } else if let (Some(action), Some(failed)) = (
            op.rollback_action(),
            FailedOperation::from_outcome(operation, outcome),
        ) {
            let timeout = options.rollback_timeout.unwrap_or(options.timeout);
            let rollback_outcome = RollbackCoordinator::new(&self.monitor)
                .rollback(&failed, op.status_provider(), action, timeout)
                .await?;
            // The rollback is monitored under the same id and shares its console page.
            let rollback_link = self.links.for_kind(op.kind(), &op.link_id(&id));

            if !rollback_outcome.is_success() {
                let cause = describe_rollback_failure(&rollback_outcome);
                tracing::error!(kind = %op.kind(), id = %id, cause = %cause, "rollback did not complete");
                return Ok(DriverError::RollbackFailed {
                    label,
                    id,
                    link,
                    rollback_link,
                    cause,
                });
            }
            tracing::info!(kind = %op.kind(), id = %id, "rollback completed");
            RollbackReport::RolledBack {
                link: rollback_link,
            }
        } else {
            sink.write_line(&format!("{} has nothing to roll back to", label));
            sink.flush();
            RollbackReport::Unavailable
        };

        tracing::warn!(kind = %op.kind(), id = %id, rollback = %rollback, "operation failed");
        Ok(DriverError::Failed {
            label,
            id,
            link,
            rollback,
        })
    }
}

fn describe_rollback_failure(outcome: &Outcome) -> String {
    match outcome {
        Outcome::Failed { status, .. } => format!("rollback ended with status {}", status),
        Outcome::TimedOut {
            elapsed,
            last_status,
        } => format!(
            "rollback timed out after {}s (last status: {})",
            elapsed.as_secs(),
            last_status.as_deref().unwrap_or("unknown")
        ),
        Outcome::Errored(MonitorError::RollbackRejected(reason)) => {
            format!("rollback request was not accepted: {}", reason)
        }
        Outcome::Errored(cause) => cause.to_string(),
        Outcome::Succeeded { .. } => "rollback succeeded".to_string(),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
