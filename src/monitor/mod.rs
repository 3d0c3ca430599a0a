//! OperationMonitor: polls a remote operation until it settles.
//!
//! One generic loop serves builds, services and components. The loop
//! checks the deadline before every query, so a run that starts past its
//! deadline never queries. Transient query failures are logged and retried
//! on the next tick without consuming any budget; a malformed response ends
//! the run at once. Polling is strictly sequential: poll N+1 is issued only
//! after poll N has returned and been classified.
//!
//! Worst-case wall time is `timeout + one query round trip + one sleep`.
//! An in-flight query is never cancelled; an interrupt only aborts sleeps.

pub mod classify;
mod types;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::watch;
use tokio::time::Instant;

use crate::clock::Clock;
use crate::error::{ConfigError, MonitorError, StatusError};
use crate::sink::LogSink;

pub use types::{Operation, Outcome, Phase, ResourceKind, StatusSnapshot};

/// Upper bound applied when `start + timeout` does not fit the clock.
const FAR_FUTURE: Duration = Duration::from_secs(100 * 365 * 24 * 60 * 60);

/// Source of status snapshots for one resource kind.
///
/// Implementations must keep the two failure classes apart: only
/// `StatusError::Transient` is retried.
#[async_trait]
pub trait StatusProvider: Send + Sync {
    fn kind(&self) -> ResourceKind;

    async fn get_status(&self, operation_id: &str) -> Result<StatusSnapshot, StatusError>;
}

// ---------------------------------------------------------------------------
// OperationMonitor
// ---------------------------------------------------------------------------

/// Polling state machine producing exactly one `Outcome` per run.
#[derive(Clone)]
pub struct OperationMonitor {
    clock: Arc<dyn Clock>,
    sink: Arc<dyn LogSink>,
    /// Cooperative interrupt; `true` aborts the current sleep.
    interrupt: Option<watch::Receiver<bool>>,
}

impl OperationMonitor {
    pub fn new(clock: Arc<dyn Clock>, sink: Arc<dyn LogSink>) -> Self {
        Self {
            clock,
            sink,
            interrupt: None,
        }
    }

    /// Abort sleeps when the watched value becomes `true`.
    pub fn with_interrupt(mut self, interrupt: watch::Receiver<bool>) -> Self {
        self.interrupt = Some(interrupt);
        self
    }

    pub fn sink(&self) -> &Arc<dyn LogSink> {
        &self.sink
    }

    /// Poll `provider` for `operation` until terminal, error or deadline.
    ///
    /// Fails fast with `ConfigError` before any polling when the operation
    /// has a zero timeout, a zero poll interval or an empty id.
    pub async fn wait(
        &self,
        provider: &dyn StatusProvider,
        operation: &Operation,
    ) -> Result<Outcome, ConfigError> {
        operation.validate()?;

        let started = self.clock.now();
        let deadline = deadline_after(started, operation.timeout);
        let mut polls: u32 = 0;
        let mut last_status: Option<String> = None;

        tracing::debug!(
            kind = %operation.kind,
            id = %operation.id,
            timeout_secs = operation.timeout.as_secs(),
            interval_secs = operation.poll_interval.as_secs(),
            "monitor started"
        );

        if !operation.warmup.is_zero() {
            if let Err(cause) = self.pause(operation.warmup).await {
                return Ok(self.interrupted(operation, cause));
            }
        }

        loop {
            let now = self.clock.now();
            if now >= deadline {
                let elapsed = now.saturating_duration_since(started);
                self.sink.write_line(&format!(
                    "Timeout, more than {} seconds!",
                    operation.timeout.as_secs()
                ));
                self.sink.flush();
                tracing::warn!(
                    kind = %operation.kind,
                    id = %operation.id,
                    polls,
                    elapsed_secs = elapsed.as_secs(),
                    last_status = last_status.as_deref().unwrap_or("unknown"),
                    "monitor timed out"
                );
                return Ok(Outcome::TimedOut {
                    elapsed,
                    last_status,
                });
            }

            polls += 1;
            let result = provider.get_status(&operation.id).await;
            match result {
                Ok(snapshot) => {
                    self.sink.write_line(&format!(
                        "{}. Get {} [{}] status: {}",
                        polls,
                        operation.kind,
                        operation.id,
                        snapshot.raw_status()
                    ));
                    self.sink.flush();
                    tracing::debug!(
                        kind = %operation.kind,
                        id = %operation.id,
                        poll = polls,
                        status = snapshot.raw_status(),
                        phase = ?snapshot.phase(),
                        "status polled"
                    );

                    let status = snapshot.raw_status().to_string();
                    match snapshot.phase() {
                        Phase::TerminalSuccess => {
                            return Ok(Outcome::Succeeded { status, polls })
                        }
                        Phase::TerminalFailure => return Ok(Outcome::Failed { status, polls }),
                        Phase::NonTerminal => last_status = Some(status),
                    }
                }
                Err(StatusError::Transient(message)) => {
                    self.sink.write_line(&format!(
                        "{}. Monitor status error {}, will try again",
                        polls, message
                    ));
                    self.sink.flush();
                    tracing::debug!(
                        kind = %operation.kind,
                        id = %operation.id,
                        poll = polls,
                        error = %message,
                        "transient status error, retrying"
                    );
                }
                Err(StatusError::Malformed(message)) => {
                    self.sink.write_line(&format!(
                        "{}. Response data unexpected: {}",
                        polls, message
                    ));
                    self.sink.flush();
                    tracing::warn!(
                        kind = %operation.kind,
                        id = %operation.id,
                        poll = polls,
                        error = %message,
                        "malformed status response"
                    );
                    return Ok(Outcome::Errored(MonitorError::Malformed(message)));
                }
            }

            if let Err(cause) = self.pause(operation.poll_interval).await {
                return Ok(self.interrupted(operation, cause));
            }
        }
    }

    /// Sleep through the clock, aborting early on interrupt.
    async fn pause(&self, duration: Duration) -> Result<(), MonitorError> {
        let Some(interrupt) = &self.interrupt else {
            self.clock.delay(duration).await;
            return Ok(());
        };

        let mut rx = interrupt.clone();
        let interrupted = async move {
            loop {
                if *rx.borrow_and_update() {
                    return;
                }
                if rx.changed().await.is_err() {
                    if *rx.borrow() {
                        return;
                    }
                    // Sender gone without interrupting: nothing can fire any more.
                    std::future::pending::<()>().await;
                }
            }
        };

        tokio::select! {
            biased;
            _ = interrupted => Err(MonitorError::Interrupted),
            _ = self.clock.delay(duration) => Ok(()),
        }
    }

    fn interrupted(&self, operation: &Operation, cause: MonitorError) -> Outcome {
        self.sink.write_line("Interrupted, stop waiting");
        self.sink.flush();
        tracing::info!(kind = %operation.kind, id = %operation.id, "monitor interrupted");
        Outcome::Errored(cause)
    }
}

fn deadline_after(start: Instant, timeout: Duration) -> Instant {
    start
        .checked_add(timeout)
        .unwrap_or_else(|| start + FAR_FUTURE)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
