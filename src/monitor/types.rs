//! Core types for remote operation monitoring.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, MonitorError};

// ─── Resource kinds ──────────────────────────────────────────────────────────

/// Kind of remote resource an operation acts on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    Build,
    Service,
    Component,
}

impl ResourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceKind::Build => "build",
            ResourceKind::Service => "service",
            ResourceKind::Component => "component",
        }
    }
}

impl std::fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ─── Status snapshots ────────────────────────────────────────────────────────

/// Classification of one raw status value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    NonTerminal,
    TerminalSuccess,
    TerminalFailure,
}

impl Phase {
    pub fn is_terminal(self) -> bool {
        !matches!(self, Phase::NonTerminal)
    }
}

/// Immutable result of one status query.
///
/// Success is only representable for terminal statuses, so
/// `is_success() => is_terminal()` holds by construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusSnapshot {
    raw_status: String,
    phase: Phase,
}

impl StatusSnapshot {
    pub fn new(raw_status: impl Into<String>, phase: Phase) -> Self {
        Self {
            raw_status: raw_status.into(),
            phase,
        }
    }

    pub fn raw_status(&self) -> &str {
        &self.raw_status
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn is_terminal(&self) -> bool {
        self.phase.is_terminal()
    }

    pub fn is_success(&self) -> bool {
        self.phase == Phase::TerminalSuccess
    }
}

// ─── Operations ──────────────────────────────────────────────────────────────

/// One submitted action under monitoring. Lives for a single driver call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Operation {
    pub kind: ResourceKind,
    pub id: String,
    pub poll_interval: Duration,
    pub timeout: Duration,
    /// Delay before the first poll, counted against the deadline.
    pub warmup: Duration,
}

impl Operation {
    pub fn new(
        kind: ResourceKind,
        id: impl Into<String>,
        poll_interval: Duration,
        timeout: Duration,
    ) -> Self {
        Self {
            kind,
            id: id.into(),
            poll_interval,
            timeout,
            warmup: Duration::ZERO,
        }
    }

    pub fn with_warmup(mut self, warmup: Duration) -> Self {
        self.warmup = warmup;
        self
    }

    /// Reject operations the monitor cannot run.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.timeout.is_zero() {
            return Err(ConfigError::ZeroTimeout);
        }
        if self.poll_interval.is_zero() {
            return Err(ConfigError::ZeroPollInterval);
        }
        if self.id.trim().is_empty() {
            return Err(ConfigError::EmptyOperationId);
        }
        Ok(())
    }
}

// ─── Outcomes ────────────────────────────────────────────────────────────────

/// Terminal result of one monitor run. Exactly one variant per run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Succeeded {
        status: String,
        polls: u32,
    },
    Failed {
        status: String,
        polls: u32,
    },
    TimedOut {
        elapsed: Duration,
        last_status: Option<String>,
    },
    Errored(MonitorError),
}

impl Outcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Succeeded { .. })
    }

    /// Short name used in logs and step output.
    pub fn label(&self) -> &'static str {
        match self {
            Outcome::Succeeded { .. } => "SUCCEED",
            Outcome::Failed { .. } => "FAIL",
            Outcome::TimedOut { .. } => "TIMEOUT",
            Outcome::Errored(_) => "ERROR",
        }
    }

    /// Last raw status observed, if any.
    pub fn status(&self) -> Option<&str> {
        match self {
            Outcome::Succeeded { status, .. } | Outcome::Failed { status, .. } => Some(status),
            Outcome::TimedOut { last_status, .. } => last_status.as_deref(),
            Outcome::Errored(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_implies_terminal() {
        for phase in [Phase::NonTerminal, Phase::TerminalSuccess, Phase::TerminalFailure] {
            let snapshot = StatusSnapshot::new("x", phase);
            assert!(!snapshot.is_success() || snapshot.is_terminal());
        }
    }

    #[test]
    fn test_operation_validation() {
        let ok = Operation::new(
            ResourceKind::Build,
            "b-1",
            Duration::from_secs(5),
            Duration::from_secs(60),
        );
        assert!(ok.validate().is_ok());

        let mut zero_timeout = ok.clone();
        zero_timeout.timeout = Duration::ZERO;
        assert_eq!(zero_timeout.validate(), Err(ConfigError::ZeroTimeout));

        let mut zero_interval = ok.clone();
        zero_interval.poll_interval = Duration::ZERO;
        assert_eq!(
            zero_interval.validate(),
            Err(ConfigError::ZeroPollInterval)
        );

        let mut blank = ok;
        blank.id = "  ".to_string();
        assert_eq!(blank.validate(), Err(ConfigError::EmptyOperationId));
    }
}
