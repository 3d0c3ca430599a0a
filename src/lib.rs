//! alauda-pipeline - pipeline steps for the Alauda platform
//!
//! Submits builds, service deployments and component updates to the
//! platform and, unless asked to run asynchronously, waits for each remote
//! operation to finish.
//!
//! ## Call chain
//! Step request -> `Platform` facade -> `OperationDriver::run`
//! -> submit once -> `OperationMonitor::wait` (poll until terminal, error
//! or deadline) -> optional `RollbackCoordinator` -> `OperationResult` or
//! `DriverError`.
//!
//! All three resource kinds share one monitor; the per-kind differences are
//! the status provider, the classification of raw status and the detail
//! link template.

// Core error handling
pub mod error;

// Configuration value objects (no global state)
pub mod config;

// Console detail links
pub mod links;

// Injected collaborators: time and step console
pub mod clock;
pub mod sink;

// Polling state machine and status vocabulary
pub mod monitor;

// Compensating rollback after a failed update
pub mod rollback;

// Submit -> monitor -> rollback -> report
pub mod driver;

// Remote platform API boundary and per-kind status bindings
pub mod client;
pub mod providers;

// Per-kind operations and the step-facing facade
pub mod platform;
pub mod resources;

// Pipeline step requests
pub mod steps;

pub use clock::{Clock, TokioClock};
pub use config::{PlatformConfig, PollingConfig};
pub use driver::{OperationDriver, OperationResult, RunOptions};
pub use error::{ClientError, ConfigError, DriverError, MonitorError, StatusError, StepError};
pub use monitor::{Operation, OperationMonitor, Outcome, ResourceKind, StatusSnapshot};
pub use platform::Platform;
pub use sink::LogSink;
