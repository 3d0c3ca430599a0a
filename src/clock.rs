//! Time source for the monitor.
//!
//! The monitor only reads the clock and sleeps through it, so tests can
//! substitute a clock that advances instantly.

use std::time::Duration;

use async_trait::async_trait;
use tokio::time::Instant;

#[async_trait]
pub trait Clock: Send + Sync {
    /// Current point on a monotonic reference clock.
    fn now(&self) -> Instant;

    /// Suspend for `duration`.
    async fn delay(&self, duration: Duration);
}

/// Clock backed by the tokio timer.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioClock;

#[async_trait]
impl Clock for TokioClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    async fn delay(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}
