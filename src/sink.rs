//! Step console output.
//!
//! Progress lines go to the step console rather than to `tracing`, and the
//! sink is flushed after every poll so output from concurrently running
//! steps stays ordered.

use std::io::Write;
use std::sync::Mutex;

pub trait LogSink: Send + Sync {
    fn write_line(&self, line: &str);

    fn flush(&self);
}

/// Forwards console lines to `tracing` at info level.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl LogSink for TracingSink {
    fn write_line(&self, line: &str) {
        tracing::info!(target: "alauda_pipeline::console", "{}", line);
    }

    fn flush(&self) {}
}

/// Writes console lines to any `Write`, e.g. stdout or a log file.
pub struct WriterSink<W: Write + Send> {
    writer: Mutex<W>,
}

impl<W: Write + Send> WriterSink<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer: Mutex::new(writer),
        }
    }

    pub fn into_inner(self) -> W {
        match self.writer.into_inner() {
            Ok(writer) => writer,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl<W: Write + Send> LogSink for WriterSink<W> {
    fn write_line(&self, line: &str) {
        if let Ok(mut writer) = self.writer.lock() {
            if let Err(e) = writeln!(writer, "{}", line) {
                tracing::warn!(error = %e, "failed to write console line");
            }
        }
    }

    fn flush(&self) {
        if let Ok(mut writer) = self.writer.lock() {
            if let Err(e) = writer.flush() {
                tracing::warn!(error = %e, "failed to flush console");
            }
        }
    }
}
