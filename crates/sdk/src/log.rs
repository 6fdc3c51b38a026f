//! Injected logging sink.
//!
//! Clients report their lifecycle and per-call outcomes through a [`Logger`]
//! chosen at configuration time. [`NoopLogger`] discards everything and
//! [`TracingLogger`] forwards to `tracing` under the `orisun_sdk` target.

/// Four-level logging sink used by the clients.
pub trait Logger: Send + Sync {
    /// Logs a debug message.
    fn debug(&self, message: &str);
    /// Logs an informational message.
    fn info(&self, message: &str);
    /// Logs a warning.
    fn warn(&self, message: &str);
    /// Logs an error.
    fn error(&self, message: &str);
}

/// Logger that discards every message.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopLogger;

impl Logger for NoopLogger {
    fn debug(&self, _message: &str) {}
    fn info(&self, _message: &str) {}
    fn warn(&self, _message: &str) {}
    fn error(&self, _message: &str) {}
}

/// Logger that emits `tracing` events with target `orisun_sdk`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingLogger;

impl Logger for TracingLogger {
    fn debug(&self, message: &str) {
        tracing::debug!(target: "orisun_sdk", "{message}");
    }

    fn info(&self, message: &str) {
        tracing::info!(target: "orisun_sdk", "{message}");
    }

    fn warn(&self, message: &str) {
        tracing::warn!(target: "orisun_sdk", "{message}");
    }

    fn error(&self, message: &str) {
        tracing::error!(target: "orisun_sdk", "{message}");
    }
}
