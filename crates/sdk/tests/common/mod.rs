//! Helpers shared by the mock-server integration tests.

#![allow(dead_code)]

use std::{sync::Arc, time::Duration};

use orisun_sdk::{ClientConfig, Logger, RetryPolicy, mock::MockEventStoreServer};
use parking_lot::Mutex;

/// `Basic base64("admin:changeit")`.
pub const DEFAULT_BASIC: &str = "Basic YWRtaW46Y2hhbmdlaXQ=";

/// Log line captured by [`CapturingLogger`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogLine {
    pub level: &'static str,
    pub message: String,
}

/// Logger that records every message for later assertions.
#[derive(Debug, Default)]
pub struct CapturingLogger {
    lines: Mutex<Vec<LogLine>>,
}

impl CapturingLogger {
    pub fn lines(&self) -> Vec<LogLine> {
        self.lines.lock().clone()
    }

    pub fn contains(&self, level: &str, needle: &str) -> bool {
        self.lines.lock().iter().any(|l| l.level == level && l.message.contains(needle))
    }

    fn push(&self, level: &'static str, message: &str) {
        self.lines.lock().push(LogLine { level, message: message.to_owned() });
    }
}

impl Logger for CapturingLogger {
    fn debug(&self, message: &str) {
        self.push("debug", message);
    }

    fn info(&self, message: &str) {
        self.push("info", message);
    }

    fn warn(&self, message: &str) {
        self.push("warn", message);
    }

    fn error(&self, message: &str) {
        self.push("error", message);
    }
}

/// Fast retries so failure-injection tests stay quick.
pub fn fast_retry(max_attempts: u32) -> RetryPolicy {
    RetryPolicy::builder()
        .with_max_attempts(max_attempts)
        .with_initial_backoff(Duration::from_millis(5))
        .with_max_backoff(Duration::from_millis(20))
        .build()
}

/// Configuration pointing at the mock server, with a capturing logger.
pub fn config_for(server: &MockEventStoreServer) -> (ClientConfig, Arc<CapturingLogger>) {
    let logger = Arc::new(CapturingLogger::default());
    let config = ClientConfig::builder()
        .with_target(server.endpoint())
        .with_timeout(Duration::from_secs(5))
        .with_connect_timeout(Duration::from_secs(2))
        .with_retry_policy(fast_retry(3))
        .with_logger(Arc::clone(&logger) as Arc<dyn Logger>)
        .build()
        .expect("valid config");
    (config, logger)
}
