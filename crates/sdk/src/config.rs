//! Client configuration with builder pattern.
//!
//! Provides validated configuration shared by [`EventStoreClient`](crate::EventStoreClient)
//! and [`AdminClient`](crate::AdminClient):
//! - Connection target (host, port, explicit target) and load-balancing policy
//! - Credentials for basic authentication
//! - Timeouts and HTTP/2 keep-alive settings
//! - Retry policy for unary calls
//! - Logging sink

use std::{fmt, sync::Arc, time::Duration};

use snafu::ensure;
use tonic::Code;

use crate::{
    error::{ConfigSnafu, Result},
    log::{Logger, NoopLogger, TracingLogger},
    target::{ConnectionTarget, LoadBalancingPolicy},
};

/// Default username for basic authentication.
pub const DEFAULT_USERNAME: &str = "admin";

/// Default password for basic authentication.
pub const DEFAULT_PASSWORD: &str = "changeit";

/// Default request timeout (30 seconds).
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Default connection timeout (5 seconds).
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Default HTTP/2 keep-alive ping interval.
const DEFAULT_KEEPALIVE_INTERVAL: Duration = Duration::from_secs(30);

/// Default HTTP/2 keep-alive ping timeout.
const DEFAULT_KEEPALIVE_TIMEOUT: Duration = Duration::from_secs(10);

/// Configuration for the Orisun clients.
#[derive(Clone)]
pub struct ClientConfig {
    pub(crate) target: ConnectionTarget,
    pub(crate) username: String,
    pub(crate) password: String,
    pub(crate) timeout: Duration,
    pub(crate) connect_timeout: Duration,
    pub(crate) keepalive_interval: Duration,
    pub(crate) keepalive_timeout: Duration,
    pub(crate) keepalive_while_idle: bool,
    pub(crate) retry_policy: RetryPolicy,
    pub(crate) logger: Arc<dyn Logger>,
}

impl ClientConfig {
    /// Creates a new configuration builder.
    #[must_use]
    pub fn builder() -> ClientConfigBuilder {
        ClientConfigBuilder::default()
    }

    /// Returns the resolved connection target.
    #[must_use]
    pub fn target(&self) -> &ConnectionTarget {
        &self.target
    }

    /// Returns the username used for basic authentication.
    #[must_use]
    pub fn username(&self) -> &str {
        &self.username
    }

    /// Returns the request timeout.
    #[must_use]
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Returns the connection timeout.
    #[must_use]
    pub fn connect_timeout(&self) -> Duration {
        self.connect_timeout
    }

    /// Returns the HTTP/2 keep-alive interval.
    #[must_use]
    pub fn keepalive_interval(&self) -> Duration {
        self.keepalive_interval
    }

    /// Returns the HTTP/2 keep-alive timeout.
    #[must_use]
    pub fn keepalive_timeout(&self) -> Duration {
        self.keepalive_timeout
    }

    /// Returns whether keep-alive pings are sent on idle connections.
    #[must_use]
    pub fn keepalive_while_idle(&self) -> bool {
        self.keepalive_while_idle
    }

    /// Returns the retry policy.
    #[must_use]
    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry_policy
    }

    /// Returns the logging sink.
    #[must_use]
    pub fn logger(&self) -> &Arc<dyn Logger> {
        &self.logger
    }
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("target", &self.target)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("timeout", &self.timeout)
            .field("connect_timeout", &self.connect_timeout)
            .field("keepalive_interval", &self.keepalive_interval)
            .field("keepalive_timeout", &self.keepalive_timeout)
            .field("keepalive_while_idle", &self.keepalive_while_idle)
            .field("retry_policy", &self.retry_policy)
            .finish_non_exhaustive()
    }
}

/// Builder for [`ClientConfig`].
#[derive(Default)]
pub struct ClientConfigBuilder {
    host: Option<String>,
    port: Option<u32>,
    target: Option<String>,
    username: Option<String>,
    password: Option<String>,
    load_balancing_policy: Option<String>,
    timeout: Option<Duration>,
    connect_timeout: Option<Duration>,
    keepalive_interval: Option<Duration>,
    keepalive_timeout: Option<Duration>,
    keepalive_while_idle: Option<bool>,
    retries: Option<bool>,
    retry_policy: Option<RetryPolicy>,
    logger: Option<Arc<dyn Logger>>,
    logging: bool,
}

impl ClientConfigBuilder {
    /// Sets the server host, or a comma-separated list of hosts sharing one port.
    #[must_use]
    pub fn with_host<S: Into<String>>(mut self, host: S) -> Self {
        self.host = Some(host.into());
        self
    }

    /// Sets the server port. Required with [`with_host`](Self::with_host).
    ///
    /// Accepts a `u32` so out-of-range values are reported by [`build`](Self::build)
    /// instead of being truncated.
    #[must_use]
    pub fn with_port(mut self, port: u32) -> Self {
        self.port = Some(port);
        self
    }

    /// Sets an explicit connection target such as `dns:///events.internal:5005`.
    ///
    /// Takes precedence over host and port.
    #[must_use]
    pub fn with_target<S: Into<String>>(mut self, target: S) -> Self {
        self.target = Some(target.into());
        self
    }

    /// Sets the username for basic authentication.
    ///
    /// Default: `admin`.
    #[must_use]
    pub fn with_username<S: Into<String>>(mut self, username: S) -> Self {
        self.username = Some(username.into());
        self
    }

    /// Sets the password for basic authentication.
    ///
    /// Default: `changeit`.
    #[must_use]
    pub fn with_password<S: Into<String>>(mut self, password: S) -> Self {
        self.password = Some(password.into());
        self
    }

    /// Sets the load-balancing policy by name (`round_robin` or `pick_first`).
    ///
    /// Default: `round_robin`.
    #[must_use]
    pub fn with_load_balancing_policy<S: Into<String>>(mut self, policy: S) -> Self {
        self.load_balancing_policy = Some(policy.into());
        self
    }

    /// Sets the request timeout.
    ///
    /// Default: 30 seconds.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Sets the connection establishment timeout.
    ///
    /// Default: 5 seconds.
    #[must_use]
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }

    /// Sets the HTTP/2 keep-alive ping interval.
    ///
    /// Default: 30 seconds.
    #[must_use]
    pub fn with_keepalive_interval(mut self, interval: Duration) -> Self {
        self.keepalive_interval = Some(interval);
        self
    }

    /// Sets how long to wait for a keep-alive ping acknowledgement.
    ///
    /// Default: 10 seconds.
    #[must_use]
    pub fn with_keepalive_timeout(mut self, timeout: Duration) -> Self {
        self.keepalive_timeout = Some(timeout);
        self
    }

    /// Sets whether keep-alive pings are sent while no call is in flight.
    ///
    /// Default: enabled.
    #[must_use]
    pub fn with_keepalive_while_idle(mut self, enabled: bool) -> Self {
        self.keepalive_while_idle = Some(enabled);
        self
    }

    /// Enables or disables retries of unary calls.
    ///
    /// When disabled every call makes a single attempt, regardless of the policy.
    #[must_use]
    pub fn with_retries(mut self, enabled: bool) -> Self {
        self.retries = Some(enabled);
        self
    }

    /// Sets the retry policy for unary calls.
    ///
    /// Default: [`RetryPolicy::default()`].
    #[must_use]
    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry_policy = Some(policy);
        self
    }

    /// Sets a custom logging sink.
    #[must_use]
    pub fn with_logger(mut self, logger: Arc<dyn Logger>) -> Self {
        self.logger = Some(logger);
        self
    }

    /// Enables logging through [`TracingLogger`] when no custom logger is set.
    ///
    /// Default: disabled.
    #[must_use]
    pub fn with_logging(mut self, enabled: bool) -> Self {
        self.logging = enabled;
        self
    }

    /// Builds the configuration, validating all settings.
    ///
    /// # Errors
    ///
    /// Returns [`SdkError::Config`](crate::SdkError::Config) if:
    /// - Neither host nor target is provided, or host is given without a port
    /// - The port is outside `1..=65535`
    /// - The load-balancing policy is not `round_robin` or `pick_first`
    /// - A timeout or the keep-alive interval is zero
    /// - The retry policy is invalid
    pub fn build(self) -> Result<ClientConfig> {
        let policy = match self.load_balancing_policy.as_deref() {
            Some(name) => name.parse::<LoadBalancingPolicy>()?,
            None => LoadBalancingPolicy::default(),
        };

        let target = ConnectionTarget::resolve(
            self.host.as_deref(),
            self.port,
            self.target.as_deref(),
            policy,
        )?;

        let timeout = self.timeout.unwrap_or(DEFAULT_TIMEOUT);
        ensure!(!timeout.is_zero(), ConfigSnafu { message: "timeout cannot be zero" });

        let connect_timeout = self.connect_timeout.unwrap_or(DEFAULT_CONNECT_TIMEOUT);
        ensure!(
            !connect_timeout.is_zero(),
            ConfigSnafu { message: "connect_timeout cannot be zero" }
        );

        let keepalive_interval = self.keepalive_interval.unwrap_or(DEFAULT_KEEPALIVE_INTERVAL);
        ensure!(
            !keepalive_interval.is_zero(),
            ConfigSnafu { message: "keepalive_interval cannot be zero" }
        );

        let mut retry_policy = self.retry_policy.unwrap_or_default();
        retry_policy.validate()?;
        if self.retries == Some(false) {
            retry_policy.max_attempts = 1;
        }

        let logger: Arc<dyn Logger> = match (self.logger, self.logging) {
            (Some(logger), _) => logger,
            (None, true) => Arc::new(TracingLogger),
            (None, false) => Arc::new(NoopLogger),
        };

        Ok(ClientConfig {
            target,
            username: self.username.unwrap_or_else(|| DEFAULT_USERNAME.to_owned()),
            password: self.password.unwrap_or_else(|| DEFAULT_PASSWORD.to_owned()),
            timeout,
            connect_timeout,
            keepalive_interval,
            keepalive_timeout: self.keepalive_timeout.unwrap_or(DEFAULT_KEEPALIVE_TIMEOUT),
            keepalive_while_idle: self.keepalive_while_idle.unwrap_or(true),
            retry_policy,
            logger,
        })
    }
}

/// Retry policy for unary calls.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Maximum number of attempts (including the initial attempt).
    pub max_attempts: u32,

    /// Initial backoff duration before first retry.
    pub initial_backoff: Duration,

    /// Maximum backoff duration.
    pub max_backoff: Duration,

    /// Backoff multiplier for exponential increase.
    pub multiplier: f64,

    /// Jitter factor (0.0 to 1.0) for randomizing backoff.
    pub jitter: f64,

    /// Status codes that trigger another attempt.
    pub retryable_codes: Vec<Code>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            initial_backoff: Duration::from_millis(100),
            max_backoff: Duration::from_secs(10),
            multiplier: 1.5,
            jitter: 0.1,
            retryable_codes: vec![Code::Unavailable, Code::Unknown],
        }
    }
}

impl RetryPolicy {
    /// Creates a new retry policy builder.
    #[must_use]
    pub fn builder() -> RetryPolicyBuilder {
        RetryPolicyBuilder::default()
    }

    /// Creates a policy that never retries.
    #[must_use]
    pub fn no_retry() -> Self {
        Self { max_attempts: 1, ..Default::default() }
    }

    /// Returns true if `code` is in the retryable set.
    #[must_use]
    pub fn retries_code(&self, code: Code) -> bool {
        self.retryable_codes.contains(&code)
    }

    fn validate(&self) -> Result<()> {
        ensure!(
            self.max_attempts >= 1,
            ConfigSnafu { message: "retry policy max_attempts must be at least 1" }
        );
        ensure!(
            self.multiplier > 0.0,
            ConfigSnafu { message: "retry policy multiplier must be greater than 0" }
        );
        ensure!(
            (0.0..=1.0).contains(&self.jitter),
            ConfigSnafu { message: "retry policy jitter must be between 0.0 and 1.0" }
        );
        ensure!(
            self.initial_backoff <= self.max_backoff,
            ConfigSnafu { message: "retry policy initial_backoff cannot exceed max_backoff" }
        );
        Ok(())
    }
}

/// Builder for [`RetryPolicy`].
#[derive(Debug, Default)]
pub struct RetryPolicyBuilder {
    max_attempts: Option<u32>,
    initial_backoff: Option<Duration>,
    max_backoff: Option<Duration>,
    multiplier: Option<f64>,
    jitter: Option<f64>,
    retryable_codes: Option<Vec<Code>>,
}

impl RetryPolicyBuilder {
    /// Sets the maximum number of attempts.
    #[must_use]
    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = Some(attempts);
        self
    }

    /// Sets the initial backoff duration.
    #[must_use]
    pub fn with_initial_backoff(mut self, backoff: Duration) -> Self {
        self.initial_backoff = Some(backoff);
        self
    }

    /// Sets the maximum backoff duration.
    #[must_use]
    pub fn with_max_backoff(mut self, backoff: Duration) -> Self {
        self.max_backoff = Some(backoff);
        self
    }

    /// Sets the backoff multiplier.
    #[must_use]
    pub fn with_multiplier(mut self, multiplier: f64) -> Self {
        self.multiplier = Some(multiplier);
        self
    }

    /// Sets the jitter factor (0.0 to 1.0).
    #[must_use]
    pub fn with_jitter(mut self, jitter: f64) -> Self {
        self.jitter = Some(jitter);
        self
    }

    /// Sets the status codes that trigger another attempt.
    #[must_use]
    pub fn with_retryable_codes<I: IntoIterator<Item = Code>>(mut self, codes: I) -> Self {
        self.retryable_codes = Some(codes.into_iter().collect());
        self
    }

    /// Builds the retry policy.
    ///
    /// Values are checked when the policy is passed to
    /// [`ClientConfigBuilder::build`].
    #[must_use]
    pub fn build(self) -> RetryPolicy {
        let defaults = RetryPolicy::default();
        RetryPolicy {
            max_attempts: self.max_attempts.unwrap_or(defaults.max_attempts),
            initial_backoff: self.initial_backoff.unwrap_or(defaults.initial_backoff),
            max_backoff: self.max_backoff.unwrap_or(defaults.max_backoff),
            multiplier: self.multiplier.unwrap_or(defaults.multiplier),
            jitter: self.jitter.unwrap_or(defaults.jitter),
            retryable_codes: self.retryable_codes.unwrap_or(defaults.retryable_codes),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic, clippy::disallowed_methods)]
mod tests {
    use super::*;
    use crate::SdkError;

    fn localhost() -> ClientConfigBuilder {
        ClientConfig::builder().with_host("localhost").with_port(5005)
    }

    #[test]
    fn test_defaults() {
        let config = localhost().build().unwrap();

        assert_eq!(config.target().destination(), "localhost:5005");
        assert_eq!(config.target().policy(), LoadBalancingPolicy::RoundRobin);
        assert_eq!(config.username(), "admin");
        assert_eq!(config.password, "changeit");
        assert_eq!(config.timeout(), DEFAULT_TIMEOUT);
        assert_eq!(config.connect_timeout(), DEFAULT_CONNECT_TIMEOUT);
        assert_eq!(config.keepalive_interval(), Duration::from_secs(30));
        assert_eq!(config.keepalive_timeout(), Duration::from_secs(10));
        assert!(config.keepalive_while_idle());
        assert_eq!(config.retry_policy(), &RetryPolicy::default());
    }

    #[test]
    fn test_target_only() {
        let config = ClientConfig::builder().with_target("ipv4:10.0.0.10:5005").build().unwrap();
        assert_eq!(config.target().destination(), "ipv4:10.0.0.10:5005");
    }

    #[test]
    fn test_missing_host_and_target() {
        let err = ClientConfig::builder().with_port(5005).build().unwrap_err();
        assert!(matches!(err, SdkError::Config { .. }));
    }

    #[test]
    fn test_invalid_port() {
        assert!(localhost().with_port(0).build().is_err());
        assert!(localhost().with_port(65536).build().is_err());
        assert!(localhost().with_port(65535).build().is_ok());
    }

    #[test]
    fn test_load_balancing_policy() {
        let config = localhost().with_load_balancing_policy("pick_first").build().unwrap();
        assert_eq!(config.target().policy(), LoadBalancingPolicy::PickFirst);

        let err = localhost().with_load_balancing_policy("least_loaded").build().unwrap_err();
        assert!(err.to_string().contains("pick_first"));
    }

    #[test]
    fn test_zero_timeouts_rejected() {
        assert!(localhost().with_timeout(Duration::ZERO).build().is_err());
        assert!(localhost().with_connect_timeout(Duration::ZERO).build().is_err());
        assert!(localhost().with_keepalive_interval(Duration::ZERO).build().is_err());
    }

    #[test]
    fn test_retries_disabled_forces_single_attempt() {
        let config = localhost()
            .with_retry_policy(RetryPolicy::builder().with_max_attempts(7).build())
            .with_retries(false)
            .build()
            .unwrap();
        assert_eq!(config.retry_policy().max_attempts, 1);
    }

    #[test]
    fn test_invalid_retry_policy() {
        let zero_attempts = RetryPolicy::builder().with_max_attempts(0).build();
        assert!(localhost().with_retry_policy(zero_attempts).build().is_err());

        let bad_multiplier = RetryPolicy::builder().with_multiplier(0.0).build();
        let err = localhost().with_retry_policy(bad_multiplier).build().unwrap_err();
        assert!(err.to_string().contains("multiplier"));

        let bad_jitter = RetryPolicy::builder().with_jitter(1.5).build();
        assert!(localhost().with_retry_policy(bad_jitter).build().is_err());
    }

    #[test]
    fn test_retry_policy_codes() {
        let policy = RetryPolicy::default();
        assert!(policy.retries_code(Code::Unavailable));
        assert!(policy.retries_code(Code::Unknown));
        assert!(!policy.retries_code(Code::InvalidArgument));

        let policy = RetryPolicy::builder().with_retryable_codes([Code::Aborted]).build();
        assert!(policy.retries_code(Code::Aborted));
        assert!(!policy.retries_code(Code::Unavailable));
    }

    #[test]
    fn test_debug_redacts_password() {
        let config = localhost().with_password("s3cret").build().unwrap();
        let debug = format!("{config:?}");
        assert!(!debug.contains("s3cret"));
        assert!(debug.contains("<redacted>"));
    }
}
