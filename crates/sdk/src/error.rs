//! SDK error types with call context.
//!
//! Errors fall into a few layers:
//! - **Construction**: [`SdkError::Config`], raised by the config builder.
//! - **Request shape**: [`SdkError::Validation`], raised before any network call.
//! - **Lifecycle**: [`SdkError::Disposed`], raised by every operation after `close()`.
//! - **Transport/remote**: [`SdkError::Rpc`] and [`SdkError::Transport`], always wrapped
//!   in [`SdkError::Call`] or [`SdkError::Subscription`] before reaching the caller.
//! - **Payload**: [`SdkError::Decode`] and [`SdkError::Encode`] for event JSON.

use std::fmt;

use snafu::{Location, Snafu};
use tonic::{Code, metadata::MetadataMap};

/// Result type alias for SDK operations.
pub type Result<T> = std::result::Result<T, SdkError>;

/// SDK error types with context-rich error messages.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum SdkError {
    /// Invalid client configuration.
    #[snafu(display("Configuration error: {message}"))]
    Config {
        /// Error description.
        message: String,
    },

    /// Request rejected before reaching the server.
    #[snafu(display("{message}"))]
    Validation {
        /// Error description.
        message: String,
    },

    /// The client was closed.
    #[snafu(display("Client has been disposed"))]
    Disposed,

    /// gRPC status returned by the server or the channel.
    #[snafu(display("RPC error (code={code:?}): {message}"))]
    Rpc {
        /// gRPC status code.
        code: Code,
        /// Error message from server.
        message: String,
        /// Trailing metadata attached to the status.
        metadata: MetadataMap,
    },

    /// Transport-level error (HTTP/2, connect).
    #[snafu(display("Transport error at {location}: {source}"))]
    Transport {
        /// Underlying transport error.
        source: tonic::transport::Error,
        /// Source location.
        #[snafu(implicit)]
        location: Location,
    },

    /// An endpoint could not be turned into a URI.
    #[snafu(display("Invalid URL '{url}': {message}"))]
    InvalidUrl {
        /// The invalid URL.
        url: String,
        /// Parse error description.
        message: String,
    },

    /// Retry attempts exhausted.
    #[snafu(display("Retry exhausted after {attempts} attempts: {source}"))]
    RetryExhausted {
        /// Number of attempts made.
        attempts: u32,
        /// Failure of the last attempt, status metadata included.
        #[snafu(source(from(SdkError, Box::new)))]
        source: Box<SdkError>,
    },

    /// A unary call failed.
    ///
    /// Displays as `Failed to <description>: <cause>`, e.g.
    /// `Failed to save events to stream 'orders': ...`.
    #[snafu(display("Failed to {description}: {source}"))]
    Call {
        /// Operation and entity, e.g. `save events to stream 'orders'`.
        description: String,
        /// Identifiers involved in the call.
        context: CallContext,
        /// Original failure.
        #[snafu(source(from(SdkError, Box::new)))]
        source: Box<SdkError>,
    },

    /// A subscription could not be opened, or failed while streaming.
    #[snafu(display("{description}: {source}"))]
    Subscription {
        /// Human readable summary, e.g. `Subscription error for stream 'orders'`.
        description: String,
        /// Identifiers involved in the subscription.
        context: CallContext,
        /// Original failure.
        #[snafu(source(from(SdkError, Box::new)))]
        source: Box<SdkError>,
    },

    /// A received event carried malformed JSON.
    #[snafu(display("Failed to parse event {event_id} ({event_type}): {source}"))]
    Decode {
        /// Id of the offending event.
        event_id: String,
        /// Type of the offending event.
        event_type: String,
        /// JSON error.
        source: serde_json::Error,
    },

    /// An outbound payload could not be serialized.
    #[snafu(display("Failed to encode payload of event {event_id}: {source}"))]
    Encode {
        /// Id of the event being encoded.
        event_id: String,
        /// JSON error.
        source: serde_json::Error,
    },
}

impl SdkError {
    /// Returns true if the error is transient and the call may succeed when repeated.
    ///
    /// Wrapped errors ([`Call`](Self::Call), [`Subscription`](Self::Subscription))
    /// delegate to their cause.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Transport { .. } => true,
            Self::Rpc { code, .. } => matches!(
                code,
                Code::Unavailable | Code::Unknown | Code::DeadlineExceeded | Code::ResourceExhausted
            ),
            Self::Call { source, .. } | Self::Subscription { source, .. } => source.is_retryable(),
            Self::Config { .. }
            | Self::Validation { .. }
            | Self::Disposed
            | Self::InvalidUrl { .. }
            | Self::RetryExhausted { .. }
            | Self::Decode { .. }
            | Self::Encode { .. } => false,
        }
    }

    /// Returns the gRPC status code behind this error, if any.
    #[must_use]
    pub fn code(&self) -> Option<Code> {
        match self {
            Self::Rpc { code, .. } => Some(*code),
            Self::Call { source, .. }
            | Self::Subscription { source, .. }
            | Self::RetryExhausted { source, .. } => source.code(),
            _ => None,
        }
    }

    /// Returns the identifiers attached to a wrapped call or subscription error.
    #[must_use]
    pub fn context(&self) -> Option<&CallContext> {
        match self {
            Self::Call { context, .. } | Self::Subscription { context, .. } => Some(context),
            _ => None,
        }
    }
}

impl From<tonic::transport::Error> for SdkError {
    fn from(source: tonic::transport::Error) -> Self {
        Self::Transport { source, location: Location::default() }
    }
}

impl From<tonic::Status> for SdkError {
    fn from(status: tonic::Status) -> Self {
        Self::Rpc {
            code: status.code(),
            message: status.message().to_owned(),
            metadata: status.metadata().clone(),
        }
    }
}

/// Identifiers describing what a failed call was operating on.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CallContext {
    /// Stream the call targeted.
    pub stream_name: Option<String>,
    /// Boundary the call targeted.
    pub boundary: Option<String>,
    /// Number of events in an append.
    pub event_count: Option<usize>,
    /// Subscriber name of a subscription.
    pub subscriber_name: Option<String>,
    /// User id or username of an admin call.
    pub user: Option<String>,
}

impl CallContext {
    /// Creates a context scoped to a boundary.
    #[must_use]
    pub fn boundary(boundary: impl Into<String>) -> Self {
        Self { boundary: Some(boundary.into()), ..Self::default() }
    }

    /// Creates a context scoped to a user.
    #[must_use]
    pub fn user(user: impl Into<String>) -> Self {
        Self { user: Some(user.into()), ..Self::default() }
    }

    /// Sets the stream name.
    #[must_use]
    pub fn with_stream(mut self, stream_name: Option<&str>) -> Self {
        self.stream_name = stream_name.map(str::to_owned);
        self
    }

    /// Sets the event count.
    #[must_use]
    pub fn with_event_count(mut self, count: usize) -> Self {
        self.event_count = Some(count);
        self
    }

    /// Sets the subscriber name.
    #[must_use]
    pub fn with_subscriber(mut self, subscriber_name: impl Into<String>) -> Self {
        self.subscriber_name = Some(subscriber_name.into());
        self
    }
}

impl fmt::Display for CallContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts = Vec::new();
        if let Some(ref boundary) = self.boundary {
            parts.push(format!("boundary={boundary}"));
        }
        if let Some(ref stream) = self.stream_name {
            parts.push(format!("stream={stream}"));
        }
        if let Some(count) = self.event_count {
            parts.push(format!("events={count}"));
        }
        if let Some(ref subscriber) = self.subscriber_name {
            parts.push(format!("subscriber={subscriber}"));
        }
        if let Some(ref user) = self.user {
            parts.push(format!("user={user}"));
        }
        write!(f, "{}", parts.join(" "))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic, clippy::disallowed_methods)]
mod tests {
    use snafu::IntoError;

    use super::*;

    fn rpc(code: Code) -> SdkError {
        SdkError::Rpc { code, message: "boom".to_owned(), metadata: MetadataMap::new() }
    }

    #[test]
    fn test_rpc_retryable_codes() {
        assert!(rpc(Code::Unavailable).is_retryable());
        assert!(rpc(Code::Unknown).is_retryable());
        assert!(rpc(Code::DeadlineExceeded).is_retryable());
        assert!(!rpc(Code::InvalidArgument).is_retryable());
        assert!(!rpc(Code::Unauthenticated).is_retryable());
        assert!(!rpc(Code::FailedPrecondition).is_retryable());
    }

    #[test]
    fn test_local_errors_not_retryable() {
        assert!(!SdkError::Disposed.is_retryable());
        assert!(!SdkError::Validation { message: "x".to_owned() }.is_retryable());
        assert!(!SdkError::Config { message: "x".to_owned() }.is_retryable());
    }

    #[test]
    fn test_call_error_message_and_cause() {
        let err = CallSnafu {
            description: "save events to stream 'orders'",
            context: CallContext::boundary("b1").with_stream(Some("orders")).with_event_count(2),
        }
        .into_error(rpc(Code::Unavailable));

        assert_eq!(
            err.to_string(),
            "Failed to save events to stream 'orders': RPC error (code=Unavailable): boom"
        );
        assert_eq!(err.code(), Some(Code::Unavailable));
        assert!(err.is_retryable());

        let context = err.context().unwrap();
        assert_eq!(context.stream_name.as_deref(), Some("orders"));
        assert_eq!(context.boundary.as_deref(), Some("b1"));
        assert_eq!(context.event_count, Some(2));

        let source = std::error::Error::source(&err).unwrap();
        assert!(source.to_string().contains("boom"));
    }

    #[test]
    fn test_from_status_keeps_metadata() {
        let mut status = tonic::Status::permission_denied("nope");
        status.metadata_mut().insert("x-auth-token", "t1".parse().unwrap());
        let err = SdkError::from(status);

        match err {
            SdkError::Rpc { code, message, metadata } => {
                assert_eq!(code, Code::PermissionDenied);
                assert_eq!(message, "nope");
                assert_eq!(metadata.get("x-auth-token").unwrap(), "t1");
            },
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_call_context_display() {
        let context = CallContext::boundary("b1").with_subscriber("projector");
        assert_eq!(context.to_string(), "boundary=b1 subscriber=projector");
        assert_eq!(CallContext::default().to_string(), "");
    }

    #[test]
    fn test_retry_exhausted_keeps_last_failure() {
        let mut status = tonic::Status::unavailable("down");
        status.metadata_mut().insert("x-auth-token", "t2".parse().unwrap());
        let err = RetryExhaustedSnafu { attempts: 3u32 }.into_error(SdkError::from(status));

        assert_eq!(
            err.to_string(),
            "Retry exhausted after 3 attempts: RPC error (code=Unavailable): down"
        );
        assert_eq!(err.code(), Some(Code::Unavailable));
        assert!(!err.is_retryable());

        let source = std::error::Error::source(&err).unwrap();
        match source.downcast_ref::<SdkError>().unwrap() {
            SdkError::Rpc { metadata, .. } => {
                assert_eq!(metadata.get("x-auth-token").unwrap(), "t2");
            },
            other => panic!("unexpected cause: {other:?}"),
        }
    }

    #[test]
    fn test_disposed_display() {
        assert_eq!(SdkError::Disposed.to_string(), "Client has been disposed");
    }
}
