//! Per-client authentication session.
//!
//! Every call carries HTTP basic credentials. When a response (or a failed
//! call's status) carries an `x-auth-token` header, the token is cached and
//! sent alongside the basic credentials on every later call, letting the
//! server skip password verification while basic auth remains a fallback.
//!
//! The token is never expired or cleared: it is trusted until a newer one
//! arrives.

use std::sync::Arc;

use base64::{Engine as _, engine::general_purpose::STANDARD};
use parking_lot::RwLock;
use tonic::metadata::{AsciiMetadataValue, MetadataMap};

use crate::error::{ConfigSnafu, Result};

/// Header carrying the basic credentials.
pub const AUTHORIZATION_HEADER: &str = "authorization";

/// Header carrying the session token, in both directions.
pub const TOKEN_HEADER: &str = "x-auth-token";

/// Credentials and cached session token owned by one client.
#[derive(Debug)]
pub(crate) struct AuthSession {
    basic: AsciiMetadataValue,
    token: RwLock<Option<Arc<str>>>,
}

impl AuthSession {
    /// Encodes `username:password` once for the lifetime of the session.
    pub(crate) fn new(username: &str, password: &str) -> Result<Self> {
        let encoded = STANDARD.encode(format!("{username}:{password}"));
        let basic = format!("Basic {encoded}").parse::<AsciiMetadataValue>().map_err(|_| {
            ConfigSnafu { message: "credentials produce an invalid authorization header" }.build()
        })?;
        Ok(Self { basic, token: RwLock::new(None) })
    }

    /// Builds the header set for one outbound call.
    ///
    /// The cached token (if any) comes first, followed by the basic credentials.
    pub(crate) fn call_headers(&self) -> MetadataMap {
        let mut headers = MetadataMap::new();
        if let Some(token) = self.cached_token()
            && let Ok(value) = token.parse::<AsciiMetadataValue>()
        {
            headers.insert(TOKEN_HEADER, value);
        }
        headers.insert(AUTHORIZATION_HEADER, self.basic.clone());
        headers
    }

    /// Caches the first non-empty token found in `metadata`.
    ///
    /// Returns true if a token was stored. A newer token always replaces the
    /// previous one.
    pub(crate) fn observe(&self, metadata: &MetadataMap, operation: &str) -> bool {
        let Some(token) = metadata
            .get_all(TOKEN_HEADER)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .map(str::trim)
            .find(|value| !value.is_empty())
        else {
            return false;
        };

        let token: Arc<str> = Arc::from(token);
        *self.token.write() = Some(token);
        tracing::debug!(operation, "cached auth token from response metadata");
        true
    }

    /// Returns the cached session token, if one has been received.
    pub(crate) fn cached_token(&self) -> Option<Arc<str>> {
        self.token.read().clone()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic, clippy::disallowed_methods)]
mod tests {
    use super::*;

    fn metadata_with_token(token: &str) -> MetadataMap {
        let mut metadata = MetadataMap::new();
        metadata.insert(TOKEN_HEADER, token.parse().unwrap());
        metadata
    }

    #[test]
    fn test_basic_header_only_without_token() {
        let session = AuthSession::new("admin", "changeit").unwrap();
        let headers = session.call_headers();

        assert_eq!(headers.get(AUTHORIZATION_HEADER).unwrap(), "Basic YWRtaW46Y2hhbmdlaXQ=");
        assert!(headers.get(TOKEN_HEADER).is_none());
        assert_eq!(headers.len(), 1);
    }

    #[test]
    fn test_token_sent_with_basic_after_observe() {
        let session = AuthSession::new("admin", "changeit").unwrap();
        assert!(session.observe(&metadata_with_token("tok-1"), "get events"));

        let headers = session.call_headers();
        assert_eq!(headers.get(TOKEN_HEADER).unwrap(), "tok-1");
        assert_eq!(headers.get(AUTHORIZATION_HEADER).unwrap(), "Basic YWRtaW46Y2hhbmdlaXQ=");
    }

    #[test]
    fn test_newer_token_overwrites() {
        let session = AuthSession::new("u", "p").unwrap();
        session.observe(&metadata_with_token("first"), "op");
        session.observe(&metadata_with_token("second"), "op");
        assert_eq!(session.cached_token().as_deref(), Some("second"));
    }

    #[test]
    fn test_empty_or_missing_token_ignored() {
        let session = AuthSession::new("u", "p").unwrap();
        session.observe(&metadata_with_token("kept"), "op");

        assert!(!session.observe(&MetadataMap::new(), "op"));
        assert!(!session.observe(&metadata_with_token(""), "op"));
        assert_eq!(session.cached_token().as_deref(), Some("kept"));
    }

    #[test]
    fn test_first_non_empty_value_wins() {
        let session = AuthSession::new("u", "p").unwrap();
        let mut metadata = MetadataMap::new();
        metadata.append(TOKEN_HEADER, "".parse().unwrap());
        metadata.append(TOKEN_HEADER, "a".parse().unwrap());
        metadata.append(TOKEN_HEADER, "b".parse().unwrap());

        assert!(session.observe(&metadata, "op"));
        assert_eq!(session.cached_token().as_deref(), Some("a"));
    }
}
