//! Connection pool and channel management.
//!
//! The [`ConnectionPool`] wraps a tonic [`Channel`] with:
//! - **Lazy connection**: the channel is created on first use, not at construction
//! - **Shared ownership**: clones of one client share the cached channel
//! - **Load balancing**: `round_robin` spreads calls over every endpoint through a
//!   balanced channel, `pick_first` connects to the first endpoint that answers
//!
//! Endpoints are parsed when the pool is built, so a malformed target fails at
//! client construction rather than on the first call.

use std::sync::Arc;

use parking_lot::RwLock;
use snafu::{ResultExt, ensure};
use tonic::transport::{Channel, Endpoint};

use crate::{
    config::ClientConfig,
    error::{InvalidUrlSnafu, Result, TransportSnafu},
    target::LoadBalancingPolicy,
};

/// Connection pool managing one lazily created tonic channel.
#[derive(Debug, Clone)]
pub struct ConnectionPool {
    /// Cached channel, lazily initialized.
    channel: Arc<RwLock<Option<Channel>>>,

    /// Parsed and tuned endpoints, in target order.
    endpoints: Arc<[Endpoint]>,

    policy: LoadBalancingPolicy,
}

impl ConnectionPool {
    /// Creates a pool for the configured target without connecting.
    ///
    /// # Errors
    ///
    /// Returns [`SdkError::InvalidUrl`](crate::SdkError::InvalidUrl) if a target entry
    /// cannot be parsed as an endpoint URI.
    pub fn new(config: &ClientConfig) -> Result<Self> {
        let endpoints = config
            .target
            .endpoint_uris()
            .into_iter()
            .map(|uri| {
                Endpoint::from_shared(uri.clone())
                    .map(|endpoint| configure_endpoint(endpoint, config))
                    .map_err(|e| InvalidUrlSnafu { url: uri, message: e.to_string() }.build())
            })
            .collect::<Result<Vec<_>>>()?;

        ensure!(
            !endpoints.is_empty(),
            InvalidUrlSnafu {
                url: config.target.destination(),
                message: "target contains no endpoints"
            }
        );

        Ok(Self {
            channel: Arc::new(RwLock::new(None)),
            endpoints: endpoints.into(),
            policy: config.target.policy(),
        })
    }

    /// Returns a channel, creating it if needed.
    ///
    /// Subsequent calls return a clone of the cached channel, which shares the
    /// underlying HTTP/2 connections.
    ///
    /// # Errors
    ///
    /// Returns an error if `pick_first` finds no endpoint that accepts a connection.
    pub async fn get_channel(&self) -> Result<Channel> {
        {
            let guard = self.channel.read();
            if let Some(channel) = guard.as_ref() {
                return Ok(channel.clone());
            }
        }

        let new_channel = self.create_channel().await?;

        let mut guard = self.channel.write();
        // Another task may have connected while this one waited.
        if let Some(channel) = guard.as_ref() {
            return Ok(channel.clone());
        }
        *guard = Some(new_channel.clone());
        Ok(new_channel)
    }

    async fn create_channel(&self) -> Result<Channel> {
        match (&*self.endpoints, self.policy) {
            ([single], _) => {
                tracing::debug!(endpoint = %single.uri(), "creating lazy channel");
                Ok(single.connect_lazy())
            },
            (endpoints, LoadBalancingPolicy::RoundRobin) => {
                tracing::debug!(endpoints = endpoints.len(), "creating balanced channel");
                Ok(Channel::balance_list(endpoints.iter().cloned()))
            },
            (endpoints, LoadBalancingPolicy::PickFirst) => Self::pick_first(endpoints).await,
        }
    }

    async fn pick_first(endpoints: &[Endpoint]) -> Result<Channel> {
        let mut last_error = None;
        for endpoint in endpoints {
            match endpoint.connect().await {
                Ok(channel) => {
                    tracing::debug!(endpoint = %endpoint.uri(), "picked first reachable endpoint");
                    return Ok(channel);
                },
                Err(e) => {
                    tracing::debug!(endpoint = %endpoint.uri(), error = %e, "endpoint unreachable");
                    last_error = Some(e);
                },
            }
        }

        match last_error {
            Some(e) => Err(e).context(TransportSnafu),
            None => {
                InvalidUrlSnafu { url: String::new(), message: "no endpoints configured" }.fail()
            },
        }
    }

    /// Returns the number of configured endpoints.
    #[must_use]
    pub fn endpoint_count(&self) -> usize {
        self.endpoints.len()
    }

    /// Returns true if a channel has been created and not released.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.channel.read().is_some()
    }

    /// Drops the cached channel.
    ///
    /// In-flight calls keep their own clone; the connection closes once the
    /// last clone is gone.
    pub fn reset(&self) {
        let mut guard = self.channel.write();
        *guard = None;
    }
}

/// Applies timeouts and keep-alive settings to an endpoint.
fn configure_endpoint(endpoint: Endpoint, config: &ClientConfig) -> Endpoint {
    endpoint
        .connect_timeout(config.connect_timeout)
        .timeout(config.timeout)
        .tcp_nodelay(true)
        .http2_keep_alive_interval(config.keepalive_interval)
        .keep_alive_timeout(config.keepalive_timeout)
        .keep_alive_while_idle(config.keepalive_while_idle)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic, clippy::disallowed_methods)]
mod tests {
    use super::*;

    fn config(host: &str) -> ClientConfig {
        ClientConfig::builder().with_host(host).with_port(5005).build().unwrap()
    }

    #[tokio::test]
    async fn test_single_endpoint_is_lazy() {
        let pool = ConnectionPool::new(&config("localhost")).unwrap();
        assert_eq!(pool.endpoint_count(), 1);
        assert!(!pool.is_connected());

        // No server is listening; a lazy channel is still handed out.
        pool.get_channel().await.unwrap();
        assert!(pool.is_connected());
    }

    #[tokio::test]
    async fn test_reset_releases_channel() {
        let pool = ConnectionPool::new(&config("localhost")).unwrap();
        pool.get_channel().await.unwrap();
        pool.reset();
        assert!(!pool.is_connected());
    }

    #[tokio::test]
    async fn test_round_robin_over_host_list() {
        let pool = ConnectionPool::new(&config("node1,node2,node3")).unwrap();
        assert_eq!(pool.endpoint_count(), 3);
        pool.get_channel().await.unwrap();
        assert!(pool.is_connected());
    }

    #[tokio::test]
    async fn test_clones_share_channel_state() {
        let pool = ConnectionPool::new(&config("localhost")).unwrap();
        let clone = pool.clone();
        pool.get_channel().await.unwrap();
        assert!(clone.is_connected());
    }

    #[tokio::test]
    async fn test_pick_first_fails_when_nothing_listens() {
        let config = ClientConfig::builder()
            .with_target("127.0.0.1:1,127.0.0.1:2")
            .with_load_balancing_policy("pick_first")
            .with_connect_timeout(std::time::Duration::from_millis(200))
            .build()
            .unwrap();
        let pool = ConnectionPool::new(&config).unwrap();

        let err = pool.get_channel().await.unwrap_err();
        assert!(err.is_retryable());
        assert!(!pool.is_connected());
    }

    #[test]
    fn test_invalid_target_rejected() {
        let config = ClientConfig::builder().with_target("dns:///bad host:5005").build().unwrap();
        let err = ConnectionPool::new(&config).unwrap_err();
        assert!(matches!(err, crate::SdkError::InvalidUrl { .. }));
    }
}
