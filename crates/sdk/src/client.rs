//! Event store client facade.

use std::{future::Future, sync::Arc};

use orisun_proto::eventstore::{
    self as wire, event_store_client::EventStoreClient as EventStoreStub,
};
use tonic::{Request, Response, Status, Streaming, transport::Channel};

use crate::{
    call::{CallScope, ClientCore},
    config::ClientConfig,
    convert,
    error::{CallContext, Result},
    subscription::{ErrorHandler, EventStream, Subscription, SubscriptionScope, spawn_delivery},
    types::{
        Event, EventToSave, ExpectedVersion, GetEventsRequest, SaveEventsRequest,
        SubscribeToAllRequest, SubscribeToStreamRequest, WriteResult,
    },
};

/// Boundary probed by [`EventStoreClient::health_check`].
const HEALTH_CHECK_BOUNDARY: &str = "orisun_admin";

/// Stream probed by [`EventStoreClient::health_check`].
const HEALTH_CHECK_STREAM: &str = "health-check";

/// Client for appending, reading and subscribing to events.
///
/// Cloning is cheap; clones share the connection, the session token and the
/// closed state.
///
/// # Example
///
/// ```no_run
/// # use orisun_sdk::{EventStoreClient, EventToSave, ExpectedVersion};
/// # async fn example() -> orisun_sdk::Result<()> {
/// let client = EventStoreClient::connect("localhost", 5005)?;
///
/// let event = EventToSave::new("e1", "OrderPlaced", serde_json::json!({"total": 42}));
/// let result = client
///     .append_to_stream("shop", "order-1", ExpectedVersion::NoStream, vec![event])
///     .await?;
/// println!("written at {:?}", result.log_position);
///
/// client.close();
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct EventStoreClient {
    core: Arc<ClientCore>,
}

impl EventStoreClient {
    /// Creates a client from a validated configuration. No connection is made yet.
    ///
    /// # Errors
    ///
    /// Returns an error if the target cannot be turned into endpoints or the
    /// credentials cannot be encoded as a header.
    pub fn new(config: ClientConfig) -> Result<Self> {
        let core = ClientCore::new("EventStoreClient", &config)?;
        core.logger().info(&format!("EventStoreClient initialized for {}", config.target()));
        Ok(Self { core: Arc::new(core) })
    }

    /// Creates a client for `host:port` with default settings.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if `host` is empty or `port` is zero.
    pub fn connect(host: impl Into<String>, port: u16) -> Result<Self> {
        let config = ClientConfig::builder().with_host(host).with_port(u32::from(port)).build()?;
        Self::new(config)
    }

    /// Appends events to a stream.
    ///
    /// # Errors
    ///
    /// Returns [`SdkError::Disposed`](crate::SdkError::Disposed) after `close()`,
    /// [`SdkError::Validation`](crate::SdkError::Validation) for a malformed request,
    /// and [`SdkError::Call`](crate::SdkError::Call) if the server rejects the append
    /// (including a failed concurrency check).
    pub async fn save_events(&self, request: SaveEventsRequest) -> Result<WriteResult> {
        self.core.ensure_open()?;
        let message = convert::save_events_request(&request)?;

        let count = request.events.len();
        let scope = CallScope::new(
            "save_events",
            format!("save events to stream '{}'", request.stream),
            CallContext::boundary(&request.boundary)
                .with_stream(Some(&request.stream))
                .with_event_count(count),
        );
        self.core.logger().debug(&format!("Saving {count} events to stream '{}'", request.stream));

        let result = self
            .core
            .unary(&scope, message, |channel, req| async move {
                EventStoreStub::new(channel).save_events(req).await
            })
            .await?;

        self.core.logger().info(&format!("Saved {count} events to stream '{}'", request.stream));
        Ok(convert::write_result_from_wire(result))
    }

    /// Appends events to a stream, positional form of [`save_events`](Self::save_events).
    ///
    /// # Errors
    ///
    /// Same as [`save_events`](Self::save_events).
    pub async fn append_to_stream(
        &self,
        boundary: impl Into<String>,
        stream: impl Into<String>,
        expected_version: impl Into<ExpectedVersion>,
        events: Vec<EventToSave>,
    ) -> Result<WriteResult> {
        let request = SaveEventsRequest::builder()
            .boundary(boundary)
            .stream(stream)
            .expected_version(expected_version.into())
            .events(events)
            .build();
        self.save_events(request).await
    }

    /// Reads events from one stream or from the whole boundary.
    ///
    /// Events whose JSON cannot be decoded are still returned, with the raw
    /// text in [`Payload::Raw`](crate::Payload::Raw).
    ///
    /// # Errors
    ///
    /// Returns [`SdkError::Disposed`](crate::SdkError::Disposed) after `close()`,
    /// [`SdkError::Validation`](crate::SdkError::Validation) for a malformed request,
    /// and [`SdkError::Call`](crate::SdkError::Call) if the call fails.
    pub async fn get_events(&self, request: GetEventsRequest) -> Result<Vec<Event>> {
        self.core.ensure_open()?;
        let message = convert::get_events_request(&request)?;

        let target = describe_target(request.stream.as_deref());
        let scope = CallScope::new(
            "get_events",
            format!("get events from {target}"),
            CallContext::boundary(&request.boundary).with_stream(request.stream.as_deref()),
        );
        self.core.logger().debug(&format!("Getting events from {target}"));

        let response = self
            .core
            .unary(&scope, message, |channel, req| async move {
                EventStoreStub::new(channel).get_events(req).await
            })
            .await?;

        let events: Vec<Event> =
            response.events.into_iter().map(convert::event_from_wire).collect();
        for event in events.iter().filter(|e| e.data.is_raw() || e.metadata.is_raw()) {
            self.core.logger().error(&format!(
                "Failed to parse data or metadata of event {} ({}); returning raw text",
                event.event_id, event.event_type
            ));
        }

        self.core.logger().debug(&format!("Retrieved {} events from {target}", events.len()));
        Ok(events)
    }

    /// Follows every event of a boundary, delivering them to `on_event` one at a time.
    ///
    /// The handler's future is awaited before the next event is read. An event
    /// with malformed JSON is still delivered with a raw payload, and the decode
    /// failure goes to `on_error` and the logger. A stream failure is reported
    /// the same way and ends the subscription.
    ///
    /// # Errors
    ///
    /// Returns [`SdkError::Disposed`](crate::SdkError::Disposed),
    /// [`SdkError::Validation`](crate::SdkError::Validation), or
    /// [`SdkError::Subscription`](crate::SdkError::Subscription) if the stream
    /// cannot be opened.
    pub async fn subscribe_to_events<H, Fut>(
        &self,
        request: SubscribeToAllRequest,
        on_event: H,
        on_error: Option<ErrorHandler>,
    ) -> Result<Subscription>
    where
        H: FnMut(Event) -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let (scope, stream) = self.open_all(request).await?;
        Ok(spawn_delivery(Arc::clone(&self.core), stream, scope, on_event, on_error))
    }

    /// Follows one stream, delivering its events to `on_event` one at a time.
    ///
    /// Delivery works as in [`subscribe_to_events`](Self::subscribe_to_events).
    ///
    /// # Errors
    ///
    /// Same as [`subscribe_to_events`](Self::subscribe_to_events).
    pub async fn subscribe_to_stream<H, Fut>(
        &self,
        request: SubscribeToStreamRequest,
        on_event: H,
        on_error: Option<ErrorHandler>,
    ) -> Result<Subscription>
    where
        H: FnMut(Event) -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let (scope, stream) = self.open_stream(request).await?;
        Ok(spawn_delivery(Arc::clone(&self.core), stream, scope, on_event, on_error))
    }

    /// Follows every event of a boundary as a pull-based stream.
    ///
    /// # Errors
    ///
    /// Same as [`subscribe_to_events`](Self::subscribe_to_events).
    pub async fn stream_events(&self, request: SubscribeToAllRequest) -> Result<EventStream> {
        let (scope, stream) = self.open_all(request).await?;
        Ok(EventStream::new(Arc::clone(&self.core), stream, scope))
    }

    /// Follows one stream as a pull-based stream.
    ///
    /// # Errors
    ///
    /// Same as [`subscribe_to_events`](Self::subscribe_to_events).
    pub async fn stream_stream_events(
        &self,
        request: SubscribeToStreamRequest,
    ) -> Result<EventStream> {
        let (scope, stream) = self.open_stream(request).await?;
        Ok(EventStream::new(Arc::clone(&self.core), stream, scope))
    }

    async fn open_all(
        &self,
        request: SubscribeToAllRequest,
    ) -> Result<(SubscriptionScope, Streaming<wire::Event>)> {
        self.core.ensure_open()?;
        let message = convert::subscribe_all_request(&request)?;

        let scope = SubscriptionScope {
            operation: "subscribe_to_events",
            target: describe_target(None),
            context: CallContext::boundary(&request.boundary)
                .with_subscriber(&request.subscriber_name),
        };
        let stream = self
            .open(&scope, &request.subscriber_name, message, |channel, req| async move {
                EventStoreStub::new(channel).catch_up_subscribe_to_events(req).await
            })
            .await?;
        Ok((scope, stream))
    }

    async fn open_stream(
        &self,
        request: SubscribeToStreamRequest,
    ) -> Result<(SubscriptionScope, Streaming<wire::Event>)> {
        self.core.ensure_open()?;
        let message = convert::subscribe_stream_request(&request)?;

        let scope = SubscriptionScope {
            operation: "subscribe_to_stream",
            target: describe_target(Some(&request.stream)),
            context: CallContext::boundary(&request.boundary)
                .with_stream(Some(&request.stream))
                .with_subscriber(&request.subscriber_name),
        };
        let stream = self
            .open(&scope, &request.subscriber_name, message, |channel, req| async move {
                EventStoreStub::new(channel).catch_up_subscribe_to_stream(req).await
            })
            .await?;
        Ok((scope, stream))
    }

    async fn open<Req, F, Fut>(
        &self,
        scope: &SubscriptionScope,
        subscriber_name: &str,
        message: Req,
        call: F,
    ) -> Result<Streaming<wire::Event>>
    where
        F: FnOnce(Channel, Request<Req>) -> Fut,
        Fut: Future<Output = std::result::Result<Response<Streaming<wire::Event>>, Status>>,
    {
        self.core.logger().debug(&format!(
            "Subscribing to {} with subscriber '{subscriber_name}'",
            scope.target
        ));

        let stream = self.core.open_stream(scope.operation, message, call).await.map_err(|e| {
            let err = scope.setup_error(e);
            self.core.logger().error(&err.to_string());
            err
        })?;

        self.core.logger().info(&format!(
            "Subscribed to {} with subscriber '{subscriber_name}'",
            scope.target
        ));
        Ok(stream)
    }

    /// Probes the server with a one-event read.
    ///
    /// Any failure of the probe is logged and reported as `Ok(false)`.
    ///
    /// # Errors
    ///
    /// Returns [`SdkError::Disposed`](crate::SdkError::Disposed) after `close()`.
    pub async fn health_check(&self) -> Result<bool> {
        self.core.ensure_open()?;
        self.core.logger().debug("Performing health check");

        let probe = GetEventsRequest::builder()
            .boundary(HEALTH_CHECK_BOUNDARY)
            .stream(HEALTH_CHECK_STREAM)
            .count(1)
            .build();

        match self.get_events(probe).await {
            Ok(_) => {
                self.core.logger().debug("Health check successful");
                Ok(true)
            },
            Err(err) => {
                self.core.logger().warn(&format!("Health check failed: {err}"));
                Ok(false)
            },
        }
    }

    /// Closes the client and ends its subscriptions.
    ///
    /// Later operations fail with [`SdkError::Disposed`](crate::SdkError::Disposed).
    /// Calling `close` again has no effect.
    pub fn close(&self) {
        self.core.close();
    }

    /// Returns true once [`close`](Self::close) has been called.
    #[must_use]
    pub fn is_disposed(&self) -> bool {
        self.core.is_disposed()
    }

    /// Returns the session token cached from the last response that carried one.
    #[must_use]
    pub fn cached_token(&self) -> Option<Arc<str>> {
        self.core.cached_token()
    }
}

/// `stream 'name'` for stream-scoped calls, `all streams` otherwise.
fn describe_target(stream: Option<&str>) -> String {
    match stream {
        Some(name) => format!("stream '{name}'"),
        None => "all streams".to_owned(),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic, clippy::disallowed_methods)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::SdkError;

    fn client() -> EventStoreClient {
        EventStoreClient::connect("localhost", 5005).unwrap()
    }

    #[test]
    fn test_connect_rejects_port_zero() {
        let err = EventStoreClient::connect("localhost", 0).unwrap_err();
        assert!(matches!(err, SdkError::Config { .. }));
    }

    #[tokio::test]
    async fn test_disposed_check_precedes_validation() {
        let client = client();
        client.close();
        assert!(client.is_disposed());

        // An invalid request still reports the closed client first.
        let err = client
            .append_to_stream("", "", ExpectedVersion::NoStream, Vec::new())
            .await
            .unwrap_err();
        assert!(matches!(err, SdkError::Disposed));

        let err = client.get_events(GetEventsRequest::default()).await.unwrap_err();
        assert!(matches!(err, SdkError::Disposed));

        let err = client.health_check().await.unwrap_err();
        assert!(matches!(err, SdkError::Disposed));
    }

    #[tokio::test]
    async fn test_validation_before_network() {
        // Nothing listens on the target; validation must fail first.
        let client = client();
        let err = client
            .append_to_stream("b1", "s1", ExpectedVersion::NoStream, Vec::new())
            .await
            .unwrap_err();
        assert!(matches!(err, SdkError::Validation { .. }));

        let request = SubscribeToStreamRequest::builder()
            .boundary("b1")
            .subscriber_name("")
            .stream("s1")
            .build();
        let err = client.subscribe_to_stream(request, |_| async {}, None).await.unwrap_err();
        assert!(matches!(err, SdkError::Validation { .. }));

        let event = EventToSave::new("e1", "T", json!(null));
        let err = client
            .append_to_stream("b1", "s1", ExpectedVersion::NoStream, vec![event])
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Event at index 0 is missing data");
    }

    #[test]
    fn test_close_shared_by_clones() {
        let client = client();
        let clone = client.clone();
        client.close();
        client.close();
        assert!(clone.is_disposed());
    }

    #[test]
    fn test_describe_target() {
        assert_eq!(describe_target(Some("s1")), "stream 's1'");
        assert_eq!(describe_target(None), "all streams");
    }
}
