//! Mock gRPC server for SDK integration testing.
//!
//! An in-process implementation of `eventstore.EventStore` and `orisun.Admin`
//! listening on an ephemeral port, for exercising both clients without a real
//! event store.
//!
//! # Features
//!
//! - **Event storage**: appends assign stream versions (starting at 1) and log
//!   positions, and enforce the expected-version check
//! - **Live subscriptions**: catch-up followed by live delivery; tests can publish
//!   raw (even malformed) events, end or fail every open subscription
//! - **Users**: in-memory user table for the admin service
//! - **Session tokens**: an optional `x-auth-token` attached to every response
//! - **Request capture**: method name and auth headers of every call
//! - **Failure injection**: UNAVAILABLE errors or an arbitrary status for the next calls
//!
//! # Example
//!
//! ```no_run
//! use orisun_sdk::mock::MockEventStoreServer;
//! use orisun_sdk::{ClientConfig, EventStoreClient, GetEventsRequest};
//!
//! #[tokio::test]
//! async fn test_read() {
//!     let server = MockEventStoreServer::start().await.unwrap();
//!     server.set_auth_token("session-1");
//!
//!     let config = ClientConfig::builder().with_target(server.endpoint()).build().unwrap();
//!     let client = EventStoreClient::new(config).unwrap();
//!
//!     let request = GetEventsRequest::builder().boundary("b1").build();
//!     let events = client.get_events(request).await.unwrap();
//!     assert!(events.is_empty());
//!     assert_eq!(client.cached_token().as_deref(), Some("session-1"));
//! }
//! ```

use std::{
    collections::HashMap,
    net::SocketAddr,
    sync::{
        Arc,
        atomic::{AtomicI64, AtomicU64, AtomicUsize, Ordering},
    },
};

use chrono::Utc;
use orisun_proto::{
    admin::{
        self as admin_wire,
        admin_server::{Admin, AdminServer},
    },
    eventstore::{
        self as wire,
        event_store_server::{EventStore, EventStoreServer},
    },
};
use parking_lot::RwLock;
use serde_json::Value;
use tokio::sync::{mpsc, oneshot};
use tokio_stream::wrappers::UnboundedReceiverStream;
use tonic::{
    Code, Request, Response, Status,
    metadata::{AsciiMetadataValue, MetadataMap},
    transport::Server,
};

use crate::{
    auth::{AUTHORIZATION_HEADER, TOKEN_HEADER},
    convert::query_from_wire,
    error::SdkError,
    types::Query,
};

type EventSender = mpsc::UnboundedSender<Result<wire::Event, Status>>;

/// Headers of one request received by the mock server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapturedRequest {
    /// RPC method name, e.g. `save_events`.
    pub method: &'static str,
    /// Value of the `authorization` header.
    pub authorization: Option<String>,
    /// Value of the `x-auth-token` header.
    pub auth_token: Option<String>,
}

/// A live subscription registered with the mock server.
#[derive(Debug)]
struct Subscriber {
    boundary: String,
    stream: Option<String>,
    query: Option<Query>,
    sender: EventSender,
}

impl Subscriber {
    fn wants(&self, boundary: &str, event: &wire::Event) -> bool {
        self.boundary == boundary
            && self.stream.as_ref().is_none_or(|s| *s == event.stream_id)
            && matches_query(self.query.as_ref(), event)
    }
}

#[derive(Debug, Clone)]
struct StoredUser {
    user: admin_wire::AdminUser,
    password: String,
}

/// Shared state for the mock server.
#[derive(Debug, Default)]
struct MockState {
    /// boundary -> events in log order
    events: RwLock<HashMap<String, Vec<wire::Event>>>,

    /// Last assigned commit position
    log_position: AtomicI64,

    subscribers: RwLock<Vec<Subscriber>>,

    users: RwLock<Vec<StoredUser>>,

    next_user_id: AtomicU64,

    /// Token attached to every response as `x-auth-token`
    auth_token: RwLock<Option<String>>,

    requests: RwLock<Vec<CapturedRequest>>,

    /// Number of UNAVAILABLE errors to inject for next requests
    unavailable_count: AtomicUsize,

    /// Status returned by the next request
    next_failure: RwLock<Option<(Code, String)>>,
}

impl MockState {
    /// Checks if we should inject an unavailable error, decrementing counter if so.
    fn should_inject_unavailable(&self) -> bool {
        loop {
            let current = self.unavailable_count.load(Ordering::SeqCst);
            if current == 0 {
                return false;
            }
            if self
                .unavailable_count
                .compare_exchange(current, current - 1, Ordering::SeqCst, Ordering::SeqCst)
                .is_ok()
            {
                return true;
            }
        }
    }

    /// Records the request, then returns any injected failure.
    fn accept(&self, method: &'static str, metadata: &MetadataMap) -> Result<(), Status> {
        let header = |name: &str| {
            metadata.get(name).and_then(|v| v.to_str().ok()).map(str::to_owned)
        };
        self.requests.write().push(CapturedRequest {
            method,
            authorization: header(AUTHORIZATION_HEADER),
            auth_token: header(TOKEN_HEADER),
        });

        if self.should_inject_unavailable() {
            return Err(self.status(Code::Unavailable, "Injected error"));
        }
        if let Some((code, message)) = self.next_failure.write().take() {
            return Err(self.status(code, &message));
        }
        Ok(())
    }

    fn token_value(&self) -> Option<AsciiMetadataValue> {
        self.auth_token.read().as_deref().and_then(|t| AsciiMetadataValue::try_from(t).ok())
    }

    /// Builds a status carrying the configured session token.
    fn status(&self, code: Code, message: &str) -> Status {
        let mut status = Status::new(code, message);
        if let Some(token) = self.token_value() {
            status.metadata_mut().insert(TOKEN_HEADER, token);
        }
        status
    }

    /// Wraps a message in a response carrying the configured session token.
    fn respond<T>(&self, message: T) -> Response<T> {
        let mut response = Response::new(message);
        if let Some(token) = self.token_value() {
            response.metadata_mut().insert(TOKEN_HEADER, token);
        }
        response
    }

    fn next_position(&self) -> wire::Position {
        let commit = self.log_position.fetch_add(1, Ordering::SeqCst) + 1;
        wire::Position { commit_position: commit, prepare_position: commit }
    }

    /// Appends to the log and forwards to matching live subscribers.
    fn store(&self, boundary: &str, mut batch: Vec<wire::Event>) -> Option<wire::Event> {
        let mut events = self.events.write();
        let log = events.entry(boundary.to_owned()).or_default();
        for event in &mut batch {
            event.position = Some(self.next_position());
            log.push(event.clone());
        }

        let mut subscribers = self.subscribers.write();
        subscribers.retain(|sub| {
            batch
                .iter()
                .filter(|event| sub.wants(boundary, event))
                .all(|event| sub.sender.send(Ok(event.clone())).is_ok())
        });

        batch.pop()
    }

    /// Registers a live subscriber after queueing the catch-up history.
    fn subscribe<F>(
        &self,
        subscriber: Subscriber,
        history: F,
    ) -> UnboundedReceiverStream<Result<wire::Event, Status>>
    where
        F: Fn(&wire::Event) -> bool,
    {
        let (sender, receiver) = mpsc::unbounded_channel();
        let subscriber = Subscriber { sender, ..subscriber };

        // Holding the log lock keeps appends from slipping between history and live delivery.
        let events = self.events.read();
        if let Some(log) = events.get(&subscriber.boundary) {
            let replay =
                log.iter().filter(|e| subscriber.wants(&subscriber.boundary, e) && history(e));
            for event in replay {
                let _ = subscriber.sender.send(Ok(event.clone()));
            }
        }
        self.subscribers.write().push(subscriber);
        drop(events);

        UnboundedReceiverStream::new(receiver)
    }

    fn stream_version(&self, boundary: &str, stream: &str) -> i64 {
        self.events
            .read()
            .get(boundary)
            .and_then(|log| log.iter().rev().find(|e| e.stream_id == stream))
            .map_or(-1, |e| e.version)
    }
}

/// Matches a tag query against the top-level fields of the event's JSON data.
fn matches_query(query: Option<&Query>, event: &wire::Event) -> bool {
    let Some(query) = query else {
        return true;
    };
    if query.criteria.is_empty() {
        return true;
    }
    let Ok(Value::Object(data)) = serde_json::from_str::<Value>(&event.data) else {
        return false;
    };
    query.criteria.iter().any(|criterion| {
        criterion.tags.iter().all(|tag| match data.get(&tag.key) {
            Some(Value::String(s)) => *s == tag.value,
            Some(other) => other.to_string() == tag.value,
            None => false,
        })
    })
}

fn now() -> prost_types::Timestamp {
    let now = Utc::now();
    prost_types::Timestamp {
        seconds: now.timestamp(),
        nanos: i32::try_from(now.timestamp_subsec_nanos()).unwrap_or(0),
    }
}

fn position_key(position: Option<&wire::Position>) -> (i64, i64) {
    position.map_or((0, 0), |p| (p.commit_position, p.prepare_position))
}

/// Mock implementation of the event store gRPC services.
///
/// Provides controllable behavior for testing SDK functionality:
/// - Event and user storage
/// - Session token issuance and request capture
/// - Failure injection for resilience tests
pub struct MockEventStoreServer {
    state: Arc<MockState>,
    endpoint: String,
    shutdown_tx: Option<oneshot::Sender<()>>,
}

impl MockEventStoreServer {
    /// Starts a new mock server on an ephemeral port.
    ///
    /// # Errors
    ///
    /// Returns `SdkError::Config` if binding to an ephemeral port fails.
    pub async fn start() -> crate::Result<Self> {
        let state = Arc::new(MockState::default());

        let addr = SocketAddr::from(([127, 0, 0, 1], 0));
        let listener = tokio::net::TcpListener::bind(addr).await.map_err(|e| SdkError::Config {
            message: format!("Failed to bind mock server: {e}"),
        })?;
        let local_addr = listener.local_addr().map_err(|e| SdkError::Config {
            message: format!("Failed to get local addr: {e}"),
        })?;

        let endpoint = format!("http://{local_addr}");

        let event_store = MockEventStoreService { state: Arc::clone(&state) };
        let admin = MockAdminService { state: Arc::clone(&state) };

        let (shutdown_tx, shutdown_rx) = oneshot::channel();

        let incoming = tokio_stream::wrappers::TcpListenerStream::new(listener);
        tokio::spawn(async move {
            let result = Server::builder()
                .add_service(EventStoreServer::new(event_store))
                .add_service(AdminServer::new(admin))
                .serve_with_incoming_shutdown(incoming, async {
                    let _ = shutdown_rx.await;
                })
                .await;

            if let Err(e) = result {
                tracing::error!("Mock server error: {}", e);
            }
        });

        Ok(Self { state, endpoint, shutdown_tx: Some(shutdown_tx) })
    }

    /// Returns the endpoint URL for connecting to this server.
    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Attaches `token` as `x-auth-token` to every later response and failure.
    pub fn set_auth_token(&self, token: &str) {
        *self.state.auth_token.write() = Some(token.to_owned());
    }

    /// Stops attaching a session token.
    pub fn clear_auth_token(&self) {
        *self.state.auth_token.write() = None;
    }

    /// Injects UNAVAILABLE errors for the next `count` requests.
    pub fn inject_unavailable(&self, count: usize) {
        self.state.unavailable_count.store(count, Ordering::SeqCst);
    }

    /// Fails the next request with the given status.
    pub fn fail_next(&self, code: Code, message: &str) {
        *self.state.next_failure.write() = Some((code, message.to_owned()));
    }

    /// Every request received so far, in arrival order.
    #[must_use]
    pub fn requests(&self) -> Vec<CapturedRequest> {
        self.state.requests.read().clone()
    }

    /// Number of requests received for `method`.
    #[must_use]
    pub fn request_count(&self, method: &str) -> usize {
        self.state.requests.read().iter().filter(|r| r.method == method).count()
    }

    /// Total number of requests received.
    #[must_use]
    pub fn total_requests(&self) -> usize {
        self.state.requests.read().len()
    }

    /// Stores an event with verbatim `data` and delivers it to live subscribers.
    ///
    /// `data` is not checked, so malformed JSON can be fed to clients.
    pub fn publish_raw(
        &self,
        boundary: &str,
        stream: &str,
        event_id: &str,
        event_type: &str,
        data: &str,
    ) {
        let version = self.state.stream_version(boundary, stream).max(0) + 1;
        let event = wire::Event {
            event_id: event_id.to_owned(),
            event_type: event_type.to_owned(),
            data: data.to_owned(),
            metadata: String::new(),
            position: None,
            date_created: Some(now()),
            stream_id: stream.to_owned(),
            version,
        };
        self.state.store(boundary, vec![event]);
    }

    /// Stored events of a boundary, in log order.
    #[must_use]
    pub fn events(&self, boundary: &str) -> Vec<wire::Event> {
        self.state.events.read().get(boundary).cloned().unwrap_or_default()
    }

    /// Number of live subscriptions.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.state.subscribers.read().len()
    }

    /// Completes every live subscription with an OK status.
    pub fn end_subscriptions(&self) {
        self.state.subscribers.write().clear();
    }

    /// Fails every live subscription with the given status.
    pub fn fail_subscriptions(&self, code: Code, message: &str) {
        let subscribers = std::mem::take(&mut *self.state.subscribers.write());
        for sub in subscribers {
            let _ = sub.sender.send(Err(self.state.status(code, message)));
        }
    }

    /// Adds a user and returns its id.
    pub fn add_user(&self, name: &str, username: &str, password: &str, roles: &[&str]) -> String {
        let next = self.state.next_user_id.fetch_add(1, Ordering::SeqCst) + 1;
        let user_id = format!("user-{next}");
        let user = admin_wire::AdminUser {
            user_id: user_id.clone(),
            name: name.to_owned(),
            username: username.to_owned(),
            roles: roles.iter().map(|r| (*r).to_owned()).collect(),
            created_at: Some(now()),
            updated_at: Some(now()),
        };
        self.state.users.write().push(StoredUser { user, password: password.to_owned() });
        user_id
    }

    /// Resets all state to initial values.
    pub fn reset(&self) {
        self.state.events.write().clear();
        self.state.subscribers.write().clear();
        self.state.users.write().clear();
        self.state.requests.write().clear();
        *self.state.auth_token.write() = None;
        *self.state.next_failure.write() = None;
        self.state.unavailable_count.store(0, Ordering::SeqCst);
        self.state.log_position.store(0, Ordering::SeqCst);
    }

    /// Shuts down the server gracefully.
    pub fn shutdown(mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}

impl Drop for MockEventStoreServer {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}

// =============================================================================
// Mock EventStore Implementation
// =============================================================================

struct MockEventStoreService {
    state: Arc<MockState>,
}

#[tonic::async_trait]
impl EventStore for MockEventStoreService {
    async fn save_events(
        &self,
        request: Request<wire::SaveEventsRequest>,
    ) -> Result<Response<wire::WriteResult>, Status> {
        self.state.accept("save_events", request.metadata())?;
        let req = request.into_inner();

        let Some(stream) = req.stream else {
            return Err(self.state.status(Code::InvalidArgument, "stream is required"));
        };
        if req.events.is_empty() {
            return Err(self.state.status(Code::InvalidArgument, "events are required"));
        }

        let current = self.state.stream_version(&req.boundary, &stream.name);
        if current != stream.expected_version {
            return Err(self.state.status(
                Code::FailedPrecondition,
                &format!(
                    "OptimisticConcurrencyException: expected version {} but stream '{}' is at \
                     {current}",
                    stream.expected_version, stream.name
                ),
            ));
        }

        let created = now();
        let base = current.max(0);
        let batch = req
            .events
            .into_iter()
            .zip(1..)
            .map(|(event, offset)| wire::Event {
                event_id: event.event_id,
                event_type: event.event_type,
                data: event.data,
                metadata: event.metadata,
                position: None,
                date_created: Some(created),
                stream_id: stream.name.clone(),
                version: base + offset,
            })
            .collect();

        let last = self.state.store(&req.boundary, batch);
        Ok(self.state.respond(wire::WriteResult {
            log_position: last.as_ref().and_then(|e| e.position),
            new_stream_version: last.map(|e| e.version),
        }))
    }

    async fn get_events(
        &self,
        request: Request<wire::GetEventsRequest>,
    ) -> Result<Response<wire::GetEventsResponse>, Status> {
        self.state.accept("get_events", request.metadata())?;
        let req = request.into_inner();

        let descending = req.direction == wire::Direction::Desc as i32;
        let query = req.query.as_ref().map(query_from_wire);
        let from = req.from_position.as_ref().map(|p| position_key(Some(p)));

        let events = self.state.events.read();
        let mut selected: Vec<wire::Event> = events
            .get(&req.boundary)
            .into_iter()
            .flatten()
            .filter(|e| {
                req.stream
                    .as_ref()
                    .is_none_or(|s| e.stream_id == s.name && e.version >= s.from_version)
            })
            .filter(|e| matches_query(query.as_ref(), e))
            .filter(|e| {
                from.is_none_or(|from| {
                    let key = position_key(e.position.as_ref());
                    if descending { key <= from } else { key >= from }
                })
            })
            .cloned()
            .collect();
        drop(events);

        if descending {
            selected.reverse();
        }
        selected.truncate(usize::try_from(req.count).unwrap_or(usize::MAX));

        Ok(self.state.respond(wire::GetEventsResponse { events: selected }))
    }

    type CatchUpSubscribeToEventsStream = UnboundedReceiverStream<Result<wire::Event, Status>>;

    async fn catch_up_subscribe_to_events(
        &self,
        request: Request<wire::CatchUpSubscribeToEventStoreRequest>,
    ) -> Result<Response<Self::CatchUpSubscribeToEventsStream>, Status> {
        self.state.accept("catch_up_subscribe_to_events", request.metadata())?;
        let req = request.into_inner();

        let after = req.after_position.as_ref().map(|p| position_key(Some(p)));
        let subscriber = Subscriber {
            boundary: req.boundary,
            stream: None,
            query: req.query.as_ref().map(query_from_wire),
            sender: mpsc::unbounded_channel().0,
        };
        let stream = self.state.subscribe(subscriber, |e| {
            after.is_none_or(|after| position_key(e.position.as_ref()) > after)
        });
        Ok(self.state.respond(stream))
    }

    type CatchUpSubscribeToStreamStream = UnboundedReceiverStream<Result<wire::Event, Status>>;

    async fn catch_up_subscribe_to_stream(
        &self,
        request: Request<wire::CatchUpSubscribeToStreamRequest>,
    ) -> Result<Response<Self::CatchUpSubscribeToStreamStream>, Status> {
        self.state.accept("catch_up_subscribe_to_stream", request.metadata())?;
        let req = request.into_inner();

        let after_version = req.after_version;
        let subscriber = Subscriber {
            boundary: req.boundary,
            stream: Some(req.stream),
            query: req.query.as_ref().map(query_from_wire),
            sender: mpsc::unbounded_channel().0,
        };
        let stream = self.state.subscribe(subscriber, |e| e.version > after_version);
        Ok(self.state.respond(stream))
    }
}

// =============================================================================
// Mock Admin Implementation
// =============================================================================

struct MockAdminService {
    state: Arc<MockState>,
}

#[tonic::async_trait]
impl Admin for MockAdminService {
    async fn create_user(
        &self,
        request: Request<admin_wire::CreateUserRequest>,
    ) -> Result<Response<admin_wire::CreateUserResponse>, Status> {
        self.state.accept("create_user", request.metadata())?;
        let req = request.into_inner();

        let mut users = self.state.users.write();
        if users.iter().any(|u| u.user.username == req.username) {
            return Err(self.state.status(
                Code::AlreadyExists,
                &format!("user '{}' already exists", req.username),
            ));
        }

        let user = admin_wire::AdminUser {
            user_id: format!("user-{}", self.state.next_user_id.fetch_add(1, Ordering::SeqCst) + 1),
            name: req.name,
            username: req.username,
            roles: req.roles,
            created_at: Some(now()),
            updated_at: Some(now()),
        };
        users.push(StoredUser { user: user.clone(), password: req.password });
        drop(users);

        Ok(self.state.respond(admin_wire::CreateUserResponse { user: Some(user) }))
    }

    async fn delete_user(
        &self,
        request: Request<admin_wire::DeleteUserRequest>,
    ) -> Result<Response<admin_wire::DeleteUserResponse>, Status> {
        self.state.accept("delete_user", request.metadata())?;
        let req = request.into_inner();

        let mut users = self.state.users.write();
        let before = users.len();
        users.retain(|u| u.user.user_id != req.user_id);
        let success = users.len() < before;
        drop(users);

        Ok(self.state.respond(admin_wire::DeleteUserResponse { success }))
    }

    async fn change_password(
        &self,
        request: Request<admin_wire::ChangePasswordRequest>,
    ) -> Result<Response<admin_wire::ChangePasswordResponse>, Status> {
        self.state.accept("change_password", request.metadata())?;
        let req = request.into_inner();

        let mut users = self.state.users.write();
        let Some(stored) = users.iter_mut().find(|u| u.user.user_id == req.user_id) else {
            let message = format!("user '{}' not found", req.user_id);
            return Err(self.state.status(Code::NotFound, &message));
        };
        if stored.password != req.current_password {
            return Err(self.state.status(Code::InvalidArgument, "current password is incorrect"));
        }
        stored.password = req.new_password;
        stored.user.updated_at = Some(now());
        drop(users);

        Ok(self.state.respond(admin_wire::ChangePasswordResponse { success: true }))
    }

    async fn list_users(
        &self,
        request: Request<admin_wire::ListUsersRequest>,
    ) -> Result<Response<admin_wire::ListUsersResponse>, Status> {
        self.state.accept("list_users", request.metadata())?;
        let users = self.state.users.read().iter().map(|u| u.user.clone()).collect();
        Ok(self.state.respond(admin_wire::ListUsersResponse { users }))
    }

    async fn validate_credentials(
        &self,
        request: Request<admin_wire::ValidateCredentialsRequest>,
    ) -> Result<Response<admin_wire::ValidateCredentialsResponse>, Status> {
        self.state.accept("validate_credentials", request.metadata())?;
        let req = request.into_inner();

        let user = self
            .state
            .users
            .read()
            .iter()
            .find(|u| u.user.username == req.username && u.password == req.password)
            .map(|u| u.user.clone());

        Ok(self.state.respond(admin_wire::ValidateCredentialsResponse {
            success: user.is_some(),
            user,
        }))
    }

    async fn get_user_count(
        &self,
        request: Request<admin_wire::GetUserCountRequest>,
    ) -> Result<Response<admin_wire::GetUserCountResponse>, Status> {
        self.state.accept("get_user_count", request.metadata())?;
        let count = i64::try_from(self.state.users.read().len()).unwrap_or(i64::MAX);
        Ok(self.state.respond(admin_wire::GetUserCountResponse { count }))
    }

    async fn get_event_count(
        &self,
        request: Request<admin_wire::GetEventCountRequest>,
    ) -> Result<Response<admin_wire::GetEventCountResponse>, Status> {
        self.state.accept("get_event_count", request.metadata())?;
        let req = request.into_inner();
        let count = self.state.events.read().get(&req.boundary).map_or(0, Vec::len);
        Ok(self.state.respond(admin_wire::GetEventCountResponse {
            count: i64::try_from(count).unwrap_or(i64::MAX),
        }))
    }
}
