//! Rust client SDK for the Orisun event store.
//!
//! Two facades share one authenticated-session core:
//!
//! - [`EventStoreClient`]: append, read and subscribe to events
//! - [`AdminClient`]: user management and store statistics
//!
//! Every call carries HTTP Basic credentials; once the server hands out a
//! session token (`x-auth-token` on any response, failure or stream trailer)
//! the token is sent along with them on every later call.
//!
//! # Quick Start
//!
//! ```no_run
//! use orisun_sdk::{
//!     ClientConfig, EventStoreClient, EventToSave, ExpectedVersion, GetEventsRequest,
//! };
//! use serde_json::json;
//!
//! #[tokio::main]
//! async fn main() -> orisun_sdk::Result<()> {
//!     let config = ClientConfig::builder()
//!         .with_host("localhost")
//!         .with_port(5005)
//!         .with_username("admin")
//!         .with_password("changeit")
//!         .build()?;
//!     let client = EventStoreClient::new(config)?;
//!
//!     let event = EventToSave::new("evt-1", "UserRegistered", json!({"email": "a@b.c"}));
//!     client.append_to_stream("users", "user-1", ExpectedVersion::NoStream, vec![event]).await?;
//!
//!     let request = GetEventsRequest::builder().boundary("users").stream("user-1").build();
//!     for event in client.get_events(request).await? {
//!         println!("{} v{}", event.event_type, event.version);
//!     }
//!
//!     client.close();
//!     Ok(())
//! }
//! ```
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │          EventStoreClient            AdminClient            │
//! │  save │ get │ subscribe │ stream    users │ counts          │
//! ├─────────────────────────────────────────────────────────────┤
//! │                   Request translation                       │
//! │   Validation │ JSON encode/decode │ Timestamps             │
//! ├─────────────────────────────────────────────────────────────┤
//! │                   ClientCore                                │
//! │   Basic auth + token cache │ Disposed flag │ Logger        │
//! ├─────────────────────────────────────────────────────────────┤
//! │                   Resilience Layer (backon)                 │
//! │   Retry on UNAVAILABLE/UNKNOWN │ Exponential backoff       │
//! ├─────────────────────────────────────────────────────────────┤
//! │                   Connection Pool                           │
//! │   Lazy channel │ round_robin / pick_first │ Keep-alive     │
//! ├─────────────────────────────────────────────────────────────┤
//! │                   Tonic gRPC Clients                        │
//! │   EventStoreClient stub │ AdminClient stub                 │
//! └─────────────────────────────────────────────────────────────┘
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod admin;
mod auth;
mod call;
mod client;
mod config;
mod connection;
mod convert;
mod error;
mod log;
pub mod mock;
mod retry;
mod subscription;
mod target;
mod types;

// Public API exports
pub use admin::AdminClient;
pub use auth::{AUTHORIZATION_HEADER, TOKEN_HEADER};
pub use client::EventStoreClient;
pub use config::{
    ClientConfig, ClientConfigBuilder, DEFAULT_PASSWORD, DEFAULT_USERNAME, RetryPolicy,
    RetryPolicyBuilder,
};
pub use connection::ConnectionPool;
pub use error::{CallContext, Result, SdkError};
pub use log::{Logger, NoopLogger, TracingLogger};
pub use retry::{with_retry, with_retry_cancellable};
pub use subscription::{ErrorHandler, EventStream, Subscription, SubscriptionState};
pub use target::{ConnectionTarget, LoadBalancingPolicy};
pub use types::{
    AdminUser, ChangePasswordRequest, CreateUserRequest, CredentialsValidation, Criterion,
    Direction, Event, EventToSave, ExpectedVersion, GetEventsRequest, Payload, Position, Query,
    SaveEventsRequest, SubscribeToAllRequest, SubscribeToStreamRequest, Tag, WriteResult,
};
