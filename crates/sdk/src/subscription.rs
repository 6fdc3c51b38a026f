//! Catch-up subscriptions.
//!
//! Two delivery styles are offered over the same server stream:
//!
//! - **Callback** ([`Subscription`]): a background task decodes each event and
//!   awaits the handler before pulling the next one, so handlers never overlap
//!   and see events in server order.
//! - **Pull** ([`EventStream`]): a `futures::Stream` of `Result<Event>` items.
//!
//! In both, an event whose JSON cannot be decoded is still delivered, with the
//! text kept as [`Payload::Raw`](crate::Payload::Raw), and the failure is logged
//! (and reported to the error handler as [`SdkError::Decode`]). A stream-level
//! failure ends the subscription; nothing reconnects. Closing the client ends
//! every subscription it opened.

use std::{
    fmt,
    future::Future,
    pin::Pin,
    sync::Arc,
    task::{Context, Poll},
};

use futures::{Stream, StreamExt, stream::BoxStream};
use orisun_proto::eventstore as wire;
use parking_lot::Mutex;
use snafu::IntoError;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tonic::Streaming;

use crate::{
    call::ClientCore,
    convert::decode_event,
    error::{CallContext, Result, SdkError, SubscriptionSnafu},
    types::Event,
};

/// Callback receiving subscription failures.
pub type ErrorHandler = Box<dyn FnMut(SdkError) + Send + 'static>;

/// Lifecycle of a callback subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SubscriptionState {
    /// Events are being delivered.
    Streaming,
    /// The server closed the stream.
    Ended,
    /// The stream failed.
    Errored,
    /// Cancelled through the handle or by closing the client.
    Cancelled,
}

impl SubscriptionState {
    /// Returns true for every state except [`Streaming`](Self::Streaming).
    #[must_use]
    pub fn is_terminal(self) -> bool {
        self != Self::Streaming
    }
}

/// Identifies a subscription in logs and errors.
#[derive(Debug, Clone)]
pub(crate) struct SubscriptionScope {
    pub(crate) operation: &'static str,
    /// `stream 'orders'` or `all streams`.
    pub(crate) target: String,
    pub(crate) context: CallContext,
}

impl SubscriptionScope {
    /// Wraps a failure that happened while opening the stream.
    pub(crate) fn setup_error(&self, err: SdkError) -> SdkError {
        SubscriptionSnafu {
            description: format!("Failed to create subscription to {}", self.target),
            context: self.context.clone(),
        }
        .into_error(err)
    }

    /// Wraps a failure reported by an open stream.
    fn stream_error(&self, err: SdkError) -> SdkError {
        SubscriptionSnafu {
            description: format!("Subscription error for {}", self.target),
            context: self.context.clone(),
        }
        .into_error(err)
    }
}

/// Handle to a running callback subscription.
///
/// Dropping the handle detaches it: delivery continues until the stream ends
/// or the client is closed.
pub struct Subscription {
    token: CancellationToken,
    state: Arc<Mutex<SubscriptionState>>,
    task: JoinHandle<()>,
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription").field("state", &self.state()).finish_non_exhaustive()
    }
}

impl Subscription {
    /// Stops delivery.
    ///
    /// A handler call already running is allowed to finish; once the delivery
    /// task sees the cancellation it starts no further call. Calling it again
    /// has no effect.
    pub fn cancel(&self) {
        transition(&self.state, SubscriptionState::Cancelled);
        self.token.cancel();
    }

    /// Returns true once the subscription was cancelled or its client closed.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Returns the current state.
    #[must_use]
    pub fn state(&self) -> SubscriptionState {
        *self.state.lock()
    }

    /// Waits for the delivery task to finish and returns the final state.
    pub async fn join(self) -> SubscriptionState {
        let Self { state, task, .. } = self;
        if task.await.is_err() {
            // The handler panicked.
            transition(&state, SubscriptionState::Errored);
        }
        *state.lock()
    }
}

/// Moves out of `Streaming`; terminal states never change.
fn transition(state: &Mutex<SubscriptionState>, next: SubscriptionState) -> bool {
    let mut guard = state.lock();
    if guard.is_terminal() {
        return false;
    }
    *guard = next;
    true
}

/// Starts the delivery task for an opened stream.
pub(crate) fn spawn_delivery<H, Fut>(
    core: Arc<ClientCore>,
    mut stream: Streaming<wire::Event>,
    scope: SubscriptionScope,
    mut on_event: H,
    mut on_error: Option<ErrorHandler>,
) -> Subscription
where
    H: FnMut(Event) -> Fut + Send + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    let token = core.shutdown_token().child_token();
    let state = Arc::new(Mutex::new(SubscriptionState::Streaming));

    let task = tokio::spawn({
        let token = token.clone();
        let state = Arc::clone(&state);
        async move {
            loop {
                let next = tokio::select! {
                    biased;
                    () = token.cancelled() => {
                        transition(&state, SubscriptionState::Cancelled);
                        let message = format!("Subscription to {} cancelled", scope.target);
                        core.logger().debug(&message);
                        break;
                    }
                    next = stream.message() => next,
                };

                match next {
                    Ok(Some(message)) => {
                        let (event, failure) = decode_event(message);
                        if let Some(err) = failure {
                            core.logger().warn(&err.to_string());
                            if let Some(handler) = on_error.as_mut() {
                                handler(err);
                            }
                        }
                        if token.is_cancelled() {
                            continue;
                        }
                        on_event(event).await;
                    },
                    Ok(None) => {
                        if let Ok(Some(trailers)) = stream.trailers().await {
                            core.observe_metadata(&trailers, scope.operation);
                        }
                        transition(&state, SubscriptionState::Ended);
                        let message = format!("Subscription to {} ended", scope.target);
                        core.logger().debug(&message);
                        break;
                    },
                    Err(status) => {
                        core.observe_metadata(status.metadata(), scope.operation);
                        let err = scope.stream_error(SdkError::from(status));
                        transition(&state, SubscriptionState::Errored);
                        core.logger().error(&err.to_string());
                        if let Some(handler) = on_error.as_mut() {
                            handler(err);
                        }
                        break;
                    },
                }
            }
        }
    });

    Subscription { token, state, task }
}

/// Pull-based subscription yielding events in server order.
///
/// Malformed events are yielded with a raw payload and a logged warning. A
/// stream-level failure is yielded once as `Err`, then the stream ends. The
/// stream also ends when the client is closed.
pub struct EventStream {
    inner: BoxStream<'static, Result<Event>>,
}

impl fmt::Debug for EventStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventStream").finish_non_exhaustive()
    }
}

struct PullState {
    core: Arc<ClientCore>,
    stream: Streaming<wire::Event>,
    scope: SubscriptionScope,
    token: CancellationToken,
    finished: bool,
}

impl EventStream {
    pub(crate) fn new(
        core: Arc<ClientCore>,
        stream: Streaming<wire::Event>,
        scope: SubscriptionScope,
    ) -> Self {
        let token = core.shutdown_token().child_token();
        let state = PullState { core, stream, scope, token, finished: false };

        let inner = futures::stream::unfold(state, |mut st| async move {
            if st.finished {
                return None;
            }

            let next = tokio::select! {
                biased;
                () = st.token.cancelled() => return None,
                next = st.stream.message() => next,
            };

            match next {
                Ok(Some(message)) => {
                    let (event, failure) = decode_event(message);
                    if let Some(err) = failure {
                        st.core.logger().warn(&err.to_string());
                    }
                    Some((Ok(event), st))
                },
                Ok(None) => {
                    if let Ok(Some(trailers)) = st.stream.trailers().await {
                        st.core.observe_metadata(&trailers, st.scope.operation);
                    }
                    let message = format!("Subscription to {} ended", st.scope.target);
                    st.core.logger().debug(&message);
                    None
                },
                Err(status) => {
                    st.core.observe_metadata(status.metadata(), st.scope.operation);
                    let err = st.scope.stream_error(SdkError::from(status));
                    st.core.logger().error(&err.to_string());
                    st.finished = true;
                    Some((Err(err), st))
                },
            }
        });

        Self { inner: inner.boxed() }
    }
}

impl Stream for EventStream {
    type Item = Result<Event>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.inner.poll_next_unpin(cx)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic, clippy::disallowed_methods)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_states_are_sticky() {
        let state = Mutex::new(SubscriptionState::Streaming);
        assert!(transition(&state, SubscriptionState::Cancelled));
        assert!(!transition(&state, SubscriptionState::Ended));
        assert_eq!(*state.lock(), SubscriptionState::Cancelled);
    }

    #[test]
    fn test_scope_messages() {
        let scope = SubscriptionScope {
            operation: "subscribe_to_stream",
            target: "stream 'orders'".to_owned(),
            context: CallContext::boundary("b1").with_subscriber("projector"),
        };

        let err = scope.setup_error(SdkError::from(tonic::Status::unavailable("down")));
        assert!(
            err.to_string().starts_with("Failed to create subscription to stream 'orders'")
        );
        assert_eq!(err.context().unwrap().subscriber_name.as_deref(), Some("projector"));

        let err = scope.stream_error(SdkError::from(tonic::Status::internal("reset")));
        assert!(err.to_string().starts_with("Subscription error for stream 'orders'"));
    }
}
