//! Call plumbing shared by both client facades.
//!
//! [`ClientCore`] owns everything one client instance needs to talk to the
//! server: the connection pool, the auth session, the retry policy, the logger
//! and the disposed flag. Facades describe *what* to call; the core attaches
//! credentials, harvests session tokens from every response and failure,
//! retries transient errors and wraps failures with call context.

use std::{
    future::Future,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
};

use snafu::{IntoError, ensure};
use tokio_util::sync::CancellationToken;
use tonic::{Request, Response, Status, Streaming, transport::Channel};

use crate::{
    auth::AuthSession,
    config::{ClientConfig, RetryPolicy},
    connection::ConnectionPool,
    error::{CallContext, CallSnafu, DisposedSnafu, Result, SdkError},
    log::Logger,
    retry::with_retry_cancellable,
};

/// What a unary call is doing, used for logs and error messages.
#[derive(Debug, Clone)]
pub(crate) struct CallScope {
    /// Short operation name, e.g. `save_events`.
    pub(crate) operation: &'static str,
    /// Human readable action and target, e.g. `save events to stream 'orders'`.
    pub(crate) description: String,
    pub(crate) context: CallContext,
}

impl CallScope {
    pub(crate) fn new(
        operation: &'static str,
        description: impl Into<String>,
        context: CallContext,
    ) -> Self {
        Self { operation, description: description.into(), context }
    }

    /// Wraps a failure as `Failed to <description>: <cause>`.
    pub(crate) fn wrap(&self, err: SdkError) -> SdkError {
        CallSnafu { description: self.description.clone(), context: self.context.clone() }
            .into_error(err)
    }
}

/// Shared state of one client instance.
pub(crate) struct ClientCore {
    client_name: &'static str,
    pool: ConnectionPool,
    auth: AuthSession,
    retry_policy: RetryPolicy,
    logger: Arc<dyn Logger>,
    disposed: AtomicBool,
    shutdown: CancellationToken,
}

impl std::fmt::Debug for ClientCore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct(self.client_name)
            .field("pool", &self.pool)
            .field("disposed", &self.disposed)
            .finish_non_exhaustive()
    }
}

impl ClientCore {
    pub(crate) fn new(client_name: &'static str, config: &ClientConfig) -> Result<Self> {
        let pool = ConnectionPool::new(config)?;
        let auth = AuthSession::new(&config.username, &config.password)?;

        Ok(Self {
            client_name,
            pool,
            auth,
            retry_policy: config.retry_policy.clone(),
            logger: Arc::clone(&config.logger),
            disposed: AtomicBool::new(false),
            shutdown: CancellationToken::new(),
        })
    }

    pub(crate) fn logger(&self) -> &dyn Logger {
        self.logger.as_ref()
    }

    /// Fails with [`SdkError::Disposed`] once the client has been closed.
    ///
    /// Every public operation calls this before validating its arguments.
    pub(crate) fn ensure_open(&self) -> Result<()> {
        ensure!(!self.disposed.load(Ordering::SeqCst), DisposedSnafu);
        Ok(())
    }

    pub(crate) fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::SeqCst)
    }

    pub(crate) fn cached_token(&self) -> Option<Arc<str>> {
        self.auth.cached_token()
    }

    /// Token cancelled when the client closes. Subscriptions hang child tokens off it.
    pub(crate) fn shutdown_token(&self) -> &CancellationToken {
        &self.shutdown
    }

    /// Marks the client disposed, cancels its subscriptions and drops the channel.
    ///
    /// Returns false if the client was already closed.
    pub(crate) fn close(&self) -> bool {
        if self.disposed.swap(true, Ordering::SeqCst) {
            self.logger.debug(&format!("{} already closed", self.client_name));
            return false;
        }

        self.shutdown.cancel();
        self.pool.reset();
        self.logger.info(&format!("{} closed", self.client_name));
        true
    }

    /// Caches a session token carried by response or status metadata.
    pub(crate) fn observe_metadata(
        &self,
        metadata: &tonic::metadata::MetadataMap,
        operation: &str,
    ) {
        self.auth.observe(metadata, operation);
    }

    /// Executes a unary call with credentials, token harvesting and retries.
    ///
    /// `call` receives a channel and a request that already carries the auth
    /// headers. Failures are wrapped with `scope` and logged. Closing the client
    /// stops pending retries; the call then fails with [`SdkError::Disposed`].
    pub(crate) async fn unary<Req, Resp, F, Fut>(
        &self,
        scope: &CallScope,
        request: Req,
        call: F,
    ) -> Result<Resp>
    where
        Req: Clone,
        F: Fn(Channel, Request<Req>) -> Fut,
        Fut: Future<Output = std::result::Result<Response<Resp>, Status>>,
    {
        let operation = scope.operation;
        let result = with_retry_cancellable(&self.retry_policy, &self.shutdown, operation, || {
            let request = request.clone();
            let call = &call;
            async move {
                let channel = self.pool.get_channel().await?;
                match call(channel, self.authorized(request)).await {
                    Ok(response) => {
                        self.auth.observe(response.metadata(), operation);
                        Ok(response.into_inner())
                    },
                    Err(status) => {
                        self.auth.observe(status.metadata(), operation);
                        Err(SdkError::from(status))
                    },
                }
            }
        })
        .await;

        result.map_err(|err| {
            if matches!(err, SdkError::Disposed) {
                return err;
            }
            let err = scope.wrap(err);
            self.logger.error(&err.to_string());
            err
        })
    }

    /// Opens a server-streaming call. Stream setup is never retried.
    pub(crate) async fn open_stream<Req, Resp, F, Fut>(
        &self,
        operation: &'static str,
        request: Req,
        call: F,
    ) -> Result<Streaming<Resp>>
    where
        F: FnOnce(Channel, Request<Req>) -> Fut,
        Fut: Future<Output = std::result::Result<Response<Streaming<Resp>>, Status>>,
    {
        let channel = self.pool.get_channel().await?;
        match call(channel, self.authorized(request)).await {
            Ok(response) => {
                self.auth.observe(response.metadata(), operation);
                Ok(response.into_inner())
            },
            Err(status) => {
                self.auth.observe(status.metadata(), operation);
                Err(SdkError::from(status))
            },
        }
    }

    fn authorized<Req>(&self, message: Req) -> Request<Req> {
        let mut request = Request::new(message);
        *request.metadata_mut() = self.auth.call_headers();
        request
    }
}
