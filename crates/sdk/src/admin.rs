//! Administrative client: user management and store statistics.

use std::sync::Arc;

use orisun_proto::admin::{self as admin_wire, admin_client::AdminClient as AdminStub};
use tonic::{Code, metadata::MetadataMap};

use crate::{
    call::{CallScope, ClientCore},
    config::ClientConfig,
    convert,
    error::{CallContext, Result, SdkError},
    types::{AdminUser, ChangePasswordRequest, CreateUserRequest, CredentialsValidation},
};

/// Client for the `orisun.Admin` service.
///
/// Shares configuration, authentication and lifecycle rules with
/// [`EventStoreClient`](crate::EventStoreClient).
#[derive(Debug, Clone)]
pub struct AdminClient {
    core: Arc<ClientCore>,
}

impl AdminClient {
    /// Creates a client from a validated configuration. No connection is made yet.
    ///
    /// # Errors
    ///
    /// Returns an error if the target cannot be turned into endpoints or the
    /// credentials cannot be encoded as a header.
    pub fn new(config: ClientConfig) -> Result<Self> {
        let core = ClientCore::new("AdminClient", &config)?;
        core.logger().info(&format!("AdminClient initialized for {}", config.target()));
        Ok(Self { core: Arc::new(core) })
    }

    /// Creates a user and returns it as stored by the server.
    ///
    /// # Errors
    ///
    /// Returns [`SdkError::Disposed`] after `close()`, [`SdkError::Validation`]
    /// when name, username or password is empty, and [`SdkError::Call`] on
    /// failure.
    pub async fn create_user(&self, request: CreateUserRequest) -> Result<AdminUser> {
        self.core.ensure_open()?;
        let message = convert::create_user_request(&request)?;
        let scope =
            CallScope::new("create_user", "create user", CallContext::user(&request.username));
        self.core.logger().debug(&format!("Creating user '{}'", request.username));

        let response = self
            .core
            .unary(&scope, message, |channel, req| async move {
                AdminStub::new(channel).create_user(req).await
            })
            .await?;

        let Some(user) = response.user else {
            let err = scope.wrap(SdkError::Rpc {
                code: Code::Internal,
                message: "response carried no user".to_owned(),
                metadata: MetadataMap::new(),
            });
            self.core.logger().error(&err.to_string());
            return Err(err);
        };

        self.core.logger().info(&format!("Created user '{}'", request.username));
        Ok(convert::admin_user_from_wire(user))
    }

    /// Deletes a user. Returns the server's success flag.
    ///
    /// # Errors
    ///
    /// Returns [`SdkError::Disposed`] after `close()`, [`SdkError::Validation`]
    /// for an empty id, and [`SdkError::Call`] on failure.
    pub async fn delete_user(&self, user_id: &str) -> Result<bool> {
        self.core.ensure_open()?;
        let message = convert::delete_user_request(user_id)?;
        let scope = CallScope::new("delete_user", "delete user", CallContext::user(user_id));
        self.core.logger().debug(&format!("Deleting user '{user_id}'"));

        let response = self
            .core
            .unary(&scope, message, |channel, req| async move {
                AdminStub::new(channel).delete_user(req).await
            })
            .await?;

        self.core.logger().info(&format!("Deleted user '{user_id}'"));
        Ok(response.success)
    }

    /// Changes a user's password. Returns the server's success flag.
    ///
    /// # Errors
    ///
    /// Returns [`SdkError::Disposed`] after `close()`, [`SdkError::Validation`]
    /// when any field is empty, and [`SdkError::Call`] on failure.
    pub async fn change_password(&self, request: ChangePasswordRequest) -> Result<bool> {
        self.core.ensure_open()?;
        let message = convert::change_password_request(&request)?;
        let scope = CallScope::new(
            "change_password",
            "change password",
            CallContext::user(&request.user_id),
        );
        self.core.logger().debug(&format!("Changing password for user '{}'", request.user_id));

        let response = self
            .core
            .unary(&scope, message, |channel, req| async move {
                AdminStub::new(channel).change_password(req).await
            })
            .await?;

        self.core.logger().info(&format!("Changed password for user '{}'", request.user_id));
        Ok(response.success)
    }

    /// Lists every user.
    ///
    /// # Errors
    ///
    /// Returns [`SdkError::Disposed`] after `close()` and [`SdkError::Call`] on failure.
    pub async fn list_users(&self) -> Result<Vec<AdminUser>> {
        self.core.ensure_open()?;
        let scope = CallScope::new("list_users", "list users", CallContext::default());
        self.core.logger().debug("Listing users");

        let response = self
            .core
            .unary(&scope, admin_wire::ListUsersRequest {}, |channel, req| async move {
                AdminStub::new(channel).list_users(req).await
            })
            .await?;

        let users: Vec<AdminUser> =
            response.users.into_iter().map(convert::admin_user_from_wire).collect();
        self.core.logger().debug(&format!("Listed {} users", users.len()));
        Ok(users)
    }

    /// Checks a username and password against the server.
    ///
    /// Invalid credentials are reported as `success == false`, not as an error.
    ///
    /// # Errors
    ///
    /// Returns [`SdkError::Disposed`] after `close()`, [`SdkError::Validation`]
    /// when either value is empty, and [`SdkError::Call`] on failure.
    pub async fn validate_credentials(
        &self,
        username: &str,
        password: &str,
    ) -> Result<CredentialsValidation> {
        self.core.ensure_open()?;
        let message = convert::validate_credentials_request(username, password)?;
        let scope = CallScope::new(
            "validate_credentials",
            "validate credentials",
            CallContext::user(username),
        );
        self.core.logger().debug(&format!("Validating credentials for user '{username}'"));

        let response = self
            .core
            .unary(&scope, message, |channel, req| async move {
                AdminStub::new(channel).validate_credentials(req).await
            })
            .await?;

        Ok(CredentialsValidation {
            success: response.success,
            user: response.user.map(convert::admin_user_from_wire),
        })
    }

    /// Returns the number of users.
    ///
    /// # Errors
    ///
    /// Returns [`SdkError::Disposed`] after `close()` and [`SdkError::Call`] on failure.
    pub async fn get_user_count(&self) -> Result<i64> {
        self.core.ensure_open()?;
        let scope = CallScope::new("get_user_count", "get user count", CallContext::default());

        let response = self
            .core
            .unary(&scope, admin_wire::GetUserCountRequest {}, |channel, req| async move {
                AdminStub::new(channel).get_user_count(req).await
            })
            .await?;
        Ok(response.count)
    }

    /// Returns the number of events stored in a boundary.
    ///
    /// # Errors
    ///
    /// Returns [`SdkError::Disposed`] after `close()`, [`SdkError::Validation`]
    /// for an empty boundary, and [`SdkError::Call`] on failure.
    pub async fn get_event_count(&self, boundary: &str) -> Result<i64> {
        self.core.ensure_open()?;
        let message = convert::event_count_request(boundary)?;
        let scope =
            CallScope::new("get_event_count", "get event count", CallContext::boundary(boundary));

        let response = self
            .core
            .unary(&scope, message, |channel, req| async move {
                AdminStub::new(channel).get_event_count(req).await
            })
            .await?;
        Ok(response.count)
    }

    /// Probes the server by counting users. Failures are logged and reported as `Ok(false)`.
    ///
    /// # Errors
    ///
    /// Returns [`SdkError::Disposed`] after `close()`.
    pub async fn health_check(&self) -> Result<bool> {
        self.core.ensure_open()?;
        match self.get_user_count().await {
            Ok(_) => Ok(true),
            Err(err) => {
                self.core.logger().warn(&format!("Admin health check failed: {err}"));
                Ok(false)
            },
        }
    }

    /// Closes the client. Later operations fail with [`SdkError::Disposed`].
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

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic, clippy::disallowed_methods)]
mod tests {
    use super::*;

    fn client() -> AdminClient {
        let config =
            ClientConfig::builder().with_host("localhost").with_port(5005).build().unwrap();
        AdminClient::new(config).unwrap()
    }

    #[tokio::test]
    async fn test_validation_messages() {
        let client = client();

        let request = CreateUserRequest::builder().name("").username("u").password("p").build();
        assert_eq!(client.create_user(request).await.unwrap_err().to_string(), "Name is required");

        assert_eq!(client.delete_user("").await.unwrap_err().to_string(), "User ID is required");

        let err = client.validate_credentials("alice", "").await.unwrap_err();
        assert_eq!(err.to_string(), "Password is required");

        let err = client.get_event_count("  ").await.unwrap_err();
        assert_eq!(err.to_string(), "Boundary is required");
    }

    #[tokio::test]
    async fn test_closed_client_rejects_calls() {
        let client = client();
        client.close();

        assert!(matches!(client.list_users().await.unwrap_err(), SdkError::Disposed));
        assert!(matches!(client.get_user_count().await.unwrap_err(), SdkError::Disposed));
        assert!(matches!(client.delete_user("").await.unwrap_err(), SdkError::Disposed));
        assert!(matches!(client.health_check().await.unwrap_err(), SdkError::Disposed));
    }
}
