//! Admin client tests against the in-process mock server.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic, clippy::disallowed_methods)]

mod common;

use common::config_for;
use orisun_sdk::{
    AdminClient, ChangePasswordRequest, CreateUserRequest, EventStoreClient, EventToSave,
    ExpectedVersion, SdkError, mock::MockEventStoreServer,
};
use serde_json::json;
use tonic::Code;

async fn setup() -> (MockEventStoreServer, AdminClient, std::sync::Arc<common::CapturingLogger>) {
    let server = MockEventStoreServer::start().await.unwrap();
    let (config, logger) = config_for(&server);
    let client = AdminClient::new(config).unwrap();
    (server, client, logger)
}

#[tokio::test]
async fn test_user_lifecycle() {
    let (_server, admin, logger) = setup().await;

    let user = admin
        .create_user(
            CreateUserRequest::builder()
                .name("Alice")
                .username("alice")
                .password("s3cret")
                .roles(vec!["Admin".to_owned()])
                .build(),
        )
        .await
        .unwrap();
    assert_eq!(user.username, "alice");
    assert_eq!(user.roles, ["Admin"]);
    assert!(logger.contains("info", "Created user 'alice'"));

    let users = admin.list_users().await.unwrap();
    assert_eq!(users.len(), 1);
    assert_eq!(users[0].user_id, user.user_id);
    assert_eq!(admin.get_user_count().await.unwrap(), 1);

    let changed = admin
        .change_password(
            ChangePasswordRequest::builder()
                .user_id(&user.user_id)
                .current_password("s3cret")
                .new_password("n3w")
                .build(),
        )
        .await
        .unwrap();
    assert!(changed);

    let check = admin.validate_credentials("alice", "n3w").await.unwrap();
    assert!(check.success);
    assert_eq!(check.user.unwrap().user_id, user.user_id);

    let check = admin.validate_credentials("alice", "s3cret").await.unwrap();
    assert!(!check.success);
    assert!(check.user.is_none());

    assert!(admin.delete_user(&user.user_id).await.unwrap());
    assert!(!admin.delete_user(&user.user_id).await.unwrap());
    assert_eq!(admin.get_user_count().await.unwrap(), 0);
}

#[tokio::test]
async fn test_duplicate_user_is_wrapped() {
    let (server, admin, _) = setup().await;
    server.add_user("Bob", "bob", "pw", &["Operations"]);

    let err = admin
        .create_user(CreateUserRequest::builder().name("Bob").username("bob").password("x").build())
        .await
        .unwrap_err();
    assert!(err.to_string().starts_with("Failed to create user: "));
    assert_eq!(err.code(), Some(Code::AlreadyExists));
    assert_eq!(err.context().unwrap().user.as_deref(), Some("bob"));
}

#[tokio::test]
async fn test_event_count_follows_appends() {
    let (server, admin, _) = setup().await;
    let (config, _) = config_for(&server);
    let events = EventStoreClient::new(config).unwrap();

    events
        .append_to_stream(
            "shop",
            "order-1",
            ExpectedVersion::NoStream,
            vec![EventToSave::new("e1", "OrderPlaced", json!({"total": 1}))],
        )
        .await
        .unwrap();

    assert_eq!(admin.get_event_count("shop").await.unwrap(), 1);
    assert_eq!(admin.get_event_count("other").await.unwrap(), 0);
}

#[tokio::test]
async fn test_validation_and_close_send_nothing() {
    let (server, admin, _) = setup().await;

    let err = admin
        .change_password(
            ChangePasswordRequest::builder()
                .user_id("user-1")
                .current_password("")
                .new_password("n")
                .build(),
        )
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "Current password is required");

    admin.close();
    assert!(admin.is_disposed());
    assert!(matches!(admin.get_user_count().await.unwrap_err(), SdkError::Disposed));
    assert_eq!(server.total_requests(), 0);
}

#[tokio::test]
async fn test_health_check_and_token() {
    let (server, admin, logger) = setup().await;
    server.set_auth_token("admin-token");

    assert!(admin.health_check().await.unwrap());
    assert_eq!(admin.cached_token().as_deref(), Some("admin-token"));
    assert_eq!(server.request_count("get_user_count"), 1);

    server.fail_next(Code::Unauthenticated, "bad credentials");
    assert!(!admin.health_check().await.unwrap());
    assert!(logger.contains("warn", "Admin health check failed"));

    // The token survives an authentication failure.
    assert_eq!(admin.cached_token().as_deref(), Some("admin-token"));
}
