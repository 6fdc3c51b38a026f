//! Basic usage example: append, read and inspect the store.
//!
//! Run: `cargo run --example basic_usage -- --target localhost:5005`
//!
//! This example shows:
//! - Client configuration with credentials and logging
//! - Appending events with an expected version
//! - Reading a stream back, newest first
//! - Handling a concurrency conflict
//! - Counting events through the admin client

// Examples are allowed to use expect/unwrap for brevity
#![allow(clippy::expect_used, clippy::unwrap_used, clippy::disallowed_methods)]

use orisun_sdk::{
    AdminClient, ClientConfig, Direction, EventStoreClient, EventToSave, ExpectedVersion,
    GetEventsRequest, Result,
};
use serde_json::json;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt().with_env_filter("orisun_sdk=debug").init();

    let args: Vec<String> = std::env::args().collect();
    let target = args
        .iter()
        .position(|a| a == "--target")
        .and_then(|i| args.get(i + 1))
        .map(String::as_str)
        .unwrap_or("localhost:5005");

    println!("Connecting to Orisun at {target}");

    // -------------------------------------------------------------------------
    // 1. Create clients sharing one configuration
    // -------------------------------------------------------------------------
    let config = ClientConfig::builder()
        .with_target(target)
        .with_username("admin")
        .with_password("changeit")
        .with_logging(true)
        .build()?;

    let client = EventStoreClient::new(config.clone())?;
    let admin = AdminClient::new(config)?;

    if !client.health_check().await? {
        println!("Server is not reachable");
        return Ok(());
    }

    // -------------------------------------------------------------------------
    // 2. Append to a new stream
    // -------------------------------------------------------------------------
    let stream = format!("order-{}", chrono::Utc::now().timestamp_millis());
    let events = vec![
        EventToSave::new("evt-1", "OrderPlaced", json!({"total": 42, "currency": "EUR"}))
            .with_metadata("source", "basic_usage"),
        EventToSave::new("evt-2", "OrderPaid", json!({"method": "card"})),
    ];
    let written =
        client.append_to_stream("shop", &stream, ExpectedVersion::NoStream, events).await?;
    println!(
        "Appended at {:?}, stream version {:?}",
        written.log_position, written.new_stream_version
    );

    // -------------------------------------------------------------------------
    // 3. Read it back, newest first
    // -------------------------------------------------------------------------
    let request = GetEventsRequest::builder()
        .boundary("shop")
        .stream(stream.as_str())
        .direction(Direction::Desc)
        .count(10)
        .build();
    for event in client.get_events(request).await? {
        println!("  v{} {} {:?}", event.version, event.event_type, event.data.as_value());
    }

    // -------------------------------------------------------------------------
    // 4. A stale expected version is rejected by the server
    // -------------------------------------------------------------------------
    let stale = EventToSave::new("evt-3", "OrderShipped", json!({"carrier": "post"}));
    match client.append_to_stream("shop", &stream, ExpectedVersion::NoStream, vec![stale]).await {
        Ok(_) => println!("Unexpected success"),
        Err(err) => println!("Rejected as expected: {err} (code {:?})", err.code()),
    }

    println!("Events in boundary: {}", admin.get_event_count("shop").await?);

    client.close();
    admin.close();
    Ok(())
}
