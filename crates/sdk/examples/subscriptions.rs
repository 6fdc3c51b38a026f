//! Subscription example: callback delivery and pull-based streaming.
//!
//! Run: `cargo run --example subscriptions -- --target localhost:5005`
//!
//! This example shows:
//! - Following one stream with an async handler
//! - Receiving malformed events through the error handler
//! - Following a whole boundary as a `futures::Stream`
//! - Cancelling and closing

// Examples are allowed to use expect/unwrap for brevity
#![allow(clippy::expect_used, clippy::unwrap_used, clippy::disallowed_methods)]

use std::time::Duration;

use futures::StreamExt;
use orisun_sdk::{
    ClientConfig, EventStoreClient, EventToSave, ExpectedVersion, Result, SdkError,
    SubscribeToAllRequest, SubscribeToStreamRequest,
};
use serde_json::json;
use tokio::time::timeout;

#[tokio::main]
async fn main() -> Result<()> {
    let args: Vec<String> = std::env::args().collect();
    let target = args
        .iter()
        .position(|a| a == "--target")
        .and_then(|i| args.get(i + 1))
        .map(String::as_str)
        .unwrap_or("localhost:5005");

    let config = ClientConfig::builder().with_target(target).build()?;
    let client = EventStoreClient::new(config)?;

    let stream = format!("cart-{}", chrono::Utc::now().timestamp_millis());

    // -------------------------------------------------------------------------
    // 1. Callback subscription to one stream
    // -------------------------------------------------------------------------
    let request = SubscribeToStreamRequest::builder()
        .boundary("shop")
        .subscriber_name("cart-projector")
        .stream(stream.as_str())
        .build();
    let subscription = client
        .subscribe_to_stream(
            request,
            |event| async move {
                println!("[callback] v{} {}", event.version, event.event_type);
                // The next event is not delivered until this future completes.
                tokio::time::sleep(Duration::from_millis(50)).await;
            },
            Some(Box::new(|err: SdkError| eprintln!("[callback] {err}"))),
        )
        .await?;

    // -------------------------------------------------------------------------
    // 2. Write a few events
    // -------------------------------------------------------------------------
    let mut expected = ExpectedVersion::NoStream;
    for i in 0..3 {
        let event = EventToSave::new(format!("item-{i}"), "ItemAdded", json!({"sku": i}));
        let result = client.append_to_stream("shop", &stream, expected, vec![event]).await?;
        if let Some(version) = result.new_stream_version {
            expected = ExpectedVersion::Exact(version);
        }
    }

    tokio::time::sleep(Duration::from_secs(1)).await;
    subscription.cancel();
    println!("callback subscription finished: {:?}", subscription.join().await);

    // -------------------------------------------------------------------------
    // 3. Pull-based subscription to the whole boundary
    // -------------------------------------------------------------------------
    let request = SubscribeToAllRequest::builder()
        .boundary("shop")
        .subscriber_name("audit-log")
        .build();
    let mut events = client.stream_events(request).await?;

    while let Ok(Some(item)) = timeout(Duration::from_secs(2), events.next()).await {
        match item {
            Ok(event) => println!("[stream] {} {}", event.stream_id, event.event_id),
            Err(err) => eprintln!("[stream] {err}"),
        }
    }

    // Closing the client ends every subscription it opened.
    client.close();
    Ok(())
}
