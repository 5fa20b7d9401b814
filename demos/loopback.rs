//! Loopback demo: two buses over one in-memory queue.
//!
//! One bus publishes a sample payload; its peer consumes it, prints it,
//! and acknowledges. Poller logs are visible at debug level.
//!
//! ```bash
//! cargo run --example loopback
//! ```

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;

use queue_bus::{BusConfig, InMemoryQueue, PollerConfig, ServiceBus};

fn side(publish_queue: &str, subscribe_queue: &str) -> BusConfig {
    BusConfig {
        access_key_id: "demo".to_string(),
        secret_access_key: "demo".to_string(),
        region: "local".to_string(),
        publish_queue: publish_queue.to_string(),
        subscribe_queue: subscribe_queue.to_string(),
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "queue_bus=debug".into()),
        )
        .init();

    let queue = Arc::new(InMemoryQueue::new());

    let tuning = PollerConfig {
        wait_time: Duration::from_millis(100),
        ..PollerConfig::default()
    };

    let producer = ServiceBus::new(side("orders", "replies"), queue.clone())?;
    let consumer = Arc::new(ServiceBus::with_poller_config(
        side("replies", "orders"),
        tuning,
        queue.clone(),
    )?);

    let ack_bus = consumer.clone();
    consumer.subscribe(move |batch, next| {
        let bus = ack_bus.clone();
        async move {
            for message in &batch {
                println!("received {}: {}", message.message_id(), message.body());
                if let Err(e) = bus.acknowledge(message).await {
                    eprintln!("acknowledge failed: {}", e);
                }
            }
            next.resume();
        }
    });

    let payload = json!({"name": "Peter", "phone": 1234});
    let message_id = producer.publish(&payload).await?;
    println!(
        "published {} with content digest {}",
        message_id,
        ServiceBus::content_digest_of(&payload)?
    );

    // Give the poll loop a moment to deliver before the process exits.
    tokio::time::sleep(Duration::from_secs(1)).await;
    Ok(())
}
