//! # queue-bus
//!
//! Point-to-point message bus over a managed, at-least-once delivery
//! queue: `publish`, `subscribe`, `acknowledge`, with queue polling,
//! payload compression, and integrity verification hidden behind the
//! facade.
//!
//! ## Architecture
//!
//! - **Codec**: payloads are serialized, digested (SHA-256 of the
//!   uncompressed bytes), and zstd-compressed into an [`codec::Envelope`]
//! - **Poller**: a self-reinvoking long-poll loop with one receive in
//!   flight at a time; consumers pace it through a continuation
//! - **Transport**: a thin [`QueueTransport`] adapter seam; the bus
//!   never talks to a queue service directly
//!
//! ## Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use queue_bus::{BusConfig, InMemoryQueue, ServiceBus};
//! use serde_json::json;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let bus = ServiceBus::new(
//!         BusConfig {
//!             access_key_id: "AKID".into(),
//!             secret_access_key: "SECRET".into(),
//!             region: "eu-west-1".into(),
//!             publish_queue: "orders".into(),
//!             subscribe_queue: "orders".into(),
//!         },
//!         Arc::new(InMemoryQueue::new()),
//!     )?;
//!
//!     bus.subscribe(move |batch, next| async move {
//!         for message in &batch {
//!             println!("received {}", message.body());
//!         }
//!         next.resume();
//!     });
//!
//!     bus.publish(&json!({"name": "Peter", "phone": 1234})).await?;
//!     Ok(())
//! }
//! ```

pub mod codec;
pub mod config;
pub mod error;
pub mod poller;
pub mod transport;

mod bus;
mod message;

pub use bus::ServiceBus;
pub use config::BusConfig;
pub use error::{BusError, Result};
pub use message::InboundMessage;
pub use poller::{BatchConsumer, Continuation, PollerConfig};
pub use transport::{
    InMemoryQueue, QueueTransport, RawMessage, ReceiveOptions, SendReceipt, TransportError,
};
