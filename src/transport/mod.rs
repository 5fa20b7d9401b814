//! Transport module - adapter seam to the managed queue service.
//!
//! The bus never talks to a queue service directly. Everything goes
//! through [`QueueTransport`], a thin trait mirroring the three
//! primitives every at-least-once managed queue offers: send a message,
//! receive a batch with a visibility timeout, delete by receipt handle.
//!
//! [`memory::InMemoryQueue`] is the in-process reference implementation
//! used by tests and demos. Production adapters wrap a real queue SDK
//! and implement the same trait.

pub mod memory;

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;

pub use memory::InMemoryQueue;

/// Errors reported by a queue transport.
#[derive(Debug, Error)]
pub enum TransportError {
    /// I/O error in the underlying client.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Queue service rejected or failed the request.
    #[error("Queue unavailable: {0}")]
    Unavailable(String),

    /// Receipt handle is unknown, already consumed, or expired.
    #[error("Invalid receipt handle: {0}")]
    InvalidReceipt(String),
}

/// Parameters for a single receive call.
#[derive(Debug, Clone)]
pub struct ReceiveOptions {
    /// Maximum messages to return in one batch.
    pub max_messages: u32,
    /// How long delivered messages stay hidden from other receivers
    /// before the transport makes them available again.
    pub visibility_timeout: Duration,
    /// Long-poll duration: how long the call may block waiting for
    /// messages before returning an empty batch.
    pub wait_time: Duration,
}

/// A message as delivered by the transport, before any decoding.
#[derive(Debug, Clone)]
pub struct RawMessage {
    /// Transport-assigned message identifier. Opaque and stable across
    /// redeliveries.
    pub message_id: String,
    /// Single-use deletion token for this delivery. A redelivery of the
    /// same message carries a fresh handle.
    pub receipt_handle: String,
    /// Message body text.
    pub body: String,
    /// Transport-computed SHA-256 hex digest of `body`, when the service
    /// reports one.
    pub body_digest: Option<String>,
    /// Binary message attributes.
    pub attributes: HashMap<String, Bytes>,
}

/// Acknowledgement returned by the transport for an accepted send.
#[derive(Debug, Clone)]
pub struct SendReceipt {
    /// Transport-assigned identifier of the stored message.
    pub message_id: String,
    /// SHA-256 hex digest of the body the transport accepted. Compared
    /// against the digest of the body that was handed over, this proves
    /// the message arrived intact.
    pub body_digest: String,
}

/// Adapter over a managed, at-least-once delivery queue.
///
/// Implementations must be safe to share across tasks; the bus holds a
/// single `Arc<dyn QueueTransport>` and calls it from the poll loop and
/// from `publish`/`acknowledge` callers concurrently.
#[async_trait]
pub trait QueueTransport: Send + Sync {
    /// Enqueue a message.
    async fn send_message(
        &self,
        queue: &str,
        body: &str,
        attributes: HashMap<String, Bytes>,
    ) -> Result<SendReceipt, TransportError>;

    /// Receive up to `options.max_messages` messages, long-polling for at
    /// most `options.wait_time`. An empty vec means the wait elapsed with
    /// nothing to deliver; it is not an error.
    async fn receive_batch(
        &self,
        queue: &str,
        options: &ReceiveOptions,
    ) -> Result<Vec<RawMessage>, TransportError>;

    /// Delete a message by its receipt handle, permanently removing it
    /// from the queue.
    async fn delete_message(&self, queue: &str, receipt_handle: &str)
        -> Result<(), TransportError>;
}
