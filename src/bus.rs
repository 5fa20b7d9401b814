//! Bus facade: publish, subscribe, acknowledge.
//!
//! [`ServiceBus`] ties the pieces together: configuration is validated
//! once at construction, payloads go out through the codec and the
//! transport, and inbound messages arrive through the poll loop. The
//! instance is point-to-point — one queue it publishes to, one queue it
//! consumes from, at most one consumer.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use queue_bus::{BusConfig, InMemoryQueue, ServiceBus};
//! use serde_json::json;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let transport = Arc::new(InMemoryQueue::new());
//!     let bus = ServiceBus::new(config(), transport)?;
//!
//!     bus.subscribe(|batch, next| async move {
//!         for message in &batch {
//!             println!("got {}", message.body());
//!         }
//!         next.resume();
//!     });
//!
//!     bus.publish(&json!({"name": "Peter", "phone": 1234})).await?;
//!     Ok(())
//! }
//! ```

use std::future::Future;
use std::sync::Arc;

use serde::Serialize;

use crate::codec::{digest_hex, EnvelopeCodec};
use crate::config::BusConfig;
use crate::error::{BusError, Result};
use crate::message::InboundMessage;
use crate::poller::{Continuation, Poller, PollerConfig};
use crate::transport::QueueTransport;

/// Point-to-point message bus over a managed queue.
pub struct ServiceBus {
    config: BusConfig,
    transport: Arc<dyn QueueTransport>,
    poller: Arc<Poller>,
}

impl ServiceBus {
    /// Create a bus with default poll tuning.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` if any configuration field is missing.
    /// Misconfiguration fails here, never later at runtime.
    pub fn new(config: BusConfig, transport: Arc<dyn QueueTransport>) -> Result<Self> {
        Self::with_poller_config(config, PollerConfig::default(), transport)
    }

    /// Create a bus with explicit poll tuning.
    pub fn with_poller_config(
        config: BusConfig,
        poller_config: PollerConfig,
        transport: Arc<dyn QueueTransport>,
    ) -> Result<Self> {
        config.validate()?;

        let poller = Arc::new(Poller::new(
            transport.clone(),
            config.subscribe_queue.clone(),
            poller_config,
        ));

        Ok(Self {
            config,
            transport,
            poller,
        })
    }

    /// Publish a payload to the publish queue.
    ///
    /// The payload is serialized, digested, and compressed into an
    /// envelope; the transport's acknowledgement is then verified
    /// against the digest of the body that was handed over, so a
    /// mangled-in-transit message fails loudly instead of poisoning the
    /// queue. Returns the transport-assigned message id.
    ///
    /// # Errors
    ///
    /// `InvalidPayload` if the payload cannot be encoded, `Transport`
    /// if the send fails (retrying is the caller's call), `Integrity`
    /// if the transport's digest does not match what was sent.
    pub async fn publish<T: Serialize>(&self, payload: &T) -> Result<String> {
        let envelope = EnvelopeCodec::encode(payload)?;

        let receipt = self
            .transport
            .send_message(
                &self.config.publish_queue,
                envelope.content_digest(),
                envelope.wire_attributes(),
            )
            .await?;

        let expected = digest_hex(envelope.content_digest().as_bytes());
        if receipt.body_digest != expected {
            return Err(BusError::Integrity(format!(
                "transport accepted message {} with body digest {}, expected {}",
                receipt.message_id, receipt.body_digest, expected
            )));
        }

        Ok(receipt.message_id)
    }

    /// Register the consumer and start the poll loop.
    ///
    /// At most one consumer per instance; calling again replaces the
    /// previous one. The consumer receives each delivered batch together
    /// with a [`Continuation`] and must eventually resume it exactly
    /// once — polling stays parked until it does. Must be called within
    /// a Tokio runtime.
    pub fn subscribe<F, Fut>(&self, consumer: F)
    where
        F: Fn(Vec<InboundMessage>, Continuation) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.poller.set_consumer(Arc::new(consumer));
        self.poller.clone().request_next_cycle();
    }

    /// Acknowledge a processed message, deleting it from the subscribe
    /// queue so it is never redelivered.
    ///
    /// The poll loop never acknowledges on its own: a consumer that
    /// skips this sees the message again after the visibility timeout.
    ///
    /// # Errors
    ///
    /// `Transport` if the receipt handle is invalid, already consumed,
    /// or expired.
    pub async fn acknowledge(&self, message: &InboundMessage) -> Result<()> {
        self.transport
            .delete_message(&self.config.subscribe_queue, message.receipt_handle())
            .await?;
        Ok(())
    }

    /// Content digest a payload would carry on the wire.
    ///
    /// The digest doubles as the payload's idempotent identifier, so
    /// callers can compute it ahead of publishing for deduplication
    /// bookkeeping.
    pub fn content_digest_of<T: Serialize>(payload: &T) -> Result<String> {
        let serialized = serde_json::to_vec(payload)
            .map_err(|e| BusError::InvalidPayload(format!("serialization failed: {}", e)))?;
        Ok(digest_hex(&serialized))
    }

    /// The validated configuration this bus runs with.
    pub fn config(&self) -> &BusConfig {
        &self.config
    }

    /// Whether a receive call is currently in flight.
    pub fn is_polling(&self) -> bool {
        self.poller.is_polling()
    }
}
