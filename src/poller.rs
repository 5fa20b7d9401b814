//! Self-reinvoking long-poll loop.
//!
//! One logical loop per bus instance, two states:
//!
//! ```text
//!        request_next_cycle (CAS Idle → Polling)
//!   Idle ──────────────────────────────────────► Polling
//!     ▲                                             │
//!     │   empty batch: re-arm immediately           │ receive_batch
//!     │   messages:    deliver, wait for resume     │
//!     │   error:       re-arm after fixed backoff   │
//!     └─────────────────────────────────────────────┘
//! ```
//!
//! The flag drops back to Idle the moment the receive call completes;
//! decoding, delivery, and the whole error backoff all run with the loop
//! formally idle. Losing the compare-and-swap means someone else already
//! has a receive in flight, so redundant wake-ups coalesce into nothing
//! and the instance never holds more than one receive at a time.
//!
//! After a batch is delivered the loop stays parked until the consumer
//! invokes its [`Continuation`]. That is the backpressure mechanism: the
//! consumer paces polling against its own processing speed and the
//! visibility-timeout budget of the messages it still holds.

use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};
use std::time::Duration;

use crate::codec::EnvelopeCodec;
use crate::message::InboundMessage;
use crate::transport::{QueueTransport, RawMessage, ReceiveOptions};

/// Default maximum messages per receive call.
pub const DEFAULT_MAX_MESSAGES: u32 = 10;

/// Default visibility timeout for received messages.
pub const DEFAULT_VISIBILITY_TIMEOUT: Duration = Duration::from_secs(60);

/// Default long-poll wait per receive call.
pub const DEFAULT_WAIT_TIME: Duration = Duration::from_secs(20);

/// Default delay before retrying after a receive error.
pub const DEFAULT_RETRY_BACKOFF: Duration = Duration::from_secs(10);

/// Boxed future returned by batch consumers.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Tuning for the poll loop.
#[derive(Debug, Clone)]
pub struct PollerConfig {
    /// Maximum messages to request per receive call.
    pub max_messages: u32,
    /// How long delivered messages stay hidden before the transport
    /// makes them available again.
    pub visibility_timeout: Duration,
    /// Long-poll duration per receive call.
    pub wait_time: Duration,
    /// Fixed delay before the next cycle after a receive error. No
    /// exponential growth, no retry cap: a long-lived background loop
    /// retries forever.
    pub retry_backoff: Duration,
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            max_messages: DEFAULT_MAX_MESSAGES,
            visibility_timeout: DEFAULT_VISIBILITY_TIMEOUT,
            wait_time: DEFAULT_WAIT_TIME,
            retry_backoff: DEFAULT_RETRY_BACKOFF,
        }
    }
}

/// Handle for resuming the poll loop after a delivered batch.
///
/// Consuming `self` makes a double resume unrepresentable. Dropping the
/// continuation without calling [`resume`](Self::resume) parks the loop
/// for good; there is no watchdog.
pub struct Continuation {
    poller: Arc<Poller>,
}

impl Continuation {
    /// Signal that the batch is processed and polling may continue.
    pub fn resume(self) {
        self.poller.request_next_cycle();
    }
}

/// Trait for batch consumers.
///
/// Implemented for any `async` closure taking the batch and its
/// continuation, so `subscribe` accepts closures directly.
pub trait BatchConsumer: Send + Sync + 'static {
    /// Process one delivered batch. The loop stays parked until `next`
    /// is resumed.
    fn consume(&self, batch: Vec<InboundMessage>, next: Continuation) -> BoxFuture<'static, ()>;
}

impl<F, Fut> BatchConsumer for F
where
    F: Fn(Vec<InboundMessage>, Continuation) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    fn consume(&self, batch: Vec<InboundMessage>, next: Continuation) -> BoxFuture<'static, ()> {
        Box::pin(self(batch, next))
    }
}

/// The poll loop state shared behind an `Arc`.
pub(crate) struct Poller {
    transport: Arc<dyn QueueTransport>,
    queue: String,
    config: PollerConfig,
    /// `true` while a receive call is in flight.
    polling: AtomicBool,
    /// Registered consumer. At most one per instance; last write wins.
    consumer: RwLock<Option<Arc<dyn BatchConsumer>>>,
}

impl Poller {
    pub(crate) fn new(
        transport: Arc<dyn QueueTransport>,
        queue: String,
        config: PollerConfig,
    ) -> Self {
        Self {
            transport,
            queue,
            config,
            polling: AtomicBool::new(false),
            consumer: RwLock::new(None),
        }
    }

    /// Install the consumer, replacing any previous one.
    pub(crate) fn set_consumer(&self, consumer: Arc<dyn BatchConsumer>) {
        if let Ok(mut slot) = self.consumer.write() {
            *slot = Some(consumer);
        }
    }

    /// Whether a receive call is currently in flight.
    pub(crate) fn is_polling(&self) -> bool {
        self.polling.load(Ordering::Acquire)
    }

    /// Ask for one more poll cycle.
    ///
    /// Exactly one caller wins the Idle → Polling transition; everyone
    /// else no-ops. Safe to call from anywhere at any time.
    pub(crate) fn request_next_cycle(self: Arc<Self>) {
        if self
            .polling
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return;
        }

        tokio::spawn(async move {
            self.run_cycle().await;
        });
    }

    /// One receive cycle: poll, then decide how the loop continues.
    async fn run_cycle(self: Arc<Self>) {
        let options = ReceiveOptions {
            max_messages: self.config.max_messages,
            visibility_timeout: self.config.visibility_timeout,
            wait_time: self.config.wait_time,
        };

        let outcome = self.transport.receive_batch(&self.queue, &options).await;

        // The receive is over either way. From here on the loop is
        // formally idle, including for the whole error backoff.
        self.polling.store(false, Ordering::Release);

        match outcome {
            Ok(batch) if batch.is_empty() => {
                // Long-poll wait elapsed with nothing to deliver; go
                // straight back to waiting.
                self.request_next_cycle();
            }
            Ok(batch) => {
                let messages = self.decode_batch(batch);
                if messages.is_empty() {
                    // Every message was corrupt; nothing to hand over.
                    self.request_next_cycle();
                    return;
                }

                let consumer = self.consumer.read().ok().and_then(|slot| (*slot).clone());
                match consumer {
                    Some(consumer) => {
                        let next = Continuation {
                            poller: Arc::clone(&self),
                        };
                        consumer.consume(messages, next).await;
                    }
                    None => {
                        tracing::debug!("No consumer registered, polled batch goes undelivered");
                    }
                }
            }
            Err(e) => {
                tracing::warn!(
                    "Receive on {} failed: {}; retrying in {:?}",
                    self.queue,
                    e,
                    self.config.retry_backoff
                );

                tokio::spawn(async move {
                    tokio::time::sleep(self.config.retry_backoff).await;
                    self.request_next_cycle();
                });
            }
        }
    }

    /// Decode a raw batch, dropping messages that fail verification.
    ///
    /// Dropped messages are not acknowledged, so the transport redelivers
    /// them after the visibility timeout. One corrupt message never
    /// aborts its batch.
    fn decode_batch(&self, batch: Vec<RawMessage>) -> Vec<InboundMessage> {
        let mut messages = Vec::with_capacity(batch.len());

        for raw in batch {
            match EnvelopeCodec::decode_raw(&raw) {
                Ok(body) => {
                    messages.push(InboundMessage::new(raw.message_id, raw.receipt_handle, body));
                }
                Err(e) => {
                    tracing::warn!("Dropping message {}: {}", raw.message_id, e);
                }
            }
        }

        messages
    }
}
