//! In-memory queue transport.
//!
//! Reference implementation of [`QueueTransport`] with real at-least-once
//! semantics: delivered messages are hidden for the visibility timeout
//! and become deliverable again, under a fresh receipt handle, if they
//! are not deleted in time. Backs the test suite and the loopback demo;
//! production deployments substitute an adapter over a real queue SDK.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use bytes::Bytes;

use super::{QueueTransport, RawMessage, ReceiveOptions, SendReceipt, TransportError};
use crate::codec::digest_hex;

/// Interval between visibility re-checks while long-polling.
const POLL_INTERVAL: Duration = Duration::from_millis(5);

#[derive(Debug)]
struct StoredMessage {
    message_id: String,
    body: String,
    body_digest: String,
    attributes: HashMap<String, Bytes>,
    /// When this message next becomes deliverable. In the past for
    /// visible messages, in the future while a delivery is in flight.
    visible_at: Instant,
    /// Receipt handle of the outstanding delivery, if any. Replaced on
    /// every delivery, so stale handles stop matching.
    receipt_handle: Option<String>,
}

#[derive(Debug, Default)]
struct State {
    queues: HashMap<String, Vec<StoredMessage>>,
    next_message_id: u64,
    next_receipt: u64,
}

/// In-process queue service shared by everything that clones it.
///
/// Queues are created on first send; receiving from an unknown queue
/// yields empty batches.
#[derive(Debug, Clone, Default)]
pub struct InMemoryQueue {
    state: Arc<Mutex<State>>,
    /// Remaining receive calls to fail, for error-path tests.
    injected_failures: Arc<AtomicUsize>,
}

impl InMemoryQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next `count` receive calls fail with `Unavailable`.
    pub fn fail_receives(&self, count: usize) {
        self.injected_failures.store(count, Ordering::SeqCst);
    }

    /// Number of messages a queue still holds, visible or in flight.
    pub fn depth(&self, queue: &str) -> usize {
        self.state
            .lock()
            .map(|state| state.queues.get(queue).map_or(0, Vec::len))
            .unwrap_or(0)
    }

    fn lock(&self) -> Result<MutexGuard<'_, State>, TransportError> {
        self.state
            .lock()
            .map_err(|_| TransportError::Unavailable("queue state poisoned".to_string()))
    }

    /// Deliver every currently-visible message, up to the batch limit,
    /// hiding each one for the visibility timeout.
    fn take_visible(
        &self,
        queue: &str,
        options: &ReceiveOptions,
    ) -> Result<Vec<RawMessage>, TransportError> {
        let mut state = self.lock()?;
        let State {
            queues,
            next_receipt,
            ..
        } = &mut *state;

        let messages = match queues.get_mut(queue) {
            Some(messages) => messages,
            None => return Ok(Vec::new()),
        };

        let now = Instant::now();
        let mut batch = Vec::new();

        for message in messages.iter_mut() {
            if batch.len() as u32 >= options.max_messages {
                break;
            }
            if message.visible_at > now {
                continue;
            }

            *next_receipt += 1;
            let handle = format!("r-{}", next_receipt);
            message.receipt_handle = Some(handle.clone());
            message.visible_at = now + options.visibility_timeout;

            batch.push(RawMessage {
                message_id: message.message_id.clone(),
                receipt_handle: handle,
                body: message.body.clone(),
                body_digest: Some(message.body_digest.clone()),
                attributes: message.attributes.clone(),
            });
        }

        Ok(batch)
    }
}

#[async_trait::async_trait]
impl QueueTransport for InMemoryQueue {
    async fn send_message(
        &self,
        queue: &str,
        body: &str,
        attributes: HashMap<String, Bytes>,
    ) -> Result<SendReceipt, TransportError> {
        let mut state = self.lock()?;
        state.next_message_id += 1;
        let message_id = format!("m-{}", state.next_message_id);
        let body_digest = digest_hex(body.as_bytes());

        state
            .queues
            .entry(queue.to_string())
            .or_default()
            .push(StoredMessage {
                message_id: message_id.clone(),
                body: body.to_string(),
                body_digest: body_digest.clone(),
                attributes,
                visible_at: Instant::now(),
                receipt_handle: None,
            });

        Ok(SendReceipt {
            message_id,
            body_digest,
        })
    }

    async fn receive_batch(
        &self,
        queue: &str,
        options: &ReceiveOptions,
    ) -> Result<Vec<RawMessage>, TransportError> {
        let inject = self
            .injected_failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if inject {
            return Err(TransportError::Unavailable(
                "injected receive failure".to_string(),
            ));
        }

        let deadline = Instant::now() + options.wait_time;
        loop {
            let batch = self.take_visible(queue, options)?;
            if !batch.is_empty() {
                return Ok(batch);
            }
            if Instant::now() >= deadline {
                return Ok(Vec::new());
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }

    async fn delete_message(
        &self,
        queue: &str,
        receipt_handle: &str,
    ) -> Result<(), TransportError> {
        let mut state = self.lock()?;
        let messages = match state.queues.get_mut(queue) {
            Some(messages) => messages,
            None => return Err(TransportError::InvalidReceipt(receipt_handle.to_string())),
        };

        // A handle only matches while its delivery is still in flight;
        // once visibility lapses the handle is dead even though the
        // message survives.
        let now = Instant::now();
        let position = messages.iter().position(|message| {
            message.receipt_handle.as_deref() == Some(receipt_handle) && message.visible_at > now
        });

        match position {
            Some(index) => {
                messages.remove(index);
                Ok(())
            }
            None => Err(TransportError::InvalidReceipt(receipt_handle.to_string())),
        }
    }
}
