//! Messages surfaced to the subscriber.

use serde::de::DeserializeOwned;

use crate::error::{BusError, Result};

/// A delivered, decoded, integrity-verified message.
///
/// Carries everything the consumer needs: the decoded body, and the
/// receipt handle for acknowledging once processing is done. A message
/// that is never acknowledged reappears after the transport's visibility
/// timeout.
#[derive(Debug, Clone)]
pub struct InboundMessage {
    message_id: String,
    receipt_handle: String,
    body: serde_json::Value,
}

impl InboundMessage {
    pub(crate) fn new(message_id: String, receipt_handle: String, body: serde_json::Value) -> Self {
        Self {
            message_id,
            receipt_handle,
            body,
        }
    }

    /// Transport-assigned message identifier. Stable across redeliveries,
    /// useful as a log key and for idempotency bookkeeping.
    #[inline]
    pub fn message_id(&self) -> &str {
        &self.message_id
    }

    /// Single-use deletion token for this delivery.
    #[inline]
    pub fn receipt_handle(&self) -> &str {
        &self.receipt_handle
    }

    /// Decoded payload.
    #[inline]
    pub fn body(&self) -> &serde_json::Value {
        &self.body
    }

    /// Deserialize the body into a concrete type.
    ///
    /// # Errors
    ///
    /// Returns `InvalidPayload` if the body does not match `T`.
    pub fn body_as<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_value(self.body.clone()).map_err(|e| {
            BusError::InvalidPayload(format!("body does not match requested type: {}", e))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Deserialize, PartialEq, Debug)]
    struct Contact {
        name: String,
        phone: u32,
    }

    fn message() -> InboundMessage {
        InboundMessage::new(
            "m-1".to_string(),
            "r-1".to_string(),
            json!({"name": "Peter", "phone": 1234}),
        )
    }

    #[test]
    fn test_accessors() {
        let msg = message();
        assert_eq!(msg.message_id(), "m-1");
        assert_eq!(msg.receipt_handle(), "r-1");
        assert_eq!(msg.body()["name"], "Peter");
    }

    #[test]
    fn test_body_as_typed() {
        let contact: Contact = message().body_as().unwrap();
        assert_eq!(
            contact,
            Contact {
                name: "Peter".to_string(),
                phone: 1234
            }
        );
    }

    #[test]
    fn test_body_as_wrong_type_fails() {
        let result: Result<Vec<String>> = message().body_as();
        assert!(matches!(result, Err(BusError::InvalidPayload(_))));
    }
}
