//! Wire container for payloads in flight.

use std::collections::HashMap;

use bytes::Bytes;

use super::digest_hex;
use crate::error::{BusError, Result};
use crate::transport::RawMessage;

/// Name of the binary message attribute carrying the compressed payload.
///
/// The transport body text carries only the content digest; the payload
/// itself rides out-of-band in this attribute.
pub const PAYLOAD_ATTRIBUTE: &str = "payload";

/// The unit that travels through the queue: a compressed payload plus
/// the digest that proves what it decompresses to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
    /// Compressed serialized payload.
    payload: Bytes,
    /// SHA-256 hex digest of the uncompressed serialized payload.
    /// Doubles as the payload's idempotent identifier.
    content_digest: String,
    /// Transport-assigned message id. `None` until the transport has
    /// seen this envelope.
    message_id: Option<String>,
}

impl Envelope {
    pub(crate) fn new(payload: Bytes, content_digest: String) -> Self {
        Self {
            payload,
            content_digest,
            message_id: None,
        }
    }

    /// Reconstruct an envelope from a transport-delivered message.
    ///
    /// Validates the wire framing: the compressed payload attribute must
    /// be present, and when the transport reports a digest of the body it
    /// must match the body that actually arrived.
    ///
    /// # Errors
    ///
    /// Returns `Integrity` on a missing payload attribute or a transport
    /// body digest mismatch.
    pub fn from_raw(raw: &RawMessage) -> Result<Self> {
        if let Some(reported) = &raw.body_digest {
            let computed = digest_hex(raw.body.as_bytes());
            if *reported != computed {
                return Err(BusError::Integrity(format!(
                    "transport body digest mismatch for message {}",
                    raw.message_id
                )));
            }
        }

        let payload = raw
            .attributes
            .get(PAYLOAD_ATTRIBUTE)
            .cloned()
            .ok_or_else(|| {
                BusError::Integrity(format!(
                    "message {} has no {} attribute",
                    raw.message_id, PAYLOAD_ATTRIBUTE
                ))
            })?;

        Ok(Self {
            payload,
            content_digest: raw.body.clone(),
            message_id: Some(raw.message_id.clone()),
        })
    }

    /// Compressed payload bytes.
    #[inline]
    pub fn payload(&self) -> &Bytes {
        &self.payload
    }

    /// Content digest of the uncompressed serialized payload.
    #[inline]
    pub fn content_digest(&self) -> &str {
        &self.content_digest
    }

    /// Transport-assigned message id, if the transport has seen this
    /// envelope.
    #[inline]
    pub fn message_id(&self) -> Option<&str> {
        self.message_id.as_deref()
    }

    /// Message attributes for transmission: the compressed payload under
    /// [`PAYLOAD_ATTRIBUTE`].
    pub fn wire_attributes(&self) -> HashMap<String, Bytes> {
        let mut attributes = HashMap::with_capacity(1);
        attributes.insert(PAYLOAD_ATTRIBUTE.to_string(), self.payload.clone());
        attributes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(
        body: &str,
        body_digest: Option<String>,
        attributes: HashMap<String, Bytes>,
    ) -> RawMessage {
        RawMessage {
            message_id: "m-9".to_string(),
            receipt_handle: "r-9".to_string(),
            body: body.to_string(),
            body_digest,
            attributes,
        }
    }

    fn payload_attributes() -> HashMap<String, Bytes> {
        let mut attributes = HashMap::new();
        attributes.insert(PAYLOAD_ATTRIBUTE.to_string(), Bytes::from_static(b"\x28\xB5\x2F\xFD"));
        attributes
    }

    #[test]
    fn test_from_raw_adopts_wire_fields() {
        let envelope = Envelope::from_raw(&raw("digest-hex", None, payload_attributes())).unwrap();

        assert_eq!(envelope.content_digest(), "digest-hex");
        assert_eq!(envelope.message_id(), Some("m-9"));
        assert_eq!(envelope.payload().as_ref(), b"\x28\xB5\x2F\xFD");
    }

    #[test]
    fn test_from_raw_verifies_transport_body_digest() {
        let ok = raw("body", Some(digest_hex(b"body")), payload_attributes());
        assert!(Envelope::from_raw(&ok).is_ok());

        let tampered = raw("body", Some(digest_hex(b"other body")), payload_attributes());
        assert!(matches!(
            Envelope::from_raw(&tampered),
            Err(BusError::Integrity(_))
        ));
    }

    #[test]
    fn test_from_raw_requires_payload_attribute() {
        let result = Envelope::from_raw(&raw("body", None, HashMap::new()));
        assert!(matches!(result, Err(BusError::Integrity(_))));
    }

    #[test]
    fn test_encoded_envelope_has_no_message_id() {
        let envelope = Envelope::new(Bytes::from_static(b"zz"), "d".to_string());
        assert_eq!(envelope.message_id(), None);
    }

    #[test]
    fn test_wire_attributes_carry_the_payload() {
        let envelope = Envelope::new(Bytes::from_static(b"zz"), "d".to_string());
        let attributes = envelope.wire_attributes();
        assert_eq!(attributes.len(), 1);
        assert_eq!(attributes.get(PAYLOAD_ATTRIBUTE).map(|b| b.as_ref()), Some(&b"zz"[..]));
    }
}
