//! Codec module - payload framing for queue transmission.
//!
//! Publishing runs serialize → digest → compress; receiving runs the
//! inverse with verification at each step:
//!
//! ```text
//! publish:  payload ──serde_json──► bytes ──SHA-256──► digest
//!                                   bytes ──zstd────► Envelope
//! receive:  Envelope ──zstd⁻¹──► bytes ──SHA-256──► digest check
//!                                bytes ──serde_json⁻¹──► payload
//! ```
//!
//! The content digest is computed over the *uncompressed* serialized
//! bytes. That keeps the integrity guarantee independent of the
//! compression algorithm and gives every payload a stable idempotent
//! identifier regardless of how it was packed in transit.
//!
//! The codec is a marker struct with static methods rather than a trait
//! object: there is exactly one wire format, selected at compile time.
//!
//! # Example
//!
//! ```
//! use queue_bus::codec::EnvelopeCodec;
//! use serde_json::json;
//!
//! let payload = json!({"name": "Peter", "phone": 1234});
//! let envelope = EnvelopeCodec::encode(&payload).unwrap();
//! let decoded = EnvelopeCodec::decode(&envelope).unwrap();
//! assert_eq!(decoded, payload);
//! ```

mod envelope;

pub use envelope::{Envelope, PAYLOAD_ATTRIBUTE};

use bytes::Bytes;
use sha2::{Digest, Sha256};

use crate::error::{BusError, Result};
use crate::transport::RawMessage;

/// zstd compression level for outbound payloads.
const COMPRESSION_LEVEL: i32 = 3;

/// SHA-256 digest of `bytes`, lowercase hex.
///
/// Used for the payload content digest and for the transport body digest
/// in [`SendReceipt`](crate::transport::SendReceipt).
pub fn digest_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

/// Codec turning payloads into wire envelopes and back.
pub struct EnvelopeCodec;

impl EnvelopeCodec {
    /// Encode a payload into an [`Envelope`].
    ///
    /// Serializes with JSON, digests the serialized bytes, then
    /// compresses them. Pure computation, no transport side effects.
    ///
    /// # Errors
    ///
    /// Returns `InvalidPayload` if the value cannot be serialized or
    /// compressed.
    pub fn encode<T: serde::Serialize>(payload: &T) -> Result<Envelope> {
        let serialized = serde_json::to_vec(payload)
            .map_err(|e| BusError::InvalidPayload(format!("serialization failed: {}", e)))?;

        let content_digest = digest_hex(&serialized);

        let compressed = zstd::encode_all(serialized.as_slice(), COMPRESSION_LEVEL)
            .map_err(|e| BusError::InvalidPayload(format!("compression failed: {}", e)))?;

        Ok(Envelope::new(Bytes::from(compressed), content_digest))
    }

    /// Decode an [`Envelope`] back into its payload.
    ///
    /// Decompresses, recomputes the digest over the decompressed bytes
    /// and compares it to the envelope's digest, then deserializes.
    ///
    /// # Errors
    ///
    /// Returns `Integrity` if decompression fails, the digest does not
    /// match, or the bytes do not deserialize. Any of these means the
    /// payload is not what the publisher sent.
    pub fn decode(envelope: &Envelope) -> Result<serde_json::Value> {
        let decompressed = zstd::decode_all(envelope.payload().as_ref())
            .map_err(|e| BusError::Integrity(format!("payload failed to decompress: {}", e)))?;

        let computed = digest_hex(&decompressed);
        if computed != envelope.content_digest() {
            return Err(BusError::Integrity(format!(
                "content digest mismatch: envelope carries {}, payload hashes to {}",
                envelope.content_digest(),
                computed
            )));
        }

        serde_json::from_slice(&decompressed)
            .map_err(|e| BusError::Integrity(format!("payload failed to deserialize: {}", e)))
    }

    /// Decode a transport-delivered message in one step: validate the
    /// wire framing, then decode the envelope.
    #[inline]
    pub fn decode_raw(raw: &RawMessage) -> Result<serde_json::Value> {
        Self::decode(&Envelope::from_raw(raw)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::{Deserialize, Serialize};
    use serde_json::json;
    use std::collections::HashMap;

    #[derive(Serialize, Deserialize, PartialEq, Debug)]
    struct Contact {
        name: String,
        phone: u32,
    }

    #[test]
    fn test_encode_decode_struct() {
        let original = Contact {
            name: "Peter".to_string(),
            phone: 1234,
        };

        let envelope = EnvelopeCodec::encode(&original).unwrap();
        let decoded = EnvelopeCodec::decode(&envelope).unwrap();

        assert_eq!(decoded, json!({"name": "Peter", "phone": 1234}));
        let roundtripped: Contact = serde_json::from_value(decoded).unwrap();
        assert_eq!(roundtripped, original);
    }

    #[test]
    fn test_encode_decode_value() {
        let payload = json!({
            "items": [1, 2, 3],
            "nested": {"flag": true, "note": null}
        });

        let envelope = EnvelopeCodec::encode(&payload).unwrap();
        assert_eq!(EnvelopeCodec::decode(&envelope).unwrap(), payload);
    }

    #[test]
    fn test_digest_is_of_uncompressed_bytes() {
        let payload = json!({"name": "Peter"});
        let envelope = EnvelopeCodec::encode(&payload).unwrap();

        let serialized = serde_json::to_vec(&payload).unwrap();
        assert_eq!(envelope.content_digest(), digest_hex(&serialized));
        // The digest must NOT be over the compressed bytes.
        assert_ne!(envelope.content_digest(), digest_hex(envelope.payload()));
    }

    #[test]
    fn test_payload_is_zstd_compressed() {
        let envelope = EnvelopeCodec::encode(&json!({"name": "Peter"})).unwrap();

        // zstd frame magic: 28 B5 2F FD
        assert_eq!(&envelope.payload()[..4], &[0x28, 0xB5, 0x2F, 0xFD]);
    }

    #[test]
    fn test_same_payload_same_digest() {
        let a = EnvelopeCodec::encode(&json!({"id": 7})).unwrap();
        let b = EnvelopeCodec::encode(&json!({"id": 7})).unwrap();
        assert_eq!(a.content_digest(), b.content_digest());
    }

    #[test]
    fn test_bit_flip_anywhere_in_payload_fails_decode() {
        let envelope = EnvelopeCodec::encode(&json!({"name": "Peter", "phone": 1234})).unwrap();

        for index in 0..envelope.payload().len() {
            let mut tampered = envelope.payload().to_vec();
            tampered[index] ^= 1 << (index % 8);

            let corrupt =
                Envelope::new(Bytes::from(tampered), envelope.content_digest().to_string());
            let result = EnvelopeCodec::decode(&corrupt);
            assert!(
                matches!(result, Err(BusError::Integrity(_))),
                "flip at byte {} was not caught",
                index
            );
        }
    }

    #[test]
    fn test_digest_tamper_fails_decode() {
        let envelope = EnvelopeCodec::encode(&json!({"name": "Peter"})).unwrap();

        let wrong = digest_hex(b"something else entirely");
        let tampered = Envelope::new(envelope.payload().clone(), wrong);

        let result = EnvelopeCodec::decode(&tampered);
        assert!(matches!(result, Err(BusError::Integrity(_))));
    }

    #[test]
    fn test_non_serializable_payload_is_invalid() {
        let result = EnvelopeCodec::encode(&f64::NAN);
        assert!(matches!(result, Err(BusError::InvalidPayload(_))));
    }

    #[test]
    fn test_decode_raw_roundtrip() {
        let payload = json!({"name": "Peter", "phone": 1234});
        let envelope = EnvelopeCodec::encode(&payload).unwrap();

        let body = envelope.content_digest().to_string();
        let raw = RawMessage {
            message_id: "m-1".to_string(),
            receipt_handle: "r-1".to_string(),
            body_digest: Some(digest_hex(body.as_bytes())),
            body,
            attributes: envelope.wire_attributes(),
        };

        assert_eq!(EnvelopeCodec::decode_raw(&raw).unwrap(), payload);
    }

    #[test]
    fn test_digest_hex_known_value() {
        // SHA-256 of the empty input.
        assert_eq!(
            digest_hex(b""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn test_decode_raw_rejects_missing_attribute() {
        let raw = RawMessage {
            message_id: "m-1".to_string(),
            receipt_handle: "r-1".to_string(),
            body: "abc".to_string(),
            body_digest: None,
            attributes: HashMap::new(),
        };

        assert!(matches!(
            EnvelopeCodec::decode_raw(&raw),
            Err(BusError::Integrity(_))
        ));
    }
}
