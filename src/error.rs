//! Error types for queue-bus.

use thiserror::Error;

use crate::transport::TransportError;

/// Main error type for all bus operations.
#[derive(Debug, Error)]
pub enum BusError {
    /// Invalid or missing configuration. Raised synchronously at
    /// construction time, never deferred to runtime.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Payload could not be encoded for transmission.
    #[error("Invalid payload: {0}")]
    InvalidPayload(String),

    /// Integrity verification failed (digest mismatch, corrupt compressed
    /// data, or undeserializable bytes).
    #[error("Integrity error: {0}")]
    Integrity(String),

    /// Error reported by the underlying queue transport.
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),
}

/// Result type alias using BusError.
pub type Result<T> = std::result::Result<T, BusError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transport_error_converts() {
        fn delete() -> std::result::Result<(), TransportError> {
            Err(TransportError::InvalidReceipt("r-1".to_string()))
        }

        fn acknowledge() -> Result<()> {
            delete()?;
            Ok(())
        }

        let err = acknowledge().unwrap_err();
        assert!(matches!(err, BusError::Transport(_)));
    }

    #[test]
    fn test_error_messages_name_the_failure() {
        let err = BusError::Integrity("content digest mismatch".to_string());
        assert!(err.to_string().contains("content digest mismatch"));

        let err = BusError::InvalidArgument("access_key_id is required".to_string());
        assert!(err.to_string().contains("access_key_id"));
    }
}
