//! Bus configuration.

use crate::error::{BusError, Result};

/// Static configuration for a single bus instance.
///
/// Every field is required and must be non-empty. Validation happens when
/// the bus is constructed, never later: a misconfigured instance fails
/// fast instead of limping into runtime with broken behavior.
///
/// The credential fields are not interpreted by the bus itself. They are
/// carried here so the caller can build a real transport adapter from the
/// same configuration the bus validates.
#[derive(Debug, Clone)]
pub struct BusConfig {
    /// Access key identifier for the managed queue service.
    pub access_key_id: String,
    /// Secret access key for the managed queue service.
    pub secret_access_key: String,
    /// Service region the queues live in.
    pub region: String,
    /// Identity of the queue this instance publishes to.
    pub publish_queue: String,
    /// Identity of the queue this instance consumes from.
    pub subscribe_queue: String,
}

impl BusConfig {
    /// Check that every field is present and non-empty.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` naming the first missing field.
    pub fn validate(&self) -> Result<()> {
        let fields = [
            ("access_key_id", &self.access_key_id),
            ("secret_access_key", &self.secret_access_key),
            ("region", &self.region),
            ("publish_queue", &self.publish_queue),
            ("subscribe_queue", &self.subscribe_queue),
        ];

        for (name, value) in fields {
            if value.trim().is_empty() {
                return Err(BusError::InvalidArgument(format!("{} is required", name)));
            }
        }

        Ok(())
    }
}
