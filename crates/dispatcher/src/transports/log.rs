//! LogTransport - logs deliveries via tracing

use bytes::Bytes;
use contracts::{Transport, TransportError};
use tracing::{info, instrument};

/// Transport that only logs a summary of each delivery
pub struct LogTransport {
    name: String,
}

impl LogTransport {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    fn log_delivery(&self, address: &str, endpoint: &str, payload: &Bytes) {
        let preview = String::from_utf8_lossy(&payload[..payload.len().min(64)]);
        info!(
            transport = %self.name,
            address,
            endpoint,
            bytes = payload.len(),
            preview = %preview,
            "Message delivered"
        );
    }
}

impl Transport for LogTransport {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(
        name = "log_transport_send",
        skip(self, payload),
        fields(transport = %self.name)
    )]
    async fn send(
        &self,
        address: &str,
        endpoint: &str,
        payload: &Bytes,
    ) -> Result<(), TransportError> {
        self.log_delivery(address, endpoint, payload);
        Ok(())
    }
}
