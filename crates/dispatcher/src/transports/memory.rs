//! MemoryTransport - keeps deliveries in memory

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use contracts::{Transport, TransportError};
use serde::Serialize;
use tokio::sync::Mutex;

const KIND: &str = "memory";

/// One recorded delivery
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Delivery {
    pub address: String,
    pub endpoint: String,
    pub payload: Bytes,
}

/// Records every delivery instead of sending it.
///
/// Clones share the recorded deliveries. Addresses can be configured to
/// fail or to answer after a delay, which makes it the transport of choice
/// for dry runs and tests.
#[derive(Debug, Clone, Default)]
pub struct MemoryTransport {
    deliveries: Arc<Mutex<Vec<Delivery>>>,
    failing: Arc<HashSet<String>>,
    delays: Arc<HashMap<String, Duration>>,
}

impl MemoryTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every send to `address` fails
    pub fn with_failure(mut self, address: impl Into<String>) -> Self {
        Arc::make_mut(&mut self.failing).insert(address.into());
        self
    }

    /// Sends to `address` complete after `delay`
    pub fn with_delay(mut self, address: impl Into<String>, delay: Duration) -> Self {
        Arc::make_mut(&mut self.delays).insert(address.into(), delay);
        self
    }

    pub async fn deliveries(&self) -> Vec<Delivery> {
        self.deliveries.lock().await.clone()
    }

    /// Number of deliveries recorded for `address`
    pub async fn delivered_to(&self, address: &str) -> usize {
        self.deliveries
            .lock()
            .await
            .iter()
            .filter(|d| d.address == address)
            .count()
    }

    pub async fn clear(&self) {
        self.deliveries.lock().await.clear();
    }
}

impl Transport for MemoryTransport {
    fn name(&self) -> &str {
        KIND
    }

    async fn send(
        &self,
        address: &str,
        endpoint: &str,
        payload: &Bytes,
    ) -> Result<(), TransportError> {
        if let Some(delay) = self.delays.get(address) {
            tokio::time::sleep(*delay).await;
        }

        if self.failing.contains(address) {
            return Err(TransportError::send(KIND, address, "configured to fail"));
        }

        self.deliveries.lock().await.push(Delivery {
            address: address.to_string(),
            endpoint: endpoint.to_string(),
            payload: payload.clone(),
        });
        Ok(())
    }
}
