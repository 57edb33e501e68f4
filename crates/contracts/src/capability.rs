//! Capability traits consumed by the dispatch core
//!
//! Discovery backends and transports are leaf adapters: the core only knows
//! these two contracts.

use bytes::Bytes;

use crate::{ConsumerEntry, DiscoveryError, TransportError};

/// Live registry of consumers per label.
///
/// An unknown label is zero entries, not an error.
#[trait_variant::make(DiscoveryBackend: Send)]
pub trait LocalDiscoveryBackend {
    /// Backend name (used for logging/metrics)
    fn name(&self) -> &str;

    /// List the consumers currently subscribed to `label`
    ///
    /// # Errors
    /// Unreachable backend or malformed registry data
    async fn list_consumers(&self, label: &str) -> Result<Vec<ConsumerEntry>, DiscoveryError>;
}

/// Sender for one wire protocol.
///
/// Implementations own their protocol-level retries and connection state.
/// Expected remote failures are returned as `TransportError`, never panics.
#[trait_variant::make(Transport: Send)]
pub trait LocalTransport {
    /// Transport name (used for logging/metrics)
    fn name(&self) -> &str;

    /// Deliver `payload` to `endpoint` at `address`
    async fn send(&self, address: &str, endpoint: &str, payload: &Bytes)
        -> Result<(), TransportError>;
}
