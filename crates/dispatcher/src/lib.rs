//! # Dispatcher
//!
//! Label-routed fan-out.
//!
//! Responsibilities:
//! - Resolve a label through the Discovery Directory
//! - Fan out one message to every consumer concurrently, each send bounded
//!   by a timeout
//! - Evaluate ANY / ALL fan-out groups into a single outcome
//!
//! Transports are looked up by kind in a [`TransportRegistry`].

pub mod blocking;
pub mod dispatcher;
pub mod error;
pub mod metrics;
pub mod notifier;
mod plan;
pub mod registry;
pub mod transports;

pub use blocking::BlockingDispatcher;
pub use contracts::{DispatchResult, Message, Transport};
pub use dispatcher::{Dispatcher, DispatcherBuilder, DispatcherSettings};
pub use error::DispatchError;
pub use metrics::{MetricsSnapshot, TransportMetrics};
pub use notifier::BoundNotifier;
pub use registry::{DynTransport, TransportHandle, TransportRegistry};
pub use transports::{
    Delivery, FileTransport, LogTransport, MemoryTransport, StdoutTransport, UdpTransport,
    UdpTransportConfig,
};
