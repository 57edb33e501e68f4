//! # Contracts
//!
//! Frozen interface contracts shared by every relay crate: data model,
//! capability traits and error taxonomy.
//! Business crates depend only on this crate, never on each other's internals.
//!
//! ## Data flow
//! producer → `Message` → discovery → `ConsumerRecord`s → transports →
//! `DeliveryOutcome`s → `DispatchResult`

mod capability;
mod config;
mod consumer;
mod error;
mod label;
mod message;
mod outcome;

pub use capability::{DiscoveryBackend, LocalDiscoveryBackend, LocalTransport, Transport};
pub use config::*;
pub use consumer::*;
pub use error::*;
pub use label::Label;
pub use message::*;
pub use outcome::*;
