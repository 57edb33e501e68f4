//! # Discovery
//!
//! Discovery Directory module.
//!
//! Responsibilities:
//! - Resolve a label to the consumer records subscribed to it
//! - Cache resolutions with a TTL, refreshing lazily on the next lookup
//! - Serve an expired entry for a bounded grace window when the backend fails
//! - Collapse concurrent refreshes of one label into a single backend query
//!
//! Backends (static, file, env) implement [`contracts::DiscoveryBackend`].

mod backends;
mod cache;
mod directory;
mod erased;

pub use backends::{
    create_backend, services_to_entries, EnvDiscovery, FileDiscovery, ServiceRegistry,
    StaticDiscovery, DEFAULT_SERVICES_VAR,
};
pub use cache::CacheEntry;
pub use directory::{DirectoryConfig, DiscoveryDirectory, Resolution, ResolutionSource};
pub use erased::{BoxFuture, DynDiscoveryBackend};
