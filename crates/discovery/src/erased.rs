//! Object-safe view of [`DiscoveryBackend`]
//!
//! `async fn` traits cannot be boxed, so the directory stores backends
//! behind this adapter.

use std::future::Future;
use std::pin::Pin;

use contracts::{ConsumerEntry, DiscoveryBackend, DiscoveryError};

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Dyn-compatible discovery backend
pub trait DynDiscoveryBackend: Send + Sync {
    fn name(&self) -> &str;

    fn list_consumers_boxed<'a>(
        &'a self,
        label: &'a str,
    ) -> BoxFuture<'a, Result<Vec<ConsumerEntry>, DiscoveryError>>;
}

impl<T> DynDiscoveryBackend for T
where
    T: DiscoveryBackend + Sync,
{
    fn name(&self) -> &str {
        DiscoveryBackend::name(self)
    }

    fn list_consumers_boxed<'a>(
        &'a self,
        label: &'a str,
    ) -> BoxFuture<'a, Result<Vec<ConsumerEntry>, DiscoveryError>> {
        Box::pin(self.list_consumers(label))
    }
}
