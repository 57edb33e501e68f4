//! BlockingDispatcher - synchronous facade over the async core

use bytes::Bytes;
use contracts::{DispatchResult, Label, RelayConfig};
use tokio::runtime::{Builder, Runtime};

use crate::dispatcher::Dispatcher;
use crate::error::DispatchError;

/// Owns a multi-thread runtime and blocks the caller until a `notify`
/// completes. Same semantics as [`Dispatcher::notify`].
///
/// Must not be used from inside another tokio runtime.
pub struct BlockingDispatcher {
    runtime: Runtime,
    inner: Dispatcher,
}

impl BlockingDispatcher {
    pub fn new(inner: Dispatcher) -> Result<Self, DispatchError> {
        let runtime = Builder::new_multi_thread()
            .thread_name("relay-dispatch")
            .enable_all()
            .build()?;
        Ok(Self { runtime, inner })
    }

    pub fn from_config(config: &RelayConfig) -> Result<Self, DispatchError> {
        Self::new(Dispatcher::from_config(config)?)
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.inner
    }

    pub fn notify(
        &self,
        label: impl Into<Label>,
        payload: impl Into<Bytes>,
        endpoint: Option<&str>,
    ) -> Result<DispatchResult, DispatchError> {
        self.runtime
            .block_on(self.inner.notify(label, payload, endpoint))
    }
}

impl std::fmt::Debug for BlockingDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BlockingDispatcher")
            .field("inner", &self.inner)
            .finish()
    }
}
