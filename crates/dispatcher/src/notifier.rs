//! BoundNotifier - a dispatcher fixed to one label

use bytes::Bytes;
use contracts::{DispatchResult, Label};

use crate::dispatcher::Dispatcher;
use crate::error::DispatchError;

/// Producer handle for a single label.
///
/// Cheap to clone; shares the dispatcher's cache and transports.
#[derive(Debug, Clone)]
pub struct BoundNotifier {
    dispatcher: Dispatcher,
    label: Label,
    endpoint: Option<String>,
}

impl BoundNotifier {
    pub(crate) fn new(dispatcher: Dispatcher, label: Label) -> Self {
        Self {
            dispatcher,
            label,
            endpoint: None,
        }
    }

    /// Use `endpoint` instead of the dispatcher default for `notify`
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    pub fn label(&self) -> &Label {
        &self.label
    }

    pub fn endpoint(&self) -> Option<&str> {
        self.endpoint.as_deref()
    }

    pub async fn notify(&self, payload: impl Into<Bytes>) -> Result<DispatchResult, DispatchError> {
        self.dispatcher
            .notify(self.label.clone(), payload, self.endpoint.as_deref())
            .await
    }

    /// Send to an explicit endpoint for this call only
    pub async fn notify_to(
        &self,
        payload: impl Into<Bytes>,
        endpoint: &str,
    ) -> Result<DispatchResult, DispatchError> {
        self.dispatcher
            .notify(self.label.clone(), payload, Some(endpoint))
            .await
    }
}
