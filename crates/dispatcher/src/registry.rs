//! TransportRegistry - transport kind → implementation

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use bytes::Bytes;
use contracts::{Transport, TransportConfig, TransportError, TransportType};
use discovery::BoxFuture;
use tracing::{debug, instrument};

use crate::error::DispatchError;
use crate::metrics::{MetricsSnapshot, TransportMetrics};
use crate::transports::{FileTransport, LogTransport, MemoryTransport, StdoutTransport, UdpTransport};

/// Dyn-compatible view of [`Transport`]
pub trait DynTransport: Send + Sync {
    fn name(&self) -> &str;

    fn send_boxed<'a>(
        &'a self,
        address: &'a str,
        endpoint: &'a str,
        payload: &'a Bytes,
    ) -> BoxFuture<'a, Result<(), TransportError>>;
}

impl<T> DynTransport for T
where
    T: Transport + Sync,
{
    fn name(&self) -> &str {
        Transport::name(self)
    }

    fn send_boxed<'a>(
        &'a self,
        address: &'a str,
        endpoint: &'a str,
        payload: &'a Bytes,
    ) -> BoxFuture<'a, Result<(), TransportError>> {
        Box::pin(Transport::send(self, address, endpoint, payload))
    }
}

/// A registered transport together with its counters
#[derive(Clone)]
pub struct TransportHandle {
    kind: String,
    transport: Arc<dyn DynTransport>,
    metrics: Arc<TransportMetrics>,
}

impl TransportHandle {
    /// Normalized kind this handle was registered under
    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn metrics(&self) -> &Arc<TransportMetrics> {
        &self.metrics
    }

    /// Invoke the transport once and record the verdict
    pub async fn send(
        &self,
        address: &str,
        endpoint: &str,
        payload: &Bytes,
    ) -> Result<(), TransportError> {
        self.metrics.inc_in_flight();
        let _guard = InFlightGuard(&self.metrics);
        let started = Instant::now();

        let result = self.transport.send_boxed(address, endpoint, payload).await;
        match &result {
            Ok(()) => {
                self.metrics.inc_send_count();
                observability::record_send_latency_ms(
                    &self.kind,
                    started.elapsed().as_secs_f64() * 1000.0,
                );
            }
            Err(_) => self.metrics.inc_failure_count(),
        }
        result
    }
}

/// Keeps `in_flight` right when a send is dropped mid-await
struct InFlightGuard<'a>(&'a TransportMetrics);

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.dec_in_flight();
    }
}

/// Maps transport kind identifiers to implementations.
///
/// Kinds are case-insensitive. Read-only once handed to a dispatcher.
#[derive(Clone, Default)]
pub struct TransportRegistry {
    transports: HashMap<String, TransportHandle>,
}

impl TransportRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with one instance of every built-in transport under its own name
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register("log", LogTransport::new("log"));
        registry.register("stdout", StdoutTransport::new());
        registry.register("file", FileTransport::new("."));
        registry.register("udp", UdpTransport::new(Default::default()));
        registry.register("memory", MemoryTransport::new());
        registry
    }

    /// Build from `[[transports]]` configuration
    #[instrument(
        name = "transport_registry_from_config",
        skip(configs),
        fields(transport_count = configs.len())
    )]
    pub fn from_config(configs: &[TransportConfig]) -> Result<Self, DispatchError> {
        let mut registry = Self::new();
        for config in configs {
            let transport = create_transport(config)?;
            registry.register_arc(&config.name, transport);
        }
        Ok(registry)
    }

    /// Register `transport` under `kind`, replacing any previous one
    pub fn register<T>(&mut self, kind: &str, transport: T) -> &mut Self
    where
        T: Transport + Sync + 'static,
    {
        self.register_arc(kind, Arc::new(transport))
    }

    pub fn register_arc(&mut self, kind: &str, transport: Arc<dyn DynTransport>) -> &mut Self {
        let kind = normalize_kind(kind);
        debug!(kind = %kind, transport = transport.name(), "Transport registered");
        self.transports.insert(
            kind.clone(),
            TransportHandle {
                kind,
                transport,
                metrics: Arc::new(TransportMetrics::new()),
            },
        );
        self
    }

    /// Look up the transport for `kind`
    ///
    /// # Errors
    /// `UnknownTransport` if nothing is registered under `kind`.
    pub fn get(&self, kind: &str) -> Result<TransportHandle, TransportError> {
        self.transports
            .get(&normalize_kind(kind))
            .cloned()
            .ok_or_else(|| TransportError::unknown(kind))
    }

    pub fn contains(&self, kind: &str) -> bool {
        self.transports.contains_key(&normalize_kind(kind))
    }

    /// Registered kinds, sorted
    pub fn kinds(&self) -> Vec<String> {
        let mut kinds: Vec<_> = self.transports.keys().cloned().collect();
        kinds.sort();
        kinds
    }

    pub fn len(&self) -> usize {
        self.transports.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transports.is_empty()
    }

    /// Single send through the transport registered for `kind`; no retry
    pub async fn send(
        &self,
        kind: &str,
        address: &str,
        endpoint: &str,
        payload: &Bytes,
    ) -> Result<(), TransportError> {
        self.get(kind)?.send(address, endpoint, payload).await
    }

    /// Get metrics for all transports
    pub fn metrics(&self) -> Vec<(String, MetricsSnapshot)> {
        let mut snapshots: Vec<_> = self
            .transports
            .iter()
            .map(|(kind, handle)| (kind.clone(), handle.metrics.snapshot()))
            .collect();
        snapshots.sort_by(|a, b| a.0.cmp(&b.0));
        snapshots
    }
}

impl std::fmt::Debug for TransportRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransportRegistry")
            .field("kinds", &self.kinds())
            .finish()
    }
}

pub(crate) fn normalize_kind(kind: &str) -> String {
    kind.trim().to_ascii_lowercase()
}

/// Create a transport from configuration
#[instrument(
    name = "transport_registry_create_transport",
    skip(config),
    fields(transport = %config.name, transport_type = ?config.transport_type)
)]
fn create_transport(config: &TransportConfig) -> Result<Arc<dyn DynTransport>, DispatchError> {
    let transport: Arc<dyn DynTransport> = match config.transport_type {
        TransportType::Log => Arc::new(LogTransport::new(&config.name)),
        TransportType::Stdout => Arc::new(StdoutTransport::new()),
        TransportType::File => Arc::new(FileTransport::from_params(&config.params)),
        TransportType::Udp => Arc::new(
            UdpTransport::from_params(&config.params)
                .map_err(|e| DispatchError::transport_creation(&config.name, e))?,
        ),
        TransportType::Memory => Arc::new(MemoryTransport::new()),
    };
    Ok(transport)
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::TransportConfig;
    use std::collections::HashMap;

    #[tokio::test]
    async fn test_unknown_kind_is_reported() {
        let registry = TransportRegistry::with_builtins();
        let err = registry
            .send("carrier-pigeon", "coop", "key", &Bytes::from_static(b"hi"))
            .await
            .unwrap_err();
        assert_eq!(err, TransportError::unknown("carrier-pigeon"));
    }

    #[tokio::test]
    async fn test_kinds_are_case_insensitive() {
        let memory = MemoryTransport::new();
        let mut registry = TransportRegistry::new();
        registry.register("HTTP", memory.clone());

        assert!(registry.contains("http"));
        registry
            .send("Http", "host1", "key", &Bytes::from_static(b"x"))
            .await
            .unwrap();

        assert_eq!(memory.delivered_to("host1").await, 1);
        assert_eq!(registry.get("http").unwrap().metrics().send_count(), 1);
    }

    #[tokio::test]
    async fn test_failures_are_counted() {
        let mut registry = TransportRegistry::new();
        registry.register("memory", MemoryTransport::new().with_failure("bad"));

        assert!(registry
            .send("memory", "bad", "key", &Bytes::new())
            .await
            .is_err());

        let (kind, snapshot) = registry.metrics().remove(0);
        assert_eq!(kind, "memory");
        assert_eq!(snapshot.failure_count, 1);
        assert_eq!(snapshot.in_flight, 0);
    }

    #[test]
    fn test_from_config() {
        let configs = vec![
            TransportConfig {
                name: "audit".to_string(),
                transport_type: TransportType::Log,
                params: HashMap::new(),
            },
            TransportConfig {
                name: "Datagram".to_string(),
                transport_type: TransportType::Udp,
                params: HashMap::from([("bind".to_string(), "127.0.0.1:0".to_string())]),
            },
        ];

        let registry = TransportRegistry::from_config(&configs).unwrap();
        assert_eq!(registry.kinds(), vec!["audit", "datagram"]);
    }

    #[test]
    fn test_from_config_rejects_bad_params() {
        let configs = vec![TransportConfig {
            name: "udp".to_string(),
            transport_type: TransportType::Udp,
            params: HashMap::from([("bind".to_string(), "not-an-address".to_string())]),
        }];

        let err = TransportRegistry::from_config(&configs).unwrap_err();
        assert!(matches!(err, DispatchError::TransportCreation { .. }));
    }
}
