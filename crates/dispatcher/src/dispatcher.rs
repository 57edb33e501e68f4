//! Dispatcher - resolve, fan out, aggregate

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use bytes::Bytes;
use contracts::{
    ConsumerRecord, DeliveryStatus, DispatchResult, FanoutPolicy, Label, Message, RelayConfig,
    RelaySettings, Transport, TransportError,
};
use discovery::DiscoveryDirectory;
use tokio::sync::watch;
use tokio::task::JoinSet;
use tracing::{debug, info, instrument, warn};

use crate::error::DispatchError;
use crate::metrics::MetricsSnapshot;
use crate::notifier::BoundNotifier;
use crate::plan::{aggregate, DeliveryPlan};
use crate::registry::{TransportHandle, TransportRegistry};

/// Dispatcher settings
#[derive(Debug, Clone)]
pub struct DispatcherSettings {
    /// Endpoint used when `notify` gets none
    pub default_endpoint: String,
    /// Upper bound for a single send
    pub send_timeout: Duration,
    /// Cancel the rest of an ANY group once one member succeeded
    pub short_circuit_any: bool,
    /// Invalidate the label's cached consumers after a failed delivery
    pub refresh_on_failure: bool,
}

impl Default for DispatcherSettings {
    fn default() -> Self {
        Self::from(&RelaySettings::default())
    }
}

impl From<&RelaySettings> for DispatcherSettings {
    fn from(settings: &RelaySettings) -> Self {
        Self {
            default_endpoint: settings.default_endpoint.clone(),
            send_timeout: settings.send_timeout(),
            short_circuit_any: settings.short_circuit_any,
            refresh_on_failure: settings.refresh_on_failure,
        }
    }
}

/// Builder for creating a Dispatcher
pub struct DispatcherBuilder {
    directory: DiscoveryDirectory,
    registry: TransportRegistry,
    settings: DispatcherSettings,
}

impl DispatcherBuilder {
    pub fn new(directory: DiscoveryDirectory) -> Self {
        Self {
            directory,
            registry: TransportRegistry::new(),
            settings: DispatcherSettings::default(),
        }
    }

    pub fn registry(mut self, registry: TransportRegistry) -> Self {
        self.registry = registry;
        self
    }

    /// Register one more transport kind
    pub fn transport<T>(mut self, kind: &str, transport: T) -> Self
    where
        T: Transport + Sync + 'static,
    {
        self.registry.register(kind, transport);
        self
    }

    pub fn settings(mut self, settings: DispatcherSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn default_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.settings.default_endpoint = endpoint.into();
        self
    }

    pub fn send_timeout(mut self, timeout: Duration) -> Self {
        self.settings.send_timeout = timeout;
        self
    }

    pub fn short_circuit_any(mut self, enabled: bool) -> Self {
        self.settings.short_circuit_any = enabled;
        self
    }

    pub fn refresh_on_failure(mut self, enabled: bool) -> Self {
        self.settings.refresh_on_failure = enabled;
        self
    }

    pub fn build(self) -> Dispatcher {
        debug!(
            backend = self.directory.backend_name(),
            transports = ?self.registry.kinds(),
            "Dispatcher built"
        );
        Dispatcher {
            directory: Arc::new(self.directory),
            registry: Arc::new(self.registry),
            settings: Arc::new(self.settings),
        }
    }
}

/// Routes messages by label to every subscribed consumer.
///
/// Build once and reuse: the discovery cache and transport state live as
/// long as the dispatcher. Clones share both.
#[derive(Clone)]
pub struct Dispatcher {
    directory: Arc<DiscoveryDirectory>,
    registry: Arc<TransportRegistry>,
    settings: Arc<DispatcherSettings>,
}

impl Dispatcher {
    pub fn builder(directory: DiscoveryDirectory) -> DispatcherBuilder {
        DispatcherBuilder::new(directory)
    }

    /// Build directory, transports and settings from a loaded configuration
    #[instrument(name = "dispatcher_from_config", skip(config))]
    pub fn from_config(config: &RelayConfig) -> Result<Self, DispatchError> {
        let directory = DiscoveryDirectory::from_config(&config.discovery)?;
        let registry = TransportRegistry::from_config(&config.transports)?;

        Ok(DispatcherBuilder::new(directory)
            .registry(registry)
            .settings(DispatcherSettings::from(&config.relay))
            .build())
    }

    pub fn directory(&self) -> &DiscoveryDirectory {
        &self.directory
    }

    pub fn registry(&self) -> &TransportRegistry {
        &self.registry
    }

    pub fn settings(&self) -> &DispatcherSettings {
        &self.settings
    }

    /// Get metrics for all transports
    pub fn metrics(&self) -> Vec<(String, MetricsSnapshot)> {
        self.registry.metrics()
    }

    /// Notifier fixed to `label`
    pub fn bind(&self, label: impl Into<Label>) -> BoundNotifier {
        BoundNotifier::new(self.clone(), label.into())
    }

    /// Deliver `payload` to every consumer of `label`.
    ///
    /// `endpoint` defaults to the configured default endpoint.
    ///
    /// # Errors
    /// - `DiscoveryUnavailable`: nothing was sent
    /// - `AggregateDeliveryFailure`: some group's policy was not met;
    ///   successful deliveries stand
    pub async fn notify(
        &self,
        label: impl Into<Label>,
        payload: impl Into<Bytes>,
        endpoint: Option<&str>,
    ) -> Result<DispatchResult, DispatchError> {
        let mut message = Message::new(label, payload);
        if let Some(endpoint) = endpoint {
            message = message.with_endpoint(endpoint);
        }
        self.dispatch(&message).await
    }

    /// Deliver an already built message
    #[instrument(
        name = "dispatcher_dispatch",
        skip(self, message),
        fields(label = %message.label, bytes = message.len())
    )]
    pub async fn dispatch(&self, message: &Message) -> Result<DispatchResult, DispatchError> {
        let started = Instant::now();
        let label = message.label.clone();
        let endpoint = message.endpoint_or(&self.settings.default_endpoint).to_string();

        let records = match self.directory.resolve(&label).await {
            Ok(records) => records,
            Err(source) => {
                observability::record_discovery_unavailable(&label);
                warn!(error = %source, "Discovery unavailable, nothing sent");
                return Err(DispatchError::DiscoveryUnavailable { label, source });
            }
        };

        if records.is_empty() {
            debug!("No consumers subscribed");
            let result = DispatchResult::empty(label, endpoint);
            observability::record_dispatch(&result, elapsed_ms(started));
            return Ok(result);
        }

        let plan = DeliveryPlan::build(&records, &self.registry);
        let statuses = self.fan_out(&plan, &message.payload, &endpoint).await;
        let verdict = aggregate(&plan, &records, &statuses);

        let result = DispatchResult {
            label: label.clone(),
            endpoint,
            succeeded: verdict.succeeded,
            outcomes: verdict.outcomes,
        };
        observability::record_dispatch(&result, elapsed_ms(started));

        if result.failed_count() > 0 && self.settings.refresh_on_failure {
            self.directory.invalidate(&label).await;
            debug!("Cached consumers dropped after failed delivery");
        }

        if result.succeeded {
            info!(
                consumers = result.outcomes.len(),
                groups = plan.groups.len(),
                delivered = result.delivered_count(),
                failed = result.failed_count(),
                cancelled = result.cancelled_count(),
                "Notify succeeded"
            );
            Ok(result)
        } else {
            warn!(
                consumers = result.outcomes.len(),
                failed = verdict.failed.len(),
                groups = ?verdict.unsatisfied,
                "Notify failed: fan-out policy not met"
            );
            Err(DispatchError::AggregateDeliveryFailure {
                label,
                failed: verdict.failed,
                result,
            })
        }
    }

    /// Convenience wrapper over the directory
    pub async fn resolve(&self, label: &Label) -> Result<Arc<[ConsumerRecord]>, DispatchError> {
        self.directory
            .resolve(label)
            .await
            .map_err(|source| DispatchError::DiscoveryUnavailable {
                label: label.clone(),
                source,
            })
    }

    /// Run every planned send concurrently and collect one status per target
    #[instrument(
        name = "dispatcher_fan_out",
        skip(self, plan, payload),
        fields(targets = plan.targets.len())
    )]
    async fn fan_out(
        &self,
        plan: &DeliveryPlan,
        payload: &Bytes,
        endpoint: &str,
    ) -> Vec<DeliveryStatus> {
        let cancels: Vec<Option<watch::Sender<bool>>> = plan
            .groups
            .iter()
            .map(|group| {
                (self.settings.short_circuit_any && group.policy == FanoutPolicy::Any)
                    .then(|| watch::channel(false).0)
            })
            .collect();

        let mut statuses: Vec<Option<DeliveryStatus>> = vec![None; plan.targets.len()];
        let mut tasks = JoinSet::new();
        let mut spawned = HashMap::with_capacity(plan.spawnable());

        for (idx, target) in plan.targets.iter().enumerate() {
            let handle = match &target.transport {
                Ok(handle) => handle.clone(),
                Err(err) => {
                    warn!(address = %target.address, error = %err, "No transport for consumer");
                    observability::record_delivery("unknown", &DeliveryStatus::Failed(err.clone()));
                    statuses[idx] = Some(DeliveryStatus::Failed(err.clone()));
                    continue;
                }
            };

            let cancel = plan
                .exclusive_owner(idx)
                .and_then(|group| cancels[group].as_ref())
                .map(watch::Sender::subscribe);

            let task = tasks.spawn(deliver(
                handle,
                target.address.clone(),
                endpoint.to_string(),
                payload.clone(),
                self.settings.send_timeout,
                cancel,
            ));
            spawned.insert(task.id(), idx);
        }

        while let Some(joined) = tasks.join_next_with_id().await {
            let (id, status) = match joined {
                Ok((id, status)) => (id, Ok(status)),
                Err(err) => (err.id(), Err(err.to_string())),
            };
            let Some(&idx) = spawned.get(&id) else {
                continue;
            };
            let status = status.unwrap_or_else(|message| {
                DeliveryStatus::Failed(TransportError::TaskFailed {
                    address: plan.targets[idx].address.clone(),
                    message,
                })
            });

            if status == DeliveryStatus::Delivered {
                for &group in &plan.targets[idx].owners {
                    if let Some(cancel) = &cancels[group] {
                        cancel.send_replace(true);
                    }
                }
            }
            statuses[idx] = Some(status);
        }

        statuses
            .into_iter()
            .zip(&plan.targets)
            .map(|(status, target)| {
                status.unwrap_or_else(|| {
                    DeliveryStatus::Failed(TransportError::TaskFailed {
                        address: target.address.clone(),
                        message: "send task never reported".to_string(),
                    })
                })
            })
            .collect()
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("backend", &self.directory.backend_name())
            .field("registry", &self.registry)
            .field("settings", &self.settings)
            .finish()
    }
}

/// One send bounded by `timeout`, abandoned if `cancel` fires first
async fn deliver(
    handle: TransportHandle,
    address: String,
    endpoint: String,
    payload: Bytes,
    timeout: Duration,
    cancel: Option<watch::Receiver<bool>>,
) -> DeliveryStatus {
    let send = async {
        match tokio::time::timeout(timeout, handle.send(&address, &endpoint, &payload)).await {
            Ok(Ok(())) => DeliveryStatus::Delivered,
            Ok(Err(err)) => {
                debug!(address = %address, error = %err, "Send failed");
                DeliveryStatus::Failed(err)
            }
            Err(_) => {
                handle.metrics().inc_timeout_count();
                DeliveryStatus::Failed(TransportError::Timeout {
                    kind: handle.kind().to_string(),
                    address: address.clone(),
                    timeout_ms: timeout.as_millis() as u64,
                })
            }
        }
    };

    let status = match cancel {
        Some(cancel) => tokio::select! {
            biased;
            status = send => status,
            () = cancelled(cancel) => {
                handle.metrics().inc_cancelled_count();
                DeliveryStatus::Cancelled
            }
        },
        None => send.await,
    };

    observability::record_delivery(handle.kind(), &status);
    status
}

/// Resolves once the group signals cancellation
async fn cancelled(mut cancel: watch::Receiver<bool>) {
    let closed = cancel.wait_for(|cancelled| *cancelled).await.is_err();
    if closed {
        std::future::pending::<()>().await;
    }
}

fn elapsed_ms(started: Instant) -> f64 {
    started.elapsed().as_secs_f64() * 1000.0
}
