//! DiscoveryDirectory - label → consumer records, cached

use std::sync::Arc;
use std::time::Duration;

use contracts::{
    ConsumerRecord, ContractError, DiscoveryBackend, DiscoveryConfig, DiscoveryError, Label,
};
use tokio::time::Instant;
use tracing::{debug, instrument, warn};

use crate::backends::create_backend;
use crate::cache::{CacheEntry, DiscoveryCache, Slot};
use crate::erased::DynDiscoveryBackend;

/// Directory timing configuration
#[derive(Debug, Clone, Copy)]
pub struct DirectoryConfig {
    /// How long a resolved set is served without asking the backend
    pub cache_ttl: Duration,
    /// Extra time an expired entry may cover for a failing backend
    pub stale_grace: Duration,
    /// Upper bound for one backend query
    pub timeout: Duration,
}

impl Default for DirectoryConfig {
    fn default() -> Self {
        Self::from(&DiscoveryConfig::default())
    }
}

impl From<&DiscoveryConfig> for DirectoryConfig {
    fn from(config: &DiscoveryConfig) -> Self {
        Self {
            cache_ttl: config.cache_ttl(),
            stale_grace: config.stale_grace(),
            timeout: config.timeout(),
        }
    }
}

/// Where a resolution came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolutionSource {
    /// Fresh cache entry
    Cache,
    /// Backend query
    Backend,
    /// Expired entry served because the backend failed
    Stale,
}

impl ResolutionSource {
    fn metric_tag(self) -> &'static str {
        match self {
            Self::Cache => "hit",
            Self::Backend => "miss",
            Self::Stale => "stale",
        }
    }
}

/// Records for one label plus their provenance
#[derive(Debug, Clone)]
pub struct Resolution {
    pub records: Arc<[ConsumerRecord]>,
    pub source: ResolutionSource,
}

/// Resolves labels to consumer records through a pluggable backend.
///
/// Shared by every `notify` call of a dispatcher; safe to use from many
/// tasks at once.
pub struct DiscoveryDirectory {
    backend: Arc<dyn DynDiscoveryBackend>,
    config: DirectoryConfig,
    cache: DiscoveryCache,
}

impl DiscoveryDirectory {
    pub fn new<B>(backend: B, config: DirectoryConfig) -> Self
    where
        B: DiscoveryBackend + Sync + 'static,
    {
        Self::from_backend(Arc::new(backend), config)
    }

    pub fn from_backend(backend: Arc<dyn DynDiscoveryBackend>, config: DirectoryConfig) -> Self {
        Self {
            backend,
            config,
            cache: DiscoveryCache::default(),
        }
    }

    /// Build the configured backend and wrap it in a directory
    pub fn from_config(config: &DiscoveryConfig) -> Result<Self, ContractError> {
        let backend = create_backend(config)?;
        Ok(Self::from_backend(backend, DirectoryConfig::from(config)))
    }

    pub fn backend_name(&self) -> &str {
        self.backend.name()
    }

    pub fn config(&self) -> &DirectoryConfig {
        &self.config
    }

    /// Current consumer records for `label`
    ///
    /// # Errors
    /// Backend failure with no entry inside the grace window.
    pub async fn resolve(&self, label: &Label) -> Result<Arc<[ConsumerRecord]>, DiscoveryError> {
        self.lookup(label).await.map(|r| r.records)
    }

    /// Like [`resolve`](Self::resolve), also reporting where the records came from
    #[instrument(
        name = "discovery_lookup",
        skip(self),
        fields(backend = %self.backend.name())
    )]
    pub async fn lookup(&self, label: &Label) -> Result<Resolution, DiscoveryError> {
        let slot = self.cache.slot(label).await;
        let resolution = self.lookup_in(&slot, label).await;
        drop(slot);

        if resolution.is_err() {
            self.cache.prune(label).await;
        }
        resolution
    }

    async fn lookup_in(&self, slot: &Slot, label: &Label) -> Result<Resolution, DiscoveryError> {
        let mut entry = slot.lock().await;

        if let Some(cached) = entry.as_ref() {
            if cached.is_fresh(Instant::now(), self.config.cache_ttl) {
                return Ok(self.finish(cached.records.clone(), ResolutionSource::Cache));
            }
        }

        match self.query_backend(label).await {
            Ok(records) => {
                *entry = Some(CacheEntry::new(label.clone(), records.clone()));
                Ok(self.finish(records, ResolutionSource::Backend))
            }
            Err(err) => {
                let now = Instant::now();
                let usable = entry.as_ref().filter(|cached| {
                    cached.is_within_grace(now, self.config.cache_ttl, self.config.stale_grace)
                });

                if let Some(cached) = usable {
                    warn!(
                        label = %label,
                        error = %err,
                        age_ms = cached.age(now).as_millis() as u64,
                        "Discovery backend failed, serving stale consumers"
                    );
                    return Ok(self.finish(cached.records.clone(), ResolutionSource::Stale));
                }

                *entry = None;
                observability::record_discovery_lookup(self.backend.name(), "error");
                warn!(label = %label, error = %err, "Discovery backend failed, no usable cache");
                Err(err)
            }
        }
    }

    /// Drop the cached records of `label`; returns whether one was cached
    pub async fn invalidate(&self, label: &str) -> bool {
        let Some(slot) = self.cache.existing_slot(label).await else {
            return false;
        };
        let removed = slot.lock().await.take().is_some();
        drop(slot);

        self.cache.prune(label).await;
        removed
    }

    /// Drop every cached entry along with its slot
    pub async fn clear(&self) {
        self.cache.remove_all().await;
    }

    /// Labels with an entry that would currently be served as a hit
    pub async fn cached_labels(&self) -> Vec<Label> {
        let now = Instant::now();
        let mut labels = Vec::new();
        for slot in self.cache.all_slots().await {
            if let Some(entry) = slot.lock().await.as_ref() {
                if entry.is_fresh(now, self.config.cache_ttl) {
                    labels.push(entry.label.clone());
                }
            }
        }
        labels
    }

    async fn query_backend(&self, label: &Label) -> Result<Arc<[ConsumerRecord]>, DiscoveryError> {
        let started = Instant::now();
        let query = self.backend.list_consumers_boxed(label.as_str());

        let entries = tokio::time::timeout(self.config.timeout, query)
            .await
            .map_err(|_| DiscoveryError::Timeout {
                backend: self.backend.name().to_string(),
                timeout_ms: self.config.timeout.as_millis() as u64,
            })??;

        observability::record_discovery_latency_ms(
            self.backend.name(),
            started.elapsed().as_secs_f64() * 1000.0,
        );

        let records = entries
            .into_iter()
            .map(|entry| ConsumerRecord::from_entry(label, entry))
            .collect::<Result<Vec<_>, _>>()?;

        debug!(label = %label, consumers = records.len(), "Backend resolved consumers");
        Ok(records.into())
    }

    fn finish(&self, records: Arc<[ConsumerRecord]>, source: ResolutionSource) -> Resolution {
        observability::record_discovery_lookup(self.backend.name(), source.metric_tag());
        Resolution { records, source }
    }
}
