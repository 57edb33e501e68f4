//! StaticDiscovery - in-process service table

use std::sync::Arc;

use contracts::{ConsumerEntry, DiscoveryBackend, DiscoveryError, ServiceConfig};
use tokio::sync::RwLock;
use tracing::{debug, info};

use super::services_to_entries;

/// Service table held in memory.
///
/// Seeded from configuration; services can be registered and removed at
/// runtime, which the directory picks up once its cache entry expires.
#[derive(Clone, Default)]
pub struct StaticDiscovery {
    services: Arc<RwLock<Vec<ServiceConfig>>>,
}

impl StaticDiscovery {
    pub fn new(services: Vec<ServiceConfig>) -> Self {
        Self {
            services: Arc::new(RwLock::new(services)),
        }
    }

    /// Add a service, replacing any service with the same name
    pub async fn register(&self, service: ServiceConfig) {
        let mut services = self.services.write().await;
        services.retain(|s| s.name != service.name);
        info!(
            service = %service.name,
            hosts = service.hosts.len(),
            labels = ?service.labels,
            "Registered service"
        );
        services.push(service);
    }

    /// Remove a service by name; returns whether it existed
    pub async fn deregister(&self, name: &str) -> bool {
        let mut services = self.services.write().await;
        let before = services.len();
        services.retain(|s| s.name != name);
        before != services.len()
    }

    pub async fn service_count(&self) -> usize {
        self.services.read().await.len()
    }
}

impl DiscoveryBackend for StaticDiscovery {
    fn name(&self) -> &str {
        "static"
    }

    async fn list_consumers(&self, label: &str) -> Result<Vec<ConsumerEntry>, DiscoveryError> {
        let services = self.services.read().await;
        let entries = services_to_entries(&services, label);
        debug!(label, consumers = entries.len(), "Static lookup");
        Ok(entries)
    }
}
