//! Discovery backend implementations
//!
//! Contains StaticDiscovery, FileDiscovery and EnvDiscovery.

mod env;
mod file;
mod static_backend;

pub use self::env::{EnvDiscovery, DEFAULT_SERVICES_VAR};
pub use self::file::FileDiscovery;
pub use self::static_backend::StaticDiscovery;

use std::sync::Arc;

use contracts::{
    ConsumerEntry, ContractError, DiscoveryBackendType, DiscoveryConfig, ServiceConfig,
};
use serde::Deserialize;

use crate::erased::DynDiscoveryBackend;

/// Service list as stored in registry files and environment variables
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ServiceRegistry {
    #[serde(default)]
    pub services: Vec<ServiceConfig>,
}

/// Expand every service subscribed to `label` into one entry per host
pub fn services_to_entries(services: &[ServiceConfig], label: &str) -> Vec<ConsumerEntry> {
    services
        .iter()
        .filter(|svc| svc.labels.iter().any(|l| l == label))
        .flat_map(|svc| {
            svc.hosts.iter().map(move |host| ConsumerEntry {
                address: host.clone(),
                transport_kind: svc.transport.clone(),
                fanout_group: svc.name.clone(),
                policy: svc.policy,
            })
        })
        .collect()
}

/// Build the backend selected by configuration
pub fn create_backend(
    config: &DiscoveryConfig,
) -> Result<Arc<dyn DynDiscoveryBackend>, ContractError> {
    match config.backend {
        DiscoveryBackendType::Static => {
            Ok(Arc::new(StaticDiscovery::new(config.services.clone())))
        }
        DiscoveryBackendType::File => {
            let path = config.params.get("path").ok_or_else(|| {
                ContractError::config_validation(
                    "discovery.params.path",
                    "file backend requires a registry 'path'",
                )
            })?;
            Ok(Arc::new(FileDiscovery::new(path)?))
        }
        DiscoveryBackendType::Env => {
            let var = config
                .params
                .get("var")
                .map(String::as_str)
                .unwrap_or(DEFAULT_SERVICES_VAR);
            Ok(Arc::new(EnvDiscovery::new(var)))
        }
    }
}
