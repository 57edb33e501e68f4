//! EnvDiscovery - JSON service list in an environment variable
//!
//! ```bash
//! RELAY_SERVICES='[{"name":"indexer","labels":["FOO"],"hosts":["10.0.0.1:7000"],"transport":"udp"}]'
//! ```

use contracts::{ConsumerEntry, DiscoveryBackend, DiscoveryError, ServiceConfig};
use tracing::debug;

use super::services_to_entries;

/// Variable read when none is configured
pub const DEFAULT_SERVICES_VAR: &str = "RELAY_SERVICES";

/// Reads the variable on every query; an unset variable means no consumers
#[derive(Debug, Clone)]
pub struct EnvDiscovery {
    var: String,
}

impl EnvDiscovery {
    pub fn new(var: impl Into<String>) -> Self {
        Self { var: var.into() }
    }

    pub fn var(&self) -> &str {
        &self.var
    }
}

impl Default for EnvDiscovery {
    fn default() -> Self {
        Self::new(DEFAULT_SERVICES_VAR)
    }
}

impl DiscoveryBackend for EnvDiscovery {
    fn name(&self) -> &str {
        "env"
    }

    async fn list_consumers(&self, label: &str) -> Result<Vec<ConsumerEntry>, DiscoveryError> {
        let Ok(json) = std::env::var(&self.var) else {
            debug!(var = %self.var, "Services variable unset");
            return Ok(Vec::new());
        };

        let services: Vec<ServiceConfig> = serde_json::from_str(&json).map_err(|e| {
            DiscoveryError::malformed_record(label, format!("invalid {} JSON: {e}", self.var))
        })?;

        Ok(services_to_entries(&services, label))
    }
}
