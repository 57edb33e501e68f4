//! RelayConfig - Config Loader output
//!
//! Describes the complete relay: dispatch settings, discovery backend and
//! cache, and the transport-kind → implementation mapping.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

use crate::{FanoutPolicy, DEFAULT_ENDPOINT};

/// Configuration version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ConfigVersion {
    #[default]
    V1,
}

/// Complete relay configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RelayConfig {
    #[serde(default)]
    pub version: ConfigVersion,

    #[serde(default)]
    pub relay: RelaySettings,

    #[serde(default)]
    pub discovery: DiscoveryConfig,

    /// Transport kinds available to consumer records
    #[serde(default)]
    pub transports: Vec<TransportConfig>,
}

/// Dispatcher settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelaySettings {
    /// Endpoint used when the producer does not pass one
    #[serde(default = "default_endpoint")]
    pub default_endpoint: String,

    /// Upper bound for a single send
    #[serde(default = "default_send_timeout_ms")]
    pub send_timeout_ms: u64,

    /// Cancel in-flight sends of an ANY group once one member succeeded
    #[serde(default)]
    pub short_circuit_any: bool,

    /// Drop the cached consumers of a label after a failed delivery
    #[serde(default = "default_true")]
    pub refresh_on_failure: bool,
}

impl Default for RelaySettings {
    fn default() -> Self {
        Self {
            default_endpoint: default_endpoint(),
            send_timeout_ms: default_send_timeout_ms(),
            short_circuit_any: false,
            refresh_on_failure: true,
        }
    }
}

impl RelaySettings {
    pub fn send_timeout(&self) -> Duration {
        Duration::from_millis(self.send_timeout_ms)
    }
}

fn default_endpoint() -> String {
    DEFAULT_ENDPOINT.to_string()
}

fn default_send_timeout_ms() -> u64 {
    5_000
}

fn default_true() -> bool {
    true
}

/// Discovery backend selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiscoveryBackendType {
    /// Services listed in this configuration
    #[default]
    Static,
    /// Registry file re-read on every query
    File,
    /// JSON service list in an environment variable
    Env,
}

/// Discovery Directory configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscoveryConfig {
    #[serde(default)]
    pub backend: DiscoveryBackendType,

    /// How long a resolved consumer set is served from cache
    #[serde(default = "default_cache_ttl_ms")]
    pub cache_ttl_ms: u64,

    /// How long past its TTL an entry may stand in for a failing backend
    #[serde(default = "default_stale_grace_ms")]
    pub stale_grace_ms: u64,

    /// Upper bound for a single backend query
    #[serde(default = "default_discovery_timeout_ms")]
    pub timeout_ms: u64,

    /// Backend-specific parameters (`path` for file, `var` for env)
    #[serde(default)]
    pub params: HashMap<String, String>,

    /// Services for the static backend
    #[serde(default)]
    pub services: Vec<ServiceConfig>,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            backend: DiscoveryBackendType::default(),
            cache_ttl_ms: default_cache_ttl_ms(),
            stale_grace_ms: default_stale_grace_ms(),
            timeout_ms: default_discovery_timeout_ms(),
            params: HashMap::new(),
            services: Vec::new(),
        }
    }
}

impl DiscoveryConfig {
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_millis(self.cache_ttl_ms)
    }

    pub fn stale_grace(&self) -> Duration {
        Duration::from_millis(self.stale_grace_ms)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

fn default_cache_ttl_ms() -> u64 {
    5_000
}

fn default_stale_grace_ms() -> u64 {
    30_000
}

fn default_discovery_timeout_ms() -> u64 {
    2_000
}

/// One logical consumer service: a fan-out group with its instances
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Fan-out group identifier
    pub name: String,

    /// Labels the service subscribes to
    pub labels: Vec<String>,

    /// Instance addresses
    pub hosts: Vec<String>,

    /// Transport kind used to reach the instances
    pub transport: String,

    #[serde(default)]
    pub policy: FanoutPolicy,
}

/// Built-in transport implementations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransportType {
    /// Log the delivery via tracing
    Log,
    /// Write the payload to standard output
    Stdout,
    /// Append the payload to a file named by the endpoint
    File,
    /// Send the payload as a UDP datagram to the address
    Udp,
    /// Keep deliveries in memory
    Memory,
}

/// Transport registration: kind identifier → implementation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransportConfig {
    /// Transport kind identifier referenced by consumer records
    pub name: String,

    pub transport_type: TransportType,

    /// Implementation-specific parameters
    #[serde(default)]
    pub params: HashMap<String, String>,
}
