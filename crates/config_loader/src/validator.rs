//! Configuration validation
//!
//! Rules:
//! - timeouts and cache TTL > 0
//! - default endpoint non-empty
//! - file backend names a registry path
//! - service names unique, each with labels, hosts and a transport
//! - transport names unique (case-insensitive)

use std::collections::HashSet;

use contracts::{ContractError, DiscoveryBackendType, RelayConfig};

/// Validate a RelayConfig
///
/// Returns the first error encountered, or Ok(()).
pub fn validate(config: &RelayConfig) -> Result<(), ContractError> {
    validate_relay_settings(config)?;
    validate_discovery(config)?;
    validate_services(config)?;
    validate_transports(config)?;
    Ok(())
}

fn validate_relay_settings(config: &RelayConfig) -> Result<(), ContractError> {
    let relay = &config.relay;

    if relay.default_endpoint.trim().is_empty() {
        return Err(ContractError::config_validation(
            "relay.default_endpoint",
            "default endpoint cannot be empty",
        ));
    }
    if relay.send_timeout_ms == 0 {
        return Err(ContractError::config_validation(
            "relay.send_timeout_ms",
            "send_timeout_ms must be > 0",
        ));
    }
    Ok(())
}

fn validate_discovery(config: &RelayConfig) -> Result<(), ContractError> {
    let discovery = &config.discovery;

    if discovery.cache_ttl_ms == 0 {
        return Err(ContractError::config_validation(
            "discovery.cache_ttl_ms",
            "cache_ttl_ms must be > 0",
        ));
    }
    if discovery.timeout_ms == 0 {
        return Err(ContractError::config_validation(
            "discovery.timeout_ms",
            "timeout_ms must be > 0",
        ));
    }
    if discovery.backend == DiscoveryBackendType::File
        && discovery
            .params
            .get("path")
            .is_none_or(|p| p.trim().is_empty())
    {
        return Err(ContractError::config_validation(
            "discovery.params.path",
            "file backend requires a registry 'path'",
        ));
    }
    Ok(())
}

/// Static services must be complete; other backends ignore the list
fn validate_services(config: &RelayConfig) -> Result<(), ContractError> {
    let mut seen = HashSet::new();
    for (idx, service) in config.discovery.services.iter().enumerate() {
        let field = |name: &str| format!("discovery.services[{idx}].{name}");

        if service.name.trim().is_empty() {
            return Err(ContractError::config_validation(
                field("name"),
                "service name cannot be empty",
            ));
        }
        if !seen.insert(service.name.as_str()) {
            return Err(ContractError::config_validation(
                format!("discovery.services[name={}]", service.name),
                "duplicate service name",
            ));
        }
        if service.labels.is_empty() || service.labels.iter().any(|l| l.trim().is_empty()) {
            return Err(ContractError::config_validation(
                field("labels"),
                "service needs at least one non-empty label",
            ));
        }
        if service.hosts.iter().any(|h| h.trim().is_empty()) {
            return Err(ContractError::config_validation(
                field("hosts"),
                "host addresses cannot be empty",
            ));
        }
        if service.transport.trim().is_empty() {
            return Err(ContractError::config_validation(
                field("transport"),
                "service transport kind cannot be empty",
            ));
        }
    }
    Ok(())
}

fn validate_transports(config: &RelayConfig) -> Result<(), ContractError> {
    let mut seen = HashSet::new();
    for (idx, transport) in config.transports.iter().enumerate() {
        if transport.name.trim().is_empty() {
            return Err(ContractError::config_validation(
                format!("transports[{idx}].name"),
                "transport name cannot be empty",
            ));
        }
        if !seen.insert(transport.name.to_lowercase()) {
            return Err(ContractError::config_validation(
                format!("transports[name={}]", transport.name),
                "duplicate transport name",
            ));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::{FanoutPolicy, ServiceConfig, TransportConfig, TransportType};
    use std::collections::HashMap;

    fn service(name: &str) -> ServiceConfig {
        ServiceConfig {
            name: name.to_string(),
            labels: vec!["FOO".to_string()],
            hosts: vec!["h1".to_string()],
            transport: "udp".to_string(),
            policy: FanoutPolicy::Any,
        }
    }

    fn transport(name: &str) -> TransportConfig {
        TransportConfig {
            name: name.to_string(),
            transport_type: TransportType::Log,
            params: HashMap::new(),
        }
    }

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate(&RelayConfig::default()).is_ok());
    }

    #[test]
    fn test_zero_send_timeout() {
        let mut config = RelayConfig::default();
        config.relay.send_timeout_ms = 0;
        let err = validate(&config).unwrap_err();
        assert!(err.to_string().contains("send_timeout_ms"));
    }

    #[test]
    fn test_zero_ttl() {
        let mut config = RelayConfig::default();
        config.discovery.cache_ttl_ms = 0;
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_file_backend_requires_path() {
        let mut config = RelayConfig::default();
        config.discovery.backend = DiscoveryBackendType::File;
        assert!(validate(&config).is_err());

        config
            .discovery
            .params
            .insert("path".to_string(), "services.json".to_string());
        assert!(validate(&config).is_ok());
    }

    #[test]
    fn test_duplicate_service() {
        let mut config = RelayConfig::default();
        config.discovery.services = vec![service("indexer"), service("indexer")];
        let err = validate(&config).unwrap_err();
        assert!(err.to_string().contains("duplicate service name"));
    }

    #[test]
    fn test_service_without_labels() {
        let mut config = RelayConfig::default();
        let mut svc = service("indexer");
        svc.labels.clear();
        config.discovery.services = vec![svc];
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_blank_host() {
        let mut config = RelayConfig::default();
        let mut svc = service("indexer");
        svc.hosts.push(" ".to_string());
        config.discovery.services = vec![svc];
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_duplicate_transport_ignores_case() {
        let mut config = RelayConfig::default();
        config.transports = vec![transport("Audit"), transport("audit")];
        let err = validate(&config).unwrap_err();
        assert!(err.to_string().contains("duplicate transport name"));
    }
}
