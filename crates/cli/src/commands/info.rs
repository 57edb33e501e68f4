//! `info` command implementation.

use anyhow::{Context, Result};
use contracts::RelayConfig;
use serde::Serialize;
use tracing::info;

use crate::cli::InfoArgs;

/// Configuration info for JSON output
#[derive(Serialize)]
struct ConfigInfo {
    version: String,
    relay: RelayInfo,
    discovery: DiscoveryInfo,
    transports: Vec<TransportInfo>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    services: Vec<ServiceInfo>,
}

#[derive(Serialize)]
struct RelayInfo {
    default_endpoint: String,
    send_timeout_ms: u64,
    short_circuit_any: bool,
    refresh_on_failure: bool,
}

#[derive(Serialize)]
struct DiscoveryInfo {
    backend: String,
    cache_ttl_ms: u64,
    stale_grace_ms: u64,
    timeout_ms: u64,
    #[serde(skip_serializing_if = "std::collections::HashMap::is_empty")]
    params: std::collections::HashMap<String, String>,
    service_count: usize,
}

#[derive(Serialize)]
struct TransportInfo {
    name: String,
    transport_type: String,
}

#[derive(Serialize)]
struct ServiceInfo {
    name: String,
    policy: String,
    transport: String,
    labels: Vec<String>,
    hosts: Vec<String>,
}

/// Execute the `info` command
pub fn run_info(args: &InfoArgs) -> Result<()> {
    info!(config = %args.config.display(), "Loading configuration info");

    let config = super::load_config(&args.config)?;

    if args.json {
        let info = build_config_info(&config, args);
        let json =
            serde_json::to_string_pretty(&info).context("Failed to serialize config info")?;
        println!("{}", json);
    } else {
        print_config_info(&config, args);
    }

    Ok(())
}

fn build_config_info(config: &RelayConfig, args: &InfoArgs) -> ConfigInfo {
    let services = if args.services {
        config
            .discovery
            .services
            .iter()
            .map(|s| ServiceInfo {
                name: s.name.clone(),
                policy: s.policy.to_string(),
                transport: s.transport.clone(),
                labels: s.labels.clone(),
                hosts: s.hosts.clone(),
            })
            .collect()
    } else {
        Vec::new()
    };

    ConfigInfo {
        version: format!("{:?}", config.version),
        relay: RelayInfo {
            default_endpoint: config.relay.default_endpoint.clone(),
            send_timeout_ms: config.relay.send_timeout_ms,
            short_circuit_any: config.relay.short_circuit_any,
            refresh_on_failure: config.relay.refresh_on_failure,
        },
        discovery: DiscoveryInfo {
            backend: format!("{:?}", config.discovery.backend),
            cache_ttl_ms: config.discovery.cache_ttl_ms,
            stale_grace_ms: config.discovery.stale_grace_ms,
            timeout_ms: config.discovery.timeout_ms,
            params: config.discovery.params.clone(),
            service_count: config.discovery.services.len(),
        },
        transports: config
            .transports
            .iter()
            .map(|t| TransportInfo {
                name: t.name.clone(),
                transport_type: format!("{:?}", t.transport_type),
            })
            .collect(),
        services,
    }
}

fn print_config_info(config: &RelayConfig, args: &InfoArgs) {
    println!("╔══════════════════════════════════════════════════════════════╗");
    println!("║                   Relay Configuration                        ║");
    println!("╚══════════════════════════════════════════════════════════════╝\n");

    let relay = &config.relay;
    println!("📨 Dispatch");
    println!("   ├─ Version: {:?}", config.version);
    println!("   ├─ Default endpoint: {}", relay.default_endpoint);
    println!("   ├─ Send timeout: {} ms", relay.send_timeout_ms);
    println!("   ├─ ANY short-circuit: {}", relay.short_circuit_any);
    println!("   └─ Refresh on failure: {}", relay.refresh_on_failure);

    let discovery = &config.discovery;
    println!("\n🔎 Discovery");
    println!("   ├─ Backend: {:?}", discovery.backend);
    for (key, value) in &discovery.params {
        println!("   ├─ {}: {}", key, value);
    }
    println!("   ├─ Cache TTL: {} ms", discovery.cache_ttl_ms);
    println!("   ├─ Stale grace: {} ms", discovery.stale_grace_ms);
    println!("   └─ Backend timeout: {} ms", discovery.timeout_ms);

    println!("\n🧩 Services ({})", discovery.services.len());
    for (i, service) in discovery.services.iter().enumerate() {
        let is_last = i == discovery.services.len() - 1;
        let prefix = if is_last { "└─" } else { "├─" };
        let child_prefix = if is_last { "   " } else { "│  " };

        println!(
            "   {} {} [{}] via {}",
            prefix, service.name, service.policy, service.transport
        );
        if args.services {
            println!("   {}  ├─ Labels: {}", child_prefix, service.labels.join(", "));
            println!("   {}  └─ Hosts: {}", child_prefix, service.hosts.join(", "));
        }
    }

    if !config.transports.is_empty() {
        println!("\n📤 Transports ({})", config.transports.len());
        for (i, transport) in config.transports.iter().enumerate() {
            let is_last = i == config.transports.len() - 1;
            let prefix = if is_last { "└─" } else { "├─" };
            println!(
                "   {} {} ({:?})",
                prefix, transport.name, transport.transport_type
            );
        }
    }

    println!();
}
