//! `validate` command implementation.

use anyhow::{Context, Result};
use contracts::{DiscoveryBackendType, RelayConfig};
use serde::Serialize;
use tracing::info;

use crate::cli::ValidateArgs;
use crate::error::CliError;

/// Validation result for JSON output
#[derive(Serialize)]
struct ValidationResult {
    valid: bool,
    config_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    warnings: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    summary: Option<ConfigSummary>,
}

#[derive(Serialize)]
struct ConfigSummary {
    version: String,
    backend: String,
    service_count: usize,
    transport_count: usize,
    default_endpoint: String,
}

/// Execute the `validate` command
pub fn run_validate(args: &ValidateArgs) -> Result<()> {
    info!(config = %args.config.display(), "Validating configuration");

    let result = validate_config(args);

    if args.json {
        let json = serde_json::to_string_pretty(&result)
            .context("Failed to serialize validation result")?;
        println!("{}", json);
    } else {
        print_validation_result(&result);
    }

    if result.valid {
        Ok(())
    } else {
        Err(CliError::config_validation(result.error.unwrap_or_default()).into())
    }
}

fn validate_config(args: &ValidateArgs) -> ValidationResult {
    let config_path = args.config.display().to_string();

    if !args.config.exists() {
        return ValidationResult {
            valid: false,
            config_path,
            error: Some(format!("File not found: {}", args.config.display())),
            warnings: None,
            summary: None,
        };
    }

    match config_loader::ConfigLoader::load_from_path(&args.config) {
        Ok(config) => {
            let warnings = collect_warnings(&config);
            ValidationResult {
                valid: true,
                config_path,
                error: None,
                warnings: if warnings.is_empty() {
                    None
                } else {
                    Some(warnings)
                },
                summary: Some(ConfigSummary {
                    version: format!("{:?}", config.version),
                    backend: format!("{:?}", config.discovery.backend),
                    service_count: config.discovery.services.len(),
                    transport_count: config.transports.len(),
                    default_endpoint: config.relay.default_endpoint.clone(),
                }),
            }
        }
        Err(e) => ValidationResult {
            valid: false,
            config_path,
            error: Some(e.to_string()),
            warnings: None,
            summary: None,
        },
    }
}

/// Collect configuration warnings (non-fatal issues)
fn collect_warnings(config: &RelayConfig) -> Vec<String> {
    let mut warnings = Vec::new();

    if config.transports.is_empty() {
        warnings.push("No transports configured - every send will fail".to_string());
    }

    let known: Vec<String> = config
        .transports
        .iter()
        .map(|t| t.name.to_ascii_lowercase())
        .collect();
    for service in &config.discovery.services {
        if !known.contains(&service.transport.to_ascii_lowercase()) {
            warnings.push(format!(
                "Service '{}' uses unregistered transport '{}'",
                service.name, service.transport
            ));
        }
    }

    if config.discovery.backend != DiscoveryBackendType::Static
        && !config.discovery.services.is_empty()
    {
        warnings.push(format!(
            "discovery.services is ignored by the {:?} backend",
            config.discovery.backend
        ));
    }

    if config.discovery.stale_grace_ms == 0 {
        warnings.push("discovery.stale_grace_ms is 0 - backend failures are never masked".to_string());
    }

    warnings
}

fn print_validation_result(result: &ValidationResult) {
    if result.valid {
        println!("✓ Configuration is valid: {}", result.config_path);

        if let Some(ref summary) = result.summary {
            println!("\n  Version: {}", summary.version);
            println!("  Discovery backend: {}", summary.backend);
            println!("  Static services: {}", summary.service_count);
            println!("  Transports: {}", summary.transport_count);
            println!("  Default endpoint: {}", summary.default_endpoint);
        }

        if let Some(ref warnings) = result.warnings {
            println!("\n⚠ Warnings:");
            for warning in warnings {
                println!("  - {}", warning);
            }
        }
    } else {
        println!("✗ Configuration is invalid: {}", result.config_path);
        if let Some(ref error) = result.error {
            println!("\n  Error: {}", error);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::{FanoutPolicy, ServiceConfig};

    #[test]
    fn test_warns_on_unregistered_transport() {
        let mut config = RelayConfig::default();
        config.discovery.services.push(ServiceConfig {
            name: "indexer".to_string(),
            labels: vec!["FOO".to_string()],
            hosts: vec!["h1".to_string()],
            transport: "carrier-pigeon".to_string(),
            policy: FanoutPolicy::Any,
        });

        let warnings = collect_warnings(&config);
        assert!(warnings.iter().any(|w| w.contains("carrier-pigeon")));
        assert!(warnings.iter().any(|w| w.contains("No transports")));
    }

    #[test]
    fn test_missing_file_is_invalid() {
        let args = ValidateArgs {
            config: "/nonexistent/relay.toml".into(),
            json: true,
        };
        let result = validate_config(&args);
        assert!(!result.valid);
        assert!(result.error.unwrap().contains("File not found"));
    }
}
