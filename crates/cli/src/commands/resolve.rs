//! `resolve` command implementation.

use anyhow::{Context, Result};
use contracts::Label;
use discovery::DiscoveryDirectory;
use tracing::info;

use crate::cli::ResolveArgs;

/// Execute the `resolve` command
pub async fn run_resolve(args: &ResolveArgs) -> Result<()> {
    let config = super::load_config(&args.config)?;
    let directory = DiscoveryDirectory::from_config(&config.discovery)
        .context("Failed to build discovery backend")?;

    let label = Label::from(args.label.as_str());
    let records = directory
        .resolve(&label)
        .await
        .with_context(|| format!("Failed to resolve '{}'", label))?;

    info!(label = %label, consumers = records.len(), "Resolved");

    if args.json {
        let json =
            serde_json::to_string_pretty(&*records).context("Failed to serialize consumers")?;
        println!("{json}");
        return Ok(());
    }

    if records.is_empty() {
        println!("No consumers subscribed to '{}'", label);
        return Ok(());
    }

    println!("Consumers of '{}' ({}):", label, records.len());
    for (i, record) in records.iter().enumerate() {
        let prefix = if i == records.len() - 1 { "└─" } else { "├─" };
        println!(
            "   {} {} [{}] {} via {}",
            prefix, record.fanout_group, record.policy, record.address, record.transport_kind
        );
    }
    Ok(())
}
