//! `notify` command implementation.

use std::io::Read;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use bytes::Bytes;
use dispatcher::{DispatchError, Dispatcher};
use observability::RelayMetricsAggregator;
use tracing::{info, warn};

use crate::cli::NotifyArgs;
use crate::error::CliError;

/// Execute the `notify` command
pub async fn run_notify(args: &NotifyArgs) -> Result<()> {
    let mut config = super::load_config(&args.config)?;

    // Apply CLI overrides
    if let Some(timeout_ms) = args.send_timeout_ms {
        info!(timeout_ms, "Overriding send timeout from CLI");
        config.relay.send_timeout_ms = timeout_ms;
    }
    if args.short_circuit {
        config.relay.short_circuit_any = true;
    }
    config_loader::ConfigLoader::validate(&config).context("Invalid CLI overrides")?;

    let payload = read_payload(args.payload.as_deref())?;
    let dispatcher = Dispatcher::from_config(&config).context("Failed to build dispatcher")?;

    info!(
        label = %args.label,
        bytes = payload.len(),
        count = args.count,
        backend = dispatcher.directory().backend_name(),
        "Notifying"
    );

    let mut aggregator = RelayMetricsAggregator::new();
    for _ in 0..args.count {
        let started = Instant::now();
        let outcome = dispatcher
            .notify(args.label.as_str(), payload.clone(), args.endpoint.as_deref())
            .await;
        let latency_ms = elapsed_ms(started.elapsed());

        match outcome {
            Ok(result) => {
                aggregator.update(&result, latency_ms);
                report(&result, args.json)?;
            }
            Err(err @ DispatchError::AggregateDeliveryFailure { .. }) => {
                warn!(error = %err, "Fan-out policy not met");
                if let Some(result) = err.dispatch_result() {
                    aggregator.update(result, latency_ms);
                    report(result, args.json)?;
                }
            }
            Err(err @ DispatchError::DiscoveryUnavailable { .. }) => {
                warn!(error = %err, "Discovery unavailable");
                aggregator.update_unavailable();
            }
            Err(err) => return Err(err.into()),
        }
    }

    let summary = aggregator.summary();
    if args.count > 1 && !args.json {
        println!("{summary}");
    }

    if summary.failed_notifies > 0 {
        return Err(CliError::notify_failed(
            &args.label,
            summary.failed_notifies,
            summary.total_notifies,
        )
        .into());
    }
    Ok(())
}

/// Payload from the argument, or stdin when absent or `-`
fn read_payload(arg: Option<&str>) -> Result<Bytes> {
    match arg {
        Some(payload) if payload != "-" => Ok(Bytes::copy_from_slice(payload.as_bytes())),
        _ => {
            let mut buf = Vec::new();
            std::io::stdin()
                .read_to_end(&mut buf)
                .map_err(CliError::from)
                .context("Failed to read payload from stdin")?;
            Ok(Bytes::from(buf))
        }
    }
}

fn report(result: &contracts::DispatchResult, json: bool) -> Result<()> {
    if json {
        let line = serde_json::to_string(result).context("Failed to serialize dispatch result")?;
        println!("{line}");
        return Ok(());
    }

    let verdict = if result.succeeded { "✓" } else { "✗" };
    println!(
        "{} {} → {} consumers ({} delivered, {} failed, {} cancelled)",
        verdict,
        result.label,
        result.outcomes.len(),
        result.delivered_count(),
        result.failed_count(),
        result.cancelled_count()
    );
    for outcome in result.failed() {
        if let Some(error) = outcome.error() {
            println!("   └─ {}: {}", outcome.record, error);
        }
    }
    Ok(())
}

fn elapsed_ms(elapsed: Duration) -> f64 {
    elapsed.as_secs_f64() * 1000.0
}
