//! Dispatcher error types

use contracts::{ContractError, DeliveryOutcome, DiscoveryError, DispatchResult, Label};
use thiserror::Error;

/// Failure of a `notify` call or of building a dispatcher
#[derive(Debug, Error)]
pub enum DispatchError {
    /// Backend failed and no cached entry was usable; nothing was sent
    #[error("discovery unavailable for label '{label}': {source}")]
    DiscoveryUnavailable {
        label: Label,
        #[source]
        source: DiscoveryError,
    },

    /// At least one fan-out group's policy was not met.
    /// Successful deliveries are kept in `result`.
    #[error("delivery failed for label '{label}': {}", describe_failures(.failed))]
    AggregateDeliveryFailure {
        label: Label,
        failed: Vec<DeliveryOutcome>,
        result: DispatchResult,
    },

    /// Transport creation error
    #[error("failed to create transport '{kind}': {message}")]
    TransportCreation { kind: String, message: String },

    /// Configuration error (from contract)
    #[error("configuration error: {0}")]
    Contract(#[from] ContractError),

    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl DispatchError {
    /// Create a transport creation error
    pub fn transport_creation(kind: impl Into<String>, message: impl Into<String>) -> Self {
        Self::TransportCreation {
            kind: kind.into(),
            message: message.into(),
        }
    }

    /// Outcomes that made the policy fail, empty for other variants
    pub fn failed_outcomes(&self) -> &[DeliveryOutcome] {
        match self {
            Self::AggregateDeliveryFailure { failed, .. } => failed,
            _ => &[],
        }
    }

    /// Full per-record result when sends were attempted
    pub fn dispatch_result(&self) -> Option<&DispatchResult> {
        match self {
            Self::AggregateDeliveryFailure { result, .. } => Some(result),
            _ => None,
        }
    }

    pub fn is_discovery_unavailable(&self) -> bool {
        matches!(self, Self::DiscoveryUnavailable { .. })
    }
}

fn describe_failures(failed: &[DeliveryOutcome]) -> String {
    failed
        .iter()
        .map(|outcome| match outcome.error() {
            Some(err) => format!("{} ({})", outcome.record, err),
            None => outcome.record.to_string(),
        })
        .collect::<Vec<_>>()
        .join("; ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::{ConsumerRecord, FanoutPolicy, TransportError};

    #[test]
    fn test_aggregate_failure_names_consumers() {
        let record = ConsumerRecord {
            label: "FOO".into(),
            address: "host2".to_string(),
            transport_kind: "http".to_string(),
            fanout_group: "g1".to_string(),
            policy: FanoutPolicy::All,
        };
        let failed = vec![DeliveryOutcome::failed(
            record,
            TransportError::unknown("http"),
        )];
        let err = DispatchError::AggregateDeliveryFailure {
            label: "FOO".into(),
            failed: failed.clone(),
            result: DispatchResult::empty("FOO".into(), "key"),
        };

        let message = err.to_string();
        assert!(message.contains("host2"));
        assert!(message.contains("unknown transport kind 'http'"));
        assert_eq!(err.failed_outcomes(), failed.as_slice());
        assert!(!err.is_discovery_unavailable());
    }
}
