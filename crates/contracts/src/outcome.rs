//! Delivery outcomes and the aggregate dispatch result

use serde::Serialize;

use crate::{ConsumerRecord, Label, TransportError};

/// Result of one send attempt
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "error", rename_all = "snake_case")]
pub enum DeliveryStatus {
    Delivered,
    #[serde(serialize_with = "serialize_error")]
    Failed(TransportError),
    /// Dropped after another member of an ANY group succeeded.
    /// Neither a success nor a failure.
    Cancelled,
}

fn serialize_error<S>(err: &TransportError, serializer: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    serializer.collect_str(err)
}

/// Outcome of delivering to one consumer record
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeliveryOutcome {
    pub record: ConsumerRecord,
    #[serde(flatten)]
    pub status: DeliveryStatus,
}

impl DeliveryOutcome {
    pub fn delivered(record: ConsumerRecord) -> Self {
        Self {
            record,
            status: DeliveryStatus::Delivered,
        }
    }

    pub fn failed(record: ConsumerRecord, error: TransportError) -> Self {
        Self {
            record,
            status: DeliveryStatus::Failed(error),
        }
    }

    pub fn cancelled(record: ConsumerRecord) -> Self {
        Self {
            record,
            status: DeliveryStatus::Cancelled,
        }
    }

    pub fn is_delivered(&self) -> bool {
        matches!(self.status, DeliveryStatus::Delivered)
    }

    pub fn is_failed(&self) -> bool {
        matches!(self.status, DeliveryStatus::Failed(_))
    }

    pub fn error(&self) -> Option<&TransportError> {
        match &self.status {
            DeliveryStatus::Failed(e) => Some(e),
            _ => None,
        }
    }
}

/// Aggregate of every outcome of one `notify` call
#[derive(Debug, Clone, Default, Serialize)]
pub struct DispatchResult {
    pub label: Label,

    /// Endpoint the message was sent to
    pub endpoint: String,

    /// True iff every fan-out group was satisfied
    pub succeeded: bool,

    /// One outcome per resolved record, in resolution order
    pub outcomes: Vec<DeliveryOutcome>,
}

impl DispatchResult {
    /// Result of a dispatch nobody listened to
    pub fn empty(label: Label, endpoint: impl Into<String>) -> Self {
        Self {
            label,
            endpoint: endpoint.into(),
            succeeded: true,
            outcomes: Vec::new(),
        }
    }

    /// Failed outcomes, including failures tolerated by a satisfied ANY group
    pub fn failed(&self) -> impl Iterator<Item = &DeliveryOutcome> {
        self.outcomes.iter().filter(|o| o.is_failed())
    }

    pub fn delivered_count(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_delivered()).count()
    }

    pub fn failed_count(&self) -> usize {
        self.failed().count()
    }

    pub fn cancelled_count(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o.status, DeliveryStatus::Cancelled))
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::FanoutPolicy;

    fn record(address: &str) -> ConsumerRecord {
        ConsumerRecord {
            label: "FOO".into(),
            address: address.to_string(),
            transport_kind: "udp".to_string(),
            fanout_group: "g1".to_string(),
            policy: FanoutPolicy::Any,
        }
    }

    #[test]
    fn test_counts() {
        let result = DispatchResult {
            label: "FOO".into(),
            endpoint: "key".into(),
            succeeded: true,
            outcomes: vec![
                DeliveryOutcome::delivered(record("a")),
                DeliveryOutcome::failed(record("b"), TransportError::unknown("x")),
                DeliveryOutcome::cancelled(record("c")),
            ],
        };
        assert_eq!(result.delivered_count(), 1);
        assert_eq!(result.failed_count(), 1);
        assert_eq!(result.cancelled_count(), 1);
        assert_eq!(result.failed().next().unwrap().record.address, "b");
    }

    #[test]
    fn test_outcome_serializes_error_as_text() {
        let outcome = DeliveryOutcome::failed(record("b"), TransportError::unknown("x"));
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["status"], "failed");
        assert_eq!(json["error"], "unknown transport kind 'x'");
        assert_eq!(json["record"]["address"], "b");
    }
}
