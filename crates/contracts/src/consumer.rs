//! ConsumerRecord - Discovery Directory output
//!
//! One record per live consumer instance subscribed to a label.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::{ContractError, DiscoveryError, Label};

/// Fan-out policy of a consumer group
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FanoutPolicy {
    /// One successful member satisfies the group
    #[default]
    Any,
    /// Every member must succeed
    All,
}

impl fmt::Display for FanoutPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Any => f.write_str("any"),
            Self::All => f.write_str("all"),
        }
    }
}

impl FromStr for FanoutPolicy {
    type Err = ContractError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "any" => Ok(Self::Any),
            "all" => Ok(Self::All),
            other => Err(ContractError::config_validation(
                "policy",
                format!("unknown fan-out policy '{other}', expected 'any' or 'all'"),
            )),
        }
    }
}

/// What a discovery backend reports for one instance.
///
/// The label is implied by the query; the directory stamps it on when
/// turning entries into [`ConsumerRecord`]s.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsumerEntry {
    pub address: String,
    pub transport_kind: String,
    pub fanout_group: String,
    #[serde(default)]
    pub policy: FanoutPolicy,
}

/// A subscription target resolved for a label
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConsumerRecord {
    /// Label the record was resolved for
    pub label: Label,

    /// Transport-specific location (host:port, broker, directory...)
    pub address: String,

    /// Transport kind identifier, looked up in the transport registry
    pub transport_kind: String,

    /// Logical consumer service this instance belongs to
    pub fanout_group: String,

    /// Success criterion for the group
    pub policy: FanoutPolicy,
}

impl ConsumerRecord {
    /// Build a record from a backend entry.
    ///
    /// # Errors
    /// Empty address, transport kind or group.
    pub fn from_entry(label: &Label, entry: ConsumerEntry) -> Result<Self, DiscoveryError> {
        if entry.address.trim().is_empty() {
            return Err(DiscoveryError::malformed_record(
                label.as_str(),
                format!("group '{}' reported an empty address", entry.fanout_group),
            ));
        }
        if entry.transport_kind.trim().is_empty() {
            return Err(DiscoveryError::malformed_record(
                label.as_str(),
                format!("instance '{}' has no transport kind", entry.address),
            ));
        }
        if entry.fanout_group.trim().is_empty() {
            return Err(DiscoveryError::malformed_record(
                label.as_str(),
                format!("instance '{}' has no fan-out group", entry.address),
            ));
        }

        Ok(Self {
            label: label.clone(),
            address: entry.address,
            transport_kind: entry.transport_kind,
            fanout_group: entry.fanout_group,
            policy: entry.policy,
        })
    }
}

impl fmt::Display for ConsumerRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}[{}]@{} via {}",
            self.fanout_group, self.policy, self.address, self.transport_kind
        )
    }
}
