//! Layered error definitions
//!
//! Categorized by source: config / discovery backend / transport

use thiserror::Error;

/// Configuration and general errors
#[derive(Debug, Error)]
pub enum ContractError {
    // ===== Configuration Errors =====
    /// Configuration parse error
    #[error("config parse error: {message}")]
    ConfigParse {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Configuration validation error
    #[error("config validation error at '{field}': {message}")]
    ConfigValidation { field: String, message: String },

    // ===== General Errors =====
    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Other error
    #[error("{0}")]
    Other(String),
}

impl ContractError {
    /// Create configuration parse error
    pub fn config_parse(message: impl Into<String>) -> Self {
        Self::ConfigParse {
            message: message.into(),
            source: None,
        }
    }

    /// Create configuration validation error
    pub fn config_validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ConfigValidation {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Failure of a discovery backend query
#[derive(Debug, Clone, Error)]
pub enum DiscoveryError {
    /// Backend could not be reached or answered with an error
    #[error("discovery backend '{backend}' unreachable: {message}")]
    Unreachable { backend: String, message: String },

    /// Backend did not answer within the configured bound
    #[error("discovery backend '{backend}' timed out after {timeout_ms}ms")]
    Timeout { backend: String, timeout_ms: u64 },

    /// Backend answered with a record the relay cannot use
    #[error("malformed consumer record for label '{label}': {message}")]
    MalformedRecord { label: String, message: String },
}

impl DiscoveryError {
    pub fn unreachable(backend: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Unreachable {
            backend: backend.into(),
            message: message.into(),
        }
    }

    pub fn malformed_record(label: impl Into<String>, message: impl Into<String>) -> Self {
        Self::MalformedRecord {
            label: label.into(),
            message: message.into(),
        }
    }
}

/// Failure of a single send.
///
/// Never aborts a dispatch: the dispatcher folds it into a delivery outcome.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// No transport registered for the record's kind
    #[error("unknown transport kind '{kind}'")]
    UnknownTransport { kind: String },

    /// Send exceeded the per-send timeout
    #[error("transport '{kind}' timed out after {timeout_ms}ms sending to '{address}'")]
    Timeout {
        kind: String,
        address: String,
        timeout_ms: u64,
    },

    /// Address or endpoint cannot be used by this transport
    #[error("transport '{kind}' rejected destination '{address}/{endpoint}': {message}")]
    InvalidDestination {
        kind: String,
        address: String,
        endpoint: String,
        message: String,
    },

    /// Remote side or local I/O failed
    #[error("transport '{kind}' failed sending to '{address}': {message}")]
    Send {
        kind: String,
        address: String,
        message: String,
    },

    /// Send task ended without reporting (panicked or aborted)
    #[error("send task for '{address}' ended abnormally: {message}")]
    TaskFailed { address: String, message: String },
}

impl TransportError {
    pub fn unknown(kind: impl Into<String>) -> Self {
        Self::UnknownTransport { kind: kind.into() }
    }

    pub fn send(
        kind: impl Into<String>,
        address: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::Send {
            kind: kind.into(),
            address: address.into(),
            message: message.into(),
        }
    }

    pub fn invalid_destination(
        kind: impl Into<String>,
        address: impl Into<String>,
        endpoint: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::InvalidDestination {
            kind: kind.into(),
            address: address.into(),
            endpoint: endpoint.into(),
            message: message.into(),
        }
    }

    /// Short tag used as a metrics label
    pub fn reason(&self) -> &'static str {
        match self {
            Self::UnknownTransport { .. } => "unknown_transport",
            Self::Timeout { .. } => "timeout",
            Self::InvalidDestination { .. } => "invalid_destination",
            Self::Send { .. } => "send",
            Self::TaskFailed { .. } => "task_failed",
        }
    }
}
