//! Configuration parsing
//!
//! TOML (primary) and JSON.

use contracts::{ContractError, RelayConfig};

/// Configuration file format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    /// TOML (recommended)
    Toml,
    Json,
}

impl ConfigFormat {
    /// Infer format from a file extension
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "toml" => Some(Self::Toml),
            "json" => Some(Self::Json),
            _ => None,
        }
    }
}

/// Parse TOML content into any deserializable config shape
pub fn parse_toml<T: serde::de::DeserializeOwned>(content: &str) -> Result<T, ContractError> {
    toml::from_str(content).map_err(|e| ContractError::ConfigParse {
        message: format!("TOML parse error: {e}"),
        source: Some(Box::new(e)),
    })
}

/// Parse JSON content into any deserializable config shape
pub fn parse_json<T: serde::de::DeserializeOwned>(content: &str) -> Result<T, ContractError> {
    serde_json::from_str(content).map_err(|e| ContractError::ConfigParse {
        message: format!("JSON parse error: {e}"),
        source: Some(Box::new(e)),
    })
}

/// Parse content according to `format`
pub fn parse(content: &str, format: ConfigFormat) -> Result<RelayConfig, ContractError> {
    parse_as(content, format)
}

/// Parse content of a known format into `T`.
///
/// Used for the relay config itself and for service registry files.
pub fn parse_as<T: serde::de::DeserializeOwned>(
    content: &str,
    format: ConfigFormat,
) -> Result<T, ContractError> {
    match format {
        ConfigFormat::Toml => parse_toml(content),
        ConfigFormat::Json => parse_json(content),
    }
}
