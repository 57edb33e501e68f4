//! Command implementations.

mod info;
mod notify;
mod resolve;
mod validate;

pub use info::run_info;
pub use notify::run_notify;
pub use resolve::run_resolve;
pub use validate::run_validate;

use std::path::Path;

use anyhow::{Context, Result};
use contracts::RelayConfig;

use crate::error::CliError;

/// Load and validate the configuration at `path`
fn load_config(path: &Path) -> Result<RelayConfig> {
    if !path.exists() {
        return Err(CliError::config_not_found(path.display().to_string()).into());
    }

    config_loader::ConfigLoader::load_from_path(path)
        .with_context(|| format!("Failed to load config from {}", path.display()))
}
