//! FileDiscovery - registry file re-read on every query

use std::path::{Path, PathBuf};

use config_loader::{parse_as, ConfigFormat, ConfigLoader};
use contracts::{ConsumerEntry, ContractError, DiscoveryBackend, DiscoveryError};
use tracing::{debug, instrument};

use super::{services_to_entries, ServiceRegistry};

/// Registry kept in a TOML/JSON file with a top-level `services` list.
///
/// Another process owns the file; the relay only reads it.
#[derive(Debug, Clone)]
pub struct FileDiscovery {
    path: PathBuf,
    format: ConfigFormat,
}

impl FileDiscovery {
    /// # Errors
    /// The extension is neither `.toml` nor `.json`.
    pub fn new(path: impl AsRef<Path>) -> Result<Self, ContractError> {
        let path = path.as_ref().to_path_buf();
        let format = ConfigLoader::detect_format(&path)?;
        Ok(Self { path, format })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read_registry(&self, label: &str) -> Result<ServiceRegistry, DiscoveryError> {
        let content = tokio::fs::read_to_string(&self.path).await.map_err(|e| {
            DiscoveryError::unreachable("file", format!("{}: {e}", self.path.display()))
        })?;

        parse_as(&content, self.format)
            .map_err(|e| DiscoveryError::malformed_record(label, e.to_string()))
    }
}

impl DiscoveryBackend for FileDiscovery {
    fn name(&self) -> &str {
        "file"
    }

    #[instrument(name = "file_discovery_list", skip(self), fields(path = %self.path.display()))]
    async fn list_consumers(&self, label: &str) -> Result<Vec<ConsumerEntry>, DiscoveryError> {
        let registry = self.read_registry(label).await?;
        let entries = services_to_entries(&registry.services, label);
        debug!(label, consumers = entries.len(), "Registry file read");
        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::FanoutPolicy;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn registry_file(suffix: &str, content: &str) -> NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(suffix).tempfile().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[tokio::test]
    async fn test_toml_registry() {
        let file = registry_file(
            ".toml",
            r#"
[[services]]
name = "indexer"
labels = ["FOO"]
hosts = ["h1", "h2"]
transport = "udp"
policy = "all"
"#,
        );

        let backend = FileDiscovery::new(file.path()).unwrap();
        let entries = backend.list_consumers("FOO").await.unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].policy, FanoutPolicy::All);
    }

    #[tokio::test]
    async fn test_json_registry_picks_up_changes() {
        let file = registry_file(".json", r#"{"services": []}"#);
        let backend = FileDiscovery::new(file.path()).unwrap();
        assert!(backend.list_consumers("FOO").await.unwrap().is_empty());

        std::fs::write(
            file.path(),
            r#"{"services":[{"name":"g1","labels":["FOO"],"hosts":["h1"],"transport":"log"}]}"#,
        )
        .unwrap();
        assert_eq!(backend.list_consumers("FOO").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_missing_file_is_unreachable() {
        let dir = tempfile::tempdir().unwrap();
        let backend = FileDiscovery::new(dir.path().join("gone.json")).unwrap();
        let err = backend.list_consumers("FOO").await.unwrap_err();
        assert!(matches!(err, DiscoveryError::Unreachable { .. }));
    }

    #[tokio::test]
    async fn test_garbage_is_malformed() {
        let file = registry_file(".json", "{ not json");
        let backend = FileDiscovery::new(file.path()).unwrap();
        let err = backend.list_consumers("FOO").await.unwrap_err();
        assert!(matches!(err, DiscoveryError::MalformedRecord { .. }));
    }

    #[test]
    fn test_rejects_unknown_extension() {
        assert!(FileDiscovery::new("services.yaml").is_err());
    }
}
