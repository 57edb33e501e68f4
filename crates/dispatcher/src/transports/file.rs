//! FileTransport - appends payloads to files named by the endpoint

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use bytes::Bytes;
use contracts::{Transport, TransportError};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::{debug, error, instrument};

const KIND: &str = "file";

/// Addresses that mean "this machine, absolute path".
///
/// Discovery never yields an empty address, so `""` only arrives through
/// direct [`Transport::send`] or `TransportRegistry::send` calls.
const LOCAL_ADDRESSES: [&str; 4] = ["", "localhost", "127.0.0.1", "/"];

/// Transport that appends `payload + '\n'` to a file.
///
/// The endpoint is the file path. A local address (`""`, `localhost`,
/// `127.0.0.1`, `/`) makes it absolute; `.` makes it relative to the base
/// directory. Any other address is rejected.
pub struct FileTransport {
    base_dir: PathBuf,
    created_dirs: Mutex<HashSet<PathBuf>>,
}

impl FileTransport {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
            created_dirs: Mutex::new(HashSet::new()),
        }
    }

    /// Create from params map (`base_dir`, default `.`)
    pub fn from_params(params: &HashMap<String, String>) -> Self {
        let base_dir = params
            .get("base_dir")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("."));
        Self::new(base_dir)
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Map `(address, endpoint)` to the target file
    pub fn resolve_path(&self, address: &str, endpoint: &str) -> Result<PathBuf, TransportError> {
        if endpoint.trim().is_empty() {
            return Err(TransportError::invalid_destination(
                KIND,
                address,
                endpoint,
                "endpoint must name a file",
            ));
        }

        if LOCAL_ADDRESSES.contains(&address) {
            Ok(Path::new("/").join(endpoint.trim_start_matches('/')))
        } else if address == "." {
            Ok(self.base_dir.join(endpoint))
        } else {
            Err(TransportError::invalid_destination(
                KIND,
                address,
                endpoint,
                "remote hosts are not supported; use '.' for a relative path",
            ))
        }
    }

    async fn ensure_parent(&self, path: &Path) -> std::io::Result<()> {
        let Some(parent) = path.parent() else {
            return Ok(());
        };
        let mut created = self.created_dirs.lock().await;
        if !created.contains(parent) {
            tokio::fs::create_dir_all(parent).await?;
            created.insert(parent.to_path_buf());
        }
        Ok(())
    }

    async fn append(&self, path: &Path, payload: &Bytes) -> std::io::Result<()> {
        self.ensure_parent(path).await?;

        let mut line = Vec::with_capacity(payload.len() + 1);
        line.extend_from_slice(payload);
        line.push(b'\n');

        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .await?;
        file.write_all(&line).await?;
        file.flush().await
    }
}

impl Transport for FileTransport {
    fn name(&self) -> &str {
        KIND
    }

    #[instrument(name = "file_transport_send", skip(self, payload))]
    async fn send(
        &self,
        address: &str,
        endpoint: &str,
        payload: &Bytes,
    ) -> Result<(), TransportError> {
        let path = self.resolve_path(address, endpoint)?;
        self.append(&path, payload).await.map_err(|e| {
            error!(path = %path.display(), error = %e, "Append failed");
            TransportError::send(KIND, address, e.to_string())
        })?;
        debug!(path = %path.display(), bytes = payload.len(), "Appended");
        Ok(())
    }
}
