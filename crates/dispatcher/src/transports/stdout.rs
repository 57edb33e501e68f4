//! StdoutTransport - writes payloads to standard output

use bytes::Bytes;
use contracts::{Transport, TransportError};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

/// Writes each payload as one line on stdout.
///
/// Address and endpoint are ignored. Lines from concurrent sends never
/// interleave.
pub struct StdoutTransport {
    out: Mutex<tokio::io::Stdout>,
}

impl StdoutTransport {
    pub fn new() -> Self {
        Self {
            out: Mutex::new(tokio::io::stdout()),
        }
    }
}

impl Default for StdoutTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport for StdoutTransport {
    fn name(&self) -> &str {
        "stdout"
    }

    async fn send(
        &self,
        address: &str,
        _endpoint: &str,
        payload: &Bytes,
    ) -> Result<(), TransportError> {
        let mut line = Vec::with_capacity(payload.len() + 1);
        line.extend_from_slice(payload);
        line.push(b'\n');

        let mut out = self.out.lock().await;
        out.write_all(&line)
            .await
            .map_err(|e| TransportError::send("stdout", address, e.to_string()))?;
        out.flush()
            .await
            .map_err(|e| TransportError::send("stdout", address, e.to_string()))
    }
}
