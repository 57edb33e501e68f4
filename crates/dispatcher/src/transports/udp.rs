//! UdpTransport - fire-and-forget datagrams

use std::collections::HashMap;
use std::net::SocketAddr;

use bytes::Bytes;
use contracts::{Transport, TransportError};
use tokio::net::UdpSocket;
use tokio::sync::OnceCell;
use tracing::{debug, instrument, warn};

const KIND: &str = "udp";

/// Configuration for UdpTransport
#[derive(Debug, Clone)]
pub struct UdpTransportConfig {
    /// Local bind address
    pub bind: SocketAddr,
    /// Max datagram size (UDP typically 65507 for IPv4)
    pub max_datagram_size: usize,
}

impl Default for UdpTransportConfig {
    fn default() -> Self {
        Self {
            bind: SocketAddr::from(([0, 0, 0, 0], 0)),
            max_datagram_size: 65_507,
        }
    }
}

impl UdpTransportConfig {
    /// Create config from params map
    pub fn from_params(params: &HashMap<String, String>) -> Result<Self, String> {
        let mut config = Self::default();

        if let Some(bind) = params.get("bind") {
            config.bind = bind
                .parse()
                .map_err(|e| format!("invalid bind address '{}': {}", bind, e))?;
        }

        if let Some(size) = params.get("max_datagram_size") {
            config.max_datagram_size = size
                .parse()
                .map_err(|e| format!("invalid max_datagram_size '{}': {}", size, e))?;
        }

        Ok(config)
    }
}

/// Sends the payload as one datagram to `address` (`host:port`).
///
/// The socket is bound on first use and shared by every later send.
/// The endpoint is not part of the datagram.
pub struct UdpTransport {
    config: UdpTransportConfig,
    socket: OnceCell<UdpSocket>,
}

impl UdpTransport {
    pub fn new(config: UdpTransportConfig) -> Self {
        Self {
            config,
            socket: OnceCell::new(),
        }
    }

    /// Create from params (for factory)
    pub fn from_params(params: &HashMap<String, String>) -> Result<Self, String> {
        Ok(Self::new(UdpTransportConfig::from_params(params)?))
    }

    pub fn config(&self) -> &UdpTransportConfig {
        &self.config
    }

    async fn socket(&self, address: &str) -> Result<&UdpSocket, TransportError> {
        self.socket
            .get_or_try_init(|| async {
                let socket = UdpSocket::bind(self.config.bind).await?;
                debug!(local = ?socket.local_addr().ok(), "UdpTransport bound");
                Ok::<_, std::io::Error>(socket)
            })
            .await
            .map_err(|e| TransportError::send(KIND, address, format!("bind failed: {e}")))
    }
}

impl Transport for UdpTransport {
    fn name(&self) -> &str {
        KIND
    }

    #[instrument(name = "udp_transport_send", skip(self, payload))]
    async fn send(
        &self,
        address: &str,
        endpoint: &str,
        payload: &Bytes,
    ) -> Result<(), TransportError> {
        if payload.len() > self.config.max_datagram_size {
            warn!(
                size = payload.len(),
                max = self.config.max_datagram_size,
                "Payload too large for one datagram"
            );
            return Err(TransportError::send(
                KIND,
                address,
                format!(
                    "payload of {} bytes exceeds max datagram size {}",
                    payload.len(),
                    self.config.max_datagram_size
                ),
            ));
        }

        let socket = self.socket(address).await?;
        let sent = socket
            .send_to(payload, address)
            .await
            .map_err(|e| TransportError::send(KIND, address, e.to_string()))?;

        debug!(bytes = sent, "Sent");
        Ok(())
    }
}
