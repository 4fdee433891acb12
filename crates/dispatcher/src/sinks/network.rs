//! NetworkSink - UDP fire-and-forget streaming

use contracts::{ContractError, Message, MessageSink};
use std::collections::HashMap;
use std::net::SocketAddr;
use tokio::net::UdpSocket;
use tracing::{debug, instrument, warn};

/// Serialization format for network transmission
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NetworkFormat {
    /// JSON (human-readable, larger)
    #[default]
    Json,
    /// Bincode (binary, compact)
    Bincode,
}

/// Configuration for NetworkSink
#[derive(Debug, Clone)]
pub struct NetworkSinkConfig {
    /// Target address
    pub addr: SocketAddr,
    /// Serialization format
    pub format: NetworkFormat,
    /// Max packet size (UDP typically 65507 for IPv4)
    pub max_packet_size: usize,
}

impl NetworkSinkConfig {
    /// Create config from params map
    pub fn from_params(params: &HashMap<String, String>) -> Result<Self, String> {
        let addr_str = params
            .get("addr")
            .ok_or_else(|| "missing 'addr' parameter".to_string())?;

        let addr: SocketAddr = addr_str
            .parse()
            .map_err(|e| format!("invalid address '{}': {}", addr_str, e))?;

        let format = match params.get("format").map(String::as_str) {
            Some("bincode") => NetworkFormat::Bincode,
            Some("json") | None => NetworkFormat::Json,
            Some(other) => return Err(format!("unknown format '{}'", other)),
        };

        let max_packet_size = params
            .get("max_packet_size")
            .and_then(|s| s.parse().ok())
            .unwrap_or(65000);

        Ok(Self {
            addr,
            format,
            max_packet_size,
        })
    }
}

/// Sink that sends messages over UDP
///
/// The socket is bound on `start` and dropped on stop.
pub struct NetworkSink {
    name: String,
    config: NetworkSinkConfig,
    socket: Option<UdpSocket>,
}

impl NetworkSink {
    /// Create a new, unconnected NetworkSink
    pub fn new(name: impl Into<String>, config: NetworkSinkConfig) -> Self {
        Self {
            name: name.into(),
            config,
            socket: None,
        }
    }

    /// Create from params (for factory)
    pub fn from_params(
        name: impl Into<String>,
        params: &HashMap<String, String>,
    ) -> Result<Self, ContractError> {
        let name = name.into();
        let config = NetworkSinkConfig::from_params(params)
            .map_err(|e| ContractError::config_validation(format!("sink '{name}'.params"), e))?;
        Ok(Self::new(name, config))
    }

    fn serialize_message(&self, msg: &Message) -> Result<Vec<u8>, String> {
        match self.config.format {
            NetworkFormat::Json => serde_json::to_vec(msg).map_err(|e| format!("json error: {}", e)),
            NetworkFormat::Bincode => {
                bincode::serialize(msg).map_err(|e| format!("bincode error: {}", e))
            }
        }
    }

    fn socket(&self) -> Result<&UdpSocket, ContractError> {
        self.socket
            .as_ref()
            .ok_or_else(|| ContractError::sink_send(&self.name, "socket not connected"))
    }
}

impl MessageSink for NetworkSink {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(name = "network_sink_start", skip(self), fields(sink = %self.name))]
    async fn start(&mut self) -> Result<(), ContractError> {
        let bind_addr = if self.config.addr.is_ipv6() {
            "[::]:0"
        } else {
            "0.0.0.0:0"
        };
        let socket = UdpSocket::bind(bind_addr).await.map_err(|e| ContractError::SinkConnection {
            sink_name: self.name.clone(),
            message: e.to_string(),
        })?;
        socket
            .connect(self.config.addr)
            .await
            .map_err(|e| ContractError::SinkConnection {
                sink_name: self.name.clone(),
                message: e.to_string(),
            })?;

        debug!(sink = %self.name, target = %self.config.addr, "NetworkSink connected");
        self.socket = Some(socket);
        Ok(())
    }

    async fn signal_stop(&mut self) {}

    #[instrument(name = "network_sink_stop", skip(self), fields(sink = %self.name))]
    async fn wait_for_complete_stop(&mut self) -> Result<(), ContractError> {
        self.socket = None;
        debug!(sink = %self.name, "NetworkSink closed");
        Ok(())
    }

    #[instrument(
        name = "network_sink_send",
        skip(self, msg),
        fields(sink = %self.name, message_id = %msg.id)
    )]
    async fn send_msg(&mut self, msg: &Message) -> Result<bool, ContractError> {
        let data = self
            .serialize_message(msg)
            .map_err(|e| ContractError::sink_send(&self.name, e))?;

        if data.len() > self.config.max_packet_size {
            warn!(
                sink = %self.name,
                size = data.len(),
                max = self.config.max_packet_size,
                "Packet too large, declined"
            );
            return Ok(false);
        }

        let sent = self
            .socket()?
            .send(&data)
            .await
            .map_err(|e| ContractError::sink_send(&self.name, format!("udp send failed: {e}")))?;
        debug!(sink = %self.name, bytes = sent, "Sent");
        Ok(true)
    }
}
