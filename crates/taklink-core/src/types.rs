//! Protocol and connection state types shared across the workspace.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Protocol type for TAK server connections
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Protocol {
    /// TCP connection
    Tcp,
    /// UDP connection
    Udp,
    /// TLS-secured TCP connection
    Tls,
    /// WebSocket connection
    WebSocket,
}

impl Protocol {
    /// Map the FFI protocol discriminant (0=TCP, 1=UDP, 2=TLS, 3=WebSocket).
    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            0 => Some(Protocol::Tcp),
            1 => Some(Protocol::Udp),
            2 => Some(Protocol::Tls),
            3 => Some(Protocol::WebSocket),
            _ => None,
        }
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Protocol::Tcp => write!(f, "tcp"),
            Protocol::Udp => write!(f, "udp"),
            Protocol::Tls => write!(f, "tls"),
            Protocol::WebSocket => write!(f, "ws"),
        }
    }
}

impl From<&str> for Protocol {
    fn from(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "udp" => Protocol::Udp,
            "tls" | "ssl" => Protocol::Tls,
            "ws" | "wss" | "websocket" => Protocol::WebSocket,
            _ => Protocol::Tcp,
        }
    }
}

/// Connection state machine.
///
/// `Connecting -> Connected -> Disconnecting -> Disconnected`, with `Failed`
/// terminal from Connecting or Connected on unrecoverable transport error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConnectionState {
    /// Not connected
    Disconnected,
    /// Connecting to server
    Connecting,
    /// Connected and operational
    Connected,
    /// Teardown in progress
    Disconnecting,
    /// Unrecoverable transport error
    Failed,
}

impl ConnectionState {
    /// True while the read loop is expected to be running.
    pub fn is_connected(&self) -> bool {
        matches!(self, ConnectionState::Connected)
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectionState::Disconnected => write!(f, "disconnected"),
            ConnectionState::Connecting => write!(f, "connecting"),
            ConnectionState::Connected => write!(f, "connected"),
            ConnectionState::Disconnecting => write!(f, "disconnecting"),
            ConnectionState::Failed => write!(f, "failed"),
        }
    }
}
