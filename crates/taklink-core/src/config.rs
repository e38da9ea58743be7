//! Connection configuration.

use crate::error::{ConnectError, Result};
use crate::types::Protocol;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// WebSocket-specific options.
///
/// The TAK specifications leave the WebSocket endpoint path open; it is
/// explicit configuration here rather than an assumption baked into the
/// transport. No subprotocol is offered.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebSocketOptions {
    /// Request path appended to the server authority (default "/")
    pub path: String,
}

impl Default for WebSocketOptions {
    fn default() -> Self {
        Self {
            path: "/".to_string(),
        }
    }
}

/// Timeout policy applied to connection operations.
///
/// Receives are unbounded (an idle TAK feed is normal); teardown instead
/// relies on the shutdown signal interrupting a blocked receive, bounded by
/// `shutdown`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Timeouts {
    /// Bound on TCP connect and TLS/WebSocket handshakes
    pub connect: Duration,
    /// Bound on a single send under backpressure
    pub write: Duration,
    /// Bound on waiting for the read task to exit during teardown
    pub shutdown: Duration,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            connect: Duration::from_secs(10),
            write: Duration::from_secs(10),
            shutdown: Duration::from_secs(5),
        }
    }
}

/// Connection configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionConfig {
    /// Server hostname or IP address
    pub host: String,
    /// Server port
    pub port: u16,
    /// Connection protocol
    pub protocol: Protocol,
    /// Whether to use TLS encryption
    pub use_tls: bool,
    /// Client certificate PEM (optional)
    pub cert_pem: Option<String>,
    /// Client private key PEM (optional)
    pub key_pem: Option<String>,
    /// CA certificate PEM (optional; absent means the webpki trust store)
    pub ca_pem: Option<String>,
    /// WebSocket options (when protocol is WebSocket)
    pub websocket: WebSocketOptions,
    /// Timeout policy
    pub timeouts: Timeouts,
}

impl ConnectionConfig {
    /// Create a new connection configuration
    pub fn new(host: impl Into<String>, port: u16, protocol: Protocol) -> Self {
        Self {
            host: host.into(),
            port,
            protocol,
            use_tls: protocol == Protocol::Tls,
            cert_pem: None,
            key_pem: None,
            ca_pem: None,
            websocket: WebSocketOptions::default(),
            timeouts: Timeouts::default(),
        }
    }

    /// Enable TLS with optional in-memory PEM material
    pub fn with_tls(
        mut self,
        cert_pem: Option<String>,
        key_pem: Option<String>,
        ca_pem: Option<String>,
    ) -> Self {
        self.use_tls = true;
        self.cert_pem = cert_pem;
        self.key_pem = key_pem;
        self.ca_pem = ca_pem;
        self
    }

    /// Set the WebSocket request path
    pub fn with_ws_path(mut self, path: impl Into<String>) -> Self {
        self.websocket.path = path.into();
        self
    }

    /// Override the timeout policy
    pub fn with_timeouts(mut self, timeouts: Timeouts) -> Self {
        self.timeouts = timeouts;
        self
    }

    /// Whether this configuration requires a TLS layer.
    pub fn wants_tls(&self) -> bool {
        self.use_tls || self.protocol == Protocol::Tls
    }

    /// Reject configurations that can never produce a working transport.
    pub fn validate(&self) -> Result<()> {
        if self.host.is_empty() {
            return Err(ConnectError::invalid_target("host is empty").into());
        }
        if self.port == 0 {
            return Err(ConnectError::invalid_target("port is zero").into());
        }
        if self.wants_tls() && self.cert_pem.is_some() != self.key_pem.is_some() {
            return Err(ConnectError::invalid_target(
                "client certificate and key must be supplied together",
            )
            .into());
        }
        Ok(())
    }
}
