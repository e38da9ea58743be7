//! Error taxonomy for the TakLink client stack.
//!
//! Every boundary-facing failure maps to a stable negative `i32` code so the
//! FFI layer can report it through status returns and `last_error_code`
//! without stringly-typed translation. Zero is success.

use crate::types::ConnectionState;
use std::io;
use thiserror::Error;

/// Result type alias using TakLinkError as the error type.
pub type Result<T> = std::result::Result<T, TakLinkError>;

/// Top-level error type for all TakLink operations.
#[derive(Debug, Error)]
pub enum TakLinkError {
    /// Transport, TLS, or DNS failure while establishing a connection
    #[error("Connection error: {0}")]
    Connect(#[from] ConnectError),

    /// Malformed inbound CoT; recovered locally, never fatal
    #[error("Decode error: {0}")]
    Decode(String),

    /// Malformed outbound request
    #[error("Encode error: {0}")]
    Encode(String),

    /// Unknown connection id
    #[error("Lookup error: {0}")]
    Lookup(#[from] LookupError),

    /// Handshake/send/teardown exceeded its bound
    #[error("Timeout error: {0}")]
    Timeout(#[from] TimeoutError),

    /// Operation invalid for the current connection state
    #[error("State error: {0}")]
    State(#[from] StateError),

    /// I/O error on an established transport
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl TakLinkError {
    /// Stable numeric code for the FFI boundary.
    pub fn code(&self) -> i32 {
        match self {
            TakLinkError::Lookup(LookupError::NotInitialized) => -1,
            TakLinkError::Lookup(LookupError::UnknownConnection { .. }) => -2,
            TakLinkError::Connect(_) => -4,
            TakLinkError::Io(_) => -5,
            TakLinkError::Decode(_) | TakLinkError::Encode(_) => -6,
            TakLinkError::Timeout(_) => -7,
            TakLinkError::State(_) => -8,
        }
    }
}

/// Errors raised while establishing a connection.
#[derive(Debug, Error)]
pub enum ConnectError {
    /// Failed to reach the server
    #[error("Failed to connect to {host}:{port}: {reason}")]
    Failed {
        host: String,
        port: u16,
        reason: String,
    },

    /// DNS resolution failed
    #[error("DNS resolution failed for {host}: {reason}")]
    DnsFailed { host: String, reason: String },

    /// TLS handshake failed
    #[error("TLS handshake failed: {reason}")]
    TlsHandshakeFailed { reason: String },

    /// Supplied PEM material was rejected
    #[error("Invalid certificate material: {reason}")]
    InvalidCertificate { reason: String },

    /// WebSocket upgrade failed
    #[error("WebSocket handshake failed: {reason}")]
    WebSocketHandshakeFailed { reason: String },

    /// Parameters can never produce a working transport
    #[error("Invalid connection target: {reason}")]
    InvalidTarget { reason: String },
}

impl ConnectError {
    /// Creates a connection failed error.
    pub fn failed(host: impl Into<String>, port: u16, reason: impl Into<String>) -> Self {
        Self::Failed {
            host: host.into(),
            port,
            reason: reason.into(),
        }
    }

    /// Creates a TLS handshake failed error.
    pub fn tls_handshake(reason: impl Into<String>) -> Self {
        Self::TlsHandshakeFailed {
            reason: reason.into(),
        }
    }

    /// Creates an invalid target error.
    pub fn invalid_target(reason: impl Into<String>) -> Self {
        Self::InvalidTarget {
            reason: reason.into(),
        }
    }
}

/// Errors raised when resolving a connection id.
#[derive(Debug, Error)]
pub enum LookupError {
    /// The library has not been initialized
    #[error("Library not initialized")]
    NotInitialized,

    /// The id was never allocated, or the registry has been shut down
    #[error("Unknown connection id {id}")]
    UnknownConnection { id: u64 },
}

/// Timeout errors for bounded operations.
#[derive(Debug, Error)]
pub enum TimeoutError {
    /// Connect or handshake exceeded its bound
    #[error("Connect timeout after {timeout_secs}s")]
    Connect { timeout_secs: u64 },

    /// A send stalled under backpressure
    #[error("Write timeout after {timeout_secs}s")]
    Write { timeout_secs: u64 },

    /// The read task did not exit within the teardown bound
    #[error("Shutdown timeout after {timeout_secs}s")]
    Shutdown { timeout_secs: u64 },
}

/// Operation attempted in an incompatible connection state.
#[derive(Debug, Error)]
pub enum StateError {
    /// The connection is not carrying traffic
    #[error("Connection is {state}, not connected")]
    NotConnected { state: ConnectionState },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes_are_stable() {
        assert_eq!(TakLinkError::from(LookupError::NotInitialized).code(), -1);
        assert_eq!(
            TakLinkError::from(LookupError::UnknownConnection { id: 7 }).code(),
            -2
        );
        assert_eq!(
            TakLinkError::from(ConnectError::failed("host", 8087, "refused")).code(),
            -4
        );
        assert_eq!(TakLinkError::Encode("bad xml".to_string()).code(), -6);
        assert_eq!(
            TakLinkError::from(TimeoutError::Connect { timeout_secs: 10 }).code(),
            -7
        );
        assert_eq!(
            TakLinkError::from(StateError::NotConnected {
                state: ConnectionState::Disconnected
            })
            .code(),
            -8
        );
    }

    #[test]
    fn test_connect_error_display() {
        let err = ConnectError::failed("takserver.local", 8089, "connection refused");
        let text = err.to_string();
        assert!(text.contains("takserver.local:8089"));
        assert!(text.contains("connection refused"));
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = io::Error::new(io::ErrorKind::BrokenPipe, "pipe closed");
        let err: TakLinkError = io_err.into();
        assert_eq!(err.code(), -5);
    }
}
