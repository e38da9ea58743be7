//! Shared connection state and counters.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicI32, AtomicU64, Ordering};
use taklink_core::{ConnectionState, TakLinkError};

/// Live state block shared between a connection's handle, its read task, and
/// status queries. Counters are atomics so a snapshot never blocks on the
/// read loop.
#[derive(Debug)]
pub struct ConnectionStatus {
    state: parking_lot::RwLock<ConnectionState>,
    messages_sent: AtomicU64,
    messages_received: AtomicU64,
    bytes_sent: AtomicU64,
    bytes_received: AtomicU64,
    decode_errors: AtomicU64,
    last_error_code: AtomicI32,
}

impl Default for ConnectionStatus {
    fn default() -> Self {
        Self::new()
    }
}

impl ConnectionStatus {
    /// Create a new ConnectionStatus in the Disconnected state
    pub fn new() -> Self {
        Self {
            state: parking_lot::RwLock::new(ConnectionState::Disconnected),
            messages_sent: AtomicU64::new(0),
            messages_received: AtomicU64::new(0),
            bytes_sent: AtomicU64::new(0),
            bytes_received: AtomicU64::new(0),
            decode_errors: AtomicU64::new(0),
            last_error_code: AtomicI32::new(0),
        }
    }

    /// Get current connection state
    pub fn state(&self) -> ConnectionState {
        *self.state.read()
    }

    /// Set connection state
    pub fn set_state(&self, state: ConnectionState) {
        *self.state.write() = state;
    }

    /// Check if currently connected
    pub fn is_connected(&self) -> bool {
        self.state().is_connected()
    }

    /// Record a failure: stores the error code and parks the connection in
    /// the Failed state.
    pub fn set_error(&self, error: &TakLinkError) {
        self.last_error_code.store(error.code(), Ordering::Relaxed);
        self.set_state(ConnectionState::Failed);
    }

    /// Record a non-fatal error code without changing state.
    pub fn note_error(&self, error: &TakLinkError) {
        self.last_error_code.store(error.code(), Ordering::Relaxed);
    }

    /// Record a message sent
    pub fn record_message_sent(&self, bytes: usize) {
        self.messages_sent.fetch_add(1, Ordering::Relaxed);
        self.bytes_sent.fetch_add(bytes as u64, Ordering::Relaxed);
    }

    /// Record a message received
    pub fn record_message_received(&self) {
        self.messages_received.fetch_add(1, Ordering::Relaxed);
    }

    /// Record bytes received off the wire
    pub fn record_bytes_received(&self, bytes: usize) {
        self.bytes_received.fetch_add(bytes as u64, Ordering::Relaxed);
    }

    /// Record a dropped undecodable message
    pub fn record_decode_error(&self) {
        self.decode_errors.fetch_add(1, Ordering::Relaxed);
    }

    /// Get total messages sent
    pub fn messages_sent(&self) -> u64 {
        self.messages_sent.load(Ordering::Relaxed)
    }

    /// Get total messages received
    pub fn messages_received(&self) -> u64 {
        self.messages_received.load(Ordering::Relaxed)
    }

    /// Get total dropped undecodable messages
    pub fn decode_errors(&self) -> u64 {
        self.decode_errors.load(Ordering::Relaxed)
    }

    /// Get the last recorded error code (0 = none)
    pub fn last_error_code(&self) -> i32 {
        self.last_error_code.load(Ordering::Relaxed)
    }

    /// Point-in-time copy of state and counters
    pub fn snapshot(&self) -> StatusSnapshot {
        let state = self.state();
        StatusSnapshot {
            state,
            is_connected: state.is_connected(),
            messages_sent: self.messages_sent.load(Ordering::Relaxed),
            messages_received: self.messages_received.load(Ordering::Relaxed),
            bytes_sent: self.bytes_sent.load(Ordering::Relaxed),
            bytes_received: self.bytes_received.load(Ordering::Relaxed),
            decode_errors: self.decode_errors.load(Ordering::Relaxed),
            last_error_code: self.last_error_code.load(Ordering::Relaxed),
        }
    }
}

/// Snapshot of connection status at a point in time
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusSnapshot {
    pub state: ConnectionState,
    pub is_connected: bool,
    pub messages_sent: u64,
    pub messages_received: u64,
    pub bytes_sent: u64,
    pub bytes_received: u64,
    pub decode_errors: u64,
    pub last_error_code: i32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use taklink_core::LookupError;

    #[test]
    fn test_counters() {
        let status = ConnectionStatus::new();

        status.record_message_sent(100);
        status.record_message_sent(50);
        status.record_bytes_received(200);
        status.record_message_received();
        status.record_decode_error();

        let snapshot = status.snapshot();
        assert_eq!(snapshot.messages_sent, 2);
        assert_eq!(snapshot.bytes_sent, 150);
        assert_eq!(snapshot.messages_received, 1);
        assert_eq!(snapshot.bytes_received, 200);
        assert_eq!(snapshot.decode_errors, 1);
        assert_eq!(snapshot.last_error_code, 0);
    }

    #[test]
    fn test_state_transitions() {
        let status = ConnectionStatus::new();
        assert_eq!(status.state(), ConnectionState::Disconnected);
        assert!(!status.is_connected());

        status.set_state(ConnectionState::Connected);
        assert!(status.is_connected());
        assert!(status.snapshot().is_connected);
    }

    #[test]
    fn test_set_error_parks_failed() {
        let status = ConnectionStatus::new();
        status.set_state(ConnectionState::Connected);

        let err = TakLinkError::from(LookupError::UnknownConnection { id: 3 });
        status.set_error(&err);

        assert_eq!(status.state(), ConnectionState::Failed);
        assert_eq!(status.last_error_code(), err.code());
    }
}
