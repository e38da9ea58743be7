//! # taklink-client
//!
//! Async TAK protocol client core: maintains multiple simultaneous server
//! connections over TCP, UDP, TLS, and WebSocket, decodes inbound CoT XML on
//! per-connection background tasks, and delivers events to registered
//! observers without blocking the caller.
//!
//! The [`ConnectionRegistry`] is the process-wide authority mapping opaque
//! `u64` ids to live connections; it is the surface the FFI boundary wraps.
//!
//! ## Example
//!
//! ```rust,no_run
//! use taklink_client::ConnectionRegistry;
//! use taklink_core::{ConnectionConfig, Protocol};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), taklink_core::TakLinkError> {
//!     let registry = ConnectionRegistry::new();
//!
//!     let id = registry
//!         .connect(ConnectionConfig::new("127.0.0.1", 8087, Protocol::Tcp))
//!         .await?;
//!
//!     registry.register_callback(id, Box::new(|id, event, _xml| {
//!         println!("connection {id} received {}", event.uid);
//!     }))?;
//!
//!     registry.shutdown_all().await;
//!     Ok(())
//! }
//! ```

pub mod connection;
pub mod registry;
pub mod state;
pub mod transport;

mod tcp;
mod tls;
mod udp;
mod websocket;

// Re-export commonly used types
pub use connection::{Connection, CotObserver};
pub use registry::ConnectionRegistry;
pub use state::{ConnectionStatus, StatusSnapshot};
pub use transport::{Incoming, Transport, TransportReader, TransportWriter};

// Re-export bytes for convenience
pub use bytes::{Bytes, BytesMut};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_module_exports() {
        let _status = ConnectionStatus::new();
        let _registry = ConnectionRegistry::new();
    }
}
