//! Process-wide connection registry.

use crate::connection::{Connection, CotObserver};
use crate::state::StatusSnapshot;
use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use taklink_core::{ConnectionConfig, LookupError, Result};
use taklink_cot::CotEvent;
use tracing::{info, warn};

/// The single authority mapping connection ids to live connections.
///
/// Ids are non-zero, allocated monotonically, and never reused for the life
/// of the process, so a stale handle can never alias a newer connection. The
/// table lock is never held across network I/O: entries are cloned out as
/// `Arc<Connection>` before any await.
///
/// A disconnected connection stays in the table as an inert record (so a
/// repeated disconnect is a no-op and a send reports a state error rather
/// than an unknown id); `shutdown_all` clears the table, after which every
/// old id fails lookup.
pub struct ConnectionRegistry {
    connections: DashMap<u64, Arc<Connection>>,
    next_id: AtomicU64,
}

impl Default for ConnectionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ConnectionRegistry {
    /// Create an empty registry. Ids start at 1; 0 is the invalid sentinel.
    pub fn new() -> Self {
        Self {
            connections: DashMap::new(),
            next_id: AtomicU64::new(1),
        }
    }

    /// Open a connection and return its fresh id.
    ///
    /// On any failure nothing is inserted and the error propagates; the id
    /// burned by the attempt is simply never used again.
    pub async fn connect(&self, config: ConnectionConfig) -> Result<u64> {
        config.validate()?;

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let connection = Connection::open(id, &config).await?;
        self.connections.insert(id, connection);

        info!(id, "Connection registered");
        Ok(id)
    }

    /// Tear down the connection behind `id`. No-op success if it is already
    /// disconnected; unknown ids fail lookup.
    pub async fn disconnect(&self, id: u64) -> Result<()> {
        let connection = self.get(id)?;
        connection.shutdown().await
    }

    /// Validate and send a CoT XML document on `id`.
    pub async fn send(&self, id: u64, xml: &str) -> Result<()> {
        let connection = self.get(id)?;
        connection.send_xml(xml).await
    }

    /// Serialize and send a structured CoT event on `id`.
    pub async fn send_event(&self, id: u64, event: &CotEvent) -> Result<()> {
        let connection = self.get(id)?;
        connection.send_event(event).await
    }

    /// Register the observer for `id`, replacing any previous one.
    pub fn register_callback(&self, id: u64, observer: CotObserver) -> Result<()> {
        let connection = self.get(id)?;
        connection.set_observer(Some(observer));
        Ok(())
    }

    /// Clear the observer for `id`. Once this returns, no further invocation
    /// of the old observer starts.
    pub fn unregister_callback(&self, id: u64) -> Result<()> {
        let connection = self.get(id)?;
        connection.set_observer(None);
        Ok(())
    }

    /// Point-in-time status for `id`.
    pub fn status(&self, id: u64) -> Result<StatusSnapshot> {
        let connection = self.get(id)?;
        Ok(connection.status())
    }

    /// Number of registered connections, live or inert.
    pub fn len(&self) -> usize {
        self.connections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }

    /// Disconnect every connection and clear the table. Safe to call while
    /// connections are mid-read; waits (bounded per connection) for each
    /// read task to stop, so no callback fires after this returns.
    pub async fn shutdown_all(&self) {
        let ids: Vec<u64> = self.connections.iter().map(|entry| *entry.key()).collect();
        info!(count = ids.len(), "Shutting down all connections");

        for id in ids {
            if let Some((_, connection)) = self.connections.remove(&id) {
                if let Err(e) = connection.shutdown().await {
                    warn!(id, error = %e, "Error during shutdown");
                }
            }
        }
    }

    fn get(&self, id: u64) -> Result<Arc<Connection>> {
        self.connections
            .get(&id)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or_else(|| LookupError::UnknownConnection { id }.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use taklink_core::{Protocol, TakLinkError};

    #[test]
    fn test_unknown_id_fails_lookup() {
        let registry = ConnectionRegistry::new();
        assert!(matches!(
            registry.status(42),
            Err(TakLinkError::Lookup(LookupError::UnknownConnection { id: 42 }))
        ));
    }

    #[tokio::test]
    async fn test_invalid_params_rejected_before_dialing() {
        let registry = ConnectionRegistry::new();
        let result = registry
            .connect(ConnectionConfig::new("", 8087, Protocol::Tcp))
            .await;
        assert!(result.is_err());
        assert!(registry.is_empty());
    }
}
