//! A single server connection: one transport, one background read loop, one
//! observer slot.

use crate::state::{ConnectionStatus, StatusSnapshot};
use crate::transport::{Incoming, Transport, TransportWriter};
use std::sync::Arc;
use taklink_core::{
    ConnectionConfig, ConnectionState, Protocol, Result, StateError, TakLinkError, TimeoutError,
    Timeouts,
};
use taklink_cot::{parse_cot, serialize_event, validate_event, CotEvent, EventFramer};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tracing::{debug, error, info, warn};

/// Observer invoked for each decoded inbound event, synchronously from the
/// connection's read task, with the connection id, the decoded event, and
/// the raw XML text it was decoded from.
pub type CotObserver = Box<dyn Fn(u64, &CotEvent, &str) + Send + Sync>;

type ObserverSlot = Arc<parking_lot::Mutex<Option<CotObserver>>>;

/// A live connection to a TAK server.
///
/// Created only by the registry. The send path, observer registration, and
/// status queries may be called from any thread concurrently with the read
/// loop; sends are serialized through the writer lock so message bytes never
/// interleave on the wire.
pub struct Connection {
    id: u64,
    protocol: Protocol,
    timeouts: Timeouts,
    status: Arc<ConnectionStatus>,
    writer: tokio::sync::Mutex<TransportWriter>,
    observer: ObserverSlot,
    shutdown_tx: parking_lot::Mutex<Option<mpsc::Sender<()>>>,
    read_task: parking_lot::Mutex<Option<JoinHandle<()>>>,
}

impl Connection {
    /// Open the transport and start the background read loop.
    pub async fn open(id: u64, config: &ConnectionConfig) -> Result<Arc<Self>> {
        let status = Arc::new(ConnectionStatus::new());
        status.set_state(ConnectionState::Connecting);

        info!(
            id,
            host = %config.host,
            port = config.port,
            protocol = %config.protocol,
            "Opening connection"
        );

        let transport = Transport::open(config).await?;
        let (reader, writer) = transport.split();

        status.set_state(ConnectionState::Connected);

        let observer: ObserverSlot = Arc::new(parking_lot::Mutex::new(None));
        let (shutdown_tx, shutdown_rx) = mpsc::channel(1);

        let conn = Arc::new(Self {
            id,
            protocol: config.protocol,
            timeouts: config.timeouts,
            status: Arc::clone(&status),
            writer: tokio::sync::Mutex::new(writer),
            observer: Arc::clone(&observer),
            shutdown_tx: parking_lot::Mutex::new(Some(shutdown_tx)),
            read_task: parking_lot::Mutex::new(None),
        });

        let handle = tokio::spawn(read_loop(id, reader, status, observer, shutdown_rx));
        *conn.read_task.lock() = Some(handle);

        Ok(conn)
    }

    /// Connection id
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Transport protocol
    pub fn protocol(&self) -> Protocol {
        self.protocol
    }

    /// Validate and send a CoT XML document.
    ///
    /// The document is parsed first so a malformed payload is rejected as an
    /// encode error before anything reaches the wire.
    pub async fn send_xml(&self, xml: &str) -> Result<()> {
        parse_cot(xml).map_err(|e| TakLinkError::Encode(e.to_string()))?;
        self.send_raw(xml.as_bytes()).await
    }

    /// Serialize and send a CoT event.
    pub async fn send_event(&self, event: &CotEvent) -> Result<()> {
        validate_event(event).map_err(|e| TakLinkError::Encode(e.to_string()))?;
        let xml = serialize_event(event);
        self.send_raw(xml.as_bytes()).await
    }

    async fn send_raw(&self, data: &[u8]) -> Result<()> {
        let state = self.status.state();
        if !state.is_connected() {
            return Err(StateError::NotConnected { state }.into());
        }

        let mut writer = self.writer.lock().await;
        // re-check under the lock; a teardown may have won the race
        let state = self.status.state();
        if !state.is_connected() {
            return Err(StateError::NotConnected { state }.into());
        }

        let result = timeout(self.timeouts.write, writer.send(data))
            .await
            .map_err(|_| {
                TakLinkError::from(TimeoutError::Write {
                    timeout_secs: self.timeouts.write.as_secs(),
                })
            })
            .and_then(|r| r);

        match result {
            Ok(()) => {
                self.status.record_message_sent(data.len());
                debug!(id = self.id, size = data.len(), "Sent CoT message");
                Ok(())
            }
            Err(e) => {
                self.status.note_error(&e);
                Err(e)
            }
        }
    }

    /// Replace the observer slot. `None` clears it. An invocation already in
    /// flight finishes first; no new invocation starts after this returns.
    pub fn set_observer(&self, observer: Option<CotObserver>) {
        *self.observer.lock() = observer;
    }

    /// Point-in-time status copy; never blocks on the read loop.
    pub fn status(&self) -> StatusSnapshot {
        self.status.snapshot()
    }

    /// Tear the connection down: signal the read task, close the transport,
    /// and wait (bounded) for the task to exit. Idempotent; a no-op once
    /// Disconnected.
    pub async fn shutdown(&self) -> Result<()> {
        if self.status.state() == ConnectionState::Disconnected {
            return Ok(());
        }
        self.status.set_state(ConnectionState::Disconnecting);
        info!(id = self.id, "Disconnecting");

        let shutdown_tx = self.shutdown_tx.lock().take();
        if let Some(tx) = shutdown_tx {
            let _ = tx.send(()).await;
        }

        // closing the writer half also unblocks a peer stuck reading us
        {
            let mut writer = self.writer.lock().await;
            writer.close().await;
        }

        let handle = self.read_task.lock().take();
        if let Some(mut handle) = handle {
            if timeout(self.timeouts.shutdown, &mut handle).await.is_err() {
                warn!(id = self.id, "Read task did not exit in time, aborting");
                handle.abort();
            }
        }

        self.status.set_state(ConnectionState::Disconnected);
        Ok(())
    }
}

/// Background read loop: receive, frame, decode, dispatch. Runs until the
/// shutdown signal fires or the transport closes or fails.
async fn read_loop(
    id: u64,
    mut reader: crate::transport::TransportReader,
    status: Arc<ConnectionStatus>,
    observer: ObserverSlot,
    mut shutdown_rx: mpsc::Receiver<()>,
) {
    let mut framer = EventFramer::new();

    loop {
        tokio::select! {
            _ = shutdown_rx.recv() => {
                debug!(id, "Read task shutting down");
                break;
            }
            incoming = reader.recv() => match incoming {
                Ok(Incoming::Chunk(chunk)) => {
                    status.record_bytes_received(chunk.len());
                    framer.push(&chunk);
                    loop {
                        match framer.next_event() {
                            Ok(Some(frame)) => dispatch(id, &frame, &status, &observer),
                            Ok(None) => break,
                            Err(e) => {
                                warn!(id, error = %e, "Dropping unframeable input");
                                status.record_decode_error();
                                break;
                            }
                        }
                    }
                }
                Ok(Incoming::Datagram(frame)) => {
                    status.record_bytes_received(frame.len());
                    dispatch(id, &frame, &status, &observer);
                }
                Ok(Incoming::Closed) => {
                    info!(id, "Connection closed by remote");
                    status.set_state(ConnectionState::Disconnected);
                    break;
                }
                Err(e) => {
                    error!(id, error = %e, "Transport error in read loop");
                    status.set_error(&e);
                    break;
                }
            }
        }
    }
}

/// Decode one framed document and invoke the observer. Malformed input is
/// dropped and counted; the loop continues.
fn dispatch(id: u64, frame: &[u8], status: &ConnectionStatus, observer: &ObserverSlot) {
    let text = match std::str::from_utf8(frame) {
        Ok(text) => text,
        Err(_) => {
            debug!(id, "Dropping non-UTF-8 message");
            status.record_decode_error();
            return;
        }
    };

    match parse_cot(text) {
        Ok(event) => {
            status.record_message_received();
            // the lock is held through the call so unregister linearizes
            // after any in-flight invocation
            let guard = observer.lock();
            if let Some(cb) = guard.as_ref() {
                cb(id, &event, text);
            }
        }
        Err(e) => {
            debug!(id, error = %e, "Dropping malformed CoT message");
            status.record_decode_error();
        }
    }
}
