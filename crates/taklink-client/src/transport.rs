//! The transport layer: four wire variants behind one send/receive contract.
//!
//! Transports are a closed set of tagged variants, not a trait hierarchy;
//! each variant differs only in how bytes are framed and secured. Stream
//! variants (TCP/TLS/WebSocket) yield arbitrary chunks that go through the
//! CoT framer; UDP yields one datagram per receive, which is already a whole
//! message.

use crate::websocket::WsStream;
use crate::{tcp, tls, udp, websocket};
use bytes::{Bytes, BytesMut};
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use std::io;
use std::sync::Arc;
use taklink_core::{ConnectionConfig, Protocol, Result, TakLinkError};
use tokio::io::{AsyncReadExt, AsyncWriteExt, ReadHalf, WriteHalf};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::{TcpStream, UdpSocket};
use tokio_rustls::client::TlsStream;
use tokio_tungstenite::tungstenite::protocol::Message;

/// Read buffer granularity for stream transports
const READ_CHUNK_SIZE: usize = 8192;

/// Maximum UDP datagram size accepted
const MAX_DATAGRAM_SIZE: usize = 65536;

/// One unit of received data.
#[derive(Debug)]
pub enum Incoming {
    /// Arbitrary slice of a byte stream; feed it to the framer
    Chunk(Bytes),
    /// A whole message with transport-provided boundaries
    Datagram(Bytes),
    /// The peer closed the transport cleanly
    Closed,
}

/// An open transport, split into reader and writer halves so the read loop
/// and the send path run independently.
pub struct Transport {
    reader: TransportReader,
    writer: TransportWriter,
}

impl Transport {
    /// Open the transport variant selected by the configuration.
    pub async fn open(config: &ConnectionConfig) -> Result<Self> {
        match config.protocol {
            Protocol::Udp => {
                let socket = udp::open(config).await?;
                Ok(Self {
                    reader: TransportReader::Udp(Arc::clone(&socket)),
                    writer: TransportWriter::Udp(socket),
                })
            }
            Protocol::WebSocket => {
                let ws = websocket::open(config).await?;
                let (sink, stream) = ws.split();
                Ok(Self {
                    reader: TransportReader::WebSocket(stream),
                    writer: TransportWriter::WebSocket(sink),
                })
            }
            Protocol::Tcp | Protocol::Tls => {
                if config.wants_tls() {
                    let stream = tls::open(config).await?;
                    let (read, write) = tokio::io::split(stream);
                    Ok(Self {
                        reader: TransportReader::Tls(read),
                        writer: TransportWriter::Tls(write),
                    })
                } else {
                    let stream = tcp::connect_stream(config).await?;
                    let (read, write) = stream.into_split();
                    Ok(Self {
                        reader: TransportReader::Tcp(read),
                        writer: TransportWriter::Tcp(write),
                    })
                }
            }
        }
    }

    /// Split into independently owned halves.
    pub fn split(self) -> (TransportReader, TransportWriter) {
        (self.reader, self.writer)
    }
}

/// Receive half of a transport.
pub enum TransportReader {
    Tcp(OwnedReadHalf),
    Tls(ReadHalf<TlsStream<TcpStream>>),
    Udp(Arc<UdpSocket>),
    WebSocket(SplitStream<WsStream>),
}

impl TransportReader {
    /// Receive the next unit of data, suspending until the peer sends,
    /// closes, or fails. Never returns an empty chunk.
    pub async fn recv(&mut self) -> Result<Incoming> {
        match self {
            TransportReader::Tcp(read) => {
                let mut chunk = BytesMut::with_capacity(READ_CHUNK_SIZE);
                let n = read.read_buf(&mut chunk).await?;
                if n == 0 {
                    Ok(Incoming::Closed)
                } else {
                    Ok(Incoming::Chunk(chunk.freeze()))
                }
            }
            TransportReader::Tls(read) => {
                let mut chunk = BytesMut::with_capacity(READ_CHUNK_SIZE);
                let n = read.read_buf(&mut chunk).await?;
                if n == 0 {
                    Ok(Incoming::Closed)
                } else {
                    Ok(Incoming::Chunk(chunk.freeze()))
                }
            }
            TransportReader::Udp(socket) => {
                let mut buf = vec![0u8; MAX_DATAGRAM_SIZE];
                let n = socket.recv(&mut buf).await?;
                buf.truncate(n);
                Ok(Incoming::Datagram(Bytes::from(buf)))
            }
            TransportReader::WebSocket(stream) => loop {
                match stream.next().await {
                    Some(Ok(Message::Text(text))) => {
                        return Ok(Incoming::Chunk(Bytes::from(text)));
                    }
                    Some(Ok(Message::Binary(data))) => {
                        return Ok(Incoming::Chunk(Bytes::from(data)));
                    }
                    // pong replies are queued by tungstenite and flushed by
                    // the writer half
                    Some(Ok(Message::Ping(_))) | Some(Ok(Message::Pong(_))) => continue,
                    Some(Ok(Message::Frame(_))) => continue,
                    Some(Ok(Message::Close(_))) | None => return Ok(Incoming::Closed),
                    Some(Err(e)) => return Err(ws_error(e)),
                }
            },
        }
    }
}

/// Send half of a transport.
pub enum TransportWriter {
    Tcp(OwnedWriteHalf),
    Tls(WriteHalf<TlsStream<TcpStream>>),
    Udp(Arc<UdpSocket>),
    WebSocket(SplitSink<WsStream, Message>),
}

impl TransportWriter {
    /// Write one whole message.
    pub async fn send(&mut self, data: &[u8]) -> Result<()> {
        match self {
            TransportWriter::Tcp(write) => {
                write.write_all(data).await?;
                write.flush().await?;
            }
            TransportWriter::Tls(write) => {
                write.write_all(data).await?;
                write.flush().await?;
            }
            TransportWriter::Udp(socket) => {
                socket.send(data).await?;
            }
            TransportWriter::WebSocket(sink) => {
                let text = std::str::from_utf8(data)
                    .map_err(|_| TakLinkError::Encode("CoT payload is not valid UTF-8".into()))?;
                sink.send(Message::Text(text.to_string()))
                    .await
                    .map_err(ws_error)?;
            }
        }
        Ok(())
    }

    /// Shut the transport down. Idempotent; errors from an already-dead
    /// peer are ignored.
    pub async fn close(&mut self) {
        match self {
            TransportWriter::Tcp(write) => {
                let _ = write.shutdown().await;
            }
            TransportWriter::Tls(write) => {
                let _ = write.shutdown().await;
            }
            TransportWriter::Udp(_) => {}
            TransportWriter::WebSocket(sink) => {
                let _ = sink.send(Message::Close(None)).await;
                let _ = sink.close().await;
            }
        }
    }
}

fn ws_error(e: tokio_tungstenite::tungstenite::Error) -> TakLinkError {
    TakLinkError::Io(io::Error::new(io::ErrorKind::Other, e))
}
