//! Plain TCP transport establishment.

use std::time::Duration;
use taklink_core::{ConnectError, ConnectionConfig, Result, TimeoutError};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tracing::{debug, info};

/// TCP keepalive probe interval
const KEEPALIVE_INTERVAL: Duration = Duration::from_secs(30);

/// Connect a TCP stream to the configured target, bounded by the connect
/// timeout, with socket options applied.
pub(crate) async fn connect_stream(config: &ConnectionConfig) -> Result<TcpStream> {
    let addr = format!("{}:{}", config.host, config.port);
    info!(addr = %addr, "Connecting TCP");

    let stream = timeout(config.timeouts.connect, TcpStream::connect(&addr))
        .await
        .map_err(|_| TimeoutError::Connect {
            timeout_secs: config.timeouts.connect.as_secs(),
        })?
        .map_err(|e| ConnectError::failed(&config.host, config.port, e.to_string()))?;

    configure_socket(&stream)?;
    debug!(addr = %addr, "TCP connection established");

    Ok(stream)
}

/// Set TCP_NODELAY and keepalive.
fn configure_socket(stream: &TcpStream) -> Result<()> {
    stream.set_nodelay(true)?;

    let keepalive = socket2::TcpKeepalive::new().with_time(KEEPALIVE_INTERVAL);
    let socket = socket2::SockRef::from(stream);
    socket.set_tcp_keepalive(&keepalive)?;

    Ok(())
}
