//! UDP transport establishment.
//!
//! UDP is connectionless: "open" binds a local socket and `connect()`s it to
//! the target for send/recv addressing only, no handshake. Multicast targets
//! are joined on the bound socket.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;
use taklink_core::{ConnectError, ConnectionConfig, Result};
use tokio::net::{lookup_host, UdpSocket};
use tracing::{debug, info};

/// Receive buffer size requested from the kernel
const RECV_BUFFER_SIZE: usize = 65536;

pub(crate) async fn open(config: &ConnectionConfig) -> Result<Arc<UdpSocket>> {
    let addr = format!("{}:{}", config.host, config.port);
    let remote: SocketAddr = lookup_host(&addr)
        .await
        .map_err(|e| ConnectError::DnsFailed {
            host: config.host.clone(),
            reason: e.to_string(),
        })?
        .next()
        .ok_or_else(|| ConnectError::DnsFailed {
            host: config.host.clone(),
            reason: "no addresses resolved".to_string(),
        })?;

    let local: SocketAddr = if remote.is_ipv4() {
        "0.0.0.0:0".parse().unwrap()
    } else {
        "[::]:0".parse().unwrap()
    };

    let socket = bind_socket(local)?;

    if remote.ip().is_multicast() {
        join_multicast(&socket, &remote)?;
    }

    socket
        .connect(remote)
        .await
        .map_err(|e| ConnectError::failed(&config.host, config.port, e.to_string()))?;

    info!(remote = %remote, "UDP socket bound");
    Ok(Arc::new(socket))
}

/// Bind through socket2 so the receive buffer can be sized.
fn bind_socket(local: SocketAddr) -> Result<UdpSocket> {
    let domain = if local.is_ipv4() {
        socket2::Domain::IPV4
    } else {
        socket2::Domain::IPV6
    };
    let socket = socket2::Socket::new(domain, socket2::Type::DGRAM, Some(socket2::Protocol::UDP))?;

    // best-effort, ignore failures
    let _ = socket.set_recv_buffer_size(RECV_BUFFER_SIZE);

    socket.set_nonblocking(true)?;
    socket.bind(&local.into())?;

    Ok(UdpSocket::from_std(socket.into())?)
}

fn join_multicast(socket: &UdpSocket, remote: &SocketAddr) -> Result<()> {
    match remote.ip() {
        IpAddr::V4(group) => {
            socket.join_multicast_v4(group, Ipv4Addr::UNSPECIFIED)?;
            debug!(group = %group, "Joined IPv4 multicast group");
        }
        IpAddr::V6(group) => {
            socket.join_multicast_v6(&group, 0)?;
            debug!(group = %group, "Joined IPv6 multicast group");
        }
    }
    Ok(())
}
