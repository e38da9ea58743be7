//! WebSocket transport establishment over TCP or TLS.

use taklink_cert::{build_client_config, CertBundle};
use taklink_core::{ConnectError, ConnectionConfig, Result, TimeoutError};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tokio_tungstenite::{
    connect_async_tls_with_config, Connector, MaybeTlsStream, WebSocketStream,
};
use tracing::info;

pub(crate) type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

pub(crate) async fn open(config: &ConnectionConfig) -> Result<WsStream> {
    let scheme = if config.wants_tls() { "wss" } else { "ws" };
    let url = format!(
        "{}://{}:{}{}",
        scheme, config.host, config.port, config.websocket.path
    );
    info!(url = %url, "Connecting WebSocket");

    // wss validates against the same PEM bundle the TLS transport uses
    let connector = if config.wants_tls() {
        let bundle = CertBundle::new(
            config.cert_pem.clone(),
            config.key_pem.clone(),
            config.ca_pem.clone(),
        );
        let tls_config =
            build_client_config(&bundle).map_err(|e| ConnectError::InvalidCertificate {
                reason: e.to_string(),
            })?;
        Some(Connector::Rustls(tls_config))
    } else {
        None
    };

    let (ws_stream, response) = timeout(
        config.timeouts.connect,
        connect_async_tls_with_config(&url, None, true, connector),
    )
    .await
    .map_err(|_| TimeoutError::Connect {
        timeout_secs: config.timeouts.connect.as_secs(),
    })?
    .map_err(|e| ConnectError::WebSocketHandshakeFailed {
        reason: e.to_string(),
    })?;

    info!(status = %response.status(), "WebSocket handshake complete");
    Ok(ws_stream)
}
