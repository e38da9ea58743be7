//! TLS transport establishment: rustls over TCP with in-memory PEM material.

use crate::tcp;
use rustls::pki_types::ServerName;
use taklink_cert::{build_client_config, CertBundle};
use taklink_core::{ConnectError, ConnectionConfig, Result, TimeoutError};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tokio_rustls::client::TlsStream;
use tokio_rustls::TlsConnector;
use tracing::info;

pub(crate) async fn open(config: &ConnectionConfig) -> Result<TlsStream<TcpStream>> {
    let bundle = CertBundle::new(
        config.cert_pem.clone(),
        config.key_pem.clone(),
        config.ca_pem.clone(),
    );
    let tls_config = build_client_config(&bundle).map_err(|e| ConnectError::InvalidCertificate {
        reason: e.to_string(),
    })?;

    let tcp_stream = tcp::connect_stream(config).await?;

    let server_name =
        ServerName::try_from(config.host.clone()).map_err(|e| ConnectError::tls_handshake(
            format!("invalid server name {}: {}", config.host, e),
        ))?;

    let connector = TlsConnector::from(tls_config);
    let tls_stream = timeout(
        config.timeouts.connect,
        connector.connect(server_name, tcp_stream),
    )
    .await
    .map_err(|_| TimeoutError::Connect {
        timeout_secs: config.timeouts.connect.as_secs(),
    })?
    .map_err(|e| ConnectError::tls_handshake(e.to_string()))?;

    info!(host = %config.host, "TLS handshake complete");
    Ok(tls_stream)
}
