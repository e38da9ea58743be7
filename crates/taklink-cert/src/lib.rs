//! # TakLink Certificate Handling
//!
//! Builds rustls client configurations from in-memory PEM material. The
//! mobile boundary hands certificates through as opaque PEM blobs; nothing
//! here touches the filesystem.

use rustls::pki_types::{CertificateDer, PrivateKeyDer};
use rustls::{ClientConfig, RootCertStore};
use std::io::BufReader;
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug)]
pub enum CertError {
    #[error("Invalid certificate PEM: {0}")]
    InvalidCertPem(String),

    #[error("Invalid key PEM: {0}")]
    InvalidKeyPem(String),

    #[error("Invalid CA certificate PEM: {0}")]
    InvalidCaPem(String),

    #[error("No certificates found in PEM")]
    NoCertsFound,

    #[error("No private key found in PEM")]
    NoKeyFound,

    #[error("TLS configuration error: {0}")]
    TlsConfig(String),
}

/// TLS certificate bundle of in-memory PEM blobs
#[derive(Debug, Clone, Default)]
pub struct CertBundle {
    /// Client certificate chain PEM
    pub cert_pem: Option<String>,
    /// Client private key PEM
    pub key_pem: Option<String>,
    /// CA certificate PEM
    pub ca_pem: Option<String>,
}

impl CertBundle {
    /// Create a new certificate bundle
    pub fn new(
        cert_pem: Option<String>,
        key_pem: Option<String>,
        ca_pem: Option<String>,
    ) -> Self {
        Self {
            cert_pem,
            key_pem,
            ca_pem,
        }
    }

    /// Check if the bundle carries a client certificate and key
    pub fn has_client_cert(&self) -> bool {
        self.cert_pem.is_some() && self.key_pem.is_some()
    }

    /// Check if the bundle carries a CA certificate
    pub fn has_ca(&self) -> bool {
        self.ca_pem.is_some()
    }
}

/// rustls resolves its crypto provider process-wide; pin ring so the
/// builder never depends on which provider features other dependencies
/// happen to enable.
fn ensure_crypto_provider() {
    let _ = rustls::crypto::ring::default_provider().install_default();
}

/// Build a rustls client configuration from a bundle.
///
/// Without a CA the webpki trust store validates the server; without a
/// client cert/key pair no client certificate is presented.
pub fn build_client_config(bundle: &CertBundle) -> Result<Arc<ClientConfig>, CertError> {
    ensure_crypto_provider();

    let mut root_store = RootCertStore::empty();

    if let Some(ca_pem) = &bundle.ca_pem {
        let ca_certs = parse_certs(ca_pem.as_bytes())
            .map_err(|e| CertError::InvalidCaPem(e.to_string()))?;
        debug!(count = ca_certs.len(), "Using custom CA certificates");
        for cert in ca_certs {
            root_store
                .add(cert)
                .map_err(|e| CertError::TlsConfig(format!("Failed to add CA cert: {}", e)))?;
        }
    } else {
        debug!("Using webpki trust store");
        root_store.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());
    }

    let builder = ClientConfig::builder().with_root_certificates(root_store);

    let config = if bundle.has_client_cert() {
        let certs = parse_certs(bundle.cert_pem.as_ref().unwrap().as_bytes())?;
        let key = parse_key(bundle.key_pem.as_ref().unwrap().as_bytes())?;
        builder
            .with_client_auth_cert(certs, key)
            .map_err(|e| CertError::TlsConfig(format!("Failed to set client cert: {}", e)))?
    } else {
        builder.with_no_client_auth()
    };

    Ok(Arc::new(config))
}

/// Parse PEM certificates
fn parse_certs(pem: &[u8]) -> Result<Vec<CertificateDer<'static>>, CertError> {
    let mut reader = BufReader::new(pem);
    let certs: Vec<CertificateDer> = rustls_pemfile::certs(&mut reader)
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| CertError::InvalidCertPem(e.to_string()))?;

    if certs.is_empty() {
        return Err(CertError::NoCertsFound);
    }

    Ok(certs)
}

/// Parse a PEM private key (PKCS#8, PKCS#1, or SEC1)
fn parse_key(pem: &[u8]) -> Result<PrivateKeyDer<'static>, CertError> {
    let mut reader = BufReader::new(pem);
    rustls_pemfile::private_key(&mut reader)
        .map_err(|e| CertError::InvalidKeyPem(e.to_string()))?
        .ok_or(CertError::NoKeyFound)
}
