//! TLS configuration and certificate loading.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::config::validation::ValidationError;
use crate::net::transport::TransportError;

/// Client-side TLS settings. The transport performs the handshake.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(default)]
pub struct TlsConfig {
    /// Verify the server certificate chain.
    pub verify: bool,
    pub client_cert: Option<PathBuf>,
    pub client_key: Option<PathBuf>,
    /// Extra root certificates (PEM).
    pub ca_bundle: Option<PathBuf>,
    pub ciphers: Option<String>,
}

impl Default for TlsConfig {
    fn default() -> Self {
        Self {
            verify: true,
            client_cert: None,
            client_key: None,
            ca_bundle: None,
            ciphers: None,
        }
    }
}

/// PEM material read from disk, checked but not parsed into a TLS stack.
#[derive(Debug, Clone, Default)]
pub struct TlsMaterials {
    pub ca_bundle: Option<Vec<u8>>,
    /// Certificate chain and PKCS#8 key.
    pub identity: Option<(Vec<u8>, Vec<u8>)>,
}

impl TlsConfig {
    /// Verification disabled, nothing else set.
    pub fn insecure() -> Self {
        Self {
            verify: false,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        match (&self.client_cert, &self.client_key) {
            (Some(_), None) => Err(ValidationError::Tls(
                "client_key is required when client_cert is set".into(),
            )),
            (None, Some(_)) => Err(ValidationError::Tls(
                "client_cert is required when client_key is set".into(),
            )),
            _ => Ok(()),
        }
    }

    /// True when nothing needs loading from disk.
    pub fn is_plain(&self) -> bool {
        self.client_cert.is_none() && self.ca_bundle.is_none()
    }

    /// Read and sanity-check every configured PEM file.
    pub async fn load_materials(&self) -> Result<TlsMaterials, TransportError> {
        let mut materials = TlsMaterials::default();

        if let Some(path) = &self.ca_bundle {
            let pem = read_pem(path).await?;
            check_certificates(path, &pem)?;
            materials.ca_bundle = Some(pem);
        }

        if let (Some(cert_path), Some(key_path)) = (&self.client_cert, &self.client_key) {
            let cert = read_pem(cert_path).await?;
            check_certificates(cert_path, &cert)?;
            let key = read_pem(key_path).await?;
            check_private_key(key_path, &key)?;
            materials.identity = Some((cert, key));
        }

        Ok(materials)
    }
}

async fn read_pem(path: &Path) -> Result<Vec<u8>, TransportError> {
    tokio::fs::read(path)
        .await
        .map_err(|e| TransportError::Tls(format!("cannot read {}: {e}", path.display())))
}

fn check_certificates(path: &Path, pem: &[u8]) -> Result<(), TransportError> {
    let mut reader = pem;
    let certs = rustls_pemfile::certs(&mut reader)
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| TransportError::Tls(format!("invalid certificate in {}: {e}", path.display())))?;
    if certs.is_empty() {
        return Err(TransportError::Tls(format!(
            "no certificates found in {}",
            path.display()
        )));
    }
    Ok(())
}

fn check_private_key(path: &Path, pem: &[u8]) -> Result<(), TransportError> {
    let mut reader = pem;
    match rustls_pemfile::private_key(&mut reader) {
        Ok(Some(_)) => Ok(()),
        Ok(None) => Err(TransportError::Tls(format!(
            "no private key found in {}",
            path.display()
        ))),
        Err(e) => Err(TransportError::Tls(format!(
            "invalid private key in {}: {e}",
            path.display()
        ))),
    }
}
