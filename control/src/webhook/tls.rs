//! Webhook TLS
//!
//! The API server only calls admission webhooks over HTTPS.

use crate::error::ControlError;
use rustls::ServerConfig;
use rustls_pemfile::{certs, private_key};
use std::fs::File;
use std::io::BufReader;
use std::sync::Arc;

/// Build a rustls server config from PEM files on disk
pub fn load_server_config(cert_path: &str, key_path: &str) -> Result<Arc<ServerConfig>, ControlError> {
    let mut cert_reader = BufReader::new(File::open(cert_path).map_err(|e| {
        ControlError::Tls(format!("Failed to open certificate {}: {}", cert_path, e))
    })?);
    let certs = certs(&mut cert_reader)
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| ControlError::Tls(format!("Failed to parse {}: {}", cert_path, e)))?;
    if certs.is_empty() {
        return Err(ControlError::Tls(format!(
            "No certificates found in {}",
            cert_path
        )));
    }

    let mut key_reader = BufReader::new(
        File::open(key_path)
            .map_err(|e| ControlError::Tls(format!("Failed to open key {}: {}", key_path, e)))?,
    );
    let key = private_key(&mut key_reader)
        .map_err(|e| ControlError::Tls(format!("Failed to parse {}: {}", key_path, e)))?
        .ok_or_else(|| ControlError::Tls(format!("No private key found in {}", key_path)))?;

    let mut config =
        ServerConfig::builder_with_provider(Arc::new(rustls::crypto::ring::default_provider()))
            .with_safe_default_protocol_versions()
            .map_err(|e| ControlError::Tls(e.to_string()))?
            .with_no_client_auth()
            .with_single_cert(certs, key)
            .map_err(|e| ControlError::Tls(e.to_string()))?;
    config.alpn_protocols = vec![b"http/1.1".to_vec()];

    Ok(Arc::new(config))
}
