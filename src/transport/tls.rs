//! Standard TLS client configuration
//!
//! Builds the `rustls::ClientConfig` handed to reqwest as preconfigured TLS.
//! Verification is opt-in (`--verify` / `TLS_VERIFY`); the default posture of
//! a debugging tool is to accept whatever certificate the server presents.
//! Session tickets are cached in one `ClientSessionMemoryCache` shared by
//! every client built from the same config.

use std::fs;
use std::io::BufReader;
use std::path::Path;
use std::sync::Arc;

use rustls::client::danger::{HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier};
use rustls::client::{ClientSessionMemoryCache, Resumption};
use rustls::crypto::CryptoProvider;
use rustls::pki_types::{CertificateDer, PrivateKeyDer, ServerName, UnixTime};
use rustls::{ClientConfig, DigitallySignedStruct, RootCertStore, SignatureScheme};

use crate::errors::{Result, RurlError};

/// A client identity as a certificate chain plus its private key.
pub type Identity = (Vec<CertificateDer<'static>>, PrivateKeyDer<'static>);

/// Build a client config with the given verification posture, extra CA pool,
/// session cache size and optional client identity.
pub fn build_client_config(
    verify: bool,
    ca: Option<&Path>,
    session_cache: usize,
    identity: Option<Identity>,
) -> Result<ClientConfig> {
    let provider = Arc::new(rustls::crypto::aws_lc_rs::default_provider());

    let builder = ClientConfig::builder_with_provider(provider.clone())
        .with_safe_default_protocol_versions()
        .map_err(|e| RurlError::Tls(format!("unsupported TLS protocol versions: {}", e)))?;

    // A configured CA file is startup material: validate it even when
    // verification is off, so a bad path fails before any request.
    let extra_roots = match ca {
        Some(path) => load_pem_certs(path)?,
        None => Vec::new(),
    };

    let builder = if verify {
        builder.with_root_certificates(root_store(extra_roots)?)
    } else {
        builder
            .dangerous()
            .with_custom_certificate_verifier(Arc::new(NoVerify::new(&provider)))
    };

    let mut config = match identity {
        Some((chain, key)) => builder
            .with_client_auth_cert(chain, key)
            .map_err(|e| RurlError::Tls(format!("client certificate rejected: {}", e)))?,
        None => builder.with_no_client_auth(),
    };

    config.resumption = if session_cache == 0 {
        Resumption::disabled()
    } else {
        Resumption::store(Arc::new(ClientSessionMemoryCache::new(session_cache)))
    };

    // reqwest does not touch ALPN on preconfigured TLS
    config.alpn_protocols = vec![b"h2".to_vec(), b"http/1.1".to_vec()];

    Ok(config)
}

fn root_store(extra: Vec<CertificateDer<'static>>) -> Result<RootCertStore> {
    let mut roots = RootCertStore::empty();

    let native = rustls_native_certs::load_native_certs();
    if !native.errors.is_empty() {
        tracing::warn!(
            errors = native.errors.len(),
            "some native root certificates failed to load"
        );
    }
    for cert in native.certs {
        let _ = roots.add(cert);
    }

    for cert in extra {
        roots
            .add(cert)
            .map_err(|e| RurlError::Tls(format!("bad CA certificate: {}", e)))?;
    }

    Ok(roots)
}

/// Load all certificates from a PEM file. Fatal when the file is unreadable
/// or holds no certificate.
pub fn load_pem_certs(path: &Path) -> Result<Vec<CertificateDer<'static>>> {
    let data = fs::read(path)
        .map_err(|e| RurlError::Tls(format!("cannot read certificate {:?}: {}", path, e)))?;
    let certs = rustls_pemfile::certs(&mut BufReader::new(data.as_slice()))
        .collect::<std::io::Result<Vec<_>>>()
        .map_err(|e| RurlError::Tls(format!("cannot parse certificate {:?}: {}", path, e)))?;
    if certs.is_empty() {
        return Err(RurlError::Tls(format!("no certificate found in {:?}", path)));
    }
    Ok(certs)
}

/// Load the first private key from a PEM file.
pub fn load_pem_key(path: &Path) -> Result<PrivateKeyDer<'static>> {
    let data = fs::read(path)
        .map_err(|e| RurlError::Tls(format!("cannot read key {:?}: {}", path, e)))?;
    rustls_pemfile::private_key(&mut BufReader::new(data.as_slice()))
        .map_err(|e| RurlError::Tls(format!("cannot parse key {:?}: {}", path, e)))?
        .ok_or_else(|| RurlError::Tls(format!("no private key found in {:?}", path)))
}

/// Accepts any server certificate. The tool's default; verification is the
/// opt-in.
#[derive(Debug)]
struct NoVerify {
    schemes: Vec<SignatureScheme>,
}

impl NoVerify {
    fn new(provider: &CryptoProvider) -> Self {
        NoVerify {
            schemes: provider.signature_verification_algorithms.supported_schemes(),
        }
    }
}

impl ServerCertVerifier for NoVerify {
    fn verify_server_cert(
        &self,
        _end_entity: &CertificateDer<'_>,
        _intermediates: &[CertificateDer<'_>],
        _server_name: &ServerName<'_>,
        _ocsp_response: &[u8],
        _now: UnixTime,
    ) -> std::result::Result<ServerCertVerified, rustls::Error> {
        Ok(ServerCertVerified::assertion())
    }

    fn verify_tls12_signature(
        &self,
        _message: &[u8],
        _cert: &CertificateDer<'_>,
        _dss: &DigitallySignedStruct,
    ) -> std::result::Result<HandshakeSignatureValid, rustls::Error> {
        Ok(HandshakeSignatureValid::assertion())
    }

    fn verify_tls13_signature(
        &self,
        _message: &[u8],
        _cert: &CertificateDer<'_>,
        _dss: &DigitallySignedStruct,
    ) -> std::result::Result<HandshakeSignatureValid, rustls::Error> {
        Ok(HandshakeSignatureValid::assertion())
    }

    fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
        self.schemes.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_skip_verify_config_builds() {
        let config = build_client_config(false, None, 32, None).unwrap();
        assert_eq!(config.alpn_protocols, vec![b"h2".to_vec(), b"http/1.1".to_vec()]);
    }

    #[test]
    fn test_zero_session_cache_builds() {
        build_client_config(false, None, 0, None).unwrap();
    }

    #[test]
    fn test_missing_ca_file_is_fatal() {
        let err =
            build_client_config(true, Some(Path::new("/no/such/ca.pem")), 32, None).unwrap_err();
        assert!(err.is_fatal());
        assert!(err.to_string().contains("ca.pem"));
    }

    #[test]
    fn test_ca_file_validated_even_without_verify() {
        let err =
            build_client_config(false, Some(Path::new("/no/such/ca.pem")), 32, None).unwrap_err();
        assert!(err.is_fatal());
    }

    #[test]
    fn test_garbage_ca_file_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ca.pem");
        std::fs::write(&path, "not a certificate").unwrap();
        let err = load_pem_certs(&path).unwrap_err();
        assert!(err.is_fatal());
    }

    #[test]
    fn test_no_verify_advertises_schemes() {
        let provider = rustls::crypto::aws_lc_rs::default_provider();
        let verifier = NoVerify::new(&provider);
        assert!(!verifier.supported_verify_schemes().is_empty());
    }
}
