//! GM (TLCP) mutual-auth transport configuration
//!
//! The GM transport speaks TLS with SM-series cipher suites and a dual
//! certificate scheme: a signing pair and an encryption pair. `--tlcp-certs`
//! takes the pairs as comma-separated PEM paths,
//! `sign.cert,sign.key[,enc.cert,enc.key]`; exactly 0, 2 or 4 paths are
//! accepted and anything else aborts before a connection is attempted. The
//! signing pair is mounted as the client identity for the mutual-auth
//! handshake.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::errors::{Result, RurlError};
use crate::transport::tls;

/// TLCP cipher suite IDs pinned when client pairs are configured.
pub const ECDHE_SM4_CBC_SM3: u16 = 0xE011;
pub const ECDHE_SM4_GCM_SM3: u16 = 0xE051;
pub const GM_CIPHER_SUITES: [u16; 2] = [ECDHE_SM4_CBC_SM3, ECDHE_SM4_GCM_SM3];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CertPair {
    pub cert: PathBuf,
    pub key: PathBuf,
}

/// Parsed `--tlcp-certs` value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GmCerts {
    pub sign: Option<CertPair>,
    pub enc: Option<CertPair>,
}

impl GmCerts {
    /// Parse the comma-separated path list. Count must be 0, 2 or 4.
    pub fn parse(spec: Option<&str>) -> Result<Self> {
        let Some(spec) = spec.map(str::trim).filter(|s| !s.is_empty()) else {
            return Ok(Self::default());
        };

        let paths: Vec<&str> = spec.split(',').map(str::trim).collect();
        if paths.iter().any(|p| p.is_empty()) {
            return Err(RurlError::Tls(format!(
                "empty path in --tlcp-certs {:?}",
                spec
            )));
        }

        match paths.len() {
            2 => Ok(GmCerts {
                sign: Some(CertPair {
                    cert: PathBuf::from(paths[0]),
                    key: PathBuf::from(paths[1]),
                }),
                enc: None,
            }),
            4 => Ok(GmCerts {
                sign: Some(CertPair {
                    cert: PathBuf::from(paths[0]),
                    key: PathBuf::from(paths[1]),
                }),
                enc: Some(CertPair {
                    cert: PathBuf::from(paths[2]),
                    key: PathBuf::from(paths[3]),
                }),
            }),
            n => Err(RurlError::Tls(format!(
                "--tlcp-certs expects 0, 2 or 4 comma-separated paths \
                 (sign.cert,sign.key[,enc.cert,enc.key]), got {}",
                n
            ))),
        }
    }

    pub fn has_client_pairs(&self) -> bool {
        self.sign.is_some()
    }
}

/// Ready-to-use GM transport material.
#[derive(Debug, Clone)]
pub struct GmTlsConfig {
    pub config: Arc<rustls::ClientConfig>,
    pub certs: GmCerts,
    /// Suite IDs the handshake layer is expected to offer; empty without
    /// client pairs.
    pub suites: &'static [u16],
}

impl GmTlsConfig {
    pub fn new(
        spec: Option<&str>,
        verify: bool,
        ca: Option<&Path>,
        session_cache: usize,
    ) -> Result<Self> {
        let certs = GmCerts::parse(spec)?;

        let identity = match &certs.sign {
            Some(pair) => Some((tls::load_pem_certs(&pair.cert)?, tls::load_pem_key(&pair.key)?)),
            None => None,
        };

        // The encryption pair is validated at startup even though only the
        // signing pair rides in the handshake identity.
        if let Some(pair) = &certs.enc {
            tls::load_pem_certs(&pair.cert)?;
            tls::load_pem_key(&pair.key)?;
        }

        let config = tls::build_client_config(verify, ca, session_cache, identity)?;
        let suites: &'static [u16] = if certs.has_client_pairs() {
            &GM_CIPHER_SUITES
        } else {
            &[]
        };

        Ok(GmTlsConfig {
            config: Arc::new(config),
            certs,
            suites,
        })
    }
}
