//! Transport selection and client caching
//!
//! One transport flavor per target: plain HTTP, standard TLS, or the GM
//! mutual-auth TLS. TLS material is built once at startup (so configuration
//! mistakes abort before any request) and the reqwest clients derived from it
//! are cached per `scheme://host:port`. No total-request deadline is ever set
//! on a client; inactivity is the watchdog's job.

pub mod gm;
pub mod tls;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use reqwest::Client;
use url::Url;

use crate::cli::args::Args;
use crate::errors::{Result, RurlError};
use crate::utils::transport_key;

pub use gm::{GmCerts, GmTlsConfig};

/// The transport flavor chosen for a target.
#[derive(Debug, Clone)]
pub enum Transport {
    Plain,
    Tls(Arc<rustls::ClientConfig>),
    GmMutualAuth(GmTlsConfig),
}

impl Transport {
    pub fn name(&self) -> &'static str {
        match self {
            Transport::Plain => "plain",
            Transport::Tls(_) => "tls",
            Transport::GmMutualAuth(_) => "gm",
        }
    }
}

/// Client-construction knobs that apply to every transport.
#[derive(Debug, Clone, Default)]
pub struct TransportOptions {
    pub proxy: Option<String>,
    pub no_keepalive: bool,
    pub connect_timeout: Option<Duration>,
}

/// Builds and caches one client per `scheme://host:port`.
#[derive(Debug)]
pub struct TransportPool {
    options: TransportOptions,
    tls: Arc<rustls::ClientConfig>,
    gm: Option<GmTlsConfig>,
    clients: DashMap<String, Client>,
}

impl TransportPool {
    /// Build all TLS material up front; bad certificate paths, a bad CA pool
    /// or a bad `--tlcp-certs` count are fatal here, before any request.
    pub fn new(args: &Args) -> Result<Self> {
        let verify = args.tls_verify();
        let ca: Option<PathBuf> = args.ca.clone();

        let tls = tls::build_client_config(verify, ca.as_deref(), args.session_cache, None)?;

        let gm = if args.tlcp {
            Some(GmTlsConfig::new(
                args.tlcp_certs.as_deref(),
                verify,
                ca.as_deref(),
                args.session_cache,
            )?)
        } else {
            // The cert spec is still validated when given without --tlcp.
            GmCerts::parse(args.tlcp_certs.as_deref())?;
            None
        };

        let connect_timeout = (!args.timeout.is_zero()).then_some(args.timeout);

        Ok(TransportPool {
            options: TransportOptions {
                proxy: args.proxy.clone(),
                no_keepalive: args.no_keepalive,
                connect_timeout,
            },
            tls: Arc::new(tls),
            gm,
            clients: DashMap::new(),
        })
    }

    /// The transport flavor for a URL's scheme.
    pub fn select(&self, url: &Url) -> Transport {
        if url.scheme() == "https" {
            match &self.gm {
                Some(gm) => Transport::GmMutualAuth(gm.clone()),
                None => Transport::Tls(self.tls.clone()),
            }
        } else {
            Transport::Plain
        }
    }

    /// The cached client for a URL, building it on first use.
    pub fn client_for(&self, url: &Url) -> Result<Client> {
        let key = transport_key(url);
        if let Some(client) = self.clients.get(&key) {
            return Ok(client.clone());
        }

        let transport = self.select(url);
        let client = self.build_client(&transport)?;
        tracing::debug!(target = %key, transport = transport.name(), "built transport");
        self.clients.insert(key, client.clone());
        Ok(client)
    }

    pub fn cached_clients(&self) -> usize {
        self.clients.len()
    }

    fn build_client(&self, transport: &Transport) -> Result<Client> {
        let mut builder = Client::builder()
            .redirect(reqwest::redirect::Policy::limited(10))
            .referer(false);

        match transport {
            Transport::Plain => {}
            Transport::Tls(config) => {
                builder = builder.use_preconfigured_tls((**config).clone());
            }
            Transport::GmMutualAuth(gm) => {
                builder = builder.use_preconfigured_tls((*gm.config).clone());
            }
        }

        if let Some(proxy) = &self.options.proxy {
            let proxy = reqwest::Proxy::all(proxy.as_str())
                .map_err(|e| RurlError::Config(format!("invalid proxy {:?}: {}", proxy, e)))?;
            builder = builder.proxy(proxy);
        }

        if self.options.no_keepalive {
            builder = builder.pool_max_idle_per_host(0);
        }

        if let Some(connect_timeout) = self.options.connect_timeout {
            builder = builder.connect_timeout(connect_timeout);
        }

        builder.build().map_err(RurlError::Request)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pool(args: Args) -> TransportPool {
        TransportPool::new(&args).unwrap()
    }

    #[test]
    fn test_select_by_scheme() {
        let pool = pool(Args::default());
        let http = Url::parse("http://example.com").unwrap();
        let https = Url::parse("https://example.com").unwrap();
        assert!(matches!(pool.select(&http), Transport::Plain));
        assert!(matches!(pool.select(&https), Transport::Tls(_)));
    }

    #[test]
    fn test_tlcp_flag_switches_https_transport() {
        let args = Args {
            tlcp: true,
            ..Args::default()
        };
        let pool = pool(args);
        let https = Url::parse("https://example.com").unwrap();
        assert!(matches!(pool.select(&https), Transport::GmMutualAuth(_)));
        // http targets stay plain even under --tlcp
        let http = Url::parse("http://example.com").unwrap();
        assert!(matches!(pool.select(&http), Transport::Plain));
    }

    #[test]
    fn test_clients_cached_per_host() {
        let pool = pool(Args::default());
        let a = Url::parse("http://a.example.com/x").unwrap();
        let also_a = Url::parse("http://a.example.com:80/y").unwrap();
        let b = Url::parse("http://b.example.com/").unwrap();

        pool.client_for(&a).unwrap();
        assert_eq!(pool.cached_clients(), 1);
        pool.client_for(&also_a).unwrap();
        assert_eq!(pool.cached_clients(), 1);
        pool.client_for(&b).unwrap();
        assert_eq!(pool.cached_clients(), 2);
    }

    #[test]
    fn test_bad_cert_count_fatal_at_construction() {
        let args = Args {
            tlcp: true,
            tlcp_certs: Some("only-one.pem".to_string()),
            ..Args::default()
        };
        let err = TransportPool::new(&args).unwrap_err();
        assert!(err.is_fatal());
    }

    #[test]
    fn test_bad_proxy_is_fatal_at_build() {
        let args = Args {
            proxy: Some("::not a proxy::".to_string()),
            ..Args::default()
        };
        let pool = pool(args);
        let url = Url::parse("http://example.com").unwrap();
        assert!(pool.client_for(&url).unwrap_err().is_fatal());
    }
}
