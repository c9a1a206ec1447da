//! CLI argument definitions using clap
//!
//! This module defines all command-line arguments for rurl.

use clap::{ArgAction, Parser};
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use crate::cli::print::PrintFlags;
use crate::loadgen::think::ThinkSpec;
use crate::ratelimit::RateSpec;

/// A string that redacts its value in Debug output to prevent credential leakage
#[derive(Clone, Default)]
pub struct SecretString(pub String);

impl SecretString {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for SecretString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            write!(f, "SecretString(\"\")")
        } else {
            write!(f, "SecretString(\"[REDACTED]\")")
        }
    }
}

impl std::str::FromStr for SecretString {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(SecretString(s.to_string()))
    }
}

/// Tri-state download switch. A bare `-d` forces the file sink, `-d=no`
/// rules it out, and an absent flag leaves the decision to the response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DownloadMode {
    #[default]
    Auto,
    Yes,
    No,
}

fn parse_download_mode(s: &str) -> Result<DownloadMode, String> {
    match s.to_ascii_lowercase().as_str() {
        "yes" | "y" | "true" | "t" | "1" | "on" => Ok(DownloadMode::Yes),
        "no" | "n" | "false" | "f" | "0" | "off" => Ok(DownloadMode::No),
        "auto" => Ok(DownloadMode::Auto),
        other => Err(format!("want yes or no, got {:?}", other)),
    }
}

/// rurl - a cURL-like HTTP client with rate limiting, resumable downloads
/// and built-in load generation
#[derive(Parser, Debug, Clone)]
#[command(name = "rurl", version, about, long_about = None)]
pub struct Args {
    // =========================================================================
    // POSITIONAL ARGUMENTS
    // =========================================================================

    /// HTTP method (GET, POST, PUT, DELETE, etc.)
    /// Defaults to GET, or POST when the request carries data
    #[arg(value_name = "METHOD")]
    pub method: Option<String>,

    /// The URL to request (http:// prefix optional; :3000/foo means localhost;
    /// RURL_URL supplies it when no URL is given)
    #[arg(value_name = "URL")]
    pub url: Option<String>,

    /// Further URLs, or request items: headers (:), query params (==),
    /// data fields (=), raw JSON fields (:=)
    #[arg(value_name = "URL|REQUEST_ITEM")]
    pub request_items: Vec<String>,

    // =========================================================================
    // REQUEST CONTENT
    // =========================================================================

    /// (default) Serialize data fields as a JSON object
    #[arg(short = 'j', long = "json", action = ArgAction::SetTrue)]
    pub json: bool,

    /// Serialize data fields as form fields (application/x-www-form-urlencoded)
    #[arg(short = 'f', long = "form", action = ArgAction::SetTrue)]
    pub form: bool,

    /// Raw request body: a string, @file for the whole file, or @file:line
    /// to send one line per request until the file runs out
    #[arg(short = 'b', long = "body", value_name = "BODY")]
    pub body: Option<String>,

    /// Gzip the request body and send Content-Encoding: gzip
    #[arg(long = "gzip", action = ArgAction::SetTrue)]
    pub gzip: bool,

    /// Basic auth credentials (USER or USER:PASS)
    #[arg(short = 'a', long = "auth", value_name = "CREDENTIALS", env = "RURL_AUTH")]
    pub auth: Option<SecretString>,

    // =========================================================================
    // OUTPUT
    // =========================================================================

    /// What to print: A(ll), H(request headers), B(request body),
    /// h(response headers), b(response body)
    #[arg(short = 'p', long = "print", value_name = "WHAT")]
    pub print: Option<PrintFlags>,

    /// Suppress terminal output (summary lines and progress included)
    #[arg(short = 'q', long = "quiet", action = ArgAction::Count)]
    pub quiet: u8,

    /// Force disable colors in output
    #[arg(long = "no-color", action = ArgAction::SetTrue)]
    pub no_color: bool,

    // =========================================================================
    // DOWNLOADS
    // =========================================================================

    /// Save the response body to a file: -d forces it, -d=no rules it out,
    /// absent lets the response headers decide
    #[arg(
        short = 'd',
        long = "download",
        value_name = "YES|NO",
        num_args = 0..=1,
        default_value = "auto",
        default_missing_value = "yes",
        require_equals = true,
        value_parser = parse_download_mode,
    )]
    pub download: DownloadMode,

    /// Output file (overrides the URL- or header-derived name)
    #[arg(short = 'o', long = "output", value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Do not add a synthesized file extension (.json, .txt, .xml)
    #[arg(long = "no-ext", action = ArgAction::SetTrue)]
    pub no_ext: bool,

    // =========================================================================
    // NETWORK
    // =========================================================================

    /// Inactivity timeout: the request is cancelled when no data moves for
    /// this long. 0 disables the watchdog
    #[arg(
        short = 't',
        long = "timeout",
        value_name = "DURATION",
        default_value = "1m",
        overrides_with = "timeout",
        value_parser = crate::utils::parse_duration,
    )]
    pub timeout: Duration,

    /// Bandwidth cap like 10K, 1.5M:req or 512K:rsp. Without a suffix the
    /// cap is shared by the request and response body
    #[arg(short = 'L', long = "limit", value_name = "RATE[:req|:rsp]")]
    pub limit: Option<RateSpec>,

    /// Proxy URL (http://, https:// or socks5://)
    #[arg(long = "proxy", value_name = "URL", env = "RURL_PROXY")]
    pub proxy: Option<String>,

    /// Disable connection keep-alive
    #[arg(short = 'k', long = "no-keepalive", action = ArgAction::SetTrue)]
    pub no_keepalive: bool,

    // =========================================================================
    // TLS
    // =========================================================================

    /// Verify server certificates. Off by default; also enabled by setting
    /// the TLS_VERIFY environment variable to a non-empty value
    #[arg(
        long = "verify",
        value_name = "BOOL",
        env = "TLS_VERIFY",
        num_args = 0..=1,
        default_missing_value = "yes",
        require_equals = true,
    )]
    pub verify: Option<String>,

    /// Root certificate PEM file appended to the system trust store
    #[arg(long = "ca", value_name = "FILE")]
    pub ca: Option<PathBuf>,

    /// Use the GM (TLCP) mutual-auth transport for https targets
    #[arg(long = "tlcp", action = ArgAction::SetTrue)]
    pub tlcp: bool,

    /// GM client certificates: sign.cert,sign.key[,enc.cert,enc.key].
    /// Exactly 0, 2 or 4 comma-separated paths
    #[arg(long = "tlcp-certs", value_name = "FILES")]
    pub tlcp_certs: Option<String>,

    /// TLS session ticket cache size
    #[arg(long = "session-cache", value_name = "NUM", default_value = "32")]
    pub session_cache: usize,

    // =========================================================================
    // LOAD GENERATION
    // =========================================================================

    /// Number of requests to send. 0 keeps going until interrupted
    #[arg(short = 'n', long = "requests", value_name = "NUM", default_value = "1")]
    pub requests: u64,

    /// Number of concurrent workers
    #[arg(short = 'c', long = "concurrency", value_name = "NUM", default_value = "1")]
    pub concurrency: u64,

    /// Think time between requests: 5s, 100ms, or a range like 100ms-5s
    /// sampled per request. 0 disables pacing
    #[arg(long = "think", value_name = "SPEC", default_value = "0")]
    pub think: ThinkSpec,

    /// Pause for confirmation every N requests (sequential runs only)
    #[arg(long = "confirm", value_name = "NUM", default_value = "0")]
    pub confirm: u64,

    // =========================================================================
    // TROUBLESHOOTING
    // =========================================================================

    /// Don't read a request body from stdin
    #[arg(short = 'I', long = "ignore-stdin", action = ArgAction::SetTrue)]
    pub ignore_stdin: bool,
}

impl Args {
    /// TLS verification is opt-in: `--verify`, `--verify=yes` or a non-empty
    /// TLS_VERIFY environment value turn it on.
    pub fn tls_verify(&self) -> bool {
        match self.verify.as_deref() {
            None => false,
            Some(v) => {
                !v.is_empty()
                    && !v.eq_ignore_ascii_case("no")
                    && !v.eq_ignore_ascii_case("false")
                    && v != "0"
            }
        }
    }

}

impl Default for Args {
    fn default() -> Self {
        Args {
            method: None,
            url: None,
            request_items: Vec::new(),
            json: false,
            form: false,
            body: None,
            gzip: false,
            auth: None,
            print: None,
            quiet: 0,
            no_color: false,
            download: DownloadMode::Auto,
            output: None,
            no_ext: false,
            timeout: Duration::from_secs(60),
            limit: None,
            proxy: None,
            no_keepalive: false,
            verify: None,
            ca: None,
            tlcp: false,
            tlcp_certs: None,
            session_cache: 32,
            requests: 1,
            concurrency: 1,
            think: ThinkSpec::default(),
            confirm: 0,
            ignore_stdin: false,
        }
    }
}
