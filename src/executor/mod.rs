//! One request attempt, end to end
//!
//! The executor resolves a cached client for the target, arms the inactivity
//! watchdog, applies the transfer plan's pre-flight Range, sends, and streams
//! the body through the rate limiter to a file sink or into memory. The
//! watchdog owns inactivity for the whole attempt; the socket layer carries
//! no read deadline of its own, so a slow-but-moving transfer never dies.

use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use bytes::Bytes;
use futures::stream::BoxStream;
use futures::{StreamExt, TryStreamExt};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT_ENCODING, CONTENT_ENCODING, CONTENT_LENGTH, RANGE};
use reqwest::{Body, StatusCode, Version};

use crate::cli::args::{Args, DownloadMode};
use crate::context::Environment;
use crate::errors::{Result, RurlError};
use crate::ratelimit::{shape_stream, RateSpec, TokenBucket};
use crate::request::template::RequestTemplate;
use crate::signals;
use crate::transfer::{FileSink, Planner};
use crate::transport::TransportPool;
use crate::watchdog::Watchdog;

/// Attempt-counter header, emitted when the run asks for more than one
/// request so servers can line logs up with the client's numbering.
pub const ATTEMPT_HEADER: &str = "x-rurl-n";

/// Process-scoped engine state: the transport cache and the attempt counter.
/// Constructed once at startup and shared by every worker; constructing it
/// is where unusable TLS material becomes a startup failure.
pub struct EngineState {
    pub pool: TransportPool,
    attempts: AtomicU64,
}

impl EngineState {
    pub fn new(args: &Args) -> Result<Self> {
        Ok(EngineState {
            pool: TransportPool::new(args)?,
            attempts: AtomicU64::new(0),
        })
    }

    /// Claim the next attempt number, starting at 1.
    pub fn next_attempt(&self) -> u64 {
        self.attempts.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub fn attempts_started(&self) -> u64 {
        self.attempts.load(Ordering::SeqCst)
    }
}

/// What one attempt produced.
#[derive(Debug)]
pub struct AttemptOutcome {
    pub status: StatusCode,
    pub version: Version,
    pub headers: HeaderMap,
    /// In-memory body, present only when the caller asked to collect and the
    /// response was not routed to a file.
    pub body: Option<Bytes>,
    /// Destination and size when the body went to disk.
    pub saved: Option<(PathBuf, u64)>,
    pub bytes: u64,
    pub elapsed: Duration,
}

/// Upload granularity when no rate cap applies. Each chunk the socket
/// drains yields a watchdog tick, so a slow upload is still progress.
const UPLOAD_CHUNK: usize = 64 * 1024;

fn upload_chunks(mut bytes: Bytes) -> Vec<std::io::Result<Bytes>> {
    let mut chunks = Vec::with_capacity(bytes.len() / UPLOAD_CHUNK + 1);
    while !bytes.is_empty() {
        let take = bytes.len().min(UPLOAD_CHUNK);
        chunks.push(Ok(bytes.split_to(take)));
    }
    chunks
}

pub struct Executor {
    state: Arc<EngineState>,
    planner: Planner,
    rate: RateSpec,
    bucket: Option<Arc<TokenBucket>>,
    timeout: Duration,
    requests: u64,
    show_progress: bool,
}

impl Executor {
    pub fn new(args: &Args, state: Arc<EngineState>, env: &Environment) -> Self {
        let rate = args.limit.unwrap_or_default();
        Executor {
            state,
            planner: Planner::new(args),
            rate,
            bucket: rate
                .is_enabled()
                .then(|| Arc::new(TokenBucket::new(rate.bytes_per_second))),
            timeout: args.timeout,
            requests: args.requests,
            show_progress: args.quiet == 0 && env.stderr_isatty,
        }
    }

    /// Run one attempt. `collect` keeps a non-downloaded body in memory for
    /// terminal display; load runs pass false and the body is drained so the
    /// connection goes back to the pool.
    pub async fn execute(
        &self,
        template: &RequestTemplate,
        attempt: u64,
        collect: bool,
    ) -> Result<AttemptOutcome> {
        let started = Instant::now();
        let client = self.state.pool.client_for(&template.url)?;
        let pre = self.planner.preflight(&client, template).await;

        let dog = Watchdog::arm(self.timeout);
        let token = dog.token();

        let mut builder = client
            .request(template.method.clone(), template.url.clone())
            .headers(template.headers.clone());
        if !template.query.is_empty() {
            builder = builder.query(&template.query);
        }
        if let Some(range) = pre.range_header() {
            builder = builder.header(RANGE, range);
        }
        if self.planner.mode() == DownloadMode::Yes
            && !template.headers.contains_key(ACCEPT_ENCODING)
        {
            // downloads want wire bytes on disk, not a decoded transform
            builder = builder.header(ACCEPT_ENCODING, "identity");
        }
        if self.requests != 1 {
            builder = builder.header(ATTEMPT_HEADER, HeaderValue::from(attempt));
        }

        if let Some(bytes) = template.body_for_attempt(attempt)? {
            let ticker = dog.ticker();
            let len = bytes.len();
            let stream: BoxStream<'static, std::io::Result<Bytes>> =
                match (&self.bucket, self.rate.applies_to_request()) {
                    (Some(bucket), true) => {
                        let one =
                            futures::stream::once(async move { Ok::<_, std::io::Error>(bytes) });
                        shape_stream(bucket.clone(), one)
                    }
                    _ => Box::pin(futures::stream::iter(upload_chunks(bytes))),
                };
            // every chunk handed to the socket postpones the inactivity
            // deadline; uploads count as progress the same as downloads
            let body = stream.inspect_ok(move |_| ticker.tick());
            builder = builder
                .header(CONTENT_LENGTH, len)
                .body(Body::wrap_stream(body));
        }

        let response = tokio::select! {
            _ = token.cancelled() => return Err(RurlError::Timeout(self.timeout.as_secs_f64())),
            result = builder.send() => result?,
        };
        dog.tick();

        let status = response.status();
        let version = response.version();
        let headers = response.headers().clone();
        let final_url = response.url().clone();
        let decision = self
            .planner
            .decide(&template.method, &pre, &headers, &final_url);

        let remaining = headers
            .get(CONTENT_LENGTH)
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.parse::<u64>().ok());

        let mut stream: BoxStream<'static, reqwest::Result<Bytes>> =
            if self.rate.applies_to_response() {
                match &self.bucket {
                    Some(bucket) => shape_stream(bucket.clone(), response.bytes_stream()),
                    None => Box::pin(response.bytes_stream()),
                }
            } else {
                Box::pin(response.bytes_stream())
            };

        // a gzip content-encoding can only survive here when auto-decompression
        // was off for this request; the sink then decodes on the way to disk
        let gunzip = headers
            .get(CONTENT_ENCODING)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v.eq_ignore_ascii_case("gzip"));

        let mut sink = if decision.to_file {
            Some(FileSink::open(&decision, remaining, self.show_progress, gunzip)?)
        } else {
            None
        };
        let mut collected: Vec<u8> = Vec::new();
        let mut bytes_total = 0u64;

        loop {
            let next = tokio::select! {
                biased;
                _ = token.cancelled() => {
                    if let Some(sink) = sink.as_mut() {
                        sink.abandon("timed out");
                    }
                    return Err(RurlError::Timeout(self.timeout.as_secs_f64()));
                }
                item = stream.next() => item,
            };
            let Some(item) = next else { break };
            let chunk = item?;
            dog.tick();

            if signals::was_interrupted() {
                if let Some(sink) = sink.as_mut() {
                    sink.abandon("interrupted");
                }
                return Err(RurlError::interrupted());
            }

            bytes_total += chunk.len() as u64;
            match sink.as_mut() {
                Some(sink) => sink.write(&chunk)?,
                None if collect => collected.extend_from_slice(&chunk),
                // not downloading, not displaying: drain to keep the
                // connection reusable
                None => {}
            }
        }

        let saved = match sink {
            Some(sink) => Some(sink.finish()?),
            None => None,
        };

        Ok(AttemptOutcome {
            status,
            version,
            headers,
            body: (collect && saved.is_none()).then(|| Bytes::from(collected)),
            saved,
            bytes: bytes_total,
            elapsed: started.elapsed(),
        })
    }
}
