//! Worker loops for repeated request execution
//!
//! One logical worker per concurrency slot, each independently walking the
//! attempt state machine. Attempt numbers come from the process-wide counter,
//! so concurrent workers never reuse a number (or a body line). A worker's
//! loop ends on its first transient error; benign body exhaustion ends it
//! silently. Confirmation pauses only exist on the sequential path.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use tokio::sync::mpsc;

use crate::cli::args::Args;
use crate::errors::{Result, RurlError};
use crate::executor::{EngineState, Executor};
use crate::loadgen::stats::{LoadStats, StatsCollector};
use crate::loadgen::think::ThinkSpec;
use crate::request::template::RequestTemplate;
use crate::signals;

/// Knobs for one load run
#[derive(Debug, Clone, Copy)]
pub struct LoadConfig {
    /// Total attempts; zero means run until the body source or the operator
    /// stops the run.
    pub requests: u64,
    pub concurrency: u64,
    pub think: ThinkSpec,
    pub confirm_every: u64,
}

impl LoadConfig {
    pub fn from_args(args: &Args) -> Self {
        LoadConfig {
            requests: args.requests,
            concurrency: args.concurrency.max(1),
            think: args.think,
            confirm_every: args.confirm,
        }
    }

    /// Anything other than exactly one request is a load run.
    pub fn is_load_run(&self) -> bool {
        self.requests != 1 || self.concurrency > 1
    }
}

/// Final outcome of a load run
#[derive(Debug)]
pub struct LoadReport {
    pub method: String,
    pub url: String,
    pub requested: u64,
    pub concurrency: u64,
    pub duration: Duration,
    pub stats: LoadStats,
}

struct AttemptRecord {
    status: Option<u16>,
    latency: Duration,
    bytes: u64,
    error: Option<String>,
}

/// Drive the whole run and aggregate per-attempt results.
pub async fn run(
    executor: Arc<Executor>,
    state: Arc<EngineState>,
    template: Arc<RequestTemplate>,
    config: LoadConfig,
) -> Result<LoadReport> {
    let started = Instant::now();
    let mut collector = StatsCollector::new();

    if config.concurrency <= 1 {
        run_sequential(&executor, &state, &template, &config, &mut collector).await?;
    } else {
        let (tx, mut rx) = mpsc::channel::<AttemptRecord>(config.concurrency as usize * 2);
        let issued = Arc::new(AtomicU64::new(0));
        let fatal: Arc<Mutex<Option<RurlError>>> = Arc::new(Mutex::new(None));

        let mut handles = Vec::new();
        for _ in 0..config.concurrency {
            let executor = executor.clone();
            let state = state.clone();
            let template = template.clone();
            let issued = issued.clone();
            let tx = tx.clone();
            let fatal = fatal.clone();
            handles.push(tokio::spawn(async move {
                run_worker(executor, state, template, config, issued, tx, fatal).await;
            }));
        }
        drop(tx);

        while let Some(record) = rx.recv().await {
            collector.record(record.status, record.latency, record.bytes, record.error);
        }
        for handle in handles {
            let _ = handle.await;
        }

        let first_fatal = fatal
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(e) = first_fatal {
            return Err(e);
        }
    }

    let duration = started.elapsed();
    Ok(LoadReport {
        method: template.method.to_string(),
        url: template.url.to_string(),
        requested: config.requests,
        concurrency: config.concurrency,
        duration,
        stats: collector.finalize(duration),
    })
}

/// One-at-a-time loop with think pauses and operator checkpoints.
async fn run_sequential(
    executor: &Executor,
    state: &EngineState,
    template: &RequestTemplate,
    config: &LoadConfig,
    collector: &mut StatsCollector,
) -> Result<()> {
    let mut confirms_usable = config.confirm_every > 0;
    let mut completed = 0u64;

    loop {
        if config.requests != 0 && completed >= config.requests {
            break;
        }
        if signals::was_interrupted() {
            break;
        }

        if completed > 0 {
            if confirms_usable && completed % config.confirm_every == 0 {
                match confirm_continue(completed).await {
                    Some(true) => {}
                    Some(false) => break,
                    // not an interactive session; stop asking
                    None => confirms_usable = false,
                }
            }
            if config.think.is_enabled() {
                tokio::time::sleep(config.think.sample()).await;
            }
        }

        let attempt = state.next_attempt();
        match executor.execute(template, attempt, false).await {
            Ok(outcome) => {
                completed += 1;
                collector.record(
                    Some(outcome.status.as_u16()),
                    outcome.elapsed,
                    outcome.bytes,
                    None,
                );
            }
            Err(e) if e.is_benign_eof() => {
                tracing::debug!(attempts = completed, "body source exhausted");
                break;
            }
            Err(e) if e.is_interrupted() => break,
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => {
                collector.record(None, Duration::ZERO, 0, Some(classify(&e)));
                tracing::warn!("attempt {} failed: {}", attempt, e);
                break;
            }
        }
    }

    Ok(())
}

/// One concurrency slot: claim a sequence number, run, report, repeat.
async fn run_worker(
    executor: Arc<Executor>,
    state: Arc<EngineState>,
    template: Arc<RequestTemplate>,
    config: LoadConfig,
    issued: Arc<AtomicU64>,
    tx: mpsc::Sender<AttemptRecord>,
    fatal: Arc<Mutex<Option<RurlError>>>,
) {
    loop {
        let seq = issued.fetch_add(1, Ordering::SeqCst) + 1;
        if config.requests != 0 && seq > config.requests {
            break;
        }
        if signals::was_interrupted() {
            break;
        }

        let attempt = state.next_attempt();
        match executor.execute(&template, attempt, false).await {
            Ok(outcome) => {
                let _ = tx
                    .send(AttemptRecord {
                        status: Some(outcome.status.as_u16()),
                        latency: outcome.elapsed,
                        bytes: outcome.bytes,
                        error: None,
                    })
                    .await;
            }
            Err(e) if e.is_benign_eof() || e.is_interrupted() => break,
            Err(e) if e.is_fatal() => {
                let mut slot = fatal.lock().unwrap_or_else(PoisonError::into_inner);
                slot.get_or_insert(e);
                break;
            }
            Err(e) => {
                tracing::warn!("attempt {} failed: {}", attempt, e);
                let _ = tx
                    .send(AttemptRecord {
                        status: None,
                        latency: Duration::ZERO,
                        bytes: 0,
                        error: Some(classify(&e)),
                    })
                    .await;
                break;
            }
        }

        let more_to_do =
            config.requests == 0 || issued.load(Ordering::SeqCst) < config.requests;
        if config.think.is_enabled() && more_to_do {
            tokio::time::sleep(config.think.sample()).await;
        }
    }
}

/// Pause for the operator. `None` means the session cannot prompt.
async fn confirm_continue(completed: u64) -> Option<bool> {
    let prompt = format!("{} requests done, continue?", completed);
    tokio::task::spawn_blocking(move || {
        dialoguer::Confirm::new()
            .with_prompt(prompt)
            .default(true)
            .interact()
    })
    .await
    .ok()?
    .ok()
}

/// Short bucket names so the report can group repeat failures.
fn classify(error: &RurlError) -> String {
    match error {
        RurlError::Timeout(_) => "Timeout".to_string(),
        RurlError::Request(e) if e.is_connect() => "Connection failed".to_string(),
        RurlError::Request(e) if e.is_timeout() => "Timeout".to_string(),
        other => other.to_string(),
    }
}
