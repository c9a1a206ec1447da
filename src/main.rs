// Allow dead code for partially implemented features
#![allow(dead_code)]
#![allow(unused_imports)]

mod cli;
mod config;
mod context;
mod core;
mod errors;
mod executor;
mod fs;
mod loadgen;
mod output;
mod ratelimit;
mod request;
mod signals;
mod status;
mod transfer;
mod transport;
mod utils;
mod watchdog;

use context::Environment;
use status::ExitStatus;
use tracing_subscriber::EnvFilter;

/// Logs go to stderr so piped bodies stay clean. `RURL_LOG` narrows the
/// filter; `RUST_LOG` works too.
fn init_tracing() {
    let filter = EnvFilter::try_from_env("RURL_LOG")
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new("rurl=warn"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Entry point - catches Ctrl+C and calls core::run()
///
/// Returns ExitStatus directly, which implements std::process::Termination.
fn main() -> ExitStatus {
    init_tracing();

    // Set a flag instead of calling exit() so destructors run and partial
    // downloads get flushed. A second Ctrl+C forces the exit.
    ctrlc::set_handler(move || {
        let prior = signals::register_interrupt();
        eprintln!("\nInterrupted");
        if prior > 0 {
            std::process::exit(ExitStatus::Interrupted as i32);
        }
    })
    .ok();

    let args: Vec<String> = std::env::args().collect();
    let env = Environment::init();

    let status = core::run(args, env);

    if signals::was_interrupted() {
        return ExitStatus::Interrupted;
    }

    status
}
