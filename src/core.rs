use std::sync::Arc;

use clap::Parser;

use crate::cli::args::Args;
use crate::cli::print::PrintFlags;
use crate::cli::process::process_args;
use crate::config::Config;
use crate::context::Environment;
use crate::errors::{Result, RurlError};
use crate::executor::{EngineState, Executor};
use crate::loadgen::{self, LoadConfig};
use crate::output::format;
use crate::request::template::RequestTemplate;
use crate::signals;
use crate::status::ExitStatus;

/// Main entry point for the CLI.
///
/// Loads config defaults, parses arguments, builds the runtime, and hands
/// off to [`program`].
pub fn run(args: Vec<String>, mut env: Environment) -> ExitStatus {
    let config = match Config::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Warning: failed to load config: {}", e);
            Config::default()
        }
    };

    let merged_args = merge_default_options(args, &config);

    let parsed = match Args::try_parse_from(&merged_args) {
        Ok(args) => args,
        Err(e) => {
            e.print().ok();
            return if e.kind() == clap::error::ErrorKind::DisplayHelp
                || e.kind() == clap::error::ErrorKind::DisplayVersion
            {
                ExitStatus::Success
            } else {
                ExitStatus::Error
            };
        }
    };

    if parsed.no_color {
        env.colors = 0;
    }

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .expect("Failed to create tokio runtime");

    match runtime.block_on(program(parsed, env)) {
        Ok(status) => status,
        Err(e) => handle_error(e),
    }
}

/// Execute the parsed invocation: build templates, bring up the engine
/// state, then run either the single-shot path or a load run.
pub async fn program(args: Args, env: Environment) -> Result<ExitStatus> {
    let processed = process_args(&args)?;
    let templates = RequestTemplate::build_all(&args, &processed, &env)?;

    let state = Arc::new(EngineState::new(&args)?);
    let executor = Arc::new(Executor::new(&args, state.clone(), &env));
    let load = LoadConfig::from_args(&args);

    if load.is_load_run() {
        let mut status = ExitStatus::Success;
        for template in templates {
            let outcome = loadgen::run_load(
                executor.clone(),
                state.clone(),
                Arc::new(template),
                load,
                &env,
                args.quiet > 0,
            )
            .await?;
            if outcome != ExitStatus::Success {
                status = outcome;
            }
            if signals::was_interrupted() {
                break;
            }
        }
        return Ok(status);
    }

    let flags = resolve_print_flags(&args, &env);
    for template in templates {
        let attempt = state.next_attempt();
        let request_body = template.body_for_attempt(attempt)?;
        let outcome = executor.execute(&template, attempt, true).await?;

        format::print_exchange(&template, request_body.as_ref(), &outcome, flags, &env)?;
        if args.quiet == 0 {
            format::print_download_note(&outcome, &env);
        }

        if signals::was_interrupted() {
            break;
        }
    }
    Ok(ExitStatus::Success)
}

/// Pick what to print. `-q` silences everything and an explicit `-p` wins;
/// otherwise a terminal gets the full exchange while a piped stdout gets the
/// bare response body, so `rurl url > file` round-trips bytes.
fn resolve_print_flags(args: &Args, env: &Environment) -> PrintFlags {
    if args.quiet > 0 {
        PrintFlags::empty()
    } else if let Some(flags) = args.print {
        flags
    } else if env.stdout_isatty {
        PrintFlags::default()
    } else {
        PrintFlags::RESPONSE_BODY
    }
}

/// Prepend flag defaults from the config file, keeping the program name
/// first so clap still sees a normal argv.
fn merge_default_options(args: Vec<String>, config: &Config) -> Vec<String> {
    if config.default_options.is_empty() {
        return args;
    }

    let (flags, positional): (Vec<_>, Vec<_>) = config
        .default_options
        .iter()
        .partition(|opt| opt.starts_with('-'));

    if !positional.is_empty() {
        eprintln!(
            "Warning: positional arguments in default_options are ignored: {:?}",
            positional
        );
    }

    if flags.is_empty() {
        return args;
    }

    let mut merged = Vec::with_capacity(args.len() + flags.len());
    if let Some(program) = args.first() {
        merged.push(program.clone());
    }
    merged.extend(flags.into_iter().cloned());
    merged.extend(args.into_iter().skip(1));
    merged
}

fn handle_error(error: RurlError) -> ExitStatus {
    if error.is_benign_eof() {
        return ExitStatus::Success;
    }
    if error.is_interrupted() {
        return ExitStatus::Interrupted;
    }

    eprintln!("Error: {}", error);

    match error {
        RurlError::Timeout(_) => ExitStatus::Timeout,
        _ => ExitStatus::Error,
    }
}
