//! Repeated-request load generation
//!
//! Turns one request template into N attempts across C workers, with think
//! pauses, operator checkpoints, and an end-of-run report.

pub mod runner;
pub mod stats;
pub mod think;

pub use runner::{run, LoadConfig, LoadReport};
pub use stats::{LatencyStats, LoadStats};
pub use think::ThinkSpec;

use std::sync::Arc;

use crate::context::Environment;
use crate::errors::Result;
use crate::executor::{EngineState, Executor};
use crate::output::terminal::{self, colors};
use crate::request::template::RequestTemplate;
use crate::status::ExitStatus;

/// Run the load and print the report. The exit status reflects the run as a
/// batch: it fails only when most attempts did.
pub async fn run_load(
    executor: Arc<Executor>,
    state: Arc<EngineState>,
    template: Arc<RequestTemplate>,
    config: LoadConfig,
    env: &Environment,
    quiet: bool,
) -> Result<ExitStatus> {
    let color = env.color_enabled();

    if !quiet {
        let requested = if config.requests == 0 {
            "unbounded".to_string()
        } else {
            config.requests.to_string()
        };
        eprintln!(
            "Load run: {} {} (requests: {}, concurrency: {})",
            template.method, template.url, requested, config.concurrency
        );
    }

    let report = run(executor, state, template, config).await?;
    print!("{}", format_report(&report, color));

    // zero attempts means the body source was empty, not that anything broke
    if report.stats.attempts() == 0 || report.stats.success_rate >= 0.5 {
        Ok(ExitStatus::Success)
    } else {
        Ok(ExitStatus::Error)
    }
}

/// Render the end-of-run report.
pub fn format_report(report: &LoadReport, color: bool) -> String {
    let plain = |t: &str| t.to_string();
    let label = |t: &str| if color { terminal::key(t) } else { plain(t) };
    let num = |t: &str| if color { terminal::number(t) } else { plain(t) };
    let dim = |t: &str| if color { terminal::muted(t) } else { plain(t) };
    let tint = |t: &str, c: u8| if color { terminal::colorize(t, c) } else { plain(t) };
    let strong = |t: &str| if color { terminal::bold(t, colors::WHITE) } else { plain(t) };

    let rule = dim("─────────────────────────────────────────────");
    let stats = &report.stats;
    let mut out = String::new();

    out.push('\n');
    out.push_str(&format!("{}\n", strong("LOAD RESULTS")));
    out.push_str(&format!("{}\n", rule));
    out.push_str(&format!(
        "  {:<16} {} {}\n",
        label("Target:"),
        report.method,
        tint(&report.url, colors::AQUA)
    ));
    let requested = if report.requested == 0 {
        "unbounded".to_string()
    } else {
        report.requested.to_string()
    };
    out.push_str(&format!(
        "  {:<16} {} of {} requested\n",
        label("Attempts:"),
        num(&stats.attempts().to_string()),
        requested
    ));
    out.push_str(&format!(
        "  {:<16} {}\n",
        label("Concurrency:"),
        num(&report.concurrency.to_string())
    ));
    out.push_str(&format!(
        "  {:<16} {}\n",
        label("Duration:"),
        num(&format!("{:.2}s", report.duration.as_secs_f64()))
    ));
    out.push('\n');

    out.push_str(&format!("{}\n", strong("THROUGHPUT")));
    out.push_str(&format!("{}\n", rule));
    out.push_str(&format!(
        "  {:<16} {}\n",
        label("Requests/sec:"),
        num(&format!("{:.2}", stats.requests_per_second))
    ));
    out.push_str(&format!(
        "  {:<16} {}/s\n",
        label("Transfer:"),
        num(&crate::utils::format_bytes(stats.bytes_per_second as u64, 2))
    ));
    out.push_str(&format!(
        "  {:<16} {}\n",
        label("Total bytes:"),
        num(&crate::utils::format_bytes(stats.total_bytes, 2))
    ));
    out.push('\n');

    if stats.attempts() > 0 {
        out.push_str(&format!("{}\n", strong("LATENCY")));
        out.push_str(&format!("{}\n", rule));
        out.push_str(&format!(
            "  {:<16} {}\n",
            label("Min / Max:"),
            num(&format!(
                "{:.2}ms / {:.2}ms",
                stats.latency.min_ms, stats.latency.max_ms
            ))
        ));
        out.push_str(&format!(
            "  {:<16} {} {}\n",
            label("Mean:"),
            num(&format!("{:.2}ms", stats.latency.mean_ms)),
            dim(&format!("(stddev {:.2}ms)", stats.latency.stddev_ms))
        ));
        for (name, value) in [
            ("p50", stats.latency.p50_ms),
            ("p75", stats.latency.p75_ms),
            ("p90", stats.latency.p90_ms),
            ("p95", stats.latency.p95_ms),
            ("p99", stats.latency.p99_ms),
        ] {
            out.push_str(&format!(
                "  {:<16} {}\n",
                dim(&format!("{}:", name)),
                num(&format!("{:.2}ms", value))
            ));
        }
        out.push('\n');
    }

    out.push_str(&format!("{}\n", strong("STATUS")));
    out.push_str(&format!("{}\n", rule));
    let ok_color = if stats.success_rate >= 0.95 {
        colors::GREEN
    } else if stats.success_rate >= 0.5 {
        colors::YELLOW
    } else {
        colors::RED
    };
    out.push_str(&format!(
        "  {:<16} {} ({})\n",
        label("Succeeded:"),
        tint(&stats.succeeded.to_string(), ok_color),
        tint(&format!("{:.1}%", stats.success_rate * 100.0), ok_color)
    ));
    let fail_color = if stats.failed == 0 { colors::GREEN } else { colors::RED };
    out.push_str(&format!(
        "  {:<16} {}\n",
        label("Failed:"),
        tint(&stats.failed.to_string(), fail_color)
    ));

    if !stats.status_codes.is_empty() {
        let mut codes: Vec<_> = stats.status_codes.iter().collect();
        codes.sort_by_key(|(code, _)| **code);
        for (code, count) in codes {
            let family = match code / 100 {
                2 => colors::GREEN,
                3 => colors::YELLOW,
                4 => colors::ORANGE,
                5 => colors::RED,
                _ => colors::GREY,
            };
            out.push_str(&format!(
                "    {:<14} {}\n",
                tint(&code.to_string(), family),
                num(&count.to_string())
            ));
        }
    }

    if !stats.errors.is_empty() {
        let mut errors: Vec<_> = stats.errors.iter().collect();
        errors.sort_by(|a, b| a.0.cmp(b.0));
        for (error, count) in errors {
            out.push_str(&format!(
                "    {:<14} {}\n",
                tint(error, colors::RED),
                num(&count.to_string())
            ));
        }
    }

    out.push('\n');
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::time::Duration;

    fn sample_report() -> LoadReport {
        LoadReport {
            method: "GET".to_string(),
            url: "http://example.com/api".to_string(),
            requested: 100,
            concurrency: 10,
            duration: Duration::from_secs(5),
            stats: LoadStats {
                succeeded: 95,
                failed: 5,
                success_rate: 0.95,
                requests_per_second: 20.0,
                bytes_per_second: 10240.0,
                total_bytes: 51200,
                status_codes: HashMap::from([(200, 95), (500, 5)]),
                errors: HashMap::new(),
                latency: LatencyStats {
                    min_ms: 10.0,
                    max_ms: 500.0,
                    mean_ms: 100.0,
                    stddev_ms: 50.0,
                    p50_ms: 90.0,
                    p75_ms: 120.0,
                    p90_ms: 200.0,
                    p95_ms: 300.0,
                    p99_ms: 450.0,
                },
            },
        }
    }

    #[test]
    fn test_report_sections_present() {
        let output = format_report(&sample_report(), true);
        assert!(output.contains("LOAD RESULTS"));
        assert!(output.contains("THROUGHPUT"));
        assert!(output.contains("LATENCY"));
        assert!(output.contains("STATUS"));
        assert!(output.contains("example.com"));
        assert!(output.contains("p95"));
    }

    #[test]
    fn test_plain_report_has_no_escape_codes() {
        let output = format_report(&sample_report(), false);
        assert!(!output.contains('\x1b'));
        assert!(output.contains("100 of 100 requested"));
    }

    #[test]
    fn test_empty_run_skips_latency() {
        let mut report = sample_report();
        report.stats = LoadStats::default();
        let output = format_report(&report, false);
        assert!(!output.contains("LATENCY"));
        assert!(output.contains("0 of 100 requested"));
    }
}
