//! One-shot analysis of the monthly pay statuses in a TrueLink credit report.
//!
//! Reads the document from `CREDIT_REPORT_PATH` (default `credit-report.json`)
//! and prints the distribution, summary and on-time percentage to stdout.
//! Logs go to stderr.

use anyhow::Context;
use rust_credit_api::call_logger::fingerprint;
use rust_credit_api::config::AnalyzerConfig;
use rust_credit_api::payment_status::classify_document;
use rust_credit_api::report::PaymentStatusReport;
use std::io::Write;

/// Main entry point for the analyzer.
///
/// Exits non-zero when the file cannot be read or parsed, when the
/// document lacks the trade-line partition path, or when there are no
/// payments to compute a percentage from (after printing the rest).
fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = AnalyzerConfig::from_env()?;
    let path = &config.credit_report_path;

    let raw = std::fs::read(path)
        .with_context(|| format!("failed to read credit report {}", path.display()))?;
    tracing::info!(
        "Loaded credit report {} ({} bytes, fingerprint {})",
        path.display(),
        raw.len(),
        fingerprint(&raw)
    );

    let document: serde_json::Value = serde_json::from_slice(&raw)
        .with_context(|| format!("{} is not valid JSON", path.display()))?;

    let aggregation = classify_document(&document)?;
    let report = PaymentStatusReport::from_aggregation(&aggregation);

    let mut stdout = std::io::stdout().lock();
    write!(stdout, "{}", report).context("failed to write report")?;
    stdout.flush().context("failed to write report")?;

    report.require_on_time_percentage()?;
    Ok(())
}
