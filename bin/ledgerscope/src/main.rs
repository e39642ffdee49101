//! Ledgerscope - token transfer history explorer.
//!
//! # Usage
//!
//! ```bash
//! # Replay the bundled history for an account
//! ledgerscope --account alice
//!
//! # Environment overrides, JSON output
//! ACCOUNT=alice MIN_BALANCE=0.5 OUTPUT=json ledgerscope
//! ```
//!
//! Ctrl+C during a fetch stops it at the next page boundary and prints
//! what was gathered so far.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use metrics_exporter_prometheus::PrometheusBuilder;
use tokio::signal;
use tracing::{Instrument, debug, info, info_span, warn};
use tracing_subscriber::{EnvFilter, fmt};

use ledgerscope_core::metrics::init_metrics;
use ledgerscope_core::services::{EngineConfig, LedgerService, LedgerView};
use ledgerscope_fixture::{FixtureSource, FixtureSourceConfig};

/// How the ledger is printed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OutputFormat {
    Table,
    Json,
}

/// Ledgerscope CLI - reconstructs an account's balance history.
#[derive(Parser, Debug)]
#[command(name = "ledgerscope")]
#[command(about = "Ledgerscope - token transfer history explorer")]
#[command(version)]
struct Cli {
    /// Account whose history is reconstructed.
    #[arg(long, env = "ACCOUNT")]
    account: Option<String>,

    /// Recorded transfer history (JSON).
    #[arg(long, env = "FIXTURE_PATH", default_value = "data/history.json")]
    fixture_path: PathBuf,

    /// Artificial delay per upstream request, in milliseconds.
    #[arg(long, env = "FIXTURE_LATENCY_MS", default_value = "0")]
    fixture_latency_ms: u64,

    /// Hide transactions whose absolute change is below this amount.
    #[arg(long, env = "MIN_BALANCE", default_value = "0.01")]
    min_balance: String,

    /// Transfers requested per page.
    #[arg(long, env = "PAGE_SIZE", default_value = "100")]
    page_size: u32,

    /// Timeout of a single page request, in seconds.
    #[arg(long, env = "PAGE_TIMEOUT_SECS", default_value = "20")]
    page_timeout_secs: u64,

    /// Retries per request after the first failure.
    #[arg(long, env = "MAX_RETRIES", default_value = "5")]
    max_retries: u32,

    /// Number of intervals on the time axis.
    #[arg(long, env = "TICK_COUNT", default_value = "6")]
    tick_count: usize,

    /// Prometheus metrics port (disabled when unset).
    #[arg(long, env = "METRICS_PORT")]
    metrics_port: Option<u16>,

    /// Enable JSON log output.
    #[arg(long, env = "JSON_LOGS")]
    json_logs: bool,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    log_level: String,

    /// Output format: table or json.
    #[arg(long, env = "OUTPUT", default_value = "table", value_parser = parse_output_format)]
    output: OutputFormat,
}

/// Parse output format from string.
fn parse_output_format(s: &str) -> Result<OutputFormat, String> {
    match s.to_lowercase().as_str() {
        "table" => Ok(OutputFormat::Table),
        "json" => Ok(OutputFormat::Json),
        _ => Err(format!("Invalid output '{}'. Use 'table' or 'json'.", s)),
    }
}

impl Cli {
    fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            page_size: self.page_size,
            page_timeout: Duration::from_secs(self.page_timeout_secs),
            max_retries: self.max_retries,
            tick_count: self.tick_count,
            ..Default::default()
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_tracing(&cli.log_level, cli.json_logs);

    // Prometheus metrics exporter (optional - failures don't crash the app)
    if let Some(port) = cli.metrics_port {
        let addr = SocketAddr::from(([0, 0, 0, 0], port));
        match PrometheusBuilder::new().with_http_listener(addr).install() {
            Ok(()) => {
                init_metrics();
                info!("📊 Metrics:  http://localhost:{}/metrics", port);
            }
            Err(e) => {
                warn!("⚠️  Failed to start metrics exporter: {}. Continuing without metrics.", e);
            }
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // 📂 SOURCE
    // ─────────────────────────────────────────────────────────────────────────
    let source_config = FixtureSourceConfig {
        path: cli.fixture_path.clone(),
        latency: Duration::from_millis(cli.fixture_latency_ms),
    };
    let source = FixtureSource::load(source_config)
        .await
        .with_context(|| format!("Failed to load {}", cli.fixture_path.display()))?;

    let service = Arc::new(LedgerService::new(cli.engine_config(), Arc::new(source)));
    service
        .set_min_balance_filter(&cli.min_balance)
        .context("Invalid minimum balance")?;

    // ─────────────────────────────────────────────────────────────────────────
    // 🔍 FETCH
    // ─────────────────────────────────────────────────────────────────────────
    let mut fetch = tokio::spawn({
        let service = service.clone();
        let account = cli.account.clone();
        async move { service.refresh(account.as_deref()).await }.instrument(info_span!("ledger"))
    });

    let result = tokio::select! {
        joined = &mut fetch => joined,
        _ = interrupt_signal() => {
            info!("🛑 Interrupted, stopping after the current page...");
            service.cancel_fetching();
            fetch.await
        }
    };
    let view = result
        .context("Fetch task panicked")?
        .context("Failed to build ledger")?;

    if service
        .current_state()
        .is_some_and(|state| state.cancelled)
    {
        warn!("⚠️  History is incomplete, older transfers were not fetched");
    }

    match cli.output {
        OutputFormat::Table => print_table(&view),
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(&view).context("Failed to encode ledger")?;
            println!("{}", json);
        }
    }

    debug!("Done");
    Ok(())
}

/// Initialize tracing subscriber.
fn init_tracing(level: &str, json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    if json {
        fmt()
            .with_env_filter(filter)
            .json()
            .with_writer(std::io::stderr)
            .init();
    } else {
        fmt()
            .with_env_filter(filter)
            .with_target(false)
            .with_thread_ids(false)
            .with_file(false)
            .with_line_number(false)
            .with_writer(std::io::stderr)
            .init();
    }
}

/// Wait for Ctrl+C; never resolves if the handler cannot be installed.
async fn interrupt_signal() {
    if let Err(e) = signal::ctrl_c().await {
        warn!(error = %e, "⚠️  Failed to install Ctrl+C handler");
        std::future::pending::<()>().await;
    }
}

/// Print the ledger as a fixed-width table followed by the chart data.
fn print_table(view: &LedgerView) {
    println!("Account: {}", view.account);
    println!("Balance: {}", view.balance);
    println!();

    println!(
        "{:<20} {:<16} {:>20} {:>20} {:<13} Impact",
        "Time", "Transaction", "Change", "Balance", "Counterparty"
    );
    for t in &view.transfers {
        let sign = if t.is_incoming() { '+' } else { '-' };
        let bar: String = std::iter::repeat_n(sign, t.impact_bucket + 1).collect();
        println!(
            "{:<20} {:<16} {:>20} {:>20} {:<13} {}",
            t.timestamp.format("%Y-%m-%d %H:%M:%S"),
            shorten(&t.transaction_id, 16),
            t.delta_quantity.to_string(),
            t.balance_after.to_string(),
            t.counterparty,
            bar
        );
    }
    if view.transfers.is_empty() {
        println!("(no transfers)");
    }

    if let Some((low, high)) = view.chart_range {
        println!();
        println!("Chart range: {:.4} .. {:.4}", low, high);
    }
    if !view.ticks.is_empty() {
        let ticks: Vec<String> = view
            .ticks
            .iter()
            .map(|t| t.format("%Y-%m-%d").to_string())
            .collect();
        println!("Time axis:   {}", ticks.join(" | "));
    }
}

/// Keep at most `max` characters of an id.
fn shorten(id: &str, max: usize) -> &str {
    match id.char_indices().nth(max) {
        Some((end, _)) => &id[..end],
        None => id,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn output_format_is_case_insensitive() {
        assert_eq!(parse_output_format("JSON"), Ok(OutputFormat::Json));
        assert_eq!(parse_output_format("table"), Ok(OutputFormat::Table));
        assert!(parse_output_format("csv").is_err());
    }

    #[test]
    fn cli_maps_onto_engine_config() {
        let cli = Cli::parse_from([
            "ledgerscope",
            "--account",
            "alice",
            "--page-size",
            "25",
            "--page-timeout-secs",
            "3",
            "--tick-count",
            "4",
        ]);
        let config = cli.engine_config();

        assert_eq!(config.page_size, 25);
        assert_eq!(config.page_timeout, Duration::from_secs(3));
        assert_eq!(config.tick_count, 4);
        assert_eq!(config.contract, "eosio.token");
    }

    #[test]
    fn ids_are_shortened_on_char_boundaries() {
        assert_eq!(shorten("abcdef", 3), "abc");
        assert_eq!(shorten("ab", 3), "ab");
        assert_eq!(shorten("ééé", 2), "éé");
    }
}
