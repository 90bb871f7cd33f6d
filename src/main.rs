//! Talos scanner CLI

use clap::Parser;
use colored::Colorize;
use std::io::{BufRead, IsTerminal};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use talos::config;
use talos::error::TalosError;
use talos::models::{ScanConfig, Severity};
use talos::report;
use talos::scanner::{determine_exit_code, Engine, EXIT_OK, EXIT_SCAN_ERROR};
use talos::ui;
use talos::wordlist;

/// Concurrent web content-discovery scanner
#[derive(Parser)]
#[command(name = "talos", version, about, long_about = None)]
struct Cli {
    /// Target URL (or pipe targets via stdin, one per line)
    #[arg(short = 'u', long)]
    target: Option<String>,

    /// Path to the wordlist file
    #[arg(short = 'w', long)]
    wordlist: Option<String>,

    /// Number of concurrent workers (default: 50)
    #[arg(short = 't', long)]
    threads: Option<usize>,

    /// Extensions appended to every word (comma-separated, e.g. php,html)
    #[arg(short = 'x', long)]
    extensions: Option<String>,

    /// Per-request timeout in seconds (default: 10)
    #[arg(long)]
    timeout: Option<u64>,

    /// Max requests per second per host (default: 0 = unlimited)
    #[arg(long)]
    rate_limit: Option<u32>,

    /// Retry attempts on 5xx or transport errors (default: 2)
    #[arg(long)]
    retries: Option<u32>,

    /// Max response body size in MiB (default: 10)
    #[arg(long)]
    max_response_mb: Option<usize>,

    /// Recursive scanning depth (default: 0 = disabled)
    #[arg(long)]
    depth: Option<u32>,

    /// Custom header, repeatable (format: "Key: Value")
    #[arg(short = 'H', long = "header")]
    headers: Vec<String>,

    /// Calibration probes per target (default: 5)
    #[arg(long)]
    calibration_probes: Option<usize>,

    /// Exit with code 2 when findings meet this severity threshold
    #[arg(long)]
    fail_on: Option<String>,

    /// JSON report path
    #[arg(short = 'o', long)]
    output: Option<String>,

    /// HTML report path
    #[arg(long)]
    html: Option<String>,

    /// Path to a TOML configuration file
    #[arg(short = 'c', long)]
    config: Option<PathBuf>,

    /// Stream findings as they arrive instead of the progress bar
    #[arg(short = 'v', long)]
    verbose: bool,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        "talos=debug"
    } else {
        "talos=info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    std::process::exit(run(cli).await);
}

async fn run(cli: Cli) -> i32 {
    ui::print_banner();

    let scan_config = match build_config(&cli) {
        Ok(config) => config,
        Err(message) => {
            eprintln!("{} {message}", "Error:".red().bold());
            return EXIT_SCAN_ERROR;
        }
    };

    let mut targets = match read_targets(&cli) {
        Ok(targets) => targets,
        Err(message) => {
            eprintln!("{} {message}", "Error:".red().bold());
            return EXIT_SCAN_ERROR;
        }
    };
    config::normalize_targets(&mut targets);

    if let Err(e) = config::validate(&scan_config, &targets) {
        eprintln!("{} {e}", "Error:".red().bold());
        return EXIT_SCAN_ERROR;
    }

    let word_count = wordlist::count(&scan_config.wordlist).unwrap_or(0);
    ui::print_config(&scan_config, targets.len(), word_count);

    let engine = match Engine::new(scan_config.clone()) {
        Ok(engine) => Arc::new(engine),
        Err(e) => {
            eprintln!("{} {e}", "Error:".red().bold());
            return EXIT_SCAN_ERROR;
        }
    };

    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                eprintln!("\n  [!] interrupt received, shutting down gracefully...");
                cancel.cancel();
            }
        });
    }

    let run_id = report::generate_run_id();
    let (event_tx, event_rx) = mpsc::channel(scan_config.threads * 4);

    let mut engine_task = {
        let engine = Arc::clone(&engine);
        let targets = targets.clone();
        let cancel = cancel.clone();
        tokio::spawn(async move { engine.run_with_events(&targets, cancel, Some(event_tx)).await })
    };

    // Attach the live UI once the engine publishes its stats handle; if the
    // engine fails before that (e.g. wordlist load), surface the error.
    let mut stats_rx = engine.stats_handle();
    let early_result = tokio::select! {
        res = &mut engine_task => Some(res),
        changed = stats_rx.wait_for(|s| s.is_some()) => {
            changed.ok();
            None
        }
    };

    let result = match early_result {
        Some(res) => res,
        None => {
            let stats = stats_rx
                .borrow()
                .clone()
                .expect("stats published before workers start");
            let ui_task = tokio::spawn(ui::run_live_ui(
                Arc::clone(&stats),
                event_rx,
                scan_config.verbose,
            ));
            let res = engine_task.await;
            let _ = ui_task.await;
            res
        }
    };

    let (findings, stats) = match result {
        Ok(Ok(outcome)) => outcome,
        Ok(Err(TalosError::Cancelled)) => {
            eprintln!("  [!] scan cancelled before start");
            return EXIT_OK;
        }
        Ok(Err(e)) => {
            eprintln!("Scan error: {e}");
            return EXIT_SCAN_ERROR;
        }
        Err(e) => {
            eprintln!("Scan task failed: {e}");
            return EXIT_SCAN_ERROR;
        }
    };

    if cancel.is_cancelled() {
        eprintln!("  [!] scan cancelled, reporting partial results");
    }

    ui::print_summary(&stats, &findings);

    if let Some(ref path) = scan_config.output_file {
        match report::save_report(
            &findings,
            Path::new(path),
            &targets,
            &run_id,
            stats.started_at(),
            stats.elapsed(),
        ) {
            Ok(()) => println!("  JSON report saved: {}", path.green()),
            Err(e) => eprintln!("Failed to save JSON report: {e}"),
        }
    }

    if let Some(ref path) = scan_config.html_report {
        match report::html::generate(&findings, &targets, Path::new(path)) {
            Ok(()) => println!("  HTML report saved: {}", path.green()),
            Err(e) => eprintln!("Failed to generate HTML report: {e}"),
        }
    }

    let exit_code = determine_exit_code(&findings, scan_config.fail_on);
    if exit_code != EXIT_OK {
        eprintln!(
            "\n  [!] findings meet --fail-on {} threshold (exit code {exit_code})",
            scan_config
                .fail_on
                .map(|s| s.to_string())
                .unwrap_or_default()
        );
    }
    exit_code
}

/// Merges the optional TOML config file with CLI flags; flags win.
fn build_config(cli: &Cli) -> std::result::Result<ScanConfig, String> {
    let mut config = match &cli.config {
        Some(path) => config::load_config(path).map_err(|e| e.to_string())?,
        None => ScanConfig::default(),
    };

    if let Some(ref wordlist) = cli.wordlist {
        config.wordlist = wordlist.clone();
    }
    if let Some(threads) = cli.threads {
        config.threads = threads;
    }
    if let Some(ref extensions) = cli.extensions {
        config.extensions = config::normalize_extensions(extensions);
    }
    if let Some(timeout) = cli.timeout {
        config.timeout_secs = timeout;
    }
    if let Some(rate) = cli.rate_limit {
        config.rate_limit = rate;
    }
    if let Some(retries) = cli.retries {
        config.retry_attempts = retries;
    }
    if let Some(cap) = cli.max_response_mb {
        config.max_response_mb = cap;
    }
    if let Some(depth) = cli.depth {
        config.max_depth = depth;
    }
    if !cli.headers.is_empty() {
        config.custom_headers.extend(config::parse_headers(&cli.headers));
    }
    if let Some(probes) = cli.calibration_probes {
        config.calibration_probes = probes;
    }
    if let Some(ref fail_on) = cli.fail_on {
        config.fail_on = Some(fail_on.parse::<Severity>()?);
    }
    config.output_file = cli.output.clone();
    config.html_report = cli.html.clone();
    config.verbose = cli.verbose;

    Ok(config)
}

/// Targets come from stdin when piped (one per line, `#` comments skipped),
/// otherwise from `--target`.
fn read_targets(cli: &Cli) -> std::result::Result<Vec<String>, String> {
    let stdin = std::io::stdin();
    let mut targets = Vec::new();

    if !stdin.is_terminal() {
        println!("  {}", "Reading targets from stdin...".dimmed());
        for line in stdin.lock().lines().map_while(|l| l.ok()) {
            let line = line.trim();
            if !line.is_empty() && !line.starts_with('#') {
                targets.push(line.to_string());
            }
        }
        println!("  {}", format!("Loaded {} targets", targets.len()).dimmed());
    } else if let Some(ref target) = cli.target {
        targets.push(target.clone());
    }

    if targets.is_empty() {
        return Err("no target specified (use -u or pipe targets via stdin)".to_string());
    }
    Ok(targets)
}
