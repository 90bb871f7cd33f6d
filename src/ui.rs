//! Terminal output: banner, live progress, finding lines, summary

use crate::models::{Finding, ScanConfig, Severity};
use crate::scanner::{ScanEvent, Stats};
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use std::sync::Arc;
use std::time::Duration;
use tabled::builder::Builder;
use tabled::settings::Style;
use tokio::sync::mpsc;

pub fn print_banner() {
    let banner = r#"
    ╔═══════════════════════════════════════╗
    ║  TALOS v3.1                           ║
    ║  Web Content Discovery Scanner        ║
    ╚═══════════════════════════════════════╝
    "#;
    println!("{}", banner.cyan());
}

pub fn print_config(config: &ScanConfig, target_count: usize, word_count: usize) {
    println!("  {} {}", "Targets:".bold(), target_count.to_string().green());
    println!("  {} {}", "Words:".bold(), word_count.to_string().cyan());
    println!(
        "  {} {}",
        "Threads:".bold(),
        config.threads.to_string().cyan()
    );
    if !config.extensions.is_empty() {
        println!(
            "  {} {}",
            "Extensions:".bold(),
            config.extensions.join(", ").cyan()
        );
    }
    if config.max_depth > 0 {
        println!(
            "  {} {}",
            "Recursion depth:".bold(),
            config.max_depth.to_string().cyan()
        );
    }
    if config.rate_limit > 0 {
        println!(
            "  {} {} req/s per host",
            "Rate limit:".bold(),
            config.rate_limit.to_string().cyan()
        );
    }
    println!();
}

/// One finding as a colored status line with badges.
pub fn format_result(f: &Finding) -> String {
    let status = f.status_code.to_string();
    let status = match f.status_code {
        200..=299 => status.green(),
        300..=399 => status.blue(),
        400..=499 => status.red(),
        500..=599 => status.yellow(),
        _ => status.white(),
    };

    let mut badges: Vec<String> = Vec::new();
    if f.critical {
        badges.push("[CRITICAL]".red().bold().to_string());
    }
    if f.secret_found {
        badges.push(
            format!("[SECRET:{}]", f.secret_types.join(","))
                .red()
                .to_string(),
        );
    }
    if !f.waf_detected.is_empty() {
        badges.push(format!("[WAF:{}]", f.waf_detected).yellow().to_string());
    }
    if f.method != "GET" && f.method != "GET+BYPASS" {
        badges.push(format!("[{}]", f.method).magenta().to_string());
    }

    let badge_str = if badges.is_empty() {
        String::new()
    } else {
        format!(" {}", badges.join(" "))
    };

    format!("{status} | {:>7}b | {}{badge_str}", f.size, f.url)
}

/// Consumes the event stream until the engine closes it. In verbose mode
/// findings stream as plain lines; otherwise a progress bar tracks the
/// counters and findings print above it.
pub async fn run_live_ui(
    stats: Arc<Stats>,
    mut events: mpsc::Receiver<ScanEvent>,
    verbose: bool,
) {
    if verbose {
        while let Some(event) = events.recv().await {
            match event {
                ScanEvent::ResultFound(finding) => println!("{}", format_result(&finding)),
                ScanEvent::UrlTrying { .. } | ScanEvent::ScanComplete => {}
            }
        }
        return;
    }

    let pb = ProgressBar::new(stats.total());
    pb.set_style(
        ProgressStyle::default_bar()
            .template("  {spinner:.cyan} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=>-"),
    );

    let mut ticker = tokio::time::interval(Duration::from_millis(250));
    loop {
        tokio::select! {
            event = events.recv() => {
                match event {
                    Some(ScanEvent::ResultFound(finding)) => pb.println(format_result(&finding)),
                    Some(ScanEvent::UrlTrying { .. }) => {}
                    Some(ScanEvent::ScanComplete) | None => break,
                }
            }
            _ = ticker.tick() => {
                pb.set_length(stats.total());
                pb.set_position(stats.processed());
                pb.set_message(format!(
                    "{:.0} req/s | found: {} | secrets: {} | waf: {} | errors: {}",
                    stats.requests_per_second(),
                    stats.found(),
                    stats.secrets(),
                    stats.waf_hits(),
                    stats.errors(),
                ));
            }
        }
    }
    pb.finish_and_clear();
}

pub fn print_summary(stats: &Stats, findings: &[Finding]) {
    let severities = [
        (Severity::Critical, "Critical"),
        (Severity::High, "High"),
        (Severity::Medium, "Medium"),
        (Severity::Low, "Low"),
        (Severity::Info, "Info"),
    ];

    println!("\n{}", "  Scan Summary".bold());
    println!("  {}", "─".repeat(35));

    let mut builder = Builder::default();
    builder.push_record(["Severity", "Count"]);
    for (severity, label) in &severities {
        let count = findings.iter().filter(|f| &f.severity == severity).count();
        builder.push_record([label.to_string(), count.to_string()]);
    }
    builder.push_record(["Total".to_string(), findings.len().to_string()]);

    let mut table = builder.build();
    table.with(Style::rounded());
    println!("{table}");

    let elapsed = stats.elapsed();
    println!("\n  {} {}", "Requests:".bold(), stats.processed());
    println!("  {} {}", "Findings:".bold(), stats.found());
    println!("  {} {}", "Secrets:".bold(), stats.secrets());
    println!("  {} {}", "WAF detections:".bold(), stats.waf_hits());
    println!("  {} {}", "Errors:".bold(), stats.errors());
    println!("  {} {:.2?}", "Duration:".bold(), elapsed);
    println!(
        "  {} {:.2}",
        "Req/s:".bold(),
        stats.requests_per_second()
    );
}
