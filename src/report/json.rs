//! JSON report envelope, schema 3.1

use crate::error::Result;
use crate::models::Finding;
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;
use tracing::info;

pub const SCHEMA_VERSION: &str = "3.1";

#[derive(Debug, Serialize, Deserialize)]
pub struct ScanReport {
    pub schema_version: String,
    pub run_id: String,
    pub metadata: ScanMetadata,
    pub summary: ScanSummary,
    pub results: Vec<Finding>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ScanMetadata {
    pub start_time: String,
    pub end_time: String,
    pub duration: String,
    pub target_count: usize,
    pub targets_hash: String,
    pub total_results: usize,
    pub version: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ScanSummary {
    pub total_findings: usize,
    pub by_severity: BTreeMap<String, usize>,
    pub secrets_found: usize,
    pub critical_findings: usize,
    pub max_severity: String,
}

/// 12-hex run identifier derived from the current nanosecond timestamp.
pub fn generate_run_id() -> String {
    let now = Local::now();
    let mut hasher = Sha256::new();
    hasher.update(now.to_rfc3339().as_bytes());
    hasher.update(
        now.timestamp_nanos_opt()
            .unwrap_or_default()
            .to_string()
            .as_bytes(),
    );
    let digest = format!("{:x}", hasher.finalize());
    digest[..12].to_string()
}

/// Sorts findings by URL, then status code.
pub fn sort_results(results: &mut [Finding]) {
    results.sort_by(|a, b| {
        a.url
            .cmp(&b.url)
            .then_with(|| a.status_code.cmp(&b.status_code))
    });
}

/// Assembles the report envelope from finalized findings.
pub fn build_report(
    results: &[Finding],
    targets: &[String],
    run_id: &str,
    start_time: DateTime<Local>,
    duration: Duration,
) -> ScanReport {
    let mut sorted = results.to_vec();
    sort_results(&mut sorted);

    let rounded = Duration::from_millis(duration.as_millis() as u64);
    let end_time = start_time + chrono::Duration::from_std(rounded).unwrap_or_default();

    ScanReport {
        schema_version: SCHEMA_VERSION.to_string(),
        run_id: run_id.to_string(),
        metadata: ScanMetadata {
            start_time: start_time.to_rfc3339(),
            end_time: end_time.to_rfc3339(),
            duration: format!("{rounded:?}"),
            target_count: targets.len(),
            targets_hash: hash_targets(targets),
            total_results: sorted.len(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        },
        summary: build_summary(&sorted),
        results: sorted,
    }
}

/// Writes the report envelope as pretty-printed JSON.
pub fn save_report(
    results: &[Finding],
    output_path: &Path,
    targets: &[String],
    run_id: &str,
    start_time: DateTime<Local>,
    duration: Duration,
) -> Result<()> {
    let report = build_report(results, targets, run_id, start_time, duration);
    let json = serde_json::to_string_pretty(&report)?;
    std::fs::write(output_path, json)?;
    info!("JSON report saved to {}", output_path.display());
    Ok(())
}

fn build_summary(results: &[Finding]) -> ScanSummary {
    let mut by_severity: BTreeMap<String, usize> = ["critical", "high", "medium", "low", "info"]
        .into_iter()
        .map(|s| (s.to_string(), 0))
        .collect();

    let mut max_rank = 0u8;
    let mut max_severity = String::new();
    let mut secrets_found = 0;
    let mut critical_findings = 0;

    for r in results {
        *by_severity.entry(r.severity.to_string()).or_insert(0) += 1;
        if r.severity.rank() > max_rank {
            max_rank = r.severity.rank();
            max_severity = r.severity.to_string();
        }
        if r.secret_found {
            secrets_found += 1;
        }
        if r.critical {
            critical_findings += 1;
        }
    }

    ScanSummary {
        total_findings: results.len(),
        by_severity,
        secrets_found,
        critical_findings,
        max_severity,
    }
}

/// 16-hex truncated SHA-256 over the concatenated targets.
fn hash_targets(targets: &[String]) -> String {
    let mut hasher = Sha256::new();
    for target in targets {
        hasher.update(target.as_bytes());
    }
    let digest = format!("{:x}", hasher.finalize());
    digest[..16].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Severity;

    fn finding(url: &str, status: u16, severity: Severity) -> Finding {
        let mut f = Finding::new(url, "GET", status);
        f.severity = severity;
        f
    }

    #[test]
    fn report_sorts_and_summarizes() {
        let results = vec![
            finding("http://x.test/b", 200, Severity::High),
            finding("http://x.test/a", 403, Severity::Low),
            finding("http://x.test/a", 200, Severity::Info),
        ];
        let report = build_report(
            &results,
            &["http://x.test".to_string()],
            "abcdef012345",
            Local::now(),
            Duration::from_millis(1500),
        );

        assert_eq!(report.schema_version, "3.1");
        assert_eq!(report.results[0].url, "http://x.test/a");
        assert_eq!(report.results[0].status_code, 200);
        assert_eq!(report.results[1].status_code, 403);
        assert_eq!(report.summary.total_findings, 3);
        assert_eq!(report.summary.by_severity["high"], 1);
        assert_eq!(report.summary.by_severity["critical"], 0);
        assert_eq!(report.summary.max_severity, "high");
        assert_eq!(report.metadata.targets_hash.len(), 16);
    }

    #[test]
    fn run_ids_are_12_hex() {
        let id = generate_run_id();
        assert_eq!(id.len(), 12);
        assert!(id.chars().all(|c| c.is_ascii_hexdigit()));
    }
}
