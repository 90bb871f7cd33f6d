//! Per-target calibration against soft-404 noise
//!
//! Before workers touch a target, a handful of requests to random paths
//! that cannot exist record what "not found" looks like there. Workers
//! discard responses matching a cached signature instead of reporting
//! decorated error pages as findings.

use crate::http::Transport;
use reqwest::Method;
use std::collections::HashMap;
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Tuple characterizing a known-negative response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResponseSignature {
    pub status_code: u16,
    pub size: usize,
    pub word_count: usize,
    pub line_count: usize,
}

impl ResponseSignature {
    /// Builds a signature from a response status and body text.
    pub fn from_body(status_code: u16, body: &str) -> Self {
        Self {
            status_code,
            size: body.len(),
            word_count: body.split_whitespace().count(),
            line_count: body.matches('\n').count() + 1,
        }
    }
}

/// Target URL → negative-response signatures. Written once per target
/// before its workers start, then read concurrently.
pub struct CalibrationCache {
    signatures: RwLock<HashMap<String, Vec<ResponseSignature>>>,
}

impl CalibrationCache {
    pub fn new() -> Self {
        Self {
            signatures: RwLock::new(HashMap::new()),
        }
    }

    /// Signatures for a target; empty when calibration found none or failed.
    pub async fn get(&self, target: &str) -> Vec<ResponseSignature> {
        self.signatures
            .read()
            .await
            .get(target)
            .cloned()
            .unwrap_or_default()
    }

    pub async fn insert(&self, target: &str, sigs: Vec<ResponseSignature>) {
        self.signatures.write().await.insert(target.to_string(), sigs);
    }
}

impl Default for CalibrationCache {
    fn default() -> Self {
        Self::new()
    }
}

/// Reports whether a candidate response matches any cached signature:
/// same status, and size within `max(50 bytes, 5%)` of the signature.
pub fn matches_signature(
    status_code: u16,
    size: usize,
    signatures: &[ResponseSignature],
) -> bool {
    signatures.iter().any(|sig| {
        if sig.status_code != status_code {
            return false;
        }
        let tolerance = (sig.size / 20).max(50);
        size.abs_diff(sig.size) <= tolerance
    })
}

/// Probes a target with random hexadecimal paths (plain and with up to two
/// of the configured extensions), records the deduplicated signatures, and
/// caches them under the target URL. Probe failures degrade to an empty
/// signature set; the scan proceeds unfiltered.
pub async fn calibrate(
    transport: &Transport,
    target: &str,
    custom_headers: &HashMap<String, String>,
    probes: usize,
    extensions: &[String],
    cache: &CalibrationCache,
    cancel: &CancellationToken,
) -> Vec<ResponseSignature> {
    let mut paths = Vec::with_capacity(probes + 2);
    for _ in 0..probes.max(1) {
        paths.push(uuid::Uuid::new_v4().simple().to_string());
    }
    for ext in extensions.iter().take(2) {
        paths.push(format!("{}{ext}", uuid::Uuid::new_v4().simple()));
    }

    let headers: Vec<(String, String)> = custom_headers
        .iter()
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect();

    let mut signatures: Vec<ResponseSignature> = Vec::new();
    for path in &paths {
        if cancel.is_cancelled() {
            break;
        }
        let url = format!("{}/{path}", target.trim_end_matches('/'));
        match transport.execute(Method::GET, &url, &headers).await {
            Ok(resp) => {
                let sig = ResponseSignature::from_body(resp.status, &resp.body_text());
                if !signatures.contains(&sig) {
                    signatures.push(sig);
                }
            }
            Err(e) => {
                debug!("calibration probe failed for {url}: {e}");
            }
        }
    }

    if signatures.is_empty() {
        warn!("calibration produced no signatures for {target}, filtering disabled");
    }

    cache.insert(target, signatures.clone()).await;
    signatures
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matching_is_reflexive() {
        let sig = ResponseSignature {
            status_code: 404,
            size: 100,
            word_count: 10,
            line_count: 5,
        };
        assert!(matches_signature(404, 100, &[sig]));
    }

    #[test]
    fn matching_respects_tolerance() {
        let sigs = [ResponseSignature {
            status_code: 404,
            size: 100,
            word_count: 10,
            line_count: 5,
        }];
        // 5% of 100 is below the 50-byte floor, so the floor applies.
        assert!(matches_signature(404, 150, &sigs));
        assert!(!matches_signature(404, 151, &sigs));
        assert!(!matches_signature(200, 100, &sigs));
    }

    #[test]
    fn large_signatures_use_percentage_tolerance() {
        let sigs = [ResponseSignature {
            status_code: 200,
            size: 10_000,
            word_count: 100,
            line_count: 50,
        }];
        assert!(matches_signature(200, 10_400, &sigs));
        assert!(!matches_signature(200, 10_600, &sigs));
    }

    #[test]
    fn signature_from_body_counts() {
        let sig = ResponseSignature::from_body(404, "not found\ntry again\n");
        assert_eq!(sig.size, 20);
        assert_eq!(sig.word_count, 4);
        assert_eq!(sig.line_count, 3);
    }
}
