//! Core data models for the Talos scanner

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

/// Severity level for scan findings
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Critical,
    High,
    Medium,
    Low,
    Info,
}

impl Severity {
    /// Numeric rank for comparisons. Higher rank = more severe.
    pub fn rank(&self) -> u8 {
        match self {
            Severity::Critical => 5,
            Severity::High => 4,
            Severity::Medium => 3,
            Severity::Low => 2,
            Severity::Info => 1,
        }
    }

    /// Reports whether `self` is at or above `threshold`.
    pub fn at_or_above(&self, threshold: Severity) -> bool {
        self.rank() >= threshold.rank()
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Critical => write!(f, "critical"),
            Severity::High => write!(f, "high"),
            Severity::Medium => write!(f, "medium"),
            Severity::Low => write!(f, "low"),
            Severity::Info => write!(f, "info"),
        }
    }
}

impl FromStr for Severity {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "critical" => Ok(Severity::Critical),
            "high" => Ok(Severity::High),
            "medium" => Ok(Severity::Medium),
            "low" => Ok(Severity::Low),
            "info" => Ok(Severity::Info),
            other => Err(format!(
                "invalid severity '{other}' (use: critical, high, medium, low, info)"
            )),
        }
    }
}

/// Confidence level indicating evidence strength for a finding
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    /// Actively confirmed (secret matched, bypass returned content)
    Confirmed,
    /// Strong indicators without direct confirmation
    Firm,
    /// Interesting response, unverified
    Tentative,
}

impl fmt::Display for Confidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Confidence::Confirmed => write!(f, "confirmed"),
            Confidence::Firm => write!(f, "firm"),
            Confidence::Tentative => write!(f, "tentative"),
        }
    }
}

/// A single scan finding: one interesting response, classified and scored
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Finding {
    /// Full URL that produced the response
    pub url: String,
    /// HTTP status code
    pub status_code: u16,
    /// Response body size in bytes (after the transport cap)
    pub size: usize,
    /// Whitespace-delimited word count of the body
    pub word_count: usize,
    /// Line count of the body
    pub line_count: usize,
    /// `GET`, `GET+BYPASS`, or the verb that succeeded during method fuzzing
    pub method: String,
    /// RFC3339 timestamp of the request
    pub timestamp: String,
    /// `Server` response header
    pub server: String,
    /// `X-Powered-By` response header
    pub powered_by: String,
    /// User agent sent with the request
    pub user_agent: String,
    /// Detected WAF product name, empty if none
    pub waf_detected: String,
    /// Whether the body matched any secret pattern
    pub secret_found: bool,
    /// Names of matched secret patterns, catalog order
    pub secret_types: Vec<String>,
    /// Set by bypass and method-fuzz probes
    pub critical: bool,
    /// Assigned by scoring before emission
    pub severity: Severity,
    /// Assigned by scoring before emission
    pub confidence: Confidence,
    /// Classification tags (secret, bypass, method-fuzz, ...)
    pub tags: Vec<String>,
}

impl Finding {
    /// Creates an unscored finding with baseline severity and confidence.
    pub fn new(url: impl Into<String>, method: impl Into<String>, status_code: u16) -> Self {
        Self {
            url: url.into(),
            status_code,
            size: 0,
            word_count: 0,
            line_count: 0,
            method: method.into(),
            timestamp: String::new(),
            server: String::new(),
            powered_by: String::new(),
            user_agent: String::new(),
            waf_detected: String::new(),
            secret_found: false,
            secret_types: Vec::new(),
            critical: false,
            severity: Severity::Info,
            confidence: Confidence::Tentative,
            tags: Vec::new(),
        }
    }

    /// Adds a tag if it is not already present.
    pub fn add_tag(&mut self, tag: &str) {
        if !self.tags.iter().any(|t| t == tag) {
            self.tags.push(tag.to_string());
        }
    }
}

/// Configuration for a scan session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanConfig {
    /// Path to the newline-delimited wordlist
    pub wordlist: String,
    /// Number of concurrent workers
    pub threads: usize,
    /// Extensions appended to every word, each with a leading dot
    pub extensions: Vec<String>,
    /// Per-request timeout in seconds
    pub timeout_secs: u64,
    /// Per-host requests per second, 0 = unlimited
    pub rate_limit: u32,
    /// Retries per request on 5xx or transport error
    pub retry_attempts: u32,
    /// Per-response body cap in MiB
    pub max_response_mb: usize,
    /// Recursion depth limit, 0 disables recursion
    pub max_depth: u32,
    /// Additional headers injected into every request
    pub custom_headers: HashMap<String, String>,
    /// Number of random-path calibration probes per target
    pub calibration_probes: usize,
    /// Severity threshold for a nonzero exit code
    pub fail_on: Option<Severity>,
    /// JSON report path
    pub output_file: Option<String>,
    /// HTML report path
    pub html_report: Option<String>,
    /// Stream findings as they arrive instead of the live progress bar
    pub verbose: bool,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            wordlist: String::new(),
            threads: 50,
            extensions: Vec::new(),
            timeout_secs: 10,
            rate_limit: 0,
            retry_attempts: 2,
            max_response_mb: 10,
            max_depth: 0,
            custom_headers: HashMap::new(),
            calibration_probes: 5,
            fail_on: None,
            output_file: None,
            html_report: None,
            verbose: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn severity_rank_ordering() {
        assert!(Severity::Critical.rank() > Severity::High.rank());
        assert!(Severity::High.rank() > Severity::Medium.rank());
        assert!(Severity::Medium.rank() > Severity::Low.rank());
        assert!(Severity::Low.rank() > Severity::Info.rank());
    }

    #[test]
    fn severity_parse() {
        assert_eq!("CRITICAL".parse::<Severity>().unwrap(), Severity::Critical);
        assert_eq!("medium".parse::<Severity>().unwrap(), Severity::Medium);
        assert!("bogus".parse::<Severity>().is_err());
    }
}
