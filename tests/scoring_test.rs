//! Scoring, deduplication, and exit-code rules

use talos::models::{Confidence, Finding, Severity};
use talos::scanner::scoring::assign_severity;
use talos::scanner::{determine_exit_code, Deduplicator, EXIT_OK, EXIT_THRESHOLD_FAILED};

fn finding(url: &str, method: &str, status: u16) -> Finding {
    Finding::new(url, method, status)
}

#[test]
fn secret_findings_are_critical_and_confirmed() {
    let mut f = finding("http://example.com/config", "GET", 200);
    f.secret_found = true;
    f.secret_types = vec!["AWS Access Key".to_string()];
    assign_severity(&mut f);

    assert_eq!(f.severity, Severity::Critical);
    assert_eq!(f.confidence, Confidence::Confirmed);
    assert!(f.tags.iter().any(|t| t == "secret"));
}

#[test]
fn bypass_findings_are_high_and_firm() {
    let mut f = finding("http://example.com/admin [BYPASS]", "GET+BYPASS", 200);
    f.critical = true;
    assign_severity(&mut f);

    assert_eq!(f.severity, Severity::High);
    assert_eq!(f.confidence, Confidence::Firm);
    assert!(f.tags.iter().any(|t| t == "bypass"));
}

#[test]
fn method_fuzz_findings_are_tagged() {
    let mut f = finding("http://example.com/api", "POST", 200);
    f.critical = true;
    assign_severity(&mut f);

    assert_eq!(f.severity, Severity::High);
    assert!(f.tags.iter().any(|t| t == "method-fuzz"));
}

#[test]
fn plain_200_stays_info() {
    let mut f = finding("http://example.com/page", "GET", 200);
    assign_severity(&mut f);

    assert_eq!(f.severity, Severity::Info);
    assert_eq!(f.confidence, Confidence::Tentative);
    assert!(f.tags.is_empty());
}

#[test]
fn directories_are_low() {
    let mut f = finding("http://example.com/dir/", "GET", 200);
    assign_severity(&mut f);

    assert_eq!(f.severity, Severity::Low);
    assert!(f.tags.iter().any(|t| t == "directory"));
}

#[test]
fn forbidden_responses_are_access_control() {
    let mut f = finding("http://example.com/secret", "GET", 403);
    assign_severity(&mut f);

    assert_eq!(f.severity, Severity::Low);
    assert_eq!(f.confidence, Confidence::Tentative);
    assert!(f.tags.iter().any(|t| t == "access-control"));
}

#[test]
fn waf_detection_only_adds_a_tag() {
    let mut f = finding("http://example.com/test", "GET", 200);
    f.waf_detected = "Cloudflare".to_string();
    assign_severity(&mut f);

    assert_eq!(f.severity, Severity::Info);
    assert!(f.tags.iter().any(|t| t == "waf"));
}

#[test]
fn secret_outranks_bypass() {
    let mut f = finding("http://example.com/admin [BYPASS]", "GET+BYPASS", 200);
    f.critical = true;
    f.secret_found = true;
    f.secret_types = vec!["AWS Access Key".to_string()];
    assign_severity(&mut f);

    assert_eq!(f.severity, Severity::Critical);
    assert_eq!(f.confidence, Confidence::Confirmed);
    assert!(f.tags.iter().any(|t| t == "secret"));
    assert!(f.tags.iter().any(|t| t == "bypass"));
}

#[test]
fn scoring_is_idempotent() {
    let mut f = finding("http://example.com/admin [BYPASS]", "GET+BYPASS", 403);
    f.critical = true;
    f.secret_found = true;
    f.secret_types = vec!["JWT Token".to_string()];
    f.waf_detected = "Imperva".to_string();

    assign_severity(&mut f);
    let first = (f.severity, f.confidence, f.tags.clone());
    assign_severity(&mut f);
    let second = (f.severity, f.confidence, f.tags.clone());

    assert_eq!(first, second);
}

#[test]
fn dedup_keeps_highest_severity() {
    let dedup = Deduplicator::new();

    let mut low = finding("http://example.com/a", "GET", 200);
    low.severity = Severity::Low;
    let mut high = finding("http://example.com/a", "GET", 200);
    high.severity = Severity::High;

    assert!(dedup.add(&low));
    assert!(dedup.add(&high), "higher severity replaces");
    assert!(!dedup.add(&low), "lower severity is rejected");

    let results = dedup.results();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].severity, Severity::High);
}

#[test]
fn dedup_ties_keep_first_observation() {
    let dedup = Deduplicator::new();

    let mut first = finding("http://example.com/a", "GET", 200);
    first.severity = Severity::Medium;
    first.server = "first".to_string();
    let mut second = finding("http://example.com/a", "GET", 200);
    second.severity = Severity::Medium;
    second.server = "second".to_string();

    assert!(dedup.add(&first));
    assert!(!dedup.add(&second));
    assert_eq!(dedup.results()[0].server, "first");
}

#[test]
fn dedup_distinguishes_methods() {
    let dedup = Deduplicator::new();
    assert!(dedup.add(&finding("http://example.com/a", "GET", 200)));
    assert!(dedup.add(&finding("http://example.com/a", "POST", 200)));
    assert_eq!(dedup.len(), 2);
}

#[test]
fn fail_on_threshold_exit_codes() {
    let mut high = finding("http://example.com/a", "GET", 200);
    high.severity = Severity::High;
    let mut low = finding("http://example.com/b", "GET", 403);
    low.severity = Severity::Low;
    let results = vec![high, low];

    assert_eq!(determine_exit_code(&results, None), EXIT_OK);
    assert_eq!(
        determine_exit_code(&results, Some(Severity::Medium)),
        EXIT_THRESHOLD_FAILED
    );
    assert_eq!(
        determine_exit_code(&results, Some(Severity::High)),
        EXIT_THRESHOLD_FAILED
    );
    assert_eq!(
        determine_exit_code(&results, Some(Severity::Critical)),
        EXIT_OK
    );
    assert_eq!(determine_exit_code(&[], Some(Severity::Info)), EXIT_OK);
}
