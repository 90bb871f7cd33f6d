//! Severity and confidence assignment
//!
//! A pure, idempotent pass over a finding before emission. Rules upgrade
//! but never downgrade an already-raised severity; the secret catalog
//! outranks everything else.

use crate::models::{Confidence, Finding, Severity};
use crate::scanner::is_directory;

const CRITICAL_SECRET_KINDS: &[&str] = &["AWS", "Private Key", "GitHub", "Stripe", "Database"];
const HIGH_SECRET_KINDS: &[&str] = &["JWT", "Slack", "Google API", "Heroku", "Mailgun", "Twilio"];

/// Enriches a finding with severity, confidence, and tags.
pub fn assign_severity(f: &mut Finding) {
    f.severity = Severity::Info;
    f.confidence = Confidence::Tentative;

    // Secrets override everything else.
    if f.secret_found && !f.secret_types.is_empty() {
        f.severity = secret_severity(&f.secret_types);
        f.confidence = Confidence::Confirmed;
        f.add_tag("secret");
    }

    if f.method.contains("BYPASS") || f.url.ends_with(" [BYPASS]") {
        if f.severity.rank() < Severity::High.rank() {
            f.severity = Severity::High;
        }
        if f.confidence != Confidence::Confirmed {
            f.confidence = Confidence::Firm;
        }
        f.add_tag("bypass");
    }

    // Method fuzzing: a non-GET verb succeeded on a 405 path.
    if f.method != "GET" && f.method != "GET+BYPASS" && !f.method.is_empty() {
        if f.severity == Severity::Info {
            f.severity = Severity::Medium;
        }
        if f.confidence == Confidence::Tentative {
            f.confidence = Confidence::Firm;
        }
        f.add_tag("method-fuzz");
    }

    if f.critical && f.severity.rank() < Severity::High.rank() {
        f.severity = Severity::High;
        f.confidence = Confidence::Firm;
    }

    if (f.status_code == 401 || f.status_code == 403) && f.severity == Severity::Info {
        f.severity = Severity::Low;
        f.confidence = Confidence::Tentative;
        f.add_tag("access-control");
    }

    // Must come after the access-control rule: is_directory also matches 403.
    if is_directory(f.status_code, &f.url) && f.severity == Severity::Info {
        f.severity = Severity::Low;
        f.add_tag("directory");
    }

    if !f.waf_detected.is_empty() {
        f.add_tag("waf");
    }
}

/// Maps detected secret kinds to the strongest applicable severity.
fn secret_severity(secret_types: &[String]) -> Severity {
    let mut highest = Severity::Info;
    for st in secret_types {
        if CRITICAL_SECRET_KINDS.iter().any(|kind| st.contains(kind)) {
            return Severity::Critical;
        }
        if HIGH_SECRET_KINDS.iter().any(|kind| st.contains(kind)) {
            highest = Severity::High;
        } else if highest == Severity::Info {
            highest = Severity::Medium;
        }
    }
    highest
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn secret_kind_mapping() {
        assert_eq!(
            secret_severity(&["AWS Access Key".to_string()]),
            Severity::Critical
        );
        assert_eq!(
            secret_severity(&["JWT Token".to_string()]),
            Severity::High
        );
        assert_eq!(
            secret_severity(&["Generic API Key".to_string()]),
            Severity::Medium
        );
        // Strongest kind wins across a mixed set.
        assert_eq!(
            secret_severity(&["Generic API Key".to_string(), "Private Key".to_string()]),
            Severity::Critical
        );
    }
}
