//! Exit codes for CI integration

use crate::models::{Finding, Severity};

pub const EXIT_OK: i32 = 0;
pub const EXIT_SCAN_ERROR: i32 = 1;
pub const EXIT_THRESHOLD_FAILED: i32 = 2;

/// Returns `EXIT_THRESHOLD_FAILED` when any finding meets or exceeds the
/// `--fail-on` threshold, `EXIT_OK` otherwise (including no threshold).
pub fn determine_exit_code(results: &[Finding], threshold: Option<Severity>) -> i32 {
    let Some(threshold) = threshold else {
        return EXIT_OK;
    };
    if results.iter().any(|r| r.severity.at_or_above(threshold)) {
        EXIT_THRESHOLD_FAILED
    } else {
        EXIT_OK
    }
}
