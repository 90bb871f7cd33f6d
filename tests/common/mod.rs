//! Common test utilities

use std::io::Write;
use talos::models::ScanConfig;
use tempfile::NamedTempFile;

/// Writes a temporary wordlist file; keep the handle alive for the test.
pub fn write_wordlist(words: &[&str]) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("temp wordlist");
    for word in words {
        writeln!(file, "{word}").expect("write word");
    }
    file.flush().expect("flush wordlist");
    file
}

/// Creates a small test ScanConfig pointing at the given wordlist path.
pub fn test_config(wordlist: &str) -> ScanConfig {
    ScanConfig {
        wordlist: wordlist.to_string(),
        threads: 2,
        timeout_secs: 10,
        rate_limit: 0,
        retry_attempts: 0,
        max_response_mb: 10,
        calibration_probes: 2,
        ..ScanConfig::default()
    }
}
