//! Configuration management: optional TOML file merged under CLI flags

use crate::error::{Result, TalosError};
use crate::models::ScanConfig;
use serde::Deserialize;
use std::path::Path;

/// File-based configuration structure matching talos.toml
#[derive(Debug, Deserialize)]
struct FileConfig {
    scan: Option<ScanSection>,
}

#[derive(Debug, Deserialize)]
struct ScanSection {
    wordlist: Option<String>,
    threads: Option<usize>,
    extensions: Option<Vec<String>>,
    timeout_secs: Option<u64>,
    rate_limit: Option<u32>,
    retry_attempts: Option<u32>,
    max_response_mb: Option<usize>,
    max_depth: Option<u32>,
    calibration_probes: Option<usize>,
}

/// Loads configuration from a TOML file and merges it with defaults.
/// CLI flags are applied on top by the caller and take precedence.
pub fn load_config(path: &Path) -> Result<ScanConfig> {
    let content = std::fs::read_to_string(path).map_err(TalosError::IoError)?;
    let file_config: FileConfig = toml::from_str(&content)?;

    let mut config = ScanConfig::default();

    if let Some(scan) = file_config.scan {
        if let Some(wordlist) = scan.wordlist {
            config.wordlist = wordlist;
        }
        if let Some(threads) = scan.threads {
            config.threads = threads;
        }
        if let Some(extensions) = scan.extensions {
            config.extensions = normalize_extensions(&extensions.join(","));
        }
        if let Some(timeout) = scan.timeout_secs {
            config.timeout_secs = timeout;
        }
        if let Some(rate) = scan.rate_limit {
            config.rate_limit = rate;
        }
        if let Some(retries) = scan.retry_attempts {
            config.retry_attempts = retries;
        }
        if let Some(cap) = scan.max_response_mb {
            config.max_response_mb = cap;
        }
        if let Some(depth) = scan.max_depth {
            config.max_depth = depth;
        }
        if let Some(probes) = scan.calibration_probes {
            config.calibration_probes = probes;
        }
    }

    Ok(config)
}

/// Splits a comma-separated extension list, prefixing each with `.` if missing.
pub fn normalize_extensions(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|e| e.trim())
        .filter(|e| !e.is_empty())
        .map(|e| {
            if e.starts_with('.') {
                e.to_string()
            } else {
                format!(".{e}")
            }
        })
        .collect()
}

/// Parses repeatable `Key: Value` header flags into the custom header map.
pub fn parse_headers(raw: &[String]) -> std::collections::HashMap<String, String> {
    let mut headers = std::collections::HashMap::new();
    for h in raw {
        if let Some((key, value)) = h.split_once(':') {
            let key = key.trim();
            let value = value.trim();
            if !key.is_empty() {
                headers.insert(key.to_string(), value.to_string());
            }
        }
    }
    headers
}

/// Normalizes targets in place: schemeless inputs default to `http://`,
/// trailing slashes are trimmed from the base.
pub fn normalize_targets(targets: &mut [String]) {
    for target in targets.iter_mut() {
        if !target.starts_with("http://") && !target.starts_with("https://") {
            *target = format!("http://{target}");
        }
        while target.ends_with('/') {
            target.pop();
        }
    }
}

/// Validates the configuration against the resolved target list.
pub fn validate(config: &ScanConfig, targets: &[String]) -> Result<()> {
    if targets.is_empty() {
        return Err(TalosError::ConfigError("no targets specified".to_string()));
    }
    if config.wordlist.is_empty() {
        return Err(TalosError::ConfigError(
            "wordlist is required (-w)".to_string(),
        ));
    }
    if !Path::new(&config.wordlist).exists() {
        return Err(TalosError::ConfigError(format!(
            "wordlist file not found: {}",
            config.wordlist
        )));
    }
    if config.threads == 0 {
        return Err(TalosError::ConfigError(
            "threads must be at least 1".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extensions_get_dot_prefix() {
        assert_eq!(
            normalize_extensions("php, .html ,txt"),
            vec![".php", ".html", ".txt"]
        );
    }

    #[test]
    fn targets_default_to_http_and_lose_trailing_slash() {
        let mut targets = vec![
            "example.com/".to_string(),
            "https://site.test".to_string(),
        ];
        normalize_targets(&mut targets);
        assert_eq!(targets[0], "http://example.com");
        assert_eq!(targets[1], "https://site.test");
    }

    #[test]
    fn header_flags_parse() {
        let headers = parse_headers(&[
            "X-Api-Key: abc123".to_string(),
            "broken-header".to_string(),
        ]);
        assert_eq!(headers.get("X-Api-Key").map(String::as_str), Some("abc123"));
        assert_eq!(headers.len(), 1);
    }
}
