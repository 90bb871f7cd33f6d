//! Scan engine: task generation, worker pool, aggregation, recursion

pub mod dedup;
pub mod engine;
pub mod events;
pub mod exit;
pub mod scoring;
pub mod stats;
pub mod tracker;
mod worker;

pub use dedup::Deduplicator;
pub use engine::Engine;
pub use events::ScanEvent;
pub use exit::{determine_exit_code, EXIT_OK, EXIT_SCAN_ERROR, EXIT_THRESHOLD_FAILED};
pub use stats::Stats;

/// One unit of scan work: a path candidate against a target.
#[derive(Debug, Clone)]
pub struct Task {
    pub target: String,
    pub path: String,
    pub depth: u32,
}

/// User agents rotated per request by each worker's own generator.
pub(crate) const USER_AGENTS: [&str; 4] = [
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:121.0) Gecko/20100101 Firefox/121.0",
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
];

/// Directory classification: redirects and forbidden responses behave like
/// directories, as do URLs with a trailing slash.
pub fn is_directory(status_code: u16, url: &str) -> bool {
    matches!(status_code, 301 | 302 | 403) || url.ends_with('/')
}

/// Joins a target base URL and a path candidate with exactly one slash.
pub(crate) fn join_url(target: &str, path: &str) -> String {
    format!(
        "{}/{}",
        target.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

/// Path component of a URL, `/` when unparseable.
pub(crate) fn extract_path(url: &str) -> String {
    url::Url::parse(url)
        .map(|u| u.path().to_string())
        .unwrap_or_else(|_| "/".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn join_url_normalizes_slashes() {
        assert_eq!(join_url("http://x.test/", "/admin"), "http://x.test/admin");
        assert_eq!(join_url("http://x.test", "admin"), "http://x.test/admin");
    }

    #[test]
    fn extract_path_returns_path_component() {
        assert_eq!(extract_path("http://x.test/api/users?q=1"), "/api/users");
        assert_eq!(extract_path("garbage"), "/");
    }

    #[test]
    fn directory_classification() {
        assert!(is_directory(301, "http://x.test/api"));
        assert!(is_directory(403, "http://x.test/private"));
        assert!(is_directory(200, "http://x.test/api/"));
        assert!(!is_directory(200, "http://x.test/index.html"));
    }
}
