//! Error types for the Talos scanner

use thiserror::Error;

/// Main error type for Talos operations
#[derive(Debug, Error)]
pub enum TalosError {
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("request timed out: {0}")]
    Timeout(String),

    #[error("circuit breaker open for host: {0}")]
    CircuitOpen(String),

    #[error("URL parse error: {0}")]
    UrlError(#[from] url::ParseError),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("template error: {0}")]
    TemplateError(#[from] tera::Error),

    #[error("configuration error: {0}")]
    ConfigError(String),

    #[error("wordlist error: {0}")]
    WordlistError(String),

    #[error("scan error: {0}")]
    ScanError(String),

    #[error("scan cancelled")]
    Cancelled,
}

impl TalosError {
    /// True for per-request failures that a worker absorbs and counts,
    /// as opposed to structural errors that abort the scan.
    pub fn is_request_error(&self) -> bool {
        matches!(
            self,
            TalosError::HttpError(_) | TalosError::Timeout(_) | TalosError::CircuitOpen(_)
        )
    }
}

/// Result type alias for Talos operations
pub type Result<T> = std::result::Result<T, TalosError>;
