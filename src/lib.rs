//! Talos - Concurrent Web Content-Discovery Scanner
//!
//! Probes HTTP/HTTPS targets with a wordlist fan-out, filters soft-404
//! noise through per-target calibration, inspects bodies for embedded
//! credentials, fingerprints WAF products, attempts authorization bypasses
//! on forbidden paths, and optionally recurses into discovered directories.
//! Findings are severity-scored, deduplicated, and emitted to a live
//! observer and to JSON/HTML reports.

pub mod config;
pub mod detection;
pub mod error;
pub mod http;
pub mod models;
pub mod report;
pub mod scanner;
pub mod ui;
pub mod wordlist;
