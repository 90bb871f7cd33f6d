//! Report generation: JSON envelope and HTML

pub mod html;
pub mod json;

pub use json::{build_report, generate_run_id, save_report, sort_results, ScanReport};
