//! Live scan events consumed by the terminal UI

use crate::models::Finding;

/// Typed event stream from the engine to an attached observer.
/// The engine emits `ScanComplete` and drops its sender at termination.
#[derive(Debug, Clone)]
pub enum ScanEvent {
    UrlTrying { url: String },
    ResultFound(Box<Finding>),
    ScanComplete,
}
