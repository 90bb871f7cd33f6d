//! Response content detection: secrets, WAF products, calibration filtering

pub mod calibration;
pub mod secrets;
pub mod waf;

pub use calibration::{matches_signature, CalibrationCache, ResponseSignature};
pub use secrets::detect_secrets;
pub use waf::detect_waf;
