//! HTTP transport layer for the Talos scanner

pub mod transport;

pub use transport::{HttpResponse, Transport};
