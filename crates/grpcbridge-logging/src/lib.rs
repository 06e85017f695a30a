//! grpcbridge-logging - Tracing subscriber setup
//!
//! This crate provides:
//! - [`init_logging`] installing a stderr formatter filtered by level or `RUST_LOG`
//! - [`DiagnosticsLayer`] counting warnings and errors for the end-of-run summary
//! - [`Diagnostics`] the shared counters read by the CLI

mod layer;

pub use grpcbridge_core::LogLevel;
pub use layer::{Diagnostics, DiagnosticsLayer, convert_level_to_filter, init_logging};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::{Diagnostics, DiagnosticsLayer, LogLevel, init_logging};
}
