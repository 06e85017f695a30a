//! Error types for grpcbridge

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for pipeline operations
pub type BridgeResult<T> = Result<T, BridgeError>;

/// Error type for pipeline operations
///
/// Every variant is fatal. The message names the module, struct or field
/// that led to the failure.
#[derive(Error, Debug)]
pub enum BridgeError {
    /// A descriptor file could not be read or parsed
    #[error("descriptor error in {path}: {message}")]
    Descriptor { path: String, message: String },

    /// A descriptor references an undefined type or declares an unsupported shape
    #[error("ingestion failed at {element}: {reason}")]
    Ingestion { element: String, reason: String },

    /// A struct or field is missing where an invariant guarantees presence
    #[error("reference error: {0}")]
    Reference(String),

    /// Modules still import each other after cycle resolution
    #[error("unresolved import cycle: {}", .modules.join(" -> "))]
    UnresolvedCycle { modules: Vec<String> },

    /// Writing a generated artifact failed
    #[error("failed to write {}: {source}", .path.display())]
    EmissionIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl BridgeError {
    pub fn ingestion(element: impl Into<String>, reason: impl Into<String>) -> Self {
        BridgeError::Ingestion {
            element: element.into(),
            reason: reason.into(),
        }
    }

    pub fn reference(message: impl Into<String>) -> Self {
        BridgeError::Reference(message.into())
    }

    /// Returns a stable numeric code, used as the CLI's process exit status
    pub fn error_code(&self) -> u32 {
        match self {
            BridgeError::Descriptor { .. } => 1,
            BridgeError::Ingestion { .. } => 2,
            BridgeError::Reference(_) => 3,
            BridgeError::UnresolvedCycle { .. } => 4,
            BridgeError::EmissionIo { .. } => 5,
        }
    }
}
