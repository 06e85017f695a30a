//! Code generation from the prepared schema IR.
//!
//! Every generator is a pure reader of the IR returned by
//! [`grpcbridge_core::prepare`] and produces an in-memory list of
//! [`GeneratedFile`]s. Nothing touches the filesystem until
//! [`write_files`] runs.
//!
//! # Generators
//!
//! - **Schema**: one `.proto` file per module ([`proto`])
//! - **Codecs**: `<Module>GrpcMarshaller` and `<Module>ThriftMarshaller` Java classes ([`marshaller`])
//! - **Service adapters**: one `<Service>GrpcService` Java class per service ([`service`])
//! - **Client stub**: the `ThriftStub` interface the adapters call through ([`stub`])
//!
//! # Architecture
//!
//! ```text
//! DescriptorSet
//!     ↓
//!  [ingest → resolve_cycles → record_references]   (grpcbridge-core)
//!     ↓
//!   SchemaIr
//!     ↓
//!  ├─→ [proto]      → <package>/<module>.proto
//!  ├─→ [marshaller] → <Module>{Grpc,Thrift}Marshaller.java
//!  ├─→ [service]    → <Service>GrpcService.java
//!  └─→ [stub]       → ThriftStub.java
//! ```

pub mod java;
pub mod marshaller;
pub mod naming;
pub mod proto;
pub mod service;
pub mod stub;

use grpcbridge_core::{BridgeError, BridgeResult};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

pub use marshaller::{MarshallerOptions, generate_marshallers};
pub use proto::{ProtoOptions, emit_proto};
pub use service::{ServiceOptions, generate_services};
pub use stub::{StubOptions, generate_stub};

/// A rendered artifact, relative to an output root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedFile {
    pub path: PathBuf,
    pub content: String,
}

impl GeneratedFile {
    pub fn new(path: impl Into<PathBuf>, content: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            content: content.into(),
        }
    }
}

/// Directory for a dotted package below `root`.
pub fn package_dir(package: &str) -> PathBuf {
    package.split('.').filter(|s| !s.is_empty()).collect()
}

/// Write `files` below `root`, creating directories as needed.
///
/// Returns the number of files written.
pub fn write_files(root: &Path, files: &[GeneratedFile]) -> BridgeResult<usize> {
    for file in files {
        let path = root.join(&file.path);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|source| BridgeError::EmissionIo {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        fs::write(&path, &file.content).map_err(|source| BridgeError::EmissionIo {
            path: path.clone(),
            source,
        })?;
        debug!(path = %path.display(), bytes = file.content.len(), "wrote file");
    }
    Ok(files.len())
}
