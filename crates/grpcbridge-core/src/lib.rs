//! grpcbridge-core - Schema IR, ingestion and cycle resolution
//!
//! This crate provides the front half of the Thrift to gRPC migration pipeline:
//! - [`DescriptorSet`] the input contract describing source enums, structs and services
//! - [`SchemaIr`] the run-scoped intermediate representation keyed by module
//! - [`ingest`] which turns descriptors into IR entities
//! - [`resolve_cycles`] which relocates contended structs so no two modules import each other
//! - [`record_references`] which adds the optional `origin` module
//! - [`BridgeError`] for error handling
//!
//! The emitters in `grpcbridge-cli` are pure readers of the IR produced by [`prepare`].

mod descriptor;
mod error;
mod ingest;
mod ir;
pub mod naming;
mod pipeline;
mod references;
mod resolve;

pub use descriptor::{
    DescriptorSet, EnumDescriptor, EnumValue, FieldDescriptor, RpcDescriptor, ServiceDescriptor,
    StructDescriptor, TypeDescriptor, TypeFilter, TypeRef, TypeRefError,
};
pub use error::{BridgeError, BridgeResult};
pub use ingest::{IngestStats, ingest};
pub use ir::{
    BYTES_SENTINEL, COMMON_MODULE, ContainerKind, EMPTY_STRUCT, Field, FieldType, Module,
    NameRegistry, ORIGIN_MODULE, REQUEST_MODULE, RESPONSE_MODULE, Rpc, SchemaIr, Service,
    SourceRef, Struct,
};
pub use pipeline::{Prepared, prepare};
pub use references::record_references;
pub use resolve::{ResolveStats, resolve_cycles};

/// Log levels accepted by the CLI and configuration file
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Trace = 0,
    Debug = 1,
    Info = 2,
    Warn = 3,
    Error = 4,
    Off = 5,
}

impl LogLevel {
    pub fn from_u8(value: u8) -> Self {
        match value {
            0 => LogLevel::Trace,
            1 => LogLevel::Debug,
            2 => LogLevel::Info,
            3 => LogLevel::Warn,
            4 => LogLevel::Error,
            _ => LogLevel::Off,
        }
    }

    /// Level selected by repeating `-v` on the command line, starting from `base`.
    pub fn raised_by(base: LogLevel, verbosity: u8) -> Self {
        LogLevel::from_u8((base as u8).saturating_sub(verbosity))
    }
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LogLevel::Trace => write!(f, "TRACE"),
            LogLevel::Debug => write!(f, "DEBUG"),
            LogLevel::Info => write!(f, "INFO"),
            LogLevel::Warn => write!(f, "WARN"),
            LogLevel::Error => write!(f, "ERROR"),
            LogLevel::Off => write!(f, "OFF"),
        }
    }
}

impl std::str::FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "trace" => Ok(LogLevel::Trace),
            "debug" => Ok(LogLevel::Debug),
            "info" => Ok(LogLevel::Info),
            "warn" | "warning" => Ok(LogLevel::Warn),
            "error" => Ok(LogLevel::Error),
            "off" => Ok(LogLevel::Off),
            other => Err(format!("unknown log level: {other}")),
        }
    }
}

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::{
        BridgeError, BridgeResult, DescriptorSet, LogLevel, SchemaIr, TypeDescriptor, TypeFilter,
        prepare,
    };
}
