//! grpcbridge-cli - Thrift to gRPC migration tool
//!
//! - [`codegen`] renders proto schemas, codec classes, service adapters and the stub interface
//! - [`config`] reads and validates `grpcbridge.toml`
//! - [`generate`] drives the pipeline and writes the selected artifacts

pub mod codegen;
pub mod config;
pub mod generate;
