//! `grpcbridge.toml` parsing and validation

use crate::codegen::{MarshallerOptions, ProtoOptions, ServiceOptions, StubOptions};
use anyhow::{Context, Result};
use grpcbridge_core::{LogLevel, TypeFilter};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default configuration file name.
pub const DEFAULT_CONFIG: &str = "grpcbridge.toml";

/// grpcbridge.toml structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BridgeConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Add the `origin` module recording each struct's source type.
    #[serde(default)]
    pub record_references: bool,

    pub source: SourceSection,

    pub proto: ProtoSection,

    #[serde(default)]
    pub marshaller: Option<MarshallerSection>,

    #[serde(default)]
    pub service: Option<PackageSection>,

    #[serde(default)]
    pub stub: Option<PackageSection>,

    /// Directory relative paths are resolved against.
    #[serde(skip)]
    pub base_dir: PathBuf,
}

fn default_log_level() -> String {
    "info".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceSection {
    /// Descriptor files, `.json` or `.toml`.
    pub descriptors: Vec<String>,

    #[serde(default)]
    pub include: Vec<String>,

    #[serde(default)]
    pub exclude: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProtoSection {
    pub output: String,
    pub package: String,

    /// Defaults to `package`.
    #[serde(default)]
    pub java_package: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarshallerSection {
    pub output: String,
    pub thrift_package: String,
    pub grpc_package: String,
}

/// An output directory and the Java package written into it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PackageSection {
    pub output: String,
    pub package: String,
}

impl BridgeConfig {
    /// Load configuration from a file; relative paths resolve against its directory
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config: {path:?}"))?;

        let mut config = Self::from_str(&content)?;
        config.base_dir = path.parent().map(Path::to_path_buf).unwrap_or_default();
        Ok(config)
    }

    /// Parse configuration from string
    pub fn from_str(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse config")
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        self.level()?;

        if self.source.descriptors.is_empty() {
            anyhow::bail!("At least one descriptor file is required in [source]");
        }
        if let Some(empty) = self.source.descriptors.iter().find(|d| d.trim().is_empty()) {
            anyhow::bail!("Descriptor path cannot be empty: {:?}", empty);
        }

        check_package("proto.package", &self.proto.package)?;
        if let Some(java) = &self.proto.java_package {
            check_package("proto.java_package", java)?;
        }

        if let Some(marshaller) = &self.marshaller {
            check_package("marshaller.thrift_package", &marshaller.thrift_package)?;
            check_package("marshaller.grpc_package", &marshaller.grpc_package)?;
            if marshaller.thrift_package == marshaller.grpc_package {
                anyhow::bail!("marshaller.thrift_package and marshaller.grpc_package must differ");
            }
        }

        if let Some(service) = &self.service {
            check_package("service.package", &service.package)?;
            if self.marshaller.is_none() || self.stub.is_none() {
                anyhow::bail!("[service] requires [marshaller] and [stub] sections");
            }
        }

        if let Some(stub) = &self.stub {
            check_package("stub.package", &stub.package)?;
        }

        Ok(())
    }

    pub fn level(&self) -> Result<LogLevel> {
        self.log_level
            .parse()
            .map_err(|e: String| anyhow::anyhow!("Invalid log_level: {e}"))
    }

    /// Path relative to the configuration file.
    pub fn resolve(&self, path: &str) -> PathBuf {
        self.base_dir.join(path)
    }

    pub fn descriptor_paths(&self) -> Vec<PathBuf> {
        self.source.descriptors.iter().map(|d| self.resolve(d)).collect()
    }

    /// Configured filter, extended with names given on the command line.
    pub fn filter(&self, include: &[String], exclude: &[String]) -> TypeFilter {
        let mut includes = self.source.include.clone();
        includes.extend_from_slice(include);
        let mut excludes = self.source.exclude.clone();
        excludes.extend_from_slice(exclude);
        TypeFilter::new(includes, excludes)
    }

    pub fn java_package(&self) -> &str {
        self.proto.java_package.as_deref().unwrap_or(&self.proto.package)
    }

    pub fn proto_options(&self) -> ProtoOptions {
        ProtoOptions {
            package: self.proto.package.clone(),
            java_package: self.java_package().to_string(),
        }
    }

    pub fn marshaller_options(&self) -> Result<MarshallerOptions> {
        let marshaller = self
            .marshaller
            .as_ref()
            .context("Missing [marshaller] section")?;
        Ok(MarshallerOptions {
            proto_package: self.java_package().to_string(),
            grpc_package: marshaller.grpc_package.clone(),
            thrift_package: marshaller.thrift_package.clone(),
        })
    }

    pub fn stub_options(&self) -> Result<StubOptions> {
        let stub = self.stub.as_ref().context("Missing [stub] section")?;
        Ok(StubOptions {
            package: stub.package.clone(),
        })
    }

    pub fn service_options(&self) -> Result<ServiceOptions> {
        let service = self.service.as_ref().context("Missing [service] section")?;
        Ok(ServiceOptions {
            package: service.package.clone(),
            stub_package: self.stub_options()?.package,
            marshaller: self.marshaller_options()?,
        })
    }
}

/// Dotted Java/proto package: non-empty identifier segments.
fn check_package(key: &str, package: &str) -> Result<()> {
    if package.is_empty() {
        anyhow::bail!("{key} cannot be empty");
    }

    for segment in package.split('.') {
        let mut chars = segment.chars();
        let valid = chars
            .next()
            .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
            && chars.all(|c| c.is_ascii_alphanumeric() || c == '_');
        if !valid {
            anyhow::bail!("{key} is not a valid package name: {package}");
        }
    }

    Ok(())
}
