//! Generate and check command implementation
//!
//! Stages run strictly in order: descriptors are loaded, the schema is
//! prepared (ingest, resolve, optional reference tables) and only then are
//! the selected artifacts rendered and written.

use crate::codegen::{
    GeneratedFile, emit_proto, generate_marshallers, generate_services, generate_stub, write_files,
};
use crate::config::{BridgeConfig, DEFAULT_CONFIG};
use anyhow::{Context, Result};
use grpcbridge_core::{
    BridgeError, DescriptorSet, IngestStats, LogLevel, Prepared, ResolveStats, prepare,
};
use grpcbridge_logging::{Diagnostics, init_logging};
use std::path::PathBuf;
use tracing::info;

/// Artifact kinds the generate command can produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum Artifact {
    All,
    Proto,
    Marshaller,
    Service,
    Stub,
}

impl Artifact {
    const EACH: [Artifact; 4] = [
        Artifact::Proto,
        Artifact::Marshaller,
        Artifact::Service,
        Artifact::Stub,
    ];

    fn selects(self, kind: Artifact) -> bool {
        self == Artifact::All || self == kind
    }

    fn label(self) -> &'static str {
        match self {
            Artifact::All => "All",
            Artifact::Proto => "Proto",
            Artifact::Marshaller => "Marshallers",
            Artifact::Service => "Services",
            Artifact::Stub => "Stub",
        }
    }
}

/// What one generation run did.
#[derive(Debug)]
pub struct Summary {
    pub ingest: IngestStats,
    pub resolve: ResolveStats,
    pub references: usize,
    /// Files written per artifact, with the directory they went to.
    pub written: Vec<(Artifact, PathBuf, usize)>,
}

/// Load descriptors and prepare the schema.
pub fn load(config: &BridgeConfig, include: &[String], exclude: &[String]) -> Result<Prepared> {
    let set = DescriptorSet::from_files(&config.descriptor_paths())
        .context("Failed to load descriptors")?;
    let filter = config.filter(include, exclude);

    prepare(&set, &filter, config.record_references).context("Failed to prepare schema")
}

/// Run the pipeline and write the selected artifacts.
pub fn generate(
    config: &BridgeConfig,
    artifact: Artifact,
    include: &[String],
    exclude: &[String],
) -> Result<Summary> {
    config.validate()?;
    let prepared = load(config, include, exclude)?;

    let mut written = Vec::new();
    for kind in Artifact::EACH.into_iter().filter(|k| artifact.selects(*k)) {
        let (output, files) = render(config, &prepared, kind)?;
        let dir = config.resolve(&output);
        let count = write_files(&dir, &files)
            .with_context(|| format!("Failed to write {} files", kind.label()))?;
        info!(artifact = kind.label(), files = count, dir = %dir.display(), "artifact written");
        written.push((kind, dir, count));
    }

    Ok(Summary {
        ingest: prepared.ingest,
        resolve: prepared.resolve,
        references: prepared.references,
        written,
    })
}

/// Output directory and files of one artifact kind.
fn render(
    config: &BridgeConfig,
    prepared: &Prepared,
    kind: Artifact,
) -> Result<(String, Vec<GeneratedFile>)> {
    let ir = &prepared.ir;
    let missing = |section: &str| format!("Artifact {} needs a [{section}] section", kind.label());

    Ok(match kind {
        Artifact::Proto => (
            config.proto.output.clone(),
            emit_proto(ir, &config.proto_options())?,
        ),
        Artifact::Marshaller => {
            let section = config.marshaller.as_ref().with_context(|| missing("marshaller"))?;
            (
                section.output.clone(),
                generate_marshallers(ir, &config.marshaller_options()?)?,
            )
        }
        Artifact::Service => {
            let section = config.service.as_ref().with_context(|| missing("service"))?;
            (
                section.output.clone(),
                generate_services(ir, &config.service_options()?)?,
            )
        }
        Artifact::Stub => {
            let section = config.stub.as_ref().with_context(|| missing("stub"))?;
            (section.output.clone(), generate_stub(ir, &config.stub_options()?)?)
        }
        Artifact::All => (String::new(), Vec::new()),
    })
}

/// Generate command implementation
pub fn run(
    config_path: Option<String>,
    artifact: Artifact,
    include: Vec<String>,
    exclude: Vec<String>,
    verbose: u8,
) -> Result<()> {
    let path = config_path.unwrap_or_else(|| DEFAULT_CONFIG.to_string());
    let config = BridgeConfig::from_file(&path)?;
    let diagnostics = init_logging(LogLevel::raised_by(config.level()?, verbose));

    println!("Generating from: {}", path);

    let summary = generate(&config, artifact, &include, &exclude)?;
    print_counters(&summary.ingest, &summary.resolve, summary.references);
    for (kind, dir, count) in &summary.written {
        println!("✓ {}: {} file(s) in {}", kind.label(), count, dir.display());
    }
    for line in diagnostic_lines(&diagnostics) {
        println!("{line}");
    }
    println!("\nGeneration complete!");

    Ok(())
}

/// Check command implementation
pub fn check(config_path: Option<String>) -> Result<()> {
    let path = config_path.unwrap_or_else(|| DEFAULT_CONFIG.to_string());

    println!("Checking config: {}", path);

    let config = BridgeConfig::from_file(&path)?;
    config.validate()?;
    init_logging(config.level()?);

    println!("✓ Descriptors: {}", config.source.descriptors.len());
    let prepared = load(&config, &[], &[])?;
    print_counters(&prepared.ingest, &prepared.resolve, prepared.references);
    println!("\nConfiguration is valid!");

    Ok(())
}

/// Process exit status for a failed command.
///
/// The [`BridgeError::error_code`] of the first bridge error in the cause
/// chain, 1 for anything else.
pub fn exit_code(error: &anyhow::Error) -> u8 {
    error
        .chain()
        .find_map(|cause| cause.downcast_ref::<BridgeError>())
        .and_then(|e| u8::try_from(e.error_code()).ok())
        .unwrap_or(1)
}

/// Warning and error counts followed by their messages.
fn diagnostic_lines(diagnostics: &Diagnostics) -> Vec<String> {
    let mut lines = Vec::new();
    if diagnostics.warnings() > 0 {
        lines.push(format!("✓ Warnings: {}", diagnostics.warnings()));
    }
    if diagnostics.errors() > 0 {
        lines.push(format!("✗ Errors: {}", diagnostics.errors()));
    }
    lines.extend(diagnostics.messages().into_iter().map(|m| format!("    {m}")));
    lines
}

fn print_counters(ingest: &IngestStats, resolve: &ResolveStats, references: usize) {
    println!(
        "✓ Loaded: {} enum(s), {} struct(s), {} service(s), {} rpc(s)",
        ingest.enums, ingest.structs, ingest.services, ingest.rpcs
    );
    for (arity, count) in &ingest.rpcs_by_arity {
        println!("    {count} rpc(s) with {arity} parameter(s)");
    }
    if ingest.skipped > 0 {
        println!("✓ Skipped by filter: {}", ingest.skipped);
    }
    println!(
        "✓ Resolved: {} module(s), {} struct(s) relocated",
        resolve.resolved_modules, resolve.relocated_structs
    );
    if references > 0 {
        println!("✓ Reference tables: {references}");
    }
}

#[cfg(test)]
#[path = "generate/generate_tests.rs"]
mod generate_tests;
