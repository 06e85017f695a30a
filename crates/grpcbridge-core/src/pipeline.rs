//! Ingest, resolve and optionally record references in one call.

use crate::descriptor::{DescriptorSet, TypeFilter};
use crate::error::BridgeResult;
use crate::ingest::{IngestStats, ingest};
use crate::ir::SchemaIr;
use crate::references::record_references;
use crate::resolve::{ResolveStats, resolve_cycles};

/// A schema ready for the emitters.
#[derive(Debug)]
pub struct Prepared {
    pub ir: SchemaIr,
    pub ingest: IngestStats,
    pub resolve: ResolveStats,
    /// Reference tables added; zero when recording is off.
    pub references: usize,
}

/// Build a fresh IR from `set`. Each call gets its own naming context.
pub fn prepare(
    set: &DescriptorSet,
    filter: &TypeFilter,
    record_refs: bool,
) -> BridgeResult<Prepared> {
    let mut ir = SchemaIr::new();
    let ingest = ingest(set, filter, &mut ir)?;
    let resolve = resolve_cycles(&mut ir)?;
    let references = if record_refs {
        record_references(&mut ir)
    } else {
        0
    };

    Ok(Prepared {
        ir,
        ingest,
        resolve,
        references,
    })
}
