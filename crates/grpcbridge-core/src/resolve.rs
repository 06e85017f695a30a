//! Circular dependency resolution.
//!
//! The target schema language forbids mutual imports. For every module pair
//! that imports each other, the structs each side takes from the other are
//! relocated into the common module together with everything they reference.
//! Both modules then import only the common module for those structs.

use crate::error::{BridgeError, BridgeResult};
use crate::ir::{COMMON_MODULE, Field, ORIGIN_MODULE, REQUEST_MODULE, RESPONSE_MODULE, SchemaIr};
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResolveStats {
    /// Modules whose mutual imports were broken.
    pub resolved_modules: usize,
    /// Structs moved into the common module.
    pub relocated_structs: usize,
}

/// Modules that never anchor a resolution.
fn is_reserved(module: &str) -> bool {
    [COMMON_MODULE, REQUEST_MODULE, RESPONSE_MODULE, ORIGIN_MODULE].contains(&module)
}

struct EdgeSnapshot {
    dependencies: BTreeMap<String, BTreeSet<String>>,
    imported_by: BTreeSet<String>,
}

/// Break every mutual import between two modules.
///
/// Edges are read from a snapshot taken before any struct moves, so the
/// outcome does not depend on the order modules are visited in. Running the
/// resolver again on its own output relocates nothing.
///
/// Cycles through three or more modules are left in place.
pub fn resolve_cycles(ir: &mut SchemaIr) -> BridgeResult<ResolveStats> {
    let snapshot: BTreeMap<String, EdgeSnapshot> = ir
        .modules()
        .map(|m| {
            (
                m.name.clone(),
                EdgeSnapshot {
                    dependencies: m.dependencies.clone(),
                    imported_by: m.imported_by.clone(),
                },
            )
        })
        .collect();

    let mut stats = ResolveStats::default();
    for (anchor, edges) in &snapshot {
        if is_reserved(anchor) {
            continue;
        }

        let partners: Vec<&String> = edges
            .dependencies
            .keys()
            .filter(|partner| edges.imported_by.contains(*partner))
            .collect();
        if partners.is_empty() {
            continue;
        }

        for partner in partners {
            let contended = snapshot
                .get(partner)
                .and_then(|p| p.dependencies.get(anchor))
                .into_iter()
                .flatten();
            for name in contended {
                let moved = relocate(ir, name)?;
                debug!(anchor = %anchor, partner = %partner, name = %name, moved, "relocated");
                stats.relocated_structs += moved;
            }
        }
        stats.resolved_modules += 1;
    }

    ir.rebuild_edges();
    info!(
        resolved_modules = stats.resolved_modules,
        relocated_structs = stats.relocated_structs,
        "cycle resolution complete"
    );
    Ok(stats)
}

/// Move `name` and its transitive references into the common module.
/// Returns the number of structs moved.
fn relocate(ir: &mut SchemaIr, name: &str) -> BridgeResult<usize> {
    let owner = ir
        .owner_of(name)
        .ok_or_else(|| BridgeError::reference(format!("cannot relocate unknown struct `{name}`")))?;
    if owner == COMMON_MODULE {
        return Ok(0);
    }

    ir.move_struct(name, COMMON_MODULE)?;
    let moved = ir.require_struct(name)?;
    if moved.is_enum {
        return Ok(1);
    }

    let referenced: Vec<String> = moved
        .fields
        .iter()
        .flat_map(Field::referenced)
        .map(str::to_string)
        .collect();

    let mut count = 1;
    for next in referenced {
        count += relocate(ir, &next)?;
    }
    Ok(count)
}

#[cfg(test)]
#[path = "resolve/resolve_tests.rs"]
mod resolve_tests;
