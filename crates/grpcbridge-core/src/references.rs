//! Source reference recording.
//!
//! Adds an `origin` module mapping every struct back to the identity it was
//! ingested from. The identities travel as field defaults, so the module is
//! emitted with schema version 2.

use crate::ir::{Field, FieldType, ORIGIN_MODULE, SchemaIr};
use crate::naming::to_pascal_case;
use tracing::debug;

/// Schema version of the origin module.
pub const ORIGIN_VERSION: u8 = 2;

/// Record one reference struct per module. Returns the number of structs added.
pub fn record_references(ir: &mut SchemaIr) -> usize {
    let tables: Vec<(String, Vec<Field>)> = ir
        .modules()
        .filter(|m| m.name != ORIGIN_MODULE)
        .map(|m| {
            let fields = m
                .structs
                .iter()
                .filter_map(|s| {
                    let identity = s.source_identity()?;
                    let payload = format!("\"{identity}\"");
                    Some(Field::new(&s.name, FieldType::String).with_default(payload))
                })
                .collect::<Vec<_>>();
            (m.name.clone(), fields)
        })
        .filter(|(_, fields)| !fields.is_empty())
        .collect();

    ir.module_mut(ORIGIN_MODULE).version = ORIGIN_VERSION;

    let mut added = 0;
    for (module, fields) in tables {
        let name = ir.create_struct(ORIGIN_MODULE, &to_pascal_case(&module), false);
        let origin = ir.module_mut(ORIGIN_MODULE);
        if let Some(table) = origin.structs.iter_mut().find(|s| s.name == name) {
            table.fields = fields;
        }
        debug!(module = %module, table = %name, "recorded references");
        added += 1;
    }
    added
}
