//! Intermediate representation of the migrated schema.
//!
//! The IR is keyed by module (one output schema file per module). Every
//! struct, synthetic or not, belongs to exactly one module, and
//! [`SchemaIr`] keeps a struct-name to module index that stays consistent
//! when the cycle resolver moves structs around.
//!
//! # Structure
//!
//! - [`SchemaIr`]: run-scoped context holding modules, the name registry and the owner index
//! - [`Module`]: structs, services and import edges of one schema file
//! - [`Struct`]: a real source struct, an enum, or a synthetic helper
//! - [`Field`]: a field with primary/secondary types and an optional container kind
//!
//! # Field shapes
//!
//! | container | secondary | meaning |
//! |-----------|-----------|---------|
//! | none | none | single value of `primary` |
//! | list/set | none | repeated `primary` |
//! | map | some | native map `primary -> secondary` |
//! | map | none | repeated entry struct `primary` with `key`/`value` fields |

use crate::error::{BridgeError, BridgeResult};
use crate::naming::first_upper;
use std::collections::{BTreeMap, BTreeSet, HashSet};

/// Module receiving `Empty` and every struct relocated by the cycle resolver.
pub const COMMON_MODULE: &str = "common";
/// Module holding synthesized RPC request structs.
pub const REQUEST_MODULE: &str = "request";
/// Module holding synthesized RPC response structs.
pub const RESPONSE_MODULE: &str = "response";
/// Module holding reference records.
pub const ORIGIN_MODULE: &str = "origin";
/// The canonical zero-field struct.
pub const EMPTY_STRUCT: &str = "Empty";
/// Reserved name exempt from the name registry and never emitted.
pub const BYTES_SENTINEL: &str = "bytes";

/// Default schema version of a module.
pub const DEFAULT_VERSION: u8 = 3;

/// Type of a field value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FieldType {
    Bool,
    /// Widened to a 32-bit integer in the target; narrowing is range checked.
    Byte,
    /// Widened to a 32-bit integer in the target; narrowing is range checked.
    I16,
    I32,
    I64,
    Double,
    String,
    Bytes,
    /// Display name of a struct.
    Struct(String),
    /// Display name of an enum struct.
    Enum(String),
}

impl FieldType {
    /// Display name of the referenced struct or enum, if any.
    pub fn struct_name(&self) -> Option<&str> {
        match self {
            FieldType::Struct(name) | FieldType::Enum(name) => Some(name),
            _ => None,
        }
    }

    pub fn is_scalar(&self) -> bool {
        self.struct_name().is_none()
    }

    /// Inclusive range a widened value must fit when narrowed back.
    pub fn narrow_range(&self) -> Option<(i32, i32)> {
        match self {
            FieldType::Byte => Some((i8::MIN as i32, i8::MAX as i32)),
            FieldType::I16 => Some((i16::MIN as i32, i16::MAX as i32)),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ContainerKind {
    List,
    Set,
    Map,
}

/// A field of a struct.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    pub name: String,
    pub primary: FieldType,
    /// Map value type of a native map.
    pub secondary: Option<FieldType>,
    pub container: Option<ContainerKind>,
    /// Literal default; marks the field optional in the emitted schema.
    pub default: Option<String>,
}

impl Field {
    pub fn new(name: impl Into<String>, primary: FieldType) -> Self {
        Self {
            name: name.into(),
            primary,
            secondary: None,
            container: None,
            default: None,
        }
    }

    pub fn repeated(name: impl Into<String>, kind: ContainerKind, element: FieldType) -> Self {
        Self {
            container: Some(kind),
            ..Field::new(name, element)
        }
    }

    pub fn native_map(name: impl Into<String>, key: FieldType, value: FieldType) -> Self {
        Self {
            secondary: Some(value),
            container: Some(ContainerKind::Map),
            ..Field::new(name, key)
        }
    }

    /// A map represented as a repeated `entry` struct.
    pub fn entry_list(name: impl Into<String>, entry: impl Into<String>) -> Self {
        Self {
            container: Some(ContainerKind::Map),
            ..Field::new(name, FieldType::Struct(entry.into()))
        }
    }

    pub fn with_default(mut self, default: impl Into<String>) -> Self {
        self.default = Some(default.into());
        self
    }

    /// Emitted as `repeated`: lists, sets and entry lists.
    pub fn is_repeated(&self) -> bool {
        match self.container {
            Some(ContainerKind::List | ContainerKind::Set) => true,
            Some(ContainerKind::Map) => self.secondary.is_none(),
            None => false,
        }
    }

    pub fn is_native_map(&self) -> bool {
        self.container == Some(ContainerKind::Map) && self.secondary.is_some()
    }

    pub fn is_entry_list(&self) -> bool {
        self.container == Some(ContainerKind::Map) && self.secondary.is_none()
    }

    /// Display names of the structs and enums this field refers to.
    pub fn referenced(&self) -> impl Iterator<Item = &str> {
        self.primary
            .struct_name()
            .into_iter()
            .chain(self.secondary.as_ref().and_then(FieldType::struct_name))
    }
}

/// Where a struct came from in the source type system.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceRef {
    /// A source-defined struct or enum, by fully qualified identity.
    Type(String),
    /// A wrapper around a nested container of this kind.
    Container(ContainerKind),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Struct {
    /// Name as declared or requested before disambiguation.
    pub origin_name: String,
    /// Globally unique display name.
    pub name: String,
    pub fields: Vec<Field>,
    pub is_enum: bool,
    /// `None` for entry and RPC argument structs.
    pub source: Option<SourceRef>,
}

impl Struct {
    pub fn new(origin_name: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            origin_name: origin_name.into(),
            name: name.into(),
            fields: Vec::new(),
            is_enum: false,
            source: None,
        }
    }

    /// Fully qualified source identity of a source-defined struct or enum.
    pub fn source_identity(&self) -> Option<&str> {
        match &self.source {
            Some(SourceRef::Type(identity)) => Some(identity),
            _ => None,
        }
    }

    pub fn is_wrapper(&self) -> bool {
        matches!(self.source, Some(SourceRef::Container(_)))
    }

    /// Whether codecs get a dedicated conversion function for this struct.
    pub fn needs_codec(&self) -> bool {
        !self.is_enum && self.source_identity().is_some()
    }

    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name == name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rpc {
    pub name: String,
    /// Display name of the request struct.
    pub request: String,
    /// Display name of the response struct.
    pub response: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Service {
    pub name: String,
    /// Fully qualified client interface of the source framework.
    pub client: String,
    pub rpcs: Vec<Rpc>,
}

/// One schema compilation unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Module {
    pub name: String,
    pub version: u8,
    /// Structs in insertion order.
    pub structs: Vec<Struct>,
    pub services: Vec<Service>,
    pub imports: BTreeSet<String>,
    pub imported_by: BTreeSet<String>,
    /// Imported module -> display names of the structs used from it.
    pub dependencies: BTreeMap<String, BTreeSet<String>>,
}

impl Module {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: DEFAULT_VERSION,
            structs: Vec::new(),
            services: Vec::new(),
            imports: BTreeSet::new(),
            imported_by: BTreeSet::new(),
            dependencies: BTreeMap::new(),
        }
    }

    pub fn struct_named(&self, name: &str) -> Option<&Struct> {
        self.structs.iter().find(|s| s.name == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.struct_named(name).is_some()
    }

    fn take_struct(&mut self, name: &str) -> Option<Struct> {
        let index = self.structs.iter().position(|s| s.name == name)?;
        Some(self.structs.remove(index))
    }

    fn clear_edges(&mut self) {
        self.imports.clear();
        self.imported_by.clear();
        self.dependencies.clear();
    }
}

/// Run-wide registry making struct display names unique.
///
/// The first declaration of `X` keeps `X`; later ones get `X1`, `X2`, ...
#[derive(Debug, Clone, Default)]
pub struct NameRegistry {
    names: HashSet<String>,
}

impl NameRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reserve a unique display name derived from `base`.
    pub fn register(&mut self, base: &str) -> String {
        if base == BYTES_SENTINEL {
            return base.to_string();
        }

        let mut index = 0usize;
        let mut candidate = base.to_string();
        while self.names.contains(&candidate) {
            index += 1;
            candidate = format!("{base}{index}");
        }
        self.names.insert(candidate.clone());
        candidate
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.contains(name)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

/// The run-scoped schema context.
///
/// Created fresh for every run, so nothing registered in one run leaks into another.
#[derive(Debug, Clone)]
pub struct SchemaIr {
    modules: BTreeMap<String, Module>,
    registry: NameRegistry,
    owners: BTreeMap<String, String>,
}

impl Default for SchemaIr {
    fn default() -> Self {
        Self::new()
    }
}

impl SchemaIr {
    /// Create an IR holding only the shared module and its `Empty` struct.
    pub fn new() -> Self {
        let mut ir = Self {
            modules: BTreeMap::new(),
            registry: NameRegistry::new(),
            owners: BTreeMap::new(),
        };
        ir.create_struct(COMMON_MODULE, EMPTY_STRUCT, false);
        ir
    }

    pub fn modules(&self) -> impl Iterator<Item = &Module> {
        self.modules.values()
    }

    pub fn module_names(&self) -> Vec<String> {
        self.modules.keys().cloned().collect()
    }

    pub fn module(&self, name: &str) -> Option<&Module> {
        self.modules.get(name)
    }

    /// Get a module, creating it when absent.
    pub fn module_mut(&mut self, name: &str) -> &mut Module {
        self.modules
            .entry(name.to_string())
            .or_insert_with(|| Module::new(name))
    }

    pub fn registry(&self) -> &NameRegistry {
        &self.registry
    }

    /// Register a new struct under a unique display name derived from `origin_name`.
    pub fn create_struct(&mut self, module: &str, origin_name: &str, is_enum: bool) -> String {
        let name = self.registry.register(&first_upper(origin_name));
        let mut created = Struct::new(origin_name, name.clone());
        created.is_enum = is_enum;
        self.module_mut(module).structs.push(created);
        self.owners.insert(name.clone(), module.to_string());
        name
    }

    /// Name of the module owning `name`.
    pub fn owner_of(&self, name: &str) -> Option<&str> {
        self.owners.get(name).map(String::as_str)
    }

    pub fn struct_named(&self, name: &str) -> Option<&Struct> {
        let owner = self.owners.get(name)?;
        self.modules.get(owner)?.struct_named(name)
    }

    pub fn struct_mut(&mut self, name: &str) -> BridgeResult<&mut Struct> {
        let owner = self.owners.get(name).ok_or_else(|| unowned(name))?;
        self.modules
            .get_mut(owner)
            .and_then(|m| m.structs.iter_mut().find(|s| s.name == name))
            .ok_or_else(|| {
                BridgeError::reference(format!("struct `{name}` missing from module `{owner}`"))
            })
    }

    /// Look up a struct that an invariant guarantees to exist.
    pub fn require_struct(&self, name: &str) -> BridgeResult<&Struct> {
        self.struct_named(name)
            .ok_or_else(|| BridgeError::reference(format!("struct `{name}` not found")))
    }

    /// Move a struct into another module and update the owner index.
    pub fn move_struct(&mut self, name: &str, to: &str) -> BridgeResult<()> {
        let from = self
            .owners
            .get(name)
            .cloned()
            .ok_or_else(|| unowned(name))?;
        if from == to {
            return Ok(());
        }

        let moved = self
            .modules
            .get_mut(&from)
            .and_then(|m| m.take_struct(name))
            .ok_or_else(|| {
                BridgeError::reference(format!("struct `{name}` missing from module `{from}`"))
            })?;
        let target = self.module_mut(to);
        if !target.contains(name) {
            target.structs.push(moved);
        }
        self.owners.insert(name.to_string(), to.to_string());
        Ok(())
    }

    /// Record that `from` uses `name`, owned by `to`. No-op within one module.
    pub fn record_dependency(&mut self, from: &str, to: &str, name: &str) {
        if from == to {
            return;
        }
        self.module_mut(to).imported_by.insert(from.to_string());
        let module = self.module_mut(from);
        module.imports.insert(to.to_string());
        module
            .dependencies
            .entry(to.to_string())
            .or_default()
            .insert(name.to_string());
    }

    /// Add an import edge that does not stem from a struct reference.
    pub fn add_import(&mut self, from: &str, to: &str) {
        if from == to {
            return;
        }
        self.module_mut(to).imported_by.insert(from.to_string());
        self.module_mut(from).imports.insert(to.to_string());
    }

    /// Recompute every import edge from the struct references and RPC signatures.
    pub fn rebuild_edges(&mut self) {
        let mut edges = Vec::new();
        for module in self.modules.values() {
            let fields = module
                .structs
                .iter()
                .filter(|s| !s.is_enum)
                .flat_map(|s| s.fields.iter())
                .flat_map(Field::referenced);
            let rpcs = module
                .services
                .iter()
                .flat_map(|s| s.rpcs.iter())
                .flat_map(|rpc| [rpc.request.as_str(), rpc.response.as_str()]);

            for name in fields.chain(rpcs) {
                if let Some(owner) = self.owners.get(name) {
                    edges.push((module.name.clone(), owner.clone(), name.to_string()));
                }
            }
        }

        for module in self.modules.values_mut() {
            module.clear_edges();
        }
        for (from, to, name) in edges {
            self.record_dependency(&from, &to, &name);
        }
        for synthetic in [REQUEST_MODULE, RESPONSE_MODULE] {
            if self.modules.contains_key(synthetic) {
                self.add_import(synthetic, COMMON_MODULE);
            }
        }
    }

    /// Pairs of modules importing each other, each pair listed once.
    pub fn mutual_imports(&self) -> Vec<(String, String)> {
        let mut pairs = Vec::new();
        for module in self.modules.values() {
            for import in &module.imports {
                let mutual = self
                    .modules
                    .get(import)
                    .is_some_and(|other| other.imports.contains(&module.name));
                if mutual && module.name < *import {
                    pairs.push((module.name.clone(), import.clone()));
                }
            }
        }
        pairs
    }

    /// Any import cycle, as the list of modules along it with the first repeated at the end.
    pub fn find_import_cycle(&self) -> Option<Vec<String>> {
        #[derive(Clone, Copy, PartialEq)]
        enum Mark {
            Visiting,
            Done,
        }

        fn visit(
            ir: &SchemaIr,
            name: &str,
            marks: &mut BTreeMap<String, Mark>,
            path: &mut Vec<String>,
        ) -> Option<Vec<String>> {
            match marks.get(name) {
                Some(Mark::Done) => return None,
                Some(Mark::Visiting) => {
                    let start = path.iter().position(|m| m == name).unwrap_or(0);
                    let mut cycle = path[start..].to_vec();
                    cycle.push(name.to_string());
                    return Some(cycle);
                }
                None => {}
            }

            marks.insert(name.to_string(), Mark::Visiting);
            path.push(name.to_string());
            if let Some(module) = ir.modules.get(name) {
                for import in &module.imports {
                    if let Some(cycle) = visit(ir, import, marks, path) {
                        return Some(cycle);
                    }
                }
            }
            path.pop();
            marks.insert(name.to_string(), Mark::Done);
            None
        }

        let mut marks = BTreeMap::new();
        for name in self.modules.keys() {
            let mut path = Vec::new();
            if let Some(cycle) = visit(self, name, &mut marks, &mut path) {
                return Some(cycle);
            }
        }
        None
    }

    pub fn struct_count(&self) -> usize {
        self.modules.values().map(|m| m.structs.len()).sum()
    }

    pub fn service_count(&self) -> usize {
        self.modules.values().map(|m| m.services.len()).sum()
    }
}

fn unowned(name: &str) -> BridgeError {
    BridgeError::reference(format!("struct `{name}` has no owning module"))
}

#[cfg(test)]
#[path = "ir/ir_tests.rs"]
mod ir_tests;
