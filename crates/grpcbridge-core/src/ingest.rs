//! Type ingestion.
//!
//! Turns a [`DescriptorSet`] into IR entities. Structs and enums are loaded on
//! first reference and memoized by source identity, so recursion through
//! self-referencing or mutually referencing structs terminates and no struct
//! is loaded twice. Services synthesize request and response structs for
//! every RPC, reusing `Empty` and previously synthesized structs where the
//! argument shapes agree.

use crate::descriptor::{
    DescriptorSet, EnumDescriptor, FieldDescriptor, RpcDescriptor, ServiceDescriptor,
    StructDescriptor, TypeDescriptor, TypeFilter, TypeRef,
};
use crate::error::{BridgeError, BridgeResult};
use crate::ir::{
    COMMON_MODULE, ContainerKind, EMPTY_STRUCT, Field, FieldType, REQUEST_MODULE,
    RESPONSE_MODULE, Rpc, SchemaIr, Service, SourceRef,
};
use crate::naming::{first_upper, module_name, split_identity};
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, info, warn};

/// Field name of a synthesized response struct.
pub const RESPONSE_FIELD: &str = "data";

/// Counters reported after ingestion.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IngestStats {
    pub enums: usize,
    pub structs: usize,
    pub services: usize,
    pub rpcs: usize,
    /// Parameter count -> number of RPCs.
    pub rpcs_by_arity: BTreeMap<usize, usize>,
    /// Request and response structs created for RPC signatures.
    pub synthesized: usize,
    /// Top-level descriptors rejected by the filter.
    pub skipped: usize,
}

/// Ingest every descriptor accepted by `filter` into `ir`.
///
/// Enums are ingested first, then structs, then services, each in declaration
/// order.
pub fn ingest(
    set: &DescriptorSet,
    filter: &TypeFilter,
    ir: &mut SchemaIr,
) -> BridgeResult<IngestStats> {
    let mut ingestor = Ingestor::new(set, ir)?;

    let mut roots: Vec<&TypeDescriptor> = set.types.iter().collect();
    roots.sort_by_key(|d| match d {
        TypeDescriptor::Enum(_) => 0,
        TypeDescriptor::Struct(_) => 1,
        TypeDescriptor::Service(_) => 2,
    });

    for descriptor in roots {
        if !filter.accepts(descriptor.name()) {
            debug!(identity = %descriptor.identity(), "skipped by filter");
            ingestor.stats.skipped += 1;
            continue;
        }
        ingestor.root(descriptor)?;
    }

    let stats = ingestor.stats;
    for (arity, count) in &stats.rpcs_by_arity {
        debug!(arity, count, "rpcs by parameter count");
    }
    info!(
        enums = stats.enums,
        structs = stats.structs,
        services = stats.services,
        rpcs = stats.rpcs,
        "ingestion complete"
    );
    Ok(stats)
}

struct Ingestor<'a> {
    ir: &'a mut SchemaIr,
    catalog: HashMap<String, &'a TypeDescriptor>,
    /// Source identity -> display name.
    resolved: HashMap<String, String>,
    /// Alias key -> display name of a synthesized request/response struct.
    aliases: HashMap<String, String>,
    /// Service simple name -> source identity.
    services: HashMap<String, String>,
    stats: IngestStats,
}

impl<'a> Ingestor<'a> {
    fn new(set: &'a DescriptorSet, ir: &'a mut SchemaIr) -> BridgeResult<Self> {
        let mut catalog = HashMap::new();
        for descriptor in &set.types {
            let identity = descriptor.identity();
            if descriptor.namespace().is_empty() {
                return Err(BridgeError::ingestion(
                    descriptor.name(),
                    format!("{} has no namespace", descriptor.kind()),
                ));
            }
            if catalog.insert(identity.clone(), descriptor).is_some() {
                return Err(BridgeError::ingestion(identity, "defined more than once"));
            }
        }

        Ok(Self {
            ir,
            catalog,
            resolved: HashMap::new(),
            aliases: HashMap::new(),
            services: HashMap::new(),
            stats: IngestStats::default(),
        })
    }

    fn root(&mut self, descriptor: &'a TypeDescriptor) -> BridgeResult<()> {
        let identity = descriptor.identity();
        match descriptor {
            TypeDescriptor::Enum(_) => {
                self.resolve_named(&identity, &identity)?;
                self.stats.enums += 1;
            }
            TypeDescriptor::Struct(_) => {
                self.resolve_named(&identity, &identity)?;
                self.stats.structs += 1;
            }
            TypeDescriptor::Service(service) => {
                self.load_service(service)?;
                self.stats.services += 1;
            }
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Enums and structs
    // ------------------------------------------------------------------

    /// Display name for a source identity, loading the type on first use.
    fn resolve_named(&mut self, identity: &str, element: &str) -> BridgeResult<String> {
        if let Some(name) = self.resolved.get(identity) {
            return Ok(name.clone());
        }

        let descriptor: &'a TypeDescriptor = match self.catalog.get(identity) {
            Some(descriptor) => *descriptor,
            None => {
                return Err(BridgeError::ingestion(
                    element,
                    format!("undefined type `{identity}`"),
                ));
            }
        };

        match descriptor {
            TypeDescriptor::Enum(enumeration) => self.load_enum(enumeration),
            TypeDescriptor::Struct(structure) => self.load_struct(structure),
            TypeDescriptor::Service(_) => Err(BridgeError::ingestion(
                element,
                format!("service `{identity}` cannot be used as a field type"),
            )),
        }
    }

    fn load_enum(&mut self, descriptor: &EnumDescriptor) -> BridgeResult<String> {
        let module = module_name(&descriptor.namespace);
        let identity = format!("{}.{}", descriptor.namespace, descriptor.name);

        let name = self.ir.create_struct(&module, &descriptor.name, true);
        self.resolved.insert(identity.clone(), name.clone());

        let fields = descriptor
            .values
            .iter()
            .enumerate()
            .map(|(position, value)| {
                let number = value.value.unwrap_or(position as i32);
                Field::new(&value.name, FieldType::I32).with_default(number.to_string())
            })
            .collect();

        let created = self.ir.struct_mut(&name)?;
        created.fields = fields;
        created.source = Some(SourceRef::Type(identity));
        debug!(name = %name, module = %module, "ingested enum");
        Ok(name)
    }

    fn load_struct(&mut self, descriptor: &'a StructDescriptor) -> BridgeResult<String> {
        let module = module_name(&descriptor.namespace);
        let identity = format!("{}.{}", descriptor.namespace, descriptor.name);

        // registered before the fields so self references resolve to it
        let name = self.ir.create_struct(&module, &descriptor.name, false);
        self.resolved.insert(identity.clone(), name.clone());
        self.ir.struct_mut(&name)?.source = Some(SourceRef::Type(identity.clone()));

        let mut fields = Vec::with_capacity(descriptor.fields.len());
        for field in &descriptor.fields {
            let element = format!("{identity}.{}", field.name);
            let namespace = &descriptor.namespace;
            fields.push(self.field(&module, namespace, &field.name, &field.ty, &element)?);
        }

        self.ir.struct_mut(&name)?.fields = fields;
        debug!(name = %name, module = %module, "ingested struct");
        Ok(name)
    }

    /// Resolve a named type and record the module edge towards its owner.
    fn reference(
        &mut self,
        from_module: &str,
        namespace: &str,
        type_name: &str,
        element: &str,
    ) -> BridgeResult<FieldType> {
        let identity = qualify(namespace, type_name);
        let name = self.resolve_named(&identity, element)?;
        let owner = self
            .ir
            .owner_of(&name)
            .ok_or_else(|| BridgeError::reference(format!("struct `{name}` has no owning module")))?
            .to_string();
        self.ir.record_dependency(from_module, &owner, &name);

        let is_enum = self.ir.struct_named(&name).is_some_and(|s| s.is_enum);
        Ok(if is_enum {
            FieldType::Enum(name)
        } else {
            FieldType::Struct(name)
        })
    }

    fn field(
        &mut self,
        module: &str,
        namespace: &str,
        name: &str,
        ty: &TypeRef,
        element: &str,
    ) -> BridgeResult<Field> {
        if let Some(scalar) = scalar_type(ty) {
            return Ok(Field::new(name, scalar));
        }

        match ty {
            TypeRef::Named(type_name) => Ok(Field::new(
                name,
                self.reference(module, namespace, type_name, element)?,
            )),
            TypeRef::List(item) => Ok(Field::repeated(
                name,
                ContainerKind::List,
                self.element(module, namespace, name, item, element)?,
            )),
            TypeRef::Set(item) => Ok(Field::repeated(
                name,
                ContainerKind::Set,
                self.element(module, namespace, name, item, element)?,
            )),
            TypeRef::Map(key, value) => {
                if self.is_native_key(module, namespace, key, element)? {
                    let key = self.element(module, namespace, name, key, element)?;
                    let value = self.element(module, namespace, name, value, element)?;
                    return Ok(Field::native_map(name, key, value));
                }

                if !matches!(key.as_ref(), TypeRef::Named(_)) {
                    warn!(
                        element = %element,
                        key = %key,
                        "map key type not allowed in target maps, using entry list"
                    );
                }
                let entry = self.ir.create_struct(module, name, false);
                let key = self.field(module, namespace, "key", key, element)?;
                let value = self.field(module, namespace, "value", value, element)?;
                self.ir.struct_mut(&entry)?.fields = vec![key, value];
                Ok(Field::entry_list(name, entry))
            }
            TypeRef::Void => Err(BridgeError::ingestion(
                element,
                "`void` is only valid as an rpc return type",
            )),
            _ => Err(BridgeError::ingestion(
                element,
                format!("unsupported type `{ty}`"),
            )),
        }
    }

    /// Type of a container element. Nested containers get a wrapper struct
    /// named after the field.
    fn element(
        &mut self,
        module: &str,
        namespace: &str,
        field_name: &str,
        ty: &TypeRef,
        element: &str,
    ) -> BridgeResult<FieldType> {
        let kind = match ty {
            TypeRef::List(_) => ContainerKind::List,
            TypeRef::Set(_) => ContainerKind::Set,
            TypeRef::Map(..) => ContainerKind::Map,
            _ => return Ok(self.field(module, namespace, field_name, ty, element)?.primary),
        };

        let inner = self.field(module, namespace, field_name, ty, element)?;
        let wrapper = self.ir.create_struct(module, field_name, false);
        let created = self.ir.struct_mut(&wrapper)?;
        created.fields = vec![inner];
        created.source = Some(SourceRef::Container(kind));
        Ok(FieldType::Struct(wrapper))
    }

    /// Keys the target format accepts in a native map.
    fn is_native_key(
        &mut self,
        module: &str,
        namespace: &str,
        key: &TypeRef,
        element: &str,
    ) -> BridgeResult<bool> {
        match key {
            TypeRef::Bool
            | TypeRef::Byte
            | TypeRef::I16
            | TypeRef::I32
            | TypeRef::I64
            | TypeRef::String => Ok(true),
            TypeRef::Named(type_name) => Ok(matches!(
                self.reference(module, namespace, type_name, element)?,
                FieldType::Enum(_)
            )),
            _ => Ok(false),
        }
    }

    // ------------------------------------------------------------------
    // Services
    // ------------------------------------------------------------------

    fn load_service(&mut self, descriptor: &'a ServiceDescriptor) -> BridgeResult<()> {
        let identity = format!("{}.{}", descriptor.namespace, descriptor.name);
        if let Some(other) = self.services.get(&descriptor.name) {
            return Err(BridgeError::ingestion(
                identity,
                format!("service name already used by {other}"),
            ));
        }
        self.services.insert(descriptor.name.clone(), identity);

        let module = module_name(&descriptor.namespace);
        self.ir.module_mut(&module);

        let mut rpcs: Vec<&RpcDescriptor> = descriptor.rpcs.iter().collect();
        rpcs.sort_by(|a, b| a.name.cmp(&b.name));

        let mut service = Service {
            name: descriptor.name.clone(),
            client: descriptor.client_interface(),
            rpcs: Vec::with_capacity(rpcs.len()),
        };

        for rpc in rpcs {
            let element = format!("{}.{}.{}", descriptor.namespace, descriptor.name, rpc.name);
            if service.rpcs.iter().any(|r| r.name == rpc.name) {
                return Err(BridgeError::ingestion(element, "rpc defined more than once"));
            }

            let request = self.request(&module, &descriptor.namespace, rpc, &element)?;
            let response = self.response(&module, &descriptor.namespace, rpc, &element)?;

            *self.stats.rpcs_by_arity.entry(rpc.params.len()).or_default() += 1;
            self.stats.rpcs += 1;
            service.rpcs.push(Rpc {
                name: rpc.name.clone(),
                request,
                response,
            });
        }

        debug!(
            service = %service.name,
            module = %module,
            rpcs = service.rpcs.len(),
            "ingested service"
        );
        self.ir.module_mut(&module).services.push(service);
        Ok(())
    }

    fn request(
        &mut self,
        module: &str,
        namespace: &str,
        rpc: &RpcDescriptor,
        element: &str,
    ) -> BridgeResult<String> {
        match rpc.params.as_slice() {
            [] => Ok(self.empty(module)),
            [param] => {
                let element = format!("{element}.{}", param.name);
                if let Some(name) = self.reusable_struct(module, namespace, &param.ty, &element)? {
                    return Ok(name);
                }
                let base = format!(
                    "{}{}",
                    self.label(namespace, &param.ty),
                    first_upper(&format!("{}_Request", param.name))
                );
                self.single_type(
                    module,
                    REQUEST_MODULE,
                    &base,
                    &param.name,
                    namespace,
                    &param.ty,
                    &element,
                )
            }
            params => self.multi_param(module, namespace, &rpc.name, params, element),
        }
    }

    fn response(
        &mut self,
        module: &str,
        namespace: &str,
        rpc: &RpcDescriptor,
        element: &str,
    ) -> BridgeResult<String> {
        let ty = &rpc.returns;
        if *ty == TypeRef::Void {
            return Ok(self.empty(module));
        }
        if let Some(name) = self.reusable_struct(module, namespace, ty, element)? {
            return Ok(name);
        }

        let base = format!("{}_Response", self.label(namespace, ty));
        self.single_type(module, RESPONSE_MODULE, &base, RESPONSE_FIELD, namespace, ty, element)
    }

    fn empty(&mut self, module: &str) -> String {
        self.ir.record_dependency(module, COMMON_MODULE, EMPTY_STRUCT);
        EMPTY_STRUCT.to_string()
    }

    /// A source struct used directly as request or response.
    fn reusable_struct(
        &mut self,
        module: &str,
        namespace: &str,
        ty: &TypeRef,
        element: &str,
    ) -> BridgeResult<Option<String>> {
        let TypeRef::Named(type_name) = ty else {
            return Ok(None);
        };
        let identity = qualify(namespace, type_name);
        if !matches!(self.catalog.get(&identity), Some(TypeDescriptor::Struct(_))) {
            return Ok(None);
        }

        match self.reference(module, namespace, type_name, element)? {
            FieldType::Struct(name) => Ok(Some(name)),
            _ => Ok(None),
        }
    }

    /// Single-field request or response struct, shared between RPCs with the same name key.
    #[allow(clippy::too_many_arguments)]
    fn single_type(
        &mut self,
        service_module: &str,
        arg_module: &str,
        base: &str,
        field_name: &str,
        namespace: &str,
        ty: &TypeRef,
        element: &str,
    ) -> BridgeResult<String> {
        let check_alias = self.needs_alias(namespace, ty);
        let key = base.to_lowercase();

        let existing = if check_alias {
            self.aliases.get(&key).cloned()
        } else {
            None
        };
        let name = match existing {
            Some(name) => name,
            None => {
                let field = self.field(arg_module, namespace, field_name, ty, element)?;
                let name = self.synthesize(arg_module, base, vec![field])?;
                if check_alias {
                    self.aliases.insert(key, name.clone());
                }
                name
            }
        };

        self.ir.record_dependency(service_module, arg_module, &name);
        Ok(name)
    }

    fn multi_param(
        &mut self,
        module: &str,
        namespace: &str,
        rpc_name: &str,
        params: &[FieldDescriptor],
        element: &str,
    ) -> BridgeResult<String> {
        let signature = self.signature(namespace, params);
        let existing = signature
            .as_ref()
            .and_then(|key| self.aliases.get(key))
            .cloned();

        let name = match existing {
            Some(name) => name,
            None => {
                let mut fields = Vec::with_capacity(params.len());
                for param in params {
                    let element = format!("{element}.{}", param.name);
                    let field =
                        self.field(REQUEST_MODULE, namespace, &param.name, &param.ty, &element)?;
                    fields.push(field);
                }
                let name = self.synthesize(REQUEST_MODULE, &format!("{rpc_name}_Request"), fields)?;
                if let Some(key) = signature {
                    self.aliases.insert(key, name.clone());
                }
                name
            }
        };

        self.ir.record_dependency(module, REQUEST_MODULE, &name);
        Ok(name)
    }

    fn synthesize(&mut self, module: &str, base: &str, fields: Vec<Field>) -> BridgeResult<String> {
        let name = self.ir.create_struct(module, base, false);
        self.ir.struct_mut(&name)?.fields = fields;
        self.ir.add_import(module, COMMON_MODULE);
        self.stats.synthesized += 1;
        Ok(name)
    }

    // ------------------------------------------------------------------
    // Alias keys and labels
    // ------------------------------------------------------------------

    fn is_enum(&self, namespace: &str, type_name: &str) -> bool {
        matches!(
            self.catalog.get(&qualify(namespace, type_name)),
            Some(TypeDescriptor::Enum(_))
        )
    }

    /// Whether a single-type struct may be shared with other RPCs.
    fn needs_alias(&self, namespace: &str, ty: &TypeRef) -> bool {
        match ty {
            TypeRef::Named(type_name) => !self.is_enum(namespace, type_name),
            TypeRef::List(item) | TypeRef::Set(item) => match item.as_ref() {
                TypeRef::Named(type_name) => !self.is_enum(namespace, type_name),
                other => !other.is_container(),
            },
            TypeRef::Map(..) => false,
            _ => true,
        }
    }

    /// Order-sensitive signature of a parameter list; `None` when a generic
    /// argument is itself generic.
    fn signature(&self, namespace: &str, params: &[FieldDescriptor]) -> Option<String> {
        let parts = params
            .iter()
            .map(|p| Some(format!("{} {}", type_signature(namespace, &p.ty)?, p.name)))
            .collect::<Option<Vec<_>>>()?;
        Some(parts.join(",").to_lowercase())
    }

    fn label(&self, namespace: &str, ty: &TypeRef) -> String {
        match ty {
            TypeRef::Bool => "Bool".to_string(),
            TypeRef::Byte => "Byte".to_string(),
            TypeRef::I16 => "Short".to_string(),
            TypeRef::I32 => "Int".to_string(),
            TypeRef::I64 => "Long".to_string(),
            TypeRef::Double => "Double".to_string(),
            TypeRef::String => "String".to_string(),
            TypeRef::Binary => "Bytes".to_string(),
            TypeRef::Void => "Void".to_string(),
            TypeRef::List(item) | TypeRef::Set(item) => {
                format!("{}List", self.element_label(namespace, item))
            }
            TypeRef::Map(key, value) => format!(
                "{}{}Map",
                self.element_label(namespace, key),
                self.element_label(namespace, value)
            ),
            TypeRef::Named(type_name) => {
                let identity = qualify(namespace, type_name);
                let (type_namespace, simple) = split_identity(&identity);
                first_upper(&format!("{}{}", module_name(type_namespace), simple))
            }
        }
    }

    fn element_label(&self, namespace: &str, ty: &TypeRef) -> String {
        match ty {
            TypeRef::Named(type_name) if self.is_enum(namespace, type_name) => "Int".to_string(),
            other => self.label(namespace, other),
        }
    }
}

fn qualify(namespace: &str, type_name: &str) -> String {
    TypeRef::Named(type_name.to_string())
        .qualified(namespace)
        .unwrap_or_else(|| type_name.to_string())
}

fn scalar_type(ty: &TypeRef) -> Option<FieldType> {
    match ty {
        TypeRef::Bool => Some(FieldType::Bool),
        TypeRef::Byte => Some(FieldType::Byte),
        TypeRef::I16 => Some(FieldType::I16),
        TypeRef::I32 => Some(FieldType::I32),
        TypeRef::I64 => Some(FieldType::I64),
        TypeRef::Double => Some(FieldType::Double),
        TypeRef::String => Some(FieldType::String),
        TypeRef::Binary => Some(FieldType::Bytes),
        _ => None,
    }
}

fn type_signature(namespace: &str, ty: &TypeRef) -> Option<String> {
    let plain = |t: &TypeRef| match t {
        TypeRef::Named(type_name) => qualify(namespace, type_name),
        other => other.to_string(),
    };

    match ty {
        TypeRef::List(item) | TypeRef::Set(item) if item.is_container() => None,
        TypeRef::Map(key, value) if key.is_container() || value.is_container() => None,
        TypeRef::List(item) => Some(format!("list<{}>", plain(item))),
        TypeRef::Set(item) => Some(format!("set<{}>", plain(item))),
        TypeRef::Map(key, value) => Some(format!("map<{},{}>", plain(key), plain(value))),
        other => Some(plain(other)),
    }
}
