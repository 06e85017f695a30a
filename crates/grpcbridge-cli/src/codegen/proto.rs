//! Protocol Buffers schema emission.

use super::{GeneratedFile, package_dir};
use grpcbridge_core::{
    BYTES_SENTINEL, BridgeError, BridgeResult, Field, FieldType, Module, SchemaIr, Service,
    Struct,
};
use std::collections::BTreeSet;
use tracing::{debug, info};

const INDENT: &str = "  ";

/// Where and under which names the schema files are emitted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProtoOptions {
    /// Dotted proto package; also the directory the files land in.
    pub package: String,
    /// `option java_package`.
    pub java_package: String,
}

impl ProtoOptions {
    pub fn new(package: &str) -> Self {
        Self {
            package: package.to_string(),
            java_package: package.to_string(),
        }
    }
}

/// Render one `.proto` file per module.
///
/// Fails with [`BridgeError::UnresolvedCycle`] when any import cycle survived
/// cycle resolution.
pub fn emit_proto(ir: &SchemaIr, options: &ProtoOptions) -> BridgeResult<Vec<GeneratedFile>> {
    if let Some((a, b)) = ir.mutual_imports().into_iter().next() {
        return Err(BridgeError::UnresolvedCycle {
            modules: vec![a, b],
        });
    }
    if let Some(cycle) = ir.find_import_cycle() {
        return Err(BridgeError::UnresolvedCycle { modules: cycle });
    }

    let dir = package_dir(&options.package);
    let mut files = Vec::new();
    for module in ir.modules() {
        let content = render_module(ir, module, options)?;
        files.push(GeneratedFile::new(dir.join(format!("{}.proto", module.name)), content));
        debug!(module = %module.name, "rendered schema");
    }

    info!(files = files.len(), "schema emission complete");
    Ok(files)
}

fn render_module(ir: &SchemaIr, module: &Module, options: &ProtoOptions) -> BridgeResult<String> {
    let import_dir = options.package.replace('.', "/");
    let mut code = String::new();

    code.push_str(&format!("syntax = \"proto{}\";\n\n", module.version));
    code.push_str("import \"google/api/annotations.proto\";\n");
    for import in schema_imports(ir, module) {
        code.push_str(&format!("import \"{import_dir}/{import}.proto\";\n"));
    }
    code.push_str("\noption java_multiple_files = true;\n");
    code.push_str(&format!("option java_package = \"{}\";\n\n", options.java_package));
    code.push_str(&format!("package {};\n\n", options.package));

    let messages: Vec<&Struct> = module.structs.iter().filter(|s| is_message(s)).collect();
    code.push_str(&format!("// message count: {};\n", messages.len()));

    for service in &module.services {
        code.push('\n');
        render_service(service, &mut code);
    }
    for message in messages {
        code.push('\n');
        render_message(ir, message, &mut code)?;
    }

    Ok(code)
}

/// Enums travel as `int32` and `bytes` is a builtin, so neither gets a message.
/// Modules owning the messages this module's fields and rpcs name.
///
/// Enum references render as `int32` and import nothing.
fn schema_imports<'a>(ir: &'a SchemaIr, module: &'a Module) -> BTreeSet<&'a str> {
    let fields = module
        .structs
        .iter()
        .filter(|s| is_message(s))
        .flat_map(|s| s.fields.iter())
        .flat_map(|f| std::iter::once(&f.primary).chain(f.secondary.as_ref()))
        .filter_map(|ty| match ty {
            FieldType::Struct(name) => Some(name.as_str()),
            _ => None,
        });
    let rpcs = module
        .services
        .iter()
        .flat_map(|s| s.rpcs.iter())
        .flat_map(|rpc| [rpc.request.as_str(), rpc.response.as_str()]);

    fields
        .chain(rpcs)
        .filter_map(|name| ir.owner_of(name))
        .filter(|owner| *owner != module.name)
        .collect()
}

fn is_message(s: &Struct) -> bool {
    !s.is_enum && s.name != BYTES_SENTINEL
}

fn render_service(service: &Service, code: &mut String) {
    code.push_str(&format!("service {} {{\n", service.name));
    for (i, rpc) in service.rpcs.iter().enumerate() {
        if i > 0 {
            code.push('\n');
        }
        code.push_str(&format!(
            "{INDENT}rpc {} ({}) returns ({}) {{\n",
            rpc.name, rpc.request, rpc.response
        ));
        code.push_str(&format!("{INDENT}{INDENT}option (google.api.http) = {{\n"));
        code.push_str(&format!("{INDENT}{INDENT}{INDENT}post: \"/{}\"\n", rpc.name));
        code.push_str(&format!("{INDENT}{INDENT}}};\n"));
        code.push_str(&format!("{INDENT}}}\n"));
    }
    code.push_str("}\n");
}

fn render_message(ir: &SchemaIr, message: &Struct, code: &mut String) -> BridgeResult<()> {
    code.push_str(&format!("message {} {{\n", message.name));
    for (i, field) in message.fields.iter().enumerate() {
        code.push_str(INDENT);
        code.push_str(&field_line(ir, field, i + 1)?);
        code.push('\n');
    }
    code.push_str("}\n");
    Ok(())
}

fn field_line(ir: &SchemaIr, field: &Field, number: usize) -> BridgeResult<String> {
    let ty = proto_type(ir, &field.primary)?;

    if field.is_native_map() {
        let value = field.secondary.as_ref().ok_or_else(|| {
            BridgeError::reference(format!("map field `{}` has no value type", field.name))
        })?;
        let value = proto_type(ir, value)?;
        return Ok(format!("map<{ty}, {value}> {} = {number};", field.name));
    }
    if field.is_repeated() {
        return Ok(format!("repeated {ty} {} = {number};", field.name));
    }
    Ok(match &field.default {
        Some(default) => format!("optional {ty} {} = {number} [default = {default}];", field.name),
        None => format!("{ty} {} = {number};", field.name),
    })
}

/// Schema type of a field value.
pub fn proto_type(ir: &SchemaIr, ty: &FieldType) -> BridgeResult<String> {
    Ok(match ty {
        FieldType::Bool => "bool".to_string(),
        FieldType::Byte | FieldType::I16 | FieldType::I32 | FieldType::Enum(_) => {
            "int32".to_string()
        }
        FieldType::I64 => "int64".to_string(),
        FieldType::Double => "double".to_string(),
        FieldType::String => "string".to_string(),
        FieldType::Bytes => "bytes".to_string(),
        FieldType::Struct(name) => ir.require_struct(name)?.name.clone(),
    })
}
