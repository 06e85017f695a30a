//! Codec ("marshaller") synthesis.
//!
//! For every module with source-defined structs two Java classes are
//! generated: `<Module>GrpcMarshaller` converting thrift objects into proto
//! messages (`toGrpc`) and `<Module>ThriftMarshaller` converting back
//! (`toThrift`). Both are produced by the same traversal in [`Codec`]; the
//! [`Direction`] implementations [`ToGrpc`] and [`ToThrift`] only supply the
//! leaf expressions (accessors, scalar narrowing, bytes and enum handling,
//! collection and builder shapes).

use super::GeneratedFile;
use super::java::{JavaClass, JavaField, JavaMethod};
use super::naming::{marshaller_class, proto_accessor, thrift_accessor};
use grpcbridge_core::naming::first_upper;
use grpcbridge_core::{
    BridgeError, BridgeResult, ContainerKind, Field, FieldType, SchemaIr, Struct,
};
use tracing::{debug, info};

const COLLECTORS: &str = "java.util.stream.Collectors";

/// Packages the codec classes live in and refer to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarshallerOptions {
    /// Java package of the protoc-generated message classes.
    pub proto_package: String,
    /// Package of the `<Module>GrpcMarshaller` classes.
    pub grpc_package: String,
    /// Package of the `<Module>ThriftMarshaller` classes.
    pub thrift_package: String,
}

/// Per-direction leaf operations of the codec traversal.
pub trait Direction {
    /// `Grpc` or `Thrift`: the class suffix and the `to<Label>` method name.
    const LABEL: &'static str;

    fn marshaller_package(options: &MarshallerOptions) -> &str;

    /// `(argument, return)` Java types of a struct codec.
    fn signature(thrift_class: &str, proto_class: &str) -> (String, String);

    /// Statement creating `ret`.
    fn open(&self, target_class: &str) -> String;

    /// Statement returning `ret`.
    fn close(&self) -> &'static str;

    /// Expression reading the whole value of `field` from `object`.
    fn read(&self, object: &str, field: &Field) -> String;

    /// Condition guarding the assignment of `field`, if any.
    fn presence(&self, object: &str, field: &Field) -> Option<String>;

    /// Method on the target object assigning `field`.
    fn setter(&self, field: &Field) -> String;

    /// Scalar conversion; `None` when the value passes through unchanged.
    fn scalar(&self, ty: &FieldType, expr: &str) -> Option<String>;

    /// `nested` is set where the thrift side holds a `ByteBuffer` rather than `byte[]`.
    fn bytes(&self, expr: &str, nested: bool) -> String;

    fn enumeration(&self, thrift_class: &str, expr: &str) -> String;

    /// List or set of elements mapped through `mapping` (a lambda body over `var`).
    fn collection(
        &self,
        kind: ContainerKind,
        source: &str,
        var: &str,
        mapping: Option<&str>,
    ) -> String;

    /// Native map whose keys and values need no conversion.
    fn map_copy(&self, source: &str) -> String;

    /// Native map rebuilt from converted keys and values.
    fn map_build(&self, source: &str, var: &str, key: &str, value: &str) -> String {
        format!(
            "{source}.entrySet().stream().collect({COLLECTORS}.toMap({var} -> {key}, {var} -> {value}))"
        )
    }

    /// Expression for the `key` or `value` part of one entry held in `var`.
    fn entry_part(&self, var: &str, part: &Field) -> String;

    /// Map carried as a repeated entry message.
    #[allow(clippy::too_many_arguments)]
    fn entries(
        &self,
        source: &str,
        var: &str,
        entry_class: &str,
        key: &Field,
        key_value: &str,
        value: &Field,
        value_value: &str,
    ) -> String;

    /// Expression holding the container a wrapper message stands for.
    fn wrapper_read(&self, source: &str, inner: &Field) -> String;

    /// Target value built from the converted container of a wrapper.
    fn wrapper_build(&self, wrapper_class: &str, inner: &Field, converted: &str) -> String;
}

/// Thrift to proto.
#[derive(Debug, Clone, Copy, Default)]
pub struct ToGrpc;

/// Proto to thrift.
#[derive(Debug, Clone, Copy, Default)]
pub struct ToThrift;

impl Direction for ToGrpc {
    const LABEL: &'static str = "Grpc";

    fn marshaller_package(options: &MarshallerOptions) -> &str {
        &options.grpc_package
    }

    fn signature(thrift_class: &str, proto_class: &str) -> (String, String) {
        (thrift_class.to_string(), proto_class.to_string())
    }

    fn open(&self, target_class: &str) -> String {
        format!("{target_class}.Builder ret = {target_class}.newBuilder();")
    }

    fn close(&self) -> &'static str {
        "return ret.build();"
    }

    fn read(&self, object: &str, field: &Field) -> String {
        let prefix = if field.container.is_none() && field.primary == FieldType::Bool {
            "is"
        } else {
            "get"
        };
        format!("{object}.{prefix}{}()", thrift_accessor(&field.name))
    }

    fn presence(&self, object: &str, field: &Field) -> Option<String> {
        Some(format!("{object}.isSet{}()", thrift_accessor(&field.name)))
    }

    fn setter(&self, field: &Field) -> String {
        let prefix = match field.container {
            None => "set",
            Some(_) if field.is_native_map() => "putAll",
            Some(_) => "addAll",
        };
        format!("{prefix}{}", proto_accessor(&field.name))
    }

    fn scalar(&self, ty: &FieldType, expr: &str) -> Option<String> {
        match ty {
            FieldType::Byte | FieldType::I16 => Some(format!("(int) {expr}")),
            _ => None,
        }
    }

    fn bytes(&self, expr: &str, nested: bool) -> String {
        if nested {
            format!("com.google.protobuf.ByteString.copyFrom({expr}.duplicate())")
        } else {
            format!("com.google.protobuf.ByteString.copyFrom({expr})")
        }
    }

    fn enumeration(&self, _thrift_class: &str, expr: &str) -> String {
        format!("{expr}.getValue()")
    }

    fn collection(
        &self,
        _kind: ContainerKind,
        source: &str,
        var: &str,
        mapping: Option<&str>,
    ) -> String {
        match mapping {
            None => source.to_string(),
            Some(body) => format!(
                "{source}.stream().map({var} -> {body}).collect({COLLECTORS}.toList())"
            ),
        }
    }

    fn map_copy(&self, source: &str) -> String {
        source.to_string()
    }

    fn entry_part(&self, var: &str, part: &Field) -> String {
        format!("{var}.get{}()", first_upper(&part.name))
    }

    fn entries(
        &self,
        source: &str,
        var: &str,
        entry_class: &str,
        key: &Field,
        key_value: &str,
        value: &Field,
        value_value: &str,
    ) -> String {
        format!(
            "{source}.entrySet().stream().map({var} -> {entry_class}.newBuilder().{}({key_value}).{}({value_value}).build()).collect({COLLECTORS}.toList())",
            self.setter(key),
            self.setter(value)
        )
    }

    fn wrapper_read(&self, source: &str, _inner: &Field) -> String {
        source.to_string()
    }

    fn wrapper_build(&self, wrapper_class: &str, inner: &Field, converted: &str) -> String {
        format!(
            "{wrapper_class}.newBuilder().{}({converted}).build()",
            self.setter(inner)
        )
    }
}

impl Direction for ToThrift {
    const LABEL: &'static str = "Thrift";

    fn marshaller_package(options: &MarshallerOptions) -> &str {
        &options.thrift_package
    }

    fn signature(thrift_class: &str, proto_class: &str) -> (String, String) {
        (proto_class.to_string(), thrift_class.to_string())
    }

    fn open(&self, target_class: &str) -> String {
        format!("{target_class} ret = new {target_class}();")
    }

    fn close(&self) -> &'static str {
        "return ret;"
    }

    fn read(&self, object: &str, field: &Field) -> String {
        let suffix = if field.is_native_map() {
            "Map"
        } else if field.container.is_some() {
            "List"
        } else {
            ""
        };
        format!("{object}.get{}{suffix}()", proto_accessor(&field.name))
    }

    fn presence(&self, object: &str, field: &Field) -> Option<String> {
        match (&field.container, &field.primary) {
            (None, FieldType::Struct(_)) => {
                Some(format!("{object}.has{}()", proto_accessor(&field.name)))
            }
            _ => None,
        }
    }

    fn setter(&self, field: &Field) -> String {
        format!("set{}", thrift_accessor(&field.name))
    }

    fn scalar(&self, ty: &FieldType, expr: &str) -> Option<String> {
        match ty {
            FieldType::Byte => Some(format!("checkByte({expr})")),
            FieldType::I16 => Some(format!("checkShort({expr})")),
            _ => None,
        }
    }

    fn bytes(&self, expr: &str, nested: bool) -> String {
        if nested {
            format!("java.nio.ByteBuffer.wrap({expr}.toByteArray())")
        } else {
            format!("{expr}.toByteArray()")
        }
    }

    fn enumeration(&self, thrift_class: &str, expr: &str) -> String {
        format!("checkEnum({thrift_class}.findByValue({expr}))")
    }

    fn collection(
        &self,
        kind: ContainerKind,
        source: &str,
        var: &str,
        mapping: Option<&str>,
    ) -> String {
        // proto collections are immutable, thrift ones are not
        let collector = match kind {
            ContainerKind::Set => "toSet",
            _ => "toList",
        };
        match mapping {
            None => format!("{source}.stream().collect({COLLECTORS}.{collector}())"),
            Some(body) => format!(
                "{source}.stream().map({var} -> {body}).collect({COLLECTORS}.{collector}())"
            ),
        }
    }

    fn map_copy(&self, source: &str) -> String {
        format!(
            "{source}.entrySet().stream().collect({COLLECTORS}.toMap(java.util.Map.Entry::getKey, java.util.Map.Entry::getValue))"
        )
    }

    fn entry_part(&self, var: &str, part: &Field) -> String {
        self.read(var, part)
    }

    fn entries(
        &self,
        source: &str,
        var: &str,
        _entry_class: &str,
        _key: &Field,
        key_value: &str,
        _value: &Field,
        value_value: &str,
    ) -> String {
        format!(
            "{source}.stream().collect({COLLECTORS}.toMap({var} -> {key_value}, {var} -> {value_value}))"
        )
    }

    fn wrapper_read(&self, source: &str, inner: &Field) -> String {
        self.read(source, inner)
    }

    fn wrapper_build(&self, _wrapper_class: &str, _inner: &Field, converted: &str) -> String {
        converted.to_string()
    }
}

/// The direction-independent codec traversal.
pub struct Codec<'a, D> {
    ir: &'a SchemaIr,
    options: &'a MarshallerOptions,
    direction: D,
    /// Top-level binary values are `ByteBuffer`s, as in thrift service interfaces.
    buffers: bool,
}

impl<'a, D: Direction> Codec<'a, D> {
    pub fn new(ir: &'a SchemaIr, options: &'a MarshallerOptions, direction: D) -> Self {
        Self {
            ir,
            options,
            direction,
            buffers: false,
        }
    }

    pub fn with_buffers(mut self) -> Self {
        self.buffers = true;
        self
    }

    pub fn direction(&self) -> &D {
        &self.direction
    }

    /// Fully qualified proto message class.
    pub fn proto_class(&self, name: &str) -> String {
        format!("{}.{}", self.options.proto_package, name)
    }

    /// Call of the codec function converting the struct `name`.
    pub fn marshaller_call(&self, name: &str, expr: &str) -> BridgeResult<String> {
        let owner = self.ir.owner_of(name).ok_or_else(|| {
            BridgeError::reference(format!("struct `{name}` has no owning module"))
        })?;
        Ok(format!(
            "{}.{}.to{}({expr})",
            D::marshaller_package(self.options),
            marshaller_class(owner, D::LABEL),
            D::LABEL
        ))
    }

    /// Convert the whole value of `field`, currently held in `source`.
    pub fn field_value(&self, field: &Field, source: &str, depth: usize) -> BridgeResult<String> {
        let var = format!("e{depth}");

        match field.container {
            None => Ok(self
                .convert(&field.primary, source, depth)?
                .unwrap_or_else(|| source.to_string())),
            Some(kind @ (ContainerKind::List | ContainerKind::Set)) => {
                let mapping = self.convert(&field.primary, &var, depth + 1)?;
                Ok(self.direction.collection(kind, source, &var, mapping.as_deref()))
            }
            Some(ContainerKind::Map) => match &field.secondary {
                Some(value_type) => {
                    let key_source = format!("{var}.getKey()");
                    let value_source = format!("{var}.getValue()");
                    let key = self.convert(&field.primary, &key_source, depth + 1)?;
                    let value = self.convert(value_type, &value_source, depth + 1)?;
                    if key.is_none() && value.is_none() {
                        return Ok(self.direction.map_copy(source));
                    }
                    Ok(self.direction.map_build(
                        source,
                        &var,
                        &key.unwrap_or(key_source),
                        &value.unwrap_or(value_source),
                    ))
                }
                None => {
                    let entry = self.entry_struct(field)?;
                    let key = entry_field(entry, "key")?;
                    let value = entry_field(entry, "value")?;
                    let key_part = self.direction.entry_part(&var, key);
                    let key_value = self.field_value(key, &key_part, depth + 1)?;
                    let value_part = self.direction.entry_part(&var, value);
                    let value_value = self.field_value(value, &value_part, depth + 1)?;
                    Ok(self.direction.entries(
                        source,
                        &var,
                        &self.proto_class(&entry.name),
                        key,
                        &key_value,
                        value,
                        &value_value,
                    ))
                }
            },
        }
    }

    /// Conversion of one non-container value; `None` for pass-through.
    fn convert(&self, ty: &FieldType, expr: &str, depth: usize) -> BridgeResult<Option<String>> {
        let nested = depth > 0 || self.buffers;

        match ty {
            FieldType::Bytes => Ok(Some(self.direction.bytes(expr, nested))),
            FieldType::Enum(name) => {
                let enumeration = self.ir.require_struct(name)?;
                let class = enumeration.source_identity().ok_or_else(|| {
                    BridgeError::reference(format!("enum `{name}` has no source type"))
                })?;
                Ok(Some(self.direction.enumeration(class, expr)))
            }
            FieldType::Struct(name) => {
                let target = self.ir.require_struct(name)?;
                if target.is_wrapper() {
                    let inner = target.fields.first().ok_or_else(|| {
                        BridgeError::reference(format!("wrapper `{name}` has no field"))
                    })?;
                    let source = self.direction.wrapper_read(expr, inner);
                    let converted = self.field_value(inner, &source, depth)?;
                    return Ok(Some(self.direction.wrapper_build(
                        &self.proto_class(&target.name),
                        inner,
                        &converted,
                    )));
                }
                if !target.needs_codec() {
                    return Err(BridgeError::reference(format!(
                        "struct `{name}` is used as a value but has no codec"
                    )));
                }
                Ok(Some(self.marshaller_call(name, expr)?))
            }
            scalar => Ok(self.direction.scalar(scalar, expr)),
        }
    }

    fn entry_struct(&self, field: &Field) -> BridgeResult<&'a Struct> {
        let name = field.primary.struct_name().ok_or_else(|| {
            BridgeError::reference(format!("map field `{}` has no entry struct", field.name))
        })?;
        self.ir.require_struct(name)
    }

    /// Statements assigning every field of `object` onto `ret`.
    pub fn assignments(
        &self,
        object: &str,
        fields: &[Field],
        method: &mut JavaMethod,
    ) -> BridgeResult<()> {
        for field in fields {
            let value = self.field_value(field, &self.direction.read(object, field), 0)?;
            let write = format!("ret.{}({value});", self.direction.setter(field));
            match self.direction.presence(object, field) {
                Some(condition) => {
                    method.line(0, format!("if ({condition}) {{"));
                    method.line(1, write);
                    method.line(0, "}");
                }
                None => method.line(0, write),
            }
        }
        Ok(())
    }

    /// The `to<Label>` function of one struct.
    pub fn struct_method(&self, s: &Struct) -> BridgeResult<JavaMethod> {
        let thrift_class = s.source_identity().ok_or_else(|| {
            BridgeError::reference(format!("struct `{}` has no source type", s.name))
        })?;
        let (arg, ret) = D::signature(thrift_class, &self.proto_class(&s.name));

        let mut method =
            JavaMethod::new("public static", &ret, &format!("to{}", D::LABEL)).param(&arg, "arg");
        method.line(0, self.direction.open(&ret));
        self.assignments("arg", &s.fields, &mut method)?;
        method.line(0, self.direction.close());
        Ok(method)
    }
}

fn entry_field<'s>(entry: &'s Struct, name: &str) -> BridgeResult<&'s Field> {
    entry.field(name).ok_or_else(|| {
        BridgeError::reference(format!("entry struct `{}` has no `{name}` field", entry.name))
    })
}

/// Imports needed by the range helpers.
pub(crate) const HELPER_IMPORTS: [&str; 2] = [
    "com.google.common.base.Preconditions",
    "com.google.common.collect.Range",
];

/// Narrowing-range constants, followed by the helper methods from [`range_checks`].
pub(crate) fn range_fields() -> Vec<JavaField> {
    const PSF: &str = "private static final";
    vec![
        JavaField::new(PSF, "int", "MIN_BYTE = Byte.MIN_VALUE"),
        JavaField::new(PSF, "int", "MAX_BYTE = Byte.MAX_VALUE"),
        JavaField::new(PSF, "int", "MIN_SHORT = Short.MIN_VALUE"),
        JavaField::new(PSF, "int", "MAX_SHORT = Short.MAX_VALUE"),
        JavaField::new(PSF, "Range<Integer>", "BYTE_RANGE = Range.closed(MIN_BYTE, MAX_BYTE)"),
        JavaField::new(PSF, "Range<Integer>", "SHORT_RANGE = Range.closed(MIN_SHORT, MAX_SHORT)"),
    ]
}

/// `checkByte`, `checkShort` and `checkEnum`.
pub(crate) fn range_checks() -> Vec<JavaMethod> {
    let mut check_byte =
        JavaMethod::new("private static", "byte", "checkByte").param("int", "value");
    check_byte.line(
        0,
        "Preconditions.checkArgument(BYTE_RANGE.contains(value), \"byte out of range: %s\", value);",
    );
    check_byte.line(0, "return (byte) value;");

    let mut check_short =
        JavaMethod::new("private static", "short", "checkShort").param("int", "value");
    check_short.line(
        0,
        "Preconditions.checkArgument(SHORT_RANGE.contains(value), \"short out of range: %s\", value);",
    );
    check_short.line(0, "return (short) value;");

    let mut check_enum = JavaMethod::new("private static <T>", "T", "checkEnum").param("T", "e");
    check_enum.line(0, "return Preconditions.checkNotNull(e, \"unknown enum value\");");

    vec![check_byte, check_short, check_enum]
}

/// Generate both codec classes for every module with source-defined structs.
pub fn generate_marshallers(
    ir: &SchemaIr,
    options: &MarshallerOptions,
) -> BridgeResult<Vec<GeneratedFile>> {
    let mut files = generate_direction(ir, options, ToGrpc)?;
    files.extend(generate_direction(ir, options, ToThrift)?);
    info!(files = files.len(), "codec synthesis complete");
    Ok(files)
}

fn generate_direction<D: Direction>(
    ir: &SchemaIr,
    options: &MarshallerOptions,
    direction: D,
) -> BridgeResult<Vec<GeneratedFile>> {
    let codec = Codec::new(ir, options, direction);
    let mut files = Vec::new();

    for module in ir.modules() {
        let structs: Vec<&Struct> = module.structs.iter().filter(|s| s.needs_codec()).collect();
        if structs.is_empty() {
            continue;
        }

        let name = marshaller_class(&module.name, D::LABEL);
        let mut class = JavaClass::new(D::marshaller_package(options), "public final class", &name);
        class.imports = HELPER_IMPORTS.iter().map(|s| s.to_string()).collect();
        class.fields = range_fields();
        class.methods.push(JavaMethod::new("private", "", &name));
        for s in structs {
            class.methods.push(codec.struct_method(s)?);
        }
        class.methods.extend(range_checks());

        debug!(class = %name, module = %module.name, "rendered codec");
        files.push(GeneratedFile::new(class.file_path(), class.render()));
    }

    Ok(files)
}
