//! Source type descriptors.
//!
//! A [`DescriptorSet`] is the input contract of the pipeline: a flat list of
//! enum, struct and service descriptors as they appear in the source IDL. How
//! the set is produced does not matter to the core; the CLI reads it from
//! JSON or TOML files:
//!
//! ```json
//! { "types": [
//!   { "kind": "struct", "namespace": "com.example.geo", "name": "Point",
//!     "fields": [ { "name": "x", "type": "i32" }, { "name": "y", "type": "i32" } ] }
//! ] }
//! ```
//!
//! Field and return types are written as type expressions and parsed into
//! [`TypeRef`]: `bool`, `byte`, `i16`, `i32`, `i64`, `double`, `string`,
//! `binary`, `void`, `list<T>`, `set<T>`, `map<K,V>` and qualified names.

use crate::error::{BridgeError, BridgeResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use thiserror::Error;

/// A parsed type expression.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum TypeRef {
    Bool,
    Byte,
    I16,
    I32,
    I64,
    Double,
    String,
    Binary,
    /// Only valid as an RPC return type.
    Void,
    List(Box<TypeRef>),
    Set(Box<TypeRef>),
    Map(Box<TypeRef>, Box<TypeRef>),
    /// A user-defined enum or struct, either `ns.Name` or a bare `Name`
    /// resolved against the namespace of the referencing descriptor.
    Named(String),
}

/// A type expression that could not be parsed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid type `{expr}`: {reason}")]
pub struct TypeRefError {
    pub expr: String,
    pub reason: String,
}

impl TypeRefError {
    fn new(expr: &str, reason: impl Into<String>) -> Self {
        Self {
            expr: expr.to_string(),
            reason: reason.into(),
        }
    }
}

impl TypeRef {
    pub fn is_container(&self) -> bool {
        matches!(self, TypeRef::List(_) | TypeRef::Set(_) | TypeRef::Map(..))
    }

    /// Fully qualified identity of a named type, using `namespace` for bare names.
    pub fn qualified(&self, namespace: &str) -> Option<String> {
        match self {
            TypeRef::Named(name) if name.contains('.') || namespace.is_empty() => {
                Some(name.clone())
            }
            TypeRef::Named(name) => Some(format!("{namespace}.{name}")),
            _ => None,
        }
    }
}

impl FromStr for TypeRef {
    type Err = TypeRefError;

    fn from_str(expr: &str) -> Result<Self, Self::Err> {
        parse_type(expr.trim(), expr)
    }
}

impl TryFrom<String> for TypeRef {
    type Error = TypeRefError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<TypeRef> for String {
    fn from(value: TypeRef) -> Self {
        value.to_string()
    }
}

impl fmt::Display for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeRef::Bool => write!(f, "bool"),
            TypeRef::Byte => write!(f, "byte"),
            TypeRef::I16 => write!(f, "i16"),
            TypeRef::I32 => write!(f, "i32"),
            TypeRef::I64 => write!(f, "i64"),
            TypeRef::Double => write!(f, "double"),
            TypeRef::String => write!(f, "string"),
            TypeRef::Binary => write!(f, "binary"),
            TypeRef::Void => write!(f, "void"),
            TypeRef::List(element) => write!(f, "list<{element}>"),
            TypeRef::Set(element) => write!(f, "set<{element}>"),
            TypeRef::Map(key, value) => write!(f, "map<{key},{value}>"),
            TypeRef::Named(name) => write!(f, "{name}"),
        }
    }
}

fn parse_type(s: &str, whole: &str) -> Result<TypeRef, TypeRefError> {
    if s.is_empty() {
        return Err(TypeRefError::new(whole, "empty type expression"));
    }

    if let Some(open) = s.find('<') {
        let inner = s[open + 1..]
            .strip_suffix('>')
            .ok_or_else(|| TypeRefError::new(whole, "unbalanced angle brackets"))?;
        let args = split_type_args(inner)
            .ok_or_else(|| TypeRefError::new(whole, "unbalanced angle brackets"))?;
        let mut parsed = args
            .into_iter()
            .map(|arg| parse_type(arg.trim(), whole))
            .collect::<Result<Vec<_>, _>>()?;

        let head = s[..open].trim();
        return match (head, parsed.len()) {
            ("list", 1) => Ok(TypeRef::List(Box::new(parsed.remove(0)))),
            ("set", 1) => Ok(TypeRef::Set(Box::new(parsed.remove(0)))),
            ("map", 2) => {
                let value = parsed.remove(1);
                let key = parsed.remove(0);
                Ok(TypeRef::Map(Box::new(key), Box::new(value)))
            }
            (head, count) => Err(TypeRefError::new(
                whole,
                format!("`{head}` does not take {count} type argument(s)"),
            )),
        };
    }

    if s.contains('>') || s.contains(',') {
        return Err(TypeRefError::new(whole, "unbalanced angle brackets"));
    }

    match s {
        "bool" => Ok(TypeRef::Bool),
        "byte" | "i8" => Ok(TypeRef::Byte),
        "i16" => Ok(TypeRef::I16),
        "i32" => Ok(TypeRef::I32),
        "i64" => Ok(TypeRef::I64),
        "double" => Ok(TypeRef::Double),
        "string" => Ok(TypeRef::String),
        "binary" => Ok(TypeRef::Binary),
        "void" => Ok(TypeRef::Void),
        "list" | "set" | "map" => Err(TypeRefError::new(whole, "missing type arguments")),
        name if is_valid_name(name) => Ok(TypeRef::Named(name.to_string())),
        _ => Err(TypeRefError::new(whole, "invalid type name")),
    }
}

/// Split `a, map<b,c>` on top-level commas. `None` on unbalanced brackets.
fn split_type_args(inner: &str) -> Option<Vec<&str>> {
    let mut args = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;

    for (i, c) in inner.char_indices() {
        match c {
            '<' => depth += 1,
            '>' => depth = depth.checked_sub(1)?,
            ',' if depth == 0 => {
                args.push(&inner[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }

    if depth != 0 {
        return None;
    }
    args.push(&inner[start..]);
    Some(args)
}

fn is_valid_name(name: &str) -> bool {
    name.split('.').all(|segment| {
        let mut chars = segment.chars();
        matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
            && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
    })
}

/// One symbolic value of an enum.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnumValue {
    pub name: String,

    /// Numeric value; defaults to the symbol's position when absent.
    #[serde(default)]
    pub value: Option<i32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnumDescriptor {
    pub namespace: String,
    pub name: String,

    #[serde(default)]
    pub values: Vec<EnumValue>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDescriptor {
    pub name: String,

    #[serde(rename = "type")]
    pub ty: TypeRef,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StructDescriptor {
    pub namespace: String,
    pub name: String,

    #[serde(default)]
    pub fields: Vec<FieldDescriptor>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RpcDescriptor {
    pub name: String,

    #[serde(default)]
    pub params: Vec<FieldDescriptor>,

    #[serde(default = "default_return")]
    pub returns: TypeRef,
}

fn default_return() -> TypeRef {
    TypeRef::Void
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceDescriptor {
    pub namespace: String,
    pub name: String,

    /// Fully qualified client interface the service adapter calls into.
    #[serde(default)]
    pub client: Option<String>,

    #[serde(default)]
    pub rpcs: Vec<RpcDescriptor>,
}

impl ServiceDescriptor {
    /// The client interface, `<namespace>.<name>.Iface` unless given explicitly.
    pub fn client_interface(&self) -> String {
        self.client
            .clone()
            .unwrap_or_else(|| format!("{}.{}.Iface", self.namespace, self.name))
    }
}

/// A single source type definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TypeDescriptor {
    Enum(EnumDescriptor),
    Struct(StructDescriptor),
    Service(ServiceDescriptor),
}

impl TypeDescriptor {
    pub fn namespace(&self) -> &str {
        match self {
            TypeDescriptor::Enum(d) => &d.namespace,
            TypeDescriptor::Struct(d) => &d.namespace,
            TypeDescriptor::Service(d) => &d.namespace,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            TypeDescriptor::Enum(d) => &d.name,
            TypeDescriptor::Struct(d) => &d.name,
            TypeDescriptor::Service(d) => &d.name,
        }
    }

    /// Source identity: `namespace.name`.
    pub fn identity(&self) -> String {
        format!("{}.{}", self.namespace(), self.name())
    }

    pub fn kind(&self) -> &'static str {
        match self {
            TypeDescriptor::Enum(_) => "enum",
            TypeDescriptor::Struct(_) => "struct",
            TypeDescriptor::Service(_) => "service",
        }
    }
}

/// The full set of descriptors for one run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DescriptorSet {
    #[serde(default)]
    pub types: Vec<TypeDescriptor>,
}

impl DescriptorSet {
    pub fn new(types: Vec<TypeDescriptor>) -> Self {
        Self { types }
    }

    /// Parse a descriptor set from JSON text
    pub fn from_json(content: &str) -> BridgeResult<Self> {
        serde_json::from_str(content).map_err(|e| BridgeError::Descriptor {
            path: "<json>".to_string(),
            message: e.to_string(),
        })
    }

    /// Parse a descriptor set from TOML text
    pub fn from_toml(content: &str) -> BridgeResult<Self> {
        toml::from_str(content).map_err(|e| BridgeError::Descriptor {
            path: "<toml>".to_string(),
            message: e.to_string(),
        })
    }

    /// Load a descriptor file; the format follows the extension (`.toml` or JSON).
    pub fn from_file(path: impl AsRef<Path>) -> BridgeResult<Self> {
        let path = path.as_ref();
        let descriptor_error = |message: String| BridgeError::Descriptor {
            path: path.display().to_string(),
            message,
        };

        let content = std::fs::read_to_string(path).map_err(|e| descriptor_error(e.to_string()))?;
        let is_toml = path.extension().is_some_and(|ext| ext == "toml");

        if is_toml {
            toml::from_str(&content).map_err(|e| descriptor_error(e.to_string()))
        } else {
            serde_json::from_str(&content).map_err(|e| descriptor_error(e.to_string()))
        }
    }

    /// Load and concatenate several descriptor files in order.
    pub fn from_files<P: AsRef<Path>>(paths: &[P]) -> BridgeResult<Self> {
        let mut set = DescriptorSet::default();
        for path in paths {
            set.extend(DescriptorSet::from_file(path)?);
        }
        Ok(set)
    }

    pub fn extend(&mut self, other: DescriptorSet) {
        self.types.extend(other.types);
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}

/// Include/exclude selection of top-level descriptors by simple name.
///
/// Excluded types are still ingested when a selected type references them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeFilter {
    #[serde(default)]
    pub include: Vec<String>,

    #[serde(default)]
    pub exclude: Vec<String>,
}

impl TypeFilter {
    pub fn new(include: Vec<String>, exclude: Vec<String>) -> Self {
        Self { include, exclude }
    }

    pub fn accepts(&self, simple_name: &str) -> bool {
        (self.include.is_empty() || self.include.iter().any(|n| n == simple_name))
            && !self.exclude.iter().any(|n| n == simple_name)
    }
}
