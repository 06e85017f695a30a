//! Java source rendering.
//!
//! A small model of a Java compilation unit: one top-level class or
//! interface with fields and methods. Generators build the model, and
//! [`JavaClass::render`] turns it into text indented with four spaces.

const INDENT: &str = "    ";

/// A field declaration such as `private static final int MIN_BYTE = Byte.MIN_VALUE;`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JavaField {
    pub modifiers: String,
    pub ty: String,
    /// Name, optionally followed by an initializer.
    pub declaration: String,
}

impl JavaField {
    pub fn new(modifiers: &str, ty: &str, declaration: &str) -> Self {
        Self {
            modifiers: modifiers.to_string(),
            ty: ty.to_string(),
            declaration: declaration.to_string(),
        }
    }
}

/// A method, constructor (empty return type) or interface method (no body).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JavaMethod {
    pub annotations: Vec<String>,
    pub modifiers: String,
    pub return_type: String,
    pub name: String,
    pub params: Vec<(String, String)>,
    pub throws: Option<String>,
    /// `(depth, text)` lines relative to the method body; `None` for abstract methods.
    pub body: Option<Vec<(usize, String)>>,
}

impl JavaMethod {
    pub fn new(modifiers: &str, return_type: &str, name: &str) -> Self {
        Self {
            annotations: Vec::new(),
            modifiers: modifiers.to_string(),
            return_type: return_type.to_string(),
            name: name.to_string(),
            params: Vec::new(),
            throws: None,
            body: Some(Vec::new()),
        }
    }

    /// A body-less method as declared in an interface.
    pub fn declaration(return_type: &str, name: &str) -> Self {
        Self {
            body: None,
            ..Self::new("", return_type, name)
        }
    }

    pub fn annotate(mut self, annotation: &str) -> Self {
        self.annotations.push(annotation.to_string());
        self
    }

    pub fn param(mut self, ty: &str, name: &str) -> Self {
        self.params.push((ty.to_string(), name.to_string()));
        self
    }

    pub fn throws(mut self, exception: &str) -> Self {
        self.throws = Some(exception.to_string());
        self
    }

    /// Append a body line at `depth` levels below the method's own.
    pub fn line(&mut self, depth: usize, text: impl Into<String>) {
        self.body.get_or_insert_with(Vec::new).push((depth, text.into()));
    }

    fn render(&self, code: &mut String) {
        for annotation in &self.annotations {
            code.push_str(&format!("{INDENT}{annotation}\n"));
        }

        let mut signature = String::new();
        if !self.modifiers.is_empty() {
            signature.push_str(&self.modifiers);
            signature.push(' ');
        }
        if !self.return_type.is_empty() {
            signature.push_str(&self.return_type);
            signature.push(' ');
        }
        let params = self
            .params
            .iter()
            .map(|(ty, name)| format!("{ty} {name}"))
            .collect::<Vec<_>>()
            .join(", ");
        signature.push_str(&format!("{}({})", self.name, params));
        if let Some(exception) = &self.throws {
            signature.push_str(&format!(" throws {exception}"));
        }

        match &self.body {
            None => code.push_str(&format!("{INDENT}{signature};\n")),
            Some(lines) => {
                code.push_str(&format!("{INDENT}{signature} {{\n"));
                for (depth, text) in lines {
                    code.push_str(&INDENT.repeat(depth + 2));
                    code.push_str(text);
                    code.push('\n');
                }
                code.push_str(&format!("{INDENT}}}\n"));
            }
        }
    }
}

/// One top-level Java type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JavaClass {
    pub package: String,
    pub imports: Vec<String>,
    /// E.g. `public final class` or `public interface`.
    pub header: String,
    pub name: String,
    pub extends: Option<String>,
    pub fields: Vec<JavaField>,
    pub methods: Vec<JavaMethod>,
}

impl JavaClass {
    pub fn new(package: &str, header: &str, name: &str) -> Self {
        Self {
            package: package.to_string(),
            imports: Vec::new(),
            header: header.to_string(),
            name: name.to_string(),
            extends: None,
            fields: Vec::new(),
            methods: Vec::new(),
        }
    }

    /// Path of the source file relative to the output root.
    pub fn file_path(&self) -> std::path::PathBuf {
        super::package_dir(&self.package).join(format!("{}.java", self.name))
    }

    pub fn render(&self) -> String {
        let mut code = String::new();

        if !self.package.is_empty() {
            code.push_str(&format!("package {};\n\n", self.package));
        }

        for import in &self.imports {
            code.push_str(&format!("import {import};\n"));
        }
        if !self.imports.is_empty() {
            code.push('\n');
        }

        code.push_str(&format!("{} {}", self.header, self.name));
        if let Some(parent) = &self.extends {
            code.push_str(&format!(" extends {parent}"));
        }
        code.push_str(" {\n");

        for field in &self.fields {
            code.push_str(&format!(
                "{INDENT}{} {} {};\n",
                field.modifiers, field.ty, field.declaration
            ));
        }

        for (i, method) in self.methods.iter().enumerate() {
            if i > 0 || !self.fields.is_empty() {
                code.push('\n');
            }
            method.render(&mut code);
        }

        code.push_str("}\n");
        code
    }
}
