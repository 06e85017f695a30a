//! The `ThriftStub` interface service adapters are constructed with.
//!
//! One accessor per service returns the thrift client the adapter calls.
//! Deployments implement it to hand out pooled or per-call clients.

use super::GeneratedFile;
use super::java::{JavaClass, JavaMethod};
use grpcbridge_core::{BridgeResult, SchemaIr, Service};
use tracing::info;

/// Simple name of the generated interface.
pub const STUB_INTERFACE: &str = "ThriftStub";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StubOptions {
    pub package: String,
}

/// Generate `ThriftStub`, or nothing when the schema has no services.
pub fn generate_stub(ir: &SchemaIr, options: &StubOptions) -> BridgeResult<Vec<GeneratedFile>> {
    let mut services: Vec<&Service> = ir.modules().flat_map(|m| m.services.iter()).collect();
    if services.is_empty() {
        return Ok(Vec::new());
    }
    services.sort_by(|a, b| a.name.cmp(&b.name));

    let mut class = JavaClass::new(&options.package, "public interface", STUB_INTERFACE);
    for service in services {
        class.methods.push(
            JavaMethod::declaration(&service.client, &format!("get{}", service.name))
                .throws("Exception"),
        );
    }

    info!(accessors = class.methods.len(), "stub interface generated");
    Ok(vec![GeneratedFile::new(class.file_path(), class.render())])
}

#[cfg(test)]
mod tests {
    #![allow(non_snake_case)]

    use super::*;
    use grpcbridge_core::{DescriptorSet, TypeFilter, prepare};

    fn prepared(json: &str) -> SchemaIr {
        let set = DescriptorSet::from_json(json).unwrap();
        prepare(&set, &TypeFilter::default(), false).unwrap().ir
    }

    fn options() -> StubOptions {
        StubOptions {
            package: "com.example.stub".to_string(),
        }
    }

    #[test]
    fn generate_stub___services___one_accessor_each_sorted_by_name() {
        let ir = prepared(
            r#"{"types": [
                {"kind": "service", "namespace": "z", "name": "Orders", "rpcs": [{"name": "ping"}]},
                {"kind": "service", "namespace": "a", "name": "Users",
                 "client": "com.acme.UserClient", "rpcs": [{"name": "ping"}]}
            ]}"#,
        );

        let files = generate_stub(&ir, &options()).unwrap();

        assert_eq!(files.len(), 1);
        assert_eq!(
            files[0].path.display().to_string(),
            "com/example/stub/ThriftStub.java"
        );
        assert_eq!(
            files[0].content,
            "package com.example.stub;\n\
             \n\
             public interface ThriftStub {\n\
             \x20   z.Orders.Iface getOrders() throws Exception;\n\
             \n\
             \x20   com.acme.UserClient getUsers() throws Exception;\n\
             }\n"
        );
    }

    #[test]
    fn generate_stub___no_services___no_file() {
        let ir =
            prepared(r#"{"types": [{"kind": "struct", "namespace": "geo", "name": "Point"}]}"#);

        let files = generate_stub(&ir, &options()).unwrap();

        assert!(files.is_empty());
    }
}
