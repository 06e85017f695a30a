//! Service adapter generation.
//!
//! Each source service becomes a grpc-java handler `<Service>GrpcService`
//! extending the generated `ImplBase`. Every RPC converts its request into
//! thrift call arguments, calls the client obtained from the injected
//! `ThriftStub`, converts the result back and completes the stream. A failed
//! call is logged and reported as `CANCELLED` with the cause attached.

use super::GeneratedFile;
use super::java::{JavaClass, JavaField, JavaMethod};
use super::marshaller::{
    Codec, Direction, HELPER_IMPORTS, MarshallerOptions, ToGrpc, ToThrift, range_checks,
    range_fields,
};
use super::naming::grpc_method_name;
use super::stub::STUB_INTERFACE;
use grpcbridge_core::{BridgeError, BridgeResult, EMPTY_STRUCT, Rpc, SchemaIr, Service};
use tracing::{debug, info};

/// Where adapters go and what they call into.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceOptions {
    /// Package of the `<Service>GrpcService` classes.
    pub package: String,
    /// Package of the `ThriftStub` interface.
    pub stub_package: String,
    pub marshaller: MarshallerOptions,
}

/// Generate one adapter class per service.
pub fn generate_services(
    ir: &SchemaIr,
    options: &ServiceOptions,
) -> BridgeResult<Vec<GeneratedFile>> {
    let adapter = Adapter {
        ir,
        to_thrift: Codec::new(ir, &options.marshaller, ToThrift).with_buffers(),
        to_grpc: Codec::new(ir, &options.marshaller, ToGrpc).with_buffers(),
        options,
    };

    let mut files = Vec::new();
    for module in ir.modules() {
        for service in &module.services {
            let class = adapter.service_class(service)?;
            debug!(class = %class.name, rpcs = service.rpcs.len(), "rendered service adapter");
            files.push(GeneratedFile::new(class.file_path(), class.render()));
        }
    }

    info!(files = files.len(), "service adapter generation complete");
    Ok(files)
}

struct Adapter<'a> {
    ir: &'a SchemaIr,
    to_thrift: Codec<'a, ToThrift>,
    to_grpc: Codec<'a, ToGrpc>,
    options: &'a ServiceOptions,
}

impl Adapter<'_> {
    fn service_class(&self, service: &Service) -> BridgeResult<JavaClass> {
        let name = format!("{}GrpcService", service.name);
        let stub = format!("{}.{STUB_INTERFACE}", self.options.stub_package);

        let mut class = JavaClass::new(&self.options.package, "public class", &name);
        class.extends = Some(format!(
            "{0}.{1}Grpc.{1}ImplBase",
            self.options.marshaller.proto_package, service.name
        ));
        class.imports = ["org.slf4j.Logger", "org.slf4j.LoggerFactory"]
            .into_iter()
            .chain(HELPER_IMPORTS)
            .map(str::to_string)
            .collect();

        class.fields.push(JavaField::new(
            "private static final",
            "Logger",
            &format!("log = LoggerFactory.getLogger({name}.class)"),
        ));
        class.fields.extend(range_fields());
        class.fields.push(JavaField::new("private final", &stub, "stub"));

        let mut constructor = JavaMethod::new("public", "", &name).param(&stub, "stub");
        constructor.line(0, "this.stub = stub;");
        class.methods.push(constructor);

        for rpc in &service.rpcs {
            class.methods.push(self.rpc_method(service, rpc)?);
        }
        class.methods.extend(range_checks());

        Ok(class)
    }

    fn rpc_method(&self, service: &Service, rpc: &Rpc) -> BridgeResult<JavaMethod> {
        let request = self.to_thrift.proto_class(&rpc.request);
        let response = self.to_grpc.proto_class(&rpc.response);
        let method_name = grpc_method_name(&rpc.name);

        let mut method = JavaMethod::new("public", "void", &method_name)
            .annotate("@Override")
            .param(&request, "request")
            .param(
                &format!("io.grpc.stub.StreamObserver<{response}>"),
                "responseObserver",
            );

        let call = format!(
            "stub.get{}().{}({})",
            service.name,
            rpc.name,
            self.arguments(rpc)?
        );

        method.line(0, "try {");
        for line in self.respond(rpc, &call)? {
            method.line(1, line);
        }
        method.line(1, "responseObserver.onCompleted();");
        method.line(0, "} catch (Exception e) {");
        method.line(1, format!("log.warn(\"{method_name} failed\", e);"));
        method.line(
            1,
            "responseObserver.onError(io.grpc.Status.CANCELLED.withDescription(e.getMessage()).withCause(e).asException());",
        );
        method.line(0, "}");

        Ok(method)
    }

    /// Thrift call arguments extracted from `request`.
    fn arguments(&self, rpc: &Rpc) -> BridgeResult<String> {
        if rpc.request == EMPTY_STRUCT {
            return Ok(String::new());
        }

        let request = self.ir.require_struct(&rpc.request)?;
        if request.needs_codec() {
            return self.to_thrift.marshaller_call(&request.name, "request");
        }

        let args = request
            .fields
            .iter()
            .map(|field| {
                let source = self.to_thrift.direction().read("request", field);
                self.to_thrift.field_value(field, &source, 0)
            })
            .collect::<BridgeResult<Vec<_>>>()?;
        Ok(args.join(", "))
    }

    /// Statements making the call and emitting its converted result.
    fn respond(&self, rpc: &Rpc, call: &str) -> BridgeResult<Vec<String>> {
        if rpc.response == EMPTY_STRUCT {
            return Ok(vec![
                format!("{call};"),
                format!(
                    "responseObserver.onNext({}.newBuilder().build());",
                    self.to_grpc.proto_class(EMPTY_STRUCT)
                ),
            ]);
        }

        let response = self.ir.require_struct(&rpc.response)?;
        if response.needs_codec() {
            let converted = self.to_grpc.marshaller_call(&response.name, call)?;
            return Ok(vec![format!("responseObserver.onNext({converted});")]);
        }

        let data = response.fields.first().ok_or_else(|| {
            BridgeError::reference(format!("response `{}` has no field", response.name))
        })?;
        let converted = self.to_grpc.field_value(data, "result", 0)?;
        Ok(vec![
            format!("var result = {call};"),
            format!(
                "responseObserver.onNext({}.newBuilder().{}({converted}).build());",
                self.to_grpc.proto_class(&response.name),
                self.to_grpc.direction().setter(data)
            ),
        ])
    }
}
