#![allow(non_snake_case)]

use super::*;
use std::path::Path;

const SCHEMA: &str = r#"{"types": [
    {"kind": "enum", "namespace": "users", "name": "Role", "values": [{"name": "ADMIN"}]},
    {"kind": "struct", "namespace": "users", "name": "User",
     "fields": [{"name": "id", "type": "i64"}, {"name": "role", "type": "Role"}]},
    {"kind": "service", "namespace": "users", "name": "UserService", "rpcs": [
        {"name": "get", "params": [{"name": "id", "type": "i64"}], "returns": "User"}
    ]}
]}"#;

const FULL: &str = r#"
[source]
descriptors = ["schema.json"]

[proto]
output = "proto"
package = "com.example.grpc"

[marshaller]
output = "java"
thrift_package = "com.example.marshaller.thrift"
grpc_package = "com.example.marshaller.grpc"

[service]
output = "java"
package = "com.example.service"

[stub]
output = "java"
package = "com.example.stub"
"#;

const PROTO_ONLY: &str = r#"
[source]
descriptors = ["schema.json"]

[proto]
output = "proto"
package = "com.example.grpc"
"#;

fn workspace(schema: &str, config: &str) -> (tempfile::TempDir, BridgeConfig) {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("schema.json"), schema).unwrap();
    let config_path = dir.path().join("grpcbridge.toml");
    std::fs::write(&config_path, config).unwrap();
    let config = BridgeConfig::from_file(&config_path).unwrap();
    (dir, config)
}

fn exists(root: &Path, relative: &str) -> bool {
    root.join(relative).is_file()
}

// ============================================================================
// Artifact selection
// ============================================================================

#[test]
fn generate___all___writes_every_artifact() {
    let (dir, config) = workspace(SCHEMA, FULL);

    let summary = generate(&config, Artifact::All, &[], &[]).unwrap();

    let root = dir.path();
    assert!(exists(root, "proto/com/example/grpc/users.proto"));
    assert!(exists(root, "proto/com/example/grpc/request.proto"));
    assert!(exists(root, "java/com/example/marshaller/grpc/UsersGrpcMarshaller.java"));
    assert!(exists(root, "java/com/example/marshaller/thrift/UsersThriftMarshaller.java"));
    assert!(exists(root, "java/com/example/service/UserServiceGrpcService.java"));
    assert!(exists(root, "java/com/example/stub/ThriftStub.java"));

    let kinds: Vec<Artifact> = summary.written.iter().map(|(kind, _, _)| *kind).collect();
    assert_eq!(
        kinds,
        vec![Artifact::Proto, Artifact::Marshaller, Artifact::Service, Artifact::Stub]
    );
    assert_eq!(summary.ingest.services, 1);
    assert_eq!(summary.ingest.rpcs, 1);
}

#[test]
fn generate___proto_only___leaves_java_untouched() {
    let (dir, config) = workspace(SCHEMA, FULL);

    let summary = generate(&config, Artifact::Proto, &[], &[]).unwrap();

    assert_eq!(summary.written.len(), 1);
    assert!(exists(dir.path(), "proto/com/example/grpc/users.proto"));
    assert!(!dir.path().join("java").exists());
}

#[test]
fn generate___artifact_without_section___fails() {
    let (_dir, config) = workspace(SCHEMA, PROTO_ONLY);

    let err = generate(&config, Artifact::Marshaller, &[], &[]).unwrap_err();

    assert!(err.to_string().contains("[marshaller]"), "{err}");
}

#[test]
fn generate___all_with_proto_only_config___fails_on_first_missing_section() {
    let (dir, config) = workspace(SCHEMA, PROTO_ONLY);

    let err = generate(&config, Artifact::All, &[], &[]).unwrap_err();

    assert!(err.to_string().contains("[marshaller]"), "{err}");
    // proto is rendered before the missing section is reached
    assert!(exists(dir.path(), "proto/com/example/grpc/users.proto"));
}

// ============================================================================
// Pipeline
// ============================================================================

#[test]
fn generate___exclude_from_command_line___skips_root() {
    let (_dir, config) = workspace(SCHEMA, PROTO_ONLY);

    let summary = generate(&config, Artifact::Proto, &[], &["UserService".to_string()]).unwrap();

    assert_eq!(summary.ingest.skipped, 1);
    assert_eq!(summary.ingest.services, 0);
}

#[test]
fn generate___mutual_imports___relocated_before_emission() {
    let schema = r#"{"types": [
        {"kind": "struct", "namespace": "a", "name": "A", "fields": [{"name": "b", "type": "b.B"}]},
        {"kind": "struct", "namespace": "b", "name": "B", "fields": [{"name": "a", "type": "a.A"}]}
    ]}"#;
    let (dir, config) = workspace(schema, PROTO_ONLY);

    let summary = generate(&config, Artifact::Proto, &[], &[]).unwrap();

    assert!(summary.resolve.relocated_structs > 0);
    let common_path = dir.path().join("proto/com/example/grpc/common.proto");
    let common = std::fs::read_to_string(common_path).unwrap();
    assert!(common.contains("message A {") || common.contains("message B {"));
}

#[test]
fn generate___missing_descriptor_file___fails_with_context() {
    let dir = tempfile::tempdir().unwrap();
    let config_path = dir.path().join("grpcbridge.toml");
    std::fs::write(&config_path, PROTO_ONLY).unwrap();
    let config = BridgeConfig::from_file(&config_path).unwrap();

    let err = generate(&config, Artifact::Proto, &[], &[]).unwrap_err();

    assert!(err.to_string().contains("Failed to load descriptors"), "{err}");
}

#[test]
fn generate___invalid_config___rejected_before_loading() {
    let (_dir, mut config) = workspace(SCHEMA, PROTO_ONLY);
    config.log_level = "chatty".to_string();

    let err = generate(&config, Artifact::Proto, &[], &[]).unwrap_err();

    assert!(err.to_string().contains("Invalid log_level"), "{err}");
}

#[test]
fn exit_code___ingestion_failure___uses_bridge_error_code() {
    let schema = r#"{"types": [
        {"kind": "service", "namespace": "a.x", "name": "Health"},
        {"kind": "service", "namespace": "b.y", "name": "Health"}
    ]}"#;
    let (_dir, config) = workspace(schema, PROTO_ONLY);

    let err = generate(&config, Artifact::Proto, &[], &[]).unwrap_err();

    assert!(format!("{err:?}").contains("service name already used by a.x.Health"), "{err:?}");
    assert_eq!(exit_code(&err), 2);
}

#[test]
fn exit_code___config_failure___is_one() {
    let (_dir, mut config) = workspace(SCHEMA, PROTO_ONLY);
    config.log_level = "chatty".to_string();

    let err = generate(&config, Artifact::Proto, &[], &[]).unwrap_err();

    assert_eq!(exit_code(&err), 1);
}

#[test]
fn diagnostic_lines___warnings_and_errors___counted_then_listed() {
    use grpcbridge_logging::DiagnosticsLayer;
    use std::sync::Arc;
    use tracing_subscriber::prelude::*;

    let diagnostics = Arc::new(Diagnostics::new());
    let subscriber =
        tracing_subscriber::registry().with(DiagnosticsLayer::new(diagnostics.clone()));
    tracing::subscriber::with_default(subscriber, || {
        tracing::warn!("map key type not allowed");
        tracing::error!("write failed");
    });

    assert_eq!(
        diagnostic_lines(&diagnostics),
        vec![
            "✓ Warnings: 1",
            "✗ Errors: 1",
            "    map key type not allowed",
            "    write failed",
        ]
    );
}

#[test]
fn diagnostic_lines___quiet_run___empty() {
    assert!(diagnostic_lines(&Diagnostics::new()).is_empty());
}

#[test]
fn Artifact___selects___all_covers_each_kind() {
    for kind in Artifact::EACH {
        assert!(Artifact::All.selects(kind));
        assert!(kind.selects(kind));
    }
    assert!(!Artifact::Proto.selects(Artifact::Stub));
}
