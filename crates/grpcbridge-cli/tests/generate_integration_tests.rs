//! End-to-end generation from a TOML descriptor set and a config file

use grpcbridge_cli::config::BridgeConfig;
use grpcbridge_cli::generate::{Artifact, generate};
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

const DESCRIPTORS: &str = r#"
[[types]]
kind = "enum"
namespace = "com.acme.user"
name = "Status"
values = [{ name = "ACTIVE", value = 1 }, { name = "BANNED", value = 2 }]

[[types]]
kind = "struct"
namespace = "com.acme.user"
name = "User"
fields = [
    { name = "id", type = "i64" },
    { name = "status", type = "Status" },
    { name = "orders", type = "list<com.acme.order.Order>" },
    { name = "tags", type = "map<string,list<i32>>" },
]

[[types]]
kind = "struct"
namespace = "com.acme.order"
name = "Order"
fields = [
    { name = "id", type = "i64" },
    { name = "owner", type = "com.acme.user.User" },
    { name = "weight", type = "i16" },
]

[[types]]
kind = "service"
namespace = "com.acme.user"
name = "UserService"
rpcs = [
    { name = "getUser", params = [{ name = "id", type = "i64" }], returns = "User" },
    { name = "listOrders", params = [{ name = "id", type = "i64" }, { name = "limit", type = "i32" }], returns = "list<com.acme.order.Order>" },
    { name = "ban", params = [{ name = "id", type = "i64" }] },
]
"#;

const CONFIG: &str = r#"
log_level = "warn"
record_references = true

[source]
descriptors = ["schema/acme.toml"]

[proto]
output = "out/proto"
package = "acme.grpc"
java_package = "com.acme.grpc"

[marshaller]
output = "out/java"
thrift_package = "com.acme.codec.thrift"
grpc_package = "com.acme.codec.grpc"

[service]
output = "out/java"
package = "com.acme.service"

[stub]
output = "out/java"
package = "com.acme.stub"
"#;

fn setup() -> (tempfile::TempDir, BridgeConfig) {
    let dir = tempfile::tempdir().unwrap();
    fs::create_dir_all(dir.path().join("schema")).unwrap();
    fs::write(dir.path().join("schema/acme.toml"), DESCRIPTORS).unwrap();
    let config_path = dir.path().join("grpcbridge.toml");
    fs::write(&config_path, CONFIG).unwrap();
    let config = BridgeConfig::from_file(&config_path).unwrap();
    (dir, config)
}

fn files_under(root: &Path) -> Vec<PathBuf> {
    let mut found = Vec::new();
    let mut pending = vec![root.to_path_buf()];
    while let Some(dir) = pending.pop() {
        for entry in fs::read_dir(dir).unwrap() {
            let path = entry.unwrap().path();
            if path.is_dir() {
                pending.push(path);
            } else {
                found.push(path);
            }
        }
    }
    found.sort();
    found
}

fn file_stem(path: &Path) -> String {
    path.file_stem().unwrap().to_string_lossy().into_owned()
}

#[test]
fn generate___mutually_referencing_namespaces___emit_acyclic_schema() {
    let (dir, config) = setup();

    let summary = generate(&config, Artifact::Proto, &[], &[]).unwrap();

    assert!(summary.resolve.relocated_structs > 0);
    let proto_dir = dir.path().join("out/proto/acme/grpc");
    let mut imports: BTreeSet<(String, String)> = BTreeSet::new();
    for path in files_under(&proto_dir) {
        let content = fs::read_to_string(&path).unwrap();
        for line in content.lines().filter(|l| l.starts_with("import \"acme/grpc/")) {
            let target = line
                .trim_start_matches("import \"acme/grpc/")
                .trim_end_matches(".proto\";");
            imports.insert((file_stem(&path), target.to_string()));
        }
    }
    for (from, to) in &imports {
        assert!(
            !imports.contains(&(to.clone(), from.clone())),
            "{from} and {to} import each other"
        );
    }
}

#[test]
fn generate___reference_recording___emits_proto2_origin_module() {
    let (dir, config) = setup();

    generate(&config, Artifact::Proto, &[], &[]).unwrap();

    let origin = fs::read_to_string(dir.path().join("out/proto/acme/grpc/origin.proto")).unwrap();
    assert!(origin.starts_with("syntax = \"proto2\";"));
    assert!(origin.contains("[default = \"com.acme.user.Status\"]"));
}

#[test]
fn generate___all___java_references_resolve_to_generated_classes() {
    let (dir, config) = setup();

    generate(&config, Artifact::All, &[], &[]).unwrap();

    let java_files = files_under(&dir.path().join("out/java"));
    let classes: BTreeSet<String> = java_files.iter().map(|p| file_stem(p)).collect();
    assert!(classes.contains("UserServiceGrpcService"));
    assert!(classes.contains("ThriftStub"));

    for path in &java_files {
        let content = fs::read_to_string(path).unwrap();
        for package in ["com.acme.codec.grpc.", "com.acme.codec.thrift."] {
            for (index, _) in content.match_indices(package) {
                let rest = &content[index + package.len()..];
                let class: String = rest.chars().take_while(|c| c.is_alphanumeric()).collect();
                assert!(classes.contains(&class), "{} refers to missing {class}", path.display());
            }
        }
    }
}

#[test]
fn generate___all___proto_classes_in_java_have_messages() {
    let (dir, config) = setup();

    generate(&config, Artifact::All, &[], &[]).unwrap();

    let mut messages = BTreeSet::new();
    for path in files_under(&dir.path().join("out/proto")) {
        let content = fs::read_to_string(path).unwrap();
        for line in content.lines().filter(|l| l.starts_with("message ")) {
            messages.insert(line.trim_start_matches("message ").trim_end_matches(" {").to_string());
        }
    }

    for path in files_under(&dir.path().join("out/java")) {
        let content = fs::read_to_string(&path).unwrap();
        for (index, _) in content.match_indices("com.acme.grpc.") {
            let rest = &content[index + "com.acme.grpc.".len()..];
            let class: String = rest
                .chars()
                .take_while(|c| c.is_alphanumeric() || *c == '_')
                .collect();
            if class.ends_with("Grpc") {
                continue;
            }
            assert!(messages.contains(&class), "{} uses unknown message {class}", path.display());
        }
    }
}
