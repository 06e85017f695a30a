#![allow(non_snake_case)]

use super::*;
use crate::descriptor::{DescriptorSet, TypeFilter};
use crate::ingest::ingest;

fn ingested(json: &str) -> SchemaIr {
    let set = DescriptorSet::from_json(json).unwrap();
    let mut ir = SchemaIr::new();
    ingest(&set, &TypeFilter::default(), &mut ir).unwrap();
    ir
}

fn imports(ir: &SchemaIr, module: &str) -> Vec<String> {
    ir.module(module).unwrap().imports.iter().cloned().collect()
}

const MUTUAL: &str = r#"{"types": [
    {"kind": "struct", "namespace": "a", "name": "Foo", "fields": [{"name": "bar", "type": "b.Bar"}]},
    {"kind": "struct", "namespace": "a", "name": "Qux", "fields": [{"name": "n", "type": "i32"}]},
    {"kind": "struct", "namespace": "b", "name": "Bar", "fields": [{"name": "n", "type": "i32"}]},
    {"kind": "struct", "namespace": "b", "name": "Baz", "fields": [{"name": "qux", "type": "a.Qux"}]}
]}"#;

#[test]
fn resolve_cycles___mutual_pair___relocates_contended_structs() {
    let mut ir = ingested(MUTUAL);
    assert_eq!(ir.mutual_imports(), vec![("a".to_string(), "b".to_string())]);

    let stats = resolve_cycles(&mut ir).unwrap();

    assert_eq!(stats.resolved_modules, 2);
    assert_eq!(stats.relocated_structs, 2);
    assert_eq!(ir.owner_of("Bar"), Some(COMMON_MODULE));
    assert_eq!(ir.owner_of("Qux"), Some(COMMON_MODULE));
    assert_eq!(ir.owner_of("Foo"), Some("a"));
    assert_eq!(ir.owner_of("Baz"), Some("b"));
}

#[test]
fn resolve_cycles___mutual_pair___both_sides_import_only_common() {
    let mut ir = ingested(MUTUAL);

    resolve_cycles(&mut ir).unwrap();

    assert_eq!(imports(&ir, "a"), vec![COMMON_MODULE]);
    assert_eq!(imports(&ir, "b"), vec![COMMON_MODULE]);
    assert!(ir.module(COMMON_MODULE).unwrap().imports.is_empty());
    assert!(ir.mutual_imports().is_empty());
}

#[test]
fn resolve_cycles___second_run___changes_nothing() {
    let mut ir = ingested(MUTUAL);
    resolve_cycles(&mut ir).unwrap();
    let before = ir.module_names();
    let counts: Vec<usize> = ir.modules().map(|m| m.structs.len()).collect();

    let stats = resolve_cycles(&mut ir).unwrap();

    assert_eq!(stats, ResolveStats::default());
    assert_eq!(ir.module_names(), before);
    assert_eq!(ir.modules().map(|m| m.structs.len()).collect::<Vec<_>>(), counts);
}

#[test]
fn resolve_cycles___relocated_struct___takes_its_references_along() {
    let mut ir = ingested(
        r#"{"types": [
            {"kind": "enum", "namespace": "a", "name": "Kind", "values": [{"name": "ONE"}]},
            {"kind": "struct", "namespace": "a", "name": "Inner", "fields": [{"name": "kind", "type": "Kind"}]},
            {"kind": "struct", "namespace": "a", "name": "Qux", "fields": [{"name": "inner", "type": "list<Inner>"}]},
            {"kind": "struct", "namespace": "a", "name": "Foo", "fields": [{"name": "bar", "type": "b.Bar"}]},
            {"kind": "struct", "namespace": "b", "name": "Bar", "fields": [{"name": "n", "type": "i32"}]},
            {"kind": "struct", "namespace": "b", "name": "Baz", "fields": [{"name": "qux", "type": "a.Qux"}]}
        ]}"#,
    );

    let stats = resolve_cycles(&mut ir).unwrap();

    for name in ["Qux", "Inner", "Kind", "Bar"] {
        assert_eq!(ir.owner_of(name), Some(COMMON_MODULE), "{name}");
    }
    assert_eq!(stats.relocated_structs, 4);
    assert!(ir.module(COMMON_MODULE).unwrap().imports.is_empty());
}

#[test]
fn resolve_cycles___three_module_cycle___left_in_place() {
    let mut ir = ingested(
        r#"{"types": [
            {"kind": "struct", "namespace": "a", "name": "X", "fields": [{"name": "y", "type": "b.Y"}]},
            {"kind": "struct", "namespace": "b", "name": "Y", "fields": [{"name": "z", "type": "c.Z"}]},
            {"kind": "struct", "namespace": "c", "name": "Z", "fields": [{"name": "x", "type": "a.X"}]}
        ]}"#,
    );

    let stats = resolve_cycles(&mut ir).unwrap();

    assert_eq!(stats.resolved_modules, 0);
    assert_eq!(ir.owner_of("X"), Some("a"));
    assert!(ir.mutual_imports().is_empty());
    assert!(ir.find_import_cycle().is_some());
}

#[test]
fn resolve_cycles___service_and_request_module___cycle_broken() {
    let mut ir = ingested(
        r#"{"types": [
            {"kind": "struct", "namespace": "users", "name": "User", "fields": [{"name": "id", "type": "i64"}]},
            {"kind": "service", "namespace": "users", "name": "Users", "rpcs": [
                {"name": "rename", "params": [{"name": "user", "type": "User"}, {"name": "name", "type": "string"}]}
            ]}
        ]}"#,
    );
    assert!(!ir.mutual_imports().is_empty());

    resolve_cycles(&mut ir).unwrap();

    assert_eq!(ir.owner_of("User"), Some(COMMON_MODULE));
    assert!(ir.mutual_imports().is_empty());
    assert!(ir.find_import_cycle().is_none());
}

#[test]
fn resolve_cycles___acyclic_input___untouched() {
    let mut ir = ingested(
        r#"{"types": [
            {"kind": "struct", "namespace": "a", "name": "Foo", "fields": [{"name": "bar", "type": "b.Bar"}]},
            {"kind": "struct", "namespace": "b", "name": "Bar"}
        ]}"#,
    );

    let stats = resolve_cycles(&mut ir).unwrap();

    assert_eq!(stats, ResolveStats::default());
    assert_eq!(ir.owner_of("Bar"), Some("b"));
    assert_eq!(imports(&ir, "a"), vec!["b"]);
}

#[test]
fn resolve_cycles___dangling_dependency___reference_error() {
    let mut ir = SchemaIr::new();
    ir.record_dependency("a", "b", "Ghost");
    ir.record_dependency("b", "a", "Phantom");

    let error = resolve_cycles(&mut ir).unwrap_err();

    assert_eq!(error.error_code(), 3);
    assert!(error.to_string().contains("Phantom") || error.to_string().contains("Ghost"));
}
