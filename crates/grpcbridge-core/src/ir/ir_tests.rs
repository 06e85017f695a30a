#![allow(non_snake_case)]

use super::*;

fn point_struct(ir: &mut SchemaIr, module: &str) -> String {
    let name = ir.create_struct(module, "point", false);
    let point = ir.struct_mut(&name).unwrap();
    point.fields = vec![Field::new("x", FieldType::I32), Field::new("y", FieldType::I32)];
    point.source = Some(SourceRef::Type(format!("{module}.Point")));
    name
}

// ============================================================================
// NameRegistry
// ============================================================================

#[test]
fn NameRegistry___collisions___get_increasing_suffixes() {
    let mut registry = NameRegistry::new();

    let names: Vec<String> = (0..4).map(|_| registry.register("Status")).collect();

    assert_eq!(names, vec!["Status", "Status1", "Status2", "Status3"]);
}

#[test]
fn NameRegistry___suffixed_name_taken___skips_it() {
    let mut registry = NameRegistry::new();
    registry.register("Status1");

    assert_eq!(registry.register("Status"), "Status");
    assert_eq!(registry.register("Status"), "Status2");
}

#[test]
fn NameRegistry___bytes_sentinel___is_exempt() {
    let mut registry = NameRegistry::new();

    assert_eq!(registry.register(BYTES_SENTINEL), "bytes");
    assert_eq!(registry.register(BYTES_SENTINEL), "bytes");
    assert!(registry.is_empty());
}

// ============================================================================
// SchemaIr
// ============================================================================

#[test]
fn SchemaIr___new___has_empty_in_common() {
    let ir = SchemaIr::new();

    let empty = ir.struct_named(EMPTY_STRUCT).unwrap();

    assert!(empty.fields.is_empty());
    assert_eq!(ir.owner_of(EMPTY_STRUCT), Some(COMMON_MODULE));
}

#[test]
fn SchemaIr___two_contexts___do_not_share_names() {
    let mut first = SchemaIr::new();
    let mut second = SchemaIr::new();

    let a = first.create_struct("m", "Point", false);
    let b = second.create_struct("m", "Point", false);

    assert_eq!(a, "Point");
    assert_eq!(b, "Point");
}

#[test]
fn SchemaIr___create_struct___upper_cases_and_indexes_owner() {
    let mut ir = SchemaIr::new();

    let name = ir.create_struct("geo", "point", false);

    assert_eq!(name, "Point");
    assert_eq!(ir.owner_of("Point"), Some("geo"));
    assert_eq!(ir.struct_named("Point").unwrap().origin_name, "point");
}

#[test]
fn SchemaIr___move_struct___updates_owner_index() {
    let mut ir = SchemaIr::new();
    let name = point_struct(&mut ir, "geo");

    ir.move_struct(&name, COMMON_MODULE).unwrap();

    assert_eq!(ir.owner_of(&name), Some(COMMON_MODULE));
    assert!(!ir.module("geo").unwrap().contains(&name));
    assert!(ir.module(COMMON_MODULE).unwrap().contains(&name));
    assert_eq!(ir.struct_named(&name).unwrap().fields.len(), 2);
}

#[test]
fn SchemaIr___move_unknown_struct___returns_reference_error() {
    let mut ir = SchemaIr::new();

    let result = ir.move_struct("Ghost", COMMON_MODULE);

    assert!(matches!(result, Err(BridgeError::Reference(_))));
}

#[test]
fn SchemaIr___record_dependency_same_module___is_noop() {
    let mut ir = SchemaIr::new();
    point_struct(&mut ir, "geo");

    ir.record_dependency("geo", "geo", "Point");

    assert!(ir.module("geo").unwrap().imports.is_empty());
}

#[test]
fn SchemaIr___record_dependency___updates_both_sides() {
    let mut ir = SchemaIr::new();
    point_struct(&mut ir, "geo");

    ir.record_dependency("map", "geo", "Point");

    let map = ir.module("map").unwrap();
    assert!(map.imports.contains("geo"));
    assert!(map.dependencies["geo"].contains("Point"));
    assert!(ir.module("geo").unwrap().imported_by.contains("map"));
}

#[test]
fn SchemaIr___rebuild_edges___follows_relocated_structs() {
    let mut ir = SchemaIr::new();
    let point = point_struct(&mut ir, "geo");
    let route = ir.create_struct("map", "Route", false);
    ir.struct_mut(&route).unwrap().fields = vec![Field::repeated(
        "stops",
        ContainerKind::List,
        FieldType::Struct(point.clone()),
    )];
    ir.record_dependency("map", "geo", &point);

    ir.move_struct(&point, COMMON_MODULE).unwrap();
    ir.rebuild_edges();

    let map = ir.module("map").unwrap();
    assert_eq!(map.imports.iter().collect::<Vec<_>>(), vec![COMMON_MODULE]);
    assert!(ir.module("geo").unwrap().imported_by.is_empty());
}

#[test]
fn SchemaIr___rebuild_edges___request_module_imports_common() {
    let mut ir = SchemaIr::new();
    ir.create_struct(REQUEST_MODULE, "Get_Request", false);

    ir.rebuild_edges();

    assert!(ir.module(REQUEST_MODULE).unwrap().imports.contains(COMMON_MODULE));
}

#[test]
fn SchemaIr___mutual_imports___lists_each_pair_once() {
    let mut ir = SchemaIr::new();
    ir.add_import("a", "b");
    ir.add_import("b", "a");
    ir.add_import("b", "c");

    let pairs = ir.mutual_imports();

    assert_eq!(pairs, vec![("a".to_string(), "b".to_string())]);
}

#[test]
fn SchemaIr___find_import_cycle___detects_three_modules() {
    let mut ir = SchemaIr::new();
    ir.add_import("a", "b");
    ir.add_import("b", "c");
    ir.add_import("c", "a");

    let cycle = ir.find_import_cycle().unwrap();

    assert_eq!(cycle, vec!["a", "b", "c", "a"]);
}

#[test]
fn SchemaIr___find_import_cycle___acyclic_returns_none() {
    let mut ir = SchemaIr::new();
    ir.add_import("a", "b");
    ir.add_import("b", "c");
    ir.add_import("a", "c");

    assert!(ir.find_import_cycle().is_none());
}

// ============================================================================
// Field shapes
// ============================================================================

#[test]
fn Field___entry_list___is_repeated_not_native_map() {
    let field = Field::entry_list("owners", "Owners");

    assert!(field.is_repeated());
    assert!(field.is_entry_list());
    assert!(!field.is_native_map());
}

#[test]
fn Field___native_map___references_key_and_value() {
    let field = Field::native_map(
        "levels",
        FieldType::Enum("Level".into()),
        FieldType::Struct("Point".into()),
    );

    let referenced: Vec<&str> = field.referenced().collect();

    assert!(!field.is_repeated());
    assert_eq!(referenced, vec!["Level", "Point"]);
}

#[test]
fn FieldType___narrow_range___only_for_byte_and_short() {
    assert_eq!(FieldType::Byte.narrow_range(), Some((-128, 127)));
    assert_eq!(FieldType::I16.narrow_range(), Some((-32768, 32767)));
    assert_eq!(FieldType::I32.narrow_range(), None);
}
