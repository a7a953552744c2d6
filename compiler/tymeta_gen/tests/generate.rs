//! Generating metadata for a small program and using it through the runtime.

#![allow(
    clippy::unwrap_used,
    reason = "tests use unwrap to panic on unexpected state"
)]

use pretty_assertions::assert_eq;
use tymeta_abi::{offsets, BuiltinType, MetadataKind};
use tymeta_gen::{
    init_tracing, AccessStrategy, BoxShape, GenOptions, MaterializingSink, MetadataGenerator,
};
use tymeta_ir::{DeclTable, NominalDecl, NominalKind, TypeRef};
use tymeta_rt::field_types::field_type_vector;
use tymeta_rt::heap::HEADER_SIZE;

/// `class Node { value: Int64, next: Node }`, `struct Entry<K, V> { key: K, value: V }`
/// and a resilient `struct Opaque { raw: Int32 }`.
fn program() -> DeclTable {
    let mut table = DeclTable::new();
    let node = table.declare("Node");
    let value = table.intern("value");
    let next = table.intern("next");
    let name = table.intern("Node");
    table.define(
        node,
        NominalDecl::new(name, NominalKind::Class)
            .with_field(value, TypeRef::Builtin(BuiltinType::Int64))
            .with_field(next, TypeRef::nominal(node)),
    );

    let entry = table.intern("Entry");
    let k = table.intern("K");
    let v = table.intern("V");
    let key = table.intern("key");
    table.add_nominal(
        NominalDecl::new(entry, NominalKind::Struct)
            .with_generic_param(k, Vec::new())
            .with_generic_param(v, Vec::new())
            .with_field(key, TypeRef::Param(0))
            .with_field(value, TypeRef::Param(1)),
    );

    let opaque = table.intern("Opaque");
    let raw = table.intern("raw");
    table.add_nominal(
        NominalDecl::new(opaque, NominalKind::Struct)
            .with_field(raw, TypeRef::Builtin(BuiltinType::Int32))
            .as_resilient(),
    );
    table
}

fn find(table: &DeclTable, name: &str) -> TypeRef {
    let id = table
        .nominal_ids()
        .find(|&id| table.name(table.nominal(id).unwrap().name) == name)
        .unwrap();
    TypeRef::nominal(id)
}

#[test]
fn self_referencing_class() {
    init_tracing();
    let table = program();
    let mut generator =
        MetadataGenerator::new(&table, GenOptions::default(), MaterializingSink::new());

    let node = find(&table, "Node");
    assert_eq!(generator.access_strategy(&node).unwrap(), AccessStrategy::Direct);
    let record = generator.metadata(&node).unwrap();
    assert_eq!(record.kind(), Some(MetadataKind::Class));
    assert_eq!(record.field_offsets(), &[HEADER_SIZE, HEADER_SIZE + 8]);
    assert_eq!(
        record.u32_at(offsets::CLASS_INSTANCE_SIZE) as usize,
        HEADER_SIZE + 16
    );
    let fields = field_type_vector(record);
    assert_eq!(fields[1].type_address(), record.addr());
    generator.finish().unwrap();
}

#[test]
fn boxes_of_generated_types() {
    let table = program();
    let mut generator =
        MetadataGenerator::new(&table, GenOptions::default(), MaterializingSink::new());

    let TypeRef::Nominal { decl: entry, .. } = find(&table, "Entry") else {
        unreachable!()
    };
    let ty = TypeRef::bound(
        entry,
        vec![
            TypeRef::Builtin(BuiltinType::Int64),
            TypeRef::Builtin(BuiltinType::NativeObject),
        ],
    );
    let boxed = generator.box_for(&ty).unwrap();
    assert_eq!(boxed.shape(), BoxShape::Custom);
    let pair = boxed.allocate();
    assert_eq!(boxed.project(pair.object), pair.value);
    assert_eq!(pair.value as usize % 8, 0);
    boxed.deallocate(pair.object);

    let opaque = generator.box_for(&find(&table, "Opaque")).unwrap();
    assert_eq!(opaque.shape(), BoxShape::NonFixed);
    let pair = opaque.allocate();
    assert_eq!(opaque.project(pair.object), pair.value);
    assert_eq!(pair.value as usize % 4, 0);
    opaque.deallocate(pair.object);

    let sink = generator.finish().unwrap();
    assert!(sink.unresolved().is_empty());
}
