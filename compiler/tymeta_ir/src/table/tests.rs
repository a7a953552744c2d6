use super::*;
use crate::{NominalKind, ProtocolDecl};
use pretty_assertions::assert_eq;
use tymeta_abi::{ProtocolDispatchStrategy, SpecialProtocol};

#[test]
fn nominals_and_protocols_are_indexed_separately() {
    let mut table = DeclTable::new();
    let p = table.add_protocol(ProtocolDecl::new(table.intern("Hashable")));
    let s = table.add_nominal(NominalDecl::new(table.intern("Point"), NominalKind::Struct));
    assert_eq!(p.raw(), 0);
    assert_eq!(s.raw(), 0);
    assert_eq!(table.name(table.nominal(s).map_or(Name::EMPTY, |d| d.name)), "Point");
    assert!(table.protocol(p).is_some_and(ProtocolDecl::needs_witness_table));
}

#[test]
fn declare_then_define_supports_recursion() {
    let mut table = DeclTable::new();
    let list = table.declare("List");
    let node = NominalDecl::new(table.intern("List"), NominalKind::Enum)
        .with_case(table.intern("nil"), None)
        .with_indirect_case(table.intern("cons"), TypeRef::nominal(list));
    table.define(list, node);
    let decl = table.nominal(list);
    assert_eq!(decl.map(|d| d.kind), Some(NominalKind::Enum));
    assert_eq!(decl.map(|d| d.payload_cases().count()), Some(1));
}

#[test]
fn class_hierarchy_binds_ancestor_arguments() {
    let mut table = DeclTable::new();
    let base = table.add_nominal(
        NominalDecl::new(table.intern("Base"), NominalKind::Class)
            .with_generic_param(table.intern("T"), Vec::new()),
    );
    let mid = table.add_nominal(
        NominalDecl::new(table.intern("Mid"), NominalKind::Class)
            .with_generic_param(table.intern("U"), Vec::new())
            .with_superclass(TypeRef::bound(base, vec![TypeRef::Param(0)])),
    );
    let leaf = table.add_nominal(
        NominalDecl::new(table.intern("Leaf"), NominalKind::Class).with_superclass(TypeRef::bound(
            mid,
            vec![TypeRef::Builtin(crate::BuiltinType::Int64)],
        )),
    );
    let chain = table.class_hierarchy(leaf);
    let int = TypeRef::Builtin(crate::BuiltinType::Int64);
    assert_eq!(
        chain,
        vec![
            (base, vec![int.clone()]),
            (mid, vec![int]),
            (leaf, Vec::new()),
        ]
    );
    assert!(table.has_generic_ancestor(leaf));
    assert!(!table.has_generic_ancestor(base));
}

#[test]
fn objc_dispatch_needs_no_witness_table() {
    let table = DeclTable::new();
    let proto = ProtocolDecl::new(table.intern("Legacy")).with_dispatch(ProtocolDispatchStrategy::ObjC);
    assert!(!proto.needs_witness_table());
}

#[test]
fn any_object_needs_no_witness_table() {
    let table = DeclTable::new();
    let proto = ProtocolDecl::new(table.intern("AnyObject"))
        .class_bound()
        .with_special(SpecialProtocol::AnyObject);
    assert!(!proto.needs_witness_table());
}

#[test]
fn substitution_reaches_nested_types() {
    let ty = TypeRef::Tuple(vec![
        TypeRef::Param(1),
        TypeRef::Metatype(Box::new(TypeRef::Param(0))),
    ]);
    let bound = ty.substitute(&[
        TypeRef::Builtin(crate::BuiltinType::Int8),
        TypeRef::empty_tuple(),
    ]);
    assert!(!bound.has_params());
    assert_eq!(
        bound,
        TypeRef::Tuple(vec![
            TypeRef::empty_tuple(),
            TypeRef::Metatype(Box::new(TypeRef::Builtin(crate::BuiltinType::Int8))),
        ])
    );
}
