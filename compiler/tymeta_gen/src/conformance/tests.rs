use super::*;

use pretty_assertions::assert_eq;
use tymeta_ir::{DeclId, NominalKind};

use crate::error::ErrorCode;
use crate::test_support::{int64, Fixture};

/// `struct Sorted<T: Ord + Marker, U: Ord>` where `Marker` needs no table.
fn sorted(fx: &mut Fixture) -> (DeclId, ProtocolId, ProtocolId) {
    let ord = fx.protocol("Ord");
    let marker = fx.objc_protocol("Marker");
    let t = fx.table.intern("T");
    let u = fx.table.intern("U");
    let decl = fx
        .decl("Sorted", NominalKind::Struct)
        .with_generic_param(t, vec![ord, marker])
        .with_generic_param(u, vec![ord]);
    (fx.add(decl), ord, marker)
}

// ── Argument layout ──

#[test]
fn metadata_then_tables_per_parameter() {
    let mut fx = Fixture::new();
    let (id, ord, _) = sorted(&mut fx);
    let layout = ArgumentLayout::of(&fx.table, fx.table.nominal(id).unwrap()).unwrap();
    assert_eq!(
        layout.words(),
        &[
            ArgumentWord::Metadata { param: 0 },
            ArgumentWord::WitnessTable { param: 0, protocol: ord },
            ArgumentWord::Metadata { param: 1 },
            ArgumentWord::WitnessTable { param: 1, protocol: ord },
        ]
    );
    assert_eq!(layout.metadata_index(1), Some(2));
    assert_eq!(layout.witness_index(1, ord), Some(3));
}

#[test]
fn protocols_without_tables_take_no_word() {
    let mut fx = Fixture::new();
    let (id, _, marker) = sorted(&mut fx);
    let layout = ArgumentLayout::of(&fx.table, fx.table.nominal(id).unwrap()).unwrap();
    assert_eq!(layout.witness_index(0, marker), None);
    assert_eq!(layout.len(), 4);
}

#[test]
fn parameter_source_outside_context_is_unimplemented() {
    let layout = ArgumentLayout::default();
    assert!(layout.is_empty());
    assert_eq!(layout.param_source(0).unwrap_err().code(), ErrorCode::E5001);
}

#[test]
fn unknown_conformance_protocol_is_reported() {
    let mut fx = Fixture::new();
    let t = fx.table.intern("T");
    let bogus = ProtocolId::from_raw(9);
    let decl = fx
        .decl("Bad", NominalKind::Struct)
        .with_generic_param(t, vec![bogus]);
    let id = fx.add(decl);
    let err = ArgumentLayout::of(&fx.table, fx.table.nominal(id).unwrap()).unwrap_err();
    assert_eq!(err, MetadataError::UnknownProtocol(bogus));
}

// ── Witness sources ──

#[test]
fn registered_table_is_passed_directly() {
    let mut fx = Fixture::new();
    let ord = fx.protocol("Ord");
    let mut conformances = Conformances::new();
    conformances.register(int64(), ord, 0x1000);
    let source = conformances
        .witness_source(&fx.table, &int64(), ord, None)
        .unwrap();
    assert!(matches!(source, ArgumentSource::WitnessTable(0x1000)));
}

#[test]
fn parameter_conformance_is_forwarded() {
    let mut fx = Fixture::new();
    let (id, ord, _) = sorted(&mut fx);
    let layout = ArgumentLayout::of(&fx.table, fx.table.nominal(id).unwrap()).unwrap();
    let source = Conformances::new()
        .witness_source(&fx.table, &TypeRef::Param(1), ord, Some(&layout))
        .unwrap();
    assert!(matches!(source, ArgumentSource::Forward(3)));
}

#[test]
fn missing_conformance_names_type_and_protocol() {
    let mut fx = Fixture::new();
    let ord = fx.protocol("Ord");
    let point = fx.structure("Point", 0, &[int64()]);
    let err = Conformances::new()
        .witness_source(&fx.table, &TypeRef::nominal(point), ord, None)
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::E5006);
    assert_eq!(
        err.to_string(),
        "error[E5006]: `Point` has no registered conformance to `Ord`"
    );
}

// ── Descriptions ──

#[test]
fn describe_renders_structure() {
    let mut fx = Fixture::new();
    let pair = fx.structure("Pair", 2, &[TypeRef::Param(0), TypeRef::Param(1)]);
    let ty = TypeRef::bound(
        pair,
        vec![int64(), TypeRef::Tuple(vec![TypeRef::empty_tuple(), TypeRef::Param(0)])],
    );
    assert_eq!(describe(&fx.table, &ty), "Pair<Int64, ((), T0)>");
    assert_eq!(
        describe(&fx.table, &TypeRef::Metatype(Box::new(TypeRef::Existential(Vec::new())))),
        "Any.Type"
    );
}
