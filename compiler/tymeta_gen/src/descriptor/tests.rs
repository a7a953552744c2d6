use super::*;
use crate::sink::{CodegenSink, MaterializingSink};
use crate::symbol::Linkage;
use crate::test_support::{int64, int8, Fixture};
use pretty_assertions::assert_eq;
use tymeta_ir::{ProtocolId, TypeRef};

fn define(sink: &mut MaterializingSink, name: &str, buffer: ConstantBuffer) -> usize {
    sink.define_constant(name, Linkage::Private, buffer).unwrap()
}

fn view(addr: usize) -> &'static NominalTypeDescriptor {
    // SAFETY: `addr` is a materialized descriptor, never freed
    unsafe { &*(addr as *const NominalTypeDescriptor) }
}

// ── Names ──

#[test]
fn name_lists_end_with_an_empty_name() {
    assert_eq!(name_buffer("Pair").bytes(), b"Pair\0");
    assert_eq!(names_buffer(["a", "bc"]).bytes(), b"a\0bc\0\0");
    assert_eq!(names_buffer([]).bytes(), b"\0");
}

#[test]
fn enum_members_list_payload_cases_first() {
    let mut fx = Fixture::new();
    let e = fx.enumeration("E", &[None, Some(int8()), None, Some(int64())]);
    let decl = fx.table.nominal(e).unwrap();
    assert_eq!(member_names(&fx.table, decl), ["c1", "c3", "c0", "c2"]);
    let (counts, empty) = field_words(decl, 0);
    assert_eq!(EnumCaseCounts::from_bits(counts).payload_cases(), 2);
    assert_eq!(empty, 2);
}

// ── Generic parameters ──

#[test]
fn only_dispatchable_protocols_need_witness_tables() {
    let mut fx = Fixture::new();
    let p = fx.protocol("Hashable");
    let legacy = fx.objc_protocol("Legacy");
    let name = fx.table.intern("T");
    let other = fx.table.intern("U");
    let decl = fx
        .decl("Box", NominalKind::Struct)
        .with_generic_param(name, vec![p, legacy])
        .with_generic_param(other, vec![]);
    assert_eq!(witness_counts(&fx.table, &decl).unwrap(), [1, 0]);

    let broken = fx
        .decl("Bad", NominalKind::Struct)
        .with_generic_param(name, vec![ProtocolId::from_raw(77)]);
    assert_eq!(
        witness_counts(&fx.table, &broken).unwrap_err(),
        MetadataError::UnknownProtocol(ProtocolId::from_raw(77))
    );
}

// ── Materialized descriptors ──

#[test]
fn descriptor_reads_back_through_the_runtime_view() {
    let mut fx = Fixture::new();
    let pair = fx.structure("Pair", 2, &[TypeRef::Param(0), TypeRef::Param(1)]);
    let decl = fx.table.nominal(pair).unwrap();

    let mut sink = MaterializingSink::new();
    define(&mut sink, "Pair.name", name_buffer("Pair"));
    define(
        &mut sink,
        "Pair.field_names",
        names_buffer(member_names(&fx.table, decl)),
    );
    let (word0, word1) = field_words(decl, 3);
    let fields = DescriptorFields {
        kind: decl.kind.descriptor_kind(),
        name: Symbol::global("Pair.name"),
        field_word0: word0,
        field_word1: word1,
        field_names: Some(Symbol::global("Pair.field_names")),
        field_types: None,
        pattern: None,
        generic_param_vector_offset: 5,
        num_primary_params: 2,
        witness_counts: vec![0, 2],
    };
    let addr = define(&mut sink, "Pair.descriptor", fields.buffer());
    sink.finish().unwrap();

    let descriptor = view(addr);
    assert_eq!(descriptor.nominal_kind(), Some(NominalTypeKind::Struct));
    assert_eq!(descriptor.name(), "Pair");
    assert_eq!(descriptor.field_names(), ["f0", "f1"]);
    assert_eq!(descriptor.field_offset_vector(), Some((2, 3)));
    assert_eq!(descriptor.witness_counts(), [0, 2]);
    assert_eq!(descriptor.num_generic_arguments(), 4);
    assert!(descriptor.field_type_accessor().is_none());
    assert!(!descriptor.is_generic());
}

#[test]
fn missing_field_names_are_null() {
    let fields = DescriptorFields {
        kind: NominalTypeKind::Enum,
        name: Symbol::Address(0),
        field_word0: EnumCaseCounts::new(1, 0).bits(),
        field_word1: 4,
        field_names: None,
        field_types: None,
        pattern: None,
        generic_param_vector_offset: 0,
        num_primary_params: 0,
        witness_counts: Vec::new(),
    };
    let mut sink = MaterializingSink::new();
    let descriptor = view(define(&mut sink, "E.descriptor", fields.buffer()));
    assert!(descriptor.field_names().is_empty());
    assert_eq!(descriptor.num_empty_cases(), 4);
    assert_eq!(descriptor.num_field_types(), 1);
}
