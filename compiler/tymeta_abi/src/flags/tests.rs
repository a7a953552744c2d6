use super::*;
use pretty_assertions::assert_eq;
use proptest::prelude::*;

fn conformance_type_kind() -> impl Strategy<Value = ProtocolConformanceTypeKind> {
    proptest::sample::select(ProtocolConformanceTypeKind::ALL.to_vec())
}

fn conformance_ref_kind() -> impl Strategy<Value = ProtocolConformanceReferenceKind> {
    prop_oneof![
        Just(ProtocolConformanceReferenceKind::WitnessTable),
        Just(ProtocolConformanceReferenceKind::WitnessTableAccessor),
    ]
}

fn class_constraint() -> impl Strategy<Value = ProtocolClassConstraint> {
    prop_oneof![
        Just(ProtocolClassConstraint::Class),
        Just(ProtocolClassConstraint::Any),
    ]
}

fn dispatch() -> impl Strategy<Value = ProtocolDispatchStrategy> {
    proptest::sample::select(ProtocolDispatchStrategy::ALL.to_vec())
}

fn special() -> impl Strategy<Value = SpecialProtocol> {
    proptest::sample::select(SpecialProtocol::ALL.to_vec())
}

fn convention() -> impl Strategy<Value = FunctionMetadataConvention> {
    proptest::sample::select(FunctionMetadataConvention::ALL.to_vec())
}

// ── Protocol conformance ──

#[test]
fn conformance_type_kind_extracts_high_values() {
    let flags = ProtocolConformanceFlags::new()
        .with_type_kind(ProtocolConformanceTypeKind::UniqueDirectClass);
    assert_eq!(flags.bits(), 0xF);
    assert_eq!(
        flags.type_kind(),
        Some(ProtocolConformanceTypeKind::UniqueDirectClass)
    );
}

#[test]
fn conformance_kind_occupies_bit_four() {
    let flags = ProtocolConformanceFlags::new()
        .with_conformance_kind(ProtocolConformanceReferenceKind::WitnessTableAccessor);
    assert_eq!(flags.bits(), 0x10);
    assert_eq!(flags.type_kind(), Some(ProtocolConformanceTypeKind::Universal));
}

#[test]
fn unassigned_conformance_type_kind_decodes_to_none() {
    assert_eq!(ProtocolConformanceFlags::from_bits(7).type_kind(), None);
}

proptest! {
    #[test]
    fn conformance_round_trip(tk in conformance_type_kind(), rk in conformance_ref_kind()) {
        let flags = ProtocolConformanceFlags::new()
            .with_type_kind(tk)
            .with_conformance_kind(rk);
        prop_assert_eq!(flags.type_kind(), Some(tk));
        prop_assert_eq!(flags.conformance_kind(), rk);
    }

    #[test]
    fn conformance_setters_are_isolated(
        bits in any::<u32>(),
        tk in conformance_type_kind(),
        rk in conformance_ref_kind(),
    ) {
        let base = ProtocolConformanceFlags::from_bits(bits);
        let set_tk = base.with_type_kind(tk);
        prop_assert_eq!(set_tk.conformance_kind(), base.conformance_kind());
        prop_assert_eq!(set_tk.bits() & !0xF, bits & !0xF);
        let set_rk = base.with_conformance_kind(rk);
        prop_assert_eq!(set_rk.type_kind(), base.type_kind());
        prop_assert_eq!(set_rk.bits() & !0x10, bits & !0x10);
    }
}

// ── Protocol descriptors ──

#[test]
fn descriptor_flags_layout() {
    let flags = ProtocolDescriptorFlags::new()
        .with_source_defined(true)
        .with_class_constraint(ProtocolClassConstraint::Any)
        .with_dispatch_strategy(ProtocolDispatchStrategy::Swift)
        .with_special_protocol(SpecialProtocol::ErrorType);
    assert_eq!(flags.bits(), 0x1 | 0x2 | (1 << 2) | (2 << 6));
    assert!(flags.needs_witness_table());
}

#[test]
fn descriptor_flags_leave_legacy_bits_alone() {
    let reserved = ProtocolDescriptorFlags::LEGACY_RESERVED;
    let flags = ProtocolDescriptorFlags::from_bits(reserved)
        .with_dispatch_strategy(ProtocolDispatchStrategy::Empty)
        .with_special_protocol(SpecialProtocol::AnyObject);
    assert_eq!(flags.bits() & reserved, reserved);
}

#[test]
fn any_object_needs_no_witness_table() {
    let flags = ProtocolDescriptorFlags::new()
        .with_class_constraint(ProtocolClassConstraint::Class)
        .with_dispatch_strategy(ProtocolDispatchStrategy::Swift)
        .with_special_protocol(SpecialProtocol::AnyObject);
    assert!(!flags.needs_witness_table());
}

#[test]
fn only_swift_dispatch_needs_witness_tables() {
    assert!(!ProtocolDispatchStrategy::ObjC.needs_witness_table());
    assert!(ProtocolDispatchStrategy::Swift.needs_witness_table());
    assert!(!ProtocolDispatchStrategy::Empty.needs_witness_table());
}

proptest! {
    #[test]
    fn descriptor_round_trip(
        source in any::<bool>(),
        cc in class_constraint(),
        ds in dispatch(),
        sp in special(),
    ) {
        let flags = ProtocolDescriptorFlags::new()
            .with_source_defined(source)
            .with_class_constraint(cc)
            .with_dispatch_strategy(ds)
            .with_special_protocol(sp);
        prop_assert_eq!(flags.is_source_defined(), source);
        prop_assert_eq!(flags.class_constraint(), cc);
        prop_assert_eq!(flags.dispatch_strategy(), Some(ds));
        prop_assert_eq!(flags.special_protocol(), Some(sp));
    }

    #[test]
    fn descriptor_setters_are_isolated(
        source in any::<bool>(),
        cc in class_constraint(),
        ds in dispatch(),
        sp in special(),
        next in dispatch(),
    ) {
        let flags = ProtocolDescriptorFlags::new()
            .with_source_defined(source)
            .with_class_constraint(cc)
            .with_dispatch_strategy(ds)
            .with_special_protocol(sp);
        let changed = flags.with_dispatch_strategy(next);
        prop_assert_eq!(changed.is_source_defined(), source);
        prop_assert_eq!(changed.class_constraint(), cc);
        prop_assert_eq!(changed.special_protocol(), Some(sp));
        prop_assert_eq!(changed.dispatch_strategy(), Some(next));
    }
}

// ── Existential types ──

#[test]
fn existential_class_constraint_is_top_bit() {
    let flags = ExistentialTypeFlags::new().with_class_constraint(ProtocolClassConstraint::Any);
    assert_eq!(flags.bits(), 0x8000_0000);
    assert_eq!(flags.num_witness_tables(), 0);
}

proptest! {
    #[test]
    fn existential_round_trip(
        n in 0..=ExistentialTypeFlags::MAX_WITNESS_TABLES,
        cc in class_constraint(),
        sp in special(),
    ) {
        let flags = ExistentialTypeFlags::new()
            .with_num_witness_tables(n)
            .with_class_constraint(cc)
            .with_special_protocol(sp);
        prop_assert_eq!(flags.num_witness_tables(), n);
        prop_assert_eq!(flags.class_constraint(), cc);
        prop_assert_eq!(flags.special_protocol(), Some(sp));
    }

    #[test]
    fn existential_count_setter_is_isolated(
        n in 0..=ExistentialTypeFlags::MAX_WITNESS_TABLES,
        m in 0..=ExistentialTypeFlags::MAX_WITNESS_TABLES,
        cc in class_constraint(),
        sp in special(),
    ) {
        let flags = ExistentialTypeFlags::new()
            .with_num_witness_tables(n)
            .with_class_constraint(cc)
            .with_special_protocol(sp)
            .with_num_witness_tables(m);
        prop_assert_eq!(flags.num_witness_tables(), m);
        prop_assert_eq!(flags.class_constraint(), cc);
        prop_assert_eq!(flags.special_protocol(), Some(sp));
    }
}

// ── Function types ──

proptest! {
    #[test]
    fn function_round_trip(
        n in 0..=FunctionTypeFlags::MAX_ARGUMENTS,
        c in convention(),
        throws in any::<bool>(),
    ) {
        let flags = FunctionTypeFlags::new()
            .with_num_arguments(n)
            .with_convention(c)
            .with_throws(throws);
        prop_assert_eq!(flags.num_arguments(), n);
        prop_assert_eq!(flags.convention(), Some(c));
        prop_assert_eq!(flags.throws(), throws);
    }

    #[test]
    fn function_throws_setter_is_isolated(
        n in 0..=FunctionTypeFlags::MAX_ARGUMENTS,
        c in convention(),
        throws in any::<bool>(),
    ) {
        let flags = FunctionTypeFlags::new()
            .with_num_arguments(n)
            .with_convention(c)
            .with_throws(throws)
            .with_throws(!throws);
        prop_assert_eq!(flags.num_arguments(), n);
        prop_assert_eq!(flags.convention(), Some(c));
        prop_assert_eq!(flags.throws(), !throws);
    }
}

#[test]
fn function_flags_layout() {
    let flags = FunctionTypeFlags::new()
        .with_num_arguments(3)
        .with_convention(FunctionMetadataConvention::Thin)
        .with_throws(true);
    assert_eq!(flags.bits(), 3 | (2 << 24) | 0x1000_0000);
}

// ── Field types ──

proptest! {
    #[test]
    fn field_type_round_trip(word in any::<usize>(), indirect in any::<bool>()) {
        let address = word & FieldType::TYPE_MASK;
        let entry = FieldType::new(address).with_indirect(indirect);
        prop_assert_eq!(entry.type_address(), address);
        prop_assert_eq!(entry.is_indirect(), indirect);
        let retyped = entry.with_type(address.wrapping_add(std::mem::size_of::<usize>()) & FieldType::TYPE_MASK);
        prop_assert_eq!(retyped.is_indirect(), indirect);
    }
}

#[test]
fn field_type_indirect_bit_is_low_bit() {
    let entry = FieldType::new(0x1000).with_indirect(true);
    assert_eq!(entry.bits(), 0x1001);
    assert_eq!(entry.with_indirect(false).bits(), 0x1000);
}

// ── Classes ──

#[test]
fn class_flags_bits() {
    let flags = ClassFlags::empty()
        .with_version1(true)
        .with_version1_refcounting(true);
    assert_eq!(flags.bits(), 0x3);
    let cleared = flags.with_version1(false);
    assert!(!cleared.is_version1());
    assert!(cleared.uses_version1_refcounting());
}

// ── Enum case counts ──

#[test]
fn enum_case_counts_pack_offset_in_top_byte() {
    let counts = EnumCaseCounts::new(3, 4);
    assert_eq!(counts.bits(), 3 | (4 << 24));
    assert_eq!(counts.payload_cases(), 3);
    assert_eq!(counts.payload_size_offset_words(), 4);
}

#[test]
#[should_panic(expected = "does not fit in 24 bits")]
fn enum_case_counts_reject_huge_payload_count() {
    let _ = EnumCaseCounts::new(1 << 24, 0);
}

#[test]
#[should_panic(expected = "does not fit in 8 bits")]
fn enum_case_counts_reject_far_payload_size() {
    let _ = EnumCaseCounts::new(1, 0x100);
}
