use super::*;
use crate::test_support::{leak_words, name, W};
use crate::witness::builtin_metadata;
use pretty_assertions::assert_eq;
use tymeta_abi::{offsets, BuiltinType, ProtocolDescriptorFlags, ProtocolDispatchStrategy};

fn builtin(ty: BuiltinType) -> MetadataRef {
    builtin_metadata(ty)
}

/// A leaked protocol descriptor with the given flags.
fn protocol(flags: ProtocolDescriptorFlags) -> usize {
    let words = leak_words(vec![0; std::mem::size_of::<ProtocolDescriptor>() / W]);
    // SAFETY: the buffer is sized and aligned for a descriptor
    unsafe {
        words.cast::<ProtocolDescriptor>().write(ProtocolDescriptor {
            isa: 0,
            name: name("P\0"),
            inherited: std::ptr::null(),
            legacy_tables: [0; 5],
            size: std::mem::size_of::<ProtocolDescriptor>() as u32,
            flags: flags.bits(),
        });
    }
    words as usize
}

fn swift_protocol(constraint: ProtocolClassConstraint) -> usize {
    protocol(
        ProtocolDescriptorFlags::new()
            .with_source_defined(true)
            .with_class_constraint(constraint)
            .with_dispatch_strategy(ProtocolDispatchStrategy::Swift),
    )
}

// ── Tuples ──

#[test]
fn trivial_tuples_are_canonical() {
    let int8 = builtin(BuiltinType::Int8);
    assert_eq!(tuple_metadata(&[], std::ptr::null()), empty_tuple_metadata());
    assert_eq!(tuple_metadata(&[int8], std::ptr::null()), int8);
    assert_eq!(
        as_ref(tymeta_get_tuple_metadata(0, std::ptr::null(), std::ptr::null())),
        empty_tuple_metadata()
    );
}

fn as_ref(ptr: *const Metadata) -> MetadataRef {
    MetadataRef::new(ptr).unwrap()
}

#[test]
fn tuple_lays_out_elements() {
    let int8 = builtin(BuiltinType::Int8);
    let int64 = builtin(BuiltinType::Int64);
    let tuple = tuple_metadata(&[int8, int64, int8], std::ptr::null());
    assert_eq!(tuple.kind(), Some(MetadataKind::Tuple));
    assert_eq!(tuple.word(offsets::TUPLE_NUM_ELEMENTS), 3);
    let element = |i: isize| {
        let at = offsets::TUPLE_ELEMENTS + i * 2 * W as isize;
        (tuple.word(at), tuple.word(at + W as isize))
    };
    assert_eq!(element(0), (int8.addr(), 0));
    assert_eq!(element(1), (int64.addr(), 8));
    assert_eq!(element(2), (int8.addr(), 16));
    assert_eq!(tuple.size(), 17);
    assert_eq!(tuple.stride(), 24);
    assert!(tuple.is_pod());
}

#[test]
fn tuple_entry_points_unique() {
    let a = builtin(BuiltinType::Int32).as_ptr();
    let b = builtin(BuiltinType::Float64).as_ptr();
    let by_two = tymeta_get_tuple_metadata2(a, b, std::ptr::null());
    let by_array = tymeta_get_tuple_metadata(2, [a, b].as_ptr(), std::ptr::null());
    assert_eq!(by_two, by_array);
    let three = tymeta_get_tuple_metadata3(a, b, a, std::ptr::null());
    assert_ne!(three, by_two);
    assert!(tymeta_get_tuple_metadata2(a, std::ptr::null(), std::ptr::null()).is_null());
}

#[test]
fn labels_distinguish_tuples() {
    let a = builtin(BuiltinType::Int32);
    let labels = name("x y \0");
    let plain = tuple_metadata(&[a, a], std::ptr::null());
    let labeled = tuple_metadata(&[a, a], labels);
    assert_ne!(plain, labeled);
    assert_eq!(labeled.word(offsets::TUPLE_LABELS), labels as usize);
}

// ── Functions ──

#[test]
fn function_records_carry_inout_bits() {
    let int64 = builtin(BuiltinType::Int64);
    let word = builtin(BuiltinType::Word);
    let flags = FunctionTypeFlags::new().with_throws(true);
    let f = function_metadata(flags, &[(int64, false), (word, true)], int64);
    assert_eq!(f.kind(), Some(MetadataKind::Function));
    let stored = FunctionTypeFlags::from_bits(f.word(offsets::FUNCTION_FLAGS));
    assert_eq!(stored.num_arguments(), 2);
    assert!(stored.throws());
    assert_eq!(f.word(offsets::FUNCTION_RESULT), int64.addr());
    assert_eq!(function_parameters(f), vec![(int64, false), (word, true)]);
    assert_eq!(f.size(), 2 * W);
    assert!(!f.is_pod());

    let g = function_metadata(flags, &[(int64, false), (word, false)], int64);
    assert_ne!(f, g);
    assert_eq!(function_metadata(flags, &[(int64, false), (word, true)], int64), f);
}

#[test]
fn function_entry_points_agree() {
    let int8 = builtin(BuiltinType::Int8).addr();
    let result = builtin(BuiltinType::Int16);
    let flags = FunctionTypeFlags::new().with_num_arguments(1).bits();
    let fast = tymeta_get_function_metadata1(flags, int8 | 1, result.as_ptr());
    let array = [flags, int8 | 1, result.addr()];
    assert_eq!(tymeta_get_function_metadata(array.as_ptr()), fast);
    assert_eq!(function_parameters(as_ref(fast)), vec![(builtin(BuiltinType::Int8), true)]);
}

#[test]
fn thin_functions_are_plain_data() {
    let int8 = builtin(BuiltinType::Int8);
    let thin = FunctionTypeFlags::new().with_convention(FunctionMetadataConvention::Thin);
    let f = function_metadata(thin, &[], int8);
    assert!(f.is_pod());
    assert_eq!(f.size(), W);
}

// ── Metatypes ──

#[test]
fn metatypes_are_uniqued_per_instance() {
    let int8 = builtin(BuiltinType::Int8);
    let m = metatype_metadata(int8);
    assert_eq!(m.kind(), Some(MetadataKind::Metatype));
    assert_eq!(m.word(offsets::METATYPE_INSTANCE), int8.addr());
    assert_eq!(as_ref(tymeta_get_metatype_metadata(int8.as_ptr())), m);
    assert!(tymeta_get_metatype_metadata(std::ptr::null()).is_null());
}

#[test]
fn existential_metatype_carries_witness_tables() {
    let p = swift_protocol(ProtocolClassConstraint::Any);
    let q = swift_protocol(ProtocolClassConstraint::Any);
    let existential = existential_metadata(&[p, q]);
    let meta = existential_metatype_metadata(existential);
    assert_eq!(meta.kind(), Some(MetadataKind::ExistentialMetatype));
    let flags = ExistentialTypeFlags::from_bits(meta.word(offsets::EXISTENTIAL_METATYPE_FLAGS));
    assert_eq!(flags.num_witness_tables(), 2);
    assert_eq!(meta.size(), 3 * W);
}

// ── Existentials ──

#[test]
fn existential_is_independent_of_protocol_order() {
    let p = swift_protocol(ProtocolClassConstraint::Any);
    let q = swift_protocol(ProtocolClassConstraint::Any);
    let pq = existential_metadata(&[p, q]);
    assert_eq!(existential_metadata(&[q, p]), pq);
    assert_eq!(existential_metadata(&[q, p, q]), pq);
    assert_eq!(pq.word(offsets::EXISTENTIAL_NUM_PROTOCOLS), 2);

    let flags = ExistentialTypeFlags::from_bits(pq.word(offsets::EXISTENTIAL_FLAGS));
    assert_eq!(flags.num_witness_tables(), 2);
    assert_eq!(flags.class_constraint(), ProtocolClassConstraint::Any);
    // box, metadata and two witness tables
    assert_eq!(pq.size(), 4 * W);
}

#[test]
fn class_bound_existential_omits_the_box() {
    let p = swift_protocol(ProtocolClassConstraint::Class);
    let objc = protocol(
        ProtocolDescriptorFlags::new()
            .with_class_constraint(ProtocolClassConstraint::Class)
            .with_dispatch_strategy(ProtocolDispatchStrategy::ObjC),
    );
    let e = existential_metadata(&[p, objc]);
    let flags = ExistentialTypeFlags::from_bits(e.word(offsets::EXISTENTIAL_FLAGS));
    assert_eq!(flags.class_constraint(), ProtocolClassConstraint::Class);
    assert_eq!(flags.num_witness_tables(), 1);
    assert_eq!(e.size(), 2 * W);
}

#[test]
fn error_existential_is_a_single_reference() {
    let error = protocol(
        ProtocolDescriptorFlags::new()
            .with_source_defined(true)
            .with_dispatch_strategy(ProtocolDispatchStrategy::Swift)
            .with_special_protocol(SpecialProtocol::ErrorType),
    );
    let e = existential_metadata(&[error]);
    let flags = ExistentialTypeFlags::from_bits(e.word(offsets::EXISTENTIAL_FLAGS));
    assert_eq!(flags.special_protocol(), Some(SpecialProtocol::ErrorType));
    assert_eq!(e.size(), W);
}

#[test]
fn any_object_existential_is_a_single_reference() {
    let any_object = protocol(
        ProtocolDescriptorFlags::new()
            .with_source_defined(true)
            .with_class_constraint(ProtocolClassConstraint::Class)
            .with_dispatch_strategy(ProtocolDispatchStrategy::Swift)
            .with_special_protocol(SpecialProtocol::AnyObject),
    );
    let e = existential_metadata(&[any_object]);
    let flags = ExistentialTypeFlags::from_bits(e.word(offsets::EXISTENTIAL_FLAGS));
    assert_eq!(flags.num_witness_tables(), 0);
    assert_eq!(flags.class_constraint(), ProtocolClassConstraint::Class);
    assert_eq!(e.size(), W);
}

#[test]
fn empty_composition_is_any() {
    let any = as_ref(tymeta_get_existential_metadata(0, std::ptr::null()));
    let flags = ExistentialTypeFlags::from_bits(any.word(offsets::EXISTENTIAL_FLAGS));
    assert_eq!(flags.num_witness_tables(), 0);
    assert_eq!(flags.class_constraint(), ProtocolClassConstraint::Any);
    assert_eq!(any.size(), 2 * W);
}
