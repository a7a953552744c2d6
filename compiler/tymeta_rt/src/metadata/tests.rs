use super::*;
use crate::test_support::{class_record, enum_record, generic_pair_pattern, struct_record, W};
use crate::witness::builtin_metadata;
use pretty_assertions::assert_eq;
use tymeta_abi::BuiltinType;

fn int(ty: BuiltinType) -> MetadataRef {
    builtin_metadata(ty)
}

// ── Handles ──

#[test]
fn null_is_not_a_record() {
    assert!(MetadataRef::new(std::ptr::null()).is_none());
    assert!(MetadataRef::from_addr(0).is_none());
    let int8 = int(BuiltinType::Int8);
    assert_eq!(MetadataRef::from_addr(int8.addr()), Some(int8));
    assert_eq!(MetadataRef::from_non_null(int8.as_non_null()), int8);
}

#[test]
fn builtin_records_have_no_descriptor() {
    let word = int(BuiltinType::Word);
    assert_eq!(word.size(), W);
    assert_eq!(word.stride(), W);
    assert_eq!(word.align_mask(), W - 1);
    assert!(word.is_pod());
    assert!(word.descriptor().is_none());
    assert!(word.superclass().is_none());
    assert!(word.generic_arguments().is_empty());
    assert!(word.field_offsets().is_empty());
}

// ── Nominal records ──

#[test]
fn struct_record_views() {
    let s = struct_record("Header\0", &[int(BuiltinType::Int32), int(BuiltinType::Int8)]);
    assert_eq!(s.kind(), Some(MetadataKind::Struct));
    assert_eq!(s.descriptor().unwrap().name(), "Header");
    assert_eq!(s.field_offsets(), &[0, 4]);
    assert_eq!(s.size(), 5);
    assert_eq!(s.stride(), 8);
    assert!(s.generic_arguments().is_empty());
}

#[test]
fn enum_record_has_no_field_offsets() {
    let e = enum_record("Flag\0", &[(int(BuiltinType::Int16), false)], 1);
    assert_eq!(e.kind(), Some(MetadataKind::Enum));
    assert_eq!(e.descriptor().unwrap().num_empty_cases(), 1);
    assert!(e.field_offsets().is_empty());
}

#[test]
fn class_record_links_its_superclass() {
    let base = class_record("Base\0", None, &[int(BuiltinType::Int64)]);
    let derived = class_record("Derived\0", Some(base), &[int(BuiltinType::Int8)]);
    assert_eq!(derived.kind(), Some(MetadataKind::Class));
    assert_eq!(derived.superclass(), Some(base));
    assert_eq!(base.superclass(), None);
    assert_eq!(derived.descriptor().unwrap().name(), "Derived");
}

#[test]
fn generic_instance_exposes_arguments() {
    let pattern = generic_pair_pattern("ViewPair\0");
    let (a, b) = (int(BuiltinType::Float64), int(BuiltinType::Int32));
    let instance = pattern.get(&[a.addr(), b.addr()]).unwrap();
    assert_eq!(instance.generic_arguments(), &[a.addr(), b.addr()]);
    assert_eq!(instance.field_offsets(), &[0, 8]);
}

// ── Raw access ──

#[test]
fn word_helpers_use_byte_offsets() {
    let mut buffer = [0usize; 4];
    let base = buffer.as_mut_ptr().cast::<u8>();
    // SAFETY: every offset is inside the buffer and suitably aligned
    unsafe {
        write_word(base, 2 * W as isize, 0xABCD);
        write_u32(base, W as isize, 7);
        write_u16(base, W as isize + 4, 3);
        assert_eq!(read_word(base, 2 * W as isize), 0xABCD);
    }
    let record = MetadataRef::new(buffer.as_ptr().cast()).unwrap();
    assert_eq!(record.u32_at(W as isize), 7);
    assert_eq!(record.u16_at(W as isize + 4), 3);
    assert_eq!(record.word(0), 0);
}

#[test]
fn copy_and_destroy_through_the_table() {
    let int64 = int(BuiltinType::Int64);
    let src = 0x1234_5678_u64;
    let mut dest = 0_u64;
    let dest_ptr = std::ptr::from_mut(&mut dest).cast::<u8>();
    // SAFETY: both locations hold an Int64
    unsafe {
        let out = int64.initialize_with_copy(dest_ptr, std::ptr::from_ref(&src).cast());
        assert_eq!(out, dest_ptr);
        int64.destroy(dest_ptr);
    }
    assert_eq!(dest, src);
}
