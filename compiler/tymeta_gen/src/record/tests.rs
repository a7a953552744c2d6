use super::*;

use pretty_assertions::assert_eq;
use tymeta_abi::{MetadataKind, RuntimeFn};
use tymeta_ir::{DeclId, NominalKind};
use tymeta_rt::InitHook;

use crate::scan::{record_size, Section, Slot};

const W: usize = POINTER_SIZE;

fn struct_shape(fields: usize, generic_words: usize, pattern: bool) -> RecordShape {
    RecordShape::value(
        NominalKind::Struct,
        Section {
            decl: DeclId::from_raw(0),
            generic_words,
            fields,
            pattern,
        },
        false,
    )
}

fn word(buffer: &ConstantBuffer, offset: usize) -> usize {
    let bytes: [u8; W] = buffer.bytes()[offset..offset + W].try_into().unwrap();
    usize::from_ne_bytes(bytes)
}

// ── Records ──

#[test]
fn slots_land_at_their_offsets() {
    let shape = struct_shape(2, 0, false);
    let mut buffer = ConstantBuffer::new();
    let size = write_record(&mut buffer, &shape, |field| match field.slot {
        Slot::Kind => SlotValue::Word(MetadataKind::Struct.as_word()),
        Slot::Descriptor => SlotValue::Symbol(Symbol::global("desc")),
        Slot::FieldOffsets { count, .. } => SlotValue::Words((0..count).map(|i| i * 8).collect()),
        _ => SlotValue::Zero,
    });
    assert_eq!(size.size, buffer.len());
    assert_eq!(word(&buffer, W), MetadataKind::Struct.as_word());
    assert_eq!(word(&buffer, 4 * W), 0);
    assert_eq!(word(&buffer, 5 * W), 8);
    assert_eq!(buffer.relocations().len(), 1);
    assert_eq!(buffer.relocations()[0].offset, 2 * W);
}

#[test]
#[should_panic(expected = "written with the wrong byte size")]
fn wrong_sized_value_panics() {
    let shape = struct_shape(2, 0, false);
    let mut buffer = ConstantBuffer::new();
    write_record(&mut buffer, &shape, |field| match field.slot {
        Slot::FieldOffsets { .. } => SlotValue::Words(vec![0]),
        _ => SlotValue::Zero,
    });
}

#[test]
fn class_header_packs_narrow_fields() {
    let shape = RecordShape::class(vec![Section {
        decl: DeclId::from_raw(0),
        generic_words: 0,
        fields: 0,
        pattern: false,
    }]);
    let mut buffer = ConstantBuffer::new();
    write_record(&mut buffer, &shape, |field| match field.slot {
        Slot::HeapDestroyer => SlotValue::Symbol(Symbol::Runtime(RuntimeFn::DestroyClassInstance)),
        Slot::InstanceSize | Slot::ClassSize | Slot::ClassAddressPoint => SlotValue::U32(7),
        Slot::InstanceAlignMask => SlotValue::U16(3),
        Slot::ClassFlags | Slot::InstanceAddressPoint => SlotValue::U32(0),
        Slot::Reserved => SlotValue::U16(0),
        _ => SlotValue::Word(0),
    });
    let ap = 2 * W;
    let at = |offset: isize| (ap as isize + offset) as usize;
    let size = &buffer.bytes()[at(tymeta_abi::offsets::CLASS_INSTANCE_SIZE)..][..4];
    assert_eq!(u32::from_ne_bytes(size.try_into().unwrap()), 7);
    let mask = &buffer.bytes()[at(tymeta_abi::offsets::CLASS_INSTANCE_ALIGN_MASK)..][..2];
    assert_eq!(u16::from_ne_bytes(mask.try_into().unwrap()), 3);
}

// ── Patterns ──

#[test]
fn pattern_header_precedes_the_template() {
    let shape = struct_shape(2, 2, true);
    let create = CreateFunction {
        kind: MetadataKind::Struct,
        fill_ops: Vec::new(),
        ancestor_copies: Vec::new(),
        dependent_witnesses: None,
        field_type_slot: None,
        superclass: None,
        init: InitHook::None,
    }
    .leak();
    let buffer = pattern_buffer(&shape, create, 2, |field| match field.slot {
        Slot::Kind => SlotValue::Word(MetadataKind::Struct.as_word()),
        _ => SlotValue::Zero,
    });
    let template = record_size(&shape);
    assert_eq!(buffer.len(), GENERIC_PATTERN_HEADER_SIZE + template.size);
    let bytes = buffer.bytes();
    let metadata_size = u32::from_ne_bytes(bytes[W..W + 4].try_into().unwrap());
    let num_arguments = u16::from_ne_bytes(bytes[W + 4..W + 6].try_into().unwrap());
    let address_point = u16::from_ne_bytes(bytes[W + 6..W + 8].try_into().unwrap());
    assert_eq!(metadata_size as usize, template.size);
    assert_eq!(num_arguments, 2);
    assert_eq!(usize::from(address_point), W);
    assert_eq!(
        word(&buffer, GENERIC_PATTERN_HEADER_SIZE + template.address_point),
        MetadataKind::Struct.as_word()
    );
    assert_eq!(buffer.relocations()[0].symbol, Symbol::address(create));
}
