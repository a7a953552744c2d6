//! Value-witness functions, table construction and the builtin records.
//!
//! Witnesses are grouped into families by how a value's ownership is
//! managed. Aggregate families (struct, enum, tuple) are driven by the
//! metadata passed alongside the value, so one pair of functions serves
//! every type of that family.

use tymeta_abi::{
    enum_tag_size, offsets, BuiltinType, ExistentialTypeFlags, MetadataKind, ReferenceCounting,
    ValueWitnessFlags, POINTER_ALIGN_MASK, POINTER_SIZE,
};

use crate::field_types::field_type_vector;
use crate::heap::{tymeta_release, tymeta_retain, HeapObject};
use crate::layout::enum_payload_size;
use crate::metadata::{CopyFn, DestroyFn, Metadata, MetadataRef, ValueWitnessTable};
use crate::refcount::{release_fn, retain_fn};

/// How values of a type are copied and destroyed.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum WitnessFamily {
    /// Plain bytes.
    Pod,
    /// A single reference of the given kind.
    Reference(ReferenceCounting),
    /// Function pointer plus a native context reference.
    ThickFunction,
    /// Stored properties described by the record's field types and offsets.
    Struct,
    /// Payload area plus tag, described by the record's case types.
    Enum,
    /// Elements described by the tuple record.
    Tuple,
    /// `[box][metadata][witness tables]`.
    Existential,
    /// `[object][witness tables]`.
    ClassExistential,
}

impl WitnessFamily {
    pub fn functions(self) -> (DestroyFn, CopyFn) {
        match self {
            Self::Pod => (pod_destroy, pod_copy),
            Self::Reference(kind) => match kind {
                ReferenceCounting::Native => (reference_destroy::<0>, reference_copy::<0>),
                ReferenceCounting::LegacyObject => (reference_destroy::<1>, reference_copy::<1>),
                ReferenceCounting::Unknown => (reference_destroy::<2>, reference_copy::<2>),
                ReferenceCounting::Bridge => (reference_destroy::<3>, reference_copy::<3>),
                ReferenceCounting::Block => (reference_destroy::<4>, reference_copy::<4>),
                ReferenceCounting::Error => (reference_destroy::<5>, reference_copy::<5>),
            },
            Self::ThickFunction => (thick_function_destroy, thick_function_copy),
            Self::Struct => (struct_destroy, struct_copy),
            Self::Enum => (enum_destroy, enum_copy),
            Self::Tuple => (tuple_destroy, tuple_copy),
            Self::Existential => (existential_destroy, existential_copy),
            Self::ClassExistential => (class_existential_destroy, class_existential_copy),
        }
    }
}

/// Layout facts that go into a table's flags word.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub struct TypeLayout {
    pub size: usize,
    pub align_mask: usize,
    pub pod: bool,
    pub extra_inhabitants: bool,
}

impl TypeLayout {
    pub const fn pod(size: usize, align_mask: usize) -> Self {
        Self {
            size,
            align_mask,
            pod: true,
            extra_inhabitants: false,
        }
    }

    pub const fn stride(&self) -> usize {
        let size = if self.size == 0 { 1 } else { self.size };
        tymeta_abi::round_up(size, self.align_mask)
    }

    pub const fn flags(&self) -> ValueWitnessFlags {
        let inline = self.size <= 3 * POINTER_SIZE && self.align_mask <= POINTER_ALIGN_MASK;
        ValueWitnessFlags::new()
            .with_alignment_mask(self.align_mask)
            .with_pod(self.pod)
            .with_inline(inline)
            .with_extra_inhabitants(self.extra_inhabitants)
            .with_bitwise_takable(true)
    }
}

/// Build a table for `family` with the given layout.
pub fn table(family: WitnessFamily, layout: TypeLayout) -> ValueWitnessTable {
    let (destroy, initialize_with_copy) = family.functions();
    ValueWitnessTable {
        destroy,
        initialize_with_copy,
        size: layout.size,
        flags: layout.flags().bits(),
        stride: layout.stride(),
    }
}

const fn const_table(destroy: DestroyFn, copy: CopyFn, layout: TypeLayout) -> ValueWitnessTable {
    ValueWitnessTable {
        destroy,
        initialize_with_copy: copy,
        size: layout.size,
        flags: layout.flags().bits(),
        stride: layout.stride(),
    }
}

const fn reference_layout() -> TypeLayout {
    TypeLayout {
        size: POINTER_SIZE,
        align_mask: POINTER_ALIGN_MASK,
        pod: false,
        extra_inhabitants: true,
    }
}

// === Witness functions ===

unsafe extern "C" fn pod_destroy(_value: *mut u8, _metadata: *const Metadata) {}

unsafe extern "C" fn pod_copy(dest: *mut u8, src: *const u8, metadata: *const Metadata) -> *mut u8 {
    let size = MetadataRef::new(metadata).map_or(0, MetadataRef::size);
    std::ptr::copy_nonoverlapping(src, dest, size);
    dest
}

const fn kind_from_index(index: u8) -> ReferenceCounting {
    ReferenceCounting::ALL[index as usize]
}

unsafe extern "C" fn reference_destroy<const KIND: u8>(value: *mut u8, _metadata: *const Metadata) {
    release_fn(kind_from_index(KIND))(value.cast::<*mut HeapObject>().read());
}

unsafe extern "C" fn reference_copy<const KIND: u8>(
    dest: *mut u8,
    src: *const u8,
    _metadata: *const Metadata,
) -> *mut u8 {
    let object = src.cast::<*mut HeapObject>().read();
    retain_fn(kind_from_index(KIND))(object);
    dest.cast::<*mut HeapObject>().write(object);
    dest
}

unsafe extern "C" fn thick_function_destroy(value: *mut u8, _metadata: *const Metadata) {
    tymeta_release(value.add(POINTER_SIZE).cast::<*mut HeapObject>().read());
}

unsafe extern "C" fn thick_function_copy(
    dest: *mut u8,
    src: *const u8,
    _metadata: *const Metadata,
) -> *mut u8 {
    std::ptr::copy_nonoverlapping(src, dest, 2 * POINTER_SIZE);
    tymeta_retain(src.add(POINTER_SIZE).cast::<*mut HeapObject>().read());
    dest
}

/// `(field metadata, byte offset)` for each stored property.
fn struct_fields(metadata: MetadataRef) -> impl Iterator<Item = (MetadataRef, usize)> {
    field_type_vector(metadata)
        .iter()
        .zip(metadata.field_offsets())
        .filter_map(|(ty, &offset)| Some((MetadataRef::from_addr(ty.type_address())?, offset)))
}

unsafe extern "C" fn struct_destroy(value: *mut u8, metadata: *const Metadata) {
    let Some(metadata) = MetadataRef::new(metadata) else {
        return;
    };
    for (field, offset) in struct_fields(metadata) {
        if !field.is_pod() {
            field.destroy(value.add(offset));
        }
    }
}

unsafe extern "C" fn struct_copy(dest: *mut u8, src: *const u8, metadata: *const Metadata) -> *mut u8 {
    let Some(metadata) = MetadataRef::new(metadata) else {
        return dest;
    };
    for (field, offset) in struct_fields(metadata) {
        field.initialize_with_copy(dest.add(offset), src.add(offset));
    }
    dest
}

/// The case an enum value currently holds.
unsafe fn enum_case(value: *const u8, metadata: MetadataRef, payload_size: usize) -> usize {
    let Some(desc) = metadata.descriptor() else {
        return 0;
    };
    let num_cases = desc.case_counts().payload_cases() as usize + desc.num_empty_cases();
    let tag = value.add(payload_size);
    match enum_tag_size(num_cases) {
        0 => 0,
        1 => tag.read() as usize,
        _ => tag.cast::<u32>().read_unaligned() as usize,
    }
}

/// Payload type of the case `value` holds, if it is a non-POD payload case.
/// Indirect payloads report `None` and are handled as native boxes.
unsafe fn enum_payload(value: *const u8, metadata: MetadataRef) -> EnumPayload {
    let payload_size = enum_payload_size(metadata);
    let case = enum_case(value, metadata, payload_size);
    match field_type_vector(metadata).get(case) {
        None => EnumPayload::None,
        Some(ty) if ty.is_indirect() => EnumPayload::Boxed,
        Some(ty) => match MetadataRef::from_addr(ty.type_address()) {
            Some(payload) if !payload.is_pod() => EnumPayload::Value(payload),
            _ => EnumPayload::None,
        },
    }
}

enum EnumPayload {
    None,
    Boxed,
    Value(MetadataRef),
}

unsafe extern "C" fn enum_destroy(value: *mut u8, metadata: *const Metadata) {
    let Some(metadata) = MetadataRef::new(metadata) else {
        return;
    };
    match enum_payload(value, metadata) {
        EnumPayload::None => {}
        EnumPayload::Boxed => tymeta_release(value.cast::<*mut HeapObject>().read()),
        EnumPayload::Value(payload) => payload.destroy(value),
    }
}

unsafe extern "C" fn enum_copy(dest: *mut u8, src: *const u8, metadata: *const Metadata) -> *mut u8 {
    let Some(metadata) = MetadataRef::new(metadata) else {
        return dest;
    };
    std::ptr::copy_nonoverlapping(src, dest, metadata.size());
    match enum_payload(src, metadata) {
        EnumPayload::None => {}
        EnumPayload::Boxed => tymeta_retain(src.cast::<*mut HeapObject>().read()),
        EnumPayload::Value(payload) => {
            payload.initialize_with_copy(dest, src);
        }
    }
    dest
}

fn tuple_elements(metadata: MetadataRef) -> impl Iterator<Item = (MetadataRef, usize)> {
    let count = metadata.word(offsets::TUPLE_NUM_ELEMENTS);
    let stride = 2 * POINTER_SIZE as isize;
    (0..count as isize).filter_map(move |i| {
        let at = offsets::TUPLE_ELEMENTS + i * stride;
        let element = MetadataRef::from_addr(metadata.word(at))?;
        Some((element, metadata.word(at + POINTER_SIZE as isize)))
    })
}

unsafe extern "C" fn tuple_destroy(value: *mut u8, metadata: *const Metadata) {
    let Some(metadata) = MetadataRef::new(metadata) else {
        return;
    };
    for (element, offset) in tuple_elements(metadata) {
        if !element.is_pod() {
            element.destroy(value.add(offset));
        }
    }
}

unsafe extern "C" fn tuple_copy(dest: *mut u8, src: *const u8, metadata: *const Metadata) -> *mut u8 {
    let Some(metadata) = MetadataRef::new(metadata) else {
        return dest;
    };
    for (element, offset) in tuple_elements(metadata) {
        element.initialize_with_copy(dest.add(offset), src.add(offset));
    }
    dest
}

fn existential_witness_count(metadata: *const Metadata) -> usize {
    MetadataRef::new(metadata).map_or(0, |m| {
        ExistentialTypeFlags::from_bits(m.word(offsets::EXISTENTIAL_FLAGS)).num_witness_tables()
    })
}

unsafe extern "C" fn existential_destroy(value: *mut u8, _metadata: *const Metadata) {
    tymeta_release(value.cast::<*mut HeapObject>().read());
}

unsafe extern "C" fn existential_copy(
    dest: *mut u8,
    src: *const u8,
    metadata: *const Metadata,
) -> *mut u8 {
    let words = 2 + existential_witness_count(metadata);
    std::ptr::copy_nonoverlapping(src, dest, words * POINTER_SIZE);
    tymeta_retain(src.cast::<*mut HeapObject>().read());
    dest
}

unsafe extern "C" fn class_existential_destroy(value: *mut u8, _metadata: *const Metadata) {
    release_fn(ReferenceCounting::Unknown)(value.cast::<*mut HeapObject>().read());
}

unsafe extern "C" fn class_existential_copy(
    dest: *mut u8,
    src: *const u8,
    metadata: *const Metadata,
) -> *mut u8 {
    let words = 1 + existential_witness_count(metadata);
    std::ptr::copy_nonoverlapping(src, dest, words * POINTER_SIZE);
    retain_fn(ReferenceCounting::Unknown)(src.cast::<*mut HeapObject>().read());
    dest
}

// === Builtin tables ===

pub static POD_WITNESSES_0: ValueWitnessTable =
    const_table(pod_destroy, pod_copy, TypeLayout::pod(0, 0));
pub static POD_WITNESSES_1: ValueWitnessTable =
    const_table(pod_destroy, pod_copy, TypeLayout::pod(1, 0));
pub static POD_WITNESSES_2: ValueWitnessTable =
    const_table(pod_destroy, pod_copy, TypeLayout::pod(2, 1));
pub static POD_WITNESSES_4: ValueWitnessTable =
    const_table(pod_destroy, pod_copy, TypeLayout::pod(4, 3));
pub static POD_WITNESSES_8: ValueWitnessTable =
    const_table(pod_destroy, pod_copy, TypeLayout::pod(8, 7));
pub static POD_WITNESSES_16: ValueWitnessTable =
    const_table(pod_destroy, pod_copy, TypeLayout::pod(16, 15));
/// Pointer-sized plain data: words and raw pointers.
pub static POD_WITNESSES_WORD: ValueWitnessTable = const_table(
    pod_destroy,
    pod_copy,
    TypeLayout::pod(POINTER_SIZE, POINTER_ALIGN_MASK),
);

pub static NATIVE_OBJECT_WITNESSES: ValueWitnessTable =
    const_table(reference_destroy::<0>, reference_copy::<0>, reference_layout());
pub static UNKNOWN_OBJECT_WITNESSES: ValueWitnessTable =
    const_table(reference_destroy::<2>, reference_copy::<2>, reference_layout());
pub static BRIDGE_OBJECT_WITNESSES: ValueWitnessTable = const_table(
    reference_destroy::<3>,
    reference_copy::<3>,
    TypeLayout {
        extra_inhabitants: false,
        ..reference_layout()
    },
);
pub static BLOCK_WITNESSES: ValueWitnessTable =
    const_table(reference_destroy::<4>, reference_copy::<4>, reference_layout());
pub static THICK_FUNCTION_WITNESSES: ValueWitnessTable = const_table(
    thick_function_destroy,
    thick_function_copy,
    TypeLayout {
        size: 2 * POINTER_SIZE,
        align_mask: POINTER_ALIGN_MASK,
        pod: false,
        extra_inhabitants: true,
    },
);

/// The shared POD table for `size`, if there is one.
pub fn pod_witnesses(size: usize, align_mask: usize) -> Option<&'static ValueWitnessTable> {
    let table = match size {
        0 => &POD_WITNESSES_0,
        1 => &POD_WITNESSES_1,
        2 => &POD_WITNESSES_2,
        4 => &POD_WITNESSES_4,
        8 => &POD_WITNESSES_8,
        16 => &POD_WITNESSES_16,
        _ => return None,
    };
    (table.align_mask() == align_mask).then_some(table)
}

/// Shared table for a single reference of `kind`.
pub fn reference_witnesses(kind: ReferenceCounting) -> &'static ValueWitnessTable {
    match kind {
        ReferenceCounting::Bridge => &BRIDGE_OBJECT_WITNESSES,
        ReferenceCounting::Block => &BLOCK_WITNESSES,
        ReferenceCounting::Native | ReferenceCounting::Error => &NATIVE_OBJECT_WITNESSES,
        ReferenceCounting::LegacyObject | ReferenceCounting::Unknown => &UNKNOWN_OBJECT_WITNESSES,
    }
}

// === Builtin metadata ===

/// `[value witnesses][kind]` record for builtin types.
#[repr(C)]
pub struct FullOpaqueMetadata {
    pub value_witnesses: &'static ValueWitnessTable,
    pub kind: usize,
}

impl FullOpaqueMetadata {
    const fn new(value_witnesses: &'static ValueWitnessTable) -> Self {
        Self {
            value_witnesses,
            kind: MetadataKind::Opaque as usize,
        }
    }

    pub fn metadata(&'static self) -> MetadataRef {
        MetadataRef::from_static(self.address_point())
    }

    fn address_point(&'static self) -> &'static Metadata {
        // SAFETY: `kind` is the first word of a `Metadata` view
        unsafe { &*std::ptr::addr_of!(self.kind).cast::<Metadata>() }
    }
}

pub static INT8_METADATA: FullOpaqueMetadata = FullOpaqueMetadata::new(&POD_WITNESSES_1);
pub static INT16_METADATA: FullOpaqueMetadata = FullOpaqueMetadata::new(&POD_WITNESSES_2);
pub static INT32_METADATA: FullOpaqueMetadata = FullOpaqueMetadata::new(&POD_WITNESSES_4);
pub static INT64_METADATA: FullOpaqueMetadata = FullOpaqueMetadata::new(&POD_WITNESSES_8);
pub static FLOAT32_METADATA: FullOpaqueMetadata = FullOpaqueMetadata::new(&POD_WITNESSES_4);
pub static FLOAT64_METADATA: FullOpaqueMetadata = FullOpaqueMetadata::new(&POD_WITNESSES_8);
pub static WORD_METADATA: FullOpaqueMetadata = FullOpaqueMetadata::new(&POD_WITNESSES_WORD);
pub static RAW_POINTER_METADATA: FullOpaqueMetadata = FullOpaqueMetadata::new(&POD_WITNESSES_WORD);
pub static NATIVE_OBJECT_METADATA: FullOpaqueMetadata =
    FullOpaqueMetadata::new(&NATIVE_OBJECT_WITNESSES);
pub static UNKNOWN_OBJECT_METADATA: FullOpaqueMetadata =
    FullOpaqueMetadata::new(&UNKNOWN_OBJECT_WITNESSES);
pub static BRIDGE_OBJECT_METADATA: FullOpaqueMetadata =
    FullOpaqueMetadata::new(&BRIDGE_OBJECT_WITNESSES);

/// Runtime metadata for a builtin type.
pub fn builtin_metadata(ty: BuiltinType) -> MetadataRef {
    match ty {
        BuiltinType::Int8 => &INT8_METADATA,
        BuiltinType::Int16 => &INT16_METADATA,
        BuiltinType::Int32 => &INT32_METADATA,
        BuiltinType::Int64 => &INT64_METADATA,
        BuiltinType::Float32 => &FLOAT32_METADATA,
        BuiltinType::Float64 => &FLOAT64_METADATA,
        BuiltinType::Word => &WORD_METADATA,
        BuiltinType::RawPointer => &RAW_POINTER_METADATA,
        BuiltinType::NativeObject => &NATIVE_OBJECT_METADATA,
        BuiltinType::UnknownObject => &UNKNOWN_OBJECT_METADATA,
        BuiltinType::BridgeObject => &BRIDGE_OBJECT_METADATA,
    }
    .metadata()
}

/// `[value witnesses][kind][element count][labels]` with no elements.
#[repr(C)]
pub struct EmptyTupleMetadata {
    pub value_witnesses: &'static ValueWitnessTable,
    pub kind: usize,
    pub num_elements: usize,
    pub labels: usize,
}

pub static EMPTY_TUPLE_METADATA: EmptyTupleMetadata = EmptyTupleMetadata {
    value_witnesses: &POD_WITNESSES_0,
    kind: MetadataKind::Tuple as usize,
    num_elements: 0,
    labels: 0,
};

/// The canonical empty tuple.
pub fn empty_tuple_metadata() -> MetadataRef {
    // SAFETY: `kind` starts the tuple record's address point
    let address_point =
        unsafe { &*std::ptr::addr_of!(EMPTY_TUPLE_METADATA.kind).cast::<Metadata>() };
    MetadataRef::from_static(address_point)
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    reason = "tests use unwrap to panic on unexpected state"
)]
