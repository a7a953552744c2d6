//! Runtime field layout.
//!
//! The dynamic pass here is shared by everything that lays out storage once
//! generic arguments are bound: heap objects whose elements have generic
//! sizes, the universal struct, enum and class initializers, and boxes.

use smallvec::SmallVec;
use tymeta_abi::{enum_tag_size, offsets, round_up, FieldType, POINTER_ALIGN_MASK, POINTER_SIZE};

use crate::field_types::field_type_vector;
use crate::metadata::{Metadata, MetadataRef, ValueWitnessTable};
use crate::witness::{table, TypeLayout, WitnessFamily};

/// Size and alignment of one element.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub struct ElementLayout {
    pub size: usize,
    pub align_mask: usize,
}

impl ElementLayout {
    pub const fn new(size: usize, align_mask: usize) -> Self {
        Self { size, align_mask }
    }

    pub fn of(metadata: MetadataRef) -> Self {
        Self::new(metadata.size(), metadata.align_mask())
    }

    /// Storage of an indirect enum payload or any single reference.
    pub const fn pointer() -> Self {
        Self::new(POINTER_SIZE, POINTER_ALIGN_MASK)
    }
}

/// Result of a dynamic pass.
#[derive(Clone, Eq, PartialEq, Debug)]
pub struct DynamicLayout {
    pub offsets: SmallVec<[usize; 8]>,
    /// End of the last element.
    pub size: usize,
    /// OR of the prefix alignment and every element's alignment.
    pub align_mask: usize,
}

impl DynamicLayout {
    pub fn stride(&self) -> usize {
        round_up(self.size.max(1), self.align_mask)
    }
}

/// Lay out `elements` after a fixed prefix ending at `prefix_end`.
///
/// The first element starts no earlier than the prefix end rounded up to the
/// prefix alignment. Each element is then placed at the running offset
/// rounded up to its own alignment.
pub fn dynamic_pass(
    prefix_end: usize,
    prefix_align_mask: usize,
    elements: impl IntoIterator<Item = ElementLayout>,
) -> DynamicLayout {
    let mut offset = round_up(prefix_end, prefix_align_mask);
    let mut align_mask = prefix_align_mask;
    let mut offsets = SmallVec::new();
    for element in elements {
        offset = round_up(offset, element.align_mask);
        offsets.push(offset);
        offset += element.size;
        align_mask |= element.align_mask;
    }
    DynamicLayout {
        offsets,
        size: offset,
        align_mask,
    }
}

/// Size and alignment of an enum value: the payload area, then a tag when
/// there is more than one case.
pub fn enum_layout(payload: ElementLayout, num_cases: usize) -> ElementLayout {
    ElementLayout::new(payload.size + enum_tag_size(num_cases), payload.align_mask)
}

/// Largest payload among an enum's payload cases.
pub fn max_payload(payloads: impl IntoIterator<Item = ElementLayout>) -> ElementLayout {
    payloads
        .into_iter()
        .fold(ElementLayout::new(0, 0), |acc, p| {
            ElementLayout::new(acc.size.max(p.size), acc.align_mask | p.align_mask)
        })
}

fn payload_layout(ty: FieldType) -> Option<(ElementLayout, bool)> {
    if ty.is_indirect() {
        return Some((ElementLayout::pointer(), false));
    }
    let payload = MetadataRef::from_addr(ty.type_address())?;
    Some((ElementLayout::of(payload), payload.is_pod()))
}

/// Payload area size of an enum record: the stored word for generic
/// enums, otherwise computed from the case types.
pub fn enum_payload_size(metadata: MetadataRef) -> usize {
    let Some(desc) = metadata.descriptor() else {
        return 0;
    };
    let offset_words = desc.case_counts().payload_size_offset_words();
    if offset_words != 0 {
        return metadata.word(offset_words as isize * POINTER_SIZE as isize);
    }
    max_payload(
        field_type_vector(metadata)
            .iter()
            .filter_map(|&ty| payload_layout(ty).map(|(l, _)| l)),
    )
    .size
}

/// Overwrite the record's value-witness table.
///
/// # Safety
/// The record's table pointer must refer to its own writable region and the
/// record must not be published yet.
unsafe fn write_witnesses(metadata: MetadataRef, witnesses: ValueWitnessTable) {
    let vwt = metadata.word(offsets::VALUE_WITNESSES) as *mut ValueWitnessTable;
    if !vwt.is_null() {
        vwt.write(witnesses);
    }
}

/// Lay out a struct from its field types, filling `field_offsets` and the
/// record's dependent value-witness table.
#[no_mangle]
pub extern "C" fn tymeta_init_struct_metadata_universal(
    metadata: *const Metadata,
    num_fields: usize,
    field_types: *const *const Metadata,
    field_offsets: *mut usize,
) {
    let Some(metadata) = MetadataRef::new(metadata) else {
        return;
    };
    let fields: SmallVec<[MetadataRef; 8]> = (0..num_fields)
        // SAFETY: field_types holds num_fields entries
        .filter_map(|i| MetadataRef::new(unsafe { field_types.add(i).read() }))
        .collect();
    if fields.len() != num_fields {
        tracing::error!(num_fields, "struct layout given a null field type");
        return;
    }
    let layout = dynamic_pass(0, 0, fields.iter().map(|&f| ElementLayout::of(f)));
    if !field_offsets.is_null() {
        for (i, &offset) in layout.offsets.iter().enumerate() {
            // SAFETY: the offset vector holds num_fields entries
            unsafe { field_offsets.add(i).write(offset) };
        }
    }
    let type_layout = TypeLayout {
        size: layout.size,
        align_mask: layout.align_mask,
        pod: fields.iter().all(|f| f.is_pod()),
        extra_inhabitants: false,
    };
    tracing::trace!(size = layout.size, align_mask = layout.align_mask, "struct layout");
    // SAFETY: called while the instance is being initialized
    unsafe { write_witnesses(metadata, table(WitnessFamily::Struct, type_layout)) };
}

/// Size an enum from its payload case types, storing the payload size and
/// filling the dependent value-witness table.
#[no_mangle]
pub extern "C" fn tymeta_init_enum_metadata_universal(
    metadata: *const Metadata,
    num_payload_cases: usize,
    payload_types: *const FieldType,
) {
    let Some(metadata) = MetadataRef::new(metadata) else {
        return;
    };
    let Some(desc) = metadata.descriptor() else {
        return;
    };
    let mut pod = true;
    let mut payloads: SmallVec<[ElementLayout; 8]> = SmallVec::new();
    for i in 0..num_payload_cases {
        // SAFETY: payload_types holds num_payload_cases entries
        let ty = unsafe { payload_types.add(i).read() };
        let Some((layout, is_pod)) = payload_layout(ty) else {
            tracing::error!(case = i, "enum layout given a null payload type");
            return;
        };
        pod &= is_pod && !ty.is_indirect();
        payloads.push(layout);
    }
    let payload = max_payload(payloads);
    let offset_words = desc.case_counts().payload_size_offset_words();
    if offset_words != 0 {
        // SAFETY: the descriptor names a writable word in this unpublished record
        unsafe {
            crate::metadata::write_word(
                metadata.as_ptr().cast_mut().cast(),
                offset_words as isize * POINTER_SIZE as isize,
                payload.size,
            );
        }
    }
    let value = enum_layout(payload, num_payload_cases + desc.num_empty_cases());
    let type_layout = TypeLayout {
        size: value.size,
        align_mask: value.align_mask,
        pod,
        extra_inhabitants: false,
    };
    // SAFETY: called while the instance is being initialized
    unsafe { write_witnesses(metadata, table(WitnessFamily::Enum, type_layout)) };
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    reason = "tests use unwrap to panic on unexpected state"
)]
