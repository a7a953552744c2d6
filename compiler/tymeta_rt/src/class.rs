//! Class records at runtime: universal layout of dependent stored
//! properties, superclass linking, legacy registration and the
//! metadata-driven instance destroyer.

use std::sync::LazyLock;

use dashmap::DashSet;
use smallvec::SmallVec;
use tymeta_abi::{offsets, POINTER_SIZE};

use crate::field_types::field_type_vector;
use crate::heap::{tymeta_dealloc_object, HeapObject, HEADER_ALIGN_MASK, HEADER_SIZE};
use crate::layout::{dynamic_pass, ElementLayout};
use crate::metadata::{write_u16, write_u32, write_word, Metadata, MetadataRef};

static LEGACY_CLASSES: LazyLock<DashSet<usize>> = LazyLock::new(DashSet::new);

/// Instance size and alignment mask recorded in a class record.
pub fn instance_layout(class: MetadataRef) -> ElementLayout {
    ElementLayout::new(
        class.u32_at(offsets::CLASS_INSTANCE_SIZE) as usize,
        class.u16_at(offsets::CLASS_INSTANCE_ALIGN_MASK) as usize,
    )
}

/// Where a class's own stored properties may start: after its superclass's
/// instance, or after the object header for a root class.
pub fn instance_start(class: MetadataRef) -> ElementLayout {
    class.superclass().map_or(
        ElementLayout::new(HEADER_SIZE, HEADER_ALIGN_MASK),
        instance_layout,
    )
}

/// Lay out a class's own stored properties from `(size, align mask)` word
/// pairs, after its superclass's instance. Fills `field_offsets` and the
/// record's instance size and alignment.
#[no_mangle]
pub extern "C" fn tymeta_init_class_metadata_universal(
    metadata: *const Metadata,
    num_fields: usize,
    field_layouts: *const usize,
    field_offsets: *mut usize,
) {
    let Some(class) = MetadataRef::new(metadata) else {
        return;
    };
    let fields: SmallVec<[ElementLayout; 8]> = (0..num_fields)
        .map(|i| {
            // SAFETY: field_layouts holds num_fields (size, align mask) pairs
            unsafe {
                ElementLayout::new(
                    field_layouts.add(2 * i).read(),
                    field_layouts.add(2 * i + 1).read(),
                )
            }
        })
        .collect();
    let start = instance_start(class);
    let layout = dynamic_pass(start.size, start.align_mask, fields);
    if !field_offsets.is_null() {
        for (i, &offset) in layout.offsets.iter().enumerate() {
            // SAFETY: the offset vector holds num_fields entries
            unsafe { field_offsets.add(i).write(offset) };
        }
    }
    let base = class.as_ptr().cast_mut().cast::<u8>();
    // SAFETY: the record is being initialized and not yet published
    unsafe {
        write_u32(base, offsets::CLASS_INSTANCE_SIZE, layout.size as u32);
        write_u16(base, offsets::CLASS_INSTANCE_ALIGN_MASK, layout.align_mask as u16);
    }
    tracing::trace!(size = layout.size, align_mask = layout.align_mask, "class layout");
}

/// Lay out a class's own stored properties from its field-type vector.
/// Indirect fields take a pointer's layout.
pub fn init_class_layout(class: MetadataRef) {
    let mut layouts: SmallVec<[usize; 16]> = SmallVec::new();
    for ty in field_type_vector(class) {
        let layout = if ty.is_indirect() {
            ElementLayout::pointer()
        } else {
            let Some(field) = MetadataRef::from_addr(ty.type_address()) else {
                tracing::error!("class instance has an unresolved field type");
                return;
            };
            ElementLayout::of(field)
        };
        layouts.extend([layout.size, layout.align_mask]);
    }
    let offsets = class
        .descriptor()
        .and_then(|d| d.field_offset_vector())
        .map_or(std::ptr::null_mut(), |(_, words)| {
            (class.addr() + words * POINTER_SIZE) as *mut usize
        });
    tymeta_init_class_metadata_universal(
        class.as_ptr(),
        layouts.len() / 2,
        layouts.as_ptr(),
        offsets,
    );
}

/// Link a class whose ancestry is generic to its instantiated superclass,
/// copying the superclass's member sections into the subclass record.
#[no_mangle]
pub extern "C" fn tymeta_initialize_superclass(
    metadata: *const Metadata,
    superclass: *const Metadata,
) {
    let (Some(class), Some(superclass)) = (MetadataRef::new(metadata), MetadataRef::new(superclass))
    else {
        return;
    };
    let base = class.as_ptr().cast_mut().cast::<u8>();
    let end = superclass.u32_at(offsets::CLASS_SIZE) as isize
        - superclass.u32_at(offsets::CLASS_ADDRESS_POINT) as isize;
    let mut at = offsets::CLASS_MEMBERS;
    while at < end {
        // SAFETY: the subclass record extends its superclass's layout
        unsafe { write_word(base, at, superclass.word(at)) };
        at += POINTER_SIZE as isize;
    }
    // SAFETY: as above
    unsafe { write_word(base, offsets::CLASS_SUPERCLASS, superclass.addr()) };
}

/// Hand a class record to the legacy object runtime.
#[no_mangle]
pub extern "C" fn tymeta_register_legacy_class(metadata: *const Metadata) -> *const Metadata {
    if !metadata.is_null() {
        LEGACY_CLASSES.insert(metadata as usize);
        tracing::debug!(class = ?metadata, "registered legacy class");
    }
    metadata
}

pub fn is_legacy_registered(class: MetadataRef) -> bool {
    LEGACY_CLASSES.contains(&class.addr())
}

/// Destroyer for class instances: destroys every stored property, most
/// derived class first, then gives up the object's memory.
#[no_mangle]
pub extern "C" fn tymeta_destroy_class_instance(object: *mut HeapObject) {
    if object.is_null() {
        return;
    }
    // SAFETY: the destroyer runs on a live object with a class record
    let Some(class) = MetadataRef::new(unsafe { (*object).metadata }) else {
        return;
    };
    let mut current = Some(class);
    while let Some(c) = current {
        for (ty, &offset) in field_type_vector(c).iter().zip(c.field_offsets()) {
            let Some(field) = MetadataRef::from_addr(ty.type_address()) else {
                continue;
            };
            if !field.is_pod() {
                // SAFETY: the field is initialized storage inside the object
                unsafe { field.destroy(object.cast::<u8>().add(offset)) };
            }
        }
        current = c.superclass();
    }
    let layout = instance_layout(class);
    tymeta_dealloc_object(object, layout.size, layout.align_mask);
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    reason = "tests use unwrap to panic on unexpected state"
)]
