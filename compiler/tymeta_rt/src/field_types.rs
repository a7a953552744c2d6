//! Field-type vectors.
//!
//! Each nominal type has an accessor that produces an array of field (or
//! payload case) metadata, one [`FieldType`] word per entry. The array is
//! built on first use and published into a slot: a global for non-generic
//! types, a word inside the instance record for generic ones.
//!
//! Publication is a single compare-and-swap from null. The array owns an
//! allocation, so a thread that loses the race frees its own array and
//! returns the winner's; the winner's array is never freed.

use std::sync::atomic::{AtomicPtr, Ordering};

use tymeta_abi::{FieldType, POINTER_ALIGN_MASK, POINTER_SIZE};

use crate::alloc::{tymeta_alloc, tymeta_free};
use crate::metadata::MetadataRef;
use crate::source::MetadataSource;

/// Returned for types with no fields; never freed and never published.
static EMPTY: [FieldType; 1] = [FieldType::new(0)];

/// Where a type's vector is published.
#[derive(Debug)]
pub enum FieldTypeSlot {
    Global(AtomicPtr<FieldType>),
    /// A word at this byte offset from each instance's address point.
    InMetadata { offset: isize },
}

impl FieldTypeSlot {
    pub const fn global() -> Self {
        Self::Global(AtomicPtr::new(std::ptr::null_mut()))
    }

    fn atomic(&self, metadata: MetadataRef) -> &AtomicPtr<FieldType> {
        match self {
            Self::Global(slot) => slot,
            Self::InMetadata { offset } => {
                let word = (metadata.addr() as isize + offset) as *mut *mut FieldType;
                // SAFETY: the slot is a word-aligned, zero-initialized word of
                // the instance, only ever accessed atomically
                unsafe { AtomicPtr::from_ptr(word) }
            }
        }
    }
}

/// One field's type.
#[derive(Debug)]
pub struct FieldTypeSource {
    pub source: MetadataSource,
    /// Stored out of line (indirect enum payloads).
    pub indirect: bool,
}

/// Outcome of publishing a built vector.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum Publish {
    /// This vector is now the published one.
    Won(*const FieldType),
    /// Another thread published first; this is the winner's vector. The
    /// losing vector has been freed.
    Lost(*const FieldType),
}

impl Publish {
    pub fn vector(self) -> *const FieldType {
        match self {
            Self::Won(v) | Self::Lost(v) => v,
        }
    }
}

/// Builds and publishes one type's field-type vector.
#[derive(Debug)]
pub struct FieldTypeAccessor {
    slot: FieldTypeSlot,
    fields: Vec<FieldTypeSource>,
}

impl FieldTypeAccessor {
    pub fn new(slot: FieldTypeSlot, fields: Vec<FieldTypeSource>) -> Self {
        Self { slot, fields }
    }

    pub fn leak(self) -> &'static Self {
        Box::leak(Box::new(self))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    fn byte_size(&self) -> usize {
        self.fields.len() * POINTER_SIZE
    }

    /// The published vector for `metadata`, or null if none yet.
    pub fn cached(&self, metadata: MetadataRef) -> *const FieldType {
        if self.fields.is_empty() {
            return EMPTY.as_ptr();
        }
        self.slot.atomic(metadata).load(Ordering::Acquire)
    }

    /// Allocate and fill a vector, resolving generic arguments from
    /// `metadata`. Returns null if a field type cannot be resolved.
    pub fn build(&self, metadata: MetadataRef) -> *mut FieldType {
        let vector = tymeta_alloc(self.byte_size(), POINTER_ALIGN_MASK).cast::<FieldType>();
        if vector.is_null() {
            return vector;
        }
        let args = metadata.generic_arguments();
        for (i, field) in self.fields.iter().enumerate() {
            let Some(ty) = field.source.resolve(args) else {
                tracing::error!(field = i, "unresolvable field type");
                tymeta_free(vector.cast(), self.byte_size(), POINTER_ALIGN_MASK);
                return std::ptr::null_mut();
            };
            let entry = FieldType::new(ty.addr()).with_indirect(field.indirect);
            // SAFETY: the vector holds one word per field
            unsafe { vector.add(i).write(entry) };
        }
        vector
    }

    /// Try to install `vector` as the published one.
    pub fn publish(&self, metadata: MetadataRef, vector: *mut FieldType) -> Publish {
        match self.slot.atomic(metadata).compare_exchange(
            std::ptr::null_mut(),
            vector,
            Ordering::AcqRel,
            Ordering::Acquire,
        ) {
            Ok(_) => Publish::Won(vector),
            Err(winner) => {
                tracing::trace!("field-type vector lost race");
                tymeta_free(vector.cast(), self.byte_size(), POINTER_ALIGN_MASK);
                Publish::Lost(winner)
            }
        }
    }

    /// The published vector, building and publishing it on first use.
    pub fn get(&self, metadata: MetadataRef) -> *const FieldType {
        let cached = self.cached(metadata);
        if !cached.is_null() {
            return cached;
        }
        let built = self.build(metadata);
        if built.is_null() {
            return built;
        }
        self.publish(metadata, built).vector()
    }
}

/// The field-type vector of a struct, enum or class record, as a slice.
pub fn field_type_vector(metadata: MetadataRef) -> &'static [FieldType] {
    let Some(desc) = metadata.descriptor() else {
        return &[];
    };
    let Some(accessor) = desc.field_type_accessor() else {
        return &[];
    };
    let vector = accessor.get(metadata);
    if vector.is_null() || accessor.is_empty() {
        return &[];
    }
    // SAFETY: published vectors hold one entry per field and are never freed
    unsafe { std::slice::from_raw_parts(vector, accessor.len()) }
}

/// Free an unpublished instance's vector, if one was built into it.
pub(crate) fn release_instance_vector(metadata: MetadataRef, slot_offset: isize) {
    let Some(accessor) = metadata.descriptor().and_then(|d| d.field_type_accessor()) else {
        return;
    };
    let slot = FieldTypeSlot::InMetadata {
        offset: slot_offset,
    };
    let vector = slot.atomic(metadata).swap(std::ptr::null_mut(), Ordering::AcqRel);
    if !vector.is_null() {
        tymeta_free(vector.cast(), accessor.byte_size(), POINTER_ALIGN_MASK);
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    reason = "tests use unwrap to panic on unexpected state"
)]
mod tests;
