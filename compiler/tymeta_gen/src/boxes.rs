//! Box types, dispatched by the shape of the boxed value.
//!
//! POD and single-reference boxes share one runtime record per shape key.
//! Boxes for other fixed values get a record of their own per value type;
//! boxes for non-fixed values are laid out by the runtime from metadata.

use std::ptr::NonNull;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use rustc_hash::FxBuildHasher;
use tymeta_abi::ReferenceCounting;
use tymeta_rt::boxes::{tymeta_alloc_box, tymeta_dealloc_box, tymeta_project_box, BoxMetadata, BoxPair};
use tymeta_rt::heap::HeapObject;
use tymeta_rt::MetadataRef;

use crate::layout::{HeapElement, HeapLayout, HeapObjectType};
use crate::type_info::{FixedLayout, TypeInfo};

/// What a box has to store.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum BoxShape {
    Empty,
    Pod { stride: usize, align_mask: usize },
    SingleRefcounted(ReferenceCounting),
    NonFixed,
    Custom,
}

impl BoxShape {
    pub fn of(info: TypeInfo) -> Self {
        match info {
            TypeInfo::NonFixed => Self::NonFixed,
            TypeInfo::Fixed(layout) if layout.is_empty() => Self::Empty,
            TypeInfo::Fixed(layout) if layout.pod => Self::Pod {
                stride: layout.stride(),
                align_mask: layout.align_mask,
            },
            TypeInfo::Fixed(FixedLayout {
                reference: Some(kind),
                ..
            }) => Self::SingleRefcounted(kind),
            TypeInfo::Fixed(_) => Self::Custom,
        }
    }
}

/// A way to allocate, project and free boxes of one value type.
#[derive(Copy, Clone)]
pub enum BoxType {
    /// No allocation; every box is the null object.
    Empty,
    Fixed {
        shape: BoxShape,
        record: &'static BoxMetadata,
    },
    /// Laid out by the runtime from the value's metadata.
    NonFixed(MetadataRef),
}

/// Storage address handed out for empty values.
fn empty_storage() -> *mut u8 {
    NonNull::<usize>::dangling().as_ptr().cast()
}

impl BoxType {
    pub fn shape(&self) -> BoxShape {
        match self {
            Self::Empty => BoxShape::Empty,
            Self::Fixed { shape, .. } => *shape,
            Self::NonFixed(_) => BoxShape::NonFixed,
        }
    }

    /// A box with uninitialized storage.
    pub fn allocate(&self) -> BoxPair {
        match self {
            Self::Empty => BoxPair {
                object: std::ptr::null_mut(),
                value: empty_storage(),
            },
            Self::Fixed { record, .. } => record.allocate(),
            Self::NonFixed(metadata) => tymeta_alloc_box(metadata.as_ptr()),
        }
    }

    pub fn project(&self, object: *mut HeapObject) -> *mut u8 {
        match self {
            Self::Empty => empty_storage(),
            Self::Fixed { record, .. } => tymeta_project_box(object, record.metadata().as_ptr()),
            Self::NonFixed(metadata) => tymeta_project_box(object, metadata.as_ptr()),
        }
    }

    /// Free a box whose value was never initialized or was moved out.
    pub fn deallocate(&self, object: *mut HeapObject) {
        match self {
            Self::Empty => {}
            Self::Fixed { record, .. } => tymeta_dealloc_box(object, record.metadata().as_ptr()),
            Self::NonFixed(metadata) => tymeta_dealloc_box(object, metadata.as_ptr()),
        }
    }
}

type RecordMap<K> = DashMap<K, &'static BoxMetadata, FxBuildHasher>;

/// Process-wide box records, created on first use of each shape key.
#[derive(Default)]
pub struct BoxRegistry {
    pod: RecordMap<(usize, usize)>,
    refcounted: RecordMap<ReferenceCounting>,
    custom: RecordMap<usize>,
}

fn single_element_record(element: HeapElement) -> &'static BoxMetadata {
    HeapObjectType::new(HeapLayout::new(vec![element])).record()
}

fn shared<K>(map: &RecordMap<K>, key: K, build: impl FnOnce() -> &'static BoxMetadata) -> &'static BoxMetadata
where
    K: Eq + std::hash::Hash,
{
    if let Some(hit) = map.get(&key) {
        return *hit;
    }
    match map.entry(key) {
        Entry::Occupied(existing) => *existing.get(),
        Entry::Vacant(slot) => *slot.insert(build()),
    }
}

impl BoxRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Box type for values with layout `info` and runtime type `metadata`.
    pub fn box_type(&self, info: TypeInfo, metadata: MetadataRef) -> BoxType {
        let shape = BoxShape::of(info);
        let record = match shape {
            BoxShape::Empty => return BoxType::Empty,
            BoxShape::NonFixed => return BoxType::NonFixed(metadata),
            BoxShape::Pod { stride, align_mask } => {
                shared(&self.pod, (stride, align_mask), || {
                    tracing::debug!(stride, align_mask, "POD box record");
                    single_element_record(HeapElement::value(
                        TypeInfo::Fixed(FixedLayout::pod(stride, align_mask)),
                        None,
                    ))
                })
            }
            BoxShape::SingleRefcounted(kind) => shared(&self.refcounted, kind, || {
                tracing::debug!(?kind, "reference box record");
                single_element_record(HeapElement::value(
                    TypeInfo::Fixed(FixedLayout::reference(kind)),
                    None,
                ))
            }),
            BoxShape::Custom => shared(&self.custom, metadata.addr(), || {
                tracing::debug!(metadata = ?metadata.as_ptr(), "custom box record");
                single_element_record(HeapElement::value(info, Some(metadata)))
            }),
        };
        BoxType::Fixed { shape, record }
    }

    /// Number of distinct records created so far.
    pub fn num_records(&self) -> usize {
        self.pod.len() + self.refcounted.len() + self.custom.len()
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    reason = "tests use unwrap to panic on unexpected state"
)]
