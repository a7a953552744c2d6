//! Heap object layout.
//!
//! An object is the heap header, then a bindings buffer holding one metadata
//! word per element whose type is only known at runtime, then the elements in
//! order. Elements up to the first non-fixed one get their offsets here; that
//! element and every element after it are placed by the runtime's dynamic
//! pass, which starts at the end of the fixed prefix.

use smallvec::SmallVec;
use tymeta_abi::{round_up, MetadataKind, ReferenceCounting, POINTER_ALIGN_MASK, POINTER_SIZE};
use tymeta_ir::Ownership;
use tymeta_rt::boxes::{
    BoxMetadata, DestroyPlan, ElementDestroy, ElementOffset, ElementSize, PlanElement,
};
use tymeta_rt::heap::{tymeta_alloc_object, HeapObject, HEADER_ALIGN_MASK, HEADER_SIZE};
use tymeta_rt::layout::{dynamic_pass, ElementLayout};
use tymeta_rt::refcount::release_fn;
use tymeta_rt::weak::WeakReference;
use tymeta_rt::MetadataRef;

use crate::type_info::{FixedLayout, TypeInfo};

/// One element of a heap object.
#[derive(Copy, Clone, Debug)]
pub struct HeapElement {
    pub info: TypeInfo,
    pub ownership: Ownership,
    /// Runtime type of a fixed, non-POD element that is not a single
    /// reference. Its destroy goes through this metadata's witnesses.
    pub metadata: Option<MetadataRef>,
}

impl HeapElement {
    pub fn value(info: TypeInfo, metadata: Option<MetadataRef>) -> Self {
        Self {
            info,
            ownership: Ownership::Strong,
            metadata,
        }
    }

    /// A weak reference to a native object.
    pub fn weak() -> Self {
        Self {
            ownership: Ownership::Weak,
            ..Self::value(
                TypeInfo::Fixed(FixedLayout::reference(ReferenceCounting::Native)),
                None,
            )
        }
    }

    /// An unowned reference to a native object.
    pub fn unowned() -> Self {
        Self {
            ownership: Ownership::Unowned,
            ..Self::weak()
        }
    }

    /// Storage size and alignment, when known now.
    fn storage(&self) -> Option<ElementLayout> {
        match self.ownership {
            Ownership::Weak => Some(ElementLayout::new(
                std::mem::size_of::<WeakReference>(),
                std::mem::align_of::<WeakReference>() - 1,
            )),
            Ownership::Unowned => Some(ElementLayout::pointer()),
            Ownership::Strong => self.info.fixed().map(|layout| layout.element()),
        }
    }

    fn destroy(&self, binding: Option<u16>) -> ElementDestroy {
        match (self.ownership, self.info) {
            (Ownership::Weak, _) => ElementDestroy::WeakDestroy,
            (Ownership::Unowned, _) => ElementDestroy::UnownedRelease,
            (Ownership::Strong, TypeInfo::NonFixed) => {
                binding.map_or(ElementDestroy::None, ElementDestroy::WitnessBinding)
            }
            (Ownership::Strong, TypeInfo::Fixed(layout)) if layout.pod || layout.is_empty() => {
                ElementDestroy::None
            }
            (Ownership::Strong, TypeInfo::Fixed(layout)) => match (layout.reference, self.metadata) {
                (Some(kind), _) => ElementDestroy::Release(release_fn(kind)),
                (None, Some(metadata)) => ElementDestroy::Witness(metadata),
                (None, None) => panic!("non-POD heap element of {} bytes has no metadata", layout.size),
            },
        }
    }
}

/// Where the static pass put an element.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum ElementPlacement {
    /// Zero-sized; takes no storage.
    Empty,
    /// Byte offset from the start of the object.
    Fixed(usize),
    /// Placed by the dynamic pass at allocation time.
    NonFixed,
}

/// Static layout of a heap object shape.
#[derive(Clone, Debug)]
pub struct HeapLayout {
    elements: Vec<HeapElement>,
    placements: Vec<ElementPlacement>,
    bindings: Vec<Option<u16>>,
    bindings_offset: Option<usize>,
    num_bindings: usize,
    prefix_end: usize,
    prefix_align_mask: usize,
}

impl HeapLayout {
    pub fn new(elements: Vec<HeapElement>) -> Self {
        let num_bindings = elements.iter().filter(|e| e.storage().is_none()).count();
        assert!(
            u16::try_from(num_bindings).is_ok(),
            "bindings region of {num_bindings} words exceeds the plan's binding index"
        );

        let mut offset = HEADER_SIZE;
        let mut align_mask = HEADER_ALIGN_MASK;
        let mut bindings_offset = None;
        if num_bindings > 0 {
            let at = round_up(offset, POINTER_ALIGN_MASK);
            bindings_offset = Some(at);
            offset = at + num_bindings * POINTER_SIZE;
            align_mask |= POINTER_ALIGN_MASK;
        }

        let mut placements = Vec::with_capacity(elements.len());
        let mut bindings = Vec::with_capacity(elements.len());
        let mut next_binding: u16 = 0;
        let mut dynamic = false;
        for element in &elements {
            let storage = element.storage();
            bindings.push(if storage.is_none() {
                let binding = next_binding;
                next_binding += 1;
                Some(binding)
            } else {
                None
            });
            let placement = match storage {
                Some(layout) if layout.size == 0 => ElementPlacement::Empty,
                _ if dynamic => ElementPlacement::NonFixed,
                None => {
                    dynamic = true;
                    ElementPlacement::NonFixed
                }
                Some(layout) => {
                    offset = round_up(offset, layout.align_mask);
                    align_mask |= layout.align_mask;
                    let at = offset;
                    offset += layout.size;
                    ElementPlacement::Fixed(at)
                }
            };
            tracing::trace!(?placement, "heap element");
            placements.push(placement);
        }

        Self {
            elements,
            placements,
            bindings,
            bindings_offset,
            num_bindings,
            prefix_end: offset,
            prefix_align_mask: align_mask,
        }
    }

    pub fn placements(&self) -> &[ElementPlacement] {
        &self.placements
    }

    pub fn num_bindings(&self) -> usize {
        self.num_bindings
    }

    pub fn bindings_offset(&self) -> Option<usize> {
        self.bindings_offset
    }

    pub fn is_fixed(&self) -> bool {
        !self.placements.contains(&ElementPlacement::NonFixed)
    }

    /// Allocation size when every element is fixed.
    pub fn fixed_size(&self) -> Option<usize> {
        self.is_fixed().then_some(self.prefix_end)
    }

    /// Alignment of the fixed prefix.
    pub fn align_mask(&self) -> usize {
        self.prefix_align_mask
    }

    /// Offset of the first element, or of the end of the prefix when the
    /// first element is placed at runtime.
    pub fn first_offset(&self) -> usize {
        self.placements
            .iter()
            .find_map(|p| match p {
                ElementPlacement::Fixed(at) => Some(*at),
                ElementPlacement::Empty | ElementPlacement::NonFixed => None,
            })
            .unwrap_or(self.prefix_end)
    }

    /// How the runtime finds and destroys each element.
    pub fn destroy_plan(&self) -> DestroyPlan {
        let elements = self
            .elements
            .iter()
            .zip(&self.placements)
            .zip(&self.bindings)
            .map(|((element, placement), &binding)| PlanElement {
                offset: match placement {
                    ElementPlacement::Fixed(at) => ElementOffset::Fixed(*at),
                    ElementPlacement::Empty => ElementOffset::Fixed(HEADER_SIZE),
                    ElementPlacement::NonFixed => ElementOffset::Dynamic,
                },
                size: match (element.storage(), binding) {
                    (Some(layout), _) => ElementSize::Fixed(layout),
                    (None, Some(n)) => ElementSize::Binding(n),
                    (None, None) => ElementSize::Fixed(ElementLayout::new(0, 0)),
                },
                destroy: match placement {
                    ElementPlacement::Empty => ElementDestroy::None,
                    ElementPlacement::Fixed(_) | ElementPlacement::NonFixed => {
                        element.destroy(binding)
                    }
                },
            })
            .collect();
        DestroyPlan {
            elements,
            bindings_offset: self.bindings_offset,
            prefix_end: self.prefix_end,
            prefix_align_mask: self.prefix_align_mask,
        }
    }
}

/// A heap object shape with its runtime record.
pub struct HeapObjectType {
    layout: HeapLayout,
    record: &'static BoxMetadata,
}

impl HeapObjectType {
    pub fn new(layout: HeapLayout) -> Self {
        let kind = if layout.is_fixed() {
            MetadataKind::HeapLocalVariable
        } else {
            MetadataKind::HeapGenericLocalVariable
        };
        let record = BoxMetadata::leak(
            kind,
            layout.first_offset(),
            layout.prefix_end,
            layout.prefix_align_mask,
            layout.destroy_plan(),
        );
        tracing::debug!(
            ?kind,
            elements = layout.elements.len(),
            bindings = layout.num_bindings,
            prefix_end = layout.prefix_end,
            "heap object record"
        );
        Self { layout, record }
    }

    pub fn layout(&self) -> &HeapLayout {
        &self.layout
    }

    pub fn record(&self) -> &'static BoxMetadata {
        self.record
    }

    /// Allocate an object whose non-fixed elements have the types in
    /// `bindings`, one per bindings-buffer word. Elements are uninitialized.
    pub fn allocate(&self, bindings: &[MetadataRef]) -> *mut HeapObject {
        assert_eq!(
            bindings.len(),
            self.layout.num_bindings,
            "bindings region size disagreement"
        );
        let dynamic: SmallVec<[ElementLayout; 8]> = self
            .layout
            .elements
            .iter()
            .zip(&self.layout.placements)
            .zip(&self.layout.bindings)
            .filter(|((_, placement), _)| **placement == ElementPlacement::NonFixed)
            .map(|((element, _), binding)| match (element.storage(), binding) {
                (Some(layout), _) => layout,
                (None, Some(n)) => ElementLayout::of(bindings[usize::from(*n)]),
                (None, None) => ElementLayout::new(0, 0),
            })
            .collect();
        let computed = dynamic_pass(self.layout.prefix_end, self.layout.prefix_align_mask, dynamic);
        let object = tymeta_alloc_object(
            self.record.metadata().as_ptr(),
            computed.size.max(HEADER_SIZE),
            computed.align_mask,
        );
        if object.is_null() {
            return object;
        }
        if let Some(at) = self.layout.bindings_offset {
            // SAFETY: the bindings buffer lies inside the fixed prefix of a
            // fresh allocation
            unsafe {
                let words = object.cast::<u8>().add(at).cast::<usize>();
                for (i, metadata) in bindings.iter().enumerate() {
                    words.add(i).write(metadata.addr());
                }
            }
        }
        object
    }

    /// Offset of every element of a live `object`.
    pub fn element_offsets(&self, object: *const HeapObject) -> SmallVec<[usize; 8]> {
        self.record.plan().element_offsets(object.cast())
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    reason = "tests use unwrap to panic on unexpected state"
)]
mod tests;
