//! Heap boxes and plan-driven heap objects.
//!
//! A box record is heap metadata whose destroyer walks a [`DestroyPlan`]:
//! the elements of the object, their offsets (fixed, or computed by the
//! dynamic layout pass from metadata kept in the object's bindings buffer)
//! and how each is destroyed. Boxes for values of a fixed shape share a
//! record built by the generator; boxes for values whose type is only known
//! at runtime get one record per value metadata, cached here.

use std::sync::LazyLock;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use smallvec::SmallVec;
use tymeta_abi::{offsets, round_up, MetadataKind, POINTER_SIZE};

use crate::heap::{
    tymeta_alloc_object, tymeta_dealloc_object, tymeta_unowned_release, HeapDestroyFn,
    HeapObject, HEADER_ALIGN_MASK, HEADER_SIZE,
};
use crate::layout::{dynamic_pass, ElementLayout};
use crate::metadata::{read_word, Metadata, MetadataRef, ValueWitnessTable};
use crate::refcount::RefCountFn;
use crate::weak::{tymeta_weak_destroy, WeakReference};
use crate::witness::NATIVE_OBJECT_WITNESSES;

/// Where an element lives within the object.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum ElementOffset {
    Fixed(usize),
    /// Computed by the dynamic pass.
    Dynamic,
}

/// An element's size and alignment.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum ElementSize {
    Fixed(ElementLayout),
    /// The metadata in bindings-buffer word `n` describes the element.
    Binding(u16),
}

/// How an element is destroyed.
#[derive(Copy, Clone, Debug)]
pub enum ElementDestroy {
    /// Plain data.
    None,
    /// A strong reference.
    Release(RefCountFn),
    UnownedRelease,
    WeakDestroy,
    /// A value of a known type.
    Witness(MetadataRef),
    /// A value whose type is in bindings-buffer word `n`.
    WitnessBinding(u16),
}

#[derive(Copy, Clone, Debug)]
pub struct PlanElement {
    pub offset: ElementOffset,
    pub size: ElementSize,
    pub destroy: ElementDestroy,
}

/// Element layout and destruction of one heap object shape.
#[derive(Clone, Debug)]
pub struct DestroyPlan {
    pub elements: Vec<PlanElement>,
    /// Byte offset of the bindings buffer, when elements have generic types.
    pub bindings_offset: Option<usize>,
    /// End of the fixed prefix, where the dynamic pass starts.
    pub prefix_end: usize,
    pub prefix_align_mask: usize,
}

impl DestroyPlan {
    fn binding(object: *const u8, bindings: Option<usize>, n: u16) -> Option<MetadataRef> {
        let bindings = bindings?;
        let at = (bindings + usize::from(n) * POINTER_SIZE) as isize;
        // SAFETY: the bindings buffer is fixed-size and inside the object
        MetadataRef::from_addr(unsafe { read_word(object, at) })
    }

    /// Offset of every element in `object`.
    pub fn element_offsets(&self, object: *const u8) -> SmallVec<[usize; 8]> {
        let dynamic: SmallVec<[ElementLayout; 8]> = self
            .elements
            .iter()
            .filter(|e| e.offset == ElementOffset::Dynamic)
            .map(|e| match e.size {
                ElementSize::Fixed(layout) => layout,
                ElementSize::Binding(n) => Self::binding(object, self.bindings_offset, n)
                    .map_or(ElementLayout::new(0, 0), ElementLayout::of),
            })
            .collect();
        let computed = dynamic_pass(self.prefix_end, self.prefix_align_mask, dynamic);
        let mut next = computed.offsets.iter();
        self.elements
            .iter()
            .map(|e| match e.offset {
                ElementOffset::Fixed(offset) => offset,
                ElementOffset::Dynamic => next.next().copied().unwrap_or(0),
            })
            .collect()
    }

    /// Destroy every non-POD element of `object`, in order.
    ///
    /// # Safety
    /// `object` must be a live object of this plan's shape whose elements
    /// are all initialized.
    pub unsafe fn destroy_elements(&self, object: *mut HeapObject) {
        let base = object.cast::<u8>();
        let offsets = self.element_offsets(base);
        for (element, &offset) in self.elements.iter().zip(&offsets) {
            let at = base.add(offset);
            match element.destroy {
                ElementDestroy::None => {}
                ElementDestroy::Release(release) => release(at.cast::<*mut HeapObject>().read()),
                ElementDestroy::UnownedRelease => {
                    tymeta_unowned_release(at.cast::<*mut HeapObject>().read());
                }
                ElementDestroy::WeakDestroy => tymeta_weak_destroy(at.cast::<WeakReference>()),
                ElementDestroy::Witness(metadata) => metadata.destroy(at),
                ElementDestroy::WitnessBinding(n) => {
                    if let Some(metadata) = Self::binding(base, self.bindings_offset, n) {
                        metadata.destroy(at);
                    }
                }
            }
        }
    }
}

/// `[destroyer][value witnesses][kind][value offset][plan][size][align mask]`.
#[repr(C)]
pub struct BoxMetadata {
    pub destroy: HeapDestroyFn,
    pub value_witnesses: &'static ValueWitnessTable,
    pub kind: usize,
    pub value_offset: usize,
    pub plan: *const DestroyPlan,
    pub alloc_size: usize,
    pub alloc_align_mask: usize,
}

// SAFETY: box records are immutable after creation and their plans are leaked
unsafe impl Send for BoxMetadata {}
// SAFETY: see above
unsafe impl Sync for BoxMetadata {}

impl BoxMetadata {
    /// A leaked box record for objects of `alloc_size` bytes whose value
    /// starts at `value_offset`.
    pub fn leak(
        kind: MetadataKind,
        value_offset: usize,
        alloc_size: usize,
        alloc_align_mask: usize,
        plan: DestroyPlan,
    ) -> &'static Self {
        let plan: &'static DestroyPlan = Box::leak(Box::new(plan));
        Box::leak(Box::new(Self {
            destroy: tymeta_destroy_planned_object,
            value_witnesses: &NATIVE_OBJECT_WITNESSES,
            kind: kind as usize,
            value_offset,
            plan,
            alloc_size,
            alloc_align_mask: alloc_align_mask | HEADER_ALIGN_MASK,
        }))
    }

    pub fn metadata(&'static self) -> MetadataRef {
        // SAFETY: `kind` is the address point of the record
        MetadataRef::from_static(unsafe { &*std::ptr::addr_of!(self.kind).cast::<Metadata>() })
    }

    pub fn plan(&self) -> &'static DestroyPlan {
        // SAFETY: plans are leaked with their record
        unsafe { &*self.plan }
    }

    /// Allocate a box; returns the object and the value address.
    pub fn allocate(&'static self) -> BoxPair {
        let object = tymeta_alloc_object(
            self.metadata().as_ptr(),
            self.alloc_size,
            self.alloc_align_mask,
        );
        BoxPair {
            object,
            value: project(object, self.value_offset),
        }
    }
}

/// Heap object handle plus the address of its value.
#[repr(C)]
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub struct BoxPair {
    pub object: *mut HeapObject,
    pub value: *mut u8,
}

fn project(object: *mut HeapObject, value_offset: usize) -> *mut u8 {
    if object.is_null() {
        return std::ptr::null_mut();
    }
    // SAFETY: the value lies inside the object
    unsafe { object.cast::<u8>().add(value_offset) }
}

/// Destroyer of every plan-driven heap object.
#[no_mangle]
pub extern "C" fn tymeta_destroy_planned_object(object: *mut HeapObject) {
    if object.is_null() {
        return;
    }
    // SAFETY: the destroyer runs once, on a live object with a box record
    unsafe {
        let metadata = (*object).metadata;
        let plan = read_word(metadata.cast(), offsets::BOX_PLAN) as *const DestroyPlan;
        if let Some(plan) = plan.as_ref() {
            plan.destroy_elements(object);
        }
    }
    tymeta_dealloc_object(object, 0, 0);
}

static RUNTIME_BOXES: LazyLock<DashMap<usize, &'static BoxMetadata>> =
    LazyLock::new(DashMap::new);

fn runtime_box(value: MetadataRef) -> &'static BoxMetadata {
    let align_mask = value.align_mask();
    let value_offset = round_up(HEADER_SIZE, align_mask);
    let plan = DestroyPlan {
        elements: vec![PlanElement {
            offset: ElementOffset::Fixed(value_offset),
            size: ElementSize::Fixed(ElementLayout::of(value)),
            destroy: if value.is_pod() {
                ElementDestroy::None
            } else {
                ElementDestroy::Witness(value)
            },
        }],
        bindings_offset: None,
        prefix_end: value_offset + value.size(),
        prefix_align_mask: align_mask | HEADER_ALIGN_MASK,
    };
    tracing::debug!(metadata = ?value.as_ptr(), value_offset, "runtime box record");
    BoxMetadata::leak(
        MetadataKind::HeapGenericLocalVariable,
        value_offset,
        (value_offset + value.size()).max(HEADER_SIZE),
        align_mask,
        plan,
    )
}

/// Box record for values of a type known only at runtime, one per metadata.
pub fn box_metadata_for(value: MetadataRef) -> &'static BoxMetadata {
    if let Some(hit) = RUNTIME_BOXES.get(&value.addr()) {
        return *hit;
    }
    match RUNTIME_BOXES.entry(value.addr()) {
        Entry::Occupied(existing) => *existing.get(),
        Entry::Vacant(slot) => *slot.insert(runtime_box(value)),
    }
}

/// Allocate a box for a value of type `metadata`.
#[no_mangle]
pub extern "C" fn tymeta_alloc_box(metadata: *const Metadata) -> BoxPair {
    match MetadataRef::new(metadata) {
        Some(value) => box_metadata_for(value).allocate(),
        None => BoxPair {
            object: std::ptr::null_mut(),
            value: std::ptr::null_mut(),
        },
    }
}

/// Address of the value inside a box.
#[no_mangle]
pub extern "C" fn tymeta_project_box(object: *mut HeapObject, _metadata: *const Metadata) -> *mut u8 {
    if object.is_null() {
        return std::ptr::null_mut();
    }
    // SAFETY: object is a live box; its record stores the value offset
    let offset = unsafe { read_word((*object).metadata.cast(), offsets::BOX_VALUE_OFFSET) };
    project(object, offset)
}

/// Free a box whose value is uninitialized.
#[no_mangle]
pub extern "C" fn tymeta_dealloc_box(object: *mut HeapObject, _metadata: *const Metadata) {
    tymeta_dealloc_object(object, 0, 0);
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    reason = "tests use unwrap to panic on unexpected state"
)]
mod tests;
