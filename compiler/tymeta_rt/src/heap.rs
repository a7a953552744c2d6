//! Native heap objects.
//!
//! Every heap object starts with a [`HeapObject`] header. Both counts start
//! at one. When the strong count reaches zero the destroyer stored two words
//! before the metadata's address point runs; it deinitializes the object and
//! calls [`tymeta_dealloc_object`], which drops the unowned reference the
//! strong references collectively held. Memory is freed when the unowned
//! count reaches zero, so weak and unowned references never dangle.

use std::sync::atomic::{fence, AtomicU32, Ordering};

use tymeta_abi::offsets;

use crate::alloc::{tymeta_alloc, tymeta_free};
use crate::metadata::{read_word, Metadata};

/// Heap object header.
#[repr(C)]
pub struct HeapObject {
    pub metadata: *const Metadata,
    strong: AtomicU32,
    unowned: AtomicU32,
    alloc_size: u32,
    alloc_align_mask: u32,
}

/// Byte size of the header; stored properties start at or after this.
pub const HEADER_SIZE: usize = std::mem::size_of::<HeapObject>();

/// Alignment mask of the header.
pub const HEADER_ALIGN_MASK: usize = std::mem::align_of::<HeapObject>() - 1;

/// Destroyer stored at [`offsets::HEAP_DESTROY`] in heap metadata.
pub type HeapDestroyFn = unsafe extern "C" fn(object: *mut HeapObject);

impl HeapObject {
    pub fn strong_count(&self) -> u32 {
        self.strong.load(Ordering::Acquire)
    }

    pub fn unowned_count(&self) -> u32 {
        self.unowned.load(Ordering::Acquire)
    }

    /// Whether the object has been deinitialized.
    pub fn is_dead(&self) -> bool {
        self.strong_count() == 0
    }

    pub fn alloc_size(&self) -> usize {
        self.alloc_size as usize
    }

    pub fn alloc_align_mask(&self) -> usize {
        self.alloc_align_mask as usize
    }

    /// Strong-retain if the object is still alive.
    pub(crate) fn try_retain(&self) -> bool {
        self.strong
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |n| {
                (n > 0).then(|| n + 1)
            })
            .is_ok()
    }
}

/// Allocate a heap object of `size` bytes for `metadata`.
///
/// Returns null if `size` is smaller than the header or the allocation fails.
#[no_mangle]
pub extern "C" fn tymeta_alloc_object(
    metadata: *const Metadata,
    size: usize,
    align_mask: usize,
) -> *mut HeapObject {
    if size < HEADER_SIZE || u32::try_from(size).is_err() {
        return std::ptr::null_mut();
    }
    let align_mask = align_mask | HEADER_ALIGN_MASK;
    let ptr = tymeta_alloc(size, align_mask).cast::<HeapObject>();
    if ptr.is_null() {
        return ptr;
    }
    // SAFETY: fresh allocation of at least HEADER_SIZE bytes
    unsafe {
        ptr.write(HeapObject {
            metadata,
            strong: AtomicU32::new(1),
            unowned: AtomicU32::new(1),
            alloc_size: size as u32,
            alloc_align_mask: align_mask as u32,
        });
    }
    ptr
}

/// Give up the unowned reference held on behalf of strong references.
///
/// Called by destroyers once the object is deinitialized. `size` and
/// `align_mask` are accepted for ABI symmetry; the header's recorded
/// allocation size is authoritative.
#[no_mangle]
pub extern "C" fn tymeta_dealloc_object(object: *mut HeapObject, _size: usize, _align_mask: usize) {
    tymeta_unowned_release(object);
}

#[no_mangle]
pub extern "C" fn tymeta_retain(object: *mut HeapObject) {
    if object.is_null() {
        return;
    }
    // SAFETY: caller holds a strong reference
    unsafe { (*object).strong.fetch_add(1, Ordering::Relaxed) };
}

#[no_mangle]
pub extern "C" fn tymeta_release(object: *mut HeapObject) {
    if object.is_null() {
        return;
    }
    // SAFETY: caller holds a strong reference
    let previous = unsafe { (*object).strong.fetch_sub(1, Ordering::Release) };
    if previous != 1 {
        return;
    }
    fence(Ordering::Acquire);
    // SAFETY: last strong reference; the destroyer owns the object now
    unsafe { destroy(object) };
}

/// Run the metadata's destroyer, or just drop the collective unowned
/// reference when the metadata carries none.
unsafe fn destroy(object: *mut HeapObject) {
    let metadata = (*object).metadata;
    let destroyer = if metadata.is_null() {
        0
    } else {
        read_word(metadata.cast(), offsets::HEAP_DESTROY)
    };
    if destroyer == 0 {
        tymeta_unowned_release(object);
        return;
    }
    let destroyer: HeapDestroyFn = std::mem::transmute::<usize, HeapDestroyFn>(destroyer);
    destroyer(object);
}

#[no_mangle]
pub extern "C" fn tymeta_unowned_retain(object: *mut HeapObject) {
    if object.is_null() {
        return;
    }
    // SAFETY: caller holds an unowned or strong reference
    unsafe { (*object).unowned.fetch_add(1, Ordering::Relaxed) };
}

#[no_mangle]
pub extern "C" fn tymeta_unowned_release(object: *mut HeapObject) {
    if object.is_null() {
        return;
    }
    // SAFETY: caller holds an unowned reference
    let previous = unsafe { (*object).unowned.fetch_sub(1, Ordering::Release) };
    if previous != 1 {
        return;
    }
    fence(Ordering::Acquire);
    // SAFETY: last reference of any kind
    let (size, align_mask) = unsafe { ((*object).alloc_size(), (*object).alloc_align_mask()) };
    tymeta_free(object.cast(), size, align_mask);
}

/// Turn an unowned reference into a strong one.
///
/// Loading an unowned reference to a deinitialized object is a program
/// error; the process aborts.
#[no_mangle]
pub extern "C" fn tymeta_retain_unowned(object: *mut HeapObject) {
    if object.is_null() {
        return;
    }
    // SAFETY: caller holds an unowned reference, so the memory is live
    if unsafe { (*object).try_retain() } {
        return;
    }
    tracing::error!(object = ?object, "unowned reference to a deallocated object");
    std::process::abort();
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    reason = "tests use unwrap to panic on unexpected state"
)]
mod tests;
