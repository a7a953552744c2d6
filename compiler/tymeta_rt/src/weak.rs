//! Weak references.
//!
//! A weak reference holds an unowned count on its referent, so the header
//! stays readable after the object deinitializes. Loading a weak reference
//! to a dead object clears the reference and yields null.

use std::sync::atomic::{AtomicPtr, Ordering};

use crate::heap::{tymeta_unowned_release, tymeta_unowned_retain, HeapObject};

/// Storage of a weak reference.
#[repr(C)]
pub struct WeakReference {
    value: AtomicPtr<HeapObject>,
}

impl WeakReference {
    pub const fn null() -> Self {
        Self {
            value: AtomicPtr::new(std::ptr::null_mut()),
        }
    }

    /// The referent without any count change. May be dead.
    pub fn peek(&self) -> *mut HeapObject {
        self.value.load(Ordering::Acquire)
    }
}

#[no_mangle]
pub extern "C" fn tymeta_weak_init(weak: *mut WeakReference, object: *mut HeapObject) {
    if weak.is_null() {
        return;
    }
    tymeta_unowned_retain(object);
    // SAFETY: weak points at uninitialized weak storage owned by the caller
    unsafe { weak.write(WeakReference { value: AtomicPtr::new(object) }) };
}

#[no_mangle]
pub extern "C" fn tymeta_weak_assign(weak: *mut WeakReference, object: *mut HeapObject) {
    if weak.is_null() {
        return;
    }
    tymeta_unowned_retain(object);
    // SAFETY: weak points at initialized weak storage
    let old = unsafe { (*weak).value.swap(object, Ordering::AcqRel) };
    tymeta_unowned_release(old);
}

/// Load a strong reference, or null if the referent is gone.
#[no_mangle]
pub extern "C" fn tymeta_weak_load_strong(weak: *mut WeakReference) -> *mut HeapObject {
    if weak.is_null() {
        return std::ptr::null_mut();
    }
    // SAFETY: weak points at initialized weak storage
    let slot = unsafe { &(*weak).value };
    let object = slot.load(Ordering::Acquire);
    if object.is_null() {
        return object;
    }
    // SAFETY: the weak reference's unowned count keeps the header alive
    if unsafe { (*object).try_retain() } {
        return object;
    }
    if slot
        .compare_exchange(object, std::ptr::null_mut(), Ordering::AcqRel, Ordering::Acquire)
        .is_ok()
    {
        tymeta_unowned_release(object);
    }
    std::ptr::null_mut()
}

/// Load a strong reference and destroy the weak reference.
#[no_mangle]
pub extern "C" fn tymeta_weak_take_strong(weak: *mut WeakReference) -> *mut HeapObject {
    let object = tymeta_weak_load_strong(weak);
    tymeta_weak_destroy(weak);
    object
}

#[no_mangle]
pub extern "C" fn tymeta_weak_destroy(weak: *mut WeakReference) {
    if weak.is_null() {
        return;
    }
    // SAFETY: weak points at initialized weak storage
    let old = unsafe { (*weak).value.swap(std::ptr::null_mut(), Ordering::AcqRel) };
    tymeta_unowned_release(old);
}

#[no_mangle]
pub extern "C" fn tymeta_weak_copy_init(dest: *mut WeakReference, src: *mut WeakReference) {
    if dest.is_null() || src.is_null() {
        return;
    }
    // SAFETY: src points at initialized weak storage
    let object = unsafe { (*src).peek() };
    // SAFETY: the source's unowned count keeps the header readable
    let live = !object.is_null() && unsafe { !(*object).is_dead() };
    tymeta_weak_init(dest, if live { object } else { std::ptr::null_mut() });
}

#[no_mangle]
pub extern "C" fn tymeta_weak_copy_assign(dest: *mut WeakReference, src: *mut WeakReference) {
    if dest == src {
        return;
    }
    tymeta_weak_destroy(dest);
    tymeta_weak_copy_init(dest, src);
}

/// Move `src` into uninitialized `dest`. `src` is left uninitialized.
#[no_mangle]
pub extern "C" fn tymeta_weak_take_init(dest: *mut WeakReference, src: *mut WeakReference) {
    if dest.is_null() || src.is_null() {
        return;
    }
    // SAFETY: src is initialized and dest is uninitialized storage
    unsafe {
        let object = (*src).value.swap(std::ptr::null_mut(), Ordering::AcqRel);
        dest.write(WeakReference { value: AtomicPtr::new(object) });
    }
}

#[no_mangle]
pub extern "C" fn tymeta_weak_take_assign(dest: *mut WeakReference, src: *mut WeakReference) {
    if dest == src {
        return;
    }
    tymeta_weak_destroy(dest);
    tymeta_weak_take_init(dest, src);
}

// Unknown-kind weak references point at native objects in this runtime.

#[no_mangle]
pub extern "C" fn tymeta_unknown_weak_init(weak: *mut WeakReference, object: *mut HeapObject) {
    tymeta_weak_init(weak, object);
}

#[no_mangle]
pub extern "C" fn tymeta_unknown_weak_assign(weak: *mut WeakReference, object: *mut HeapObject) {
    tymeta_weak_assign(weak, object);
}

#[no_mangle]
pub extern "C" fn tymeta_unknown_weak_load_strong(weak: *mut WeakReference) -> *mut HeapObject {
    tymeta_weak_load_strong(weak)
}

#[no_mangle]
pub extern "C" fn tymeta_unknown_weak_take_strong(weak: *mut WeakReference) -> *mut HeapObject {
    tymeta_weak_take_strong(weak)
}

#[no_mangle]
pub extern "C" fn tymeta_unknown_weak_destroy(weak: *mut WeakReference) {
    tymeta_weak_destroy(weak);
}

#[no_mangle]
pub extern "C" fn tymeta_unknown_weak_copy_init(dest: *mut WeakReference, src: *mut WeakReference) {
    tymeta_weak_copy_init(dest, src);
}

#[no_mangle]
pub extern "C" fn tymeta_unknown_weak_copy_assign(
    dest: *mut WeakReference,
    src: *mut WeakReference,
) {
    tymeta_weak_copy_assign(dest, src);
}

#[no_mangle]
pub extern "C" fn tymeta_unknown_weak_take_init(dest: *mut WeakReference, src: *mut WeakReference) {
    tymeta_weak_take_init(dest, src);
}

#[no_mangle]
pub extern "C" fn tymeta_unknown_weak_take_assign(
    dest: *mut WeakReference,
    src: *mut WeakReference,
) {
    tymeta_weak_take_assign(dest, src);
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    reason = "tests use unwrap to panic on unexpected state"
)]
