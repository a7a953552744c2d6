use super::*;
use crate::alloc::Watch;
use std::sync::atomic::AtomicUsize;

static DESTROYED: AtomicUsize = AtomicUsize::new(0);

unsafe extern "C" fn counting_destroy(object: *mut HeapObject) {
    DESTROYED.fetch_add(1, Ordering::SeqCst);
    tymeta_dealloc_object(object, HEADER_SIZE, HEADER_ALIGN_MASK);
}

#[repr(C)]
struct TestHeapMetadata {
    destroy: HeapDestroyFn,
    vwt: usize,
    kind: usize,
}

static COUNTING: TestHeapMetadata = TestHeapMetadata {
    destroy: counting_destroy,
    vwt: 0,
    kind: 0,
};

fn counting_metadata() -> *const Metadata {
    std::ptr::addr_of!(COUNTING.kind).cast()
}

// ── Allocation ──

#[test]
fn header_rejects_undersized_objects() {
    assert!(tymeta_alloc_object(std::ptr::null(), HEADER_SIZE - 1, 7).is_null());
}

#[test]
fn new_object_has_one_of_each() {
    let obj = tymeta_alloc_object(std::ptr::null(), HEADER_SIZE + 8, 7);
    // SAFETY: just allocated
    let header = unsafe { &*obj };
    assert_eq!(header.strong_count(), 1);
    assert_eq!(header.unowned_count(), 1);
    assert_eq!(header.alloc_size(), HEADER_SIZE + 8);
    tymeta_release(obj);
}

// ── Strong counting ──

#[test]
fn last_release_runs_destroyer_once_and_frees() {
    let before = DESTROYED.load(Ordering::SeqCst);
    let obj = tymeta_alloc_object(counting_metadata(), HEADER_SIZE, 7);
    let obj_watch = Watch::new(obj.cast());
    tymeta_retain(obj);
    tymeta_release(obj);
    assert!(obj_watch.is_live());
    tymeta_release(obj);
    assert_eq!(DESTROYED.load(Ordering::SeqCst), before + 1);
    assert!(!obj_watch.is_live());
}

#[test]
fn null_is_ignored() {
    tymeta_retain(std::ptr::null_mut());
    tymeta_release(std::ptr::null_mut());
    tymeta_unowned_retain(std::ptr::null_mut());
    tymeta_unowned_release(std::ptr::null_mut());
    tymeta_retain_unowned(std::ptr::null_mut());
}

// ── Unowned counting ──

#[test]
fn unowned_reference_keeps_memory_after_deinit() {
    let obj = tymeta_alloc_object(std::ptr::null(), HEADER_SIZE, 7);
    let obj_watch = Watch::new(obj.cast());
    tymeta_unowned_retain(obj);
    tymeta_release(obj);
    assert!(obj_watch.is_live());
    // SAFETY: the unowned reference keeps the header readable
    assert!(unsafe { (*obj).is_dead() });
    tymeta_unowned_release(obj);
    assert!(!obj_watch.is_live());
}

#[test]
fn retain_unowned_on_live_object_is_strong() {
    let obj = tymeta_alloc_object(std::ptr::null(), HEADER_SIZE, 7);
    tymeta_retain_unowned(obj);
    // SAFETY: two strong references held
    assert_eq!(unsafe { (*obj).strong_count() }, 2);
    tymeta_release(obj);
    tymeta_release(obj);
}
