//! Reference counting for the non-native reference kinds.
//!
//! This runtime has no separate legacy object runtime: legacy, unknown and
//! error references point at native heap objects and route to the native
//! operations. Bridge references carry tag bits in their low bits, which are
//! stripped first. A block copy is a retain that hands the block back.

use tymeta_abi::{ReferenceCounting, RuntimeFn};

use crate::heap::{
    tymeta_release, tymeta_retain, tymeta_retain_unowned, tymeta_unowned_release,
    tymeta_unowned_retain, HeapObject,
};

/// Low bits a bridge reference may use as tags.
pub const BRIDGE_TAG_MASK: usize = tymeta_abi::POINTER_ALIGN_MASK;

/// Signature shared by every retain and release entry point.
pub type RefCountFn = extern "C" fn(object: *mut HeapObject);

#[inline]
fn strip_bridge_tag(object: *mut HeapObject) -> *mut HeapObject {
    (object as usize & !BRIDGE_TAG_MASK) as *mut HeapObject
}

#[no_mangle]
pub extern "C" fn tymeta_unknown_retain(object: *mut HeapObject) {
    tymeta_retain(object);
}

#[no_mangle]
pub extern "C" fn tymeta_unknown_release(object: *mut HeapObject) {
    tymeta_release(object);
}

#[no_mangle]
pub extern "C" fn tymeta_unknown_retain_unowned(object: *mut HeapObject) {
    tymeta_retain_unowned(object);
}

#[no_mangle]
pub extern "C" fn tymeta_unknown_unowned_retain(object: *mut HeapObject) {
    tymeta_unowned_retain(object);
}

#[no_mangle]
pub extern "C" fn tymeta_unknown_unowned_release(object: *mut HeapObject) {
    tymeta_unowned_release(object);
}

#[no_mangle]
pub extern "C" fn tymeta_legacy_retain(object: *mut HeapObject) {
    tymeta_retain(object);
}

#[no_mangle]
pub extern "C" fn tymeta_legacy_release(object: *mut HeapObject) {
    tymeta_release(object);
}

#[no_mangle]
pub extern "C" fn tymeta_bridge_retain(object: *mut HeapObject) {
    tymeta_retain(strip_bridge_tag(object));
}

#[no_mangle]
pub extern "C" fn tymeta_bridge_release(object: *mut HeapObject) {
    tymeta_release(strip_bridge_tag(object));
}

#[no_mangle]
pub extern "C" fn tymeta_block_copy(block: *mut HeapObject) -> *mut HeapObject {
    tymeta_retain(block);
    block
}

#[no_mangle]
pub extern "C" fn tymeta_block_release(block: *mut HeapObject) {
    tymeta_release(block);
}

#[no_mangle]
pub extern "C" fn tymeta_error_retain(error: *mut HeapObject) {
    tymeta_retain(error);
}

#[no_mangle]
pub extern "C" fn tymeta_error_release(error: *mut HeapObject) {
    tymeta_release(error);
}

extern "C" fn block_retain(block: *mut HeapObject) {
    tymeta_block_copy(block);
}

/// Resolve a retain or release entry point from the dispatch table to a
/// callable function.
pub fn refcount_fn(f: RuntimeFn) -> Option<RefCountFn> {
    Some(match f {
        RuntimeFn::NativeRetain => tymeta_retain,
        RuntimeFn::NativeRelease => tymeta_release,
        RuntimeFn::NativeRetainUnowned => tymeta_retain_unowned,
        RuntimeFn::NativeUnownedRetain => tymeta_unowned_retain,
        RuntimeFn::NativeUnownedRelease => tymeta_unowned_release,
        RuntimeFn::UnknownRetain => tymeta_unknown_retain,
        RuntimeFn::UnknownRelease => tymeta_unknown_release,
        RuntimeFn::UnknownRetainUnowned => tymeta_unknown_retain_unowned,
        RuntimeFn::UnknownUnownedRetain => tymeta_unknown_unowned_retain,
        RuntimeFn::UnknownUnownedRelease => tymeta_unknown_unowned_release,
        RuntimeFn::LegacyRetain => tymeta_legacy_retain,
        RuntimeFn::LegacyRelease => tymeta_legacy_release,
        RuntimeFn::BridgeRetain => tymeta_bridge_retain,
        RuntimeFn::BridgeRelease => tymeta_bridge_release,
        RuntimeFn::BlockCopy => block_retain,
        RuntimeFn::BlockRelease => tymeta_block_release,
        RuntimeFn::ErrorRetain => tymeta_error_retain,
        RuntimeFn::ErrorRelease => tymeta_error_release,
        _ => return None,
    })
}

/// Strong retain for a reference of `kind`, looked up through the table.
pub fn retain_fn(kind: ReferenceCounting) -> RefCountFn {
    refcount_fn(kind.ops().retain).unwrap_or(tymeta_retain)
}

/// Strong release for a reference of `kind`, looked up through the table.
pub fn release_fn(kind: ReferenceCounting) -> RefCountFn {
    refcount_fn(kind.ops().release).unwrap_or(tymeta_release)
}

/// Unowned release for a reference of `kind`, looked up through the table.
pub fn unowned_release_fn(kind: ReferenceCounting) -> RefCountFn {
    refcount_fn(kind.ops().unowned_release).unwrap_or(tymeta_unowned_release)
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    reason = "tests use unwrap to panic on unexpected state"
)]
