//! Raw runtime allocation.
//!
//! Every allocation the runtime makes (metadata instances, field-type
//! vectors, heap objects) goes through here so it can be counted.

use std::alloc::Layout;
use std::sync::atomic::{AtomicIsize, Ordering};

/// Minimum alignment of any runtime allocation.
const MIN_ALIGN: usize = std::mem::align_of::<usize>();

static LIVE_COUNT: AtomicIsize = AtomicIsize::new(0);

/// Live address to the serial of the allocation occupying it.
#[cfg(any(test, feature = "alloc-tracking"))]
static LIVE_SET: std::sync::LazyLock<dashmap::DashMap<usize, u64>> =
    std::sync::LazyLock::new(dashmap::DashMap::new);

#[cfg(any(test, feature = "alloc-tracking"))]
static NEXT_SERIAL: std::sync::atomic::AtomicU64 = std::sync::atomic::AtomicU64::new(0);

fn layout_for(size: usize, align_mask: usize) -> Option<Layout> {
    Layout::from_size_align(size, (align_mask + 1).max(MIN_ALIGN)).ok()
}

/// Allocate zeroed memory. `align_mask` is alignment minus one.
///
/// Returns null for `size == 0` or an invalid alignment.
#[no_mangle]
pub extern "C" fn tymeta_alloc(size: usize, align_mask: usize) -> *mut u8 {
    if size == 0 {
        return std::ptr::null_mut();
    }
    let Some(layout) = layout_for(size, align_mask) else {
        return std::ptr::null_mut();
    };

    // SAFETY: layout has non-zero size and a power-of-two alignment
    let ptr = unsafe { std::alloc::alloc_zeroed(layout) };
    if !ptr.is_null() {
        LIVE_COUNT.fetch_add(1, Ordering::Relaxed);
        #[cfg(any(test, feature = "alloc-tracking"))]
        LIVE_SET.insert(ptr as usize, NEXT_SERIAL.fetch_add(1, Ordering::Relaxed));
    }
    ptr
}

/// Free memory from [`tymeta_alloc`] with the same size and alignment mask.
#[no_mangle]
pub extern "C" fn tymeta_free(ptr: *mut u8, size: usize, align_mask: usize) {
    if ptr.is_null() || size == 0 {
        return;
    }
    let Some(layout) = layout_for(size, align_mask) else {
        return;
    };
    LIVE_COUNT.fetch_sub(1, Ordering::Relaxed);
    #[cfg(any(test, feature = "alloc-tracking"))]
    LIVE_SET.remove(&(ptr as usize));

    // SAFETY: caller guarantees ptr came from tymeta_alloc with this layout
    unsafe { std::alloc::dealloc(ptr, layout) }
}

/// Number of runtime allocations not yet freed, process-wide.
pub fn live_allocations() -> isize {
    LIVE_COUNT.load(Ordering::Relaxed)
}

/// One runtime allocation, told apart from later allocations that reuse
/// its address.
#[cfg(any(test, feature = "alloc-tracking"))]
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub struct Watch {
    addr: usize,
    serial: Option<u64>,
}

#[cfg(any(test, feature = "alloc-tracking"))]
impl Watch {
    /// Watch the allocation currently at `ptr`, if there is one.
    pub fn new(ptr: *const u8) -> Self {
        let addr = ptr as usize;
        Self {
            addr,
            serial: LIVE_SET.get(&addr).map(|serial| *serial),
        }
    }

    /// Whether the watched allocation has not been freed.
    pub fn is_live(self) -> bool {
        self.serial
            .is_some_and(|serial| LIVE_SET.get(&self.addr).is_some_and(|now| *now == serial))
    }
}

/// Whether some runtime allocation is live at `ptr` now.
#[cfg(any(test, feature = "alloc-tracking"))]
pub fn is_live(ptr: *const u8) -> bool {
    LIVE_SET.contains_key(&(ptr as usize))
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    reason = "tests use unwrap to panic on unexpected state"
)]
mod tests;
