//! Constant images: generated byte layouts copied into process memory.
//!
//! An image is written once while its symbolic pointer fields are patched,
//! then handed out and never freed.

use std::ptr::NonNull;

use tymeta_abi::POINTER_SIZE;

use crate::alloc::tymeta_alloc;
use crate::metadata::{read_word, write_word};

/// A materialized constant.
#[derive(Copy, Clone, Debug)]
pub struct Image {
    base: NonNull<u8>,
    len: usize,
}

// SAFETY: images are patched before publication and immutable after
unsafe impl Send for Image {}
// SAFETY: see above
unsafe impl Sync for Image {}

impl Image {
    /// Copy `bytes` into fresh memory aligned to `align_mask + 1`.
    ///
    /// Returns `None` if the runtime allocator refuses the layout.
    pub fn materialize(bytes: &[u8], align_mask: usize) -> Option<Self> {
        let align_mask = align_mask | (POINTER_SIZE - 1);
        let base = NonNull::new(tymeta_alloc(bytes.len().max(POINTER_SIZE), align_mask))?;
        // SAFETY: the allocation holds at least `bytes.len()` bytes and is fresh
        unsafe {
            std::ptr::copy_nonoverlapping(bytes.as_ptr(), base.as_ptr(), bytes.len());
        }
        tracing::trace!(len = bytes.len(), addr = base.as_ptr() as usize, "materialized image");
        Some(Self {
            base,
            len: bytes.len(),
        })
    }

    pub fn base(self) -> *mut u8 {
        self.base.as_ptr()
    }

    pub fn len(self) -> usize {
        self.len
    }

    pub fn is_empty(self) -> bool {
        self.len == 0
    }

    /// Absolute address of byte `offset` (which may equal `len`).
    pub fn address_of(self, offset: usize) -> usize {
        assert!(
            offset <= self.len,
            "image offset {offset} past the end of a {}-byte image",
            self.len
        );
        self.base.as_ptr() as usize + offset
    }

    pub fn read_word(self, offset: usize) -> usize {
        self.check_word(offset);
        // SAFETY: bounds and alignment checked above
        unsafe { read_word(self.base.as_ptr(), offset as isize) }
    }

    /// Overwrite the word at `offset`.
    ///
    /// # Safety
    /// The image must not yet be visible to another thread.
    pub unsafe fn patch_word(self, offset: usize, value: usize) {
        self.check_word(offset);
        write_word(self.base.as_ptr(), offset as isize, value);
    }

    fn check_word(self, offset: usize) {
        assert!(
            offset % POINTER_SIZE == 0 && offset + POINTER_SIZE <= self.len,
            "word at {offset} is not inside a {}-byte image",
            self.len
        );
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    reason = "tests use unwrap to panic on unexpected state"
)]
