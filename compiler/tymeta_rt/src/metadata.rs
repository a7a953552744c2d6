//! Views over metadata records.

use std::ptr::NonNull;
use tymeta_abi::{offsets, MetadataKind, ValueWitnessFlags};

use crate::descriptor::NominalTypeDescriptor;

/// The word at a record's address point. Everything else is reached by
/// byte offset from here.
#[repr(C)]
pub struct Metadata {
    pub kind: usize,
}

/// Destroy a value in place.
pub type DestroyFn = unsafe extern "C" fn(value: *mut u8, metadata: *const Metadata);

/// Copy-initialize `dest` from `src`; returns `dest`.
pub type CopyFn =
    unsafe extern "C" fn(dest: *mut u8, src: *const u8, metadata: *const Metadata) -> *mut u8;

/// Value-witness table: how to manage values of one type.
#[repr(C)]
pub struct ValueWitnessTable {
    pub destroy: DestroyFn,
    pub initialize_with_copy: CopyFn,
    pub size: usize,
    pub flags: usize,
    pub stride: usize,
}

impl ValueWitnessTable {
    pub fn flags(&self) -> ValueWitnessFlags {
        ValueWitnessFlags::from_bits(self.flags)
    }

    pub fn align_mask(&self) -> usize {
        self.flags().alignment_mask()
    }

    pub fn is_pod(&self) -> bool {
        self.flags().is_pod()
    }
}

/// A published metadata record.
///
/// Records are immutable once published and never freed, so a reference is
/// freely shareable across threads.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub struct MetadataRef(NonNull<Metadata>);

// SAFETY: published records are immutable and live until process exit
unsafe impl Send for MetadataRef {}
// SAFETY: see above
unsafe impl Sync for MetadataRef {}

impl MetadataRef {
    /// Wrap a pointer to a record's address point. Null gives `None`.
    pub fn new(ptr: *const Metadata) -> Option<Self> {
        NonNull::new(ptr.cast_mut()).map(Self)
    }

    pub fn from_non_null(ptr: NonNull<Metadata>) -> Self {
        Self(ptr)
    }

    pub fn from_static(metadata: &'static Metadata) -> Self {
        Self(NonNull::from(metadata))
    }

    /// Wrap an address previously taken with [`addr`](Self::addr).
    pub fn from_addr(addr: usize) -> Option<Self> {
        Self::new(addr as *const Metadata)
    }

    #[inline]
    pub fn as_ptr(self) -> *const Metadata {
        self.0.as_ptr()
    }

    #[inline]
    pub fn as_non_null(self) -> NonNull<Metadata> {
        self.0
    }

    #[inline]
    pub fn addr(self) -> usize {
        self.0.as_ptr() as usize
    }

    /// Read the word at `offset` bytes from the address point.
    #[inline]
    pub fn word(self, offset: isize) -> usize {
        // SAFETY: callers only pass offsets inside the record's layout
        unsafe { read_word(self.as_ptr().cast(), offset) }
    }

    #[inline]
    pub fn u32_at(self, offset: isize) -> u32 {
        // SAFETY: as above; u32 fields are 4-byte aligned
        unsafe { self.as_ptr().cast::<u8>().offset(offset).cast::<u32>().read() }
    }

    #[inline]
    pub fn u16_at(self, offset: isize) -> u16 {
        // SAFETY: as above; u16 fields are 2-byte aligned
        unsafe { self.as_ptr().cast::<u8>().offset(offset).cast::<u16>().read() }
    }

    pub fn kind(self) -> Option<MetadataKind> {
        MetadataKind::from_word(self.word(offsets::KIND))
    }

    pub fn value_witnesses(self) -> &'static ValueWitnessTable {
        // SAFETY: every record stores a valid table pointer before its address point
        unsafe { &*(self.word(offsets::VALUE_WITNESSES) as *const ValueWitnessTable) }
    }

    pub fn size(self) -> usize {
        self.value_witnesses().size
    }

    pub fn stride(self) -> usize {
        self.value_witnesses().stride
    }

    pub fn align_mask(self) -> usize {
        self.value_witnesses().align_mask()
    }

    pub fn is_pod(self) -> bool {
        self.value_witnesses().is_pod()
    }

    /// Destroy a value of this type in place.
    ///
    /// # Safety
    /// `value` must point at an initialized value of this type.
    #[inline]
    pub unsafe fn destroy(self, value: *mut u8) {
        (self.value_witnesses().destroy)(value, self.as_ptr());
    }

    /// Copy-initialize `dest` from `src`.
    ///
    /// # Safety
    /// `src` must hold an initialized value of this type and `dest` must be
    /// uninitialized storage for one.
    #[inline]
    pub unsafe fn initialize_with_copy(self, dest: *mut u8, src: *const u8) -> *mut u8 {
        (self.value_witnesses().initialize_with_copy)(dest, src, self.as_ptr())
    }

    /// Nominal type descriptor for struct, enum and class records.
    pub fn descriptor(self) -> Option<&'static NominalTypeDescriptor> {
        let offset = match self.kind()? {
            MetadataKind::Struct | MetadataKind::Enum => offsets::VALUE_DESCRIPTOR,
            MetadataKind::Class => offsets::CLASS_DESCRIPTOR,
            _ => return None,
        };
        let ptr = self.word(offset) as *const NominalTypeDescriptor;
        // SAFETY: nominal records point at a descriptor that is never freed
        unsafe { ptr.as_ref() }
    }

    pub fn superclass(self) -> Option<MetadataRef> {
        match self.kind()? {
            MetadataKind::Class => MetadataRef::from_addr(self.word(offsets::CLASS_SUPERCLASS)),
            _ => None,
        }
    }

    /// Generic argument words, read through the descriptor.
    pub fn generic_arguments(self) -> &'static [usize] {
        let Some(desc) = self.descriptor() else {
            return &[];
        };
        let count = desc.num_generic_arguments();
        if count == 0 {
            return &[];
        }
        let offset = desc.generic_param_vector_offset as isize * tymeta_abi::POINTER_SIZE as isize;
        // SAFETY: the descriptor records where this record keeps its arguments
        unsafe {
            std::slice::from_raw_parts(
                self.as_ptr().cast::<u8>().offset(offset).cast::<usize>(),
                count,
            )
        }
    }

    /// Field offsets of a struct or of the class this descriptor describes.
    pub fn field_offsets(self) -> &'static [usize] {
        let Some(desc) = self.descriptor() else {
            return &[];
        };
        let Some((count, vector_words)) = desc.field_offset_vector() else {
            return &[];
        };
        // SAFETY: the descriptor records the vector's position and length
        unsafe {
            std::slice::from_raw_parts(
                self.as_ptr()
                    .cast::<u8>()
                    .add(vector_words * tymeta_abi::POINTER_SIZE)
                    .cast::<usize>(),
                count,
            )
        }
    }
}

/// Read a word at a byte offset from `base`.
///
/// # Safety
/// `base + offset` must be a readable, word-aligned address.
#[inline]
pub unsafe fn read_word(base: *const u8, offset: isize) -> usize {
    base.offset(offset).cast::<usize>().read()
}

/// Write a word at a byte offset from `base`.
///
/// # Safety
/// `base + offset` must be a writable, word-aligned address no other thread
/// can observe yet.
#[inline]
pub unsafe fn write_word(base: *mut u8, offset: isize, value: usize) {
    base.offset(offset).cast::<usize>().write(value);
}

/// Write a `u32` at a byte offset from `base`.
///
/// # Safety
/// As for [`write_word`], with 4-byte alignment.
#[inline]
pub unsafe fn write_u32(base: *mut u8, offset: isize, value: u32) {
    base.offset(offset).cast::<u32>().write(value);
}

/// Write a `u16` at a byte offset from `base`.
///
/// # Safety
/// As for [`write_word`], with 2-byte alignment.
#[inline]
pub unsafe fn write_u16(base: *mut u8, offset: isize, value: u16) {
    base.offset(offset).cast::<u16>().write(value);
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    reason = "tests use unwrap to panic on unexpected state"
)]
mod tests;
