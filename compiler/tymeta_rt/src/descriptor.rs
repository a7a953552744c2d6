//! Runtime views of nominal type and protocol descriptors.

use std::ffi::{c_char, CStr};
use tymeta_abi::{EnumCaseCounts, NominalTypeKind, ProtocolDescriptorFlags};

use crate::field_types::FieldTypeAccessor;
use crate::instantiate::PatternHeader;

/// Layout of a nominal type descriptor.
///
/// Followed immediately (at `size_of::<NominalTypeDescriptor>()`) by one
/// `u32` per generic parameter: the number of witness tables that parameter
/// carries.
#[repr(C)]
pub struct NominalTypeDescriptor {
    pub kind: usize,
    pub name: *const c_char,
    /// Struct/class: field count. Enum: packed [`EnumCaseCounts`].
    pub field_word0: u32,
    /// Struct/class: field-offset vector offset in words. Enum: empty cases.
    pub field_word1: u32,
    /// `\0`-separated names, terminated by an empty name.
    pub field_names: *const c_char,
    pub field_type_accessor: *const FieldTypeAccessor,
    /// Null for non-generic types.
    pub generic_pattern: *const PatternHeader,
    pub generic_param_vector_offset: u32,
    pub num_generic_params: u32,
    pub num_primary_params: u32,
}

impl NominalTypeDescriptor {
    pub fn nominal_kind(&self) -> Option<NominalTypeKind> {
        NominalTypeKind::from_word(self.kind)
    }

    pub fn name(&self) -> &str {
        if self.name.is_null() {
            return "";
        }
        // SAFETY: names are NUL-terminated constants
        unsafe { CStr::from_ptr(self.name) }.to_str().unwrap_or("")
    }

    /// `(field count, vector offset in words)` for structs and classes.
    pub fn field_offset_vector(&self) -> Option<(usize, usize)> {
        match self.nominal_kind()? {
            NominalTypeKind::Struct | NominalTypeKind::Class => {
                Some((self.field_word0 as usize, self.field_word1 as usize))
            }
            NominalTypeKind::Enum => None,
        }
    }

    /// Number of entries in this type's field-type vector.
    pub fn num_field_types(&self) -> usize {
        match self.nominal_kind() {
            Some(NominalTypeKind::Enum) => self.case_counts().payload_cases() as usize,
            Some(_) => self.field_word0 as usize,
            None => 0,
        }
    }

    pub fn case_counts(&self) -> EnumCaseCounts {
        EnumCaseCounts::from_bits(self.field_word0)
    }

    pub fn num_empty_cases(&self) -> usize {
        match self.nominal_kind() {
            Some(NominalTypeKind::Enum) => self.field_word1 as usize,
            _ => 0,
        }
    }

    /// Field names (struct/class) or case names (enum, payload cases first).
    pub fn field_names(&self) -> Vec<&str> {
        let mut names = Vec::new();
        let mut cursor = self.field_names;
        if cursor.is_null() {
            return names;
        }
        loop {
            // SAFETY: the list is a run of NUL-terminated strings ending in an empty one
            let name = unsafe { CStr::from_ptr(cursor) };
            let bytes = name.to_bytes();
            if bytes.is_empty() {
                break;
            }
            names.push(name.to_str().unwrap_or(""));
            // SAFETY: skip the name and its terminator; still inside the list
            cursor = unsafe { cursor.add(bytes.len() + 1) };
        }
        names
    }

    pub fn field_type_accessor(&self) -> Option<&'static FieldTypeAccessor> {
        // SAFETY: accessors are leaked at definition time and never freed
        unsafe { self.field_type_accessor.as_ref() }
    }

    /// Witness-table count per generic parameter.
    pub fn witness_counts(&self) -> &[u32] {
        if self.num_generic_params == 0 {
            return &[];
        }
        // SAFETY: the descriptor is emitted with one u32 per parameter right
        // after its fixed part
        unsafe {
            let first = std::ptr::from_ref(self).add(1).cast::<u32>();
            std::slice::from_raw_parts(first, self.num_generic_params as usize)
        }
    }

    /// Words in the generic argument vector: each parameter's metadata
    /// followed by its witness tables.
    pub fn num_generic_arguments(&self) -> usize {
        self.witness_counts()
            .iter()
            .map(|&n| 1 + n as usize)
            .sum()
    }

    pub fn is_generic(&self) -> bool {
        !self.generic_pattern.is_null()
    }
}

/// Layout of a protocol descriptor.
#[repr(C)]
pub struct ProtocolDescriptor {
    /// Always null; reserved for the legacy object runtime.
    pub isa: usize,
    pub name: *const c_char,
    /// Null, or a word count followed by that many descriptor pointers.
    pub inherited: *const usize,
    /// Legacy method tables; always null.
    pub legacy_tables: [usize; 5],
    pub size: u32,
    pub flags: u32,
}

impl ProtocolDescriptor {
    /// View the descriptor at `addr`.
    ///
    /// # Safety
    /// `addr` must be the address of an emitted protocol descriptor.
    pub unsafe fn from_addr<'a>(addr: usize) -> Option<&'a Self> {
        (addr as *const Self).as_ref()
    }

    pub fn name(&self) -> &str {
        if self.name.is_null() {
            return "";
        }
        // SAFETY: names are NUL-terminated constants
        unsafe { CStr::from_ptr(self.name) }.to_str().unwrap_or("")
    }

    pub fn flags(&self) -> ProtocolDescriptorFlags {
        ProtocolDescriptorFlags::from_bits(self.flags)
    }

    /// Directly inherited protocol descriptor addresses.
    pub fn inherited(&self) -> &[usize] {
        if self.inherited.is_null() {
            return &[];
        }
        // SAFETY: the list is a count word followed by that many words
        unsafe {
            let count = self.inherited.read();
            std::slice::from_raw_parts(self.inherited.add(1), count)
        }
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    reason = "tests use unwrap to panic on unexpected state"
)]
