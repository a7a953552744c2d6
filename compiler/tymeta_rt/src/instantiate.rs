//! Generic metadata instantiation.
//!
//! A generic type's metadata is emitted as a [`PatternHeader`] followed by a
//! template of the instance record. The header's create function points at a
//! [`CreateFunction`] describing how to turn the template into an instance:
//! which argument words go where, which superclass sections to copy down,
//! and which universal initializer finishes the layout. The runtime owner of
//! a pattern, [`GenericPattern`], lives in the header's private data and
//! uniques instances per argument list.

use std::fmt;
use std::ptr::NonNull;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use smallvec::SmallVec;
use tymeta_abi::{
    offsets, FieldType, MetadataKind, GENERIC_PATTERN_HEADER_SIZE,
    NUM_GENERIC_METADATA_PRIVATE_DATA_WORDS, POINTER_ALIGN_MASK, POINTER_SIZE,
};

use crate::alloc::{tymeta_alloc, tymeta_free};
use crate::class::{init_class_layout, tymeta_register_legacy_class};
use crate::field_types::{field_type_vector, release_instance_vector};
use crate::layout::{tymeta_init_enum_metadata_universal, tymeta_init_struct_metadata_universal};
use crate::metadata::{write_word, Metadata, MetadataRef};
use crate::source::MetadataSource;

/// Header of a generic metadata pattern. The template follows directly.
#[repr(C)]
pub struct PatternHeader {
    pub create_function: *const CreateFunction,
    /// Template size in bytes.
    pub metadata_size: u32,
    pub num_arguments: u16,
    /// Offset of the address point within the template.
    pub address_point: u16,
    /// Owned by the runtime. Word 0 holds the pattern's [`GenericPattern`].
    pub private_data: [usize; NUM_GENERIC_METADATA_PRIVATE_DATA_WORDS],
}

const _: () = assert!(std::mem::size_of::<PatternHeader>() == GENERIC_PATTERN_HEADER_SIZE);

impl PatternHeader {
    pub fn template(&self) -> *const u8 {
        // SAFETY: the template is emitted directly after the header
        unsafe { (self as *const Self).add(1).cast() }
    }

    /// The runtime owner installed in the private data, if any.
    pub fn pattern(&self) -> Option<&'static GenericPattern> {
        // SAFETY: word 0 is null or a leaked GenericPattern
        unsafe { (self.private_data[0] as *const GenericPattern).as_ref() }
    }
}

/// Store argument word `source` at `dest` bytes from the address point.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub struct FillOp {
    pub source: u16,
    pub dest: isize,
}

/// Copy `len_words` words at `offset` from the instantiated superclass.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub struct AncestorCopy {
    pub offset: isize,
    pub len_words: usize,
}

/// Kind-specific last step of instantiation.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum InitHook {
    /// The template already holds the final layout.
    None,
    /// Lay out stored properties and fill the dependent value witnesses.
    Struct,
    /// Size the payload area and fill the dependent value witnesses.
    Enum,
    Class {
        /// Some stored property has a generic size.
        dependent_layout: bool,
        register_legacy: bool,
    },
}

/// How to build an instance from a pattern.
#[derive(Debug)]
pub struct CreateFunction {
    pub kind: MetadataKind,
    pub fill_ops: Vec<FillOp>,
    pub ancestor_copies: Vec<AncestorCopy>,
    /// Offset of the dependent value-witness region from the address point.
    pub dependent_witnesses: Option<isize>,
    /// Offset of the field-type vector slot from the address point.
    pub field_type_slot: Option<isize>,
    pub superclass: Option<MetadataSource>,
    pub init: InitHook,
}

impl CreateFunction {
    pub fn leak(self) -> &'static Self {
        Box::leak(Box::new(self))
    }

    /// Build a fresh, unpublished instance.
    fn create(&self, header: &PatternHeader, args: &[usize]) -> Option<MetadataRef> {
        let metadata = if self.kind == MetadataKind::Class {
            let superclass = match &self.superclass {
                Some(source) => Some(source.resolve(args)?),
                None => None,
            };
            allocate_class(header, self, args, superclass)?
        } else {
            allocate_value(header, self, args)?
        };
        self.initialize(metadata);
        Some(metadata)
    }

    fn initialize(&self, metadata: MetadataRef) {
        match self.init {
            InitHook::None => {}
            InitHook::Struct => init_struct(metadata),
            InitHook::Enum => init_enum(metadata),
            InitHook::Class {
                dependent_layout,
                register_legacy,
            } => {
                if dependent_layout {
                    init_class_layout(metadata);
                }
                if register_legacy {
                    tymeta_register_legacy_class(metadata.as_ptr());
                }
            }
        }
    }
}

/// Mutable pointer to a word vector `words` words from the address point.
fn vector_ptr(metadata: MetadataRef, words: usize) -> *mut usize {
    (metadata.addr() + words * POINTER_SIZE) as *mut usize
}

fn field_metadata(metadata: MetadataRef) -> Option<SmallVec<[*const Metadata; 8]>> {
    field_type_vector(metadata)
        .iter()
        .map(|ty| MetadataRef::from_addr(ty.type_address()).map(MetadataRef::as_ptr))
        .collect()
}

fn init_struct(metadata: MetadataRef) {
    let Some(fields) = field_metadata(metadata) else {
        tracing::error!("struct instance has an unresolved field type");
        return;
    };
    let offsets = metadata
        .descriptor()
        .and_then(|d| d.field_offset_vector())
        .map_or(std::ptr::null_mut(), |(_, words)| vector_ptr(metadata, words));
    tymeta_init_struct_metadata_universal(metadata.as_ptr(), fields.len(), fields.as_ptr(), offsets);
}

fn init_enum(metadata: MetadataRef) {
    let payloads: &[FieldType] = field_type_vector(metadata);
    tymeta_init_enum_metadata_universal(metadata.as_ptr(), payloads.len(), payloads.as_ptr());
}

/// Copy the template and run the fill operations.
fn allocate_value(
    header: &PatternHeader,
    create: &CreateFunction,
    args: &[usize],
) -> Option<MetadataRef> {
    let size = header.metadata_size as usize;
    let base = tymeta_alloc(size, POINTER_ALIGN_MASK);
    if base.is_null() {
        return None;
    }
    // SAFETY: the template is `size` bytes and base is a fresh allocation
    unsafe { std::ptr::copy_nonoverlapping(header.template(), base, size) };
    // SAFETY: the address point lies inside the template
    let address_point = unsafe { base.add(usize::from(header.address_point)) };

    for op in &create.fill_ops {
        let Some(&word) = args.get(usize::from(op.source)) else {
            tymeta_free(base, size, POINTER_ALIGN_MASK);
            return None;
        };
        // SAFETY: fill destinations lie inside the template
        unsafe { write_word(address_point, op.dest, word) };
        tracing::trace!(source = op.source, dest = op.dest, "fill");
    }
    if let Some(region) = create.dependent_witnesses {
        let table = address_point as usize as isize + region;
        // SAFETY: the value-witness slot precedes the address point
        unsafe { write_word(address_point, offsets::VALUE_WITNESSES, table as usize) };
    }
    MetadataRef::new(address_point.cast())
}

/// Value allocation plus the superclass link and ancestor copies.
fn allocate_class(
    header: &PatternHeader,
    create: &CreateFunction,
    args: &[usize],
    superclass: Option<MetadataRef>,
) -> Option<MetadataRef> {
    let metadata = allocate_value(header, create, args)?;
    let Some(superclass) = superclass else {
        return Some(metadata);
    };
    let base = metadata.as_ptr().cast_mut().cast::<u8>();
    // SAFETY: the instance is unpublished; ancestor sections lie inside both
    // records because the subclass extends the superclass layout
    unsafe {
        write_word(base, offsets::CLASS_SUPERCLASS, superclass.addr());
        for copy in &create.ancestor_copies {
            for i in 0..copy.len_words as isize {
                let at = copy.offset + i * POINTER_SIZE as isize;
                write_word(base, at, superclass.word(at));
            }
        }
    }
    Some(metadata)
}

/// Free an instance that lost the publication race.
fn discard(header: &PatternHeader, create: &CreateFunction, metadata: MetadataRef) {
    if let Some(slot) = create.field_type_slot {
        release_instance_vector(metadata, slot);
    }
    let base = (metadata.addr() - usize::from(header.address_point)) as *mut u8;
    tymeta_free(base, header.metadata_size as usize, POINTER_ALIGN_MASK);
}

/// Runtime owner of a pattern: uniques instances per argument list.
pub struct GenericPattern {
    name: String,
    header: NonNull<PatternHeader>,
    create: &'static CreateFunction,
    cache: DashMap<SmallVec<[usize; 4]>, usize>,
}

// SAFETY: the header is immutable after install; the cache is concurrent
unsafe impl Send for GenericPattern {}
// SAFETY: see above
unsafe impl Sync for GenericPattern {}

impl GenericPattern {
    /// Attach a runtime owner to an emitted pattern, storing it in the
    /// header's private data. Returns `None` if the header names no create
    /// function.
    ///
    /// # Safety
    /// `header` must point at a writable, never-freed pattern whose create
    /// function pointer refers to a leaked [`CreateFunction`], and no other
    /// thread may use the pattern yet.
    pub unsafe fn install(
        name: impl Into<String>,
        header: *mut PatternHeader,
    ) -> Option<&'static Self> {
        let header = NonNull::new(header)?;
        let create = header.as_ref().create_function.as_ref()?;
        let pattern: &'static Self = Box::leak(Box::new(Self {
            name: name.into(),
            header,
            create,
            cache: DashMap::new(),
        }));
        (*header.as_ptr()).private_data[0] = std::ptr::from_ref(pattern) as usize;
        tracing::debug!(pattern = %pattern.name, "installed generic pattern");
        Some(pattern)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn header(&self) -> &PatternHeader {
        // SAFETY: installed headers are never freed
        unsafe { self.header.as_ref() }
    }

    pub fn create_function(&self) -> &'static CreateFunction {
        self.create
    }

    /// Number of distinct instances published so far.
    pub fn instance_count(&self) -> usize {
        self.cache.len()
    }

    /// The unique instance for `args`, creating it on first request.
    ///
    /// Concurrent first requests may each build an instance; one is
    /// published and the others are freed.
    pub fn get(&self, args: &[usize]) -> Option<MetadataRef> {
        let header = self.header();
        if args.len() != usize::from(header.num_arguments) {
            tracing::error!(
                pattern = %self.name,
                expected = header.num_arguments,
                got = args.len(),
                "generic argument count mismatch"
            );
            return None;
        }
        if let Some(hit) = self.cache.get(args) {
            return MetadataRef::from_addr(*hit);
        }

        let created = self.create.create(header, args)?;
        match self.cache.entry(SmallVec::from_slice(args)) {
            Entry::Occupied(winner) => {
                let winner = *winner.get();
                tracing::trace!(pattern = %self.name, "instantiation lost race");
                discard(header, self.create, created);
                MetadataRef::from_addr(winner)
            }
            Entry::Vacant(slot) => {
                slot.insert(created.addr());
                tracing::debug!(pattern = %self.name, metadata = ?created.as_ptr(), "instantiated");
                Some(created)
            }
        }
    }
}

impl fmt::Debug for GenericPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GenericPattern")
            .field("name", &self.name)
            .field("instances", &self.cache.len())
            .finish_non_exhaustive()
    }
}

/// Whether a record's value-witness table lives inside the record itself.
pub fn has_dependent_witnesses(metadata: MetadataRef) -> bool {
    let Some(header) = metadata
        .descriptor()
        .and_then(|d| {
            // SAFETY: generic descriptors point at their never-freed pattern
            unsafe { d.generic_pattern.as_ref() }
        })
    else {
        return false;
    };
    let base = metadata.addr() - usize::from(header.address_point);
    let table = metadata.word(offsets::VALUE_WITNESSES);
    (base..base + header.metadata_size as usize).contains(&table)
}

// === C entry points ===

fn pattern_of(header: *const PatternHeader) -> Option<&'static GenericPattern> {
    // SAFETY: generated code passes installed pattern headers
    unsafe { header.as_ref()?.pattern() }
}

fn args_slice<'a>(header: *const PatternHeader, args: *const usize) -> Option<&'a [usize]> {
    // SAFETY: header is a pattern header; args holds num_arguments words
    unsafe {
        let count = usize::from(header.as_ref()?.num_arguments);
        if count == 0 {
            return Some(&[]);
        }
        if args.is_null() {
            return None;
        }
        Some(std::slice::from_raw_parts(args, count))
    }
}

fn to_ptr(metadata: Option<MetadataRef>) -> *const Metadata {
    metadata.map_or(std::ptr::null(), MetadataRef::as_ptr)
}

/// Instance of `pattern` for the argument vector `args`.
#[no_mangle]
pub extern "C" fn tymeta_get_generic_metadata(
    pattern: *const PatternHeader,
    args: *const usize,
) -> *const Metadata {
    let Some(owner) = pattern_of(pattern) else {
        return std::ptr::null();
    };
    to_ptr(args_slice(pattern, args).and_then(|a| owner.get(a)))
}

#[no_mangle]
pub extern "C" fn tymeta_get_generic_metadata1(
    pattern: *const PatternHeader,
    arg0: usize,
) -> *const Metadata {
    to_ptr(pattern_of(pattern).and_then(|p| p.get(&[arg0])))
}

#[no_mangle]
pub extern "C" fn tymeta_get_generic_metadata2(
    pattern: *const PatternHeader,
    arg0: usize,
    arg1: usize,
) -> *const Metadata {
    to_ptr(pattern_of(pattern).and_then(|p| p.get(&[arg0, arg1])))
}

#[no_mangle]
pub extern "C" fn tymeta_get_generic_metadata3(
    pattern: *const PatternHeader,
    arg0: usize,
    arg1: usize,
    arg2: usize,
) -> *const Metadata {
    to_ptr(pattern_of(pattern).and_then(|p| p.get(&[arg0, arg1, arg2])))
}

#[no_mangle]
pub extern "C" fn tymeta_get_generic_metadata4(
    pattern: *const PatternHeader,
    arg0: usize,
    arg1: usize,
    arg2: usize,
    arg3: usize,
) -> *const Metadata {
    to_ptr(pattern_of(pattern).and_then(|p| p.get(&[arg0, arg1, arg2, arg3])))
}

/// Allocate an uninitialized-layout value instance: template copy, fill
/// operations and the dependent value-witness link. Not uniqued.
#[no_mangle]
pub extern "C" fn tymeta_allocate_generic_value_metadata(
    pattern: *const PatternHeader,
    args: *const usize,
) -> *const Metadata {
    let Some(owner) = pattern_of(pattern) else {
        return std::ptr::null();
    };
    let Some(args) = args_slice(pattern, args) else {
        return std::ptr::null();
    };
    to_ptr(allocate_value(owner.header(), owner.create, args))
}

/// As [`tymeta_allocate_generic_value_metadata`], also linking `superclass`
/// and copying its ancestor sections. Not uniqued.
#[no_mangle]
pub extern "C" fn tymeta_allocate_generic_class_metadata(
    pattern: *const PatternHeader,
    args: *const usize,
    superclass: *const Metadata,
) -> *const Metadata {
    let Some(owner) = pattern_of(pattern) else {
        return std::ptr::null();
    };
    let Some(args) = args_slice(pattern, args) else {
        return std::ptr::null();
    };
    to_ptr(allocate_class(
        owner.header(),
        owner.create,
        args,
        MetadataRef::new(superclass),
    ))
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    reason = "tests use unwrap to panic on unexpected state"
)]
mod tests;
