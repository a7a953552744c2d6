//! Runtime type-metadata ABI.
//!
//! Everything in this crate is part of the binary contract between the
//! metadata generator (`tymeta_gen`) and the runtime (`tymeta_rt`). Values
//! defined here are written into metadata records by one side and read back
//! by the other, so they must stay bit-exact across independently compiled
//! modules.
//!
//! # Contents
//!
//! - [`MetadataKind`] / [`NominalTypeKind`]: the kind word at a record's
//!   address point and in nominal type descriptors.
//! - Flag codecs ([`flags`]): packed-integer value types with `with_*`
//!   builders and masked getters.
//! - [`ValueWitnessFlags`]: the flags word of a value-witness table.
//! - [`ReferenceCounting`]: reference-counting kinds and the dispatcher
//!   table mapping each kind to its runtime operation set.
//! - [`RuntimeFn`]: the catalogue of runtime entry points the generator calls.
//! - [`offsets`]: fixed offsets within each record kind.
//!
//! # Design
//!
//! Codecs are `Copy` newtypes over a fixed-width integer. Equality and hashing
//! are derived from the raw bits, so a codec value can be used directly as a
//! cache key.

mod builtin;
mod flags;
mod kind;
pub mod offsets;
mod refcount;
mod runtime_fn;
mod value_witness;

pub use builtin::{enum_tag_size, BuiltinType};
pub use flags::{
    ClassFlags, EnumCaseCounts, ExistentialTypeFlags, FieldType, FunctionMetadataConvention,
    FunctionTypeFlags, ProtocolClassConstraint, ProtocolConformanceFlags,
    ProtocolConformanceReferenceKind, ProtocolConformanceTypeKind, ProtocolDescriptorFlags,
    ProtocolDispatchStrategy, SpecialProtocol,
};
pub use kind::{MetadataKind, NominalTypeKind};
pub use refcount::{PointerRepr, RefCountOps, ReferenceCounting, WeakOps};
pub use runtime_fn::{AbiType, RuntimeFn, RuntimeFnSig};
pub use value_witness::ValueWitnessFlags;

/// Size of a pointer (and of a metadata "word") on the host target.
pub const POINTER_SIZE: usize = std::mem::size_of::<usize>();

/// Alignment mask of a pointer-sized field.
pub const POINTER_ALIGN_MASK: usize = std::mem::align_of::<usize>() - 1;

/// Number of words in the private-data block of a generic metadata pattern.
///
/// The runtime owns this area; the generator only reserves it.
pub const NUM_GENERIC_METADATA_PRIVATE_DATA_WORDS: usize = 16;

/// Byte size of a generic metadata pattern header:
/// `[create-fn][u32 size][u16 arg count][u16 address point][private data]`.
pub const GENERIC_PATTERN_HEADER_SIZE: usize =
    POINTER_SIZE + 4 + 2 + 2 + NUM_GENERIC_METADATA_PRIVATE_DATA_WORDS * POINTER_SIZE;

/// Bit 0 of a class record's rodata word marks a natively compiled class.
pub const CLASS_RODATA_NATIVE_BIT: usize = 1;

/// Round `offset` up to the next multiple of `align_mask + 1`.
#[inline]
#[must_use]
pub const fn round_up(offset: usize, align_mask: usize) -> usize {
    (offset + align_mask) & !align_mask
}
