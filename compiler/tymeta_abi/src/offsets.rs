//! Fixed byte offsets within metadata records, relative to the address point.
//!
//! Only the fixed-shape prefix of each record lives here. Offsets of
//! per-type sections (field-offset vectors, generic arguments) are recorded
//! in the nominal type descriptor instead.

use crate::POINTER_SIZE;

const W: isize = POINTER_SIZE as isize;

// === Every record ===

/// Destructor of heap metadata (classes and boxes).
pub const HEAP_DESTROY: isize = -2 * W;
pub const VALUE_WITNESSES: isize = -W;
pub const KIND: isize = 0;

// === Struct and enum records ===

pub const VALUE_DESCRIPTOR: isize = W;
pub const VALUE_PARENT: isize = 2 * W;
/// First per-type member: field offsets (struct), payload size or generic
/// arguments (enum).
pub const VALUE_MEMBERS: isize = 3 * W;

// === Class records ===

pub const CLASS_SUPERCLASS: isize = W;
pub const CLASS_CACHE: isize = 2 * W;
pub const CLASS_VTABLE: isize = 3 * W;
pub const CLASS_RODATA: isize = 4 * W;
pub const CLASS_FLAGS: isize = 5 * W;
pub const CLASS_INSTANCE_ADDRESS_POINT: isize = 5 * W + 4;
pub const CLASS_INSTANCE_SIZE: isize = 5 * W + 8;
pub const CLASS_INSTANCE_ALIGN_MASK: isize = 5 * W + 12;
pub const CLASS_RESERVED: isize = 5 * W + 14;
pub const CLASS_SIZE: isize = 5 * W + 16;
pub const CLASS_ADDRESS_POINT: isize = 5 * W + 20;
pub const CLASS_DESCRIPTOR: isize = 5 * W + 24;
pub const CLASS_IVAR_DESTROYER: isize = 6 * W + 24;
/// First per-class member section (root class first).
pub const CLASS_MEMBERS: isize = 7 * W + 24;

// === Structural records ===

pub const TUPLE_NUM_ELEMENTS: isize = W;
pub const TUPLE_LABELS: isize = 2 * W;
/// `(metadata, offset)` word pairs.
pub const TUPLE_ELEMENTS: isize = 3 * W;

pub const FUNCTION_FLAGS: isize = W;
pub const FUNCTION_RESULT: isize = 2 * W;
pub const FUNCTION_ARGUMENTS: isize = 3 * W;

pub const METATYPE_INSTANCE: isize = W;
pub const EXISTENTIAL_METATYPE_FLAGS: isize = 2 * W;

pub const EXISTENTIAL_FLAGS: isize = W;
pub const EXISTENTIAL_NUM_PROTOCOLS: isize = 2 * W;
pub const EXISTENTIAL_PROTOCOLS: isize = 3 * W;

// === Box records ===

/// Byte offset of the boxed value from the object start.
pub const BOX_VALUE_OFFSET: isize = W;
/// Destroy plan executed when the box dies.
pub const BOX_PLAN: isize = 2 * W;
pub const BOX_ALLOC_SIZE: isize = 3 * W;
pub const BOX_ALLOC_ALIGN_MASK: isize = 4 * W;
