//! Type-metadata runtime (`libtymeta_rt`).
//!
//! C-ABI functions called by generated code and by the metadata generator
//! when it executes what it builds.
//!
//! # Build Modes
//!
//! - **rlib**: for Rust consumers (`tymeta_gen`, tests)
//! - **staticlib**: for linking into compiled programs
//!
//! # Function Categories
//!
//! - **Memory**: `tymeta_alloc`, `tymeta_free`
//! - **Heap objects**: `tymeta_alloc_object`, `tymeta_dealloc_object`, native
//!   retain/release, unowned and weak references
//! - **Per-kind reference counting**: unknown, legacy, bridge, block and error
//!   references
//! - **Boxes**: `tymeta_alloc_box`, `tymeta_project_box`, `tymeta_dealloc_box`
//! - **Generic metadata**: `tymeta_get_generic_metadata*`, allocation of
//!   instances from patterns, universal struct/enum/class layout
//! - **Classes**: superclass linking, legacy registration, instance destroy
//! - **Structural metadata**: tuples, functions, metatypes, existentials
//! - **Images**: generated constants copied into process memory
//!
//! # Safety
//!
//! Entry points use `#[no_mangle]` and `extern "C"`. Functions that take raw
//! pointers are called by generated code which guarantees valid pointers.
//! They're not marked `unsafe` because they're FFI entry points, not Rust API
//! functions. Every entry point tolerates null where a null is meaningful
//! (an empty reference) and returns null or does nothing.
//!
//! Everything this runtime publishes (metadata, patterns, caches, box
//! descriptors) lives until process exit.

#![warn(clippy::allow_attributes_without_reason)]
#![allow(
    unsafe_code,
    reason = "C-ABI runtime functions require unsafe for raw pointer operations"
)]
#![allow(
    clippy::not_unsafe_ptr_arg_deref,
    reason = "FFI entry points receive pointers from generated code which guarantees validity"
)]
#![allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_possible_wrap,
    clippy::cast_ptr_alignment,
    reason = "metadata records are word arrays addressed by signed byte offsets"
)]

pub mod alloc;
pub mod boxes;
pub mod cache;
pub mod class;
pub mod descriptor;
pub mod field_types;
pub mod heap;
pub mod image;
pub mod instantiate;
pub mod layout;
pub mod metadata;
pub mod refcount;
pub mod source;
pub mod structural;
pub mod symbols;
#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    reason = "tests use unwrap to panic on unexpected state"
)]
mod test_support;
pub mod weak;
pub mod witness;

pub use cache::{LazyCacheCell, MetadataAccessor};
pub use field_types::{FieldTypeAccessor, FieldTypeSlot, FieldTypeSource, Publish};
pub use heap::HeapObject;
pub use image::Image;
pub use instantiate::{
    AncestorCopy, CreateFunction, FillOp, GenericPattern, InitHook, PatternHeader,
};
pub use metadata::{Metadata, MetadataRef, ValueWitnessTable};
pub use source::{ArgumentSource, MetadataSource};
pub use symbols::{runtime_address, runtime_fn_at};
