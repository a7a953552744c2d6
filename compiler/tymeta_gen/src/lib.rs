//! Type-metadata generator.
//!
//! Builds the runtime type information of a [`DeclTable`](tymeta_ir::DeclTable):
//! metadata records and generic patterns for nominal types, nominal and
//! protocol descriptors, lazily published field-type vectors, memoized
//! metadata accessors and box types. Every constant goes through a
//! [`CodegenSink`]; [`MaterializingSink`] places them in process memory so
//! the runtime (`tymeta_rt`) can execute what was generated.
//!
//! # Pipeline
//!
//! 1. [`TypeInfoCx`] classifies a type's layout as fixed or non-fixed.
//! 2. [`scan`] walks the slots of a record shape; [`record`] writes them.
//! 3. [`MetadataGenerator`] decides per declaration between a constant
//!    record, a pattern, or a constant class record completed by its
//!    accessor, and hands out [`AccessStrategy`]s and accessors per type.
//!
//! # Debug Environment Variables
//!
//! - `RUST_LOG=tymeta_gen=debug`: one event per record, pattern, accessor
//!   and protocol descriptor. Call [`init_tracing`] first.
//! - `RUST_LOG=tymeta_gen::record=trace`: every slot written.
//! - `TYMETA_DIRECT_ACCESS`, `TYMETA_LEGACY_INTEROP`: read by
//!   [`GenOptions::from_env`].

#![warn(clippy::allow_attributes_without_reason)]
#![allow(
    unsafe_code,
    reason = "generated images are patched in place and patterns installed in them"
)]
#![allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_possible_wrap,
    reason = "record offsets are signed byte distances from the address point"
)]

pub mod boxes;
pub mod buffer;
pub mod conformance;
pub mod descriptor;
pub mod error;
pub mod generator;
pub mod layout;
pub mod options;
pub mod protocol;
pub mod record;
pub mod scan;
pub mod sink;
pub mod symbol;
#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    reason = "tests use unwrap to panic on unexpected state"
)]
mod test_support;
pub mod type_info;

use std::sync::Once;

pub use boxes::{BoxRegistry, BoxShape, BoxType};
pub use buffer::ConstantBuffer;
pub use conformance::Conformances;
pub use error::{ErrorCode, MetadataError, Result};
pub use generator::{AccessStrategy, Emitted, MetadataGenerator};
pub use options::{CacheOrdering, GenOptions};
pub use sink::{CodegenSink, MaterializingSink};
pub use symbol::{Linkage, Symbol};
pub use type_info::{FixedLayout, TypeInfo, TypeInfoCx};

static TRACING_INIT: Once = Once::new();

/// Initialize tracing for debug output.
///
/// Safe to call more than once. Does nothing unless `RUST_LOG` is set.
pub fn init_tracing() {
    TRACING_INIT.call_once(|| {
        use tracing_subscriber::{fmt, prelude::*, EnvFilter};

        if std::env::var("RUST_LOG").is_ok() {
            tracing_subscriber::registry()
                .with(fmt::layer().with_target(true).with_level(true))
                .with(EnvFilter::from_default_env())
                .init();
        }
    });
}
