//! A metadata generation session.
//!
//! [`MetadataGenerator`] owns everything generated for one declaration
//! table: nominal records and patterns (memoized per declaration), protocol
//! descriptors, metadata accessors (memoized per type), box records and the
//! registered conformances. Constants go to the session's [`CodegenSink`].

mod access;
mod nominal;

use std::sync::OnceLock;

use rustc_hash::FxHashMap;
use tymeta_ir::{DeclId, DeclTable, ProtocolId, TypeRef};
use tymeta_rt::{ArgumentSource, MetadataAccessor, MetadataSource};

use crate::boxes::{BoxRegistry, BoxType};
use crate::conformance::Conformances;
use crate::error::Result;
use crate::options::GenOptions;
use crate::sink::CodegenSink;
use crate::symbol::Linkage;
use crate::type_info::{TypeInfo, TypeInfoCx};

pub use nominal::Emitted;

use nominal::ClassSummary;

/// How code reaches a type's metadata.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum AccessStrategy {
    /// The record's address is a constant.
    Direct,
    /// Through an accessor with this linkage.
    Accessor(Linkage),
}

/// A self-reference met while its declaration was still being built.
type PendingSource = (&'static OnceLock<MetadataSource>, Vec<ArgumentSource>);

enum DeclState {
    Building(Vec<PendingSource>),
    Built(BuiltDecl),
}

#[derive(Clone)]
struct BuiltDecl {
    emitted: Emitted,
    class: Option<ClassSummary>,
}

/// Generates metadata for the declarations of one table.
pub struct MetadataGenerator<'t, S> {
    table: &'t DeclTable,
    options: GenOptions,
    sink: S,
    decls: FxHashMap<DeclId, DeclState>,
    protocols: FxHashMap<ProtocolId, usize>,
    accessors: FxHashMap<TypeRef, &'static MetadataAccessor>,
    conformances: Conformances,
    boxes: BoxRegistry,
}

impl<'t, S: CodegenSink> MetadataGenerator<'t, S> {
    pub fn new(table: &'t DeclTable, options: GenOptions, sink: S) -> Self {
        Self {
            table,
            options,
            sink,
            decls: FxHashMap::default(),
            protocols: FxHashMap::default(),
            accessors: FxHashMap::default(),
            conformances: Conformances::new(),
            boxes: BoxRegistry::new(),
        }
    }

    pub fn table(&self) -> &'t DeclTable {
        self.table
    }

    pub fn options(&self) -> &GenOptions {
        &self.options
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// Make `witness_table` the conformance of `ty` to `protocol` used when
    /// `ty` binds a parameter that requires it.
    pub fn register_conformance(&mut self, ty: TypeRef, protocol: ProtocolId, witness_table: usize) {
        self.conformances.register(ty, protocol, witness_table);
    }

    fn type_cx(&self) -> TypeInfoCx<'_> {
        TypeInfoCx::new(self.table, &self.options)
    }

    pub fn type_info(&self, ty: &TypeRef) -> Result<TypeInfo> {
        self.type_cx().type_info(ty)
    }

    /// The box type for values of `ty`.
    pub fn box_for(&mut self, ty: &TypeRef) -> Result<BoxType> {
        let info = self.type_info(ty)?;
        let metadata = self.metadata(ty)?;
        Ok(self.boxes.box_type(info, metadata))
    }

    pub fn boxes(&self) -> &BoxRegistry {
        &self.boxes
    }

    /// Check that every referenced global was defined and hand back the
    /// sink.
    pub fn finish(self) -> Result<S> {
        self.sink.finish()?;
        tracing::debug!(
            decls = self.decls.len(),
            protocols = self.protocols.len(),
            accessors = self.accessors.len(),
            boxes = self.boxes.num_records(),
            "metadata generation finished"
        );
        Ok(self.sink)
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    reason = "tests use unwrap to panic on unexpected state"
)]
