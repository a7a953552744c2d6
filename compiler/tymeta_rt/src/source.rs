//! Where a runtime computation finds a metadata record.
//!
//! Fill operations, field-type vectors and superclass links all describe
//! their inputs as a [`MetadataSource`], evaluated against the generic
//! argument words of the record being built or read.

use std::sync::OnceLock;

use smallvec::SmallVec;
use tymeta_abi::FunctionTypeFlags;

use crate::cache::MetadataAccessor;
use crate::instantiate::GenericPattern;
use crate::metadata::MetadataRef;
use crate::structural;

/// A recipe for a metadata record.
#[derive(Clone, Debug)]
pub enum MetadataSource {
    /// A record known when the source was built.
    Direct(MetadataRef),
    /// Generic argument word `n` of the context.
    Argument(u16),
    /// A lazily computed record.
    Accessor(&'static MetadataAccessor),
    /// An instantiation of a generic pattern.
    Generic {
        pattern: &'static GenericPattern,
        args: Vec<ArgumentSource>,
    },
    Tuple(Vec<MetadataSource>),
    Function {
        flags: FunctionTypeFlags,
        /// Parameter type and whether it is `inout`.
        params: Vec<(MetadataSource, bool)>,
        result: Box<MetadataSource>,
    },
    Metatype(Box<MetadataSource>),
    ExistentialMetatype(Box<MetadataSource>),
    /// A protocol composition, by protocol descriptor address.
    Existential(Vec<usize>),
    /// A source set once the record it names has been built; used by
    /// types that refer to themselves.
    Deferred(&'static OnceLock<MetadataSource>),
}

/// One word of a generic argument vector.
#[derive(Clone, Debug)]
pub enum ArgumentSource {
    Metadata(MetadataSource),
    /// A witness table known when the source was built.
    WitnessTable(usize),
    /// Argument word `n` of the context, metadata or witness table.
    Forward(u16),
}

impl MetadataSource {
    /// Evaluate against `args`, the argument words of the context record.
    ///
    /// Returns `None` if an argument index is out of range or a nested
    /// instantiation fails.
    pub fn resolve(&self, args: &[usize]) -> Option<MetadataRef> {
        match self {
            Self::Direct(metadata) => Some(*metadata),
            Self::Argument(n) => MetadataRef::from_addr(*args.get(usize::from(*n))?),
            Self::Accessor(accessor) => Some(accessor.get()),
            Self::Generic { pattern, args: sources } => {
                let words = sources
                    .iter()
                    .map(|s| s.resolve(args))
                    .collect::<Option<SmallVec<[usize; 4]>>>()?;
                pattern.get(&words)
            }
            Self::Tuple(elements) => {
                let elements = elements
                    .iter()
                    .map(|e| e.resolve(args))
                    .collect::<Option<SmallVec<[MetadataRef; 4]>>>()?;
                Some(structural::tuple_metadata(&elements, std::ptr::null()))
            }
            Self::Function { flags, params, result } => {
                let params = params
                    .iter()
                    .map(|(p, inout)| Some((p.resolve(args)?, *inout)))
                    .collect::<Option<SmallVec<[(MetadataRef, bool); 4]>>>()?;
                let result = result.resolve(args)?;
                Some(structural::function_metadata(*flags, &params, result))
            }
            Self::Metatype(instance) => {
                Some(structural::metatype_metadata(instance.resolve(args)?))
            }
            Self::ExistentialMetatype(instance) => Some(
                structural::existential_metatype_metadata(instance.resolve(args)?),
            ),
            Self::Existential(protocols) => Some(structural::existential_metadata(protocols)),
            Self::Deferred(cell) => cell.get()?.resolve(args),
        }
    }

    /// Whether evaluating this source reads the context's arguments.
    pub fn uses_arguments(&self) -> bool {
        match self {
            Self::Argument(_) => true,
            Self::Direct(_) | Self::Accessor(_) | Self::Existential(_) => false,
            Self::Generic { args, .. } => args.iter().any(ArgumentSource::uses_arguments),
            Self::Tuple(elements) => elements.iter().any(Self::uses_arguments),
            Self::Function { params, result, .. } => {
                result.uses_arguments() || params.iter().any(|(p, _)| p.uses_arguments())
            }
            Self::Metatype(inner) | Self::ExistentialMetatype(inner) => inner.uses_arguments(),
            Self::Deferred(cell) => cell.get().is_some_and(Self::uses_arguments),
        }
    }
}

impl ArgumentSource {
    pub fn resolve(&self, args: &[usize]) -> Option<usize> {
        match self {
            Self::Metadata(source) => source.resolve(args).map(MetadataRef::addr),
            Self::WitnessTable(table) => Some(*table),
            Self::Forward(n) => args.get(usize::from(*n)).copied(),
        }
    }

    pub fn uses_arguments(&self) -> bool {
        match self {
            Self::Metadata(source) => source.uses_arguments(),
            Self::WitnessTable(_) => false,
            Self::Forward(_) => true,
        }
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    reason = "tests use unwrap to panic on unexpected state"
)]
