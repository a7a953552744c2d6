//! Generic argument vectors and the witness tables that fill them.
//!
//! A generic record's argument vector holds, for each parameter in order,
//! the argument's metadata followed by one witness table per conformance
//! the parameter requires that needs a table.

use rustc_hash::FxHashMap;
use tymeta_ir::{DeclTable, NominalDecl, ProtocolId, TypeRef};
use tymeta_rt::{ArgumentSource, MetadataSource};

use crate::error::{MetadataError, Result};

/// One word of a generic argument vector.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum ArgumentWord {
    Metadata { param: u32 },
    WitnessTable { param: u32, protocol: ProtocolId },
}

/// The argument vector of one generic declaration.
#[derive(Clone, Debug, Default)]
pub struct ArgumentLayout {
    words: Vec<ArgumentWord>,
}

impl ArgumentLayout {
    pub fn of(table: &DeclTable, decl: &NominalDecl) -> Result<Self> {
        let mut words = Vec::new();
        for (param, generic) in (0u32..).zip(&decl.generic_params) {
            words.push(ArgumentWord::Metadata { param });
            for &protocol in &generic.conformances {
                let decl = table
                    .protocol(protocol)
                    .ok_or(MetadataError::UnknownProtocol(protocol))?;
                if decl.needs_witness_table() {
                    words.push(ArgumentWord::WitnessTable { param, protocol });
                }
            }
        }
        Ok(Self { words })
    }

    pub fn words(&self) -> &[ArgumentWord] {
        &self.words
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    fn index_of(&self, word: ArgumentWord) -> Option<u16> {
        let index = self.words.iter().position(|&w| w == word)?;
        u16::try_from(index).ok()
    }

    /// Index of parameter `param`'s metadata word.
    pub fn metadata_index(&self, param: u32) -> Option<u16> {
        self.index_of(ArgumentWord::Metadata { param })
    }

    /// Index of parameter `param`'s table for `protocol`.
    pub fn witness_index(&self, param: u32, protocol: ProtocolId) -> Option<u16> {
        self.index_of(ArgumentWord::WitnessTable { param, protocol })
    }

    /// Source of parameter `param`'s metadata in this context.
    pub fn param_source(&self, param: u32) -> Result<MetadataSource> {
        self.metadata_index(param)
            .map(MetadataSource::Argument)
            .ok_or_else(|| MetadataError::unimplemented("generic parameter outside its declaration"))
    }
}

/// Witness tables the front end has emitted, by conforming type.
#[derive(Default)]
pub struct Conformances {
    tables: FxHashMap<(TypeRef, ProtocolId), usize>,
}

impl Conformances {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that `ty` conforms to `protocol` through the table at
    /// `witness_table`. A later registration replaces an earlier one.
    pub fn register(&mut self, ty: TypeRef, protocol: ProtocolId, witness_table: usize) {
        tracing::trace!(?ty, protocol = protocol.raw(), witness_table, "conformance");
        self.tables.insert((ty, protocol), witness_table);
    }

    pub fn lookup(&self, ty: &TypeRef, protocol: ProtocolId) -> Option<usize> {
        self.tables.get(&(ty.clone(), protocol)).copied()
    }

    /// The word passing `ty`'s conformance to `protocol`, where `ty` appears
    /// inside a declaration with argument layout `context`.
    pub fn witness_source(
        &self,
        table: &DeclTable,
        ty: &TypeRef,
        protocol: ProtocolId,
        context: Option<&ArgumentLayout>,
    ) -> Result<ArgumentSource> {
        if let TypeRef::Param(param) = ty {
            if let Some(index) = context.and_then(|c| c.witness_index(*param, protocol)) {
                return Ok(ArgumentSource::Forward(index));
            }
        } else if let Some(address) = self.lookup(ty, protocol) {
            return Ok(ArgumentSource::WitnessTable(address));
        }
        let protocol_name = table
            .protocol(protocol)
            .map_or_else(|| format!("#{}", protocol.raw()), |p| table.name(p.name).to_owned());
        Err(MetadataError::MissingConformance {
            ty: describe(table, ty),
            protocol: protocol_name,
        })
    }
}

/// A short human-readable rendering of `ty` for diagnostics and accessor
/// names.
pub fn describe(table: &DeclTable, ty: &TypeRef) -> String {
    fn list(table: &DeclTable, types: &[TypeRef]) -> String {
        types
            .iter()
            .map(|t| describe(table, t))
            .collect::<Vec<_>>()
            .join(", ")
    }
    match ty {
        TypeRef::Builtin(builtin) => format!("{builtin:?}"),
        TypeRef::Nominal { decl, args } => {
            let name = table
                .nominal(*decl)
                .map_or_else(|| format!("#{}", decl.raw()), |d| table.name(d.name).to_owned());
            if args.is_empty() {
                name
            } else {
                format!("{name}<{}>", list(table, args))
            }
        }
        TypeRef::Param(n) => format!("T{n}"),
        TypeRef::Tuple(elements) => format!("({})", list(table, elements)),
        TypeRef::Function(function) => format!(
            "({}) -> {}",
            list(table, &function.params),
            describe(table, &function.result)
        ),
        TypeRef::Existential(protocols) if protocols.is_empty() => "Any".to_owned(),
        TypeRef::Existential(protocols) => protocols
            .iter()
            .map(|&p| {
                table
                    .protocol(p)
                    .map_or_else(|| format!("#{}", p.raw()), |d| table.name(d.name).to_owned())
            })
            .collect::<Vec<_>>()
            .join(" & "),
        TypeRef::Metatype(inner) => format!("{}.Type", describe(table, inner)),
        TypeRef::ExistentialMetatype(inner) => format!("{}.Protocol", describe(table, inner)),
        TypeRef::InOut(inner) => format!("inout {}", describe(table, inner)),
        TypeRef::Module => "module".to_owned(),
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    reason = "tests use unwrap to panic on unexpected state"
)]
mod tests;
