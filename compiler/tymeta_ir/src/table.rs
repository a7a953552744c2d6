//! Arena of declarations.

use crate::{Name, NominalDecl, ProtocolDecl, StringInterner, TypeRef};

/// Index of a nominal declaration in a [`DeclTable`].
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug)]
pub struct DeclId(u32);

impl DeclId {
    pub const fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    pub const fn raw(self) -> u32 {
        self.0
    }
}

/// Index of a protocol declaration in a [`DeclTable`].
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug)]
pub struct ProtocolId(u32);

impl ProtocolId {
    pub const fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    pub const fn raw(self) -> u32 {
        self.0
    }
}

/// Every declaration the generator may be asked about.
#[derive(Default)]
pub struct DeclTable {
    interner: StringInterner,
    nominals: Vec<NominalDecl>,
    protocols: Vec<ProtocolDecl>,
}

impl DeclTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn interner(&self) -> &StringInterner {
        &self.interner
    }

    pub fn intern(&self, s: &str) -> Name {
        self.interner.intern(s)
    }

    pub fn name(&self, name: Name) -> &'static str {
        self.interner.lookup(name)
    }

    /// Reserve an id before the declaration exists, for self-referential
    /// types. The placeholder is an empty struct until [`define`](Self::define).
    pub fn declare(&mut self, name: &str) -> DeclId {
        let name = self.intern(name);
        self.add_nominal(NominalDecl::new(name, crate::NominalKind::Struct))
    }

    /// Replace a declared placeholder.
    pub fn define(&mut self, id: DeclId, decl: NominalDecl) {
        if let Some(slot) = self.nominals.get_mut(id.0 as usize) {
            *slot = decl;
        }
    }

    pub fn add_nominal(&mut self, decl: NominalDecl) -> DeclId {
        let id = DeclId(u32::try_from(self.nominals.len()).unwrap_or(u32::MAX));
        self.nominals.push(decl);
        id
    }

    pub fn add_protocol(&mut self, decl: ProtocolDecl) -> ProtocolId {
        let id = ProtocolId(u32::try_from(self.protocols.len()).unwrap_or(u32::MAX));
        self.protocols.push(decl);
        id
    }

    pub fn nominal(&self, id: DeclId) -> Option<&NominalDecl> {
        self.nominals.get(id.0 as usize)
    }

    pub fn protocol(&self, id: ProtocolId) -> Option<&ProtocolDecl> {
        self.protocols.get(id.0 as usize)
    }

    pub fn nominal_ids(&self) -> impl Iterator<Item = DeclId> + '_ {
        (0..self.nominals.len()).filter_map(|i| u32::try_from(i).ok().map(DeclId))
    }

    /// Class ancestry from the root down to `id` itself, each with the
    /// arguments that bind it, expressed in terms of `id`'s own parameters.
    pub fn class_hierarchy(&self, id: DeclId) -> Vec<(DeclId, Vec<TypeRef>)> {
        let Some(decl) = self.nominal(id) else {
            return Vec::new();
        };
        let own_args: Vec<TypeRef> = (0..decl.generic_params.len())
            .filter_map(|i| u32::try_from(i).ok().map(TypeRef::Param))
            .collect();
        let mut chain = vec![(id, own_args)];
        let mut current = decl.superclass.clone();
        // A malformed cycle stops at the table size.
        while let Some(TypeRef::Nominal { decl: sup, args }) = current {
            if chain.len() > self.nominals.len() {
                break;
            }
            let outer = chain.last().map(|(_, a)| a.clone()).unwrap_or_default();
            let bound: Vec<TypeRef> = args.iter().map(|a| a.substitute(&outer)).collect();
            current = self.nominal(sup).and_then(|d| d.superclass.clone());
            chain.push((sup, bound));
        }
        chain.reverse();
        chain
    }

    /// Whether any strict ancestor of class `id` is generic.
    pub fn has_generic_ancestor(&self, id: DeclId) -> bool {
        let chain = self.class_hierarchy(id);
        chain
            .iter()
            .take(chain.len().saturating_sub(1))
            .any(|(anc, _)| self.nominal(*anc).is_some_and(NominalDecl::is_generic))
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    reason = "tests use unwrap to panic on unexpected state"
)]
mod tests;
