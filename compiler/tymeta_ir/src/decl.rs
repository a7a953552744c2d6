//! Nominal type and protocol declarations.

use crate::{Name, ProtocolId, TypeRef};
use tymeta_abi::{NominalTypeKind, ProtocolDispatchStrategy, SpecialProtocol};

/// Struct, enum or class.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum NominalKind {
    Struct,
    Enum,
    Class,
}

impl NominalKind {
    pub const fn descriptor_kind(self) -> NominalTypeKind {
        match self {
            Self::Struct => NominalTypeKind::Struct,
            Self::Enum => NominalTypeKind::Enum,
            Self::Class => NominalTypeKind::Class,
        }
    }
}

/// Linkage of a declaration as seen by other modules.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Default)]
pub enum FormalLinkage {
    /// Visible everywhere, defined once.
    #[default]
    PublicUnique,
    /// Visible inside the defining module only, defined once.
    HiddenUnique,
    /// Visible inside its file only.
    Private,
    /// Visible everywhere, may be defined by several modules.
    PublicNonUnique,
}

/// Reference ownership of a stored field.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Default)]
pub enum Ownership {
    #[default]
    Strong,
    Weak,
    Unowned,
}

#[derive(Clone, Eq, PartialEq, Hash, Debug)]
pub struct FieldDecl {
    pub name: Name,
    pub ty: TypeRef,
    pub ownership: Ownership,
}

#[derive(Clone, Eq, PartialEq, Hash, Debug)]
pub struct CaseDecl {
    pub name: Name,
    /// `None` for an empty case.
    pub payload: Option<TypeRef>,
    pub indirect: bool,
}

#[derive(Clone, Eq, PartialEq, Hash, Debug)]
pub struct GenericParamDecl {
    pub name: Name,
    /// Protocols this parameter is required to conform to.
    pub conformances: Vec<ProtocolId>,
    /// Primary parameters are written by the user; the rest are implied
    /// (associated types).
    pub primary: bool,
}

/// A struct, enum or class declaration.
#[derive(Clone, Eq, PartialEq, Hash, Debug)]
pub struct NominalDecl {
    pub name: Name,
    pub kind: NominalKind,
    pub fields: Vec<FieldDecl>,
    pub cases: Vec<CaseDecl>,
    pub generic_params: Vec<GenericParamDecl>,
    /// Classes only; arguments may mention this class's parameters.
    pub superclass: Option<TypeRef>,
    /// Represented by a foreign (legacy) runtime object model.
    pub foreign: bool,
    pub linkage: FormalLinkage,
    /// Enums only: every payload case is stored indirectly.
    pub indirect: bool,
    /// Layout is hidden from other modules; users must ask the runtime.
    pub resilient: bool,
}

impl NominalDecl {
    pub fn new(name: Name, kind: NominalKind) -> Self {
        Self {
            name,
            kind,
            fields: Vec::new(),
            cases: Vec::new(),
            generic_params: Vec::new(),
            superclass: None,
            foreign: false,
            linkage: FormalLinkage::default(),
            indirect: false,
            resilient: false,
        }
    }

    #[must_use]
    pub fn with_field(mut self, name: Name, ty: TypeRef) -> Self {
        self.fields.push(FieldDecl {
            name,
            ty,
            ownership: Ownership::Strong,
        });
        self
    }

    #[must_use]
    pub fn with_owned_field(mut self, name: Name, ty: TypeRef, ownership: Ownership) -> Self {
        self.fields.push(FieldDecl {
            name,
            ty,
            ownership,
        });
        self
    }

    #[must_use]
    pub fn with_case(mut self, name: Name, payload: Option<TypeRef>) -> Self {
        self.cases.push(CaseDecl {
            name,
            payload,
            indirect: false,
        });
        self
    }

    #[must_use]
    pub fn with_indirect_case(mut self, name: Name, payload: TypeRef) -> Self {
        self.cases.push(CaseDecl {
            name,
            payload: Some(payload),
            indirect: true,
        });
        self
    }

    #[must_use]
    pub fn with_generic_param(mut self, name: Name, conformances: Vec<ProtocolId>) -> Self {
        self.generic_params.push(GenericParamDecl {
            name,
            conformances,
            primary: true,
        });
        self
    }

    #[must_use]
    pub fn with_superclass(mut self, superclass: TypeRef) -> Self {
        self.superclass = Some(superclass);
        self
    }

    #[must_use]
    pub fn with_linkage(mut self, linkage: FormalLinkage) -> Self {
        self.linkage = linkage;
        self
    }

    #[must_use]
    pub fn as_foreign(mut self) -> Self {
        self.foreign = true;
        self
    }

    #[must_use]
    pub fn as_indirect(mut self) -> Self {
        self.indirect = true;
        self
    }

    #[must_use]
    pub fn as_resilient(mut self) -> Self {
        self.resilient = true;
        self
    }

    pub fn is_generic(&self) -> bool {
        !self.generic_params.is_empty()
    }

    pub fn num_primary_params(&self) -> usize {
        self.generic_params.iter().filter(|p| p.primary).count()
    }

    pub fn payload_cases(&self) -> impl Iterator<Item = &CaseDecl> {
        self.cases.iter().filter(|c| c.payload.is_some())
    }

    pub fn empty_cases(&self) -> impl Iterator<Item = &CaseDecl> {
        self.cases.iter().filter(|c| c.payload.is_none())
    }
}

/// A protocol declaration.
#[derive(Clone, Eq, PartialEq, Hash, Debug)]
pub struct ProtocolDecl {
    pub name: Name,
    pub inherited: Vec<ProtocolId>,
    pub dispatch: ProtocolDispatchStrategy,
    /// Conforming types must be classes.
    pub class_bound: bool,
    pub special: SpecialProtocol,
    pub source_defined: bool,
}

impl ProtocolDecl {
    pub fn new(name: Name) -> Self {
        Self {
            name,
            inherited: Vec::new(),
            dispatch: ProtocolDispatchStrategy::Swift,
            class_bound: false,
            special: SpecialProtocol::None,
            source_defined: true,
        }
    }

    #[must_use]
    pub fn with_dispatch(mut self, dispatch: ProtocolDispatchStrategy) -> Self {
        self.dispatch = dispatch;
        self
    }

    #[must_use]
    pub fn with_inherited(mut self, inherited: Vec<ProtocolId>) -> Self {
        self.inherited = inherited;
        self
    }

    #[must_use]
    pub fn class_bound(mut self) -> Self {
        self.class_bound = true;
        self
    }

    #[must_use]
    pub fn with_special(mut self, special: SpecialProtocol) -> Self {
        self.special = special;
        self
    }

    /// `AnyObject` has no requirements to dispatch, whatever its strategy.
    pub fn needs_witness_table(&self) -> bool {
        self.special != SpecialProtocol::AnyObject && self.dispatch.needs_witness_table()
    }
}
