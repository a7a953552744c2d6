//! Structural type references.

use crate::{DeclId, ProtocolId};
pub use tymeta_abi::BuiltinType;

/// Representation of a function value.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Default)]
pub enum FunctionRepresentation {
    /// A thick closure: function pointer plus context.
    #[default]
    Thick,
    Thin,
    Block,
    CFunctionPointer,
}

/// A function type.
#[derive(Clone, Eq, PartialEq, Hash, Debug)]
pub struct FunctionTypeRef {
    pub params: Vec<TypeRef>,
    pub result: TypeRef,
    pub repr: FunctionRepresentation,
    pub throws: bool,
    /// Has its own generic parameters.
    pub polymorphic: bool,
}

/// A reference to a type, as written in a declaration body.
#[derive(Clone, Eq, PartialEq, Hash, Debug)]
pub enum TypeRef {
    Builtin(BuiltinType),
    /// A nominal type, bound to arguments for each of its generic parameters.
    Nominal { decl: DeclId, args: Vec<TypeRef> },
    /// Generic parameter `n` of the enclosing declaration.
    Param(u32),
    Tuple(Vec<TypeRef>),
    Function(Box<FunctionTypeRef>),
    /// A protocol composition; empty means the universal existential.
    Existential(Vec<ProtocolId>),
    Metatype(Box<TypeRef>),
    ExistentialMetatype(Box<TypeRef>),
    /// An `inout` parameter; only valid as a function parameter.
    InOut(Box<TypeRef>),
    /// A module used as a value.
    Module,
}

impl TypeRef {
    pub fn nominal(decl: DeclId) -> Self {
        TypeRef::Nominal {
            decl,
            args: Vec::new(),
        }
    }

    pub fn bound(decl: DeclId, args: Vec<TypeRef>) -> Self {
        TypeRef::Nominal { decl, args }
    }

    pub fn empty_tuple() -> Self {
        TypeRef::Tuple(Vec::new())
    }

    pub fn is_empty_tuple(&self) -> bool {
        matches!(self, TypeRef::Tuple(elts) if elts.is_empty())
    }

    /// Whether this reference mentions any generic parameter.
    pub fn has_params(&self) -> bool {
        match self {
            TypeRef::Param(_) => true,
            TypeRef::Builtin(_) | TypeRef::Existential(_) | TypeRef::Module => false,
            TypeRef::Nominal { args, .. } => args.iter().any(TypeRef::has_params),
            TypeRef::Tuple(elts) => elts.iter().any(TypeRef::has_params),
            TypeRef::Function(f) => {
                f.result.has_params() || f.params.iter().any(TypeRef::has_params)
            }
            TypeRef::Metatype(inner)
            | TypeRef::ExistentialMetatype(inner)
            | TypeRef::InOut(inner) => inner.has_params(),
        }
    }

    /// Replace every `Param(n)` with `args[n]`. Out-of-range parameters are
    /// left in place.
    #[must_use]
    pub fn substitute(&self, args: &[TypeRef]) -> TypeRef {
        match self {
            TypeRef::Param(n) => args
                .get(*n as usize)
                .cloned()
                .unwrap_or(TypeRef::Param(*n)),
            TypeRef::Builtin(_) | TypeRef::Existential(_) | TypeRef::Module => self.clone(),
            TypeRef::Nominal { decl, args: inner } => TypeRef::Nominal {
                decl: *decl,
                args: inner.iter().map(|t| t.substitute(args)).collect(),
            },
            TypeRef::Tuple(elts) => {
                TypeRef::Tuple(elts.iter().map(|t| t.substitute(args)).collect())
            }
            TypeRef::Function(f) => TypeRef::Function(Box::new(FunctionTypeRef {
                params: f.params.iter().map(|t| t.substitute(args)).collect(),
                result: f.result.substitute(args),
                repr: f.repr,
                throws: f.throws,
                polymorphic: f.polymorphic,
            })),
            TypeRef::Metatype(inner) => TypeRef::Metatype(Box::new(inner.substitute(args))),
            TypeRef::ExistentialMetatype(inner) => {
                TypeRef::ExistentialMetatype(Box::new(inner.substitute(args)))
            }
            TypeRef::InOut(inner) => TypeRef::InOut(Box::new(inner.substitute(args))),
        }
    }
}
