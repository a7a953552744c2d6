//! Declaration model for the metadata generator.
//!
//! The front end hands the generator a [`DeclTable`]: nominal types with
//! their stored fields, enum cases, generic parameters and conformance lists,
//! superclasses, and protocols. The generator only reads it.
//!
//! Type references ([`TypeRef`]) are structural and hashable so they can key
//! metadata caches directly. Generic parameters are referenced by index into
//! the parameter list of the declaration whose body mentions them.

mod decl;
mod interner;
mod name;
mod table;
mod ty;

pub use decl::{
    CaseDecl, FieldDecl, FormalLinkage, GenericParamDecl, NominalDecl, NominalKind, Ownership,
    ProtocolDecl,
};
pub use interner::{InternError, StringInterner};
pub use name::Name;
pub use table::{DeclId, DeclTable, ProtocolId};
pub use ty::{BuiltinType, FunctionRepresentation, FunctionTypeRef, TypeRef};
