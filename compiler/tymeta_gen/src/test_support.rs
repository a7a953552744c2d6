//! Declaration tables for generator tests.

use tymeta_abi::ProtocolDispatchStrategy;
use tymeta_ir::{BuiltinType, DeclId, DeclTable, NominalDecl, NominalKind, ProtocolDecl, ProtocolId, TypeRef};

pub(crate) fn builtin(ty: BuiltinType) -> TypeRef {
    TypeRef::Builtin(ty)
}

pub(crate) fn int64() -> TypeRef {
    builtin(BuiltinType::Int64)
}

pub(crate) fn int8() -> TypeRef {
    builtin(BuiltinType::Int8)
}

/// A table plus shorthand for adding declarations to it.
#[derive(Default)]
pub(crate) struct Fixture {
    pub table: DeclTable,
}

impl Fixture {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn decl(&mut self, name: &str, kind: NominalKind) -> NominalDecl {
        NominalDecl::new(self.table.intern(name), kind)
    }

    pub(crate) fn add(&mut self, decl: NominalDecl) -> DeclId {
        self.table.add_nominal(decl)
    }

    /// `struct name { f0: .., f1: .. }`, with parameters `params`.
    pub(crate) fn structure(&mut self, name: &str, params: usize, fields: &[TypeRef]) -> DeclId {
        let mut decl = self.decl(name, NominalKind::Struct);
        for i in 0..params {
            decl = decl.with_generic_param(self.table.intern(&format!("T{i}")), Vec::new());
        }
        for (i, ty) in fields.iter().enumerate() {
            decl = decl.with_field(self.table.intern(&format!("f{i}")), ty.clone());
        }
        self.add(decl)
    }

    /// `enum name { c0(..), c1, .. }`.
    pub(crate) fn enumeration(&mut self, name: &str, cases: &[Option<TypeRef>]) -> DeclId {
        let mut decl = self.decl(name, NominalKind::Enum);
        for (i, payload) in cases.iter().enumerate() {
            decl = decl.with_case(self.table.intern(&format!("c{i}")), payload.clone());
        }
        self.add(decl)
    }

    /// `class name: superclass { f0: .., .. }`.
    pub(crate) fn class(
        &mut self,
        name: &str,
        superclass: Option<TypeRef>,
        fields: &[TypeRef],
    ) -> DeclId {
        let mut decl = self.decl(name, NominalKind::Class);
        if let Some(superclass) = superclass {
            decl = decl.with_superclass(superclass);
        }
        for (i, ty) in fields.iter().enumerate() {
            decl = decl.with_field(self.table.intern(&format!("{name}{i}")), ty.clone());
        }
        self.add(decl)
    }

    pub(crate) fn protocol(&mut self, name: &str) -> ProtocolId {
        self.protocol_with(name, |p| p)
    }

    pub(crate) fn protocol_with(
        &mut self,
        name: &str,
        build: impl FnOnce(ProtocolDecl) -> ProtocolDecl,
    ) -> ProtocolId {
        let decl = build(ProtocolDecl::new(self.table.intern(name)));
        self.table.add_protocol(decl)
    }

    pub(crate) fn objc_protocol(&mut self, name: &str) -> ProtocolId {
        self.protocol_with(name, |p| p.with_dispatch(ProtocolDispatchStrategy::ObjC))
    }
}
