//! Compile-time layout of types.
//!
//! A type's layout is either fixed (size, alignment, POD-ness and, for a
//! single reference, its reference-counting kind are known now) or depends
//! on generic arguments or on a resilient type and is computed at runtime.

use smallvec::SmallVec;
use tymeta_abi::{ReferenceCounting, SpecialProtocol, POINTER_ALIGN_MASK, POINTER_SIZE};
use tymeta_ir::{
    BuiltinType, DeclId, DeclTable, FieldDecl, FunctionRepresentation, NominalDecl, NominalKind,
    Ownership, ProtocolId, TypeRef,
};
use tymeta_rt::layout::{dynamic_pass, enum_layout, max_payload, ElementLayout};
use tymeta_rt::witness::TypeLayout;

use crate::error::{MetadataError, Result};
use crate::options::GenOptions;

/// A layout known at compile time.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub struct FixedLayout {
    pub size: usize,
    pub align_mask: usize,
    pub pod: bool,
    /// Set when the value is exactly one reference of this kind.
    pub reference: Option<ReferenceCounting>,
}

impl FixedLayout {
    pub const fn pod(size: usize, align_mask: usize) -> Self {
        Self {
            size,
            align_mask,
            pod: true,
            reference: None,
        }
    }

    pub const fn reference(kind: ReferenceCounting) -> Self {
        Self {
            size: POINTER_SIZE,
            align_mask: POINTER_ALIGN_MASK,
            pod: false,
            reference: Some(kind),
        }
    }

    /// Non-POD words that are not a single reference.
    pub const fn words(n: usize) -> Self {
        Self {
            size: n * POINTER_SIZE,
            align_mask: POINTER_ALIGN_MASK,
            pod: false,
            reference: None,
        }
    }

    pub const fn is_empty(&self) -> bool {
        self.size == 0
    }

    pub const fn stride(&self) -> usize {
        self.type_layout().stride()
    }

    pub const fn element(&self) -> ElementLayout {
        ElementLayout::new(self.size, self.align_mask)
    }

    pub const fn type_layout(&self) -> TypeLayout {
        TypeLayout {
            size: self.size,
            align_mask: self.align_mask,
            pod: self.pod,
            extra_inhabitants: self.reference.is_some(),
        }
    }
}

/// Layout classification of a type.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum TypeInfo {
    Fixed(FixedLayout),
    NonFixed,
}

impl TypeInfo {
    pub fn fixed(self) -> Option<FixedLayout> {
        match self {
            Self::Fixed(layout) => Some(layout),
            Self::NonFixed => None,
        }
    }

    pub fn is_fixed(self) -> bool {
        matches!(self, Self::Fixed(_))
    }
}

/// What an existential composition stores.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub struct ExistentialShape {
    pub witness_tables: usize,
    pub class_bound: bool,
    /// The single-protocol `Error` existential: one error reference.
    pub error: bool,
}

impl ExistentialShape {
    pub fn layout(self, unknown: ReferenceCounting) -> FixedLayout {
        if self.error {
            return FixedLayout::reference(ReferenceCounting::Error);
        }
        match (self.class_bound, self.witness_tables) {
            (true, 0) => FixedLayout::reference(unknown),
            (true, n) => FixedLayout::words(1 + n),
            (false, n) => FixedLayout::words(2 + n),
        }
    }
}

/// Computes [`TypeInfo`]s against a declaration table.
#[derive(Copy, Clone)]
pub struct TypeInfoCx<'a> {
    table: &'a DeclTable,
    options: &'a GenOptions,
}

type DeclStack = SmallVec<[DeclId; 8]>;

impl<'a> TypeInfoCx<'a> {
    pub fn new(table: &'a DeclTable, options: &'a GenOptions) -> Self {
        Self { table, options }
    }

    /// Layout of `ty`. Parameters are non-fixed.
    pub fn type_info(&self, ty: &TypeRef) -> Result<TypeInfo> {
        self.info(ty, &mut DeclStack::new())
    }

    /// Layout of a stored property of a declaration bound to `args`.
    pub fn field_info(&self, field: &FieldDecl, args: &[TypeRef]) -> Result<TypeInfo> {
        self.stored(field, args, &mut DeclStack::new())
    }

    /// Reference-counting kind of the unknown-object representation.
    pub fn unknown_refcounting(&self) -> ReferenceCounting {
        if self.options.legacy_interop {
            ReferenceCounting::Unknown
        } else {
            ReferenceCounting::Native
        }
    }

    /// Reference-counting kind of references to class `decl`.
    pub fn class_refcounting(&self, decl: &NominalDecl) -> ReferenceCounting {
        if decl.foreign && self.options.legacy_interop {
            ReferenceCounting::LegacyObject
        } else {
            ReferenceCounting::Native
        }
    }

    pub fn existential_shape(&self, protocols: &[ProtocolId]) -> Result<ExistentialShape> {
        let mut sorted: SmallVec<[ProtocolId; 4]> = protocols.iter().copied().collect();
        sorted.sort_unstable();
        sorted.dedup();
        let mut shape = ExistentialShape {
            witness_tables: 0,
            class_bound: false,
            error: false,
        };
        for &id in &sorted {
            let protocol = self
                .table
                .protocol(id)
                .ok_or(MetadataError::UnknownProtocol(id))?;
            if protocol.needs_witness_table() {
                shape.witness_tables += 1;
            }
            shape.class_bound |= protocol.class_bound;
            shape.error |= sorted.len() == 1 && protocol.special == SpecialProtocol::ErrorType;
        }
        Ok(shape)
    }

    fn info(&self, ty: &TypeRef, stack: &mut DeclStack) -> Result<TypeInfo> {
        let fixed = match ty {
            TypeRef::Builtin(builtin) => match builtin {
                BuiltinType::NativeObject => FixedLayout::reference(ReferenceCounting::Native),
                BuiltinType::UnknownObject => FixedLayout::reference(self.unknown_refcounting()),
                BuiltinType::BridgeObject => FixedLayout::reference(ReferenceCounting::Bridge),
                other => FixedLayout::pod(other.size(), other.align_mask()),
            },
            TypeRef::Param(_) => return Ok(TypeInfo::NonFixed),
            TypeRef::Nominal { decl, args } => return self.nominal(*decl, args, stack),
            TypeRef::Tuple(elements) => {
                let mut layouts = SmallVec::<[FixedLayout; 4]>::new();
                for element in elements {
                    match self.info(element, stack)? {
                        TypeInfo::Fixed(layout) => layouts.push(layout),
                        TypeInfo::NonFixed => return Ok(TypeInfo::NonFixed),
                    }
                }
                aggregate(&layouts)
            }
            TypeRef::Function(function) => match function.repr {
                FunctionRepresentation::Thick => FixedLayout::words(2),
                FunctionRepresentation::Thin | FunctionRepresentation::CFunctionPointer => {
                    FixedLayout::pod(POINTER_SIZE, POINTER_ALIGN_MASK)
                }
                FunctionRepresentation::Block => FixedLayout::reference(ReferenceCounting::Block),
            },
            TypeRef::Existential(protocols) => self
                .existential_shape(protocols)?
                .layout(self.unknown_refcounting()),
            TypeRef::Metatype(_) => FixedLayout::pod(POINTER_SIZE, POINTER_ALIGN_MASK),
            TypeRef::ExistentialMetatype(instance) => {
                let tables = match instance.as_ref() {
                    TypeRef::Existential(protocols) => {
                        self.existential_shape(protocols)?.witness_tables
                    }
                    _ => 0,
                };
                FixedLayout::pod((1 + tables) * POINTER_SIZE, POINTER_ALIGN_MASK)
            }
            TypeRef::InOut(_) => {
                return Err(MetadataError::unimplemented(
                    "inout type outside a parameter list",
                ))
            }
            TypeRef::Module => FixedLayout::pod(0, 0),
        };
        Ok(TypeInfo::Fixed(fixed))
    }

    fn stored(&self, field: &FieldDecl, args: &[TypeRef], stack: &mut DeclStack) -> Result<TypeInfo> {
        if field.ownership != Ownership::Strong {
            return Err(MetadataError::unimplemented(
                "weak or unowned stored property",
            ));
        }
        self.info(&field.ty.substitute(args), stack)
    }

    fn nominal(&self, id: DeclId, args: &[TypeRef], stack: &mut DeclStack) -> Result<TypeInfo> {
        let decl = self.table.nominal(id).ok_or(MetadataError::UnknownDecl(id))?;
        check_arguments(self.table, decl, args.len())?;
        if decl.kind == NominalKind::Class {
            return Ok(TypeInfo::Fixed(FixedLayout::reference(
                self.class_refcounting(decl),
            )));
        }
        if decl.resilient {
            return Ok(TypeInfo::NonFixed);
        }
        if stack.contains(&id) {
            return Err(MetadataError::unimplemented("infinitely sized value type"));
        }
        stack.push(id);
        let info = match decl.kind {
            NominalKind::Struct => self.struct_info(decl, args, stack),
            NominalKind::Enum | NominalKind::Class => self.enum_info(decl, args, stack),
        };
        stack.pop();
        info
    }

    fn struct_info(&self, decl: &NominalDecl, args: &[TypeRef], stack: &mut DeclStack) -> Result<TypeInfo> {
        let mut layouts = SmallVec::<[FixedLayout; 8]>::new();
        for field in &decl.fields {
            match self.stored(field, args, stack)? {
                TypeInfo::Fixed(layout) => layouts.push(layout),
                TypeInfo::NonFixed => return Ok(TypeInfo::NonFixed),
            }
        }
        Ok(TypeInfo::Fixed(aggregate(&layouts)))
    }

    fn enum_info(&self, decl: &NominalDecl, args: &[TypeRef], stack: &mut DeclStack) -> Result<TypeInfo> {
        let mut payloads = SmallVec::<[FixedLayout; 8]>::new();
        for case in &decl.cases {
            let Some(payload) = &case.payload else {
                continue;
            };
            if case.indirect || decl.indirect {
                payloads.push(FixedLayout::reference(ReferenceCounting::Native));
                continue;
            }
            match self.info(&payload.substitute(args), stack)? {
                TypeInfo::Fixed(layout) => payloads.push(layout),
                TypeInfo::NonFixed => return Ok(TypeInfo::NonFixed),
            }
        }
        let payload = max_payload(payloads.iter().map(FixedLayout::element));
        let layout = enum_layout(payload, decl.cases.len());
        Ok(TypeInfo::Fixed(FixedLayout {
            size: layout.size,
            align_mask: layout.align_mask,
            pod: payloads.iter().all(|p| p.pod),
            reference: None,
        }))
    }
}

/// Fields laid out in order from offset zero.
fn aggregate(fields: &[FixedLayout]) -> FixedLayout {
    let layout = dynamic_pass(0, 0, fields.iter().map(FixedLayout::element));
    FixedLayout {
        size: layout.size,
        align_mask: layout.align_mask,
        pod: fields.iter().all(|f| f.pod),
        reference: None,
    }
}

pub(crate) fn check_arguments(table: &DeclTable, decl: &NominalDecl, found: usize) -> Result<()> {
    let expected = decl.generic_params.len();
    if expected == found {
        return Ok(());
    }
    Err(MetadataError::ArgumentCount {
        decl: table.name(decl.name).to_owned(),
        expected,
        found,
    })
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    reason = "tests use unwrap to panic on unexpected state"
)]
