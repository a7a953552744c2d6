//! Packed flag words.
//!
//! Every codec wraps a fixed-width unsigned integer. `with_*` returns a copy
//! with exactly one field's bit range replaced; getters mask, then shift.
//! Field ranges never overlap.

use bitflags::bitflags;

#[inline]
const fn replace_u32(bits: u32, mask: u32, shift: u32, value: u32) -> u32 {
    (bits & !mask) | ((value << shift) & mask)
}

#[inline]
const fn replace_usize(bits: usize, mask: usize, shift: u32, value: usize) -> usize {
    (bits & !mask) | ((value << shift) & mask)
}

// === Protocol conformance ===

/// How a conformance record identifies its conforming type.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
#[repr(u32)]
pub enum ProtocolConformanceTypeKind {
    Universal = 0,
    UniqueDirectType = 1,
    NonuniqueDirectType = 2,
    UniqueIndirectClass = 3,
    UniqueGenericPattern = 4,
    UniqueDirectClass = 0xF,
}

impl ProtocolConformanceTypeKind {
    pub const ALL: [Self; 6] = [
        Self::Universal,
        Self::UniqueDirectType,
        Self::NonuniqueDirectType,
        Self::UniqueIndirectClass,
        Self::UniqueGenericPattern,
        Self::UniqueDirectClass,
    ];

    const fn from_raw(raw: u32) -> Option<Self> {
        match raw {
            0 => Some(Self::Universal),
            1 => Some(Self::UniqueDirectType),
            2 => Some(Self::NonuniqueDirectType),
            3 => Some(Self::UniqueIndirectClass),
            4 => Some(Self::UniqueGenericPattern),
            0xF => Some(Self::UniqueDirectClass),
            _ => None,
        }
    }
}

/// How a conformance record references its witness table.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
#[repr(u32)]
pub enum ProtocolConformanceReferenceKind {
    WitnessTable = 0,
    WitnessTableAccessor = 1,
}

/// Flags word of a protocol conformance record.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Default)]
pub struct ProtocolConformanceFlags(u32);

impl ProtocolConformanceFlags {
    const TYPE_KIND_MASK: u32 = 0x0000_000F;
    const TYPE_KIND_SHIFT: u32 = 0;
    const CONFORMANCE_KIND_MASK: u32 = 0x0000_0010;
    const CONFORMANCE_KIND_SHIFT: u32 = 4;

    pub const fn new() -> Self {
        Self(0)
    }

    pub const fn from_bits(bits: u32) -> Self {
        Self(bits)
    }

    pub const fn bits(self) -> u32 {
        self.0
    }

    #[must_use]
    pub const fn with_type_kind(self, kind: ProtocolConformanceTypeKind) -> Self {
        Self(replace_u32(
            self.0,
            Self::TYPE_KIND_MASK,
            Self::TYPE_KIND_SHIFT,
            kind as u32,
        ))
    }

    #[must_use]
    pub const fn with_conformance_kind(self, kind: ProtocolConformanceReferenceKind) -> Self {
        Self(replace_u32(
            self.0,
            Self::CONFORMANCE_KIND_MASK,
            Self::CONFORMANCE_KIND_SHIFT,
            kind as u32,
        ))
    }

    /// `None` for raw values with no assigned kind (5..=14).
    pub const fn type_kind(self) -> Option<ProtocolConformanceTypeKind> {
        ProtocolConformanceTypeKind::from_raw(
            (self.0 & Self::TYPE_KIND_MASK) >> Self::TYPE_KIND_SHIFT,
        )
    }

    pub const fn conformance_kind(self) -> ProtocolConformanceReferenceKind {
        if (self.0 & Self::CONFORMANCE_KIND_MASK) >> Self::CONFORMANCE_KIND_SHIFT == 0 {
            ProtocolConformanceReferenceKind::WitnessTable
        } else {
            ProtocolConformanceReferenceKind::WitnessTableAccessor
        }
    }
}

// === Protocol descriptors ===

/// Whether a protocol is restricted to class types.
///
/// `Class` encodes as a clear bit, `Any` as a set bit.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum ProtocolClassConstraint {
    Class,
    Any,
}

impl ProtocolClassConstraint {
    const fn from_bit(set: bool) -> Self {
        if set {
            Self::Any
        } else {
            Self::Class
        }
    }

    const fn bit(self) -> bool {
        matches!(self, Self::Any)
    }
}

/// Protocols the runtime treats specially.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Default)]
#[repr(u8)]
pub enum SpecialProtocol {
    #[default]
    None = 0,
    AnyObject = 1,
    ErrorType = 2,
}

impl SpecialProtocol {
    pub const ALL: [Self; 3] = [Self::None, Self::AnyObject, Self::ErrorType];

    const fn from_raw(raw: usize) -> Option<Self> {
        match raw {
            0 => Some(Self::None),
            1 => Some(Self::AnyObject),
            2 => Some(Self::ErrorType),
            _ => None,
        }
    }
}

/// How a protocol's requirements are dispatched.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Default)]
#[repr(u8)]
pub enum ProtocolDispatchStrategy {
    /// Dispatched through the legacy object runtime; no witness table.
    ObjC = 0,
    /// Dispatched through a witness table.
    #[default]
    Swift = 1,
    /// No runtime-dispatchable members; no witness table.
    Empty = 2,
}

impl ProtocolDispatchStrategy {
    pub const ALL: [Self; 3] = [Self::ObjC, Self::Swift, Self::Empty];

    /// Only witness-table dispatch needs a table passed at runtime.
    pub const fn needs_witness_table(self) -> bool {
        matches!(self, Self::Swift)
    }

    const fn from_raw(raw: u32) -> Option<Self> {
        match raw {
            0 => Some(Self::ObjC),
            1 => Some(Self::Swift),
            2 => Some(Self::Empty),
            _ => None,
        }
    }
}

/// Flags word of a protocol descriptor. Bits 16-31 are reserved for the
/// legacy object runtime and never touched here.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Default)]
pub struct ProtocolDescriptorFlags(u32);

impl ProtocolDescriptorFlags {
    const IS_SOURCE_DEFINED: u32 = 0x0000_0001;
    const CLASS_CONSTRAINT: u32 = 0x0000_0002;
    const DISPATCH_STRATEGY_MASK: u32 = 0x0000_003C;
    const DISPATCH_STRATEGY_SHIFT: u32 = 2;
    const SPECIAL_PROTOCOL_MASK: u32 = 0x0000_03C0;
    const SPECIAL_PROTOCOL_SHIFT: u32 = 6;
    pub const LEGACY_RESERVED: u32 = 0xFFFF_0000;

    pub const fn new() -> Self {
        Self(0)
    }

    pub const fn from_bits(bits: u32) -> Self {
        Self(bits)
    }

    pub const fn bits(self) -> u32 {
        self.0
    }

    #[must_use]
    pub const fn with_source_defined(self, value: bool) -> Self {
        Self(replace_u32(self.0, Self::IS_SOURCE_DEFINED, 0, value as u32))
    }

    #[must_use]
    pub const fn with_class_constraint(self, c: ProtocolClassConstraint) -> Self {
        Self(replace_u32(self.0, Self::CLASS_CONSTRAINT, 1, c.bit() as u32))
    }

    #[must_use]
    pub const fn with_dispatch_strategy(self, s: ProtocolDispatchStrategy) -> Self {
        Self(replace_u32(
            self.0,
            Self::DISPATCH_STRATEGY_MASK,
            Self::DISPATCH_STRATEGY_SHIFT,
            s as u32,
        ))
    }

    #[must_use]
    pub const fn with_special_protocol(self, p: SpecialProtocol) -> Self {
        Self(replace_u32(
            self.0,
            Self::SPECIAL_PROTOCOL_MASK,
            Self::SPECIAL_PROTOCOL_SHIFT,
            p as u32,
        ))
    }

    pub const fn is_source_defined(self) -> bool {
        self.0 & Self::IS_SOURCE_DEFINED != 0
    }

    pub const fn class_constraint(self) -> ProtocolClassConstraint {
        ProtocolClassConstraint::from_bit(self.0 & Self::CLASS_CONSTRAINT != 0)
    }

    pub const fn dispatch_strategy(self) -> Option<ProtocolDispatchStrategy> {
        ProtocolDispatchStrategy::from_raw(
            (self.0 & Self::DISPATCH_STRATEGY_MASK) >> Self::DISPATCH_STRATEGY_SHIFT,
        )
    }

    pub const fn special_protocol(self) -> Option<SpecialProtocol> {
        SpecialProtocol::from_raw(
            ((self.0 & Self::SPECIAL_PROTOCOL_MASK) >> Self::SPECIAL_PROTOCOL_SHIFT) as usize,
        )
    }

    pub const fn needs_witness_table(self) -> bool {
        if matches!(self.special_protocol(), Some(SpecialProtocol::AnyObject)) {
            return false;
        }
        match self.dispatch_strategy() {
            Some(s) => s.needs_witness_table(),
            None => false,
        }
    }
}

// === Existential types ===

/// Flags word of existential type metadata.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Default)]
pub struct ExistentialTypeFlags(usize);

impl ExistentialTypeFlags {
    const NUM_WITNESS_TABLES_MASK: usize = 0x00FF_FFFF;
    const SPECIAL_PROTOCOL_MASK: usize = 0x7F00_0000;
    const SPECIAL_PROTOCOL_SHIFT: u32 = 24;
    const CLASS_CONSTRAINT: usize = 0x8000_0000;

    /// Largest representable witness-table count.
    pub const MAX_WITNESS_TABLES: usize = Self::NUM_WITNESS_TABLES_MASK;

    pub const fn new() -> Self {
        Self(0)
    }

    pub const fn from_bits(bits: usize) -> Self {
        Self(bits)
    }

    pub const fn bits(self) -> usize {
        self.0
    }

    #[must_use]
    pub const fn with_num_witness_tables(self, n: usize) -> Self {
        Self(replace_usize(self.0, Self::NUM_WITNESS_TABLES_MASK, 0, n))
    }

    #[must_use]
    pub const fn with_class_constraint(self, c: ProtocolClassConstraint) -> Self {
        Self(replace_usize(
            self.0,
            Self::CLASS_CONSTRAINT,
            31,
            c.bit() as usize,
        ))
    }

    #[must_use]
    pub const fn with_special_protocol(self, p: SpecialProtocol) -> Self {
        Self(replace_usize(
            self.0,
            Self::SPECIAL_PROTOCOL_MASK,
            Self::SPECIAL_PROTOCOL_SHIFT,
            p as usize,
        ))
    }

    pub const fn num_witness_tables(self) -> usize {
        self.0 & Self::NUM_WITNESS_TABLES_MASK
    }

    pub const fn class_constraint(self) -> ProtocolClassConstraint {
        ProtocolClassConstraint::from_bit(self.0 & Self::CLASS_CONSTRAINT != 0)
    }

    pub const fn special_protocol(self) -> Option<SpecialProtocol> {
        SpecialProtocol::from_raw(
            (self.0 & Self::SPECIAL_PROTOCOL_MASK) >> Self::SPECIAL_PROTOCOL_SHIFT,
        )
    }
}

// === Function types ===

/// Calling convention recorded in function type metadata.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Default)]
#[repr(u8)]
pub enum FunctionMetadataConvention {
    #[default]
    Swift = 0,
    Block = 1,
    Thin = 2,
    CFunctionPointer = 3,
}

impl FunctionMetadataConvention {
    pub const ALL: [Self; 4] = [Self::Swift, Self::Block, Self::Thin, Self::CFunctionPointer];

    const fn from_raw(raw: usize) -> Option<Self> {
        match raw {
            0 => Some(Self::Swift),
            1 => Some(Self::Block),
            2 => Some(Self::Thin),
            3 => Some(Self::CFunctionPointer),
            _ => None,
        }
    }
}

/// Flags word of function type metadata.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Default)]
pub struct FunctionTypeFlags(usize);

impl FunctionTypeFlags {
    const NUM_ARGUMENTS_MASK: usize = 0x00FF_FFFF;
    const CONVENTION_MASK: usize = 0x0F00_0000;
    const CONVENTION_SHIFT: u32 = 24;
    const THROWS: usize = 0x1000_0000;

    pub const MAX_ARGUMENTS: usize = Self::NUM_ARGUMENTS_MASK;

    pub const fn new() -> Self {
        Self(0)
    }

    pub const fn from_bits(bits: usize) -> Self {
        Self(bits)
    }

    pub const fn bits(self) -> usize {
        self.0
    }

    #[must_use]
    pub const fn with_num_arguments(self, n: usize) -> Self {
        Self(replace_usize(self.0, Self::NUM_ARGUMENTS_MASK, 0, n))
    }

    #[must_use]
    pub const fn with_convention(self, c: FunctionMetadataConvention) -> Self {
        Self(replace_usize(
            self.0,
            Self::CONVENTION_MASK,
            Self::CONVENTION_SHIFT,
            c as usize,
        ))
    }

    #[must_use]
    pub const fn with_throws(self, throws: bool) -> Self {
        Self(replace_usize(self.0, Self::THROWS, 28, throws as usize))
    }

    pub const fn num_arguments(self) -> usize {
        self.0 & Self::NUM_ARGUMENTS_MASK
    }

    pub const fn convention(self) -> Option<FunctionMetadataConvention> {
        FunctionMetadataConvention::from_raw(
            (self.0 & Self::CONVENTION_MASK) >> Self::CONVENTION_SHIFT,
        )
    }

    pub const fn throws(self) -> bool {
        self.0 & Self::THROWS != 0
    }
}

// === Field types ===

/// One entry of a field-type vector: a metadata address with the low bit
/// marking indirect storage.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Default)]
#[repr(transparent)]
pub struct FieldType(usize);

impl FieldType {
    const INDIRECT: usize = 1;
    /// Bits guaranteed zero in any pointer-aligned address are free for flags.
    pub const TYPE_MASK: usize = !(std::mem::align_of::<*const u8>() - 1);

    /// Wrap a metadata address. The address must be pointer-aligned.
    pub const fn new(metadata_address: usize) -> Self {
        Self(metadata_address & Self::TYPE_MASK)
    }

    pub const fn from_bits(bits: usize) -> Self {
        Self(bits)
    }

    pub const fn bits(self) -> usize {
        self.0
    }

    #[must_use]
    pub const fn with_indirect(self, indirect: bool) -> Self {
        Self(replace_usize(self.0, Self::INDIRECT, 0, indirect as usize))
    }

    #[must_use]
    pub const fn with_type(self, metadata_address: usize) -> Self {
        Self((self.0 & !Self::TYPE_MASK) | (metadata_address & Self::TYPE_MASK))
    }

    pub const fn is_indirect(self) -> bool {
        self.0 & Self::INDIRECT != 0
    }

    pub const fn type_address(self) -> usize {
        self.0 & Self::TYPE_MASK
    }
}

// === Classes ===

bitflags! {
    /// Flags word of a class metadata record.
    #[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Default)]
    pub struct ClassFlags: u32 {
        /// Laid out by the version-1 native class ABI.
        const IS_VERSION1 = 0x1;
        /// Instances use native (version-1) reference counting.
        const USES_VERSION1_REFCOUNTING = 0x2;
    }
}

impl ClassFlags {
    #[must_use]
    pub const fn with_version1(self, value: bool) -> Self {
        if value {
            self.union(Self::IS_VERSION1)
        } else {
            self.difference(Self::IS_VERSION1)
        }
    }

    #[must_use]
    pub const fn with_version1_refcounting(self, value: bool) -> Self {
        if value {
            self.union(Self::USES_VERSION1_REFCOUNTING)
        } else {
            self.difference(Self::USES_VERSION1_REFCOUNTING)
        }
    }

    pub const fn is_version1(self) -> bool {
        self.contains(Self::IS_VERSION1)
    }

    pub const fn uses_version1_refcounting(self) -> bool {
        self.contains(Self::USES_VERSION1_REFCOUNTING)
    }
}

// === Enum descriptors ===

/// The packed payload-case word of an enum descriptor:
/// `payload_cases | (payload_size_offset_words << 24)`.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Default)]
pub struct EnumCaseCounts(u32);

impl EnumCaseCounts {
    const PAYLOAD_CASES_MASK: u32 = 0x00FF_FFFF;
    const PAYLOAD_SIZE_OFFSET_SHIFT: u32 = 24;

    /// Pack a payload-case count with the word offset of the runtime
    /// payload-size field (zero when there is none).
    pub fn new(payload_cases: u32, payload_size_offset_words: u32) -> Self {
        assert!(
            payload_cases <= Self::PAYLOAD_CASES_MASK,
            "enum payload case count {payload_cases} does not fit in 24 bits"
        );
        assert!(
            payload_size_offset_words < 0x100,
            "enum payload size offset {payload_size_offset_words} does not fit in 8 bits"
        );
        Self(payload_cases | (payload_size_offset_words << Self::PAYLOAD_SIZE_OFFSET_SHIFT))
    }

    pub const fn from_bits(bits: u32) -> Self {
        Self(bits)
    }

    pub const fn bits(self) -> u32 {
        self.0
    }

    pub const fn payload_cases(self) -> u32 {
        self.0 & Self::PAYLOAD_CASES_MASK
    }

    pub const fn payload_size_offset_words(self) -> u32 {
        self.0 >> Self::PAYLOAD_SIZE_OFFSET_SHIFT
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    reason = "tests use unwrap to panic on unexpected state"
)]
mod tests;
