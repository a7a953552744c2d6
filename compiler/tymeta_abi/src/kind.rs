//! Metadata kind words.

/// The kind word stored at a metadata record's address point.
///
/// Values above [`MetadataKind::LAST_ENUMERATED`] are treated as class
/// records: with legacy interop the word holds an isa pointer instead.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
#[repr(usize)]
pub enum MetadataKind {
    Class = 0,
    Struct = 1,
    Enum = 2,
    Opaque = 8,
    Tuple = 9,
    Function = 10,
    Existential = 12,
    Metatype = 13,
    ObjCClassWrapper = 14,
    ExistentialMetatype = 15,
    ForeignClass = 16,
    HeapLocalVariable = 64,
    HeapGenericLocalVariable = 65,
    ErrorObject = 128,
}

impl MetadataKind {
    /// Largest kind value that is not an isa pointer.
    pub const LAST_ENUMERATED: usize = 2047;

    #[inline]
    pub const fn as_word(self) -> usize {
        self as usize
    }

    /// Decode a kind word read from a record.
    pub const fn from_word(word: usize) -> Option<Self> {
        Some(match word {
            0 => Self::Class,
            1 => Self::Struct,
            2 => Self::Enum,
            8 => Self::Opaque,
            9 => Self::Tuple,
            10 => Self::Function,
            12 => Self::Existential,
            13 => Self::Metatype,
            14 => Self::ObjCClassWrapper,
            15 => Self::ExistentialMetatype,
            16 => Self::ForeignClass,
            64 => Self::HeapLocalVariable,
            65 => Self::HeapGenericLocalVariable,
            128 => Self::ErrorObject,
            w if w > Self::LAST_ENUMERATED => Self::Class,
            _ => return None,
        })
    }

    /// Whether records of this kind carry a nominal type descriptor.
    pub const fn is_nominal(self) -> bool {
        matches!(self, Self::Class | Self::Struct | Self::Enum)
    }
}

/// Kind word at the start of a nominal type descriptor.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
#[repr(usize)]
pub enum NominalTypeKind {
    Class = 0,
    Struct = 1,
    Enum = 2,
}

impl NominalTypeKind {
    #[inline]
    pub const fn as_word(self) -> usize {
        self as usize
    }

    pub const fn from_word(word: usize) -> Option<Self> {
        match word {
            0 => Some(Self::Class),
            1 => Some(Self::Struct),
            2 => Some(Self::Enum),
            _ => None,
        }
    }

    /// The metadata kind of records described by this descriptor kind.
    pub const fn metadata_kind(self) -> MetadataKind {
        match self {
            Self::Class => MetadataKind::Class,
            Self::Struct => MetadataKind::Struct,
            Self::Enum => MetadataKind::Enum,
        }
    }
}
