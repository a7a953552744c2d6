//! Builtin types with runtime-provided metadata.

/// A builtin type. The runtime provides one metadata record per variant.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum BuiltinType {
    Int8,
    Int16,
    Int32,
    Int64,
    Float32,
    Float64,
    Word,
    RawPointer,
    NativeObject,
    UnknownObject,
    BridgeObject,
}

impl BuiltinType {
    pub const ALL: [Self; 11] = [
        Self::Int8,
        Self::Int16,
        Self::Int32,
        Self::Int64,
        Self::Float32,
        Self::Float64,
        Self::Word,
        Self::RawPointer,
        Self::NativeObject,
        Self::UnknownObject,
        Self::BridgeObject,
    ];

    /// Byte size on the host target.
    pub const fn size(self) -> usize {
        match self {
            Self::Int8 => 1,
            Self::Int16 => 2,
            Self::Int32 | Self::Float32 => 4,
            Self::Int64 | Self::Float64 => 8,
            Self::Word
            | Self::RawPointer
            | Self::NativeObject
            | Self::UnknownObject
            | Self::BridgeObject => crate::POINTER_SIZE,
        }
    }

    /// Whether values of this type are references the runtime counts.
    pub const fn is_object_reference(self) -> bool {
        matches!(
            self,
            Self::NativeObject | Self::UnknownObject | Self::BridgeObject
        )
    }

    /// Alignment mask on the host target. Every builtin is naturally aligned.
    pub const fn align_mask(self) -> usize {
        self.size() - 1
    }
}

/// Enum tag width for an enum with `num_cases` cases: none for zero or one
/// case, a byte up to 256 cases, otherwise four bytes.
pub const fn enum_tag_size(num_cases: usize) -> usize {
    match num_cases {
        0 | 1 => 0,
        2..=256 => 1,
        _ => 4,
    }
}
