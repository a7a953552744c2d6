//! Catalogue of runtime entry points referenced by generated metadata code.
//!
//! Each entry has a stable C symbol and an argument/return shape. The runtime
//! crate exports a function for every symbol listed here.

/// Machine-level shape of a runtime argument or return value.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum AbiType {
    Void,
    /// A pointer-sized integer.
    Word,
    Ptr,
    /// Two pointers returned together (box handle, storage address).
    PtrPair,
}

/// Signature of a runtime entry point.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub struct RuntimeFnSig {
    pub params: &'static [AbiType],
    pub ret: AbiType,
}

const UNARY: RuntimeFnSig = RuntimeFnSig {
    params: &[AbiType::Ptr],
    ret: AbiType::Void,
};
const UNARY_RET: RuntimeFnSig = RuntimeFnSig {
    params: &[AbiType::Ptr],
    ret: AbiType::Ptr,
};
const BINARY: RuntimeFnSig = RuntimeFnSig {
    params: &[AbiType::Ptr, AbiType::Ptr],
    ret: AbiType::Void,
};
const BINARY_RET: RuntimeFnSig = RuntimeFnSig {
    params: &[AbiType::Ptr, AbiType::Ptr],
    ret: AbiType::Ptr,
};

/// A runtime entry point.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum RuntimeFn {
    // Heap objects and boxes
    AllocObject,
    DeallocObject,
    DestroyClassInstance,
    DestroyPlannedObject,
    AllocBox,
    ProjectBox,
    DeallocBox,

    // Strong and unowned reference counting
    NativeRetain,
    NativeRelease,
    NativeRetainUnowned,
    NativeUnownedRetain,
    NativeUnownedRelease,
    UnknownRetain,
    UnknownRelease,
    UnknownRetainUnowned,
    UnknownUnownedRetain,
    UnknownUnownedRelease,
    LegacyRetain,
    LegacyRelease,
    BridgeRetain,
    BridgeRelease,
    BlockCopy,
    BlockRelease,
    ErrorRetain,
    ErrorRelease,

    // Weak references
    NativeWeakInit,
    NativeWeakAssign,
    NativeWeakLoadStrong,
    NativeWeakTakeStrong,
    NativeWeakDestroy,
    NativeWeakCopyInit,
    NativeWeakCopyAssign,
    NativeWeakTakeInit,
    NativeWeakTakeAssign,
    UnknownWeakInit,
    UnknownWeakAssign,
    UnknownWeakLoadStrong,
    UnknownWeakTakeStrong,
    UnknownWeakDestroy,
    UnknownWeakCopyInit,
    UnknownWeakCopyAssign,
    UnknownWeakTakeInit,
    UnknownWeakTakeAssign,

    // Generic metadata instantiation
    GetGenericMetadata,
    GetGenericMetadata1,
    GetGenericMetadata2,
    GetGenericMetadata3,
    GetGenericMetadata4,
    AllocateGenericValueMetadata,
    AllocateGenericClassMetadata,
    InitStructMetadataUniversal,
    InitEnumMetadataUniversal,
    InitClassMetadataUniversal,
    InitializeSuperclass,
    RegisterLegacyClass,

    // Structural metadata
    GetTupleMetadata,
    GetTupleMetadata2,
    GetTupleMetadata3,
    GetFunctionMetadata,
    GetFunctionMetadata1,
    GetFunctionMetadata2,
    GetFunctionMetadata3,
    GetMetatypeMetadata,
    GetExistentialMetatypeMetadata,
    GetExistentialMetadata,
}

impl RuntimeFn {
    pub const ALL: &'static [Self] = &[
        Self::AllocObject,
        Self::DeallocObject,
        Self::DestroyClassInstance,
        Self::DestroyPlannedObject,
        Self::AllocBox,
        Self::ProjectBox,
        Self::DeallocBox,
        Self::NativeRetain,
        Self::NativeRelease,
        Self::NativeRetainUnowned,
        Self::NativeUnownedRetain,
        Self::NativeUnownedRelease,
        Self::UnknownRetain,
        Self::UnknownRelease,
        Self::UnknownRetainUnowned,
        Self::UnknownUnownedRetain,
        Self::UnknownUnownedRelease,
        Self::LegacyRetain,
        Self::LegacyRelease,
        Self::BridgeRetain,
        Self::BridgeRelease,
        Self::BlockCopy,
        Self::BlockRelease,
        Self::ErrorRetain,
        Self::ErrorRelease,
        Self::NativeWeakInit,
        Self::NativeWeakAssign,
        Self::NativeWeakLoadStrong,
        Self::NativeWeakTakeStrong,
        Self::NativeWeakDestroy,
        Self::NativeWeakCopyInit,
        Self::NativeWeakCopyAssign,
        Self::NativeWeakTakeInit,
        Self::NativeWeakTakeAssign,
        Self::UnknownWeakInit,
        Self::UnknownWeakAssign,
        Self::UnknownWeakLoadStrong,
        Self::UnknownWeakTakeStrong,
        Self::UnknownWeakDestroy,
        Self::UnknownWeakCopyInit,
        Self::UnknownWeakCopyAssign,
        Self::UnknownWeakTakeInit,
        Self::UnknownWeakTakeAssign,
        Self::GetGenericMetadata,
        Self::GetGenericMetadata1,
        Self::GetGenericMetadata2,
        Self::GetGenericMetadata3,
        Self::GetGenericMetadata4,
        Self::AllocateGenericValueMetadata,
        Self::AllocateGenericClassMetadata,
        Self::InitStructMetadataUniversal,
        Self::InitEnumMetadataUniversal,
        Self::InitClassMetadataUniversal,
        Self::InitializeSuperclass,
        Self::RegisterLegacyClass,
        Self::GetTupleMetadata,
        Self::GetTupleMetadata2,
        Self::GetTupleMetadata3,
        Self::GetFunctionMetadata,
        Self::GetFunctionMetadata1,
        Self::GetFunctionMetadata2,
        Self::GetFunctionMetadata3,
        Self::GetMetatypeMetadata,
        Self::GetExistentialMetatypeMetadata,
        Self::GetExistentialMetadata,
    ];

    /// The exported C symbol.
    pub const fn symbol(self) -> &'static str {
        match self {
            Self::AllocObject => "tymeta_alloc_object",
            Self::DeallocObject => "tymeta_dealloc_object",
            Self::DestroyClassInstance => "tymeta_destroy_class_instance",
            Self::DestroyPlannedObject => "tymeta_destroy_planned_object",
            Self::AllocBox => "tymeta_alloc_box",
            Self::ProjectBox => "tymeta_project_box",
            Self::DeallocBox => "tymeta_dealloc_box",
            Self::NativeRetain => "tymeta_retain",
            Self::NativeRelease => "tymeta_release",
            Self::NativeRetainUnowned => "tymeta_retain_unowned",
            Self::NativeUnownedRetain => "tymeta_unowned_retain",
            Self::NativeUnownedRelease => "tymeta_unowned_release",
            Self::UnknownRetain => "tymeta_unknown_retain",
            Self::UnknownRelease => "tymeta_unknown_release",
            Self::UnknownRetainUnowned => "tymeta_unknown_retain_unowned",
            Self::UnknownUnownedRetain => "tymeta_unknown_unowned_retain",
            Self::UnknownUnownedRelease => "tymeta_unknown_unowned_release",
            Self::LegacyRetain => "tymeta_legacy_retain",
            Self::LegacyRelease => "tymeta_legacy_release",
            Self::BridgeRetain => "tymeta_bridge_retain",
            Self::BridgeRelease => "tymeta_bridge_release",
            Self::BlockCopy => "tymeta_block_copy",
            Self::BlockRelease => "tymeta_block_release",
            Self::ErrorRetain => "tymeta_error_retain",
            Self::ErrorRelease => "tymeta_error_release",
            Self::NativeWeakInit => "tymeta_weak_init",
            Self::NativeWeakAssign => "tymeta_weak_assign",
            Self::NativeWeakLoadStrong => "tymeta_weak_load_strong",
            Self::NativeWeakTakeStrong => "tymeta_weak_take_strong",
            Self::NativeWeakDestroy => "tymeta_weak_destroy",
            Self::NativeWeakCopyInit => "tymeta_weak_copy_init",
            Self::NativeWeakCopyAssign => "tymeta_weak_copy_assign",
            Self::NativeWeakTakeInit => "tymeta_weak_take_init",
            Self::NativeWeakTakeAssign => "tymeta_weak_take_assign",
            Self::UnknownWeakInit => "tymeta_unknown_weak_init",
            Self::UnknownWeakAssign => "tymeta_unknown_weak_assign",
            Self::UnknownWeakLoadStrong => "tymeta_unknown_weak_load_strong",
            Self::UnknownWeakTakeStrong => "tymeta_unknown_weak_take_strong",
            Self::UnknownWeakDestroy => "tymeta_unknown_weak_destroy",
            Self::UnknownWeakCopyInit => "tymeta_unknown_weak_copy_init",
            Self::UnknownWeakCopyAssign => "tymeta_unknown_weak_copy_assign",
            Self::UnknownWeakTakeInit => "tymeta_unknown_weak_take_init",
            Self::UnknownWeakTakeAssign => "tymeta_unknown_weak_take_assign",
            Self::GetGenericMetadata => "tymeta_get_generic_metadata",
            Self::GetGenericMetadata1 => "tymeta_get_generic_metadata1",
            Self::GetGenericMetadata2 => "tymeta_get_generic_metadata2",
            Self::GetGenericMetadata3 => "tymeta_get_generic_metadata3",
            Self::GetGenericMetadata4 => "tymeta_get_generic_metadata4",
            Self::AllocateGenericValueMetadata => "tymeta_allocate_generic_value_metadata",
            Self::AllocateGenericClassMetadata => "tymeta_allocate_generic_class_metadata",
            Self::InitStructMetadataUniversal => "tymeta_init_struct_metadata_universal",
            Self::InitEnumMetadataUniversal => "tymeta_init_enum_metadata_universal",
            Self::InitClassMetadataUniversal => "tymeta_init_class_metadata_universal",
            Self::InitializeSuperclass => "tymeta_initialize_superclass",
            Self::RegisterLegacyClass => "tymeta_register_legacy_class",
            Self::GetTupleMetadata => "tymeta_get_tuple_metadata",
            Self::GetTupleMetadata2 => "tymeta_get_tuple_metadata2",
            Self::GetTupleMetadata3 => "tymeta_get_tuple_metadata3",
            Self::GetFunctionMetadata => "tymeta_get_function_metadata",
            Self::GetFunctionMetadata1 => "tymeta_get_function_metadata1",
            Self::GetFunctionMetadata2 => "tymeta_get_function_metadata2",
            Self::GetFunctionMetadata3 => "tymeta_get_function_metadata3",
            Self::GetMetatypeMetadata => "tymeta_get_metatype_metadata",
            Self::GetExistentialMetatypeMetadata => "tymeta_get_existential_metatype_metadata",
            Self::GetExistentialMetadata => "tymeta_get_existential_metadata",
        }
    }

    /// Argument and return shape.
    pub const fn signature(self) -> RuntimeFnSig {
        use AbiType::{Ptr, PtrPair, Void, Word};
        match self {
            Self::AllocObject => RuntimeFnSig {
                params: &[Ptr, Word, Word],
                ret: Ptr,
            },
            Self::DeallocObject => RuntimeFnSig {
                params: &[Ptr, Word, Word],
                ret: Void,
            },
            Self::AllocBox => RuntimeFnSig {
                params: &[Ptr],
                ret: PtrPair,
            },
            Self::ProjectBox => BINARY_RET,
            Self::DeallocBox
            | Self::NativeWeakInit
            | Self::NativeWeakAssign
            | Self::NativeWeakCopyInit
            | Self::NativeWeakCopyAssign
            | Self::NativeWeakTakeInit
            | Self::NativeWeakTakeAssign
            | Self::UnknownWeakInit
            | Self::UnknownWeakAssign
            | Self::UnknownWeakCopyInit
            | Self::UnknownWeakCopyAssign
            | Self::UnknownWeakTakeInit
            | Self::UnknownWeakTakeAssign
            | Self::InitializeSuperclass => BINARY,
            Self::DestroyClassInstance
            | Self::DestroyPlannedObject
            | Self::NativeRetain
            | Self::NativeRelease
            | Self::NativeRetainUnowned
            | Self::NativeUnownedRetain
            | Self::NativeUnownedRelease
            | Self::UnknownRetain
            | Self::UnknownRelease
            | Self::UnknownRetainUnowned
            | Self::UnknownUnownedRetain
            | Self::UnknownUnownedRelease
            | Self::LegacyRetain
            | Self::LegacyRelease
            | Self::BridgeRetain
            | Self::BridgeRelease
            | Self::BlockRelease
            | Self::ErrorRetain
            | Self::ErrorRelease
            | Self::NativeWeakDestroy
            | Self::UnknownWeakDestroy => UNARY,
            Self::BlockCopy
            | Self::NativeWeakLoadStrong
            | Self::NativeWeakTakeStrong
            | Self::UnknownWeakLoadStrong
            | Self::UnknownWeakTakeStrong
            | Self::RegisterLegacyClass
            | Self::GetMetatypeMetadata
            | Self::GetExistentialMetatypeMetadata
            | Self::GetFunctionMetadata => UNARY_RET,
            Self::GetGenericMetadata
            | Self::GetGenericMetadata1
            | Self::AllocateGenericValueMetadata => BINARY_RET,
            Self::GetGenericMetadata2 | Self::GetTupleMetadata2 => RuntimeFnSig {
                params: &[Ptr, Ptr, Ptr],
                ret: Ptr,
            },
            Self::GetGenericMetadata3 | Self::GetTupleMetadata3 => RuntimeFnSig {
                params: &[Ptr, Ptr, Ptr, Ptr],
                ret: Ptr,
            },
            Self::GetGenericMetadata4 => RuntimeFnSig {
                params: &[Ptr, Ptr, Ptr, Ptr, Ptr],
                ret: Ptr,
            },
            Self::AllocateGenericClassMetadata => RuntimeFnSig {
                params: &[Ptr, Ptr, Ptr],
                ret: Ptr,
            },
            Self::InitStructMetadataUniversal | Self::InitClassMetadataUniversal => RuntimeFnSig {
                params: &[Ptr, Word, Ptr, Ptr],
                ret: Void,
            },
            Self::InitEnumMetadataUniversal => RuntimeFnSig {
                params: &[Ptr, Word, Ptr],
                ret: Void,
            },
            Self::GetTupleMetadata | Self::GetFunctionMetadata1 => RuntimeFnSig {
                params: &[Word, Ptr, Ptr],
                ret: Ptr,
            },
            Self::GetFunctionMetadata2 => RuntimeFnSig {
                params: &[Word, Ptr, Ptr, Ptr],
                ret: Ptr,
            },
            Self::GetFunctionMetadata3 => RuntimeFnSig {
                params: &[Word, Ptr, Ptr, Ptr, Ptr],
                ret: Ptr,
            },
            Self::GetExistentialMetadata => RuntimeFnSig {
                params: &[Word, Ptr],
                ret: Ptr,
            },
        }
    }

    /// Look up an entry point by its exported symbol.
    pub fn from_symbol(symbol: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|f| f.symbol() == symbol)
    }
}

impl std::fmt::Display for RuntimeFn {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.symbol())
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    reason = "tests use unwrap to panic on unexpected state"
)]
