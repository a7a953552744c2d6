//! Addresses of runtime entry points, for resolving symbolic references in
//! generated constants and for in-process execution.

use tymeta_abi::RuntimeFn;

use crate::boxes::{
    tymeta_alloc_box, tymeta_dealloc_box, tymeta_destroy_planned_object, tymeta_project_box,
};
use crate::class::{
    tymeta_destroy_class_instance, tymeta_init_class_metadata_universal,
    tymeta_initialize_superclass, tymeta_register_legacy_class,
};
use crate::heap::{
    tymeta_alloc_object, tymeta_dealloc_object, tymeta_release, tymeta_retain,
    tymeta_retain_unowned, tymeta_unowned_release, tymeta_unowned_retain,
};
use crate::instantiate::{
    tymeta_allocate_generic_class_metadata, tymeta_allocate_generic_value_metadata,
    tymeta_get_generic_metadata, tymeta_get_generic_metadata1, tymeta_get_generic_metadata2,
    tymeta_get_generic_metadata3, tymeta_get_generic_metadata4,
};
use crate::layout::{tymeta_init_enum_metadata_universal, tymeta_init_struct_metadata_universal};
use crate::refcount::{
    tymeta_block_copy, tymeta_block_release, tymeta_bridge_release, tymeta_bridge_retain,
    tymeta_error_release, tymeta_error_retain, tymeta_legacy_release, tymeta_legacy_retain,
    tymeta_unknown_release, tymeta_unknown_retain, tymeta_unknown_retain_unowned,
    tymeta_unknown_unowned_release, tymeta_unknown_unowned_retain,
};
use crate::structural::{
    tymeta_get_existential_metadata, tymeta_get_existential_metatype_metadata,
    tymeta_get_function_metadata, tymeta_get_function_metadata1, tymeta_get_function_metadata2,
    tymeta_get_function_metadata3, tymeta_get_metatype_metadata, tymeta_get_tuple_metadata,
    tymeta_get_tuple_metadata2, tymeta_get_tuple_metadata3,
};
use crate::weak::{
    tymeta_unknown_weak_assign, tymeta_unknown_weak_copy_assign, tymeta_unknown_weak_copy_init,
    tymeta_unknown_weak_destroy, tymeta_unknown_weak_init, tymeta_unknown_weak_load_strong,
    tymeta_unknown_weak_take_assign, tymeta_unknown_weak_take_init,
    tymeta_unknown_weak_take_strong, tymeta_weak_assign, tymeta_weak_copy_assign,
    tymeta_weak_copy_init, tymeta_weak_destroy, tymeta_weak_init, tymeta_weak_load_strong,
    tymeta_weak_take_assign, tymeta_weak_take_init, tymeta_weak_take_strong,
};

/// Address of the function exported for `f`.
pub fn runtime_address(f: RuntimeFn) -> usize {
    let ptr: *const () = match f {
        RuntimeFn::AllocObject => tymeta_alloc_object as *const (),
        RuntimeFn::DeallocObject => tymeta_dealloc_object as *const (),
        RuntimeFn::DestroyClassInstance => tymeta_destroy_class_instance as *const (),
        RuntimeFn::DestroyPlannedObject => tymeta_destroy_planned_object as *const (),
        RuntimeFn::AllocBox => tymeta_alloc_box as *const (),
        RuntimeFn::ProjectBox => tymeta_project_box as *const (),
        RuntimeFn::DeallocBox => tymeta_dealloc_box as *const (),
        RuntimeFn::NativeRetain => tymeta_retain as *const (),
        RuntimeFn::NativeRelease => tymeta_release as *const (),
        RuntimeFn::NativeRetainUnowned => tymeta_retain_unowned as *const (),
        RuntimeFn::NativeUnownedRetain => tymeta_unowned_retain as *const (),
        RuntimeFn::NativeUnownedRelease => tymeta_unowned_release as *const (),
        RuntimeFn::UnknownRetain => tymeta_unknown_retain as *const (),
        RuntimeFn::UnknownRelease => tymeta_unknown_release as *const (),
        RuntimeFn::UnknownRetainUnowned => tymeta_unknown_retain_unowned as *const (),
        RuntimeFn::UnknownUnownedRetain => tymeta_unknown_unowned_retain as *const (),
        RuntimeFn::UnknownUnownedRelease => tymeta_unknown_unowned_release as *const (),
        RuntimeFn::LegacyRetain => tymeta_legacy_retain as *const (),
        RuntimeFn::LegacyRelease => tymeta_legacy_release as *const (),
        RuntimeFn::BridgeRetain => tymeta_bridge_retain as *const (),
        RuntimeFn::BridgeRelease => tymeta_bridge_release as *const (),
        RuntimeFn::BlockCopy => tymeta_block_copy as *const (),
        RuntimeFn::BlockRelease => tymeta_block_release as *const (),
        RuntimeFn::ErrorRetain => tymeta_error_retain as *const (),
        RuntimeFn::ErrorRelease => tymeta_error_release as *const (),
        RuntimeFn::NativeWeakInit => tymeta_weak_init as *const (),
        RuntimeFn::NativeWeakAssign => tymeta_weak_assign as *const (),
        RuntimeFn::NativeWeakLoadStrong => tymeta_weak_load_strong as *const (),
        RuntimeFn::NativeWeakTakeStrong => tymeta_weak_take_strong as *const (),
        RuntimeFn::NativeWeakDestroy => tymeta_weak_destroy as *const (),
        RuntimeFn::NativeWeakCopyInit => tymeta_weak_copy_init as *const (),
        RuntimeFn::NativeWeakCopyAssign => tymeta_weak_copy_assign as *const (),
        RuntimeFn::NativeWeakTakeInit => tymeta_weak_take_init as *const (),
        RuntimeFn::NativeWeakTakeAssign => tymeta_weak_take_assign as *const (),
        RuntimeFn::UnknownWeakInit => tymeta_unknown_weak_init as *const (),
        RuntimeFn::UnknownWeakAssign => tymeta_unknown_weak_assign as *const (),
        RuntimeFn::UnknownWeakLoadStrong => tymeta_unknown_weak_load_strong as *const (),
        RuntimeFn::UnknownWeakTakeStrong => tymeta_unknown_weak_take_strong as *const (),
        RuntimeFn::UnknownWeakDestroy => tymeta_unknown_weak_destroy as *const (),
        RuntimeFn::UnknownWeakCopyInit => tymeta_unknown_weak_copy_init as *const (),
        RuntimeFn::UnknownWeakCopyAssign => tymeta_unknown_weak_copy_assign as *const (),
        RuntimeFn::UnknownWeakTakeInit => tymeta_unknown_weak_take_init as *const (),
        RuntimeFn::UnknownWeakTakeAssign => tymeta_unknown_weak_take_assign as *const (),
        RuntimeFn::GetGenericMetadata => tymeta_get_generic_metadata as *const (),
        RuntimeFn::GetGenericMetadata1 => tymeta_get_generic_metadata1 as *const (),
        RuntimeFn::GetGenericMetadata2 => tymeta_get_generic_metadata2 as *const (),
        RuntimeFn::GetGenericMetadata3 => tymeta_get_generic_metadata3 as *const (),
        RuntimeFn::GetGenericMetadata4 => tymeta_get_generic_metadata4 as *const (),
        RuntimeFn::AllocateGenericValueMetadata => {
            tymeta_allocate_generic_value_metadata as *const ()
        }
        RuntimeFn::AllocateGenericClassMetadata => {
            tymeta_allocate_generic_class_metadata as *const ()
        }
        RuntimeFn::InitStructMetadataUniversal => {
            tymeta_init_struct_metadata_universal as *const ()
        }
        RuntimeFn::InitEnumMetadataUniversal => tymeta_init_enum_metadata_universal as *const (),
        RuntimeFn::InitClassMetadataUniversal => {
            tymeta_init_class_metadata_universal as *const ()
        }
        RuntimeFn::InitializeSuperclass => tymeta_initialize_superclass as *const (),
        RuntimeFn::RegisterLegacyClass => tymeta_register_legacy_class as *const (),
        RuntimeFn::GetTupleMetadata => tymeta_get_tuple_metadata as *const (),
        RuntimeFn::GetTupleMetadata2 => tymeta_get_tuple_metadata2 as *const (),
        RuntimeFn::GetTupleMetadata3 => tymeta_get_tuple_metadata3 as *const (),
        RuntimeFn::GetFunctionMetadata => tymeta_get_function_metadata as *const (),
        RuntimeFn::GetFunctionMetadata1 => tymeta_get_function_metadata1 as *const (),
        RuntimeFn::GetFunctionMetadata2 => tymeta_get_function_metadata2 as *const (),
        RuntimeFn::GetFunctionMetadata3 => tymeta_get_function_metadata3 as *const (),
        RuntimeFn::GetMetatypeMetadata => tymeta_get_metatype_metadata as *const (),
        RuntimeFn::GetExistentialMetatypeMetadata => {
            tymeta_get_existential_metatype_metadata as *const ()
        }
        RuntimeFn::GetExistentialMetadata => tymeta_get_existential_metadata as *const (),
    };
    ptr as usize
}

/// Entry point whose exported function lives at `address`.
pub fn runtime_fn_at(address: usize) -> Option<RuntimeFn> {
    RuntimeFn::ALL
        .iter()
        .copied()
        .find(|&f| runtime_address(f) == address)
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    reason = "tests use unwrap to panic on unexpected state"
)]
