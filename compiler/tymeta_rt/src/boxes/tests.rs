use super::*;
use crate::alloc::Watch;
use crate::heap::{tymeta_release, tymeta_retain};
use crate::refcount::release_fn;
use crate::test_support::{struct_record, W};
use crate::witness::builtin_metadata;
use pretty_assertions::assert_eq;
use tymeta_abi::{BuiltinType, ReferenceCounting};

fn object() -> *mut HeapObject {
    tymeta_alloc_object(std::ptr::null(), HEADER_SIZE, 7)
}

fn assert_fits(pair: BoxPair, layout: ElementLayout) {
    assert!(!pair.object.is_null());
    let offset = pair.value as usize - pair.object as usize;
    assert_eq!(pair.value as usize & layout.align_mask, 0);
    // SAFETY: the object is live
    let alloc_size = unsafe { (*pair.object).alloc_size() };
    assert!(offset >= HEADER_SIZE);
    assert!(offset + layout.size <= alloc_size);
}

// ── Runtime boxes ──

#[test]
fn runtime_box_fits_its_value() {
    for ty in [BuiltinType::Int8, BuiltinType::Int64, BuiltinType::NativeObject] {
        let metadata = builtin_metadata(ty);
        let pair = tymeta_alloc_box(metadata.as_ptr());
        let pair_watch = Watch::new(pair.object.cast());
        assert_fits(pair, ElementLayout::of(metadata));
        assert_eq!(tymeta_project_box(pair.object, metadata.as_ptr()), pair.value);
        tymeta_dealloc_box(pair.object, metadata.as_ptr());
        assert!(!pair_watch.is_live());
    }
}

#[test]
fn runtime_box_records_are_shared_per_type() {
    let metadata = builtin_metadata(BuiltinType::Int32);
    let first = box_metadata_for(metadata);
    let second = box_metadata_for(metadata);
    assert!(std::ptr::eq(first, second));
    assert_eq!(first.metadata().kind(), Some(MetadataKind::HeapGenericLocalVariable));
}

#[test]
fn releasing_a_box_destroys_its_value() {
    let native = builtin_metadata(BuiltinType::NativeObject);
    let inner = object();
    let inner_watch = Watch::new(inner.cast());
    let pair = tymeta_alloc_box(native.as_ptr());
    let pair_watch = Watch::new(pair.object.cast());
    // SAFETY: the value slot holds one reference
    unsafe { pair.value.cast::<*mut HeapObject>().write(inner) };
    tymeta_retain(pair.object);
    tymeta_release(pair.object);
    assert!(inner_watch.is_live());
    tymeta_release(pair.object);
    assert!(!inner_watch.is_live());
    assert!(!pair_watch.is_live());
}

#[test]
fn struct_values_box_through_their_witnesses() {
    let native = builtin_metadata(BuiltinType::NativeObject);
    let int16 = builtin_metadata(BuiltinType::Int16);
    let s = struct_record("Tagged\0", &[int16, native]);
    let inner = object();
    let inner_watch = Watch::new(inner.cast());
    let pair = tymeta_alloc_box(s.as_ptr());
    assert_fits(pair, ElementLayout::of(s));
    // SAFETY: the second field is a reference at word 1
    unsafe { pair.value.add(W).cast::<*mut HeapObject>().write(inner) };
    tymeta_release(pair.object);
    assert!(!inner_watch.is_live());
}

#[test]
fn null_inputs_are_ignored() {
    let pair = tymeta_alloc_box(std::ptr::null());
    assert!(pair.object.is_null() && pair.value.is_null());
    assert!(tymeta_project_box(std::ptr::null_mut(), std::ptr::null()).is_null());
    tymeta_dealloc_box(std::ptr::null_mut(), std::ptr::null());
    tymeta_destroy_planned_object(std::ptr::null_mut());
}

// ── Plans ──

#[test]
fn dynamic_elements_follow_the_bindings() {
    let int64 = builtin_metadata(BuiltinType::Int64);
    let int8 = builtin_metadata(BuiltinType::Int8);
    let bindings = round_up(HEADER_SIZE, 7);
    let plan = DestroyPlan {
        elements: vec![
            PlanElement {
                offset: ElementOffset::Fixed(bindings),
                size: ElementSize::Fixed(ElementLayout::new(2 * W, 7)),
                destroy: ElementDestroy::None,
            },
            PlanElement {
                offset: ElementOffset::Fixed(bindings + 2 * W),
                size: ElementSize::Fixed(ElementLayout::new(1, 0)),
                destroy: ElementDestroy::None,
            },
            PlanElement {
                offset: ElementOffset::Dynamic,
                size: ElementSize::Binding(0),
                destroy: ElementDestroy::WitnessBinding(0),
            },
            PlanElement {
                offset: ElementOffset::Dynamic,
                size: ElementSize::Binding(1),
                destroy: ElementDestroy::WitnessBinding(1),
            },
        ],
        bindings_offset: Some(bindings),
        prefix_end: bindings + 2 * W + 1,
        prefix_align_mask: 7,
    };
    let mut object = vec![0usize; 16];
    object[bindings / W] = int64.addr();
    object[bindings / W + 1] = int8.addr();
    let offsets = plan.element_offsets(object.as_ptr().cast());
    let first_dynamic = round_up(bindings + 2 * W + 1, 7);
    assert_eq!(
        offsets.as_slice(),
        &[bindings, bindings + 2 * W, first_dynamic, first_dynamic + 8]
    );
}

#[test]
fn plan_releases_each_reference_kind() {
    let strong = object();
    let strong_watch = Watch::new(strong.cast());
    let unowned = object();
    let unowned_watch = Watch::new(unowned.cast());
    crate::heap::tymeta_unowned_retain(unowned);
    let start = round_up(HEADER_SIZE, 7);
    let plan = DestroyPlan {
        elements: vec![
            PlanElement {
                offset: ElementOffset::Fixed(start),
                size: ElementSize::Fixed(ElementLayout::pointer()),
                destroy: ElementDestroy::Release(release_fn(ReferenceCounting::Native)),
            },
            PlanElement {
                offset: ElementOffset::Fixed(start + W),
                size: ElementSize::Fixed(ElementLayout::pointer()),
                destroy: ElementDestroy::UnownedRelease,
            },
        ],
        bindings_offset: None,
        prefix_end: start + 2 * W,
        prefix_align_mask: 7,
    };
    let record = BoxMetadata::leak(MetadataKind::HeapLocalVariable, start, start + 2 * W, 7, plan);
    let pair = record.allocate();
    // SAFETY: both slots lie inside the fresh box
    unsafe {
        pair.value.cast::<*mut HeapObject>().write(strong);
        pair.value.add(W).cast::<*mut HeapObject>().write(unowned);
    }
    tymeta_release(unowned);
    assert!(unowned_watch.is_live());
    tymeta_release(pair.object);
    assert!(!strong_watch.is_live());
    assert!(!unowned_watch.is_live());
}
