use super::*;
use pretty_assertions::assert_eq;
use proptest::prelude::*;
use tymeta_abi::BuiltinType;
use tymeta_rt::heap::tymeta_release;
use tymeta_rt::witness::builtin_metadata;

fn pod(size: usize, align_mask: usize) -> HeapElement {
    HeapElement::value(TypeInfo::Fixed(FixedLayout::pod(size, align_mask)), None)
}

fn generic() -> HeapElement {
    HeapElement::value(TypeInfo::NonFixed, None)
}

const INTEGERS: [BuiltinType; 4] = [
    BuiltinType::Int8,
    BuiltinType::Int16,
    BuiltinType::Int32,
    BuiltinType::Int64,
];

// ── Static pass ──

#[test]
fn fixed_elements_follow_the_header() {
    let layout = HeapLayout::new(vec![pod(8, 7), pod(4, 3)]);
    let first = round_up(HEADER_SIZE, 7);
    assert_eq!(
        layout.placements(),
        &[
            ElementPlacement::Fixed(first),
            ElementPlacement::Fixed(first + 8)
        ]
    );
    assert_eq!(layout.bindings_offset(), None);
    assert_eq!(layout.fixed_size(), Some(first + 12));
    assert!(layout.is_fixed());
}

#[test]
fn bindings_buffer_precedes_elements() {
    let layout = HeapLayout::new(vec![pod(8, 7), generic(), pod(1, 0), generic()]);
    let bindings = round_up(HEADER_SIZE, POINTER_ALIGN_MASK);
    assert_eq!(layout.bindings_offset(), Some(bindings));
    assert_eq!(layout.num_bindings(), 2);
    assert_eq!(
        layout.placements(),
        &[
            ElementPlacement::Fixed(bindings + 2 * POINTER_SIZE),
            ElementPlacement::NonFixed,
            ElementPlacement::NonFixed,
            ElementPlacement::NonFixed,
        ]
    );
    assert_eq!(layout.fixed_size(), None);
}

#[test]
fn empty_elements_take_no_storage() {
    let layout = HeapLayout::new(vec![pod(0, 0), pod(2, 1), pod(0, 0)]);
    let placements = layout.placements();
    assert_eq!(placements[0], ElementPlacement::Empty);
    assert_eq!(placements[2], ElementPlacement::Empty);
    assert_eq!(layout.fixed_size(), Some(round_up(HEADER_SIZE, 1) + 2));
}

// ── Destroy plans ──

#[test]
fn plan_destroys_only_non_pod_elements() {
    let layout = HeapLayout::new(vec![
        HeapElement::value(
            TypeInfo::Fixed(FixedLayout::reference(ReferenceCounting::Native)),
            None,
        ),
        pod(8, 7),
        HeapElement::weak(),
        HeapElement::unowned(),
        generic(),
    ]);
    let plan = layout.destroy_plan();
    let destroys: Vec<&str> = plan
        .elements
        .iter()
        .map(|e| match e.destroy {
            ElementDestroy::None => "none",
            ElementDestroy::Release(_) => "release",
            ElementDestroy::UnownedRelease => "unowned",
            ElementDestroy::WeakDestroy => "weak",
            ElementDestroy::Witness(_) => "witness",
            ElementDestroy::WitnessBinding(_) => "binding",
        })
        .collect();
    assert_eq!(destroys, ["release", "none", "weak", "unowned", "binding"]);
    assert_eq!(plan.elements[4].size, ElementSize::Binding(0));
    assert_eq!(plan.elements[4].offset, ElementOffset::Dynamic);
    assert_eq!(plan.bindings_offset, layout.bindings_offset());
}

#[test]
fn aggregate_elements_destroy_through_their_metadata() {
    let metadata = builtin_metadata(BuiltinType::NativeObject);
    let element = HeapElement::value(TypeInfo::Fixed(FixedLayout::words(2)), Some(metadata));
    let plan = HeapLayout::new(vec![element]).destroy_plan();
    assert!(matches!(
        plan.elements[0].destroy,
        ElementDestroy::Witness(m) if m == metadata
    ));
}

// ── Allocation ──

#[test]
fn allocation_records_bindings() {
    let ty = HeapObjectType::new(HeapLayout::new(vec![pod(4, 3), generic()]));
    let int64 = builtin_metadata(BuiltinType::Int64);
    let object = ty.allocate(&[int64]);
    assert!(!object.is_null());
    let at = ty.layout().bindings_offset().unwrap();
    // SAFETY: the bindings buffer was just written
    let word = unsafe { object.cast::<u8>().add(at).cast::<usize>().read() };
    assert_eq!(word, int64.addr());
    let offsets = ty.element_offsets(object);
    assert_eq!(offsets[1] % 8, 0);
    assert!(offsets[1] >= offsets[0] + 4);
    tymeta_release(object);
}

#[test]
#[should_panic(expected = "bindings region size disagreement")]
fn allocation_checks_binding_count() {
    let ty = HeapObjectType::new(HeapLayout::new(vec![generic(), generic()]));
    let _ = ty.allocate(&[builtin_metadata(BuiltinType::Int8)]);
}

proptest! {
    #[test]
    fn non_fixed_offset_rounds_up_past_the_prefix(which in 0usize..4) {
        let binding = builtin_metadata(INTEGERS[which]);
        let ty = HeapObjectType::new(HeapLayout::new(vec![pod(8, 7), pod(4, 3), generic()]));
        let object = ty.allocate(&[binding]);
        let offsets = ty.element_offsets(object);
        prop_assert_eq!(offsets[1] - offsets[0], 8);
        prop_assert_eq!(offsets[2] - offsets[0], round_up(16, binding.align_mask()));
        tymeta_release(object);
    }
}
