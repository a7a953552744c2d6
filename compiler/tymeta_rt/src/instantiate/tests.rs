use super::*;
use crate::alloc::is_live;
use crate::class::is_legacy_registered;
use crate::test_support::{
    as_metadata, class_record, generic_pair_pattern, install_pattern, pair, pattern_buffer, W,
};
use crate::witness::builtin_metadata;
use pretty_assertions::assert_eq;
use std::sync::Barrier;
use tymeta_abi::BuiltinType;

fn int(ty: BuiltinType) -> usize {
    builtin_metadata(ty).addr()
}

// ── Pattern shape ──

#[test]
fn pair_pattern_header() {
    let pattern = generic_pair_pattern("Pair\0");
    let header = pattern.header();
    assert_eq!(header.private_data.len(), 16);
    assert_eq!(usize::from(header.num_arguments), 2);
    assert_eq!(usize::from(header.address_point), W);
    assert_eq!(
        header.template() as usize - std::ptr::from_ref(header) as usize,
        GENERIC_PATTERN_HEADER_SIZE
    );
    assert_eq!(header.pattern().map(GenericPattern::name), Some("Pair"));

    let create = pattern.create_function();
    assert_eq!(create.fill_ops.len(), 2);
    assert_ne!(create.fill_ops[0].dest, create.fill_ops[1].dest);
    assert!(create.fill_ops.iter().all(|op| op.dest >= 0));
}

// ── Instantiation ──

#[test]
fn instance_binds_arguments_and_lays_out_fields() {
    let pattern = generic_pair_pattern("Pair\0");
    let (a, b) = (int(BuiltinType::Int8), int(BuiltinType::Int64));
    let instance = pattern.get(&[a, b]).unwrap();

    assert_eq!(instance.kind(), Some(MetadataKind::Struct));
    assert_eq!(instance.generic_arguments(), &[a, b]);
    assert_eq!(instance.field_offsets(), &[0, 8]);
    assert_eq!(instance.size(), 16);
    assert_eq!(instance.align_mask(), 7);
    assert!(instance.is_pod());
    assert!(has_dependent_witnesses(instance));
}

#[test]
fn same_arguments_give_same_instance() {
    let pattern = generic_pair_pattern("Pair\0");
    let args = [int(BuiltinType::Int32), int(BuiltinType::Int16)];
    let first = pattern.get(&args).unwrap();
    assert_eq!(pattern.get(&args), Some(first));
    assert_eq!(pattern.instance_count(), 1);

    let other = pattern.get(&[args[1], args[0]]).unwrap();
    assert_ne!(other, first);
    assert_eq!(pattern.instance_count(), 2);
}

#[test]
fn concurrent_requests_share_one_instance() {
    const THREADS: usize = 8;
    let pattern = generic_pair_pattern("Pair\0");
    let args = [int(BuiltinType::Float64), int(BuiltinType::NativeObject)];
    let barrier = Barrier::new(THREADS);

    let results: Vec<usize> = std::thread::scope(|s| {
        let handles: Vec<_> = (0..THREADS)
            .map(|_| {
                s.spawn(|| {
                    barrier.wait();
                    pattern.get(&args).map_or(0, MetadataRef::addr)
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    assert_ne!(results[0], 0);
    assert!(results.iter().all(|&r| r == results[0]));
    assert_eq!(pattern.instance_count(), 1);
    let base = results[0] - W;
    assert!(is_live(base as *const u8));
}

#[test]
fn wrong_argument_count_is_rejected() {
    let pattern = generic_pair_pattern("Pair\0");
    assert_eq!(pattern.get(&[int(BuiltinType::Int8)]), None);
    assert_eq!(pattern.instance_count(), 0);
}

// ── C entry points ──

#[test]
fn entry_points_agree_with_get() {
    let pattern = generic_pair_pattern("Pair\0");
    let header = std::ptr::from_ref(pattern.header());
    let args = [int(BuiltinType::Int8), int(BuiltinType::Int8)];

    let by_array = tymeta_get_generic_metadata(header, args.as_ptr());
    let by_two = tymeta_get_generic_metadata2(header, args[0], args[1]);
    assert_eq!(by_array, by_two);
    assert_eq!(as_metadata(by_array), pattern.get(&args).unwrap());

    // arity mismatch through a fast path
    assert!(tymeta_get_generic_metadata1(header, args[0]).is_null());
    assert!(tymeta_get_generic_metadata(std::ptr::null(), args.as_ptr()).is_null());
    assert!(tymeta_get_generic_metadata(header, std::ptr::null()).is_null());
}

#[test]
fn allocate_value_metadata_is_not_uniqued() {
    let pattern = generic_pair_pattern("Pair\0");
    let header = std::ptr::from_ref(pattern.header());
    let args = [int(BuiltinType::Int32), int(BuiltinType::Int32)];
    let first = as_metadata(tymeta_allocate_generic_value_metadata(header, args.as_ptr()));
    let second = as_metadata(tymeta_allocate_generic_value_metadata(header, args.as_ptr()));
    assert_ne!(first, second);
    assert_eq!(first.word(pair::offset(pair::ARGS)), args[0]);
    assert_eq!(
        first.word(offsets::VALUE_WITNESSES),
        first.addr() + pair::offset(pair::WITNESSES) as usize
    );
    assert_eq!(pattern.instance_count(), 0);
}

// ── Classes ──

#[test]
fn generic_class_links_superclass_and_copies_ancestors() {
    let int64 = builtin_metadata(BuiltinType::Int64);
    let int32 = builtin_metadata(BuiltinType::Int32);
    let base = class_record("Base\0", None, &[int64]);
    let model = class_record("Sub\0", Some(base), &[int32]);

    let ap_words = model.u32_at(offsets::CLASS_ADDRESS_POINT) as usize / W;
    let total_words = model.u32_at(offsets::CLASS_SIZE) as usize / W;
    let inherited = offsets::CLASS_MEMBERS;
    let (header, template) = pattern_buffer(total_words);
    // SAFETY: the template is as large as the model record
    let pattern = unsafe {
        let model_start = model.as_ptr().cast::<usize>().sub(ap_words);
        std::ptr::copy_nonoverlapping(model_start, template, total_words);
        let at = |offset: isize| template.add(ap_words).offset(offset / W as isize);
        at(offsets::CLASS_SUPERCLASS).write(0);
        at(inherited).write(0);
        at(inherited + W as isize).write(0);
        install_pattern(
            "Sub",
            header,
            total_words,
            ap_words,
            0,
            CreateFunction {
                kind: MetadataKind::Class,
                fill_ops: Vec::new(),
                ancestor_copies: vec![AncestorCopy {
                    offset: inherited,
                    len_words: 2,
                }],
                dependent_witnesses: None,
                field_type_slot: None,
                superclass: Some(MetadataSource::Direct(base)),
                init: InitHook::Class {
                    dependent_layout: false,
                    register_legacy: true,
                },
            },
        )
    };

    let instance = pattern.get(&[]).unwrap();
    assert_eq!(instance.superclass(), Some(base));
    assert_eq!(instance.word(inherited + W as isize), base.field_offsets()[0]);
    assert_eq!(instance.field_offsets(), model.field_offsets());
    assert!(is_legacy_registered(instance));
    assert!(!has_dependent_witnesses(instance));
}
