use super::*;
use crate::alloc::{is_live, Watch};
use crate::test_support::{enum_record, generic_pair_pattern, struct_record};
use crate::witness::builtin_metadata;
use pretty_assertions::assert_eq;
use std::sync::Barrier;
use tymeta_abi::BuiltinType;

fn int(bits: u32) -> MetadataRef {
    builtin_metadata(match bits {
        8 => BuiltinType::Int8,
        16 => BuiltinType::Int16,
        32 => BuiltinType::Int32,
        _ => BuiltinType::Int64,
    })
}

fn accessor_of(metadata: MetadataRef) -> &'static FieldTypeAccessor {
    metadata
        .descriptor()
        .and_then(|d| d.field_type_accessor())
        .unwrap()
}

// ── Publication ──

#[test]
fn slot_starts_null_and_first_call_publishes() {
    let s = struct_record("Point\0", &[int(32), int(64)]);
    let accessor = accessor_of(s);
    assert!(accessor.cached(s).is_null());

    let first = accessor.get(s);
    assert!(!first.is_null());
    assert_eq!(accessor.cached(s), first);
    assert_eq!(accessor.get(s), first);

    let entries = field_type_vector(s);
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].type_address(), int(32).addr());
    assert_eq!(entries[1].type_address(), int(64).addr());
    assert!(!entries[0].is_indirect());
}

#[test]
fn racing_builders_publish_exactly_one_vector() {
    const THREADS: usize = 8;
    let s = struct_record("Pair\0", &[int(8), int(16)]);
    let accessor = accessor_of(s);
    let barrier = Barrier::new(THREADS);

    // (built, won, published); the vector as an address so it can cross threads
    let outcomes: Vec<(Watch, bool, usize)> = std::thread::scope(|scope| {
        let handles: Vec<_> = (0..THREADS)
            .map(|_| {
                scope.spawn(|| {
                    let built = accessor.build(s);
                    let watch = Watch::new(built.cast());
                    barrier.wait();
                    let outcome = accessor.publish(s, built);
                    (
                        watch,
                        matches!(outcome, Publish::Won(_)),
                        outcome.vector() as usize,
                    )
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    let winners: Vec<_> = outcomes.iter().filter(|(_, won, _)| *won).collect();
    assert_eq!(winners.len(), 1);
    let published = winners[0].2;
    for &(built, won, vector) in &outcomes {
        assert_eq!(vector, published);
        if !won {
            assert!(!built.is_live(), "loser kept its vector");
        }
    }
    assert!(is_live(published as *const u8));
    assert_eq!(accessor.cached(s) as usize, published);
}

#[test]
fn late_reader_sees_winner_without_building() {
    let s = struct_record("Late\0", &[int(32), int(32)]);
    let accessor = accessor_of(s);
    let winner = accessor.get(s);
    let extra = accessor.build(s);
    let watch = Watch::new(extra.cast());
    assert_eq!(accessor.publish(s, extra), Publish::Lost(winner));
    assert!(!watch.is_live());
}

// ── Shapes ──

#[test]
fn empty_types_share_a_static_vector() {
    let s = struct_record("Unit\0", &[]);
    let accessor = accessor_of(s);
    assert!(accessor.is_empty());
    assert!(!accessor.get(s).is_null());
    assert!(field_type_vector(s).is_empty());
}

#[test]
fn indirect_payloads_keep_their_flag() {
    let e = enum_record("Tree\0", &[(int(64), true), (int(8), false)], 0);
    let entries = field_type_vector(e);
    assert!(entries[0].is_indirect());
    assert_eq!(entries[0].type_address(), int(64).addr());
    assert!(!entries[1].is_indirect());
}

#[test]
fn generic_instances_resolve_arguments_into_their_own_slot() {
    let pattern = generic_pair_pattern("Pair\0");
    let a = pattern.get(&[int(8).addr(), int(64).addr()]).unwrap();
    let b = pattern.get(&[int(16).addr(), int(32).addr()]).unwrap();

    let fa = field_type_vector(a);
    let fb = field_type_vector(b);
    assert_eq!(
        fa.iter().map(|t| t.type_address()).collect::<Vec<_>>(),
        vec![int(8).addr(), int(64).addr()]
    );
    assert_eq!(
        fb.iter().map(|t| t.type_address()).collect::<Vec<_>>(),
        vec![int(16).addr(), int(32).addr()]
    );
    assert_ne!(fa.as_ptr(), fb.as_ptr());
}

#[test]
fn unresolvable_argument_builds_nothing() {
    let accessor = FieldTypeAccessor::new(
        FieldTypeSlot::global(),
        vec![FieldTypeSource {
            source: MetadataSource::Argument(3),
            indirect: false,
        }],
    );
    assert!(accessor.build(int(8)).is_null());
    assert!(accessor.get(int(8)).is_null());
}
