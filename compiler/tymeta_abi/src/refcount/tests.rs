use super::*;
use crate::AbiType;
use pretty_assertions::assert_eq;

#[test]
fn table_rows_match_kind_order() {
    let reprs: Vec<_> = ReferenceCounting::ALL
        .iter()
        .map(|k| k.pointer_repr())
        .collect();
    assert_eq!(
        reprs,
        vec![
            PointerRepr::NativeObject,
            PointerRepr::LegacyObject,
            PointerRepr::UnknownObject,
            PointerRepr::BridgeObject,
            PointerRepr::BlockObject,
            PointerRepr::ErrorObject,
        ]
    );
}

#[test]
fn native_kind_uses_native_entry_points() {
    let ops = ReferenceCounting::Native.ops();
    assert_eq!(ops.retain, RuntimeFn::NativeRetain);
    assert_eq!(ops.release, RuntimeFn::NativeRelease);
    assert_eq!(ops.weak.load_strong, RuntimeFn::NativeWeakLoadStrong);
}

#[test]
fn block_retain_is_a_copy() {
    assert_eq!(ReferenceCounting::Block.ops().retain, RuntimeFn::BlockCopy);
}

#[test]
fn every_kind_has_distinct_strong_entry_points() {
    for kind in ReferenceCounting::ALL {
        let ops = kind.ops();
        assert_ne!(ops.retain, ops.release, "{kind:?}");
    }
}

#[test]
fn release_and_unowned_ops_take_one_pointer() {
    for kind in ReferenceCounting::ALL {
        let ops = kind.ops();
        for f in [ops.release, ops.unowned_retain, ops.unowned_release, ops.weak.destroy] {
            assert_eq!(f.signature().params, &[AbiType::Ptr], "{f}");
        }
    }
}

#[test]
fn only_bridge_pointers_lack_spare_bits() {
    for kind in ReferenceCounting::ALL {
        let repr = kind.pointer_repr();
        assert_eq!(repr.size(), crate::POINTER_SIZE);
        assert_eq!(repr.has_spare_low_bits(), kind != ReferenceCounting::Bridge);
    }
}
