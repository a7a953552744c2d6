use super::*;
use proptest::prelude::*;

#[test]
fn default_flags_describe_pod_inline_takable() {
    let flags = ValueWitnessFlags::new();
    assert!(flags.is_pod());
    assert!(flags.is_inline());
    assert!(flags.is_bitwise_takable());
    assert_eq!(flags.alignment(), 1);
}

#[test]
fn non_pod_bit_position() {
    let flags = ValueWitnessFlags::new().with_alignment_mask(7).with_pod(false);
    assert_eq!(flags.bits(), 0x1_0007);
}

proptest! {
    #[test]
    fn round_trip(
        mask in 0..=ValueWitnessFlags::MAX_ALIGNMENT_MASK,
        pod in any::<bool>(),
        inline in any::<bool>(),
        extra in any::<bool>(),
        spare in any::<bool>(),
        takable in any::<bool>(),
        enum_w in any::<bool>(),
    ) {
        let flags = ValueWitnessFlags::new()
            .with_alignment_mask(mask)
            .with_pod(pod)
            .with_inline(inline)
            .with_extra_inhabitants(extra)
            .with_spare_bits(spare)
            .with_bitwise_takable(takable)
            .with_enum_witnesses(enum_w);
        prop_assert_eq!(flags.alignment_mask(), mask);
        prop_assert_eq!(flags.is_pod(), pod);
        prop_assert_eq!(flags.is_inline(), inline);
        prop_assert_eq!(flags.has_extra_inhabitants(), extra);
        prop_assert_eq!(flags.has_spare_bits(), spare);
        prop_assert_eq!(flags.is_bitwise_takable(), takable);
        prop_assert_eq!(flags.has_enum_witnesses(), enum_w);
    }

    #[test]
    fn alignment_setter_is_isolated(bits in any::<usize>(), mask in 0..=ValueWitnessFlags::MAX_ALIGNMENT_MASK) {
        let flags = ValueWitnessFlags::from_bits(bits).with_alignment_mask(mask);
        prop_assert_eq!(flags.bits() & !0xFFFF, bits & !0xFFFF);
    }
}
