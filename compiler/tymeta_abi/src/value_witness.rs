//! Value-witness table flags.

/// Flags word of a value-witness table.
///
/// The low 16 bits hold the alignment mask; the rest are boolean layout
/// properties.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Default)]
pub struct ValueWitnessFlags(usize);

impl ValueWitnessFlags {
    const ALIGNMENT_MASK: usize = 0x0000_FFFF;
    const IS_NON_POD: usize = 0x0001_0000;
    const IS_NON_INLINE: usize = 0x0002_0000;
    const HAS_EXTRA_INHABITANTS: usize = 0x0004_0000;
    const HAS_SPARE_BITS: usize = 0x0008_0000;
    const IS_NON_BITWISE_TAKABLE: usize = 0x0010_0000;
    const HAS_ENUM_WITNESSES: usize = 0x0020_0000;

    /// Largest alignment mask the flags word can carry.
    pub const MAX_ALIGNMENT_MASK: usize = Self::ALIGNMENT_MASK;

    pub const fn new() -> Self {
        Self(0)
    }

    pub const fn from_bits(bits: usize) -> Self {
        Self(bits)
    }

    pub const fn bits(self) -> usize {
        self.0
    }

    #[inline]
    const fn with_bit(self, bit: usize, value: bool) -> Self {
        if value {
            Self(self.0 | bit)
        } else {
            Self(self.0 & !bit)
        }
    }

    #[must_use]
    pub const fn with_alignment_mask(self, mask: usize) -> Self {
        Self((self.0 & !Self::ALIGNMENT_MASK) | (mask & Self::ALIGNMENT_MASK))
    }

    #[must_use]
    pub const fn with_pod(self, is_pod: bool) -> Self {
        self.with_bit(Self::IS_NON_POD, !is_pod)
    }

    #[must_use]
    pub const fn with_inline(self, is_inline: bool) -> Self {
        self.with_bit(Self::IS_NON_INLINE, !is_inline)
    }

    #[must_use]
    pub const fn with_extra_inhabitants(self, value: bool) -> Self {
        self.with_bit(Self::HAS_EXTRA_INHABITANTS, value)
    }

    #[must_use]
    pub const fn with_spare_bits(self, value: bool) -> Self {
        self.with_bit(Self::HAS_SPARE_BITS, value)
    }

    #[must_use]
    pub const fn with_bitwise_takable(self, value: bool) -> Self {
        self.with_bit(Self::IS_NON_BITWISE_TAKABLE, !value)
    }

    #[must_use]
    pub const fn with_enum_witnesses(self, value: bool) -> Self {
        self.with_bit(Self::HAS_ENUM_WITNESSES, value)
    }

    pub const fn alignment_mask(self) -> usize {
        self.0 & Self::ALIGNMENT_MASK
    }

    pub const fn alignment(self) -> usize {
        self.alignment_mask() + 1
    }

    pub const fn is_pod(self) -> bool {
        self.0 & Self::IS_NON_POD == 0
    }

    pub const fn is_inline(self) -> bool {
        self.0 & Self::IS_NON_INLINE == 0
    }

    pub const fn has_extra_inhabitants(self) -> bool {
        self.0 & Self::HAS_EXTRA_INHABITANTS != 0
    }

    pub const fn has_spare_bits(self) -> bool {
        self.0 & Self::HAS_SPARE_BITS != 0
    }

    pub const fn is_bitwise_takable(self) -> bool {
        self.0 & Self::IS_NON_BITWISE_TAKABLE == 0
    }

    pub const fn has_enum_witnesses(self) -> bool {
        self.0 & Self::HAS_ENUM_WITNESSES != 0
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    reason = "tests use unwrap to panic on unexpected state"
)]
mod tests;
