//! Reference-counting kinds and their dispatch table.
//!
//! Every retain/release/weak call site looks its entry points up here by
//! kind. A new kind is one new row in [`TABLE`]; no call site changes.

use crate::RuntimeFn;

/// The family of retain/release/weak semantics a pointer obeys.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
#[repr(u8)]
pub enum ReferenceCounting {
    /// Native heap objects.
    Native = 0,
    /// Objects owned by the legacy object runtime.
    LegacyObject = 1,
    /// Either native or legacy; decided dynamically.
    Unknown = 2,
    /// A tagged pointer to a native or legacy object.
    Bridge = 3,
    /// Block (closure) objects.
    Block = 4,
    /// Boxed error existentials.
    Error = 5,
}

impl ReferenceCounting {
    pub const ALL: [Self; 6] = [
        Self::Native,
        Self::LegacyObject,
        Self::Unknown,
        Self::Bridge,
        Self::Block,
        Self::Error,
    ];

    #[inline]
    fn row(self) -> &'static RefCountRow {
        &TABLE[self as usize]
    }

    /// Strong, unowned and weak entry points for this kind.
    pub fn ops(self) -> &'static RefCountOps {
        &self.row().ops
    }

    /// Storage representation of a reference of this kind.
    pub fn pointer_repr(self) -> PointerRepr {
        self.row().repr
    }
}

/// Storage type of a reference. All representations are one pointer wide;
/// they differ in which runtime understands the pointee.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum PointerRepr {
    NativeObject,
    LegacyObject,
    UnknownObject,
    BridgeObject,
    BlockObject,
    ErrorObject,
}

impl PointerRepr {
    pub const fn size(self) -> usize {
        crate::POINTER_SIZE
    }

    pub const fn align_mask(self) -> usize {
        crate::POINTER_ALIGN_MASK
    }

    /// Bridge pointers carry tag bits, so not every low bit is spare.
    pub const fn has_spare_low_bits(self) -> bool {
        !matches!(self, Self::BridgeObject)
    }
}

/// Weak-reference entry points.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub struct WeakOps {
    pub init: RuntimeFn,
    pub assign: RuntimeFn,
    pub load_strong: RuntimeFn,
    pub take_strong: RuntimeFn,
    pub destroy: RuntimeFn,
    pub copy_init: RuntimeFn,
    pub copy_assign: RuntimeFn,
    pub take_init: RuntimeFn,
    pub take_assign: RuntimeFn,
}

/// Strong and unowned entry points plus the weak set.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub struct RefCountOps {
    pub retain: RuntimeFn,
    pub release: RuntimeFn,
    pub retain_unowned: RuntimeFn,
    pub unowned_retain: RuntimeFn,
    pub unowned_release: RuntimeFn,
    pub weak: WeakOps,
}

struct RefCountRow {
    ops: RefCountOps,
    repr: PointerRepr,
}

const NATIVE_WEAK: WeakOps = WeakOps {
    init: RuntimeFn::NativeWeakInit,
    assign: RuntimeFn::NativeWeakAssign,
    load_strong: RuntimeFn::NativeWeakLoadStrong,
    take_strong: RuntimeFn::NativeWeakTakeStrong,
    destroy: RuntimeFn::NativeWeakDestroy,
    copy_init: RuntimeFn::NativeWeakCopyInit,
    copy_assign: RuntimeFn::NativeWeakCopyAssign,
    take_init: RuntimeFn::NativeWeakTakeInit,
    take_assign: RuntimeFn::NativeWeakTakeAssign,
};

const UNKNOWN_WEAK: WeakOps = WeakOps {
    init: RuntimeFn::UnknownWeakInit,
    assign: RuntimeFn::UnknownWeakAssign,
    load_strong: RuntimeFn::UnknownWeakLoadStrong,
    take_strong: RuntimeFn::UnknownWeakTakeStrong,
    destroy: RuntimeFn::UnknownWeakDestroy,
    copy_init: RuntimeFn::UnknownWeakCopyInit,
    copy_assign: RuntimeFn::UnknownWeakCopyAssign,
    take_init: RuntimeFn::UnknownWeakTakeInit,
    take_assign: RuntimeFn::UnknownWeakTakeAssign,
};

const fn unknown_ownership(retain: RuntimeFn, release: RuntimeFn) -> RefCountOps {
    RefCountOps {
        retain,
        release,
        retain_unowned: RuntimeFn::UnknownRetainUnowned,
        unowned_retain: RuntimeFn::UnknownUnownedRetain,
        unowned_release: RuntimeFn::UnknownUnownedRelease,
        weak: UNKNOWN_WEAK,
    }
}

// Indexed by `ReferenceCounting as usize`.
static TABLE: [RefCountRow; 6] = [
    RefCountRow {
        ops: RefCountOps {
            retain: RuntimeFn::NativeRetain,
            release: RuntimeFn::NativeRelease,
            retain_unowned: RuntimeFn::NativeRetainUnowned,
            unowned_retain: RuntimeFn::NativeUnownedRetain,
            unowned_release: RuntimeFn::NativeUnownedRelease,
            weak: NATIVE_WEAK,
        },
        repr: PointerRepr::NativeObject,
    },
    RefCountRow {
        ops: unknown_ownership(RuntimeFn::LegacyRetain, RuntimeFn::LegacyRelease),
        repr: PointerRepr::LegacyObject,
    },
    RefCountRow {
        ops: unknown_ownership(RuntimeFn::UnknownRetain, RuntimeFn::UnknownRelease),
        repr: PointerRepr::UnknownObject,
    },
    RefCountRow {
        ops: unknown_ownership(RuntimeFn::BridgeRetain, RuntimeFn::BridgeRelease),
        repr: PointerRepr::BridgeObject,
    },
    RefCountRow {
        ops: unknown_ownership(RuntimeFn::BlockCopy, RuntimeFn::BlockRelease),
        repr: PointerRepr::BlockObject,
    },
    RefCountRow {
        ops: RefCountOps {
            retain: RuntimeFn::ErrorRetain,
            release: RuntimeFn::ErrorRelease,
            retain_unowned: RuntimeFn::NativeRetainUnowned,
            unowned_retain: RuntimeFn::NativeUnownedRetain,
            unowned_release: RuntimeFn::NativeUnownedRelease,
            weak: NATIVE_WEAK,
        },
        repr: PointerRepr::ErrorObject,
    },
];

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    reason = "tests use unwrap to panic on unexpected state"
)]
mod tests;
