//! Lazy cache cells and metadata accessors.
//!
//! A cache cell starts null and is written with the computed pointer. Reads
//! are acquire loads paired with the release store of the writer, so a
//! reader that sees a pointer also sees everything the writer stored through
//! it. A hit is exactly one atomic load.
//!
//! Accessors store unconditionally: the computed record is deterministic and
//! uniqued elsewhere, so concurrent computations store the same pointer.

use std::fmt;
use std::ptr::NonNull;
use std::sync::atomic::{AtomicPtr, Ordering};

use crate::metadata::{Metadata, MetadataRef};

/// A once-written, freely-read pointer slot.
pub struct LazyCacheCell<T> {
    value: AtomicPtr<T>,
}

impl<T> LazyCacheCell<T> {
    pub const fn new() -> Self {
        Self {
            value: AtomicPtr::new(std::ptr::null_mut()),
        }
    }

    #[inline]
    pub fn get(&self) -> Option<NonNull<T>> {
        NonNull::new(self.value.load(Ordering::Acquire))
    }

    #[inline]
    pub fn set(&self, value: NonNull<T>) {
        self.value.store(value.as_ptr(), Ordering::Release);
    }

    /// Return the cached pointer, computing and storing it on a miss.
    pub fn get_or_compute(&self, compute: impl FnOnce() -> NonNull<T>) -> NonNull<T> {
        if let Some(value) = self.get() {
            return value;
        }
        let value = compute();
        self.set(value);
        value
    }

    /// Address of the slot itself.
    pub fn slot_address(&self) -> usize {
        std::ptr::addr_of!(self.value) as usize
    }
}

impl<T> Default for LazyCacheCell<T> {
    fn default() -> Self {
        Self::new()
    }
}

type Compute = Box<dyn Fn() -> MetadataRef + Send + Sync>;

/// A metadata accessor: a cache cell plus the computation that fills it.
///
/// `compute` must run any initialization that has to happen before a load
/// from the result (such as linking a superclass) before it returns.
pub struct MetadataAccessor {
    name: String,
    cell: LazyCacheCell<Metadata>,
    compute: Compute,
}

impl MetadataAccessor {
    pub fn new(
        name: impl Into<String>,
        compute: impl Fn() -> MetadataRef + Send + Sync + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            cell: LazyCacheCell::new(),
            compute: Box::new(compute),
        }
    }

    /// Create an accessor that lives until process exit.
    pub fn leak(
        name: impl Into<String>,
        compute: impl Fn() -> MetadataRef + Send + Sync + 'static,
    ) -> &'static Self {
        Box::leak(Box::new(Self::new(name, compute)))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Cached record, or compute, store and return it.
    pub fn get(&self) -> MetadataRef {
        if let Some(hit) = self.cell.get() {
            return MetadataRef::from_non_null(hit);
        }
        let value = (self.compute)();
        tracing::trace!(accessor = %self.name, metadata = ?value.as_ptr(), "cache fill");
        self.cell.set(value.as_non_null());
        value
    }

    /// The cached record without computing.
    pub fn cached(&self) -> Option<MetadataRef> {
        self.cell.get().map(MetadataRef::from_non_null)
    }
}

impl fmt::Debug for MetadataAccessor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MetadataAccessor")
            .field("name", &self.name)
            .field("cached", &self.cached())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    reason = "tests use unwrap to panic on unexpected state"
)]
