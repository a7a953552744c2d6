//! Metadata record layout.
//!
//! Every record shape is walked by [`scan`], which reports each slot with
//! its offset from the address point. The record builders write slots as
//! they are reached; the sizer and the searchers stop at the end or at the
//! slot they want.
//!
//! ```text
//! struct  [vwt] AP [kind][descriptor][parent][field offsets][generic args]
//! enum    [vwt] AP [kind][descriptor][parent][payload size][generic args]
//! class   [destroyer][vwt] AP [kind][superclass][cache][vtable][rodata]
//!         [flags, instance and class sizes][descriptor][ivar destroyer]
//!         then per class, root first: [parent][generic args][field offsets]
//! ```
//!
//! Patterns add a field-type vector slot (after the record for values, at
//! the end of the class's own section for classes) and, for values whose
//! witnesses depend on their arguments, a tail region for the instance's
//! own value-witness table.

use std::ops::ControlFlow;

use tymeta_abi::{offsets, POINTER_SIZE};
use tymeta_ir::{DeclId, NominalKind};
use tymeta_rt::ValueWitnessTable;

const W: usize = POINTER_SIZE;

/// A slot of a metadata record.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum Slot {
    HeapDestroyer,
    ValueWitnesses,
    Kind,
    Descriptor,
    /// Parent of a struct or enum.
    Parent,
    Superclass,
    Cache,
    VTable,
    RoData,
    ClassFlags,
    InstanceAddressPoint,
    InstanceSize,
    InstanceAlignMask,
    Reserved,
    ClassSize,
    ClassAddressPoint,
    IvarDestroyer,
    /// Parent word opening `owner`'s class section.
    SectionParent(DeclId),
    GenericArguments { owner: DeclId, words: usize },
    FieldOffsets { owner: DeclId, count: usize },
    PayloadSize,
    FieldTypeSlot(DeclId),
    DependentWitnesses,
}

impl Slot {
    /// Offsets every record of `kind` agrees on.
    fn fixed_offset(self, kind: NominalKind) -> Option<isize> {
        Some(match self {
            Self::HeapDestroyer => offsets::HEAP_DESTROY,
            Self::ValueWitnesses => offsets::VALUE_WITNESSES,
            Self::Kind => offsets::KIND,
            Self::Descriptor => match kind {
                NominalKind::Class => offsets::CLASS_DESCRIPTOR,
                NominalKind::Struct | NominalKind::Enum => offsets::VALUE_DESCRIPTOR,
            },
            Self::Parent => offsets::VALUE_PARENT,
            Self::Superclass => offsets::CLASS_SUPERCLASS,
            Self::Cache => offsets::CLASS_CACHE,
            Self::VTable => offsets::CLASS_VTABLE,
            Self::RoData => offsets::CLASS_RODATA,
            Self::ClassFlags => offsets::CLASS_FLAGS,
            Self::InstanceAddressPoint => offsets::CLASS_INSTANCE_ADDRESS_POINT,
            Self::InstanceSize => offsets::CLASS_INSTANCE_SIZE,
            Self::InstanceAlignMask => offsets::CLASS_INSTANCE_ALIGN_MASK,
            Self::Reserved => offsets::CLASS_RESERVED,
            Self::ClassSize => offsets::CLASS_SIZE,
            Self::ClassAddressPoint => offsets::CLASS_ADDRESS_POINT,
            Self::IvarDestroyer => offsets::CLASS_IVAR_DESTROYER,
            Self::SectionParent(_)
            | Self::GenericArguments { .. }
            | Self::FieldOffsets { .. }
            | Self::PayloadSize
            | Self::FieldTypeSlot(_)
            | Self::DependentWitnesses => return None,
        })
    }
}

/// A slot as reached by the scan.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub struct ScanField {
    pub slot: Slot,
    /// Byte offset from the address point.
    pub offset: isize,
    pub size: usize,
}

/// One declaration's part of a record.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub struct Section {
    pub decl: DeclId,
    /// Generic argument words: per parameter, metadata then witness tables.
    pub generic_words: usize,
    pub fields: usize,
    /// Emitted as a pattern, so its field-type vector lives in the record.
    pub pattern: bool,
}

impl Section {
    /// Words the section occupies in a class record.
    pub fn class_words(&self) -> usize {
        1 + self.generic_words + self.fields + usize::from(self.pattern)
    }
}

/// Everything that decides a record's layout.
#[derive(Clone, Eq, PartialEq, Debug)]
pub struct RecordShape {
    pub kind: NominalKind,
    /// Structs and enums: one section. Classes: root first.
    pub sections: Vec<Section>,
    pub dependent_witnesses: bool,
}

impl RecordShape {
    pub fn value(kind: NominalKind, section: Section, dependent_witnesses: bool) -> Self {
        Self {
            kind,
            sections: vec![section],
            dependent_witnesses,
        }
    }

    pub fn class(sections: Vec<Section>) -> Self {
        Self {
            kind: NominalKind::Class,
            sections,
            dependent_witnesses: false,
        }
    }

    /// Bytes from the start of the record to its address point.
    pub fn address_point(&self) -> usize {
        match self.kind {
            NominalKind::Class => 2 * W,
            NominalKind::Struct | NominalKind::Enum => W,
        }
    }
}

/// Size and address point of a record.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub struct RecordSize {
    pub size: usize,
    pub address_point: usize,
}

struct Scanner<F> {
    kind: NominalKind,
    cursor: usize,
    address_point: usize,
    hook: F,
}

impl<F: FnMut(ScanField) -> ControlFlow<()>> Scanner<F> {
    fn field(&mut self, slot: Slot, size: usize) -> ControlFlow<ScanField> {
        let field = ScanField {
            slot,
            offset: self.cursor as isize - self.address_point as isize,
            size,
        };
        if let Some(expected) = slot.fixed_offset(self.kind) {
            debug_assert_eq!(field.offset, expected, "{slot:?} out of place");
        }
        self.cursor += size;
        match (self.hook)(field) {
            ControlFlow::Continue(()) => ControlFlow::Continue(()),
            ControlFlow::Break(()) => ControlFlow::Break(field),
        }
    }

    fn words(&mut self, slot: Slot, words: usize) -> ControlFlow<ScanField> {
        if words == 0 {
            return ControlFlow::Continue(());
        }
        self.field(slot, words * W)
    }

    fn value(&mut self, shape: &RecordShape) -> ControlFlow<ScanField> {
        let Some(section) = shape.sections.first() else {
            return ControlFlow::Continue(());
        };
        self.field(Slot::ValueWitnesses, W)?;
        self.field(Slot::Kind, W)?;
        self.field(Slot::Descriptor, W)?;
        self.field(Slot::Parent, W)?;
        match shape.kind {
            NominalKind::Enum if section.pattern => self.field(Slot::PayloadSize, W)?,
            NominalKind::Enum => {}
            NominalKind::Struct | NominalKind::Class => self.words(
                Slot::FieldOffsets {
                    owner: section.decl,
                    count: section.fields,
                },
                section.fields,
            )?,
        }
        self.words(
            Slot::GenericArguments {
                owner: section.decl,
                words: section.generic_words,
            },
            section.generic_words,
        )?;
        if section.pattern {
            self.field(Slot::FieldTypeSlot(section.decl), W)?;
        }
        if shape.dependent_witnesses {
            self.field(
                Slot::DependentWitnesses,
                std::mem::size_of::<ValueWitnessTable>(),
            )?;
        }
        ControlFlow::Continue(())
    }

    fn class(&mut self, shape: &RecordShape) -> ControlFlow<ScanField> {
        self.field(Slot::HeapDestroyer, W)?;
        self.field(Slot::ValueWitnesses, W)?;
        self.field(Slot::Kind, W)?;
        self.field(Slot::Superclass, W)?;
        self.field(Slot::Cache, W)?;
        self.field(Slot::VTable, W)?;
        self.field(Slot::RoData, W)?;
        self.field(Slot::ClassFlags, 4)?;
        self.field(Slot::InstanceAddressPoint, 4)?;
        self.field(Slot::InstanceSize, 4)?;
        self.field(Slot::InstanceAlignMask, 2)?;
        self.field(Slot::Reserved, 2)?;
        self.field(Slot::ClassSize, 4)?;
        self.field(Slot::ClassAddressPoint, 4)?;
        self.field(Slot::Descriptor, W)?;
        self.field(Slot::IvarDestroyer, W)?;
        for section in &shape.sections {
            self.field(Slot::SectionParent(section.decl), W)?;
            self.words(
                Slot::GenericArguments {
                    owner: section.decl,
                    words: section.generic_words,
                },
                section.generic_words,
            )?;
            self.words(
                Slot::FieldOffsets {
                    owner: section.decl,
                    count: section.fields,
                },
                section.fields,
            )?;
            if section.pattern {
                self.field(Slot::FieldTypeSlot(section.decl), W)?;
            }
        }
        ControlFlow::Continue(())
    }
}

/// Walk `shape`, calling `hook` on each slot in order. Stops early when the
/// hook breaks and returns the slot it broke on.
pub fn scan(
    shape: &RecordShape,
    hook: impl FnMut(ScanField) -> ControlFlow<()>,
) -> ControlFlow<ScanField, RecordSize> {
    let mut scanner = Scanner {
        kind: shape.kind,
        cursor: 0,
        address_point: shape.address_point(),
        hook,
    };
    match shape.kind {
        NominalKind::Class => scanner.class(shape)?,
        NominalKind::Struct | NominalKind::Enum => scanner.value(shape)?,
    }
    assert!(
        scanner.address_point <= scanner.cursor,
        "address point beyond the record size"
    );
    ControlFlow::Continue(RecordSize {
        size: scanner.cursor,
        address_point: scanner.address_point,
    })
}

/// Size of a record of `shape`.
pub fn record_size(shape: &RecordShape) -> RecordSize {
    match scan(shape, |_| ControlFlow::Continue(())) {
        ControlFlow::Continue(size) => size,
        ControlFlow::Break(field) => panic!("scan without a target stopped at {field:?}"),
    }
}

/// Offset from the address point of the first slot matching `target`.
pub fn find_slot(shape: &RecordShape, mut target: impl FnMut(Slot) -> bool) -> Option<isize> {
    let found = scan(shape, |field| {
        if target(field.slot) {
            ControlFlow::Break(())
        } else {
            ControlFlow::Continue(())
        }
    });
    match found {
        ControlFlow::Break(field) => Some(field.offset),
        ControlFlow::Continue(_) => None,
    }
}

/// Field-offset vector of `owner`, in words from the address point.
pub fn field_offsets_words(shape: &RecordShape, owner: DeclId) -> Option<usize> {
    find_slot(shape, |slot| matches!(slot, Slot::FieldOffsets { owner: o, .. } if o == owner))
        .map(words_from)
}

/// Generic argument vector of `owner`, in words from the address point.
pub fn generic_arguments_words(shape: &RecordShape, owner: DeclId) -> Option<usize> {
    find_slot(shape, |slot| matches!(slot, Slot::GenericArguments { owner: o, .. } if o == owner))
        .map(words_from)
}

/// Payload-size word of a generic enum, in words from the address point.
pub fn payload_size_words(shape: &RecordShape) -> Option<usize> {
    find_slot(shape, |slot| slot == Slot::PayloadSize).map(words_from)
}

pub fn superclass_offset(shape: &RecordShape) -> Option<isize> {
    find_slot(shape, |slot| slot == Slot::Superclass)
}

fn words_from(offset: isize) -> usize {
    assert!(offset >= 0, "vector at {offset} lies before the address point");
    offset.unsigned_abs() / W
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    reason = "tests use unwrap to panic on unexpected state"
)]
