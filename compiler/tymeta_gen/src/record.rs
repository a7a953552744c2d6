//! Writing metadata records and generic patterns into constant buffers.
//!
//! The record's shape comes from [`scan`]; the caller supplies a value for
//! each slot as the scan reaches it. A pattern is the same record written
//! as a template after a [`PatternHeader`].

use std::ops::ControlFlow;

use tymeta_abi::{GENERIC_PATTERN_HEADER_SIZE, NUM_GENERIC_METADATA_PRIVATE_DATA_WORDS, POINTER_SIZE};
use tymeta_rt::{CreateFunction, PatternHeader};

use crate::buffer::ConstantBuffer;
use crate::scan::{scan, RecordShape, RecordSize, ScanField};
use crate::symbol::Symbol;

/// What goes into one slot.
#[derive(Clone, Debug)]
pub enum SlotValue {
    Zero,
    Word(usize),
    Symbol(Symbol),
    U32(u32),
    U16(u16),
    Words(Vec<usize>),
}

impl SlotValue {
    fn write(self, buffer: &mut ConstantBuffer, field: ScanField) {
        let start = buffer.len();
        match self {
            Self::Zero => buffer.add_zeros(field.size),
            Self::Word(word) => buffer.add_word(word),
            Self::Symbol(symbol) => buffer.add_symbol(symbol),
            Self::U32(value) => buffer.add_u32(value),
            Self::U16(value) => buffer.add_u16(value),
            Self::Words(words) => {
                for word in words {
                    buffer.add_word(word);
                }
            }
        }
        assert_eq!(
            buffer.len() - start,
            field.size,
            "{:?} written with the wrong byte size",
            field.slot
        );
    }
}

/// Append a record of `shape` to `buffer`, asking `value` for each slot.
pub fn write_record(
    buffer: &mut ConstantBuffer,
    shape: &RecordShape,
    mut value: impl FnMut(ScanField) -> SlotValue,
) -> RecordSize {
    let start = buffer.len();
    let address_point = start + shape.address_point();
    let end = scan(shape, |field| {
        assert_eq!(
            buffer.len() as isize - address_point as isize,
            field.offset,
            "{:?} out of place",
            field.slot
        );
        let slot_value = value(field);
        tracing::trace!(slot = ?field.slot, offset = field.offset, value = ?slot_value, "record slot");
        slot_value.write(buffer, field);
        ControlFlow::Continue(())
    });
    match end {
        ControlFlow::Continue(size) => size,
        ControlFlow::Break(field) => panic!("record write stopped at {field:?}"),
    }
}

/// A pattern: header followed by the template of `shape`.
pub fn pattern_buffer(
    shape: &RecordShape,
    create: &'static CreateFunction,
    num_arguments: usize,
    value: impl FnMut(ScanField) -> SlotValue,
) -> ConstantBuffer {
    let num_arguments = u16::try_from(num_arguments)
        .unwrap_or_else(|_| panic!("{num_arguments} generic argument words"));

    let mut buffer = ConstantBuffer::new();
    buffer.add_symbol(Symbol::address(create));
    assert_eq!(
        buffer.len(),
        std::mem::offset_of!(PatternHeader, metadata_size),
        "pattern header out of place"
    );
    let metadata_size = buffer.reserve(4);
    buffer.add_u16(num_arguments);
    let address_point = buffer.reserve(2);
    buffer.add_zeros(NUM_GENERIC_METADATA_PRIVATE_DATA_WORDS * POINTER_SIZE);
    assert_eq!(
        buffer.len(),
        GENERIC_PATTERN_HEADER_SIZE,
        "pattern header out of place"
    );

    let size = write_record(&mut buffer, shape, value);
    let template = u32::try_from(size.size)
        .unwrap_or_else(|_| panic!("pattern template of {} bytes", size.size));
    let point = u16::try_from(size.address_point)
        .unwrap_or_else(|_| panic!("address point at {}", size.address_point));
    buffer.fill_u32(metadata_size, template);
    buffer.fill_u16(address_point, point);
    debug_assert!(buffer.is_complete());
    buffer
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    reason = "tests use unwrap to panic on unexpected state"
)]
mod tests;
