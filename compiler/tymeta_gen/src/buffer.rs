//! Append-only constant buffers.
//!
//! Records are written front to back. A field whose value is only known
//! later is reserved and filled through its [`Reservation`], which names an
//! exact byte range and may be filled once.

use smallvec::SmallVec;
use tymeta_abi::{round_up, POINTER_ALIGN_MASK, POINTER_SIZE};

use crate::symbol::{Relocation, Symbol};

/// A reserved byte range of a [`ConstantBuffer`].
#[derive(Debug)]
#[must_use = "a reservation must be filled"]
pub struct Reservation {
    index: usize,
    start: usize,
    len: usize,
}

impl Reservation {
    pub fn offset(&self) -> usize {
        self.start
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

/// The bytes of one constant plus its symbolic words.
#[derive(Debug, Default)]
pub struct ConstantBuffer {
    bytes: Vec<u8>,
    relocations: Vec<Relocation>,
    /// Filled flag per reservation.
    filled: SmallVec<[bool; 4]>,
    align_mask: usize,
}

impl ConstantBuffer {
    /// An empty, pointer-aligned buffer.
    pub fn new() -> Self {
        Self {
            align_mask: POINTER_ALIGN_MASK,
            ..Self::default()
        }
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn align_mask(&self) -> usize {
        self.align_mask
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn relocations(&self) -> &[Relocation] {
        &self.relocations
    }

    pub fn add_bytes(&mut self, bytes: &[u8]) {
        self.bytes.extend_from_slice(bytes);
    }

    pub fn add_zeros(&mut self, len: usize) {
        self.bytes.resize(self.bytes.len() + len, 0);
    }

    pub fn add_word(&mut self, value: usize) {
        self.add_bytes(&value.to_ne_bytes());
    }

    pub fn add_u32(&mut self, value: u32) {
        self.add_bytes(&value.to_ne_bytes());
    }

    pub fn add_u16(&mut self, value: u16) {
        self.add_bytes(&value.to_ne_bytes());
    }

    /// A pointer-sized word holding `symbol`'s address.
    pub fn add_symbol(&mut self, symbol: Symbol) {
        self.add_symbol_offset(symbol, 0);
    }

    /// A pointer-sized word holding `symbol`'s address plus `addend`.
    pub fn add_symbol_offset(&mut self, symbol: Symbol, addend: isize) {
        assert_eq!(
            self.bytes.len() & POINTER_ALIGN_MASK,
            0,
            "symbolic word at unaligned offset {}",
            self.bytes.len()
        );
        self.relocations.push(Relocation {
            offset: self.bytes.len(),
            symbol,
            addend,
        });
        self.add_word(0);
    }

    /// Pad with zeros to `align_mask + 1`, raising the buffer's alignment.
    pub fn align_to(&mut self, align_mask: usize) {
        self.align_mask |= align_mask;
        let end = round_up(self.bytes.len(), align_mask);
        self.bytes.resize(end, 0);
    }

    /// Reserve `len` zeroed bytes to fill later.
    pub fn reserve(&mut self, len: usize) -> Reservation {
        let reservation = Reservation {
            index: self.filled.len(),
            start: self.bytes.len(),
            len,
        };
        self.filled.push(false);
        self.add_zeros(len);
        reservation
    }

    pub fn fill(&mut self, reservation: Reservation, bytes: &[u8]) {
        assert_eq!(
            bytes.len(),
            reservation.len,
            "reservation at {} filled with the wrong byte size",
            reservation.start
        );
        let Some(filled) = self.filled.get_mut(reservation.index) else {
            panic!("reservation from another buffer");
        };
        assert!(
            !*filled,
            "reservation at {} filled twice",
            reservation.start
        );
        *filled = true;
        self.bytes[reservation.start..reservation.start + reservation.len].copy_from_slice(bytes);
    }

    pub fn fill_word(&mut self, reservation: Reservation, value: usize) {
        self.fill(reservation, &value.to_ne_bytes());
    }

    pub fn fill_u32(&mut self, reservation: Reservation, value: u32) {
        self.fill(reservation, &value.to_ne_bytes());
    }

    pub fn fill_u16(&mut self, reservation: Reservation, value: u16) {
        self.fill(reservation, &value.to_ne_bytes());
    }

    pub fn fill_symbol(&mut self, reservation: Reservation, symbol: Symbol) {
        assert_eq!(
            reservation.len, POINTER_SIZE,
            "reservation at {} filled with the wrong byte size",
            reservation.start
        );
        self.relocations.push(Relocation {
            offset: reservation.start,
            symbol,
            addend: 0,
        });
        self.fill_word(reservation, 0);
    }

    /// Whether every reservation has been filled.
    pub fn is_complete(&self) -> bool {
        self.filled.iter().all(|&f| f)
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    reason = "tests use unwrap to panic on unexpected state"
)]
