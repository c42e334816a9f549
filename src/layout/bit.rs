//! # Presence Bits
//!
//! Fixed and variable columns track presence in a bitmask at the front of the
//! fixed region. Bits are allocated in declaration order and addressed
//! LSB-first within each byte: bit 0 is the lowest bit of byte 0, bit 8 the
//! lowest bit of byte 1, and so on.

/// A single allocated bit within a row's presence bitmask.
///
/// Holds the bit's global index, or `-1` when no bit was allocated (non-null
/// fixed columns have no null bit).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LayoutBit(i32);

impl LayoutBit {
    /// Sentinel for "no bit allocated".
    pub const INVALID: LayoutBit = LayoutBit(-1);

    pub(crate) const fn new(index: i32) -> Self {
        LayoutBit(index)
    }

    pub fn is_invalid(self) -> bool {
        self.0 < 0
    }

    /// Byte offset of the bit relative to the bitmask start.
    ///
    /// Must not be called on [`LayoutBit::INVALID`].
    pub fn offset(self, base: usize) -> usize {
        debug_assert!(!self.is_invalid());
        base + (self.0 as usize) / 8
    }

    /// Position of the bit within its byte, LSB-first.
    pub fn bit(self) -> u8 {
        debug_assert!(!self.is_invalid());
        (self.0 % 8) as u8
    }
}

/// Hands out monotonically increasing bit indices during layout compilation.
#[derive(Debug, Default)]
pub(crate) struct BitAllocator {
    next: i32,
}

impl BitAllocator {
    pub fn new() -> Self {
        BitAllocator { next: 0 }
    }

    pub fn allocate(&mut self) -> LayoutBit {
        let bit = LayoutBit(self.next);
        self.next += 1;
        bit
    }

    /// Number of bytes the bitmask occupies for the bits allocated so far.
    pub fn bytes_needed(&self) -> usize {
        (self.next as usize).div_ceil(8)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bits_are_addressed_lsb_first() {
        let mut alloc = BitAllocator::new();
        let b0 = alloc.allocate();
        assert_eq!(b0.offset(0), 0);
        assert_eq!(b0.bit(), 0);

        for _ in 0..7 {
            alloc.allocate();
        }
        let b8 = alloc.allocate();
        assert_eq!(b8.offset(0), 1);
        assert_eq!(b8.bit(), 0);
        assert_eq!(b8.offset(5), 6);
    }

    #[test]
    fn bytes_needed_rounds_up() {
        let mut alloc = BitAllocator::new();
        assert_eq!(alloc.bytes_needed(), 0);
        alloc.allocate();
        assert_eq!(alloc.bytes_needed(), 1);
        for _ in 0..8 {
            alloc.allocate();
        }
        assert_eq!(alloc.bytes_needed(), 2);
    }

    #[test]
    fn invalid_bit_is_marked() {
        assert!(LayoutBit::INVALID.is_invalid());
        assert!(!LayoutBit::new(0).is_invalid());
    }
}
