//! Bit packing for the encoded payload.
//!
//! [`BitCollector`] appends arbitrary bit ranges of fixed-width values to a
//! byte sequence. Bits are taken from the value's little-endian byte
//! representation, least significant bit first within each byte, and land in
//! the output in the same order. This is the order the decoder walks the
//! payload in, so a code recorded as an integer can be compared against the
//! accumulated bits directly.
//!
//! # Pending byte
//! - The collector holds one partial byte plus a count of valid bits (0-8).
//! - A push that leaves exactly 8 valid bits pending does NOT flush; the byte
//!   is only emitted when a later push overflows it.
//! - Callers must append the pending byte at end of stream ([`BitCollector::finish`])
//!   and record how many of its bits are valid.
//!
//! # Example
//! ```
//! use huffpack_core::bitio::BitCollector;
//!
//! let mut collector = BitCollector::new();
//! collector.push(10u32, 0, 4).unwrap();
//! collector.push(0x00FF_00FFu32, 8, 32).unwrap();
//!
//! let (bytes, valid_bits) = collector.finish();
//! assert_eq!(bytes, vec![10, 240, 15, 0]);
//! assert_eq!(valid_bits, 4);
//! ```

use crate::error::{BitIoError, Result};

/// Bits per output unit.
const UNIT_BITS: usize = 8;

/// Fixed-width values the collector can take bits from.
pub trait PackBits: Copy {
    /// Width of the value in bits.
    const BITS: usize;

    /// Byte `index` of the little-endian representation.
    fn byte_at(self, index: usize) -> u8;
}

macro_rules! impl_pack_bits {
    ($($ty:ty),*) => {
        $(
            impl PackBits for $ty {
                const BITS: usize = <$ty>::BITS as usize;

                fn byte_at(self, index: usize) -> u8 {
                    self.to_le_bytes()[index]
                }
            }
        )*
    };
}

impl_pack_bits!(u8, u16, u32, u64);

/// Packs bit ranges LSB-first into a growing byte buffer.
///
/// # Invariants
/// - `pending_bits` is in `0..=8`
/// - bits of `pending` above `pending_bits` are zero
#[derive(Debug, Clone, Default)]
pub struct BitCollector {
    /// Completed bytes not yet taken by the caller
    bytes: Vec<u8>,
    /// Partial output byte, filled from the least significant bit
    pending: u8,
    /// Number of valid bits in `pending`
    pending_bits: u8,
}

impl BitCollector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append bits `[begin, end)` of `value`.
    ///
    /// # Errors
    /// Returns `BitIoError::InvalidRange` if `begin > end` or either bound
    /// exceeds the bit width of `T`.
    pub fn push<T: PackBits>(&mut self, value: T, begin: usize, end: usize) -> Result<()> {
        let width = T::BITS;
        if begin > end || begin > width || end > width {
            return Err(BitIoError::InvalidRange { begin, end, width }.into());
        }

        let first_unit = begin / UNIT_BITS;
        let last_unit = end / UNIT_BITS;

        // Whole units covered by the range; only the first may start mid-byte.
        for unit in first_unit..last_unit {
            let from = if unit == first_unit { begin % UNIT_BITS } else { 0 };
            self.push_unit(value.byte_at(unit), from, UNIT_BITS);
        }

        // Trailing partial unit.
        if end != width {
            let from = if last_unit == first_unit { begin % UNIT_BITS } else { 0 };
            self.push_unit(value.byte_at(last_unit), from, end % UNIT_BITS);
        }

        Ok(())
    }

    fn push_unit(&mut self, unit: u8, from: usize, to: usize) {
        if from >= to {
            return;
        }

        let count = to - from;
        let bits = (unit >> from) & ((1u16 << count) - 1) as u8;
        let merged = self.pending as u16 | (bits as u16) << self.pending_bits;
        self.pending_bits += count as u8;

        if self.pending_bits as usize > UNIT_BITS {
            self.bytes.push(merged as u8);
            self.pending = (merged >> UNIT_BITS) as u8;
            self.pending_bits -= UNIT_BITS as u8;
        } else {
            self.pending = merged as u8;
        }
    }

    /// The partial byte currently held.
    pub fn pending(&self) -> u8 {
        self.pending
    }

    /// Number of valid bits in the partial byte (0-8).
    pub fn pending_bits(&self) -> u8 {
        self.pending_bits
    }

    /// Completed bytes not yet taken.
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Number of completed bytes not yet taken.
    pub fn byte_len(&self) -> usize {
        self.bytes.len()
    }

    /// Remove and return the completed bytes, keeping the pending byte.
    ///
    /// Used to flush output in bounded chunks.
    pub fn take_bytes(&mut self) -> Vec<u8> {
        std::mem::take(&mut self.bytes)
    }

    /// Append the pending byte unconditionally and return the remaining
    /// bytes together with the number of valid bits in the last one.
    ///
    /// This consumes the collector.
    pub fn finish(mut self) -> (Vec<u8>, u8) {
        self.bytes.push(self.pending);
        (self.bytes, self.pending_bits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use test_case::test_case;

    #[test]
    fn test_mixed_width_push() {
        let mut collector = BitCollector::new();
        collector.push(10u32, 0, 4).unwrap();
        collector.push(0x00FF_00FFu32, 8, 32).unwrap();

        assert_eq!(collector.pending(), 0);
        assert_eq!(collector.pending_bits(), 4);

        let (bytes, valid_bits) = collector.finish();
        assert_eq!(bytes, vec![10, 240, 15, 0]);
        assert_eq!(valid_bits, 4);
    }

    #[test]
    fn test_lsb_first_order() {
        let mut collector = BitCollector::new();
        // 1, then 0, 1 -> 0b101 packed from the low end
        collector.push(1u8, 0, 1).unwrap();
        collector.push(0b10u8, 0, 2).unwrap();

        assert_eq!(collector.pending(), 0b101);
        assert_eq!(collector.pending_bits(), 3);
    }

    #[test]
    fn test_exactly_eight_bits_stay_pending() {
        let mut collector = BitCollector::new();
        collector.push(0xAu8, 0, 4).unwrap();
        collector.push(0x5u8, 0, 4).unwrap();

        assert_eq!(collector.byte_len(), 0);
        assert_eq!(collector.pending(), 0x5A);
        assert_eq!(collector.pending_bits(), 8);

        // One more bit overflows the full byte.
        collector.push(1u8, 0, 1).unwrap();
        assert_eq!(collector.bytes(), &[0x5A]);
        assert_eq!(collector.pending(), 1);
        assert_eq!(collector.pending_bits(), 1);
    }

    #[test]
    fn test_finish_full_byte() {
        let mut collector = BitCollector::new();
        collector.push(0xC3u8, 0, 8).unwrap();

        let (bytes, valid_bits) = collector.finish();
        assert_eq!(bytes, vec![0xC3]);
        assert_eq!(valid_bits, 8);
    }

    #[test]
    fn test_finish_empty() {
        let (bytes, valid_bits) = BitCollector::new().finish();
        assert_eq!(bytes, vec![0]);
        assert_eq!(valid_bits, 0);
    }

    #[test]
    fn test_range_within_one_byte() {
        let mut collector = BitCollector::new();
        // bits 2..5 of 0b0011_0100 are 1, 0, 1
        collector.push(0b0011_0100u8, 2, 5).unwrap();

        assert_eq!(collector.pending(), 0b101);
        assert_eq!(collector.pending_bits(), 3);
    }

    #[test]
    fn test_range_crossing_bytes() {
        let mut collector = BitCollector::new();
        collector.push(0xABCDu16, 4, 12).unwrap();

        // bits 4..8 of 0xCD = 0xC, bits 0..4 of 0xAB = 0xB
        assert_eq!(collector.pending(), 0xBC);
        assert_eq!(collector.pending_bits(), 8);
    }

    #[test]
    fn test_unaligned_accumulation() {
        let mut collector = BitCollector::new();
        for _ in 0..5 {
            collector.push(0b111u8, 0, 3).unwrap();
        }

        // 15 ones: one full byte emitted, 7 pending
        assert_eq!(collector.bytes(), &[0xFF]);
        assert_eq!(collector.pending(), 0x7F);
        assert_eq!(collector.pending_bits(), 7);
    }

    #[test]
    fn test_full_u64() {
        let mut collector = BitCollector::new();
        let value = 0x0123_4567_89AB_CDEFu64;
        collector.push(value, 0, 64).unwrap();
        collector.push(0u8, 0, 1).unwrap();

        let (bytes, valid_bits) = collector.finish();
        assert_eq!(&bytes[..8], &value.to_le_bytes());
        assert_eq!(bytes[8], 0);
        assert_eq!(valid_bits, 1);
    }

    #[test]
    fn test_take_bytes_keeps_pending() {
        let mut collector = BitCollector::new();
        collector.push(0xFFFFu16, 0, 12).unwrap();
        collector.push(0u8, 0, 5).unwrap();

        let taken = collector.take_bytes();
        assert_eq!(taken, vec![0xFF, 0x0F]);
        assert_eq!(collector.byte_len(), 0);
        assert_eq!(collector.pending_bits(), 1);
    }

    #[test]
    fn test_zero_width_push() {
        let mut collector = BitCollector::new();
        collector.push(0xFFu8, 3, 3).unwrap();
        assert_eq!(collector.pending_bits(), 0);
    }

    #[test_case(5, 4; "begin after end")]
    #[test_case(0, 33; "end past width")]
    #[test_case(40, 40; "begin past width")]
    fn test_invalid_range(begin: usize, end: usize) {
        let mut collector = BitCollector::new();
        let result = collector.push(0u32, begin, end);
        assert!(matches!(
            result,
            Err(Error::BitIo(BitIoError::InvalidRange { width: 32, .. }))
        ));
    }
}
