//! Code tables and their on-disk record format.
//!
//! # Record Format
//!
//! ```text
//! +-----------------+
//! | byte (1)        |  the symbol
//! +-----------------+
//! | bit_length (1)  |  u8 code length in bits
//! +-----------------+
//! | code (2)        |  u16 little-endian, first bit of the code in bit 0
//! +-----------------+
//! ```
//!
//! One record per symbol, in the encode table's insertion order. The order
//! is preserved through a round trip so re-serializing a parsed table
//! reproduces the same bytes.
//!
//! The same record buffer is parsed into two shapes: [`EncodeTable`]
//! (symbol -> code) and [`DecodeTable`] (length -> code -> symbol). The
//! decode shape is partitioned by length because the same numeric value can
//! belong to different symbols at different lengths.

use std::collections::{HashMap, HashSet};

use crate::error::{Result, TableError};

/// Size of one serialized record in bytes.
pub const RECORD_SIZE: usize = 4;

/// Code assigned to one symbol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CodeEntry {
    /// Number of bits in the code
    pub bit_length: u32,
    /// Code bits; the first bit emitted is bit 0
    pub code: u64,
}

impl CodeEntry {
    pub fn new(bit_length: u32, code: u64) -> Self {
        Self { bit_length, code }
    }

    /// True if this code is a bit-prefix of `other` (or equal to it).
    pub fn is_prefix_of(&self, other: &CodeEntry) -> bool {
        if self.bit_length > other.bit_length {
            return false;
        }
        let mask = if self.bit_length >= 64 {
            u64::MAX
        } else {
            (1u64 << self.bit_length) - 1
        };
        other.code & mask == self.code
    }
}

/// Symbol -> code mapping used by the encoder.
///
/// Keeps entries in insertion order for serialization and a 256-slot index
/// for constant-time lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodeTable {
    entries: Vec<(u8, CodeEntry)>,
    index: [Option<CodeEntry>; 256],
}

impl EncodeTable {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            index: [None; 256],
        }
    }

    /// Insert or replace the code for `byte`.
    ///
    /// A replaced entry keeps its original position. Returns the previous
    /// code, if any.
    pub fn insert(&mut self, byte: u8, entry: CodeEntry) -> Option<CodeEntry> {
        let previous = self.index[byte as usize].replace(entry);
        match previous {
            Some(_) => {
                if let Some(slot) = self.entries.iter_mut().find(|(b, _)| *b == byte) {
                    slot.1 = entry;
                }
            }
            None => self.entries.push((byte, entry)),
        }
        previous
    }

    pub fn get(&self, byte: u8) -> Option<CodeEntry> {
        self.index[byte as usize]
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (u8, CodeEntry)> + '_ {
        self.entries.iter().copied()
    }

    /// Length of the longest code.
    pub fn max_bit_length(&self) -> u32 {
        self.entries
            .iter()
            .map(|(_, entry)| entry.bit_length)
            .max()
            .unwrap_or(0)
    }
}

impl Default for EncodeTable {
    fn default() -> Self {
        Self::new()
    }
}

/// Length -> code -> symbol mapping used by the decoder.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DecodeTable {
    by_length: HashMap<u32, HashMap<u64, u8>>,
}

impl DecodeTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `byte` under `entry`. The first symbol registered for a
    /// given length and code wins.
    pub fn insert(&mut self, byte: u8, entry: CodeEntry) {
        self.by_length
            .entry(entry.bit_length)
            .or_default()
            .entry(entry.code)
            .or_insert(byte);
    }

    /// Symbol for `code` at exactly `bit_length` bits.
    pub fn lookup(&self, bit_length: u32, code: u64) -> Option<u8> {
        self.by_length
            .get(&bit_length)
            .and_then(|codes| codes.get(&code))
            .copied()
    }

    /// Number of symbols across all lengths.
    pub fn len(&self) -> usize {
        self.by_length.values().map(HashMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn max_bit_length(&self) -> u32 {
        self.by_length.keys().copied().max().unwrap_or(0)
    }
}

impl From<&EncodeTable> for DecodeTable {
    fn from(table: &EncodeTable) -> Self {
        let mut decode = DecodeTable::new();
        for (byte, entry) in table.iter() {
            decode.insert(byte, entry);
        }
        decode
    }
}

/// Serialize `table` into 4-byte records.
///
/// # Errors
/// - `TableError::BitLengthOverflow` if a length does not fit in a u8
/// - `TableError::CodeOverflow` if a code does not fit in a u16
pub fn serialize(table: &EncodeTable) -> Result<Vec<u8>> {
    let mut buffer = Vec::with_capacity(table.len() * RECORD_SIZE);

    for (byte, entry) in table.iter() {
        let bit_length = u8::try_from(entry.bit_length).map_err(|_| {
            TableError::BitLengthOverflow {
                byte,
                bit_length: entry.bit_length,
            }
        })?;
        let code = u16::try_from(entry.code)
            .map_err(|_| TableError::CodeOverflow { byte, code: entry.code })?;

        buffer.push(byte);
        buffer.push(bit_length);
        buffer.extend_from_slice(&code.to_le_bytes());
    }

    Ok(buffer)
}

/// Parse `buffer` into records, keeping only the first record for each
/// byte and for each `(length, code)` pair. Both table shapes read the same
/// records, so they always agree on a malformed table.
fn records(buffer: &[u8]) -> Result<impl Iterator<Item = (u8, CodeEntry)> + '_> {
    if buffer.len() % RECORD_SIZE != 0 {
        return Err(TableError::InvalidLength {
            length: buffer.len(),
        }
        .into());
    }

    let mut bytes_seen = [false; 256];
    let mut codes_seen = HashSet::new();

    Ok(buffer
        .chunks_exact(RECORD_SIZE)
        .map(|record| {
            let code = u16::from_le_bytes([record[2], record[3]]);
            (record[0], CodeEntry::new(record[1] as u32, code as u64))
        })
        .filter(move |(byte, entry)| {
            if bytes_seen[*byte as usize] || codes_seen.contains(entry) {
                return false;
            }
            bytes_seen[*byte as usize] = true;
            codes_seen.insert(*entry);
            true
        }))
}

/// Parse records into an [`EncodeTable`], preserving record order.
///
/// A record repeating an earlier byte or code is skipped.
///
/// # Errors
/// Returns `TableError::InvalidLength` if the buffer is not a whole number
/// of records.
pub fn deserialize_encode(buffer: &[u8]) -> Result<EncodeTable> {
    let mut table = EncodeTable::new();
    for (byte, entry) in records(buffer)? {
        table.insert(byte, entry);
    }
    Ok(table)
}

/// Parse records into a [`DecodeTable`].
///
/// A record repeating an earlier byte or code is skipped.
///
/// # Errors
/// Returns `TableError::InvalidLength` if the buffer is not a whole number
/// of records.
pub fn deserialize_decode(buffer: &[u8]) -> Result<DecodeTable> {
    let mut table = DecodeTable::new();
    for (byte, entry) in records(buffer)? {
        table.insert(byte, entry);
    }
    Ok(table)
}
