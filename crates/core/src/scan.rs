//! Single-pass frequency and digest scan.
//!
//! The encoder needs both the byte histogram (to build the code table) and
//! the SHA-256 of the original content (to embed in the header). Both are
//! computed from the same chunked read so the source is only scanned once
//! before packing.

use std::io::{ErrorKind, Read};

use sha2::{Digest as _, Sha256};

use crate::error::Result;

/// Size of a SHA-256 digest in bytes.
pub const DIGEST_SIZE: usize = 32;

/// SHA-256 digest of original content.
pub type Digest = [u8; DIGEST_SIZE];

/// Read size for the scan loop.
pub(crate) const SCAN_CHUNK: usize = 64 * 1024;

/// Occurrence count for every byte value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrequencyTable {
    counts: [u64; 256],
}

impl FrequencyTable {
    pub fn new() -> Self {
        Self { counts: [0; 256] }
    }

    /// Count every byte of `data`.
    pub fn from_bytes(data: &[u8]) -> Self {
        let mut table = Self::new();
        table.record(data);
        table
    }

    /// Add the bytes of `data` to the counts.
    pub fn record(&mut self, data: &[u8]) {
        for &byte in data {
            self.counts[byte as usize] += 1;
        }
    }

    /// Set the count for one byte value directly.
    pub fn set(&mut self, byte: u8, count: u64) {
        self.counts[byte as usize] = count;
    }

    pub fn get(&self, byte: u8) -> u64 {
        self.counts[byte as usize]
    }

    /// Number of distinct byte values observed.
    pub fn distinct(&self) -> usize {
        self.counts.iter().filter(|&&count| count > 0).count()
    }

    /// Total number of bytes counted.
    pub fn total(&self) -> u64 {
        self.counts.iter().sum()
    }

    pub fn is_empty(&self) -> bool {
        self.distinct() == 0
    }

    /// Observed byte values with their counts, in ascending byte order.
    pub fn iter(&self) -> impl Iterator<Item = (u8, u64)> + '_ {
        self.counts
            .iter()
            .enumerate()
            .filter(|(_, &count)| count > 0)
            .map(|(byte, &count)| (byte as u8, count))
    }
}

impl Default for FrequencyTable {
    fn default() -> Self {
        Self::new()
    }
}

impl FromIterator<(u8, u64)> for FrequencyTable {
    fn from_iter<I: IntoIterator<Item = (u8, u64)>>(iter: I) -> Self {
        let mut table = Self::new();
        for (byte, count) in iter {
            table.set(byte, count);
        }
        table
    }
}

/// Read `source` to the end, returning the digest of everything read and
/// the byte histogram.
///
/// # Errors
/// Propagates any read error other than `Interrupted`.
pub fn scan<R: Read>(source: &mut R) -> Result<(Digest, FrequencyTable)> {
    let mut hasher = Sha256::new();
    let mut frequencies = FrequencyTable::new();
    let mut buffer = vec![0u8; SCAN_CHUNK];

    loop {
        let read = read_chunk(source, &mut buffer)?;
        if read == 0 {
            break;
        }
        let chunk = &buffer[..read];
        frequencies.record(chunk);
        hasher.update(chunk);
    }

    Ok((hasher.finalize().into(), frequencies))
}

/// Fill as much of `buffer` as one read allows, retrying on `Interrupted`.
/// Returns 0 at end of stream.
pub(crate) fn read_chunk<R: Read + ?Sized>(source: &mut R, buffer: &mut [u8]) -> Result<usize> {
    loop {
        match source.read(buffer) {
            Ok(read) => return Ok(read),
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        }
    }
}

/// SHA-256 of everything readable from `source`.
pub fn digest_of<R: Read>(source: &mut R) -> Result<Digest> {
    let mut hasher = Sha256::new();
    std::io::copy(source, &mut hasher)?;
    Ok(hasher.finalize().into())
}
