//! Encoded file header.
//!
//! Every encoded file starts with a fixed, unpadded header followed by the
//! serialized code table and the bit-packed payload.
//!
//! # File Format
//!
//! ```text
//! +-----------------------+
//! | table_len (8)         |  u64 little-endian, bytes of code table
//! +-----------------------+
//! | final_bits (1)        |  u8 valid bits in the last payload byte
//! +-----------------------+
//! | digest (32)           |  SHA-256 of the ORIGINAL content
//! +-----------------------+
//! | code table            |  table_len bytes of 4-byte records
//! | (variable)            |
//! +-----------------------+
//! | payload               |  LSB-first bit stream
//! | (variable)            |
//! +-----------------------+
//! ```
//!
//! `final_bits` is only known once the payload has been packed, so the
//! encoder writes the header twice: a placeholder first, the final value
//! after the payload.

use std::io::{ErrorKind, Read, Write};

use crate::error::{FormatError, Result};
use crate::scan::{Digest, DIGEST_SIZE};

/// Size of the header in bytes.
pub const HEADER_SIZE: usize = 8 + 1 + DIGEST_SIZE;

/// Fixed preamble of every encoded file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamHeader {
    /// Length of the serialized code table in bytes
    pub table_len: u64,

    /// Valid bits in the final payload byte (0-8)
    pub final_bits: u8,

    /// SHA-256 of the original content
    pub digest: Digest,
}

impl StreamHeader {
    /// Header with the final bit count still unknown.
    pub fn placeholder(table_len: u64, digest: Digest) -> Self {
        Self {
            table_len,
            final_bits: 0,
            digest,
        }
    }

    /// Pack the header field by field, with no padding.
    pub fn to_bytes(&self) -> [u8; HEADER_SIZE] {
        let mut bytes = [0u8; HEADER_SIZE];
        bytes[0..8].copy_from_slice(&self.table_len.to_le_bytes());
        bytes[8] = self.final_bits;
        bytes[9..].copy_from_slice(&self.digest);
        bytes
    }

    /// Parse a header from the start of `bytes`.
    ///
    /// # Errors
    /// - `FormatError::HeaderTooShort` if fewer than `HEADER_SIZE` bytes
    /// - `FormatError::InvalidFinalBits` if the bit count exceeds 8
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < HEADER_SIZE {
            return Err(FormatError::HeaderTooShort {
                required: HEADER_SIZE,
                actual: bytes.len(),
            }
            .into());
        }

        let mut table_len = [0u8; 8];
        table_len.copy_from_slice(&bytes[0..8]);
        let final_bits = bytes[8];
        if final_bits > 8 {
            return Err(FormatError::InvalidFinalBits(final_bits).into());
        }
        let mut digest = [0u8; DIGEST_SIZE];
        digest.copy_from_slice(&bytes[9..HEADER_SIZE]);

        Ok(Self {
            table_len: u64::from_le_bytes(table_len),
            final_bits,
            digest,
        })
    }

    /// Read and parse a header.
    ///
    /// A stream that ends early is reported as `HeaderTooShort` rather than
    /// an I/O error.
    pub fn read_from<R: Read>(reader: &mut R) -> Result<Self> {
        let mut bytes = [0u8; HEADER_SIZE];
        let mut filled = 0;
        while filled < HEADER_SIZE {
            match reader.read(&mut bytes[filled..]) {
                Ok(0) => {
                    return Err(FormatError::HeaderTooShort {
                        required: HEADER_SIZE,
                        actual: filled,
                    }
                    .into())
                }
                Ok(read) => filled += read,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        }
        Self::from_bytes(&bytes)
    }

    pub fn write_to<W: Write>(&self, writer: &mut W) -> Result<()> {
        writer.write_all(&self.to_bytes())?;
        Ok(())
    }
}
