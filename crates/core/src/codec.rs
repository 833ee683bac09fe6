//! Encode, decode and verify whole streams.
//!
//! # Encode
//! 1. Scan the source once for byte frequencies and its SHA-256.
//! 2. Build the code table and serialize it (overflow is caught here,
//!    before anything is written).
//! 3. Write a placeholder header and the table.
//! 4. Rewind the source and bit-pack every byte, flushing in bounded chunks.
//! 5. Append the pending byte and backpatch the header with its valid-bit
//!    count.
//!
//! # Decode
//! The payload is walked bit by bit, LSB first. Bits accumulate until the
//! (length, value) pair matches a table entry; the prefix-free table makes
//! the first match the symbol boundary. Only `final_bits` bits of the last
//! payload byte are read. The digest returned is the one recorded in the
//! header; callers compare it with [`verify`] against the decoded output.

use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Read, Seek, SeekFrom, Write};
use std::path::Path;

use tracing::{debug, instrument, warn};

use crate::bitio::BitCollector;
use crate::error::{DecodeError, Error, FormatError, Result};
use crate::format::{StreamHeader, HEADER_SIZE};
use crate::huffman::build_encode_table;
use crate::scan::{digest_of, read_chunk, scan, Digest, DIGEST_SIZE};
use crate::table::{self, EncodeTable};

/// Output is written whenever this many bytes are buffered.
pub const FLUSH_THRESHOLD: usize = 512;

/// Longest bit run the decoder accumulates without a match.
pub const MAX_CODE_BITS: usize = 32;

/// Read size for the packing and unpacking loops.
const READ_CHUNK: usize = 8 * 1024;

/// Sizes and digest produced by [`encode`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EncodeSummary {
    /// Bytes read from the source
    pub input_bytes: u64,
    /// Bytes written to the destination (header, table and payload)
    pub output_bytes: u64,
    /// SHA-256 of the source
    pub digest: Digest,
}

impl EncodeSummary {
    /// Encoded size as a whole percentage of the original.
    pub fn ratio_percent(&self) -> u64 {
        if self.input_bytes == 0 {
            0
        } else {
            self.output_bytes * 100 / self.input_bytes
        }
    }
}

/// Header and code table of an encoded file, without its payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileDetail {
    pub header: StreamHeader,
    pub table: EncodeTable,
}

/// Encode `source` into `dest`.
///
/// The source is rewound to the position it had on entry for the packing
/// pass. The header is backpatched at the destination's entry position and
/// the destination is left positioned after the payload.
///
/// # Errors
/// - `HuffmanError::EmptyFrequencyTable` for an empty source
/// - `TableError` if a code does not fit the record format
/// - `DecodeError::UnknownSymbol` if the second pass sees a byte the scan did not
/// - I/O errors from either stream
#[instrument(skip_all)]
pub fn encode<R, W>(source: &mut R, dest: &mut W) -> Result<EncodeSummary>
where
    R: Read + Seek,
    W: Write + Seek,
{
    let source_start = source.stream_position()?;
    let dest_start = dest.stream_position()?;

    let (digest, frequencies) = scan(source)?;
    let table = build_encode_table(&frequencies)?;
    let serialized = table::serialize(&table)?;
    debug!(
        input_bytes = frequencies.total(),
        symbols = table.len(),
        longest_code = table.max_bit_length(),
        "built code table"
    );

    let mut header = StreamHeader::placeholder(serialized.len() as u64, digest);
    header.write_to(dest)?;
    dest.write_all(&serialized)?;

    source.seek(SeekFrom::Start(source_start))?;

    let mut collector = BitCollector::new();
    let mut payload_bytes = 0u64;
    let mut buffer = vec![0u8; READ_CHUNK];

    loop {
        let read = read_chunk(source, &mut buffer)?;
        if read == 0 {
            break;
        }
        for &byte in &buffer[..read] {
            let entry = table
                .get(byte)
                .ok_or(DecodeError::UnknownSymbol { byte })?;
            collector.push(entry.code, 0, entry.bit_length as usize)?;

            if collector.byte_len() >= FLUSH_THRESHOLD {
                let chunk = collector.take_bytes();
                dest.write_all(&chunk)?;
                payload_bytes += chunk.len() as u64;
            }
        }
    }

    let (tail, final_bits) = collector.finish();
    dest.write_all(&tail)?;
    payload_bytes += tail.len() as u64;

    header.final_bits = final_bits;
    dest.seek(SeekFrom::Start(dest_start))?;
    header.write_to(dest)?;

    let output_bytes = (HEADER_SIZE + serialized.len()) as u64 + payload_bytes;
    dest.seek(SeekFrom::Start(dest_start + output_bytes))?;
    dest.flush()?;

    debug!(output_bytes, final_bits, "encoded stream");

    Ok(EncodeSummary {
        input_bytes: frequencies.total(),
        output_bytes,
        digest,
    })
}

/// Decode `source` into `dest`, returning the digest recorded in the header.
///
/// # Errors
/// - `FormatError` if the header or table does not fit the stream, or the
///   payload ends mid-code
/// - `TableError::InvalidLength` for a table that is not whole records
/// - `DecodeError::CodeTooLong` if more than 32 bits accumulate without a match
/// - I/O errors from either stream
#[instrument(skip_all)]
pub fn decode<R, W>(source: &mut R, dest: &mut W) -> Result<Digest>
where
    R: Read + Seek,
    W: Write,
{
    let start = source.stream_position()?;
    let end = source.seek(SeekFrom::End(0))?;
    source.seek(SeekFrom::Start(start))?;

    let header = StreamHeader::read_from(source)?;
    let available = end.saturating_sub(start + HEADER_SIZE as u64);
    if header.table_len > available {
        return Err(FormatError::TableTruncated {
            declared: header.table_len,
            available,
        }
        .into());
    }

    let mut table_bytes = vec![0u8; header.table_len as usize];
    source.read_exact(&mut table_bytes)?;
    let table = table::deserialize_decode(&table_bytes)?;
    let payload_len = available - header.table_len;
    debug!(
        symbols = table.len(),
        payload_len,
        final_bits = header.final_bits,
        "read code table"
    );

    let mut payload = (&mut *source).take(payload_len);
    let mut buffer = vec![0u8; READ_CHUNK];
    let mut output = Vec::with_capacity(FLUSH_THRESHOLD * 2);
    let mut output_bytes = 0u64;
    let mut consumed = 0u64;

    let mut accumulator = 0u64;
    let mut bit_length = 1usize;

    loop {
        let read = read_chunk(&mut payload, &mut buffer)?;
        if read == 0 {
            break;
        }
        for &byte in &buffer[..read] {
            consumed += 1;
            let valid_bits = if consumed == payload_len {
                header.final_bits
            } else {
                8
            };

            for bit in 0..valid_bits {
                if bit_length > MAX_CODE_BITS {
                    return Err(DecodeError::CodeTooLong { bit_length }.into());
                }
                accumulator |= u64::from((byte >> bit) & 1) << (bit_length - 1);

                match table.lookup(bit_length as u32, accumulator) {
                    Some(symbol) => {
                        output.push(symbol);
                        accumulator = 0;
                        bit_length = 1;
                    }
                    None => bit_length += 1,
                }
            }
        }

        if output.len() >= FLUSH_THRESHOLD {
            dest.write_all(&output)?;
            output_bytes += output.len() as u64;
            output.clear();
        }
    }

    if bit_length > 1 {
        return Err(FormatError::DanglingBits {
            bits: bit_length - 1,
        }
        .into());
    }

    dest.write_all(&output)?;
    output_bytes += output.len() as u64;
    dest.flush()?;

    debug!(output_bytes, "decoded stream");

    Ok(header.digest)
}

/// Check `source` against a previously recorded digest.
///
/// Returns `false` for a digest of the wrong length without reading the
/// source.
pub fn verify<R: Read>(source: &mut R, digest: &[u8]) -> Result<bool> {
    if digest.len() != DIGEST_SIZE {
        return Ok(false);
    }
    let actual = digest_of(source)?;
    Ok(actual[..] == digest[..])
}

/// Read the header and code table of an encoded stream.
pub fn inspect<R: Read>(source: &mut R) -> Result<FileDetail> {
    let header = StreamHeader::read_from(source)?;

    let mut table_bytes = Vec::new();
    (&mut *source)
        .take(header.table_len)
        .read_to_end(&mut table_bytes)?;
    if (table_bytes.len() as u64) < header.table_len {
        return Err(FormatError::TableTruncated {
            declared: header.table_len,
            available: table_bytes.len() as u64,
        }
        .into());
    }

    let table = table::deserialize_encode(&table_bytes)?;
    Ok(FileDetail { header, table })
}

/// Encode the file at `source` into a new file at `destination`.
///
/// The destination is removed again if encoding fails.
#[instrument(skip_all, fields(source = %source.display(), destination = %destination.display()))]
pub fn encode_file(source: &Path, destination: &Path) -> Result<EncodeSummary> {
    let mut input = File::open(source)?;
    reject_same_file(source, destination)?;
    let output = File::create(destination)?;

    let result = (|| -> Result<EncodeSummary> {
        let mut output = BufWriter::new(output);
        let summary = encode(&mut input, &mut output)?;
        output.flush()?;
        Ok(summary)
    })();

    result.map_err(|e| discard(destination, e))
}

/// Decode the file at `source` into a new file at `destination`, returning
/// the digest recorded in the header.
///
/// The destination is removed again if decoding fails.
#[instrument(skip_all, fields(source = %source.display(), destination = %destination.display()))]
pub fn decode_file(source: &Path, destination: &Path) -> Result<Digest> {
    let mut input = BufReader::new(File::open(source)?);
    reject_same_file(source, destination)?;
    let output = File::create(destination)?;

    let result = (|| -> Result<Digest> {
        let mut output = BufWriter::new(output);
        let digest = decode(&mut input, &mut output)?;
        output.flush()?;
        Ok(digest)
    })();

    result.map_err(|e| discard(destination, e))
}

/// Check the file at `path` against a recorded digest.
pub fn verify_file(path: &Path, digest: &[u8]) -> Result<bool> {
    let mut input = BufReader::new(File::open(path)?);
    verify(&mut input, digest)
}

/// Read the header and code table of the encoded file at `path`.
pub fn inspect_file(path: &Path) -> Result<FileDetail> {
    let mut input = BufReader::new(File::open(path)?);
    inspect(&mut input)
}

fn reject_same_file(source: &Path, destination: &Path) -> Result<()> {
    if destination.exists() && fs::canonicalize(source)? == fs::canonicalize(destination)? {
        return Err(Error::Config(format!(
            "source and destination are the same file: {}",
            source.display()
        )));
    }
    Ok(())
}

fn discard(path: &Path, error: Error) -> Error {
    if let Err(e) = fs::remove_file(path) {
        warn!(path = %path.display(), error = %e, "failed to remove partial output");
    }
    error
}
