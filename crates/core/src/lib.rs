//! huffpack-core: whole-file Huffman compression with integrity checking
//!
//! This library provides the core components for a codec that:
//! - Scans a file once for byte frequencies and its SHA-256
//! - Builds a deterministic Huffman code table
//! - Writes a fixed header, the code table and an LSB-first bit stream
//! - Decodes that stream back and verifies it against the recorded digest
//! - Runs batches of files on a worker pool
//!
//! # Architecture
//!
//! - `bitio`: Bit packing into bytes
//! - `scan`: Frequency and digest scan
//! - `huffman`: Tree construction and code derivation
//! - `table`: Code table types and record serialization
//! - `format`: Encoded file header
//! - `codec`: Encode, decode, verify and inspect streams and files
//! - `batch`: Planning and running many files in parallel
//! - `metrics`: Batch totals and reporting
//!
//! # Design Principles
//!
//! - **No panics**: All errors are structured and recoverable
//! - **Bounded memory**: Input and output move in fixed-size chunks
//! - **Deterministic**: The same input always produces the same bytes

pub mod batch;
pub mod bitio;
pub mod codec;
pub mod error;
pub mod format;
pub mod huffman;
pub mod metrics;
pub mod scan;
pub mod table;

// Re-export commonly used types
pub use codec::{
    decode, decode_file, encode, encode_file, inspect, inspect_file, verify, verify_file,
    EncodeSummary, FileDetail,
};
pub use error::{Error, ErrorKind, Result};
pub use scan::Digest;
