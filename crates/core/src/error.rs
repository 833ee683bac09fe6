//! Error types for the huffpack codec.
//!
//! Every operation returns a structured error instead of panicking. The
//! variants are grouped by the component that raises them; [`Error::kind`]
//! folds them back onto the coarse taxonomy callers usually branch on
//! (I/O, format, overflow, range, unsupported input).

use thiserror::Error;

/// Top-level error type for all codec operations.
///
/// Each variant corresponds to a specific failure domain:
/// - Bit I/O: packing bit ranges into bytes
/// - Huffman: tree construction and code derivation
/// - Table: serialized code table records
/// - Format: the encoded file layout (header, table bounds, trailing bits)
/// - Decode: symbols or bit patterns the tables cannot resolve
/// - I/O: opening, reading, writing or seeking streams
#[derive(Debug, Error)]
pub enum Error {
    /// Bit packer invoked with an invalid range
    #[error("bit I/O error: {0}")]
    BitIo(#[from] BitIoError),

    /// Tree construction or code derivation failed
    #[error("huffman error: {0}")]
    Huffman(#[from] HuffmanError),

    /// Code table could not be serialized or parsed
    #[error("code table error: {0}")]
    Table(#[from] TableError),

    /// Encoded file layout is malformed
    #[error("format error: {0}")]
    Format(#[from] FormatError),

    /// Payload or input could not be mapped through the code table
    #[error("decode error: {0}")]
    Decode(#[from] DecodeError),

    /// Stream I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Batch planning error (conflicting or missing paths)
    #[error("configuration error: {0}")]
    Config(String),

    /// Worker pool or event channel error
    #[error("channel error: {0}")]
    Channel(String),
}

/// Coarse classification of an [`Error`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Io,
    Format,
    Overflow,
    Range,
    Unsupported,
    InvalidInput,
}

impl Error {
    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::BitIo(_) => ErrorKind::Range,
            Error::Huffman(HuffmanError::EmptyFrequencyTable) => ErrorKind::InvalidInput,
            Error::Huffman(HuffmanError::CodeLengthTooLong { .. }) => ErrorKind::Overflow,
            Error::Table(TableError::InvalidLength { .. }) => ErrorKind::Format,
            Error::Table(_) => ErrorKind::Overflow,
            Error::Format(_) => ErrorKind::Format,
            Error::Decode(_) => ErrorKind::Unsupported,
            Error::Io(_) | Error::Channel(_) => ErrorKind::Io,
            Error::Config(_) => ErrorKind::InvalidInput,
        }
    }
}

/// Bit packing errors.
#[derive(Debug, Error)]
pub enum BitIoError {
    /// `begin > end`, or either bound exceeds the width of the source value
    #[error("invalid bit range [{begin}, {end}) for a {width}-bit value")]
    InvalidRange { begin: usize, end: usize, width: usize },
}

/// Huffman tree errors.
#[derive(Debug, Error)]
pub enum HuffmanError {
    /// No byte value was observed, so there is nothing to build a tree from
    #[error("empty frequency table: cannot build a code table")]
    EmptyFrequencyTable,

    /// A leaf sits deeper than a code value can represent
    #[error("code length {length} exceeds maximum 64")]
    CodeLengthTooLong { length: usize },
}

/// Serialized code table errors.
#[derive(Debug, Error)]
pub enum TableError {
    /// Buffer length is not a whole number of records
    #[error("table length {length} is not a multiple of the record size")]
    InvalidLength { length: usize },

    /// Bit length does not fit the record's u8 field
    #[error("bit length {bit_length} of byte {byte:#04x} does not fit in a table record")]
    BitLengthOverflow { byte: u8, bit_length: u32 },

    /// Code value does not fit the record's u16 field
    #[error("code {code:#x} of byte {byte:#04x} does not fit in a table record")]
    CodeOverflow { byte: u8, code: u64 },
}

/// Encoded file layout errors.
#[derive(Debug, Error)]
pub enum FormatError {
    /// Stream ends before a full header
    #[error("header too short: need {required} bytes, got {actual}")]
    HeaderTooShort { required: usize, actual: usize },

    /// Header declares more table bytes than the stream holds
    #[error("table declares {declared} bytes but only {available} remain")]
    TableTruncated { declared: u64, available: u64 },

    /// Final byte cannot hold more than eight valid bits
    #[error("invalid final byte bit count {0}")]
    InvalidFinalBits(u8),

    /// Payload ended in the middle of a code
    #[error("payload ends with {bits} bits that do not form a complete code")]
    DanglingBits { bits: usize },
}

/// Symbol mapping errors.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// A source byte has no entry in the encode table
    #[error("byte {byte:#04x} has no entry in the code table")]
    UnknownSymbol { byte: u8 },

    /// Accumulated bits exceed the longest supported code without a match
    #[error("no code matches after {bit_length} bits")]
    CodeTooLong { bit_length: usize },
}

/// Type alias for Result with our Error type
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_covers_taxonomy() {
        let range: Error = BitIoError::InvalidRange { begin: 9, end: 4, width: 8 }.into();
        assert_eq!(range.kind(), ErrorKind::Range);

        let empty: Error = HuffmanError::EmptyFrequencyTable.into();
        assert_eq!(empty.kind(), ErrorKind::InvalidInput);

        let length: Error = TableError::InvalidLength { length: 5 }.into();
        assert_eq!(length.kind(), ErrorKind::Format);

        let code: Error = TableError::CodeOverflow { byte: b'a', code: 1 << 16 }.into();
        assert_eq!(code.kind(), ErrorKind::Overflow);

        let dangling: Error = FormatError::DanglingBits { bits: 3 }.into();
        assert_eq!(dangling.kind(), ErrorKind::Format);

        let unknown: Error = DecodeError::UnknownSymbol { byte: 0 }.into();
        assert_eq!(unknown.kind(), ErrorKind::Unsupported);

        let io: Error = std::io::Error::new(std::io::ErrorKind::NotFound, "gone").into();
        assert_eq!(io.kind(), ErrorKind::Io);
    }

    #[test]
    fn test_display_mentions_fields() {
        let err: Error = TableError::BitLengthOverflow { byte: 0x41, bit_length: 300 }.into();
        let text = err.to_string();
        assert!(text.contains("300"));
        assert!(text.contains("0x41"));
    }
}
