//! Error types for BrainVoyager file I/O.

use thiserror::Error;

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors produced while reading or writing BrainVoyager files.
///
/// Decoding is strictly sequential, so every error is fatal for the call
/// that produced it: nothing is retried and no partial header is returned.
#[derive(Debug, Error)]
pub enum Error {
    /// Underlying file I/O failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The file does not start with the signature the format requires.
    #[error("invalid magic number: expected {expected:#010x}, found {found:#010x}")]
    MagicMismatch {
        /// Signature the format defines.
        expected: u32,
        /// Signature actually present in the file.
        found: u32,
    },

    /// The stream ended before a fixed-size read completed.
    #[error("truncated input: stream ended inside a fixed-size field")]
    TruncatedInput,

    /// The layout resolver derived an inconsistent trailing-data size.
    #[error("layout error: {0}")]
    Layout(String),

    /// A variable-length field could not be decoded (bad UTF-8, malformed
    /// numeric token in a text header, unknown discriminator value).
    #[error("decode error: {0}")]
    Decode(String),

    /// A write call was given a header lacking a field its schema requires.
    #[error("missing required header field '{0}'")]
    MissingField(String),

    /// A data-type discriminator field holds a value the format does not define.
    #[error("unsupported data type code: {0}")]
    UnsupportedDataType(i64),
}

impl Error {
    /// Wrap an I/O error, translating early end-of-stream into
    /// [`Error::TruncatedInput`] so callers can distinguish a short file
    /// from an OS-level failure.
    pub(crate) fn from_read(err: std::io::Error) -> Self {
        if err.kind() == std::io::ErrorKind::UnexpectedEof {
            Self::TruncatedInput
        } else {
            Self::Io(err)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn eof_maps_to_truncated_input() {
        let eof = std::io::Error::new(std::io::ErrorKind::UnexpectedEof, "eof");
        assert!(matches!(Error::from_read(eof), Error::TruncatedInput));
    }

    #[test]
    fn other_io_errors_pass_through() {
        let denied = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        assert!(matches!(Error::from_read(denied), Error::Io(_)));
    }

    #[test]
    fn magic_mismatch_formats_as_hex() {
        let err = Error::MagicMismatch {
            expected: 0xA4D3_C2B1,
            found: 0,
        };
        assert!(err.to_string().contains("0xa4d3c2b1"));
    }
}
