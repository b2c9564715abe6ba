//! Error types for encoding and decoding Boson values.

use std::io;

/// An error that can occur while encoding or decoding Boson data.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// An I/O error while reading from or writing to the caller's buffer or
    /// stream.
    #[error("I/O error: {source} while {context}")]
    Io {
        /// The original error.
        #[source]
        source: io::Error,
        /// The operation that failed.
        context: String,
    },
    /// The input began with an unsupported version byte.
    #[error("unsupported wire version {found}, expected {expected}")]
    VersionMismatch {
        /// The version this crate reads and writes.
        expected: u8,
        /// The version byte found at the head of the input.
        found: u8,
    },
    /// A tag byte outside the defined set.
    #[error("unsupported wire tag {0:#04x}")]
    UnsupportedTag(u8),
    /// The input ended before a payload could be read completely.
    #[error("input truncated while {0}")]
    Truncated(String),
    /// A back-reference to a record id that has not been decoded yet.
    #[error("reference to unknown record id {0}")]
    DanglingReference(u32),
    /// A record class registered without a zero-argument construction path.
    #[error("no zero-argument constructor registered for record class `{0}`")]
    CannotConstruct(String),
    /// A class or enum name that is not registered.
    #[error("unknown class `{0}`; register it before decoding")]
    MissingClass(String),
    /// The encoder was asked to emit a value the wire cannot represent.
    #[error("unsupported value: {0}")]
    UnsupportedValue(String),
    /// Structurally corrupt or inconsistent payload data.
    #[error("invalid wire data: {0}")]
    InvalidData(String),
}

/// An alias for a `Result` with [`enum@Error`] as the error type.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Creates a new I/O [`Error`] with the given `context`. Unexpected
    /// end-of-input is reported as [`Error::Truncated`].
    pub fn io(source: io::Error, context: impl Into<String>) -> Self {
        let context = context.into();
        if source.kind() == io::ErrorKind::UnexpectedEof {
            Self::Truncated(context)
        } else {
            Self::Io { source, context }
        }
    }

    /// Creates a new [`Error::InvalidData`] with the given message.
    pub fn invalid_data(message: impl Into<String>) -> Self {
        Self::InvalidData(message.into())
    }

    /// Creates a new [`Error::UnsupportedValue`] with the given message.
    pub fn unsupported_value(message: impl Into<String>) -> Self {
        Self::UnsupportedValue(message.into())
    }
}
