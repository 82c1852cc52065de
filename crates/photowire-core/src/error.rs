//! Error types for the photowire-core library.
//!
//! Every failure the codec can hit on untrusted input is a variant here;
//! nothing in the decode path panics.

use crate::wire::WireType;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for photowire operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for all photowire operations
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
    /// A varint, fixed32 or length-delimited payload runs past the end of the buffer
    #[error("truncated input at offset {offset}")]
    TruncatedInput {
        /// Byte offset of the read that ran out of input
        offset: usize,
    },

    /// A field key carries a wire type this codec does not handle
    #[error("invalid wire type {wire_type} at offset {offset}")]
    InvalidWireType {
        /// Byte offset of the field key
        offset: usize,
        /// The raw wire type bits
        wire_type: u8,
    },

    /// A field key carries field number 0 or one above the protobuf maximum
    #[error("invalid field number {number} at offset {offset}")]
    InvalidFieldNumber {
        /// Byte offset of the field key
        offset: usize,
        /// The decoded field number
        number: u64,
    },

    /// A varint is longer than the ten bytes a 64-bit value can occupy
    #[error("varint at offset {offset} exceeds 64 bits")]
    VarintOverflow {
        /// Byte offset where the varint starts
        offset: usize,
    },

    /// An accessor that requires presence was called on an absent field
    #[error("missing required field {field}")]
    MissingField {
        /// The absent field number
        field: u32,
    },

    /// A field is present but holds a different wire type than the accessor needs
    #[error("field {field} has wire type {found:?}, expected {expected:?}")]
    UnexpectedWireType {
        /// The field number
        field: u32,
        /// Wire type the accessor requires
        expected: WireType,
        /// Wire type actually present
        found: WireType,
    },

    /// Nested message decoding would exceed the configured depth
    #[error("message nesting exceeds maximum depth of {depth}")]
    RecursionLimit {
        /// The configured maximum depth
        depth: usize,
    },

    /// A media item blob in a sync response failed to decode or parse
    #[error("malformed media item #{index}: {source}")]
    MalformedItem {
        /// Position of the item in wire order
        index: usize,
        /// Underlying decode error
        #[source]
        source: Box<Error>,
    },

    /// A deletion tombstone in a sync response failed to decode
    #[error("malformed deletion #{index}: {source}")]
    MalformedDeletion {
        /// Position of the tombstone in wire order
        index: usize,
        /// Underlying decode error
        #[source]
        source: Box<Error>,
    },

    /// Failed to read a captured response body
    #[error("failed to read file '{path}': {source}")]
    FileRead {
        /// Path to the file that failed to read
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },
}

impl Error {
    /// Creates a new truncated input error
    pub fn truncated(offset: usize) -> Self {
        Self::TruncatedInput { offset }
    }

    /// Creates a new invalid wire type error
    pub fn invalid_wire_type(offset: usize, wire_type: u8) -> Self {
        Self::InvalidWireType { offset, wire_type }
    }

    /// Creates a new missing field error
    pub fn missing_field(field: u32) -> Self {
        Self::MissingField { field }
    }

    /// Creates a new unexpected wire type error
    pub fn unexpected_wire_type(field: u32, expected: WireType, found: WireType) -> Self {
        Self::UnexpectedWireType {
            field,
            expected,
            found,
        }
    }

    /// Wraps an error raised while parsing the item at `index`
    pub fn malformed_item(index: usize, source: Error) -> Self {
        Self::MalformedItem {
            index,
            source: Box::new(source),
        }
    }

    /// Wraps an error raised while parsing the tombstone at `index`
    pub fn malformed_deletion(index: usize, source: Error) -> Self {
        Self::MalformedDeletion {
            index,
            source: Box::new(source),
        }
    }

    /// Creates a new file read error
    pub fn file_read(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::FileRead {
            path: path.into(),
            source,
        }
    }

    /// Returns true for errors caused by the bytes themselves rather than by
    /// the environment; a re-fetch of the same page may succeed.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::TruncatedInput { .. }
                | Self::InvalidWireType { .. }
                | Self::InvalidFieldNumber { .. }
                | Self::VarintOverflow { .. }
                | Self::MalformedItem { .. }
                | Self::MalformedDeletion { .. }
        )
    }
}
