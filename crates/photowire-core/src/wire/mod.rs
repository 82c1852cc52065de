//! Schema-less protobuf wire format codec.
//!
//! This module turns arbitrary bytes into a [`FieldMap`] without any `.proto`
//! schema, and builds wire buffers with [`WireEncoder`].
//!
//! ## Decoding
//!
//! 1. Read a varint key and split it into field number and wire type
//! 2. Read the payload: a varint, four little-endian bytes, or a
//!    length-prefixed span
//! 3. Record the occurrence under its field number, preserving wire order
//!
//! Length-delimited payloads are kept as shared [`Bytes`] slices of the input;
//! whether they hold a string, raw bytes or a sub-message is decided by the
//! accessor that reads them. Truncated or otherwise malformed input yields a
//! typed [`Error`](crate::Error), never a panic.
//!
//! ```
//! use photowire_core::wire::{decode_raw, WireEncoder};
//!
//! let mut enc = WireEncoder::new();
//! enc.add_string(1, "photo.jpg").add_varint(2, 1024);
//!
//! let fields = decode_raw(enc.as_slice())?;
//! assert_eq!(fields.get_string(1), "photo.jpg");
//! assert_eq!(fields.get_uint(2), 1024);
//! # Ok::<(), photowire_core::Error>(())
//! ```

mod codec;
mod encoder;
mod tree;
mod value;

use crate::error::{Error, Result};
use bytes::Bytes;
use tracing::trace;

pub use codec::{decode_key, decode_varint, make_key, WireType, MAX_FIELD_NUMBER};
pub use encoder::WireEncoder;
pub use value::{FieldMap, WireValue, DEFAULT_MAX_DEPTH};

/// Configuration for the decoder
#[derive(Debug, Clone)]
pub struct DecoderConfig {
    /// Deepest sub-message level accessors will decode (top level is 0)
    pub max_depth: usize,
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

impl DecoderConfig {
    /// Creates a new decoder config with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the maximum nesting depth
    pub fn max_depth(mut self, depth: usize) -> Self {
        self.max_depth = depth;
        self
    }
}

/// Decodes wire format buffers into [`FieldMap`]s
#[derive(Debug, Clone, Default)]
pub struct Decoder {
    config: DecoderConfig,
}

impl Decoder {
    /// Creates a decoder with default configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a decoder with custom configuration
    pub fn with_config(config: DecoderConfig) -> Self {
        Self { config }
    }

    /// Returns the active configuration
    pub fn config(&self) -> &DecoderConfig {
        &self.config
    }

    /// Decodes a top-level message.
    ///
    /// Passing [`Bytes`] avoids a copy; nested spans share the same buffer.
    pub fn decode(&self, data: impl Into<Bytes>) -> Result<FieldMap> {
        decode_fields(&data.into(), 0, self.config.max_depth)
    }
}

/// Decodes a top-level message with the default configuration
pub fn decode_raw(data: &[u8]) -> Result<FieldMap> {
    Decoder::new().decode(Bytes::copy_from_slice(data))
}

pub(crate) fn decode_fields(data: &Bytes, depth: usize, max_depth: usize) -> Result<FieldMap> {
    let mut fields = FieldMap::with_limits(depth, max_depth);
    let mut position = 0;

    while position < data.len() {
        let (field, wire_type, key_len) = decode_key(&data[position..], position)?;
        position += key_len;

        let value = match wire_type {
            WireType::Varint => {
                let (value, len) = decode_varint(&data[position..], position)?;
                position += len;
                WireValue::Varint(value)
            }
            WireType::I32 => {
                let end = position + 4;
                let raw: [u8; 4] = data
                    .get(position..end)
                    .and_then(|s| s.try_into().ok())
                    .ok_or_else(|| Error::truncated(position))?;
                position = end;
                WireValue::Fixed32(u32::from_le_bytes(raw))
            }
            WireType::Len => {
                let (length, len) = decode_varint(&data[position..], position)?;
                position += len;

                let remaining = data.len() - position;
                if length > remaining as u64 {
                    return Err(Error::truncated(position));
                }
                let end = position + length as usize;
                let span = data.slice(position..end);
                position = end;
                WireValue::Bytes(span)
            }
        };

        trace!(depth, field, ?wire_type, "decoded field");
        fields.push(field, value);
    }

    Ok(fields)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_decode_empty() {
        let decoded = decode_raw(&[]).unwrap();
        assert!(decoded.is_empty());
    }

    #[test]
    fn test_truncated_varint() {
        assert!(matches!(
            decode_raw(&[0x80]),
            Err(Error::TruncatedInput { .. })
        ));
    }

    #[test]
    fn test_truncated_value() {
        // Field 1 varint with no value byte
        assert!(matches!(
            decode_raw(&[0x08]),
            Err(Error::TruncatedInput { offset: 1 })
        ));
        // Field 1 fixed32 with only two bytes
        assert!(matches!(
            decode_raw(&[0x0D, 0x01, 0x02]),
            Err(Error::TruncatedInput { offset: 1 })
        ));
        // Field 1 LEN claiming five bytes, three present
        assert!(matches!(
            decode_raw(&[0x0A, 0x05, b'a', b'b', b'c']),
            Err(Error::TruncatedInput { offset: 2 })
        ));
    }

    #[test]
    fn test_huge_length_prefix() {
        // Length prefix of u64::MAX must not overflow the bounds check
        let data = [
            0x0A, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0x01,
        ];
        assert!(matches!(
            decode_raw(&data),
            Err(Error::TruncatedInput { .. })
        ));
    }

    #[test]
    fn test_unsupported_wire_types() {
        // Field 1 fixed64
        assert!(matches!(
            decode_raw(&[0x09, 0, 0, 0, 0, 0, 0, 0, 0]),
            Err(Error::InvalidWireType { wire_type: 1, .. })
        ));
        // Field 1 start group
        assert!(matches!(
            decode_raw(&[0x0B]),
            Err(Error::InvalidWireType { wire_type: 3, .. })
        ));
        // Wire types 6 and 7 do not exist
        assert!(matches!(
            decode_raw(&[0x0E]),
            Err(Error::InvalidWireType { wire_type: 6, .. })
        ));
    }

    #[test]
    fn test_round_trip_all_kinds() {
        let mut inner = WireEncoder::new();
        inner.add_varint(1, 1);

        let mut enc = WireEncoder::new();
        enc.add_varint(1, 150)
            .add_string(2, "hello")
            .add_bytes(3, &[0xDE, 0xAD, 0xBE, 0xEF])
            .add_fixed32(4, 12_345_678)
            .add_message(5, &inner)
            .add_empty_message(6)
            .add_varint(1, 151);

        let decoded = decode_raw(enc.as_slice()).unwrap();

        assert_eq!(
            decoded.values(1),
            &[WireValue::Varint(150), WireValue::Varint(151)]
        );
        assert_eq!(decoded.get_string(2), "hello");
        assert_eq!(decoded.get_bytes(3), Some(&[0xDE, 0xAD, 0xBE, 0xEF][..]));
        assert_eq!(decoded.values(4), &[WireValue::Fixed32(12_345_678)]);
        assert_eq!(decoded.first(4).map(WireValue::wire_type), Some(WireType::I32));
        assert_eq!(decoded.get_message(5).unwrap().get_uint(1), 1);
        assert_eq!(decoded.get_bytes(6), Some(&b""[..]));
    }

    #[test]
    fn test_three_level_nesting() {
        let mut inner1 = WireEncoder::new();
        inner1.add_string(1, "nested").add_varint(2, 42);

        let mut inner2 = WireEncoder::new();
        inner2.add_string(1, "photo.jpg");

        let mut outer = WireEncoder::new();
        outer
            .add_message(1, &inner1)
            .add_message(2, &inner2)
            .add_varint(3, 999);

        let decoded = decode_raw(outer.as_slice()).unwrap();
        let msg1 = decoded.get_message(1).unwrap();
        assert_eq!(msg1.get_string(1), "nested");
        assert_eq!(msg1.get_varint(2), 42);
        assert_eq!(decoded.get_message(2).unwrap().get_string(1), "photo.jpg");
        assert_eq!(decoded.get_varint(3), 999);
    }

    #[test]
    fn test_decoder_shares_input_buffer() {
        let mut enc = WireEncoder::new();
        enc.add_bytes(1, b"payload");
        let input = enc.into_bytes();

        let decoded = Decoder::new().decode(input.clone()).unwrap();
        let span = decoded.first(1).and_then(WireValue::as_bytes).unwrap();
        assert_eq!(span.as_ref(), b"payload");
        // The span points into the original allocation.
        assert_eq!(span.as_ptr(), input[2..].as_ptr());
    }

    #[test]
    fn test_decoder_config_builder() {
        let config = DecoderConfig::new().max_depth(4);
        assert_eq!(config.max_depth, 4);
        assert_eq!(Decoder::with_config(config).config().max_depth, 4);
        assert_eq!(Decoder::new().config().max_depth, DEFAULT_MAX_DEPTH);
    }
}
