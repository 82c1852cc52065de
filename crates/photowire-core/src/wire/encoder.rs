//! Incremental wire format encoder.
//!
//! [`WireEncoder`] appends one field at a time. Nested messages are just
//! length-delimited blobs holding another encoder's buffer, so building a
//! request tree is a matter of filling the leaves first:
//!
//! ```
//! use photowire_core::WireEncoder;
//!
//! let mut inner = WireEncoder::new();
//! inner.add_string(1, "nested").add_varint(2, 42);
//!
//! let mut outer = WireEncoder::new();
//! outer.add_message(1, &inner).add_varint(3, 999);
//!
//! assert_eq!(outer.bytes()[0], 0x0A); // field 1, LEN
//! ```

use super::codec::{make_key, WireType};
use bytes::{BufMut, Bytes, BytesMut};
use prost::encoding::encode_varint;

/// Builds a protobuf wire format buffer field by field.
///
/// Repeated calls with the same field number append further occurrences;
/// nothing is merged or reordered.
#[derive(Debug, Clone, Default)]
pub struct WireEncoder {
    buf: BytesMut,
}

impl WireEncoder {
    /// Creates an empty encoder
    pub fn new() -> Self {
        Self::default()
    }

    fn put_key(&mut self, field: u32, wire_type: WireType) {
        encode_varint(make_key(field, wire_type), &mut self.buf);
    }

    fn put_len_delimited(&mut self, field: u32, payload: &[u8]) {
        self.put_key(field, WireType::Len);
        encode_varint(payload.len() as u64, &mut self.buf);
        self.buf.put_slice(payload);
    }

    /// Appends an unsigned varint field.
    ///
    /// The protocol has no signed varint form; callers bias negative values
    /// or use [`add_fixed32`](Self::add_fixed32).
    pub fn add_varint(&mut self, field: u32, value: u64) -> &mut Self {
        self.put_key(field, WireType::Varint);
        encode_varint(value, &mut self.buf);
        self
    }

    /// Appends a UTF-8 string as a length-delimited field
    pub fn add_string(&mut self, field: u32, text: &str) -> &mut Self {
        self.put_len_delimited(field, text.as_bytes());
        self
    }

    /// Appends raw bytes as a length-delimited field
    pub fn add_bytes(&mut self, field: u32, raw: &[u8]) -> &mut Self {
        self.put_len_delimited(field, raw);
        self
    }

    /// Appends another encoder's buffer as a nested message
    pub fn add_message(&mut self, field: u32, nested: &WireEncoder) -> &mut Self {
        self.put_len_delimited(field, &nested.buf);
        self
    }

    /// Appends a zero-length message; it still reads back as present
    pub fn add_empty_message(&mut self, field: u32) -> &mut Self {
        self.put_len_delimited(field, &[]);
        self
    }

    /// Appends one zero-length message per field, in the given order
    pub fn add_empty_messages(&mut self, fields: &[u32]) -> &mut Self {
        for &field in fields {
            self.add_empty_message(field);
        }
        self
    }

    /// Appends a 32-bit little-endian fixed-width field
    pub fn add_fixed32(&mut self, field: u32, value: u32) -> &mut Self {
        self.put_key(field, WireType::I32);
        self.buf.put_u32_le(value);
        self
    }

    /// Returns a snapshot of the accumulated buffer
    pub fn bytes(&self) -> Bytes {
        Bytes::copy_from_slice(&self.buf)
    }

    /// Returns the accumulated buffer as a slice
    pub fn as_slice(&self) -> &[u8] {
        &self.buf
    }

    /// Consumes the encoder, returning its buffer without copying
    pub fn into_bytes(self) -> Bytes {
        self.buf.freeze()
    }

    /// Number of bytes encoded so far
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    /// Returns true if no field has been added
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_varint_encoding() {
        let mut enc = WireEncoder::new();
        enc.add_varint(1, 150);
        assert_eq!(enc.as_slice(), &[0x08, 0x96, 0x01]);
    }

    #[test]
    fn test_string_encoding() {
        let mut enc = WireEncoder::new();
        enc.add_string(2, "hi");
        assert_eq!(enc.as_slice(), &[0x12, 0x02, b'h', b'i']);
    }

    #[test]
    fn test_fixed32_is_little_endian() {
        let mut enc = WireEncoder::new();
        enc.add_fixed32(1, 0x0403_0201);
        assert_eq!(enc.as_slice(), &[0x0D, 0x01, 0x02, 0x03, 0x04]);
    }

    #[test]
    fn test_empty_message() {
        let mut enc = WireEncoder::new();
        enc.add_empty_message(5);
        assert_eq!(enc.as_slice(), &[0x2A, 0x00]);
    }

    #[test]
    fn test_empty_messages_keep_order() {
        let mut enc = WireEncoder::new();
        enc.add_empty_messages(&[3, 1]).add_varint(2, 1);
        assert_eq!(enc.as_slice(), &[0x1A, 0x00, 0x0A, 0x00, 0x10, 0x01]);
    }

    #[test]
    fn test_nested_message() {
        let mut inner = WireEncoder::new();
        inner.add_varint(1, 1);

        let mut outer = WireEncoder::new();
        outer.add_message(3, &inner);
        assert_eq!(outer.as_slice(), &[0x1A, 0x02, 0x08, 0x01]);
    }

    #[test]
    fn test_bytes_is_side_effect_free() {
        let mut enc = WireEncoder::new();
        enc.add_varint(1, 7);
        let first = enc.bytes();
        let second = enc.bytes();
        assert_eq!(first, second);

        enc.add_varint(2, 8);
        assert_eq!(first.len(), 2);
        assert_eq!(enc.len(), 4);
        assert_eq!(enc.into_bytes().len(), 4);
    }

    #[test]
    fn test_large_field_number_key() {
        let mut enc = WireEncoder::new();
        enc.add_varint(31, 1);
        // (31 << 3) | 0 = 248 = [0xF8, 0x01]
        assert_eq!(enc.as_slice(), &[0xF8, 0x01, 0x01]);
    }
}
