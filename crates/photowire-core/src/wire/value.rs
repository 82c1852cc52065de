//! Decoded field values and the schema-less message view.

use super::codec::WireType;
use super::decode_fields;
use crate::error::{Error, Result};
use bytes::Bytes;
use std::collections::HashMap;

/// One decoded occurrence of a field
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WireValue {
    /// Unsigned LEB128 value
    Varint(u64),
    /// Four little-endian bytes
    Fixed32(u32),
    /// Length-delimited payload; string, bytes or sub-message
    Bytes(Bytes),
}

impl WireValue {
    /// The wire type this value was (or will be) encoded with
    pub fn wire_type(&self) -> WireType {
        match self {
            WireValue::Varint(_) => WireType::Varint,
            WireValue::Fixed32(_) => WireType::I32,
            WireValue::Bytes(_) => WireType::Len,
        }
    }

    /// Returns the varint payload, if this is a varint
    pub fn as_varint(&self) -> Option<u64> {
        match self {
            WireValue::Varint(v) => Some(*v),
            _ => None,
        }
    }

    /// Returns the fixed32 payload, if this is a fixed32
    pub fn as_fixed32(&self) -> Option<u32> {
        match self {
            WireValue::Fixed32(v) => Some(*v),
            _ => None,
        }
    }

    /// Returns the length-delimited payload, if this is one
    pub fn as_bytes(&self) -> Option<&Bytes> {
        match self {
            WireValue::Bytes(b) => Some(b),
            _ => None,
        }
    }
}

/// Default cap on message nesting
pub const DEFAULT_MAX_DEPTH: usize = 32;

/// A decoded message: field number to every occurrence in wire order.
///
/// Scalar accessors follow protobuf optional-field semantics and return the
/// zero value for absent fields. Sub-messages are decoded on demand from the
/// retained byte span; each call produces a fresh, independent `FieldMap`.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldMap {
    fields: HashMap<u32, Vec<WireValue>>,
    depth: usize,
    max_depth: usize,
}

impl Default for FieldMap {
    fn default() -> Self {
        Self::new()
    }
}

impl FieldMap {
    /// Creates an empty top-level map with the default depth cap
    pub fn new() -> Self {
        Self::with_limits(0, DEFAULT_MAX_DEPTH)
    }

    pub(crate) fn with_limits(depth: usize, max_depth: usize) -> Self {
        Self {
            fields: HashMap::new(),
            depth,
            max_depth,
        }
    }

    pub(crate) fn push(&mut self, field: u32, value: WireValue) {
        self.fields.entry(field).or_default().push(value);
    }

    /// Nesting level of this message; the top-level message is 0
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Number of distinct field numbers present
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Returns true if no field was decoded
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Field numbers present, ascending
    pub fn field_numbers(&self) -> Vec<u32> {
        let mut numbers: Vec<u32> = self.fields.keys().copied().collect();
        numbers.sort_unstable();
        numbers
    }

    /// Whether the field occurs at all
    pub fn has(&self, field: u32) -> bool {
        self.fields.contains_key(&field)
    }

    /// Every occurrence of a field in wire order; empty if absent
    pub fn values(&self, field: u32) -> &[WireValue] {
        self.fields.get(&field).map(Vec::as_slice).unwrap_or(&[])
    }

    /// First occurrence of a field
    pub fn first(&self, field: u32) -> Option<&WireValue> {
        self.values(field).first()
    }

    /// First occurrence as a signed integer (two's complement of the varint), or 0
    pub fn get_varint(&self, field: u32) -> i64 {
        self.get_uint(field) as i64
    }

    /// First occurrence as an unsigned varint, or 0
    pub fn get_uint(&self, field: u32) -> u64 {
        self.first(field).and_then(WireValue::as_varint).unwrap_or(0)
    }

    /// First occurrence as a fixed32, or 0
    pub fn get_fixed32(&self, field: u32) -> u32 {
        self.first(field).and_then(WireValue::as_fixed32).unwrap_or(0)
    }

    /// First occurrence as an integer regardless of numeric encoding.
    ///
    /// Coordinates show up both as varints and as fixed32 depending on the
    /// endpoint; fixed32 values are widened without sign extension.
    pub fn get_numeric(&self, field: u32) -> Option<u64> {
        match self.first(field)? {
            WireValue::Varint(v) => Some(*v),
            WireValue::Fixed32(v) => Some(*v as u64),
            WireValue::Bytes(_) => None,
        }
    }

    /// First occurrence decoded as UTF-8 (lossy), or an empty string
    pub fn get_string(&self, field: u32) -> String {
        self.get_bytes(field)
            .map(|b| String::from_utf8_lossy(b).into_owned())
            .unwrap_or_default()
    }

    /// First occurrence's raw bytes.
    ///
    /// `None` means absent; an empty message reads back as `Some(&[])`.
    pub fn get_bytes(&self, field: u32) -> Option<&[u8]> {
        self.first(field)
            .and_then(WireValue::as_bytes)
            .map(|b| b.as_ref())
    }

    /// Decodes the first occurrence as a nested message
    pub fn get_message(&self, field: u32) -> Result<FieldMap> {
        let value = self.first(field).ok_or_else(|| Error::missing_field(field))?;
        self.decode_nested(field, value)
    }

    /// Like [`get_message`](Self::get_message) but absence yields `None`
    pub fn get_optional_message(&self, field: u32) -> Result<Option<FieldMap>> {
        match self.first(field) {
            Some(value) => self.decode_nested(field, value).map(Some),
            None => Ok(None),
        }
    }

    /// Decodes every occurrence as a nested message, in wire order
    pub fn get_repeated_messages(&self, field: u32) -> Result<Vec<FieldMap>> {
        self.values(field)
            .iter()
            .map(|value| self.decode_nested(field, value))
            .collect()
    }

    fn decode_nested(&self, field: u32, value: &WireValue) -> Result<FieldMap> {
        let bytes = value
            .as_bytes()
            .ok_or_else(|| Error::unexpected_wire_type(field, WireType::Len, value.wire_type()))?;
        self.decode_child(bytes)
    }

    /// Decodes an arbitrary span one level below this message
    pub(crate) fn decode_child(&self, bytes: &Bytes) -> Result<FieldMap> {
        let depth = self.depth + 1;
        if depth > self.max_depth {
            return Err(Error::RecursionLimit {
                depth: self.max_depth,
            });
        }
        decode_fields(bytes, depth, self.max_depth)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wire::{decode_raw, Decoder, DecoderConfig, WireEncoder};
    use pretty_assertions::assert_eq;

    #[test]
    fn test_empty_map_defaults() {
        let m = FieldMap::new();
        assert_eq!(m.get_string(1), "");
        assert_eq!(m.get_bytes(1), None);
        assert_eq!(m.get_varint(1), 0);
        assert_eq!(m.get_uint(1), 0);
        assert_eq!(m.get_fixed32(1), 0);
        assert_eq!(m.get_numeric(1), None);
        assert!(!m.has(1));
        assert!(matches!(
            m.get_message(1),
            Err(Error::MissingField { field: 1 })
        ));
        assert!(m.get_optional_message(1).unwrap().is_none());
    }

    #[test]
    fn test_repeated_messages_absent_is_empty() {
        let m = FieldMap::new();
        assert!(m.get_repeated_messages(1).unwrap().is_empty());
    }

    #[test]
    fn test_empty_message_is_present() {
        let mut enc = WireEncoder::new();
        enc.add_empty_message(5);
        let decoded = decode_raw(enc.as_slice()).unwrap();

        assert!(decoded.has(5));
        assert_eq!(decoded.get_bytes(5), Some(&b""[..]));
        assert!(decoded.get_message(5).unwrap().is_empty());
    }

    #[test]
    fn test_scalar_accessors_do_not_coerce() {
        let mut enc = WireEncoder::new();
        enc.add_string(1, "text").add_fixed32(2, 9).add_varint(3, 4);
        let decoded = decode_raw(enc.as_slice()).unwrap();

        assert_eq!(decoded.get_uint(1), 0);
        assert_eq!(decoded.get_uint(2), 0);
        assert_eq!(decoded.get_fixed32(2), 9);
        assert_eq!(decoded.get_string(3), "");
        assert_eq!(decoded.get_numeric(2), Some(9));
        assert_eq!(decoded.get_numeric(3), Some(4));
        assert_eq!(decoded.get_numeric(1), None);
    }

    #[test]
    fn test_get_message_wrong_wire_type() {
        let mut enc = WireEncoder::new();
        enc.add_varint(1, 5);
        let decoded = decode_raw(enc.as_slice()).unwrap();

        assert!(matches!(
            decoded.get_message(1),
            Err(Error::UnexpectedWireType {
                field: 1,
                expected: WireType::Len,
                found: WireType::Varint,
            })
        ));
    }

    #[test]
    fn test_get_varint_reinterprets_high_bit() {
        let mut enc = WireEncoder::new();
        enc.add_varint(1, u64::MAX);
        let decoded = decode_raw(enc.as_slice()).unwrap();
        assert_eq!(decoded.get_varint(1), -1);
        assert_eq!(decoded.get_uint(1), u64::MAX);
    }

    #[test]
    fn test_repeated_messages_in_order() {
        let mut enc = WireEncoder::new();
        for name in ["a", "b", "c"] {
            let mut inner = WireEncoder::new();
            inner.add_string(1, name);
            enc.add_message(2, &inner);
        }
        let decoded = decode_raw(enc.as_slice()).unwrap();

        let names: Vec<String> = decoded
            .get_repeated_messages(2)
            .unwrap()
            .iter()
            .map(|m| m.get_string(1))
            .collect();
        assert_eq!(names, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_nested_depth_is_capped() {
        // Four levels of nesting: 1 { 1 { 1 { 1: 7 } } }
        let mut leaf = WireEncoder::new();
        leaf.add_varint(1, 7);
        let mut current = leaf;
        for _ in 0..3 {
            let mut parent = WireEncoder::new();
            parent.add_message(1, &current);
            current = parent;
        }

        let decoder = Decoder::with_config(DecoderConfig::new().max_depth(2));
        let top = decoder.decode(current.bytes()).unwrap();
        let level1 = top.get_message(1).unwrap();
        let level2 = level1.get_message(1).unwrap();
        assert_eq!(level2.depth(), 2);
        assert!(matches!(
            level2.get_message(1),
            Err(Error::RecursionLimit { depth: 2 })
        ));

        let unlimited = decode_raw(current.as_slice()).unwrap();
        let leaf = unlimited
            .get_message(1)
            .and_then(|m| m.get_message(1))
            .and_then(|m| m.get_message(1))
            .unwrap();
        assert_eq!(leaf.get_uint(1), 7);
    }

    #[test]
    fn test_field_numbers_sorted() {
        let mut enc = WireEncoder::new();
        enc.add_varint(9, 1).add_varint(2, 1).add_varint(5, 1).add_varint(2, 2);
        let decoded = decode_raw(enc.as_slice()).unwrap();
        assert_eq!(decoded.field_numbers(), vec![2, 5, 9]);
        assert_eq!(decoded.len(), 3);
        assert_eq!(decoded.values(2).len(), 2);
    }
}
