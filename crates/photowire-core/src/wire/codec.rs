//! Low-level protobuf wire format primitives.
//!
//! Each protobuf field is encoded as:
//! - A varint "key" containing the field number and wire type
//! - The field data (format depends on wire type)
//!
//! Wire types handled by the sync protocol:
//! - 0: VARINT (uint64, enum, bool; there is no zig-zag signed form in use)
//! - 2: LEN (string, bytes, embedded messages)
//! - 5: I32 (fixed32, float, scaled coordinates)
//!
//! I64 and the deprecated group markers never appear in sync traffic and are
//! rejected.

use crate::error::{Error, Result};

/// Protobuf wire types understood by this codec
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum WireType {
    /// Variable-length integer
    Varint = 0,
    /// Length-delimited (strings, bytes, embedded messages)
    Len = 2,
    /// 32-bit fixed-width, little-endian
    I32 = 5,
}

impl WireType {
    /// Maps the low three key bits to a supported wire type
    pub fn from_bits(value: u8) -> Option<Self> {
        match value {
            0 => Some(WireType::Varint),
            2 => Some(WireType::Len),
            5 => Some(WireType::I32),
            _ => None,
        }
    }
}

/// Maximum valid protobuf field number (2^29 - 1)
pub const MAX_FIELD_NUMBER: u32 = 536_870_911;

/// Longest encoding of a 64-bit varint
const MAX_VARINT_LEN: usize = 10;

/// Decode an unsigned LEB128 varint from the start of `data`.
///
/// `offset` is the position of `data` within the enclosing buffer and is only
/// used for error reporting. Returns the value and the number of bytes consumed.
pub fn decode_varint(data: &[u8], offset: usize) -> Result<(u64, usize)> {
    let mut result: u64 = 0;
    let mut shift = 0;

    for (i, &byte) in data.iter().enumerate() {
        if i >= MAX_VARINT_LEN || (i == MAX_VARINT_LEN - 1 && byte > 0x01) {
            return Err(Error::VarintOverflow { offset });
        }

        result |= ((byte & 0x7F) as u64) << shift;
        shift += 7;

        if byte & 0x80 == 0 {
            return Ok((result, i + 1));
        }
    }

    Err(Error::truncated(offset + data.len()))
}

/// Decode a field key into its field number and wire type.
///
/// Returns `(field_number, wire_type, bytes_consumed)`.
pub fn decode_key(data: &[u8], offset: usize) -> Result<(u32, WireType, usize)> {
    let (key, key_len) = decode_varint(data, offset)?;

    let wire_bits = (key & 0x07) as u8;
    let wire_type =
        WireType::from_bits(wire_bits).ok_or_else(|| Error::invalid_wire_type(offset, wire_bits))?;

    let number = key >> 3;
    if number == 0 || number > MAX_FIELD_NUMBER as u64 {
        return Err(Error::InvalidFieldNumber { offset, number });
    }

    Ok((number as u32, wire_type, key_len))
}

/// Compose a field key from a field number and wire type
pub fn make_key(field: u32, wire_type: WireType) -> u64 {
    ((field as u64) << 3) | wire_type as u64
}
