//! Numeric reinterpretation and string helpers.
//!
//! The wire format has no signed or floating varints, so several fields are
//! carried as raw bit patterns. The three numeric conversions below are
//! unrelated despite the similar shapes:
//!
//! - [`fixed32_to_scaled_degrees`]: two's-complement integer scaled by 1e-7
//! - [`int32_to_float`]: IEEE-754 single-precision bit pattern
//! - [`int64_to_float`]: IEEE-754 double-precision bit pattern

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;

/// Scale of coordinates stored as integer degrees * 10^7
const DEGREE_SCALE: f64 = 1e7;

/// Decodes a coordinate stored as a signed 32-bit count of 1e-7 degrees.
///
/// Only the low 32 bits of `raw` are used; values at or above 2^31 are
/// negative.
pub fn fixed32_to_scaled_degrees(raw: u64) -> f64 {
    (raw as u32 as i32) as f64 / DEGREE_SCALE
}

/// Reinterprets a 32-bit pattern as an IEEE-754 single
pub fn int32_to_float(bits: i32) -> f32 {
    f32::from_bits(bits as u32)
}

/// Reinterprets a 64-bit pattern as an IEEE-754 double
pub fn int64_to_float(bits: i64) -> f64 {
    f64::from_bits(bits as u64)
}

/// Lowercase hex rendering of a hash
pub fn to_hex(bytes: &[u8]) -> String {
    hex::encode(bytes)
}

/// Derives the server-side dedup key from raw SHA1 bytes.
///
/// URL-safe base64 without padding (`+` becomes `-`, `/` becomes `_`).
pub fn dedup_key_from_sha1(sha1: &[u8]) -> String {
    URL_SAFE_NO_PAD.encode(sha1)
}
