//! Human-readable dump of a decoded message.
//!
//! Without a schema the only way to learn what a response carries is to look
//! at it. The tree lists fields by number with every occurrence in wire order:
//!
//! ```text
//! 1 {
//!   1: "page_next"
//!   6: "state_abc"
//! }
//! 3: 0x16800a50 (37.7490000 deg, 2.0686e-25)
//! ```

use super::value::{FieldMap, WireValue};
use crate::convert::{fixed32_to_scaled_degrees, int32_to_float};
use bytes::Bytes;
use std::fmt::Write as FmtWrite;

const INDENT: &str = "  ";

impl FieldMap {
    /// Writes the raw field tree to `w`.
    ///
    /// Length-delimited values print as a nested block when they decode as a
    /// message within the depth cap, as text when they are printable UTF-8,
    /// and as hex otherwise. A printable span that decodes to nothing but
    /// varints is treated as text.
    pub fn write_tree(&self, w: &mut impl FmtWrite) -> std::fmt::Result {
        TreeWriter::new(w).write_map(self)
    }

    /// Renders the raw field tree into a string
    pub fn to_tree_string(&self) -> String {
        let mut output = String::new();
        // Writing to a String cannot fail.
        let _ = self.write_tree(&mut output);
        output
    }
}

struct TreeWriter<'a, W: FmtWrite> {
    writer: &'a mut W,
    indent_level: usize,
}

impl<'a, W: FmtWrite> TreeWriter<'a, W> {
    fn new(writer: &'a mut W) -> Self {
        Self {
            writer,
            indent_level: 0,
        }
    }

    fn indent(&mut self) {
        self.indent_level += 1;
    }

    fn dedent(&mut self) {
        self.indent_level = self.indent_level.saturating_sub(1);
    }

    fn write_indent(&mut self) -> std::fmt::Result {
        for _ in 0..self.indent_level {
            self.writer.write_str(INDENT)?;
        }
        Ok(())
    }

    fn writeln(&mut self, s: &str) -> std::fmt::Result {
        self.write_indent()?;
        writeln!(self.writer, "{}", s)
    }

    fn write_map(&mut self, map: &FieldMap) -> std::fmt::Result {
        for field in map.field_numbers() {
            for value in map.values(field) {
                self.write_value(map, field, value)?;
            }
        }
        Ok(())
    }

    fn write_value(&mut self, parent: &FieldMap, field: u32, value: &WireValue) -> std::fmt::Result {
        match value {
            WireValue::Varint(v) => self.writeln(&format!("{}: {}", field, v)),
            WireValue::Fixed32(v) => self.writeln(&format!(
                "{}: 0x{:08x} ({:.7} deg, {:.4e})",
                field,
                v,
                fixed32_to_scaled_degrees(*v as u64),
                int32_to_float(*v as i32)
            )),
            WireValue::Bytes(bytes) => self.write_len(parent, field, bytes),
        }
    }

    fn write_len(&mut self, parent: &FieldMap, field: u32, bytes: &Bytes) -> std::fmt::Result {
        if bytes.is_empty() {
            return self.writeln(&format!("{}: \"\"", field));
        }

        let text = printable_text(bytes);
        let nested = parent
            .decode_child(bytes)
            .ok()
            .filter(|nested| !nested.is_empty())
            .filter(|nested| text.is_none() || has_structured_field(nested));

        if let Some(nested) = nested {
            self.writeln(&format!("{} {{", field))?;
            self.indent();
            self.write_map(&nested)?;
            self.dedent();
            return self.writeln("}");
        }

        match text {
            Some(text) => self.writeln(&format!("{}: \"{}\"", field, escape_string(text))),
            None => self.writeln(&format!("{}: 0x{}", field, hex::encode(bytes))),
        }
    }
}

/// True if the map holds anything besides varints.
///
/// Short ASCII text often parses as a run of varint fields ("hi" reads as
/// `13: 105`), so a printable span only renders as a message when the
/// decode found length-delimited or fixed-width fields.
fn has_structured_field(map: &FieldMap) -> bool {
    map.field_numbers().into_iter().any(|field| {
        map.values(field)
            .iter()
            .any(|value| !matches!(value, WireValue::Varint(_)))
    })
}

/// Returns the text if the span is UTF-8 without control characters
fn printable_text(bytes: &[u8]) -> Option<&str> {
    let text = std::str::from_utf8(bytes).ok()?;
    if text.chars().any(char::is_control) {
        return None;
    }
    Some(text)
}

/// Escape a string for display between double quotes
fn escape_string(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '\\' => result.push_str("\\\\"),
            '"' => result.push_str("\\\""),
            _ => result.push(c),
        }
    }
    result
}
