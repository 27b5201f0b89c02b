//! Tag record stream decoding.
//!
//! The producer answers every requested path with one *group*: zero or more
//! record lines followed by a terminator line. A record line is a sequence of
//! fields:
//!
//! ```text
//! 0x1E <type> '$' <key> '=' <value> 0x1F
//! ```
//!
//! where `<type>` is `I` (integer) or `T` (text). The text value `-` stands for
//! null. The group terminator is the line `0x1D '\n'`.

pub mod fields;

use std::io::BufRead;

pub use fields::{FieldKey, FieldValue, TagFields};

use crate::error::{IndexError, Result};

/// Group separator; a line holding only this byte ends a group.
pub const GROUP_SEP: char = '\x1D';
/// Starts every field.
pub const FIELD_SEP: char = '\x1E';
/// Ends every field.
pub const FIELD_END: char = '\x1F';
/// The full terminator line.
pub const GROUP_END: &str = "\x1D\n";
/// Text placeholder meaning "no value".
pub const NULL_SENTINEL: &str = "-";

/// Records received for one requested path.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagGroup {
    pub records: Vec<TagFields>,
    /// False when the stream ended before the terminator line.
    pub complete: bool,
}

impl TagGroup {
    pub fn complete(records: Vec<TagFields>) -> Self {
        Self {
            records,
            complete: true,
        }
    }
}

/// Decode one record line.
///
/// Decoding stops at the first token that does not open with the field
/// separator (the trailing newline is such a token). Tokens without a `$` or
/// `=`, unknown keys and unknown type characters are ignored. Text values are
/// kept exactly as sent; values that are not UTF-8 become [`FieldValue::Bytes`].
pub fn decode_record(line: impl AsRef<[u8]>) -> TagFields {
    let mut fields = TagFields::new();

    for token in line.as_ref().split(|&b| b == FIELD_END as u8) {
        let Some(body) = token.strip_prefix(&[FIELD_SEP as u8]) else {
            break;
        };
        let Some((&type_byte, rest)) = body.split_first() else {
            continue;
        };
        let Some(rest) = rest.strip_prefix(b"$") else {
            continue;
        };
        let Some(eq) = rest.iter().position(|&b| b == b'=') else {
            continue;
        };
        let Some(key) = std::str::from_utf8(&rest[..eq]).ok().and_then(FieldKey::parse) else {
            continue;
        };

        let value = &rest[eq + 1..];
        let value = if value == NULL_SENTINEL.as_bytes() { &[][..] } else { value };
        match type_byte {
            b'I' => {
                if let Some(n) = fields::parse_leading_int(value) {
                    fields.insert(key, FieldValue::Int(n));
                }
            }
            b'T' if !value.is_empty() => {
                let value = match String::from_utf8(value.to_vec()) {
                    Ok(text) => FieldValue::Text(text),
                    Err(e) => FieldValue::Bytes(e.into_bytes()),
                };
                fields.insert(key, value);
            }
            _ => {}
        }
    }

    fields
}

/// Read one group from `reader`.
///
/// Consumes lines up to and including the terminator line and never reads
/// past it. End of stream before the terminator yields an incomplete group
/// carrying the records seen so far.
pub fn read_group<R: BufRead>(reader: &mut R) -> Result<TagGroup> {
    let mut group = TagGroup::default();
    let mut buf = Vec::new();

    loop {
        buf.clear();
        let n = reader
            .read_until(b'\n', &mut buf)
            .map_err(|e| IndexError::ProducerChannel(format!("read failed: {}", e)))?;
        if n == 0 {
            return Ok(group);
        }

        if buf == GROUP_END.as_bytes() {
            group.complete = true;
            return Ok(group);
        }

        let record = decode_record(&buf);
        if !record.is_empty() {
            group.records.push(record);
        }
    }
}

/// Encode a record in wire form (without the trailing newline).
///
/// Used by in-process producers and tests. Byte values that are not UTF-8
/// are written lossily.
pub fn encode_record(fields: &TagFields) -> String {
    let mut line = String::new();
    for key in FieldKey::ALL {
        match fields.get(key) {
            Some(FieldValue::Int(n)) => {
                line.push(FIELD_SEP);
                line.push_str(&format!("I${}={}", key, n));
                line.push(FIELD_END);
            }
            Some(FieldValue::Text(s)) => {
                line.push(FIELD_SEP);
                line.push_str(&format!("T${}={}", key, s));
                line.push(FIELD_END);
            }
            Some(FieldValue::Bytes(b)) => {
                line.push(FIELD_SEP);
                line.push_str(&format!("T${}={}", key, String::from_utf8_lossy(b)));
                line.push(FIELD_END);
            }
            None => {}
        }
    }
    line
}
