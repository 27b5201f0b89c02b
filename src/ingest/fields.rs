//! Typed tag field sets.

use std::collections::BTreeMap;
use std::fmt;

/// Attribute keys understood by the store.
///
/// The string form is the wire key and the `tag` column name at once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FieldKey {
    Mark,
    Name,
    Pattern,
    Compact,
    Line,
    Endl,
    Language,
    Roles,
    Kind,
    Typeref,
    Signature,
    Access,
    Inherits,
    Implementation,
    ScopeKind,
    ScopeName,
    Extras,
}

impl FieldKey {
    /// Every key, in `tag` column order.
    pub const ALL: [FieldKey; 17] = [
        FieldKey::Mark,
        FieldKey::Name,
        FieldKey::Pattern,
        FieldKey::Compact,
        FieldKey::Line,
        FieldKey::Endl,
        FieldKey::Language,
        FieldKey::Roles,
        FieldKey::Kind,
        FieldKey::Typeref,
        FieldKey::Signature,
        FieldKey::Access,
        FieldKey::Inherits,
        FieldKey::Implementation,
        FieldKey::ScopeKind,
        FieldKey::ScopeName,
        FieldKey::Extras,
    ];

    /// Keys a record must carry before the store accepts it.
    pub const REQUIRED: [FieldKey; 6] = [
        FieldKey::Name,
        FieldKey::Mark,
        FieldKey::Pattern,
        FieldKey::Compact,
        FieldKey::Line,
        FieldKey::Kind,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            FieldKey::Mark => "mark",
            FieldKey::Name => "name",
            FieldKey::Pattern => "pattern",
            FieldKey::Compact => "compact",
            FieldKey::Line => "line",
            FieldKey::Endl => "endl",
            FieldKey::Language => "language",
            FieldKey::Roles => "roles",
            FieldKey::Kind => "kind",
            FieldKey::Typeref => "typeref",
            FieldKey::Signature => "signature",
            FieldKey::Access => "access",
            FieldKey::Inherits => "inherits",
            FieldKey::Implementation => "implementation",
            FieldKey::ScopeKind => "scopeKind",
            FieldKey::ScopeName => "scopeName",
            FieldKey::Extras => "extras",
        }
    }

    /// Look up a wire key. Unknown keys yield `None` and are ignored by the decoder.
    pub fn parse(key: &str) -> Option<FieldKey> {
        FieldKey::ALL.iter().copied().find(|k| k.as_str() == key)
    }

    pub fn is_integer(self) -> bool {
        matches!(self, FieldKey::Line | FieldKey::Endl)
    }
}

impl fmt::Display for FieldKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A decoded field value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    Int(i64),
    Text(String),
    /// Text that is not valid UTF-8, kept byte for byte.
    Bytes(Vec<u8>),
}

/// One tag record: the fields present on the wire.
///
/// Absent keys (including text sent as the `-` sentinel or empty) simply have
/// no entry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagFields {
    values: BTreeMap<FieldKey, FieldValue>,
}

impl TagFields {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: FieldKey, value: FieldValue) {
        self.values.insert(key, value);
    }

    /// Builder-style text insert, used heavily by tests and fakes.
    pub fn with_text(mut self, key: FieldKey, value: &str) -> Self {
        self.insert(key, FieldValue::Text(value.to_string()));
        self
    }

    pub fn with_int(mut self, key: FieldKey, value: i64) -> Self {
        self.insert(key, FieldValue::Int(value));
        self
    }

    pub fn get(&self, key: FieldKey) -> Option<&FieldValue> {
        self.values.get(&key)
    }

    /// Text value of `key`. Integers are not coerced.
    pub fn text(&self, key: FieldKey) -> Option<&str> {
        match self.values.get(&key) {
            Some(FieldValue::Text(s)) => Some(s.as_str()),
            _ => None,
        }
    }

    /// Raw bytes of a text value, UTF-8 or not.
    pub fn text_bytes(&self, key: FieldKey) -> Option<&[u8]> {
        match self.values.get(&key) {
            Some(FieldValue::Text(s)) => Some(s.as_bytes()),
            Some(FieldValue::Bytes(b)) => Some(b.as_slice()),
            _ => None,
        }
    }

    /// Integer value of `key`. Text values that start with digits are accepted.
    pub fn int(&self, key: FieldKey) -> Option<i64> {
        match self.values.get(&key) {
            Some(FieldValue::Int(n)) => Some(*n),
            Some(FieldValue::Text(s)) => parse_leading_int(s.as_bytes()),
            _ => None,
        }
    }

    /// First required key this record lacks, if any.
    pub fn missing_required(&self) -> Option<FieldKey> {
        FieldKey::REQUIRED.iter().copied().find(|key| {
            if key.is_integer() {
                self.int(*key).is_none()
            } else {
                self.text_bytes(*key).is_none()
            }
        })
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Parse the leading decimal digits of `s`, `strtoull` style.
///
/// Returns `None` when `s` has no leading digit or the value overflows.
pub(crate) fn parse_leading_int(s: &[u8]) -> Option<i64> {
    let digits = s.iter().take_while(|b| b.is_ascii_digit()).count();
    if digits == 0 {
        return None;
    }
    std::str::from_utf8(&s[..digits]).ok()?.parse().ok()
}
