//! printf-like row templates.
//!
//! A template mixes literal text with field references
//! `%[-][width]<field>`, where `<field>` is one of:
//!
//! | Char | Field | Char | Field |
//! |---|---|---|---|
//! | `F` | path | `K` | kind |
//! | `R` | mark | `t` | typeref |
//! | `N` | name | `S` | signature |
//! | `P` | pattern | `a` | access |
//! | `C` | compact | `i` | inherits |
//! | `n` | line | `m` | implementation |
//! | `e` | end line | `p` | scope kind |
//! | `l` | language | `s` | scope name |
//! | `r` | roles | `E` | extras |
//!
//! `%%` is a literal percent sign. Outside field references the backslash
//! escapes `\a \b \f \n \r \t \v \\`, `\0ooo` (octal) and `\xHH` (hex) are
//! recognized; any other escaped character prints as `?`. Widths above
//! [`MAX_WIDTH`] are rejected.

use thiserror::Error;

use crate::store::TagRow;

/// Largest accepted field width.
pub const MAX_WIDTH: usize = 4096;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TemplateError {
    #[error("field width {0} exceeds {max}", max = MAX_WIDTH)]
    WidthTooLarge(String),
}

/// A column of a tag row addressable from a template.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Path,
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

impl Field {
    pub fn from_char(c: char) -> Option<Field> {
        Some(match c {
            'F' => Field::Path,
            'R' => Field::Mark,
            'N' => Field::Name,
            'P' => Field::Pattern,
            'C' => Field::Compact,
            'n' => Field::Line,
            'e' => Field::Endl,
            'l' => Field::Language,
            'r' => Field::Roles,
            'K' => Field::Kind,
            't' => Field::Typeref,
            'S' => Field::Signature,
            'a' => Field::Access,
            'i' => Field::Inherits,
            'm' => Field::Implementation,
            'p' => Field::ScopeKind,
            's' => Field::ScopeName,
            'E' => Field::Extras,
            _ => return None,
        })
    }

    /// Value of this field in `row`; `path` is supplied already rendered.
    pub fn value(self, row: &TagRow, path: &str) -> String {
        let opt = |v: &Option<String>| v.clone().unwrap_or_default();
        match self {
            Field::Path => path.to_string(),
            Field::Mark => row.mark.clone(),
            Field::Name => row.name.clone(),
            Field::Pattern => row.pattern.clone(),
            Field::Compact => row.compact.clone(),
            Field::Line => row.line.to_string(),
            Field::Endl => row.endl.to_string(),
            Field::Language => opt(&row.language),
            Field::Roles => opt(&row.roles),
            Field::Kind => opt(&row.kind),
            Field::Typeref => opt(&row.typeref),
            Field::Signature => opt(&row.signature),
            Field::Access => opt(&row.access),
            Field::Inherits => opt(&row.inherits),
            Field::Implementation => opt(&row.implementation),
            Field::ScopeKind => opt(&row.scope_kind),
            Field::ScopeName => opt(&row.scope_name),
            Field::Extras => opt(&row.extras),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Field {
        field: Field,
        width: usize,
        left_align: bool,
    },
}

/// A parsed row template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    source: String,
    segments: Vec<Segment>,
}

impl Template {
    /// Parse `source`.
    ///
    /// A `%` sequence that does not end in a field character is dropped up to
    /// and including the character that broke it.
    ///
    /// # Errors
    /// [`TemplateError::WidthTooLarge`] when a width exceeds [`MAX_WIDTH`].
    pub fn parse(source: &str) -> Result<Template, TemplateError> {
        let mut segments = Vec::new();
        let mut literal = String::new();
        let mut chars = source.chars().peekable();

        while let Some(c) = chars.next() {
            match c {
                '%' => {
                    if chars.next_if_eq(&'%').is_some() {
                        literal.push('%');
                        continue;
                    }

                    let left_align = chars.next_if_eq(&'-').is_some();
                    let mut digits = String::new();
                    while let Some(d) = chars.next_if(|c| c.is_ascii_digit()) {
                        digits.push(d);
                    }
                    let width = match digits.parse::<usize>() {
                        Ok(width) if width <= MAX_WIDTH => width,
                        Err(_) if digits.is_empty() => 0,
                        _ => return Err(TemplateError::WidthTooLarge(digits)),
                    };

                    if let Some(field) = chars.next().and_then(Field::from_char) {
                        if !literal.is_empty() {
                            segments.push(Segment::Literal(std::mem::take(&mut literal)));
                        }
                        segments.push(Segment::Field {
                            field,
                            width,
                            left_align,
                        });
                    }
                }
                '\\' => literal.push(unescape(&mut chars)),
                other => literal.push(other),
            }
        }

        if !literal.is_empty() {
            segments.push(Segment::Literal(literal));
        }

        Ok(Template {
            source: source.to_string(),
            segments,
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// Render `row`, using `path` for the path field.
    pub fn render(&self, row: &TagRow, path: &str) -> String {
        let mut out = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => out.push_str(text),
                Segment::Field {
                    field,
                    width,
                    left_align,
                } => {
                    let value = field.value(row, path);
                    let pad = width.saturating_sub(value.chars().count());
                    if *left_align {
                        out.push_str(&value);
                        out.extend(std::iter::repeat(' ').take(pad));
                    } else {
                        out.extend(std::iter::repeat(' ').take(pad));
                        out.push_str(&value);
                    }
                }
            }
        }
        out
    }
}

fn unescape<I: Iterator<Item = char>>(chars: &mut std::iter::Peekable<I>) -> char {
    match chars.next() {
        Some('a') => '\x07',
        Some('b') => '\x08',
        Some('f') => '\x0C',
        Some('n') => '\n',
        Some('r') => '\r',
        Some('t') => '\t',
        Some('v') => '\x0B',
        Some('\\') => '\\',
        Some('0') => radix_char(chars, 8, 3),
        Some('x') | Some('X') => radix_char(chars, 16, 2),
        _ => '?',
    }
}

fn radix_char<I: Iterator<Item = char>>(
    chars: &mut std::iter::Peekable<I>,
    radix: u32,
    max_digits: usize,
) -> char {
    let mut value = 0u32;
    for _ in 0..max_digits {
        match chars.next_if(|c| c.is_digit(radix)) {
            Some(d) => value = value * radix + d.to_digit(radix).unwrap_or(0),
            None => break,
        }
    }
    char::from_u32(value & 0xFF).unwrap_or('?')
}
