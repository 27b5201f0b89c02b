//! Query result presentation.
//!
//! Renders [`TagRow`]s as ctags, cscope, xref, grep, XML, JSON lines or a
//! custom template. Paths are shown relative to the working directory and
//! escaped for whitespace-delimited consumers.

pub mod template;

use std::io::{self, Write};

use camino::{Utf8Path, Utf8PathBuf};
use serde::Serialize;

pub use template::{Field, Template, TemplateError};

use crate::paths::{escape_for_display, PathNormalizer};
use crate::store::TagRow;

/// Schema version stamped on JSON output
pub const SYMDEX_JSON_SCHEMA_VERSION: &str = "1.0.0";

const CSCOPE_TEMPLATE: &str = "%F %N %n %C\n";
const XREF_TEMPLATE: &str = "%N\t%K\t%n\t%F\t%C\n";
const GREP_TEMPLATE: &str = "%F:%n:%C\n";

/// Output format for tag rows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TagFormat {
    Ctags,
    Cscope,
    Xref,
    Grep,
    Xml,
    /// One JSON object per line
    Json,
    /// Path only
    Path,
    Custom(Template),
}

impl TagFormat {
    pub fn custom(source: &str) -> Result<TagFormat, TemplateError> {
        Template::parse(source).map(TagFormat::Custom)
    }

    /// Name used in the `<label>: N lines` count header.
    pub fn label(&self) -> &'static str {
        match self {
            TagFormat::Xml => "xml",
            TagFormat::Xref => "xref",
            TagFormat::Ctags => "ctags",
            TagFormat::Cscope => "cscope",
            TagFormat::Json => "json",
            _ => "total",
        }
    }
}

#[derive(Serialize)]
struct JsonTag<'a> {
    schema_version: &'static str,
    #[serde(flatten)]
    row: &'a TagRow,
    display_path: String,
}

/// Writes rows in one format relative to a working directory.
pub struct TagPrinter {
    format: TagFormat,
    cwd: Utf8PathBuf,
    normalizer: PathNormalizer,
}

impl TagPrinter {
    pub fn new(format: TagFormat, cwd: &Utf8Path, normalizer: PathNormalizer) -> Self {
        Self {
            format,
            cwd: cwd.to_path_buf(),
            normalizer,
        }
    }

    pub fn format(&self) -> &TagFormat {
        &self.format
    }

    /// Relative to the working directory, unescaped.
    pub fn relative_path(&self, absolute: &str) -> String {
        self.normalizer
            .to_relative(&self.cwd, Utf8Path::new(absolute))
            .into_string()
    }

    /// Relative to the working directory, escaped.
    pub fn display_path(&self, absolute: &str) -> String {
        escape_for_display(&self.relative_path(absolute))
    }

    /// Preamble written when output goes to a file.
    pub fn write_file_header<W: Write>(&self, out: &mut W) -> io::Result<()> {
        match self.format {
            TagFormat::Xml => {
                writeln!(out, "<?xml version=\"1.0\" encoding=\"UTF-8\"?>")?;
                writeln!(out, "<tags>")?;
            }
            TagFormat::Ctags => {
                writeln!(
                    out,
                    "!_TAG_FILE_FORMAT\t2\t/extended format; --format=1 will not append ;\" to lines/"
                )?;
                writeln!(out, "!_TAG_FILE_SORTED\t1\t/0=unsorted, 1=sorted, 2=foldcase/")?;
            }
            _ => {}
        }
        Ok(())
    }

    /// Epilogue matching [`Self::write_file_header`].
    pub fn write_file_footer<W: Write>(&self, out: &mut W) -> io::Result<()> {
        if self.format == TagFormat::Xml {
            writeln!(out, "</tags>")?;
        }
        Ok(())
    }

    /// `<label>: N lines`
    pub fn write_count<W: Write>(&self, out: &mut W, count: usize) -> io::Result<()> {
        writeln!(out, "{}: {} lines", self.format.label(), count)
    }

    /// Write one row. Returns `false` when the row lacks a kind and is not
    /// printed.
    pub fn write_tag<W: Write>(&self, out: &mut W, row: &TagRow) -> io::Result<bool> {
        let Some(kind) = row.kind.as_deref() else {
            return Ok(false);
        };
        let path = self.display_path(&row.path);

        match &self.format {
            TagFormat::Ctags => write_ctags(out, row, kind, &path)?,
            TagFormat::Xml => write_xml(out, row, kind, &path)?,
            TagFormat::Json => {
                let tag = JsonTag {
                    schema_version: SYMDEX_JSON_SCHEMA_VERSION,
                    row,
                    display_path: self.relative_path(&row.path),
                };
                serde_json::to_writer(&mut *out, &tag)?;
                writeln!(out)?;
            }
            TagFormat::Path => writeln!(out, "{}", path)?,
            TagFormat::Cscope => out.write_all(render(CSCOPE_TEMPLATE, row, &path)?.as_bytes())?,
            TagFormat::Xref => out.write_all(render(XREF_TEMPLATE, row, &path)?.as_bytes())?,
            TagFormat::Grep => out.write_all(render(GREP_TEMPLATE, row, &path)?.as_bytes())?,
            TagFormat::Custom(template) => out.write_all(template.render(row, &path).as_bytes())?,
        }
        Ok(true)
    }

    /// Write rows, optionally preceded by the count header. Returns the
    /// number of rows printed.
    pub fn write_tags<W: Write>(&self, out: &mut W, rows: &[TagRow], count: bool) -> io::Result<usize> {
        if count {
            let printable = rows.iter().filter(|row| row.kind.is_some()).count();
            self.write_count(out, printable)?;
        }
        let mut printed = 0;
        for row in rows {
            if self.write_tag(out, row)? {
                printed += 1;
            }
        }
        Ok(printed)
    }

    /// Write a path listing, one escaped relative path per line.
    pub fn write_paths<W: Write>(&self, out: &mut W, paths: &[String], count: bool) -> io::Result<()> {
        if count {
            self.write_count(out, paths.len())?;
        }
        for path in paths {
            if self.format == TagFormat::Json {
                serde_json::to_writer(&mut *out, &serde_json::json!({
                    "schema_version": SYMDEX_JSON_SCHEMA_VERSION,
                    "path": path,
                    "display_path": self.relative_path(path),
                }))?;
                writeln!(out)?;
            } else {
                writeln!(out, "{}", self.display_path(path))?;
            }
        }
        Ok(())
    }
}

fn render(template: &str, row: &TagRow, path: &str) -> io::Result<String> {
    let template =
        Template::parse(template).map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;
    Ok(template.render(row, path))
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

fn write_ctags<W: Write>(out: &mut W, row: &TagRow, kind: &str, path: &str) -> io::Result<()> {
    write!(
        out,
        "{}\t{}\t{};\"\tkind:{}\tline:{}",
        row.name, path, row.pattern, kind, row.line
    )?;
    if let Some(language) = non_empty(&row.language) {
        write!(out, "\tlanguage:{}", language)?;
    }
    if let (Some(scope_kind), Some(scope_name)) = (non_empty(&row.scope_kind), non_empty(&row.scope_name)) {
        write!(out, "\tscope:{}:{}", scope_kind, scope_name)?;
    }
    if let Some(typeref) = non_empty(&row.typeref) {
        write!(out, "\t{}", typeref)?;
    }
    if row.extras.as_deref().is_some_and(|e| e.contains("fileScope")) {
        write!(out, "\tfile:")?;
    }
    if let Some(inherits) = non_empty(&row.inherits) {
        write!(out, "\tinherits:{}", inherits)?;
    }
    if let Some(access) = non_empty(&row.access) {
        write!(out, "\taccess:{}", access)?;
    }
    if let Some(implementation) = non_empty(&row.implementation) {
        write!(out, "\timplementation:{}", implementation)?;
    }
    if let Some(signature) = non_empty(&row.signature) {
        write!(out, "\tsignature:{}", signature)?;
    }
    if let Some(roles) = non_empty(&row.roles) {
        write!(out, "\troles:{}", roles)?;
    }
    if let Some(extras) = non_empty(&row.extras) {
        write!(out, "\textras:{}", extras)?;
    }
    if row.endl > 0 {
        write!(out, "\tend:{}", row.endl)?;
    }
    writeln!(out)
}

/// Escape the XML special characters.
pub fn xml_escape(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            other => escaped.push(other),
        }
    }
    escaped
}

fn write_xml<W: Write>(out: &mut W, row: &TagRow, kind: &str, path: &str) -> io::Result<()> {
    write!(
        out,
        "<tag mark=\"{}\"><path>{}</path><name>{}</name><pattern>{}</pattern>\
         <compact>{}</compact><kind>{}</kind><line>{}</line>",
        xml_escape(&row.mark),
        xml_escape(path),
        xml_escape(&row.name),
        xml_escape(&row.pattern),
        xml_escape(&row.compact),
        xml_escape(kind),
        row.line
    )?;
    if row.endl > 0 {
        write!(out, "<endl>{}</endl>", row.endl)?;
    }
    if let Some(language) = non_empty(&row.language) {
        write!(out, "<language>{}</language>", xml_escape(language))?;
    }
    if let (Some(scope_kind), Some(scope_name)) = (non_empty(&row.scope_kind), non_empty(&row.scope_name)) {
        write!(
            out,
            "<scope><kind>{}</kind><name>{}</name></scope>",
            xml_escape(scope_kind),
            xml_escape(scope_name)
        )?;
    }
    let optional = [
        ("type", &row.typeref),
        ("inherits", &row.inherits),
        ("access", &row.access),
        ("implementation", &row.implementation),
        ("signature", &row.signature),
        ("roles", &row.roles),
        ("extras", &row.extras),
    ];
    for (element, value) in optional {
        if let Some(value) = non_empty(value) {
            write!(out, "<{0}>{1}</{0}>", element, xml_escape(value))?;
        }
    }
    writeln!(out, "</tag>")
}
