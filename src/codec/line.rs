//! Line codec
//!
//! Encoding and decoding functions for one record per line.

use std::io::{BufRead, Write};

use crate::error::{PipeDbError, Result};
use crate::model::{Property, Record};

/// Separates the key from the rest of the line
pub const KEY_SEPARATOR: char = '=';

/// Separates type, names and values
pub const FIELD_SEPARATOR: char = '|';

const ESCAPE: char = '\\';

// =============================================================================
// Encoding
// =============================================================================

/// Escape pipes in a single field
///
/// Backslashes are written as-is; `\|` is the only escape the format has.
pub fn escape_field(field: &str) -> String {
    field.replace(FIELD_SEPARATOR, "\\|")
}

/// Serialize a record to one line, without the trailing newline
///
/// Format: key=type(|name|value)*, properties in insertion order
pub fn serialize_record(record: &Record) -> String {
    let mut line = String::with_capacity(record.key().len() + 16);
    line.push_str(record.key());
    line.push(KEY_SEPARATOR);
    line.push_str(&escape_field(record.record_type()));

    for property in record.properties() {
        line.push(FIELD_SEPARATOR);
        line.push_str(&escape_field(property.name()));
        line.push(FIELD_SEPARATOR);
        line.push_str(&escape_field(property.value()));
    }
    line
}

/// Write records, one newline-terminated line each, in iteration order
///
/// Returns the number of records written. A record whose line would not
/// read back as written is refused before anything reaches `writer`.
pub fn write_records<'a, W, I>(writer: &mut W, records: I) -> Result<usize>
where
    W: Write,
    I: IntoIterator<Item = &'a Record>,
{
    let mut buffer = String::new();
    let mut count = 0;
    for record in records {
        check_representable(record)?;
        buffer.push_str(&serialize_record(record));
        buffer.push('\n');
        count += 1;
    }
    writer.write_all(buffer.as_bytes())?;
    Ok(count)
}

/// Reject keys the line format cannot represent
pub fn validate_key(key: &str) -> Result<()> {
    let reason = if key.is_empty() {
        Some("key is empty")
    } else if key.contains(KEY_SEPARATOR) {
        Some("key contains '='")
    } else if key.contains(['\n', '\r']) {
        Some("key contains a line break")
    } else if is_ignored_line(key) {
        Some("key starts with whitespace or '#'")
    } else {
        None
    };

    match reason {
        Some(reason) => Err(PipeDbError::InvalidKey(format!("{:?}: {}", key, reason))),
        None => Ok(()),
    }
}

/// Reject a type, name or value the line format cannot store
///
/// Line breaks would end the record early, and a trailing backslash would
/// swallow the pipe written after it.
pub fn validate_field(field: &str) -> Result<()> {
    if field.contains(['\n', '\r']) {
        Err(PipeDbError::InvalidField(format!("{:?}: contains a line break", field)))
    } else if field.ends_with(ESCAPE) {
        Err(PipeDbError::InvalidField(format!("{:?}: ends with a backslash", field)))
    } else {
        Ok(())
    }
}

/// Line breaks are never storable; a trailing backslash is only harmless in
/// the last field of a line, which is how older files can carry one
fn check_representable(record: &Record) -> Result<()> {
    let mut fields = std::iter::once(record.record_type())
        .chain(record.properties().flat_map(|p| [p.name(), p.value()]))
        .peekable();

    while let Some(field) = fields.next() {
        let last = fields.peek().is_none();
        let broken = field.contains(['\n', '\r']) || (!last && field.ends_with(ESCAPE));
        if broken {
            return Err(PipeDbError::InvalidField(format!(
                "record {}: field {:?} cannot be written",
                record.key(),
                field
            )));
        }
    }
    Ok(())
}

// =============================================================================
// Decoding
// =============================================================================

/// Blank, whitespace-led and `#` lines carry no record
pub fn is_ignored_line(line: &str) -> bool {
    match line.chars().next() {
        None => true,
        Some(c) => c == '#' || c.is_whitespace(),
    }
}

/// Split on pipes not preceded by a backslash, turning `\|` into `|`
///
/// Every other backslash is kept as written.
pub fn split_fields(text: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            ESCAPE if chars.peek() == Some(&FIELD_SEPARATOR) => {
                chars.next();
                current.push(FIELD_SEPARATOR);
            }
            FIELD_SEPARATOR => fields.push(std::mem::take(&mut current)),
            _ => current.push(c),
        }
    }
    fields.push(current);
    fields
}

/// Parse one record line
///
/// The returned record and its properties are clean.
pub fn parse_line(line: &str) -> Result<Record> {
    let (key, rest) = line
        .split_once(KEY_SEPARATOR)
        .ok_or_else(|| PipeDbError::parse(format!("missing '{}' in line: {}", KEY_SEPARATOR, line)))?;

    if key.is_empty() {
        return Err(PipeDbError::parse(format!("empty key in line: {}", line)));
    }

    let mut fields = split_fields(rest).into_iter();
    // split_fields always yields at least one field
    let record_type = fields.next().unwrap_or_default();
    let pairs: Vec<String> = fields.collect();

    if pairs.len() % 2 != 0 {
        return Err(PipeDbError::parse(format!(
            "odd number of name/value fields on line: {}",
            line
        )));
    }

    let mut record = Record::new(key, record_type);
    let mut pairs = pairs.into_iter();
    while let (Some(name), Some(value)) = (pairs.next(), pairs.next()) {
        record.load_property(Property::new(name, value));
    }
    Ok(record)
}

/// Read every record from a line-oriented source
///
/// Parse errors carry the 1-based line number and abort the whole read.
pub fn read_records<R: BufRead>(reader: R) -> Result<Vec<Record>> {
    let mut records = Vec::new();

    for (idx, line) in reader.lines().enumerate() {
        let line = line?;
        let lineno = idx + 1;

        if is_ignored_line(&line) {
            continue;
        }

        match parse_line(&line) {
            Ok(record) => records.push(record),
            Err(e) => {
                tracing::error!("Parse error on line {}", lineno);
                return Err(e.at_line(lineno));
            }
        }
    }

    Ok(records)
}
