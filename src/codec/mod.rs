//! Codec Module
//!
//! Converts records to and from the on-disk line format.
//!
//! ## Line Format
//! ```text
//! key=type|name1|value1|name2|value2|...
//! ```
//!
//! - Split at the first `=`; everything after it is pipe-delimited
//! - The first field is the type, the rest are name/value pairs
//! - A record with no pairs is a singleton: `key=type` (type may be empty)
//! - `\|` is a literal pipe; any other backslash is kept as written
//! - Fields cannot hold line breaks, and only the last field on a line may
//!   end in a backslash
//! - Blank lines, lines starting with whitespace and `#` comments are skipped
//!
//! ## Example
//! ```text
//! # users
//! bob=active|role|admin|quota|10
//! motd=Welcome\| please log in
//! ```

mod line;

pub use line::{
    escape_field, is_ignored_line, parse_line, read_records, serialize_record, split_fields,
    validate_field, validate_key, write_records, FIELD_SEPARATOR, KEY_SEPARATOR,
};
