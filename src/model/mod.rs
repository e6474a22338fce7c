//! Model Module
//!
//! In-memory representation of records and their properties.
//!
//! ## Responsibilities
//! - Hold the key, type and ordered properties of one record
//! - Track dirty state per property and per record
//! - Keep pending property deletions until a merge applies them
//! - Merge a freshly loaded record into a locally edited one
//!
//! ## Dirty Tracking
//! ```text
//!   loaded from disk ──► clean
//!   set / add / delete ──► dirty ──► merge + clean() ──► clean
//! ```
//! A record is dirty when its own flag is set or any property is dirty.

mod property;
mod record;

pub use property::Property;
pub use record::Record;
