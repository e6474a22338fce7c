//! Record
//!
//! A keyed, typed collection of properties with dirty tracking and merge.

use std::fmt;

use crate::codec;
use crate::error::{PipeDbError, Result};

use super::Property;

/// A single database record
///
/// Properties keep their insertion order, which is also the order they are
/// written to disk. Deleted properties move to `pending_deletions` so the
/// deletion can be replayed on top of a freshly reloaded copy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    /// Unique within the owning database, immutable
    key: String,

    /// Free-form type tag; the sole value of a singleton record
    record_type: String,

    /// Properties in insertion order, names unique
    properties: Vec<Property>,

    /// Deletions not yet applied by a merge
    pending_deletions: Vec<Property>,

    /// Record-level flag (type change, property deletion, new record)
    dirty: bool,

    /// Type was changed locally and must survive a merge
    type_dirty: bool,

    /// Install wholesale on merge instead of folding in the disk copy
    replaces_disk: bool,
}

impl Record {
    /// Create a clean record with no properties
    pub fn new(key: impl Into<String>, record_type: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            record_type: record_type.into(),
            properties: Vec::new(),
            pending_deletions: Vec::new(),
            dirty: false,
            type_dirty: false,
            replaces_disk: false,
        }
    }

    /// Builder-style helper: append a property (replacing one of the same name)
    pub fn with_property(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.load_property(Property::new(name, value));
        self
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn record_type(&self) -> &str {
        &self.record_type
    }

    /// Properties in insertion order
    pub fn properties(&self) -> impl Iterator<Item = &Property> {
        self.properties.iter()
    }

    pub fn property_count(&self) -> usize {
        self.properties.len()
    }

    /// A record with no properties
    pub fn is_singleton(&self) -> bool {
        self.properties.is_empty()
    }

    pub fn get_property(&self, name: &str) -> Option<&Property> {
        self.properties.iter().find(|p| p.name() == name)
    }

    pub fn get_property_value(&self, name: &str) -> Option<&str> {
        self.get_property(name).map(Property::value)
    }

    /// Properties deleted locally and not yet merged
    pub fn pending_deletions(&self) -> &[Property] {
        &self.pending_deletions
    }

    // =========================================================================
    // Mutation
    // =========================================================================

    /// Change the type (the value of a singleton record)
    pub fn set_type(&mut self, record_type: impl Into<String>) -> Result<()> {
        let record_type = record_type.into();
        codec::validate_field(&record_type)?;
        self.record_type = record_type;
        self.dirty = true;
        self.type_dirty = true;
        Ok(())
    }

    /// Set a property value
    ///
    /// A missing property is an error unless `create` is set, in which case
    /// it is appended. Either way the property ends up dirty.
    pub fn set_property(&mut self, name: &str, value: impl Into<String>, create: bool) -> Result<()> {
        let value = value.into();
        codec::validate_field(&value)?;
        match self.position(name) {
            Some(idx) => {
                self.properties[idx].set_value(value);
                Ok(())
            }
            None if create => self.add_property(Property::new(name, value), false),
            None => Err(PipeDbError::NotFound(format!(
                "property {} in record {}",
                name, self.key
            ))),
        }
    }

    /// Add a property, replacing an existing one only when `clobber` is set
    pub fn add_property(&mut self, mut property: Property, clobber: bool) -> Result<()> {
        codec::validate_field(property.name())?;
        codec::validate_field(property.value())?;

        let existing = self.position(property.name());
        if existing.is_some() && !clobber {
            return Err(PipeDbError::AlreadyExists(format!(
                "property {} in record {}",
                property.name(),
                self.key
            )));
        }

        // Re-adding cancels an earlier delete of the same name
        self.pending_deletions.retain(|p| p.name() != property.name());

        property.mark_dirty();
        match existing {
            Some(idx) => self.properties[idx] = property,
            None => self.properties.push(property),
        }
        Ok(())
    }

    /// Delete a property; the deletion is replayed on the next merge
    pub fn delete_property(&mut self, name: &str) -> Result<()> {
        let idx = self.position(name).ok_or_else(|| {
            PipeDbError::NotFound(format!("property {} in record {}", name, self.key))
        })?;

        let property = self.properties.remove(idx);
        self.pending_deletions.push(property);
        // Record-level dirty, otherwise the merge would skip this record
        self.dirty = true;
        Ok(())
    }

    // =========================================================================
    // Dirty Tracking
    // =========================================================================

    /// True if the record flag or any property flag is set
    pub fn is_dirty(&self) -> bool {
        self.dirty || self.properties.iter().any(Property::is_dirty)
    }

    /// Clear the record flag, every property flag and any pending deletions
    pub fn clean(&mut self) {
        self.dirty = false;
        self.type_dirty = false;
        self.replaces_disk = false;
        self.pending_deletions.clear();
        for property in &mut self.properties {
            property.clean();
        }
    }

    /// Mark a record handed to the database as a whole: everything dirty,
    /// and the next merge installs it as-is
    pub(crate) fn mark_added(&mut self) {
        self.dirty = true;
        self.type_dirty = true;
        self.replaces_disk = true;
        for property in &mut self.properties {
            property.mark_dirty();
        }
    }

    pub(crate) fn replaces_disk(&self) -> bool {
        self.replaces_disk
    }

    /// Replay the unsaved edits of a later copy of this record on top of it
    ///
    /// Dirty properties, pending deletions and a changed type carry over;
    /// clean state in `later` is ignored.
    pub(crate) fn absorb(&mut self, later: Record) {
        let Record {
            record_type,
            properties,
            pending_deletions,
            dirty,
            type_dirty,
            ..
        } = later;

        if type_dirty {
            self.record_type = record_type;
            self.type_dirty = true;
        }

        for deleted in pending_deletions {
            if let Some(idx) = self.position(deleted.name()) {
                self.properties.remove(idx);
            }
            if !self.pending_deletions.iter().any(|p| p.name() == deleted.name()) {
                self.pending_deletions.push(deleted);
            }
        }

        for property in properties.into_iter().filter(Property::is_dirty) {
            self.pending_deletions.retain(|p| p.name() != property.name());
            self.load_property(property);
        }

        self.dirty |= dirty;
    }

    // =========================================================================
    // Merge
    // =========================================================================

    /// Fold a newer on-disk copy of this record into the local one
    ///
    /// - Dirty local properties keep their value.
    /// - Clean local properties take the disk value.
    /// - Local properties missing from disk are kept.
    /// - Properties only on disk are appended.
    /// - Pending deletions are applied last and then cleared.
    /// - The type follows disk unless it was changed locally.
    pub fn merge(&mut self, newer: Record) {
        tracing::debug!("merging record {}", self.key);

        let Record {
            record_type,
            properties: mut incoming,
            ..
        } = newer;

        if !self.type_dirty {
            self.record_type = record_type;
        }

        let local = std::mem::take(&mut self.properties);
        let mut merged = Vec::with_capacity(local.len().max(incoming.len()));

        for ours in local {
            let theirs = incoming
                .iter()
                .position(|p| p.name() == ours.name())
                .map(|idx| incoming.remove(idx));

            match theirs {
                Some(_) if ours.is_dirty() => {
                    tracing::debug!("our {} property is dirty, not clobbering", ours.name());
                    merged.push(ours);
                }
                Some(theirs) => merged.push(theirs),
                None => merged.push(ours),
            }
        }
        merged.extend(incoming);

        for deleted in std::mem::take(&mut self.pending_deletions) {
            if let Some(idx) = merged.iter().position(|p| p.name() == deleted.name()) {
                tracing::debug!("deleting property {}", deleted.name());
                merged.remove(idx);
            }
        }

        self.properties = merged;
    }

    // =========================================================================
    // Rendering
    // =========================================================================

    /// Multi-line rendering: `key=type` then one indented `name=value` per
    /// property, sorted by name
    pub fn pretty(&self) -> String {
        let mut sorted: Vec<&Property> = self.properties.iter().collect();
        sorted.sort_by(|a, b| a.name().cmp(b.name()));

        let mut out = format!("{}={}", self.key, self.record_type);
        for property in sorted {
            out.push_str("\n    ");
            out.push_str(&property.to_string());
        }
        out
    }

    // =========================================================================
    // Private Helpers
    // =========================================================================

    fn position(&self, name: &str) -> Option<usize> {
        self.properties.iter().position(|p| p.name() == name)
    }

    /// Insert without touching dirty flags; a repeated name replaces the
    /// earlier one in place (used while loading)
    pub(crate) fn load_property(&mut self, property: Property) {
        match self.position(property.name()) {
            Some(idx) => self.properties[idx] = property,
            None => self.properties.push(property),
        }
    }
}

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&codec::serialize_record(self))
    }
}
