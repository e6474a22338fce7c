//! Database Module
//!
//! The file-backed record store shared by cooperating processes.
//!
//! ## Responsibilities
//! - Load every record from the data file under a shared lock
//! - Track local edits and deletions until they are written
//! - Reconcile local edits with concurrent external writes
//! - Write the merged state back in ascending key order

use std::collections::BTreeMap;
use std::fs::{self, File, OpenOptions};
use std::io::{BufReader, Seek, SeekFrom, Write};
use std::path::Path;

use crate::codec;
use crate::config::Config;
use crate::error::{PipeDbError, Result};
use crate::lock::{LockState, Semaphore};
use crate::model::{Property, Record};
use crate::natsort;

/// An open database file
///
/// ## Concurrency Model: Cross-Process, Optimistic
///
/// - **Reads** (open/reload): shared advisory lock on the lock file
/// - **Writes** (every mutation): exclusive lock → reload → merge → save
///   → unlock, so each mutation is atomic against other participants that
///   follow the same sequence
///
/// All calls run synchronously on the calling thread. An instance is not
/// meant to be used from several threads at once; wrap it in a mutex if a
/// process needs that. Separate instances never share records.
pub struct Database {
    /// Database configuration
    config: Config,

    /// Records by key (BTreeMap keeps the on-disk order)
    records: BTreeMap<String, Record>,

    /// Records moved aside by `reload` because they held unsaved edits
    dirty_snapshot: Option<BTreeMap<String, Record>>,

    /// Keys deleted locally, applied on the next merge
    deleted_records: Vec<String>,

    /// Advisory lock on the sibling lock file
    semaphore: Semaphore,

    /// Nesting depth of `batch` calls; autosave is suspended while > 0
    batch_depth: usize,
}

impl Database {
    /// Open a database with the given config
    ///
    /// On open:
    /// 1. Create the data file if missing (when configured)
    /// 2. Take a shared lock
    /// 3. Parse every line (any parse error aborts the open)
    /// 4. Release the lock
    pub fn open(config: Config) -> Result<Self> {
        if config.create_if_missing && !config.path.exists() {
            if let Some(parent) = config.path.parent() {
                if !parent.as_os_str().is_empty() {
                    fs::create_dir_all(parent)?;
                }
            }
            OpenOptions::new()
                .create(true)
                .append(true)
                .open(&config.path)?;
            tracing::info!("created empty database {}", config.path.display());
        }

        let semaphore = Semaphore::new(config.resolved_lock_path(), config.locking);
        tracing::debug!(
            "opening database {} (lock file {})",
            config.path.display(),
            semaphore.path().display()
        );

        let mut db = Self {
            config,
            records: BTreeMap::new(),
            dirty_snapshot: None,
            deleted_records: Vec::new(),
            semaphore,
            batch_depth: 0,
        };
        db.reload()?;
        Ok(db)
    }

    /// Open with a path (convenience method)
    ///
    /// Uses default config with the specified data file
    pub fn open_path(path: impl AsRef<Path>) -> Result<Self> {
        let config = Config::builder().path(path.as_ref()).build();
        Self::open(config)
    }

    // =========================================================================
    // Queries
    // =========================================================================

    /// Get a record by key
    pub fn get_record(&self, key: &str) -> Option<&Record> {
        self.records.get(key)
    }

    /// Get a record for in-memory editing
    ///
    /// Nothing is written until `lock_reload_and_save` (or `batch`) runs.
    pub fn record_mut(&mut self, key: &str) -> Option<&mut Record> {
        self.records.get_mut(key)
    }

    /// All records matching every `(name, value)` pair
    ///
    /// The name `type` matches the record type; any other name matches the
    /// property of that name. A missing property never matches.
    pub fn get_all_by(&self, criteria: &[(&str, &str)]) -> Vec<&Record> {
        self.filter(|record| {
            criteria.iter().all(|(name, expected)| {
                let actual = if *name == "type" {
                    Some(record.record_type())
                } else {
                    record.get_property_value(name)
                };
                actual == Some(*expected)
            })
        })
    }

    /// All records accepted by the predicate
    pub fn filter<P>(&self, predicate: P) -> Vec<&Record>
    where
        P: Fn(&Record) -> bool,
    {
        self.records.values().filter(|r| predicate(r)).collect()
    }

    /// Records in ascending key order
    pub fn iter(&self) -> impl Iterator<Item = &Record> {
        self.records.values()
    }

    /// Keys in natural order, for display
    pub fn keys_natural(&self) -> Vec<&str> {
        let keys: Vec<&str> = self.records.keys().map(String::as_str).collect();
        natsort::natsorted(&keys, natsort::natcmp)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// True if any record is dirty or a record deletion is pending
    pub fn is_dirty(&self) -> bool {
        !self.deleted_records.is_empty() || self.records.values().any(Record::is_dirty)
    }

    // =========================================================================
    // Mutations
    // =========================================================================

    /// Add a record
    ///
    /// Fails with `AlreadyExists` if the key is taken and `clobber` is false.
    /// The record is installed as a whole: on the next merge it replaces any
    /// on-disk copy instead of being folded into it.
    pub fn add_record(&mut self, mut record: Record, clobber: bool) -> Result<()> {
        codec::validate_key(record.key())?;
        codec::validate_field(record.record_type())?;
        for property in record.properties() {
            codec::validate_field(property.name())?;
            codec::validate_field(property.value())?;
        }

        if self.records.contains_key(record.key()) && !clobber {
            return Err(PipeDbError::AlreadyExists(format!("record {}", record.key())));
        }

        tracing::info!("{}: ADD: {}", self.config.path.display(), record);
        record.mark_added();
        // Re-adding cancels an earlier delete of the same key
        self.deleted_records.retain(|k| k != record.key());
        self.records.insert(record.key().to_string(), record);

        self.autosave()
    }

    /// Delete a record by key
    pub fn delete_record(&mut self, key: &str) -> Result<()> {
        let record = self
            .records
            .remove(key)
            .ok_or_else(|| PipeDbError::NotFound(format!("record {}", key)))?;

        tracing::info!("{}: DEL: {}", self.config.path.display(), record);
        self.deleted_records.push(record.key().to_string());

        self.autosave()
    }

    /// Set a property on a record, creating it when `create` is set
    pub fn set_property(
        &mut self,
        key: &str,
        name: &str,
        value: impl Into<String>,
        create: bool,
    ) -> Result<()> {
        let value = value.into();
        tracing::info!(
            "{}: record {}, prop {} <- {}",
            self.config.path.display(),
            key,
            name,
            value
        );
        self.edit_record(key, |record| record.set_property(name, value, create))
    }

    /// Add a property to a record
    pub fn add_property(&mut self, key: &str, property: Property, clobber: bool) -> Result<()> {
        tracing::info!(
            "{}: adding property {} to record {}",
            self.config.path.display(),
            property,
            key
        );
        self.edit_record(key, |record| record.add_property(property, clobber))
    }

    /// Delete a property from a record
    pub fn delete_property(&mut self, key: &str, name: &str) -> Result<()> {
        tracing::info!(
            "{}: deleting property {} in record {}",
            self.config.path.display(),
            name,
            key
        );
        self.edit_record(key, |record| record.delete_property(name))
    }

    /// Change the type of a record
    pub fn set_type(&mut self, key: &str, record_type: impl Into<String>) -> Result<()> {
        let record_type = record_type.into();
        tracing::info!(
            "{}: record {}, type <- {}",
            self.config.path.display(),
            key,
            record_type
        );
        self.edit_record(key, |record| record.set_type(record_type))
    }

    /// Run several mutations with a single lock-reload-save at the end
    ///
    /// Autosave is suspended inside the closure. If the closure fails, its
    /// edits stay in memory (dirty) and nothing is written.
    pub fn batch<T, F>(&mut self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Self) -> Result<T>,
    {
        self.batch_depth += 1;
        let result = f(&mut *self);
        self.batch_depth -= 1;

        let value = result?;
        if self.batch_depth == 0 {
            self.lock_reload_and_save()?;
        }
        Ok(value)
    }

    // =========================================================================
    // Load / Merge / Save Protocol
    // =========================================================================

    /// Re-read the data file
    ///
    /// If any record holds unsaved edits, the whole in-memory map is moved
    /// aside for `merge`; otherwise it is simply replaced. Takes a shared
    /// lock for the read unless a lock is already held.
    pub fn reload(&mut self) -> Result<()> {
        tracing::debug!("reloading {}", self.config.path.display());

        let acquired = self.semaphore.state() == LockState::Unlocked;
        if acquired {
            self.semaphore.acquire_shared()?;
        }

        let loaded = self.read_file();
        let released = if acquired { self.semaphore.release() } else { Ok(()) };
        let fresh = loaded?;
        released?;

        let current = std::mem::replace(&mut self.records, fresh);
        if !current.is_empty() && current.values().any(Record::is_dirty) {
            tracing::debug!("dirty records - moved aside for merging");
            match self.dirty_snapshot.as_mut() {
                Some(snapshot) => Self::extend_snapshot(snapshot, current),
                None => self.dirty_snapshot = Some(current),
            }
        }
        Ok(())
    }

    /// Fold the dirty snapshot into the freshly reloaded records
    ///
    /// Dirty records win (merged with their on-disk copy when there is one);
    /// clean snapshot records are dropped in favour of disk. Pending record
    /// deletions are applied afterwards.
    pub fn merge(&mut self) {
        match self.dirty_snapshot.take() {
            None => tracing::debug!("skipping merge, no dirty records"),
            Some(snapshot) => {
                for (key, mut local) in snapshot {
                    if !local.is_dirty() {
                        continue;
                    }
                    if let Some(fresh) = self.records.remove(&key) {
                        if !local.replaces_disk() {
                            local.merge(fresh);
                        }
                    }
                    local.clean();
                    self.records.insert(key, local);
                }
            }
        }

        for key in std::mem::take(&mut self.deleted_records) {
            if self.records.remove(&key).is_some() {
                tracing::debug!("deleting record {}", key);
            } else {
                tracing::warn!("deleted record {} is not known to us", key);
            }
        }
    }

    /// Write every record to disk in ascending key order
    ///
    /// Without `force` this is a no-op when nothing is dirty. Takes (and
    /// releases) the exclusive lock unless it is already held; fails if only
    /// a shared lock is held.
    pub fn save(&mut self, force: bool) -> Result<()> {
        let acquired = match self.semaphore.state() {
            LockState::Exclusive => false,
            LockState::Shared => {
                return Err(PipeDbError::LockState(format!(
                    "save needs a write lock but a read lock is held on {}",
                    self.semaphore.path().display()
                )));
            }
            LockState::Unlocked => {
                self.semaphore.acquire_exclusive()?;
                true
            }
        };

        let written = if force || self.is_dirty() {
            self.write_file()
        } else {
            tracing::debug!("nothing dirty, skipping save of {}", self.config.path.display());
            Ok(())
        };

        let released = if acquired { self.semaphore.release() } else { Ok(()) };
        written.and(released)
    }

    /// The mutation protocol: exclusive lock → reload → merge → save → unlock
    pub fn lock_reload_and_save(&mut self) -> Result<()> {
        tracing::debug!("lock, reload and save {}", self.config.path.display());

        let acquired = match self.semaphore.state() {
            LockState::Exclusive => false,
            LockState::Shared => {
                return Err(PipeDbError::LockState(format!(
                    "lock_reload_and_save called while holding a read lock on {}",
                    self.semaphore.path().display()
                )));
            }
            LockState::Unlocked => {
                self.semaphore.acquire_exclusive()?;
                true
            }
        };

        let outcome = self.reload_merge_save();
        let released = if acquired { self.semaphore.release() } else { Ok(()) };
        outcome.and(released)
    }

    // =========================================================================
    // Explicit Locking
    // =========================================================================

    /// Take the shared lock (error if the exclusive lock is held)
    pub fn read_lock(&mut self) -> Result<()> {
        self.semaphore.acquire_shared()
    }

    /// Take the exclusive lock (error if the shared lock is held)
    pub fn write_lock(&mut self) -> Result<()> {
        self.semaphore.acquire_exclusive()
    }

    /// Release any held lock
    pub fn unlock(&mut self) -> Result<()> {
        self.semaphore.release()
    }

    pub fn lock_state(&self) -> LockState {
        self.semaphore.state()
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    /// Get the data file path
    pub fn path(&self) -> &Path {
        &self.config.path
    }

    /// Get the lock file path
    pub fn lock_path(&self) -> &Path {
        self.semaphore.path()
    }

    /// Get the configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    // =========================================================================
    // Private Helpers
    // =========================================================================

    /// On a failed save the unsaved edits and record deletions are put back,
    /// so the caller can retry without losing them
    fn reload_merge_save(&mut self) -> Result<()> {
        self.reload()?;

        let unsaved: Vec<Record> = self
            .dirty_snapshot
            .iter()
            .flat_map(|snapshot| snapshot.values())
            .filter(|r| r.is_dirty())
            .cloned()
            .collect();
        let deleted = self.deleted_records.clone();

        self.merge();
        let saved = self.save(true);

        if saved.is_err() {
            tracing::warn!(
                "save of {} failed, keeping {} unsaved records",
                self.config.path.display(),
                unsaved.len()
            );
            for record in unsaved {
                if !deleted.iter().any(|k| k == record.key()) {
                    self.records.insert(record.key().to_string(), record);
                }
            }
            self.deleted_records = deleted;
        }
        saved
    }

    /// Add the dirty records of a second reload to an existing snapshot
    ///
    /// Clean records are left out. A record already dirty in the snapshot
    /// gets the new edits replayed on top, so neither round of edits is lost.
    fn extend_snapshot(snapshot: &mut BTreeMap<String, Record>, current: BTreeMap<String, Record>) {
        for (key, record) in current {
            if !record.is_dirty() {
                continue;
            }
            match snapshot.get_mut(&key) {
                Some(older) if older.is_dirty() => older.absorb(record),
                _ => {
                    snapshot.insert(key, record);
                }
            }
        }
    }

    fn autosave(&mut self) -> Result<()> {
        if self.config.autosave && self.batch_depth == 0 {
            self.lock_reload_and_save()
        } else {
            Ok(())
        }
    }

    /// Apply an edit to one record, log before/after, then autosave
    fn edit_record<F>(&mut self, key: &str, edit: F) -> Result<()>
    where
        F: FnOnce(&mut Record) -> Result<()>,
    {
        let record = self
            .records
            .get_mut(key)
            .ok_or_else(|| PipeDbError::NotFound(format!("record {}", key)))?;

        tracing::info!("{}: OLD: {}", self.config.path.display(), record);
        edit(&mut *record)?;
        tracing::info!("{}: NEW: {}", self.config.path.display(), record);

        self.autosave()
    }

    fn read_file(&self) -> Result<BTreeMap<String, Record>> {
        let file = File::open(&self.config.path)?;
        let parsed = codec::read_records(BufReader::new(file))?;

        if parsed.is_empty() {
            tracing::warn!("reload: read nothing from {}", self.config.path.display());
        }

        let mut records = BTreeMap::new();
        for record in parsed {
            if records.contains_key(record.key()) {
                return Err(PipeDbError::AlreadyExists(format!(
                    "record {} appears twice in {}",
                    record.key(),
                    self.config.path.display()
                )));
            }
            records.insert(record.key().to_string(), record);
        }
        Ok(records)
    }

    /// Overwrite the data file in place: seek to start, write, truncate
    fn write_file(&mut self) -> Result<()> {
        let mut buffer = Vec::new();
        let count = codec::write_records(&mut buffer, self.records.values())?;

        let mut file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(false)
            .open(&self.config.path)?;
        file.seek(SeekFrom::Start(0))?;
        file.write_all(&buffer)?;
        file.set_len(buffer.len() as u64)?;
        file.flush()?;

        if count == 0 {
            tracing::warn!("save: wrote nothing to {}", self.config.path.display());
        }
        tracing::debug!("wrote {} records to {}", count, self.config.path.display());

        // Memory now matches disk
        for record in self.records.values_mut() {
            record.clean();
        }
        self.deleted_records.clear();
        Ok(())
    }
}
