//! Configuration for PipeDB
//!
//! Centralized configuration with sensible defaults.

use std::path::{Path, PathBuf};

/// Configuration for one database file
#[derive(Debug, Clone)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Storage Configuration
    // -------------------------------------------------------------------------
    /// The data file, one record per line
    pub path: PathBuf,

    /// Create an empty data file on open when it does not exist
    pub create_if_missing: bool,

    // -------------------------------------------------------------------------
    // Locking Configuration
    // -------------------------------------------------------------------------
    /// Advisory lock token. `None` means the sibling `.<name>.lock`
    pub lock_path: Option<PathBuf>,

    /// Whether the OS advisory lock is taken at all
    pub locking: LockingMode,

    // -------------------------------------------------------------------------
    // Write Configuration
    // -------------------------------------------------------------------------
    /// Run the lock-reload-merge-save cycle after every mutating call
    pub autosave: bool,
}

/// Advisory locking capability
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockingMode {
    /// flock-style shared/exclusive locks on the lock file
    Advisory,

    /// No OS lock. Only for platforms without advisory locks, and only
    /// when every other participant is known not to write concurrently.
    Disabled,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            path: PathBuf::from("./pipedb.db"),
            create_if_missing: true,
            lock_path: None,
            locking: LockingMode::Advisory,
            autosave: true,
        }
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Resolve the lock file path: the override, or `.<name>.lock` next to the data file
    pub fn resolved_lock_path(&self) -> PathBuf {
        if let Some(path) = &self.lock_path {
            return path.clone();
        }
        Self::sibling_lock_path(&self.path)
    }

    fn sibling_lock_path(path: &Path) -> PathBuf {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "pipedb".to_string());
        let lock_name = format!(".{}.lock", name);
        match path.parent() {
            Some(dir) => dir.join(lock_name),
            None => PathBuf::from(lock_name),
        }
    }
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Set the data file path
    pub fn path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.path = path.into();
        self
    }

    /// Override the lock file path
    pub fn lock_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.lock_path = Some(path.into());
        self
    }

    /// Set the locking mode
    pub fn locking(mut self, mode: LockingMode) -> Self {
        self.config.locking = mode;
        self
    }

    /// Create the data file if it does not exist
    pub fn create_if_missing(mut self, create: bool) -> Self {
        self.config.create_if_missing = create;
        self
    }

    /// Save after every mutating call (true) or only on explicit request (false)
    pub fn autosave(mut self, autosave: bool) -> Self {
        self.config.autosave = autosave;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}
