//! Semaphore lock file
//!
//! Holds the lock file handle and the current lock mode.

use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};

use fs2::FileExt;

use crate::config::LockingMode;
use crate::error::{PipeDbError, Result};

use super::LockState;

/// Advisory lock on a token file
///
/// Acquisition blocks until the OS grants the lock. There is no timeout.
pub struct Semaphore {
    /// Lock file path (contents irrelevant)
    path: PathBuf,

    /// Whether the OS lock is taken
    mode: LockingMode,

    /// Open handle while a lock is held
    file: Option<File>,

    /// Mode held by this instance
    state: LockState,
}

impl Semaphore {
    /// Create an unlocked semaphore; the file is opened on first acquire
    pub fn new(path: impl Into<PathBuf>, mode: LockingMode) -> Self {
        Self {
            path: path.into(),
            mode,
            file: None,
            state: LockState::Unlocked,
        }
    }

    /// Acquire a shared lock
    ///
    /// No-op if already shared; error if exclusive is held.
    pub fn acquire_shared(&mut self) -> Result<()> {
        match self.state {
            LockState::Shared => {
                tracing::debug!("read lock already held on {}", self.path.display());
                Ok(())
            }
            LockState::Exclusive => Err(PipeDbError::LockState(format!(
                "read lock requested while holding a write lock on {}",
                self.path.display()
            ))),
            LockState::Unlocked => {
                self.lock(LockState::Shared)?;
                Ok(())
            }
        }
    }

    /// Acquire an exclusive lock
    ///
    /// No-op if already exclusive; error if shared is held.
    pub fn acquire_exclusive(&mut self) -> Result<()> {
        match self.state {
            LockState::Exclusive => {
                tracing::debug!("write lock already held on {}", self.path.display());
                Ok(())
            }
            LockState::Shared => Err(PipeDbError::LockState(format!(
                "write lock requested while holding a read lock on {}",
                self.path.display()
            ))),
            LockState::Unlocked => {
                self.lock(LockState::Exclusive)?;
                Ok(())
            }
        }
    }

    /// Release whatever lock is held (no-op when unlocked)
    pub fn release(&mut self) -> Result<()> {
        if let Some(file) = self.file.take() {
            FileExt::unlock(&file)?;
        }
        if self.state != LockState::Unlocked {
            tracing::debug!("released {:?} lock on {}", self.state, self.path.display());
        }
        self.state = LockState::Unlocked;
        Ok(())
    }

    pub fn state(&self) -> LockState {
        self.state
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn mode(&self) -> LockingMode {
        self.mode
    }

    // =========================================================================
    // Private Helpers
    // =========================================================================

    fn lock(&mut self, target: LockState) -> Result<()> {
        if self.mode == LockingMode::Advisory {
            let file = OpenOptions::new()
                .create(true)
                .write(true)
                .truncate(false)
                .open(&self.path)?;

            match target {
                LockState::Shared => FileExt::lock_shared(&file)?,
                LockState::Exclusive => FileExt::lock_exclusive(&file)?,
                LockState::Unlocked => {}
            }
            self.file = Some(file);
        }

        tracing::debug!("acquired {:?} lock on {}", target, self.path.display());
        self.state = target;
        Ok(())
    }
}

impl Drop for Semaphore {
    fn drop(&mut self) {
        if let Err(e) = self.release() {
            tracing::warn!("failed to release lock on {}: {}", self.path.display(), e);
        }
    }
}
