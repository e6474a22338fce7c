//! Lock Module
//!
//! Cross-process coordination through an advisory lock on a sibling file.
//!
//! ## Responsibilities
//! - Take shared locks for pure reads, exclusive locks for read-merge-write
//! - Track which mode this instance holds
//! - Reject mode changes instead of waiting on ourselves
//!
//! ## State Machine
//! ```text
//!            read_lock()             write_lock()
//!   Shared ◄──────────── Unlocked ────────────► Exclusive
//!      │                   ▲   ▲                   │
//!      └──── unlock() ─────┘   └──── unlock() ─────┘
//!
//!   Shared → write_lock()   : LockState error
//!   Exclusive → read_lock() : LockState error
//! ```
//!
//! The data file itself is never locked. Locks are advisory: a process that
//! skips them can still corrupt the file.

mod semaphore;

pub use semaphore::Semaphore;

/// Lock mode currently held by one database instance
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockState {
    /// No lock held
    Unlocked,

    /// Shared (read) lock held
    Shared,

    /// Exclusive (write) lock held
    Exclusive,
}
