//! # PipeDB
//!
//! An embedded, file-backed record store shared by independent processes:
//! - One record per line, pipe-delimited (`key=type|name|value|...`)
//! - Advisory locks on a sibling lock file, no daemon
//! - Optimistic lock → reload → merge → save cycle on every mutation
//! - Local dirty edits survive concurrent writes by other processes
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                 Database (one per process)                   │
//! │        get / get_all_by / set / add / delete / batch         │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//!          ┌────────────┼─────────────────────┐
//!          │            │                     │
//!          ▼            ▼                     ▼
//!   ┌─────────────┐ ┌─────────────┐   ┌──────────────┐
//!   │  Semaphore  │ │    Model    │   │    Codec     │
//!   │ (.db.lock)  │ │Record/Prop  │◄──│ line format  │
//!   └─────────────┘ └─────────────┘   └──────┬───────┘
//!                                            │
//!                                            ▼
//!                                    ┌──────────────┐
//!                                    │  data file   │
//!                                    └──────────────┘
//! ```
//!
//! ## Example
//!
//! ```no_run
//! use pipedb::{Database, Record};
//!
//! # fn main() -> pipedb::Result<()> {
//! let mut db = Database::open_path("/var/lib/app/accounts")?;
//! db.add_record(Record::new("alice", "user").with_property("quota", "10"), false)?;
//! db.set_property("alice", "quota", "20", false)?;
//! assert_eq!(db.get_record("alice").and_then(|r| r.get_property_value("quota")), Some("20"));
//! # Ok(())
//! # }
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod model;
pub mod codec;
pub mod lock;
pub mod natsort;
pub mod database;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{PipeDbError, Result};
pub use config::{Config, LockingMode};
pub use database::Database;
pub use lock::LockState;
pub use model::{Property, Record};

// =============================================================================
// Version Info
// =============================================================================

/// Current version of PipeDB
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
