//! PipeDB CLI
//!
//! Diagnostic command-line interface for inspecting and editing a database file.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use pipedb::{Config, Database, LockingMode};
use tracing_subscriber::{fmt, EnvFilter};

/// PipeDB CLI
#[derive(Parser, Debug)]
#[command(name = "pipedb")]
#[command(about = "Inspect and edit a PipeDB database file")]
#[command(version)]
struct Args {
    /// Path to the database file
    db: PathBuf,

    /// Only log warnings and errors
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Log protocol internals
    #[arg(short, long)]
    verbose: bool,

    /// Skip the advisory lock (only for platforms without flock)
    #[arg(long)]
    no_lock: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print a record and its properties
    Show {
        /// The record key
        key: String,
    },

    /// Set a property, creating it if needed
    Setprop {
        /// The record key
        key: String,

        /// The property name
        name: String,

        /// The property value
        value: String,
    },

    /// Delete a property
    Delprop {
        /// The record key
        key: String,

        /// The property name
        name: String,
    },

    /// Delete a record
    Delete {
        /// The record key
        key: String,
    },

    /// List every key in natural order
    List,
}

fn main() -> ExitCode {
    let args = Args::parse();

    // Initialize tracing/logging (RUST_LOG wins over the flags)
    let default_level = if args.quiet {
        "warn"
    } else if args.verbose {
        "debug"
    } else {
        "info"
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_level));

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{}", e);
            eprintln!("pipedb: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(args: Args) -> pipedb::Result<()> {
    let locking = if args.no_lock {
        LockingMode::Disabled
    } else {
        LockingMode::Advisory
    };

    let config = Config::builder()
        .path(&args.db)
        .locking(locking)
        .create_if_missing(false)
        .build();
    let mut db = Database::open(config)?;

    match args.command {
        Commands::Show { key } => {
            if let Some(record) = db.get_record(&key) {
                println!("{}", record.pretty());
            }
        }
        Commands::Setprop { key, name, value } => {
            db.set_property(&key, &name, value, true)?;
        }
        Commands::Delprop { key, name } => {
            db.delete_property(&key, &name)?;
        }
        Commands::Delete { key } => {
            db.delete_record(&key)?;
        }
        Commands::List => {
            for key in db.keys_natural() {
                println!("{}", key);
            }
        }
    }

    Ok(())
}
