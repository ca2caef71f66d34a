#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]

//! Schemakeeper - versioned SQLite database lifecycle
//!
//! Schemakeeper opens named SQLite databases and keeps their schema at the
//! version the caller asks for. Names are hashed into file paths, missing
//! databases are created (optionally seeded from a template file), and schema
//! changes run inside a single exclusive transaction through a caller-supplied
//! delegate. It can be used as both a command-line application and a library.
//!
//! # Feature Flags
//!
//! | Feature | Description | Key Dependencies |
//! |---------|-------------|------------------|
//! | `cli` (default) | `schemakeeper` binary | `clap`, `tracing-subscriber` |
//! | `sqlcipher` | Encrypted databases and re-keying templates | `rusqlite/bundled-sqlcipher` |
//!
//! # Architecture
//!
//! - **[`database`]**: All database functionality
//!   - `core`: connections, path resolution, integrity checks, errors
//!   - `lifecycle`: open / create / migrate state machine and delegate trait
//!   - `SqlScriptDelegate`: delegate applying `up/N.sql` and `down/N.sql` files
//!
//! - **[`config`]**: Configuration management and database inspection
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use schemakeeper::{DatabaseLifecycle, KeeperConfig, SqlScriptDelegate};
//!
//! let config = KeeperConfig::new(&None)?;
//! let lifecycle = DatabaseLifecycle::from_config(&config);
//! let mut delegate = SqlScriptDelegate::new("./migrations", 2);
//!
//! match delegate.open(&lifecycle, "inventory", false) {
//!     Some(db) => println!("opened at v{}", db.user_version()),
//!     None => eprintln!("{:?}", delegate.last_error()),
//! }
//! ```
//!
//! ## Custom delegate
//!
//! ```rust,ignore
//! use schemakeeper::{CreateOptions, DatabaseOpenDelegate, OpenError};
//! use rusqlite::Connection;
//!
//! struct Notes;
//!
//! impl DatabaseOpenDelegate for Notes {
//!     fn configure_database(&mut self, _: &str, conn: &Connection) -> anyhow::Result<()> {
//!         conn.execute_batch("PRAGMA foreign_keys = ON;")?;
//!         Ok(())
//!     }
//!     fn database_will_create(&mut self, _: &str) -> CreateOptions {
//!         CreateOptions::with_template("/usr/share/notes/seed.sqlite")
//!     }
//!     fn database_did_create(&mut self, _: &str, conn: &Connection) -> anyhow::Result<()> {
//!         conn.execute_batch("CREATE TABLE IF NOT EXISTS notes (id INTEGER PRIMARY KEY, body TEXT);")?;
//!         Ok(())
//!     }
//!     fn database_did_open(&mut self, _: &str, _: &Connection) {}
//!     fn upgrade_database(&mut self, _: &str, _: &Connection, _: u32, _: u32) -> anyhow::Result<()> {
//!         Ok(())
//!     }
//!     fn downgrade_database(&mut self, _: &str, _: &Connection, _: u32, _: u32) -> anyhow::Result<()> {
//!         anyhow::bail!("downgrades are not supported")
//!     }
//!     fn database_did_open_with_error(&mut self, name: &str, error: &OpenError) {
//!         eprintln!("{}: {} ({})", name, error, error.code());
//!     }
//! }
//! ```

pub mod config;
pub mod database;

// =============================================================================
// Configuration
// =============================================================================

pub use config::{format_size, get_database_info, DatabaseInfo, KeeperConfig};

// =============================================================================
// Database Module - Re-export commonly used types
// =============================================================================

// Core database types
pub use database::{
    is_intact, DatabaseConn, DatabaseIdentity, ErrorCode, OpenError, OpenMode, OpenResult,
    PathResolver, DATABASE_EXTENSION, IN_MEMORY_NAME,
};

// Lifecycle
pub use database::{
    is_valid_database, CreateOptions, DatabaseLifecycle, DatabaseOpenDelegate, MigrationOutcome,
    SqlScriptDelegate,
};
