//! Database module
//!
//! This module provides the database lifecycle for schemakeeper, organized into:
//!
//! - **core**: Core database infrastructure (connections, paths, integrity, errors)
//! - **lifecycle**: Open / create / migrate orchestration driven by a delegate
//!
//! # Architecture
//!
//! ```text
//! database/
//! ├── core/            # Foundation
//! │   ├── connection   # SQLite DatabaseConn wrapper and user_version access
//! │   ├── paths        # Logical name -> hashed on-disk path
//! │   ├── integrity    # PRAGMA quick_check
//! │   ├── files        # Removal of database files and backup exclusion
//! │   └── error        # OpenError / ErrorCode
//! │
//! ├── lifecycle/       # Orchestration
//! │   ├── delegate     # DatabaseOpenDelegate callbacks
//! │   ├── template     # Seeding from a template file
//! │   └── migrator     # Versioned migration in one transaction
//! │
//! └── scripts          # Delegate running versioned SQL script files
//! ```
//!
//! # Usage
//!
//! ```rust,ignore
//! use schemakeeper::database::{DatabaseLifecycle, PathResolver, SqlScriptDelegate};
//!
//! let lifecycle = DatabaseLifecycle::new(PathResolver::in_dir("~/.schemakeeper"));
//! let mut delegate = SqlScriptDelegate::new("./migrations", 3);
//!
//! // Creates, upgrades or downgrades as needed; `None` means the failure was
//! // already reported to the delegate.
//! if let Some(db) = delegate.open(&lifecycle, "notes", false) {
//!     assert_eq!(db.user_version(), 3);
//! }
//! ```

pub mod core;
pub mod lifecycle;
mod scripts;

// Core types
pub(crate) use core::read_user_version;
pub use core::{
    is_intact, DatabaseConn, DatabaseIdentity, ErrorCode, OpenError, OpenMode, OpenResult,
    PathResolver, DATABASE_EXTENSION, IN_MEMORY_NAME,
};

// Lifecycle
pub use lifecycle::{
    is_valid_database, migrate, provision_from_template, CreateOptions, DatabaseLifecycle,
    DatabaseOpenDelegate, MigrationOutcome,
};

// Script-driven delegate
pub use scripts::SqlScriptDelegate;
