//! Core database infrastructure
//!
//! This module provides the foundational pieces the lifecycle builds on:
//! - `DatabaseConn`: exclusively owned SQLite connection with readonly flag
//! - `PathResolver` / `DatabaseIdentity`: logical names to on-disk paths
//! - `is_intact`: quick consistency check
//! - `OpenError` / `ErrorCode`: the structured error channel

mod connection;
mod error;
mod files;
mod integrity;
mod paths;

pub use connection::{DatabaseConn, OpenMode};
pub(crate) use connection::{read_user_version, write_user_version};
pub use error::{ErrorCode, OpenError, OpenResult};
pub use files::{ensure_parent_dir, exclude_from_backup, remove_database_files};
pub use integrity::is_intact;
pub use paths::{DatabaseIdentity, PathResolver, DATABASE_EXTENSION, IN_MEMORY_NAME};
