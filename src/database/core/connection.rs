//! Database connection management
//!
//! This module provides the connection wrapper handed out by the lifecycle
//! orchestrator. A `DatabaseConn` owns its SQLite connection exclusively and
//! remembers whether it was opened read-only.

use anyhow::{anyhow, Result};
use rusqlite::{Connection, OpenFlags};
use std::path::Path;
use tracing::warn;

use super::error::OpenResult;

/// How a database file is opened
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenMode {
    ReadOnly,
    /// Read-write, the file must already exist
    ReadWrite,
    /// Read-write, the file is created when missing
    ReadWriteCreate,
}

impl OpenMode {
    pub fn for_request(readonly: bool, create: bool) -> Self {
        match (readonly, create) {
            (true, _) => OpenMode::ReadOnly,
            (false, true) => OpenMode::ReadWriteCreate,
            (false, false) => OpenMode::ReadWrite,
        }
    }

    fn flags(&self) -> OpenFlags {
        let base = OpenFlags::SQLITE_OPEN_URI | OpenFlags::SQLITE_OPEN_NO_MUTEX;
        match self {
            OpenMode::ReadOnly => base | OpenFlags::SQLITE_OPEN_READ_ONLY,
            OpenMode::ReadWrite => base | OpenFlags::SQLITE_OPEN_READ_WRITE,
            OpenMode::ReadWriteCreate => {
                base | OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_CREATE
            }
        }
    }
}

/// Core database connection wrapper
///
/// `DatabaseConn` provides a thin wrapper around SQLite connections,
/// handling both file-based and in-memory databases. Besides the raw
/// connection it carries the readonly flag used to refuse migrations.
pub struct DatabaseConn {
    pub conn: Connection,
    readonly: bool,
}

impl DatabaseConn {
    /// Open a database at the specified path
    ///
    /// If the path is `None`, an in-memory database is created. In-memory
    /// databases are always writable by the engine; `mode` still decides the
    /// readonly flag reported by [`DatabaseConn::is_readonly`].
    pub fn open_with(path: Option<&Path>, mode: OpenMode) -> Result<Self> {
        let conn = match path {
            Some(p) => Connection::open_with_flags(p, mode.flags())
                .map_err(|e| anyhow!("Failed to open database at '{}': {}", p.display(), e))?,
            None => Connection::open_in_memory()
                .map_err(|e| anyhow!("Failed to create in-memory database: {}", e))?,
        };

        Ok(DatabaseConn {
            conn,
            readonly: mode == OpenMode::ReadOnly,
        })
    }

    /// Open (creating if needed) a read-write database at the specified path
    pub fn open_path(path: &Path) -> Result<Self> {
        Self::open_with(Some(path), OpenMode::ReadWriteCreate)
    }

    /// Create an in-memory database
    pub fn open_in_memory() -> Result<Self> {
        Self::open_with(None, OpenMode::ReadWriteCreate)
    }

    /// Whether the connection refuses writes
    pub fn is_readonly(&self) -> bool {
        self.readonly
    }

    /// Whether the connection can actually read the schema
    ///
    /// Opening is lazy in SQLite, so a file that is not a database (or is
    /// encrypted with a key that was not supplied) only fails here.
    pub fn is_good(&self) -> bool {
        self.check_good().is_ok()
    }

    pub(crate) fn check_good(&self) -> OpenResult<()> {
        self.conn
            .query_row("SELECT count(*) FROM sqlite_master", [], |row| {
                row.get::<_, i64>(0)
            })?;
        Ok(())
    }

    /// Stored schema version, 0 when absent or unreadable
    pub fn user_version(&self) -> u32 {
        read_user_version(&self.conn)
    }

    /// Persist the schema version, propagating failures
    pub fn set_user_version(&self, version: u32) -> OpenResult<()> {
        write_user_version(&self.conn, version)
    }

    /// Persist the schema version without failing the caller
    ///
    /// Returns `false` (and logs a warning) when the write did not happen.
    pub fn store_user_version(&self, version: u32) -> bool {
        match self.set_user_version(version) {
            Ok(()) => true,
            Err(e) => {
                warn!("Failed to store user_version {}: {}", version, e);
                false
            }
        }
    }

    /// Execute a SQL statement
    pub fn execute(&self, sql: &str) -> Result<usize> {
        self.conn
            .execute(sql, [])
            .map_err(|e| anyhow!("Failed to execute SQL: {}", e))
    }

    /// Check if a table exists in the database
    pub fn table_exists(&self, table_name: &str) -> Result<bool> {
        let count: i32 = self
            .conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name=?1",
                [table_name],
                |row| row.get(0),
            )
            .map_err(|e| anyhow!("Failed to check table existence: {}", e))?;
        Ok(count > 0)
    }

    /// Get the underlying connection
    pub fn connection(&self) -> &Connection {
        &self.conn
    }
}

pub(crate) fn read_user_version(conn: &Connection) -> u32 {
    conn.query_row("PRAGMA user_version", [], |row| row.get::<_, u32>(0))
        .unwrap_or(0)
}

pub(crate) fn write_user_version(conn: &Connection, version: u32) -> OpenResult<()> {
    conn.execute_batch(&format!("PRAGMA user_version = {}", version))?;
    Ok(())
}
