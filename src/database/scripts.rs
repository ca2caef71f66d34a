//! Delegate backed by a directory of versioned SQL scripts
//!
//! # Layout
//!
//! ```text
//! scripts/
//! ├── up/
//! │   ├── 1.sql   # v0 -> v1
//! │   ├── 2.sql   # v1 -> v2
//! │   └── 3.sql   # v2 -> v3
//! └── down/
//!     ├── 3.sql   # v3 -> v2
//!     └── 2.sql   # v2 -> v1
//! ```
//!
//! Databases are opened through [`SqlScriptDelegate::open`], which always
//! requests the delegate's target version, so the version written after
//! creation is the version the scripts built. Creating a database at version
//! N runs `up/1.sql ..= up/N.sql`. Upgrading
//! from `old` to `new` runs `up/{old+1}.sql ..= up/{new}.sql`, downgrading runs
//! `down/{old}.sql` down to `down/{new+1}.sql`. A missing script fails the
//! migration, which rolls the whole transaction back.

use anyhow::{anyhow, bail, Result};
use rusqlite::Connection;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::database::core::{DatabaseConn, ErrorCode, OpenError};
use crate::database::lifecycle::{CreateOptions, DatabaseLifecycle, DatabaseOpenDelegate};

pub struct SqlScriptDelegate {
    scripts_dir: PathBuf,
    target_version: u32,
    template: Option<PathBuf>,
    encryption_key: Option<String>,
    last_error: Option<(ErrorCode, String)>,
    applied: Vec<PathBuf>,
    /// Version requested by the open in progress, set only by `open`
    opening_at: Option<u32>,
}

impl SqlScriptDelegate {
    /// Delegate creating databases at `target_version` from `scripts_dir`
    pub fn new(scripts_dir: impl Into<PathBuf>, target_version: u32) -> Self {
        Self {
            scripts_dir: scripts_dir.into(),
            target_version,
            template: None,
            encryption_key: None,
            last_error: None,
            applied: Vec::new(),
            opening_at: None,
        }
    }

    /// Open `name` at this delegate's target version
    pub fn open(
        &mut self,
        lifecycle: &DatabaseLifecycle,
        name: &str,
        readonly: bool,
    ) -> Option<DatabaseConn> {
        let target = self.target_version;
        self.opening_at = Some(target);
        let db = lifecycle.open(Some(name), Some(target), readonly, &mut *self);
        self.opening_at = None;
        db
    }

    /// Seed new databases from this template file
    pub fn with_template(mut self, template: impl Into<PathBuf>) -> Self {
        self.template = Some(template.into());
        self
    }

    /// Key used to open and to re-key databases (SQLCipher builds only)
    pub fn with_encryption_key(mut self, key: impl Into<String>) -> Self {
        let key = key.into();
        self.encryption_key = if key.is_empty() { None } else { Some(key) };
        self
    }

    /// Code and message of the last reported failure
    pub fn last_error(&self) -> Option<&(ErrorCode, String)> {
        self.last_error.as_ref()
    }

    /// Scripts executed so far, in order
    pub fn applied_scripts(&self) -> &[PathBuf] {
        &self.applied
    }

    fn script_path(&self, direction: &str, version: u32) -> PathBuf {
        self.scripts_dir
            .join(direction)
            .join(format!("{}.sql", version))
    }

    fn run_script(&mut self, conn: &Connection, path: &Path) -> Result<()> {
        let sql = fs::read_to_string(path)
            .map_err(|e| anyhow!("Failed to read script {}: {}", path.display(), e))?;
        conn.execute_batch(&sql)
            .map_err(|e| anyhow!("Script {} failed: {}", path.display(), e))?;
        debug!("applied {}", path.display());
        self.applied.push(path.to_path_buf());
        Ok(())
    }

    fn run_up(&mut self, conn: &Connection, from: u32, to: u32) -> Result<()> {
        for version in (from + 1)..=to {
            let path = self.script_path("up", version);
            self.run_script(conn, &path)?;
        }
        Ok(())
    }

    fn run_down(&mut self, conn: &Connection, from: u32, to: u32) -> Result<()> {
        for version in ((to + 1)..=from).rev() {
            let path = self.script_path("down", version);
            self.run_script(conn, &path)?;
        }
        Ok(())
    }
}

impl DatabaseOpenDelegate for SqlScriptDelegate {
    fn configure_database(&mut self, _name: &str, conn: &Connection) -> Result<()> {
        if let Some(key) = &self.encryption_key {
            conn.execute_batch(&format!("PRAGMA key = '{}';", key.replace('\'', "''")))
                .map_err(|e| anyhow!("Failed to apply encryption key: {}", e))?;
        }
        conn.execute_batch("PRAGMA foreign_keys = ON;")
            .map_err(|e| anyhow!("Failed to enable foreign keys: {}", e))?;
        Ok(())
    }

    fn database_will_create(&mut self, name: &str) -> CreateOptions {
        debug!("'{}' will be created at v{}", name, self.target_version);
        CreateOptions {
            template: self.template.clone(),
            encryption_key: self.encryption_key.as_ref().map(|k| k.as_bytes().to_vec()),
        }
    }

    fn database_did_create(&mut self, name: &str, conn: &Connection) -> Result<()> {
        let target = match self.opening_at {
            Some(version) if version == self.target_version => version,
            _ => bail!(
                "'{}' can only be created at v{} through SqlScriptDelegate::open",
                name,
                self.target_version
            ),
        };
        info!("Running create scripts for '{}' up to v{}", name, target);
        self.run_up(conn, 0, target)
    }

    fn database_did_open(&mut self, name: &str, _conn: &Connection) {
        debug!("'{}' is open", name);
        self.last_error = None;
    }

    fn upgrade_database(
        &mut self,
        _name: &str,
        conn: &Connection,
        old_version: u32,
        new_version: u32,
    ) -> Result<()> {
        self.run_up(conn, old_version, new_version)
    }

    fn downgrade_database(
        &mut self,
        _name: &str,
        conn: &Connection,
        old_version: u32,
        new_version: u32,
    ) -> Result<()> {
        self.run_down(conn, old_version, new_version)
    }

    fn database_did_open_with_error(&mut self, name: &str, error: &OpenError) {
        warn!("'{}' failed to open [{}]: {}", name, error.code(), error);
        self.last_error = Some((error.code(), error.to_string()));
    }
}
