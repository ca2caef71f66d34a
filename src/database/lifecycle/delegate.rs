//! Capability set the lifecycle calls back into

use anyhow::Result;
use rusqlite::Connection;
use std::path::PathBuf;

use crate::database::core::OpenError;

/// What to seed a new database with
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CreateOptions {
    /// Pre-built database file to copy in instead of starting empty
    pub template: Option<PathBuf>,
    /// When non-empty, the template is re-keyed into an encrypted file
    pub encryption_key: Option<Vec<u8>>,
}

impl CreateOptions {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn with_template(template: impl Into<PathBuf>) -> Self {
        Self {
            template: Some(template.into()),
            encryption_key: None,
        }
    }

    /// The key, if one was supplied and is non-empty
    pub fn key(&self) -> Option<&[u8]> {
        self.encryption_key
            .as_deref()
            .filter(|key| !key.is_empty())
    }
}

/// Callbacks driving configuration, creation and migration of a database
///
/// Every method is called synchronously on the thread running
/// [`DatabaseLifecycle::open`](super::DatabaseLifecycle::open). Fallible
/// callbacks signal failure by returning `Err`; the error text ends up in the
/// [`OpenError`] passed to [`database_did_open_with_error`].
///
/// [`database_did_open_with_error`]: DatabaseOpenDelegate::database_did_open_with_error
pub trait DatabaseOpenDelegate {
    /// Called once per open attempt, before any version check
    fn configure_database(&mut self, name: &str, conn: &Connection) -> Result<()>;

    /// Called once before a missing database is created
    fn database_will_create(&mut self, name: &str) -> CreateOptions;

    /// Called inside the migration transaction when the stored version is 0
    fn database_did_create(&mut self, name: &str, conn: &Connection) -> Result<()>;

    /// Called once per successful open, after any migration committed
    fn database_did_open(&mut self, name: &str, conn: &Connection);

    /// Called inside the migration transaction when `old < new`
    fn upgrade_database(
        &mut self,
        name: &str,
        conn: &Connection,
        old_version: u32,
        new_version: u32,
    ) -> Result<()>;

    /// Called inside the migration transaction when `old > new`
    fn downgrade_database(
        &mut self,
        name: &str,
        conn: &Connection,
        old_version: u32,
        new_version: u32,
    ) -> Result<()>;

    /// Called exactly once per failed open
    fn database_did_open_with_error(&mut self, name: &str, error: &OpenError);
}
