//! Recording delegate shared by the lifecycle tests

use anyhow::{anyhow, Result};
use rusqlite::Connection;

use super::delegate::{CreateOptions, DatabaseOpenDelegate};
use crate::database::core::{ErrorCode, OpenError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Configure,
    WillCreate,
    DidCreate,
    DidOpen,
    Upgrade(u32, u32),
    Downgrade(u32, u32),
    Error(ErrorCode),
}

pub struct RecordingDelegate {
    pub calls: Vec<Call>,
    pub create_options: CreateOptions,
    pub create_sql: String,
    pub upgrade_sql: Option<String>,
    pub downgrade_sql: Option<String>,
    pub fail_configure: bool,
    pub fail_create: bool,
    pub fail_upgrade: bool,
    pub fail_downgrade: bool,
    pub error_messages: Vec<String>,
}

impl RecordingDelegate {
    pub fn new() -> Self {
        Self {
            calls: Vec::new(),
            create_options: CreateOptions::empty(),
            create_sql: "CREATE TABLE items (id INTEGER PRIMARY KEY, name TEXT NOT NULL);"
                .to_string(),
            upgrade_sql: None,
            downgrade_sql: None,
            fail_configure: false,
            fail_create: false,
            fail_upgrade: false,
            fail_downgrade: false,
            error_messages: Vec::new(),
        }
    }

    pub fn count(&self, call: &Call) -> usize {
        self.calls.iter().filter(|c| *c == call).count()
    }

    pub fn migration_calls(&self) -> Vec<Call> {
        self.calls
            .iter()
            .filter(|c| matches!(c, Call::DidCreate | Call::Upgrade(..) | Call::Downgrade(..)))
            .cloned()
            .collect()
    }

    pub fn error_codes(&self) -> Vec<ErrorCode> {
        self.calls
            .iter()
            .filter_map(|c| match c {
                Call::Error(code) => Some(*code),
                _ => None,
            })
            .collect()
    }

    pub fn reset(&mut self) {
        self.calls.clear();
        self.error_messages.clear();
    }
}

impl DatabaseOpenDelegate for RecordingDelegate {
    fn configure_database(&mut self, _name: &str, _conn: &Connection) -> Result<()> {
        self.calls.push(Call::Configure);
        if self.fail_configure {
            return Err(anyhow!("configure refused"));
        }
        Ok(())
    }

    fn database_will_create(&mut self, _name: &str) -> CreateOptions {
        self.calls.push(Call::WillCreate);
        self.create_options.clone()
    }

    fn database_did_create(&mut self, _name: &str, conn: &Connection) -> Result<()> {
        self.calls.push(Call::DidCreate);
        conn.execute_batch(&self.create_sql)?;
        if self.fail_create {
            return Err(anyhow!("create refused"));
        }
        Ok(())
    }

    fn database_did_open(&mut self, _name: &str, _conn: &Connection) {
        self.calls.push(Call::DidOpen);
    }

    fn upgrade_database(
        &mut self,
        _name: &str,
        conn: &Connection,
        old_version: u32,
        new_version: u32,
    ) -> Result<()> {
        self.calls.push(Call::Upgrade(old_version, new_version));
        if let Some(sql) = &self.upgrade_sql {
            conn.execute_batch(sql)?;
        }
        if self.fail_upgrade {
            return Err(anyhow!("upgrade refused"));
        }
        Ok(())
    }

    fn downgrade_database(
        &mut self,
        _name: &str,
        conn: &Connection,
        old_version: u32,
        new_version: u32,
    ) -> Result<()> {
        self.calls.push(Call::Downgrade(old_version, new_version));
        if let Some(sql) = &self.downgrade_sql {
            conn.execute_batch(sql)?;
        }
        if self.fail_downgrade {
            return Err(anyhow!("downgrade refused"));
        }
        Ok(())
    }

    fn database_did_open_with_error(&mut self, _name: &str, error: &OpenError) {
        self.calls.push(Call::Error(error.code()));
        self.error_messages.push(error.to_string());
    }
}
