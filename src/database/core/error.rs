//! Structured errors reported through the delegate error channel

use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// Stable, machine readable code attached to every [`OpenError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    ConfigurationError,
    ConnectionInvalid,
    IntegrityCheckFailed,
    MigrationFailed,
    ProvisioningFailed,
    NotFound,
    DatabaseIsInvalid,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::ConfigurationError => "configuration_error",
            ErrorCode::ConnectionInvalid => "connection_invalid",
            ErrorCode::IntegrityCheckFailed => "integrity_check_failed",
            ErrorCode::MigrationFailed => "migration_failed",
            ErrorCode::ProvisioningFailed => "provisioning_failed",
            ErrorCode::NotFound => "not_found",
            ErrorCode::DatabaseIsInvalid => "database_is_invalid",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Why an open, create or migrate step failed
#[derive(Debug, Error)]
pub enum OpenError {
    #[error("cannot migrate a read-only database from v{from} to v{to}")]
    Configuration { from: u32, to: u32 },

    #[error("connection is not usable: {reason}")]
    ConnectionInvalid { reason: String },

    #[error("integrity check failed: {reason}")]
    IntegrityCheckFailed { reason: String },

    #[error("migration from v{from} to v{to} rolled back: {reason}")]
    MigrationFailed { from: u32, to: u32, reason: String },

    #[error("template provisioning failed: {reason}")]
    ProvisioningFailed { reason: String },

    #[error("database not found and could not be created")]
    NotFound,

    #[error("database is invalid: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

impl OpenError {
    pub fn code(&self) -> ErrorCode {
        match self {
            OpenError::Configuration { .. } => ErrorCode::ConfigurationError,
            OpenError::ConnectionInvalid { .. } => ErrorCode::ConnectionInvalid,
            OpenError::IntegrityCheckFailed { .. } => ErrorCode::IntegrityCheckFailed,
            OpenError::MigrationFailed { .. } => ErrorCode::MigrationFailed,
            OpenError::ProvisioningFailed { .. } => ErrorCode::ProvisioningFailed,
            OpenError::NotFound => ErrorCode::NotFound,
            OpenError::Sqlite(_) => ErrorCode::DatabaseIsInvalid,
        }
    }

    pub(crate) fn provisioning(reason: impl fmt::Display) -> Self {
        OpenError::ProvisioningFailed {
            reason: reason.to_string(),
        }
    }
}

/// Result type for lifecycle operations
pub type OpenResult<T> = Result<T, OpenError>;
