//! Version migration inside a single exclusive transaction
//!
//! Exactly one of create / upgrade / downgrade runs per migration, and the new
//! `user_version` is written in the same transaction. Any failure rolls the
//! whole thing back, so the stored version always matches the stored schema.

use rusqlite::TransactionBehavior;
use std::fmt;
use tracing::{info, warn};

use super::delegate::DatabaseOpenDelegate;
use crate::database::core::{write_user_version, DatabaseConn, DatabaseIdentity, OpenError};

/// Result of comparing and reconciling the stored and requested versions
#[derive(Debug)]
pub enum MigrationOutcome {
    Created { version: u32 },
    Upgraded { from: u32, to: u32 },
    Downgraded { from: u32, to: u32 },
    Unchanged,
    Failed(OpenError),
}

impl MigrationOutcome {
    pub fn is_success(&self) -> bool {
        !matches!(self, MigrationOutcome::Failed(_))
    }

    /// Turn a failed outcome into its error
    pub fn into_result(self) -> Result<MigrationOutcome, OpenError> {
        match self {
            MigrationOutcome::Failed(e) => Err(e),
            other => Ok(other),
        }
    }
}

impl fmt::Display for MigrationOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MigrationOutcome::Created { version } => write!(f, "created at v{}", version),
            MigrationOutcome::Upgraded { from, to } => write!(f, "upgraded v{} -> v{}", from, to),
            MigrationOutcome::Downgraded { from, to } => {
                write!(f, "downgraded v{} -> v{}", from, to)
            }
            MigrationOutcome::Unchanged => write!(f, "unchanged"),
            MigrationOutcome::Failed(e) => write!(f, "failed: {}", e),
        }
    }
}

/// Reconcile `old_version` with `new_version`
///
/// Refuses to touch a read-only connection. Otherwise opens one exclusive
/// transaction, runs the matching delegate callback, stores `new_version`
/// and commits. On any failure the transaction is rolled back and the
/// failure is returned as [`MigrationOutcome::Failed`].
pub fn migrate(
    db: &mut DatabaseConn,
    identity: &DatabaseIdentity,
    old_version: u32,
    new_version: u32,
    delegate: &mut dyn DatabaseOpenDelegate,
) -> MigrationOutcome {
    if old_version == new_version {
        return MigrationOutcome::Unchanged;
    }

    if db.is_readonly() {
        warn!(
            "Refusing to migrate read-only database '{}' from v{} to v{}",
            identity, old_version, new_version
        );
        return MigrationOutcome::Failed(OpenError::Configuration {
            from: old_version,
            to: new_version,
        });
    }

    let failed = |reason: String| {
        MigrationOutcome::Failed(OpenError::MigrationFailed {
            from: old_version,
            to: new_version,
            reason,
        })
    };

    let tx = match db
        .conn
        .transaction_with_behavior(TransactionBehavior::Exclusive)
    {
        Ok(tx) => tx,
        Err(e) => return failed(format!("failed to begin transaction: {}", e)),
    };

    let name = identity.as_str();
    let (outcome, callback) = if old_version == 0 {
        info!("Creating schema for '{}' at v{}", identity, new_version);
        (
            MigrationOutcome::Created {
                version: new_version,
            },
            delegate.database_did_create(name, &tx),
        )
    } else if old_version > new_version {
        info!(
            "Downgrading '{}' from v{} to v{}",
            identity, old_version, new_version
        );
        (
            MigrationOutcome::Downgraded {
                from: old_version,
                to: new_version,
            },
            delegate.downgrade_database(name, &tx, old_version, new_version),
        )
    } else {
        info!(
            "Upgrading '{}' from v{} to v{}",
            identity, old_version, new_version
        );
        (
            MigrationOutcome::Upgraded {
                from: old_version,
                to: new_version,
            },
            delegate.upgrade_database(name, &tx, old_version, new_version),
        )
    };

    let applied = callback
        .map_err(|e| format!("{:#}", e))
        .and_then(|()| write_user_version(&tx, new_version).map_err(|e| e.to_string()));

    match applied {
        Ok(()) => match tx.commit() {
            Ok(()) => outcome,
            Err(e) => failed(format!("failed to commit: {}", e)),
        },
        Err(reason) => {
            if let Err(e) = tx.rollback() {
                warn!("Rollback of '{}' reported: {}", identity, e);
            }
            warn!(
                "Migration of '{}' from v{} to v{} rolled back: {}",
                identity, old_version, new_version, reason
            );
            failed(reason)
        }
    }
}
