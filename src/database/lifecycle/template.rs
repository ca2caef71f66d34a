//! Seeding a new database from a pre-built template
//!
//! The template is first copied to a scratch file under the temporary
//! directory and integrity-checked there, so a bad template never reaches the
//! destination. The scratch file is removed on every exit path.

use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use super::delegate::DatabaseOpenDelegate;
use crate::database::core::{
    ensure_parent_dir, exclude_from_backup, is_intact, remove_database_files, DatabaseConn,
    DatabaseIdentity, OpenError, OpenMode, OpenResult, PathResolver,
};

/// Removes the scratch copy (and its sidecars) when dropped
struct ScratchFile {
    path: PathBuf,
}

impl ScratchFile {
    fn new(path: PathBuf) -> Self {
        remove_database_files(&path);
        Self { path }
    }
}

impl Drop for ScratchFile {
    fn drop(&mut self) {
        remove_database_files(&self.path);
    }
}

/// Copy the delegate's template (if any) into `destination`
///
/// Returns `true` when the destination now holds a verified copy of the
/// template. Every failure is logged and absorbed: the destination is left
/// absent and creation continues with an empty database.
pub fn provision_from_template(
    resolver: &PathResolver,
    identity: &DatabaseIdentity,
    destination: &Path,
    delegate: &mut dyn DatabaseOpenDelegate,
) -> bool {
    let options = delegate.database_will_create(identity.as_str());

    let Some(template) = options.template.as_deref() else {
        debug!("No template for '{}', creating empty database", identity);
        return false;
    };
    if !template.is_file() {
        warn!(
            "Template {} for '{}' does not exist, creating empty database",
            template.display(),
            identity
        );
        return false;
    }
    let Some(scratch_path) = resolver.template_path(identity) else {
        return false;
    };

    let scratch = ScratchFile::new(scratch_path);
    match stage(template, &scratch.path, destination, options.key()) {
        Ok(()) => {
            if !exclude_from_backup(destination) {
                debug!("{} stays eligible for backup", destination.display());
            }
            info!(
                "Provisioned '{}' from template {}",
                identity,
                template.display()
            );
            true
        }
        Err(e) => {
            warn!("Discarding template for '{}': {}", identity, e);
            remove_database_files(destination);
            false
        }
    }
}

fn stage(
    template: &Path,
    scratch: &Path,
    destination: &Path,
    key: Option<&[u8]>,
) -> OpenResult<()> {
    ensure_parent_dir(scratch).map_err(OpenError::provisioning)?;
    fs::copy(template, scratch).map_err(|e| {
        OpenError::provisioning(format!(
            "failed to copy {} to scratch: {}",
            template.display(),
            e
        ))
    })?;

    let scratch_db = DatabaseConn::open_with(Some(scratch), OpenMode::ReadWrite)
        .map_err(OpenError::provisioning)?;
    if !is_intact(scratch_db.connection()) {
        return Err(OpenError::IntegrityCheckFailed {
            reason: format!("template {} is not a usable database", template.display()),
        });
    }

    ensure_parent_dir(destination).map_err(OpenError::provisioning)?;
    match key {
        Some(key) => export_encrypted(&scratch_db, destination, key),
        None => {
            drop(scratch_db);
            fs::copy(scratch, destination).map_err(|e| {
                OpenError::provisioning(format!(
                    "failed to copy template to {}: {}",
                    destination.display(),
                    e
                ))
            })?;
            Ok(())
        }
    }
}

/// Re-key the open plaintext database into a fresh encrypted `destination`
///
/// Needs a SQLCipher build (`sqlcipher` feature); plain SQLite rejects the
/// `KEY` clause and the export function.
fn export_encrypted(source: &DatabaseConn, destination: &Path, key: &[u8]) -> OpenResult<()> {
    let dest = destination.to_string_lossy().into_owned();
    source.conn.execute(
        "ATTACH DATABASE ?1 AS encrypted KEY ?2",
        rusqlite::params![dest, key],
    )?;

    let exported = source
        .conn
        .query_row("SELECT sqlcipher_export('encrypted')", [], |_| Ok(()));
    let detached = source.conn.execute("DETACH DATABASE encrypted", []);

    exported?;
    detached?;
    Ok(())
}
