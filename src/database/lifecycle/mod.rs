//! Database lifecycle: open, create, migrate
//!
//! [`DatabaseLifecycle::open`] runs a small state machine:
//!
//! ```text
//! TryOpen ──(no file / unusable handle)──> Create ──> TryOpen ──> done
//!    │                                                   │
//!    └── configure → validate → migrate → did_open       └── failure: delete file
//! ```
//!
//! `Create` runs at most once per call and never for read-only requests: a
//! missing database opened read-only ends in `NotFound` without touching the
//! filesystem. Every terminal failure is reported exactly once through
//! [`DatabaseOpenDelegate::database_did_open_with_error`] and `open` returns
//! `None`; nothing is raised past this module.

mod delegate;
mod migrator;
mod template;
#[cfg(test)]
pub(crate) mod test_support;

pub use delegate::{CreateOptions, DatabaseOpenDelegate};
pub use migrator::{migrate, MigrationOutcome};
pub use template::provision_from_template;

use tracing::{debug, info, warn};

use crate::config::KeeperConfig;
use crate::database::core::{
    ensure_parent_dir, is_intact, remove_database_files, DatabaseConn, DatabaseIdentity,
    OpenError, OpenMode, OpenResult, PathResolver,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OpenState {
    TryOpen { after_create: bool },
    Create,
}

/// Entry point for opening versioned databases
#[derive(Debug, Clone)]
pub struct DatabaseLifecycle {
    resolver: PathResolver,
}

impl DatabaseLifecycle {
    pub fn new(resolver: PathResolver) -> Self {
        Self { resolver }
    }

    /// Lifecycle using the directories from the configuration
    pub fn from_config(config: &KeeperConfig) -> Self {
        Self::new(config.resolver())
    }

    pub fn resolver(&self) -> &PathResolver {
        &self.resolver
    }

    /// Open `name`, creating and migrating it to `version` as needed
    ///
    /// With `version == None` the stored version is left alone. Returns the
    /// connection on success; on failure the delegate is told why and `None`
    /// is returned.
    pub fn open(
        &self,
        name: Option<&str>,
        version: Option<u32>,
        readonly: bool,
        delegate: &mut dyn DatabaseOpenDelegate,
    ) -> Option<DatabaseConn> {
        let identity = DatabaseIdentity::new(name);
        let mut state = OpenState::TryOpen {
            after_create: false,
        };

        loop {
            match state {
                OpenState::TryOpen { after_create } => {
                    match self.try_open(&identity, version, readonly, after_create, delegate) {
                        Ok(Some(db)) => {
                            delegate.database_did_open(identity.as_str(), db.connection());
                            info!("Opened database '{}' at v{}", identity, db.user_version());
                            return Some(db);
                        }
                        Ok(None) if !after_create && readonly => {
                            warn!("Database '{}' is missing, not creating it read-only", identity);
                            delegate.database_did_open_with_error(
                                identity.as_str(),
                                &OpenError::NotFound,
                            );
                            return None;
                        }
                        Ok(None) if !after_create => state = OpenState::Create,
                        Ok(None) => {
                            return self.abandon_created(&identity, OpenError::NotFound, delegate)
                        }
                        Err(e) if after_create => {
                            return self.abandon_created(&identity, e, delegate)
                        }
                        Err(e) => {
                            warn!("Failed to open database '{}': {}", identity, e);
                            delegate.database_did_open_with_error(identity.as_str(), &e);
                            return None;
                        }
                    }
                }
                OpenState::Create => {
                    self.create(&identity, delegate);
                    state = OpenState::TryOpen { after_create: true };
                }
            }
        }
    }

    /// One open attempt
    ///
    /// `Ok(None)` means there is no usable backing store yet.
    fn try_open(
        &self,
        identity: &DatabaseIdentity,
        version: Option<u32>,
        readonly: bool,
        after_create: bool,
        delegate: &mut dyn DatabaseOpenDelegate,
    ) -> OpenResult<Option<DatabaseConn>> {
        let path = self.resolver.database_path(identity);
        if let Some(p) = &path {
            if !after_create && !p.exists() {
                debug!("No database file for '{}' at {}", identity, p.display());
                return Ok(None);
            }
        }

        let mode = OpenMode::for_request(readonly, after_create);
        let mut db = match DatabaseConn::open_with(path.as_deref(), mode) {
            Ok(db) => db,
            Err(e) => {
                warn!("Could not instantiate '{}': {}", identity, e);
                return Ok(None);
            }
        };

        delegate
            .configure_database(identity.as_str(), db.connection())
            .map_err(|e| OpenError::ConnectionInvalid {
                reason: format!("configuration failed: {:#}", e),
            })?;

        db.check_good().map_err(|e| OpenError::ConnectionInvalid {
            reason: e.to_string(),
        })?;

        if let Some(target) = version {
            let stored = db.user_version();
            if stored != target {
                let outcome = migrate(&mut db, identity, stored, target, delegate).into_result()?;
                info!("Database '{}' {}", identity, outcome);
            }
        }

        Ok(Some(db))
    }

    /// Prepare a fresh destination, seeding it from a template when offered
    fn create(&self, identity: &DatabaseIdentity, delegate: &mut dyn DatabaseOpenDelegate) {
        let Some(destination) = self.resolver.database_path(identity) else {
            debug!("'{}' is in-memory, nothing to create on disk", identity);
            return;
        };

        info!("Creating database '{}' at {}", identity, destination.display());
        remove_database_files(&destination);
        if let Err(e) = ensure_parent_dir(&destination) {
            warn!("{}", e);
        }
        provision_from_template(&self.resolver, identity, &destination, delegate);
    }

    /// Report a failure after `Create` and remove whatever was built
    fn abandon_created(
        &self,
        identity: &DatabaseIdentity,
        error: OpenError,
        delegate: &mut dyn DatabaseOpenDelegate,
    ) -> Option<DatabaseConn> {
        if let Some(destination) = self.resolver.database_path(identity) {
            warn!(
                "Removing {} after failed creation of '{}'",
                destination.display(),
                identity
            );
            remove_database_files(&destination);
        }
        warn!("Failed to create database '{}': {}", identity, error);
        delegate.database_did_open_with_error(identity.as_str(), &error);
        None
    }
}

/// Read-only check: does `name` exist and pass the integrity check?
///
/// Never creates, migrates or writes, and never reports through the delegate
/// error channel. The delegate only gets to configure the connection (for
/// example to supply a key).
pub fn is_valid_database(
    resolver: &PathResolver,
    name: Option<&str>,
    delegate: &mut dyn DatabaseOpenDelegate,
) -> bool {
    let identity = DatabaseIdentity::new(name);
    let Some(path) = resolver.database_path(&identity) else {
        return false;
    };
    if !path.is_file() {
        return false;
    }

    let db = match DatabaseConn::open_with(Some(&path), OpenMode::ReadOnly) {
        Ok(db) => db,
        Err(e) => {
            debug!("{}", e);
            return false;
        }
    };
    if let Err(e) = delegate.configure_database(identity.as_str(), db.connection()) {
        debug!("configure failed while probing '{}': {:#}", identity, e);
        return false;
    }
    is_intact(db.connection())
}

#[cfg(test)]
mod tests {
    use super::*;
    use super::test_support::{Call, RecordingDelegate};
    use crate::database::core::{read_user_version, ErrorCode};
    use std::fs;
    use std::path::PathBuf;

    struct Fixture {
        dir: tempfile::TempDir,
        lifecycle: DatabaseLifecycle,
    }

    impl Fixture {
        fn new() -> Self {
            let dir = tempfile::tempdir().unwrap();
            let lifecycle = DatabaseLifecycle::new(PathResolver::in_dir(dir.path()));
            Self { dir, lifecycle }
        }

        fn path(&self, name: &str) -> PathBuf {
            self.lifecycle
                .resolver()
                .resolve_database_path(Some(name))
                .unwrap()
        }

        fn scratch(&self, name: &str) -> PathBuf {
            self.lifecycle
                .resolver()
                .resolve_template_path(Some(name))
                .unwrap()
        }

        fn stored_version(&self, name: &str) -> u32 {
            let db = DatabaseConn::open_with(Some(&self.path(name)), OpenMode::ReadOnly).unwrap();
            read_user_version(db.connection())
        }

        fn open(
            &self,
            name: &str,
            version: Option<u32>,
            delegate: &mut RecordingDelegate,
        ) -> Option<DatabaseConn> {
            self.lifecycle.open(Some(name), version, false, delegate)
        }
    }

    #[test]
    fn test_create_then_reopen_same_version() {
        let fx = Fixture::new();
        let mut delegate = RecordingDelegate::new();

        let db = fx.open("notes", Some(1), &mut delegate).unwrap();
        assert_eq!(db.user_version(), 1);
        assert!(db.table_exists("items").unwrap());
        drop(db);
        assert_eq!(
            delegate.calls,
            vec![Call::WillCreate, Call::Configure, Call::DidCreate, Call::DidOpen]
        );

        delegate.reset();
        let db = fx.open("notes", Some(1), &mut delegate).unwrap();
        assert_eq!(db.user_version(), 1);
        assert_eq!(delegate.calls, vec![Call::Configure, Call::DidOpen]);
    }

    #[test]
    fn test_create_happens_once() {
        let fx = Fixture::new();
        let mut delegate = RecordingDelegate::new();

        assert!(fx.open("once", Some(3), &mut delegate).is_some());
        assert!(fx.open("once", Some(3), &mut delegate).is_some());

        assert_eq!(delegate.count(&Call::DidCreate), 1);
        assert_eq!(delegate.count(&Call::WillCreate), 1);
        assert_eq!(delegate.count(&Call::DidOpen), 2);
        assert_eq!(fx.stored_version("once"), 3);
    }

    #[test]
    fn test_upgrade_then_downgrade() {
        let fx = Fixture::new();
        let mut delegate = RecordingDelegate::new();
        drop(fx.open("shop", Some(3), &mut delegate).unwrap());

        delegate.reset();
        drop(fx.open("shop", Some(5), &mut delegate).unwrap());
        assert_eq!(delegate.migration_calls(), vec![Call::Upgrade(3, 5)]);
        assert_eq!(fx.stored_version("shop"), 5);

        delegate.reset();
        drop(fx.open("shop", Some(2), &mut delegate).unwrap());
        assert_eq!(delegate.migration_calls(), vec![Call::Downgrade(5, 2)]);
        assert_eq!(fx.stored_version("shop"), 2);
    }

    #[test]
    fn test_failed_upgrade_keeps_old_version() {
        let fx = Fixture::new();
        let mut delegate = RecordingDelegate::new();
        drop(fx.open("ledger", Some(1), &mut delegate).unwrap());

        delegate.reset();
        delegate.upgrade_sql = Some("ALTER TABLE items ADD COLUMN price REAL;".to_string());
        delegate.fail_upgrade = true;
        assert!(fx.open("ledger", Some(2), &mut delegate).is_none());

        assert_eq!(delegate.error_codes(), vec![ErrorCode::MigrationFailed]);
        assert_eq!(delegate.count(&Call::DidOpen), 0);
        assert_eq!(fx.stored_version("ledger"), 1);

        // the file survives and the partial column is gone
        let db = DatabaseConn::open_with(Some(&fx.path("ledger")), OpenMode::ReadOnly).unwrap();
        let price = db.conn.prepare("SELECT price FROM items");
        assert!(price.is_err());
    }

    #[test]
    fn test_failed_downgrade_keeps_newer_version() {
        let fx = Fixture::new();
        let mut delegate = RecordingDelegate::new();
        drop(fx.open("ledger", Some(5), &mut delegate).unwrap());

        delegate.reset();
        delegate.downgrade_sql = Some("CREATE TABLE archived (id INTEGER);".to_string());
        delegate.fail_downgrade = true;
        assert!(fx.open("ledger", Some(2), &mut delegate).is_none());

        assert_eq!(delegate.migration_calls(), vec![Call::Downgrade(5, 2)]);
        assert_eq!(delegate.error_codes(), vec![ErrorCode::MigrationFailed]);
        assert_eq!(delegate.count(&Call::DidOpen), 0);
        assert_eq!(fx.stored_version("ledger"), 5);

        let db = DatabaseConn::open_with(Some(&fx.path("ledger")), OpenMode::ReadOnly).unwrap();
        assert!(db.table_exists("items").unwrap());
        assert!(!db.table_exists("archived").unwrap());
    }

    #[test]
    fn test_readonly_never_migrates() {
        let fx = Fixture::new();
        let mut delegate = RecordingDelegate::new();
        drop(fx.open("archive", Some(1), &mut delegate).unwrap());

        delegate.reset();
        let db = fx
            .lifecycle
            .open(Some("archive"), Some(2), true, &mut delegate);
        assert!(db.is_none());
        assert!(delegate.migration_calls().is_empty());
        assert_eq!(delegate.error_codes(), vec![ErrorCode::ConfigurationError]);
        assert!(fx.path("archive").exists());
        assert_eq!(fx.stored_version("archive"), 1);
    }

    #[test]
    fn test_readonly_same_version_opens() {
        let fx = Fixture::new();
        let mut delegate = RecordingDelegate::new();
        drop(fx.open("archive", Some(1), &mut delegate).unwrap());

        let db = fx
            .lifecycle
            .open(Some("archive"), Some(1), true, &mut delegate)
            .unwrap();
        assert!(db.is_readonly());
        assert!(db.execute("INSERT INTO items (name) VALUES ('x')").is_err());
    }

    #[test]
    fn test_readonly_missing_database_is_not_created() {
        let fx = Fixture::new();
        let mut delegate = RecordingDelegate::new();

        assert!(fx
            .lifecycle
            .open(Some("ghost"), Some(1), true, &mut delegate)
            .is_none());
        assert_eq!(delegate.error_codes(), vec![ErrorCode::NotFound]);
        assert_eq!(delegate.count(&Call::WillCreate), 0);
        assert!(!fx.path("ghost").exists());
        assert!(!fx.lifecycle.resolver().databases_dir().exists());
    }

    #[test]
    fn test_readonly_missing_database_ignores_template() {
        let fx = Fixture::new();
        let template = fx.dir.path().join("template.sqlite");
        {
            let seed = DatabaseConn::open_path(&template).unwrap();
            seed.execute("CREATE TABLE items (id INTEGER PRIMARY KEY, name TEXT NOT NULL)")
                .unwrap();
            seed.set_user_version(1).unwrap();
        }

        let mut delegate = RecordingDelegate::new();
        delegate.create_options = CreateOptions::with_template(&template);

        assert!(fx
            .lifecycle
            .open(Some("seeded"), None, true, &mut delegate)
            .is_none());
        assert_eq!(delegate.calls, vec![Call::Error(ErrorCode::NotFound)]);
        assert!(!fx.path("seeded").exists());
        assert!(!fx.scratch("seeded").exists());
        assert!(!fx.lifecycle.resolver().databases_dir().exists());
        assert!(!fx.lifecycle.resolver().temporary_dir().exists());
    }

    #[test]
    fn test_bad_template_yields_empty_database() {
        let fx = Fixture::new();
        let template = fx.dir.path().join("broken-template.sqlite");
        fs::write(&template, b"corrupted seed data".repeat(400)).unwrap();

        let mut delegate = RecordingDelegate::new();
        delegate.create_options = CreateOptions::with_template(&template);

        let db = fx.open("seeded", None, &mut delegate).unwrap();
        assert_eq!(db.user_version(), 0);
        assert!(is_intact(db.connection()));
        assert!(!db.table_exists("items").unwrap());
        drop(db);

        assert!(!fx.scratch("seeded").exists());
        assert!(delegate.error_codes().is_empty());
    }

    #[test]
    fn test_good_template_skips_create_callback() {
        let fx = Fixture::new();
        let template = fx.dir.path().join("template.sqlite");
        {
            let seed = DatabaseConn::open_path(&template).unwrap();
            seed.execute("CREATE TABLE items (id INTEGER PRIMARY KEY, name TEXT NOT NULL)")
                .unwrap();
            seed.execute("INSERT INTO items (name) VALUES ('bundled')")
                .unwrap();
            seed.set_user_version(4).unwrap();
        }

        let mut delegate = RecordingDelegate::new();
        delegate.create_options = CreateOptions::with_template(&template);

        let db = fx.open("bundled", Some(4), &mut delegate).unwrap();
        let count: i64 = db
            .conn
            .query_row("SELECT COUNT(*) FROM items", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 1);
        assert!(delegate.migration_calls().is_empty());
        assert!(!fx.scratch("bundled").exists());
    }

    #[test]
    fn test_failed_create_removes_file() {
        let fx = Fixture::new();
        let mut delegate = RecordingDelegate::new();
        delegate.fail_create = true;

        assert!(fx.open("doomed", Some(1), &mut delegate).is_none());
        assert_eq!(delegate.error_codes(), vec![ErrorCode::MigrationFailed]);
        assert_eq!(delegate.count(&Call::WillCreate), 1);
        assert!(!fx.path("doomed").exists());
    }

    #[test]
    fn test_configure_failure_on_existing_file_is_terminal() {
        let fx = Fixture::new();
        let mut delegate = RecordingDelegate::new();
        drop(fx.open("picky", Some(1), &mut delegate).unwrap());

        delegate.reset();
        delegate.fail_configure = true;
        assert!(fx.open("picky", Some(1), &mut delegate).is_none());
        assert_eq!(delegate.error_codes(), vec![ErrorCode::ConnectionInvalid]);
        assert_eq!(delegate.count(&Call::WillCreate), 0);
        assert!(fx.path("picky").exists());
    }

    #[test]
    fn test_garbage_file_is_reported_not_replaced() {
        let fx = Fixture::new();
        let path = fx.path("mangled");
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, b"garbage bytes".repeat(500)).unwrap();

        let mut delegate = RecordingDelegate::new();
        assert!(fx.open("mangled", Some(1), &mut delegate).is_none());
        assert_eq!(delegate.error_codes(), vec![ErrorCode::ConnectionInvalid]);
        assert!(delegate.migration_calls().is_empty());
        assert!(path.exists());
    }

    #[test]
    fn test_valid_database_check() {
        let fx = Fixture::new();
        let resolver = fx.lifecycle.resolver();
        let mut delegate = RecordingDelegate::new();

        assert!(!is_valid_database(resolver, Some("catalog"), &mut delegate));
        assert!(!fx.path("catalog").exists());
        assert!(!resolver.databases_dir().exists());

        drop(fx.open("catalog", Some(2), &mut delegate).unwrap());
        delegate.reset();
        assert!(is_valid_database(resolver, Some("catalog"), &mut delegate));
        assert_eq!(delegate.calls, vec![Call::Configure]);
        assert_eq!(fx.stored_version("catalog"), 2);

        fs::write(fx.path("catalog"), b"smashed".repeat(1000)).unwrap();
        assert!(!is_valid_database(resolver, Some("catalog"), &mut delegate));
        assert!(delegate.error_codes().is_empty());
    }

    #[test]
    fn test_in_memory_full_cycle() {
        let fx = Fixture::new();
        let mut delegate = RecordingDelegate::new();

        let db = fx.lifecycle.open(Some("   "), Some(2), false, &mut delegate).unwrap();
        assert_eq!(db.user_version(), 2);
        assert!(db.table_exists("items").unwrap());
        assert_eq!(
            delegate.calls,
            vec![Call::Configure, Call::DidCreate, Call::DidOpen]
        );

        assert_eq!(fx.lifecycle.resolver().resolve_database_path(None), None);
        assert!(!is_valid_database(fx.lifecycle.resolver(), None, &mut delegate));
        assert_eq!(fs::read_dir(fx.dir.path()).unwrap().count(), 0);
    }
}
