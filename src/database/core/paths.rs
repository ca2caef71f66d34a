//! Logical database names and their on-disk locations
//!
//! A logical name is trimmed and mapped to a [`DatabaseIdentity`]. Named
//! identities resolve to `{dir}/{sha256(name)}.sqlite`, so callers never leak
//! special characters into the filesystem and two callers using the same name
//! always land on the same file. The in-memory sentinel resolves to no path.

use sha2::{Digest, Sha256};
use std::fmt;
use std::path::{Path, PathBuf};

/// Reserved logical name for a non-persistent, process-local database
pub const IN_MEMORY_NAME: &str = ":memory:";

/// File extension shared by database files and scratch template copies
pub const DATABASE_EXTENSION: &str = "sqlite";

/// A sanitized logical database name
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DatabaseIdentity {
    /// A non-empty, trimmed name backed by a file
    Named(String),
    /// The in-memory sentinel
    InMemory,
}

impl DatabaseIdentity {
    /// Sanitize a raw name. Empty or whitespace-only input becomes the
    /// in-memory sentinel.
    pub fn new(raw: Option<&str>) -> Self {
        let trimmed = raw.map(str::trim).unwrap_or_default();
        if trimmed.is_empty() || trimmed == IN_MEMORY_NAME {
            DatabaseIdentity::InMemory
        } else {
            DatabaseIdentity::Named(trimmed.to_string())
        }
    }

    pub fn in_memory() -> Self {
        DatabaseIdentity::InMemory
    }

    pub fn is_in_memory(&self) -> bool {
        matches!(self, DatabaseIdentity::InMemory)
    }

    /// The sanitized name, as handed to delegate callbacks
    pub fn as_str(&self) -> &str {
        match self {
            DatabaseIdentity::Named(name) => name.as_str(),
            DatabaseIdentity::InMemory => IN_MEMORY_NAME,
        }
    }

    /// Hex encoded SHA-256 of the sanitized name, `None` for the sentinel
    pub fn file_stem(&self) -> Option<String> {
        match self {
            DatabaseIdentity::Named(name) => {
                Some(format!("{:x}", Sha256::digest(name.as_bytes())))
            }
            DatabaseIdentity::InMemory => None,
        }
    }
}

impl fmt::Display for DatabaseIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl From<&str> for DatabaseIdentity {
    fn from(raw: &str) -> Self {
        DatabaseIdentity::new(Some(raw))
    }
}

/// Maps identities to database and scratch paths under two fixed directories
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathResolver {
    databases_dir: PathBuf,
    temporary_dir: PathBuf,
}

impl PathResolver {
    pub fn new(databases_dir: impl Into<PathBuf>, temporary_dir: impl Into<PathBuf>) -> Self {
        Self {
            databases_dir: databases_dir.into(),
            temporary_dir: temporary_dir.into(),
        }
    }

    /// Resolver rooted at `{root}/databases` and `{root}/temporary`
    pub fn in_dir(root: impl AsRef<Path>) -> Self {
        let root = root.as_ref();
        Self::new(root.join("databases"), root.join("temporary"))
    }

    pub fn databases_dir(&self) -> &Path {
        &self.databases_dir
    }

    pub fn temporary_dir(&self) -> &Path {
        &self.temporary_dir
    }

    /// Path of the database file, `None` for the in-memory sentinel
    pub fn database_path(&self, identity: &DatabaseIdentity) -> Option<PathBuf> {
        Self::hashed_path(&self.databases_dir, identity)
    }

    /// Path of the scratch template copy, `None` for the in-memory sentinel
    pub fn template_path(&self, identity: &DatabaseIdentity) -> Option<PathBuf> {
        Self::hashed_path(&self.temporary_dir, identity)
    }

    /// Convenience wrapper taking a raw name
    pub fn resolve_database_path(&self, name: Option<&str>) -> Option<PathBuf> {
        self.database_path(&DatabaseIdentity::new(name))
    }

    /// Convenience wrapper taking a raw name
    pub fn resolve_template_path(&self, name: Option<&str>) -> Option<PathBuf> {
        self.template_path(&DatabaseIdentity::new(name))
    }

    fn hashed_path(dir: &Path, identity: &DatabaseIdentity) -> Option<PathBuf> {
        identity
            .file_stem()
            .map(|stem| dir.join(format!("{}.{}", stem, DATABASE_EXTENSION)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolver() -> PathResolver {
        PathResolver::in_dir("/data/keeper")
    }

    #[test]
    fn test_sanitize_trims_and_defaults() {
        assert_eq!(
            DatabaseIdentity::new(Some("  notes  ")),
            DatabaseIdentity::Named("notes".to_string())
        );
        assert_eq!(DatabaseIdentity::new(None), DatabaseIdentity::InMemory);
        assert_eq!(DatabaseIdentity::new(Some("")), DatabaseIdentity::InMemory);
        assert_eq!(DatabaseIdentity::new(Some(" \t\n")), DatabaseIdentity::InMemory);
        assert_eq!(
            DatabaseIdentity::new(Some(IN_MEMORY_NAME)),
            DatabaseIdentity::InMemory
        );
    }

    #[test]
    fn test_sanitize_is_idempotent() {
        for raw in ["  a b  ", "", "x/y:z", IN_MEMORY_NAME] {
            let once = DatabaseIdentity::new(Some(raw));
            let twice = DatabaseIdentity::new(Some(once.as_str()));
            assert_eq!(once, twice);
        }
    }

    #[test]
    fn test_database_path_is_deterministic() {
        let r = resolver();
        let a = r.resolve_database_path(Some("accounts"));
        let b = r.resolve_database_path(Some(" accounts "));
        assert!(a.is_some());
        assert_eq!(a, b);
        assert_ne!(a, r.resolve_database_path(Some("accounts2")));
    }

    #[test]
    fn test_path_layout() {
        let r = resolver();
        let db = r.resolve_database_path(Some("../../etc/passwd")).unwrap();
        let tmp = r.resolve_template_path(Some("../../etc/passwd")).unwrap();

        assert_eq!(db.parent().unwrap(), Path::new("/data/keeper/databases"));
        assert_eq!(tmp.parent().unwrap(), Path::new("/data/keeper/temporary"));
        assert_eq!(db.file_name(), tmp.file_name());

        let file_name = db.file_name().unwrap().to_str().unwrap();
        let stem = file_name.strip_suffix(".sqlite").unwrap();
        assert_eq!(stem.len(), 64);
        assert!(stem.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_known_digest() {
        let identity = DatabaseIdentity::from("abc");
        assert_eq!(
            identity.file_stem().unwrap(),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_in_memory_has_no_path() {
        let r = resolver();
        assert_eq!(r.resolve_database_path(None), None);
        assert_eq!(r.resolve_template_path(Some("   ")), None);
        assert_eq!(r.database_path(&DatabaseIdentity::in_memory()), None);
    }
}
