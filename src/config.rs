use anyhow::{anyhow, Result};
use chrono::{DateTime, Utc};
use config::Config;
use serde::Serialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::database::{
    is_intact, read_user_version, DatabaseConn, DatabaseIdentity, DatabaseOpenDelegate, OpenMode,
    PathResolver,
};

pub struct KeeperConfig {
    /// Path to the directory holding schemakeeper's data
    pub data_dir: String,

    /// Directory for scratch template copies (default: `{data_dir}/temporary`)
    pub temp_dir: Option<String>,
}

const EMPTY_CONFIG: &str = r#"### schemakeeper configuration file

### directory holding the databases (under `databases/`)
# data_dir = "~/.schemakeeper"

### directory for scratch template copies, defaults to `{data_dir}/temporary`
# temp_dir = "/tmp/schemakeeper"
"#;

impl Default for KeeperConfig {
    fn default() -> Self {
        let home_dir = dirs::home_dir()
            .map(|h| h.to_string_lossy().to_string())
            .unwrap_or_else(|| ".".to_string());

        Self {
            data_dir: format!("{}/.schemakeeper", home_dir),
            temp_dir: None,
        }
    }
}

impl KeeperConfig {
    /// Function to create and initialize a new configuration
    pub fn new(path: &Option<String>) -> Result<KeeperConfig> {
        let mut builder = Config::builder();

        // By default use $HOME/.schemakeeper/schemakeeper.toml as the configuration file path
        let home_dir = dirs::home_dir()
            .ok_or_else(|| anyhow!("Could not find home directory"))?
            .to_str()
            .ok_or_else(|| anyhow!("Could not convert home directory path to string"))?
            .to_owned();

        let keeper_dir = format!("{}/.schemakeeper", home_dir.as_str());

        match path {
            Some(p) => {
                let path = Path::new(p.as_str());
                if path.exists() {
                    let path_str = path
                        .to_str()
                        .ok_or_else(|| anyhow!("Could not convert path to string"))?;
                    builder = builder.add_source(config::File::with_name(path_str));
                } else {
                    std::fs::write(p.as_str(), EMPTY_CONFIG)
                        .map_err(|e| anyhow!("Unable to create config file: {}", e))?;
                }
            }
            None => {
                std::fs::create_dir_all(keeper_dir.as_str())
                    .map_err(|e| anyhow!("Unable to create schemakeeper directory: {}", e))?;
                let p = format!("{}/schemakeeper.toml", keeper_dir.as_str());
                if Path::new(p.as_str()).exists() {
                    builder = builder.add_source(config::File::with_name(p.as_str()));
                } else {
                    std::fs::write(p.as_str(), EMPTY_CONFIG).map_err(|e| {
                        anyhow!("Unable to create config file {}: {}", p.as_str(), e)
                    })?;
                }
            }
        }

        // Add in settings from the environment (with a prefix of SCHEMAKEEPER)
        // E.g., `SCHEMAKEEPER_DATA_DIR=/srv/keeper schemakeeper status notes`
        builder = builder.add_source(config::Environment::with_prefix("SCHEMAKEEPER"));

        let settings = builder
            .build()
            .map_err(|e| anyhow!("Failed to build configuration: {}", e))?;

        let config = settings
            .try_deserialize::<HashMap<String, String>>()
            .map_err(|e| anyhow!("Failed to deserialize configuration: {}", e))?;

        Ok(Self::from_settings(&config, &keeper_dir))
    }

    fn from_settings(config: &HashMap<String, String>, default_dir: &str) -> KeeperConfig {
        let data_dir = config
            .get("data_dir")
            .map(|p| expand_home(p))
            .unwrap_or_else(|| default_dir.to_string());

        let temp_dir = config
            .get("temp_dir")
            .filter(|p| !p.trim().is_empty())
            .map(|p| expand_home(p));

        KeeperConfig { data_dir, temp_dir }
    }

    /// Directory holding the database files
    pub fn databases_dir(&self) -> String {
        format!("{}/databases", self.data_dir.trim_end_matches('/'))
    }

    /// Directory holding scratch template copies
    pub fn temporary_dir(&self) -> String {
        match &self.temp_dir {
            Some(dir) => dir.trim_end_matches('/').to_string(),
            None => format!("{}/temporary", self.data_dir.trim_end_matches('/')),
        }
    }

    /// Path resolver rooted at the configured directories
    pub fn resolver(&self) -> PathResolver {
        PathResolver::new(self.databases_dir(), self.temporary_dir())
    }

    /// Display configuration summary
    pub fn summary(&self) -> String {
        let mut lines = vec![
            format!("Data Directory:     {}", self.data_dir),
            format!("Databases:          {}", self.databases_dir()),
            format!("Scratch Directory:  {}", self.temporary_dir()),
        ];

        if Path::new(&self.databases_dir()).exists() {
            let count = std::fs::read_dir(self.databases_dir())
                .map(|entries| {
                    entries
                        .flatten()
                        .filter(|e| {
                            e.path()
                                .extension()
                                .is_some_and(|ext| ext == crate::database::DATABASE_EXTENSION)
                        })
                        .count()
                })
                .unwrap_or(0);
            lines.push(format!("Database Files:     {}", count));
        }

        lines.join("\n")
    }

    /// Get the config file path
    pub fn config_file_path() -> String {
        let home_dir = dirs::home_dir()
            .map(|h| h.to_string_lossy().to_string())
            .unwrap_or_else(|| "~".to_string());
        format!("{}/.schemakeeper/schemakeeper.toml", home_dir)
    }
}

fn expand_home(path: &str) -> String {
    match (path.strip_prefix("~/"), dirs::home_dir()) {
        (Some(rest), Some(home)) => home.join(rest).to_string_lossy().to_string(),
        _ => path.to_string(),
    }
}

// =============================================================================
// Database inspection
// =============================================================================

/// Read-only report about one logical database
#[derive(Debug, Serialize, Clone)]
pub struct DatabaseInfo {
    pub name: String,
    pub in_memory: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
    pub exists: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size_bytes: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub modified: Option<DateTime<Utc>>,
    pub valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schema_version: Option<u32>,
}

/// Inspect `name` without creating, migrating or writing anything
pub fn get_database_info(
    config: &KeeperConfig,
    name: &str,
    delegate: &mut dyn DatabaseOpenDelegate,
) -> DatabaseInfo {
    let resolver = config.resolver();
    let identity = DatabaseIdentity::new(Some(name));
    let path = resolver.database_path(&identity);

    let metadata = path.as_ref().and_then(|p| std::fs::metadata(p).ok());
    let exists = metadata.as_ref().is_some_and(|m| m.is_file());

    let schema_version = match &path {
        Some(p) if exists => inspect_version(p, &identity, delegate),
        _ => None,
    };
    let valid = schema_version.is_some();

    DatabaseInfo {
        name: identity.as_str().to_string(),
        in_memory: identity.is_in_memory(),
        path,
        exists,
        size_bytes: metadata.as_ref().map(|m| m.len()),
        modified: metadata
            .as_ref()
            .and_then(|m| m.modified().ok())
            .map(DateTime::<Utc>::from),
        valid,
        schema_version,
    }
}

/// Stored version of an intact database, read through one read-only connection
fn inspect_version(
    path: &Path,
    identity: &DatabaseIdentity,
    delegate: &mut dyn DatabaseOpenDelegate,
) -> Option<u32> {
    let db = DatabaseConn::open_with(Some(path), OpenMode::ReadOnly).ok()?;
    delegate
        .configure_database(identity.as_str(), db.connection())
        .ok()?;
    if !is_intact(db.connection()) {
        return None;
    }
    Some(read_user_version(db.connection()))
}

/// Format bytes as human-readable size
pub fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.2} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}
