use clap::Args;
use schemakeeper::{format_size, KeeperConfig, DATABASE_EXTENSION};
use serde::Serialize;

use super::{print_output, FieldRow};

/// Arguments for the Config command
#[derive(Args)]
pub struct ConfigArgs {
    /// Show detailed information about all database files
    #[clap(short, long)]
    pub verbose: bool,
}

#[derive(Debug, Serialize)]
struct ConfigInfo {
    config_file: String,
    data_dir: String,
    databases_dir: String,
    temporary_dir: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    files: Option<Vec<FileInfo>>,
}

#[derive(Debug, Serialize)]
struct FileInfo {
    name: String,
    size_bytes: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    modified: Option<String>,
}

pub fn run(config: &KeeperConfig, args: ConfigArgs, json: bool) -> bool {
    let ConfigArgs { verbose } = args;

    let files = if verbose {
        let mut file_list = Vec::new();
        if let Ok(entries) = std::fs::read_dir(config.databases_dir()) {
            for entry in entries.flatten() {
                let path = entry.path();
                if path.extension().and_then(|ext| ext.to_str()) != Some(DATABASE_EXTENSION) {
                    continue;
                }
                if let Ok(metadata) = entry.metadata() {
                    let modified = metadata.modified().ok().map(|t| {
                        let datetime: chrono::DateTime<chrono::Utc> = t.into();
                        datetime.format("%Y-%m-%d %H:%M:%S UTC").to_string()
                    });
                    file_list.push(FileInfo {
                        name: entry.file_name().to_string_lossy().to_string(),
                        size_bytes: metadata.len(),
                        modified,
                    });
                }
            }
        }
        file_list.sort_by(|a, b| a.name.cmp(&b.name));
        Some(file_list)
    } else {
        None
    };

    let info = ConfigInfo {
        config_file: KeeperConfig::config_file_path(),
        data_dir: config.data_dir.clone(),
        databases_dir: config.databases_dir(),
        temporary_dir: config.temporary_dir(),
        files,
    };

    if json {
        print_output(&info, Vec::new(), true);
        return true;
    }

    println!("Config File:        {}", info.config_file);
    println!("{}", config.summary());

    if let Some(files) = &info.files {
        let rows = files
            .iter()
            .map(|f| {
                FieldRow::new(
                    "file",
                    format!(
                        "{}  {}  {}",
                        f.name,
                        format_size(f.size_bytes),
                        f.modified.as_deref().unwrap_or("-")
                    ),
                )
            })
            .collect();
        print_output(&info, rows, false);
    }
    true
}
