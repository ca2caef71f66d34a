use clap::Args;
use schemakeeper::{format_size, get_database_info, KeeperConfig, SqlScriptDelegate};

use super::{option_to_string, print_output, FieldRow};

/// Arguments for the Status command
#[derive(Args)]
pub struct StatusArgs {
    /// Logical database name
    #[clap()]
    pub name: String,

    /// Encryption key used to read the database (requires the `sqlcipher` feature)
    #[clap(short, long)]
    pub key: Option<String>,
}

pub fn run(config: &KeeperConfig, args: StatusArgs, json: bool) -> bool {
    let StatusArgs { name, key } = args;

    // inspection never runs scripts, the directory is irrelevant
    let mut delegate = SqlScriptDelegate::new("", 0);
    if let Some(key) = key {
        delegate = delegate.with_encryption_key(key);
    }

    let info = get_database_info(config, &name, &mut delegate);

    let rows = vec![
        FieldRow::new("name", &info.name),
        FieldRow::new(
            "path",
            info.path
                .as_ref()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| "(in memory)".to_string()),
        ),
        FieldRow::new("exists", info.exists),
        FieldRow::new(
            "size",
            info.size_bytes
                .map(format_size)
                .unwrap_or_else(|| "-".to_string()),
        ),
        FieldRow::new(
            "modified",
            info.modified
                .map(|t| t.format("%Y-%m-%d %H:%M:%S UTC").to_string())
                .unwrap_or_else(|| "-".to_string()),
        ),
        FieldRow::new("valid", info.valid),
        FieldRow::new("schema_version", option_to_string(&info.schema_version)),
    ];

    print_output(&info, rows, json);
    true
}
