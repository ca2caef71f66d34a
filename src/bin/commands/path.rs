use clap::Args;
use schemakeeper::{DatabaseIdentity, KeeperConfig};
use serde::Serialize;
use std::path::PathBuf;

use super::{print_output, FieldRow};

/// Arguments for the Path command
#[derive(Args)]
pub struct PathArgs {
    /// Logical database name
    #[clap()]
    pub name: String,
}

#[derive(Debug, Serialize)]
struct PathReport {
    name: String,
    in_memory: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    file_stem: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    database_path: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    scratch_path: Option<PathBuf>,
}

pub fn run(config: &KeeperConfig, args: PathArgs, json: bool) -> bool {
    let resolver = config.resolver();
    let identity = DatabaseIdentity::new(Some(args.name.as_str()));

    let report = PathReport {
        name: identity.as_str().to_string(),
        in_memory: identity.is_in_memory(),
        file_stem: identity.file_stem(),
        database_path: resolver.database_path(&identity),
        scratch_path: resolver.template_path(&identity),
    };

    let display = |p: &Option<PathBuf>| {
        p.as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "-".to_string())
    };
    let rows = vec![
        FieldRow::new("name", &report.name),
        FieldRow::new("in_memory", report.in_memory),
        FieldRow::new("database", display(&report.database_path)),
        FieldRow::new("scratch", display(&report.scratch_path)),
    ];

    print_output(&report, rows, json);
    true
}
