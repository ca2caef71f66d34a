use clap::Args;
use schemakeeper::{DatabaseLifecycle, KeeperConfig, SqlScriptDelegate};
use serde::Serialize;
use std::path::PathBuf;

use super::{option_to_string, print_output, FieldRow};

/// Arguments for the Open command
#[derive(Args)]
pub struct OpenArgs {
    /// Logical database name; empty opens an in-memory database
    #[clap()]
    pub name: String,

    /// Schema version to migrate to, defaults to the stored version
    #[clap(short = 'v', long)]
    pub schema_version: Option<u32>,

    /// Open read-only; never creates or migrates
    #[clap(long)]
    pub readonly: bool,

    /// Directory holding `up/N.sql` and `down/N.sql` migration scripts
    #[clap(short, long, default_value = "migrations")]
    pub scripts: PathBuf,

    /// Template database used to seed a newly created database
    #[clap(short, long)]
    pub template: Option<PathBuf>,

    /// Encryption key (requires the `sqlcipher` feature)
    #[clap(short, long)]
    pub key: Option<String>,
}

#[derive(Debug, Serialize)]
struct OpenReport {
    name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    path: Option<PathBuf>,
    opened: bool,
    readonly: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    schema_version: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

pub fn run(config: &KeeperConfig, args: OpenArgs, json: bool) -> bool {
    let OpenArgs {
        name,
        schema_version,
        readonly,
        scripts,
        template,
        key,
    } = args;

    let mut delegate = SqlScriptDelegate::new(scripts, schema_version.unwrap_or(0));
    if let Some(template) = template {
        delegate = delegate.with_template(template);
    }
    if let Some(key) = key {
        delegate = delegate.with_encryption_key(key);
    }

    let lifecycle = DatabaseLifecycle::from_config(config);
    let opened = match schema_version {
        Some(_) => delegate.open(&lifecycle, &name, readonly),
        // no version requested: keep whatever is stored, never run scripts
        None => lifecycle.open(Some(name.as_str()), None, readonly, &mut delegate),
    };

    let (error_code, error) = match delegate.last_error() {
        Some((code, message)) => (Some(code.to_string()), Some(message.clone())),
        None => (None, None),
    };
    let report = OpenReport {
        path: lifecycle.resolver().resolve_database_path(Some(name.as_str())),
        name,
        opened: opened.is_some(),
        readonly: opened.as_ref().is_some_and(|db| db.is_readonly()),
        schema_version: opened.as_ref().map(|db| db.user_version()),
        error_code,
        error,
    };

    let mut rows = vec![
        FieldRow::new("name", &report.name),
        FieldRow::new(
            "path",
            report
                .path
                .as_ref()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| "(in memory)".to_string()),
        ),
        FieldRow::new("opened", report.opened),
        FieldRow::new("readonly", report.readonly),
        FieldRow::new("schema_version", option_to_string(&report.schema_version)),
    ];
    if let Some(code) = &report.error_code {
        rows.push(FieldRow::new("error_code", code));
    }
    if let Some(error) = &report.error {
        rows.push(FieldRow::new("error", error));
    }

    print_output(&report, rows, json);
    report.opened
}
