pub mod config;
pub mod open;
pub mod path;
pub mod status;

use serde::Serialize;
use tabled::settings::Style;
use tabled::{Table, Tabled};

#[derive(Tabled)]
pub(crate) struct FieldRow {
    field: &'static str,
    value: String,
}

impl FieldRow {
    pub(crate) fn new(field: &'static str, value: impl ToString) -> Self {
        Self {
            field,
            value: value.to_string(),
        }
    }
}

/// Print `value` as pretty JSON, or `rows` as a rounded table
pub(crate) fn print_output<T: Serialize>(value: &T, rows: Vec<FieldRow>, json: bool) {
    if json {
        match serde_json::to_string_pretty(value) {
            Ok(s) => println!("{}", s),
            Err(e) => eprintln!("ERROR: Failed to serialize output: {}", e),
        }
    } else {
        println!("{}", Table::new(rows).with(Style::rounded()));
    }
}

pub(crate) fn option_to_string<T: ToString>(value: &Option<T>) -> String {
    value
        .as_ref()
        .map(|v| v.to_string())
        .unwrap_or_else(|| "-".to_string())
}
