//! Schema Command
//!
//! Print the tables and columns the agent sees.
//!
//! Usage:
//!   insightsql schema [--db PATH] [--format json]

use console::style;

use crate::agent::SchemaIntrospector;
use crate::cli::ui::Output;
use crate::cli::util::ConnectionOverrides;
use crate::config::ConfigLoader;
use crate::storage::Database;
use crate::types::{Result, Schema, TableKind};

pub fn run(overrides: &ConnectionOverrides, format: &str) -> Result<bool> {
    let output = Output::new();
    let mut config = ConfigLoader::load()?;
    overrides.apply(&mut config);

    let schema = match Database::open(&config.database).and_then(|db| db.inspect()) {
        Ok(schema) => schema,
        Err(e) => {
            output.failure(&e.classify());
            return Ok(false);
        }
    };

    if format == "json" {
        println!("{}", serde_json::to_string_pretty(&schema)?);
    } else {
        print_schema(&output, &schema);
    }
    Ok(true)
}

pub(crate) fn print_schema(output: &Output, schema: &Schema) {
    if schema.is_empty() {
        output.warning("The database has no tables");
        return;
    }

    for table in &schema.tables {
        let kind = match table.kind {
            TableKind::Table => "",
            TableKind::View => " (view)",
        };
        output.section(&format!("{}{}", table.name, kind));
        for column in &table.columns {
            let mut flags = Vec::new();
            if column.primary_key {
                flags.push("pk");
            }
            if column.not_null {
                flags.push("not null");
            }
            let flags = if flags.is_empty() {
                String::new()
            } else {
                format!(" {}", style(flags.join(", ")).dim())
            };
            println!("  {:<24} {}{}", column.name, column.declared_type, flags);
        }
    }
}
