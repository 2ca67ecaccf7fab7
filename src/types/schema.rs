//! Database schema model
//!
//! Table and column metadata read from the catalog. Immutable once fetched;
//! sessions share it behind an `Arc`.

use serde::{Deserialize, Serialize};

/// A column as declared in the catalog
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    /// Declared type (may be empty in SQLite)
    pub declared_type: String,
    #[serde(default)]
    pub not_null: bool,
    #[serde(default)]
    pub primary_key: bool,
}

impl Column {
    pub fn new(name: impl Into<String>, declared_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            declared_type: declared_type.into(),
            not_null: false,
            primary_key: false,
        }
    }
}

/// Whether a catalog entry is a base table or a view
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TableKind {
    #[default]
    Table,
    View,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Table {
    pub name: String,
    #[serde(default)]
    pub kind: TableKind,
    pub columns: Vec<Column>,
}

impl Table {
    pub fn new(name: impl Into<String>, columns: Vec<Column>) -> Self {
        Self {
            name: name.into(),
            kind: TableKind::Table,
            columns,
        }
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns
            .iter()
            .find(|c| c.name.eq_ignore_ascii_case(name))
    }
}

/// Ordered sequence of tables
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schema {
    pub tables: Vec<Table>,
}

impl Schema {
    pub fn new(tables: Vec<Table>) -> Self {
        Self { tables }
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    pub fn table(&self, name: &str) -> Option<&Table> {
        self.tables
            .iter()
            .find(|t| t.name.eq_ignore_ascii_case(name))
    }

    pub fn table_names(&self) -> Vec<&str> {
        self.tables.iter().map(|t| t.name.as_str()).collect()
    }

    pub fn column_count(&self) -> usize {
        self.tables.iter().map(|t| t.columns.len()).sum()
    }

    /// Render the schema as a compact prompt block.
    ///
    /// Names are quoted verbatim so the model copies them rather than guessing.
    pub fn to_prompt_context(&self) -> String {
        if self.tables.is_empty() {
            return "(the database has no tables)\n".to_string();
        }

        let mut ctx = String::new();
        for table in &self.tables {
            let label = match table.kind {
                TableKind::Table => "TABLE",
                TableKind::View => "VIEW",
            };
            ctx.push_str(&format!("{} \"{}\" (\n", label, table.name));
            for column in &table.columns {
                let mut line = format!("  \"{}\"", column.name);
                if !column.declared_type.is_empty() {
                    line.push(' ');
                    line.push_str(&column.declared_type);
                }
                if column.primary_key {
                    line.push_str(" PRIMARY KEY");
                }
                if column.not_null {
                    line.push_str(" NOT NULL");
                }
                ctx.push_str(&line);
                ctx.push('\n');
            }
            ctx.push_str(")\n");
        }
        ctx
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Schema {
        let mut id = Column::new("id", "INTEGER");
        id.primary_key = true;
        Schema::new(vec![
            Table::new("items", vec![id, Column::new("Style", "TEXT")]),
            Table::new("sales", vec![Column::new("item_id", "INTEGER")]),
        ])
    }

    #[test]
    fn test_prompt_context_quotes_names_verbatim() {
        let ctx = sample().to_prompt_context();
        assert!(ctx.contains("TABLE \"items\""));
        assert!(ctx.contains("\"Style\" TEXT"));
        assert!(ctx.contains("\"id\" INTEGER PRIMARY KEY"));
        assert!(ctx.contains("TABLE \"sales\""));
    }

    #[test]
    fn test_lookup_is_case_insensitive() {
        let schema = sample();
        assert!(schema.table("ITEMS").is_some());
        assert!(schema.table("items").and_then(|t| t.column("style")).is_some());
        assert!(schema.table("missing").is_none());
        assert_eq!(schema.column_count(), 3);
    }

    #[test]
    fn test_empty_schema_context() {
        let ctx = Schema::default().to_prompt_context();
        assert!(ctx.contains("no tables"));
    }
}
