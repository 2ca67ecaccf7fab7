//! Query result model

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One result row: column name to scalar value, in select-list order
pub type Row = serde_json::Map<String, Value>;

/// Rows returned by a successful statement
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResultSet {
    /// Column names in select-list order; a repeated name is suffixed `:1`, `:2`
    pub columns: Vec<String>,
    pub rows: Vec<Row>,
    /// True when the row cap stopped materialization early
    pub truncated: bool,
}

impl ResultSet {
    pub fn new(columns: Vec<String>, rows: Vec<Row>, truncated: bool) -> Self {
        Self {
            columns,
            rows,
            truncated,
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// The single value of a one-row, one-column result
    pub fn scalar(&self) -> Option<&Value> {
        match (self.rows.as_slice(), self.columns.as_slice()) {
            ([row], [column]) => row.get(column),
            _ => None,
        }
    }
}

/// Where an execution failure originated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionFault {
    /// The statement itself was rejected (syntax, schema, types, read-only)
    Sql,
    /// The connection could not be used at all
    Infrastructure,
}

/// Render a scalar for display: strings unquoted, everything else as JSON
pub fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => "NULL".to_string(),
        other => other.to_string(),
    }
}
