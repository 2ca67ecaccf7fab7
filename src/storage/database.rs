//! Database Binding
//!
//! Read-only SQLite binding for one agent session:
//! - A single-connection r2d2 pool, so a binding never hands out two handles
//! - `SQLITE_OPEN_READ_ONLY` plus `PRAGMA query_only` on every connection
//! - Row-capped, time-bounded query execution via a progress handler
//! - Catalog reads for schema introspection (no row data)

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::types::ValueRef;
use rusqlite::{Connection, ErrorCode, OpenFlags};
use serde_json::Value;
use tracing::debug;

use crate::config::DatabaseConfig;
use crate::constants::execution;
use crate::types::{
    Column, ExecutionFault, InsightError, Result, ResultExt, ResultSet, Row, Table, TableKind,
};

/// Limits applied to one statement
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueryLimits {
    /// Maximum rows materialized
    pub row_cap: usize,
    /// Wall-clock bound for the statement
    pub timeout: Duration,
}

impl QueryLimits {
    pub fn from_config(config: &DatabaseConfig) -> Self {
        Self {
            row_cap: config.row_cap,
            timeout: config.query_timeout(),
        }
    }
}

impl Default for QueryLimits {
    fn default() -> Self {
        Self::from_config(&DatabaseConfig::default())
    }
}

/// A statement failure as reported by the engine
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryFailure {
    pub message: String,
    pub fault: ExecutionFault,
}

impl QueryFailure {
    fn sql(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            fault: ExecutionFault::Sql,
        }
    }

    fn infrastructure(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            fault: ExecutionFault::Infrastructure,
        }
    }
}

/// Resolve a database location: a plain path or an SQLAlchemy-style URI.
///
/// `sqlite:///rel.db` is relative, `sqlite:////abs/db` is absolute.
pub fn resolve_location(url: &str) -> Result<PathBuf> {
    let url = url.trim();
    if let Some(rest) = url.strip_prefix("sqlite:///") {
        if rest.is_empty() {
            return Err(InsightError::Connection(format!(
                "Invalid database URI '{}': missing file path",
                url
            )));
        }
        return Ok(PathBuf::from(rest));
    }
    if url.starts_with("sqlite:") {
        return Err(InsightError::Connection(format!(
            "Invalid database URI '{}': expected sqlite:///<path>",
            url
        )));
    }
    if let Some((scheme, _)) = url.split_once("://") {
        return Err(InsightError::Connection(format!(
            "Unsupported database scheme '{}': only SQLite files are supported",
            scheme
        )));
    }
    Ok(PathBuf::from(url))
}

/// Read-only session database.
pub struct Database {
    pool: Pool<SqliteConnectionManager>,
    path: PathBuf,
}

impl std::fmt::Debug for Database {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database").field("path", &self.path).finish()
    }
}

impl Database {
    /// Open the database named by the config.
    ///
    /// Fails with `InsightError::Connection` when the location does not resolve
    /// to a readable SQLite file.
    pub fn open(config: &DatabaseConfig) -> Result<Self> {
        let path = resolve_location(&config.url)?;
        Self::open_path(path, config.pool_timeout())
    }

    pub fn open_path<P: AsRef<Path>>(path: P, pool_timeout: Duration) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if !path.is_file() {
            return Err(InsightError::Connection(format!(
                "unable to open database file: no such file: {}",
                path.display()
            )));
        }

        let manager = SqliteConnectionManager::file(&path)
            .with_flags(OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX)
            .with_init(Self::configure_connection);

        let pool = Pool::builder()
            .max_size(1)
            .min_idle(Some(1))
            .connection_timeout(pool_timeout)
            .build(manager)
            .connection_context(format!("unable to open database {}", path.display()))?;

        let db = Self { pool, path };
        db.verify()?;
        Ok(db)
    }

    fn configure_connection(conn: &mut Connection) -> std::result::Result<(), rusqlite::Error> {
        conn.execute_batch(
            r#"
            PRAGMA query_only = ON;
            PRAGMA busy_timeout = 5000;
            "#,
        )?;
        Ok(())
    }

    /// Touch the catalog so a non-database file fails at open time
    fn verify(&self) -> Result<()> {
        let conn = self.conn()?;
        conn.query_row("SELECT count(*) FROM sqlite_master", [], |row| {
            row.get::<_, i64>(0)
        })
        .connection_context(format!("unable to read {}", self.path.display()))?;
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn conn(&self) -> Result<PooledConnection<SqliteConnectionManager>> {
        self.pool
            .get()
            .connection_context("Failed to acquire database connection")
    }

    // =========================================================================
    // Catalog
    // =========================================================================

    /// Read tables/views and their columns from the catalog.
    pub fn read_catalog(&self) -> Result<Vec<Table>> {
        let conn = self.conn()?;

        let entries: Vec<(String, String)> = {
            let mut stmt = conn.prepare(
                "SELECT name, type FROM sqlite_master \
                 WHERE type IN ('table', 'view') AND name NOT LIKE 'sqlite_%' \
                 ORDER BY name",
            )?;
            let rows = stmt
                .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
                .collect::<std::result::Result<_, _>>()?;
            rows
        };

        let mut stmt = conn.prepare(
            "SELECT name, type, \"notnull\", pk FROM pragma_table_info(?1) ORDER BY cid",
        )?;

        let mut tables = Vec::with_capacity(entries.len());
        for (name, kind) in entries {
            let columns = stmt
                .query_map([&name], |row| {
                    Ok(Column {
                        name: row.get(0)?,
                        declared_type: row.get::<_, Option<String>>(1)?.unwrap_or_default(),
                        not_null: row.get::<_, i64>(2)? != 0,
                        primary_key: row.get::<_, i64>(3)? != 0,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            tables.push(Table {
                name,
                kind: if kind == "view" {
                    TableKind::View
                } else {
                    TableKind::Table
                },
                columns,
            });
        }

        debug!("Read catalog: {} tables from {}", tables.len(), self.path.display());
        Ok(tables)
    }

    // =========================================================================
    // Query Execution
    // =========================================================================

    /// Run one statement with a row cap and a wall-clock bound.
    ///
    /// Engine rejections come back as `QueryFailure` rather than `Err` of the
    /// crate error type; only the fault discriminator says whether the
    /// connection itself is unusable.
    pub fn run_query(
        &self,
        sql: &str,
        limits: QueryLimits,
    ) -> std::result::Result<ResultSet, QueryFailure> {
        let conn = self
            .pool
            .get()
            .map_err(|e| QueryFailure::infrastructure(format!("Failed to acquire database connection: {}", e)))?;

        let statement = normalize_statement(sql);
        let started = Instant::now();
        let deadline = started + limits.timeout;
        conn.progress_handler(
            execution::PROGRESS_HANDLER_OPS,
            Some(move || Instant::now() >= deadline),
        );

        let result = collect_rows(&conn, statement, limits.row_cap);

        conn.progress_handler(0, None::<fn() -> bool>);

        result.map_err(|e| {
            if started.elapsed() >= limits.timeout
                && e.sqlite_error_code() == Some(ErrorCode::OperationInterrupted)
            {
                return QueryFailure::sql(format!(
                    "query interrupted: exceeded execution timeout of {}s",
                    limits.timeout.as_secs_f32()
                ));
            }
            match e {
                // Display of this variant appends the statement text; classify the engine message alone
                rusqlite::Error::SqlInputError { msg, .. } => QueryFailure::sql(msg),
                e => match e.sqlite_error_code() {
                    Some(
                        ErrorCode::CannotOpen
                        | ErrorCode::NotADatabase
                        | ErrorCode::SystemIoFailure
                        | ErrorCode::DatabaseCorrupt,
                    ) => QueryFailure::infrastructure(e.to_string()),
                    _ => QueryFailure::sql(e.to_string()),
                },
            }
        })
    }
}

/// Drop trailing semicolons so a single statement is prepared cleanly
fn normalize_statement(sql: &str) -> &str {
    sql.trim().trim_end_matches(|c: char| c == ';' || c.is_whitespace())
}

fn collect_rows(
    conn: &Connection,
    sql: &str,
    row_cap: usize,
) -> std::result::Result<ResultSet, rusqlite::Error> {
    let mut stmt = conn.prepare(sql)?;
    let columns = unique_column_names(stmt.column_names());

    let mut rows = stmt.query([])?;
    let mut out = Vec::new();
    let mut truncated = false;

    while let Some(row) = rows.next()? {
        if out.len() >= row_cap {
            truncated = true;
            break;
        }
        let mut record = Row::new();
        for (idx, name) in columns.iter().enumerate() {
            record.insert(name.clone(), scalar(row.get_ref(idx)?));
        }
        out.push(record);
    }

    Ok(ResultSet::new(columns, out, truncated))
}

/// Row keys must be unique: a repeated name becomes `name:1`, `name:2`, ...
fn unique_column_names(names: Vec<&str>) -> Vec<String> {
    let mut seen: HashSet<String> = HashSet::with_capacity(names.len());
    let mut columns = Vec::with_capacity(names.len());
    for name in names {
        let mut key = name.to_string();
        let mut n = 0;
        while seen.contains(&key) {
            n += 1;
            key = format!("{}:{}", name, n);
        }
        seen.insert(key.clone());
        columns.push(key);
    }
    columns
}

fn scalar(value: ValueRef<'_>) -> Value {
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(i) => Value::from(i),
        ValueRef::Real(f) => serde_json::Number::from_f64(f)
            .map(Value::Number)
            .unwrap_or(Value::Null),
        ValueRef::Text(bytes) => Value::String(String::from_utf8_lossy(bytes).into_owned()),
        ValueRef::Blob(bytes) => Value::String(format!("<blob {} bytes>", bytes.len())),
    }
}
