//! DuckDB connection wrapper with schema setup, parameterized execution and
//! explicit transactions.
//!
//! Rows come back as `HashMap<String, serde_json::Value>` or are deserialized
//! straight into row structs, so stores never touch DuckDB value types.

use crate::error::{CardWatchError, Result};
use duckdb::{types::Value, types::ValueRef, Connection as DuckDbConnection};
use serde::de::DeserializeOwned;
use std::cell::Cell;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Watchlist schema. Timestamps are RFC 3339 strings; `cards.seq` records
/// insertion order so candidate scans are stable.
const SCHEMA: &str = "
CREATE SEQUENCE IF NOT EXISTS card_seq START 1;

CREATE TABLE IF NOT EXISTS cards (
    id VARCHAR NOT NULL,
    seq BIGINT DEFAULT nextval('card_seq'),
    name VARCHAR NOT NULL,
    number VARCHAR NOT NULL,
    set_display VARCHAR,
    rarity VARCHAR,
    image_url VARCHAR,
    meta_number VARCHAR,
    merge_group_id VARCHAR,
    created_at VARCHAR NOT NULL,
    updated_at VARCHAR NOT NULL
);

CREATE TABLE IF NOT EXISTS card_sources (
    card_id VARCHAR NOT NULL,
    ordinal INTEGER NOT NULL,
    source_type VARCHAR NOT NULL,
    url VARCHAR NOT NULL,
    product_id VARCHAR,
    currency VARCHAR NOT NULL,
    set_display VARCHAR,
    rarity VARCHAR,
    image_url VARCHAR,
    number VARCHAR,
    last_checked_at VARCHAR
);

CREATE TABLE IF NOT EXISTS card_prices (
    card_id VARCHAR NOT NULL,
    source_type VARCHAR NOT NULL,
    price_type VARCHAR NOT NULL,
    price DOUBLE NOT NULL
);

CREATE TABLE IF NOT EXISTS profiles (
    id VARCHAR NOT NULL,
    name VARCHAR NOT NULL,
    created_at VARCHAR NOT NULL
);

CREATE TABLE IF NOT EXISTS user_cards (
    profile_id VARCHAR NOT NULL,
    card_id VARCHAR NOT NULL,
    created_at VARCHAR NOT NULL
);
";

/// Wraps a DuckDB connection holding the watchlist tables.
pub struct Connection {
    conn: DuckDbConnection,
    path: Option<PathBuf>,
    in_transaction: Cell<bool>,
}

impl Connection {
    /// Open (or create) a database file and make sure the schema exists.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let conn = DuckDbConnection::open(path)?;
        Self::init(conn, Some(path.to_path_buf()))
    }

    /// Open an in-memory database with the schema in place.
    pub fn open_in_memory() -> Result<Self> {
        let conn = DuckDbConnection::open_in_memory()?;
        Self::init(conn, None)
    }

    fn init(conn: DuckDbConnection, path: Option<PathBuf>) -> Result<Self> {
        conn.execute_batch(SCHEMA)?;
        debug!(path = ?path, "watchlist schema ready");
        Ok(Self {
            conn,
            path,
            in_transaction: Cell::new(false),
        })
    }

    /// Database file path, `None` for in-memory databases.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Execute SQL and return results as a `Vec` of `HashMap`s.
    ///
    /// Each row is represented as a `HashMap<String, serde_json::Value>`.
    pub fn execute(
        &self,
        sql: &str,
        params: &[Value],
    ) -> Result<Vec<HashMap<String, serde_json::Value>>> {
        let mut stmt = self.conn.prepare(sql)?;
        let param_values: Vec<&dyn duckdb::ToSql> =
            params.iter().map(|p| p as &dyn duckdb::ToSql).collect();

        let mut rows_result = stmt.query(param_values.as_slice())?;

        // Column metadata is only available once the statement has run.
        let stmt_ref = rows_result.as_ref().ok_or_else(|| {
            CardWatchError::InvalidArgument("statement produced no result set".to_string())
        })?;
        let column_names: Vec<String> = stmt_ref
            .column_names()
            .into_iter()
            .map(|s| s.to_string())
            .collect();
        let column_count = stmt_ref.column_count();

        let mut out: Vec<HashMap<String, serde_json::Value>> = Vec::new();
        while let Some(row) = rows_result.next()? {
            let mut map = HashMap::with_capacity(column_count);
            for (i, col_name) in column_names.iter().enumerate().take(column_count) {
                map.insert(col_name.clone(), convert_value_ref(row.get_ref(i)?));
            }
            out.push(map);
        }

        Ok(out)
    }

    /// Execute SQL and deserialize each row into type `T`.
    pub fn execute_into<T: DeserializeOwned>(&self, sql: &str, params: &[Value]) -> Result<Vec<T>> {
        let rows = self.execute(sql, params)?;
        let mut results = Vec::with_capacity(rows.len());
        for row in rows {
            let value = serde_json::Value::Object(
                row.into_iter()
                    .collect::<serde_json::Map<String, serde_json::Value>>(),
            );
            results.push(serde_json::from_value(value)?);
        }
        Ok(results)
    }

    /// Execute SQL and return the first column of the first row.
    ///
    /// Returns `None` if the result set is empty.
    pub fn execute_scalar(&self, sql: &str, params: &[Value]) -> Result<Option<serde_json::Value>> {
        let mut stmt = self.conn.prepare(sql)?;
        let param_values: Vec<&dyn duckdb::ToSql> =
            params.iter().map(|p| p as &dyn duckdb::ToSql).collect();

        let mut rows = stmt.query(param_values.as_slice())?;
        match rows.next()? {
            Some(row) => Ok(Some(convert_value_ref(row.get_ref(0)?))),
            None => Ok(None),
        }
    }

    /// Execute an INSERT/UPDATE/DELETE and return the number of affected rows.
    pub fn execute_update(&self, sql: &str, params: &[Value]) -> Result<usize> {
        let param_values: Vec<&dyn duckdb::ToSql> =
            params.iter().map(|p| p as &dyn duckdb::ToSql).collect();
        Ok(self.conn.execute(sql, param_values.as_slice())?)
    }

    /// Run `f` inside a transaction, committing on `Ok` and rolling back on `Err`.
    ///
    /// Nested calls join the outer transaction.
    pub fn transaction<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce() -> Result<T>,
    {
        if self.in_transaction.get() {
            return f();
        }

        self.conn.execute_batch("BEGIN TRANSACTION")?;
        self.in_transaction.set(true);
        let result = f();
        self.in_transaction.set(false);

        match result {
            Ok(value) => {
                self.conn.execute_batch("COMMIT")?;
                Ok(value)
            }
            Err(e) => {
                if let Err(rollback) = self.conn.execute_batch("ROLLBACK") {
                    tracing::warn!(error = %rollback, "rollback failed");
                }
                Err(e)
            }
        }
    }

    /// Access the underlying DuckDB connection for advanced usage.
    pub fn raw(&self) -> &DuckDbConnection {
        &self.conn
    }
}

/// SQL text parameter.
pub fn text(s: impl Into<String>) -> Value {
    Value::Text(s.into())
}

/// Nullable SQL text parameter.
pub fn opt_text(s: Option<&str>) -> Value {
    match s {
        Some(s) => Value::Text(s.to_string()),
        None => Value::Null,
    }
}

/// Convert a DuckDB `ValueRef` to a `serde_json::Value`.
fn convert_value_ref(val: ValueRef<'_>) -> serde_json::Value {
    match val {
        ValueRef::Null => serde_json::Value::Null,
        ValueRef::Boolean(b) => serde_json::Value::Bool(b),
        ValueRef::TinyInt(n) => serde_json::Value::Number(n.into()),
        ValueRef::SmallInt(n) => serde_json::Value::Number(n.into()),
        ValueRef::Int(n) => serde_json::Value::Number(n.into()),
        ValueRef::BigInt(n) => serde_json::Value::Number(n.into()),
        ValueRef::HugeInt(n) => match i64::try_from(n) {
            Ok(i) => serde_json::Value::Number(i.into()),
            Err(_) => serde_json::Value::String(n.to_string()),
        },
        ValueRef::Float(f) => serde_json::Number::from_f64(f as f64)
            .map(serde_json::Value::Number)
            .unwrap_or(serde_json::Value::Null),
        ValueRef::Double(f) => serde_json::Number::from_f64(f)
            .map(serde_json::Value::Number)
            .unwrap_or(serde_json::Value::Null),
        ValueRef::Text(bytes) => serde_json::Value::String(String::from_utf8_lossy(bytes).to_string()),
        // Dates, lists and blobs never appear in the watchlist schema.
        _ => serde_json::Value::Null,
    }
}
