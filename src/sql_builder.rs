//! Parameterized SELECT / DELETE construction for the watchlist tables.
//!
//! Values always travel as bound `?` parameters, never through string
//! interpolation. Builder methods return `&mut Self` for chaining.
//!
//! # Example
//!
//! ```rust
//! use cardwatch::SqlBuilder;
//! let (sql, params) = SqlBuilder::new("cards")
//!     .where_eq("number", "348")
//!     .order_by(&["seq ASC"])
//!     .build();
//! assert!(sql.contains("WHERE number = ?"));
//! assert_eq!(params.len(), 1);
//! ```

use duckdb::types::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Statement {
    Select,
    Delete,
}

/// Builds parameterized SQL statements.
pub struct SqlBuilder {
    statement: Statement,
    select_cols: Vec<String>,
    from_table: String,
    where_clauses: Vec<String>,
    params: Vec<Value>,
    order_by_cols: Vec<String>,
    limit_val: Option<usize>,
}

impl SqlBuilder {
    /// Create a SELECT builder targeting the given table.
    pub fn new(table: &str) -> Self {
        Self {
            statement: Statement::Select,
            select_cols: vec!["*".to_string()],
            from_table: table.to_string(),
            where_clauses: Vec::new(),
            params: Vec::new(),
            order_by_cols: Vec::new(),
            limit_val: None,
        }
    }

    /// Create a DELETE builder targeting the given table.
    ///
    /// Column selection, ordering and limits are ignored for deletes.
    pub fn delete(table: &str) -> Self {
        Self {
            statement: Statement::Delete,
            ..Self::new(table)
        }
    }

    /// Set the columns to select (replaces the default `*`).
    pub fn select(&mut self, cols: &[&str]) -> &mut Self {
        self.select_cols = cols.iter().map(|c| c.to_string()).collect();
        self
    }

    /// Add a raw WHERE condition with `?` placeholders for `params`.
    pub fn where_clause(&mut self, condition: &str, params: &[&str]) -> &mut Self {
        self.where_clauses.push(condition.to_string());
        self.params
            .extend(params.iter().map(|p| Value::Text(p.to_string())));
        self
    }

    /// Add an equality condition: `{column} = ?`.
    pub fn where_eq(&mut self, column: &str, value: &str) -> &mut Self {
        self.where_clauses.push(format!("{} = ?", column));
        self.params.push(Value::Text(value.to_string()));
        self
    }

    /// Add an IN condition with parameterized values.
    ///
    /// Empty values list produces `FALSE`.
    pub fn where_in(&mut self, column: &str, values: &[&str]) -> &mut Self {
        if values.is_empty() {
            self.where_clauses.push("FALSE".to_string());
            return self;
        }
        let placeholders: Vec<&str> = values.iter().map(|_| "?").collect();
        self.where_clauses
            .push(format!("{} IN ({})", column, placeholders.join(", ")));
        self.params
            .extend(values.iter().map(|v| Value::Text(v.to_string())));
        self
    }

    /// Add ORDER BY clauses (e.g. `"seq ASC"`).
    pub fn order_by(&mut self, clauses: &[&str]) -> &mut Self {
        self.order_by_cols
            .extend(clauses.iter().map(|c| c.to_string()));
        self
    }

    /// Set the maximum number of rows to return.
    pub fn limit(&mut self, n: usize) -> &mut Self {
        self.limit_val = Some(n);
        self
    }

    /// Build the final SQL string and parameter list.
    pub fn build(&self) -> (String, Vec<Value>) {
        let mut parts = match self.statement {
            Statement::Select => vec![
                format!("SELECT {}", self.select_cols.join(", ")),
                format!("FROM {}", self.from_table),
            ],
            Statement::Delete => vec![format!("DELETE FROM {}", self.from_table)],
        };

        if !self.where_clauses.is_empty() {
            parts.push(format!("WHERE {}", self.where_clauses.join(" AND ")));
        }

        if self.statement == Statement::Select {
            if !self.order_by_cols.is_empty() {
                parts.push(format!("ORDER BY {}", self.order_by_cols.join(", ")));
            }
            if let Some(n) = self.limit_val {
                parts.push(format!("LIMIT {}", n));
            }
        }

        (parts.join("\n"), self.params.clone())
    }
}
