//! The remote execution boundary.
//!
//! Reconciliation only talks to the database through five server-side
//! functions. They are installed by the hosting platform's admin tooling,
//! not by this crate, and they are often missing on a fresh project; callers
//! must treat [`RemoteError::RpcMissing`] as an expected condition.
//!
//! | function              | returns                                                          |
//! |-----------------------|------------------------------------------------------------------|
//! | `execute_sql(sql)`    | void                                                             |
//! | `table_exists(name)`  | boolean                                                          |
//! | `get_tables()`        | `table_name`                                                     |
//! | `get_columns(name)`   | `column_name, data_type, is_nullable, column_default, constraint_type` |
//! | `get_indexes(name)`   | `index_name, column_name`                                        |

use crate::{RemoteError, TracedPool};

/// A row of `get_tables()`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableRow {
    pub table_name: String,
}

/// A row of `get_columns(table_name)`.
///
/// A column that carries several constraints may appear once per constraint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnRow {
    pub column_name: String,
    pub data_type: String,
    /// `YES` or `NO`, as in `information_schema.columns`.
    pub is_nullable: String,
    pub column_default: Option<String>,
    /// `PRIMARY KEY`, `FOREIGN KEY`, `UNIQUE`, or none.
    pub constraint_type: Option<String>,
}

/// A row of `get_indexes(table_name)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexRow {
    pub index_name: String,
    pub column_name: String,
}

/// The RPC surface reconciliation depends on.
#[allow(async_fn_in_trait)]
pub trait RemoteSchema {
    /// Run arbitrary SQL with admin rights.
    async fn execute_sql(&self, sql: &str) -> Result<(), RemoteError>;

    async fn table_exists(&self, table_name: &str) -> Result<bool, RemoteError>;

    async fn get_tables(&self) -> Result<Vec<TableRow>, RemoteError>;

    async fn get_columns(&self, table_name: &str) -> Result<Vec<ColumnRow>, RemoteError>;

    async fn get_indexes(&self, table_name: &str) -> Result<Vec<IndexRow>, RemoteError>;
}

/// Calls the boundary functions over a direct Postgres connection.
#[derive(Clone)]
pub struct PgRemote {
    pool: TracedPool,
    /// Schema the RPC functions are installed in.
    rpc_schema: String,
}

impl PgRemote {
    pub fn new(pool: TracedPool) -> Self {
        Self {
            pool,
            rpc_schema: "public".to_string(),
        }
    }

    /// Look for the RPC functions in `schema` instead of `public`.
    pub fn with_rpc_schema(mut self, schema: impl Into<String>) -> Self {
        self.rpc_schema = schema.into();
        self
    }

    fn function(&self, name: &str) -> String {
        format!(
            "{}.{}",
            tricycle_sql::quote_ident(&self.rpc_schema),
            tricycle_sql::quote_ident(name)
        )
    }
}

impl RemoteSchema for PgRemote {
    async fn execute_sql(&self, sql: &str) -> Result<(), RemoteError> {
        let stmt = format!("SELECT {}($1)", self.function("execute_sql"));
        self.pool
            .execute(&stmt, &[&sql])
            .await
            .map_err(|e| e.for_rpc("execute_sql"))?;
        Ok(())
    }

    async fn table_exists(&self, table_name: &str) -> Result<bool, RemoteError> {
        let stmt = format!("SELECT {}($1)", self.function("table_exists"));
        let row = self
            .pool
            .query_one(&stmt, &[&table_name])
            .await
            .map_err(|e| e.for_rpc("table_exists"))?;
        Ok(row.try_get::<_, Option<bool>>(0)?.unwrap_or(false))
    }

    async fn get_tables(&self) -> Result<Vec<TableRow>, RemoteError> {
        let stmt = format!("SELECT table_name FROM {}()", self.function("get_tables"));
        let rows = self
            .pool
            .query(&stmt, &[])
            .await
            .map_err(|e| e.for_rpc("get_tables"))?;
        rows.iter()
            .map(|row| -> Result<TableRow, RemoteError> {
                Ok(TableRow {
                    table_name: row.try_get("table_name")?,
                })
            })
            .collect()
    }

    async fn get_columns(&self, table_name: &str) -> Result<Vec<ColumnRow>, RemoteError> {
        let stmt = format!(
            "SELECT column_name, data_type, is_nullable, column_default, constraint_type FROM {}($1)",
            self.function("get_columns")
        );
        let rows = self
            .pool
            .query(&stmt, &[&table_name])
            .await
            .map_err(|e| e.for_rpc("get_columns"))?;
        rows.iter()
            .map(|row| -> Result<ColumnRow, RemoteError> {
                Ok(ColumnRow {
                    column_name: row.try_get("column_name")?,
                    data_type: row.try_get("data_type")?,
                    is_nullable: row.try_get("is_nullable")?,
                    column_default: row.try_get("column_default")?,
                    constraint_type: row.try_get("constraint_type")?,
                })
            })
            .collect()
    }

    async fn get_indexes(&self, table_name: &str) -> Result<Vec<IndexRow>, RemoteError> {
        let stmt = format!(
            "SELECT index_name, column_name FROM {}($1)",
            self.function("get_indexes")
        );
        let rows = self
            .pool
            .query(&stmt, &[&table_name])
            .await
            .map_err(|e| e.for_rpc("get_indexes"))?;
        rows.iter()
            .map(|row| -> Result<IndexRow, RemoteError> {
                Ok(IndexRow {
                    index_name: row.try_get("index_name")?,
                    column_name: row.try_get("column_name")?,
                })
            })
            .collect()
    }
}
