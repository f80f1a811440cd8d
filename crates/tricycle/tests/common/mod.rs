//! In-memory stand-ins for the database, shared by the integration tests.

#![allow(dead_code)]

use std::sync::Mutex;

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use tricycle::{
    ColumnRow, IndexRow, Ledger, MigrationRecord, Recorded, RemoteError, RemoteSchema, TableRow,
};
use tricycle_schema::{ColumnSpec, TableSpec};

fn missing(function: &str) -> RemoteError {
    RemoteError::RpcMissing {
        function: function.to_string(),
    }
}

fn unreachable_db(operation: &str) -> RemoteError {
    RemoteError::Timeout {
        operation: operation.to_string(),
        seconds: 30,
    }
}

#[derive(Default)]
struct FakeTable {
    columns: Vec<ColumnRow>,
    indexes: Vec<IndexRow>,
}

/// A database reachable only through the RPC functions.
#[derive(Default)]
pub struct FakeRemote {
    tables: Mutex<IndexMap<String, FakeTable>>,
    missing_rpcs: Vec<&'static str>,
    unreachable: bool,
    executed: Mutex<Vec<String>>,
}

impl FakeRemote {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pretend `function` is not installed on the server.
    pub fn without_rpc(mut self, function: &'static str) -> Self {
        self.missing_rpcs.push(function);
        self
    }

    /// Every call times out.
    pub fn unreachable(mut self) -> Self {
        self.unreachable = true;
        self
    }

    /// Add a live table with the given columns of `spec`, and indexes on `indexed`.
    pub fn with_table(self, spec: &TableSpec, columns: &[&str], indexed: &[&str]) -> Self {
        let mut table = FakeTable::default();
        for name in columns {
            let column = &spec.columns[*name];
            table.columns.push(column_row(name, column));
        }
        // the primary key always has an index
        if let Some(pk) = spec.primary_key() {
            table.indexes.push(IndexRow {
                index_name: format!("{}_pkey", spec.name),
                column_name: pk.to_string(),
            });
        }
        for name in indexed {
            table.indexes.push(IndexRow {
                index_name: format!("idx_{}_{}", spec.name, name),
                column_name: name.to_string(),
            });
        }
        self.tables
            .lock()
            .unwrap()
            .insert(spec.name.clone(), table);
        self
    }

    /// Add `spec` exactly as declared.
    pub fn with_full_table(self, spec: &TableSpec) -> Self {
        let columns: Vec<&str> = spec.columns.keys().map(|k| k.as_str()).collect();
        let indexed: Vec<&str> = spec.indexes.iter().map(|k| k.as_str()).collect();
        self.with_table(spec, &columns, &indexed)
    }

    /// Scripts passed to `execute_sql`, in order.
    pub fn executed(&self) -> Vec<String> {
        self.executed.lock().unwrap().clone()
    }

    fn check(&self, function: &'static str) -> Result<(), RemoteError> {
        if self.unreachable {
            return Err(unreachable_db(function));
        }
        if self.missing_rpcs.contains(&function) {
            return Err(missing(function));
        }
        Ok(())
    }
}

fn column_row(name: &str, column: &ColumnSpec) -> ColumnRow {
    ColumnRow {
        column_name: name.to_string(),
        data_type: column.sql_type.to_string(),
        is_nullable: if column.not_null { "NO" } else { "YES" }.to_string(),
        column_default: column.default.as_ref().map(|d| d.to_string()),
        constraint_type: column.primary_key.then(|| "PRIMARY KEY".to_string()),
    }
}

impl RemoteSchema for FakeRemote {
    async fn execute_sql(&self, sql: &str) -> Result<(), RemoteError> {
        self.check("execute_sql")?;
        self.executed.lock().unwrap().push(sql.to_string());
        Ok(())
    }

    async fn table_exists(&self, table_name: &str) -> Result<bool, RemoteError> {
        self.check("table_exists")?;
        Ok(self.tables.lock().unwrap().contains_key(table_name))
    }

    async fn get_tables(&self) -> Result<Vec<TableRow>, RemoteError> {
        self.check("get_tables")?;
        Ok(self
            .tables
            .lock()
            .unwrap()
            .keys()
            .map(|name| TableRow {
                table_name: name.clone(),
            })
            .collect())
    }

    async fn get_columns(&self, table_name: &str) -> Result<Vec<ColumnRow>, RemoteError> {
        self.check("get_columns")?;
        Ok(self
            .tables
            .lock()
            .unwrap()
            .get(table_name)
            .map(|t| t.columns.clone())
            .unwrap_or_default())
    }

    async fn get_indexes(&self, table_name: &str) -> Result<Vec<IndexRow>, RemoteError> {
        self.check("get_indexes")?;
        Ok(self
            .tables
            .lock()
            .unwrap()
            .get(table_name)
            .map(|t| t.indexes.clone())
            .unwrap_or_default())
    }
}

/// A ledger kept in memory.
#[derive(Default)]
pub struct FakeLedger {
    rows: Mutex<Vec<MigrationRecord>>,
    unreachable: bool,
    forgetful: bool,
}

impl FakeLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn unreachable(mut self) -> Self {
        self.unreachable = true;
        self
    }

    /// `has_applied` always answers false, as if another run recorded the
    /// name in between.
    pub fn forgetful(mut self) -> Self {
        self.forgetful = true;
        self
    }

    pub fn names(&self) -> Vec<String> {
        self.rows
            .lock()
            .unwrap()
            .iter()
            .map(|r| r.name.clone())
            .collect()
    }
}

impl Ledger for FakeLedger {
    async fn has_applied(&self, name: &str) -> Result<bool, RemoteError> {
        if self.unreachable {
            return Err(unreachable_db("has_applied"));
        }
        if self.forgetful {
            return Ok(false);
        }
        Ok(self.rows.lock().unwrap().iter().any(|r| r.name == name))
    }

    async fn record_applied(
        &self,
        name: &str,
        at: DateTime<Utc>,
    ) -> Result<Recorded, RemoteError> {
        if self.unreachable {
            return Err(unreachable_db("record_applied"));
        }
        let mut rows = self.rows.lock().unwrap();
        if rows.iter().any(|r| r.name == name) {
            return Ok(Recorded::AlreadyPresent);
        }
        let id = rows.len() as i32 + 1;
        rows.push(MigrationRecord {
            id,
            name: name.to_string(),
            applied_at: at,
        });
        Ok(Recorded::Inserted)
    }

    async fn list_applied(&self) -> Result<Vec<MigrationRecord>, RemoteError> {
        if self.unreachable {
            return Err(unreachable_db("list_applied"));
        }
        Ok(self.rows.lock().unwrap().clone())
    }
}
