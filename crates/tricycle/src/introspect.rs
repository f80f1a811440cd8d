//! Reading the live schema back through the remote boundary.

use indexmap::{IndexMap, IndexSet};
use tricycle_schema::{ColumnSpec, Expr, Registry, SqlType};

use crate::RemoteError;
use crate::remote::{ColumnRow, IndexRow, RemoteSchema};

/// A table as it exists in the database.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LiveTable {
    /// Columns in the order the database reported them.
    pub columns: IndexMap<String, ColumnSpec>,
    /// Columns covered by at least one index.
    pub indexed_columns: IndexSet<String>,
}

impl LiveTable {
    /// Fold `get_columns` and `get_indexes` rows into a table.
    pub fn from_rows(columns: &[ColumnRow], indexes: &[IndexRow]) -> Self {
        let mut table = LiveTable::default();
        for row in columns {
            let parsed = column_from_row(row);
            match table.columns.get_mut(&row.column_name) {
                // One row per constraint: merge what each row tells us.
                Some(existing) => {
                    existing.primary_key |= parsed.primary_key;
                    existing.not_null |= parsed.not_null;
                    existing.auto_increment |= parsed.auto_increment;
                }
                None => {
                    table.columns.insert(row.column_name.clone(), parsed);
                }
            }
        }
        table.indexed_columns = indexes.iter().map(|i| i.column_name.clone()).collect();
        table
    }
}

fn column_from_row(row: &ColumnRow) -> ColumnSpec {
    let primary_key = row
        .constraint_type
        .as_deref()
        .is_some_and(|c| c.eq_ignore_ascii_case("PRIMARY KEY"));
    let auto_increment = row
        .column_default
        .as_deref()
        .is_some_and(|d| d.starts_with("nextval("));

    ColumnSpec {
        sql_type: SqlType::parse(&row.data_type),
        primary_key,
        auto_increment,
        not_null: primary_key || row.is_nullable.eq_ignore_ascii_case("NO"),
        // Referenced tables are not part of the RPC output.
        references: None,
        default: row.column_default.clone().map(Expr::Raw),
    }
}

/// The introspected shadow copy of the registry's tables.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LiveSchema {
    pub tables: IndexMap<String, LiveTable>,
}

impl LiveSchema {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, table: &str) -> Option<&LiveTable> {
        self.tables.get(table)
    }

    pub fn contains(&self, table: &str) -> bool {
        self.tables.contains_key(table)
    }
}

/// Read the live shape of every registry table.
///
/// Tables outside the registry are never inspected. When `get_tables` is not
/// installed, existence is probed per table with `table_exists` instead.
pub async fn introspect<R: RemoteSchema>(
    remote: &R,
    registry: &Registry,
) -> Result<LiveSchema, RemoteError> {
    let existing: IndexSet<String> = match remote.get_tables().await {
        Ok(rows) => rows.into_iter().map(|r| r.table_name).collect(),
        Err(RemoteError::RpcMissing { function }) => {
            tracing::debug!(%function, "falling back to table_exists probes");
            let mut found = IndexSet::new();
            for table in registry.tables() {
                if remote.table_exists(&table.name).await? {
                    found.insert(table.name.clone());
                }
            }
            found
        }
        Err(e) => return Err(e),
    };

    let mut live = LiveSchema::new();
    for table in registry.tables() {
        if !existing.contains(&table.name) {
            continue;
        }
        let columns = remote.get_columns(&table.name).await?;
        let indexes = remote.get_indexes(&table.name).await?;
        tracing::debug!(
            table = %table.name,
            columns = columns.len(),
            indexes = indexes.len(),
            "introspected table"
        );
        live.tables
            .insert(table.name.clone(), LiveTable::from_rows(&columns, &indexes));
    }

    Ok(live)
}
