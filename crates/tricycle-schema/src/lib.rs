//! Table registry for tricycle.
//!
//! A [`Registry`] is the desired state of the database: every table, its
//! columns in declaration order, the columns to index, and the row-level
//! security policy to install. It is built once, validated, and handed to
//! the DDL generator and the reconciler by reference. Nothing in it changes
//! at runtime.
//!
//! ```
//! use tricycle_schema::{ColumnSpec, Registry, SqlType, TableSpec};
//!
//! let registry = Registry::new(
//!     vec![
//!         TableSpec::new("clientes")
//!             .column("id", ColumnSpec::new(SqlType::Integer).primary_key().auto_increment())
//!             .column("nombre", ColumnSpec::new(SqlType::Text).not_null()),
//!     ],
//! )
//! .unwrap();
//! assert_eq!(registry.len(), 1);
//! ```

use indexmap::IndexMap;

pub use tricycle_sql::{Expr, PolicyCommand, ReferentialAction, SqlType};

mod crm;
pub use crm::{crm, crm_tables};

/// The Postgres schema every table lives in.
///
/// The introspection functions report bare table names from this schema.
pub const SCHEMA: &str = "public";

/// Name of the column that gets an automatic `updated_at` trigger.
pub const UPDATED_AT: &str = "updated_at";

/// A column definition.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnSpec {
    /// Postgres type
    pub sql_type: SqlType,
    /// Whether this is the primary key
    pub primary_key: bool,
    /// Whether values are generated by an identity sequence
    pub auto_increment: bool,
    /// Whether the column rejects NULL
    pub not_null: bool,
    /// Foreign key target, if any
    pub references: Option<ForeignRef>,
    /// Default value expression, if any
    pub default: Option<Expr>,
}

impl ColumnSpec {
    pub fn new(sql_type: SqlType) -> Self {
        Self {
            sql_type,
            primary_key: false,
            auto_increment: false,
            not_null: false,
            references: None,
            default: None,
        }
    }

    pub fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self.not_null = true;
        self
    }

    pub fn auto_increment(mut self) -> Self {
        self.auto_increment = true;
        self
    }

    pub fn not_null(mut self) -> Self {
        self.not_null = true;
        self
    }

    pub fn default(mut self, expr: Expr) -> Self {
        self.default = Some(expr);
        self
    }

    /// Reference `table(column)`.
    pub fn references(mut self, table: impl Into<String>, column: impl Into<String>) -> Self {
        self.references = Some(ForeignRef {
            table: table.into(),
            column: column.into(),
            on_delete: None,
        });
        self
    }

    /// Set the ON DELETE action of the reference declared with [`ColumnSpec::references`].
    pub fn on_delete(mut self, action: ReferentialAction) -> Self {
        if let Some(fk) = &mut self.references {
            fk.on_delete = Some(action);
        }
        self
    }
}

/// A foreign key target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForeignRef {
    /// Referenced table
    pub table: String,
    /// Referenced column
    pub column: String,
    /// ON DELETE behavior (database default when `None`)
    pub on_delete: Option<ReferentialAction>,
}

/// A row-level security policy installed alongside a table.
#[derive(Debug, Clone, PartialEq)]
pub struct RlsPolicy {
    pub name: String,
    pub command: PolicyCommand,
    pub roles: Vec<String>,
    pub using: String,
    pub with_check: Option<String>,
}

impl RlsPolicy {
    /// Full access for the `authenticated` role, the policy every CRM table uses.
    pub fn authenticated_full_access(table: &str) -> Self {
        Self {
            name: format!("Authenticated users manage {}", table),
            command: PolicyCommand::All,
            roles: vec!["authenticated".to_string()],
            using: "true".to_string(),
            with_check: Some("true".to_string()),
        }
    }
}

/// A table definition.
#[derive(Debug, Clone, PartialEq)]
pub struct TableSpec {
    /// Table name
    pub name: String,
    /// Columns, in declaration order
    pub columns: IndexMap<String, ColumnSpec>,
    /// Columns that get a single-column index
    pub indexes: Vec<String>,
    /// Row-level security policy, if any
    pub row_level_security: Option<RlsPolicy>,
    /// Column names declared more than once (reported by [`Registry::new`])
    duplicate_columns: Vec<String>,
}

impl TableSpec {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            columns: IndexMap::new(),
            indexes: Vec::new(),
            row_level_security: None,
            duplicate_columns: Vec::new(),
        }
    }

    pub fn column(mut self, name: impl Into<String>, spec: ColumnSpec) -> Self {
        let name = name.into();
        if self.columns.contains_key(&name) {
            self.duplicate_columns.push(name);
        } else {
            self.columns.insert(name, spec);
        }
        self
    }

    pub fn index(mut self, column: impl Into<String>) -> Self {
        self.indexes.push(column.into());
        self
    }

    pub fn row_level_security(mut self, policy: RlsPolicy) -> Self {
        self.row_level_security = Some(policy);
        self
    }

    /// Name of the primary key column, if exactly one is declared.
    pub fn primary_key(&self) -> Option<&str> {
        let mut pks = self.columns.iter().filter(|(_, c)| c.primary_key);
        match (pks.next(), pks.next()) {
            (Some((name, _)), None) => Some(name.as_str()),
            _ => None,
        }
    }

    /// Whether an `updated_at` column is declared.
    pub fn has_updated_at(&self) -> bool {
        self.columns.contains_key(UPDATED_AT)
    }

    /// Tables this table references, excluding itself.
    pub fn dependencies(&self) -> impl Iterator<Item = &str> {
        self.columns
            .values()
            .filter_map(|c| c.references.as_ref())
            .map(|fk| fk.table.as_str())
            .filter(move |t| *t != self.name)
    }
}

/// A registry entry that cannot produce valid DDL.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MalformedSpec {
    #[error("table '{table}' is declared more than once")]
    DuplicateTable { table: String },

    #[error("column '{table}.{column}' is declared more than once")]
    DuplicateColumn { table: String, column: String },

    #[error("table '{table}' has no primary key")]
    NoPrimaryKey { table: String },

    #[error("table '{table}' declares several primary keys: {}", .columns.join(", "))]
    MultiplePrimaryKeys { table: String, columns: Vec<String> },

    #[error("index on '{table}.{column}' names a column that is not declared")]
    UnknownIndexColumn { table: String, column: String },

    #[error("column '{table}.{column}' references unknown table '{target}'")]
    UnknownReferencedTable {
        table: String,
        column: String,
        target: String,
    },

    #[error("column '{table}.{column}' references unknown column '{target_table}.{target_column}'")]
    UnknownReferencedColumn {
        table: String,
        column: String,
        target_table: String,
        target_column: String,
    },

    #[error("foreign keys form a cycle between: {}", .tables.join(", "))]
    Cycle { tables: Vec<String> },
}

/// The validated, dependency-ordered set of tables.
#[derive(Debug, Clone)]
pub struct Registry {
    /// Tables in dependency order: every table comes after the tables it references.
    tables: IndexMap<String, TableSpec>,
}

impl Registry {
    /// Validate `tables` and order them so referenced tables come first.
    ///
    /// The order is stable: among tables whose dependencies are satisfied,
    /// declaration order wins.
    pub fn new(tables: Vec<TableSpec>) -> Result<Self, MalformedSpec> {
        let mut by_name: IndexMap<String, TableSpec> = IndexMap::new();
        for table in tables {
            if by_name.contains_key(&table.name) {
                return Err(MalformedSpec::DuplicateTable { table: table.name });
            }
            by_name.insert(table.name.clone(), table);
        }

        for table in by_name.values() {
            validate_table(table, &by_name)?;
        }

        let tables = topological_order(by_name)?;
        Ok(Self { tables })
    }

    /// The Postgres schema tables live in.
    pub fn schema(&self) -> &str {
        SCHEMA
    }

    /// Get a table by name.
    pub fn get(&self, name: &str) -> Option<&TableSpec> {
        self.tables.get(name)
    }

    /// Iterate over tables in dependency order.
    pub fn tables(&self) -> impl Iterator<Item = &TableSpec> {
        self.tables.values()
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}

fn validate_table(
    table: &TableSpec,
    all: &IndexMap<String, TableSpec>,
) -> Result<(), MalformedSpec> {
    if let Some(column) = table.duplicate_columns.first() {
        return Err(MalformedSpec::DuplicateColumn {
            table: table.name.clone(),
            column: column.clone(),
        });
    }

    let pks: Vec<String> = table
        .columns
        .iter()
        .filter(|(_, c)| c.primary_key)
        .map(|(name, _)| name.clone())
        .collect();
    match pks.len() {
        0 => {
            return Err(MalformedSpec::NoPrimaryKey {
                table: table.name.clone(),
            });
        }
        1 => {}
        _ => {
            return Err(MalformedSpec::MultiplePrimaryKeys {
                table: table.name.clone(),
                columns: pks,
            });
        }
    }

    for column in &table.indexes {
        if !table.columns.contains_key(column) {
            return Err(MalformedSpec::UnknownIndexColumn {
                table: table.name.clone(),
                column: column.clone(),
            });
        }
    }

    for (name, column) in &table.columns {
        let Some(fk) = &column.references else {
            continue;
        };
        let Some(target) = all.get(&fk.table) else {
            return Err(MalformedSpec::UnknownReferencedTable {
                table: table.name.clone(),
                column: name.clone(),
                target: fk.table.clone(),
            });
        };
        if !target.columns.contains_key(&fk.column) {
            return Err(MalformedSpec::UnknownReferencedColumn {
                table: table.name.clone(),
                column: name.clone(),
                target_table: fk.table.clone(),
                target_column: fk.column.clone(),
            });
        }
    }

    Ok(())
}

/// Stable topological sort over foreign key edges.
fn topological_order(
    mut pending: IndexMap<String, TableSpec>,
) -> Result<IndexMap<String, TableSpec>, MalformedSpec> {
    let mut ordered: IndexMap<String, TableSpec> = IndexMap::with_capacity(pending.len());

    while !pending.is_empty() {
        let ready = pending
            .values()
            .position(|t| t.dependencies().all(|dep| ordered.contains_key(dep)));

        let Some((name, table)) = ready.and_then(|idx| pending.shift_remove_index(idx)) else {
            return Err(MalformedSpec::Cycle {
                tables: pending.keys().cloned().collect(),
            });
        };
        ordered.insert(name, table);
    }

    Ok(ordered)
}
