//! Registry entries to DDL.
//!
//! Every function here is pure: the same registry always yields the same
//! statements in the same order. Nothing generated is destructive, and every
//! statement is guarded (`IF NOT EXISTS`, `OR REPLACE`, `DROP ... IF EXISTS`
//! before re-create, or a `pg_policies` lookup) so scripts can be replayed.

use indexmap::IndexMap;
use tricycle_schema::{ColumnSpec, Registry, TableSpec, UPDATED_AT};
use tricycle_sql::{
    AddColumnStmt, ColumnDef, CreateIndexStmt, CreatePolicyStmt, CreateTableStmt,
    CreateTriggerStmt, DropTriggerStmt, QualifiedName, References, Script, Stmt,
    UpdatedAtFunctionStmt,
};

/// Generates DDL for the tables of one registry.
#[derive(Debug, Clone, Copy)]
pub struct DdlGenerator<'a> {
    registry: &'a Registry,
}

impl<'a> DdlGenerator<'a> {
    pub fn new(registry: &'a Registry) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &'a Registry {
        self.registry
    }

    fn qualified(&self, name: &str) -> QualifiedName {
        QualifiedName::new(self.registry.schema(), name)
    }

    fn column_def(&self, name: &str, spec: &ColumnSpec) -> ColumnDef {
        let mut def = ColumnDef::new(name, spec.sql_type.clone());
        def.primary_key = spec.primary_key;
        def.identity = spec.auto_increment;
        def.not_null = spec.not_null;
        def.default = spec.default.clone();
        def.references = spec.references.as_ref().map(|fk| References {
            table: self.qualified(&fk.table),
            column: fk.column.clone(),
            on_delete: fk.on_delete,
        });
        def
    }

    /// `CREATE TABLE`, its indexes, and the `updated_at` trigger if the table
    /// declares that column.
    pub fn create_table(&self, spec: &TableSpec) -> Script {
        let mut create = CreateTableStmt::new(self.qualified(&spec.name));
        for (name, column) in &spec.columns {
            create = create.column(self.column_def(name, column));
        }

        let mut script = Script::new();
        script.push(Stmt::CreateTable(create));
        script.extend(self.create_indexes(&spec.name, &spec.indexes));
        if spec.has_updated_at() {
            script.extend(self.updated_at_trigger(&spec.name));
        }
        script
    }

    pub fn generate_create_table(&self, spec: &TableSpec) -> String {
        tricycle_sql::render(&self.create_table(spec))
    }

    /// `ADD COLUMN IF NOT EXISTS` for each column of `desired` that `current`
    /// lacks, in `desired` order.
    ///
    /// Columns present on both sides are never touched, whatever their type.
    /// Adding an `updated_at` column also installs its trigger.
    pub fn alter_table(
        &self,
        table: &str,
        current: &IndexMap<String, ColumnSpec>,
        desired: &IndexMap<String, ColumnSpec>,
    ) -> Script {
        let mut script: Script = desired
            .iter()
            .filter(|(name, _)| !current.contains_key(*name))
            .map(|(name, spec)| {
                Stmt::AddColumn(AddColumnStmt::new(
                    self.qualified(table),
                    self.column_def(name, spec),
                ))
            })
            .collect();

        if !current.contains_key(UPDATED_AT) && desired.contains_key(UPDATED_AT) {
            script.extend(self.updated_at_trigger(table));
        }
        script
    }

    pub fn generate_alter_table(
        &self,
        table: &str,
        current: &IndexMap<String, ColumnSpec>,
        desired: &IndexMap<String, ColumnSpec>,
    ) -> String {
        tricycle_sql::render(&self.alter_table(table, current, desired))
    }

    /// One `CREATE INDEX IF NOT EXISTS idx_<table>_<column>` per column.
    pub fn create_indexes(&self, table: &str, columns: &[String]) -> Script {
        columns
            .iter()
            .map(|column| {
                Stmt::CreateIndex(CreateIndexStmt::new(
                    tricycle_sql::index_name(table, &[column]),
                    self.qualified(table),
                    vec![column.clone()],
                ))
            })
            .collect()
    }

    /// Function plus trigger that stamp `updated_at` on every update.
    pub fn updated_at_trigger(&self, table: &str) -> Script {
        let function = self.qualified(&tricycle_sql::updated_at_function_name(table));
        let trigger = tricycle_sql::updated_at_trigger_name(table);

        let mut script = Script::new();
        script.push(Stmt::CreateUpdatedAtFunction(UpdatedAtFunctionStmt {
            function: function.clone(),
            column: UPDATED_AT.to_string(),
        }));
        script.push(Stmt::DropTrigger(DropTriggerStmt {
            name: trigger.clone(),
            table: self.qualified(table),
            if_exists: true,
        }));
        script.push(Stmt::CreateTrigger(CreateTriggerStmt {
            name: trigger,
            table: self.qualified(table),
            function,
        }));
        script
    }

    /// Enable row-level security and install the table's policy, if it has one.
    pub fn row_level_security(&self, spec: &TableSpec) -> Script {
        let Some(policy) = &spec.row_level_security else {
            return Script::new();
        };

        let mut script = Script::new();
        script.push(Stmt::EnableRowLevelSecurity(self.qualified(&spec.name)));
        script.push(Stmt::CreatePolicy(CreatePolicyStmt {
            name: policy.name.clone(),
            table: self.qualified(&spec.name),
            command: policy.command,
            roles: policy.roles.clone(),
            using: policy.using.clone(),
            with_check: policy.with_check.clone(),
            if_not_exists: true,
        }));
        script
    }

    /// The full script for an empty database: every table in dependency
    /// order, then every row-level security block.
    pub fn bootstrap(&self) -> Vec<Script> {
        let tables = self.registry.tables().map(|t| self.create_table(t));
        let policies = self
            .registry
            .tables()
            .map(|t| self.row_level_security(t))
            .filter(|s| !s.is_empty());
        tables.chain(policies).collect()
    }

    /// [`DdlGenerator::bootstrap`] rendered, fragments separated by a blank line.
    pub fn bootstrap_script(&self) -> String {
        join_fragments(&self.bootstrap())
    }
}

/// Render fragments in order, separated by a blank line.
pub fn join_fragments(fragments: &[Script]) -> String {
    fragments
        .iter()
        .filter(|s| !s.is_empty())
        .map(tricycle_sql::render)
        .collect::<Vec<_>>()
        .join("\n\n")
}
