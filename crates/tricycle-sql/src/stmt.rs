//! DDL statements.

use crate::expr::{Expr, ReferentialAction, SqlType};

/// A DDL statement.
#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    CreateTable(CreateTableStmt),
    CreateIndex(CreateIndexStmt),
    AddColumn(AddColumnStmt),
    CreateUpdatedAtFunction(UpdatedAtFunctionStmt),
    DropTrigger(DropTriggerStmt),
    CreateTrigger(CreateTriggerStmt),
    EnableRowLevelSecurity(QualifiedName),
    CreatePolicy(CreatePolicyStmt),
}

/// A schema-qualified object name, e.g. `public.clientes`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QualifiedName {
    pub schema: String,
    pub name: String,
}

impl QualifiedName {
    pub fn new(schema: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            schema: schema.into(),
            name: name.into(),
        }
    }
}

/// A column definition, as used by CREATE TABLE and ADD COLUMN.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnDef {
    pub name: String,
    pub ty: SqlType,
    pub primary_key: bool,
    /// GENERATED BY DEFAULT AS IDENTITY
    pub identity: bool,
    pub not_null: bool,
    pub default: Option<Expr>,
    pub references: Option<References>,
}

impl ColumnDef {
    pub fn new(name: impl Into<String>, ty: SqlType) -> Self {
        Self {
            name: name.into(),
            ty,
            primary_key: false,
            identity: false,
            not_null: false,
            default: None,
            references: None,
        }
    }

    pub fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self
    }

    pub fn identity(mut self) -> Self {
        self.identity = true;
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

    pub fn references(mut self, references: References) -> Self {
        self.references = Some(references);
        self
    }
}

/// An inline REFERENCES clause.
#[derive(Debug, Clone, PartialEq)]
pub struct References {
    pub table: QualifiedName,
    pub column: String,
    pub on_delete: Option<ReferentialAction>,
}

// ============================================================================
// Tables and columns
// ============================================================================

/// CREATE TABLE [IF NOT EXISTS] ...
#[derive(Debug, Clone, PartialEq)]
pub struct CreateTableStmt {
    pub table: QualifiedName,
    pub if_not_exists: bool,
    pub columns: Vec<ColumnDef>,
}

impl CreateTableStmt {
    pub fn new(table: QualifiedName) -> Self {
        Self {
            table,
            if_not_exists: true,
            columns: Vec::new(),
        }
    }

    pub fn column(mut self, column: ColumnDef) -> Self {
        self.columns.push(column);
        self
    }
}

/// ALTER TABLE ... ADD COLUMN [IF NOT EXISTS] ...
#[derive(Debug, Clone, PartialEq)]
pub struct AddColumnStmt {
    pub table: QualifiedName,
    pub if_not_exists: bool,
    pub column: ColumnDef,
}

impl AddColumnStmt {
    pub fn new(table: QualifiedName, column: ColumnDef) -> Self {
        Self {
            table,
            if_not_exists: true,
            column,
        }
    }
}

/// CREATE INDEX [IF NOT EXISTS] name ON table (columns)
#[derive(Debug, Clone, PartialEq)]
pub struct CreateIndexStmt {
    pub name: String,
    pub table: QualifiedName,
    pub columns: Vec<String>,
    pub if_not_exists: bool,
}

impl CreateIndexStmt {
    pub fn new(name: impl Into<String>, table: QualifiedName, columns: Vec<String>) -> Self {
        Self {
            name: name.into(),
            table,
            columns,
            if_not_exists: true,
        }
    }
}

// ============================================================================
// Triggers
// ============================================================================

/// CREATE OR REPLACE FUNCTION that stamps `column` with now() on update.
#[derive(Debug, Clone, PartialEq)]
pub struct UpdatedAtFunctionStmt {
    pub function: QualifiedName,
    pub column: String,
}

/// DROP TRIGGER [IF EXISTS] name ON table
#[derive(Debug, Clone, PartialEq)]
pub struct DropTriggerStmt {
    pub name: String,
    pub table: QualifiedName,
    pub if_exists: bool,
}

/// CREATE TRIGGER name BEFORE UPDATE ON table FOR EACH ROW EXECUTE FUNCTION f()
#[derive(Debug, Clone, PartialEq)]
pub struct CreateTriggerStmt {
    pub name: String,
    pub table: QualifiedName,
    pub function: QualifiedName,
}

// ============================================================================
// Row-level security
// ============================================================================

/// Which commands a policy applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PolicyCommand {
    All,
    Select,
    Insert,
    Update,
    Delete,
}

impl PolicyCommand {
    pub fn as_str(self) -> &'static str {
        match self {
            PolicyCommand::All => "ALL",
            PolicyCommand::Select => "SELECT",
            PolicyCommand::Insert => "INSERT",
            PolicyCommand::Update => "UPDATE",
            PolicyCommand::Delete => "DELETE",
        }
    }
}

/// CREATE POLICY, optionally guarded by a `pg_policies` lookup.
///
/// Postgres has no `CREATE POLICY IF NOT EXISTS`, so the guarded form renders
/// as a `DO` block.
#[derive(Debug, Clone, PartialEq)]
pub struct CreatePolicyStmt {
    pub name: String,
    pub table: QualifiedName,
    pub command: PolicyCommand,
    pub roles: Vec<String>,
    /// Raw boolean expression for USING (...)
    pub using: String,
    /// Raw boolean expression for WITH CHECK (...)
    pub with_check: Option<String>,
    pub if_not_exists: bool,
}
