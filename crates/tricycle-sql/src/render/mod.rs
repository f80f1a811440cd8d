//! Render DDL AST to string.

use std::fmt;

use crate::stmt::*;
use crate::{Ident, Lit};

/// Wrapper for rendering a value via Display.
pub struct Fmt<'a, T: Render>(pub &'a T);

impl<T: Render> fmt::Display for Fmt<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.render(f)
    }
}

/// Trait for types that can be rendered to SQL.
pub trait Render {
    fn render(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result;
}

/// Render anything renderable to a SQL string.
pub fn render(item: &impl Render) -> String {
    Fmt(item).to_string()
}

/// An ordered list of statements, rendered one after the other.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Script {
    pub statements: Vec<Stmt>,
}

impl Script {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, stmt: Stmt) {
        self.statements.push(stmt);
    }

    pub fn extend(&mut self, other: Script) {
        self.statements.extend(other.statements);
    }

    pub fn is_empty(&self) -> bool {
        self.statements.is_empty()
    }

    pub fn len(&self) -> usize {
        self.statements.len()
    }
}

impl FromIterator<Stmt> for Script {
    fn from_iter<I: IntoIterator<Item = Stmt>>(iter: I) -> Self {
        Self {
            statements: iter.into_iter().collect(),
        }
    }
}

// ============================================================================
// Render implementations
// ============================================================================

impl Render for Script {
    fn render(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, stmt) in self.statements.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            stmt.render(f)?;
        }
        Ok(())
    }
}

impl Render for Stmt {
    fn render(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stmt::CreateTable(s) => s.render(f),
            Stmt::CreateIndex(s) => s.render(f),
            Stmt::AddColumn(s) => s.render(f),
            Stmt::CreateUpdatedAtFunction(s) => s.render(f),
            Stmt::DropTrigger(s) => s.render(f),
            Stmt::CreateTrigger(s) => s.render(f),
            Stmt::EnableRowLevelSecurity(table) => {
                let table = Fmt(table);
                write!(f, "ALTER TABLE {table} ENABLE ROW LEVEL SECURITY;")
            }
            Stmt::CreatePolicy(s) => s.render(f),
        }
    }
}

impl Render for QualifiedName {
    fn render(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let schema = Ident(&self.schema);
        let name = Ident(&self.name);
        write!(f, "{schema}.{name}")
    }
}

impl Render for ColumnDef {
    fn render(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = Ident(&self.name);
        write!(f, "{name} {}", self.ty)?;

        if self.primary_key {
            write!(f, " PRIMARY KEY")?;
        }
        if self.identity {
            write!(f, " GENERATED BY DEFAULT AS IDENTITY")?;
        }
        // PK columns are implicitly NOT NULL
        if self.not_null && !self.primary_key {
            write!(f, " NOT NULL")?;
        }
        if let Some(default) = &self.default {
            write!(f, " DEFAULT {default}")?;
        }
        if let Some(references) = &self.references {
            let table = Fmt(&references.table);
            let column = Ident(&references.column);
            write!(f, " REFERENCES {table}({column})")?;
            if let Some(action) = references.on_delete {
                write!(f, " ON DELETE {}", action.as_str())?;
            }
        }
        Ok(())
    }
}

impl Render for CreateTableStmt {
    fn render(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CREATE TABLE ")?;
        if self.if_not_exists {
            write!(f, "IF NOT EXISTS ")?;
        }
        writeln!(f, "{} (", Fmt(&self.table))?;
        for (i, column) in self.columns.iter().enumerate() {
            if i > 0 {
                writeln!(f, ",")?;
            }
            write!(f, "  {}", Fmt(column))?;
        }
        write!(f, "\n);")
    }
}

impl Render for AddColumnStmt {
    fn render(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let table = Fmt(&self.table);
        let column = Fmt(&self.column);
        let guard = if self.if_not_exists {
            "IF NOT EXISTS "
        } else {
            ""
        };
        write!(f, "ALTER TABLE {table} ADD COLUMN {guard}{column};")
    }
}

impl Render for CreateIndexStmt {
    fn render(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let guard = if self.if_not_exists {
            "IF NOT EXISTS "
        } else {
            ""
        };
        let name = Ident(&self.name);
        let table = Fmt(&self.table);
        write!(f, "CREATE INDEX {guard}{name} ON {table} (")?;
        for (i, column) in self.columns.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", Ident(column))?;
        }
        write!(f, ");")
    }
}

impl Render for UpdatedAtFunctionStmt {
    fn render(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let function = Fmt(&self.function);
        let column = Ident(&self.column);
        writeln!(f, "CREATE OR REPLACE FUNCTION {function}()")?;
        writeln!(f, "RETURNS trigger")?;
        writeln!(f, "LANGUAGE plpgsql")?;
        writeln!(f, "AS $$")?;
        writeln!(f, "BEGIN")?;
        writeln!(f, "  NEW.{column} = now();")?;
        writeln!(f, "  RETURN NEW;")?;
        writeln!(f, "END;")?;
        write!(f, "$$;")
    }
}

impl Render for DropTriggerStmt {
    fn render(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let guard = if self.if_exists { "IF EXISTS " } else { "" };
        let name = Ident(&self.name);
        let table = Fmt(&self.table);
        write!(f, "DROP TRIGGER {guard}{name} ON {table};")
    }
}

impl Render for CreateTriggerStmt {
    fn render(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = Ident(&self.name);
        let table = Fmt(&self.table);
        let function = Fmt(&self.function);
        write!(
            f,
            "CREATE TRIGGER {name} BEFORE UPDATE ON {table} FOR EACH ROW EXECUTE FUNCTION {function}();"
        )
    }
}

/// The bare `CREATE POLICY ...` text, without the existence guard.
struct PolicyBody<'a>(&'a CreatePolicyStmt);

impl Render for PolicyBody<'_> {
    fn render(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let stmt = self.0;
        let name = Ident(&stmt.name);
        let table = Fmt(&stmt.table);
        let command = stmt.command.as_str();
        write!(f, "CREATE POLICY {name} ON {table} FOR {command}")?;
        if !stmt.roles.is_empty() {
            write!(f, " TO ")?;
            for (i, role) in stmt.roles.iter().enumerate() {
                if i > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{}", Ident(role))?;
            }
        }
        write!(f, " USING ({})", stmt.using)?;
        if let Some(check) = &stmt.with_check {
            write!(f, " WITH CHECK ({check})")?;
        }
        write!(f, ";")
    }
}

impl Render for CreatePolicyStmt {
    fn render(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let body = Fmt(&PolicyBody(self));
        if !self.if_not_exists {
            return write!(f, "{body}");
        }

        let schema = Lit(&self.table.schema);
        let table = Lit(&self.table.name);
        let name = Lit(&self.name);
        writeln!(f, "DO $$")?;
        writeln!(f, "BEGIN")?;
        writeln!(f, "  IF NOT EXISTS (")?;
        writeln!(f, "    SELECT 1 FROM pg_policies")?;
        writeln!(
            f,
            "    WHERE schemaname = {schema} AND tablename = {table} AND policyname = {name}"
        )?;
        writeln!(f, "  ) THEN")?;
        writeln!(f, "    {body}")?;
        writeln!(f, "  END IF;")?;
        writeln!(f, "END")?;
        write!(f, "$$;")
    }
}

#[cfg(test)]
mod tests;
