//! Additive differences between the registry and the live database.
//!
//! Only things that can be added without touching existing data are
//! detected: missing tables, missing columns, missing indexes. A column
//! whose type, nullability or default differs from the registry is left
//! alone.

use indexmap::IndexMap;
use tricycle_schema::{ColumnSpec, Registry, TableSpec};

use crate::introspect::{LiveSchema, LiveTable};

/// What the live database lacks compared to the registry.
///
/// Tables appear in registry (dependency) order; columns in declaration order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SchemaDelta {
    pub tables_to_create: Vec<TableSpec>,
    pub columns_to_add: IndexMap<String, IndexMap<String, ColumnSpec>>,
    pub indexes_to_add: IndexMap<String, Vec<String>>,
}

impl SchemaDelta {
    /// Compute the additive delta from `live` to `registry`.
    pub fn between(registry: &Registry, live: &LiveSchema) -> Self {
        let mut delta = SchemaDelta::default();

        for table in registry.tables() {
            let Some(current) = live.get(&table.name) else {
                delta.tables_to_create.push(table.clone());
                continue;
            };

            let columns = missing_columns(current, table);
            if !columns.is_empty() {
                delta.columns_to_add.insert(table.name.clone(), columns);
            }

            let indexes: Vec<String> = table
                .indexes
                .iter()
                .filter(|c| !current.indexed_columns.contains(*c))
                .cloned()
                .collect();
            if !indexes.is_empty() {
                delta.indexes_to_add.insert(table.name.clone(), indexes);
            }
        }

        delta
    }

    /// Everything the registry declares, as if the database were empty.
    pub fn everything(registry: &Registry) -> Self {
        Self {
            tables_to_create: registry.tables().cloned().collect(),
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.tables_to_create.is_empty()
            && self.columns_to_add.is_empty()
            && self.indexes_to_add.is_empty()
    }

    /// Count of tables, columns and indexes to add.
    pub fn change_count(&self) -> usize {
        self.tables_to_create.len()
            + self.columns_to_add.values().map(|c| c.len()).sum::<usize>()
            + self.indexes_to_add.values().map(|i| i.len()).sum::<usize>()
    }
}

/// Columns declared on `desired` that `current` lacks, in declaration order.
pub fn missing_columns(current: &LiveTable, desired: &TableSpec) -> IndexMap<String, ColumnSpec> {
    desired
        .columns
        .iter()
        .filter(|(name, _)| !current.columns.contains_key(*name))
        .map(|(name, spec)| (name.clone(), spec.clone()))
        .collect()
}

impl std::fmt::Display for SchemaDelta {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_empty() {
            return writeln!(f, "No changes detected.");
        }

        writeln!(f, "Changes detected:\n")?;
        for table in &self.tables_to_create {
            writeln!(f, "  + table {} ({} columns)", table.name, table.columns.len())?;
        }

        // Group column and index additions per table, in the order tables were met.
        let mut touched: Vec<&str> = self.columns_to_add.keys().map(|k| k.as_str()).collect();
        for table in self.indexes_to_add.keys() {
            if !touched.contains(&table.as_str()) {
                touched.push(table);
            }
        }
        for table in touched {
            writeln!(f, "  {}:", table)?;
            if let Some(columns) = self.columns_to_add.get(table) {
                for (name, spec) in columns {
                    let nullable = if spec.not_null { "" } else { " (nullable)" };
                    writeln!(f, "    + {}: {}{}", name, spec.sql_type, nullable)?;
                }
            }
            if let Some(indexes) = self.indexes_to_add.get(table) {
                for column in indexes {
                    writeln!(f, "    + index on {}", column)?;
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tricycle_schema::SqlType;

    fn registry() -> Registry {
        Registry::new(
            vec![
                TableSpec::new("clientes")
                    .column(
                        "id",
                        ColumnSpec::new(SqlType::Integer).primary_key().auto_increment(),
                    )
                    .column("nombre", ColumnSpec::new(SqlType::Text).not_null())
                    .column("email", ColumnSpec::new(SqlType::Text))
                    .index("email"),
                TableSpec::new("tareas").column(
                    "id",
                    ColumnSpec::new(SqlType::Integer).primary_key().auto_increment(),
                ),
            ],
        )
        .unwrap()
    }

    fn live_clientes(columns: &[&str], indexed: &[&str]) -> LiveSchema {
        let mut table = LiveTable::default();
        for name in columns {
            table
                .columns
                .insert(name.to_string(), ColumnSpec::new(SqlType::Integer));
        }
        table.indexed_columns = indexed.iter().map(|s| s.to_string()).collect();
        let mut live = LiveSchema::new();
        live.tables.insert("clientes".to_string(), table);
        live
    }

    #[test]
    fn test_empty_database_needs_every_table() {
        let registry = registry();
        let delta = SchemaDelta::between(&registry, &LiveSchema::new());
        assert_eq!(delta, SchemaDelta::everything(&registry));
        assert_eq!(delta.change_count(), 2);
    }

    #[test]
    fn test_missing_column_and_index() {
        let delta = SchemaDelta::between(&registry(), &live_clientes(&["id", "nombre"], &[]));

        let names: Vec<&str> = delta.tables_to_create.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["tareas"]);
        assert_eq!(
            delta.columns_to_add["clientes"].keys().collect::<Vec<_>>(),
            vec!["email"]
        );
        assert_eq!(delta.indexes_to_add["clientes"], vec!["email".to_string()]);
        insta::assert_snapshot!(delta.to_string(), @r"
Changes detected:

  + table tareas (1 columns)
  clientes:
    + email: text (nullable)
    + index on email
");
    }

    #[test]
    fn test_drifted_columns_are_ignored() {
        // every live column is typed integer, the registry says text: no change
        let mut live = live_clientes(&["id", "nombre", "email"], &["email"]);
        let mut tareas = LiveTable::default();
        tareas
            .columns
            .insert("id".to_string(), ColumnSpec::new(SqlType::Integer));
        live.tables.insert("tareas".to_string(), tareas);

        let delta = SchemaDelta::between(&registry(), &live);
        assert!(delta.is_empty(), "{delta}");
        assert_eq!(delta.to_string(), "No changes detected.\n");
    }

    #[test]
    fn test_extra_live_columns_are_kept() {
        let live = live_clientes(&["id", "nombre", "email", "legacy_code"], &["email"]);
        let delta = SchemaDelta::between(&registry(), &live);
        assert!(delta.columns_to_add.is_empty());
        assert!(delta.indexes_to_add.is_empty());
    }
}
