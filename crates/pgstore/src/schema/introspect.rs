//! Snapshot of the live schema the reconciler diffs against.

use crate::client::Executor;
use crate::error::OrmResult;
use crate::row::RowExt;
use crate::schema::DdlOp;
use std::collections::{BTreeMap, BTreeSet};

/// Columns and managed constraints of one live table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LiveTable {
    pub columns: BTreeSet<String>,
    pub not_null: BTreeSet<String>,
    pub primary_key: BTreeSet<String>,
    pub foreign_keys: BTreeSet<String>,
    /// Names of `UNIQUE` constraints.
    pub unique_constraints: BTreeSet<String>,
}

/// Tables and indexes present in a set of schemas.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LiveSchema {
    tables: BTreeMap<(String, String), LiveTable>,
    /// `(schema, index name)`.
    indexes: BTreeSet<(String, String)>,
}

const TABLES_SQL: &str = "SELECT table_schema, table_name FROM information_schema.tables \
     WHERE table_type = 'BASE TABLE' AND table_schema = ANY($1::text[])";

const COLUMNS_SQL: &str = "SELECT table_schema, table_name, column_name, is_nullable \
     FROM information_schema.columns WHERE table_schema = ANY($1::text[])";

const CONSTRAINTS_SQL: &str = r#"
SELECT
  tc.table_schema,
  tc.table_name,
  tc.constraint_name,
  tc.constraint_type,
  kcu.column_name
FROM information_schema.table_constraints tc
JOIN information_schema.key_column_usage kcu
  ON kcu.constraint_name = tc.constraint_name
 AND kcu.table_schema = tc.table_schema
 AND kcu.table_name = tc.table_name
WHERE tc.table_schema = ANY($1::text[])
  AND tc.constraint_type IN ('PRIMARY KEY', 'UNIQUE', 'FOREIGN KEY')
"#;

const INDEXES_SQL: &str =
    "SELECT schemaname, indexname FROM pg_indexes WHERE schemaname = ANY($1::text[])";

impl LiveSchema {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read tables, columns, constraints and indexes of `schemas`.
    pub async fn load<E: Executor>(executor: &E, schemas: &[String]) -> OrmResult<Self> {
        let mut live = Self::new();

        for row in executor.query(TABLES_SQL, &[&schemas]).await? {
            let schema: String = row.try_get_column("table_schema")?;
            let table: String = row.try_get_column("table_name")?;
            live.tables.entry((schema, table)).or_default();
        }

        for row in executor.query(COLUMNS_SQL, &[&schemas]).await? {
            let schema: String = row.try_get_column("table_schema")?;
            let table: String = row.try_get_column("table_name")?;
            let column: String = row.try_get_column("column_name")?;
            let nullable: String = row.try_get_column("is_nullable")?;
            // Views show up in information_schema.columns too.
            let Some(live_table) = live.tables.get_mut(&(schema, table)) else {
                continue;
            };
            if nullable == "NO" {
                live_table.not_null.insert(column.clone());
            }
            live_table.columns.insert(column);
        }

        for row in executor.query(CONSTRAINTS_SQL, &[&schemas]).await? {
            let schema: String = row.try_get_column("table_schema")?;
            let table: String = row.try_get_column("table_name")?;
            let name: String = row.try_get_column("constraint_name")?;
            let kind: String = row.try_get_column("constraint_type")?;
            let column: String = row.try_get_column("column_name")?;
            let Some(live_table) = live.tables.get_mut(&(schema, table)) else {
                continue;
            };
            match kind.as_str() {
                "PRIMARY KEY" => {
                    live_table.primary_key.insert(column);
                }
                "FOREIGN KEY" => {
                    live_table.foreign_keys.insert(column);
                }
                _ => {
                    live_table.unique_constraints.insert(name);
                }
            }
        }

        for row in executor.query(INDEXES_SQL, &[&schemas]).await? {
            let schema: String = row.try_get_column("schemaname")?;
            let name: String = row.try_get_column("indexname")?;
            live.indexes.insert((schema, name));
        }

        Ok(live)
    }

    pub fn table(&self, schema: &str, table: &str) -> Option<&LiveTable> {
        self.tables.get(&(schema.to_string(), table.to_string()))
    }

    pub fn has_table(&self, schema: &str, table: &str) -> bool {
        self.table(schema, table).is_some()
    }

    pub fn has_index(&self, schema: &str, name: &str) -> bool {
        self.indexes
            .contains(&(schema.to_string(), name.to_string()))
    }

    pub fn table_count(&self) -> usize {
        self.tables.len()
    }

    /// Insert or replace a table.
    pub fn insert_table(
        &mut self,
        schema: impl Into<String>,
        table: impl Into<String>,
        live: LiveTable,
    ) {
        self.tables.insert((schema.into(), table.into()), live);
    }

    pub fn insert_index(&mut self, schema: impl Into<String>, name: impl Into<String>) {
        self.indexes.insert((schema.into(), name.into()));
    }

    fn table_mut(&mut self, schema: &str, table: &str) -> &mut LiveTable {
        self.tables
            .entry((schema.to_string(), table.to_string()))
            .or_default()
    }

    /// Record the effect `op` has on the server.
    pub fn apply(&mut self, op: &DdlOp) {
        match op {
            DdlOp::CreateTable {
                schema,
                table,
                columns,
            } => {
                let live = self.table_mut(schema, table);
                live.columns
                    .extend(columns.iter().map(|(column, _)| column.clone()));
            }
            DdlOp::AddColumn {
                schema,
                table,
                column,
                ..
            }
            | DdlOp::External {
                schema,
                table,
                column,
                ..
            } => {
                self.table_mut(schema, table).columns.insert(column.clone());
            }
            DdlOp::AddPrimaryKey {
                schema,
                table,
                column,
            } => {
                let live = self.table_mut(schema, table);
                live.primary_key.insert(column.clone());
                live.not_null.insert(column.clone());
            }
            DdlOp::SetNotNull {
                schema,
                table,
                column,
            } => {
                self.table_mut(schema, table).not_null.insert(column.clone());
            }
            DdlOp::DropNotNull {
                schema,
                table,
                column,
            } => {
                self.table_mut(schema, table).not_null.remove(column);
            }
            DdlOp::AddUnique {
                schema,
                table,
                constraint,
                ..
            } => {
                self.table_mut(schema, table)
                    .unique_constraints
                    .insert(constraint.clone());
            }
            DdlOp::DropUnique {
                schema,
                table,
                constraint,
            } => {
                self.table_mut(schema, table)
                    .unique_constraints
                    .remove(constraint);
            }
            DdlOp::AddForeignKey {
                schema,
                table,
                column,
                ..
            } => {
                self.table_mut(schema, table)
                    .foreign_keys
                    .insert(column.clone());
            }
            DdlOp::CreateIndex { schema, name, .. } => {
                self.insert_index(schema.clone(), name.clone());
            }
        }
    }
}
