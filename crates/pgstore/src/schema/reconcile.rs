use crate::error::{OrmError, OrmResult};
use crate::keywords::Dialect;
use crate::model::{EntityDescriptor, ForeignRef, IndexMethod};
use crate::schema::{ColumnType, Constraint, LiveSchema, TypeRegistry, truncate_identifier};
use tracing::debug;

/// One schema change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DdlOp {
    /// `CREATE TABLE` with the inline columns as `(column, type)` pairs.
    CreateTable {
        schema: String,
        table: String,
        columns: Vec<(String, String)>,
    },
    AddColumn {
        schema: String,
        table: String,
        column: String,
        ty: String,
    },
    /// Creation statement of an external column type.
    External {
        schema: String,
        table: String,
        column: String,
        sql: String,
    },
    AddPrimaryKey {
        schema: String,
        table: String,
        column: String,
    },
    SetNotNull {
        schema: String,
        table: String,
        column: String,
    },
    DropNotNull {
        schema: String,
        table: String,
        column: String,
    },
    AddUnique {
        schema: String,
        table: String,
        column: String,
        constraint: String,
    },
    DropUnique {
        schema: String,
        table: String,
        constraint: String,
    },
    AddForeignKey {
        schema: String,
        table: String,
        column: String,
        references: ForeignRef,
    },
    CreateIndex {
        schema: String,
        table: String,
        name: String,
        unique: bool,
        method: IndexMethod,
        columns: Vec<String>,
    },
}

impl DdlOp {
    pub fn to_sql(&self, dialect: &Dialect) -> String {
        let q = |word: &str| dialect.quote(word).into_owned();
        match self {
            DdlOp::CreateTable {
                schema,
                table,
                columns,
            } => {
                let body: Vec<String> = columns
                    .iter()
                    .map(|(column, ty)| format!("{} {}", q(column), ty))
                    .collect();
                format!(
                    "CREATE TABLE IF NOT EXISTS {} (\n{}\n)",
                    dialect.qualified(schema, table),
                    body.join(",\n")
                )
            }
            DdlOp::AddColumn {
                schema,
                table,
                column,
                ty,
            } => format!(
                "ALTER TABLE {} ADD COLUMN {} {}",
                dialect.qualified(schema, table),
                q(column),
                ty
            ),
            DdlOp::External { sql, .. } => sql.clone(),
            DdlOp::AddPrimaryKey {
                schema,
                table,
                column,
            } => format!(
                "ALTER TABLE {} ADD PRIMARY KEY ({})",
                dialect.qualified(schema, table),
                q(column)
            ),
            DdlOp::SetNotNull {
                schema,
                table,
                column,
            } => format!(
                "ALTER TABLE {} ALTER COLUMN {} SET NOT NULL",
                dialect.qualified(schema, table),
                q(column)
            ),
            DdlOp::DropNotNull {
                schema,
                table,
                column,
            } => format!(
                "ALTER TABLE {} ALTER COLUMN {} DROP NOT NULL",
                dialect.qualified(schema, table),
                q(column)
            ),
            DdlOp::AddUnique {
                schema,
                table,
                column,
                constraint,
            } => format!(
                "ALTER TABLE {} ADD CONSTRAINT {} UNIQUE ({})",
                dialect.qualified(schema, table),
                q(constraint),
                q(column)
            ),
            DdlOp::DropUnique {
                schema,
                table,
                constraint,
            } => format!(
                "ALTER TABLE {} DROP CONSTRAINT {}",
                dialect.qualified(schema, table),
                q(constraint)
            ),
            DdlOp::AddForeignKey {
                schema,
                table,
                column,
                references,
            } => format!(
                "ALTER TABLE {} ADD FOREIGN KEY ({}) REFERENCES {} ({})",
                dialect.qualified(schema, table),
                q(column),
                dialect.qualified(&references.schema, &references.table),
                q(&references.column)
            ),
            DdlOp::CreateIndex {
                schema,
                table,
                name,
                unique,
                method,
                columns,
            } => {
                let columns: Vec<String> = columns.iter().map(|c| q(c)).collect();
                format!(
                    "CREATE {}INDEX {} ON {} USING {} ({})",
                    if *unique { "UNIQUE " } else { "" },
                    q(name),
                    dialect.qualified(schema, table),
                    method.as_sql(),
                    columns.join(", ")
                )
            }
        }
    }
}

/// Plans the DDL that brings a live schema in line with entity descriptors.
///
/// Planning is pure: ops are applied to a scratch copy of the live schema as they
/// are emitted, so later checks see earlier changes and a plan computed against
/// the result of applying it is empty.
#[derive(Debug, Clone, Copy)]
pub struct Reconciler<'r> {
    types: &'r TypeRegistry,
    dialect: &'r Dialect,
    index_prefix: &'r str,
}

impl<'r> Reconciler<'r> {
    pub fn new(types: &'r TypeRegistry, dialect: &'r Dialect) -> Self {
        Self {
            types,
            dialect,
            index_prefix: "",
        }
    }

    /// Prefix prepended to every managed index name.
    pub fn index_prefix(mut self, prefix: &'r str) -> Self {
        self.index_prefix = prefix;
        self
    }

    /// Ops for every entity, in entity order: table, columns, constraints, indexes.
    ///
    /// Foreign keys of all entities follow once every table has been planned.
    pub fn plan(
        &self,
        entities: &[&EntityDescriptor],
        live: &LiveSchema,
    ) -> OrmResult<Vec<DdlOp>> {
        let mut scratch = live.clone();
        let mut ops = Vec::new();
        for entity in entities {
            let start = ops.len();
            self.plan_entity(entity, &mut scratch, &mut ops)?;
            debug!(
                target: "pgstore::migrate",
                entity = %entity.name,
                ops = ops.len() - start,
                "planned schema changes"
            );
        }
        // Referenced tables may come later in `entities`.
        for entity in entities {
            plan_foreign_keys(entity, &mut scratch, &mut ops);
        }
        Ok(ops)
    }

    fn plan_entity(
        &self,
        entity: &EntityDescriptor,
        live: &mut LiveSchema,
        ops: &mut Vec<DdlOp>,
    ) -> OrmResult<()> {
        if entity.db_fields().next().is_none() {
            debug!(target: "pgstore::migrate", entity = %entity.name, "no columns, skipping");
            return Ok(());
        }
        let schema = entity.schema_name();
        let table = entity.table_name();
        let exists = live.has_table(schema, table);
        let mut inline = Vec::new();
        let mut external = Vec::new();
        for field in entity.db_fields() {
            if exists
                && live
                    .table(schema, table)
                    .is_some_and(|t| t.columns.contains(field.column_name()))
            {
                continue;
            }
            match self.types.resolve(entity, field)? {
                ColumnType::External(ext) => external.push(DdlOp::External {
                    schema: schema.to_string(),
                    table: table.to_string(),
                    column: field.column_name().to_string(),
                    sql: ext.create_statement(entity, field, self.dialect),
                }),
                ty => {
                    let sql = ty.inline_sql().transpose().map_err(|message| {
                        OrmError::unresolved_type(&entity.name, &field.name, message)
                    })?;
                    inline.push((field.column_name().to_string(), sql.unwrap_or_default()));
                }
            }
        }

        if !exists {
            emit(
                ops,
                live,
                DdlOp::CreateTable {
                    schema: schema.to_string(),
                    table: table.to_string(),
                    columns: inline,
                },
            );
        } else {
            for (column, ty) in inline {
                emit(
                    ops,
                    live,
                    DdlOp::AddColumn {
                        schema: schema.to_string(),
                        table: table.to_string(),
                        column,
                        ty,
                    },
                );
            }
        }
        for op in external {
            emit(ops, live, op);
        }

        for field in entity.db_fields() {
            for constraint in Constraint::ALL {
                if constraint == Constraint::ForeignKey {
                    continue;
                }
                let op = live
                    .table(schema, table)
                    .and_then(|t| constraint.reconcile(entity, field, t));
                if let Some(op) = op {
                    emit(ops, live, op);
                }
            }
        }

        for index in &entity.indexes {
            let Some(base) = &index.name else {
                return Err(OrmError::configuration(format!(
                    "index on entity '{}' has no name; prepare the entity first",
                    entity.name
                )));
            };
            let name = truncate_identifier(&format!("{}{}", self.index_prefix, base)).to_string();
            if live.has_index(schema, &name) {
                continue;
            }
            let columns = index
                .fields
                .iter()
                .map(|f| {
                    entity
                        .field_by_name(f)
                        .map(|field| field.column_name().to_string())
                        .ok_or_else(|| {
                            OrmError::configuration(format!(
                                "index '{}' references unknown field '{}'",
                                name, f
                            ))
                        })
                })
                .collect::<OrmResult<Vec<_>>>()?;
            emit(
                ops,
                live,
                DdlOp::CreateIndex {
                    schema: schema.to_string(),
                    table: table.to_string(),
                    name,
                    unique: index.unique,
                    method: index.method,
                    columns,
                },
            );
        }
        Ok(())
    }
}

fn plan_foreign_keys(entity: &EntityDescriptor, live: &mut LiveSchema, ops: &mut Vec<DdlOp>) {
    let (schema, table) = (entity.schema_name(), entity.table_name());
    for field in entity.db_fields() {
        let op = live
            .table(schema, table)
            .and_then(|t| Constraint::ForeignKey.reconcile(entity, field, t));
        if let Some(op) = op {
            emit(ops, live, op);
        }
    }
}

fn emit(ops: &mut Vec<DdlOp>, live: &mut LiveSchema, op: DdlOp) {
    live.apply(&op);
    ops.push(op);
}
