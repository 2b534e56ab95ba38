use crate::error::{OrmError, OrmResult};
use crate::model::{EntityDescriptor, FieldSet, Model};
use crate::param::ParamSequencer;
use crate::stmt::{BulkFieldSet, Query, Statement, StatementCompiler};

/// One `INSERT` of a batch and the input positions of the models it writes.
///
/// When the statement returns keys, row `i` of its result belongs to the model at
/// `indices[i]`.
#[derive(Debug, Clone, PartialEq)]
pub struct InsertGroup {
    pub statement: Statement,
    pub indices: Vec<usize>,
}

impl InsertGroup {
    pub fn returns_keys(&self) -> bool {
        self.statement.returns_rows
    }
}

impl StatementCompiler<'_> {
    /// Compile an insert of `models`.
    ///
    /// A single field set governs every model and yields one statement. Otherwise
    /// the query must carry one field set per model; models are then grouped by
    /// identical column selection and one statement is produced per group, in
    /// first-seen order.
    pub fn insert<M: Model>(&self, query: &Query<'_>, models: &[M]) -> OrmResult<Vec<InsertGroup>> {
        let entity = query.entity;
        if models.is_empty() {
            return Err(OrmError::invalid_models(format!(
                "insert into {} without models",
                entity.name
            )));
        }

        match query.field_sets.len() {
            0 => Err(OrmError::invalid_field_set(format!(
                "insert into {} without a field set",
                entity.name
            ))),
            1 => {
                let mut seq = ParamSequencer::new();
                let statement =
                    self.render_insert(entity, &query.field_sets[0], models.iter(), &mut seq);
                Ok(vec![InsertGroup {
                    statement,
                    indices: (0..models.len()).collect(),
                }])
            }
            n if n == models.len() => {
                let bulk =
                    BulkFieldSet::from_field_sets(query.field_sets.iter().map(without_skipped));
                let mut seq = ParamSequencer::new();
                let mut groups = Vec::with_capacity(bulk.len());
                for group in bulk.into_groups() {
                    seq.reset();
                    let statement = self.render_insert(
                        entity,
                        &group.field_set,
                        group.indices.iter().map(|&i| &models[i]),
                        &mut seq,
                    );
                    groups.push(InsertGroup {
                        statement,
                        indices: group.indices,
                    });
                }
                Ok(groups)
            }
            n => Err(OrmError::invalid_field_set(format!(
                "insert into {}: {} field sets for {} models",
                entity.name,
                n,
                models.len()
            ))),
        }
    }

    /// Selected fields plus the not-null columns added on the caller's behalf.
    fn prepare_insert_field_set<'a>(
        &self,
        entity: &'a EntityDescriptor,
        field_set: &FieldSet<'a>,
    ) -> (FieldSet<'a>, FieldSet<'a>) {
        let mut fields = without_skipped(field_set);
        let mut auto = FieldSet::new();
        if self.select_not_nulls_on_insert {
            for field in entity.db_fields() {
                if field.not_null && !field.is_primary() && !fields.contains(field) {
                    fields.push(field);
                    auto.push(field);
                }
            }
        }
        (fields.sorted(), auto)
    }

    fn render_insert<'a, 'm, M, I>(
        &self,
        entity: &'a EntityDescriptor,
        field_set: &FieldSet<'a>,
        models: I,
        seq: &mut ParamSequencer,
    ) -> Statement
    where
        M: Model + 'm,
        I: Iterator<Item = &'m M>,
    {
        let (fields, auto) = self.prepare_insert_field_set(entity, field_set);
        let mut sql = format!("INSERT INTO {}", self.table(entity));
        let mut values = Vec::new();

        if fields.is_empty() {
            let defaults: Vec<&str> = models.map(|_| "(DEFAULT)").collect();
            sql.push_str(" VALUES ");
            sql.push_str(&defaults.join(","));
        } else {
            let columns: Vec<String> = fields.iter().map(|f| self.column(f)).collect();
            sql.push_str(&format!(" ({}) VALUES ", columns.join(",")));
            let mut tuples = Vec::new();
            for model in models {
                let mut placeholders = Vec::with_capacity(fields.len());
                for field in fields.iter() {
                    placeholders.push(seq.placeholder());
                    values.push(if auto.contains(field) {
                        field.ty.zero_value()
                    } else {
                        model.field_value(field)
                    });
                }
                tuples.push(format!("({})", placeholders.join(",")));
            }
            sql.push_str(&tuples.join(","));
        }

        match entity.primary() {
            Some(pk) if !fields.contains(pk) => {
                sql.push_str(" RETURNING ");
                sql.push_str(&self.column(pk));
                Statement::new(sql, values).returning_rows()
            }
            _ => Statement::new(sql, values),
        }
    }
}

fn without_skipped<'a>(field_set: &FieldSet<'a>) -> FieldSet<'a> {
    field_set.iter().filter(|f| !f.is_skipped()).collect()
}
