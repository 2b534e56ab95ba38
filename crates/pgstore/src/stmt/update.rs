use crate::error::{OrmError, OrmResult};
use crate::model::{EntityDescriptor, FieldSet, Model};
use crate::param::ParamSequencer;
use crate::stmt::{BulkFieldSet, Query, Statement, StatementCompiler};
use crate::value::Value;

impl StatementCompiler<'_> {
    /// Compile an update.
    ///
    /// With filters, or a single model whose primary key is unset, one statement
    /// updates every matching row from the values of that model. Otherwise each
    /// model gets `UPDATE ... WHERE pk = $n` with its primary key bound last;
    /// per-model field sets are grouped so models sharing a selection share a
    /// template. Statements come back in group order, then input order.
    pub fn update<M: Model>(&self, query: &Query<'_>, models: &[M]) -> OrmResult<Vec<Statement>> {
        let entity = query.entity;
        if !query.filters.is_empty() {
            return self.update_by_filter(query, models).map(|stmt| vec![stmt]);
        }

        match query.field_sets.len() {
            0 => Err(OrmError::invalid_field_set(format!(
                "update of {} without a field set",
                entity.name
            ))),
            1 => match models {
                [] => Err(OrmError::invalid_models(format!(
                    "update of {} without models",
                    entity.name
                ))),
                [model] if model.is_primary_key_zero(entity) => {
                    self.update_by_filter(query, models).map(|stmt| vec![stmt])
                }
                _ => {
                    let fields = prepare_update_field_set(entity, &query.field_sets[0])?;
                    let sql = self.update_template(entity, &fields)?;
                    Ok(models
                        .iter()
                        .map(|model| Statement::new(sql.clone(), bind_update(entity, &fields, model)))
                        .collect())
                }
            },
            n if n == models.len() => self.update_bulk(query, models),
            n => Err(OrmError::invalid_field_set(format!(
                "update of {}: {} field sets for {} models",
                entity.name,
                n,
                models.len()
            ))),
        }
    }

    /// `UPDATE ... SET ... WHERE <filters>`: one value source, any number of rows.
    fn update_by_filter<M: Model>(&self, query: &Query<'_>, models: &[M]) -> OrmResult<Statement> {
        let entity = query.entity;
        let [field_set] = query.field_sets.as_slice() else {
            return Err(OrmError::invalid_field_set(format!(
                "update of {} by filter takes exactly one field set, got {}",
                entity.name,
                query.field_sets.len()
            )));
        };
        let [model] = models else {
            return Err(OrmError::invalid_models(format!(
                "update of {} by filter takes exactly one model, got {}",
                entity.name,
                models.len()
            )));
        };
        let fields = prepare_update_field_set(entity, field_set)?;

        let mut seq = ParamSequencer::new();
        let mut values = Vec::with_capacity(fields.len());
        let mut sql = format!(
            "UPDATE {} SET {}",
            self.table(entity),
            self.assignments(&fields, &mut seq)
        );
        for field in fields.iter() {
            values.push(model.field_value(field));
        }

        if let Some(predicate) = self
            .filter_compiler()
            .compile_where(&query.filters, &mut seq)?
        {
            sql.push_str(" WHERE ");
            sql.push_str(&predicate.sql);
            values.extend(predicate.values);
        }
        Ok(Statement::new(sql, values))
    }

    fn update_bulk<M: Model>(&self, query: &Query<'_>, models: &[M]) -> OrmResult<Vec<Statement>> {
        let entity = query.entity;
        let bulk = BulkFieldSet::from_field_sets(
            query
                .field_sets
                .iter()
                .map(|fs| fs.iter().filter(|f| !f.is_skipped() && !f.is_primary()).collect()),
        );

        let mut statements = Vec::with_capacity(models.len());
        for group in bulk.groups() {
            if group.field_set.is_empty() {
                continue;
            }
            let sql = self.update_template(entity, &group.field_set)?;
            for &i in &group.indices {
                statements.push(Statement::new(
                    sql.clone(),
                    bind_update(entity, &group.field_set, &models[i]),
                ));
            }
        }
        if statements.is_empty() {
            return Err(OrmError::invalid_field_set(format!(
                "update of {} has no updatable fields",
                entity.name
            )));
        }
        Ok(statements)
    }

    /// `UPDATE schema.table SET c1 = $1, ... WHERE pk = $n`.
    fn update_template(&self, entity: &EntityDescriptor, fields: &FieldSet<'_>) -> OrmResult<String> {
        let pk = entity.require_primary()?;
        let mut seq = ParamSequencer::new();
        let mut sql = format!(
            "UPDATE {} SET {} WHERE {} = ",
            self.table(entity),
            self.assignments(fields, &mut seq),
            self.column(pk)
        );
        seq.write_placeholder(&mut sql);
        Ok(sql)
    }

    fn assignments(&self, fields: &FieldSet<'_>, seq: &mut ParamSequencer) -> String {
        fields
            .iter()
            .map(|f| format!("{} = {}", self.column(f), seq.placeholder()))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// SET values in field order, then the primary key.
fn bind_update<M: Model>(entity: &EntityDescriptor, fields: &FieldSet<'_>, model: &M) -> Vec<Value> {
    let mut values: Vec<_> = fields.iter().map(|f| model.field_value(f)).collect();
    values.push(model.primary_key_value(entity));
    values
}

/// Drop skipped and primary fields; nothing left to set is an error.
fn prepare_update_field_set<'a>(
    entity: &EntityDescriptor,
    field_set: &FieldSet<'a>,
) -> OrmResult<FieldSet<'a>> {
    let fields: FieldSet<'a> = field_set
        .iter()
        .filter(|f| !f.is_skipped() && !f.is_primary())
        .collect();
    if fields.is_empty() {
        return Err(OrmError::invalid_field_set(format!(
            "update of {} has no updatable fields",
            entity.name
        )));
    }
    Ok(fields)
}
