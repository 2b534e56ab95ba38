use crate::error::{OrmError, OrmResult};
use crate::model::FieldDescriptor;
use crate::param::ParamSequencer;
use crate::stmt::{Query, Statement, StatementCompiler};
use crate::value::Value;
use tracing::debug;

/// A compiled `SELECT` and the field order of its column list.
///
/// Row column `i` belongs to `fields[i]`; pass both to
/// [`materialize`](crate::stmt::materialize).
#[derive(Debug, Clone)]
pub struct SelectStatement<'a> {
    pub statement: Statement,
    pub fields: Vec<&'a FieldDescriptor>,
}

impl StatementCompiler<'_> {
    /// `SELECT cols FROM schema.table [WHERE ...] [ORDER BY ...] [LIMIT $n] [OFFSET $m]`.
    ///
    /// With no field set every column is selected.
    pub fn select<'a>(&self, query: &Query<'a>) -> OrmResult<SelectStatement<'a>> {
        let entity = query.entity;
        let fields: Vec<&'a FieldDescriptor> = match query.field_sets.as_slice() {
            [] => entity.all_fields().iter().collect(),
            [field_set] => field_set.iter().filter(|f| !f.is_skipped()).collect(),
            _ => {
                return Err(OrmError::invalid_field_set(format!(
                    "select on {} takes at most one field set, got {}",
                    entity.name,
                    query.field_sets.len()
                )));
            }
        };
        if fields.is_empty() {
            return Err(OrmError::invalid_field_set(format!(
                "select on {} has no columns",
                entity.name
            )));
        }

        let columns: Vec<String> = fields.iter().map(|f| self.column(f)).collect();
        let mut sql = format!(
            "SELECT {} FROM {}",
            columns.join(", "),
            self.table(entity)
        );

        let mut seq = ParamSequencer::new();
        let mut values = Vec::new();
        if let Some(predicate) = self
            .filter_compiler()
            .compile_where(&query.filters, &mut seq)?
        {
            sql.push_str(" WHERE ");
            sql.push_str(&predicate.sql);
            values = predicate.values;
        }

        let order: Vec<String> = query
            .sorting
            .iter()
            .filter(|sort| {
                if sort.field.is_skipped() {
                    debug!(
                        target: "pgstore::sql",
                        field = %sort.field.name,
                        "dropping sort on skipped field"
                    );
                    return false;
                }
                true
            })
            .map(|sort| format!("{} {}", self.column(sort.field), sort.order.as_sql()))
            .collect();
        if !order.is_empty() {
            sql.push_str(" ORDER BY ");
            sql.push_str(&order.join(", "));
        }

        let page = query.pagination;
        if page.limit != 0 {
            sql.push_str(" LIMIT ");
            seq.write_placeholder(&mut sql);
            values.push(Value::I64(page.limit));
        }
        if page.offset != 0 {
            sql.push_str(" OFFSET ");
            seq.write_placeholder(&mut sql);
            values.push(Value::I64(page.offset));
        }

        Ok(SelectStatement {
            statement: Statement::new(sql, values).returning_rows(),
            fields,
        })
    }
}
