use crate::error::{OrmError, OrmResult};
use crate::model::{FieldDescriptor, Model};
use crate::value::Value;
use tokio_postgres::Row;

/// Write the columns of `row` into `model`; column `i` belongs to `fields[i]`.
pub fn materialize<M: Model>(model: &mut M, fields: &[&FieldDescriptor], row: &Row) -> OrmResult<()> {
    if row.len() != fields.len() {
        return Err(OrmError::decode(
            "*",
            format!("row has {} columns, expected {}", row.len(), fields.len()),
        ));
    }
    let mut values = Vec::with_capacity(fields.len());
    for (i, field) in fields.iter().enumerate() {
        let value: Value = row
            .try_get(i)
            .map_err(|e| OrmError::decode(field.column_name(), e.to_string()))?;
        values.push(value);
    }
    materialize_values(model, fields, values)
}

/// Write already scanned values into `model`.
///
/// A NULL in a time column resets the field to its zero value.
pub fn materialize_values<M: Model>(
    model: &mut M,
    fields: &[&FieldDescriptor],
    values: Vec<Value>,
) -> OrmResult<()> {
    if values.len() != fields.len() {
        return Err(OrmError::decode(
            "*",
            format!("got {} values for {} fields", values.len(), fields.len()),
        ));
    }
    for (field, value) in fields.iter().zip(values) {
        if value.is_null() && field.ty.is_time() {
            model.set_field_zero_value(field)?;
        } else {
            model.set_field_value(field, value)?;
        }
    }
    Ok(())
}
