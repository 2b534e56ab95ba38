use crate::error::{OrmError, OrmResult};
use crate::model::EntityDescriptor;
use crate::schema::TypeRegistry;
use heck::ToSnakeCase;
use std::collections::HashMap;

/// Fill in defaulted physical names and validate column types.
///
/// - schema defaults to `default_schema`, table to the snake_case logical name
/// - column names default to the snake_case field name
/// - positions follow declaration order
/// - unnamed indexes are named `<schema>_<table>_<column>[_unique]_idx_<n>`
///
/// Every non-skipped field must resolve through `types`. Running it again on a
/// prepared entity changes nothing.
pub fn prepare(
    entity: &mut EntityDescriptor,
    default_schema: &str,
    types: &TypeRegistry,
) -> OrmResult<()> {
    if entity.name.is_empty() {
        return Err(OrmError::configuration("entity without a name"));
    }
    if entity.schema.is_empty() {
        entity.schema = default_schema.to_string();
    }
    if entity.table.is_empty() {
        entity.table = entity.name.to_snake_case();
    }

    let mut primaries = 0;
    for (position, field) in entity.fields.iter_mut().enumerate() {
        field.position = position;
        if field.column.is_empty() {
            field.column = field.name.to_snake_case();
        }
        if field.is_primary() {
            primaries += 1;
        }
    }
    if primaries > 1 {
        return Err(OrmError::configuration(format!(
            "entity '{}' declares {primaries} primary key fields",
            entity.name
        )));
    }

    for field in entity.db_fields() {
        types.resolve(entity, field)?;
    }

    let mut ordinals: HashMap<String, usize> = HashMap::new();
    let mut names = Vec::with_capacity(entity.indexes.len());
    for index in &entity.indexes {
        let Some(first) = index.fields.first() else {
            return Err(OrmError::configuration(format!(
                "entity '{}' declares an index without fields",
                entity.name
            )));
        };
        for name in &index.fields {
            match entity.field_by_name(name) {
                Some(field) if !field.is_skipped() => {}
                _ => {
                    return Err(OrmError::configuration(format!(
                        "index on entity '{}' references unknown field '{}'",
                        entity.name, name
                    )));
                }
            }
        }

        let column = entity
            .field_by_name(first)
            .map(|f| f.column_name().to_string())
            .unwrap_or_default();
        let ordinal = ordinals.entry(column.clone()).or_insert(0);
        *ordinal += 1;
        names.push(index.name.clone().unwrap_or_else(|| {
            let unique = if index.unique { "_unique" } else { "" };
            format!(
                "{}_{}_{}{}_idx_{}",
                entity.schema, entity.table, column, unique, ordinal
            )
        }));
    }
    for (index, name) in entity.indexes.iter_mut().zip(names) {
        index.name = Some(name);
    }

    Ok(())
}
