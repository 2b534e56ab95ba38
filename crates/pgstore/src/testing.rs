//! Shared fixtures for unit tests.

use crate::filter::OperatorRegistry;
use crate::keywords::{Dialect, KeywordClass, KeywordTable};
use crate::model::{prepare, EntityDescriptor, FieldDescriptor, FieldType, TimeRole};
use crate::schema::TypeRegistry;
use std::sync::Arc;

/// `public.models`: one column of each common shape.
pub(crate) fn models() -> EntityDescriptor {
    let mut entity = EntityDescriptor::new("Models")
        .field(FieldDescriptor::new("id", FieldType::I32).primary())
        .field(FieldDescriptor::new("attr_string", FieldType::String))
        .field(FieldDescriptor::new(
            "string_ptr",
            FieldType::optional(FieldType::String),
        ))
        .field(FieldDescriptor::new("int", FieldType::I32))
        .field(FieldDescriptor::new("created_at", FieldType::Timestamp).time_role(TimeRole::Created))
        .field(
            FieldDescriptor::new("updated_at", FieldType::optional(FieldType::Timestamp))
                .time_role(TimeRole::Updated),
        )
        .field(
            FieldDescriptor::new("deleted_at", FieldType::optional(FieldType::Timestamp))
                .time_role(TimeRole::Deleted),
        );
    prepare(&mut entity, "public", &TypeRegistry::new()).unwrap();
    entity
}

/// `public.widgets`: a not-null attribute and a skipped field.
pub(crate) fn widgets() -> EntityDescriptor {
    let mut entity = EntityDescriptor::new("Widget")
        .table("widgets")
        .field(FieldDescriptor::new("id", FieldType::I64).primary())
        .field(FieldDescriptor::new("name", FieldType::String).not_null())
        .field(FieldDescriptor::new("note", FieldType::optional(FieldType::String)))
        .field(FieldDescriptor::new("qty", FieldType::I32))
        .field(FieldDescriptor::new("cache", FieldType::String).skipped());
    prepare(&mut entity, "public", &TypeRegistry::new()).unwrap();
    entity
}

pub(crate) fn unchecked() -> Dialect {
    Dialect::unchecked(160_000)
}

/// A dialect that knows a few keywords of every class.
pub(crate) fn checked() -> Dialect {
    let table: KeywordTable = [
        ("int", KeywordClass::ReservedTypeFunc),
        ("select", KeywordClass::Reserved),
        ("between", KeywordClass::UnreservedRestricted),
        ("name", KeywordClass::Unreserved),
    ]
    .into_iter()
    .collect();
    Dialect::new(160_000, Arc::new(table))
}

pub(crate) fn operators() -> OperatorRegistry {
    OperatorRegistry::new()
}
