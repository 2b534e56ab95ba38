use super::*;
use crate::error::OrmError;
use crate::schema::TypeRegistry;
use crate::value::Value;
use chrono::{DateTime, Utc};

fn order_entity() -> EntityDescriptor {
    EntityDescriptor::new("OrderLine")
        .field(FieldDescriptor::new("id", FieldType::I64).primary())
        .field(FieldDescriptor::new("productCode", FieldType::String).not_null())
        .field(FieldDescriptor::new("quantity", FieldType::I32))
        .field(FieldDescriptor::new("scratch", FieldType::String).skipped())
        .index(IndexDescriptor::on(["productCode"]))
        .index(IndexDescriptor::on(["productCode", "quantity"]).unique())
        .index(IndexDescriptor::on(["quantity"]).named("by_qty"))
}

#[test]
fn prepare_defaults_physical_names() {
    let mut entity = order_entity();
    prepare(&mut entity, "sales", &TypeRegistry::new()).unwrap();

    assert_eq!(entity.schema, "sales");
    assert_eq!(entity.table, "order_line");
    let columns: Vec<&str> = entity.fields.iter().map(|f| f.column_name()).collect();
    assert_eq!(columns, ["id", "product_code", "quantity", "scratch"]);
    let positions: Vec<usize> = entity.fields.iter().map(|f| f.position).collect();
    assert_eq!(positions, [0, 1, 2, 3]);
}

#[test]
fn prepare_names_indexes_per_leading_column() {
    let mut entity = order_entity();
    prepare(&mut entity, "public", &TypeRegistry::new()).unwrap();

    let names: Vec<&str> = entity
        .indexes
        .iter()
        .map(|i| i.name.as_deref().unwrap())
        .collect();
    assert_eq!(
        names,
        [
            "public_order_line_product_code_idx_1",
            "public_order_line_product_code_unique_idx_2",
            "by_qty",
        ]
    );
}

#[test]
fn prepare_is_idempotent() {
    let types = TypeRegistry::new();
    let mut once = order_entity();
    prepare(&mut once, "public", &types).unwrap();
    let mut twice = once.clone();
    prepare(&mut twice, "public", &types).unwrap();
    assert_eq!(once, twice);
}

#[test]
fn prepare_rejects_two_primary_keys() {
    let mut entity = EntityDescriptor::new("Pair")
        .field(FieldDescriptor::new("a", FieldType::I32).primary())
        .field(FieldDescriptor::new("b", FieldType::I32).primary());
    let err = prepare(&mut entity, "public", &TypeRegistry::new()).unwrap_err();
    assert!(matches!(err, OrmError::Configuration(_)));
}

#[test]
fn prepare_reports_unresolved_types() {
    let mut entity = EntityDescriptor::new("Blob")
        .field(FieldDescriptor::new("id", FieldType::I32).primary())
        .field(FieldDescriptor::new("payload", FieldType::I32).column_type("geometry(point)"));
    let err = prepare(&mut entity, "public", &TypeRegistry::new()).unwrap_err();
    match err {
        OrmError::UnresolvedType { entity, field, .. } => {
            assert_eq!(entity, "Blob");
            assert_eq!(field, "payload");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn prepare_rejects_index_on_unknown_field() {
    let mut entity = EntityDescriptor::new("Thing")
        .field(FieldDescriptor::new("id", FieldType::I32).primary())
        .index(IndexDescriptor::on(["missing"]));
    assert!(prepare(&mut entity, "public", &TypeRegistry::new()).is_err());
}

#[test]
fn field_set_dedupes_and_sorts_by_declaration() {
    let mut entity = order_entity();
    prepare(&mut entity, "public", &TypeRegistry::new()).unwrap();

    let set = entity
        .field_set(&["quantity", "id", "quantity", "product_code"])
        .unwrap();
    assert_eq!(set.len(), 3);
    assert_eq!(set.canonical_key(), ["id", "product_code", "quantity"]);

    let names: Vec<&str> = set.sorted().iter().map(|f| f.name.as_str()).collect();
    assert_eq!(names, ["id", "productCode", "quantity"]);

    assert!(entity.field_set(&["nope"]).is_err());
}

#[test]
fn all_fields_excludes_skipped() {
    let entity = order_entity();
    assert_eq!(entity.all_fields().len(), 3);
    assert!(!entity
        .all_fields()
        .iter()
        .any(|f| f.name == "scratch"));
}

#[test]
fn zero_values() {
    assert_eq!(FieldType::U8.zero_value(), Value::I16(0));
    assert_eq!(FieldType::U16.zero_value(), Value::I32(0));
    assert_eq!(FieldType::U32.zero_value(), Value::I64(0));
    assert_eq!(
        FieldType::Timestamp.zero_value(),
        Value::Timestamp(DateTime::<Utc>::UNIX_EPOCH)
    );
    assert_eq!(FieldType::optional(FieldType::I64).zero_value(), Value::Null);
    assert_eq!(FieldType::bytes().zero_value(), Value::Bytes(vec![]));
    assert_eq!(
        FieldType::array(FieldType::I32, 2).zero_value(),
        Value::Array(vec![Value::I32(0), Value::I32(0)])
    );
    assert_eq!(
        FieldType::named("Stamp", FieldType::Timestamp).zero_value(),
        FieldType::Timestamp.zero_value()
    );
}

#[test]
fn time_detection_sees_through_wrappers() {
    assert!(FieldType::optional(FieldType::named("Stamp", FieldType::Timestamp)).is_time());
    assert!(FieldType::Date.is_time());
    assert!(!FieldType::optional(FieldType::String).is_time());
}

#[test]
fn record_primary_key_helpers() {
    let entity = order_entity();
    let mut record = Record::new().with("quantity", 2);
    assert!(record.is_primary_key_zero(&entity));

    record.set("id", 0i64);
    assert!(record.is_primary_key_zero(&entity));

    record.set_primary_key(&entity, Value::I64(41)).unwrap();
    assert!(!record.is_primary_key_zero(&entity));
    assert_eq!(record.primary_key_value(&entity), Value::I64(41));
}

#[test]
fn record_zero_value_reset() {
    let entity = order_entity();
    let quantity = entity.field_by_name("quantity").unwrap();
    let mut record = Record::new().with("quantity", 9);
    record.set_field_zero_value(quantity).unwrap();
    assert_eq!(record.get("quantity"), Some(&Value::I32(0)));
}
