use crate::error::OrmResult;
use crate::model::{EntityDescriptor, FieldDescriptor};
use crate::value::Value;
use std::collections::HashMap;

/// Access to the field values of one entity instance.
///
/// Statement builders read values through this trait and the row materializer
/// writes scanned values back through it.
pub trait Model {
    /// Current value of `field`; `Value::Null` when unset.
    fn field_value(&self, field: &FieldDescriptor) -> Value;

    fn set_field_value(&mut self, field: &FieldDescriptor, value: Value) -> OrmResult<()>;

    /// Reset `field` to its type's zero value.
    fn set_field_zero_value(&mut self, field: &FieldDescriptor) -> OrmResult<()> {
        self.set_field_value(field, field.ty.zero_value())
    }

    fn primary_key_value(&self, entity: &EntityDescriptor) -> Value {
        entity
            .primary()
            .map_or(Value::Null, |pk| self.field_value(pk))
    }

    /// Whether the primary key is unset (null or its type's zero value).
    fn is_primary_key_zero(&self, entity: &EntityDescriptor) -> bool {
        match entity.primary() {
            Some(pk) => {
                let value = self.field_value(pk);
                if value.is_null() {
                    return true;
                }
                match (value.as_i64(), pk.ty.zero_value().as_i64()) {
                    (Some(n), Some(_)) => n == 0,
                    _ => value == pk.ty.zero_value(),
                }
            }
            None => true,
        }
    }

    fn set_primary_key(&mut self, entity: &EntityDescriptor, value: Value) -> OrmResult<()> {
        let pk = entity.require_primary()?;
        self.set_field_value(pk, value)
    }
}

/// Map-backed [`Model`] keyed by logical field name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Record {
    values: HashMap<String, Value>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set(field, value);
        self
    }

    pub fn set(&mut self, field: impl Into<String>, value: impl Into<Value>) {
        self.values.insert(field.into(), value.into());
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.values.get(field)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl Model for Record {
    fn field_value(&self, field: &FieldDescriptor) -> Value {
        self.values.get(&field.name).cloned().unwrap_or_default()
    }

    fn set_field_value(&mut self, field: &FieldDescriptor, value: Value) -> OrmResult<()> {
        self.values.insert(field.name.clone(), value);
        Ok(())
    }
}
