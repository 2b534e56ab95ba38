//! Dynamically typed bind/scan values.
//!
//! [`Value`] is what filters carry, what statement builders bind and what the row
//! materializer writes back into models. It bridges to tokio-postgres through
//! [`ToSql`]/[`FromSql`], dispatching on the server-side column type so integers and
//! timestamps bind correctly regardless of which width or zone variant the column uses.

use bytes::BytesMut;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use std::error::Error;
use tokio_postgres::types::{FromSql, IsNull, Kind, ToSql, Type};
use uuid::Uuid;

type BoxError = Box<dyn Error + Sync + Send>;

/// A single SQL value.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    I16(i16),
    I32(i32),
    I64(i64),
    F32(f32),
    F64(f64),
    Text(String),
    Bytes(Vec<u8>),
    Uuid(Uuid),
    Timestamp(DateTime<Utc>),
    Date(NaiveDate),
    Json(serde_json::Value),
    Array(Vec<Value>),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Integer content widened to `i64`.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::I16(v) => Some(i64::from(*v)),
            Value::I32(v) => Some(i64::from(*v)),
            Value::I64(v) => Some(*v),
            _ => None,
        }
    }

    /// Short name of the variant, used in error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::I16(_) => "i16",
            Value::I32(_) => "i32",
            Value::I64(_) => "i64",
            Value::F32(_) => "f32",
            Value::F64(_) => "f64",
            Value::Text(_) => "text",
            Value::Bytes(_) => "bytes",
            Value::Uuid(_) => "uuid",
            Value::Timestamp(_) => "timestamp",
            Value::Date(_) => "date",
            Value::Json(_) => "json",
            Value::Array(_) => "array",
        }
    }
}

fn int_to_sql(v: i64, ty: &Type, out: &mut BytesMut) -> Result<IsNull, BoxError> {
    match *ty {
        Type::INT2 => i16::try_from(v)?.to_sql(ty, out),
        Type::INT4 => i32::try_from(v)?.to_sql(ty, out),
        _ => v.to_sql_checked(ty, out),
    }
}

impl ToSql for Value {
    fn to_sql(&self, ty: &Type, out: &mut BytesMut) -> Result<IsNull, BoxError> {
        match self {
            Value::Null => Ok(IsNull::Yes),
            Value::Bool(v) => v.to_sql_checked(ty, out),
            Value::I16(v) => int_to_sql(i64::from(*v), ty, out),
            Value::I32(v) => int_to_sql(i64::from(*v), ty, out),
            Value::I64(v) => int_to_sql(*v, ty, out),
            Value::F32(v) if *ty == Type::FLOAT8 => f64::from(*v).to_sql(ty, out),
            Value::F32(v) => v.to_sql_checked(ty, out),
            Value::F64(v) if *ty == Type::FLOAT4 => (*v as f32).to_sql(ty, out),
            Value::F64(v) => v.to_sql_checked(ty, out),
            Value::Text(v) => v.to_sql_checked(ty, out),
            Value::Bytes(v) => v.to_sql_checked(ty, out),
            Value::Uuid(v) => v.to_sql_checked(ty, out),
            Value::Timestamp(v) if *ty == Type::TIMESTAMP => v.naive_utc().to_sql(ty, out),
            Value::Timestamp(v) => v.to_sql_checked(ty, out),
            Value::Date(v) => v.to_sql_checked(ty, out),
            Value::Json(v) => v.to_sql_checked(ty, out),
            Value::Array(items) => items.to_sql_checked(ty, out),
        }
    }

    fn accepts(_ty: &Type) -> bool {
        true
    }

    tokio_postgres::types::to_sql_checked!();
}

impl<'a> FromSql<'a> for Value {
    fn from_sql(ty: &Type, raw: &'a [u8]) -> Result<Self, BoxError> {
        let value = match *ty {
            Type::BOOL => Value::Bool(bool::from_sql(ty, raw)?),
            Type::INT2 => Value::I16(i16::from_sql(ty, raw)?),
            Type::INT4 => Value::I32(i32::from_sql(ty, raw)?),
            Type::INT8 => Value::I64(i64::from_sql(ty, raw)?),
            Type::FLOAT4 => Value::F32(f32::from_sql(ty, raw)?),
            Type::FLOAT8 => Value::F64(f64::from_sql(ty, raw)?),
            Type::TEXT | Type::VARCHAR | Type::BPCHAR | Type::NAME => {
                Value::Text(String::from_sql(ty, raw)?)
            }
            Type::BYTEA => Value::Bytes(Vec::<u8>::from_sql(ty, raw)?),
            Type::UUID => Value::Uuid(Uuid::from_sql(ty, raw)?),
            Type::TIMESTAMPTZ => Value::Timestamp(DateTime::<Utc>::from_sql(ty, raw)?),
            Type::TIMESTAMP => Value::Timestamp(NaiveDateTime::from_sql(ty, raw)?.and_utc()),
            Type::DATE => Value::Date(NaiveDate::from_sql(ty, raw)?),
            Type::JSON | Type::JSONB => Value::Json(serde_json::Value::from_sql(ty, raw)?),
            _ => match ty.kind() {
                Kind::Array(_) => Value::Array(Vec::<Value>::from_sql(ty, raw)?),
                _ => return Err(format!("unsupported column type '{ty}'").into()),
            },
        };
        Ok(value)
    }

    fn from_sql_null(_ty: &Type) -> Result<Self, BoxError> {
        Ok(Value::Null)
    }

    fn accepts(_ty: &Type) -> bool {
        true
    }
}

macro_rules! impl_from {
    ($($t:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$t> for Value {
                fn from(v: $t) -> Self {
                    Value::$variant(v.into())
                }
            }
        )*
    };
}

impl_from! {
    bool => Bool,
    i16 => I16,
    i32 => I32,
    i64 => I64,
    u8 => I16,
    u16 => I32,
    u32 => I64,
    f32 => F32,
    f64 => F64,
    String => Text,
    &str => Text,
    Vec<u8> => Bytes,
    Uuid => Uuid,
    DateTime<Utc> => Timestamp,
    NaiveDate => Date,
    serde_json::Value => Json,
    Vec<Value> => Array,
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integers_narrow_to_column_width() {
        let mut buf = BytesMut::new();
        Value::I64(7).to_sql_checked(&Type::INT2, &mut buf).unwrap();
        assert_eq!(&buf[..], &7i16.to_be_bytes());

        let mut buf = BytesMut::new();
        assert!(
            Value::I64(i64::MAX)
                .to_sql_checked(&Type::INT4, &mut buf)
                .is_err()
        );
    }

    #[test]
    fn null_binds_as_null() {
        let mut buf = BytesMut::new();
        let is_null = Value::Null.to_sql_checked(&Type::TEXT, &mut buf).unwrap();
        assert!(matches!(is_null, IsNull::Yes));
    }

    #[test]
    fn mismatched_types_are_rejected() {
        let mut buf = BytesMut::new();
        assert!(
            Value::Bool(true)
                .to_sql_checked(&Type::TEXT, &mut buf)
                .is_err()
        );
    }

    #[test]
    fn scans_by_column_type() {
        let v = Value::from_sql(&Type::INT8, &42i64.to_be_bytes()).unwrap();
        assert_eq!(v, Value::I64(42));
        let v = Value::from_sql(&Type::TEXT, b"hello").unwrap();
        assert_eq!(v.as_str(), Some("hello"));
        assert_eq!(Value::from_sql_null(&Type::TIMESTAMPTZ).unwrap(), Value::Null);
    }

    #[test]
    fn conversions() {
        assert_eq!(Value::from("a"), Value::Text("a".into()));
        assert_eq!(Value::from(Some(3i32)), Value::I32(3));
        assert_eq!(Value::from(None::<i32>), Value::Null);
        assert_eq!(Value::from(5u16).as_i64(), Some(5));
    }

    #[test]
    fn unsigned_values_fit_their_column() {
        let mut buf = BytesMut::new();
        Value::from(u16::MAX)
            .to_sql_checked(&Type::INT4, &mut buf)
            .unwrap();
        assert_eq!(&buf[..], &i32::from(u16::MAX).to_be_bytes());
    }
}
