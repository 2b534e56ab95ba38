//! Column type registry: maps entity fields onto SQL column types.

use crate::error::{OrmError, OrmResult};
use crate::keywords::Dialect;
use crate::model::{EntityDescriptor, FieldDescriptor, FieldKind, FieldType};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Non-array column type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScalarType {
    /// Fixed SQL keyword, e.g. `integer`.
    Basic { key: String, sql: String },
    /// Keyword with a required parameter list, e.g. `varchar(20)`.
    Parameterized {
        key: String,
        sql: String,
        params: Vec<String>,
    },
    /// Keyword words with an optional parameter slotted after the first word,
    /// e.g. `timestamp(3) with time zone`.
    OptionalParameterized {
        key: String,
        words: Vec<String>,
        params: Vec<String>,
    },
}

impl ScalarType {
    pub fn basic(key: &str, sql: &str) -> Self {
        ScalarType::Basic {
            key: key.to_string(),
            sql: sql.to_string(),
        }
    }

    pub fn parameterized(key: &str) -> Self {
        ScalarType::Parameterized {
            key: key.to_string(),
            sql: key.to_string(),
            params: Vec::new(),
        }
    }

    pub fn optional_parameterized(key: &str, words: &[&str]) -> Self {
        ScalarType::OptionalParameterized {
            key: key.to_string(),
            words: words.iter().map(|w| (*w).to_string()).collect(),
            params: Vec::new(),
        }
    }

    pub fn key(&self) -> &str {
        match self {
            ScalarType::Basic { key, .. }
            | ScalarType::Parameterized { key, .. }
            | ScalarType::OptionalParameterized { key, .. } => key,
        }
    }

    /// Copy of this type carrying `params`.
    pub fn with_params(&self, params: Vec<String>) -> Result<Self, String> {
        match self {
            ScalarType::Basic { key, .. } if !params.is_empty() => {
                Err(format!("type '{key}' takes no parameters"))
            }
            ScalarType::Basic { .. } => Ok(self.clone()),
            ScalarType::Parameterized { key, sql, .. } => Ok(ScalarType::Parameterized {
                key: key.clone(),
                sql: sql.clone(),
                params,
            }),
            ScalarType::OptionalParameterized { key, words, .. } => {
                Ok(ScalarType::OptionalParameterized {
                    key: key.clone(),
                    words: words.clone(),
                    params,
                })
            }
        }
    }

    /// Inline DDL rendering.
    pub fn render(&self) -> Result<String, String> {
        match self {
            ScalarType::Basic { sql, .. } => Ok(sql.clone()),
            ScalarType::Parameterized { key, params, .. } if params.is_empty() => {
                Err(format!("type '{key}' requires parameters, e.g. '{key}(n)'"))
            }
            ScalarType::Parameterized { sql, params, .. } => {
                Ok(format!("{sql}({})", params.join(",")))
            }
            ScalarType::OptionalParameterized { words, params, .. } => {
                let mut out = String::new();
                for (i, word) in words.iter().enumerate() {
                    if i > 0 {
                        out.push(' ');
                    }
                    out.push_str(word);
                    if i == 0 && !params.is_empty() {
                        out.push('(');
                        out.push_str(&params.join(","));
                        out.push(')');
                    }
                }
                Ok(out)
            }
        }
    }
}

/// Array of a scalar type, optionally of fixed length.
///
/// The element is always scalar: arrays of arrays cannot be expressed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArrayType {
    pub element: ScalarType,
    pub len: Option<usize>,
}

impl ArrayType {
    pub fn render(&self) -> Result<String, String> {
        let element = self.element.render()?;
        Ok(match self.len {
            Some(len) => format!("{element}[{len}]"),
            None => format!("{element}[]"),
        })
    }
}

/// A column type whose column is created by its own statement rather than inline
/// in `CREATE TABLE` / `ALTER TABLE ... ADD`.
pub trait ExternalColumn: Send + Sync + fmt::Debug {
    /// Registry key.
    fn key(&self) -> &str;

    /// Statement creating the column for `field` on `entity`.
    fn create_statement(
        &self,
        entity: &EntityDescriptor,
        field: &FieldDescriptor,
        dialect: &Dialect,
    ) -> String;
}

#[derive(Debug, Clone)]
pub enum ColumnType {
    Scalar(ScalarType),
    Array(ArrayType),
    External(Arc<dyn ExternalColumn>),
}

impl ColumnType {
    pub fn key(&self) -> String {
        match self {
            ColumnType::Scalar(s) => s.key().to_string(),
            ColumnType::Array(a) => format!("{}[]", a.element.key()),
            ColumnType::External(e) => e.key().to_string(),
        }
    }

    pub fn is_external(&self) -> bool {
        matches!(self, ColumnType::External(_))
    }

    /// Inline DDL rendering; `None` for external types.
    pub fn inline_sql(&self) -> Option<Result<String, String>> {
        match self {
            ColumnType::Scalar(s) => Some(s.render()),
            ColumnType::Array(a) => Some(a.render()),
            ColumnType::External(_) => None,
        }
    }

    fn with_params(&self, params: Vec<String>) -> Result<Self, String> {
        if params.is_empty() {
            return Ok(self.clone());
        }
        match self {
            ColumnType::Scalar(s) => s.with_params(params).map(ColumnType::Scalar),
            ColumnType::Array(a) => Ok(ColumnType::Array(ArrayType {
                element: a.element.with_params(params)?,
                len: a.len,
            })),
            ColumnType::External(e) => Err(format!("type '{}' takes no parameters", e.key())),
        }
    }
}

impl PartialEq for ColumnType {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (ColumnType::Scalar(a), ColumnType::Scalar(b)) => a == b,
            (ColumnType::Array(a), ColumnType::Array(b)) => a == b,
            (ColumnType::External(a), ColumnType::External(b)) => a.key() == b.key(),
            _ => false,
        }
    }
}

/// Split `name(p1,p2)` into its base name and parameters.
pub(crate) fn parse_type_override(v: &str) -> Result<(&str, Vec<String>), String> {
    let v = v.trim();
    let Some(open) = v.find('(') else {
        return Ok((v, Vec::new()));
    };
    let Some(inner) = v[open + 1..].strip_suffix(')') else {
        return Err(format!("malformed column type '{v}'"));
    };
    let params = inner
        .split(',')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(str::to_string)
        .collect();
    Ok((v[..open].trim(), params))
}

/// Registry of column types keyed by SQL type key (`integer`, `text[]`, ...) plus
/// nominal field types (`FieldType::Named`) with a fixed column type.
#[derive(Debug, Clone)]
pub struct TypeRegistry {
    types: HashMap<String, ColumnType>,
    named: HashMap<String, ColumnType>,
}

impl Default for TypeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

const SERIAL: &str = "serial";
const BIGSERIAL: &str = "bigserial";

impl TypeRegistry {
    /// Registry with the built-in types and an array variant of each (serials excepted).
    pub fn new() -> Self {
        let scalars = [
            ScalarType::parameterized("char"),
            ScalarType::parameterized("varchar"),
            ScalarType::basic("text", "text"),
            ScalarType::basic("smallint", "smallint"),
            ScalarType::basic("integer", "integer"),
            ScalarType::basic("bigint", "bigint"),
            ScalarType::optional_parameterized("decimal", &["decimal"]),
            ScalarType::optional_parameterized("numeric", &["numeric"]),
            ScalarType::basic("real", "real"),
            ScalarType::basic("double", "double precision"),
            ScalarType::basic(SERIAL, "serial"),
            ScalarType::basic(BIGSERIAL, "bigserial"),
            ScalarType::basic("uuid", "uuid"),
            ScalarType::basic("bytea", "bytea"),
            ScalarType::basic("boolean", "boolean"),
            ScalarType::basic("date", "date"),
            ScalarType::optional_parameterized("timestamp", &["timestamp"]),
            ScalarType::optional_parameterized("timestamptz", &["timestamp", "with time zone"]),
            ScalarType::optional_parameterized("time", &["time"]),
            ScalarType::optional_parameterized("timetz", &["time", "with time zone"]),
        ];

        let mut types = HashMap::new();
        for scalar in scalars {
            if scalar.key() != SERIAL && scalar.key() != BIGSERIAL {
                let array = ColumnType::Array(ArrayType {
                    element: scalar.clone(),
                    len: None,
                });
                types.insert(array.key(), array);
            }
            types.insert(scalar.key().to_string(), ColumnType::Scalar(scalar));
        }
        Self {
            types,
            named: HashMap::new(),
        }
    }

    /// Register a new SQL type under its key. Keys are never overwritten.
    pub fn register(&mut self, ty: ColumnType) -> OrmResult<()> {
        let key = ty.key();
        if self.types.contains_key(&key) {
            return Err(OrmError::configuration(format!(
                "column type '{key}' is already registered"
            )));
        }
        self.types.insert(key, ty);
        Ok(())
    }

    /// Bind the nominal field type `type_name` to a column type.
    pub fn register_named(
        &mut self,
        type_name: impl Into<String>,
        ty: ColumnType,
        overwrite: bool,
    ) -> OrmResult<()> {
        let type_name = type_name.into();
        if !overwrite && self.named.contains_key(&type_name) {
            return Err(OrmError::configuration(format!(
                "a column type is already bound to field type '{type_name}'"
            )));
        }
        self.named.insert(type_name, ty);
        Ok(())
    }

    pub fn get(&self, key: &str) -> Option<&ColumnType> {
        self.types.get(key)
    }

    fn builtin(&self, key: &str) -> ColumnType {
        self.types
            .get(key)
            .cloned()
            .unwrap_or_else(|| ColumnType::Scalar(ScalarType::basic(key, key)))
    }

    /// Resolve the column type of `field`.
    ///
    /// Precedence: explicit override, integer primary keys (serials), UUID-shaped
    /// fields, bookkeeping timestamps, sequences, then the element type itself.
    pub fn resolve(
        &self,
        entity: &EntityDescriptor,
        field: &FieldDescriptor,
    ) -> OrmResult<ColumnType> {
        let unresolved =
            |message: String| OrmError::unresolved_type(&entity.name, &field.name, message);

        if let Some(column_type) = &field.column_type {
            let (base, params) = parse_type_override(column_type).map_err(unresolved)?;
            let ty = self.types.get(base).ok_or_else(|| {
                unresolved(format!("unknown column type '{column_type}'"))
            })?;
            return ty.with_params(params).map_err(unresolved);
        }

        if field.kind == FieldKind::Primary {
            match field.ty.structural() {
                FieldType::I8
                | FieldType::I16
                | FieldType::I32
                | FieldType::U8
                | FieldType::U16 => return Ok(self.builtin(SERIAL)),
                FieldType::I64 | FieldType::U32 | FieldType::U64 => {
                    return Ok(self.builtin(BIGSERIAL));
                }
                _ => {}
            }
        }

        if is_uuid_shaped(&field.ty) {
            return Ok(self.builtin("uuid"));
        }

        if field.time_role.is_some() {
            return Ok(self.builtin("timestamptz"));
        }

        if let Some(column) = self.named_column(&field.ty) {
            return Ok(column);
        }

        let Some((element, len)) = sequence_shape(&field.ty) else {
            return self.resolve_element(&field.ty).map_err(unresolved);
        };
        if len.is_none() && *element.structural() == FieldType::U8 {
            return Ok(self.builtin("bytea"));
        }
        match self.resolve_element(element).map_err(unresolved)? {
            ColumnType::Scalar(element) => Ok(ColumnType::Array(ArrayType { element, len })),
            other => Err(unresolved(format!(
                "cannot store an array of '{}'",
                other.key()
            ))),
        }
    }

    /// Column type bound to the outermost registered nominal type, if any.
    fn named_column(&self, ty: &FieldType) -> Option<ColumnType> {
        match ty {
            FieldType::Named(name, inner) => self
                .named
                .get(name)
                .cloned()
                .or_else(|| self.named_column(inner)),
            FieldType::Optional(inner) => self.named_column(inner),
            _ => None,
        }
    }

    fn resolve_element(&self, ty: &FieldType) -> Result<ColumnType, String> {
        let key = match ty {
            FieldType::Named(name, inner) => {
                return match self.named.get(name) {
                    Some(column) => Ok(column.clone()),
                    None => self.resolve_element(inner),
                };
            }
            FieldType::Optional(inner) => return self.resolve_element(inner),
            FieldType::Bool => "boolean",
            // Unsigned types take the next wider column so every value fits.
            FieldType::I8 | FieldType::I16 | FieldType::U8 => "smallint",
            FieldType::I32 | FieldType::U16 => "integer",
            FieldType::I64 | FieldType::U32 | FieldType::U64 => "bigint",
            FieldType::F32 => "real",
            FieldType::F64 => "double",
            FieldType::String => "text",
            FieldType::Timestamp => "timestamp",
            FieldType::Date => "date",
            FieldType::Uuid => "uuid",
            FieldType::Slice(_) | FieldType::Array(_, _) => {
                return Err("nested sequences have no column type".to_string());
            }
        };
        Ok(self.builtin(key))
    }
}

/// Element type and fixed length of a sequence field.
fn sequence_shape(ty: &FieldType) -> Option<(&FieldType, Option<usize>)> {
    match ty {
        FieldType::Named(_, inner) | FieldType::Optional(inner) => sequence_shape(inner),
        FieldType::Slice(inner) => Some((&**inner, None)),
        FieldType::Array(inner, len) => Some((&**inner, Some(*len))),
        _ => None,
    }
}

/// `Uuid`, or a 16-byte array nominally named `uuid`.
fn is_uuid_shaped(ty: &FieldType) -> bool {
    match ty {
        FieldType::Uuid => true,
        FieldType::Optional(inner) => is_uuid_shaped(inner),
        FieldType::Named(name, inner) => {
            (name.eq_ignore_ascii_case("uuid")
                && matches!(inner.structural(), FieldType::Array(elem, 16) if **elem == FieldType::U8))
                || is_uuid_shaped(inner)
        }
        _ => false,
    }
}
