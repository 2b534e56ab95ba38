//! Entity, field and index descriptors.

use crate::error::{OrmError, OrmResult};
use crate::model::FieldSet;
use crate::value::Value;
use chrono::{DateTime, NaiveDate, Utc};
use uuid::Uuid;

/// Semantic type of an entity field.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FieldType {
    Bool,
    I8,
    I16,
    I32,
    I64,
    U8,
    U16,
    U32,
    U64,
    F32,
    F64,
    String,
    Timestamp,
    Date,
    Uuid,
    /// Variable length sequence. `Slice(U8)` is a byte string.
    Slice(Box<FieldType>),
    /// Fixed length sequence.
    Array(Box<FieldType>, usize),
    /// Nullable wrapper.
    Optional(Box<FieldType>),
    /// Nominal type wrapping a structural one, e.g. a newtype around `Timestamp`.
    Named(String, Box<FieldType>),
}

impl FieldType {
    pub fn bytes() -> Self {
        FieldType::Slice(Box::new(FieldType::U8))
    }

    pub fn optional(inner: FieldType) -> Self {
        FieldType::Optional(Box::new(inner))
    }

    pub fn slice(inner: FieldType) -> Self {
        FieldType::Slice(Box::new(inner))
    }

    pub fn array(inner: FieldType, len: usize) -> Self {
        FieldType::Array(Box::new(inner), len)
    }

    pub fn named(name: impl Into<String>, inner: FieldType) -> Self {
        FieldType::Named(name.into(), Box::new(inner))
    }

    /// The type with every `Named` layer removed.
    pub fn structural(&self) -> &FieldType {
        match self {
            FieldType::Named(_, inner) => inner.structural(),
            other => other,
        }
    }

    pub fn is_optional(&self) -> bool {
        matches!(self.structural(), FieldType::Optional(_))
    }

    /// Holds a point in time, directly or through an optional/nominal wrapper.
    pub fn is_time(&self) -> bool {
        match self.structural() {
            FieldType::Timestamp | FieldType::Date => true,
            FieldType::Optional(inner) => inner.is_time(),
            _ => false,
        }
    }

    pub fn is_integer(&self) -> bool {
        matches!(
            self.structural(),
            FieldType::I8
                | FieldType::I16
                | FieldType::I32
                | FieldType::I64
                | FieldType::U8
                | FieldType::U16
                | FieldType::U32
                | FieldType::U64
        )
    }

    /// The value an unset field of this type holds.
    ///
    /// Timestamps use the Unix epoch and optional types are `NULL`.
    pub fn zero_value(&self) -> Value {
        match self {
            FieldType::Bool => Value::Bool(false),
            FieldType::I8 | FieldType::I16 | FieldType::U8 => Value::I16(0),
            FieldType::I32 | FieldType::U16 => Value::I32(0),
            FieldType::I64 | FieldType::U32 | FieldType::U64 => Value::I64(0),
            FieldType::F32 => Value::F32(0.0),
            FieldType::F64 => Value::F64(0.0),
            FieldType::String => Value::Text(String::new()),
            FieldType::Timestamp => Value::Timestamp(DateTime::<Utc>::UNIX_EPOCH),
            FieldType::Date => Value::Date(NaiveDate::default()),
            FieldType::Uuid => Value::Uuid(Uuid::nil()),
            FieldType::Slice(inner) if **inner == FieldType::U8 => Value::Bytes(Vec::new()),
            FieldType::Slice(_) => Value::Array(Vec::new()),
            FieldType::Array(inner, len) => Value::Array(vec![inner.zero_value(); *len]),
            FieldType::Optional(_) => Value::Null,
            FieldType::Named(_, inner) => inner.zero_value(),
        }
    }
}

/// Role a field plays in the entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum FieldKind {
    Primary,
    #[default]
    Attribute,
    ForeignKey,
    /// Present on the entity but never part of generated SQL.
    Skipped,
}

/// Bookkeeping timestamp roles; such fields are stored as `timestamptz`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimeRole {
    Created,
    Updated,
    Deleted,
}

/// Target of a foreign key column.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ForeignRef {
    pub schema: String,
    pub table: String,
    pub column: String,
}

impl ForeignRef {
    pub fn new(
        schema: impl Into<String>,
        table: impl Into<String>,
        column: impl Into<String>,
    ) -> Self {
        Self {
            schema: schema.into(),
            table: table.into(),
            column: column.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldDescriptor {
    /// Logical name.
    pub name: String,
    /// Physical column name; defaulted to the snake_case logical name by `prepare`.
    pub column: String,
    pub kind: FieldKind,
    pub ty: FieldType,
    pub not_null: bool,
    pub unique: bool,
    /// Explicit column type such as `varchar(20)`.
    pub column_type: Option<String>,
    pub time_role: Option<TimeRole>,
    pub references: Option<ForeignRef>,
    /// Declaration order; the canonical sort key of field sets.
    pub position: usize,
}

impl FieldDescriptor {
    pub fn new(name: impl Into<String>, ty: FieldType) -> Self {
        Self {
            name: name.into(),
            column: String::new(),
            kind: FieldKind::Attribute,
            ty,
            not_null: false,
            unique: false,
            column_type: None,
            time_role: None,
            references: None,
            position: 0,
        }
    }

    pub fn primary(mut self) -> Self {
        self.kind = FieldKind::Primary;
        self
    }

    pub fn foreign_key(mut self, target: ForeignRef) -> Self {
        self.kind = FieldKind::ForeignKey;
        self.references = Some(target);
        self
    }

    pub fn skipped(mut self) -> Self {
        self.kind = FieldKind::Skipped;
        self
    }

    pub fn not_null(mut self) -> Self {
        self.not_null = true;
        self
    }

    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    pub fn column(mut self, column: impl Into<String>) -> Self {
        self.column = column.into();
        self
    }

    pub fn column_type(mut self, column_type: impl Into<String>) -> Self {
        self.column_type = Some(column_type.into());
        self
    }

    pub fn time_role(mut self, role: TimeRole) -> Self {
        self.time_role = Some(role);
        self
    }

    pub fn is_primary(&self) -> bool {
        self.kind == FieldKind::Primary
    }

    pub fn is_skipped(&self) -> bool {
        self.kind == FieldKind::Skipped
    }

    /// Physical column name, falling back to the logical name before preparation.
    pub fn column_name(&self) -> &str {
        if self.column.is_empty() {
            &self.name
        } else {
            &self.column
        }
    }
}

/// Index access method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum IndexMethod {
    #[default]
    BTree,
    Hash,
    Gist,
    Gin,
}

impl IndexMethod {
    pub fn as_sql(self) -> &'static str {
        match self {
            IndexMethod::BTree => "btree",
            IndexMethod::Hash => "hash",
            IndexMethod::Gist => "gist",
            IndexMethod::Gin => "gin",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "btree" => Some(IndexMethod::BTree),
            "hash" => Some(IndexMethod::Hash),
            "gist" => Some(IndexMethod::Gist),
            "gin" => Some(IndexMethod::Gin),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexDescriptor {
    /// Unprefixed name; generated by `prepare` when absent.
    pub name: Option<String>,
    /// Logical names of the indexed fields, in index order.
    pub fields: Vec<String>,
    pub unique: bool,
    pub method: IndexMethod,
}

impl IndexDescriptor {
    pub fn on<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: None,
            fields: fields.into_iter().map(Into::into).collect(),
            unique: false,
            method: IndexMethod::default(),
        }
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    pub fn method(mut self, method: IndexMethod) -> Self {
        self.method = method;
        self
    }
}

/// Description of one stored entity.
#[derive(Debug, Clone, PartialEq)]
pub struct EntityDescriptor {
    /// Logical name.
    pub name: String,
    /// Physical schema; defaulted by `prepare`.
    pub schema: String,
    /// Physical table; defaulted to the snake_case logical name by `prepare`.
    pub table: String,
    pub fields: Vec<FieldDescriptor>,
    pub indexes: Vec<IndexDescriptor>,
}

impl EntityDescriptor {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            schema: String::new(),
            table: String::new(),
            fields: Vec::new(),
            indexes: Vec::new(),
        }
    }

    pub fn schema(mut self, schema: impl Into<String>) -> Self {
        self.schema = schema.into();
        self
    }

    pub fn table(mut self, table: impl Into<String>) -> Self {
        self.table = table.into();
        self
    }

    /// Append a field; its position is its declaration order.
    pub fn field(mut self, mut field: FieldDescriptor) -> Self {
        field.position = self.fields.len();
        self.fields.push(field);
        self
    }

    pub fn index(mut self, index: IndexDescriptor) -> Self {
        self.indexes.push(index);
        self
    }

    pub fn primary(&self) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|f| f.is_primary())
    }

    pub fn require_primary(&self) -> OrmResult<&FieldDescriptor> {
        self.primary().ok_or_else(|| {
            OrmError::configuration(format!("entity '{}' has no primary key field", self.name))
        })
    }

    /// Look a field up by logical or column name.
    pub fn field_by_name(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields
            .iter()
            .find(|f| f.name == name)
            .or_else(|| self.fields.iter().find(|f| f.column_name() == name))
    }

    /// Fields that take part in generated SQL.
    pub fn db_fields(&self) -> impl Iterator<Item = &FieldDescriptor> {
        self.fields.iter().filter(|f| !f.is_skipped())
    }

    /// Every non-skipped field, in declaration order.
    pub fn all_fields(&self) -> FieldSet<'_> {
        self.db_fields().collect()
    }

    /// Field set of the named fields. Unknown names are an error.
    pub fn field_set<'a>(&'a self, names: &[&str]) -> OrmResult<FieldSet<'a>> {
        let mut set = FieldSet::new();
        for name in names {
            let field = self.field_by_name(name).ok_or_else(|| {
                OrmError::validation(format!("entity '{}' has no field '{}'", self.name, name))
            })?;
            set.push(field);
        }
        Ok(set)
    }

    pub fn schema_name(&self) -> &str {
        if self.schema.is_empty() {
            "public"
        } else {
            &self.schema
        }
    }

    pub fn table_name(&self) -> &str {
        if self.table.is_empty() {
            &self.name
        } else {
            &self.table
        }
    }
}
