//! Statement builders.
//!
//! [`StatementCompiler`] turns a [`Query`] (and, for writes, a slice of models) into
//! parameterized SQL plus the values to bind, without touching the network.
//!
//! ```ignore
//! let compiler = StatementCompiler::new(&operators, &dialect);
//! let query = Query::new(&entity)
//!     .filter(Filter::new(id, Operator::In, [3, 10]));
//! let stmt = compiler.delete(&query)?;
//! assert_eq!(stmt.sql, "DELETE FROM public.models WHERE id IN ($1,$2)");
//! ```

pub mod bulk;
pub mod count;
pub mod delete;
pub mod insert;
pub mod materialize;
pub mod select;
pub mod update;

pub use bulk::{BulkFieldSet, FieldSetGroup};
pub use insert::InsertGroup;
pub use materialize::{materialize, materialize_values};
pub use select::SelectStatement;

use crate::filter::{FilterCompiler, FilterNode, OperatorRegistry};
use crate::keywords::Dialect;
use crate::model::{EntityDescriptor, FieldDescriptor, FieldSet};
use crate::value::Value;
use tokio_postgres::types::ToSql;

/// Compiled SQL and its bind values.
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    pub sql: String,
    pub values: Vec<Value>,
    /// Whether the statement produces rows (`SELECT`, `RETURNING`).
    pub returns_rows: bool,
}

impl Statement {
    pub fn new(sql: impl Into<String>, values: Vec<Value>) -> Self {
        Self {
            sql: sql.into(),
            values,
            returns_rows: false,
        }
    }

    pub fn returning_rows(mut self) -> Self {
        self.returns_rows = true;
        self
    }

    /// Values as tokio-postgres parameters.
    pub fn params(&self) -> Vec<&(dyn ToSql + Sync)> {
        self.values
            .iter()
            .map(|v| v as &(dyn ToSql + Sync))
            .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

impl SortOrder {
    pub fn as_sql(self) -> &'static str {
        match self {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SortField<'a> {
    pub field: &'a FieldDescriptor,
    pub order: SortOrder,
}

/// Limit and offset; zero means unset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Pagination {
    pub limit: i64,
    pub offset: i64,
}

/// Abstract description of one operation on an entity.
#[derive(Debug, Clone)]
pub struct Query<'a> {
    pub entity: &'a EntityDescriptor,
    /// One common field set, or one per model for heterogeneous writes.
    pub field_sets: Vec<FieldSet<'a>>,
    pub filters: Vec<FilterNode<'a>>,
    pub sorting: Vec<SortField<'a>>,
    pub pagination: Pagination,
}

impl<'a> Query<'a> {
    pub fn new(entity: &'a EntityDescriptor) -> Self {
        Self {
            entity,
            field_sets: Vec::new(),
            filters: Vec::new(),
            sorting: Vec::new(),
            pagination: Pagination::default(),
        }
    }

    pub fn field_set(mut self, field_set: FieldSet<'a>) -> Self {
        self.field_sets.push(field_set);
        self
    }

    pub fn field_sets(mut self, field_sets: impl IntoIterator<Item = FieldSet<'a>>) -> Self {
        self.field_sets.extend(field_sets);
        self
    }

    pub fn filter(mut self, node: impl Into<FilterNode<'a>>) -> Self {
        self.filters.push(node.into());
        self
    }

    pub fn sort(mut self, field: &'a FieldDescriptor, order: SortOrder) -> Self {
        self.sorting.push(SortField { field, order });
        self
    }

    pub fn limit(mut self, limit: i64) -> Self {
        self.pagination.limit = limit;
        self
    }

    pub fn offset(mut self, offset: i64) -> Self {
        self.pagination.offset = offset;
        self
    }
}

/// Builds count/select/insert/update/delete statements for one dialect.
#[derive(Debug, Clone, Copy)]
pub struct StatementCompiler<'r> {
    operators: &'r OperatorRegistry,
    dialect: &'r Dialect,
    select_not_nulls_on_insert: bool,
}

impl<'r> StatementCompiler<'r> {
    pub fn new(operators: &'r OperatorRegistry, dialect: &'r Dialect) -> Self {
        Self {
            operators,
            dialect,
            select_not_nulls_on_insert: true,
        }
    }

    /// Whether inserts add absent not-null columns, bound to their zero value.
    pub fn select_not_nulls_on_insert(mut self, enabled: bool) -> Self {
        self.select_not_nulls_on_insert = enabled;
        self
    }

    pub fn dialect(&self) -> &'r Dialect {
        self.dialect
    }

    fn filter_compiler(&self) -> FilterCompiler<'r> {
        FilterCompiler::new(self.operators, self.dialect)
    }

    fn table(&self, entity: &EntityDescriptor) -> String {
        self.dialect
            .qualified(entity.schema_name(), entity.table_name())
    }

    fn column(&self, field: &FieldDescriptor) -> String {
        self.dialect.quote(field.column_name()).into_owned()
    }
}
