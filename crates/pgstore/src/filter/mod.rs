//! Predicate trees and their compilation into SQL fragments.
//!
//! A predicate tree is a list of [`FilterNode`]s, AND-joined at the top level.
//! Each node is either a single [`Filter`] or an [`OrGroup`] of filters.
//!
//! ```ignore
//! use pgstore::filter::{Filter, FilterNode, Operator};
//!
//! let id = entity.require_primary()?;
//! let nodes = vec![
//!     FilterNode::from(Filter::new(id, Operator::In, [3, 4])),
//!     FilterNode::or([
//!         Filter::new(id, Operator::Eq, [12345]),
//!         Filter::new(id, Operator::Ne, [54321]),
//!     ]),
//! ];
//! ```

pub mod compile;
pub mod registry;

pub use compile::FilterCompiler;
pub use registry::{CustomRenderer, OperatorEntry, OperatorRegistry, PatternKind, Renderer};

use crate::model::FieldDescriptor;
use crate::value::Value;
use std::fmt;

/// Filter operator.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Operator {
    Eq,
    Ne,
    Gt,
    Gte,
    Lt,
    Lte,
    In,
    NotIn,
    Contains,
    StartsWith,
    EndsWith,
    IsNull,
    NotNull,
    /// Extension operator; usable once registered.
    Custom(String),
}

impl Operator {
    pub fn name(&self) -> &str {
        match self {
            Operator::Eq => "eq",
            Operator::Ne => "ne",
            Operator::Gt => "gt",
            Operator::Gte => "gte",
            Operator::Lt => "lt",
            Operator::Lte => "lte",
            Operator::In => "in",
            Operator::NotIn => "notin",
            Operator::Contains => "contains",
            Operator::StartsWith => "startswith",
            Operator::EndsWith => "endswith",
            Operator::IsNull => "isnull",
            Operator::NotNull => "notnull",
            Operator::Custom(name) => name,
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Leaf predicate: `field <op> values`.
#[derive(Debug, Clone, PartialEq)]
pub struct Filter<'a> {
    pub field: &'a FieldDescriptor,
    pub op: Operator,
    pub values: Vec<Value>,
}

impl<'a> Filter<'a> {
    pub fn new<I, V>(field: &'a FieldDescriptor, op: Operator, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        Self {
            field,
            op,
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    pub fn eq(field: &'a FieldDescriptor, value: impl Into<Value>) -> Self {
        Self::new(field, Operator::Eq, [value.into()])
    }

    pub fn is_null(field: &'a FieldDescriptor) -> Self {
        Self::new(field, Operator::IsNull, Vec::<Value>::new())
    }
}

/// Filters combined with OR.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct OrGroup<'a> {
    pub members: Vec<Filter<'a>>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum FilterNode<'a> {
    Leaf(Filter<'a>),
    Or(OrGroup<'a>),
}

impl<'a> FilterNode<'a> {
    pub fn or(members: impl IntoIterator<Item = Filter<'a>>) -> Self {
        FilterNode::Or(OrGroup {
            members: members.into_iter().collect(),
        })
    }
}

impl<'a> From<Filter<'a>> for FilterNode<'a> {
    fn from(filter: Filter<'a>) -> Self {
        FilterNode::Leaf(filter)
    }
}

/// Compiled SQL text and the values its placeholders bind, in placeholder order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Fragment {
    pub sql: String,
    pub values: Vec<Value>,
}

impl Fragment {
    pub fn new(sql: impl Into<String>, values: Vec<Value>) -> Self {
        Self {
            sql: sql.into(),
            values,
        }
    }

    /// Join fragments with `sep`, concatenating values in order.
    pub fn join(fragments: Vec<Fragment>, sep: &str) -> Fragment {
        let mut out = Fragment::default();
        for (i, fragment) in fragments.into_iter().enumerate() {
            if i > 0 {
                out.sql.push_str(sep);
            }
            out.sql.push_str(&fragment.sql);
            out.values.extend(fragment.values);
        }
        out
    }
}

#[cfg(test)]
mod tests;
