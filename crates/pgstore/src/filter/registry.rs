//! Operator registry: SQL token and renderer per operator.

use crate::error::{OrmError, OrmResult};
use crate::filter::{Filter, Fragment, Operator};
use crate::param::ParamSequencer;
use crate::value::Value;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Renderer for extension operators.
///
/// Receives the quoted column, the registered token and the filter; must number
/// its placeholders through the sequencer in the order it returns values.
pub type CustomRenderer = Arc<
    dyn Fn(&str, &str, &Filter<'_>, &mut ParamSequencer) -> OrmResult<Vec<Fragment>> + Send + Sync,
>;

/// Which side(s) of a pattern value get the `%` wildcard.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatternKind {
    Contains,
    StartsWith,
    EndsWith,
}

impl PatternKind {
    fn wrap(self, s: &str) -> String {
        match self {
            PatternKind::Contains => format!("%{s}%"),
            PatternKind::StartsWith => format!("{s}%"),
            PatternKind::EndsWith => format!("%{s}"),
        }
    }
}

#[derive(Clone)]
pub enum Renderer {
    /// One `col op $n` fragment per value.
    Basic,
    /// `col op ($1,$2,...)`; nothing for an empty list.
    List,
    /// `col op`, binding nothing.
    NullCheck,
    /// One `col op $n` per value, each a string wrapped in `%`.
    Pattern(PatternKind),
    Custom(CustomRenderer),
}

impl fmt::Debug for Renderer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Renderer::Basic => f.write_str("Basic"),
            Renderer::List => f.write_str("List"),
            Renderer::NullCheck => f.write_str("NullCheck"),
            Renderer::Pattern(kind) => f.debug_tuple("Pattern").field(kind).finish(),
            Renderer::Custom(_) => f.write_str("Custom(<fn>)"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct OperatorEntry {
    pub token: String,
    pub renderer: Renderer,
}

/// Maps operators to their SQL token and renderer.
#[derive(Debug, Clone)]
pub struct OperatorRegistry {
    entries: HashMap<Operator, OperatorEntry>,
}

impl Default for OperatorRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl OperatorRegistry {
    /// Registry with every built-in operator.
    pub fn new() -> Self {
        let mut registry = Self::empty();
        for (op, token, renderer) in [
            (Operator::Eq, "=", Renderer::Basic),
            (Operator::Ne, "<>", Renderer::Basic),
            (Operator::Gt, ">", Renderer::Basic),
            (Operator::Gte, ">=", Renderer::Basic),
            (Operator::Lt, "<", Renderer::Basic),
            (Operator::Lte, "<=", Renderer::Basic),
            (Operator::In, "IN", Renderer::List),
            (Operator::NotIn, "NOT IN", Renderer::List),
            (
                Operator::Contains,
                "LIKE",
                Renderer::Pattern(PatternKind::Contains),
            ),
            (
                Operator::StartsWith,
                "LIKE",
                Renderer::Pattern(PatternKind::StartsWith),
            ),
            (
                Operator::EndsWith,
                "LIKE",
                Renderer::Pattern(PatternKind::EndsWith),
            ),
            (Operator::IsNull, "IS NULL", Renderer::NullCheck),
            (Operator::NotNull, "IS NOT NULL", Renderer::NullCheck),
        ] {
            registry.register(op, token, renderer);
        }
        registry
    }

    pub fn empty() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    /// Register (or replace) the token and renderer of `op`.
    pub fn register(&mut self, op: Operator, token: impl Into<String>, renderer: Renderer) {
        self.entries.insert(
            op,
            OperatorEntry {
                token: token.into(),
                renderer,
            },
        );
    }

    pub fn get(&self, op: &Operator) -> Option<&OperatorEntry> {
        self.entries.get(op)
    }

    /// Render one filter against an already quoted column.
    pub fn render(
        &self,
        column: &str,
        filter: &Filter<'_>,
        seq: &mut ParamSequencer,
    ) -> OrmResult<Vec<Fragment>> {
        let entry = self
            .get(&filter.op)
            .ok_or_else(|| OrmError::UnsupportedOperator {
                operator: filter.op.to_string(),
                field: filter.field.name.clone(),
            })?;
        let token = entry.token.as_str();

        match &entry.renderer {
            Renderer::Basic => Ok(filter
                .values
                .iter()
                .map(|v| {
                    Fragment::new(
                        format!("{column} {token} {}", seq.placeholder()),
                        vec![v.clone()],
                    )
                })
                .collect()),
            Renderer::List => {
                if filter.values.is_empty() {
                    return Ok(Vec::new());
                }
                let placeholders: Vec<String> =
                    filter.values.iter().map(|_| seq.placeholder()).collect();
                Ok(vec![Fragment::new(
                    format!("{column} {token} ({})", placeholders.join(",")),
                    filter.values.clone(),
                )])
            }
            Renderer::NullCheck => Ok(vec![Fragment::new(
                format!("{column} {token}"),
                Vec::new(),
            )]),
            Renderer::Pattern(kind) => filter
                .values
                .iter()
                .map(|v| match v {
                    Value::Text(s) => Ok(Fragment::new(
                        format!("{column} {token} {}", seq.placeholder()),
                        vec![Value::Text(kind.wrap(s))],
                    )),
                    other => Err(OrmError::InvalidFilterValue {
                        operator: filter.op.to_string(),
                        field: filter.field.name.clone(),
                        message: format!("expected a string, got {}", other.type_name()),
                    }),
                })
                .collect(),
            Renderer::Custom(render) => (**render)(column, token, filter, seq),
        }
    }
}
