use crate::error::OrmResult;
use crate::filter::{Filter, FilterNode, Fragment, OperatorRegistry, OrGroup};
use crate::keywords::Dialect;
use crate::param::ParamSequencer;
use tracing::debug;

/// Compiles predicate trees into SQL fragments.
///
/// Placeholders are numbered depth-first, left to right, in the same order values
/// are appended, so the values of the returned fragments can be bound as-is.
#[derive(Debug, Clone, Copy)]
pub struct FilterCompiler<'r> {
    registry: &'r OperatorRegistry,
    dialect: &'r Dialect,
}

impl<'r> FilterCompiler<'r> {
    pub fn new(registry: &'r OperatorRegistry, dialect: &'r Dialect) -> Self {
        Self { registry, dialect }
    }

    fn skipped(filter: &Filter<'_>) -> bool {
        if filter.field.is_skipped() {
            debug!(
                target: "pgstore::filter",
                field = %filter.field.name,
                operator = %filter.op,
                "dropping filter on skipped field"
            );
            return true;
        }
        false
    }

    /// Fragments of a single filter; multi-value filters yield one fragment per value.
    pub fn compile_leaf(
        &self,
        filter: &Filter<'_>,
        seq: &mut ParamSequencer,
    ) -> OrmResult<Vec<Fragment>> {
        let column = self.dialect.quote(filter.field.column_name());
        self.registry.render(&column, filter, seq)
    }

    /// `(a OR b)`, or the lone member when only one produces SQL.
    pub fn compile_group(
        &self,
        group: &OrGroup<'_>,
        seq: &mut ParamSequencer,
    ) -> OrmResult<Option<Fragment>> {
        let mut members = Vec::with_capacity(group.members.len());
        for filter in &group.members {
            if Self::skipped(filter) {
                continue;
            }
            let fragments = self.compile_leaf(filter, seq)?;
            match fragments.len() {
                0 => {}
                1 => members.extend(fragments),
                _ => {
                    let mut joined = Fragment::join(fragments, " AND ");
                    joined.sql = format!("({})", joined.sql);
                    members.push(joined);
                }
            }
        }

        Ok(match members.len() {
            0 => None,
            1 => members.pop(),
            _ => {
                let mut joined = Fragment::join(members, " OR ");
                joined.sql = format!("({})", joined.sql);
                Some(joined)
            }
        })
    }

    /// Fragments of every top-level node in order; to be AND-joined.
    pub fn compile(
        &self,
        nodes: &[FilterNode<'_>],
        seq: &mut ParamSequencer,
    ) -> OrmResult<Vec<Fragment>> {
        let mut out = Vec::new();
        for node in nodes {
            match node {
                FilterNode::Leaf(filter) => {
                    if Self::skipped(filter) {
                        continue;
                    }
                    out.extend(self.compile_leaf(filter, seq)?);
                }
                FilterNode::Or(group) => out.extend(self.compile_group(group, seq)?),
            }
        }
        Ok(out)
    }

    /// The AND-joined predicate, or `None` when nothing compiles to SQL.
    pub fn compile_where(
        &self,
        nodes: &[FilterNode<'_>],
        seq: &mut ParamSequencer,
    ) -> OrmResult<Option<Fragment>> {
        let fragments = self.compile(nodes, seq)?;
        if fragments.is_empty() {
            return Ok(None);
        }
        Ok(Some(Fragment::join(fragments, " AND ")))
    }
}
