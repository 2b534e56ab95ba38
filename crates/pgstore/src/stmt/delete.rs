use crate::error::OrmResult;
use crate::param::ParamSequencer;
use crate::stmt::{Query, Statement, StatementCompiler};

impl StatementCompiler<'_> {
    /// `DELETE FROM schema.table [WHERE ...]`.
    ///
    /// An empty predicate deletes every row.
    pub fn delete(&self, query: &Query<'_>) -> OrmResult<Statement> {
        let mut sql = format!("DELETE FROM {}", self.table(query.entity));
        let mut seq = ParamSequencer::new();
        let mut values = Vec::new();
        if let Some(predicate) = self
            .filter_compiler()
            .compile_where(&query.filters, &mut seq)?
        {
            sql.push_str(" WHERE ");
            sql.push_str(&predicate.sql);
            values = predicate.values;
        }
        Ok(Statement::new(sql, values))
    }
}
