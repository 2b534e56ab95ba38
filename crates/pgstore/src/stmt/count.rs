use crate::error::OrmResult;
use crate::param::ParamSequencer;
use crate::stmt::{Query, Statement, StatementCompiler};

impl StatementCompiler<'_> {
    /// `SELECT COUNT(DISTINCT pk) FROM schema.table [WHERE ...]`.
    ///
    /// Sorting and pagination on the query are ignored.
    pub fn count(&self, query: &Query<'_>) -> OrmResult<Statement> {
        let pk = query.entity.require_primary()?;
        let mut sql = format!(
            "SELECT COUNT(DISTINCT {}) FROM {}",
            self.column(pk),
            self.table(query.entity)
        );

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

        Ok(Statement::new(sql, values).returning_rows())
    }
}
