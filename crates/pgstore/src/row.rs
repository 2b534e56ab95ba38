//! Row access helpers.

use crate::error::{OrmError, OrmResult};
use tokio_postgres::Row;
use tokio_postgres::types::FromSql;

/// Extension trait for decoding columns with column-named errors.
pub trait RowExt {
    /// Try to get a column value, returning [`OrmError::Decode`] on failure.
    fn try_get_column<T>(&self, column: &str) -> OrmResult<T>
    where
        T: for<'a> FromSql<'a>;
}

impl RowExt for Row {
    fn try_get_column<T>(&self, column: &str) -> OrmResult<T>
    where
        T: for<'a> FromSql<'a>,
    {
        self.try_get(column)
            .map_err(|e| OrmError::decode(column, e.to_string()))
    }
}
