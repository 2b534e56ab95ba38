//! Executor trait: the narrow interface compiled statements run through.

use crate::error::{OrmError, OrmResult};
use crate::stmt::Statement;
use futures_util::future::try_join_all;
use tokio_postgres::Row;
use tokio_postgres::types::ToSql;
use tracing::warn;

/// Outcome of one statement inside a batch.
#[derive(Debug)]
pub enum BatchResult {
    /// Rows produced by a statement with a `RETURNING` clause.
    Rows(Vec<Row>),
    /// Affected row count of a statement without one.
    Affected(u64),
}

impl BatchResult {
    pub fn rows(self) -> Vec<Row> {
        match self {
            BatchResult::Rows(rows) => rows,
            BatchResult::Affected(_) => Vec::new(),
        }
    }

    pub fn affected(&self) -> u64 {
        match self {
            BatchResult::Rows(rows) => rows.len() as u64,
            BatchResult::Affected(n) => *n,
        }
    }
}

/// A trait that unifies database clients and transactions.
///
/// Statement builders never touch the network; everything they produce is run
/// through an `Executor`, so callers can pass a plain connection, a pooled one or a
/// transaction interchangeably.
pub trait Executor: Send + Sync {
    /// Execute a query and return all rows.
    fn query(
        &self,
        sql: &str,
        params: &[&(dyn ToSql + Sync)],
    ) -> impl std::future::Future<Output = OrmResult<Vec<Row>>> + Send;

    /// Execute a query and return the **first** row.
    ///
    /// Returns [`OrmError::NotFound`] if no rows are returned.
    fn query_one(
        &self,
        sql: &str,
        params: &[&(dyn ToSql + Sync)],
    ) -> impl std::future::Future<Output = OrmResult<Row>> + Send {
        async move {
            let rows = self.query(sql, params).await?;
            rows.into_iter()
                .next()
                .ok_or_else(|| OrmError::not_found("Expected one row, got none"))
        }
    }

    /// Execute a statement and return the number of affected rows.
    fn execute(
        &self,
        sql: &str,
        params: &[&(dyn ToSql + Sync)],
    ) -> impl std::future::Future<Output = OrmResult<u64>> + Send;

    /// Run one or more parameterless statements (transaction control, DDL).
    fn batch_execute(&self, sql: &str) -> impl std::future::Future<Output = OrmResult<()>> + Send;

    /// Whether statements already run inside an open transaction.
    fn in_transaction(&self) -> bool {
        false
    }

    /// Submit a group of statements as one batch.
    ///
    /// Results come back in the same order as `batch`. Statements are pipelined
    /// on this connection into a single round trip. A batch of several statements
    /// is all-or-nothing: outside a transaction it is wrapped in `BEGIN`/`COMMIT`
    /// and rolled back on the first failure. Do not share the connection with
    /// other tasks while a batch is in flight.
    fn send_batch(
        &self,
        batch: &[Statement],
    ) -> impl std::future::Future<Output = OrmResult<Vec<BatchResult>>> + Send {
        async move {
            if batch.len() < 2 || self.in_transaction() {
                return pipeline(self, batch).await;
            }
            self.batch_execute("BEGIN").await?;
            match pipeline(self, batch).await {
                Ok(results) => {
                    self.batch_execute("COMMIT").await?;
                    Ok(results)
                }
                Err(err) => {
                    if let Err(rollback_err) = self.batch_execute("ROLLBACK").await {
                        warn!(
                            target: "pgstore::tx",
                            error = %err,
                            rollback_error = %rollback_err,
                            "batch rollback failed"
                        );
                    }
                    Err(err)
                }
            }
        }
    }
}

/// Issue every statement of `batch` concurrently; the first failure aborts it.
pub(crate) async fn pipeline<E: Executor + ?Sized>(
    executor: &E,
    batch: &[Statement],
) -> OrmResult<Vec<BatchResult>> {
    let pending = batch.iter().map(|stmt| async move {
        let params = stmt.params();
        if stmt.returns_rows {
            executor.query(&stmt.sql, &params).await.map(BatchResult::Rows)
        } else {
            executor
                .execute(&stmt.sql, &params)
                .await
                .map(BatchResult::Affected)
        }
    });
    try_join_all(pending).await
}

impl Executor for tokio_postgres::Client {
    async fn query(&self, sql: &str, params: &[&(dyn ToSql + Sync)]) -> OrmResult<Vec<Row>> {
        tokio_postgres::Client::query(self, sql, params)
            .await
            .map_err(OrmError::from_db_error)
    }

    async fn execute(&self, sql: &str, params: &[&(dyn ToSql + Sync)]) -> OrmResult<u64> {
        tokio_postgres::Client::execute(self, sql, params)
            .await
            .map_err(OrmError::from_db_error)
    }

    async fn batch_execute(&self, sql: &str) -> OrmResult<()> {
        tokio_postgres::Client::batch_execute(self, sql)
            .await
            .map_err(OrmError::from_db_error)
    }
}

impl Executor for tokio_postgres::Transaction<'_> {
    fn in_transaction(&self) -> bool {
        true
    }

    async fn query(&self, sql: &str, params: &[&(dyn ToSql + Sync)]) -> OrmResult<Vec<Row>> {
        tokio_postgres::Transaction::query(self, sql, params)
            .await
            .map_err(OrmError::from_db_error)
    }

    async fn execute(&self, sql: &str, params: &[&(dyn ToSql + Sync)]) -> OrmResult<u64> {
        tokio_postgres::Transaction::execute(self, sql, params)
            .await
            .map_err(OrmError::from_db_error)
    }

    async fn batch_execute(&self, sql: &str) -> OrmResult<()> {
        tokio_postgres::Transaction::batch_execute(self, sql)
            .await
            .map_err(OrmError::from_db_error)
    }
}

// ===== deadpool-postgres support =====

#[cfg(feature = "pool")]
impl Executor for deadpool_postgres::Client {
    async fn query(&self, sql: &str, params: &[&(dyn ToSql + Sync)]) -> OrmResult<Vec<Row>> {
        // Delegate to the deref target (ClientWrapper).
        Executor::query(&**self, sql, params).await
    }

    async fn execute(&self, sql: &str, params: &[&(dyn ToSql + Sync)]) -> OrmResult<u64> {
        Executor::execute(&**self, sql, params).await
    }

    async fn batch_execute(&self, sql: &str) -> OrmResult<()> {
        Executor::batch_execute(&**self, sql).await
    }
}

#[cfg(feature = "pool")]
impl Executor for deadpool_postgres::ClientWrapper {
    async fn query(&self, sql: &str, params: &[&(dyn ToSql + Sync)]) -> OrmResult<Vec<Row>> {
        Executor::query(&**self, sql, params).await
    }

    async fn execute(&self, sql: &str, params: &[&(dyn ToSql + Sync)]) -> OrmResult<u64> {
        Executor::execute(&**self, sql, params).await
    }

    async fn batch_execute(&self, sql: &str) -> OrmResult<()> {
        Executor::batch_execute(&**self, sql).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transaction::{Tx, TxOptions};
    use crate::value::Value;
    use std::sync::Mutex;

    /// Records every statement; fails the one whose SQL equals `fail_on`.
    #[derive(Default)]
    struct Recorder {
        log: Mutex<Vec<String>>,
        fail_on: Option<&'static str>,
    }

    impl Recorder {
        fn failing_on(sql: &'static str) -> Self {
            Self {
                fail_on: Some(sql),
                ..Self::default()
            }
        }

        fn record(&self, sql: &str) -> OrmResult<()> {
            self.log.lock().unwrap().push(sql.to_string());
            if self.fail_on == Some(sql) {
                return Err(OrmError::validation(format!("rejected: {sql}")));
            }
            Ok(())
        }

        fn log(&self) -> Vec<String> {
            self.log.lock().unwrap().clone()
        }
    }

    impl Executor for Recorder {
        async fn query(&self, sql: &str, _params: &[&(dyn ToSql + Sync)]) -> OrmResult<Vec<Row>> {
            self.record(sql).map(|()| Vec::new())
        }

        async fn execute(&self, sql: &str, _params: &[&(dyn ToSql + Sync)]) -> OrmResult<u64> {
            self.record(sql).map(|()| 1)
        }

        async fn batch_execute(&self, sql: &str) -> OrmResult<()> {
            self.record(sql)
        }
    }

    fn two_groups() -> Vec<Statement> {
        vec![
            Statement::new("INSERT INTO t (a) VALUES ($1)", vec![Value::I32(1)]),
            Statement::new("INSERT INTO t (a,b) VALUES ($1,$2)", vec![Value::I32(2), Value::I32(3)]),
        ]
    }

    #[tokio::test]
    async fn multi_statement_batch_runs_in_one_transaction() {
        let recorder = Recorder::default();
        let results = recorder.send_batch(&two_groups()).await.unwrap();
        assert_eq!(results.iter().map(BatchResult::affected).sum::<u64>(), 2);
        assert_eq!(
            recorder.log(),
            [
                "BEGIN",
                "INSERT INTO t (a) VALUES ($1)",
                "INSERT INTO t (a,b) VALUES ($1,$2)",
                "COMMIT"
            ]
        );
    }

    #[tokio::test]
    async fn failed_group_rolls_back_the_batch() {
        let recorder = Recorder::failing_on("INSERT INTO t (a,b) VALUES ($1,$2)");
        let err = recorder.send_batch(&two_groups()).await.unwrap_err();
        assert!(matches!(err, OrmError::Validation(_)));
        let log = recorder.log();
        assert_eq!(log.first().map(String::as_str), Some("BEGIN"));
        assert_eq!(log.last().map(String::as_str), Some("ROLLBACK"));
        assert!(!log.iter().any(|sql| sql == "COMMIT"));
    }

    #[tokio::test]
    async fn single_statement_is_not_wrapped() {
        let recorder = Recorder::default();
        let batch = vec![Statement::new("DELETE FROM t", Vec::new())];
        recorder.send_batch(&batch).await.unwrap();
        assert_eq!(recorder.log(), ["DELETE FROM t"]);
    }

    #[tokio::test]
    async fn batch_inside_tx_reuses_it() {
        let recorder = Recorder::default();
        let tx = Tx::begin(&recorder, TxOptions::new()).await.unwrap();
        tx.send_batch(&two_groups()).await.unwrap();
        tx.commit().await.unwrap();
        assert_eq!(
            recorder.log(),
            [
                "BEGIN",
                "INSERT INTO t (a) VALUES ($1)",
                "INSERT INTO t (a,b) VALUES ($1,$2)",
                "COMMIT"
            ]
        );
    }
}
