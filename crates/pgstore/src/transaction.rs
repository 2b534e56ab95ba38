//! Transactions over any [`Executor`].
//!
//! [`Tx`] issues `BEGIN`/`COMMIT`/`ROLLBACK` on the executor it wraps and is
//! itself an [`Executor`], so compiled statements run inside it unchanged.
//!
//! ```ignore
//! use pgstore::{Tx, TxOptions, IsolationLevel};
//!
//! let tx = Tx::begin(&client, TxOptions::new().isolation(IsolationLevel::Serializable)).await?;
//! repo.delete(&tx, &query).await?;
//! tx.commit().await?;
//! ```

use crate::classify::ErrorKind;
use crate::client::{BatchResult, Executor, pipeline};
use crate::error::{OrmError, OrmResult};
use crate::stmt::Statement;
use tokio_postgres::Row;
use tokio_postgres::types::ToSql;
use tracing::warn;

/// Runs the given block inside a [`Tx`].
///
/// Commits on `Ok(_)` and rolls back on `Err(_)`. The block must evaluate to
/// `pgstore::OrmResult<T>`. A failed rollback is logged and the block's error is
/// returned.
///
/// ```ignore
/// let n = pgstore::transaction!(&client, tx, {
///     repo.update(&tx, &query, &models).await
/// })?;
/// ```
#[macro_export]
macro_rules! transaction {
    ($executor:expr, $tx:ident, $body:block) => {
        $crate::transaction!($executor, $crate::TxOptions::default(), $tx, $body)
    };
    ($executor:expr, $options:expr, $tx:ident, $body:block) => {{
        let $tx = $crate::Tx::begin($executor, $options).await?;

        let __pgstore_tx_body_result = async { $body }.await;
        match __pgstore_tx_body_result {
            Ok(value) => {
                $tx.commit().await?;
                Ok(value)
            }
            Err(error) => {
                if let Err(rollback_err) = $tx.rollback().await {
                    $crate::transaction::__rollback_failed(&error, &rollback_err);
                }
                Err(error)
            }
        }
    }};
}

#[doc(hidden)]
pub fn __rollback_failed(error: &OrmError, rollback_err: &OrmError) {
    warn!(
        target: "pgstore::tx",
        error = %error,
        rollback_error = %rollback_err,
        "rollback failed"
    );
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IsolationLevel {
    /// Server default; no isolation clause is sent.
    #[default]
    Default,
    ReadUncommitted,
    ReadCommitted,
    RepeatableRead,
    /// Alias of `RepeatableRead`, which is snapshot isolation on this server.
    Snapshot,
    Serializable,
}

impl IsolationLevel {
    pub fn as_sql(&self) -> Option<&'static str> {
        match self {
            IsolationLevel::Default => None,
            IsolationLevel::ReadUncommitted => Some("READ UNCOMMITTED"),
            IsolationLevel::ReadCommitted => Some("READ COMMITTED"),
            IsolationLevel::RepeatableRead | IsolationLevel::Snapshot => Some("REPEATABLE READ"),
            IsolationLevel::Serializable => Some("SERIALIZABLE"),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TxOptions {
    pub isolation: IsolationLevel,
    pub read_only: bool,
    /// Bound on commit/rollback retries; `None` retries until the outcome is
    /// not retryable.
    pub retry_limit: Option<u32>,
}

impl TxOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn isolation(mut self, level: IsolationLevel) -> Self {
        self.isolation = level;
        self
    }

    pub fn read_only(mut self, read_only: bool) -> Self {
        self.read_only = read_only;
        self
    }

    pub fn retry_limit(mut self, limit: Option<u32>) -> Self {
        self.retry_limit = limit;
        self
    }

    pub fn begin_sql(&self) -> String {
        let mut sql = String::from("BEGIN");
        if let Some(level) = self.isolation.as_sql() {
            sql.push_str(" ISOLATION LEVEL ");
            sql.push_str(level);
        }
        if self.read_only {
            sql.push_str(" READ ONLY");
        }
        sql
    }
}

/// An open transaction on a borrowed executor.
///
/// Dropping a `Tx` without calling [`Tx::commit`] or [`Tx::rollback`] leaves the
/// transaction open on the connection; a warning is logged.
pub struct Tx<'e, E: Executor> {
    executor: &'e E,
    retry_limit: Option<u32>,
    finished: bool,
}

impl<'e, E: Executor> Tx<'e, E> {
    pub async fn begin(executor: &'e E, options: TxOptions) -> OrmResult<Self> {
        executor.batch_execute(&options.begin_sql()).await?;
        Ok(Self {
            executor,
            retry_limit: options.retry_limit,
            finished: false,
        })
    }

    pub async fn commit(mut self) -> OrmResult<()> {
        self.finished = true;
        self.finish("COMMIT").await
    }

    pub async fn rollback(mut self) -> OrmResult<()> {
        self.finished = true;
        self.finish("ROLLBACK").await
    }

    async fn finish(&self, sql: &str) -> OrmResult<()> {
        let mut attempt = 0u32;
        loop {
            match self.executor.batch_execute(sql).await {
                Ok(()) => return Ok(()),
                Err(err) if should_retry(err.code(), attempt, self.retry_limit) => {
                    attempt += 1;
                    warn!(
                        target: "pgstore::tx",
                        statement = sql,
                        attempt,
                        error = %err,
                        "retrying"
                    );
                }
                Err(err) => return Err(err),
            }
        }
    }
}

fn should_retry(code: Option<&str>, attempt: u32, limit: Option<u32>) -> bool {
    code.is_some_and(ErrorKind::is_retryable_code) && limit.is_none_or(|limit| attempt < limit)
}

impl<E: Executor> Drop for Tx<'_, E> {
    fn drop(&mut self) {
        if !self.finished {
            warn!(target: "pgstore::tx", "transaction dropped without commit or rollback");
        }
    }
}

impl<E: Executor> Executor for Tx<'_, E> {
    fn in_transaction(&self) -> bool {
        true
    }

    async fn query(&self, sql: &str, params: &[&(dyn ToSql + Sync)]) -> OrmResult<Vec<Row>> {
        self.executor.query(sql, params).await
    }

    async fn execute(&self, sql: &str, params: &[&(dyn ToSql + Sync)]) -> OrmResult<u64> {
        self.executor.execute(sql, params).await
    }

    async fn batch_execute(&self, sql: &str) -> OrmResult<()> {
        self.executor.batch_execute(sql).await
    }

    async fn send_batch(&self, batch: &[Statement]) -> OrmResult<Vec<BatchResult>> {
        pipeline(self.executor, batch).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn begin_statement_carries_options() {
        assert_eq!(TxOptions::new().begin_sql(), "BEGIN");
        assert_eq!(
            TxOptions::new()
                .isolation(IsolationLevel::Serializable)
                .read_only(true)
                .begin_sql(),
            "BEGIN ISOLATION LEVEL SERIALIZABLE READ ONLY"
        );
        assert_eq!(
            TxOptions::new()
                .isolation(IsolationLevel::Snapshot)
                .begin_sql(),
            "BEGIN ISOLATION LEVEL REPEATABLE READ"
        );
    }

    #[test]
    fn retries_only_transient_failures() {
        assert!(should_retry(Some("40001"), 0, None));
        assert!(should_retry(Some("40P01"), 100, None));
        assert!(!should_retry(Some("23505"), 0, None));
        assert!(!should_retry(None, 0, None));
    }

    #[test]
    fn retry_limit_bounds_attempts() {
        assert!(should_retry(Some("40001"), 1, Some(2)));
        assert!(!should_retry(Some("40001"), 2, Some(2)));
        assert!(!should_retry(Some("40001"), 0, Some(0)));
    }
}
