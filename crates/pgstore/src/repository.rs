//! Execution facade over the statement compiler and schema reconciler.
//!
//! A [`Repository`] owns the registries, the resolved [`Dialect`] and the
//! configuration; every call compiles statements, logs them on `pgstore::sql` and
//! runs them through the [`Executor`] it is given.
//!
//! ```ignore
//! let cache = KeywordCache::new();
//! let mut repo = Repository::new(RepositoryConfig::default())?;
//! repo.initialize(&client, &cache).await?;
//! repo.prepare(&mut entity)?;
//! repo.migrate(&client, &[&entity]).await?;
//!
//! let id = entity.field_by_name("id").unwrap();
//! let rows: Vec<Record> = repo
//!     .find(&client, &Query::new(&entity).filter(Filter::new(id, Operator::In, [3, 10])))
//!     .await?;
//! ```

use crate::client::{BatchResult, Executor};
use crate::config::RepositoryConfig;
use crate::error::{OrmError, OrmResult};
use crate::filter::OperatorRegistry;
use crate::keywords::{Dialect, KeywordCache, server_version};
use crate::model::{EntityDescriptor, Model, prepare};
use crate::row::RowExt;
use crate::schema::{DdlOp, LiveSchema, Reconciler, TypeRegistry};
use crate::stmt::{Query, Statement, StatementCompiler, materialize};
use crate::trace::SqlLogger;
use crate::transaction::{Tx, TxOptions};
use crate::value::Value;
use std::collections::BTreeSet;
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// Result of [`Repository::health_check`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HealthStatus {
    /// `SELECT version()` of the server.
    pub version: String,
    pub latency: Duration,
}

#[derive(Debug)]
pub struct Repository {
    config: RepositoryConfig,
    operators: OperatorRegistry,
    types: TypeRegistry,
    dialect: Dialect,
    logger: SqlLogger,
}

impl Repository {
    /// A repository with the built-in operators and types.
    ///
    /// Identifiers are not quoted until [`Repository::initialize`] or
    /// [`Repository::with_dialect`] supplies a keyword table.
    pub fn new(config: RepositoryConfig) -> OrmResult<Self> {
        config.validate()?;
        let logger = SqlLogger::new().max_sql_length(config.log_max_sql_length);
        Ok(Self {
            config,
            operators: OperatorRegistry::new(),
            types: TypeRegistry::new(),
            dialect: Dialect::unchecked(0),
            logger,
        })
    }

    pub fn with_dialect(mut self, dialect: Dialect) -> Self {
        self.dialect = dialect;
        self
    }

    pub fn with_logger(mut self, logger: SqlLogger) -> Self {
        self.logger = logger;
        self
    }

    pub fn config(&self) -> &RepositoryConfig {
        &self.config
    }

    pub fn dialect(&self) -> &Dialect {
        &self.dialect
    }

    pub fn operators(&self) -> &OperatorRegistry {
        &self.operators
    }

    /// Register extension operators here before compiling queries that use them.
    pub fn operators_mut(&mut self) -> &mut OperatorRegistry {
        &mut self.operators
    }

    pub fn types(&self) -> &TypeRegistry {
        &self.types
    }

    pub fn types_mut(&mut self) -> &mut TypeRegistry {
        &mut self.types
    }

    /// Resolve the server dialect, loading its keyword table into `cache` once per
    /// server version.
    pub async fn initialize<E: Executor>(
        &mut self,
        executor: &E,
        cache: &KeywordCache,
    ) -> OrmResult<()> {
        let version = server_version(executor).await?;
        self.dialect = cache.load(executor, version).await?;
        info!(target: "pgstore::keywords", version, "dialect resolved");
        Ok(())
    }

    /// Default physical names of `entity` and check every field maps onto a column type.
    pub fn prepare(&self, entity: &mut EntityDescriptor) -> OrmResult<()> {
        prepare(entity, &self.config.default_schema, &self.types)
    }

    pub fn compiler(&self) -> StatementCompiler<'_> {
        StatementCompiler::new(&self.operators, &self.dialect)
            .select_not_nulls_on_insert(self.config.select_not_nulls_on_insert)
    }

    /// Options for [`Repository::begin`] carrying the configured retry limit.
    pub fn tx_options(&self) -> TxOptions {
        TxOptions::new().retry_limit(self.config.commit_retry_limit)
    }

    pub async fn begin<'e, E: Executor>(
        &self,
        executor: &'e E,
        options: TxOptions,
    ) -> OrmResult<Tx<'e, E>> {
        let options = match options.retry_limit {
            Some(_) => options,
            None => options.retry_limit(self.config.commit_retry_limit),
        };
        self.logger.log_sql("begin", &options.begin_sql(), 0);
        Tx::begin(executor, options).await
    }

    /// Number of distinct rows matching the query's filters.
    pub async fn count<E: Executor>(&self, executor: &E, query: &Query<'_>) -> OrmResult<i64> {
        let statement = self.compiler().count(query)?;
        self.logger.log("count", &statement);
        let row = executor
            .query_one(&statement.sql, &statement.params())
            .await?;
        row.try_get_column::<i64>("count")
    }

    /// Rows matching the query, each materialized into a fresh `M`.
    pub async fn find<E, M>(&self, executor: &E, query: &Query<'_>) -> OrmResult<Vec<M>>
    where
        E: Executor,
        M: Model + Default,
    {
        let select = self.compiler().select(query)?;
        self.logger.log("select", &select.statement);
        let rows = executor
            .query(&select.statement.sql, &select.statement.params())
            .await?;
        let mut models = Vec::with_capacity(rows.len());
        for row in &rows {
            let mut model = M::default();
            materialize(&mut model, &select.fields, row)?;
            models.push(model);
        }
        Ok(models)
    }

    /// Insert `models` and write generated primary keys back into them.
    ///
    /// Every group is sent in one batch; returns the number of inserted rows.
    pub async fn insert<E, M>(
        &self,
        executor: &E,
        query: &Query<'_>,
        models: &mut [M],
    ) -> OrmResult<u64>
    where
        E: Executor,
        M: Model,
    {
        let groups = self.compiler().insert(query, models)?;
        let batch: Vec<Statement> = groups.iter().map(|g| g.statement.clone()).collect();
        for statement in &batch {
            self.logger.log("insert", statement);
        }
        let results = executor.send_batch(&batch).await?;

        let mut inserted = 0;
        for (group, result) in groups.iter().zip(results) {
            inserted += result.affected();
            if !group.returns_keys() {
                continue;
            }
            let rows = result.rows();
            if rows.len() != group.indices.len() {
                return Err(OrmError::decode(
                    "*",
                    format!(
                        "insert into {} returned {} keys for {} rows",
                        query.entity.name,
                        rows.len(),
                        group.indices.len()
                    ),
                ));
            }
            for (row, &index) in rows.iter().zip(&group.indices) {
                let key: Value = row
                    .try_get(0)
                    .map_err(|e| OrmError::decode("*", e.to_string()))?;
                models[index].set_primary_key(query.entity, key)?;
            }
        }
        Ok(inserted)
    }

    /// Run every update the query compiles to in one batch; returns the rows touched.
    pub async fn update<E, M>(&self, executor: &E, query: &Query<'_>, models: &[M]) -> OrmResult<u64>
    where
        E: Executor,
        M: Model,
    {
        let batch = self.compiler().update(query, models)?;
        for statement in &batch {
            self.logger.log("update", statement);
        }
        let results = executor.send_batch(&batch).await?;
        Ok(results.iter().map(BatchResult::affected).sum())
    }

    /// Delete the rows matching the query's filters; with none, every row.
    pub async fn delete<E: Executor>(&self, executor: &E, query: &Query<'_>) -> OrmResult<u64> {
        let statement = self.compiler().delete(query)?;
        self.logger.log("delete", &statement);
        executor
            .execute(&statement.sql, &statement.params())
            .await
    }

    /// Ops that would bring the schemas of `entities` in line with `live`.
    pub fn plan_migration(
        &self,
        entities: &[&EntityDescriptor],
        live: &LiveSchema,
    ) -> OrmResult<Vec<DdlOp>> {
        Reconciler::new(&self.types, &self.dialect)
            .index_prefix(&self.config.index_prefix)
            .plan(entities, live)
    }

    /// Introspect the schemas of `entities`, then create what is missing.
    ///
    /// Returns the ops that were executed; empty when the schema was already in line.
    pub async fn migrate<E: Executor>(
        &self,
        executor: &E,
        entities: &[&EntityDescriptor],
    ) -> OrmResult<Vec<DdlOp>> {
        let schemas: Vec<String> = entities
            .iter()
            .map(|e| e.schema_name().to_string())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        let live = LiveSchema::load(executor, &schemas).await?;
        let ops = self.plan_migration(entities, &live)?;
        for op in &ops {
            let sql = op.to_sql(&self.dialect);
            debug!(target: "pgstore::migrate", sql = %sql, "applying");
            executor.batch_execute(&sql).await?;
        }
        info!(
            target: "pgstore::migrate",
            entities = entities.len(),
            ops = ops.len(),
            "schema reconciled"
        );
        Ok(ops)
    }

    /// Round trip to the server: `SELECT 1` then `SELECT version()`.
    pub async fn health_check<E: Executor>(&self, executor: &E) -> OrmResult<HealthStatus> {
        let started = Instant::now();
        let row = executor.query_one("SELECT 1 AS ok", &[]).await?;
        let ok: i32 = row.try_get_column("ok")?;
        if ok != 1 {
            return Err(OrmError::validation(format!(
                "health check returned {ok}, expected 1"
            )));
        }
        let latency = started.elapsed();
        let row = executor
            .query_one("SELECT version() AS version", &[])
            .await?;
        Ok(HealthStatus {
            version: row.try_get_column("version")?,
            latency,
        })
    }
}
