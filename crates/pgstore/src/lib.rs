//! # pgstore
//!
//! Entity-driven PostgreSQL statement compiler and schema reconciler.
//!
//! ## Features
//!
//! - **Parameterized SQL only**: every value is bound as `$n`, numbered by a
//!   [`ParamSequencer`] scoped to one statement
//! - **Predicate trees**: filters with pluggable operator renderers, OR groups
//! - **Bulk writes**: heterogeneous inserts/updates grouped by identical column
//!   selection, with generated keys written back in input order
//! - **Keyword-aware quoting**: reserved words are quoted per server version
//! - **Schema reconciliation**: missing tables, columns, constraints and indexes
//!   are created; existing column types are never altered
//! - **Classified errors**: SQLSTATE codes map onto [`ErrorKind`]
//!
//! ## Compiling without a connection
//!
//! ```ignore
//! use pgstore::{Dialect, Filter, Operator, OperatorRegistry, Query, StatementCompiler};
//!
//! let operators = OperatorRegistry::new();
//! let dialect = Dialect::unchecked(160_000);
//! let id = entity.require_primary()?;
//! let stmt = StatementCompiler::new(&operators, &dialect)
//!     .delete(&Query::new(&entity).filter(Filter::new(id, Operator::In, [3, 10])))?;
//! assert_eq!(stmt.sql, "DELETE FROM public.models WHERE id IN ($1,$2)");
//! ```
//!
//! ## Running through a repository
//!
//! ```ignore
//! let pool = pgstore::create_pool(&database_url)?;
//! let client = pool.get().await?;
//! let cache = pgstore::KeywordCache::new();
//!
//! let mut repo = pgstore::Repository::new(pgstore::RepositoryConfig::load("pgstore.toml")?)?;
//! repo.initialize(&client, &cache).await?;
//! repo.prepare(&mut entity)?;
//! repo.migrate(&client, &[&entity]).await?;
//!
//! let mut rows = vec![Record::new().with("attr_string", "a")];
//! let fields = entity.field_set(&["attr_string"])?;
//! repo.insert(&client, &Query::new(&entity).field_set(fields), &mut rows).await?;
//! ```

pub mod classify;
pub mod client;
pub mod config;
pub mod error;
pub mod filter;
pub mod keywords;
pub mod model;
pub mod param;
pub mod repository;
pub mod row;
pub mod schema;
pub mod stmt;
pub mod trace;
pub mod transaction;
pub mod value;

#[cfg(feature = "pool")]
pub mod pool;

#[cfg(test)]
mod testing;

pub use classify::{ErrorKind, IntegrityKind, classify_code, classify_error};
pub use client::{BatchResult, Executor};
pub use config::RepositoryConfig;
pub use error::{OrmError, OrmResult};
pub use filter::{
    CustomRenderer, Filter, FilterCompiler, FilterNode, Fragment, Operator, OperatorRegistry,
    OrGroup, Renderer,
};
pub use keywords::{Dialect, KeywordCache, KeywordClass, KeywordTable, server_version};
pub use model::{
    EntityDescriptor, FieldDescriptor, FieldKind, FieldSet, FieldType, ForeignRef,
    IndexDescriptor, IndexMethod, Model, Record, TimeRole, prepare,
};
pub use param::ParamSequencer;
pub use repository::{HealthStatus, Repository};
pub use row::RowExt;
pub use schema::{
    ColumnType, DdlOp, ExternalColumn, LiveSchema, LiveTable, Reconciler, ScalarType,
    TypeRegistry,
};
pub use stmt::{
    BulkFieldSet, FieldSetGroup, InsertGroup, Pagination, Query, SelectStatement, SortField,
    SortOrder, Statement, StatementCompiler, materialize, materialize_values,
};
pub use trace::SqlLogger;
pub use transaction::{IsolationLevel, Tx, TxOptions};
pub use value::Value;

#[cfg(feature = "pool")]
pub use pool::{create_pool, create_pool_with_tls};
