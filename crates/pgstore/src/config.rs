//! Repository configuration.
//!
//! ```toml
//! default_schema = "app"
//! select_not_nulls_on_insert = true
//! commit_retry_limit = 5
//! log_max_sql_length = 200
//! index_prefix = "pgs_auto_"
//! ```

use crate::error::{OrmError, OrmResult};
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RepositoryConfig {
    /// Add absent not-null columns to insert field sets, bound to their zero value.
    pub select_not_nulls_on_insert: bool,
    /// Schema of entities that do not name one.
    pub default_schema: String,
    /// Upper bound on commit/rollback retries of serialization failures and
    /// deadlocks. `None` retries until the outcome is not retryable.
    pub commit_retry_limit: Option<u32>,
    /// Truncate logged SQL to this many bytes. `None` logs it whole.
    pub log_max_sql_length: Option<usize>,
    /// Prefix of reconciler-managed index names.
    pub index_prefix: String,
}

impl Default for RepositoryConfig {
    fn default() -> Self {
        Self {
            select_not_nulls_on_insert: true,
            default_schema: "public".to_string(),
            commit_retry_limit: None,
            log_max_sql_length: Some(200),
            index_prefix: "pgs_auto_".to_string(),
        }
    }
}

impl RepositoryConfig {
    pub fn from_toml_str(raw: &str) -> OrmResult<Self> {
        let config: Self = toml::from_str(raw)
            .map_err(|e| OrmError::configuration(format!("invalid repository config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> OrmResult<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| {
            OrmError::configuration(format!("failed to read {}: {e}", path.display()))
        })?;
        Self::from_toml_str(&raw)
    }

    pub fn select_not_nulls_on_insert(mut self, enabled: bool) -> Self {
        self.select_not_nulls_on_insert = enabled;
        self
    }

    pub fn default_schema(mut self, schema: impl Into<String>) -> Self {
        self.default_schema = schema.into();
        self
    }

    pub fn commit_retry_limit(mut self, limit: Option<u32>) -> Self {
        self.commit_retry_limit = limit;
        self
    }

    pub fn log_max_sql_length(mut self, len: Option<usize>) -> Self {
        self.log_max_sql_length = len;
        self
    }

    pub fn index_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.index_prefix = prefix.into();
        self
    }

    pub fn validate(&self) -> OrmResult<()> {
        if self.default_schema.trim().is_empty() {
            return Err(OrmError::configuration("default_schema must not be empty"));
        }
        if self.index_prefix.len() >= crate::schema::MAX_IDENTIFIER_LEN {
            return Err(OrmError::configuration(format!(
                "index_prefix must be shorter than {} bytes",
                crate::schema::MAX_IDENTIFIER_LEN
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_gives_defaults() {
        assert_eq!(
            RepositoryConfig::from_toml_str("").unwrap(),
            RepositoryConfig::default()
        );
    }

    #[test]
    fn reads_every_key() {
        let config = RepositoryConfig::from_toml_str(
            r#"
select_not_nulls_on_insert = false
default_schema = "app"
commit_retry_limit = 3
log_max_sql_length = 80
index_prefix = "ix_"
"#,
        )
        .unwrap();
        assert!(!config.select_not_nulls_on_insert);
        assert_eq!(config.default_schema, "app");
        assert_eq!(config.commit_retry_limit, Some(3));
        assert_eq!(config.log_max_sql_length, Some(80));
        assert_eq!(config.index_prefix, "ix_");
    }

    #[test]
    fn setters_chain_and_validate() {
        let config = RepositoryConfig::default()
            .default_schema("audit")
            .commit_retry_limit(Some(2))
            .index_prefix("x".repeat(63));
        assert_eq!(config.default_schema, "audit");
        assert_eq!(config.commit_retry_limit, Some(2));
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_unknown_keys_and_blank_schema() {
        assert!(RepositoryConfig::from_toml_str("retries = 2").is_err());
        assert!(RepositoryConfig::from_toml_str("default_schema = ' '").is_err());
    }
}
