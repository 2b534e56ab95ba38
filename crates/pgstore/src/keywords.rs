//! Reserved-keyword aware identifier quoting.
//!
//! The server's keyword list depends on its version, so tables are loaded once per
//! version (`pg_get_keywords()`) into a [`KeywordCache`] that the caller owns for the
//! lifetime of the process. A [`Dialect`] binds one version to its table and does
//! the actual quoting.

use crate::client::Executor;
use crate::error::{OrmError, OrmResult};
use std::borrow::Cow;
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};
use tracing::{debug, warn};

/// Keyword reservation class as reported by `pg_get_keywords().catcode`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeywordClass {
    /// `U`: usable anywhere.
    Unreserved,
    /// `C`: unreserved, but cannot be a function or type name.
    UnreservedRestricted,
    /// `R`: reserved.
    Reserved,
    /// `T`: reserved, but can be a function or type name.
    ReservedTypeFunc,
}

impl KeywordClass {
    /// Parse a catcode. Unknown codes are treated as reserved.
    pub fn from_catcode(code: &str) -> Self {
        match code {
            "U" => Self::Unreserved,
            "C" => Self::UnreservedRestricted,
            "T" => Self::ReservedTypeFunc,
            "R" => Self::Reserved,
            other => {
                warn!(target: "pgstore::keywords", catcode = other, "unknown keyword category, treating as reserved");
                Self::Reserved
            }
        }
    }

    pub fn requires_quoting(self) -> bool {
        !matches!(self, Self::Unreserved)
    }
}

/// Keyword list of one server version.
#[derive(Debug, Clone, Default)]
pub struct KeywordTable {
    words: HashMap<String, KeywordClass>,
}

impl KeywordTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, word: impl Into<String>, class: KeywordClass) {
        self.words.insert(word.into().to_ascii_lowercase(), class);
    }

    pub fn class_of(&self, word: &str) -> Option<KeywordClass> {
        self.words.get(&word.to_ascii_lowercase()).copied()
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }
}

impl<S: Into<String>> FromIterator<(S, KeywordClass)> for KeywordTable {
    fn from_iter<I: IntoIterator<Item = (S, KeywordClass)>>(iter: I) -> Self {
        let mut table = Self::new();
        for (word, class) in iter {
            table.insert(word, class);
        }
        table
    }
}

/// Process-wide cache of keyword tables keyed by server version number.
///
/// Lookups take a shared lock; populating a new version takes the exclusive lock
/// once. Entries are never evicted.
#[derive(Debug, Default)]
pub struct KeywordCache {
    tables: RwLock<HashMap<i32, Arc<KeywordTable>>>,
}

impl KeywordCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, version: i32) -> Option<Arc<KeywordTable>> {
        self.tables
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&version)
            .cloned()
    }

    /// Store `table` for `version`, keeping an existing entry if another caller won the race.
    pub fn insert(&self, version: i32, table: KeywordTable) -> Arc<KeywordTable> {
        let mut tables = self.tables.write().unwrap_or_else(PoisonError::into_inner);
        tables
            .entry(version)
            .or_insert_with(|| Arc::new(table))
            .clone()
    }

    /// Dialect for `version` using whatever is cached, without touching the server.
    ///
    /// With no cached table the dialect passes identifiers through unquoted.
    pub fn dialect(&self, version: i32) -> Dialect {
        match self.get(version) {
            Some(table) => Dialect::new(version, table),
            None => {
                warn!(
                    target: "pgstore::keywords",
                    version, "no keyword table cached for server version, identifiers will not be quoted"
                );
                Dialect::unchecked(version)
            }
        }
    }

    /// Resolve the dialect for `version`, loading its keyword table on first use.
    pub async fn load<E: Executor>(&self, executor: &E, version: i32) -> OrmResult<Dialect> {
        if let Some(table) = self.get(version) {
            return Ok(Dialect::new(version, table));
        }

        let rows = executor
            .query("SELECT word, catcode::text FROM pg_get_keywords()", &[])
            .await?;
        let mut table = KeywordTable::new();
        for row in &rows {
            let word: String = row
                .try_get(0)
                .map_err(|e| OrmError::decode("word", e.to_string()))?;
            let catcode: String = row
                .try_get(1)
                .map_err(|e| OrmError::decode("catcode", e.to_string()))?;
            table.insert(word, KeywordClass::from_catcode(&catcode));
        }
        debug!(target: "pgstore::keywords", version, words = table.len(), "loaded keyword table");
        Ok(Dialect::new(version, self.insert(version, table)))
    }
}

/// Read the server version number (`SHOW server_version_num`).
pub async fn server_version<E: Executor>(executor: &E) -> OrmResult<i32> {
    let row = executor.query_one("SHOW server_version_num", &[]).await?;
    let raw: String = row
        .try_get(0)
        .map_err(|e| OrmError::decode("server_version_num", e.to_string()))?;
    raw.trim()
        .parse()
        .map_err(|_| OrmError::decode("server_version_num", format!("not a number: {raw:?}")))
}

/// SQL dialect of one server version.
#[derive(Debug, Clone)]
pub struct Dialect {
    version: i32,
    keywords: Option<Arc<KeywordTable>>,
}

impl Dialect {
    pub fn new(version: i32, keywords: Arc<KeywordTable>) -> Self {
        Self {
            version,
            keywords: Some(keywords),
        }
    }

    /// A dialect without a keyword table: every identifier is emitted verbatim.
    pub fn unchecked(version: i32) -> Self {
        Self {
            version,
            keywords: None,
        }
    }

    pub fn version(&self) -> i32 {
        self.version
    }

    pub fn has_keywords(&self) -> bool {
        self.keywords.is_some()
    }

    /// Whether `word` must be double-quoted to be used as an identifier.
    pub fn needs_quoting(&self, word: &str) -> bool {
        let Some(keywords) = &self.keywords else {
            return false;
        };
        !is_plain_identifier(word)
            || keywords
                .class_of(word)
                .is_some_and(KeywordClass::requires_quoting)
    }

    /// Render `word` as an identifier, quoting it when required.
    pub fn quote<'a>(&self, word: &'a str) -> Cow<'a, str> {
        if self.needs_quoting(word) {
            Cow::Owned(format!("\"{}\"", word.replace('"', "\"\"")))
        } else {
            Cow::Borrowed(word)
        }
    }

    /// Append the rendered identifier to `buf`.
    pub fn write_quoted(&self, buf: &mut String, word: &str) {
        buf.push_str(&self.quote(word));
    }

    /// `schema.table`, each part quoted independently.
    pub fn qualified(&self, schema: &str, table: &str) -> String {
        format!("{}.{}", self.quote(schema), self.quote(table))
    }
}

/// `[a-z_][a-z0-9_$]*`: the form the server folds to itself when unquoted.
fn is_plain_identifier(word: &str) -> bool {
    let mut chars = word.chars();
    match chars.next() {
        Some(c) if c.is_ascii_lowercase() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_' || c == '$')
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dialect() -> Dialect {
        let table: KeywordTable = [
            ("user", KeywordClass::ReservedTypeFunc),
            ("order", KeywordClass::Reserved),
            ("between", KeywordClass::UnreservedRestricted),
            ("name", KeywordClass::Unreserved),
        ]
        .into_iter()
        .collect();
        Dialect::new(160000, Arc::new(table))
    }

    #[test]
    fn quotes_reserved_classes_only() {
        let d = dialect();
        assert_eq!(d.quote("user"), "\"user\"");
        assert_eq!(d.quote("order"), "\"order\"");
        assert_eq!(d.quote("between"), "\"between\"");
        assert_eq!(d.quote("name"), "name");
        assert_eq!(d.quote("attr_string"), "attr_string");
    }

    #[test]
    fn quotes_non_folding_identifiers() {
        let d = dialect();
        assert_eq!(d.quote("CamelCase"), "\"CamelCase\"");
        assert_eq!(d.quote("we\"ird"), "\"we\"\"ird\"");
        assert_eq!(d.qualified("public", "order"), "public.\"order\"");
    }

    #[test]
    fn unchecked_dialect_passes_through() {
        let d = Dialect::unchecked(160000);
        assert!(!d.has_keywords());
        assert_eq!(d.quote("user"), "user");
    }

    #[test]
    fn cache_keeps_first_table_per_version() {
        let cache = KeywordCache::new();
        assert!(cache.get(150000).is_none());
        assert!(!cache.dialect(150000).has_keywords());

        let first = cache.insert(150000, [("user", KeywordClass::Reserved)].into_iter().collect());
        let second = cache.insert(150000, KeywordTable::new());
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(second.len(), 1);
        assert!(cache.dialect(150000).needs_quoting("user"));
        assert!(cache.get(160000).is_none());
    }

    #[test]
    fn unknown_catcode_is_reserved() {
        assert_eq!(KeywordClass::from_catcode("X"), KeywordClass::Reserved);
        assert!(!KeywordClass::from_catcode("U").requires_quoting());
    }
}
