//! Mutable statements on top of the splitter.
//!
//! A [`Query`] keeps the original statement untouched and records mutations
//! next to it: replacements overwrite a part, additions are merged into it
//! with [`Splitter::add_parts`]. The statement is only split when a mutation
//! or a reader needs its parts, and only joined again when something
//! changed.
//!
//! Subqueries taken with [`Query::subquery_mut`] stay attached to their
//! parent: changes made to them show up in the parent's statement.
//!
//! ```ignore
//! let mut query = Splitter::mysql().query("SELECT id, description FROM `test`");
//! query
//!     .column("abc")?
//!     .left_join("abc", "test.id = abc.idTest")?
//!     .where_value("status", 1)?;
//! assert_eq!(
//!     query.to_sql()?,
//!     "SELECT id, description, `abc` FROM `test` LEFT JOIN `abc` ON `test`.`id` = `abc`.`idTest` WHERE `status` = 1"
//! );
//! ```

mod build;
mod options;

pub use options::{Assign, PartOptions, Placement, SortOrder};

use std::borrow::Cow;
use std::cell::RefCell;

use indexmap::IndexMap;

use crate::error::{SplitError, SplitResult};
use crate::extract::Limit;
use crate::merge::Addition;
use crate::parts::Parts;
use crate::query_type::{QueryType, type_name};
use crate::quote::QuoteMode;
use crate::splitter::Splitter;
use crate::value::{Params, Value};

/// Value of the `on duplicate key update` part that expands to an update of
/// every inserted column.
const AUTO_UPDATE_MARKER: &str = "1";

/// Derived state, recomputed after every mutation.
#[derive(Debug, Clone, Default)]
struct Cache {
    base: Option<Parts>,
    composed: Option<Parts>,
    statement: Option<String>,
}

/// A statement with pending mutations and bound parameters.
///
/// Mutators validate and quote their input before recording anything, so a
/// failed call leaves the query as it was. Readers work on the mutated
/// statement. A `Query` caches its derived state internally and is meant to
/// be owned by one caller at a time.
#[derive(Debug, Clone)]
pub struct Query {
    statement: String,
    splitter: Splitter,
    replacements: IndexMap<String, String>,
    additions: IndexMap<String, Addition>,
    params: Params,
    subqueries: IndexMap<usize, Query>,
    cache: RefCell<Cache>,
}

impl Query {
    pub fn new(statement: impl Into<String>, splitter: Splitter) -> Self {
        Self {
            statement: statement.into(),
            splitter,
            replacements: IndexMap::new(),
            additions: IndexMap::new(),
            params: Params::new(),
            subqueries: IndexMap::new(),
            cache: RefCell::new(Cache::default()),
        }
    }

    pub fn splitter(&self) -> &Splitter {
        &self.splitter
    }

    /// The statement the query was created with.
    pub fn statement(&self) -> &str {
        &self.statement
    }

    /// The type of the statement, e.g. `SELECT`.
    pub fn query_type(&self) -> Option<QueryType> {
        self.splitter.query_type(&self.statement)
    }

    /// A new query for the statement without any mutations or parameters.
    pub fn base_statement(&self) -> Query {
        Query::new(self.statement.clone(), self.splitter)
    }

    fn is_mutated(&self) -> bool {
        !self.replacements.is_empty() || !self.additions.is_empty()
    }

    /// Whether rendering may differ from the plain statement.
    fn is_changed(&self) -> bool {
        self.is_mutated()
            || !self.params.is_empty()
            || self.subqueries.values().any(Query::is_changed)
    }

    /// Attached subqueries can change behind a `&mut`, so nothing derived
    /// from them is cached.
    fn cacheable(&self) -> bool {
        self.subqueries.is_empty()
    }

    /// The statement with all mutations applied and parameters bound.
    pub fn to_sql(&self) -> SplitResult<String> {
        let statement = if self.is_mutated() {
            self.composed_statement()?
        } else {
            self.base_text()?.into_owned()
        };

        let sql = self.splitter.bind(&statement, &self.params);
        tracing::trace!(target: "sqlparts.query", sql = %sql, "rendered query");
        Ok(sql)
    }

    fn composed_statement(&self) -> SplitResult<String> {
        if let Some(statement) = &self.cache.borrow().statement {
            return Ok(statement.clone());
        }
        let statement = self.splitter.join(&self.parts()?);
        if self.cacheable() {
            self.cache.borrow_mut().statement = Some(statement.clone());
        }
        Ok(statement)
    }

    /// The parts of the statement with all mutations applied.
    pub fn parts(&self) -> SplitResult<Parts> {
        if let Some(parts) = &self.cache.borrow().composed {
            return Ok(parts.clone());
        }
        let parts = self.compose()?;
        if self.cacheable() {
            self.cache.borrow_mut().composed = Some(parts.clone());
        }
        Ok(parts)
    }

    fn base_parts(&self) -> SplitResult<Parts> {
        if let Some(parts) = &self.cache.borrow().base {
            return Ok(parts.clone());
        }
        let parts = self.splitter.split(&self.base_text()?)?;
        if self.cacheable() {
            self.cache.borrow_mut().base = Some(parts.clone());
        }
        Ok(parts)
    }

    /// The statement with the current text of every changed subquery in
    /// place. An enclosing subquery's text wins over the ones nested in it.
    fn base_text(&self) -> SplitResult<Cow<'_, str>> {
        if !self.subqueries.values().any(Query::is_changed) {
            return Ok(Cow::Borrowed(&self.statement));
        }

        let mut sets = self.splitter.extract_subsets(&self.statement)?;
        for (&index, subquery) in &self.subqueries {
            if subquery.is_changed() {
                sets[index] = subquery.to_sql()?;
            }
        }
        Ok(Cow::Owned(self.splitter.inject_subsets(&sets)))
    }

    /// Base parts, then replacements, then additions.
    fn compose(&self) -> SplitResult<Parts> {
        let mut parts = self.base_parts()?;
        if !self.is_mutated() {
            return Ok(parts);
        }

        for (key, value) in &self.replacements {
            parts.insert(key.as_str(), value.as_str());
        }
        if !self.additions.is_empty() {
            parts = self.splitter.add_parts(&parts, &self.additions);
        }

        if parts.keys().next() == Some("select") && parts.text("columns").trim().is_empty() {
            parts.insert("columns", "*");
        }

        if parts
            .get("on duplicate key update")
            .is_some_and(|v| v.trim() == AUTO_UPDATE_MARKER)
        {
            let assignments = self
                .splitter
                .split_columns(&parts)?
                .iter()
                .map(|column| {
                    let column = self.splitter.quote_identifier(column, QuoteMode::Strict)?;
                    Ok(format!("{column} = VALUES({column})"))
                })
                .collect::<SplitResult<Vec<_>>>()?;
            parts.insert("on duplicate key update", assignments.join(", "));
        }

        Ok(parts
            .into_iter()
            .map(|(key, value)| {
                let value = value.trim().to_string();
                (key, value)
            })
            .collect())
    }

    fn invalidate(&mut self) {
        let cache = self.cache.get_mut();
        cache.composed = None;
        cache.statement = None;
    }

    fn invalidate_all(&mut self) {
        *self.cache.get_mut() = Cache::default();
    }

    /// Record a fragment for a part of the base statement.
    fn set_part(&mut self, part: &str, fragment: String, placement: Placement) -> SplitResult<&mut Self> {
        self.ensure_part(part)?;
        self.invalidate();

        match placement {
            Placement::Replace => {
                self.replacements.insert(part.to_string(), fragment);
            }
            Placement::Prepend => {
                self.additions.entry(part.to_string()).or_default().prepend.push(fragment);
            }
            Placement::Append => {
                self.additions.entry(part.to_string()).or_default().append.push(fragment);
            }
        }

        Ok(self)
    }

    fn ensure_part(&self, part: &str) -> SplitResult<()> {
        if self.base_parts()?.contains_key(part) {
            return Ok(());
        }
        Err(SplitError::missing_part(format!(
            "A {} query doesn't have a {part} part",
            type_name(self.query_type().as_ref())
        )))
    }

    // ==================== Parameters ====================

    /// Bind positional parameters, replacing any bound before.
    pub fn bind<I, V>(&mut self, values: I) -> &mut Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.params.positional = values.into_iter().map(Into::into).collect();
        self
    }

    /// Bind named parameters, keeping those bound before.
    pub fn bind_named<I, K, V>(&mut self, values: I) -> &mut Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        for (name, value) in values {
            self.params.set(name, value);
        }
        self
    }

    pub fn params(&self) -> &Params {
        &self.params
    }

    // ==================== Reading ====================

    /// Subquery `index` of the statement, numbered from 1 in order of
    /// appearance.
    ///
    /// Returns a copy: a subquery changed through [`Query::subquery_mut`]
    /// comes back with its changes, but changing the copy doesn't affect
    /// this query.
    pub fn subquery(&self, index: usize) -> SplitResult<Query> {
        match self.subqueries.get(&index) {
            Some(subquery) => Ok(subquery.clone()),
            None => self.detach_subquery(index),
        }
    }

    /// Subquery `index` of the statement, attached to this query.
    ///
    /// Mutations and parameters applied to the returned query are part of
    /// this query's statement from then on. Indexes always refer to the
    /// subqueries of the statement this query was created with.
    pub fn subquery_mut(&mut self, index: usize) -> SplitResult<&mut Query> {
        let subquery = match self.subqueries.shift_remove(&index) {
            Some(subquery) => subquery,
            None => self.detach_subquery(index)?,
        };
        self.invalidate_all();
        Ok(self.subqueries.entry(index).or_insert(subquery))
    }

    fn detach_subquery(&self, index: usize) -> SplitResult<Query> {
        let mut sets = self.splitter.extract_subsets(&self.statement)?;
        let count = sets.len() - 1;
        if index == 0 || index > count {
            return Err(SplitError::SubqueryOutOfRange { index, count });
        }

        sets[0] = sets[index].clone();
        tracing::trace!(target: "sqlparts.query", index, count, "took subquery");
        Ok(Query::new(self.splitter.inject_subsets(&sets), self.splitter))
    }

    /// A query counting the rows this query would return, respecting its
    /// `LIMIT`.
    pub fn count(&self) -> SplitResult<Query> {
        let sql = self.splitter.build_count_query(&self.parts()?, false)?;
        Ok(Query::new(sql, self.splitter))
    }

    /// A query counting all rows, ignoring any `LIMIT`.
    pub fn count_all(&self) -> SplitResult<Query> {
        let sql = self.splitter.build_count_query(&self.parts()?, true)?;
        Ok(Query::new(sql, self.splitter))
    }

    /// See [`Splitter::split_tables`].
    pub fn split_tables(&self) -> SplitResult<IndexMap<String, String>> {
        self.splitter.split_tables(&self.parts()?)
    }

    /// See [`Splitter::split_columns`].
    pub fn split_columns(&self) -> SplitResult<Vec<String>> {
        self.splitter.split_columns(&self.parts()?)
    }

    /// See [`Splitter::split_set`].
    pub fn split_set(&self) -> SplitResult<IndexMap<String, String>> {
        self.splitter.split_set(&self.parts()?)
    }

    /// See [`Splitter::split_set_values`].
    pub fn split_set_values(&self) -> SplitResult<IndexMap<String, Value>> {
        self.splitter.split_set_values(&self.parts()?)
    }

    /// See [`Splitter::split_values`].
    pub fn split_values(&self) -> SplitResult<Vec<Vec<String>>> {
        self.splitter.split_values(&self.parts()?)
    }

    /// See [`Splitter::split_values_unquoted`].
    pub fn split_values_unquoted(&self) -> SplitResult<Vec<Vec<Value>>> {
        self.splitter.split_values_unquoted(&self.parts()?)
    }

    /// See [`Splitter::split_limit`].
    pub fn split_limit(&self) -> SplitResult<Limit> {
        self.splitter.split_limit(&self.parts()?)
    }

    /// The row count of the `LIMIT` part.
    pub fn row_limit(&self) -> SplitResult<Option<u64>> {
        Ok(self.split_limit()?.0)
    }

    /// The offset of the `LIMIT` part.
    pub fn row_offset(&self) -> SplitResult<Option<u64>> {
        Ok(self.split_limit()?.1)
    }
}
