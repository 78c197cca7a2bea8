//! Factory for new statements.

use crate::config::SplitterConfig;
use crate::dialect::DialectKind;
use crate::error::{SplitError, SplitResult};
use crate::lexer::is_word;
use crate::query::Query;
use crate::splitter::Splitter;

/// Starts queries of a fixed dialect.
///
/// ```ignore
/// let builder = Builder::new(DialectKind::MySql);
/// let mut query = builder.select(["id", "name"])?;
/// query.from("users")?.where_value("active", true)?;
/// assert_eq!(query.to_sql()?, "SELECT `id`, `name` FROM `users` WHERE `active` = TRUE");
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct Builder {
    splitter: Splitter,
}

impl Builder {
    pub fn new(dialect: DialectKind) -> Self {
        Self {
            splitter: Splitter::new(SplitterConfig::new().with_dialect(dialect)),
        }
    }

    /// A builder for a dialect given by name.
    pub fn for_dialect(name: &str) -> SplitResult<Self> {
        Splitter::for_dialect(name).map(Self::from)
    }

    pub fn splitter(&self) -> &Splitter {
        &self.splitter
    }

    /// `SELECT` with the given columns. No columns selects `*`.
    pub fn select<I, S>(&self, columns: I) -> SplitResult<Query>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut query = self.splitter.query("SELECT");
        let mut columns = columns.into_iter().peekable();
        if columns.peek().is_some() {
            query.columns(columns)?;
        }
        Ok(query)
    }

    /// `SELECT COUNT(*)`.
    pub fn count(&self) -> Query {
        self.splitter.query("SELECT COUNT(*)")
    }

    pub fn insert(&self) -> Query {
        self.splitter.query("INSERT INTO")
    }

    /// `REPLACE INTO`, MySQL only.
    pub fn replace(&self) -> SplitResult<Query> {
        if self.splitter.dialect().kind() != DialectKind::MySql {
            return Err(SplitError::build("REPLACE query is only available for MySQL"));
        }
        Ok(self.splitter.query("REPLACE INTO"))
    }

    /// `INSERT INTO` that updates every inserted column on a duplicate key.
    pub fn upsert(&self) -> SplitResult<Query> {
        let mut query = self.insert();
        query.on_duplicate_key_update()?;
        Ok(query)
    }

    pub fn update(&self, table: Option<&str>) -> SplitResult<Query> {
        let mut query = self.splitter.query("UPDATE");
        if let Some(table) = table {
            query.table(table)?;
        }
        Ok(query)
    }

    pub fn delete(&self) -> Query {
        self.splitter.query("DELETE")
    }

    // ==================== Transactions ====================

    pub fn begin(&self) -> Query {
        self.splitter.query("BEGIN")
    }

    /// Same as [`begin`](Self::begin).
    pub fn start_transaction(&self) -> Query {
        self.begin()
    }

    pub fn savepoint(&self, identifier: &str) -> SplitResult<Query> {
        check_savepoint(identifier)?;
        Ok(self.splitter.query(format!("SAVEPOINT {identifier}")))
    }

    /// `ROLLBACK`, or `ROLLBACK TO` a savepoint.
    pub fn rollback(&self, savepoint: Option<&str>) -> SplitResult<Query> {
        match savepoint {
            Some(identifier) => {
                check_savepoint(identifier)?;
                Ok(self.splitter.query(format!("ROLLBACK TO {identifier}")))
            }
            None => Ok(self.splitter.query("ROLLBACK")),
        }
    }

    pub fn commit(&self) -> Query {
        self.splitter.query("COMMIT")
    }
}

impl From<Splitter> for Builder {
    fn from(splitter: Splitter) -> Self {
        Self { splitter }
    }
}

fn check_savepoint(identifier: &str) -> SplitResult<()> {
    if identifier.is_empty() || !identifier.bytes().all(is_word) {
        return Err(SplitError::build("Savepoint identifier must be alphanumeric"));
    }
    Ok(())
}
