use crate::config::SplitterConfig;
use crate::dialect::{Dialect, DialectKind};
use crate::error::{SplitError, SplitResult};
use crate::query::Query;
use crate::query_type::QueryType;

/// Splits, joins, quotes and rewrites statements of one dialect.
///
/// `Splitter` is a small `Copy` handle: a reference to an immutable
/// [`Dialect`] plus the [`SplitterConfig`]. It holds no per-statement state,
/// so one instance can be shared freely, across threads included.
///
/// ```ignore
/// use sqlparts::Splitter;
///
/// let splitter = Splitter::mysql();
/// let parts = splitter.split("SELECT id FROM users WHERE active = 1")?;
/// assert_eq!(parts.get("where"), Some("active = 1"));
/// ```
#[derive(Debug, Clone, Copy)]
pub struct Splitter {
    dialect: &'static Dialect,
    config: SplitterConfig,
}

impl Default for Splitter {
    fn default() -> Self {
        Self::new(SplitterConfig::default())
    }
}

impl Splitter {
    pub fn new(config: SplitterConfig) -> Self {
        Self {
            dialect: Dialect::get(config.dialect),
            config,
        }
    }

    /// A splitter for the MySQL dialect.
    pub fn mysql() -> Self {
        Self::new(SplitterConfig::new().with_dialect(DialectKind::MySql))
    }

    /// A splitter for generic ANSI SQL.
    pub fn generic() -> Self {
        Self::new(SplitterConfig::new().with_dialect(DialectKind::Generic))
    }

    /// A splitter for a dialect given by name (`"mysql"`, `"generic"`).
    pub fn for_dialect(name: &str) -> SplitResult<Self> {
        let kind: DialectKind = name.parse()?;
        Ok(Self::new(SplitterConfig::new().with_dialect(kind)))
    }

    pub fn dialect(&self) -> &'static Dialect {
        self.dialect
    }

    pub fn config(&self) -> &SplitterConfig {
        &self.config
    }

    /// Get the type of a statement, e.g. `SELECT` or `ALTER TABLE`.
    pub fn query_type(&self, statement: &str) -> Option<QueryType> {
        QueryType::detect(self.dialect, statement)
    }

    /// Start building on top of a statement.
    pub fn query(&self, statement: impl Into<String>) -> Query {
        Query::new(statement, *self)
    }

    pub(crate) fn check_depth(&self, depth: usize) -> SplitResult<()> {
        if depth > self.config.max_nesting {
            return Err(SplitError::NestingTooDeep {
                limit: self.config.max_nesting,
            });
        }
        Ok(())
    }
}
