use serde::{Deserialize, Serialize};

use crate::dialect::DialectKind;

/// Default limit for nested subqueries and parenthesized groups.
pub const DEFAULT_MAX_NESTING: usize = 32;

/// Configuration for a [`Splitter`](crate::Splitter).
///
/// Deserializable so it can live inside a host application's config file:
///
/// ```ignore
/// [sql]
/// dialect = "mysql"
/// max_nesting = 16
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SplitterConfig {
    /// SQL dialect used for quoting and keyword recognition.
    pub dialect: DialectKind,
    /// How deep subqueries and parenthesized groups may nest before the
    /// statement is rejected.
    pub max_nesting: usize,
}

impl Default for SplitterConfig {
    fn default() -> Self {
        Self {
            dialect: DialectKind::default(),
            max_nesting: DEFAULT_MAX_NESTING,
        }
    }
}

impl SplitterConfig {
    /// Create a new configuration with defaults (MySQL, 32 levels of nesting).
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the dialect.
    pub fn with_dialect(mut self, dialect: DialectKind) -> Self {
        self.dialect = dialect;
        self
    }

    /// Set the nesting limit.
    ///
    /// A limit of 0 still allows the top-level statement itself.
    pub fn with_max_nesting(mut self, max_nesting: usize) -> Self {
        self.max_nesting = max_nesting;
        self
    }
}
