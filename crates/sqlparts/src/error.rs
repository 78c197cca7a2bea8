//! Error types for sqlparts

use thiserror::Error;

/// Result type alias for sqlparts operations
pub type SplitResult<T> = Result<T, SplitError>;

/// Errors raised while splitting, quoting or building statements.
///
/// Every error is scoped to the statement being processed; no failing call
/// leaves a [`Query`](crate::Query) half-mutated.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SplitError {
    /// The statement type is recognized but can't be split, or isn't recognized at all.
    #[error("{0}")]
    UnsupportedQuery(String),

    /// The statement starts with a known keyword but its clauses don't parse.
    #[error("Unable to split {kind} query, invalid syntax: {sql}")]
    InvalidSyntax { kind: String, sql: String },

    /// An identifier or expression couldn't be proven safe to quote.
    #[error("Unable to quote '{0}' safely")]
    UnsafeIdentifier(String),

    /// The requested part doesn't exist for the statement's query type.
    #[error("{0}")]
    MissingPart(String),

    /// The LIMIT part isn't one of the recognized forms.
    #[error("Invalid limit statement '{0}'")]
    InvalidLimit(String),

    /// A token couldn't be converted into a value.
    #[error("Unable to convert '{0}' to a value")]
    InvalidValue(String),

    /// Unknown dialect name.
    #[error("Unsupported SQL dialect '{0}'")]
    UnsupportedDialect(String),

    /// Parentheses or subqueries nest deeper than the configured limit.
    #[error("Statement nesting exceeds the limit of {limit} levels")]
    NestingTooDeep { limit: usize },

    /// A subquery index past the end of the extracted set.
    #[error("Unable to get subquery #{index}: query only has {count} subqueries")]
    SubqueryOutOfRange { index: usize, count: usize },

    /// Builder misuse.
    #[error("{0}")]
    Build(String),
}

impl SplitError {
    /// Create an unsupported query error for a recognized query type
    pub fn unsupported_type(query_type: impl std::fmt::Display) -> Self {
        Self::UnsupportedQuery(format!("Unable to split {query_type} query."))
    }

    /// Create an unsupported query error for unrecognized text
    pub fn unrecognized(sql: &str) -> Self {
        Self::UnsupportedQuery(format!("Unable to split query: {sql}"))
    }

    /// Create an invalid syntax error
    pub fn invalid_syntax(kind: impl Into<String>, sql: impl Into<String>) -> Self {
        Self::InvalidSyntax {
            kind: kind.into(),
            sql: sql.into(),
        }
    }

    /// Create a missing part error
    pub fn missing_part(message: impl Into<String>) -> Self {
        Self::MissingPart(message.into())
    }

    /// Create a builder error
    pub fn build(message: impl Into<String>) -> Self {
        Self::Build(message.into())
    }

    /// Check if this is an unsafe identifier error
    pub fn is_unsafe_identifier(&self) -> bool {
        matches!(self, Self::UnsafeIdentifier(_))
    }

    /// Check if the statement couldn't be split at all
    pub fn is_unsupported(&self) -> bool {
        matches!(self, Self::UnsupportedQuery(_))
    }

    /// Check if this is a syntax error
    pub fn is_invalid_syntax(&self) -> bool {
        matches!(self, Self::InvalidSyntax { .. })
    }

    /// Check if this is a missing part error
    pub fn is_missing_part(&self) -> bool {
        matches!(self, Self::MissingPart(_))
    }
}
