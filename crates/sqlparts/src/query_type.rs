use std::fmt;

use serde::{Serialize, Serializer};

use crate::dialect::Dialect;
use crate::lexer::is_space;

/// The kind of statement, taken from its leading keyword(s).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum QueryType {
    Select,
    Insert,
    Replace,
    Update,
    Delete,
    Truncate,
    Set,
    /// A recognized statement that can't be split, e.g. `ALTER TABLE` or `BEGIN`.
    Other(String),
}

impl QueryType {
    /// Parse an upper-case, single-spaced keyword phrase.
    pub fn from_phrase(phrase: &str) -> Self {
        match phrase {
            "SELECT" => Self::Select,
            "INSERT" => Self::Insert,
            "REPLACE" => Self::Replace,
            "UPDATE" => Self::Update,
            "DELETE" => Self::Delete,
            "TRUNCATE" => Self::Truncate,
            "SET" => Self::Set,
            other => Self::Other(other.to_string()),
        }
    }

    /// Detect the query type of a statement.
    ///
    /// Leading whitespace is skipped; text that doesn't start with a known
    /// statement keyword has no type.
    pub fn detect(dialect: &Dialect, statement: &str) -> Option<Self> {
        let captures = dialect
            .patterns()
            .query_type
            .captures(statement.as_bytes())?;
        let phrase = captures.get(1)?.as_bytes();

        let mut normalized = String::with_capacity(phrase.len());
        let mut in_space = false;
        for &b in phrase {
            if is_space(b) {
                in_space = true;
                continue;
            }
            if in_space {
                normalized.push(' ');
                in_space = false;
            }
            normalized.push(char::from(b.to_ascii_uppercase()));
        }

        Some(Self::from_phrase(&normalized))
    }

    /// The statement keyword as used in SQL and error messages.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Select => "SELECT",
            Self::Insert => "INSERT",
            Self::Replace => "REPLACE",
            Self::Update => "UPDATE",
            Self::Delete => "DELETE",
            Self::Truncate => "TRUNCATE",
            Self::Set => "SET",
            Self::Other(phrase) => phrase,
        }
    }

    /// `INSERT` or `REPLACE`.
    pub fn is_insert_like(&self) -> bool {
        matches!(self, Self::Insert | Self::Replace)
    }
}

impl fmt::Display for QueryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for QueryType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// Render an optional query type the way error messages expect it.
pub(crate) fn type_name(query_type: Option<&QueryType>) -> &str {
    query_type.map_or("", QueryType::as_str)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialect::DialectKind;

    fn detect(sql: &str) -> Option<QueryType> {
        QueryType::detect(Dialect::get(DialectKind::MySql), sql)
    }

    #[test]
    fn detect_basic() {
        assert_eq!(detect("SELECT id, description FROM `test`"), Some(QueryType::Select));
        assert_eq!(detect("\n  select * from x"), Some(QueryType::Select));
        assert_eq!(detect("INSERT INTO `test` SELECT 10"), Some(QueryType::Insert));
        assert_eq!(detect("REPLACE INTO x VALUES (1)"), Some(QueryType::Replace));
        assert_eq!(detect("UPDATE `test` SET x=1"), Some(QueryType::Update));
        assert_eq!(detect("DELETE FROM x"), Some(QueryType::Delete));
        assert_eq!(detect("TRUNCATE TABLE x"), Some(QueryType::Truncate));
        assert_eq!(detect("SET @x = 1"), Some(QueryType::Set));
    }

    #[test]
    fn detect_phrases() {
        assert_eq!(
            detect("ALTER\n\t\tVIEW xyz"),
            Some(QueryType::Other("ALTER VIEW".to_string()))
        );
        assert_eq!(
            detect("start   transaction"),
            Some(QueryType::Other("START TRANSACTION".to_string()))
        );
        assert_eq!(
            detect("LOAD DATA INFILE 'x'"),
            Some(QueryType::Other("LOAD DATA INFILE".to_string()))
        );
    }

    #[test]
    fn detect_none() {
        assert_eq!(detect("ALTER test set abc"), None);
        assert_eq!(detect("-- SELECT"), None);
        assert_eq!(detect("SELECTED"), None);
        assert_eq!(detect(""), None);
    }

    #[test]
    fn generic_has_no_load_data() {
        let generic = Dialect::get(DialectKind::Generic);
        assert_eq!(
            QueryType::detect(generic, "LOAD DATA INFILE 'x'"),
            Some(QueryType::Other("LOAD".to_string()))
        );
    }
}
