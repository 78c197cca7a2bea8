use std::sync::OnceLock;

use regex::bytes::Regex;

use crate::dialect::ascii_regex;
use crate::error::{SplitError, SplitResult};
use crate::parts::Parts;
use crate::query_type::{QueryType, type_name};
use crate::splitter::Splitter;

fn distinct_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| ascii_regex(r"\bDISTINCT\b"))
}

impl Splitter {
    /// Build a statement that counts the rows `parts` would select or touch.
    ///
    /// The count respects a `LIMIT` unless `all_rows` is set. Grouped and
    /// `DISTINCT` selects count distinct values; a select with `HAVING` is
    /// counted as a derived table.
    ///
    /// ```ignore
    /// let splitter = Splitter::mysql();
    /// let parts = splitter.split("SELECT * FROM foo LIMIT 50 OFFSET 200")?;
    /// assert_eq!(
    ///     splitter.build_count_query(&parts, false)?,
    ///     "SELECT LEAST(COUNT(*) - 200, 50) FROM foo"
    /// );
    /// ```
    pub fn build_count_query(&self, parts: &Parts, all_rows: bool) -> SplitResult<String> {
        let mut query_type = parts.query_type();

        let nested;
        let mut parts = parts;
        if query_type.as_ref().is_some_and(QueryType::is_insert_like) {
            let query = parts.text("query").trim();
            if !query.is_empty() {
                nested = self.split(query)?;
                parts = &nested;
                query_type = parts.query_type();
            }
        }

        let table = parts
            .get("from")
            .or_else(|| parts.get("into"))
            .or_else(|| parts.get("table"))
            .ok_or_else(|| {
                SplitError::build(format!(
                    "Unable to count rows for {} query.",
                    type_name(query_type.as_ref())
                ))
            })?;

        let is_select = query_type == Some(QueryType::Select);

        if is_select && !parts.text("having").trim().is_empty() {
            let mut derived = parts.clone();
            if all_rows {
                derived.remove("limit");
            }
            return Ok(format!("SELECT COUNT(*) FROM ({}) AS q", self.join(&derived)));
        }

        let mut column = if is_select && distinct_re().is_match(parts.text("select").as_bytes()) {
            format!("COUNT(DISTINCT {})", parts.text("columns").trim())
        } else if is_select && !parts.text("group by").trim().is_empty() {
            format!("COUNT(DISTINCT {})", parts.text("group by").trim())
        } else {
            "COUNT(*)".to_string()
        };

        if !all_rows && parts.contains_key("limit") {
            if let (Some(limit), offset) = self.split_limit(parts)? {
                column = match offset {
                    Some(offset) => format!("LEAST({column} - {offset}, {limit})"),
                    None => format!("LEAST({column}, {limit})"),
                };
            }
        }

        let count: Parts = [
            ("select", ""),
            ("columns", column.as_str()),
            ("from", table),
            ("where", parts.text("where")),
        ]
        .into_iter()
        .collect();

        Ok(self.join(&count))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn count(sql: &str, all_rows: bool) -> String {
        let s = Splitter::mysql();
        s.build_count_query(&s.split(sql).unwrap(), all_rows).unwrap()
    }

    #[test]
    fn count_simple() {
        assert_eq!(count("SELECT * FROM foo", false), "SELECT COUNT(*) FROM foo");
        assert_eq!(
            count("SELECT * FROM foo INNER JOIN bar ON foo.id = bar.foo_id WHERE abc = 10", false),
            "SELECT COUNT(*) FROM foo INNER JOIN bar ON foo.id = bar.foo_id WHERE abc = 10"
        );
    }

    #[test]
    fn count_with_limit() {
        assert_eq!(
            count("SELECT * FROM foo LIMIT 50 OFFSET 200", false),
            "SELECT LEAST(COUNT(*) - 200, 50) FROM foo"
        );
        assert_eq!(count("SELECT * FROM foo LIMIT 50", false), "SELECT LEAST(COUNT(*), 50) FROM foo");
        assert_eq!(count("SELECT * FROM foo LIMIT 50", true), "SELECT COUNT(*) FROM foo");
    }

    #[test]
    fn count_distinct_and_grouped() {
        assert_eq!(
            count("SELECT DISTINCT id FROM foo", false),
            "SELECT COUNT(DISTINCT id) FROM foo"
        );
        assert_eq!(
            count("SELECT * FROM foo GROUP BY abc, xyz", false),
            "SELECT COUNT(DISTINCT abc, xyz) FROM foo"
        );
    }

    #[test]
    fn count_with_having_uses_derived_table() {
        assert_eq!(
            count("SELECT * FROM foo GROUP BY abc, xyz HAVING COUNT(*) > 10", false),
            "SELECT COUNT(*) FROM (SELECT * FROM foo GROUP BY abc, xyz HAVING COUNT(*) > 10) AS q"
        );
    }

    #[test]
    fn count_other_types() {
        assert_eq!(
            count("UPDATE foo SET abc = 10 WHERE xyz > 10 LIMIT 5", false),
            "SELECT LEAST(COUNT(*), 5) FROM foo WHERE xyz > 10"
        );
        assert_eq!(
            count("DELETE FROM foo WHERE xyz > 10", false),
            "SELECT COUNT(*) FROM foo WHERE xyz > 10"
        );
        assert_eq!(
            count("INSERT INTO foo SELECT * FROM bar WHERE a = 1", false),
            "SELECT COUNT(*) FROM bar WHERE a = 1"
        );
    }

    #[test]
    fn count_without_table() {
        let s = Splitter::mysql();
        let parts = s.split("SET @x = 1").unwrap();
        let err = s.build_count_query(&parts, false).unwrap_err();
        assert_eq!(err, SplitError::build("Unable to count rows for SET query."));
    }
}
