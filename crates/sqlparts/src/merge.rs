//! Merging additions into parts, and building `WHERE` expressions.

use indexmap::IndexMap;

use crate::error::SplitResult;
use crate::parts::Parts;
use crate::quote::QuoteMode;
use crate::splitter::Splitter;
use crate::value::{Params, Value};

/// Fragments to put in front of and behind an existing part.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Addition {
    pub prepend: Vec<String>,
    pub append: Vec<String>,
}

impl Addition {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn prepend(mut self, fragment: impl Into<String>) -> Self {
        self.prepend.push(fragment.into());
        self
    }

    pub fn append(mut self, fragment: impl Into<String>) -> Self {
        self.append.push(fragment.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.prepend.is_empty() && self.append.is_empty()
    }
}

impl Splitter {
    /// Merge additions into a copy of `parts`.
    ///
    /// How fragments combine with the existing text depends on the part:
    ///
    /// - `columns`, `set`, `group by` and `order by` are comma lists.
    /// - `values` rows are wrapped in parentheses.
    /// - `from`, `into` and `table` are joined with spaces. An existing
    ///   value that isn't a plain identifier is parenthesized first, so a
    ///   join chain becomes a nested group.
    /// - `where` and `having` conditions are AND-ed, each in parentheses
    ///   when there is more than one.
    /// - Anything else is joined with spaces.
    ///
    /// Parts that don't exist yet are added at the end.
    pub fn add_parts(&self, parts: &Parts, additions: &IndexMap<String, Addition>) -> Parts {
        let mut merged = parts.clone();

        for (key, addition) in additions {
            let current = parts.text(key).trim();
            let prepend = &addition.prepend;
            let append = &addition.append;

            let value = match key.as_str() {
                "columns" | "set" | "group by" | "order by" => chain(prepend, current, append).join(", "),

                "values" => {
                    let rows: Vec<String> = prepend
                        .iter()
                        .map(|row| format!("({row})"))
                        .chain((!current.is_empty()).then(|| current.to_string()))
                        .chain(append.iter().map(|row| format!("({row})")))
                        .collect();
                    rows.join(", ")
                }

                "from" | "into" | "table" => {
                    let existing = if !current.is_empty() && !self.is_identifier(current) {
                        format!("({current})")
                    } else {
                        current.to_string()
                    };
                    let mut text = String::new();
                    if !prepend.is_empty() {
                        text.push_str(&prepend.join(" "));
                        text.push(' ');
                    }
                    text.push_str(&existing);
                    if !append.is_empty() {
                        text.push(' ');
                        text.push_str(&append.join(" "));
                    }
                    text.trim_matches(|c| c == ' ' || c == ',').to_string()
                }

                "where" | "having" => {
                    let conditions = chain(prepend, current, append);
                    match conditions.as_slice() {
                        [] => continue,
                        [only] => only.to_string(),
                        _ => format!("({})", conditions.join(") AND (")),
                    }
                }

                _ => {
                    let mut text = String::new();
                    if !prepend.is_empty() {
                        text.push_str(&prepend.join(" "));
                        text.push(' ');
                    }
                    text.push_str(current);
                    if !append.is_empty() {
                        text.push(' ');
                        text.push_str(&append.join(" "));
                    }
                    text
                }
            };

            merged.insert(key.as_str(), value);
        }

        merged
    }

    /// Build a condition for a `WHERE` or `HAVING` clause.
    ///
    /// Without placeholders in `expression`:
    ///
    /// - a list value gives `expression IN (...)`
    /// - any other value gives `expression = value`
    /// - no value gives the expression itself, or `""` when it's a bare
    ///   column name
    ///
    /// With a single placeholder, `value` is bound to it. With several, the
    /// items of a list value are bound in order.
    ///
    /// ```ignore
    /// let splitter = Splitter::mysql();
    /// let value = Value::from([10, 20]);
    /// assert_eq!(splitter.build_where("foo", Some(&value), QuoteMode::Smart)?, "`foo` IN (10, 20)");
    /// ```
    pub fn build_where(&self, expression: &str, value: Option<&Value>, mode: QuoteMode) -> SplitResult<String> {
        let placeholders = self.count_placeholders(expression);
        let column = self.quote_identifier(expression, mode)?;

        if placeholders == 0 {
            let value = value.filter(|v| !v.is_null() && v.as_list().is_none_or(|items| !items.is_empty()));
            return Ok(match value {
                None if self.is_identifier(&column) => String::new(),
                None => column,
                Some(value) => {
                    let operator = if value.as_list().is_some() { "IN" } else { "=" };
                    format!("{column} {operator} {}", self.quote_value(value, "NULL"))
                }
            });
        }

        let value = value.cloned().unwrap_or(Value::Null);
        let params = match value {
            Value::List(items) if placeholders > 1 => Params::positional(items),
            value => Params::positional([value]),
        };
        Ok(self.bind(&column, &params))
    }

    /// Build conditions for several criteria and AND them together.
    ///
    /// Criteria that build to nothing are left out.
    pub fn build_where_all(&self, criteria: &[(&str, Option<Value>)], mode: QuoteMode) -> SplitResult<String> {
        let mut conditions = Vec::with_capacity(criteria.len());
        for (expression, value) in criteria {
            let condition = self.build_where(expression, value.as_ref(), mode)?;
            if !condition.is_empty() {
                conditions.push(condition);
            }
        }
        Ok(conditions.join(" AND "))
    }
}

fn chain<'a>(prepend: &'a [String], current: &'a str, append: &'a [String]) -> Vec<&'a str> {
    prepend
        .iter()
        .map(String::as_str)
        .chain((!current.is_empty()).then_some(current))
        .chain(append.iter().map(String::as_str))
        .collect()
}
