//! Splitting statements into parts and joining parts back into statements.

mod pattern;

use std::sync::OnceLock;

use regex::bytes::Regex;

use crate::dialect::ascii_regex;
use crate::error::{SplitError, SplitResult};
use crate::parts::Parts;
use crate::query_type::QueryType;
use crate::splitter::Splitter;

use pattern::{Step, match_steps};

pub(crate) const SELECT_KEYS: &[&str] = &[
    "select", "columns", "from", "where", "group by", "having", "order by", "limit", "options",
];
const INSERT_KEYS: &[&str] = &[
    "insert",
    "into",
    "columns",
    "set",
    "values",
    "query",
    "on duplicate key update",
];
const REPLACE_KEYS: &[&str] = &[
    "replace",
    "into",
    "columns",
    "set",
    "values",
    "query",
    "on duplicate key update",
];
const UPDATE_KEYS: &[&str] = &["update", "table", "set", "where", "limit"];
const DELETE_KEYS: &[&str] = &["delete", "columns", "from", "where", "order by", "limit"];
const TRUNCATE_KEYS: &[&str] = &["truncate", "table"];
const SET_KEYS: &[&str] = &["set"];

/// Parts that [`Splitter::join`] writes without a keyword in front.
const UNPREFIXED: &[&str] = &["columns", "query", "table", "options"];

struct Keywords {
    select: Regex,
    insert: Regex,
    update: Regex,
    delete: Regex,
    truncate: Regex,
    set: Regex,
    table: Regex,
    from: Regex,
    where_: Regex,
    group_by: Regex,
    having: Regex,
    order_by: Regex,
    limit: Regex,
    into: Regex,
    values: Regex,
    on_duplicate_key_update: Regex,
    select_options: Regex,
}

fn keywords() -> &'static Keywords {
    static KEYWORDS: OnceLock<Keywords> = OnceLock::new();
    KEYWORDS.get_or_init(|| Keywords {
        select: ascii_regex(r"^SELECT\b"),
        insert: ascii_regex(r"^(?:INSERT|REPLACE)\b"),
        update: ascii_regex(r"^UPDATE\b"),
        delete: ascii_regex(r"^DELETE\b"),
        truncate: ascii_regex(r"^TRUNCATE\b"),
        set: ascii_regex(r"^SET\b"),
        table: ascii_regex(r"^TABLE\b"),
        from: ascii_regex(r"^FROM\b"),
        where_: ascii_regex(r"^WHERE\b"),
        group_by: ascii_regex(r"^GROUP\s+BY\b"),
        having: ascii_regex(r"^HAVING\b"),
        order_by: ascii_regex(r"^ORDER\s+BY\b"),
        limit: ascii_regex(r"^LIMIT\b"),
        into: ascii_regex(r"^INTO\b"),
        values: ascii_regex(r"^VALUES"),
        on_duplicate_key_update: ascii_regex(r"^ON\s+DUPLICATE\s+KEY\s+UPDATE\b"),
        select_options: ascii_regex(
            r"^(?:PROCEDURE|INTO|FOR\s+UPDATE|LOCK\s+IN\s+SHARE\s*MODE|CASCADE\s*ON)\b",
        ),
    })
}

impl Splitter {
    /// Split a statement into its parts.
    ///
    /// Every part the statement type supports is present, in clause order;
    /// clauses the statement doesn't have are empty strings. Subqueries stay
    /// verbatim inside the part they appear in.
    ///
    /// ```ignore
    /// let parts = Splitter::mysql().split("UPDATE `test` SET status='ACTIVE' WHERE id=10")?;
    /// assert_eq!(parts.get("table"), Some("`test`"));
    /// assert_eq!(parts.get("set"), Some("status='ACTIVE'"));
    /// ```
    pub fn split(&self, sql: &str) -> SplitResult<Parts> {
        let Some(query_type) = self.query_type(sql) else {
            tracing::debug!(target: "sqlparts.split", sql, "unrecognized statement");
            return Err(SplitError::unrecognized(sql));
        };

        let kw = keywords();
        let patterns = self.dialect().patterns();

        let parts = match &query_type {
            QueryType::Select => self.split_with(
                sql,
                "SELECT",
                SELECT_KEYS,
                &[
                    Step::Lead(&kw.select),
                    Step::Mods {
                        slot: 0,
                        mods: Some(&patterns.select_mods),
                        max: None,
                    },
                    Step::Value { slot: 1 },
                    Step::Clause { slot: 2, keyword: &kw.from },
                    Step::Clause { slot: 3, keyword: &kw.where_ },
                    Step::Clause { slot: 4, keyword: &kw.group_by },
                    Step::Clause { slot: 5, keyword: &kw.having },
                    Step::Clause { slot: 6, keyword: &kw.order_by },
                    Step::Clause { slot: 7, keyword: &kw.limit },
                    Step::Options {
                        slot: 8,
                        keyword: &kw.select_options,
                    },
                    Step::End,
                ],
                true,
            )?,

            QueryType::Insert | QueryType::Replace => self.split_with(
                sql,
                "INSERT/REPLACE",
                if query_type == QueryType::Replace {
                    REPLACE_KEYS
                } else {
                    INSERT_KEYS
                },
                &[
                    Step::Lead(&kw.insert),
                    Step::Mods {
                        slot: 0,
                        mods: patterns.insert_mods.as_ref(),
                        max: None,
                    },
                    Step::Clause { slot: 1, keyword: &kw.into },
                    Step::ParenColumns { slot: 2 },
                    Step::Clause { slot: 3, keyword: &kw.set },
                    Step::Rows {
                        slot: 4,
                        keyword: &kw.values,
                    },
                    Step::Query { slot: 5 },
                    Step::Clause {
                        slot: 6,
                        keyword: &kw.on_duplicate_key_update,
                    },
                    Step::End,
                ],
                false,
            )?,

            QueryType::Update => self.split_with(
                sql,
                "UPDATE",
                UPDATE_KEYS,
                &[
                    Step::Lead(&kw.update),
                    Step::Mods {
                        slot: 0,
                        mods: patterns.update_mods.as_ref(),
                        max: None,
                    },
                    Step::Value { slot: 1 },
                    Step::Clause { slot: 2, keyword: &kw.set },
                    Step::Clause { slot: 3, keyword: &kw.where_ },
                    Step::Clause { slot: 4, keyword: &kw.limit },
                    Step::End,
                ],
                true,
            )?,

            QueryType::Delete => self.split_with(
                sql,
                "DELETE",
                DELETE_KEYS,
                &[
                    Step::Lead(&kw.delete),
                    Step::Mods {
                        slot: 0,
                        mods: patterns.delete_mods.as_ref(),
                        max: None,
                    },
                    Step::Value { slot: 1 },
                    Step::Clause { slot: 2, keyword: &kw.from },
                    Step::Clause { slot: 3, keyword: &kw.where_ },
                    Step::Clause { slot: 4, keyword: &kw.order_by },
                    Step::Clause { slot: 5, keyword: &kw.limit },
                    Step::End,
                ],
                true,
            )?,

            QueryType::Truncate => self.split_with(
                sql,
                "TRUNCATE",
                TRUNCATE_KEYS,
                &[
                    Step::Lead(&kw.truncate),
                    Step::Mods {
                        slot: 0,
                        mods: Some(&kw.table),
                        max: Some(1),
                    },
                    Step::Value { slot: 1 },
                    Step::End,
                ],
                false,
            )?,

            QueryType::Set => self.split_with(
                sql,
                "SET",
                SET_KEYS,
                &[Step::Lead(&kw.set), Step::Value { slot: 0 }, Step::End],
                false,
            )?,

            QueryType::Other(phrase) => {
                tracing::debug!(target: "sqlparts.split", query_type = %phrase, "statement type can't be split");
                return Err(SplitError::unsupported_type(phrase));
            }
        };

        tracing::trace!(
            target: "sqlparts.split",
            query_type = %query_type,
            parts = parts.len(),
            "split statement"
        );
        Ok(parts)
    }

    fn split_with(
        &self,
        sql: &str,
        kind: &str,
        keys: &[&str],
        steps: &[Step],
        extract: bool,
    ) -> SplitResult<Parts> {
        let sets = if extract {
            self.extract_if_nested(sql)?
        } else {
            None
        };
        let target = sets.as_ref().map_or(sql, |sets| sets[0].as_str());

        let Some(captures) = match_steps(self.dialect(), target, steps, keys.len()) else {
            tracing::debug!(target: "sqlparts.split", kind, sql, "statement doesn't match its clause pattern");
            return Err(SplitError::invalid_syntax(kind, sql));
        };

        let mut parts: Parts = keys.iter().copied().zip(captures).collect();
        if let Some(sets) = sets {
            self.inject_parts(&mut parts, &sets);
        }
        Ok(parts)
    }

    /// Join parts into a statement.
    ///
    /// Parts are written in map order, each prefixed by its upper-cased key,
    /// except for `columns`, `query`, `table` and `options`. Empty parts are
    /// left out, but the first part is always written. The columns of an
    /// `INSERT` or `REPLACE` are wrapped in parentheses.
    ///
    /// Nothing is validated: parts are written as they are.
    pub fn join(&self, parts: &Parts) -> String {
        let insert_like = parts.query_type().is_some_and(|t| t.is_insert_like());
        let mut fragments: Vec<String> = Vec::with_capacity(parts.len());

        for (key, value) in parts {
            let text = value.trim_matches(|c| matches!(c, ' ' | '\t' | '\n' | ','));
            if text.is_empty() && !fragments.is_empty() {
                continue;
            }

            let text = if insert_like && key == "columns" {
                format!("({text})")
            } else {
                text.to_string()
            };

            let fragment = if UNPREFIXED.contains(&key.as_str()) {
                text
            } else if text.is_empty() {
                key.to_ascii_uppercase()
            } else {
                format!("{} {text}", key.to_ascii_uppercase())
            };
            fragments.push(fragment);
        }

        fragments.join(" ")
    }
}
