//! Finer-grained decomposition of single parts.

use std::sync::OnceLock;

use indexmap::IndexMap;
use regex::bytes::Regex;

use crate::dialect::{Dialect, ascii_regex};
use crate::error::{SplitError, SplitResult};
use crate::lexer::{at_word_start, char_len, group_len, is_space, is_word, skip_space, split_top_level, word_end};
use crate::parts::Parts;
use crate::query_type::type_name;
use crate::splitter::Splitter;
use crate::value::Value;

/// A `LIMIT` part as `(row count, offset)`.
pub type Limit = (Option<u64>, Option<u64>);

fn assignment_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| ascii_regex(r"^\s*=\s*"))
}

fn variable_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| ascii_regex(r"^@+\w+"))
}

fn limit_offset_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| ascii_regex(r"^\s*(\d+)\s+OFFSET\s+(\d+)\s*$"))
}

fn limit_comma_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| ascii_regex(r"^\s*(\d+)\s*(?:,\s*(\d+)\s*)?$"))
}

fn nested_select_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| ascii_regex(r"^\s*\(\s*SELECT\b"))
}

impl Splitter {
    /// The column expressions of a statement's `columns` part.
    ///
    /// Commas inside function calls, subqueries and quoted literals don't
    /// split.
    pub fn split_columns(&self, parts: &Parts) -> SplitResult<Vec<String>> {
        let columns = parts.get("columns").ok_or_else(|| {
            SplitError::missing_part(format!(
                "It's not possible to extract columns of a {} query.",
                type_name(parts.query_type().as_ref())
            ))
        })?;

        Ok(split_top_level(self.dialect(), columns)
            .into_iter()
            .map(str::to_string)
            .collect())
    }

    /// The assignments of a statement's `set` part, as `column => expression`.
    ///
    /// Quotes around the column name are removed. An assignment without a
    /// recognizable column is stored under `""`.
    pub fn split_set(&self, parts: &Parts) -> SplitResult<IndexMap<String, String>> {
        let set = parts.get("set").ok_or_else(|| {
            SplitError::missing_part(format!(
                "It's not possible to extract the set part of a {} query.",
                type_name(parts.query_type().as_ref())
            ))
        })?;

        let dialect = self.dialect();
        let quote = dialect.identifier_quote();
        let mut assignments = IndexMap::new();

        for segment in split_top_level(dialect, set) {
            let (column, expression) = split_assignment(dialect, segment);
            assignments.insert(
                column.trim().trim_matches(quote).to_string(),
                expression.trim().to_string(),
            );
        }

        Ok(assignments)
    }

    /// Like [`split_set`](Self::split_set), with every expression converted
    /// to a value.
    pub fn split_set_values(&self, parts: &Parts) -> SplitResult<IndexMap<String, Value>> {
        self.split_set(parts)?
            .into_iter()
            .map(|(column, expression)| Ok((column, self.unquote_value(&expression)?)))
            .collect()
    }

    /// The tables of a statement, as `alias or name => table reference`.
    ///
    /// Reads the `table`, `from` or `into` part, whichever the statement has.
    /// Parenthesized join groups are walked into; a parenthesized subquery is
    /// kept whole under its alias.
    pub fn split_tables(&self, parts: &Parts) -> SplitResult<IndexMap<String, String>> {
        let tables = parts
            .get("table")
            .or_else(|| parts.get("from"))
            .or_else(|| parts.get("into"))
            .ok_or_else(|| {
                SplitError::missing_part(format!(
                    "It's not possible to extract tables of a {} query.",
                    type_name(parts.query_type().as_ref())
                ))
            })?;

        let mut found = IndexMap::new();
        self.collect_tables(tables, &mut found, 0)?;
        Ok(found)
    }

    fn collect_tables(
        &self,
        text: &str,
        found: &mut IndexMap<String, String>,
        depth: usize,
    ) -> SplitResult<()> {
        self.check_depth(depth)?;

        let dialect = self.dialect();
        let b = text.as_bytes();
        let mut pos = 0;

        while pos < b.len() {
            let Some(table) = TableRef::parse(dialect, b, pos) else {
                pos += char_len(b, pos);
                continue;
            };
            pos = table.end;

            let fullname = text[table.fullname.clone()].trim();
            if table.grouped && !nested_select_re().is_match(fullname.as_bytes()) {
                let inner = &fullname[1..fullname.len() - 1];
                self.collect_tables(inner, found, depth + 1)?;
                continue;
            }

            let key = match &table.alias {
                Some(alias) => alias_name(dialect, &text[alias.clone()]),
                None => text[table.name.clone()]
                    .trim_matches(|c| c == ' ' || c == dialect.identifier_quote())
                    .to_string(),
            };
            found.insert(key, fullname.to_string());
        }

        Ok(())
    }

    /// The rows of a statement's `values` part, each split into expressions.
    pub fn split_values(&self, parts: &Parts) -> SplitResult<Vec<Vec<String>>> {
        let values = parts.get("values").ok_or_else(|| {
            SplitError::missing_part(format!(
                "It's not possible to extract values of a {} query.",
                type_name(parts.query_type().as_ref())
            ))
        })?;

        let dialect = self.dialect();
        let rows = split_top_level(dialect, values)
            .into_iter()
            .map(|row| {
                let row = row.trim();
                let row = row.strip_prefix('(').unwrap_or(row);
                let row = row.strip_suffix(')').unwrap_or(row);
                split_top_level(dialect, row)
                    .into_iter()
                    .map(str::to_string)
                    .collect::<Vec<_>>()
            })
            .filter(|row| !row.is_empty())
            .collect();

        Ok(rows)
    }

    /// Like [`split_values`](Self::split_values), with every expression
    /// converted to a value.
    pub fn split_values_unquoted(&self, parts: &Parts) -> SplitResult<Vec<Vec<Value>>> {
        self.split_values(parts)?
            .into_iter()
            .map(|row| {
                row.iter()
                    .map(|expression| self.unquote_value(expression))
                    .collect::<SplitResult<Vec<_>>>()
            })
            .collect()
    }

    /// The row count and offset of a statement's `limit` part.
    ///
    /// ```ignore
    /// let parts = splitter.split("SELECT * FROM foo LIMIT 50, 10")?;
    /// assert_eq!(splitter.split_limit(&parts)?, (Some(10), Some(50)));
    /// ```
    pub fn split_limit(&self, parts: &Parts) -> SplitResult<Limit> {
        let limit = parts.get("limit").ok_or_else(|| {
            SplitError::missing_part(format!(
                "A {} query doesn't have a LIMIT part.",
                type_name(parts.query_type().as_ref())
            ))
        })?;
        parse_limit(limit)
    }
}

/// Parse `n`, `offset, n` or `n OFFSET offset` into `(row count, offset)`.
///
/// The comma form lists the offset first, the `OFFSET` form last.
pub fn parse_limit(text: &str) -> SplitResult<Limit> {
    let statement = text.trim();
    if statement.is_empty() {
        return Ok((None, None));
    }

    let invalid = || SplitError::InvalidLimit(statement.to_string());
    let number = |m: Option<regex::bytes::Match<'_>>| -> SplitResult<Option<u64>> {
        m.map(|m| {
            std::str::from_utf8(m.as_bytes())
                .ok()
                .and_then(|s| s.parse::<u64>().ok())
                .ok_or_else(invalid)
        })
        .transpose()
    };

    if let Some(caps) = limit_offset_re().captures(statement.as_bytes()) {
        return Ok((number(caps.get(1))?, number(caps.get(2))?));
    }

    if let Some(caps) = limit_comma_re().captures(statement.as_bytes()) {
        let first = number(caps.get(1))?;
        return match number(caps.get(2))? {
            Some(rows) => Ok((Some(rows), first)),
            None => Ok((first, None)),
        };
    }

    Err(invalid())
}

/// Split `column = expression` into its halves. Without a recognizable
/// column the whole segment is the expression.
fn split_assignment<'a>(dialect: &Dialect, segment: &'a str) -> (&'a str, &'a str) {
    let b = segment.as_bytes();
    let start = skip_space(b, 0);
    let column = dialect
        .patterns()
        .identifier_prefix
        .find(&b[start..])
        .or_else(|| variable_re().find(&b[start..]));

    if let Some(column) = column {
        let column_end = start + column.end();
        if let Some(eq) = assignment_re().find(&b[column_end..]) {
            return (&segment[start..column_end], &segment[column_end + eq.end()..]);
        }
    }
    ("", segment)
}

/// The alias name without `AS` and without surrounding identifier quotes.
fn alias_name(dialect: &Dialect, alias: &str) -> String {
    let mut name = alias.trim();
    let b = name.as_bytes();
    if b.len() > 2 && b[..2].eq_ignore_ascii_case(b"AS") && !is_word(b[2]) {
        name = name[2..].trim_start();
    }

    let q = dialect.identifier_quote();
    name.strip_prefix(q)
        .and_then(|n| n.strip_suffix(q))
        .unwrap_or(name)
        .to_string()
}

/// One table reference in a table list: an optional separator, the table,
/// an optional alias and an optional `ON` condition.
struct TableRef {
    /// The table with its trailing whitespace.
    fullname: std::ops::Range<usize>,
    /// The bare table name, without database.
    name: std::ops::Range<usize>,
    alias: Option<std::ops::Range<usize>>,
    /// The table is a parenthesized group.
    grouped: bool,
    end: usize,
}

impl TableRef {
    fn parse(dialect: &Dialect, b: &[u8], pos: usize) -> Option<Self> {
        let mut at = pos;

        // separator
        if b.get(at) == Some(&b',') {
            at = skip_space(b, at + 1);
        } else if at_word_start(b, at) {
            if let Some(m) = dialect.patterns().join.find(&b[at..]) {
                at = skip_space(b, at + m.end());
            }
        }

        // table
        let fullname_start = at;
        let (name, grouped) = if b.get(at) == Some(&b'(') {
            let len = group_len(dialect, b, at)?;
            at += len;
            (fullname_start..at, true)
        } else {
            let mut name = identifier_at(dialect, b, at)?;
            if b.get(name.end) == Some(&b'.') {
                if let Some(table) = identifier_at(dialect, b, name.end + 1) {
                    name = table;
                }
            }
            at = name.end;
            (name, false)
        };
        at = skip_space(b, at);
        let fullname = fullname_start..at;

        // alias
        let alias = alias_at(dialect, b, at);
        if let Some(alias) = &alias {
            at = skip_space(b, alias.end);
        }

        // join condition
        if word_is(b, at, "ON") {
            let cond_start = skip_space(b, at + 2);
            let cond_end = condition_end(dialect, b, cond_start);
            if cond_end > cond_start {
                at = cond_end;
            }
        }

        Some(Self {
            fullname,
            name,
            alias,
            grouped,
            end: at.max(pos + 1),
        })
    }
}

/// A quoted identifier or a bare word at `pos`.
fn identifier_at(dialect: &Dialect, b: &[u8], pos: usize) -> Option<std::ops::Range<usize>> {
    if let Some(len) = dialect.identifier_literal_len(b, pos) {
        return (len > 2).then_some(pos..pos + len);
    }
    if !b.get(pos).is_some_and(|&c| is_word(c)) || !at_word_start(b, pos) {
        return None;
    }
    Some(pos..word_end(b, pos))
}

fn word_is(b: &[u8], pos: usize, word: &str) -> bool {
    let end = word_end(b, pos);
    at_word_start(b, pos) && b[pos..end].eq_ignore_ascii_case(word.as_bytes())
}

fn is_join_word(dialect: &Dialect, word: &[u8]) -> bool {
    dialect
        .patterns()
        .join_words
        .iter()
        .any(|w| word.eq_ignore_ascii_case(w.as_bytes()))
}

fn alias_at(dialect: &Dialect, b: &[u8], pos: usize) -> Option<std::ops::Range<usize>> {
    if b.len() >= pos + 2 && b[pos..pos + 2].eq_ignore_ascii_case(b"AS") && at_word_start(b, pos) {
        let after = skip_space(b, pos + 2);
        let quoted = dialect.identifier_literal_len(b, after);
        if let Some(len) = quoted {
            return Some(pos..after + len);
        }
        let attached = after == pos + 2;
        if !attached && b.get(after).is_some_and(|&c| is_word(c)) {
            return Some(pos..word_end(b, after));
        }
    }

    if let Some(len) = dialect.identifier_literal_len(b, pos) {
        return Some(pos..pos + len);
    }

    if b.get(pos).is_some_and(|&c| is_word(c)) && at_word_start(b, pos) {
        let end = word_end(b, pos);
        let word = &b[pos..end];
        if !word.eq_ignore_ascii_case(b"ON") && !is_join_word(dialect, word) {
            return Some(pos..end);
        }
    }

    None
}

/// End of an `ON` condition: it runs until a top-level comma, a closing
/// parenthesis or a join keyword.
fn condition_end(dialect: &Dialect, b: &[u8], mut pos: usize) -> usize {
    let mut end = pos;

    while pos < b.len() {
        let c = b[pos];
        if dialect.is_quote(c) {
            match dialect.literal_len(b, pos) {
                Some(len) => pos += len,
                None => break,
            }
        } else if is_space(c) {
            pos = skip_space(b, pos);
            continue;
        } else if is_word(c) {
            let word_stop = word_end(b, pos);
            if is_join_word(dialect, &b[pos..word_stop]) {
                break;
            }
            pos = word_stop;
        } else if c == b'(' {
            match group_len(dialect, b, pos) {
                Some(len) => pos += len,
                None => break,
            }
        } else if c == b',' || c == b')' {
            break;
        } else {
            pos += char_len(b, pos);
        }
        end = pos;
    }

    end
}
