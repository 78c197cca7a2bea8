//! Clause patterns and the matcher that applies them to a token stream.
//!
//! A pattern is a fixed sequence of steps, one per clause, in the order the
//! clauses may appear. Clause values are lazy: each value grows one token at
//! a time until the rest of the pattern matches. Failed `(step, token)`
//! states are memoized, so a statement is matched in polynomial time no
//! matter how many optional clauses are skipped.

use std::collections::HashSet;
use std::ops::Range;

use regex::bytes::Regex;

use crate::dialect::Dialect;
use crate::lexer::{Token, TokenKind, tokenize};

/// One element of a statement pattern.
#[derive(Debug, Clone, Copy)]
pub(crate) enum Step {
    /// The statement keyword, after optional leading whitespace.
    Lead(&'static Regex),
    /// Zero or more space-separated modifiers, greedy.
    Mods {
        slot: usize,
        mods: Option<&'static Regex>,
        max: Option<usize>,
    },
    /// A required value with no keyword in front of it.
    Value { slot: usize },
    /// An optional `KEYWORD value` clause.
    Clause { slot: usize, keyword: &'static Regex },
    /// An optional parenthesized column list.
    ParenColumns { slot: usize },
    /// An optional `VALUES (...), (...)` row list.
    Rows { slot: usize, keyword: &'static Regex },
    /// An optional `SELECT ...` query or `#subN` marker.
    Query { slot: usize },
    /// Trailing options: everything from the keyword up to the first `;`.
    Options { slot: usize, keyword: &'static Regex },
    /// End of the text or a `;`.
    End,
}

/// Match `steps` against `sql`, returning one trimmed capture per slot.
///
/// Slots that didn't take part in the match are empty strings. `None` means
/// the statement doesn't fit the pattern.
pub(crate) fn match_steps(
    dialect: &Dialect,
    sql: &str,
    steps: &[Step],
    slots: usize,
) -> Option<Vec<String>> {
    let mut matcher = Matcher {
        bytes: sql.as_bytes(),
        tokens: tokenize(dialect, sql),
        steps,
        captures: vec![None; slots],
        failed: HashSet::new(),
    };

    if !matcher.run(0, 0) {
        return None;
    }

    Some(
        matcher
            .captures
            .iter()
            .map(|range| {
                range
                    .clone()
                    .map_or_else(String::new, |r| sql[r].trim().to_string())
            })
            .collect(),
    )
}

struct Matcher<'a> {
    bytes: &'a [u8],
    tokens: Vec<Token>,
    steps: &'a [Step],
    captures: Vec<Option<Range<usize>>>,
    /// `(step, token)` states known to fail.
    failed: HashSet<(usize, usize)>,
}

impl Matcher<'_> {
    fn len(&self) -> usize {
        self.tokens.len()
    }

    /// Byte offset of token `idx`, or the text length past the last token.
    fn offset(&self, idx: usize) -> usize {
        self.tokens.get(idx).map_or(self.bytes.len(), |t| t.start)
    }

    fn skip_space(&self, idx: usize) -> usize {
        match self.tokens.get(idx) {
            Some(t) if t.kind == TokenKind::Space => idx + 1,
            _ => idx,
        }
    }

    fn is_symbol(&self, idx: usize, c: u8) -> bool {
        self.tokens
            .get(idx)
            .is_some_and(|t| t.is_symbol(self.bytes, c))
    }

    /// Token index right after a keyword match starting at token `idx`.
    ///
    /// The match must start on a word and end on a token boundary.
    fn keyword_at(&self, re: &Regex, idx: usize) -> Option<usize> {
        let token = self.tokens.get(idx)?;
        if token.kind != TokenKind::Word {
            return None;
        }
        let m = re.find(&self.bytes[token.start..])?;
        let end = token.start + m.end();
        self.token_at(end)
    }

    /// Index of the token starting at byte `offset`.
    fn token_at(&self, offset: usize) -> Option<usize> {
        if offset == self.bytes.len() {
            return Some(self.len());
        }
        self.tokens.binary_search_by_key(&offset, |t| t.start).ok()
    }

    /// Possible ends of a lazy value starting at `from`, shortest first.
    ///
    /// A value never extends over an unterminated quote.
    fn value_ends(&self, from: usize) -> Range<usize> {
        let mut end = from;
        while end < self.len() && self.tokens[end].kind != TokenKind::Unterminated {
            end += 1;
        }
        from..end + 1
    }

    /// End of the balanced group opened by the `(` at token `idx`.
    fn group_end(&self, idx: usize) -> Option<usize> {
        if !self.is_symbol(idx, b'(') {
            return None;
        }
        let mut depth = 0usize;
        for (i, token) in self.tokens.iter().enumerate().skip(idx) {
            match token.kind {
                TokenKind::Unterminated => return None,
                TokenKind::Symbol if self.bytes[token.start] == b'(' => depth += 1,
                TokenKind::Symbol if self.bytes[token.start] == b')' => {
                    depth -= 1;
                    if depth == 0 {
                        return Some(i + 1);
                    }
                }
                _ => {}
            }
        }
        None
    }

    fn capture(&mut self, slot: usize, from: usize, to: usize) {
        let range = self.offset(from)..self.offset(to);
        self.captures[slot] = Some(range);
    }

    fn run(&mut self, step: usize, idx: usize) -> bool {
        if self.failed.contains(&(step, idx)) {
            return false;
        }
        let matched = self.try_step(step, idx);
        if !matched {
            self.failed.insert((step, idx));
        }
        matched
    }

    fn try_step(&mut self, step: usize, idx: usize) -> bool {
        let Some(&current) = self.steps.get(step) else {
            return false;
        };
        let next = step + 1;

        match current {
            Step::Lead(keyword) => {
                let start = self.skip_space(idx);
                match self.keyword_at(keyword, start) {
                    Some(after) => self.run(next, after),
                    None => false,
                }
            }

            Step::Mods { slot, mods, max } => {
                let mut ends = vec![idx];
                if let Some(mods) = mods {
                    let mut at = idx;
                    while max.is_none_or(|max| ends.len() <= max) {
                        let Some(space) = self.tokens.get(at) else {
                            break;
                        };
                        if space.kind != TokenKind::Space {
                            break;
                        }
                        let Some(after) = self.keyword_at(mods, at + 1) else {
                            break;
                        };
                        ends.push(after);
                        at = after;
                    }
                }

                for &end in ends.iter().rev() {
                    self.capture(slot, idx, end);
                    let value_start = self.skip_space(end);
                    if self.run(next, value_start) {
                        return true;
                    }
                }
                false
            }

            Step::Value { slot } => {
                for end in self.value_ends(idx) {
                    self.capture(slot, idx, end);
                    if self.run(next, end) {
                        return true;
                    }
                }
                false
            }

            Step::Clause { slot, keyword } => {
                if let Some(after) = self.keyword_at(keyword, idx) {
                    let from = self.skip_space(after);
                    for end in self.value_ends(from) {
                        self.capture(slot, from, end);
                        if self.run(next, end) {
                            return true;
                        }
                    }
                }
                self.captures[slot] = None;
                self.run(next, idx)
            }

            Step::ParenColumns { slot } => {
                if let Some(end) = self.group_end(idx) {
                    self.capture(slot, idx + 1, end - 1);
                    if self.run(next, self.skip_space(end)) {
                        return true;
                    }
                }
                self.captures[slot] = None;
                self.run(next, idx)
            }

            Step::Rows { slot, keyword } => {
                if let Some(after) = self.keyword_at(keyword, idx) {
                    let from = self.skip_space(after);
                    for end in self.row_ends(from).into_iter().rev() {
                        self.capture(slot, from, end);
                        if self.run(next, end) {
                            return true;
                        }
                    }
                }
                self.captures[slot] = None;
                self.run(next, idx)
            }

            Step::Query { slot } => {
                let is_select = self.tokens.get(idx).is_some_and(|t| {
                    t.kind == TokenKind::Word
                        && self.bytes[t.start..t.end].eq_ignore_ascii_case(b"SELECT")
                });
                if is_select {
                    for end in self.value_ends(idx + 1) {
                        self.capture(slot, idx, end);
                        if self.run(next, end) {
                            return true;
                        }
                    }
                } else if let Some(end) = self.marker_end(idx) {
                    self.capture(slot, idx, end);
                    if self.run(next, self.skip_space(end)) {
                        return true;
                    }
                }
                self.captures[slot] = None;
                self.run(next, idx)
            }

            Step::Options { slot, keyword } => {
                if self.keyword_at(keyword, idx).is_some() {
                    let start = self.offset(idx);
                    let end = self.bytes[start..]
                        .iter()
                        .position(|&b| b == b';')
                        .map_or(self.bytes.len(), |p| start + p);
                    self.captures[slot] = Some(start..end);
                    return true;
                }
                self.captures[slot] = None;
                self.run(next, idx)
            }

            Step::End => idx == self.len() || self.is_symbol(idx, b';'),
        }
    }

    /// Ends of the row lists starting at `from`: after one row, two rows, ...
    ///
    /// Each end includes the whitespace that follows the row.
    fn row_ends(&self, from: usize) -> Vec<usize> {
        let mut ends = Vec::new();
        let mut at = from;

        while let Some(end) = self.group_end(at) {
            let end = self.skip_space(end);
            ends.push(end);
            if !self.is_symbol(end, b',') {
                break;
            }
            at = self.skip_space(end + 1);
        }

        ends
    }

    /// End of a `#subN` marker at token `idx`.
    fn marker_end(&self, idx: usize) -> Option<usize> {
        if !self.is_symbol(idx, b'#') {
            return None;
        }
        let word = self.tokens.get(idx + 1)?;
        let text = &self.bytes[word.start..word.end];
        let is_marker = word.kind == TokenKind::Word
            && text.len() > 3
            && text[..3].eq_ignore_ascii_case(b"sub")
            && text[3..].iter().all(u8::is_ascii_digit);
        is_marker.then_some(idx + 2)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialect::{DialectKind, ascii_regex};
    use std::sync::OnceLock;

    fn re(cell: &'static OnceLock<Regex>, pattern: &str) -> &'static Regex {
        cell.get_or_init(|| ascii_regex(pattern))
    }

    fn steps() -> Vec<Step> {
        static LEAD: OnceLock<Regex> = OnceLock::new();
        static FROM: OnceLock<Regex> = OnceLock::new();
        static WHERE: OnceLock<Regex> = OnceLock::new();
        vec![
            Step::Lead(re(&LEAD, r"^SELECT\b")),
            Step::Value { slot: 0 },
            Step::Clause {
                slot: 1,
                keyword: re(&FROM, r"^FROM\b"),
            },
            Step::Clause {
                slot: 2,
                keyword: re(&WHERE, r"^WHERE\b"),
            },
            Step::End,
        ]
    }

    fn run(sql: &str) -> Option<Vec<String>> {
        match_steps(Dialect::get(DialectKind::MySql), sql, &steps(), 3)
    }

    #[test]
    fn lazy_values_stop_at_keywords() {
        assert_eq!(
            run("  SELECT a, b FROM t WHERE x = 'FROM'").unwrap(),
            vec!["a, b", "t", "x = 'FROM'"]
        );
    }

    #[test]
    fn skipped_clauses_are_empty() {
        assert_eq!(run("SELECT 1 WHERE 2").unwrap(), vec!["1", "", "2"]);
        assert_eq!(run("SELECT").unwrap(), vec!["", "", ""]);
    }

    #[test]
    fn stops_at_semicolon() {
        assert_eq!(
            run("SELECT a FROM t; DELETE FROM t").unwrap(),
            vec!["a", "t", ""]
        );
    }

    #[test]
    fn keywords_are_whole_words() {
        assert_eq!(run("SELECT fromage FROM t").unwrap(), vec!["fromage", "t", ""]);
        assert_eq!(run("SELECTED a"), None);
    }

    #[test]
    fn unterminated_quote_fails() {
        assert_eq!(run("SELECT 'abc FROM t"), None);
    }
}
