//! Subquery extraction and injection.
//!
//! Extraction replaces the text between the parentheses of every
//! `( SELECT ... )` group with a `#subN` marker, recursively, so the outer
//! statement can be split without tripping over the clauses of its
//! subqueries. Sets are numbered in pre-order: the statement itself is 0, its
//! first subquery 1, that subquery's first nested subquery 2, and so on.

use std::sync::OnceLock;

use regex::bytes::Regex;

use crate::dialect::ascii_regex;
use crate::error::SplitResult;
use crate::lexer::group_content_len;
use crate::parts::Parts;
use crate::splitter::Splitter;

/// Prefix of the marker left in place of an extracted subquery.
pub const SUBQUERY_MARKER: &str = "#sub";

fn select_after_paren_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| ascii_regex(r"^\s*SELECT\b"))
}

fn contains_select(sql: &str, from: usize) -> bool {
    sql.as_bytes()
        .get(from..)
        .is_some_and(|tail| tail.windows(6).any(|w| w.eq_ignore_ascii_case(b"SELECT")))
}

impl Splitter {
    /// Extract subqueries from a statement.
    ///
    /// Returns `[statement with markers, subquery 1, subquery 2, ...]`. A
    /// statement without subqueries comes back as a single element.
    ///
    /// ```ignore
    /// let sets = Splitter::mysql().extract_subsets("SELECT * FROM (SELECT id FROM x) AS t")?;
    /// assert_eq!(sets, vec!["SELECT * FROM (#sub1) AS t", "SELECT id FROM x"]);
    /// ```
    pub fn extract_subsets(&self, sql: &str) -> SplitResult<Vec<String>> {
        let mut sets = Vec::new();
        self.extract_into(sql, &mut sets, 0)?;

        tracing::trace!(
            target: "sqlparts.subquery",
            subqueries = sets.len() - 1,
            "extracted subqueries"
        );
        Ok(sets)
    }

    /// Push `sql` with its subqueries replaced by markers, returning its index.
    fn extract_into(&self, sql: &str, sets: &mut Vec<String>, depth: usize) -> SplitResult<usize> {
        self.check_depth(depth)?;

        if !contains_select(sql, 6) {
            sets.push(sql.to_string());
            return Ok(sets.len() - 1);
        }

        let offset = sets.len();
        sets.push(String::new());
        let mut sql = sql.to_string();

        if self.query_type(&sql).is_some_and(|t| t.is_insert_like()) {
            let mut parts = self.split(&sql)?;
            if !parts.text("query").trim().is_empty() {
                let query = parts.text("query").to_string();
                let index = self.extract_into(&query, sets, depth + 1)?;
                parts.insert("query", format!("{SUBQUERY_MARKER}{index}"));
                sql = self.join(&parts);
            }
        }

        let mut pos = 0;
        loop {
            let b = sql.as_bytes();
            let Some((open, len)) = find_subquery(self, b, pos) else {
                break;
            };
            let content = sql[open + 1..open + 1 + len].to_string();
            let index = self.extract_into(&content, sets, depth + 1)?;
            let marker = format!("{SUBQUERY_MARKER}{index}");

            sql.replace_range(open + 1..open + 1 + len, &marker);
            pos = open + 1 + marker.len();
        }

        sets[offset] = sql;
        Ok(offset)
    }

    /// Put extracted subqueries back in place of their markers.
    ///
    /// `sets[0]` is the target; markers are resolved until none remain, so
    /// nested subqueries come back too. Markers inside quoted literals and
    /// markers without a matching set are left alone.
    pub fn inject_subsets(&self, sets: &[String]) -> String {
        match sets {
            [] => String::new(),
            [only] => only.clone(),
            [target, ..] => self.inject_markers(target, sets),
        }
    }

    /// Put extracted subqueries back into every part.
    pub fn inject_parts(&self, parts: &mut Parts, sets: &[String]) {
        if sets.len() < 2 {
            return;
        }
        for value in parts.values_mut() {
            if value.contains(SUBQUERY_MARKER) {
                *value = self.inject_markers(value, sets);
            }
        }
    }

    fn inject_markers(&self, target: &str, sets: &[String]) -> String {
        let mut text = target.to_string();
        // Each pass resolves one level of nesting.
        for _ in 0..=sets.len() {
            let (replaced, changed) = self.replace_markers(&text, sets);
            text = replaced;
            if !changed {
                break;
            }
        }
        text
    }

    fn replace_markers(&self, text: &str, sets: &[String]) -> (String, bool) {
        let dialect = self.dialect();
        let b = text.as_bytes();
        let marker = SUBQUERY_MARKER.as_bytes();
        let mut out = String::with_capacity(text.len());
        let mut copied = 0;
        let mut changed = false;
        let mut i = 0;

        while i < b.len() {
            if let Some(len) = dialect.literal_len(b, i) {
                i += len;
                continue;
            }
            if b[i..].starts_with(marker) {
                let digits_start = i + marker.len();
                let mut digits_end = digits_start;
                while digits_end < b.len() && b[digits_end].is_ascii_digit() {
                    digits_end += 1;
                }
                let index = text[digits_start..digits_end].parse::<usize>().ok();
                if let Some(set) = index.filter(|&n| n > 0).and_then(|n| sets.get(n)) {
                    out.push_str(&text[copied..i]);
                    out.push_str(set);
                    copied = digits_end;
                    changed = true;
                }
                i = digits_end.max(i + 1);
                continue;
            }
            i += 1;
        }

        out.push_str(&text[copied..]);
        (out, changed)
    }

    /// The subquery sets of a statement, or `None` when it has no
    /// `( SELECT` group.
    pub(crate) fn extract_if_nested(&self, sql: &str) -> SplitResult<Option<Vec<String>>> {
        if find_subquery(self, sql.as_bytes(), 0).is_none() {
            return Ok(None);
        }
        self.extract_subsets(sql).map(Some)
    }
}

/// Find the next `(` at or after `pos`, outside quoted literals, that opens
/// a closed `( SELECT ... )` group. Returns the paren position and the
/// length of the group's content.
fn find_subquery(splitter: &Splitter, b: &[u8], mut pos: usize) -> Option<(usize, usize)> {
    let dialect = splitter.dialect();

    while pos < b.len() {
        if let Some(len) = dialect.literal_len(b, pos) {
            pos += len;
            continue;
        }
        if b[pos] == b'(' && select_after_paren_re().is_match(&b[pos + 1..]) {
            if let Some(len) = group_content_len(dialect, b, pos + 1) {
                return Some((pos, len));
            }
        }
        pos += 1;
    }

    None
}
