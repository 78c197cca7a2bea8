//! Quoting and unquoting of values and identifiers.
//!
//! Identifier quoting is the injection boundary of the crate: whatever a
//! caller passes as a column, table or expression goes through
//! [`Splitter::quote_identifier`] before it is written into a part.

use std::sync::OnceLock;

use regex::bytes::Regex;
use serde::{Deserialize, Serialize};

use crate::dialect::ascii_regex;
use crate::error::{SplitError, SplitResult};
use crate::lexer::{
    at_word_start, char_len, group_len, is_space, is_word, parens_balanced, word_end,
};
use crate::splitter::Splitter;
use crate::value::{DATETIME_FORMAT, Value};

/// How aggressively identifiers in an expression are quoted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuoteMode {
    /// Leave the expression untouched. The caller vouches for it.
    None,
    /// Quote bare words, leaving keywords, literals and function names alone,
    /// and keep `CAST(... AS TYPE)` targets unquoted.
    #[default]
    Smart,
    /// Quote every bare word that isn't a keyword, function names included.
    Words,
    /// Treat the input as a single dotted identifier.
    Strict,
}

fn integer_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| ascii_regex(r"^[-+]?[0-9]+$"))
}

fn number_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| ascii_regex(r"^[-+]?(?:[0-9]+\.?[0-9]*|\.[0-9]+)(?:e[-+]?[0-9]+)?$"))
}

fn collate_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| ascii_regex(r"^(?:COLLATE|USING)\s+\w+"))
}

fn trim_call_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| ascii_regex(r"^TRIM\s*\(\s*(?:BOTH|LEADING|TRAILING)\b"))
}

fn has_cast_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| ascii_regex(r"\bCAST\s*\("))
}

fn ends_with_cast_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| ascii_regex(r"\bCAST\s*$"))
}

impl Splitter {
    /// Quote a value for use in a statement.
    ///
    /// `empty` is written for [`Value::Null`], typically `NULL` or `DEFAULT`.
    /// Floats keep a fractional part or exponent so they read back as floats;
    /// NaN and infinities have no SQL literal and are written as `empty`.
    pub fn quote_value(&self, value: &Value, empty: &str) -> String {
        match value {
            Value::Null => empty.to_string(),
            Value::Bool(true) => "TRUE".to_string(),
            Value::Bool(false) => "FALSE".to_string(),
            Value::Int(n) => n.to_string(),
            Value::Float(f) if !f.is_finite() => empty.to_string(),
            Value::Float(f) => format!("{f:?}"),
            Value::Text(s) => self.dialect().quote_string(s),
            Value::DateTime(dt) => self
                .dialect()
                .quote_string(&dt.format(DATETIME_FORMAT).to_string()),
            Value::List(items) => {
                let quoted: Vec<String> = items
                    .iter()
                    .map(|item| self.quote_value(item, empty))
                    .collect();
                format!("({})", quoted.join(", "))
            }
        }
    }

    /// Turn a literal taken from a statement back into a value.
    ///
    /// `NULL` and `DEFAULT` both become [`Value::Null`].
    pub fn unquote_value(&self, text: &str) -> SplitResult<Value> {
        let token = text.trim();

        if token.eq_ignore_ascii_case("NULL") || token.eq_ignore_ascii_case("DEFAULT") {
            return Ok(Value::Null);
        }
        if token.eq_ignore_ascii_case("TRUE") {
            return Ok(Value::Bool(true));
        }
        if token.eq_ignore_ascii_case("FALSE") {
            return Ok(Value::Bool(false));
        }

        if integer_re().is_match(token.as_bytes()) {
            if let Ok(n) = token.parse::<i64>() {
                return Ok(Value::Int(n));
            }
        }
        if number_re().is_match(token.as_bytes()) {
            if let Ok(f) = token.parse::<f64>() {
                return Ok(Value::Float(f));
            }
        }

        self.dialect()
            .unquote_string(token)
            .map(Value::Text)
            .ok_or_else(|| SplitError::InvalidValue(text.to_string()))
    }

    /// Quote the identifiers of a field name or expression.
    ///
    /// ```ignore
    /// let s = Splitter::mysql();
    /// assert_eq!(s.quote_identifier("abc.test AS def", QuoteMode::Smart)?, "`abc`.`test` AS `def`");
    /// assert_eq!(s.quote_identifier("abd-def*10", QuoteMode::Strict)?, "`abd-def*10`");
    /// ```
    pub fn quote_identifier(&self, identifier: &str, mode: QuoteMode) -> SplitResult<String> {
        match mode {
            QuoteMode::Strict => self.quote_strict(identifier),
            QuoteMode::None => Ok(identifier.to_string()),
            QuoteMode::Words | QuoteMode::Smart => {
                if !parens_balanced(self.dialect(), identifier) {
                    return Err(self.unsafe_identifier(identifier));
                }
                if mode == QuoteMode::Words {
                    Ok(self.quote_words(identifier))
                } else {
                    self.quote_smart(identifier)
                }
            }
        }
    }

    /// Whether the trimmed text is a plain (optionally dotted) identifier.
    pub fn is_identifier(&self, text: &str) -> bool {
        self.dialect()
            .patterns()
            .full_identifier
            .is_match(text.trim().as_bytes())
    }

    fn unsafe_identifier(&self, identifier: &str) -> SplitError {
        tracing::debug!(
            target: "sqlparts.quote",
            dialect = self.dialect().name(),
            identifier,
            "rejected identifier that can't be quoted safely"
        );
        SplitError::UnsafeIdentifier(identifier.to_string())
    }

    fn quote_strict(&self, identifier: &str) -> SplitResult<String> {
        let dialect = self.dialect();
        let id = identifier.trim();
        let b = id.as_bytes();
        let q = dialect.identifier_quote();
        let qb = dialect.identifier_quote_byte();

        if !b.is_empty() && b.iter().all(|&c| is_word(c)) {
            return Ok(format!("{q}{id}{q}"));
        }

        let mut out = String::with_capacity(id.len() + 4);
        let mut i = 0;
        while i < b.len() {
            if let Some(len) = dialect.identifier_literal_len(b, i) {
                out.push_str(&id[i..i + len]);
                i += len;
            } else if b[i] == b'.' || b[i] == qb {
                out.push(char::from(b[i]));
                i += 1;
            } else {
                let start = i;
                while i < b.len() && b[i] != b'.' && b[i] != qb {
                    i += 1;
                }
                out.push(q);
                out.push_str(&id[start..i]);
                out.push(q);
            }
        }

        if !dialect.patterns().quoted_path.is_match(out.as_bytes()) {
            return Err(self.unsafe_identifier(id));
        }
        Ok(out)
    }

    /// Quote every bare word, function names included.
    fn quote_words(&self, expr: &str) -> String {
        let dialect = self.dialect();
        let patterns = dialect.patterns();
        let b = expr.as_bytes();
        let q = dialect.identifier_quote();
        let mut out = String::with_capacity(expr.len() + 8);
        let mut i = 0;

        while i < b.len() {
            if let Some(len) = dialect.string_literal_len(b, i) {
                out.push_str(&expr[i..i + len]);
                i += len;
                continue;
            }

            let delimited = i == 0 || is_space(b[i - 1]) || b[i - 1] == b',';
            if delimited {
                if let Some(m) = patterns.keyword_delimited.find(&b[i..]) {
                    let mut end = i + m.end();
                    if end > i && (is_space(b[end - 1]) || b[end - 1] == b',') {
                        end -= 1;
                    }
                    out.push_str(&expr[i..end]);
                    i = end;
                    continue;
                }
                if let Some(m) = collate_re().find(&b[i..]) {
                    out.push_str(&expr[i..i + m.end()]);
                    i += m.end();
                    continue;
                }
            }

            if let Some(len) = dialect.identifier_literal_len(b, i) {
                out.push_str(&expr[i..i + len]);
                i += len;
                continue;
            }

            let end = words_run_end(dialect, b, i);
            if end > i {
                let run = &b[i..end];
                if self.run_has_identifier(run, i == 0 || !is_word(b[i - 1])) {
                    out.push(q);
                    out.push_str(&expr[i..end]);
                    out.push(q);
                } else {
                    out.push_str(&expr[i..end]);
                }
                i = end;
                continue;
            }

            let len = char_len(b, i);
            out.push_str(&expr[i..i + len]);
            i += len;
        }

        out
    }

    /// Whether a run of non-delimiter characters names something to quote.
    fn run_has_identifier(&self, run: &[u8], boundary_before: bool) -> bool {
        if self.dialect().allows_leading_digits() {
            return run.iter().any(|&c| c.is_ascii_alphabetic() || c == b'_');
        }
        run.iter().enumerate().any(|(k, &c)| {
            let starts_word = if k == 0 {
                boundary_before
            } else {
                !is_word(run[k - 1])
            };
            (c.is_ascii_alphabetic() || c == b'_') && starts_word
        })
    }

    /// Quote bare words that aren't keywords or function names.
    fn quote_smart(&self, expr: &str) -> SplitResult<String> {
        let dialect = self.dialect();
        let patterns = dialect.patterns();
        let b = expr.as_bytes();
        let q = dialect.identifier_quote();
        let mut out = String::with_capacity(expr.len() + 8);
        let mut i = 0;

        while i < b.len() {
            if let Some(len) = dialect.string_literal_len(b, i) {
                out.push_str(&expr[i..i + len]);
                i += len;
                continue;
            }

            if is_word(b[i]) && at_word_start(b, i) {
                let rest = &b[i..];
                if let Some(m) = patterns
                    .keyword
                    .find(rest)
                    .or_else(|| collate_re().find(rest))
                {
                    out.push_str(&expr[i..i + m.end()]);
                    i += m.end();
                    continue;
                }
            }

            if let Some(m) = trim_call_re().find(&b[i..]) {
                out.push_str(&expr[i..i + m.end()]);
                i += m.end();
                continue;
            }

            if let Some(len) = dialect.identifier_literal_len(b, i) {
                out.push_str(&expr[i..i + len]);
                i += len;
                continue;
            }

            if let Some(end) = smart_word_end(dialect.allows_leading_digits(), b, i) {
                out.push(q);
                out.push_str(&expr[i..end]);
                out.push(q);
                i = end;
                continue;
            }

            let len = char_len(b, i);
            out.push_str(&expr[i..i + len]);
            i += len;
        }

        if has_cast_re().is_match(out.as_bytes()) {
            out = self.unquote_cast_targets(&out, 0)?;
        }
        Ok(out)
    }

    /// Strip the quotes the word pass put around `CAST(... AS type)` targets,
    /// walking nested groups bottom-up.
    fn unquote_cast_targets(&self, expr: &str, depth: usize) -> SplitResult<String> {
        self.check_depth(depth)?;

        let dialect = self.dialect();
        let b = expr.as_bytes();
        let mut out = String::with_capacity(expr.len());
        let mut copied = 0;
        let mut segment_start = 0;
        let mut i = 0;

        while i < b.len() {
            if dialect.is_quote(b[i]) {
                i += dialect.literal_len(b, i).unwrap_or(1);
                continue;
            }
            if b[i] == b'(' {
                if let Some(len) = group_len(dialect, b, i) {
                    let inner = &expr[i + 1..i + len - 1];
                    let mut cleaned = self.unquote_cast_targets(inner, depth + 1)?;
                    if ends_with_cast_re().is_match(&b[segment_start..i]) {
                        cleaned = strip_cast_target(&dialect.patterns().cast_target, &cleaned);
                    }
                    out.push_str(&expr[copied..=i]);
                    out.push_str(&cleaned);
                    out.push(')');
                    i += len;
                    copied = i;
                    segment_start = i;
                    continue;
                }
            }
            i += 1;
        }

        out.push_str(&expr[copied..]);
        Ok(out)
    }
}

/// End of the run of characters WORDS mode treats as one name: anything but
/// whitespace, commas, dots, quotes and parentheses.
fn words_run_end(dialect: &crate::dialect::Dialect, b: &[u8], mut i: usize) -> usize {
    while i < b.len() {
        let c = b[i];
        if is_space(c) || matches!(c, b',' | b'.' | b'(' | b')') || dialect.is_quote(c) {
            break;
        }
        i += 1;
    }
    i
}

/// End of a word SMART mode quotes: it must start at `i`, contain a letter
/// or underscore after any leading digits, and not be followed by `(`.
fn smart_word_end(leading_digits: bool, b: &[u8], i: usize) -> Option<usize> {
    if !at_word_start(b, i) {
        return None;
    }
    let mut j = i;
    if leading_digits {
        while j < b.len() && b[j].is_ascii_digit() {
            j += 1;
        }
    }
    let first = *b.get(j)?;
    if !(first.is_ascii_alphabetic() || first == b'_') {
        return None;
    }
    let end = word_end(b, j);

    let mut k = end;
    while k < b.len() && is_space(b[k]) {
        k += 1;
    }
    if b.get(k) == Some(&b'(') {
        return None;
    }
    Some(end)
}

fn strip_cast_target(re: &Regex, content: &str) -> String {
    let Some(caps) = re.captures(content.as_bytes()) else {
        return content.to_string();
    };
    let (Some(whole), Some(keyword), Some(name), Some(tail)) =
        (caps.get(0), caps.get(1), caps.get(2), caps.get(3))
    else {
        return content.to_string();
    };

    let mut out = String::with_capacity(content.len());
    out.push_str(&content[..whole.start()]);
    out.push_str(&content[keyword.range()]);
    out.push_str(&content[name.range()]);
    out.push_str(&content[tail.range()]);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn mysql() -> Splitter {
        Splitter::mysql()
    }

    fn smart(expr: &str) -> String {
        mysql().quote_identifier(expr, QuoteMode::Smart).unwrap()
    }

    #[test]
    fn quote_scalar_values() {
        let s = mysql();
        assert_eq!(s.quote_value(&Value::Null, "NULL"), "NULL");
        assert_eq!(s.quote_value(&Value::Null, "DEFAULT"), "DEFAULT");
        assert_eq!(s.quote_value(&Value::from(1), "NULL"), "1");
        assert_eq!(s.quote_value(&Value::from(1.3), "NULL"), "1.3");
        assert_eq!(s.quote_value(&Value::from(true), "NULL"), "TRUE");
        assert_eq!(s.quote_value(&Value::from(false), "NULL"), "FALSE");
        assert_eq!(s.quote_value(&Value::from("test"), "NULL"), "'test'");
        assert_eq!(
            s.quote_value(&Value::from("test 'abc' test"), "NULL"),
            r"'test \'abc\' test'"
        );
        assert_eq!(
            s.quote_value(&Value::from("line1\nline2\nline3"), "NULL"),
            r"'line1\nline2\nline3'"
        );
    }

    #[test]
    fn floats_read_back_as_floats() {
        let s = mysql();
        assert_eq!(s.quote_value(&Value::from(1.0), "NULL"), "1.0");
        assert_eq!(s.quote_value(&Value::from(-0.5), "NULL"), "-0.5");
        assert_eq!(s.quote_value(&Value::from(1e20), "NULL"), "1e20");
        assert_eq!(s.unquote_value("1.0").unwrap(), Value::Float(1.0));
        assert_eq!(s.unquote_value("1e20").unwrap(), Value::Float(1e20));
        assert_eq!(s.quote_value(&Value::Float(f64::NAN), "NULL"), "NULL");
        assert_eq!(s.quote_value(&Value::Float(f64::INFINITY), "DEFAULT"), "DEFAULT");
        assert_eq!(s.quote_value(&Value::Float(f64::NEG_INFINITY), "NULL"), "NULL");
    }

    #[test]
    fn quote_list_uses_empty_token() {
        let list = Value::List(vec![
            Value::from(1),
            Value::from(true),
            Value::from("abc"),
            Value::Null,
        ]);
        assert_eq!(mysql().quote_value(&list, "DEFAULT"), "(1, TRUE, 'abc', DEFAULT)");
    }

    #[test]
    fn quote_datetime() {
        let dt = NaiveDate::from_ymd_opt(2024, 2, 29)
            .unwrap()
            .and_hms_opt(13, 5, 0)
            .unwrap();
        assert_eq!(
            mysql().quote_value(&Value::from(dt), "NULL"),
            "'2024-02-29 13:05:00'"
        );
    }

    #[test]
    fn unquote_values() {
        let s = mysql();
        assert_eq!(s.unquote_value(" NULL ").unwrap(), Value::Null);
        assert_eq!(s.unquote_value("default").unwrap(), Value::Null);
        assert_eq!(s.unquote_value("TRUE").unwrap(), Value::Bool(true));
        assert_eq!(s.unquote_value("-42").unwrap(), Value::Int(-42));
        assert_eq!(s.unquote_value("3.5").unwrap(), Value::Float(3.5));
        assert_eq!(s.unquote_value("1e3").unwrap(), Value::Float(1000.0));
        assert_eq!(
            s.unquote_value(r"'it\'s'").unwrap(),
            Value::Text("it's".to_string())
        );
        assert_eq!(
            s.unquote_value("abc"),
            Err(SplitError::InvalidValue("abc".to_string()))
        );
    }

    #[test]
    fn smart_simple() {
        assert_eq!(smart("test"), "`test`");
        assert_eq!(smart("`test`"), "`test`");
        assert_eq!(smart("abc.test"), "`abc`.`test`");
        assert_eq!(smart("`abc`.`test`"), "`abc`.`test`");
        assert_eq!(smart("abc.test AS def"), "`abc`.`test` AS `def`");
    }

    #[test]
    fn smart_leaves_functions_and_keywords() {
        assert_eq!(smart("count(abc.test) AS count"), "count(`abc`.`test`) AS `count`");
        assert_eq!(
            smart("abc.test - def.total*10 AS grandtotal"),
            "`abc`.`test` - `def`.`total`*10 AS `grandtotal`"
        );
        assert_eq!(smart("name COLLATE utf8_bin"), "`name` COLLATE utf8_bin");
        assert_eq!(smart("a IS NOT NULL AND b = 'x y'"), "`a` IS NOT NULL AND `b` = 'x y'");
        assert_eq!(smart("id DESC"), "`id` DESC");
    }

    #[test]
    fn smart_unquotes_cast_types() {
        assert_eq!(
            smart("qqq, cast(`abc`.test AS DATETIME)"),
            "`qqq`, cast(`abc`.`test` AS DATETIME)"
        );
        assert_eq!(
            smart("qqq, cast(myfn(`abc`.test as myarg) AS DATETIME) AS date"),
            "`qqq`, cast(myfn(`abc`.`test` as `myarg`) AS DATETIME) AS `date`"
        );
    }

    #[test]
    fn smart_rejects_unbalanced() {
        let identifier = "= 10) OR (xyz(fd = '33'), 20) OR (abc =";
        let err = mysql()
            .quote_identifier(identifier, QuoteMode::Smart)
            .unwrap_err();
        assert_eq!(err.to_string(), format!("Unable to quote '{identifier}' safely"));
    }

    #[test]
    fn unclosed_quotes_are_rejected() {
        let s = mysql();
        for mode in [QuoteMode::Words, QuoteMode::Smart] {
            for identifier in ["abc' OR 1=1", "abc\" OR 1=1", "`abc OR 1=1", "a.b = 'x"] {
                let err = s.quote_identifier(identifier, mode).unwrap_err();
                assert_eq!(err, SplitError::UnsafeIdentifier(identifier.to_string()));
            }
        }
        assert_eq!(
            s.quote_identifier("a = 'it''s'", QuoteMode::Smart).unwrap(),
            "`a` = 'it''s'"
        );
    }

    #[test]
    fn none_mode_passes_through() {
        assert_eq!(mysql().quote_identifier("abc", QuoteMode::None).unwrap(), "abc");
    }

    #[test]
    fn strict_mode() {
        let s = mysql();
        assert_eq!(
            s.quote_identifier("abd-def*10", QuoteMode::Strict).unwrap(),
            "`abd-def*10`"
        );
        assert_eq!(
            s.quote_identifier("`abc`.test-10", QuoteMode::Strict).unwrap(),
            "`abc`.`test-10`"
        );

        let err = s
            .quote_identifier("`abc`.`test`-10", QuoteMode::Strict)
            .unwrap_err();
        assert_eq!(err.to_string(), "Unable to quote '`abc`.`test`-10' safely");
    }

    #[test]
    fn words_mode_quotes_functions() {
        assert_eq!(
            mysql()
                .quote_identifier("count(`abc`.`test`) AS `count`", QuoteMode::Words)
                .unwrap(),
            "`count`(`abc`.`test`) AS `count`"
        );
        assert_eq!(
            mysql()
                .quote_identifier("abc, def ASC", QuoteMode::Words)
                .unwrap(),
            "`abc`, `def` ASC"
        );
    }

    #[test]
    fn generic_dialect_quotes() {
        let s = Splitter::generic();
        assert_eq!(
            s.quote_identifier("abc.test AS def", QuoteMode::Smart).unwrap(),
            r#""abc"."test" AS "def""#
        );
        assert_eq!(s.quote_identifier("10abc", QuoteMode::Smart).unwrap(), "10abc");
        assert_eq!(s.quote_value(&Value::from("it's"), "NULL"), "'it''s'");
    }

    #[test]
    fn identifier_check() {
        let s = mysql();
        assert!(s.is_identifier("test"));
        assert!(s.is_identifier("`test`"));
        assert!(s.is_identifier("abc.test"));
        assert!(s.is_identifier("`abc`.`test`"));
        assert!(!s.is_identifier("ta-$38.934#34@dhy"));
        assert!(s.is_identifier("`ta-$38.934#34@dhy`"));
        assert!(!s.is_identifier("`test` AS def"));
        assert!(!s.is_identifier("`test` def"));
    }
}
