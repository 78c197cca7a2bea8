//! SQL dialects: quote characters, escape rules and the keyword patterns the
//! splitter and quoting engine are built on.
//!
//! Dialects are immutable and live in process-wide statics; everything else
//! holds a `&'static Dialect`.

use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

use regex::bytes::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};

use crate::error::SplitError;

/// Selects one of the supported dialects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DialectKind {
    /// ANSI SQL: `"identifier"`, `'string'` with doubled quotes.
    #[serde(alias = "ansi")]
    Generic,
    /// MySQL: `` `identifier` ``, backslash escapes in strings.
    #[default]
    MySql,
}

impl DialectKind {
    /// The dialect instance for this kind.
    pub fn dialect(self) -> &'static Dialect {
        Dialect::get(self)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Generic => "generic",
            Self::MySql => "mysql",
        }
    }
}

impl fmt::Display for DialectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DialectKind {
    type Err = SplitError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim();
        if name.eq_ignore_ascii_case("generic") || name.eq_ignore_ascii_case("ansi") {
            Ok(Self::Generic)
        } else if name.eq_ignore_ascii_case("mysql") {
            Ok(Self::MySql)
        } else {
            Err(SplitError::UnsupportedDialect(s.to_string()))
        }
    }
}

/// How a quote character is escaped inside a quoted literal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Escape {
    /// No escapes; the literal ends at the first closing quote.
    None,
    /// The quote is written twice (`'it''s'`).
    Doubling,
    /// Backslash escapes, doubled quotes also accepted (`'it\'s'`, `'it''s'`).
    Backslash,
}

/// Build a case-insensitive, ASCII-only byte regex.
///
/// `\w`, `\s`, `\d` and `\b` all follow ASCII rules so multi-byte characters
/// are never treated as word characters.
pub(crate) fn ascii_regex(pattern: &str) -> Regex {
    RegexBuilder::new(pattern)
        .case_insensitive(true)
        .unicode(false)
        .build()
        .expect("invalid built-in dialect regex")
}

const GENERIC_QUERY_TYPES: &str = r"SELECT|INSERT|REPLACE|UPDATE|DELETE|TRUNCATE|CALL|DO|HANDLER|(?:ALTER|CREATE|DROP|RENAME)\s+(?:DATABASE|TABLE|VIEW|FUNCTION|PROCEDURE|TRIGGER|INDEX)|PREPARE|EXECUTE|DEALLOCATE\s+PREPARE|DESCRIBE|EXPLAIN|HELP|USE|LOCK\s+TABLES|UNLOCK\s+TABLES|SET|SHOW|START\s+TRANSACTION|BEGIN|COMMIT|ROLLBACK|SAVEPOINT|RELEASE\s+SAVEPOINT|CACHE\s+INDEX|FLUSH|KILL|LOAD|RESET|PURGE\s+BINARY\s+LOGS|START\s+SLAVE|STOP\s+SLAVE";

const MYSQL_QUERY_TYPES: &str = r"SELECT|INSERT|REPLACE|UPDATE|DELETE|TRUNCATE|CALL|DO|HANDLER|LOAD\s+(?:DATA|XML)\s+INFILE|(?:ALTER|CREATE|DROP|RENAME)\s+(?:DATABASE|TABLE|VIEW|FUNCTION|PROCEDURE|TRIGGER|INDEX)|PREPARE|EXECUTE|DEALLOCATE\s+PREPARE|DESCRIBE|EXPLAIN|HELP|USE|LOCK\s+TABLES|UNLOCK\s+TABLES|SET|SHOW|START\s+TRANSACTION|BEGIN|COMMIT|ROLLBACK|SAVEPOINT|RELEASE\s+SAVEPOINT|CACHE\s+INDEX|FLUSH|KILL|LOAD|RESET|PURGE\s+BINARY\s+LOGS|START\s+SLAVE|STOP\s+SLAVE";

const GENERIC_KEYWORDS: &str = r"NULL|TRUE|FALSE|DEFAULT|DIV|AND|OR|XOR|NOT|IN|IS|BETWEEN|LIKE|MATCH|AS|CASE|WHEN|THEN|END|ASC|DESC|BINARY";

const MYSQL_KEYWORDS: &str = r"NULL|TRUE|FALSE|DEFAULT|DIV|AND|OR|XOR|NOT|IN|IS|BETWEEN|R?LIKE|REGEXP|SOUNDS\s+LIKE|MATCH|AS|CASE|WHEN|THEN|END|ASC|DESC|BINARY";

const GENERIC_SELECT_MODS: &str = "ALL|DISTINCT|DISTINCTROW";

const MYSQL_SELECT_MODS: &str = "ALL|DISTINCT|DISTINCTROW|HIGH_PRIORITY|STRAIGHT_JOIN|SQL_SMALL_RESULT|SQL_BIG_RESULT|SQL_BUFFER_RESULT|SQL_CACHE|SQL_NO_CACHE|SQL_CALC_FOUND_ROWS";

const MYSQL_INSERT_MODS: &str = "LOW_PRIORITY|DELAYED|HIGH_PRIORITY|IGNORE";
const MYSQL_DELETE_MODS: &str = "LOW_PRIORITY|QUICK|IGNORE";

const GENERIC_JOIN: &str = r"(?:NATURAL\s+)?(?:(?:LEFT|RIGHT)\s+)?(?:(?:INNER|CROSS|OUTER)\s+)?JOIN\b";
const MYSQL_JOIN: &str =
    r"(?:NATURAL\s+)?(?:(?:LEFT|RIGHT)\s+)?(?:(?:INNER|CROSS|OUTER)\s+)?(?:STRAIGHT_)?JOIN\b";

const GENERIC_JOIN_WORDS: &[&str] = &["NATURAL", "LEFT", "RIGHT", "INNER", "CROSS", "OUTER", "JOIN"];
const MYSQL_JOIN_WORDS: &[&str] = &[
    "NATURAL",
    "LEFT",
    "RIGHT",
    "INNER",
    "CROSS",
    "OUTER",
    "STRAIGHT_JOIN",
    "JOIN",
];

/// Compiled patterns of a dialect.
pub(crate) struct Patterns {
    /// `^\s*(TYPE)\b`, capture 1 is the statement type phrase.
    pub query_type: Regex,
    /// Reserved words that are never quoted: `^(?:KEYWORDS)\b`.
    pub keyword: Regex,
    /// Keywords delimited by whitespace, a comma or the end of the text.
    pub keyword_delimited: Regex,
    /// A complete dotted identifier with optional surrounding whitespace.
    pub full_identifier: Regex,
    /// A dotted identifier at the start of the text.
    pub identifier_prefix: Regex,
    /// Quoted segments joined by dots, nothing else.
    pub quoted_path: Regex,
    /// `AS` followed by a quoted type name at the end of a CAST argument.
    pub cast_target: Regex,
    /// Join syntax at the start of the text.
    pub join: Regex,
    pub select_mods: Regex,
    pub insert_mods: Option<Regex>,
    pub update_mods: Option<Regex>,
    pub delete_mods: Option<Regex>,
    /// Words that end an alias or an ON condition in a table list.
    pub join_words: &'static [&'static str],
}

/// An SQL dialect.
pub struct Dialect {
    kind: DialectKind,
    name: &'static str,
    identifier_quote: u8,
    string_quotes: &'static [u8],
    string_escape: Escape,
    /// MySQL allows identifiers with leading digits (`1st_column`).
    leading_digits: bool,
    patterns: Patterns,
}

impl fmt::Debug for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dialect")
            .field("kind", &self.kind)
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

impl Dialect {
    /// The shared instance for `kind`.
    pub fn get(kind: DialectKind) -> &'static Dialect {
        static GENERIC: OnceLock<Dialect> = OnceLock::new();
        static MYSQL: OnceLock<Dialect> = OnceLock::new();

        match kind {
            DialectKind::Generic => GENERIC.get_or_init(Dialect::generic),
            DialectKind::MySql => MYSQL.get_or_init(Dialect::mysql),
        }
    }

    fn generic() -> Self {
        Self {
            kind: DialectKind::Generic,
            name: "ANSI",
            identifier_quote: b'"',
            string_quotes: b"'",
            string_escape: Escape::Doubling,
            leading_digits: false,
            patterns: Patterns::build(
                GENERIC_QUERY_TYPES,
                GENERIC_KEYWORDS,
                r#"[a-z_][a-z0-9_]*|"[^"]*""#,
                b'"',
                GENERIC_JOIN,
                GENERIC_SELECT_MODS,
                None,
                None,
                GENERIC_JOIN_WORDS,
            ),
        }
    }

    fn mysql() -> Self {
        Self {
            kind: DialectKind::MySql,
            name: "MySQL",
            identifier_quote: b'`',
            string_quotes: b"'\"",
            string_escape: Escape::Backslash,
            leading_digits: true,
            patterns: Patterns::build(
                MYSQL_QUERY_TYPES,
                MYSQL_KEYWORDS,
                r"[0-9]*[a-z_][a-z0-9_]*|`[^`]*`",
                b'`',
                MYSQL_JOIN,
                MYSQL_SELECT_MODS,
                Some(MYSQL_INSERT_MODS),
                Some(MYSQL_DELETE_MODS),
                MYSQL_JOIN_WORDS,
            ),
        }
    }

    pub fn kind(&self) -> DialectKind {
        self.kind
    }

    /// Display name, `ANSI` or `MySQL`.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Quote character for string literals.
    pub fn string_quote(&self) -> char {
        '\''
    }

    /// Quote character for identifiers.
    pub fn identifier_quote(&self) -> char {
        char::from(self.identifier_quote)
    }

    pub(crate) fn identifier_quote_byte(&self) -> u8 {
        self.identifier_quote
    }

    pub(crate) fn patterns(&self) -> &Patterns {
        &self.patterns
    }

    pub(crate) fn allows_leading_digits(&self) -> bool {
        self.leading_digits
    }

    /// Whether `b` opens a quoted literal (string or identifier).
    pub(crate) fn is_quote(&self, b: u8) -> bool {
        b == self.identifier_quote || self.string_quotes.contains(&b)
    }

    /// Length of the quoted literal (string or identifier) starting at `pos`.
    ///
    /// `None` when `pos` isn't a quote or the literal is never closed.
    pub(crate) fn literal_len(&self, s: &[u8], pos: usize) -> Option<usize> {
        self.string_literal_len(s, pos)
            .or_else(|| self.identifier_literal_len(s, pos))
    }

    /// Length of the quoted string literal starting at `pos`.
    pub(crate) fn string_literal_len(&self, s: &[u8], pos: usize) -> Option<usize> {
        let quote = *s.get(pos)?;
        if !self.string_quotes.contains(&quote) {
            return None;
        }
        scan_quoted(s, pos, quote, self.string_escape)
    }

    /// Length of the quoted identifier starting at `pos`.
    pub(crate) fn identifier_literal_len(&self, s: &[u8], pos: usize) -> Option<usize> {
        if s.get(pos) != Some(&self.identifier_quote) {
            return None;
        }
        scan_quoted(s, pos, self.identifier_quote, Escape::None)
    }

    /// Whether `text` is exactly one quoted string literal.
    pub fn is_quoted_string(&self, text: &str) -> bool {
        self.string_literal_len(text.as_bytes(), 0) == Some(text.len())
    }

    /// Quote a string to be used in an SQL statement.
    pub fn quote_string(&self, value: &str) -> String {
        let mut out = String::with_capacity(value.len() + 2);
        out.push('\'');
        match self.string_escape {
            Escape::Backslash => {
                for c in value.chars() {
                    match c {
                        '\0' => out.push_str("\\0"),
                        '\r' => out.push_str("\\r"),
                        '\n' => out.push_str("\\n"),
                        '\x0C' => out.push_str("\\f"),
                        '\t' => out.push_str("\\t"),
                        '\'' => out.push_str("\\'"),
                        '\\' => out.push_str("\\\\"),
                        c => out.push(c),
                    }
                }
            }
            Escape::Doubling | Escape::None => {
                for c in value.chars() {
                    if c == '\'' {
                        out.push('\'');
                    }
                    out.push(c);
                }
            }
        }
        out.push('\'');
        out
    }

    /// Unquote a string literal taken from an SQL statement.
    ///
    /// Returns `None` if `quoted` isn't exactly one valid string literal.
    pub fn unquote_string(&self, quoted: &str) -> Option<String> {
        if !self.is_quoted_string(quoted) {
            return None;
        }
        let quote = quoted.chars().next()?;
        let inner = &quoted[1..quoted.len() - 1];
        let mut out = String::with_capacity(inner.len());
        let mut chars = inner.chars().peekable();

        while let Some(c) = chars.next() {
            if c == quote && chars.peek() == Some(&quote) {
                chars.next();
                out.push(quote);
                continue;
            }
            if c == '\\' && self.string_escape == Escape::Backslash {
                match chars.next() {
                    Some('0') => out.push('\0'),
                    Some('b') => out.push('\x08'),
                    Some('n') => out.push('\n'),
                    Some('r') => out.push('\r'),
                    Some('t') => out.push('\t'),
                    Some('f') => out.push('\x0C'),
                    Some('Z') => out.push('\x1A'),
                    Some(other) => out.push(other),
                    None => out.push('\\'),
                }
                continue;
            }
            out.push(c);
        }

        Some(out)
    }
}

fn scan_quoted(s: &[u8], pos: usize, quote: u8, escape: Escape) -> Option<usize> {
    let mut i = pos + 1;
    while i < s.len() {
        let c = s[i];
        if c == b'\\' && escape == Escape::Backslash {
            i += 2;
            continue;
        }
        if c == quote {
            if escape != Escape::None && s.get(i + 1) == Some(&quote) {
                i += 2;
                continue;
            }
            return Some(i + 1 - pos);
        }
        i += 1;
    }
    None
}

impl Patterns {
    #[allow(clippy::too_many_arguments)]
    fn build(
        query_types: &str,
        keywords: &str,
        segment: &str,
        identifier_quote: u8,
        join: &str,
        select_mods: &str,
        insert_mods: Option<&str>,
        delete_mods: Option<&str>,
        join_words: &'static [&'static str],
    ) -> Self {
        let q = regex::escape(&char::from(identifier_quote).to_string());
        let identifier = format!(r"(?:{segment})(?:\.(?:{segment})){{0,2}}");
        let mods = |list: &str| ascii_regex(&format!(r"^(?:{list})\b"));

        Self {
            query_type: ascii_regex(&format!(r"^\s*({query_types})\b")),
            keyword: ascii_regex(&format!(r"^(?:{keywords})\b")),
            keyword_delimited: ascii_regex(&format!(r"^(?:{keywords})(?:$|[\s,])")),
            full_identifier: ascii_regex(&format!(r"^\s*{identifier}\s*$")),
            identifier_prefix: ascii_regex(&format!("^{identifier}")),
            quoted_path: ascii_regex(&format!(r"^(?:{q}[^{q}]*{q}\.)*{q}[^{q}]*{q}$")),
            cast_target: ascii_regex(&format!(r"(\bAS\b\s*){q}([^{q}]*){q}(\s*)$")),
            join: ascii_regex(&format!("^{join}")),
            select_mods: mods(select_mods),
            insert_mods: insert_mods.map(mods),
            update_mods: insert_mods.map(mods),
            delete_mods: delete_mods.map(mods),
            join_words,
        }
    }
}
