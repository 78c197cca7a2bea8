//! Byte-level scanning shared by the splitter, quoting engine and extractors.
//!
//! All delimiters SQL cares about are ASCII, so scanning works on bytes and
//! every position handed back lands on a `char` boundary.

use crate::dialect::Dialect;

pub(crate) fn is_word(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}

pub(crate) fn is_space(b: u8) -> bool {
    matches!(b, b' ' | b'\t' | b'\n' | b'\r' | 0x0B | 0x0C)
}

/// Position of the first non-whitespace byte at or after `pos`.
pub(crate) fn skip_space(s: &[u8], mut pos: usize) -> usize {
    while pos < s.len() && is_space(s[pos]) {
        pos += 1;
    }
    pos
}

/// End of the run of word bytes starting at `pos`.
pub(crate) fn word_end(s: &[u8], mut pos: usize) -> usize {
    while pos < s.len() && is_word(s[pos]) {
        pos += 1;
    }
    pos
}

/// Whether `pos` is preceded by a non-word byte or the start of the text.
pub(crate) fn at_word_start(s: &[u8], pos: usize) -> bool {
    pos == 0 || !is_word(s[pos - 1])
}

/// Byte length of the UTF-8 sequence starting at `pos`.
pub(crate) fn char_len(s: &[u8], pos: usize) -> usize {
    let mut end = pos + 1;
    while end < s.len() && (s[end] & 0xC0) == 0x80 {
        end += 1;
    }
    end - pos
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TokenKind {
    Word,
    Quoted,
    Space,
    Symbol,
    /// A quote character that is never closed.
    Unterminated,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Token {
    pub kind: TokenKind,
    pub start: usize,
    pub end: usize,
}

impl Token {
    pub fn is_symbol(&self, s: &[u8], c: u8) -> bool {
        self.kind == TokenKind::Symbol && s[self.start] == c
    }
}

/// Split `s` into words, quoted literals, whitespace runs and single symbols.
///
/// Each token is maximal, so a word token is never followed by another word.
pub(crate) fn tokenize(dialect: &Dialect, s: &str) -> Vec<Token> {
    let b = s.as_bytes();
    let mut tokens = Vec::with_capacity(b.len() / 3 + 1);
    let mut i = 0;

    while i < b.len() {
        let start = i;
        let kind = if is_word(b[i]) {
            i = word_end(b, i);
            TokenKind::Word
        } else if is_space(b[i]) {
            i = skip_space(b, i);
            TokenKind::Space
        } else if dialect.is_quote(b[i]) {
            match dialect.literal_len(b, i) {
                Some(len) => {
                    i += len;
                    TokenKind::Quoted
                }
                None => {
                    i += 1;
                    TokenKind::Unterminated
                }
            }
        } else {
            i += char_len(b, i);
            TokenKind::Symbol
        };
        tokens.push(Token { kind, start, end: i });
    }

    tokens
}

/// Length of the text from `pos` up to the `)` closing an already opened group.
///
/// Quoted literals are skipped whole. Returns `None` if the group never closes.
pub(crate) fn group_content_len(dialect: &Dialect, s: &[u8], pos: usize) -> Option<usize> {
    let mut depth = 0usize;
    let mut i = pos;

    while i < s.len() {
        match s[i] {
            c if dialect.is_quote(c) => {
                i += dialect.literal_len(s, i)?;
                continue;
            }
            b'(' => depth += 1,
            b')' if depth == 0 => return Some(i - pos),
            b')' => depth -= 1,
            _ => {}
        }
        i += 1;
    }

    None
}

/// Length of the parenthesized group starting at `pos`, parens included.
pub(crate) fn group_len(dialect: &Dialect, s: &[u8], pos: usize) -> Option<usize> {
    if s.get(pos) != Some(&b'(') {
        return None;
    }
    group_content_len(dialect, s, pos + 1).map(|len| len + 2)
}

/// Whether every parenthesis outside quoted literals is balanced and every
/// quoted literal is closed.
pub(crate) fn parens_balanced(dialect: &Dialect, s: &str) -> bool {
    let b = s.as_bytes();
    let mut depth = 0usize;
    let mut i = 0;

    while i < b.len() {
        let c = b[i];
        if dialect.is_quote(c) {
            match dialect.literal_len(b, i) {
                Some(len) => {
                    i += len;
                    continue;
                }
                None => return false,
            }
        } else if c == b'(' {
            depth += 1;
        } else if c == b')' {
            if depth == 0 {
                return false;
            }
            depth -= 1;
        }
        i += 1;
    }

    depth == 0
}

/// Split on top-level commas, keeping quoted literals and parenthesized
/// groups intact. Segments are trimmed; empty segments are dropped.
///
/// A stray `)`, or a `(` or quote that never closes, acts as a separator.
pub(crate) fn split_top_level<'a>(dialect: &Dialect, s: &'a str) -> Vec<&'a str> {
    let b = s.as_bytes();
    let mut segments = Vec::new();
    let mut start = 0;
    let mut i = 0;

    while i < b.len() {
        let c = b[i];
        let skip = if dialect.is_quote(c) {
            dialect.literal_len(b, i)
        } else if c == b'(' {
            group_len(dialect, b, i)
        } else if c == b')' || c == b',' {
            None
        } else {
            Some(1)
        };

        match skip {
            Some(len) => i += len,
            None => {
                segments.push(&s[start..i]);
                i += 1;
                start = i;
            }
        }
    }
    segments.push(&s[start..]);

    segments
        .into_iter()
        .map(str::trim)
        .filter(|seg| !seg.is_empty())
        .collect()
}
