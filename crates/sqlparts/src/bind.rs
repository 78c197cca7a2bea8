//! Placeholder substitution.

use crate::lexer::{is_word, word_end};
use crate::splitter::Splitter;
use crate::value::{Params, Value};

/// A `?` or `:name` placeholder, with optional `%` wildcards glued on.
struct Placeholder<'a> {
    start: usize,
    end: usize,
    prefix: bool,
    suffix: bool,
    /// `None` for `?`.
    name: Option<&'a str>,
}

/// Find the placeholders of a statement, skipping quoted literals.
fn placeholders<'a>(splitter: &Splitter, statement: &'a str) -> Vec<Placeholder<'a>> {
    let dialect = splitter.dialect();
    let b = statement.as_bytes();
    let mut found = Vec::new();
    let mut i = 0;

    while i < b.len() {
        if let Some(len) = dialect.literal_len(b, i) {
            i += len;
            continue;
        }

        let prefix = b[i] == b'%';
        let at = if prefix { i + 1 } else { i };

        let (name, after) = match b.get(at) {
            Some(b'?') => (None, at + 1),
            Some(b':') if b.get(at + 1).is_some_and(|&c| is_word(c)) => {
                let end = word_end(b, at + 1);
                (Some(&statement[at + 1..end]), end)
            }
            _ => {
                i += 1;
                continue;
            }
        };

        let suffix = b.get(after) == Some(&b'%');
        let end = if suffix { after + 1 } else { after };
        found.push(Placeholder {
            start: i,
            end,
            prefix,
            suffix,
            name,
        });
        i = end;
    }

    found
}

impl Splitter {
    /// Replace placeholders with quoted values.
    ///
    /// `?` placeholders take positional values in order and `:name`
    /// placeholders take named ones. A placeholder without a matching value is
    /// left as is. A `%` directly before or after a placeholder is merged into
    /// the quoted value, so `LIKE %?%` binds as `LIKE '%foo%'`.
    pub fn bind(&self, statement: &str, params: &Params) -> String {
        if params.is_empty() {
            return statement.to_string();
        }

        let mut positional = params.positional.iter();
        let mut out = String::with_capacity(statement.len() + 16);
        let mut copied = 0;

        for placeholder in placeholders(self, statement) {
            let value = match placeholder.name {
                None => positional.next(),
                Some(name) => params.named.get(name),
            };
            let Some(value) = value else {
                continue;
            };

            out.push_str(&statement[copied..placeholder.start]);
            if placeholder.prefix || placeholder.suffix {
                let mut text = String::new();
                if placeholder.prefix {
                    text.push('%');
                }
                text.push_str(&value.to_text());
                if placeholder.suffix {
                    text.push('%');
                }
                out.push_str(&self.quote_value(&Value::Text(text), "NULL"));
            } else {
                out.push_str(&self.quote_value(value, "NULL"));
            }
            copied = placeholder.end;
        }

        out.push_str(&statement[copied..]);
        out
    }

    /// Count the `?` and `:name` placeholders outside quoted literals.
    pub fn count_placeholders(&self, statement: &str) -> usize {
        placeholders(self, statement).len()
    }
}
