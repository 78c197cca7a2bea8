use crate::quote::QuoteMode;
use crate::value::Value;

/// Where a fragment goes relative to the existing part.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Placement {
    Prepend,
    #[default]
    Append,
    /// Overwrite the part of the base statement.
    Replace,
}

/// Placement and quoting for a mutation.
///
/// Unset fields fall back to the default of the method they're passed to:
/// tables are replaced and quoted with [`QuoteMode::Words`], `ORDER BY`
/// columns are prepended, everything else is appended and quoted with
/// [`QuoteMode::Smart`].
///
/// ```ignore
/// query.from_with("abc", PartOptions::append())?;
/// query.and_where_with("status = 1", None, PartOptions::replace().quote(QuoteMode::None))?;
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PartOptions {
    pub placement: Option<Placement>,
    pub quote: Option<QuoteMode>,
}

impl PartOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn prepend() -> Self {
        Self::new().placement(Placement::Prepend)
    }

    pub fn append() -> Self {
        Self::new().placement(Placement::Append)
    }

    pub fn replace() -> Self {
        Self::new().placement(Placement::Replace)
    }

    pub fn placement(mut self, placement: Placement) -> Self {
        self.placement = Some(placement);
        self
    }

    pub fn quote(mut self, mode: QuoteMode) -> Self {
        self.quote = Some(mode);
        self
    }

    pub(crate) fn placement_or(&self, default: Placement) -> Placement {
        self.placement.unwrap_or(default)
    }

    pub(crate) fn quote_or(&self, default: QuoteMode) -> QuoteMode {
        self.quote.unwrap_or(default)
    }
}

impl From<Placement> for PartOptions {
    fn from(placement: Placement) -> Self {
        Self::new().placement(placement)
    }
}

impl From<QuoteMode> for PartOptions {
    fn from(mode: QuoteMode) -> Self {
        Self::new().quote(mode)
    }
}

/// Direction of an `ORDER BY` column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    /// No direction keyword.
    #[default]
    Unspecified,
    Asc,
    Desc,
}

impl SortOrder {
    pub(crate) fn suffix(self) -> &'static str {
        match self {
            Self::Unspecified => "",
            Self::Asc => " ASC",
            Self::Desc => " DESC",
        }
    }
}

/// The right-hand side of a `column = ...` assignment.
#[derive(Debug, Clone, PartialEq)]
pub enum Assign {
    /// A value, quoted as a literal.
    Value(Value),
    /// An SQL expression, quoted as an identifier expression.
    Expression(String),
}

impl Assign {
    pub fn value(value: impl Into<Value>) -> Self {
        Self::Value(value.into())
    }

    pub fn expression(expression: impl Into<String>) -> Self {
        Self::Expression(expression.into())
    }
}
