use super::{AUTO_UPDATE_MARKER, Assign, PartOptions, Placement, Query, SortOrder};
use crate::error::{SplitError, SplitResult};
use crate::query_type::QueryType;
use crate::quote::QuoteMode;
use crate::value::Value;

impl Query {
    // ==================== Tables ====================

    /// The part holding the tables for this statement type.
    fn table_part(&self) -> &'static str {
        match self.query_type() {
            Some(QueryType::Insert | QueryType::Replace) => "into",
            Some(QueryType::Update | QueryType::Truncate) => "table",
            _ => "from",
        }
    }

    fn add_table(&mut self, table: &str, join: &str, on: &str, opts: PartOptions) -> SplitResult<&mut Self> {
        let part = self.table_part();
        let placement = opts.placement_or(if join.is_empty() {
            Placement::Replace
        } else {
            Placement::Append
        });

        if placement == Placement::Replace && !join.is_empty() {
            return Err(SplitError::build(format!(
                "{join} specified when replacing the table"
            )));
        }
        let join = if join.is_empty() && placement != Placement::Replace {
            ","
        } else {
            join
        };

        let table = self
            .splitter
            .quote_identifier(table, opts.quote_or(QuoteMode::Words))?;
        let on = if !join.is_empty() && !on.is_empty() {
            self.splitter.quote_identifier(on, QuoteMode::Smart)?
        } else {
            String::new()
        };
        self.ensure_part(part)?;

        match placement {
            Placement::Replace => self.set_part(part, table, placement),
            Placement::Prepend => {
                self.set_part(part, format!("{table} {join}"), Placement::Prepend)?;
                if !on.is_empty() {
                    self.set_part(part, format!("ON {on}"), Placement::Append)?;
                }
                Ok(self)
            }
            Placement::Append => {
                let fragment = if on.is_empty() {
                    format!("{join} {table}")
                } else {
                    format!("{join} {table} ON {on}")
                };
                self.set_part(part, fragment, placement)
            }
        }
    }

    /// Replace the table of a `SELECT` or `DELETE`.
    pub fn from(&mut self, table: &str) -> SplitResult<&mut Self> {
        self.add_table(table, "", "", PartOptions::new())
    }

    /// Set or add a table. A table that isn't replacing is added with a comma.
    pub fn from_with(&mut self, table: &str, opts: PartOptions) -> SplitResult<&mut Self> {
        self.add_table(table, "", "", opts)
    }

    /// Replace the table of an `INSERT` or `REPLACE`.
    pub fn into_table(&mut self, table: &str) -> SplitResult<&mut Self> {
        self.add_table(table, "", "", PartOptions::new())
    }

    pub fn into_table_with(&mut self, table: &str, opts: PartOptions) -> SplitResult<&mut Self> {
        self.add_table(table, "", "", opts)
    }

    /// Replace the table of an `UPDATE` or `TRUNCATE`.
    pub fn table(&mut self, table: &str) -> SplitResult<&mut Self> {
        self.add_table(table, "", "", PartOptions::new())
    }

    pub fn table_with(&mut self, table: &str, opts: PartOptions) -> SplitResult<&mut Self> {
        self.add_table(table, "", "", opts)
    }

    /// Add an `INNER JOIN`. An empty `on` leaves out the condition.
    pub fn inner_join(&mut self, table: &str, on: &str) -> SplitResult<&mut Self> {
        self.add_table(table, "INNER JOIN", on, PartOptions::new())
    }

    pub fn inner_join_with(&mut self, table: &str, on: &str, opts: PartOptions) -> SplitResult<&mut Self> {
        self.add_table(table, "INNER JOIN", on, opts)
    }

    pub fn left_join(&mut self, table: &str, on: &str) -> SplitResult<&mut Self> {
        self.add_table(table, "LEFT JOIN", on, PartOptions::new())
    }

    /// Add a `LEFT JOIN`. Prepending puts the new table first and its
    /// condition after the existing tables.
    pub fn left_join_with(&mut self, table: &str, on: &str, opts: PartOptions) -> SplitResult<&mut Self> {
        self.add_table(table, "LEFT JOIN", on, opts)
    }

    pub fn right_join(&mut self, table: &str, on: &str) -> SplitResult<&mut Self> {
        self.add_table(table, "RIGHT JOIN", on, PartOptions::new())
    }

    pub fn right_join_with(&mut self, table: &str, on: &str, opts: PartOptions) -> SplitResult<&mut Self> {
        self.add_table(table, "RIGHT JOIN", on, opts)
    }

    /// Add a join of any type, e.g. `STRAIGHT_JOIN` or `NATURAL JOIN`.
    pub fn join(&mut self, join: &str, table: &str, on: &str) -> SplitResult<&mut Self> {
        self.add_table(table, join, on, PartOptions::new())
    }

    pub fn join_with(&mut self, join: &str, table: &str, on: &str, opts: PartOptions) -> SplitResult<&mut Self> {
        self.add_table(table, join, on, opts)
    }

    // ==================== Columns ====================

    pub fn column(&mut self, column: &str) -> SplitResult<&mut Self> {
        self.columns_with([column], PartOptions::new())
    }

    pub fn columns<I, S>(&mut self, columns: I) -> SplitResult<&mut Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.columns_with(columns, PartOptions::new())
    }

    /// Add columns or expressions, quoted [`QuoteMode::Smart`] by default.
    pub fn columns_with<I, S>(&mut self, columns: I, opts: PartOptions) -> SplitResult<&mut Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let quote = opts.quote_or(QuoteMode::Smart);
        let columns = columns
            .into_iter()
            .map(|column| self.splitter.quote_identifier(column.as_ref(), quote))
            .collect::<SplitResult<Vec<_>>>()?;
        self.set_part("columns", columns.join(", "), opts.placement_or(Placement::Append))
    }

    /// Add `column AS alias`. The alias is always quoted strictly.
    pub fn column_as(&mut self, column: &str, alias: &str) -> SplitResult<&mut Self> {
        let column = self.splitter.quote_identifier(column, QuoteMode::Smart)?;
        let alias = self.splitter.quote_identifier(alias, QuoteMode::Strict)?;
        self.set_part("columns", format!("{column} AS {alias}"), Placement::Append)
    }

    // ==================== Assignments ====================

    fn is_insert_like(&self) -> bool {
        self.query_type().is_some_and(|t| t.is_insert_like())
    }

    /// Render `column = value`. A column containing `=` is taken as a
    /// complete assignment and the value is ignored.
    fn assignment(&self, column: &str, assign: &Assign, quote: QuoteMode) -> SplitResult<String> {
        if column.contains('=') {
            return self.splitter.quote_identifier(column, quote);
        }

        let empty = if self.is_insert_like() { "DEFAULT" } else { "NULL" };
        let key = self.splitter.quote_identifier(column, QuoteMode::Strict)?;
        let value = match assign {
            Assign::Value(value) => self.splitter.quote_value(value, empty),
            Assign::Expression(expression) => self.splitter.quote_identifier(expression, quote)?,
        };
        Ok(format!("{key} = {value}"))
    }

    /// Add `column = value` to the `SET` part.
    ///
    /// `NULL` is written as `DEFAULT` for inserts.
    pub fn set(&mut self, column: &str, value: impl Into<Value>) -> SplitResult<&mut Self> {
        self.set_with([(column, Assign::Value(value.into()))], PartOptions::new())
    }

    /// Add `column = expression` to the `SET` part.
    pub fn set_expression(&mut self, column: &str, expression: &str) -> SplitResult<&mut Self> {
        self.set_with([(column, Assign::expression(expression))], PartOptions::new())
    }

    /// Add several `column = value` assignments.
    pub fn set_all<I, K, V>(&mut self, values: I) -> SplitResult<&mut Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<Value>,
    {
        let assignments: Vec<(K, Assign)> = values
            .into_iter()
            .map(|(column, value)| (column, Assign::Value(value.into())))
            .collect();
        self.set_with(assignments, PartOptions::new())
    }

    pub fn set_with<I, K>(&mut self, assignments: I, opts: PartOptions) -> SplitResult<&mut Self>
    where
        I: IntoIterator<Item = (K, Assign)>,
        K: AsRef<str>,
    {
        let quote = opts.quote_or(QuoteMode::Smart);
        let rendered = assignments
            .into_iter()
            .map(|(column, assign)| self.assignment(column.as_ref(), &assign, quote))
            .collect::<SplitResult<Vec<_>>>()?;
        self.set_part("set", rendered.join(", "), opts.placement_or(Placement::Append))
    }

    /// Add raw assignments like `abc=12`.
    ///
    /// For an `INSERT` or `REPLACE`, a `SELECT` statement becomes the query
    /// the rows are inserted from.
    pub fn set_raw(&mut self, expression: &str) -> SplitResult<&mut Self> {
        self.set_raw_with(expression, PartOptions::new())
    }

    pub fn set_raw_with(&mut self, expression: &str, opts: PartOptions) -> SplitResult<&mut Self> {
        let placement = opts.placement_or(Placement::Append);

        if self.is_insert_like() && self.splitter.query_type(expression) == Some(QueryType::Select) {
            return self.set_part("query", expression.to_string(), placement);
        }

        let expression = self
            .splitter
            .quote_identifier(expression, opts.quote_or(QuoteMode::Smart))?;
        self.set_part("set", expression, placement)
    }

    // ==================== Values ====================

    /// Add a row to the `VALUES` part.
    pub fn values<I, V>(&mut self, row: I) -> SplitResult<&mut Self>
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.values_rows_with([row], PartOptions::new())
    }

    pub fn values_rows<R, I, V>(&mut self, rows: R) -> SplitResult<&mut Self>
    where
        R: IntoIterator<Item = I>,
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.values_rows_with(rows, PartOptions::new())
    }

    /// Add rows of values. `NULL` is written as `DEFAULT`.
    ///
    /// Replacing writes all rows, each wrapped in parentheses.
    pub fn values_rows_with<R, I, V>(&mut self, rows: R, opts: PartOptions) -> SplitResult<&mut Self>
    where
        R: IntoIterator<Item = I>,
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        let rows: Vec<String> = rows
            .into_iter()
            .map(|row| {
                row.into_iter()
                    .map(|value| self.splitter.quote_value(&value.into(), "DEFAULT"))
                    .collect::<Vec<_>>()
                    .join(", ")
            })
            .collect();
        self.add_rows(rows, opts.placement_or(Placement::Append))
    }

    /// Add a row given as SQL, e.g. `DEFAULT, 'xyz', 12`.
    pub fn values_raw(&mut self, row: &str) -> SplitResult<&mut Self> {
        self.add_rows(vec![row.to_string()], Placement::Append)
    }

    pub fn values_raw_with(&mut self, row: &str, opts: PartOptions) -> SplitResult<&mut Self> {
        self.add_rows(vec![row.to_string()], opts.placement_or(Placement::Append))
    }

    fn add_rows(&mut self, rows: Vec<String>, placement: Placement) -> SplitResult<&mut Self> {
        if placement == Placement::Replace {
            let text = rows
                .iter()
                .map(|row| format!("({row})"))
                .collect::<Vec<_>>()
                .join(", ");
            return self.set_part("values", text, placement);
        }

        self.ensure_part("values")?;
        for row in rows {
            self.set_part("values", row, placement)?;
        }
        Ok(self)
    }

    // ==================== Conditions ====================

    /// Add a condition to the `WHERE` part.
    ///
    /// ```ignore
    /// query.and_where("foo IS NULL")?;           // WHERE `foo` IS NULL
    /// query.where_value("foo > ?", 10)?;         // WHERE `foo` > 10
    /// query.where_value("foo", [10, 20])?;       // WHERE `foo` IN (10, 20)
    /// query.where_value("bar LIKE %?%", "blue")?; // WHERE `bar` LIKE '%blue%'
    /// ```
    pub fn and_where(&mut self, expression: &str) -> SplitResult<&mut Self> {
        self.and_where_with(expression, None, PartOptions::new())
    }

    pub fn where_value(&mut self, expression: &str, value: impl Into<Value>) -> SplitResult<&mut Self> {
        self.and_where_with(expression, Some(value.into()), PartOptions::new())
    }

    /// AND several `column => value` criteria together as one condition.
    pub fn where_all(&mut self, criteria: &[(&str, Option<Value>)]) -> SplitResult<&mut Self> {
        let condition = self.splitter.build_where_all(criteria, QuoteMode::Smart)?;
        self.add_condition("where", condition, Placement::Append)
    }

    /// See [`Splitter::build_where`](crate::Splitter::build_where).
    pub fn and_where_with(&mut self, expression: &str, value: Option<Value>, opts: PartOptions) -> SplitResult<&mut Self> {
        let condition = self
            .splitter
            .build_where(expression, value.as_ref(), opts.quote_or(QuoteMode::Smart))?;
        self.add_condition("where", condition, opts.placement_or(Placement::Append))
    }

    pub fn having(&mut self, expression: &str) -> SplitResult<&mut Self> {
        self.having_with(expression, None, PartOptions::new())
    }

    pub fn having_value(&mut self, expression: &str, value: impl Into<Value>) -> SplitResult<&mut Self> {
        self.having_with(expression, Some(value.into()), PartOptions::new())
    }

    pub fn having_with(&mut self, expression: &str, value: Option<Value>, opts: PartOptions) -> SplitResult<&mut Self> {
        let condition = self
            .splitter
            .build_where(expression, value.as_ref(), opts.quote_or(QuoteMode::Smart))?;
        self.add_condition("having", condition, opts.placement_or(Placement::Append))
    }

    fn add_condition(&mut self, part: &str, condition: String, placement: Placement) -> SplitResult<&mut Self> {
        if condition.is_empty() {
            return Ok(self);
        }
        self.set_part(part, condition, placement)
    }

    // ==================== Grouping and ordering ====================

    pub fn group_by<I, S>(&mut self, columns: I) -> SplitResult<&mut Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.group_by_with(columns, PartOptions::new())
    }

    pub fn group_by_with<I, S>(&mut self, columns: I, opts: PartOptions) -> SplitResult<&mut Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let quote = opts.quote_or(QuoteMode::Smart);
        let columns = columns
            .into_iter()
            .map(|column| self.splitter.quote_identifier(column.as_ref(), quote))
            .collect::<SplitResult<Vec<_>>>()?;
        self.set_part("group by", columns.join(", "), opts.placement_or(Placement::Append))
    }

    /// Order by columns, ahead of any existing ordering.
    pub fn order_by<I, S>(&mut self, columns: I, order: SortOrder) -> SplitResult<&mut Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.order_by_with(columns, order, PartOptions::new())
    }

    pub fn order_by_with<I, S>(&mut self, columns: I, order: SortOrder, opts: PartOptions) -> SplitResult<&mut Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let quote = opts.quote_or(QuoteMode::Smart);
        let columns = columns
            .into_iter()
            .map(|column| {
                let column = self.splitter.quote_identifier(column.as_ref(), quote)?;
                Ok(format!("{column}{}", order.suffix()))
            })
            .collect::<SplitResult<Vec<_>>>()?;
        self.set_part("order by", columns.join(", "), opts.placement_or(Placement::Prepend))
    }

    // ==================== Limit ====================

    pub fn limit(&mut self, rowcount: u64) -> SplitResult<&mut Self> {
        self.limit_offset(rowcount, 0)
    }

    /// Replace the `LIMIT` part with `rowcount OFFSET offset`.
    pub fn limit_offset(&mut self, rowcount: u64, offset: u64) -> SplitResult<&mut Self> {
        let limit = if offset == 0 {
            rowcount.to_string()
        } else {
            format!("{rowcount} OFFSET {offset}")
        };
        self.set_part("limit", limit, Placement::Replace)
    }

    /// Replace the `LIMIT` part with text like `50 OFFSET 30`.
    pub fn limit_raw(&mut self, limit: &str) -> SplitResult<&mut Self> {
        self.set_part("limit", limit.trim().to_string(), Placement::Replace)
    }

    /// Limit to page `page` (from 1) of `rowcount` rows.
    ///
    /// Without a row count, the row count of the current `LIMIT` is used.
    /// An explicit row count of 0 limits to no rows on any page.
    pub fn page(&mut self, page: u64, rowcount: Option<u64>) -> SplitResult<&mut Self> {
        let rowcount = match rowcount {
            Some(0) => return self.limit_offset(0, 0),
            Some(rowcount) => rowcount,
            None => match self.current_rowcount()? {
                0 => {
                    return Err(SplitError::build(
                        "Unable to set limit offset: rowcount couldn't be determined",
                    ));
                }
                rowcount => rowcount,
            },
        };
        let offset = rowcount.checked_mul(page.saturating_sub(1)).ok_or_else(|| {
            SplitError::build(format!(
                "Unable to set limit offset: page {page} of {rowcount} rows is out of range"
            ))
        })?;
        self.limit_offset(rowcount, offset)
    }

    /// The leading number of the `LIMIT` part, after the comma of the
    /// `offset, rowcount` form. 0 when there is none.
    fn current_rowcount(&self) -> SplitResult<u64> {
        let parts = self.parts()?;
        let limit = parts.text("limit");
        let tail = limit.split_once(',').map_or(limit, |(_, rows)| rows).trim();
        let digits = tail.bytes().take_while(u8::is_ascii_digit).count();
        Ok(tail[..digits].parse().unwrap_or(0))
    }

    // ==================== Upsert ====================

    /// Update every inserted column on a duplicate key:
    /// `` `c` = VALUES(`c`) `` for each column of the `INSERT`.
    ///
    /// Does nothing when the statement already updates something on a
    /// duplicate key.
    pub fn on_duplicate_key_update(&mut self) -> SplitResult<&mut Self> {
        self.ensure_part("on duplicate key update")?;
        let pending = self
            .additions
            .get("on duplicate key update")
            .is_some_and(|addition| addition.append.iter().any(|f| f == AUTO_UPDATE_MARKER));
        if pending || !self.parts()?.text("on duplicate key update").is_empty() {
            return Ok(self);
        }
        self.set_part(
            "on duplicate key update",
            AUTO_UPDATE_MARKER.to_string(),
            Placement::Append,
        )
    }

    /// Update the given columns with the values that would have been
    /// inserted.
    pub fn on_duplicate_key_update_columns<I, S>(&mut self, columns: I) -> SplitResult<&mut Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let assignments = columns
            .into_iter()
            .map(|column| {
                let column = self
                    .splitter
                    .quote_identifier(column.as_ref(), QuoteMode::Strict)?;
                Ok(format!("{column} = VALUES({column})"))
            })
            .collect::<SplitResult<Vec<_>>>()?;
        self.set_part("on duplicate key update", assignments.join(", "), Placement::Append)
    }

    /// Update columns with values or expressions on a duplicate key.
    pub fn on_duplicate_key_update_set<I, K>(&mut self, assignments: I, opts: PartOptions) -> SplitResult<&mut Self>
    where
        I: IntoIterator<Item = (K, Assign)>,
        K: AsRef<str>,
    {
        let quote = opts.quote_or(QuoteMode::Smart);
        let rendered = assignments
            .into_iter()
            .map(|(column, assign)| {
                let key = self
                    .splitter
                    .quote_identifier(column.as_ref(), QuoteMode::Strict)?;
                let value = match &assign {
                    Assign::Value(value) => self.splitter.quote_value(value, "DEFAULT"),
                    Assign::Expression(expression) => self.splitter.quote_identifier(expression, quote)?,
                };
                Ok(format!("{key} = {value}"))
            })
            .collect::<SplitResult<Vec<_>>>()?;
        self.set_part(
            "on duplicate key update",
            rendered.join(", "),
            opts.placement_or(Placement::Append),
        )
    }

    // ==================== Options ====================

    pub fn options(&mut self, options: &str) -> SplitResult<&mut Self> {
        self.options_with(options, PartOptions::new())
    }

    pub fn options_with(&mut self, options: &str, opts: PartOptions) -> SplitResult<&mut Self> {
        self.set_part("options", options.trim().to_string(), opts.placement_or(Placement::Append))
    }
}
