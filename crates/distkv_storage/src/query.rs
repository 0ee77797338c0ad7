//! Structured query model consumed by storage engines.
//!
//! A [`Query`] is an ordered list of conditions and combinator markers plus
//! optional key filter, ordering and result window. Adjacent conditions with
//! no marker between them are conjoined; `AND` binds tighter than `OR`.

use distkv_codec::FieldValue;
use serde::{Deserialize, Serialize};
use std::fmt::{self, Write as _};

/// Scalar comparison operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CompareOp {
    /// `=`
    Equal,
    /// `!=`
    NotEqual,
    /// `>`
    Greater,
    /// `<`
    Less,
    /// `>=`
    GreaterOrEqual,
    /// `<=`
    LessOrEqual,
}

impl CompareOp {
    /// SQL spelling of the operator.
    #[must_use]
    pub const fn symbol(self) -> &'static str {
        match self {
            Self::Equal => "=",
            Self::NotEqual => "!=",
            Self::Greater => ">",
            Self::Less => "<",
            Self::GreaterOrEqual => ">=",
            Self::LessOrEqual => "<=",
        }
    }
}

/// A single condition on a named field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Condition {
    /// Scalar comparison.
    Compare {
        /// Field name.
        field: String,
        /// Operator.
        op: CompareOp,
        /// Right-hand operand.
        value: FieldValue,
    },
    /// Set membership (`IN` / `NOT IN`).
    InSet {
        /// Field name.
        field: String,
        /// Candidate values.
        values: Vec<FieldValue>,
        /// True for `NOT IN`.
        negated: bool,
    },
    /// Pattern match (`LIKE` / `NOT LIKE`).
    Like {
        /// Field name.
        field: String,
        /// Pattern with `%` and `_` wildcards.
        pattern: String,
        /// True for `NOT LIKE`.
        negated: bool,
    },
    /// Null test.
    IsNull {
        /// Field name.
        field: String,
        /// True for `IS NOT NULL`.
        negated: bool,
    },
}

impl Condition {
    /// Returns the field this condition applies to.
    #[must_use]
    pub fn field(&self) -> &str {
        match self {
            Self::Compare { field, .. }
            | Self::InSet { field, .. }
            | Self::Like { field, .. }
            | Self::IsNull { field, .. } => field,
        }
    }
}

/// One element of a query's condition list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum QueryNode {
    /// A condition.
    Condition(Condition),
    /// `AND` marker between neighbouring conditions.
    And,
    /// `OR` marker between neighbouring conditions.
    Or,
}

/// Filter applied directly to entry keys.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum KeyFilter {
    /// Keys starting with the prefix.
    Prefix(Vec<u8>),
    /// Keys contained in the set.
    Keys(Vec<Vec<u8>>),
}

/// An ordering clause.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderBy {
    /// Field to order by.
    pub field: String,
    /// True for descending order.
    pub descending: bool,
}

/// Result window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Limit {
    /// Maximum number of rows.
    pub count: usize,
    /// Number of rows to skip first.
    pub offset: usize,
}

/// A structured query.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Query {
    table: Option<String>,
    nodes: Vec<QueryNode>,
    key_filter: Option<KeyFilter>,
    order: Vec<OrderBy>,
    limit: Option<Limit>,
}

impl Query {
    /// Creates an empty query matching every row.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Scopes the query to a relational table.
    pub fn from_table(&mut self, table: impl Into<String>) -> &mut Self {
        self.table = Some(table.into());
        self
    }

    fn push(&mut self, condition: Condition) -> &mut Self {
        self.nodes.push(QueryNode::Condition(condition));
        self
    }

    /// Appends a scalar comparison.
    pub fn compare(&mut self, field: impl Into<String>, op: CompareOp, value: FieldValue) -> &mut Self {
        self.push(Condition::Compare {
            field: field.into(),
            op,
            value,
        })
    }

    /// Appends `field = value`.
    pub fn equal_to(&mut self, field: impl Into<String>, value: impl Into<FieldValue>) -> &mut Self {
        self.compare(field, CompareOp::Equal, value.into())
    }

    /// Appends `field != value`.
    pub fn not_equal_to(&mut self, field: impl Into<String>, value: impl Into<FieldValue>) -> &mut Self {
        self.compare(field, CompareOp::NotEqual, value.into())
    }

    /// Appends `field > value`.
    pub fn greater_than(&mut self, field: impl Into<String>, value: impl Into<FieldValue>) -> &mut Self {
        self.compare(field, CompareOp::Greater, value.into())
    }

    /// Appends `field < value`.
    pub fn less_than(&mut self, field: impl Into<String>, value: impl Into<FieldValue>) -> &mut Self {
        self.compare(field, CompareOp::Less, value.into())
    }

    /// Appends a set membership test.
    pub fn in_values(&mut self, field: impl Into<String>, values: Vec<FieldValue>) -> &mut Self {
        self.push(Condition::InSet {
            field: field.into(),
            values,
            negated: false,
        })
    }

    /// Appends a negated set membership test.
    pub fn not_in_values(&mut self, field: impl Into<String>, values: Vec<FieldValue>) -> &mut Self {
        self.push(Condition::InSet {
            field: field.into(),
            values,
            negated: true,
        })
    }

    /// Appends a `LIKE` pattern match.
    pub fn like(&mut self, field: impl Into<String>, pattern: impl Into<String>) -> &mut Self {
        self.push(Condition::Like {
            field: field.into(),
            pattern: pattern.into(),
            negated: false,
        })
    }

    /// Appends a `NOT LIKE` pattern match.
    pub fn unlike(&mut self, field: impl Into<String>, pattern: impl Into<String>) -> &mut Self {
        self.push(Condition::Like {
            field: field.into(),
            pattern: pattern.into(),
            negated: true,
        })
    }

    /// Appends an `IS NULL` test.
    pub fn is_null(&mut self, field: impl Into<String>) -> &mut Self {
        self.push(Condition::IsNull {
            field: field.into(),
            negated: false,
        })
    }

    /// Appends an `IS NOT NULL` test.
    pub fn is_not_null(&mut self, field: impl Into<String>) -> &mut Self {
        self.push(Condition::IsNull {
            field: field.into(),
            negated: true,
        })
    }

    /// Appends an `AND` marker.
    pub fn and(&mut self) -> &mut Self {
        self.nodes.push(QueryNode::And);
        self
    }

    /// Appends an `OR` marker.
    pub fn or(&mut self) -> &mut Self {
        self.nodes.push(QueryNode::Or);
        self
    }

    /// Appends an ascending ordering clause.
    pub fn order_by_asc(&mut self, field: impl Into<String>) -> &mut Self {
        self.order.push(OrderBy {
            field: field.into(),
            descending: false,
        });
        self
    }

    /// Appends a descending ordering clause.
    pub fn order_by_desc(&mut self, field: impl Into<String>) -> &mut Self {
        self.order.push(OrderBy {
            field: field.into(),
            descending: true,
        });
        self
    }

    /// Sets the result window, replacing any previous one.
    pub fn limit(&mut self, count: usize, offset: usize) -> &mut Self {
        self.limit = Some(Limit { count, offset });
        self
    }

    /// Restricts results to keys with the given prefix.
    pub fn key_prefix(&mut self, prefix: impl Into<Vec<u8>>) -> &mut Self {
        self.key_filter = Some(KeyFilter::Prefix(prefix.into()));
        self
    }

    /// Restricts results to the given keys.
    pub fn in_keys(&mut self, keys: Vec<Vec<u8>>) -> &mut Self {
        self.key_filter = Some(KeyFilter::Keys(keys));
        self
    }

    /// Relational table this query is scoped to, if any.
    #[must_use]
    pub fn table_name(&self) -> Option<&str> {
        self.table.as_deref()
    }

    /// Conditions and combinator markers in insertion order.
    #[must_use]
    pub fn nodes(&self) -> &[QueryNode] {
        &self.nodes
    }

    /// Conditions only, in insertion order.
    pub fn conditions(&self) -> impl Iterator<Item = &Condition> {
        self.nodes.iter().filter_map(|node| match node {
            QueryNode::Condition(c) => Some(c),
            _ => None,
        })
    }

    /// Key filter, if any.
    #[must_use]
    pub fn key_filter(&self) -> Option<&KeyFilter> {
        self.key_filter.as_ref()
    }

    /// Ordering clauses in insertion order.
    #[must_use]
    pub fn order(&self) -> &[OrderBy] {
        &self.order
    }

    /// Result window, if any.
    #[must_use]
    pub fn result_limit(&self) -> Option<Limit> {
        self.limit
    }

    /// Returns true if the query filters, orders or limits nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
            && self.key_filter.is_none()
            && self.order.is_empty()
            && self.limit.is_none()
    }

    /// Renders the condition list as a SQL `WHERE` body.
    ///
    /// Returns an empty string when there are no conditions.
    #[must_use]
    pub fn where_clause(&self) -> String {
        let mut out = String::new();
        let mut need_combinator = false;
        for node in &self.nodes {
            match node {
                QueryNode::And => {
                    out.push_str(" AND ");
                    need_combinator = false;
                }
                QueryNode::Or => {
                    out.push_str(" OR ");
                    need_combinator = false;
                }
                QueryNode::Condition(c) => {
                    if need_combinator {
                        out.push_str(" AND ");
                    }
                    write_condition(&mut out, c);
                    need_combinator = true;
                }
            }
        }
        out.trim().to_string()
    }
}

impl Query {
    /// Renders the filtering part of the query: the condition list and the
    /// key filter, joined with `AND`.
    ///
    /// Ordering and limit are not included. Returns an empty string when
    /// nothing filters.
    #[must_use]
    pub fn filter_clause(&self) -> String {
        let mut clauses = Vec::new();
        let conditions = self.where_clause();
        if !conditions.is_empty() {
            clauses.push(format!("({conditions})"));
        }
        match &self.key_filter {
            Some(KeyFilter::Prefix(p)) => clauses.push(key_prefix_clause(p)),
            Some(KeyFilter::Keys(keys)) => {
                let list: Vec<String> = keys.iter().map(|k| key_literal(k)).collect();
                clauses.push(format!("key IN ({})", list.join(", ")));
            }
            None => {}
        }
        clauses.join(" AND ")
    }
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SELECT * FROM ")?;
        f.write_str(self.table.as_deref().unwrap_or("kv"))?;

        let filter = self.filter_clause();
        if !filter.is_empty() {
            write!(f, " WHERE {filter}")?;
        }

        if !self.order.is_empty() {
            let order: Vec<String> = self
                .order
                .iter()
                .map(|o| format!("{} {}", o.field, if o.descending { "DESC" } else { "ASC" }))
                .collect();
            write!(f, " ORDER BY {}", order.join(", "))?;
        }
        if let Some(limit) = self.limit {
            write!(f, " LIMIT {} OFFSET {}", limit.count, limit.offset)?;
        }
        Ok(())
    }
}

fn write_condition(out: &mut String, condition: &Condition) {
    // Writing to a String cannot fail.
    let _ = match condition {
        Condition::Compare { field, op, value } => {
            write!(out, "{field} {} {}", op.symbol(), literal(value))
        }
        Condition::InSet {
            field,
            values,
            negated,
        } => {
            let list: Vec<String> = values.iter().map(literal).collect();
            let op = if *negated { "NOT IN" } else { "IN" };
            write!(out, "{field} {op} ({})", list.join(", "))
        }
        Condition::Like {
            field,
            pattern,
            negated,
        } => {
            let op = if *negated { "NOT LIKE" } else { "LIKE" };
            write!(out, "{field} {op} '{}'", pattern.replace('\'', "''"))
        }
        Condition::IsNull { field, negated } => {
            let op = if *negated { "IS NOT NULL" } else { "IS NULL" };
            write!(out, "{field} {op}")
        }
    };
}

/// Quotes a key as text when it is valid UTF-8, otherwise as a blob.
fn key_literal(key: &[u8]) -> String {
    match std::str::from_utf8(key) {
        Ok(text) => format!("'{}'", text.replace('\'', "''")),
        Err(_) => hex_literal(key),
    }
}

fn key_prefix_clause(prefix: &[u8]) -> String {
    match std::str::from_utf8(prefix) {
        Ok(text) => {
            let mut pattern = String::with_capacity(text.len() + 1);
            for c in text.chars() {
                match c {
                    '%' | '_' | '\\' => {
                        pattern.push('\\');
                        pattern.push(c);
                    }
                    '\'' => pattern.push_str("''"),
                    _ => pattern.push(c),
                }
            }
            format!("key LIKE '{pattern}%' ESCAPE '\\'")
        }
        Err(_) => format!("substr(key, 1, {}) = {}", prefix.len(), hex_literal(prefix)),
    }
}

fn hex_literal(bytes: &[u8]) -> String {
    let hex: String = bytes.iter().map(|byte| format!("{byte:02X}")).collect();
    format!("X'{hex}'")
}

fn literal(value: &FieldValue) -> String {
    match value {
        FieldValue::Null => "NULL".to_string(),
        FieldValue::Bytes(b) => hex_literal(b),
        FieldValue::Integer(n) => n.to_string(),
        FieldValue::Double(d) => d.to_string(),
        FieldValue::Bool(b) => u8::from(*b).to_string(),
        FieldValue::Text(s) => format!("'{}'", s.replace('\'', "''")),
    }
}
