//! The external predicate vocabulary.

use distkv_codec::FieldValue;
use serde::{Deserialize, Serialize};

/// Kind of a predicate operation, with its stable numeric code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(i32)]
pub enum OperationKind {
    /// `field = value`
    EqualTo = 0,
    /// `field != value`
    NotEqualTo = 1,
    /// `field > value`
    GreaterThan = 2,
    /// `field < value`
    LessThan = 3,
    /// `field >= value`
    GreaterThanOrEqualTo = 4,
    /// `field <= value`
    LessThanOrEqualTo = 5,
    /// Conjunction marker.
    And = 6,
    /// Disjunction marker.
    Or = 7,
    /// `field IS NULL`
    IsNull = 8,
    /// `field IS NOT NULL`
    IsNotNull = 9,
    /// `field IN (...)`
    In = 10,
    /// `field NOT IN (...)`
    NotIn = 11,
    /// `field LIKE pattern`
    Like = 12,
    /// `field NOT LIKE pattern`
    Unlike = 13,
    /// Ascending ordering on `field`.
    OrderByAsc = 14,
    /// Descending ordering on `field`.
    OrderByDesc = 15,
    /// Result window `(count, offset)`.
    Limit = 16,
    /// Explicit key set.
    InKeys = 17,
    /// Key prefix.
    KeyPrefix = 18,
}

impl OperationKind {
    /// Number of assigned operation codes.
    pub const COUNT: usize = 19;

    /// Returns the numeric code.
    #[must_use]
    pub const fn code(self) -> i32 {
        self as i32
    }

    /// Looks up a kind by numeric code.
    #[must_use]
    pub const fn from_code(code: i32) -> Option<Self> {
        Some(match code {
            0 => Self::EqualTo,
            1 => Self::NotEqualTo,
            2 => Self::GreaterThan,
            3 => Self::LessThan,
            4 => Self::GreaterThanOrEqualTo,
            5 => Self::LessThanOrEqualTo,
            6 => Self::And,
            7 => Self::Or,
            8 => Self::IsNull,
            9 => Self::IsNotNull,
            10 => Self::In,
            11 => Self::NotIn,
            12 => Self::Like,
            13 => Self::Unlike,
            14 => Self::OrderByAsc,
            15 => Self::OrderByDesc,
            16 => Self::Limit,
            17 => Self::InKeys,
            18 => Self::KeyPrefix,
            _ => return None,
        })
    }
}

/// One operand of an operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operand {
    /// A single typed value.
    Scalar(FieldValue),
    /// A list of typed values.
    List(Vec<FieldValue>),
}

impl From<FieldValue> for Operand {
    fn from(value: FieldValue) -> Self {
        Self::Scalar(value)
    }
}

impl From<Vec<FieldValue>> for Operand {
    fn from(values: Vec<FieldValue>) -> Self {
        Self::List(values)
    }
}

/// One unit of the predicate language.
///
/// The kind is kept as a raw code so that operations from newer peers can
/// still be represented and rejected at translation time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Operation {
    /// Numeric operation code, see [`OperationKind`].
    pub code: i32,
    /// Field the operation applies to, empty for markers and key filters.
    #[serde(default)]
    pub field: String,
    /// Operands.
    #[serde(default)]
    pub operands: Vec<Operand>,
}

impl Operation {
    /// Creates an operation of a known kind.
    pub fn new(kind: OperationKind, field: impl Into<String>, operands: Vec<Operand>) -> Self {
        Self::with_code(kind.code(), field, operands)
    }

    /// Creates an operation from a raw code.
    pub fn with_code(code: i32, field: impl Into<String>, operands: Vec<Operand>) -> Self {
        Self {
            code,
            field: field.into(),
            operands,
        }
    }

    /// Creates a scalar comparison.
    pub fn compare(kind: OperationKind, field: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        Self::new(kind, field, vec![Operand::Scalar(value.into())])
    }

    /// Creates `field = value`.
    pub fn equal_to(field: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        Self::compare(OperationKind::EqualTo, field, value)
    }

    /// Creates `field IN (values)`.
    pub fn in_values(field: impl Into<String>, values: Vec<FieldValue>) -> Self {
        Self::new(OperationKind::In, field, vec![Operand::List(values)])
    }

    /// Creates `field LIKE pattern`.
    pub fn like(field: impl Into<String>, pattern: impl Into<String>) -> Self {
        Self::compare(OperationKind::Like, field, FieldValue::Text(pattern.into()))
    }

    /// Creates a null test.
    pub fn is_null(field: impl Into<String>) -> Self {
        Self::new(OperationKind::IsNull, field, Vec::new())
    }

    /// Creates an `AND` marker.
    #[must_use]
    pub fn and() -> Self {
        Self::new(OperationKind::And, "", Vec::new())
    }

    /// Creates an `OR` marker.
    #[must_use]
    pub fn or() -> Self {
        Self::new(OperationKind::Or, "", Vec::new())
    }

    /// Creates an ordering clause.
    pub fn order_by(field: impl Into<String>, descending: bool) -> Self {
        let kind = if descending {
            OperationKind::OrderByDesc
        } else {
            OperationKind::OrderByAsc
        };
        Self::new(kind, field, Vec::new())
    }

    /// Creates a result window.
    #[must_use]
    pub fn limit(count: i64, offset: i64) -> Self {
        Self::new(
            OperationKind::Limit,
            "",
            vec![
                Operand::Scalar(FieldValue::Integer(count)),
                Operand::Scalar(FieldValue::Integer(offset)),
            ],
        )
    }

    /// Creates a key prefix filter.
    pub fn key_prefix(prefix: impl Into<Vec<u8>>) -> Self {
        Self::new(
            OperationKind::KeyPrefix,
            "",
            vec![Operand::Scalar(FieldValue::Bytes(prefix.into()))],
        )
    }

    /// Creates an explicit key set filter.
    #[must_use]
    pub fn in_keys(keys: Vec<Vec<u8>>) -> Self {
        let keys = keys.into_iter().map(FieldValue::Bytes).collect();
        Self::new(OperationKind::InKeys, "", vec![Operand::List(keys)])
    }

    /// Returns the kind, or `None` for an unassigned code.
    #[must_use]
    pub const fn kind(&self) -> Option<OperationKind> {
        OperationKind::from_code(self.code)
    }

    /// All operand values, with lists flattened in order.
    pub fn values(&self) -> impl Iterator<Item = &FieldValue> {
        self.operands.iter().flat_map(|operand| match operand {
            Operand::Scalar(v) => std::slice::from_ref(v).iter(),
            Operand::List(vs) => vs.iter(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_codes() {
        for code in 0..OperationKind::COUNT as i32 {
            assert_eq!(OperationKind::from_code(code).unwrap().code(), code);
        }
        assert_eq!(OperationKind::from_code(19), None);
        assert_eq!(OperationKind::from_code(-1), None);
        assert_eq!(OperationKind::InKeys.code(), 17);
        assert_eq!(OperationKind::KeyPrefix.code(), 18);
    }

    #[test]
    fn values_flatten_lists() {
        let op = Operation::new(
            OperationKind::In,
            "x",
            vec![
                Operand::Scalar(1i64.into()),
                Operand::List(vec![2i64.into(), 3i64.into()]),
            ],
        );
        let values: Vec<i64> = op.values().filter_map(FieldValue::as_integer).collect();
        assert_eq!(values, vec![1, 2, 3]);
    }

    #[test]
    fn json_shape() {
        let op: Operation =
            serde_json::from_str(r#"{"code": 0, "field": "age", "operands": [{"scalar": {"Integer": 3}}]}"#)
                .unwrap();
        assert_eq!(op, Operation::equal_to("age", 3i64));

        let marker: Operation = serde_json::from_str(r#"{"code": 6}"#).unwrap();
        assert_eq!(marker.kind(), Some(OperationKind::And));
    }
}
