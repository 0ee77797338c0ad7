//! Condition evaluation against field records.

use crate::query::{CompareOp, Condition, KeyFilter, QueryNode};
use distkv_codec::{FieldRecord, FieldValue};
use std::cmp::Ordering;

static NULL: FieldValue = FieldValue::Null;

/// Evaluates a condition list with `AND` binding tighter than `OR`.
///
/// Conditions without a marker between them are conjoined. An empty list
/// matches everything.
pub(crate) fn matches_nodes(nodes: &[QueryNode], fields: &FieldRecord) -> bool {
    let mut any_group = false;
    let mut group: Option<bool> = None;

    for node in nodes {
        match node {
            QueryNode::Condition(c) => {
                let hit = matches_condition(c, fields);
                group = Some(group.map_or(hit, |g| g && hit));
            }
            QueryNode::Or => {
                if let Some(g) = group.take() {
                    if g {
                        return true;
                    }
                    any_group = true;
                }
            }
            QueryNode::And => {}
        }
    }

    match group {
        Some(g) => g,
        None => !any_group,
    }
}

/// Applies a key filter.
pub(crate) fn matches_key(filter: Option<&KeyFilter>, key: &[u8]) -> bool {
    match filter {
        None => true,
        Some(KeyFilter::Prefix(prefix)) => key.starts_with(prefix),
        Some(KeyFilter::Keys(keys)) => keys.iter().any(|k| k.as_slice() == key),
    }
}

/// Evaluates one condition with SQL null semantics: comparisons against a
/// missing or null field are false.
pub(crate) fn matches_condition(condition: &Condition, fields: &FieldRecord) -> bool {
    let value = fields.get(condition.field()).unwrap_or(&NULL);

    match condition {
        Condition::Compare { op, value: rhs, .. } => {
            let Some(ord) = value.partial_cmp_value(rhs) else {
                return false;
            };
            match op {
                CompareOp::Equal => ord == Ordering::Equal,
                CompareOp::NotEqual => ord != Ordering::Equal,
                CompareOp::Greater => ord == Ordering::Greater,
                CompareOp::Less => ord == Ordering::Less,
                CompareOp::GreaterOrEqual => ord != Ordering::Less,
                CompareOp::LessOrEqual => ord != Ordering::Greater,
            }
        }
        Condition::InSet {
            values, negated, ..
        } => {
            if value.is_null() {
                return false;
            }
            let found = values
                .iter()
                .any(|v| value.partial_cmp_value(v) == Some(Ordering::Equal));
            found != *negated
        }
        Condition::Like {
            pattern, negated, ..
        } => match value.as_text() {
            Some(text) => like_match(pattern, text) != *negated,
            None => false,
        },
        Condition::IsNull { negated, .. } => value.is_null() != *negated,
    }
}

/// SQL `LIKE`: `%` matches any run, `_` matches one character, ASCII letters
/// compare case-insensitively.
pub(crate) fn like_match(pattern: &str, text: &str) -> bool {
    let p: Vec<char> = pattern.chars().collect();
    let t: Vec<char> = text.chars().collect();

    let (mut pi, mut ti) = (0usize, 0usize);
    let mut star: Option<usize> = None;
    let mut star_text = 0usize;

    while ti < t.len() {
        if pi < p.len() && (p[pi] == '_' || p[pi].eq_ignore_ascii_case(&t[ti])) {
            pi += 1;
            ti += 1;
        } else if pi < p.len() && p[pi] == '%' {
            star = Some(pi);
            star_text = ti;
            pi += 1;
        } else if let Some(s) = star {
            pi = s + 1;
            star_text += 1;
            ti = star_text;
        } else {
            return false;
        }
    }

    p[pi..].iter().all(|&c| c == '%')
}

/// Orders two records by the given clauses. Nulls sort first.
pub(crate) fn compare_records(
    order: &[crate::query::OrderBy],
    a: &FieldRecord,
    b: &FieldRecord,
) -> Ordering {
    for clause in order {
        let av = a.get(&clause.field).unwrap_or(&NULL);
        let bv = b.get(&clause.field).unwrap_or(&NULL);
        let ord = match (av.is_null(), bv.is_null()) {
            (true, true) => Ordering::Equal,
            (true, false) => Ordering::Less,
            (false, true) => Ordering::Greater,
            (false, false) => av.partial_cmp_value(bv).unwrap_or(Ordering::Equal),
        };
        let ord = if clause.descending { ord.reverse() } else { ord };
        if ord != Ordering::Equal {
            return ord;
        }
    }
    Ordering::Equal
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::Query;

    fn person(age: i64, name: &str) -> FieldRecord {
        let mut rec = FieldRecord::new();
        rec.insert("age".into(), FieldValue::Integer(age));
        rec.insert("name".into(), FieldValue::Text(name.into()));
        rec
    }

    #[test]
    fn like_patterns() {
        assert!(like_match("A%", "alice"));
        assert!(like_match("%ic%", "Alice"));
        assert!(like_match("b_b", "Bob"));
        assert!(!like_match("b_b", "Bobby"));
        assert!(like_match("%", ""));
        assert!(!like_match("_", ""));
        assert!(like_match("a%b%c", "aXXbYYc"));
    }

    #[test]
    fn and_binds_tighter_than_or() {
        // age = 1 OR age = 30 AND name = 'bob'
        let mut query = Query::new();
        query
            .equal_to("age", 1i64)
            .or()
            .equal_to("age", 30i64)
            .and()
            .equal_to("name", "bob");

        assert!(matches_nodes(query.nodes(), &person(1, "x")));
        assert!(matches_nodes(query.nodes(), &person(30, "bob")));
        assert!(!matches_nodes(query.nodes(), &person(30, "alice")));
    }

    #[test]
    fn implicit_and() {
        let mut query = Query::new();
        query.greater_than("age", 10i64).like("name", "a%");
        assert!(matches_nodes(query.nodes(), &person(11, "amy")));
        assert!(!matches_nodes(query.nodes(), &person(9, "amy")));
    }

    #[test]
    fn null_semantics() {
        let rec = person(5, "x");
        let mut query = Query::new();
        query.equal_to("missing", 1i64);
        assert!(!matches_nodes(query.nodes(), &rec));

        let mut query = Query::new();
        query.is_null("missing");
        assert!(matches_nodes(query.nodes(), &rec));

        let mut query = Query::new();
        query.not_in_values("missing", vec![FieldValue::Integer(1)]);
        assert!(!matches_nodes(query.nodes(), &rec));
    }

    #[test]
    fn empty_and_dangling_markers() {
        let rec = person(5, "x");
        assert!(matches_nodes(&[], &rec));
        assert!(matches_nodes(&[QueryNode::Or], &rec));

        let mut query = Query::new();
        query.equal_to("age", 6i64).or();
        assert!(!matches_nodes(query.nodes(), &rec));
    }

    proptest::proptest! {
        #[test]
        fn percent_matches_anything(text in ".*") {
            proptest::prop_assert!(like_match("%", &text));
            let pattern = format!("%{text}%");
            proptest::prop_assert!(like_match(&pattern, &text));
        }

        #[test]
        fn literal_pattern_matches_itself(text in "[a-zA-Z0-9 ]{0,24}") {
            proptest::prop_assert!(like_match(&text, &text.to_ascii_uppercase()));
        }
    }

    #[test]
    fn key_filters() {
        assert!(matches_key(None, b"abc"));
        assert!(matches_key(Some(&KeyFilter::Prefix(b"ab".to_vec())), b"abc"));
        assert!(!matches_key(Some(&KeyFilter::Prefix(b"b".to_vec())), b"abc"));
        let keys = KeyFilter::Keys(vec![b"x".to_vec(), b"abc".to_vec()]);
        assert!(matches_key(Some(&keys), b"abc"));
        assert!(!matches_key(Some(&keys), b"ab"));
    }
}
