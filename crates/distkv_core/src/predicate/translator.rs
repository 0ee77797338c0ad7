//! Predicate to [`Query`] translation.
//!
//! Each operation code indexes a handler table. Lookups are bounds-checked,
//! so an unassigned code is an ordinary [`CoreError::NotSupported`].

use super::operation::{Operation, OperationKind};
use crate::error::{CoreError, CoreResult};
use distkv_codec::FieldValue;
use distkv_storage::{CompareOp, Query};

type Handler = fn(&Operation, &mut Query) -> CoreResult<()>;

/// Handlers in operation code order.
const HANDLERS: [Handler; OperationKind::COUNT] = [
    |op, q| compare(op, q, CompareOp::Equal),
    |op, q| compare(op, q, CompareOp::NotEqual),
    |op, q| compare(op, q, CompareOp::Greater),
    |op, q| compare(op, q, CompareOp::Less),
    |op, q| compare(op, q, CompareOp::GreaterOrEqual),
    |op, q| compare(op, q, CompareOp::LessOrEqual),
    |_, q| {
        q.and();
        Ok(())
    },
    |_, q| {
        q.or();
        Ok(())
    },
    |op, q| {
        q.is_null(op.field.as_str());
        Ok(())
    },
    |op, q| {
        q.is_not_null(op.field.as_str());
        Ok(())
    },
    |op, q| {
        q.in_values(op.field.as_str(), op.values().cloned().collect());
        Ok(())
    },
    |op, q| {
        q.not_in_values(op.field.as_str(), op.values().cloned().collect());
        Ok(())
    },
    |op, q| {
        q.like(op.field.as_str(), pattern(op)?);
        Ok(())
    },
    |op, q| {
        q.unlike(op.field.as_str(), pattern(op)?);
        Ok(())
    },
    |op, q| {
        q.order_by_asc(op.field.as_str());
        Ok(())
    },
    |op, q| {
        q.order_by_desc(op.field.as_str());
        Ok(())
    },
    limit,
    |op, q| {
        q.in_keys(keys(op)?);
        Ok(())
    },
    key_prefix,
];

fn handler(code: i32) -> CoreResult<Handler> {
    usize::try_from(code)
        .ok()
        .and_then(|index| HANDLERS.get(index))
        .copied()
        .ok_or_else(|| {
            tracing::error!(code, "unsupported predicate operation");
            CoreError::not_supported(code)
        })
}

fn compare(op: &Operation, query: &mut Query, cmp: CompareOp) -> CoreResult<()> {
    let mut values = op.values();
    match (values.next(), values.next()) {
        (Some(value), None) => {
            query.compare(op.field.as_str(), cmp, value.clone());
            Ok(())
        }
        _ => Err(CoreError::invalid_args(format!(
            "{} {} expects exactly one operand",
            op.field,
            cmp.symbol()
        ))),
    }
}

fn pattern(op: &Operation) -> CoreResult<String> {
    op.values()
        .next()
        .and_then(FieldValue::as_text)
        .map(str::to_string)
        .ok_or_else(|| CoreError::invalid_args(format!("pattern for {} must be a string", op.field)))
}

fn limit(op: &Operation, query: &mut Query) -> CoreResult<()> {
    let bounds: Vec<usize> = op
        .values()
        .map(|v| v.as_integer().and_then(|n| usize::try_from(n).ok()))
        .collect::<Option<_>>()
        .ok_or_else(|| CoreError::invalid_args("limit operands must be non-negative integers"))?;

    match bounds.as_slice() {
        [count, offset] => {
            query.limit(*count, *offset);
            Ok(())
        }
        _ => Err(CoreError::invalid_args("limit expects a count and an offset")),
    }
}

fn key_prefix(op: &Operation, query: &mut Query) -> CoreResult<()> {
    let prefix = op
        .values()
        .next()
        .and_then(FieldValue::as_key_bytes)
        .ok_or_else(|| CoreError::invalid_args("key prefix must be bytes or a string"))?;
    query.key_prefix(prefix.to_vec());
    Ok(())
}

fn keys(op: &Operation) -> CoreResult<Vec<Vec<u8>>> {
    op.values()
        .map(|v| {
            v.as_key_bytes()
                .map(<[u8]>::to_vec)
                .ok_or_else(|| CoreError::invalid_args("keys must be bytes or strings"))
        })
        .collect()
}

/// Translates a predicate into a [`Query`].
///
/// Operations are applied in order into a fresh query, which is returned only
/// if every operation succeeds.
///
/// # Errors
///
/// Returns [`CoreError::NotSupported`] at the first unassigned operation code
/// and [`CoreError::InvalidArgs`] at the first operation whose operands have
/// the wrong shape.
pub fn translate(operations: &[Operation]) -> CoreResult<Query> {
    let mut query = Query::new();
    for op in operations {
        handler(op.code)?(op, &mut query)?;
    }
    tracing::trace!(operations = operations.len(), "translated predicate");
    Ok(query)
}

/// Collects the keys of a key-set-only predicate, in input order.
///
/// # Errors
///
/// Returns [`CoreError::Empty`] for an empty predicate and
/// [`CoreError::NotSupported`] if any operation is not a key set.
pub fn extract_keys(operations: &[Operation]) -> CoreResult<Vec<Vec<u8>>> {
    if operations.is_empty() {
        tracing::error!("no operations to extract keys from");
        return Err(CoreError::Empty);
    }

    let mut all = Vec::new();
    for op in operations {
        if op.kind() != Some(OperationKind::InKeys) {
            tracing::error!(code = op.code, "key extraction only accepts key sets");
            return Err(CoreError::not_supported(op.code));
        }
        all.extend(keys(op)?);
    }
    Ok(all)
}
