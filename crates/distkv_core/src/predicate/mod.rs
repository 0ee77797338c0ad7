//! Predicate language and its translation into structured queries.

mod operation;
mod translator;

pub use operation::{Operand, Operation, OperationKind};
pub use translator::{extract_keys, translate};
