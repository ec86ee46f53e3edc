//! Row-at-a-time predicate evaluation.
//!
//! This is the semantic reference for compiled kernels: literal conversion,
//! out-of-range folding, NaN handling and null rejection all behave exactly
//! as the generated code does. It is far too slow for bulk filtering.

use std::cmp::Ordering;

use sift_common::{SiftError, SiftResult};
use sift_types::{LiteralValue, ScalarValue};
use smol_str::SmolStr;

use crate::analysis::referenced_columns;
use crate::expr::{BooleanExpr, CompareOp, PredicateOp};

/// Access to one row's column values by name. `Ok(None)` means null.
pub trait Row {
    fn value_of(&self, column: &str) -> SiftResult<Option<ScalarValue>>;
}

impl Row for [(SmolStr, Option<ScalarValue>)] {
    fn value_of(&self, column: &str) -> SiftResult<Option<ScalarValue>> {
        self.iter()
            .find(|(name, _)| name == column)
            .map(|(_, v)| v.clone())
            .ok_or_else(|| SiftError::ColumnNotFound(column.to_string()))
    }
}

impl Row for Vec<(SmolStr, Option<ScalarValue>)> {
    fn value_of(&self, column: &str) -> SiftResult<Option<ScalarValue>> {
        self.as_slice().value_of(column)
    }
}

/// Evaluate `expr` against one row.
///
/// A null in any column the predicate references rejects the row.
pub fn evaluate<R: Row + ?Sized>(expr: &BooleanExpr, row: &R) -> SiftResult<bool> {
    for column in referenced_columns(expr) {
        if row.value_of(&column)?.is_none() {
            return Ok(false);
        }
    }
    eval_node(expr, row)
}

fn eval_node<R: Row + ?Sized>(expr: &BooleanExpr, row: &R) -> SiftResult<bool> {
    match expr {
        BooleanExpr::Const(c) => Ok(c.value),
        BooleanExpr::Compare(c) => match row.value_of(&c.lhs.name)? {
            Some(value) => compare_scalar(&value, c.op, &c.rhs.value),
            None => Ok(false),
        },
        BooleanExpr::Predicate(p) => {
            let lhs = eval_node(&p.lhs, row)?;
            let rhs = eval_node(&p.rhs, row)?;
            Ok(match p.op {
                PredicateOp::And => lhs && rhs,
                PredicateOp::Or => lhs || rhs,
            })
        }
    }
}

#[inline]
fn apply(op: CompareOp, ord: Option<Ordering>) -> bool {
    // An unordered comparison (NaN) fails every operator, `!=` included.
    let Some(ord) = ord else {
        return false;
    };
    match op {
        CompareOp::Gt => ord == Ordering::Greater,
        CompareOp::Lt => ord == Ordering::Less,
        CompareOp::Ge => ord != Ordering::Less,
        CompareOp::Le => ord != Ordering::Greater,
        CompareOp::Eq => ord == Ordering::Equal,
        CompareOp::Neq => ord != Ordering::Equal,
    }
}

/// Compare one decoded value against a literal.
pub fn compare_scalar(value: &ScalarValue, op: CompareOp, literal: &LiteralValue) -> SiftResult<bool> {
    let mismatch = || {
        SiftError::InvalidPredicate(format!(
            "cannot compare {value} with {} literal {literal}",
            literal.type_name()
        ))
    };
    let ord = match (value, literal) {
        (ScalarValue::Int(v), LiteralValue::Int(_) | LiteralValue::UInt(_)) => {
            let l = literal.as_i128().ok_or_else(mismatch)?;
            Some(i128::from(*v).cmp(&l))
        }
        (ScalarValue::UInt(v), LiteralValue::Int(_) | LiteralValue::UInt(_)) => {
            let l = literal.as_i128().ok_or_else(mismatch)?;
            Some(i128::from(*v).cmp(&l))
        }
        (
            ScalarValue::Float32(v),
            LiteralValue::Int(_) | LiteralValue::UInt(_) | LiteralValue::Float(_),
        ) => {
            let l = literal.as_f64().ok_or_else(mismatch)? as f32;
            v.partial_cmp(&l)
        }
        (
            ScalarValue::Float64(v),
            LiteralValue::Int(_) | LiteralValue::UInt(_) | LiteralValue::Float(_),
        ) => {
            let l = literal.as_f64().ok_or_else(mismatch)?;
            v.partial_cmp(&l)
        }
        (ScalarValue::Decimal128(_), _) => {
            return Err(SiftError::NotImplemented("decimal comparisons".into()));
        }
        (ScalarValue::Utf8(_), _) => {
            return Err(SiftError::NotImplemented("string comparisons".into()));
        }
        (ScalarValue::Bool(_), _) => {
            return Err(SiftError::NotImplemented("boolean column comparisons".into()));
        }
        _ => return Err(mismatch()),
    };
    Ok(apply(op, ord))
}
