//! Column-reference analysis over predicate trees.

use smol_str::SmolStr;

use crate::expr::{BooleanExpr, ColumnRef, PredicateOp};
use crate::visitor::ExprVisitor;

#[derive(Default)]
struct ColumnCollector {
    columns: Vec<SmolStr>,
}

impl ExprVisitor for ColumnCollector {
    fn visit_column_ref(&mut self, column: &ColumnRef) {
        if !self.columns.contains(&column.name) {
            self.columns.push(column.name.clone());
        }
    }
}

/// Distinct column names referenced by `expr`, in first-appearance order.
pub fn referenced_columns(expr: &BooleanExpr) -> Vec<SmolStr> {
    let mut collector = ColumnCollector::default();
    expr.accept(&mut collector);
    collector.columns
}

pub fn references_column(expr: &BooleanExpr, name: &str) -> bool {
    match expr {
        BooleanExpr::Compare(c) => c.lhs.name == name,
        BooleanExpr::Predicate(p) => {
            references_column(&p.lhs, name) || references_column(&p.rhs, name)
        }
        BooleanExpr::Const(_) => false,
    }
}

/// True when no OR node spans more than one distinct column.
///
/// Such a predicate is a conjunction of single-column groups, so evaluating
/// it once per column and ANDing the per-column results is exact.
pub fn is_field_separable(expr: &BooleanExpr) -> bool {
    match expr {
        BooleanExpr::Compare(_) | BooleanExpr::Const(_) => true,
        BooleanExpr::Predicate(p) => match p.op {
            PredicateOp::And => is_field_separable(&p.lhs) && is_field_separable(&p.rhs),
            PredicateOp::Or => referenced_columns(expr).len() <= 1,
        },
    }
}
