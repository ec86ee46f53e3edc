//! Double-dispatch visitor over the closed expression node set.
//!
//! Default methods recurse into children, so a visitor only overrides the
//! node kinds it cares about.

use crate::expr::{BooleanConst, BooleanExpr, ColumnRef, CompareExpr, Expr, LiteralExpr, PredicateExpr};

pub trait ExprVisitor {
    fn visit_column_ref(&mut self, _column: &ColumnRef) {}

    fn visit_literal(&mut self, _literal: &LiteralExpr) {}

    fn visit_compare(&mut self, compare: &CompareExpr) {
        walk_compare(self, compare);
    }

    fn visit_predicate(&mut self, predicate: &PredicateExpr) {
        walk_predicate(self, predicate);
    }

    fn visit_boolean_const(&mut self, _value: &BooleanConst) {}
}

pub fn walk_compare<V: ExprVisitor + ?Sized>(visitor: &mut V, compare: &CompareExpr) {
    visitor.visit_column_ref(&compare.lhs);
    visitor.visit_literal(&compare.rhs);
}

pub fn walk_predicate<V: ExprVisitor + ?Sized>(visitor: &mut V, predicate: &PredicateExpr) {
    predicate.lhs.accept(visitor);
    predicate.rhs.accept(visitor);
}

impl BooleanExpr {
    pub fn accept<V: ExprVisitor + ?Sized>(&self, visitor: &mut V) {
        match self {
            Self::Compare(c) => visitor.visit_compare(c),
            Self::Predicate(p) => visitor.visit_predicate(p),
            Self::Const(c) => visitor.visit_boolean_const(c),
        }
    }
}

impl Expr {
    pub fn accept<V: ExprVisitor + ?Sized>(&self, visitor: &mut V) {
        match self {
            Self::Column(c) => visitor.visit_column_ref(c),
            Self::Literal(l) => visitor.visit_literal(l),
            Self::Boolean(b) => b.accept(visitor),
        }
    }
}
