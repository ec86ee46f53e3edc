//! Factory functions and chained builder methods.
//!
//! Every method allocates a new node and never touches its operands, so
//! composed trees can freely share sub-expressions.

use std::sync::Arc;

use sift_types::LiteralValue;
use smol_str::SmolStr;

use crate::expr::{
    BooleanConst, BooleanExpr, ColumnRef, CompareExpr, CompareOp, LiteralExpr, PredicateExpr,
    PredicateOp,
};

pub fn col(name: impl Into<SmolStr>) -> ColumnRef {
    ColumnRef { name: name.into() }
}

pub fn lit(value: impl Into<LiteralValue>) -> LiteralExpr {
    LiteralExpr {
        value: value.into(),
    }
}

pub fn boolean(value: bool) -> BooleanExpr {
    BooleanExpr::Const(BooleanConst { value })
}

impl ColumnRef {
    fn compare(&self, op: CompareOp, rhs: LiteralExpr) -> BooleanExpr {
        BooleanExpr::Compare(Arc::new(CompareExpr {
            lhs: self.clone(),
            rhs,
            op,
        }))
    }

    pub fn eq(&self, rhs: LiteralExpr) -> BooleanExpr {
        self.compare(CompareOp::Eq, rhs)
    }

    pub fn not_eq(&self, rhs: LiteralExpr) -> BooleanExpr {
        self.compare(CompareOp::Neq, rhs)
    }

    pub fn lt(&self, rhs: LiteralExpr) -> BooleanExpr {
        self.compare(CompareOp::Lt, rhs)
    }

    pub fn lt_eq(&self, rhs: LiteralExpr) -> BooleanExpr {
        self.compare(CompareOp::Le, rhs)
    }

    pub fn gt(&self, rhs: LiteralExpr) -> BooleanExpr {
        self.compare(CompareOp::Gt, rhs)
    }

    pub fn gt_eq(&self, rhs: LiteralExpr) -> BooleanExpr {
        self.compare(CompareOp::Ge, rhs)
    }
}

impl BooleanExpr {
    fn combine(&self, op: PredicateOp, rhs: &BooleanExpr) -> BooleanExpr {
        BooleanExpr::Predicate(Arc::new(PredicateExpr {
            lhs: self.clone(),
            rhs: rhs.clone(),
            op,
        }))
    }

    pub fn and(&self, rhs: &BooleanExpr) -> BooleanExpr {
        self.combine(PredicateOp::And, rhs)
    }

    pub fn or(&self, rhs: &BooleanExpr) -> BooleanExpr {
        self.combine(PredicateOp::Or, rhs)
    }
}
