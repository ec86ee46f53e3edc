//! Expression node types.
//!
//! Trees are immutable. Composite nodes hold their operands behind `Arc`, so
//! one sub-expression can be shared by any number of composed trees and
//! cloning a tree is a reference-count bump.

use std::sync::Arc;

use sift_types::LiteralValue;
use smol_str::SmolStr;

/// Reference to a column by name. Resolved against a schema only when a
/// kernel is compiled.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ColumnRef {
    pub name: SmolStr,
}

#[derive(Clone, Debug, PartialEq)]
pub struct LiteralExpr {
    pub value: LiteralValue,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CompareOp {
    Gt,
    Lt,
    Ge,
    Le,
    Eq,
    Neq,
}

impl CompareOp {
    pub const fn symbol(&self) -> &'static str {
        match self {
            Self::Gt => ">",
            Self::Lt => "<",
            Self::Ge => ">=",
            Self::Le => "<=",
            Self::Eq => "==",
            Self::Neq => "!=",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PredicateOp {
    And,
    Or,
}

impl PredicateOp {
    /// The constant that leaves a combination under this operator unchanged.
    pub const fn identity(&self) -> bool {
        match self {
            Self::And => true,
            Self::Or => false,
        }
    }

    pub const fn symbol(&self) -> &'static str {
        match self {
            Self::And => "AND",
            Self::Or => "OR",
        }
    }
}

/// `column <op> literal`.
#[derive(Clone, Debug, PartialEq)]
pub struct CompareExpr {
    pub lhs: ColumnRef,
    pub rhs: LiteralExpr,
    pub op: CompareOp,
}

/// `lhs AND rhs` or `lhs OR rhs`.
#[derive(Clone, Debug, PartialEq)]
pub struct PredicateExpr {
    pub lhs: BooleanExpr,
    pub rhs: BooleanExpr,
    pub op: PredicateOp,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct BooleanConst {
    pub value: bool,
}

/// Any expression that evaluates to a boolean per row.
#[derive(Clone, Debug, PartialEq)]
pub enum BooleanExpr {
    Compare(Arc<CompareExpr>),
    Predicate(Arc<PredicateExpr>),
    Const(BooleanConst),
}

/// The full expression node set.
#[derive(Clone, Debug, PartialEq)]
pub enum Expr {
    Column(ColumnRef),
    Literal(LiteralExpr),
    Boolean(BooleanExpr),
}

impl From<BooleanExpr> for Expr {
    fn from(expr: BooleanExpr) -> Self {
        Expr::Boolean(expr)
    }
}

impl From<ColumnRef> for Expr {
    fn from(column: ColumnRef) -> Self {
        Expr::Column(column)
    }
}

impl From<LiteralExpr> for Expr {
    fn from(literal: LiteralExpr) -> Self {
        Expr::Literal(literal)
    }
}

impl BooleanExpr {
    /// Whether two handles point at the same shared node.
    pub fn ptr_eq(&self, other: &BooleanExpr) -> bool {
        match (self, other) {
            (Self::Compare(a), Self::Compare(b)) => Arc::ptr_eq(a, b),
            (Self::Predicate(a), Self::Predicate(b)) => Arc::ptr_eq(a, b),
            (Self::Const(a), Self::Const(b)) => a == b,
            _ => false,
        }
    }

    /// Number of nodes in the tree, counting shared nodes once per use.
    pub fn node_count(&self) -> usize {
        match self {
            Self::Compare(_) | Self::Const(_) => 1,
            Self::Predicate(p) => 1 + p.lhs.node_count() + p.rhs.node_count(),
        }
    }
}

impl std::fmt::Display for ColumnRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name)
    }
}

impl std::fmt::Display for LiteralExpr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.value)
    }
}

impl std::fmt::Display for CompareExpr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {} {}", self.lhs, self.op.symbol(), self.rhs)
    }
}

impl std::fmt::Display for BooleanExpr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Compare(c) => write!(f, "{c}"),
            Self::Predicate(p) => write!(f, "({} {} {})", p.lhs, p.op.symbol(), p.rhs),
            Self::Const(c) => write!(f, "{}", if c.value { "TRUE" } else { "FALSE" }),
        }
    }
}

impl std::fmt::Display for Expr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Column(c) => write!(f, "{c}"),
            Self::Literal(l) => write!(f, "{l}"),
            Self::Boolean(b) => write!(f, "{b}"),
        }
    }
}
