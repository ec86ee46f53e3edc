//! sift-expression: immutable predicate trees, builders, visitors, analysis, row evaluation.

pub mod analysis;
pub mod builder;
pub mod evaluator;
pub mod expr;
pub mod visitor;

pub use analysis::{is_field_separable, referenced_columns, references_column};
pub use builder::{boolean, col, lit};
pub use evaluator::{Row, compare_scalar, evaluate};
pub use expr::{
    BooleanConst, BooleanExpr, ColumnRef, CompareExpr, CompareOp, Expr, LiteralExpr,
    PredicateExpr, PredicateOp,
};
pub use visitor::{ExprVisitor, walk_compare, walk_predicate};
