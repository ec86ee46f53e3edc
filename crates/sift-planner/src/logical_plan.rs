//! Logical plan types.
//!
//! A plan is a singly linked chain: every node owns at most one input, and a
//! node without an input reads the base table. Nodes are immutable and shared
//! through `Arc`, so extending a plan never disturbs the plans it was built
//! from.

use std::sync::Arc;

use sift_expression::BooleanExpr;
use smol_str::SmolStr;

#[derive(Clone, Debug, PartialEq)]
pub enum LogicalPlan {
    Projection(Arc<LogicalProjection>),
    Filter(Arc<LogicalFilter>),
    MaterializeFilter(Arc<LogicalMaterializeFilter>),
}

#[derive(Clone, Debug, PartialEq)]
pub struct LogicalProjection {
    pub input: Option<LogicalPlan>,
    pub fields: Vec<SmolStr>,
}

/// Narrow the selection bitmap with a predicate. Rows are not moved.
#[derive(Clone, Debug, PartialEq)]
pub struct LogicalFilter {
    pub input: Option<LogicalPlan>,
    pub predicate: BooleanExpr,
}

/// Compact the table down to the rows selected so far.
#[derive(Clone, Debug, PartialEq)]
pub struct LogicalMaterializeFilter {
    pub input: Option<LogicalPlan>,
}

impl LogicalPlan {
    pub fn projection<S: Into<SmolStr>>(
        input: Option<LogicalPlan>,
        fields: impl IntoIterator<Item = S>,
    ) -> Self {
        LogicalPlan::Projection(Arc::new(LogicalProjection {
            input,
            fields: fields.into_iter().map(Into::into).collect(),
        }))
    }

    pub fn filter(input: Option<LogicalPlan>, predicate: BooleanExpr) -> Self {
        LogicalPlan::Filter(Arc::new(LogicalFilter { input, predicate }))
    }

    pub fn materialize_filter(input: Option<LogicalPlan>) -> Self {
        LogicalPlan::MaterializeFilter(Arc::new(LogicalMaterializeFilter { input }))
    }

    pub fn input(&self) -> Option<&LogicalPlan> {
        match self {
            LogicalPlan::Projection(p) => p.input.as_ref(),
            LogicalPlan::Filter(f) => f.input.as_ref(),
            LogicalPlan::MaterializeFilter(m) => m.input.as_ref(),
        }
    }

    /// Nodes from this one down to the scan end of the chain.
    pub fn iter(&self) -> impl Iterator<Item = &LogicalPlan> {
        std::iter::successors(Some(self), |node| node.input())
    }

    /// Number of nodes in the chain.
    pub fn num_nodes(&self) -> usize {
        self.iter().count()
    }

    pub fn name(&self) -> &'static str {
        match self {
            LogicalPlan::Projection(_) => "Projection",
            LogicalPlan::Filter(_) => "Filter",
            LogicalPlan::MaterializeFilter(_) => "MaterializeFilter",
        }
    }
}

impl std::fmt::Display for LogicalPlan {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut depth = 0;
        for node in self.iter() {
            let indent = depth * 2;
            match node {
                LogicalPlan::Projection(p) => {
                    let fields: Vec<&str> = p.fields.iter().map(|s| s.as_str()).collect();
                    writeln!(f, "{:indent$}Projection: [{}]", "", fields.join(", "))?;
                }
                LogicalPlan::Filter(flt) => {
                    writeln!(f, "{:indent$}Filter: {}", "", flt.predicate)?;
                }
                LogicalPlan::MaterializeFilter(_) => {
                    writeln!(f, "{:indent$}MaterializeFilter", "")?;
                }
            }
            depth += 1;
        }
        write!(f, "{:indent$}TableScan", "", indent = depth * 2)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sift_expression::{col, lit};

    #[test]
    fn chain_order_and_len() {
        let scan_filter = LogicalPlan::filter(None, col("a").gt(lit(1)));
        let project = LogicalPlan::projection(Some(scan_filter.clone()), ["a"]);
        let top = LogicalPlan::materialize_filter(Some(project));

        let names: Vec<&str> = top.iter().map(|n| n.name()).collect();
        assert_eq!(names, vec!["MaterializeFilter", "Projection", "Filter"]);
        assert_eq!(top.num_nodes(), 3);
        assert!(top.input().unwrap().input().unwrap() == &scan_filter);
    }

    #[test]
    fn extending_shares_the_prefix() {
        let base = LogicalPlan::filter(None, col("a").gt(lit(1)));
        let one = LogicalPlan::materialize_filter(Some(base.clone()));
        let two = LogicalPlan::projection(Some(base.clone()), ["a"]);
        let (LogicalPlan::Filter(b), Some(LogicalPlan::Filter(x)), Some(LogicalPlan::Filter(y))) =
            (&base, one.input(), two.input())
        else {
            panic!("unexpected shapes");
        };
        assert!(Arc::ptr_eq(b, x));
        assert!(Arc::ptr_eq(x, y));
    }

    #[test]
    fn explain_output() {
        let plan = LogicalPlan::materialize_filter(Some(LogicalPlan::filter(
            Some(LogicalPlan::projection(None, ["taxi_id", "fare"])),
            col("taxi_id").eq(lit(523)),
        )));
        assert_eq!(
            plan.to_string(),
            "MaterializeFilter\n  Filter: taxi_id == 523\n    Projection: [taxi_id, fare]\n      TableScan"
        );
    }
}
