use sift_common::SiftResult;

use crate::logical_plan::{LogicalFilter, LogicalMaterializeFilter, LogicalPlan, LogicalProjection};

/// Per-node hooks over a logical plan chain.
///
/// Hooks are driven by [`PlanWalk::visit`], which always delivers a node's
/// input before the node itself.
pub trait PlanVisitor {
    fn on_projection(&mut self, node: &LogicalProjection) -> SiftResult<()>;

    fn on_filter(&mut self, node: &LogicalFilter) -> SiftResult<()>;

    fn on_materialize_filter(&mut self, node: &LogicalMaterializeFilter) -> SiftResult<()>;
}

/// Input-first traversal. Implemented for every [`PlanVisitor`] and cannot be
/// overridden.
pub trait PlanWalk: PlanVisitor {
    fn visit(&mut self, plan: &LogicalPlan) -> SiftResult<()> {
        let chain: Vec<&LogicalPlan> = plan.iter().collect();
        for node in chain.into_iter().rev() {
            match node {
                LogicalPlan::Projection(p) => self.on_projection(p)?,
                LogicalPlan::Filter(f) => self.on_filter(f)?,
                LogicalPlan::MaterializeFilter(m) => self.on_materialize_filter(m)?,
            }
        }
        Ok(())
    }
}

impl<V: PlanVisitor + ?Sized> PlanWalk for V {}
