//! Plan optimizer: ordered rewrite passes over the logical plan chain.
//!
//! A pass rebuilds the plan bottom-up. The walk hands each hook the plan
//! rebuilt so far (the node's new input) and the hook returns the node that
//! replaces it. Rebuilding always allocates new nodes, so the input plan and
//! anything sharing its nodes are left untouched.

use sift_common::{SiftError, SiftResult};
use tracing::trace;

use crate::logical_plan::*;
use crate::visitor::{PlanVisitor, PlanWalk};

pub trait OptimizerPass: Send + Sync {
    fn name(&self) -> &'static str;

    fn rebuild_projection(&self, input: Option<LogicalPlan>, node: &LogicalProjection) -> LogicalPlan {
        LogicalPlan::projection(input, node.fields.iter().cloned())
    }

    fn rebuild_filter(&self, input: Option<LogicalPlan>, node: &LogicalFilter) -> LogicalPlan {
        LogicalPlan::filter(input, node.predicate.clone())
    }

    fn rebuild_materialize_filter(
        &self,
        input: Option<LogicalPlan>,
        _node: &LogicalMaterializeFilter,
    ) -> LogicalPlan {
        LogicalPlan::materialize_filter(input)
    }
}

/// Drives one pass as a plan visitor, accumulating the rebuilt plan.
struct PassRunner<'a> {
    pass: &'a dyn OptimizerPass,
    result: Option<LogicalPlan>,
}

impl PlanVisitor for PassRunner<'_> {
    fn on_projection(&mut self, node: &LogicalProjection) -> SiftResult<()> {
        self.result = Some(self.pass.rebuild_projection(self.result.take(), node));
        Ok(())
    }

    fn on_filter(&mut self, node: &LogicalFilter) -> SiftResult<()> {
        self.result = Some(self.pass.rebuild_filter(self.result.take(), node));
        Ok(())
    }

    fn on_materialize_filter(&mut self, node: &LogicalMaterializeFilter) -> SiftResult<()> {
        self.result = Some(self.pass.rebuild_materialize_filter(self.result.take(), node));
        Ok(())
    }
}

fn run_pass(pass: &dyn OptimizerPass, plan: &LogicalPlan) -> SiftResult<LogicalPlan> {
    let mut runner = PassRunner { pass, result: None };
    runner.visit(plan)?;
    runner.result.ok_or_else(|| {
        SiftError::Unreachable(format!("optimizer pass '{}' produced no plan", pass.name()))
    })
}

/// Rebuilds every node unchanged.
#[derive(Clone, Copy, Debug, Default)]
pub struct IdentityPass;

impl OptimizerPass for IdentityPass {
    fn name(&self) -> &'static str {
        "identity"
    }
}

// ---------------------------------------------------------------------------
// Filter merging
// ---------------------------------------------------------------------------

/// Fuses adjacent filters into one conjunction.
///
/// A filter stacked on another filter becomes `Filter(prev AND next)`. A
/// filter stacked on a materialization drops that materialization and tries
/// again against its input, so two filters separated only by a compaction
/// are evaluated together over the uncompacted table.
#[derive(Clone, Copy, Debug, Default)]
pub struct JoinFilterPass;

impl OptimizerPass for JoinFilterPass {
    fn name(&self) -> &'static str {
        "join_filter"
    }

    fn rebuild_filter(&self, input: Option<LogicalPlan>, node: &LogicalFilter) -> LogicalPlan {
        match input {
            Some(LogicalPlan::Filter(prev)) => LogicalPlan::filter(
                prev.input.clone(),
                prev.predicate.and(&node.predicate),
            ),
            Some(LogicalPlan::MaterializeFilter(m)) => self.rebuild_filter(m.input.clone(), node),
            other => LogicalPlan::filter(other, node.predicate.clone()),
        }
    }
}

// ---------------------------------------------------------------------------
// Pass pipeline
// ---------------------------------------------------------------------------

/// Ordered list of passes. Each pass consumes the previous pass's output.
#[derive(Default)]
pub struct PlanOptimizer {
    passes: Vec<Box<dyn OptimizerPass>>,
}

impl PlanOptimizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// The pipeline used by the query compiler.
    pub fn with_default_passes() -> Self {
        Self::new().with_pass(JoinFilterPass)
    }

    pub fn with_pass(mut self, pass: impl OptimizerPass + 'static) -> Self {
        self.add_pass(pass);
        self
    }

    pub fn add_pass(&mut self, pass: impl OptimizerPass + 'static) {
        self.passes.push(Box::new(pass));
    }

    pub fn pass_names(&self) -> Vec<&'static str> {
        self.passes.iter().map(|p| p.name()).collect()
    }

    pub fn run(&self, plan: &LogicalPlan) -> SiftResult<LogicalPlan> {
        let mut current = plan.clone();
        for pass in &self.passes {
            current = run_pass(pass.as_ref(), &current)?;
            trace!(pass = pass.name(), nodes = current.num_nodes(), "optimizer pass done");
        }
        Ok(current)
    }
}

impl std::fmt::Debug for PlanOptimizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlanOptimizer")
            .field("passes", &self.pass_names())
            .finish()
    }
}
