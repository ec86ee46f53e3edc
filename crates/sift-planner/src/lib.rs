//! sift-planner: logical plan chain, plan visitor, optimizer passes.

pub mod logical_plan;
pub mod optimizer;
pub mod visitor;

pub use logical_plan::{LogicalFilter, LogicalMaterializeFilter, LogicalPlan, LogicalProjection};
pub use optimizer::{IdentityPass, JoinFilterPass, OptimizerPass, PlanOptimizer};
pub use visitor::{PlanVisitor, PlanWalk};
