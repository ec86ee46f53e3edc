//! QueryCompiler: lazy plan builder bound to one table.

use std::sync::{Arc, OnceLock};

use sift_common::{EngineConfig, SiftResult};
use sift_executor::Executor;
use sift_expression::BooleanExpr;
use sift_planner::{LogicalPlan, PlanOptimizer};
use sift_storage::Table;
use smol_str::SmolStr;
use tracing::debug;

/// Records operations against a table and runs them on demand.
///
/// Every builder call returns a new compiler; the one it was called on is
/// left untouched, so a partially built query can be branched.
///
/// ```ignore
/// let result = QueryCompiler::new(table)
///     .project(["taxi_id", "fare"])
///     .filter(&col("taxi_id").eq(lit(523)))
///     .execute()?;
/// ```
#[derive(Clone, Debug)]
pub struct QueryCompiler {
    table: Table,
    plan: Option<LogicalPlan>,
    config: Arc<EngineConfig>,
    /// Built on first execution, shared by every compiler derived from this one.
    executor: Arc<OnceLock<Executor>>,
}

impl QueryCompiler {
    pub fn new(table: Table) -> Self {
        Self::with_config(table, EngineConfig::default())
    }

    pub fn with_config(table: Table, config: EngineConfig) -> Self {
        Self {
            table,
            plan: None,
            config: Arc::new(config),
            executor: Arc::new(OnceLock::new()),
        }
    }

    pub fn table(&self) -> &Table {
        &self.table
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    fn extend(&self, plan: LogicalPlan) -> Self {
        Self {
            table: self.table.clone(),
            plan: Some(plan),
            config: Arc::clone(&self.config),
            executor: Arc::clone(&self.executor),
        }
    }

    /// Keep only the rows matching `predicate`.
    pub fn filter(&self, predicate: &BooleanExpr) -> Self {
        let filter = LogicalPlan::filter(self.plan.clone(), predicate.clone());
        self.extend(LogicalPlan::materialize_filter(Some(filter)))
    }

    /// Keep only the named columns, in the order given.
    pub fn project<S: Into<SmolStr>>(&self, fields: impl IntoIterator<Item = S>) -> Self {
        self.extend(LogicalPlan::projection(self.plan.clone(), fields))
    }

    /// The plan as recorded, before optimization.
    pub fn plan(&self) -> Option<&LogicalPlan> {
        self.plan.as_ref()
    }

    /// The plan after the default optimizer passes.
    pub fn optimized_plan(&self) -> SiftResult<Option<LogicalPlan>> {
        self.plan
            .as_ref()
            .map(|plan| PlanOptimizer::with_default_passes().run(plan))
            .transpose()
    }

    /// The executor `execute` runs on, created from this compiler's config
    /// the first time it is needed.
    pub fn executor(&self) -> SiftResult<&Executor> {
        if let Some(executor) = self.executor.get() {
            return Ok(executor);
        }
        let executor = Executor::new(self.config.as_ref().clone())?;
        Ok(self.executor.get_or_init(|| executor))
    }

    /// Optimize and run on this compiler's executor.
    pub fn execute(&self) -> SiftResult<Table> {
        self.execute_with(self.executor()?)
    }

    /// Optimize and run on an existing executor.
    pub fn execute_with(&self, executor: &Executor) -> SiftResult<Table> {
        let plan = self.optimized_plan()?;
        if let Some(plan) = &plan {
            debug!(nodes = plan.num_nodes(), "executing plan\n{plan}");
        }
        executor.execute_to_table(plan.as_ref(), self.table.clone())
    }
}
