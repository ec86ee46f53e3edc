//! Plan executor: walks a logical plan over a table.

use std::sync::Arc;

use rayon::{ThreadPool, ThreadPoolBuilder};
use sift_common::{EngineConfig, SiftError, SiftResult};
use sift_expression::BooleanExpr;
use sift_planner::{
    LogicalFilter, LogicalMaterializeFilter, LogicalPlan, LogicalProjection, PlanVisitor, PlanWalk,
};
use sift_storage::Table;
use tracing::debug;

use crate::context::ExecutionContext;
use crate::jit::JitSession;
use crate::{filter, materialize, project};

/// Executes plans on a dedicated worker pool, compiling kernels into the
/// process-wide JIT session.
#[derive(Clone)]
pub struct Executor {
    config: Arc<EngineConfig>,
    pool: Arc<ThreadPool>,
    session: &'static JitSession,
}

impl Executor {
    pub fn new(config: EngineConfig) -> SiftResult<Self> {
        let session = JitSession::global(&config.jit)?;
        let threads = config.max_threads.max(1);
        let pool = ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(|i| format!("sift-worker-{i}"))
            .build()
            .map_err(|e| SiftError::Runtime(format!("worker pool: {e}")))?;
        debug!(threads, "executor ready");
        Ok(Self {
            config: Arc::new(config),
            pool: Arc::new(pool),
            session,
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn session(&self) -> &'static JitSession {
        self.session
    }

    /// Run `op` on the executor's worker pool.
    pub fn install<R: Send>(&self, op: impl FnOnce() -> R + Send) -> R {
        self.pool.install(op)
    }

    pub fn filter(
        &self,
        ctx: &ExecutionContext,
        predicate: &BooleanExpr,
    ) -> SiftResult<ExecutionContext> {
        self.install(|| filter::filter(ctx, predicate, &self.config.jit, self.session))
    }

    pub fn materialize(&self, ctx: &ExecutionContext) -> SiftResult<ExecutionContext> {
        self.install(|| materialize::materialize(ctx, self.config.materialize_chunk_size))
    }

    pub fn project<S: AsRef<str>>(
        &self,
        ctx: &ExecutionContext,
        names: &[S],
    ) -> SiftResult<ExecutionContext> {
        project::project(ctx, names)
    }

    /// Run every node of `plan`, inputs first, starting from `table`.
    pub fn execute(&self, plan: &LogicalPlan, table: Table) -> SiftResult<ExecutionContext> {
        let mut visitor = ExecutePlanVisitor {
            executor: self,
            ctx: ExecutionContext::new(table),
        };
        visitor.visit(plan)?;
        Ok(visitor.ctx)
    }

    /// Like [`execute`](Self::execute), materializing any selection left
    /// pending by the plan. `None` returns `table` untouched.
    pub fn execute_to_table(&self, plan: Option<&LogicalPlan>, table: Table) -> SiftResult<Table> {
        let Some(plan) = plan else {
            return Ok(table);
        };
        let ctx = self.execute(plan, table)?;
        let ctx = if ctx.has_filter_bitmap() {
            self.materialize(&ctx)?
        } else {
            ctx
        };
        Ok(ctx.into_table())
    }
}

impl std::fmt::Debug for Executor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Executor")
            .field("config", &self.config)
            .field("threads", &self.pool.current_num_threads())
            .finish()
    }
}

struct ExecutePlanVisitor<'e> {
    executor: &'e Executor,
    ctx: ExecutionContext,
}

impl PlanVisitor for ExecutePlanVisitor<'_> {
    fn on_projection(&mut self, node: &LogicalProjection) -> SiftResult<()> {
        debug!(fields = node.fields.len(), "execute projection");
        self.ctx = self.executor.project(&self.ctx, &node.fields)?;
        Ok(())
    }

    fn on_filter(&mut self, node: &LogicalFilter) -> SiftResult<()> {
        debug!(predicate = %node.predicate, "execute filter");
        self.ctx = self.executor.filter(&self.ctx, &node.predicate)?;
        Ok(())
    }

    fn on_materialize_filter(&mut self, _node: &LogicalMaterializeFilter) -> SiftResult<()> {
        debug!("execute materialize");
        self.ctx = self.executor.materialize(&self.ctx)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sift_expression::{col, lit};
    use sift_planner::PlanOptimizer;
    use sift_storage::ChunkedColumn;

    fn table() -> Table {
        Table::from_columns(vec![
            ("a", ChunkedColumn::from_slices::<i32>(&[&[5, 1, 9, 3], &[7, 2, 8]])),
            ("b", ChunkedColumn::from_slices::<u16>(&[&[1, 2], &[3, 4, 5, 6, 7]])),
        ])
        .unwrap()
    }

    #[test]
    fn filter_materialize_project() {
        let executor = Executor::new(EngineConfig::sequential()).unwrap();
        let plan = LogicalPlan::filter(None, col("a").gt(lit(4)));
        let plan = LogicalPlan::materialize_filter(Some(plan));
        let plan = LogicalPlan::projection(Some(plan), ["b"]);

        let ctx = executor.execute(&plan, table()).unwrap();
        assert!(!ctx.has_filter_bitmap());
        assert_eq!(ctx.table().column(0).to_vec::<u16>(), vec![1, 3, 5, 7]);
    }

    #[test]
    fn pending_bitmap_is_materialized() {
        let executor = Executor::new(EngineConfig::default()).unwrap();
        let plan = LogicalPlan::filter(None, col("b").lt_eq(lit(2)));
        let out = executor.execute_to_table(Some(&plan), table()).unwrap();
        assert_eq!(out.num_rows(), 2);
        assert_eq!(out.column(0).to_vec::<i32>(), vec![5, 1]);
        assert_eq!(executor.execute_to_table(None, table()).unwrap(), table());
    }

    #[test]
    fn merged_filters_select_the_same_rows() {
        let executor = Executor::new(EngineConfig::default()).unwrap();
        let plan = LogicalPlan::filter(None, col("a").gt(lit(2)));
        let plan = LogicalPlan::materialize_filter(Some(plan));
        let plan = LogicalPlan::filter(Some(plan), col("b").gt(lit(3)));
        let plan = LogicalPlan::materialize_filter(Some(plan));
        let optimized = PlanOptimizer::with_default_passes().run(&plan).unwrap();
        assert!(optimized.num_nodes() < plan.num_nodes());

        let plain = executor.execute(&plan, table()).unwrap();
        let merged = executor.execute(&optimized, table()).unwrap();
        assert_eq!(plain.table(), merged.table());
        assert_eq!(merged.table().column(0).to_vec::<i32>(), vec![3, 7, 8]);
    }

    #[test]
    fn unknown_column_reported_before_compiling() {
        let executor = Executor::new(EngineConfig::sequential()).unwrap();
        let plan = LogicalPlan::filter(None, col("missing").eq(lit(1)));
        assert_eq!(
            executor.execute(&plan, table()).unwrap_err(),
            SiftError::ColumnNotFound("missing".into())
        );
    }
}
