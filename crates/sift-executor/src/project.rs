//! Column projection.

use std::sync::Arc;

use sift_common::SiftResult;
use sift_storage::Table;
use tracing::trace;

use crate::context::ExecutionContext;

/// Keep the named columns, in the order given. The selection is unchanged.
pub fn project<S: AsRef<str>>(ctx: &ExecutionContext, names: &[S]) -> SiftResult<ExecutionContext> {
    let table = ctx.table();
    let (schema, indices) = table.schema().project(names)?;
    let columns = indices.iter().map(|&i| table.column(i).clone()).collect();
    let projected = Table::make(Arc::new(schema), columns)?;
    trace!(columns = indices.len(), "projected");
    Ok(ctx.with_table(projected))
}
