//! Filter driver: turns a predicate into a selection bitmap.
//!
//! Field-separable predicates (no OR spanning two columns) get one kernel per
//! referenced field. Each kernel clears bits in its own all-ones bitmap and
//! the per-field bitmaps are ANDed together. Anything else is split into
//! single-column subtrees whose bitmaps are combined following the tree.
//!
//! Per column, the bulk passes of all chunks run in parallel because they
//! write disjoint whole bytes. Bytes shared between neighbouring chunks are
//! fixed up afterwards, sequentially.

use std::sync::Arc;

use rayon::prelude::*;
use sift_common::{JitConfig, SiftError, SiftResult};
use sift_expression::{
    BooleanExpr, PredicateOp, evaluate, is_field_separable, referenced_columns,
};
use sift_storage::{Bitmap, ChunkedColumn, Table};
use sift_types::{Field, ScalarValue};
use smol_str::SmolStr;
use tracing::{debug, trace};

use crate::context::ExecutionContext;
use crate::jit::{FilterKernel, JitSession};

/// Bytes per unit of work in the AND-reduction.
const REDUCE_REGION: usize = 64 * 1024;

/// Apply `predicate` to the rows of `ctx`, ANDing into any existing selection.
///
/// Run inside the executor's thread pool.
pub fn filter(
    ctx: &ExecutionContext,
    predicate: &BooleanExpr,
    config: &JitConfig,
    session: &JitSession,
) -> SiftResult<ExecutionContext> {
    ctx.check_bitmap()?;
    let table = ctx.table();
    if table.num_columns() == 0 || table.column(0).num_chunks() == 0 {
        return Ok(ctx.clone());
    }

    let columns = referenced_columns(predicate);
    for name in &columns {
        let field = table.schema().field_with_name(name)?;
        FilterKernel::validate(field, predicate)?;
    }

    let driver = FilterDriver {
        table,
        config,
        session,
    };
    let mut bitmap = if columns.is_empty() {
        driver.constant(predicate)?
    } else if is_field_separable(predicate) {
        debug!(columns = columns.len(), "filtering per field");
        driver.separable(predicate, &columns)?
    } else {
        debug!(columns = columns.len(), "filtering by bitmap algebra");
        driver.tree(predicate)?
    };

    for name in &columns {
        if let Some(validity) = validity_bitmap(table.column_by_name(name)?) {
            bitmap.and_inplace(&validity);
        }
    }
    if let Some(existing) = ctx.filter_bitmap() {
        bitmap.and_inplace(existing);
    }

    debug!(
        rows = table.num_rows(),
        selected = bitmap.count_set_bits(),
        predicate = %predicate,
        "filter applied"
    );
    Ok(ctx.with_filter_bitmap(Arc::new(bitmap)))
}

struct FilterDriver<'a> {
    table: &'a Table,
    config: &'a JitConfig,
    session: &'a JitSession,
}

impl FilterDriver<'_> {
    fn constant(&self, predicate: &BooleanExpr) -> SiftResult<Bitmap> {
        let no_columns: Vec<(SmolStr, Option<ScalarValue>)> = Vec::new();
        let rows = self.table.num_rows();
        Ok(if evaluate(predicate, &no_columns)? {
            Bitmap::new_set(rows)
        } else {
            Bitmap::new_unset(rows)
        })
    }

    fn separable(&self, predicate: &BooleanExpr, columns: &[SmolStr]) -> SiftResult<Bitmap> {
        let bitmaps = columns
            .par_iter()
            .map(|name| self.field_bitmap(name, predicate))
            .collect::<SiftResult<Vec<_>>>()?;
        and_reduce(bitmaps).ok_or_else(|| SiftError::Unreachable("no bitmaps to reduce".into()))
    }

    fn tree(&self, expr: &BooleanExpr) -> SiftResult<Bitmap> {
        let columns = referenced_columns(expr);
        match (columns.as_slice(), expr) {
            ([], _) => self.constant(expr),
            ([name], _) => self.field_bitmap(name, expr),
            (_, BooleanExpr::Predicate(p)) => {
                let (lhs, rhs) = rayon::join(|| self.tree(&p.lhs), || self.tree(&p.rhs));
                let (mut lhs, rhs) = (lhs?, rhs?);
                match p.op {
                    PredicateOp::And => lhs.and_inplace(&rhs),
                    PredicateOp::Or => lhs.or_inplace(&rhs),
                }
                Ok(lhs)
            }
            (_, BooleanExpr::Compare(_) | BooleanExpr::Const(_)) => Err(SiftError::Unreachable(
                format!("leaf '{expr}' references {} columns", columns.len()),
            )),
        }
    }

    /// Compile `expr` for one field and run it over the whole column.
    fn field_bitmap(&self, name: &str, expr: &BooleanExpr) -> SiftResult<Bitmap> {
        let field: Field = self.table.schema().field_with_name(name)?.clone();
        let column = self.table.column_by_name(name)?;
        let mut kernel = FilterKernel::new(field, expr.clone(), self.config.clone());
        kernel.compile(self.session)?;

        let mut bitmap = Bitmap::new_set(self.table.num_rows());
        run_kernel(&kernel, column, &mut bitmap)?;
        trace!(field = name, selected = bitmap.count_set_bits(), "field bitmap");
        Ok(bitmap)
    }
}

#[derive(Clone, Copy)]
struct BitmapPtr(*mut u8);

// SAFETY: workers write disjoint byte ranges through the pointer, and the
// owning bitmap is not touched until every worker has joined.
unsafe impl Send for BitmapPtr {}
unsafe impl Sync for BitmapPtr {}

impl BitmapPtr {
    fn get(self) -> *mut u8 {
        self.0
    }
}

/// Run `kernel` over every chunk of `column`, clearing bits of failing rows.
pub(crate) fn run_kernel(
    kernel: &FilterKernel<'_>,
    column: &ChunkedColumn,
    bitmap: &mut Bitmap,
) -> SiftResult<()> {
    let starts = column.chunk_offsets();
    let base = BitmapPtr(bitmap.as_mut_bytes().as_mut_ptr());

    column
        .chunks()
        .par_iter()
        .zip(starts.par_iter())
        .try_for_each(|(chunk, &start)| {
            let head = (8 - start % 8) % 8;
            // SAFETY: the bulk pass of a chunk starting at `start` writes only
            // bytes whose eight rows all belong to that chunk. Those ranges are
            // disjoint across chunks and lie inside the bitmap.
            unsafe { kernel.execute_raw(chunk, base.get().add(start / 8), head) }
        })?;

    let bytes = bitmap.as_mut_bytes();
    for (chunk, &start) in column.chunks().iter().zip(&starts) {
        let len = chunk.len();
        if len == 0 {
            continue;
        }
        let head = ((8 - start % 8) % 8).min(len);
        if start % 8 != 0 {
            kernel.execute_remaining(chunk, &mut bytes[start / 8], 0, (start % 8) as u8)?;
        }
        let tail = (len - head) % 8;
        if tail > 0 {
            kernel.execute_remaining(chunk, &mut bytes[(start + len) / 8], len - tail, 0)?;
        }
    }
    Ok(())
}

/// AND every bitmap into the first, region by region in parallel.
fn and_reduce(mut bitmaps: Vec<Bitmap>) -> Option<Bitmap> {
    if bitmaps.is_empty() {
        return None;
    }
    let mut acc = bitmaps.swap_remove(0);
    if bitmaps.is_empty() {
        return Some(acc);
    }
    acc.as_mut_bytes()
        .par_chunks_mut(REDUCE_REGION)
        .enumerate()
        .for_each(|(region, dst)| {
            let start = region * REDUCE_REGION;
            for other in &bitmaps {
                let src = &other.as_bytes()[start..start + dst.len()];
                for (d, s) in dst.iter_mut().zip(src) {
                    *d &= *s;
                }
            }
        });
    Some(acc)
}

/// Validity over the whole column, or `None` when no chunk has nulls.
fn validity_bitmap(column: &ChunkedColumn) -> Option<Bitmap> {
    if column.chunks().iter().all(|c| c.null_count() == 0) {
        return None;
    }
    let mut validity = Bitmap::new_set(column.len());
    let mut row = 0;
    for chunk in column.chunks() {
        for i in 0..chunk.len() {
            if !chunk.is_valid(i) {
                validity.set(row + i, false);
            }
        }
        row += chunk.len();
    }
    Some(validity)
}

#[cfg(test)]
mod tests {
    use super::*;
    use sift_expression::{col, lit};
    use sift_storage::Array;
    use sift_types::PhysicalType;

    fn session() -> &'static JitSession {
        JitSession::global(&JitConfig::default()).unwrap()
    }

    fn run(column: &ChunkedColumn, expr: BooleanExpr) -> Vec<bool> {
        let field = Field::new("v", column.data_type());
        let mut kernel = FilterKernel::new(field, expr, JitConfig::default());
        kernel.compile(session()).unwrap();
        let mut bitmap = Bitmap::new_set(column.len());
        run_kernel(&kernel, column, &mut bitmap).unwrap();
        bitmap.iter().collect()
    }

    #[test]
    fn boundary_bytes_across_chunks() {
        // Chunk lengths chosen so boundaries land mid-byte, and one chunk sits
        // entirely inside a byte.
        let chunks: Vec<Vec<i32>> = vec![
            (0..5).collect(),
            (5..7).collect(),
            (7..20).collect(),
            vec![],
            (20..37).collect(),
        ];
        let slices: Vec<&[i32]> = chunks.iter().map(Vec::as_slice).collect();
        let column = ChunkedColumn::from_slices(&slices);
        let got = run(&column, col("v").gt_eq(lit(3)).and(&col("v").lt(lit(30))));
        let expected: Vec<bool> = (0..37).map(|v| (3..30).contains(&v)).collect();
        assert_eq!(got, expected);
    }

    #[test]
    fn single_row_chunks() {
        let values: Vec<Vec<i16>> = (0..19).map(|v| vec![v]).collect();
        let slices: Vec<&[i16]> = values.iter().map(Vec::as_slice).collect();
        let column = ChunkedColumn::from_slices(&slices);
        let got = run(&column, col("v").not_eq(lit(7)));
        let expected: Vec<bool> = (0..19).map(|v| v != 7).collect();
        assert_eq!(got, expected);
    }

    #[test]
    fn and_reduce_regions() {
        let len = REDUCE_REGION * 8 + 13;
        let a = Bitmap::from_bools(&(0..len).map(|i| i % 2 == 0).collect::<Vec<_>>());
        let b = Bitmap::from_bools(&(0..len).map(|i| i % 3 == 0).collect::<Vec<_>>());
        let reduced = and_reduce(vec![a, b]).unwrap();
        assert_eq!(reduced.count_set_bits(), (0..len).filter(|i| i % 6 == 0).count());
        assert!(and_reduce(Vec::new()).is_none());
    }

    #[test]
    fn validity_bitmap_spans_chunks() {
        let column = ChunkedColumn::new(
            PhysicalType::Int32,
            vec![
                Arc::new(Array::from_slice(&[1i32, 2])),
                Arc::new(Array::from_options(&[Some(3i32), None, Some(5)])),
            ],
        )
        .unwrap();
        let validity = validity_bitmap(&column).unwrap();
        assert_eq!(validity.iter().collect::<Vec<_>>(), [true, true, true, false, true]);
        let dense = ChunkedColumn::from_slices::<i32>(&[&[1, 2]]);
        assert!(validity_bitmap(&dense).is_none());
    }
}
