#![allow(dead_code)]

use sift_common::EngineConfig;
use sift_executor::{ExecutionContext, Executor};
use sift_expression::{BooleanExpr, evaluate};
use sift_storage::{Array, ChunkedColumn, Table};
use sift_types::{NativeType, ScalarValue};
use smol_str::SmolStr;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// Route engine events to the test harness. `RUST_LOG` selects what is shown.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub fn executor() -> Executor {
    init_tracing();
    Executor::new(EngineConfig::default()).unwrap()
}

/// Split `values` into chunks with the given lengths, repeated as needed.
pub fn chunked<T: NativeType>(values: &[T], lens: &[usize]) -> ChunkedColumn {
    let mut chunks = Vec::new();
    let mut start = 0;
    for &len in lens.iter().cycle() {
        if start >= values.len() {
            break;
        }
        let end = (start + len).min(values.len());
        chunks.push(&values[start..end]);
        start = end;
    }
    ChunkedColumn::from_slices(&chunks)
}

pub fn chunked_options<T: NativeType>(values: &[Option<T>], lens: &[usize]) -> ChunkedColumn {
    let mut chunks = Vec::new();
    let mut start = 0;
    for &len in lens.iter().cycle() {
        if start >= values.len() {
            break;
        }
        let end = (start + len).min(values.len());
        chunks.push(Arc::new(Array::from_options(&values[start..end])));
        start = end;
    }
    ChunkedColumn::new(T::PHYSICAL, chunks).unwrap()
}

/// Row-at-a-time evaluation of `expr` over every row of `table`.
pub fn reference_bits(table: &Table, expr: &BooleanExpr) -> Vec<bool> {
    let names: Vec<SmolStr> = table
        .schema()
        .fields()
        .iter()
        .map(|f| f.name.clone())
        .collect();
    let columns: Vec<Vec<Option<ScalarValue>>> = table
        .columns()
        .iter()
        .map(|column| {
            column
                .chunks()
                .iter()
                .flat_map(|chunk| (0..chunk.len()).map(|i| chunk.scalar_at(i).unwrap()))
                .collect()
        })
        .collect();
    (0..table.num_rows())
        .map(|row| {
            let values: Vec<(SmolStr, Option<ScalarValue>)> = names
                .iter()
                .cloned()
                .zip(columns.iter().map(|c| c[row].clone()))
                .collect();
            evaluate(expr, &values).unwrap()
        })
        .collect()
}

pub fn selected_bits(ctx: &ExecutionContext) -> Vec<bool> {
    match ctx.filter_bitmap() {
        Some(bitmap) => bitmap.iter().collect(),
        None => vec![true; ctx.table().num_rows()],
    }
}

/// Bitmap produced by one filter step over `table`.
pub fn filter_bits(executor: &Executor, table: &Table, expr: &BooleanExpr) -> Vec<bool> {
    let ctx = executor
        .filter(&ExecutionContext::new(table.clone()), expr)
        .unwrap();
    selected_bits(&ctx)
}
