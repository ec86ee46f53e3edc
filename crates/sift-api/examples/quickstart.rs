//! Quickstart: builds a small trips table, filters and projects it.
//!
//! Run with: RUST_LOG=sift_executor=debug cargo run -p sift-api --example quickstart

use sift_api::{ChunkedColumn, QueryCompiler, SiftResult, Table, col, lit};
use tracing_subscriber::EnvFilter;

fn main() -> SiftResult<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    println!("=== sift quickstart ===\n");

    let rows = 100_000;
    let taxi_id: Vec<i32> = (0..rows).map(|i| (i * 7919) % 2000).collect();
    let fare: Vec<f64> = (0..rows)
        .map(|i| (i64::from(i) * 104_729 % 9000) as f64 / 100.0)
        .collect();
    let passengers: Vec<u8> = (0..rows).map(|i| (i % 6) as u8 + 1).collect();

    let id_chunks: Vec<&[i32]> = taxi_id.chunks(16_000).collect();
    let fare_chunks: Vec<&[f64]> = fare.chunks(9_999).collect();
    let pass_chunks: Vec<&[u8]> = passengers.chunks(25_000).collect();
    let table = Table::from_columns(vec![
        ("taxi_id", ChunkedColumn::from_slices(&id_chunks)),
        ("fare", ChunkedColumn::from_slices(&fare_chunks)),
        ("passengers", ChunkedColumn::from_slices(&pass_chunks)),
    ])?;
    println!("Input: {} rows, schema {}\n", table.num_rows(), table.schema());

    let query = QueryCompiler::new(table)
        .filter(&col("fare").gt(lit(40.0)))
        .filter(&col("passengers").gt_eq(lit(3)).and(&col("taxi_id").lt(lit(500))))
        .project(["taxi_id", "fare"]);

    if let Some(plan) = query.plan() {
        println!("Recorded plan:\n{plan}\n");
    }
    if let Some(plan) = query.optimized_plan()? {
        println!("Optimized plan:\n{plan}\n");
    }

    let result = query.execute()?;
    println!(
        "Result: {} rows in {} chunk(s), schema {}",
        result.num_rows(),
        result.column(0).num_chunks(),
        result.schema()
    );
    let ids = result.column(0).to_vec::<i32>();
    let fares = result.column(1).to_vec::<f64>();
    for (id, fare) in ids.iter().zip(&fares).take(5) {
        println!("  taxi {id:>4}  fare {fare:>6.2}");
    }
    Ok(())
}
