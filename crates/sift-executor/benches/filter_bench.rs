use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use sift_common::{EngineConfig, JitConfig};
use sift_executor::{ExecutionContext, Executor, FilterKernel, JitSession};
use sift_expression::{col, lit};
use sift_storage::{Array, ChunkedColumn, Table};
use sift_types::{Field, PhysicalType};

const ROWS: usize = 1 << 20;

fn kernel_throughput(c: &mut Criterion) {
    let session = JitSession::global(&JitConfig::default()).unwrap();
    let values: Vec<i64> = (0..ROWS as i64).map(|i| i * 7919 % 1000).collect();
    let array = Array::from_slice(&values);
    let expr = col("v").gt_eq(lit(100)).and(&col("v").lt(lit(900)));

    let mut group = c.benchmark_group("kernel");
    group.throughput(Throughput::Elements(ROWS as u64));
    for inline in [true, false] {
        let config = JitConfig {
            inline_predicate: inline,
            ..JitConfig::default()
        };
        let mut kernel = FilterKernel::new(Field::new("v", PhysicalType::Int64), expr.clone(), config);
        kernel.compile(session).unwrap();
        let mut bitmap = vec![0xffu8; ROWS / 8];
        group.bench_function(BenchmarkId::new("int64_range", if inline { "inline" } else { "call" }), |b| {
            b.iter(|| {
                bitmap.fill(0xff);
                kernel.execute(black_box(&array), &mut bitmap, 0).unwrap();
            })
        });
    }
    group.finish();
}

fn end_to_end(c: &mut Criterion) {
    let a: Vec<i32> = (0..ROWS as i32).map(|i| i % 5000).collect();
    let b: Vec<f64> = (0..ROWS).map(|i| (i % 977) as f64 * 0.25).collect();
    let a_chunks: Vec<&[i32]> = a.chunks(65_521).collect();
    let b_chunks: Vec<&[f64]> = b.chunks(40_003).collect();
    let table = Table::from_columns(vec![
        ("a", ChunkedColumn::from_slices(&a_chunks)),
        ("b", ChunkedColumn::from_slices(&b_chunks)),
    ])
    .unwrap();
    let separable = col("a").lt(lit(2500)).and(&col("b").gt(lit(100.0)));
    let mixed = col("a").lt(lit(100)).or(&col("b").gt(lit(200.0)));

    let mut group = c.benchmark_group("filter");
    group.throughput(Throughput::Elements(ROWS as u64));
    for threads in [1, 4] {
        let executor = Executor::new(EngineConfig {
            max_threads: threads,
            ..EngineConfig::default()
        })
        .unwrap();
        let ctx = ExecutionContext::new(table.clone());
        group.bench_with_input(BenchmarkId::new("separable", threads), &ctx, |bench, ctx| {
            bench.iter(|| executor.filter(ctx, &separable).unwrap())
        });
        group.bench_with_input(BenchmarkId::new("mixed_or", threads), &ctx, |bench, ctx| {
            bench.iter(|| executor.filter(ctx, &mixed).unwrap())
        });
        group.bench_with_input(BenchmarkId::new("materialize", threads), &ctx, |bench, ctx| {
            let filtered = executor.filter(ctx, &separable).unwrap();
            bench.iter(|| executor.materialize(&filtered).unwrap())
        });
    }
    group.finish();
}

criterion_group!(benches, kernel_throughput, end_to_end);
criterion_main!(benches);
