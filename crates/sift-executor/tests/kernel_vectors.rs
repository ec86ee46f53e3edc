//! Bit-exact kernel behaviour for every filterable column type.

use sift_common::{JitConfig, SiftError};
use sift_executor::{FilterKernel, JitSession};
use sift_expression::{BooleanExpr, col, evaluate, lit};
use sift_storage::Array;
use sift_types::{F16, Field, NativeType, ScalarValue};
use smol_str::SmolStr;

fn session() -> &'static JitSession {
    JitSession::global(&JitConfig::default()).unwrap()
}

/// Run a kernel over one whole chunk the way the driver does for a chunk that
/// starts on a byte boundary.
fn kernel_bits(array: &Array, expr: &BooleanExpr, config: JitConfig) -> Vec<bool> {
    let field = Field::new("v", array.data_type());
    let mut kernel = FilterKernel::new(field, expr.clone(), config);
    kernel.compile(session()).unwrap();

    let len = array.len();
    let mut bitmap = vec![0xffu8; len.div_ceil(8)];
    kernel.execute(array, &mut bitmap, 0).unwrap();
    let tail = len % 8;
    if tail > 0 {
        kernel
            .execute_remaining(array, &mut bitmap[len / 8], len - tail, 0)
            .unwrap();
    }
    (0..len).map(|i| bitmap[i / 8] & (0x80 >> (i % 8)) != 0).collect()
}

fn reference(values: &[ScalarValue], expr: &BooleanExpr) -> Vec<bool> {
    values
        .iter()
        .map(|v| {
            let row = vec![(SmolStr::new("v"), Some(v.clone()))];
            evaluate(expr, &row).unwrap()
        })
        .collect()
}

fn check<T: NativeType>(values: &[T], expr: BooleanExpr) {
    let array = Array::from_slice(values);
    let scalars: Vec<ScalarValue> = values.iter().map(|v| v.to_scalar()).collect();
    let expected = reference(&scalars, &expr);
    for inline_predicate in [true, false] {
        let config = JitConfig {
            inline_predicate,
            ..JitConfig::default()
        };
        assert_eq!(
            kernel_bits(&array, &expr, config),
            expected,
            "{expr} on {:?} (inline: {inline_predicate})",
            T::PHYSICAL
        );
    }
}

macro_rules! int_cases {
    ($($name:ident: $ty:ty),* $(,)?) => {
        $(
            #[test]
            fn $name() {
                let values: Vec<$ty> = (0..29u8).map(|i| (i as $ty).wrapping_mul(7) % 23).collect();
                check(&values, col("v").eq(lit(4)));
                check(&values, col("v").not_eq(lit(4)));
                check(&values, col("v").lt(lit(9)));
                check(&values, col("v").lt_eq(lit(9)));
                check(&values, col("v").gt(lit(12)));
                check(&values, col("v").gt_eq(lit(12)).and(&col("v").lt(lit(20))));
                check(&values, col("v").lt(lit(3)).or(&col("v").gt(lit(18))));
            }
        )*
    };
}

int_cases! {
    int8_vectors: i8,
    int16_vectors: i16,
    int32_vectors: i32,
    int64_vectors: i64,
    uint8_vectors: u8,
    uint16_vectors: u16,
    uint32_vectors: u32,
    uint64_vectors: u64,
}

#[test]
fn float_vectors() {
    let f64s: Vec<f64> = (0..21).map(|i| i as f64 * 0.75 - 4.0).collect();
    check(&f64s, col("v").gt(lit(1.5)));
    check(&f64s, col("v").lt_eq(lit(-1)));
    check(&f64s, col("v").eq(lit(0.5)).or(&col("v").gt_eq(lit(8.0))));

    let f32s: Vec<f32> = f64s.iter().map(|&v| v as f32).collect();
    check(&f32s, col("v").gt(lit(1.5)));
    check(&f32s, col("v").not_eq(lit(-4)));
    check(&f32s, col("v").lt(lit(0.1)));
}

#[test]
fn bit_exact_sample() {
    let values: [i64; 13] = [0, 4, 2, 4, 4, 5, 4, 7, 4, 9, 12, 4, 3];
    let array = Array::from_slice(&values);
    let expr = col("v").eq(lit(4)).and(&col("v").gt_eq(lit(3)));
    let bits = kernel_bits(&array, &expr, JitConfig::default());
    let expected: Vec<bool> = values.iter().map(|&v| v == 4).collect();
    assert_eq!(bits, expected);
}

#[test]
fn unsigned_comparisons_are_unsigned() {
    let values: [u8; 8] = [0, 100, 127, 128, 200, 255, 1, 129];
    let array = Array::from_slice(&values);
    let bits = kernel_bits(&array, &col("v").gt(lit(100)), JitConfig::default());
    assert_eq!(bits, [false, false, true, true, true, true, false, true]);

    let values = [u64::MAX, 0, 1 << 63, 5, 6, 7, 8, 9, 10];
    check(&values, col("v").gt(lit(5)));
    check(&values, col("v").lt(lit(i64::MAX)));
}

#[test]
fn literals_above_i64_max() {
    let values = [u64::MAX, 0, 1 << 63, (1 << 63) + 1, u64::MAX - 1, 5, 7, 9, 11];
    let array = Array::from_slice(&values);
    let bits = kernel_bits(&array, &col("v").gt_eq(lit(1u64 << 63)), JitConfig::default());
    assert_eq!(bits, [true, false, true, true, true, false, false, false, false]);
    check(&values, col("v").eq(lit(u64::MAX)));
    check(&values, col("v").lt(lit(u64::MAX - 1)));

    let signed: Vec<i64> = vec![i64::MIN, -1, 0, 1, i64::MAX, 3, 4, 5, 6];
    check(&signed, col("v").lt(lit(u64::MAX)));
    check(&signed, col("v").gt(lit(u64::MAX)));
}

#[test]
fn signed_comparisons_are_signed() {
    let values: [i8; 9] = [-128, -1, 0, 1, 127, -50, 50, -2, 2];
    let array = Array::from_slice(&values);
    let bits = kernel_bits(&array, &col("v").lt(lit(0)), JitConfig::default());
    assert_eq!(bits, [true, true, false, false, false, true, false, true, false]);
    check(&values, col("v").gt_eq(lit(-1)));
}

#[test]
fn nan_fails_every_comparison() {
    let values = [f32::NAN, 1.0, 2.0, f32::NAN, 3.0, 1.0, f32::INFINITY, f32::NEG_INFINITY];
    let array = Array::from_slice(&values);
    let bits = kernel_bits(&array, &col("v").not_eq(lit(1.0)), JitConfig::default());
    assert_eq!(bits, [false, false, true, false, true, false, true, true]);
    check(&values, col("v").lt(lit(2.5)));
    check(&values.map(f64::from), col("v").gt_eq(lit(1)));
}

#[test]
fn half_precision_values() {
    let values: Vec<F16> = [
        0x0000u16, // +0
        0x8000,    // -0
        0x0001,    // smallest subnormal
        0x83ff,    // negative subnormal
        0x3c00,    // 1.0
        0x3800,    // 0.5
        0xc000,    // -2.0
        0x7bff,    // 65504
        0x7c00,    // +inf
        0xfc00,    // -inf
        0x7e00,    // NaN
        0x3555,    // ~0.333
    ]
    .into_iter()
    .map(F16::from_bits)
    .collect();

    check(&values, col("v").gt(lit(0.0)));
    check(&values, col("v").lt(lit(0)));
    check(&values, col("v").eq(lit(0.5)));
    check(&values, col("v").not_eq(lit(1)));
    check(&values, col("v").gt_eq(lit(65504)));
    check(&values, col("v").lt_eq(lit(0.3333)));

    let array = Array::from_slice(&values);
    let bits = kernel_bits(&array, &col("v").gt(lit(0.0)), JitConfig::default());
    assert_eq!(
        bits,
        [false, false, true, false, true, true, false, true, true, false, false, true]
    );
}

#[test]
fn out_of_range_literals_fold() {
    let values: Vec<u8> = (0..=255).step_by(17).collect();
    let array = Array::from_slice(&values);
    let none = vec![false; values.len()];
    let all = vec![true; values.len()];
    assert_eq!(kernel_bits(&array, &col("v").gt(lit(300)), JitConfig::default()), none);
    assert_eq!(kernel_bits(&array, &col("v").lt_eq(lit(300)), JitConfig::default()), all);
    assert_eq!(kernel_bits(&array, &col("v").not_eq(lit(-1)), JitConfig::default()), all);
    assert_eq!(kernel_bits(&array, &col("v").eq(lit(-1)), JitConfig::default()), none);

    let values: Vec<i16> = vec![-32768, 0, 32767, 5, -5, 100, -100, 7, 9];
    check(&values, col("v").not_eq(lit(40000)));
    check(&values, col("v").gt(lit(-40000)));
}

#[test]
fn foreign_columns_take_the_neutral_value() {
    let values: Vec<i32> = (-12..13).collect();
    let array = Array::from_slice(&values);
    let run = |expr: BooleanExpr| kernel_bits(&array, &expr, JitConfig::default());
    let expect = |f: fn(i32) -> bool| values.iter().map(|&v| f(v)).collect::<Vec<_>>();

    // Root-level AND with a foreign leaf.
    let e = col("v").gt(lit(1)).and(&col("b").lt(lit(3)));
    assert_eq!(run(e), expect(|v| v > 1));

    // Foreign leaf directly under OR.
    let e = col("v").lt(lit(-3)).or(&col("b").gt(lit(0)));
    assert_eq!(run(e), expect(|v| v < -3));

    // A foreign OR subtree under AND collapses to true.
    let foreign = col("b").lt(lit(3)).or(&col("c").gt(lit(1)));
    let e = foreign.and(&col("v").gt_eq(lit(0)).and(&col("v").lt(lit(4)).or(&col("v").gt(lit(8)))));
    assert_eq!(run(e), expect(|v| v >= 0 && (v < 4 || v > 8)));

    // A foreign AND subtree under OR collapses to false.
    let foreign = col("b").gt(lit(1)).and(&col("c").lt(lit(2)));
    let e = col("v").lt(lit(0)).or(&foreign).or(&col("v").gt(lit(10)));
    assert_eq!(run(e), expect(|v| v < 0 || v > 10));

    // Three levels, alternating operators, foreign leaves at every level.
    let inner = col("v").eq(lit(2)).or(&col("c").eq(lit(9)));
    let middle = inner.and(&col("b").gt(lit(0))).or(&col("v").eq(lit(-7)));
    let e = middle.and(&col("d").lt(lit(1))).and(&col("v").not_eq(lit(-7)).or(&col("e").eq(lit(0))));
    assert_eq!(run(e), expect(|v| v == 2));
}

#[test]
fn incompatible_literals_rejected_at_compile_time() {
    let field = Field::new("v", sift_types::PhysicalType::Int32);
    for expr in [col("v").eq(lit(1.5)), col("v").eq(lit("x")), col("v").eq(lit(true))] {
        assert!(matches!(
            FilterKernel::validate(&field, &expr),
            Err(SiftError::InvalidPredicate(_))
        ));
        let mut kernel = FilterKernel::new(field.clone(), expr, JitConfig::default());
        assert!(kernel.compile(session()).is_err());
        assert!(!kernel.is_compiled());
    }
}
