//! Physical type and literal lowering for filter kernels.

use cranelift_codegen::ir::condcodes::{FloatCC, IntCC};
use cranelift_codegen::ir::{InstBuilder, MemFlags, Type, Value, types};
use cranelift_frontend::FunctionBuilder;
use sift_common::{SiftError, SiftResult};
use sift_expression::CompareOp;
use sift_types::{LiteralValue, PhysicalType};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum ScalarKind {
    Signed,
    Unsigned,
    Float,
}

/// How one physical column type is loaded and compared in native code.
#[derive(Clone, Copy, Debug)]
pub(crate) struct ScalarLowering {
    pub physical: PhysicalType,
    /// Type of one value in memory.
    pub storage: Type,
    /// Type comparisons are performed in.
    pub compute: Type,
    pub kind: ScalarKind,
    /// Bytes per value.
    pub width: usize,
}

/// A literal converted for one comparison.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) enum LoweredLiteral {
    /// Integer immediate, zero-extended from the compute type's width.
    Int(i64),
    F32(f32),
    F64(f64),
    /// Comparison folded because the literal lies outside the column's range.
    AlwaysTrue,
    AlwaysFalse,
}

/// Buffers handed to kernels carry no alignment guarantee.
pub(crate) fn mem_flags() -> MemFlags {
    let mut flags = MemFlags::new();
    flags.set_notrap();
    flags
}

impl ScalarLowering {
    pub fn for_type(ty: PhysicalType) -> SiftResult<Self> {
        use ScalarKind::*;
        let (storage, compute, kind) = match ty {
            PhysicalType::Int8 => (types::I8, types::I8, Signed),
            PhysicalType::Int16 => (types::I16, types::I16, Signed),
            PhysicalType::Int32 => (types::I32, types::I32, Signed),
            PhysicalType::Int64 => (types::I64, types::I64, Signed),
            PhysicalType::UInt8 => (types::I8, types::I8, Unsigned),
            PhysicalType::UInt16 => (types::I16, types::I16, Unsigned),
            PhysicalType::UInt32 => (types::I32, types::I32, Unsigned),
            PhysicalType::UInt64 => (types::I64, types::I64, Unsigned),
            PhysicalType::Float16 => (types::I16, types::F32, Float),
            PhysicalType::Float32 => (types::F32, types::F32, Float),
            PhysicalType::Float64 => (types::F64, types::F64, Float),
            PhysicalType::Bool
            | PhysicalType::Decimal128
            | PhysicalType::Utf8
            | PhysicalType::List
            | PhysicalType::Struct => {
                return Err(SiftError::NotImplemented(format!(
                    "filter kernels for {ty} columns"
                )));
            }
        };
        Ok(Self {
            physical: ty,
            storage,
            compute,
            kind,
            width: storage.bytes() as usize,
        })
    }

    /// Inclusive value range of an integer column.
    fn int_range(&self) -> (i128, i128) {
        let bits = self.compute.bits();
        match self.kind {
            ScalarKind::Signed => (-(1i128 << (bits - 1)), (1i128 << (bits - 1)) - 1),
            ScalarKind::Unsigned | ScalarKind::Float => (0, (1i128 << bits) - 1),
        }
    }

    pub fn lower_literal(&self, op: CompareOp, literal: &LiteralValue) -> SiftResult<LoweredLiteral> {
        match (self.kind, literal) {
            (ScalarKind::Float, LiteralValue::Int(v)) => Ok(self.float_literal(*v as f64)),
            (ScalarKind::Float, LiteralValue::UInt(v)) => Ok(self.float_literal(*v as f64)),
            (ScalarKind::Float, LiteralValue::Float(v)) => Ok(self.float_literal(*v)),
            (
                ScalarKind::Signed | ScalarKind::Unsigned,
                LiteralValue::Int(_) | LiteralValue::UInt(_),
            ) => {
                let (min, max) = self.int_range();
                let Some(v) = literal.as_i128() else {
                    return Err(SiftError::Unreachable(format!("integer literal {literal}")));
                };
                if v > max {
                    Ok(fold(matches!(op, CompareOp::Lt | CompareOp::Le | CompareOp::Neq)))
                } else if v < min {
                    Ok(fold(matches!(op, CompareOp::Gt | CompareOp::Ge | CompareOp::Neq)))
                } else {
                    Ok(LoweredLiteral::Int((v & max_unsigned(self.compute.bits())) as i64))
                }
            }
            (_, other) => Err(SiftError::InvalidPredicate(format!(
                "cannot compare {} column with {} literal {other}",
                self.physical,
                other.type_name()
            ))),
        }
    }

    fn float_literal(&self, v: f64) -> LoweredLiteral {
        if self.compute == types::F64 {
            LoweredLiteral::F64(v)
        } else {
            LoweredLiteral::F32(v as f32)
        }
    }

    /// Convert a loaded storage value to the compute type.
    pub fn widen(&self, builder: &mut FunctionBuilder<'_>, raw: Value) -> Value {
        match self.physical {
            PhysicalType::Float16 => f16_to_f32(builder, raw),
            _ => raw,
        }
    }

    /// `value <op> literal` as an `i8` holding 0 or 1.
    pub fn emit_compare(
        &self,
        builder: &mut FunctionBuilder<'_>,
        op: CompareOp,
        value: Value,
        literal: LoweredLiteral,
    ) -> Value {
        match literal {
            LoweredLiteral::AlwaysTrue => builder.ins().iconst(types::I8, 1),
            LoweredLiteral::AlwaysFalse => builder.ins().iconst(types::I8, 0),
            LoweredLiteral::Int(imm) => {
                let rhs = builder.ins().iconst(self.compute, imm);
                builder.ins().icmp(self.int_cc(op), value, rhs)
            }
            LoweredLiteral::F32(imm) => {
                let rhs = builder.ins().f32const(imm);
                builder.ins().fcmp(float_cc(op), value, rhs)
            }
            LoweredLiteral::F64(imm) => {
                let rhs = builder.ins().f64const(imm);
                builder.ins().fcmp(float_cc(op), value, rhs)
            }
        }
    }

    fn int_cc(&self, op: CompareOp) -> IntCC {
        let signed = self.kind == ScalarKind::Signed;
        match op {
            CompareOp::Eq => IntCC::Equal,
            CompareOp::Neq => IntCC::NotEqual,
            CompareOp::Gt if signed => IntCC::SignedGreaterThan,
            CompareOp::Gt => IntCC::UnsignedGreaterThan,
            CompareOp::Lt if signed => IntCC::SignedLessThan,
            CompareOp::Lt => IntCC::UnsignedLessThan,
            CompareOp::Ge if signed => IntCC::SignedGreaterThanOrEqual,
            CompareOp::Ge => IntCC::UnsignedGreaterThanOrEqual,
            CompareOp::Le if signed => IntCC::SignedLessThanOrEqual,
            CompareOp::Le => IntCC::UnsignedLessThanOrEqual,
        }
    }
}

fn fold(result: bool) -> LoweredLiteral {
    if result {
        LoweredLiteral::AlwaysTrue
    } else {
        LoweredLiteral::AlwaysFalse
    }
}

fn max_unsigned(bits: u32) -> i128 {
    (1i128 << bits) - 1
}

/// Ordered comparisons: anything against NaN is false, `!=` included.
fn float_cc(op: CompareOp) -> FloatCC {
    match op {
        CompareOp::Gt => FloatCC::GreaterThan,
        CompareOp::Lt => FloatCC::LessThan,
        CompareOp::Ge => FloatCC::GreaterThanOrEqual,
        CompareOp::Le => FloatCC::LessThanOrEqual,
        CompareOp::Eq => FloatCC::Equal,
        CompareOp::Neq => FloatCC::OrderedNotEqual,
    }
}

/// Widen IEEE binary16 bits (`i16`) to an `f32`, exactly.
fn f16_to_f32(builder: &mut FunctionBuilder<'_>, raw: Value) -> Value {
    let h = builder.ins().uextend(types::I32, raw);

    let sign = builder.ins().band_imm(h, 0x8000);
    let sign = builder.ins().ishl_imm(sign, 16);
    let exp = builder.ins().ushr_imm(h, 10);
    let exp = builder.ins().band_imm(exp, 0x1f);
    let mant = builder.ins().band_imm(h, 0x3ff);
    let mant_bits = builder.ins().ishl_imm(mant, 13);

    // Normal numbers: rebias the exponent from 15 to 127.
    let rebiased = builder.ins().iadd_imm(exp, 112);
    let rebiased = builder.ins().ishl_imm(rebiased, 23);
    let normal = builder.ins().bor(sign, rebiased);
    let normal = builder.ins().bor(normal, mant_bits);

    // Infinity and NaN keep their payload.
    let special = builder.ins().bor(sign, mant_bits);
    let special = builder.ins().bor_imm(special, 0x7f80_0000);

    let is_special = builder.ins().icmp_imm(IntCC::Equal, exp, 31);
    let bits = builder.ins().select(is_special, special, normal);
    let widened = builder.ins().bitcast(types::F32, MemFlags::new(), bits);

    // Subnormals and zero: mant * 2^-24 with the sign applied.
    let sub = builder.ins().fcvt_from_uint(types::F32, mant);
    let scale = builder.ins().f32const(f32::from_bits(0x3380_0000));
    let sub = builder.ins().fmul(sub, scale);
    let neg = builder.ins().fneg(sub);
    let negative = builder.ins().icmp_imm(IntCC::NotEqual, sign, 0);
    let sub = builder.ins().select(negative, neg, sub);

    let is_sub = builder.ins().icmp_imm(IntCC::Equal, exp, 0);
    builder.ins().select(is_sub, sub, widened)
}
