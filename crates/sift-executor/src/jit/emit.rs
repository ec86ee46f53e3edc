//! IR emission for the three kernel functions.
//!
//! * `predicate(value) -> i8`, only emitted when calls are not inlined
//! * `filter(src, dst, len)`, bulk pass over whole groups of eight values
//! * `filter_remaining(src, dst, len, bit_offset)`, clears bits of one byte

use cranelift_codegen::ir::condcodes::IntCC;
use cranelift_codegen::ir::{AbiParam, FuncRef, InstBuilder, Value, types};
use cranelift_frontend::{FunctionBuilder, FunctionBuilderContext};
use cranelift_jit::JITModule;
use std::sync::Arc;

use cranelift_module::{FuncId, Linkage, Module};
use hashbrown::HashMap;
use sift_common::{SiftError, SiftResult};
use sift_expression::{BooleanExpr, PredicateExpr, PredicateOp};
use sift_types::Field;

use super::lowering::{ScalarLowering, mem_flags};

fn jit_err(e: impl std::fmt::Display) -> SiftError {
    SiftError::Jit(e.to_string())
}

/// Lowers a predicate tree restricted to one field into straight-line IR.
///
/// Comparisons on other columns become the neutral element of their nearest
/// enclosing AND/OR (`true` at the root). A whole AND/OR subtree that touches
/// other columns but never this field collapses to one neutral constant.
pub(crate) struct PredicateEmitter<'a> {
    field: &'a Field,
    expr: &'a BooleanExpr,
    lowering: ScalarLowering,
    /// Relevance of every AND/OR node, keyed by node address.
    relevance: HashMap<usize, Relevance>,
}

/// Which columns a subtree compares.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Relevance {
    /// At least one comparison on the kernel's field.
    Field,
    /// Only comparisons on other columns.
    Foreign,
    /// No comparisons at all.
    Constant,
}

impl Relevance {
    fn combine(self, other: Self) -> Self {
        use Relevance::*;
        match (self, other) {
            (Field, _) | (_, Field) => Field,
            (Foreign, _) | (_, Foreign) => Foreign,
            (Constant, Constant) => Constant,
        }
    }
}

fn node_key(p: &Arc<PredicateExpr>) -> usize {
    Arc::as_ptr(p) as usize
}

/// Post-order pass recording the relevance of every AND/OR node once.
fn classify(field: &str, expr: &BooleanExpr, memo: &mut HashMap<usize, Relevance>) -> Relevance {
    match expr {
        BooleanExpr::Compare(c) if c.lhs.name.as_str() == field => Relevance::Field,
        BooleanExpr::Compare(_) => Relevance::Foreign,
        BooleanExpr::Const(_) => Relevance::Constant,
        BooleanExpr::Predicate(p) => {
            if let Some(&known) = memo.get(&node_key(p)) {
                return known;
            }
            let relevance = classify(field, &p.lhs, memo).combine(classify(field, &p.rhs, memo));
            memo.insert(node_key(p), relevance);
            relevance
        }
    }
}

impl<'a> PredicateEmitter<'a> {
    /// Resolve the field's type and check every literal compared against it.
    pub fn new(field: &'a Field, expr: &'a BooleanExpr) -> SiftResult<Self> {
        let lowering = ScalarLowering::for_type(field.data_type)?;
        let mut relevance = HashMap::new();
        classify(&field.name, expr, &mut relevance);
        let emitter = Self {
            field,
            expr,
            lowering,
            relevance,
        };
        emitter.check_literals(expr)?;
        Ok(emitter)
    }

    pub fn lowering(&self) -> &ScalarLowering {
        &self.lowering
    }

    fn check_literals(&self, expr: &BooleanExpr) -> SiftResult<()> {
        match expr {
            BooleanExpr::Compare(c) if c.lhs.name == self.field.name => {
                self.lowering.lower_literal(c.op, &c.rhs.value).map(|_| ())
            }
            BooleanExpr::Compare(_) | BooleanExpr::Const(_) => Ok(()),
            BooleanExpr::Predicate(p) => {
                self.check_literals(&p.lhs)?;
                self.check_literals(&p.rhs)
            }
        }
    }

    /// Evaluate the predicate on a raw storage value.
    pub fn emit(&self, builder: &mut FunctionBuilder<'_>, raw: Value) -> SiftResult<Value> {
        let value = self.lowering.widen(builder, raw);
        self.emit_node(builder, value, self.expr, PredicateOp::And)
    }

    fn emit_node(
        &self,
        builder: &mut FunctionBuilder<'_>,
        value: Value,
        expr: &BooleanExpr,
        enclosing: PredicateOp,
    ) -> SiftResult<Value> {
        match expr {
            BooleanExpr::Compare(c) if c.lhs.name == self.field.name => {
                let literal = self.lowering.lower_literal(c.op, &c.rhs.value)?;
                Ok(self.lowering.emit_compare(builder, c.op, value, literal))
            }
            BooleanExpr::Compare(_) => Ok(neutral(builder, enclosing)),
            BooleanExpr::Const(c) => Ok(builder.ins().iconst(types::I8, i64::from(c.value))),
            BooleanExpr::Predicate(p) if self.relevance_of(p) == Relevance::Foreign => {
                Ok(neutral(builder, enclosing))
            }
            BooleanExpr::Predicate(p) => {
                let lhs = self.emit_node(builder, value, &p.lhs, p.op)?;
                let rhs = self.emit_node(builder, value, &p.rhs, p.op)?;
                Ok(match p.op {
                    PredicateOp::And => builder.ins().band(lhs, rhs),
                    PredicateOp::Or => builder.ins().bor(lhs, rhs),
                })
            }
        }
    }

    fn relevance_of(&self, p: &Arc<PredicateExpr>) -> Relevance {
        self.relevance
            .get(&node_key(p))
            .copied()
            .unwrap_or(Relevance::Field)
    }
}

fn neutral(builder: &mut FunctionBuilder<'_>, enclosing: PredicateOp) -> Value {
    builder.ins().iconst(types::I8, i64::from(enclosing.identity()))
}

/// Produces the predicate bit for the value at `addr + offset`.
enum PredicateSource<'e, 'a> {
    Inline(&'e PredicateEmitter<'a>),
    Call(&'e PredicateEmitter<'a>, FuncRef),
}

impl PredicateSource<'_, '_> {
    fn eval(&self, builder: &mut FunctionBuilder<'_>, addr: Value, offset: i32) -> SiftResult<Value> {
        match self {
            Self::Inline(emitter) => {
                let raw = builder
                    .ins()
                    .load(emitter.lowering().storage, mem_flags(), addr, offset);
                emitter.emit(builder, raw)
            }
            Self::Call(emitter, func) => {
                let raw = builder
                    .ins()
                    .load(emitter.lowering().storage, mem_flags(), addr, offset);
                let call = builder.ins().call(*func, &[raw]);
                Ok(builder.inst_results(call)[0])
            }
        }
    }
}

fn predicate_source<'e, 'a>(
    module: &mut JITModule,
    builder: &mut FunctionBuilder<'_>,
    emitter: &'e PredicateEmitter<'a>,
    predicate: Option<FuncId>,
) -> PredicateSource<'e, 'a> {
    match predicate {
        Some(id) => PredicateSource::Call(emitter, module.declare_func_in_func(id, builder.func)),
        None => PredicateSource::Inline(emitter),
    }
}

/// `predicate(value: storage) -> i8`, module-local.
pub(crate) fn define_predicate(
    module: &mut JITModule,
    emitter: &PredicateEmitter<'_>,
    name: &str,
) -> SiftResult<FuncId> {
    let mut ctx = module.make_context();
    ctx.func
        .signature
        .params
        .push(AbiParam::new(emitter.lowering().storage));
    ctx.func.signature.returns.push(AbiParam::new(types::I8));
    let id = module
        .declare_function(name, Linkage::Local, &ctx.func.signature)
        .map_err(jit_err)?;

    let mut fctx = FunctionBuilderContext::new();
    {
        let mut builder = FunctionBuilder::new(&mut ctx.func, &mut fctx);
        let entry = builder.create_block();
        builder.append_block_params_for_function_params(entry);
        builder.switch_to_block(entry);
        let raw = builder.block_params(entry)[0];
        let bit = emitter.emit(&mut builder, raw)?;
        builder.ins().return_(&[bit]);
        builder.seal_all_blocks();
        builder.finalize();
    }
    module.define_function(id, &mut ctx).map_err(jit_err)?;
    module.clear_context(&mut ctx);
    Ok(id)
}

/// `filter(src, dst, len)`.
///
/// For every whole group of eight values, packs the predicate bits MSB-first
/// into one byte and ANDs it into `dst[group]`. `len` is in values; a trailing
/// partial group is ignored.
pub(crate) fn define_filter(
    module: &mut JITModule,
    emitter: &PredicateEmitter<'_>,
    name: &str,
    predicate: Option<FuncId>,
) -> SiftResult<FuncId> {
    let ptr = module.target_config().pointer_type();
    let width = emitter.lowering().width as i64;

    let mut ctx = module.make_context();
    let sig = &mut ctx.func.signature;
    sig.params.push(AbiParam::new(ptr));
    sig.params.push(AbiParam::new(ptr));
    sig.params.push(AbiParam::new(types::I64));
    let id = module
        .declare_function(name, Linkage::Export, &ctx.func.signature)
        .map_err(jit_err)?;

    let mut fctx = FunctionBuilderContext::new();
    {
        let mut builder = FunctionBuilder::new(&mut ctx.func, &mut fctx);
        let predicate = predicate_source(module, &mut builder, emitter, predicate);

        let entry = builder.create_block();
        let header = builder.create_block();
        let body = builder.create_block();
        let exit = builder.create_block();

        builder.append_block_params_for_function_params(entry);
        builder.switch_to_block(entry);
        let src = builder.block_params(entry)[0];
        let dst = builder.block_params(entry)[1];
        let len = builder.block_params(entry)[2];
        let groups = builder.ins().sshr_imm(len, 3);
        let group = builder.declare_var(types::I64);
        let zero = builder.ins().iconst(types::I64, 0);
        builder.def_var(group, zero);
        builder.ins().jump(header, &[]);

        builder.switch_to_block(header);
        let i = builder.use_var(group);
        let more = builder.ins().icmp(IntCC::SignedLessThan, i, groups);
        builder.ins().brif(more, body, &[], exit, &[]);

        builder.switch_to_block(body);
        let i = builder.use_var(group);
        let stride = builder.ins().imul_imm(i, 8 * width);
        let base = builder.ins().iadd(src, stride);
        let mut packed = builder.ins().iconst(types::I8, 0);
        for j in 0..8i64 {
            let bit = predicate.eval(&mut builder, base, (j * width) as i32)?;
            let bit = builder.ins().ishl_imm(bit, 7 - j);
            packed = builder.ins().bor(packed, bit);
        }
        let out = builder.ins().iadd(dst, i);
        let old = builder.ins().load(types::I8, mem_flags(), out, 0);
        let new = builder.ins().band(old, packed);
        builder.ins().store(mem_flags(), new, out, 0);
        let next = builder.ins().iadd_imm(i, 1);
        builder.def_var(group, next);
        builder.ins().jump(header, &[]);

        builder.switch_to_block(exit);
        builder.ins().return_(&[]);
        builder.seal_all_blocks();
        builder.finalize();
    }
    module.define_function(id, &mut ctx).map_err(jit_err)?;
    module.clear_context(&mut ctx);
    Ok(id)
}

/// `filter_remaining(src, dst, len, bit_offset)`.
///
/// Evaluates `len` values and clears bit `7 - i - bit_offset` of `*dst` for
/// every value `i` that fails. Never sets a bit.
pub(crate) fn define_filter_remaining(
    module: &mut JITModule,
    emitter: &PredicateEmitter<'_>,
    name: &str,
    predicate: Option<FuncId>,
) -> SiftResult<FuncId> {
    let ptr = module.target_config().pointer_type();
    let width = emitter.lowering().width as i64;

    let mut ctx = module.make_context();
    let sig = &mut ctx.func.signature;
    sig.params.push(AbiParam::new(ptr));
    sig.params.push(AbiParam::new(ptr));
    sig.params.push(AbiParam::new(types::I64));
    sig.params.push(AbiParam::new(types::I64));
    let id = module
        .declare_function(name, Linkage::Export, &ctx.func.signature)
        .map_err(jit_err)?;

    let mut fctx = FunctionBuilderContext::new();
    {
        let mut builder = FunctionBuilder::new(&mut ctx.func, &mut fctx);
        let predicate = predicate_source(module, &mut builder, emitter, predicate);

        let entry = builder.create_block();
        let header = builder.create_block();
        let body = builder.create_block();
        let exit = builder.create_block();

        builder.append_block_params_for_function_params(entry);
        builder.switch_to_block(entry);
        let src = builder.block_params(entry)[0];
        let dst = builder.block_params(entry)[1];
        let len = builder.block_params(entry)[2];
        let bit_offset = builder.block_params(entry)[3];
        let index = builder.declare_var(types::I64);
        let keep = builder.declare_var(types::I8);
        let zero = builder.ins().iconst(types::I64, 0);
        let all = builder.ins().iconst(types::I8, 0xff);
        builder.def_var(index, zero);
        builder.def_var(keep, all);
        builder.ins().jump(header, &[]);

        builder.switch_to_block(header);
        let i = builder.use_var(index);
        let more = builder.ins().icmp(IntCC::SignedLessThan, i, len);
        builder.ins().brif(more, body, &[], exit, &[]);

        builder.switch_to_block(body);
        let i = builder.use_var(index);
        let offset = builder.ins().imul_imm(i, width);
        let addr = builder.ins().iadd(src, offset);
        let bit = predicate.eval(&mut builder, addr, 0)?;
        let fail = builder.ins().bxor_imm(bit, 1);
        let seven = builder.ins().iconst(types::I64, 7);
        let shift = builder.ins().isub(seven, i);
        let shift = builder.ins().isub(shift, bit_offset);
        let shift = builder.ins().ireduce(types::I8, shift);
        let clear = builder.ins().ishl(fail, shift);
        let clear = builder.ins().bnot(clear);
        let kept = builder.use_var(keep);
        let kept = builder.ins().band(kept, clear);
        builder.def_var(keep, kept);
        let next = builder.ins().iadd_imm(i, 1);
        builder.def_var(index, next);
        builder.ins().jump(header, &[]);

        builder.switch_to_block(exit);
        let kept = builder.use_var(keep);
        let old = builder.ins().load(types::I8, mem_flags(), dst, 0);
        let new = builder.ins().band(old, kept);
        builder.ins().store(mem_flags(), new, dst, 0);
        builder.ins().return_(&[]);
        builder.seal_all_blocks();
        builder.finalize();
    }
    module.define_function(id, &mut ctx).map_err(jit_err)?;
    module.clear_context(&mut ctx);
    Ok(id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use sift_expression::{col, lit};
    use sift_types::PhysicalType;

    fn relevance(expr: &BooleanExpr) -> HashMap<usize, Relevance> {
        let mut memo = HashMap::new();
        classify("x", expr, &mut memo);
        memo
    }

    #[test]
    fn classifies_each_node_once() {
        let foreign = col("y").gt(lit(1)).or(&col("z").lt(lit(2)));
        let expr = col("x").gt(lit(0)).and(&foreign);
        let memo = relevance(&expr);
        assert_eq!(memo.len(), 2);
        let BooleanExpr::Predicate(root) = &expr else {
            panic!("expected a predicate root");
        };
        let BooleanExpr::Predicate(rhs) = &root.rhs else {
            panic!("expected a predicate rhs");
        };
        assert_eq!(memo[&node_key(root)], Relevance::Field);
        assert_eq!(memo[&node_key(rhs)], Relevance::Foreign);
    }

    #[test]
    fn constant_subtrees_are_not_foreign() {
        let expr = sift_expression::boolean(true).and(&sift_expression::boolean(false));
        let memo = relevance(&expr);
        assert_eq!(memo.values().copied().collect::<Vec<_>>(), vec![Relevance::Constant]);
    }

    #[test]
    fn deep_chains_are_classified_linearly() {
        let mut expr = col("x").gt(lit(0));
        for i in 0..500 {
            let leaf = if i % 2 == 0 { col("y").lt(lit(i)) } else { col("x").lt(lit(i)) };
            expr = leaf.and(&expr);
        }
        let field = Field::new("x", PhysicalType::Int32);
        let emitter = PredicateEmitter::new(&field, &expr).unwrap();
        assert_eq!(emitter.relevance.len(), 500);
        assert!(emitter.relevance.values().all(|&r| r == Relevance::Field));
    }
}
