//! Per-field compiled filter kernel.
//!
//! A kernel is created for one field and one predicate tree, compiled once,
//! then run over every chunk of that field's column. Bits are packed MSB
//! first: value `j` of a group of eight lands in bit `7 - j`. Kernels only
//! ever clear destination bits, so several kernels can be applied to one
//! all-ones bitmap to obtain the conjunction of their predicates.

use cranelift_codegen::ir::types;
use sift_common::{JitConfig, SiftError, SiftResult};
use sift_expression::BooleanExpr;
use sift_storage::Array;
use sift_types::Field;
use tracing::{debug, warn};

use super::emit::{PredicateEmitter, define_filter, define_filter_remaining, define_predicate};
use super::session::{JitSession, ModuleHandle};

type FilterFn = unsafe extern "C" fn(*const u8, *mut u8, i64);
type FilterRemainingFn = unsafe extern "C" fn(*const u8, *mut u8, i64, i64);

enum KernelState<'s> {
    Uninitialized,
    Compiled {
        session: &'s JitSession,
        handle: ModuleHandle,
        filter: FilterFn,
        filter_remaining: FilterRemainingFn,
    },
}

pub struct FilterKernel<'s> {
    field: Field,
    expr: BooleanExpr,
    config: JitConfig,
    state: KernelState<'s>,
}

impl<'s> FilterKernel<'s> {
    pub fn new(field: Field, expr: BooleanExpr, config: JitConfig) -> Self {
        Self {
            field,
            expr,
            config,
            state: KernelState::Uninitialized,
        }
    }

    /// Check that a kernel for `field` could be compiled from `expr`, without
    /// emitting any code.
    pub fn validate(field: &Field, expr: &BooleanExpr) -> SiftResult<()> {
        PredicateEmitter::new(field, expr).map(|_| ())
    }

    pub fn field(&self) -> &Field {
        &self.field
    }

    pub fn expr(&self) -> &BooleanExpr {
        &self.expr
    }

    pub fn is_compiled(&self) -> bool {
        matches!(self.state, KernelState::Compiled { .. })
    }

    /// Emit, link and resolve the kernel's functions in `session`.
    pub fn compile(&mut self, session: &'s JitSession) -> SiftResult<()> {
        if self.is_compiled() {
            return Err(SiftError::KernelAlreadyCompiled);
        }
        let emitter = PredicateEmitter::new(&self.field, &self.expr)?;

        let id = session.next_kernel_id();
        let field = &self.field.name;
        let filter_name = format!("filter_{id}_{field}");
        let remaining_name = format!("filter_remaining_{id}_{field}");

        let mut builder = session.new_module(format!("kernel_{id}_{field}"));
        if builder.pointer_type() != types::I64 {
            return Err(SiftError::NotImplemented(format!(
                "filter kernels for {}-bit targets",
                builder.pointer_type().bits()
            )));
        }

        let module = builder.module();
        let predicate = if self.config.inline_predicate {
            None
        } else {
            Some(define_predicate(module, &emitter, &format!("predicate_{id}_{field}"))?)
        };
        let filter = define_filter(module, &emitter, &filter_name, predicate)?;
        let remaining = define_filter_remaining(module, &emitter, &remaining_name, predicate)?;
        builder.export(filter_name.as_str(), filter);
        builder.export(remaining_name.as_str(), remaining);

        let handle = session.add_module(builder)?;
        let resolved = session
            .find_symbol(&filter_name)
            .and_then(|f| Ok((f, session.find_symbol(&remaining_name)?)));
        let (filter_ptr, remaining_ptr) = match resolved {
            Ok(ptrs) => ptrs,
            Err(e) => {
                session.remove_module(handle)?;
                return Err(e);
            }
        };

        // SAFETY: both symbols were just defined with exactly these signatures
        // and stay mapped until `remove_module` runs in `Drop`.
        let (filter, filter_remaining) = unsafe {
            (
                std::mem::transmute::<*const u8, FilterFn>(filter_ptr),
                std::mem::transmute::<*const u8, FilterRemainingFn>(remaining_ptr),
            )
        };

        debug!(
            field = %field,
            data_type = %self.field.data_type,
            filter = %filter_name,
            inline = self.config.inline_predicate,
            "compiled filter kernel"
        );
        self.state = KernelState::Compiled {
            session,
            handle,
            filter,
            filter_remaining,
        };
        Ok(())
    }

    fn functions(&self) -> SiftResult<(FilterFn, FilterRemainingFn)> {
        match &self.state {
            KernelState::Compiled {
                filter,
                filter_remaining,
                ..
            } => Ok((*filter, *filter_remaining)),
            KernelState::Uninitialized => Err(SiftError::KernelNotCompiled),
        }
    }

    /// Byte width of one value of `chunk`, after checking it matches the field.
    fn check_chunk(&self, chunk: &Array) -> SiftResult<usize> {
        let ty = chunk.data_type();
        let width = ty
            .fixed_size()
            .ok_or_else(|| SiftError::NotImplemented(format!("filtering {ty} columns")))?;
        if ty != self.field.data_type {
            return Err(SiftError::Schema(format!(
                "kernel for '{}' ({}) given a {ty} chunk",
                self.field.name, self.field.data_type
            )));
        }
        Ok(width)
    }

    /// Bulk pass over `chunk[offset..]`.
    ///
    /// Processes `(len - offset) / 8` whole groups. With a nonzero `offset`
    /// the first byte of `bitmap` is skipped: it is shared with the previous
    /// chunk and fixed up by [`execute_remaining`](Self::execute_remaining).
    pub fn execute(&self, chunk: &Array, bitmap: &mut [u8], offset: usize) -> SiftResult<()> {
        self.functions()?;
        self.check_chunk(chunk)?;
        let (groups, skip) = bulk_extent(chunk.len(), offset);
        if groups == 0 {
            return Ok(());
        }
        if skip + groups > bitmap.len() {
            return Err(SiftError::Runtime(format!(
                "bitmap of {} bytes cannot hold {groups} groups at skip {skip}",
                bitmap.len()
            )));
        }
        // SAFETY: the bounds check above covers every byte the bulk pass writes.
        unsafe { self.execute_raw(chunk, bitmap.as_mut_ptr(), offset) }
    }

    /// [`execute`](Self::execute) on a raw destination.
    ///
    /// # Safety
    ///
    /// `dst` must be valid for writes of `(offset != 0) + (len - offset) / 8`
    /// bytes, and no other thread may access those bytes during the call.
    pub(crate) unsafe fn execute_raw(
        &self,
        chunk: &Array,
        dst: *mut u8,
        offset: usize,
    ) -> SiftResult<()> {
        let (filter, _) = self.functions()?;
        let width = self.check_chunk(chunk)?;
        let (groups, skip) = bulk_extent(chunk.len(), offset);
        if groups == 0 {
            return Ok(());
        }
        // SAFETY: the chunk holds `len * width` value bytes and the kernel
        // reads `groups * 8` values starting at `offset`; the caller vouches
        // for `dst`.
        unsafe {
            filter(
                chunk.values().as_ptr().add(width * offset),
                dst.add(skip),
                (groups * 8) as i64,
            );
        }
        Ok(())
    }

    /// Boundary pass into a single byte.
    ///
    /// With `array_offset == 0` this is the chunk head and covers
    /// `min(8 - bit_offset, len)` values; otherwise it is the tail and covers
    /// `chunk[array_offset..]`. Bits of failing values are cleared starting at
    /// bit `7 - bit_offset`; no bit is ever set.
    pub fn execute_remaining(
        &self,
        chunk: &Array,
        byte: &mut u8,
        array_offset: usize,
        bit_offset: u8,
    ) -> SiftResult<()> {
        let (_, filter_remaining) = self.functions()?;
        let width = self.check_chunk(chunk)?;
        let len = chunk.len();
        let bit_offset = usize::from(bit_offset);
        let count = if array_offset == 0 {
            8usize.saturating_sub(bit_offset).min(len)
        } else {
            len.saturating_sub(array_offset)
        };
        if count + bit_offset > 8 {
            return Err(SiftError::Runtime(format!(
                "{count} values at bit offset {bit_offset} overflow one byte"
            )));
        }
        if count == 0 {
            return Ok(());
        }
        // SAFETY: `array_offset + count <= len`, and `byte` is a live exclusive
        // reference.
        unsafe {
            filter_remaining(
                chunk.values().as_ptr().add(width * array_offset),
                byte as *mut u8,
                count as i64,
                bit_offset as i64,
            );
        }
        Ok(())
    }
}

/// Whole groups processed by the bulk pass, and the number of leading
/// destination bytes it skips.
fn bulk_extent(len: usize, offset: usize) -> (usize, usize) {
    if offset >= len {
        return (0, usize::from(offset != 0));
    }
    ((len - offset) / 8, usize::from(offset != 0))
}

impl Drop for FilterKernel<'_> {
    fn drop(&mut self) {
        if let KernelState::Compiled {
            session, handle, ..
        } = self.state
        {
            if let Err(e) = session.remove_module(handle) {
                warn!(field = %self.field.name, error = %e, "failed to unload filter kernel");
            }
        }
    }
}

impl std::fmt::Debug for FilterKernel<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FilterKernel")
            .field("field", &self.field)
            .field("expr", &self.expr.to_string())
            .field("compiled", &self.is_compiled())
            .finish()
    }
}
