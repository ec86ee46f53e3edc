//! sift-executor: JIT filter kernels, selection bitmaps, plan execution.

pub mod context;
pub mod execute;
pub mod filter;
pub mod jit;
pub mod materialize;
pub mod project;

pub use context::ExecutionContext;
pub use execute::Executor;
pub use jit::{FilterKernel, JitSession, ModuleBuilder, ModuleHandle};
