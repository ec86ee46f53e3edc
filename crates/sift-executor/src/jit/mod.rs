//! Native code generation for filter predicates.
//!
//! A [`FilterKernel`] lowers one predicate for one column into a small module
//! of Cranelift functions. Modules are linked and owned by the process-wide
//! [`JitSession`].

mod emit;
pub mod kernel;
mod lowering;
pub mod session;

pub use kernel::FilterKernel;
pub use session::{JitSession, ModuleBuilder, ModuleHandle};
