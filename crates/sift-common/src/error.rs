use thiserror::Error;

/// Top-level error type for the sift engine.
///
/// Every fallible operation in the workspace returns [`SiftResult`]. The
/// variants map to the layer that detected the problem.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SiftError {
    /// A type, operation or storage layout the engine deliberately does not handle.
    #[error("not implemented: {0}")]
    NotImplemented(String),

    #[error("filter kernel has not been compiled")]
    KernelNotCompiled,

    #[error("filter kernel is already compiled")]
    KernelAlreadyCompiled,

    /// Predicate rejected before any code is emitted.
    #[error("invalid predicate: {0}")]
    InvalidPredicate(String),

    #[error("column not found: {0}")]
    ColumnNotFound(String),

    #[error("schema error: {0}")]
    Schema(String),

    /// Native code generation, linking or symbol resolution failed.
    #[error("jit error: {0}")]
    Jit(String),

    #[error("runtime error: {0}")]
    Runtime(String),

    /// An internal invariant was violated. Callers should treat this as a defect.
    #[error("unreachable: {0}")]
    Unreachable(String),
}

pub type SiftResult<T> = Result<T, SiftError>;
