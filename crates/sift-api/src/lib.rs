//! sift-api: build filter/projection queries over a table and run them.

pub mod query_compiler;

pub use query_compiler::QueryCompiler;

pub use sift_common::{EngineConfig, JitConfig, OptLevel, SiftError, SiftResult};
pub use sift_expression::{BooleanExpr, boolean, col, lit};
pub use sift_storage::{Array, Bitmap, ChunkedColumn, Table};
pub use sift_types::{Field, PhysicalType, Schema};
