//! sift-types: physical types, field schemas, literal and scalar values.

pub mod f16;
pub mod native;
pub mod physical_type;
pub mod schema;
pub mod value;

pub use f16::F16;
pub use native::NativeType;
pub use physical_type::PhysicalType;
pub use schema::{Field, Schema};
pub use value::{LiteralValue, ScalarValue};
