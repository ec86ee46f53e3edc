//! sift-storage: chunked columnar tables and bit-packed bitmaps.
//!
//! A [`Table`] is an ordered set of [`ChunkedColumn`]s sharing one row count.
//! Each column is split into contiguous [`Array`] chunks whose boundaries need
//! not line up with byte boundaries of a [`Bitmap`].

pub mod array;
pub mod bitmap;
pub mod column;
pub mod table;

pub use array::Array;
pub use bitmap::Bitmap;
pub use column::ChunkedColumn;
pub use table::Table;
