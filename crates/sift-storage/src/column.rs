use std::sync::Arc;

use sift_common::{SiftError, SiftResult};
use sift_types::{NativeType, PhysicalType};

use crate::array::Array;

/// A column split into one or more contiguous chunks of the same type.
#[derive(Clone, Debug, PartialEq)]
pub struct ChunkedColumn {
    data_type: PhysicalType,
    chunks: Vec<Arc<Array>>,
    len: usize,
}

impl ChunkedColumn {
    pub fn new(data_type: PhysicalType, chunks: Vec<Arc<Array>>) -> SiftResult<Self> {
        if let Some(bad) = chunks.iter().find(|c| c.data_type() != data_type) {
            return Err(SiftError::Schema(format!(
                "{data_type} column cannot hold a {} chunk",
                bad.data_type()
            )));
        }
        let len = chunks.iter().map(|c| c.len()).sum();
        Ok(Self {
            data_type,
            chunks,
            len,
        })
    }

    /// Single-chunk column.
    pub fn from_array(array: Array) -> Self {
        let len = array.len();
        Self {
            data_type: array.data_type(),
            chunks: vec![Arc::new(array)],
            len,
        }
    }

    /// One chunk per slice.
    pub fn from_slices<T: NativeType>(chunks: &[&[T]]) -> Self {
        let chunks: Vec<Arc<Array>> = chunks
            .iter()
            .map(|c| Arc::new(Array::from_slice(c)))
            .collect();
        let len = chunks.iter().map(|c| c.len()).sum();
        Self {
            data_type: T::PHYSICAL,
            chunks,
            len,
        }
    }

    #[inline]
    pub fn data_type(&self) -> PhysicalType {
        self.data_type
    }

    #[inline]
    pub fn num_chunks(&self) -> usize {
        self.chunks.len()
    }

    #[inline]
    pub fn chunk(&self, i: usize) -> &Arc<Array> {
        &self.chunks[i]
    }

    #[inline]
    pub fn chunks(&self) -> &[Arc<Array>] {
        &self.chunks
    }

    /// Total row count across chunks.
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Global row index of the first row of every chunk.
    pub fn chunk_offsets(&self) -> Vec<usize> {
        let mut next = 0;
        self.chunks
            .iter()
            .map(|c| {
                let start = next;
                next += c.len();
                start
            })
            .collect()
    }

    /// Decode every row into a vector, ignoring validity.
    pub fn to_vec<T: NativeType>(&self) -> Vec<T> {
        let mut out = Vec::with_capacity(self.len);
        for chunk in &self.chunks {
            out.extend(chunk.iter_values::<T>());
        }
        out
    }

    /// Validity of every row, `true` for valid.
    pub fn validity_to_vec(&self) -> Vec<bool> {
        let mut out = Vec::with_capacity(self.len);
        for chunk in &self.chunks {
            out.extend((0..chunk.len()).map(|i| chunk.is_valid(i)));
        }
        out
    }
}
