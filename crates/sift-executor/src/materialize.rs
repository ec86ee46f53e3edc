//! Compact a table down to its selected rows.

use std::sync::Arc;

use rayon::prelude::*;
use sift_common::{SiftError, SiftResult};
use sift_storage::{Array, Bitmap, ChunkedColumn, Table};
use sift_types::PhysicalType;
use tracing::debug;

use crate::context::ExecutionContext;

/// Copy the rows selected by `ctx`'s bitmap into fresh chunks of at most
/// `chunk_size` rows. The returned context has no bitmap.
pub fn materialize(ctx: &ExecutionContext, chunk_size: usize) -> SiftResult<ExecutionContext> {
    ctx.check_bitmap()?;
    let table = ctx.table();
    if table.num_columns() == 0 || table.column(0).num_chunks() == 0 {
        return Ok(ctx.without_bitmap());
    }
    let bitmap = ctx.filter_bitmap().ok_or_else(|| {
        SiftError::Unreachable("materialize reached without a selection bitmap".into())
    })?;
    if let Some(field) = table
        .schema()
        .fields()
        .iter()
        .find(|f| !f.data_type.is_fixed_size())
    {
        return Err(SiftError::NotImplemented(format!(
            "materializing {} column '{}'",
            field.data_type, field.name
        )));
    }

    let selected = bitmap.count_set_bits();
    let columns = table
        .columns()
        .par_iter()
        .map(|column| compact_column(column, bitmap, selected, chunk_size.max(1)).map(Arc::new))
        .collect::<SiftResult<Vec<_>>>()?;
    let compacted = Table::make(table.schema().clone(), columns)?;

    debug!(
        rows = table.num_rows(),
        selected,
        chunk_size,
        "materialized filter"
    );
    Ok(ExecutionContext::new(compacted))
}

fn compact_column(
    column: &ChunkedColumn,
    bitmap: &Bitmap,
    selected: usize,
    chunk_size: usize,
) -> SiftResult<ChunkedColumn> {
    let data_type = column.data_type();
    let track_validity = column.chunks().iter().any(|c| c.validity().is_some());
    let mut out = ChunkBuilder::new(data_type, chunk_size, selected, track_validity)?;

    let mut row = 0;
    for chunk in column.chunks() {
        let width = out.width;
        for (i, value) in chunk.values().chunks_exact(width).enumerate() {
            out.push(value, chunk.is_valid(i), bitmap.get(row + i))?;
        }
        row += chunk.len();
    }
    out.finish()
}

/// Accumulates surviving rows into fixed-size output chunks.
///
/// Every row is written into the next free slot; only the slot cursor depends
/// on whether the row survives. Buffers carry one spare slot for the write
/// that follows the last survivor.
struct ChunkBuilder {
    data_type: PhysicalType,
    width: usize,
    chunk_size: usize,
    remaining: usize,
    track_validity: bool,
    capacity: usize,
    values: Vec<u8>,
    validity: Vec<bool>,
    pos: usize,
    chunks: Vec<Arc<Array>>,
}

impl ChunkBuilder {
    fn new(
        data_type: PhysicalType,
        chunk_size: usize,
        selected: usize,
        track_validity: bool,
    ) -> SiftResult<Self> {
        let width = data_type
            .fixed_size()
            .ok_or_else(|| SiftError::NotImplemented(format!("materializing {data_type} columns")))?;
        let mut builder = Self {
            data_type,
            width,
            chunk_size,
            remaining: selected,
            track_validity,
            capacity: 0,
            values: Vec::new(),
            validity: Vec::new(),
            pos: 0,
            chunks: Vec::new(),
        };
        builder.reset();
        Ok(builder)
    }

    fn reset(&mut self) {
        self.capacity = self.chunk_size.min(self.remaining);
        self.values = vec![0; (self.capacity + 1) * self.width];
        if self.track_validity {
            self.validity = vec![false; self.capacity + 1];
        }
        self.pos = 0;
    }

    #[inline]
    fn push(&mut self, value: &[u8], valid: bool, keep: bool) -> SiftResult<()> {
        let at = self.pos * self.width;
        self.values[at..at + self.width].copy_from_slice(value);
        if self.track_validity {
            self.validity[self.pos] = valid;
        }
        self.pos += usize::from(keep);
        if self.pos == self.capacity && self.pos > 0 {
            self.flush()?;
        }
        Ok(())
    }

    fn flush(&mut self) -> SiftResult<()> {
        let mut values = std::mem::take(&mut self.values);
        values.truncate(self.pos * self.width);
        let validity = self
            .track_validity
            .then(|| Bitmap::from_bools(&self.validity[..self.pos]));
        let array = Array::from_raw(self.data_type, self.pos, values, validity)?;
        self.chunks.push(Arc::new(array));
        self.remaining -= self.pos;
        self.reset();
        Ok(())
    }

    fn finish(mut self) -> SiftResult<ChunkedColumn> {
        if self.pos > 0 {
            self.flush()?;
        }
        if self.chunks.is_empty() {
            self.chunks.push(Arc::new(Array::empty(self.data_type)));
        }
        ChunkedColumn::new(self.data_type, self.chunks)
    }
}
