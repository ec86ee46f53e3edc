//! ExecutionContext: a table plus the selection state derived by the plan
//! steps run so far.

use std::sync::Arc;

use sift_common::{SiftError, SiftResult};
use sift_storage::{Bitmap, Table};

/// The value threaded through plan execution.
///
/// Every step produces a new context. `filter_bitmap` holds one bit per row
/// of `table`; `None` means every row is selected.
#[derive(Clone, Debug)]
pub struct ExecutionContext {
    table: Table,
    filter_bitmap: Option<Arc<Bitmap>>,
}

impl ExecutionContext {
    pub fn new(table: Table) -> Self {
        Self {
            table,
            filter_bitmap: None,
        }
    }

    pub fn table(&self) -> &Table {
        &self.table
    }

    pub fn filter_bitmap(&self) -> Option<&Arc<Bitmap>> {
        self.filter_bitmap.as_ref()
    }

    pub fn has_filter_bitmap(&self) -> bool {
        self.filter_bitmap.is_some()
    }

    /// Same selection over a different table with the same rows.
    pub fn with_table(&self, table: Table) -> Self {
        Self {
            table,
            filter_bitmap: self.filter_bitmap.clone(),
        }
    }

    pub fn with_filter_bitmap(&self, bitmap: Arc<Bitmap>) -> Self {
        Self {
            table: self.table.clone(),
            filter_bitmap: Some(bitmap),
        }
    }

    pub fn without_bitmap(&self) -> Self {
        Self::new(self.table.clone())
    }

    /// Rows selected so far.
    pub fn selected_rows(&self) -> usize {
        self.filter_bitmap
            .as_ref()
            .map_or(self.table.num_rows(), |b| b.count_set_bits())
    }

    /// Fails when the selection does not hold exactly one bit per row.
    pub fn check_bitmap(&self) -> SiftResult<()> {
        match &self.filter_bitmap {
            Some(bitmap) if bitmap.len() != self.table.num_rows() => Err(SiftError::Runtime(format!(
                "selection of {} bits over a table of {} rows",
                bitmap.len(),
                self.table.num_rows()
            ))),
            _ => Ok(()),
        }
    }

    pub fn into_table(self) -> Table {
        self.table
    }
}
