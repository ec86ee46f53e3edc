use std::sync::Arc;

use sift_common::{SiftError, SiftResult};
use sift_types::{Field, Schema};

use crate::column::ChunkedColumn;

/// An immutable chunked columnar table. Cloning is cheap.
#[derive(Clone, Debug, PartialEq)]
pub struct Table {
    schema: Arc<Schema>,
    columns: Vec<Arc<ChunkedColumn>>,
    num_rows: usize,
}

impl Table {
    /// Construct a table, checking that columns match the schema and share
    /// one row count.
    pub fn make(schema: Arc<Schema>, columns: Vec<Arc<ChunkedColumn>>) -> SiftResult<Self> {
        if schema.len() != columns.len() {
            return Err(SiftError::Schema(format!(
                "schema has {} fields but {} columns were given",
                schema.len(),
                columns.len()
            )));
        }
        for (field, column) in schema.fields().iter().zip(&columns) {
            if field.data_type != column.data_type() {
                return Err(SiftError::Schema(format!(
                    "field '{}' is {} but its column is {}",
                    field.name,
                    field.data_type,
                    column.data_type()
                )));
            }
        }
        let num_rows = columns.first().map_or(0, |c| c.len());
        if let Some((field, column)) = schema
            .fields()
            .iter()
            .zip(&columns)
            .find(|(_, c)| c.len() != num_rows)
        {
            return Err(SiftError::Schema(format!(
                "column '{}' has {} rows, expected {num_rows}",
                field.name,
                column.len()
            )));
        }
        Ok(Self {
            schema,
            columns,
            num_rows,
        })
    }

    /// Build a table from `(name, column)` pairs, deriving the schema.
    pub fn from_columns<S: AsRef<str>>(columns: Vec<(S, ChunkedColumn)>) -> SiftResult<Self> {
        let fields = columns
            .iter()
            .map(|(name, c)| Field::new(name.as_ref(), c.data_type()))
            .collect();
        let schema = Arc::new(Schema::new(fields)?);
        Self::make(schema, columns.into_iter().map(|(_, c)| Arc::new(c)).collect())
    }

    pub fn empty() -> Self {
        Self {
            schema: Arc::new(Schema::empty()),
            columns: Vec::new(),
            num_rows: 0,
        }
    }

    #[inline]
    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    #[inline]
    pub fn num_columns(&self) -> usize {
        self.columns.len()
    }

    #[inline]
    pub fn num_rows(&self) -> usize {
        self.num_rows
    }

    #[inline]
    pub fn column(&self, i: usize) -> &Arc<ChunkedColumn> {
        &self.columns[i]
    }

    #[inline]
    pub fn columns(&self) -> &[Arc<ChunkedColumn>] {
        &self.columns
    }

    pub fn column_by_name(&self, name: &str) -> SiftResult<&Arc<ChunkedColumn>> {
        self.schema
            .index_of(name)
            .map(|i| &self.columns[i])
            .ok_or_else(|| SiftError::ColumnNotFound(name.to_string()))
    }
}
