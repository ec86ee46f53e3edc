use hashbrown::HashMap;
use sift_common::{SiftError, SiftResult};
use smol_str::SmolStr;

use crate::physical_type::PhysicalType;

/// A named, typed column slot in a schema.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Field {
    pub name: SmolStr,
    pub data_type: PhysicalType,
    pub nullable: bool,
}

impl Field {
    pub fn new(name: impl Into<SmolStr>, data_type: PhysicalType) -> Self {
        Self {
            name: name.into(),
            data_type,
            nullable: true,
        }
    }

    pub fn non_null(mut self) -> Self {
        self.nullable = false;
        self
    }
}

impl std::fmt::Display for Field {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.name, self.data_type)
    }
}

/// Ordered list of fields with a name index.
#[derive(Clone, Debug, Default)]
pub struct Schema {
    fields: Vec<Field>,
    index: HashMap<SmolStr, usize>,
}

impl Schema {
    /// Build a schema. Field names must be unique.
    pub fn new(fields: Vec<Field>) -> SiftResult<Self> {
        let mut index = HashMap::with_capacity(fields.len());
        for (i, field) in fields.iter().enumerate() {
            if index.insert(field.name.clone(), i).is_some() {
                return Err(SiftError::Schema(format!(
                    "duplicate field name '{}'",
                    field.name
                )));
            }
        }
        Ok(Self { fields, index })
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    pub fn field(&self, i: usize) -> Option<&Field> {
        self.fields.get(i)
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }

    pub fn field_with_name(&self, name: &str) -> SiftResult<&Field> {
        self.index_of(name)
            .map(|i| &self.fields[i])
            .ok_or_else(|| SiftError::ColumnNotFound(name.to_string()))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Resolve `names` in order, returning the projected schema and the
    /// source index of each selected field.
    pub fn project<S: AsRef<str>>(&self, names: &[S]) -> SiftResult<(Schema, Vec<usize>)> {
        let mut indices = Vec::with_capacity(names.len());
        let mut fields = Vec::with_capacity(names.len());
        for name in names {
            let name = name.as_ref();
            let i = self
                .index_of(name)
                .ok_or_else(|| SiftError::ColumnNotFound(name.to_string()))?;
            indices.push(i);
            fields.push(self.fields[i].clone());
        }
        Ok((Schema::new(fields)?, indices))
    }
}

impl PartialEq for Schema {
    fn eq(&self, other: &Self) -> bool {
        self.fields == other.fields
    }
}

impl Eq for Schema {}

impl std::fmt::Display for Schema {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "(")?;
        for (i, field) in self.fields.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{field}")?;
        }
        write!(f, ")")
    }
}
