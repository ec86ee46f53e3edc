/// Physical storage representation of a column.
/// Controls the byte layout of column buffers and how kernels load values.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum PhysicalType {
    Bool = 1,
    Int8 = 2,
    Int16 = 3,
    Int32 = 4,
    Int64 = 5,
    UInt8 = 6,
    UInt16 = 7,
    UInt32 = 8,
    UInt64 = 9,
    /// IEEE 754 binary16, stored as raw `u16` bits.
    Float16 = 10,
    Float32 = 11,
    Float64 = 12,
    Decimal128 = 13,
    Utf8 = 20,
    List = 22,
    Struct = 24,
}

impl PhysicalType {
    /// Size in bytes of one value.
    /// Returns `None` for variable-length and nested types (Utf8, List, Struct).
    pub const fn fixed_size(&self) -> Option<usize> {
        match self {
            Self::Bool => Some(1),
            Self::Int8 | Self::UInt8 => Some(1),
            Self::Int16 | Self::UInt16 | Self::Float16 => Some(2),
            Self::Int32 | Self::UInt32 | Self::Float32 => Some(4),
            Self::Int64 | Self::UInt64 | Self::Float64 => Some(8),
            Self::Decimal128 => Some(16),
            Self::Utf8 => None,
            Self::List => None,
            Self::Struct => None,
        }
    }

    pub const fn is_fixed_size(&self) -> bool {
        self.fixed_size().is_some()
    }

    pub const fn is_signed_integer(&self) -> bool {
        matches!(self, Self::Int8 | Self::Int16 | Self::Int32 | Self::Int64)
    }

    pub const fn is_unsigned_integer(&self) -> bool {
        matches!(
            self,
            Self::UInt8 | Self::UInt16 | Self::UInt32 | Self::UInt64
        )
    }

    pub const fn is_float(&self) -> bool {
        matches!(self, Self::Float16 | Self::Float32 | Self::Float64)
    }

    /// Whether filter kernels can be compiled for columns of this type.
    pub const fn is_numeric(&self) -> bool {
        self.is_signed_integer() || self.is_unsigned_integer() || self.is_float()
    }
}

impl std::fmt::Display for PhysicalType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Bool => "BOOL",
            Self::Int8 => "INT8",
            Self::Int16 => "INT16",
            Self::Int32 => "INT32",
            Self::Int64 => "INT64",
            Self::UInt8 => "UINT8",
            Self::UInt16 => "UINT16",
            Self::UInt32 => "UINT32",
            Self::UInt64 => "UINT64",
            Self::Float16 => "HALF",
            Self::Float32 => "FLOAT",
            Self::Float64 => "DOUBLE",
            Self::Decimal128 => "DECIMAL128",
            Self::Utf8 => "UTF8",
            Self::List => "LIST",
            Self::Struct => "STRUCT",
        };
        write!(f, "{name}")
    }
}
