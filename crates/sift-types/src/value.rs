use smol_str::SmolStr;

/// Literal value carried by a literal expression node.
///
/// Integers that fit an `i64` are always `Int`; `UInt` only holds values
/// above `i64::MAX`.
#[derive(Clone, Debug, PartialEq)]
pub enum LiteralValue {
    Int(i64),
    UInt(u64),
    Float(f64),
    String(SmolStr),
    Bool(bool),
}

impl LiteralValue {
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Int(_) | Self::UInt(_) => "integer",
            Self::Float(_) => "float",
            Self::String(_) => "string",
            Self::Bool(_) => "bool",
        }
    }

    /// Numeric view of the literal, if it has one.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Int(v) => Some(*v as f64),
            Self::UInt(v) => Some(*v as f64),
            Self::Float(v) => Some(*v),
            Self::String(_) | Self::Bool(_) => None,
        }
    }

    /// Exact integer value, if the literal is an integer.
    pub fn as_i128(&self) -> Option<i128> {
        match self {
            Self::Int(v) => Some(i128::from(*v)),
            Self::UInt(v) => Some(i128::from(*v)),
            Self::Float(_) | Self::String(_) | Self::Bool(_) => None,
        }
    }
}

impl std::fmt::Display for LiteralValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Int(v) => write!(f, "{v}"),
            Self::UInt(v) => write!(f, "{v}"),
            Self::Float(v) => write!(f, "{v:?}"),
            Self::String(s) => write!(f, "'{s}'"),
            Self::Bool(b) => write!(f, "{b}"),
        }
    }
}

macro_rules! literal_from_int {
    ($($ty:ty),*) => {
        $(impl From<$ty> for LiteralValue {
            fn from(v: $ty) -> Self {
                Self::Int(v as i64)
            }
        })*
    };
}

literal_from_int!(i8, i16, i32, i64, u8, u16, u32);

impl From<u64> for LiteralValue {
    fn from(v: u64) -> Self {
        match i64::try_from(v) {
            Ok(v) => Self::Int(v),
            Err(_) => Self::UInt(v),
        }
    }
}

impl From<f32> for LiteralValue {
    fn from(v: f32) -> Self {
        Self::Float(v as f64)
    }
}

impl From<f64> for LiteralValue {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<bool> for LiteralValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<&str> for LiteralValue {
    fn from(v: &str) -> Self {
        Self::String(SmolStr::new(v))
    }
}

impl From<String> for LiteralValue {
    fn from(v: String) -> Self {
        Self::String(SmolStr::new(v))
    }
}

/// One decoded column value, grouped by comparison family.
///
/// Half-precision values are widened to `Float32`.
#[derive(Clone, Debug, PartialEq)]
pub enum ScalarValue {
    Int(i64),
    UInt(u64),
    Float32(f32),
    Float64(f64),
    Decimal128(i128),
    Bool(bool),
    Utf8(SmolStr),
}

impl std::fmt::Display for ScalarValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Int(v) => write!(f, "{v}"),
            Self::UInt(v) => write!(f, "{v}"),
            Self::Float32(v) => write!(f, "{v}"),
            Self::Float64(v) => write!(f, "{v}"),
            Self::Decimal128(v) => write!(f, "{v}"),
            Self::Bool(v) => write!(f, "{v}"),
            Self::Utf8(s) => write!(f, "{s}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn literal_conversions() {
        assert_eq!(LiteralValue::from(4), LiteralValue::Int(4));
        assert_eq!(LiteralValue::from(200u8), LiteralValue::Int(200));
        assert_eq!(LiteralValue::from(7u64), LiteralValue::Int(7));
        assert_eq!(LiteralValue::from(u64::MAX), LiteralValue::UInt(u64::MAX));
        assert_eq!(LiteralValue::from(2.5), LiteralValue::Float(2.5));
        assert_eq!(LiteralValue::from("abc"), LiteralValue::String("abc".into()));
        assert_eq!(LiteralValue::from(true), LiteralValue::Bool(true));
    }

    #[test]
    fn literal_display() {
        assert_eq!(LiteralValue::Int(-3).to_string(), "-3");
        assert_eq!(LiteralValue::Float(5.0).to_string(), "5.0");
        assert_eq!(LiteralValue::String("x".into()).to_string(), "'x'");
    }

    #[test]
    fn numeric_view() {
        assert_eq!(LiteralValue::Int(3).as_f64(), Some(3.0));
        assert_eq!(LiteralValue::Bool(true).as_f64(), None);
        assert_eq!(LiteralValue::UInt(u64::MAX).as_i128(), Some(i128::from(u64::MAX)));
        assert_eq!(LiteralValue::Int(-2).as_i128(), Some(-2));
        assert_eq!(LiteralValue::Float(1.0).as_i128(), None);
    }
}
