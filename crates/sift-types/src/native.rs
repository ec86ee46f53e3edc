use crate::f16::F16;
use crate::physical_type::PhysicalType;
use crate::value::ScalarValue;

/// A Rust scalar that can live in a fixed-width column buffer.
///
/// Buffers are stored in native byte order; values are read and written
/// through byte slices so buffers need no particular alignment.
pub trait NativeType: Copy + Send + Sync + 'static {
    const PHYSICAL: PhysicalType;
    const WIDTH: usize;

    fn append_to(self, out: &mut Vec<u8>);

    /// Decode one value from the first `WIDTH` bytes of `bytes`.
    fn read_from(bytes: &[u8]) -> Self;

    fn to_scalar(self) -> ScalarValue;
}

macro_rules! impl_native {
    ($ty:ty, $physical:ident, $scalar:ident, $cast:ty) => {
        impl NativeType for $ty {
            const PHYSICAL: PhysicalType = PhysicalType::$physical;
            const WIDTH: usize = std::mem::size_of::<$ty>();

            #[inline]
            fn append_to(self, out: &mut Vec<u8>) {
                out.extend_from_slice(&self.to_ne_bytes());
            }

            #[inline]
            fn read_from(bytes: &[u8]) -> Self {
                let mut raw = [0u8; std::mem::size_of::<$ty>()];
                raw.copy_from_slice(&bytes[..std::mem::size_of::<$ty>()]);
                <$ty>::from_ne_bytes(raw)
            }

            #[inline]
            fn to_scalar(self) -> ScalarValue {
                ScalarValue::$scalar(self as $cast)
            }
        }
    };
}

impl_native!(i8, Int8, Int, i64);
impl_native!(i16, Int16, Int, i64);
impl_native!(i32, Int32, Int, i64);
impl_native!(i64, Int64, Int, i64);
impl_native!(u8, UInt8, UInt, u64);
impl_native!(u16, UInt16, UInt, u64);
impl_native!(u32, UInt32, UInt, u64);
impl_native!(u64, UInt64, UInt, u64);
impl_native!(f32, Float32, Float32, f32);
impl_native!(f64, Float64, Float64, f64);
impl_native!(i128, Decimal128, Decimal128, i128);

impl NativeType for F16 {
    const PHYSICAL: PhysicalType = PhysicalType::Float16;
    const WIDTH: usize = 2;

    #[inline]
    fn append_to(self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.0.to_ne_bytes());
    }

    #[inline]
    fn read_from(bytes: &[u8]) -> Self {
        F16(u16::from_ne_bytes([bytes[0], bytes[1]]))
    }

    #[inline]
    fn to_scalar(self) -> ScalarValue {
        ScalarValue::Float32(self.to_f32())
    }
}

impl NativeType for bool {
    const PHYSICAL: PhysicalType = PhysicalType::Bool;
    const WIDTH: usize = 1;

    #[inline]
    fn append_to(self, out: &mut Vec<u8>) {
        out.push(self as u8);
    }

    #[inline]
    fn read_from(bytes: &[u8]) -> Self {
        bytes[0] != 0
    }

    #[inline]
    fn to_scalar(self) -> ScalarValue {
        ScalarValue::Bool(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn widths_match_physical_types() {
        assert_eq!(Some(i16::WIDTH), i16::PHYSICAL.fixed_size());
        assert_eq!(Some(u64::WIDTH), u64::PHYSICAL.fixed_size());
        assert_eq!(Some(F16::WIDTH), F16::PHYSICAL.fixed_size());
        assert_eq!(Some(i128::WIDTH), i128::PHYSICAL.fixed_size());
        assert_eq!(Some(bool::WIDTH), bool::PHYSICAL.fixed_size());
    }

    #[test]
    fn append_then_read() {
        let mut buf = Vec::new();
        (-7i32).append_to(&mut buf);
        3.5f64.append_to(&mut buf);
        assert_eq!(buf.len(), 12);
        assert_eq!(i32::read_from(&buf[0..4]), -7);
        assert_eq!(f64::read_from(&buf[4..]), 3.5);
    }

    #[test]
    fn scalar_families() {
        assert_eq!((-3i8).to_scalar(), ScalarValue::Int(-3));
        assert_eq!(200u8.to_scalar(), ScalarValue::UInt(200));
        assert_eq!(F16::ONE.to_scalar(), ScalarValue::Float32(1.0));
    }
}
