use sift_common::{SiftError, SiftResult};
use sift_types::{F16, NativeType, PhysicalType, ScalarValue};
use smol_str::SmolStr;

use crate::bitmap::Bitmap;

/// One contiguous chunk of a column.
///
/// Fixed-width values are stored back to back in native byte order. `Utf8`
/// arrays keep `len + 1` offsets into the value bytes. The optional validity
/// bitmap marks valid slots with 1.
#[derive(Clone, Debug, PartialEq)]
pub struct Array {
    data_type: PhysicalType,
    len: usize,
    values: Vec<u8>,
    offsets: Option<Vec<u32>>,
    validity: Option<Bitmap>,
}

impl Array {
    pub fn from_slice<T: NativeType>(values: &[T]) -> Self {
        let mut bytes = Vec::with_capacity(values.len() * T::WIDTH);
        for &v in values {
            v.append_to(&mut bytes);
        }
        Self {
            data_type: T::PHYSICAL,
            len: values.len(),
            values: bytes,
            offsets: None,
            validity: None,
        }
    }

    /// Nullable values. Null slots hold zeroed bytes.
    pub fn from_options<T: NativeType>(values: &[Option<T>]) -> Self {
        let mut bytes = Vec::with_capacity(values.len() * T::WIDTH);
        let mut validity = Bitmap::new_set(values.len());
        for (i, v) in values.iter().enumerate() {
            match v {
                Some(v) => v.append_to(&mut bytes),
                None => {
                    bytes.resize(bytes.len() + T::WIDTH, 0);
                    validity.set(i, false);
                }
            }
        }
        Self {
            data_type: T::PHYSICAL,
            len: values.len(),
            values: bytes,
            offsets: None,
            validity: Some(validity),
        }
    }

    /// Half-precision values given as raw bits.
    pub fn from_f16_bits(bits: &[u16]) -> Self {
        let values: Vec<F16> = bits.iter().map(|&b| F16(b)).collect();
        Self::from_slice(&values)
    }

    pub fn from_strings<S: AsRef<str>>(values: &[S]) -> Self {
        let mut bytes = Vec::new();
        let mut offsets = Vec::with_capacity(values.len() + 1);
        offsets.push(0u32);
        for v in values {
            bytes.extend_from_slice(v.as_ref().as_bytes());
            offsets.push(bytes.len() as u32);
        }
        Self {
            data_type: PhysicalType::Utf8,
            len: values.len(),
            values: bytes,
            offsets: Some(offsets),
            validity: None,
        }
    }

    /// Build a fixed-width array from raw parts.
    pub fn from_raw(
        data_type: PhysicalType,
        len: usize,
        values: Vec<u8>,
        validity: Option<Bitmap>,
    ) -> SiftResult<Self> {
        let width = data_type.fixed_size().ok_or_else(|| {
            SiftError::NotImplemented(format!("raw construction of {data_type} arrays"))
        })?;
        if values.len() != len * width {
            return Err(SiftError::Schema(format!(
                "{data_type} array of {len} values needs {} bytes, got {}",
                len * width,
                values.len()
            )));
        }
        if let Some(v) = &validity {
            if v.len() != len {
                return Err(SiftError::Schema(format!(
                    "validity bitmap has {} bits for {len} values",
                    v.len()
                )));
            }
        }
        Ok(Self {
            data_type,
            len,
            values,
            offsets: None,
            validity,
        })
    }

    pub fn empty(data_type: PhysicalType) -> Self {
        Self {
            data_type,
            len: 0,
            values: Vec::new(),
            offsets: (data_type == PhysicalType::Utf8).then(|| vec![0]),
            validity: None,
        }
    }

    #[inline]
    pub fn data_type(&self) -> PhysicalType {
        self.data_type
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Raw value bytes.
    #[inline]
    pub fn values(&self) -> &[u8] {
        &self.values
    }

    #[inline]
    pub fn validity(&self) -> Option<&Bitmap> {
        self.validity.as_ref()
    }

    #[inline]
    pub fn is_valid(&self, i: usize) -> bool {
        self.validity.as_ref().is_none_or(|v| v.get(i))
    }

    pub fn null_count(&self) -> usize {
        self.validity
            .as_ref()
            .map_or(0, |v| self.len - v.count_set_bits())
    }

    /// Decode the value at `i`, ignoring validity.
    #[inline]
    pub fn value<T: NativeType>(&self, i: usize) -> T {
        debug_assert_eq!(T::PHYSICAL, self.data_type);
        T::read_from(&self.values[i * T::WIDTH..])
    }

    pub fn iter_values<T: NativeType>(&self) -> impl Iterator<Item = T> + '_ {
        debug_assert_eq!(T::PHYSICAL, self.data_type);
        self.values.chunks_exact(T::WIDTH).map(T::read_from)
    }

    pub fn str_value(&self, i: usize) -> Option<&str> {
        let offsets = self.offsets.as_ref()?;
        let (start, end) = (offsets[i] as usize, offsets[i + 1] as usize);
        std::str::from_utf8(&self.values[start..end]).ok()
    }

    /// Decoded value at `i`, `None` when the slot is null.
    pub fn scalar_at(&self, i: usize) -> SiftResult<Option<ScalarValue>> {
        if !self.is_valid(i) {
            return Ok(None);
        }
        let scalar = match self.data_type {
            PhysicalType::Bool => self.value::<bool>(i).to_scalar(),
            PhysicalType::Int8 => self.value::<i8>(i).to_scalar(),
            PhysicalType::Int16 => self.value::<i16>(i).to_scalar(),
            PhysicalType::Int32 => self.value::<i32>(i).to_scalar(),
            PhysicalType::Int64 => self.value::<i64>(i).to_scalar(),
            PhysicalType::UInt8 => self.value::<u8>(i).to_scalar(),
            PhysicalType::UInt16 => self.value::<u16>(i).to_scalar(),
            PhysicalType::UInt32 => self.value::<u32>(i).to_scalar(),
            PhysicalType::UInt64 => self.value::<u64>(i).to_scalar(),
            PhysicalType::Float16 => self.value::<F16>(i).to_scalar(),
            PhysicalType::Float32 => self.value::<f32>(i).to_scalar(),
            PhysicalType::Float64 => self.value::<f64>(i).to_scalar(),
            PhysicalType::Decimal128 => self.value::<i128>(i).to_scalar(),
            PhysicalType::Utf8 => ScalarValue::Utf8(SmolStr::new(
                self.str_value(i).unwrap_or_default(),
            )),
            PhysicalType::List | PhysicalType::Struct => {
                return Err(SiftError::NotImplemented(format!(
                    "scalar access for {} arrays",
                    self.data_type
                )));
            }
        };
        Ok(Some(scalar))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn typed_round_trip() {
        let array = Array::from_slice(&[3i16, -4, 500]);
        assert_eq!(array.data_type(), PhysicalType::Int16);
        assert_eq!(array.len(), 3);
        assert_eq!(array.values().len(), 6);
        assert_eq!(array.value::<i16>(1), -4);
        assert_eq!(array.iter_values::<i16>().collect::<Vec<_>>(), vec![3, -4, 500]);
        assert!(array.validity().is_none());
        assert_eq!(array.null_count(), 0);
    }

    #[test]
    fn nullable_values() {
        let array = Array::from_options(&[Some(1.5f64), None, Some(-2.0)]);
        assert!(array.is_valid(0));
        assert!(!array.is_valid(1));
        assert_eq!(array.null_count(), 1);
        assert_eq!(array.value::<f64>(1), 0.0);
        assert_eq!(array.scalar_at(1).unwrap(), None);
        assert_eq!(array.scalar_at(2).unwrap(), Some(ScalarValue::Float64(-2.0)));
    }

    #[test]
    fn strings() {
        let array = Array::from_strings(&["taxi", "", "cab"]);
        assert_eq!(array.data_type(), PhysicalType::Utf8);
        assert_eq!(array.str_value(0), Some("taxi"));
        assert_eq!(array.str_value(1), Some(""));
        assert_eq!(
            array.scalar_at(2).unwrap(),
            Some(ScalarValue::Utf8("cab".into()))
        );
    }

    #[test]
    fn half_precision_scalars() {
        let array = Array::from_f16_bits(&[0x3c00, 0xc000]);
        assert_eq!(array.data_type(), PhysicalType::Float16);
        assert_eq!(array.scalar_at(1).unwrap(), Some(ScalarValue::Float32(-2.0)));
    }

    #[test]
    fn raw_construction_checks_sizes() {
        let ok = Array::from_raw(PhysicalType::Int32, 2, vec![0; 8], None);
        assert!(ok.is_ok());
        let bad = Array::from_raw(PhysicalType::Int32, 3, vec![0; 8], None);
        assert!(matches!(bad, Err(SiftError::Schema(_))));
        let bad = Array::from_raw(PhysicalType::Utf8, 0, vec![], None);
        assert!(matches!(bad, Err(SiftError::NotImplemented(_))));
        let bad = Array::from_raw(PhysicalType::Int8, 2, vec![0; 2], Some(Bitmap::new_set(3)));
        assert!(matches!(bad, Err(SiftError::Schema(_))));
    }

    #[test]
    fn empty_arrays() {
        let array = Array::empty(PhysicalType::UInt32);
        assert!(array.is_empty());
        assert_eq!(array.iter_values::<u32>().count(), 0);
    }
}
