//! Owned bit-packed bitmap, MSB-first.
//!
//! Bit `i` lives in byte `i / 8` at bit position `7 - i % 8`, so the first row
//! of each group of eight is the high bit. Selection bitmaps and validity
//! bitmaps share this layout. Padding bits past `len` carry no meaning and are
//! ignored by every query method.

/// Number of bytes needed to hold `len` bits.
#[inline]
pub const fn bytes_for(len: usize) -> usize {
    len.div_ceil(8)
}

/// Single-bit mask for position `pos` within its byte.
#[inline]
pub const fn bit_mask(pos: usize) -> u8 {
    0x80 >> (pos & 7)
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Bitmap {
    bytes: Vec<u8>,
    len: usize,
}

impl Bitmap {
    /// All bits set: every row passes.
    pub fn new_set(len: usize) -> Self {
        Self {
            bytes: vec![0xff; bytes_for(len)],
            len,
        }
    }

    pub fn new_unset(len: usize) -> Self {
        Self {
            bytes: vec![0x00; bytes_for(len)],
            len,
        }
    }

    pub fn from_bools(bits: &[bool]) -> Self {
        let mut bitmap = Self::new_unset(bits.len());
        for (i, &bit) in bits.iter().enumerate() {
            if bit {
                bitmap.bytes[i >> 3] |= bit_mask(i);
            }
        }
        bitmap
    }

    /// Wrap raw bytes. `bytes` is resized to exactly `bytes_for(len)`, new
    /// bytes set to all ones.
    pub fn from_bytes(mut bytes: Vec<u8>, len: usize) -> Self {
        bytes.resize(bytes_for(len), 0xff);
        Self { bytes, len }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[inline]
    pub fn get(&self, i: usize) -> bool {
        debug_assert!(i < self.len, "bit {i} out of range for bitmap of {}", self.len);
        self.bytes[i >> 3] & bit_mask(i) != 0
    }

    #[inline]
    pub fn set(&mut self, i: usize, value: bool) {
        debug_assert!(i < self.len, "bit {i} out of range for bitmap of {}", self.len);
        if value {
            self.bytes[i >> 3] |= bit_mask(i);
        } else {
            self.bytes[i >> 3] &= !bit_mask(i);
        }
    }

    /// Number of set bits among the first `len` bits.
    pub fn count_set_bits(&self) -> usize {
        let full = self.len / 8;
        let mut count: usize = self.bytes[..full]
            .iter()
            .map(|b| b.count_ones() as usize)
            .sum();
        let rem = self.len % 8;
        if rem != 0 {
            let keep = !(0xffu8 >> rem);
            count += (self.bytes[full] & keep).count_ones() as usize;
        }
        count
    }

    /// `self &= other`, byte by byte.
    pub fn and_inplace(&mut self, other: &Bitmap) {
        debug_assert_eq!(self.len, other.len);
        for (dst, src) in self.bytes.iter_mut().zip(&other.bytes) {
            *dst &= *src;
        }
    }

    /// `self |= other`, byte by byte.
    pub fn or_inplace(&mut self, other: &Bitmap) {
        debug_assert_eq!(self.len, other.len);
        for (dst, src) in self.bytes.iter_mut().zip(&other.bytes) {
            *dst |= *src;
        }
    }

    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    #[inline]
    pub fn as_mut_bytes(&mut self) -> &mut [u8] {
        &mut self.bytes
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    pub fn iter(&self) -> impl Iterator<Item = bool> + '_ {
        (0..self.len).map(move |i| self.get(i))
    }

    /// Indices of set bits, ascending.
    pub fn set_indices(&self) -> impl Iterator<Item = usize> + '_ {
        (0..self.len).filter(move |&i| self.get(i))
    }
}
