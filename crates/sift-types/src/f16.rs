//! IEEE 754 binary16 bit container.
//!
//! Half-precision columns are stored as raw bits. Arithmetic is never done on
//! `F16` directly: values are widened to `f32` for comparison, both here and
//! in generated kernels.

/// Raw bits of an IEEE 754 binary16 value.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[repr(transparent)]
pub struct F16(pub u16);

impl F16 {
    pub const ZERO: F16 = F16(0x0000);
    pub const ONE: F16 = F16(0x3c00);
    pub const INFINITY: F16 = F16(0x7c00);
    pub const NEG_INFINITY: F16 = F16(0xfc00);
    pub const NAN: F16 = F16(0x7e00);

    pub const fn from_bits(bits: u16) -> Self {
        F16(bits)
    }

    pub const fn to_bits(self) -> u16 {
        self.0
    }

    /// Exact widening conversion.
    pub fn to_f32(self) -> f32 {
        let h = self.0 as u32;
        let sign = (h & 0x8000) << 16;
        let exp = (h >> 10) & 0x1f;
        let mant = h & 0x03ff;
        match exp {
            0 => {
                // Zero and subnormals: mant * 2^-24.
                let magnitude = mant as f32 * f32::from_bits(0x3380_0000);
                if sign != 0 { -magnitude } else { magnitude }
            }
            0x1f => f32::from_bits(sign | 0x7f80_0000 | (mant << 13)),
            _ => f32::from_bits(sign | ((exp + 112) << 23) | (mant << 13)),
        }
    }

    /// Narrowing conversion, rounding to nearest with ties to even.
    pub fn from_f32(value: f32) -> Self {
        let x = value.to_bits();
        let sign = ((x >> 16) & 0x8000) as u16;
        let exp = ((x >> 23) & 0xff) as i32;
        let mant = x & 0x007f_ffff;

        if exp == 0xff {
            let payload = if mant != 0 { 0x0200 | (mant >> 13) as u16 } else { 0 };
            return F16(sign | 0x7c00 | payload);
        }

        let e = exp - 127 + 15;
        if e >= 0x1f {
            return F16(sign | 0x7c00);
        }
        if e <= 0 {
            if e < -10 {
                return F16(sign);
            }
            let m = mant | 0x0080_0000;
            let shift = (14 - e) as u32;
            let half = m >> shift;
            let rem = m & ((1 << shift) - 1);
            let halfway = 1 << (shift - 1);
            let rounded = if rem > halfway || (rem == halfway && half & 1 == 1) {
                half + 1
            } else {
                half
            };
            return F16(sign | rounded as u16);
        }

        let half = mant >> 13;
        let rem = mant & 0x1fff;
        let mut out = ((e as u32) << 10) | half;
        if rem > 0x1000 || (rem == 0x1000 && half & 1 == 1) {
            // A carry out of the mantissa correctly bumps the exponent.
            out += 1;
        }
        F16(sign | out as u16)
    }

    pub fn is_nan(self) -> bool {
        (self.0 & 0x7c00) == 0x7c00 && (self.0 & 0x03ff) != 0
    }
}

impl From<F16> for f32 {
    fn from(value: F16) -> Self {
        value.to_f32()
    }
}

impl std::fmt::Display for F16 {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_f32())
    }
}
