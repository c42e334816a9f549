//! # Wide Value Types
//!
//! Fixed-width values wider than 64 bits: 128-bit decimals, IEEE 754-2008
//! quads carried as opaque bits, and 12-byte object ids.

use crate::error::{Result, RowError};

/// A 96-bit scaled decimal number.
///
/// Wire layout is 16 bytes: a 32-bit flags word (scale in bits 16..24, sign
/// in bit 31, all other bits zero) followed by the mantissa as three
/// little-endian 32-bit words, low to high.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Decimal {
    negative: bool,
    scale: u8,
    mantissa: u128,
}

impl Decimal {
    /// Number of encoded bytes.
    pub const BYTES: usize = 16;

    /// Largest representable mantissa (2^96 - 1).
    pub const MAX_MANTISSA: u128 = (1u128 << 96) - 1;

    /// Largest meaningful scale (number of digits after the decimal point).
    pub const MAX_SCALE: u8 = 28;

    /// Builds a decimal from sign, scale, and 96-bit mantissa.
    pub fn new(negative: bool, scale: u8, mantissa: u128) -> Result<Self> {
        if scale > Self::MAX_SCALE {
            return Err(RowError::InvalidRow(format!(
                "decimal scale {scale} exceeds maximum {}",
                Self::MAX_SCALE
            )));
        }
        if mantissa > Self::MAX_MANTISSA {
            return Err(RowError::InvalidRow(
                "decimal mantissa exceeds 96 bits".into(),
            ));
        }
        Ok(Decimal { negative, scale, mantissa })
    }

    pub fn is_negative(&self) -> bool {
        self.negative
    }

    pub fn scale(&self) -> u8 {
        self.scale
    }

    pub fn mantissa(&self) -> u128 {
        self.mantissa
    }

    pub fn to_le_bytes(&self) -> [u8; Self::BYTES] {
        let mut flags = (self.scale as u32) << 16;
        if self.negative {
            flags |= 1 << 31;
        }
        let lo = self.mantissa as u32;
        let mid = (self.mantissa >> 32) as u32;
        let hi = (self.mantissa >> 64) as u32;

        let mut out = [0u8; Self::BYTES];
        out[0..4].copy_from_slice(&flags.to_le_bytes());
        out[4..8].copy_from_slice(&lo.to_le_bytes());
        out[8..12].copy_from_slice(&mid.to_le_bytes());
        out[12..16].copy_from_slice(&hi.to_le_bytes());
        out
    }

    pub fn from_le_bytes(bytes: [u8; Self::BYTES]) -> Result<Self> {
        let flags = u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
        let lo = u32::from_le_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]) as u128;
        let mid = u32::from_le_bytes([bytes[8], bytes[9], bytes[10], bytes[11]]) as u128;
        let hi = u32::from_le_bytes([bytes[12], bytes[13], bytes[14], bytes[15]]) as u128;

        // Only the scale byte and the sign bit may be set in the flags word.
        if flags & !(0x00FF_0000 | (1 << 31)) != 0 {
            return Err(RowError::InvalidRow("invalid decimal flags".into()));
        }
        let scale = ((flags >> 16) & 0xFF) as u8;
        if scale > Self::MAX_SCALE {
            return Err(RowError::InvalidRow(format!(
                "decimal scale {scale} exceeds maximum {}",
                Self::MAX_SCALE
            )));
        }
        Ok(Decimal {
            negative: flags & (1 << 31) != 0,
            scale,
            mantissa: lo | (mid << 32) | (hi << 64),
        })
    }
}

/// An IEEE 754-2008 binary128 value carried as opaque bits.
///
/// The format stores and returns the 16 bytes without interpreting them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Float128 {
    /// Low-order 64 bits of the quad.
    pub low: u64,
    /// High-order 64 bits of the quad, including sign and exponent.
    pub high: u64,
}

impl Float128 {
    /// Number of encoded bytes.
    pub const BYTES: usize = 16;

    pub fn new(low: u64, high: u64) -> Self {
        Float128 { low, high }
    }

    pub fn to_le_bytes(&self) -> [u8; Self::BYTES] {
        let mut out = [0u8; Self::BYTES];
        out[0..8].copy_from_slice(&self.low.to_le_bytes());
        out[8..16].copy_from_slice(&self.high.to_le_bytes());
        out
    }

    pub fn from_le_bytes(bytes: [u8; Self::BYTES]) -> Self {
        Float128 {
            low: u64::from_le_bytes(bytes[0..8].try_into().unwrap()),
            high: u64::from_le_bytes(bytes[8..16].try_into().unwrap()),
        }
    }
}

/// A 12-byte object identifier, stored and compared as raw bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, PartialOrd, Ord)]
pub struct ObjectId([u8; 12]);

impl ObjectId {
    /// Number of encoded bytes.
    pub const BYTES: usize = 12;

    pub fn new(bytes: [u8; 12]) -> Self {
        ObjectId(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 12] {
        &self.0
    }

    pub fn to_bytes(self) -> [u8; 12] {
        self.0
    }
}

impl std::fmt::Display for ObjectId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for byte in &self.0 {
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decimal_roundtrips_sign_scale_mantissa() {
        let d = Decimal::new(true, 4, 1_234_567_890_123_456_789).unwrap();
        let bytes = d.to_le_bytes();
        let back = Decimal::from_le_bytes(bytes).unwrap();
        assert_eq!(back, d);
        assert!(back.is_negative());
        assert_eq!(back.scale(), 4);
    }

    #[test]
    fn decimal_wire_layout_matches_flags_word() {
        let d = Decimal::new(true, 2, 12345).unwrap();
        let bytes = d.to_le_bytes();
        let flags = u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
        assert_eq!((flags >> 16) & 0xFF, 2);
        assert_ne!(flags & (1 << 31), 0);
        assert_eq!(u32::from_le_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]), 12345);
    }

    #[test]
    fn decimal_rejects_out_of_range_inputs() {
        assert!(Decimal::new(false, 29, 0).is_err());
        assert!(Decimal::new(false, 0, 1u128 << 96).is_err());
    }

    #[test]
    fn decimal_decode_rejects_stray_flag_bits() {
        let mut bytes = Decimal::new(false, 0, 1).unwrap().to_le_bytes();
        bytes[0] = 0x01;
        assert!(Decimal::from_le_bytes(bytes).is_err());
    }

    #[test]
    fn float128_roundtrips_as_opaque_bits() {
        let q = Float128::new(0x0123_4567_89AB_CDEF, 0xFEDC_BA98_7654_3210);
        assert_eq!(Float128::from_le_bytes(q.to_le_bytes()), q);
    }

    #[test]
    fn object_id_formats_as_hex() {
        let id = ObjectId::new([0, 1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 255]);
        assert_eq!(format!("{id}"), "000102030405060708090aff");
    }
}
