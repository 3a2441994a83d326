//! Factory calibration coefficients.

use super::bits::read_bits;

/// Bit-packed calibration coefficients written at manufacture.
///
/// The coefficients are opaque parameters to
/// [`factory_glucose`](crate::glucose::factory_glucose). The all-zero value is
/// treated as "no calibration".
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct CalibrationInfo {
    pub i1: i32,
    pub i2: i32,
    /// The only coefficient that may be negative.
    pub i3: i32,
    pub i4: i32,
    pub i5: i32,
    pub i6: i32,
}

impl CalibrationInfo {
    /// Extract the coefficients from a memory image.
    ///
    /// `i1` and `i2` live in the header, just after its checksum; the rest are
    /// in the footer at `0x150`.
    pub fn extract(r: &[u8]) -> Self {
        let field = |byte, bit, count| read_bits(r, byte, bit, count) as i32;

        let i3 = field(0x150, 0, 8);

        Self {
            i1: field(2, 0, 3),
            i2: field(2, 3, 0xA),
            i3: if field(0x150, 0x21, 1) != 0 { -i3 } else { i3 },
            i4: field(0x150, 8, 0xE),
            i5: field(0x150, 0x28, 0xC) << 2,
            i6: field(0x150, 0x34, 0xC) << 2,
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}
