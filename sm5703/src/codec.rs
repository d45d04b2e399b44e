//! Fixed-point conversion between register words and physical units.
//!
//! Measurement registers hold an integer part in the high byte and a fraction (in 1/256 steps)
//! in the low byte. Signed quantities use bit 15 as a sign flag, not two's complement.

const SIGN_BIT: u16 = 0x8000;
const FRACTION_MASK: u16 = 0x00FF;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Parts {
    pub integer: u16,
    /// Fraction in 1/256 steps.
    pub fraction: u16,
    pub negative: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FixedPoint {
    integer_mask: u16,
    signed: bool,
    /// Physical units per integer step.
    scale: i32,
}

impl FixedPoint {
    /// Millivolts.
    pub const VOLTAGE: Self = Self::new(0x0700, false, 1000);
    /// Millivolts.
    pub const OCV: Self = Self::new(0x0700, false, 1000);
    /// Milliamperes.
    pub const CURRENT: Self = Self::new(0x0700, true, 1000);
    /// Tenths of a degree Celsius.
    pub const TEMPERATURE: Self = Self::new(0x7F00, true, 10);
    /// Tenths of a percent.
    pub const SOC: Self = Self::new(0xFF00, false, 10);

    const fn new(integer_mask: u16, signed: bool, scale: i32) -> Self {
        Self {
            integer_mask,
            signed,
            scale,
        }
    }

    pub const fn scale(self) -> i32 {
        self.scale
    }

    pub fn decode_parts(self, raw: u16) -> Parts {
        Parts {
            integer: (raw & self.integer_mask) >> 8,
            fraction: raw & FRACTION_MASK,
            negative: self.signed && raw & SIGN_BIT != 0,
        }
    }

    /// Converts a register word into physical units.
    ///
    /// ```rust
    /// # use sm5703::codec::FixedPoint;
    /// assert_eq!(FixedPoint::VOLTAGE.decode(0x0380), 3500);
    /// assert_eq!(FixedPoint::CURRENT.decode(0x8140), -1250);
    /// assert_eq!(FixedPoint::TEMPERATURE.decode(0x1980), 255);
    /// assert_eq!(FixedPoint::SOC.decode(0x3220), 501);
    /// ```
    pub fn decode(self, raw: u16) -> i32 {
        let parts = self.decode_parts(raw);

        let magnitude =
            parts.integer as i32 * self.scale + parts.fraction as i32 * self.scale / 256;

        if parts.negative {
            -magnitude
        } else {
            magnitude
        }
    }

    /// Converts a physical value into a register word.
    ///
    /// The fraction is rounded up so that decoding the result never yields less than `value`
    /// (except when the fraction saturates). Values outside the representable range saturate,
    /// negative values saturate to zero for unsigned quantities.
    pub fn encode(self, value: i32) -> u16 {
        let negative = self.signed && value < 0;
        let magnitude = if self.signed {
            value.unsigned_abs()
        } else {
            value.max(0) as u32
        };

        let scale = self.scale as u32;
        let max_integer = (self.integer_mask >> 8) as u32;

        let mut integer = magnitude / scale;
        let remainder = magnitude % scale;
        let mut fraction = ((remainder * 256 + scale - 1) / scale).min(FRACTION_MASK as u32);

        if integer > max_integer {
            integer = max_integer;
            fraction = FRACTION_MASK as u32;
        }

        let mut raw = ((integer as u16) << 8) | fraction as u16;
        if negative {
            raw |= SIGN_BIT;
        }

        raw
    }
}

/// Initial OCV word written to `IocvMan` after a surge reset.
///
/// ```rust
/// # use sm5703::codec::manual_ocv_word;
/// assert_eq!(manual_ocv_word(4000), 0x2000);
/// assert_eq!(manual_ocv_word(3700), 7577);
/// ```
pub fn manual_ocv_word(ocv_mv: u32) -> u16 {
    (ocv_mv * 256 / 125) as u16
}
