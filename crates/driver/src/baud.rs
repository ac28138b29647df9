// LabWired - Firmware Simulation Platform
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

//! Baud-rate divisor for 16x oversampling.
//!
//! The USART divides its kernel clock by `USARTDIV = clk / baud`, which the
//! BRR register stores as a 12-bit mantissa (`USARTDIV / 16`) and a 4-bit
//! fraction (`USARTDIV % 16`). With 16x oversampling the packed value is
//! USARTDIV itself.

use core::fmt;
use core::ops::RangeInclusive;

/// Baud rates the driver is documented against. Rates outside the range are
/// accepted as long as they produce a valid divisor.
pub const SUPPORTED_BAUD_RATES: RangeInclusive<u32> = 300..=460_800;

pub const MANTISSA_MAX: u16 = 0x0FFF;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    ZeroBaudRate,
    /// The baud rate is too high for the reference clock.
    MantissaZero { baud: u32 },
    /// The baud rate is too low for the 12-bit mantissa.
    MantissaOverflow { baud: u32, mantissa: u32 },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ZeroBaudRate => write!(f, "baud rate must be nonzero"),
            Self::MantissaZero { baud } => {
                write!(f, "baud rate {} is too high: divisor mantissa is zero", baud)
            }
            Self::MantissaOverflow { baud, mantissa } => write!(
                f,
                "baud rate {} is too low: divisor mantissa {} exceeds {}",
                baud, mantissa, MANTISSA_MAX
            ),
        }
    }
}

impl core::error::Error for ConfigError {}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Divisor {
    pub mantissa: u16,
    pub fraction: u8,
}

impl Divisor {
    /// `USARTDIV = clk / baud`, split into `USARTDIV / 16` and `USARTDIV % 16`.
    ///
    /// Unchecked: `baud` must be nonzero and the result is only meaningful
    /// when [`Divisor::is_valid`] holds.
    pub const fn from_clock(reference_clock_hz: u32, baud: u32) -> Self {
        let usart_div = reference_clock_hz / baud;
        Self {
            mantissa: (usart_div / 16) as u16,
            fraction: (usart_div % 16) as u8,
        }
    }

    /// The same divisor computed as whole part of `clk / (16 * baud)` and
    /// the remainder rescaled by the baud rate.
    pub const fn two_step(reference_clock_hz: u32, baud: u32) -> Self {
        let mantissa = reference_clock_hz / baud / 16;
        let fraction = (reference_clock_hz - baud * mantissa * 16) / baud;
        Self {
            mantissa: mantissa as u16,
            fraction: fraction as u8,
        }
    }

    pub fn checked(reference_clock_hz: u32, baud: u32) -> Result<Self, ConfigError> {
        if baud == 0 {
            return Err(ConfigError::ZeroBaudRate);
        }
        let mantissa = reference_clock_hz / baud / 16;
        if mantissa == 0 {
            return Err(ConfigError::MantissaZero { baud });
        }
        if mantissa > MANTISSA_MAX as u32 {
            return Err(ConfigError::MantissaOverflow { baud, mantissa });
        }
        Ok(Self::from_clock(reference_clock_hz, baud))
    }

    pub const fn is_valid(self) -> bool {
        self.mantissa != 0 && self.mantissa <= MANTISSA_MAX && self.fraction < 16
    }

    /// BRR encoding: `DIV_Mantissa[15:4] | DIV_Fraction[3:0]`.
    pub const fn bits(self) -> u32 {
        ((self.mantissa as u32) << 4) | self.fraction as u32
    }

    pub const fn from_bits(bits: u32) -> Self {
        Self {
            mantissa: ((bits >> 4) & MANTISSA_MAX as u32) as u16,
            fraction: (bits & 0xF) as u8,
        }
    }

    /// Baud rate this divisor actually produces from `reference_clock_hz`.
    pub const fn effective_baud(self, reference_clock_hz: u32) -> u32 {
        let div = self.bits();
        if div == 0 {
            0
        } else {
            reference_clock_hz / div
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HSI: u32 = 8_000_000;

    #[test]
    fn test_reference_table_at_8mhz() {
        let cases = [
            (9_600, 52, 1),
            (115_200, 4, 5),
            (460_800, 1, 1),
            (500_000, 1, 0),
        ];
        for (baud, mantissa, fraction) in cases {
            let div = Divisor::from_clock(HSI, baud);
            assert_eq!(
                (div.mantissa, div.fraction),
                (mantissa, fraction),
                "baud {}",
                baud
            );
        }
    }

    #[test]
    fn test_formulations_agree_over_supported_range() {
        for baud in SUPPORTED_BAUD_RATES {
            assert_eq!(
                Divisor::from_clock(HSI, baud),
                Divisor::two_step(HSI, baud),
                "baud {}",
                baud
            );
        }
    }

    #[test]
    fn test_formulations_agree_at_other_clocks() {
        for clk in [1_000_000, 14_745_600, 48_000_000] {
            for baud in (300..=460_800).step_by(97) {
                assert_eq!(Divisor::from_clock(clk, baud), Divisor::two_step(clk, baud));
            }
        }
    }

    #[test]
    fn test_bits_is_usartdiv() {
        for baud in [300, 9_600, 115_200, 460_800] {
            let div = Divisor::from_clock(HSI, baud);
            assert_eq!(div.bits(), HSI / baud);
            assert_eq!(Divisor::from_bits(div.bits()), div);
        }
    }

    #[test]
    fn test_checked_rejects_invalid_divisors() {
        assert_eq!(Divisor::checked(HSI, 0), Err(ConfigError::ZeroBaudRate));
        assert_eq!(
            Divisor::checked(HSI, 1_000_000),
            Err(ConfigError::MantissaZero { baud: 1_000_000 })
        );
        assert_eq!(
            Divisor::checked(HSI, 100),
            Err(ConfigError::MantissaOverflow {
                baud: 100,
                mantissa: 5_000
            })
        );
    }

    #[test]
    fn test_checked_accepts_documented_edges() {
        let low = Divisor::checked(HSI, 300).unwrap();
        assert_eq!(low.mantissa, 1_666);
        assert!(low.is_valid());

        let high = Divisor::checked(HSI, 500_000).unwrap();
        assert_eq!((high.mantissa, high.fraction), (1, 0));
    }

    #[test]
    fn test_effective_baud() {
        let div = Divisor::from_clock(HSI, 115_200);
        // 8 MHz / 69 = 115942
        assert_eq!(div.effective_baud(HSI), 115_942);
    }
}
