//! SPI clock rate derivation.
//!
//! The rate exponent lives in Control-Extension bits 0..3. Every tick the
//! forwarded rate is recomputed as `clock_speed >> (exponent + 1)`, i.e. the
//! base clock divided by a power of two between 2 and 65536. The result is
//! registered, so a new exponent shows up one tick after it was written.
//! Polarity and phase are not registered here; they are forwarded straight
//! from the register.

use crate::config::SpiConfig;
use crate::{CONTROL_EXT_CPHA, CONTROL_EXT_CPOL, CONTROL_EXT_RATE_MASK};

pub struct RateAdapter {
    clock_speed: u32,
    rate: u32,
}

/// Rate exponent field of a Control-Extension value.
pub fn rate_exponent(control_ext: u32) -> u32 {
    control_ext & CONTROL_EXT_RATE_MASK
}

/// Divisor applied to the base clock for a Control-Extension value.
pub fn divisor(control_ext: u32) -> u32 {
    1 << (rate_exponent(control_ext) + 1)
}

pub fn cpol(control_ext: u32) -> bool {
    control_ext & (1 << CONTROL_EXT_CPOL) != 0
}

pub fn cpha(control_ext: u32) -> bool {
    control_ext & (1 << CONTROL_EXT_CPHA) != 0
}

impl RateAdapter {
    pub fn new(config: &SpiConfig) -> Self {
        let mut r = RateAdapter { clock_speed: config.clock_speed, rate: 0 };
        r.tick(config.control_ext_reset());
        r
    }

    pub fn reset(&mut self, config: &SpiConfig) {
        *self = RateAdapter::new(config);
    }

    /// Recompute from the Control-Extension value present on this tick.
    pub fn tick(&mut self, control_ext: u32) {
        self.rate = self.clock_speed >> (rate_exponent(control_ext) + 1);
    }

    /// Forwarded SPI clock rate in Hz.
    pub fn rate(&self) -> u32 {
        self.rate
    }

    pub(crate) fn restore(&mut self, rate: u32) {
        self.rate = rate;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_divisor_range() {
        assert_eq!(divisor(0), 2);
        assert_eq!(divisor(15), 65536);
        // only the low four bits matter
        assert_eq!(divisor(0x33), 16);
    }

    #[test]
    fn test_rate_exponent_ignores_mode_bits() {
        assert_eq!(rate_exponent(0x3F), 15);
        assert_eq!(rate_exponent(0x30), 0);
        assert_eq!(rate_exponent(0x25), 5);
    }

    #[test]
    fn test_reset_uses_default_exponent() {
        let cfg = SpiConfig { default_rate_div: 2, ..SpiConfig::default() };
        let r = RateAdapter::new(&cfg);
        assert_eq!(r.rate(), 100_000_000 >> 3);
    }

    #[test]
    fn test_recompute_is_idempotent() {
        let mut r = RateAdapter::new(&SpiConfig::default());
        for _ in 0..8 {
            r.tick(7);
            assert_eq!(r.rate(), 100_000_000 >> 8);
        }
    }

    #[test]
    fn test_mode_bits() {
        assert!(cpol(0x10) && !cpha(0x10));
        assert!(!cpol(0x20) && cpha(0x20));
    }
}
