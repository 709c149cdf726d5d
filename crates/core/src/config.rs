//! Instance configuration.
//!
//! Everything here is fixed when a core is built. Two cores built from
//! different configurations never share state, so a bus adapter variant can
//! own its own instance next to another one.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// How the generic bus presents request addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AddressMode {
    /// Address is the byte offset of the register.
    Byte,
    /// Address is a bus-word index (byte offset >> log2(bus_width)).
    Word,
}

/// Build-time parameters of one controller instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpiConfig {
    /// Number of significant request address bits (1..=32)
    pub address_width: u32,
    /// Bus data width in bytes (2 or 4)
    pub bus_width: u32,
    /// SPI word width in bytes (1..=bus_width)
    pub word_width: u32,
    /// Base clock rate in Hz
    pub clock_speed: u32,
    /// Number of select lines (1..=32)
    pub select_width: u32,
    /// Reset value of the rate exponent (0..=15)
    pub default_rate_div: u8,
    /// Reset value of clock polarity
    pub default_cpol: bool,
    /// Reset value of clock phase
    pub default_cpha: bool,
    pub address_mode: AddressMode,
}

impl Default for SpiConfig {
    fn default() -> Self {
        SpiConfig {
            address_width: 32,
            bus_width: 4,
            word_width: 4,
            clock_speed: 100_000_000,
            select_width: 16,
            default_rate_div: 0,
            default_cpol: false,
            default_cpha: false,
            address_mode: AddressMode::Byte,
        }
    }
}

/// All-ones mask of the low `bits` bits.
pub(crate) fn low_mask(bits: u32) -> u32 {
    if bits >= 32 { u32::MAX } else { (1u32 << bits) - 1 }
}

impl SpiConfig {
    /// Check every field against its allowed range.
    pub fn validate(&self) -> Result<()> {
        if self.address_width == 0 || self.address_width > 32 {
            return Err(invalid("address_width", format!("{} not in 1..=32", self.address_width)));
        }
        if self.bus_width != 2 && self.bus_width != 4 {
            return Err(invalid("bus_width", format!("{} bytes, expected 2 or 4", self.bus_width)));
        }
        if self.word_width == 0 || self.word_width > self.bus_width {
            return Err(invalid(
                "word_width",
                format!("{} bytes not in 1..={}", self.word_width, self.bus_width),
            ));
        }
        if self.clock_speed == 0 {
            return Err(invalid("clock_speed", "must be non-zero".into()));
        }
        if self.select_width == 0 || self.select_width > 32 {
            return Err(invalid("select_width", format!("{} not in 1..=32", self.select_width)));
        }
        if self.default_rate_div > 15 {
            return Err(invalid("default_rate_div", format!("{} not in 0..=15", self.default_rate_div)));
        }
        Ok(())
    }

    /// SPI word width in bits.
    pub fn word_bits(&self) -> u32 {
        self.word_width * 8
    }

    pub fn word_mask(&self) -> u32 {
        low_mask(self.word_bits())
    }

    pub fn bus_mask(&self) -> u32 {
        low_mask(self.bus_width * 8)
    }

    pub fn select_mask(&self) -> u32 {
        low_mask(self.select_width)
    }

    pub fn address_mask(&self) -> u32 {
        low_mask(self.address_width)
    }

    /// log2 of the bus width, i.e. the shift between byte and word addresses.
    pub fn bus_shift(&self) -> u32 {
        self.bus_width.trailing_zeros()
    }

    /// Reset value of the Control-Extension register.
    pub fn control_ext_reset(&self) -> u32 {
        (self.default_rate_div as u32 & crate::CONTROL_EXT_RATE_MASK)
            | ((self.default_cpol as u32) << crate::CONTROL_EXT_CPOL)
            | ((self.default_cpha as u32) << crate::CONTROL_EXT_CPHA)
    }

    /// Stable 32-bit FNV-1a digest of the configuration, stored in save states.
    pub fn fingerprint(&self) -> u32 {
        let mut bytes = Vec::with_capacity(32);
        for v in [
            self.address_width,
            self.bus_width,
            self.word_width,
            self.clock_speed,
            self.select_width,
        ] {
            bytes.extend_from_slice(&v.to_le_bytes());
        }
        bytes.push(self.default_rate_div);
        bytes.push(self.default_cpol as u8);
        bytes.push(self.default_cpha as u8);
        bytes.push(match self.address_mode {
            AddressMode::Byte => 0,
            AddressMode::Word => 1,
        });
        bytes.iter().fold(0x811C_9DC5u32, |h, &b| (h ^ b as u32).wrapping_mul(0x0100_0193))
    }
}

fn invalid(field: &'static str, reason: String) -> Error {
    Error::InvalidConfig { field, reason }
}
