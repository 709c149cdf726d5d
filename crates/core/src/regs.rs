//! Register map decode and the Status word layout.

use serde::{Deserialize, Serialize};

use crate::config::{AddressMode, SpiConfig};
use crate::{
    CONTROL_EXT_REG, CONTROL_REG, EOP_VALUE_REG, RESERVED_REG, RX_DATA_REG, SLAVE_SELECT_REG,
    STATUS_E, STATUS_EOP, STATUS_REG, STATUS_ROE, STATUS_RRDY, STATUS_TMT, STATUS_TOE,
    STATUS_TRDY, TX_DATA_REG,
};

/// One of the eight 32-bit slots of the register map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Register {
    RxData,
    TxData,
    Status,
    Control,
    Reserved,
    SlaveSelect,
    EopValue,
    ControlExt,
}

impl Register {
    pub const ALL: [Register; 8] = [
        Register::RxData,
        Register::TxData,
        Register::Status,
        Register::Control,
        Register::Reserved,
        Register::SlaveSelect,
        Register::EopValue,
        Register::ControlExt,
    ];

    /// Byte offset in the register map.
    pub fn offset(self) -> u32 {
        match self {
            Register::RxData => RX_DATA_REG,
            Register::TxData => TX_DATA_REG,
            Register::Status => STATUS_REG,
            Register::Control => CONTROL_REG,
            Register::Reserved => RESERVED_REG,
            Register::SlaveSelect => SLAVE_SELECT_REG,
            Register::EopValue => EOP_VALUE_REG,
            Register::ControlExt => CONTROL_EXT_REG,
        }
    }

    pub fn from_offset(offset: u64) -> Option<Register> {
        Register::ALL.iter().copied().find(|r| r.offset() as u64 == offset)
    }

    pub fn name(self) -> &'static str {
        match self {
            Register::RxData => "RXDATA",
            Register::TxData => "TXDATA",
            Register::Status => "STATUS",
            Register::Control => "CONTROL",
            Register::Reserved => "RESERVED",
            Register::SlaveSelect => "SLAVESEL",
            Register::EopValue => "EOPVALUE",
            Register::ControlExt => "CONTROLEXT",
        }
    }

    /// Decode a raw request address.
    ///
    /// The address is truncated to `address_width` bits first. In word mode
    /// it is widened before shifting so high word indices cannot wrap onto a
    /// mapped offset.
    pub fn decode(addr: u32, config: &SpiConfig) -> Option<Register> {
        let addr = (addr & config.address_mask()) as u64;
        let offset = match config.address_mode {
            AddressMode::Byte => addr,
            AddressMode::Word => addr << config.bus_shift(),
        };
        Register::from_offset(offset)
    }

    /// Request address a bus master must present to reach this register.
    pub fn bus_address(self, config: &SpiConfig) -> u32 {
        match config.address_mode {
            AddressMode::Byte => self.offset(),
            AddressMode::Word => self.offset() >> config.bus_shift(),
        }
    }
}

/// Status register flags.
///
/// Only `roe` and `toe` are stored latches. Everything else is sampled from
/// the transport or recomputed every tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Status {
    pub roe: bool,
    pub toe: bool,
    pub tmt: bool,
    pub trdy: bool,
    pub rrdy: bool,
    pub eop: bool,
}

impl Status {
    /// Generic error flag: either overrun latch.
    pub fn error(&self) -> bool {
        self.roe || self.toe
    }

    pub fn bits(&self) -> u32 {
        ((self.roe as u32) << STATUS_ROE)
            | ((self.toe as u32) << STATUS_TOE)
            | ((self.tmt as u32) << STATUS_TMT)
            | ((self.trdy as u32) << STATUS_TRDY)
            | ((self.rrdy as u32) << STATUS_RRDY)
            | ((self.error() as u32) << STATUS_E)
            | ((self.eop as u32) << STATUS_EOP)
    }

    /// Decode a Status word. `E` is derived, so it is ignored here.
    pub fn from_bits(value: u32) -> Status {
        let bit = |n: u8| value & (1 << n) != 0;
        Status {
            roe: bit(STATUS_ROE),
            toe: bit(STATUS_TOE),
            tmt: bit(STATUS_TMT),
            trdy: bit(STATUS_TRDY),
            rrdy: bit(STATUS_RRDY),
            eop: bit(STATUS_EOP),
        }
    }
}
