//! # upspi-core
//!
//! Cycle-accurate model of a memory-mapped SPI master controller. The core
//! sits between a generic request/acknowledge bus and an SPI shifting
//! engine, and reproduces the register map, status semantics and interrupt
//! behavior of the classic Altera-style SPI block so that drivers written
//! for that block run unmodified against it.
//!
//! ## Architecture
//!
//! - [`UpSpi`]: Top-level core that wires the register file, rate adapter and interrupt aggregator
//! - [`SpiConfig`]: Immutable per-instance configuration (widths, clock, reset defaults)
//! - [`RegisterFile`]: Seven architectural registers, overrun latches, address decode
//! - [`interrupt`]: Five maskable interrupt sources folded into one level
//! - [`rate`]: SPI clock rate derived from Control-Extension every tick
//! - [`bus`]: Read/write channel handshake (ack exactly one tick after request)
//! - [`transport`]: Shifting engine interface and a loopback engine model
//! - [`bench`]: Bus master that drives a core + transport like a driver would
//! - [`debugger`]: Register names and text dumps
//! - [`savestate`]: Compressed snapshots of the core state
//!
//! ## Timing
//!
//! One call to [`UpSpi::tick`] is one rising clock edge. Every output read
//! through the accessors is a registered value, valid for the whole tick
//! that follows.

pub mod bench;
pub mod bus;
pub mod config;
pub mod debugger;
pub mod error;
pub mod interrupt;
pub mod rate;
pub mod register_file;
pub mod regs;
pub mod savestate;
pub mod transport;

pub use bench::Bench;
pub use bus::{BusRequest, BusResponse};
pub use config::{AddressMode, SpiConfig};
pub use error::{Error, Result};
pub use register_file::RegisterFile;
pub use regs::{Register, Status};
pub use transport::{LoopbackTransport, Transport, TransportCommand, TransportStatus};

// Register byte offsets
pub const RX_DATA_REG: u32 = 0x00;
pub const TX_DATA_REG: u32 = 0x04;
pub const STATUS_REG: u32 = 0x08;
pub const CONTROL_REG: u32 = 0x0C;
pub const RESERVED_REG: u32 = 0x10;
pub const SLAVE_SELECT_REG: u32 = 0x14;
pub const EOP_VALUE_REG: u32 = 0x18;
pub const CONTROL_EXT_REG: u32 = 0x1C;

// Status bit positions
/// Receive overrun
pub const STATUS_ROE: u8 = 3;
/// Transmit overrun
pub const STATUS_TOE: u8 = 4;
/// Transmit shift register empty
pub const STATUS_TMT: u8 = 5;
/// Transmit ready
pub const STATUS_TRDY: u8 = 6;
/// Receive ready
pub const STATUS_RRDY: u8 = 7;
/// Any error (ROE | TOE)
pub const STATUS_E: u8 = 8;
/// End of packet
pub const STATUS_EOP: u8 = 9;

// Control bit positions
pub const CONTROL_IROE: u8 = 3;
pub const CONTROL_ITOE: u8 = 4;
pub const CONTROL_ITRDY: u8 = 6;
pub const CONTROL_IRRDY: u8 = 7;
/// Interrupt on any error
pub const CONTROL_IE: u8 = 8;
pub const CONTROL_IEOP: u8 = 9;
/// Force all select lines active
pub const CONTROL_SSO: u8 = 10;

// Control-Extension fields
pub const CONTROL_EXT_RATE_MASK: u32 = 0xF;
pub const CONTROL_EXT_CPOL: u8 = 4;
pub const CONTROL_EXT_CPHA: u8 = 5;

/// One controller instance.
pub struct UpSpi {
    config: SpiConfig,
    pub regs: RegisterFile,
    pub rate: rate::RateAdapter,
    pub interrupt: interrupt::InterruptAggregator,
    /// Clock ticks since the last reset
    pub tick_count: u64,
}

impl UpSpi {
    /// Build a core, rejecting configurations outside their allowed ranges.
    pub fn new(config: SpiConfig) -> Result<Self> {
        config.validate()?;
        Ok(UpSpi {
            config,
            regs: RegisterFile::new(config),
            rate: rate::RateAdapter::new(&config),
            interrupt: interrupt::InterruptAggregator::new(),
            tick_count: 0,
        })
    }

    /// Synchronous reset. While reset is held no acknowledge is produced.
    pub fn reset(&mut self) {
        self.regs.reset();
        self.rate.reset(&self.config);
        self.interrupt.reset();
        self.tick_count = 0;
        log::info!("upspi reset");
    }

    /// Advance one clock edge.
    ///
    /// `xport` is the transport's registered output for this tick. The rate
    /// adapter samples Control-Extension before the register file commits
    /// this tick's write, so a new rate exponent takes effect one tick later.
    /// The interrupt line is evaluated from the committed state.
    pub fn tick(&mut self, bus: &BusRequest, xport: &TransportStatus) {
        self.rate.tick(self.regs.control_ext);
        self.regs.tick(bus, xport);
        self.interrupt.tick(&self.regs.status(), self.regs.control);
        self.tick_count += 1;
    }

    pub fn config(&self) -> &SpiConfig {
        &self.config
    }

    pub fn response(&self) -> BusResponse {
        self.regs.response()
    }

    /// Registered outputs toward the transport.
    pub fn transport_command(&self) -> TransportCommand {
        TransportCommand {
            push: self.regs.push(),
            push_data: self.regs.tx_data,
            pop: self.regs.pop(),
            rate: self.rate.rate(),
            cpol: rate::cpol(self.regs.control_ext),
            cpha: rate::cpha(self.regs.control_ext),
            select_n: self.regs.select_n(),
        }
    }

    pub fn irq(&self) -> bool {
        self.interrupt.irq()
    }

    pub fn status(&self) -> Status {
        self.regs.status()
    }

    /// Capture the full core state.
    pub fn save_state(&self) -> savestate::CoreState {
        savestate::CoreState {
            regs: self.regs.save_state(),
            rate: self.rate.rate(),
            irq: self.interrupt.irq(),
            tick_count: self.tick_count,
        }
    }

    /// Restore a state captured from an instance with the same configuration.
    pub fn load_state(&mut self, s: &savestate::CoreState) {
        self.regs.load_state(&s.regs);
        self.rate.restore(s.rate);
        self.interrupt.restore(s.irq);
        self.tick_count = s.tick_count;
    }
}
