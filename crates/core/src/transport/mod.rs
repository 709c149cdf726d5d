//! SPI shifting engine collaborator.
//!
//! The core never shifts bits itself. It talks to a [`Transport`] through
//! a push/pop handshake and reads its live bit counters:
//!
//! - [`TransportStatus`]: registered outputs of the engine, sampled by the core
//! - [`TransportCommand`]: registered outputs of the core, consumed by the engine
//! - [`LoopbackTransport`]: behavioral engine wired to an echo slave

mod loopback;

pub use loopback::{LoopbackTransport, Transfer};

/// What the engine presents to the core on a tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransportStatus {
    /// A push would be accepted
    pub tx_ready: bool,
    /// A received word is waiting to be popped
    pub rx_valid: bool,
    /// Currently latched receive word
    pub rx_data: u32,
    /// Bits still to shift out of the current word (0 = shift register empty)
    pub tx_bits: u32,
    /// Bits shifted in for the current word; holds at the word width once complete
    pub rx_bits: u32,
}

impl Default for TransportStatus {
    fn default() -> Self {
        TransportStatus { tx_ready: true, rx_valid: false, rx_data: 0, tx_bits: 0, rx_bits: 0 }
    }
}

/// What the core drives toward the engine.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TransportCommand {
    /// One-tick push pulse
    pub push: bool,
    pub push_data: u32,
    /// One-tick pop pulse
    pub pop: bool,
    /// SPI clock rate in Hz
    pub rate: u32,
    pub cpol: bool,
    pub cpha: bool,
    /// Active-low select lines
    pub select_n: u32,
}

/// A shifting engine clocked in the same domain as the core.
///
/// On every tick the core samples [`Transport::status`] and the engine
/// consumes the command the core presented before that tick, so both sides
/// update from each other's pre-tick outputs.
pub trait Transport {
    fn status(&self) -> TransportStatus;
    fn tick(&mut self, cmd: &TransportCommand);
    fn reset(&mut self);
}
