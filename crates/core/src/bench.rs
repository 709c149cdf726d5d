//! Bus-master bench.
//!
//! Couples one [`UpSpi`] with a [`Transport`] and drives the generic bus the
//! way a driver does: one request tick per access, then wait for the
//! acknowledge. All offsets are byte offsets; they are turned into word
//! indices when the core is configured for word addressing.

use crate::bus::BusRequest;
use crate::error::{Error, Result};
use crate::regs::Register;
use crate::transport::Transport;
use crate::{UpSpi, RX_DATA_REG, STATUS_REG, TX_DATA_REG};

/// Ticks to wait for an acknowledge before giving up.
const ACK_TIMEOUT: u64 = 16;

pub struct Bench<T: Transport> {
    pub core: UpSpi,
    pub transport: T,
    /// Ticks since construction, reset included
    pub ticks: u64,
}

impl<T: Transport> Bench<T> {
    pub fn new(core: UpSpi, transport: T) -> Self {
        Bench { core, transport, ticks: 0 }
    }

    /// One clock edge. Both sides sample each other's pre-tick outputs.
    pub fn step_with(&mut self, bus: &BusRequest) {
        let cmd = self.core.transport_command();
        let status = self.transport.status();
        self.core.tick(bus, &status);
        self.transport.tick(&cmd);
        self.ticks += 1;
    }

    pub fn step(&mut self) {
        self.step_with(&BusRequest::default());
    }

    pub fn run(&mut self, ticks: u64) {
        for _ in 0..ticks {
            self.step();
        }
    }

    /// Hold reset for `ticks` clock edges.
    pub fn hold_reset(&mut self, ticks: u64) {
        for _ in 0..ticks {
            self.core.reset();
            self.transport.reset();
            self.ticks += 1;
        }
    }

    /// Bus address for a byte offset under the core's address mode.
    pub fn address(&self, offset: u32) -> u32 {
        let cfg = self.core.config();
        match Register::from_offset(offset as u64) {
            Some(r) => r.bus_address(cfg),
            None => match cfg.address_mode {
                crate::AddressMode::Byte => offset,
                crate::AddressMode::Word => offset >> cfg.bus_shift(),
            },
        }
    }

    pub fn write(&mut self, offset: u32, value: u32) -> Result<()> {
        let req = BusRequest::write(self.address(offset), value);
        self.step_with(&req);
        self.wait_ack("write acknowledge", |b| b.core.response().write_ack)
    }

    pub fn read(&mut self, offset: u32) -> Result<u32> {
        let req = BusRequest::read(self.address(offset));
        self.step_with(&req);
        self.wait_ack("read acknowledge", |b| b.core.response().read_ack)?;
        Ok(self.core.response().read_data)
    }

    fn wait_ack(&mut self, what: &'static str, ack: impl Fn(&Self) -> bool) -> Result<()> {
        let mut waited = 0;
        while !ack(self) {
            if waited >= ACK_TIMEOUT {
                return Err(Error::Timeout { what, ticks: waited });
            }
            self.step();
            waited += 1;
        }
        Ok(())
    }

    /// Poll Status until any bit of `mask` is set; returns the Status word.
    pub fn wait_status(&mut self, mask: u32, timeout: u64) -> Result<u32> {
        let start = self.ticks;
        loop {
            let status = self.read(STATUS_REG)?;
            if status & mask != 0 {
                return Ok(status);
            }
            if self.ticks - start >= timeout {
                return Err(Error::Timeout { what: "status", ticks: self.ticks - start });
            }
            self.step();
        }
    }

    /// Step until the interrupt line is high.
    pub fn wait_irq(&mut self, timeout: u64) -> Result<()> {
        let start = self.ticks;
        while !self.core.irq() {
            if self.ticks - start >= timeout {
                return Err(Error::Timeout { what: "interrupt", ticks: self.ticks - start });
            }
            self.step();
        }
        Ok(())
    }

    /// Wait for transmit ready, write one word, wait for receive ready and
    /// pop the answer.
    pub fn exchange(&mut self, word: u32, timeout: u64) -> Result<u32> {
        self.wait_status(1 << crate::STATUS_TRDY, timeout)?;
        self.write(TX_DATA_REG, word)?;
        self.wait_status(1 << crate::STATUS_RRDY, timeout)?;
        self.read(RX_DATA_REG)
    }
}
