//! Register file and address decoder.
//!
//! Owns every architectural register plus the two overrun latches. One call
//! to [`RegisterFile::tick`] is one clock edge: all reads of current state
//! happen first, then the next state is committed at once.
//!
//! Register map (byte offsets):
//!
//! | Offset | Register | Access |
//! |--------|----------|--------|
//! | 0x00 | RX data | R, pops the transport |
//! | 0x04 | TX data | W, pushes to the transport |
//! | 0x08 | Status | R, any write clears ROE/TOE |
//! | 0x0C | Control | R/W |
//! | 0x10 | reserved | reads zero |
//! | 0x14 | Slave select | R/W |
//! | 0x18 | EOP value | R/W |
//! | 0x1C | Control extension | R/W |

use crate::bus::{BusRequest, BusResponse, Handshake};
use crate::config::SpiConfig;
use crate::regs::{Register, Status};
use crate::transport::TransportStatus;
use crate::CONTROL_SSO;

pub struct RegisterFile {
    config: SpiConfig,
    pub tx_data: u32,
    pub control: u32,
    pub control_ext: u32,
    pub slave_select: u32,
    pub eop_value: u32,
    /// Last receive word sampled from the transport
    pub rx_data: u32,
    roe: bool,
    toe: bool,
    /// Status as evaluated on the last tick, overrun latches included
    status: Status,
    /// `rx_bits` reached the full word on the previous tick
    rx_was_full: bool,
    read_data: u32,
    read_ch: Handshake,
    write_ch: Handshake,
    push: bool,
    pop: bool,
}

impl RegisterFile {
    pub fn new(config: SpiConfig) -> Self {
        RegisterFile {
            config,
            tx_data: 0,
            control: 0,
            control_ext: config.control_ext_reset(),
            slave_select: config.select_mask(),
            eop_value: 0,
            rx_data: 0,
            roe: false,
            toe: false,
            status: Status::default(),
            rx_was_full: false,
            read_data: 0,
            read_ch: Handshake::Idle,
            write_ch: Handshake::Idle,
            push: false,
            pop: false,
        }
    }

    pub fn reset(&mut self) {
        *self = RegisterFile::new(self.config);
    }

    /// Status as seen by a read on this tick.
    ///
    /// A push or pop issued on the previous tick has not reached the
    /// transport yet, so the matching ready flag is held low until it has.
    pub fn live_status(&self, xport: &TransportStatus) -> Status {
        let mask = self.config.word_mask();
        let eop_match = self.eop_value & mask;
        Status {
            roe: self.roe,
            toe: self.toe,
            tmt: xport.tx_bits == 0,
            trdy: xport.tx_ready && !self.push,
            rrdy: xport.rx_valid && !self.pop,
            eop: eop_match == self.tx_data & mask || eop_match == xport.rx_data & mask,
        }
    }

    /// Advance one clock edge.
    pub fn tick(&mut self, bus: &BusRequest, xport: &TransportStatus) {
        let live = self.live_status(xport);
        let mut roe = self.roe;
        let mut toe = self.toe;

        let rx_full = xport.rx_bits >= self.config.word_bits();
        let rx_completed = rx_full && !self.rx_was_full;

        let mut pop = false;
        if bus.read_req {
            self.read_data = match Register::decode(bus.read_addr, &self.config) {
                Some(Register::RxData) => {
                    pop = true;
                    xport.rx_data & self.config.word_mask()
                }
                Some(Register::Status) => live.bits(),
                Some(Register::Control) => self.control,
                Some(Register::SlaveSelect) => self.slave_select,
                Some(Register::EopValue) => self.eop_value,
                Some(Register::ControlExt) => self.control_ext,
                Some(Register::TxData) | Some(Register::Reserved) => 0,
                None => {
                    log::debug!("read of unmapped address {:#x}", bus.read_addr);
                    0
                }
            };
            log::trace!("read {:#x} -> {:#x}", bus.read_addr, self.read_data);
        }

        let mut push = false;
        if bus.write_req {
            let data = bus.write_data;
            log::trace!("write {:#x} <- {:#x}", bus.write_addr, data);
            match Register::decode(bus.write_addr, &self.config) {
                Some(Register::TxData) => {
                    self.tx_data = data & self.config.word_mask();
                    push = true;
                    if !live.trdy {
                        if !toe {
                            log::debug!("transmit overrun: {:#x} written while not ready", data);
                        }
                        toe = true;
                    }
                }
                Some(Register::Status) => {
                    if roe || toe {
                        log::debug!("overrun latches cleared (roe={} toe={})", roe, toe);
                    }
                    roe = false;
                    toe = false;
                }
                Some(Register::Control) => self.control = data & self.config.bus_mask(),
                Some(Register::ControlExt) => self.control_ext = data & self.config.bus_mask(),
                Some(Register::SlaveSelect) => self.slave_select = data & self.config.select_mask(),
                Some(Register::EopValue) => self.eop_value = data & self.config.bus_mask(),
                Some(Register::RxData) | Some(Register::Reserved) => {}
                None => log::debug!("write of unmapped address {:#x}", bus.write_addr),
            }
        }

        // A word completing this tick is a new event, so it survives a
        // Status write on the same tick.
        if rx_completed && self.status.rrdy {
            if !roe {
                log::debug!("receive overrun: word completed before previous pop");
            }
            roe = true;
        }

        self.roe = roe;
        self.toe = toe;
        self.status = Status { roe, toe, ..live };
        self.rx_was_full = rx_full;
        self.rx_data = xport.rx_data & self.config.word_mask();
        self.read_ch.tick(bus.read_req);
        self.write_ch.tick(bus.write_req);
        self.push = push;
        self.pop = pop;
    }

    /// Status evaluated on the last tick.
    pub fn status(&self) -> Status {
        self.status
    }

    pub fn response(&self) -> BusResponse {
        BusResponse {
            read_ack: self.read_ch.ack(),
            read_data: self.read_data,
            write_ack: self.write_ch.ack(),
        }
    }

    pub fn push(&self) -> bool {
        self.push
    }

    pub fn pop(&self) -> bool {
        self.pop
    }

    pub fn force_select(&self) -> bool {
        self.control & (1 << CONTROL_SSO) != 0
    }

    /// Active-low select lines driven toward the transport.
    pub fn select_n(&self) -> u32 {
        if self.force_select() { 0 } else { self.slave_select & self.config.select_mask() }
    }

    /// Capture state for save state.
    pub fn save_state(&self) -> crate::savestate::RegisterFileState {
        crate::savestate::RegisterFileState {
            tx_data: self.tx_data,
            control: self.control,
            control_ext: self.control_ext,
            slave_select: self.slave_select,
            eop_value: self.eop_value,
            rx_data: self.rx_data,
            roe: self.roe,
            toe: self.toe,
            status: self.status,
            rx_was_full: self.rx_was_full,
            read_data: self.read_data,
            read_ch: self.read_ch,
            write_ch: self.write_ch,
            push: self.push,
            pop: self.pop,
        }
    }

    /// Restore state from save state.
    pub fn load_state(&mut self, s: &crate::savestate::RegisterFileState) {
        self.tx_data = s.tx_data;
        self.control = s.control;
        self.control_ext = s.control_ext;
        self.slave_select = s.slave_select;
        self.eop_value = s.eop_value;
        self.rx_data = s.rx_data;
        self.roe = s.roe;
        self.toe = s.toe;
        self.status = s.status;
        self.rx_was_full = s.rx_was_full;
        self.read_data = s.read_data;
        self.read_ch = s.read_ch;
        self.write_ch = s.write_ch;
        self.push = s.push;
        self.pop = s.pop;
    }
}
