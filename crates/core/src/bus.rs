//! Generic bus handshake.
//!
//! Read and write are independent channels. Each one is a two-state
//! machine: a request seen on tick N puts the channel in `Pending`, and the
//! acknowledge is high for exactly the tick after, mirroring the request.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Handshake {
    #[default]
    Idle,
    Pending,
}

impl Handshake {
    pub fn tick(&mut self, req: bool) {
        *self = if req { Handshake::Pending } else { Handshake::Idle };
    }

    pub fn ack(self) -> bool {
        self == Handshake::Pending
    }
}

/// Bus-side inputs sampled on one tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BusRequest {
    pub read_req: bool,
    pub read_addr: u32,
    pub write_req: bool,
    pub write_addr: u32,
    pub write_data: u32,
}

impl BusRequest {
    pub fn read(addr: u32) -> Self {
        BusRequest { read_req: true, read_addr: addr, ..Default::default() }
    }

    pub fn write(addr: u32, data: u32) -> Self {
        BusRequest { write_req: true, write_addr: addr, write_data: data, ..Default::default() }
    }

    /// Combine a read and a write into one full-duplex request.
    pub fn with_read(mut self, addr: u32) -> Self {
        self.read_req = true;
        self.read_addr = addr;
        self
    }
}

/// Registered bus-side outputs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BusResponse {
    pub read_ack: bool,
    pub read_data: u32,
    pub write_ack: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ack_mirrors_request() {
        let mut ch = Handshake::default();
        assert!(!ch.ack());
        ch.tick(true);
        assert!(ch.ack());
        ch.tick(false);
        assert!(!ch.ack());
    }

    #[test]
    fn test_back_to_back_requests() {
        let mut ch = Handshake::default();
        for _ in 0..4 {
            ch.tick(true);
            assert!(ch.ack());
        }
        ch.tick(false);
        assert_eq!(ch, Handshake::Idle);
    }

    #[test]
    fn test_full_duplex_request() {
        let req = BusRequest::write(0x08, 0).with_read(0x08);
        assert!(req.read_req && req.write_req);
        assert_eq!(req.read_addr, req.write_addr);
    }
}
