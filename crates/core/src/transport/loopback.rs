//! Behavioral SPI master engine with an echo slave on the other end.
//!
//! Words are shifted MSB first. The slave answers each transfer with the
//! word it received during the previous one, so the very first word read
//! back is the slave's reset contents (zero).
//!
//! Timing: one SPI clock period per bit, `clock_speed / rate` core ticks
//! each. `tx_bits` counts down from the word width, `rx_bits` counts up and
//! holds at the word width once the word lands in the receive latch.

use super::{Transport, TransportCommand, TransportStatus};
use crate::config::SpiConfig;
use crate::error::Result;

/// One completed word exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transfer {
    pub mosi: u32,
    pub miso: u32,
    pub select_n: u32,
    pub cpol: bool,
    pub cpha: bool,
}

pub struct LoopbackTransport {
    clock_speed: u32,
    word_bits: u32,
    word_mask: u32,
    busy: bool,
    countdown: u32,
    tx_word: u32,
    rx_shift: u32,
    /// Word the slave shifts back on the next transfer
    echo: u32,
    tx_bits: u32,
    rx_bits: u32,
    rx_data: u32,
    rx_valid: bool,
    current: Option<Transfer>,
    /// Completed transfers, oldest first
    pub transfers: Vec<Transfer>,
    /// Pushes that arrived while a word was shifting
    pub dropped: u32,
}

impl LoopbackTransport {
    /// Build an engine for `config`, rejecting it the same way the core does.
    pub fn new(config: &SpiConfig) -> Result<Self> {
        config.validate()?;
        Ok(LoopbackTransport {
            clock_speed: config.clock_speed,
            word_bits: config.word_bits(),
            word_mask: config.word_mask(),
            busy: false,
            countdown: 0,
            tx_word: 0,
            rx_shift: 0,
            echo: 0,
            tx_bits: 0,
            rx_bits: 0,
            rx_data: 0,
            rx_valid: false,
            current: None,
            transfers: Vec::new(),
            dropped: 0,
        })
    }

    pub fn is_busy(&self) -> bool {
        self.busy
    }

    /// Words the slave has seen on MOSI, oldest first.
    pub fn mosi_words(&self) -> Vec<u32> {
        self.transfers.iter().map(|t| t.mosi).collect()
    }

    fn ticks_per_bit(&self, rate: u32) -> u32 {
        (self.clock_speed / rate.max(1)).max(1)
    }

    fn start(&mut self, cmd: &TransportCommand) {
        self.busy = true;
        self.tx_word = cmd.push_data & self.word_mask;
        self.tx_bits = self.word_bits;
        self.rx_bits = 0;
        self.rx_shift = 0;
        self.countdown = self.ticks_per_bit(cmd.rate);
        self.current = Some(Transfer {
            mosi: self.tx_word,
            miso: self.echo,
            select_n: cmd.select_n,
            cpol: cmd.cpol,
            cpha: cmd.cpha,
        });
    }

    fn shift_bit(&mut self, rate: u32) {
        let idx = self.tx_bits - 1;
        let miso = (self.echo >> idx) & 1;
        self.rx_shift = (self.rx_shift << 1) | miso;
        self.tx_bits -= 1;
        self.rx_bits += 1;
        if self.tx_bits == 0 {
            self.rx_data = self.rx_shift & self.word_mask;
            self.rx_valid = true;
            self.echo = self.tx_word;
            self.busy = false;
            if let Some(t) = self.current.take() {
                self.transfers.push(t);
            }
        } else {
            self.countdown = self.ticks_per_bit(rate);
        }
    }
}

impl Transport for LoopbackTransport {
    fn status(&self) -> TransportStatus {
        TransportStatus {
            tx_ready: !self.busy,
            rx_valid: self.rx_valid,
            rx_data: self.rx_data,
            tx_bits: self.tx_bits,
            rx_bits: self.rx_bits,
        }
    }

    fn tick(&mut self, cmd: &TransportCommand) {
        if cmd.pop {
            self.rx_valid = false;
        }
        if self.busy {
            if cmd.push {
                self.dropped += 1;
                log::debug!("loopback: push of {:#x} dropped, engine busy", cmd.push_data);
            }
            self.countdown = self.countdown.saturating_sub(1);
            if self.countdown == 0 {
                self.shift_bit(cmd.rate);
            }
        } else if cmd.push {
            self.start(cmd);
        }
    }

    fn reset(&mut self) {
        self.busy = false;
        self.countdown = 0;
        self.tx_word = 0;
        self.rx_shift = 0;
        self.echo = 0;
        self.tx_bits = 0;
        self.rx_bits = 0;
        self.rx_data = 0;
        self.rx_valid = false;
        self.current = None;
        self.transfers.clear();
        self.dropped = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn push(data: u32, rate: u32) -> TransportCommand {
        TransportCommand { push: true, push_data: data, rate, ..Default::default() }
    }

    fn idle(rate: u32) -> TransportCommand {
        TransportCommand { rate, ..Default::default() }
    }

    fn byte_config() -> SpiConfig {
        SpiConfig { word_width: 1, clock_speed: 1_000, ..SpiConfig::default() }
    }

    #[test]
    fn test_word_takes_bits_times_divisor() {
        let mut t = LoopbackTransport::new(&byte_config()).unwrap();
        // rate = clock/2 → 2 ticks per bit
        t.tick(&push(0xA5, 500));
        assert!(t.is_busy());
        assert_eq!(t.status().tx_bits, 8);
        let mut ticks = 0;
        while t.is_busy() {
            t.tick(&idle(500));
            ticks += 1;
        }
        assert_eq!(ticks, 16);
        let s = t.status();
        assert!(s.rx_valid && s.tx_ready);
        assert_eq!((s.tx_bits, s.rx_bits), (0, 8));
        assert_eq!(s.rx_data, 0);
    }

    #[test]
    fn test_echo_returns_previous_word() {
        let mut t = LoopbackTransport::new(&byte_config()).unwrap();
        for w in [0x12, 0x34] {
            t.tick(&push(w, 1_000));
            while t.is_busy() {
                t.tick(&idle(1_000));
            }
        }
        assert_eq!(t.status().rx_data, 0x12);
        assert_eq!(t.mosi_words(), vec![0x12, 0x34]);
    }

    #[test]
    fn test_push_while_busy_is_dropped() {
        let mut t = LoopbackTransport::new(&byte_config()).unwrap();
        t.tick(&push(1, 1_000));
        t.tick(&push(2, 1_000));
        assert_eq!(t.dropped, 1);
    }

    #[test]
    fn test_pop_clears_valid() {
        let mut t = LoopbackTransport::new(&byte_config()).unwrap();
        t.tick(&push(7, 1_000));
        while t.is_busy() {
            t.tick(&idle(1_000));
        }
        assert!(t.status().rx_valid);
        t.tick(&TransportCommand { pop: true, ..idle(1_000) });
        assert!(!t.status().rx_valid);
    }

    #[test]
    fn test_zero_width_word_is_rejected() {
        let cfg = SpiConfig { word_width: 0, ..byte_config() };
        assert!(matches!(
            LoopbackTransport::new(&cfg),
            Err(crate::Error::InvalidConfig { field: "word_width", .. })
        ));
    }

    #[test]
    fn test_reset_clears_transfer_log() {
        let mut t = LoopbackTransport::new(&byte_config()).unwrap();
        t.tick(&push(0x5A, 1_000));
        t.tick(&push(0x01, 1_000));
        while t.is_busy() {
            t.tick(&idle(1_000));
        }
        assert_eq!(t.mosi_words(), vec![0x5A]);
        assert_eq!(t.dropped, 1);
        t.reset();
        assert!(t.mosi_words().is_empty());
        assert_eq!(t.dropped, 0);
        assert!(!t.status().rx_valid);
    }
}
