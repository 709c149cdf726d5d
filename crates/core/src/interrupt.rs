//! Interrupt aggregation.
//!
//! Five sources, each gated by its own enable bits in Control, ORed into a
//! single registered level. Ready sources are levels too, so an enabled
//! ready interrupt stays high until the driver services it.

use crate::regs::Status;
use crate::{CONTROL_IE, CONTROL_IEOP, CONTROL_IROE, CONTROL_IRRDY, CONTROL_ITOE, CONTROL_ITRDY};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InterruptSource {
    ReceiveOverrun,
    TransmitOverrun,
    TransmitReady,
    ReceiveReady,
    EndOfPacket,
}

impl InterruptSource {
    pub const ALL: [InterruptSource; 5] = [
        InterruptSource::ReceiveOverrun,
        InterruptSource::TransmitOverrun,
        InterruptSource::TransmitReady,
        InterruptSource::ReceiveReady,
        InterruptSource::EndOfPacket,
    ];

    /// Control bits that unmask this source; any one of them is enough.
    pub fn enable_mask(self) -> u32 {
        match self {
            InterruptSource::ReceiveOverrun => (1 << CONTROL_IROE) | (1 << CONTROL_IE),
            InterruptSource::TransmitOverrun => (1 << CONTROL_ITOE) | (1 << CONTROL_IE),
            InterruptSource::TransmitReady => 1 << CONTROL_ITRDY,
            InterruptSource::ReceiveReady => 1 << CONTROL_IRRDY,
            InterruptSource::EndOfPacket => 1 << CONTROL_IEOP,
        }
    }

    pub fn condition(self, status: &Status) -> bool {
        match self {
            InterruptSource::ReceiveOverrun => status.roe,
            InterruptSource::TransmitOverrun => status.toe,
            InterruptSource::TransmitReady => status.trdy,
            InterruptSource::ReceiveReady => status.rrdy,
            InterruptSource::EndOfPacket => status.eop,
        }
    }

    pub fn is_active(self, status: &Status, control: u32) -> bool {
        control & self.enable_mask() != 0 && self.condition(status)
    }
}

/// Sources currently driving the line.
pub fn active_sources(status: &Status, control: u32) -> Vec<InterruptSource> {
    InterruptSource::ALL.iter().copied().filter(|s| s.is_active(status, control)).collect()
}

#[derive(Default)]
pub struct InterruptAggregator {
    irq: bool,
}

impl InterruptAggregator {
    pub fn new() -> Self {
        InterruptAggregator { irq: false }
    }

    pub fn reset(&mut self) {
        self.irq = false;
    }

    pub fn tick(&mut self, status: &Status, control: u32) {
        let irq = InterruptSource::ALL.iter().any(|s| s.is_active(status, control));
        if irq != self.irq {
            log::trace!("irq {} ({:?})", irq as u8, active_sources(status, control));
        }
        self.irq = irq;
    }

    pub fn irq(&self) -> bool {
        self.irq
    }

    pub(crate) fn restore(&mut self, irq: bool) {
        self.irq = irq;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL_ENABLES: u32 = (1 << CONTROL_IROE)
        | (1 << CONTROL_ITOE)
        | (1 << CONTROL_ITRDY)
        | (1 << CONTROL_IRRDY)
        | (1 << CONTROL_IE)
        | (1 << CONTROL_IEOP);

    #[test]
    fn test_masked_sources_stay_quiet() {
        let mut agg = InterruptAggregator::new();
        let s = Status { roe: true, toe: true, tmt: true, trdy: true, rrdy: true, eop: true };
        agg.tick(&s, 0);
        assert!(!agg.irq());
        agg.tick(&s, ALL_ENABLES);
        assert!(agg.irq());
    }

    #[test]
    fn test_any_error_enable_covers_both_overruns() {
        let mut agg = InterruptAggregator::new();
        let ie = 1 << CONTROL_IE;
        agg.tick(&Status { roe: true, ..Status::default() }, ie);
        assert!(agg.irq());
        agg.tick(&Status { toe: true, ..Status::default() }, ie);
        assert!(agg.irq());
        // but not the ready or EOP sources
        agg.tick(&Status { rrdy: true, trdy: true, eop: true, ..Status::default() }, ie);
        assert!(!agg.irq());
    }

    #[test]
    fn test_each_source_has_its_own_enable() {
        let cases = [
            (Status { roe: true, ..Status::default() }, CONTROL_IROE),
            (Status { toe: true, ..Status::default() }, CONTROL_ITOE),
            (Status { trdy: true, ..Status::default() }, CONTROL_ITRDY),
            (Status { rrdy: true, ..Status::default() }, CONTROL_IRRDY),
            (Status { eop: true, ..Status::default() }, CONTROL_IEOP),
        ];
        for (status, bit) in cases {
            let mut agg = InterruptAggregator::new();
            agg.tick(&status, 1 << bit);
            assert!(agg.irq(), "bit {}", bit);
            agg.tick(&status, ALL_ENABLES & !(1 << bit) & !(1 << CONTROL_IE));
            assert!(!agg.irq(), "bit {}", bit);
        }
    }

    #[test]
    fn test_shift_empty_never_interrupts() {
        let mut agg = InterruptAggregator::new();
        agg.tick(&Status { tmt: true, ..Status::default() }, ALL_ENABLES);
        assert!(!agg.irq());
    }

    #[test]
    fn test_active_sources() {
        let s = Status { rrdy: true, eop: true, ..Status::default() };
        let ctrl = (1 << CONTROL_IRRDY) | (1 << CONTROL_IEOP);
        assert_eq!(
            active_sources(&s, ctrl),
            vec![InterruptSource::ReceiveReady, InterruptSource::EndOfPacket]
        );
    }
}
