//! Register viewer.
//!
//! Resolves offsets to register names and renders the core's registers with
//! their decoded fields as text.

use crate::interrupt::active_sources;
use crate::rate;
use crate::regs::{Register, Status};
use crate::UpSpi;

/// Resolve a byte offset to its register name (if mapped).
pub fn register_name(offset: u32) -> Option<&'static str> {
    Register::from_offset(offset as u64).map(Register::name)
}

/// Names of the flags set in a Status word, in bit order.
pub fn status_flags(value: u32) -> Vec<&'static str> {
    let s = Status::from_bits(value);
    let mut flags = Vec::new();
    if s.roe { flags.push("ROE"); }
    if s.toe { flags.push("TOE"); }
    if s.tmt { flags.push("TMT"); }
    if s.trdy { flags.push("TRDY"); }
    if s.rrdy { flags.push("RRDY"); }
    if s.error() { flags.push("E"); }
    if s.eop { flags.push("EOP"); }
    flags
}

/// Names of the enable bits set in a Control word, in bit order.
pub fn control_flags(value: u32) -> Vec<&'static str> {
    const BITS: [(u8, &str); 7] = [
        (crate::CONTROL_IROE, "IROE"),
        (crate::CONTROL_ITOE, "ITOE"),
        (crate::CONTROL_ITRDY, "ITRDY"),
        (crate::CONTROL_IRRDY, "IRRDY"),
        (crate::CONTROL_IE, "IE"),
        (crate::CONTROL_IEOP, "IEOP"),
        (crate::CONTROL_SSO, "SSO"),
    ];
    BITS.iter().filter(|(b, _)| value & (1u32 << *b) != 0).map(|(_, n)| *n).collect()
}

/// Render every register of a core, one per line.
pub fn dump_registers(core: &UpSpi) -> String {
    let regs = &core.regs;
    let status = regs.status();
    let mut s = String::new();
    s.push_str(&format!("{:>10}={:08X}\n", Register::RxData.name(), regs.rx_data));
    s.push_str(&format!("{:>10}={:08X}\n", Register::TxData.name(), regs.tx_data));
    s.push_str(&format!(
        "{:>10}={:08X}  [{}]\n",
        Register::Status.name(),
        status.bits(),
        status_flags(status.bits()).join(" ")
    ));
    s.push_str(&format!(
        "{:>10}={:08X}  [{}]\n",
        Register::Control.name(),
        regs.control,
        control_flags(regs.control).join(" ")
    ));
    s.push_str(&format!("{:>10}={:08X}  ss_n={:08X}\n", Register::SlaveSelect.name(), regs.slave_select, regs.select_n()));
    s.push_str(&format!("{:>10}={:08X}\n", Register::EopValue.name(), regs.eop_value));
    s.push_str(&format!(
        "{:>10}={:08X}  rate=clk/{} ({} Hz) cpol={} cpha={}\n",
        Register::ControlExt.name(),
        regs.control_ext,
        rate::divisor(regs.control_ext),
        core.rate.rate(),
        rate::cpol(regs.control_ext) as u8,
        rate::cpha(regs.control_ext) as u8
    ));
    s.push_str(&format!(
        "{:>10}={}  {:?}\n",
        "IRQ",
        core.irq() as u8,
        active_sources(&status, regs.control)
    ));
    s
}
