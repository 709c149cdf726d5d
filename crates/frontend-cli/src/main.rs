//! upspi headless simulator.
//!
//! Builds one controller core, wires it to a loopback SPI slave and plays
//! a driver scenario against it over the generic bus:
//!
//! - **loopback**: echo `--count` words, check each answer is the previous word
//! - **write**: transmit `--count` words, check the slave saw them in order
//! - **irq-rrdy**: service the receive-ready interrupt for every word
//! - **overrun**: provoke and clear a transmit overrun `--count` times
//! - **sso**: force all select lines and check the forwarded lines
//! - **eop**: mark every tenth word as end of packet and check EOP + IRQ
//!
//! `--save-state` writes the core state at the end of the run and
//! `--load-state` starts from one. `RUST_LOG` controls log output.

use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use std::process::ExitCode;
use upspi_core::debugger::{dump_registers, status_flags};
use upspi_core::{
    rate, savestate, AddressMode, Bench, Error, LoopbackTransport, SpiConfig, UpSpi,
    CONTROL_EXT_REG, CONTROL_IEOP, CONTROL_IRRDY, CONTROL_ITOE, CONTROL_REG, CONTROL_SSO,
    EOP_VALUE_REG, RX_DATA_REG, SLAVE_SELECT_REG, STATUS_E, STATUS_EOP, STATUS_REG, STATUS_RRDY,
    STATUS_TOE, STATUS_TRDY, TX_DATA_REG,
};

/// Ticks to wait on any single status condition
const TIMEOUT: u64 = 1_000_000;
/// Word that marks the end of a packet in the eop scenario
const EOP_WORD: u32 = 0xFF;

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Scenario {
    Loopback,
    Write,
    IrqRrdy,
    Overrun,
    Sso,
    Eop,
}

#[derive(Parser, Debug)]
#[command(name = "upspi-sim", version, about = "Drive the upspi core against a loopback SPI slave")]
struct Args {
    #[arg(long, value_enum, default_value = "loopback")]
    scenario: Scenario,
    /// Words to exchange
    #[arg(long, default_value_t = 256)]
    count: u32,
    /// Bus width in bytes (2 or 4)
    #[arg(long, default_value_t = 4)]
    bus_width: u32,
    /// SPI word width in bytes
    #[arg(long, default_value_t = 1)]
    word_width: u32,
    /// Base clock in Hz
    #[arg(long, default_value_t = 100_000_000)]
    clock: u32,
    #[arg(long, default_value_t = 16)]
    select_width: u32,
    /// Reset value of the rate exponent (divisor = 2^(rate+1))
    #[arg(long, default_value_t = 0)]
    rate: u8,
    #[arg(long)]
    cpol: bool,
    #[arg(long)]
    cpha: bool,
    /// Address registers by bus word instead of byte offset
    #[arg(long)]
    word_addressed: bool,
    /// Print the register file after the run
    #[arg(long)]
    dump: bool,
    #[arg(long)]
    save_state: Option<PathBuf>,
    #[arg(long)]
    load_state: Option<PathBuf>,
    /// Log at debug level unless RUST_LOG says otherwise
    #[arg(short, long)]
    verbose: bool,
}

impl Args {
    fn config(&self) -> SpiConfig {
        SpiConfig {
            address_width: 32,
            bus_width: self.bus_width,
            word_width: self.word_width,
            clock_speed: self.clock,
            select_width: self.select_width,
            default_rate_div: self.rate,
            default_cpol: self.cpol,
            default_cpha: self.cpha,
            address_mode: if self.word_addressed { AddressMode::Word } else { AddressMode::Byte },
        }
    }
}

/// Outcome of one scenario.
struct Report {
    checked: u32,
    mismatches: u32,
}

impl Report {
    fn new() -> Self {
        Report { checked: 0, mismatches: 0 }
    }

    fn check(&mut self, ok: bool, what: &str) {
        self.checked += 1;
        if !ok {
            self.mismatches += 1;
            log::error!("check failed: {}", what);
        }
    }
}

type Sim = Bench<LoopbackTransport>;

// ─── Scenarios ──────────────────────────────────────────────────────────────

fn run_loopback(b: &mut Sim, count: u32, r: &mut Report) -> Result<(), Error> {
    let mask = b.core.config().word_mask();
    let mut prev = 0;
    for x in 0..count {
        let word = x & mask;
        let echo = b.exchange(word, TIMEOUT)?;
        r.check(echo == prev, &format!("word {}: got {:#x}, expected {:#x}", x, echo, prev));
        prev = word;
    }
    Ok(())
}

fn run_write(b: &mut Sim, count: u32, r: &mut Report) -> Result<(), Error> {
    let mask = b.core.config().word_mask();
    let before = b.transport.transfers.len();
    for x in 0..count {
        b.wait_status(1 << STATUS_TRDY, TIMEOUT)?;
        b.write(TX_DATA_REG, x & mask)?;
    }
    b.wait_status(1 << STATUS_TRDY, TIMEOUT)?;
    let sent = b.transport.mosi_words();
    let sent = &sent[before..];
    r.check(sent.len() == count as usize, &format!("slave saw {} words of {}", sent.len(), count));
    for (i, w) in sent.iter().enumerate() {
        r.check(*w == i as u32 & mask, &format!("word {}: slave saw {:#x}", i, w));
    }
    Ok(())
}

fn run_irq_rrdy(b: &mut Sim, count: u32, r: &mut Report) -> Result<(), Error> {
    let mask = b.core.config().word_mask();
    b.write(CONTROL_REG, 1 << CONTROL_IRRDY)?;
    for x in 0..count {
        b.write(TX_DATA_REG, x & mask)?;
        b.wait_irq(TIMEOUT)?;
        b.read(RX_DATA_REG)?;
        b.run(2);
        r.check(!b.core.irq(), &format!("word {}: irq still high after pop", x));
    }
    b.write(CONTROL_REG, 0)?;
    Ok(())
}

fn run_overrun(b: &mut Sim, count: u32, r: &mut Report) -> Result<(), Error> {
    b.write(CONTROL_REG, 1 << CONTROL_ITOE)?;
    for x in 0..count {
        b.write(TX_DATA_REG, x)?;
        b.run(2);
        b.write(TX_DATA_REG, x)?;
        b.run(2);
        r.check(b.core.irq(), &format!("round {}: irq low after double write", x));
        let status = b.read(STATUS_REG)?;
        r.check(status & (1 << STATUS_TOE) != 0, &format!("round {}: TOE clear", x));
        r.check(status & (1 << STATUS_E) != 0, &format!("round {}: E clear", x));
        b.write(STATUS_REG, 0)?;
        b.run(2);
        r.check(!b.core.irq(), &format!("round {}: irq high after status write", x));
        let status = b.read(STATUS_REG)?;
        r.check(status & (1 << STATUS_TOE) == 0, &format!("round {}: TOE still set", x));
        b.wait_status(1 << STATUS_RRDY, TIMEOUT)?;
        b.read(RX_DATA_REG)?;
    }
    b.write(CONTROL_REG, 0)?;
    Ok(())
}

fn run_sso(b: &mut Sim, count: u32, r: &mut Report) -> Result<(), Error> {
    let select = b.core.config().select_mask() & !1;
    b.write(SLAVE_SELECT_REG, select)?;
    b.write(CONTROL_REG, 1 << CONTROL_SSO)?;
    for _ in 0..count {
        b.step();
        r.check(b.core.transport_command().select_n == 0, "select lines not forced");
    }
    b.write(CONTROL_REG, 0)?;
    r.check(b.core.transport_command().select_n == select, "select register not restored");
    Ok(())
}

fn run_eop(b: &mut Sim, count: u32, r: &mut Report) -> Result<(), Error> {
    let mask = b.core.config().word_mask();
    b.write(EOP_VALUE_REG, EOP_WORD)?;
    b.write(CONTROL_REG, 1 << CONTROL_IEOP)?;
    for x in 0..count {
        let marker = x % 10 == 0 && x != 0;
        let word = if marker { EOP_WORD } else { x % EOP_WORD & mask };
        b.write(TX_DATA_REG, word)?;
        if marker {
            b.run(2);
            let status = b.read(STATUS_REG)?;
            r.check(status & (1 << STATUS_EOP) != 0, &format!("word {}: EOP not set", x));
            r.check(b.core.irq(), &format!("word {}: irq low on EOP", x));
        }
        b.wait_status(1 << STATUS_RRDY, TIMEOUT)?;
        b.read(RX_DATA_REG)?;
    }
    b.write(CONTROL_REG, 0)?;
    Ok(())
}

// ─── Main ───────────────────────────────────────────────────────────────────

fn run(args: &Args) -> Result<Report, Error> {
    let config = args.config();
    let mut core = UpSpi::new(config)?;
    if let Some(path) = &args.load_state {
        let state = savestate::load_from_file(path, &config)?;
        core.load_state(&state);
    }
    let transport = LoopbackTransport::new(&config)?;
    let mut bench = Bench::new(core, transport);
    if args.load_state.is_none() {
        bench.hold_reset(2);
    }
    log::info!(
        "scenario {:?}: {} words, rate exponent {}",
        args.scenario,
        args.count,
        rate::rate_exponent(bench.read(CONTROL_EXT_REG)?)
    );

    let mut report = Report::new();
    match args.scenario {
        Scenario::Loopback => run_loopback(&mut bench, args.count, &mut report)?,
        Scenario::Write => run_write(&mut bench, args.count, &mut report)?,
        Scenario::IrqRrdy => run_irq_rrdy(&mut bench, args.count, &mut report)?,
        Scenario::Overrun => run_overrun(&mut bench, args.count, &mut report)?,
        Scenario::Sso => run_sso(&mut bench, args.count, &mut report)?,
        Scenario::Eop => run_eop(&mut bench, args.count, &mut report)?,
    }

    let status = bench.read(STATUS_REG)?;
    println!(
        "{:?}: {} checks, {} mismatches, {} ticks, status [{}]",
        args.scenario,
        report.checked,
        report.mismatches,
        bench.ticks,
        status_flags(status).join(" ")
    );
    if args.dump {
        print!("{}", dump_registers(&bench.core));
    }
    if let Some(path) = &args.save_state {
        savestate::save_to_file(&bench.core.save_state(), &config, path)?;
        println!("State saved to {}", path.display());
    }
    Ok(report)
}

fn main() -> ExitCode {
    let args = Args::parse();
    let default_level = if args.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level)).init();

    match run(&args) {
        Ok(report) if report.mismatches == 0 => ExitCode::SUCCESS,
        Ok(_) => ExitCode::FAILURE,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}
