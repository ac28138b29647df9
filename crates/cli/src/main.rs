// LabWired - Firmware Simulation Platform
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use anyhow::Context;
use clap::{Parser, Subcommand};
use labwired_config::BoardConfig;
use labwired_core::board::USART1_NAME;
use labwired_core::bus::SystemBus;
use labwired_core::peripherals::usart::Usart;
use labwired_core::Board;
use labwired_usart::{demo, ConfigError, Divisor, SUPPORTED_BAUD_RATES};
use serde::Serialize;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::{Arc, Mutex};
use tracing::{error, info};

mod size_limited_writer;
use size_limited_writer::SizeLimitedWriter;

const EXIT_PASS: u8 = 0;
const EXIT_CONFIG_ERROR: u8 = 2;
const EXIT_RUNTIME_ERROR: u8 = 3;

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "LabWired USART echo demo on a simulated STM32F030",
    long_about = None
)]
struct Cli {
    /// Path to the board config (YAML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the board's baud rate
    #[arg(short, long)]
    baud: Option<u32>,

    /// Feed the receiver from this file instead of stdin
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// Stop echoing once this many UART bytes have been printed
    #[arg(long)]
    max_uart_bytes: Option<u64>,

    /// Write a board snapshot (JSON) when the run ends
    #[arg(long)]
    snapshot: Option<PathBuf>,

    /// Enable register-level tracing
    #[arg(short, long, global = true)]
    trace: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print the BRR mantissa/fraction for one or more baud rates.
    Divisor(DivisorArgs),
}

#[derive(Parser, Debug)]
struct DivisorArgs {
    /// USART reference clock in Hz
    #[arg(long, default_value_t = labwired_usart::stm32f030::HSI_HZ)]
    clock_hz: u32,

    /// Emit a JSON array instead of a table
    #[arg(long)]
    json: bool,

    /// Baud rates to compute
    #[arg(required = true)]
    baud: Vec<u32>,
}

#[derive(Debug, Serialize, PartialEq)]
struct DivisorRow {
    baud: u32,
    mantissa: u16,
    fraction: u8,
    brr: u32,
    effective_baud: u32,
    error_percent: f64,
    supported: bool,
}

impl DivisorRow {
    fn new(clock_hz: u32, baud: u32) -> Result<Self, ConfigError> {
        let divisor = Divisor::checked(clock_hz, baud)?;
        let effective_baud = divisor.effective_baud(clock_hz);
        Ok(Self {
            baud,
            mantissa: divisor.mantissa,
            fraction: divisor.fraction,
            brr: divisor.bits(),
            effective_baud,
            error_percent: (effective_baud as f64 - baud as f64) * 100.0 / baud as f64,
            supported: SUPPORTED_BAUD_RATES.contains(&baud),
        })
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // UART output owns stdout; logs go to stderr.
    let level = if cli.trace {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(io::stderr)
        .init();

    match &cli.command {
        Some(Commands::Divisor(args)) => run_divisor(args),
        None => run_echo(&cli),
    }
}

fn run_divisor(args: &DivisorArgs) -> ExitCode {
    let mut rows = Vec::new();
    let mut failed = false;
    for &baud in &args.baud {
        match DivisorRow::new(args.clock_hz, baud) {
            Ok(row) => rows.push(row),
            Err(e) => {
                error!("{} at {} Hz: {}", baud, args.clock_hz, e);
                failed = true;
            }
        }
    }

    if args.json {
        match serde_json::to_string_pretty(&rows) {
            Ok(json) => println!("{}", json),
            Err(e) => {
                error!("Failed to serialize divisor table: {}", e);
                return ExitCode::from(EXIT_RUNTIME_ERROR);
            }
        }
    } else {
        println!(
            "{:>8} {:>8} {:>8} {:>6} {:>10} {:>8}",
            "baud", "mantissa", "fraction", "brr", "effective", "error%"
        );
        for row in &rows {
            println!(
                "{:>8} {:>8} {:>8} {:>#6x} {:>10} {:>8.3}{}",
                row.baud,
                row.mantissa,
                row.fraction,
                row.brr,
                row.effective_baud,
                row.error_percent,
                if row.supported { "" } else { "  (unsupported)" }
            );
        }
    }

    if failed {
        ExitCode::from(EXIT_CONFIG_ERROR)
    } else {
        ExitCode::from(EXIT_PASS)
    }
}

fn load_config(cli: &Cli) -> anyhow::Result<BoardConfig> {
    let mut config = match &cli.config {
        Some(path) => BoardConfig::from_file(path)?,
        None => BoardConfig::default(),
    };
    if let Some(baud) = cli.baud {
        config.baud = baud;
        config
            .validate()
            .with_context(|| format!("--baud {} rejected", baud))?;
    }
    Ok(config)
}

fn read_input(cli: &Cli) -> anyhow::Result<Box<dyn Read>> {
    Ok(match &cli.input {
        Some(path) => Box::new(
            std::fs::File::open(path)
                .with_context(|| format!("Failed to open input file {:?}", path))?,
        ),
        None => Box::new(io::stdin()),
    })
}

fn run_echo(cli: &Cli) -> ExitCode {
    let config = match load_config(cli) {
        Ok(config) => config,
        Err(e) => {
            error!("{:#}", e);
            return ExitCode::from(EXIT_CONFIG_ERROR);
        }
    };
    let input = match read_input(cli) {
        Ok(input) => input,
        Err(e) => {
            error!("{:#}", e);
            return ExitCode::from(EXIT_CONFIG_ERROR);
        }
    };
    let mut board = match Board::new(&config) {
        Ok(board) => board,
        Err(e) => {
            error!("{:#}", e);
            return ExitCode::from(EXIT_CONFIG_ERROR);
        }
    };

    let sink = Arc::new(Mutex::new(Vec::new()));
    board.bus.attach_usart_tx_sink(sink, false);

    let result = echo_session(&mut board, input, cli.max_uart_bytes);

    if let Some(path) = &cli.snapshot {
        write_snapshot(&board, path);
    }

    match result {
        Ok(bytes) => {
            info!("Echo session finished: {} UART bytes", bytes);
            ExitCode::from(EXIT_PASS)
        }
        Err(e) => {
            error!("{:#}", e);
            ExitCode::from(EXIT_RUNTIME_ERROR)
        }
    }
}

/// Runs the demo until the input ends or the output cap is hit.
/// Returns the number of UART bytes the board transmitted.
fn echo_session(
    board: &mut Board,
    input: Box<dyn Read>,
    max_uart_bytes: Option<u64>,
) -> anyhow::Result<u64> {
    let baud = board.config().baud;
    let show = board.config().usart.echo_stdout;
    let stdout = io::stdout();
    let mut out = SizeLimitedWriter::new(stdout.lock(), max_uart_bytes);

    let mut driver = board.driver();
    let divisor = driver.initialize(baud)?;
    info!(
        baud,
        mantissa = divisor.mantissa,
        fraction = divisor.fraction,
        "USART1 up"
    );

    demo::greet(&mut driver);
    let mut transmitted = drain_tx(&mut driver, &mut out, show)?;

    for byte in io::BufReader::new(input).bytes() {
        let byte = byte.context("Failed to read input")?;
        driver
            .regs_mut()
            .device_mut::<Usart>(USART1_NAME)?
            .inject_rx(&[byte]);
        demo::echo_once(&mut driver);
        transmitted += drain_tx(&mut driver, &mut out, show)?;
        if out.limit_exceeded() {
            info!("UART output limit reached, stopping");
            break;
        }
    }
    driver.flush();

    let faults = board.bus.faults.len();
    if faults > 0 {
        anyhow::bail!("{} bus faults during the session", faults);
    }
    Ok(transmitted)
}

/// Moves captured TX bytes to the terminal.
fn drain_tx<W: Write>(
    driver: &mut labwired_usart::Usart<&mut SystemBus>,
    out: &mut SizeLimitedWriter<W>,
    show: bool,
) -> anyhow::Result<u64> {
    let bytes = driver
        .regs_mut()
        .device_mut::<Usart>(USART1_NAME)?
        .take_tx();
    if show {
        out.write_all(&bytes)?;
        out.flush()?;
    }
    Ok(bytes.len() as u64)
}

fn write_snapshot(board: &Board, path: &Path) {
    let snapshot = board.snapshot();
    match snapshot.to_json_pretty() {
        Ok(json) => match std::fs::write(path, json) {
            Ok(()) => info!("Snapshot written to {:?}", path),
            Err(e) => error!("Failed to write snapshot {:?}: {}", path, e),
        },
        Err(e) => error!("Failed to create snapshot {:?}: {}", path, e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_divisor_row_reference_rates() {
        let row = DivisorRow::new(8_000_000, 115_200).unwrap();
        assert_eq!((row.mantissa, row.fraction, row.brr), (4, 5, 0x45));
        assert_eq!(row.effective_baud, 115_942);
        assert!(row.supported);

        let row = DivisorRow::new(8_000_000, 500_000).unwrap();
        assert_eq!((row.mantissa, row.fraction), (1, 0));
        assert!(!row.supported);
    }

    #[test]
    fn test_divisor_row_rejects_unusable_rates() {
        assert_eq!(
            DivisorRow::new(8_000_000, 0),
            Err(ConfigError::ZeroBaudRate)
        );
        assert!(matches!(
            DivisorRow::new(8_000_000, 1_000_000),
            Err(ConfigError::MantissaZero { baud: 1_000_000 })
        ));
    }

    #[test]
    fn test_cli_parses_divisor_subcommand() {
        let cli = Cli::parse_from(["labwired-uart", "divisor", "--json", "9600", "115200"]);
        match cli.command {
            Some(Commands::Divisor(args)) => {
                assert!(args.json);
                assert_eq!(args.clock_hz, 8_000_000);
                assert_eq!(args.baud, vec![9600, 115_200]);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }
}
