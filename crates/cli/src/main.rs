//! Rename simulator CLI.
//!
//! This binary provides a single entry point for all simulation modes:
//! 1. **Replay:** Stream a trace through the rename pipeline and report statistics.
//! 2. **Dump:** Decode a trace and pretty-print its records.
//! 3. **Generate:** Write a synthetic microbenchmark-style trace to disk.

use clap::{Parser, Subcommand};
use std::fs::{self, File};
use std::io::{self, BufWriter, Read, Write};
use std::process;

use oosim_core::config::Config;
use oosim_core::sim::synth;
use oosim_core::sim::{ReplayEngine, TraceFormat, TraceReader, TraceWriter};

#[derive(Parser, Debug)]
#[command(
    name = "oosim",
    version,
    about = "Trace-driven out-of-order rename simulator",
    long_about = "Replay instruction traces through a register-rename model.\n\nTraces use the packed champsim-style record layout; pass '-' to read a\ndecompressed stream from stdin.\n\nExamples:\n  oosim gen -o stride.trace --iterations 5000\n  oosim run -t stride.trace --phys-regs 96\n  xz -d -c big.trace.xz | oosim run -t -\n  oosim dump -t stride.trace --limit 20"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Replay a trace through the rename pipeline.
    Run {
        /// Trace file, or '-' for stdin.
        #[arg(short, long)]
        trace: String,

        /// Interpret records in the cloudsuite layout (4 destinations + ASID).
        #[arg(long)]
        cloudsuite: bool,

        /// JSON configuration file (defaults apply when omitted).
        #[arg(short, long)]
        config: Option<String>,

        /// Override the physical register file size.
        #[arg(long)]
        phys_regs: Option<usize>,

        /// Treat every Nth taken branch as mispredicted (overrides config).
        #[arg(long)]
        mispredict_interval: Option<u64>,
    },

    /// Decode a trace and print one line per record.
    Dump {
        /// Trace file, or '-' for stdin.
        #[arg(short, long)]
        trace: String,

        /// Interpret records in the cloudsuite layout (4 destinations + ASID).
        #[arg(long)]
        cloudsuite: bool,

        /// Stop after this many records (0 = all).
        #[arg(long, default_value_t = 0)]
        limit: u64,
    },

    /// Generate a synthetic stride-loop trace.
    Gen {
        /// Output trace file.
        #[arg(short, long)]
        output: String,

        /// Loop iterations to generate (five records each).
        #[arg(long, default_value_t = 1000)]
        iterations: usize,
    },
}

fn main() {
    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            trace,
            cloudsuite,
            config,
            phys_regs,
            mispredict_interval,
        } => cmd_run(trace, cloudsuite, config, phys_regs, mispredict_interval),
        Commands::Dump {
            trace,
            cloudsuite,
            limit,
        } => {
            env_logger::init();
            cmd_dump(trace, cloudsuite, limit)
        }
        Commands::Gen { output, iterations } => {
            env_logger::init();
            cmd_gen(output, iterations)
        }
    }
}

/// Opens a trace source: a file path, or stdin for `-`.
fn open_trace(path: &str, format: TraceFormat) -> TraceReader<Box<dyn Read>> {
    let inner: Box<dyn Read> = if path == "-" {
        Box::new(io::stdin().lock())
    } else {
        match File::open(path) {
            Ok(file) => Box::new(io::BufReader::new(file)),
            Err(e) => {
                eprintln!("error: cannot open trace '{}': {}", path, e);
                process::exit(1);
            }
        }
    };
    TraceReader::new(inner, format)
}

fn record_format(cloudsuite: bool) -> TraceFormat {
    if cloudsuite {
        TraceFormat::Cloudsuite
    } else {
        TraceFormat::Standard
    }
}

/// Loads the configuration, applies CLI overrides, and replays the trace.
fn cmd_run(
    trace: String,
    cloudsuite: bool,
    config_path: Option<String>,
    phys_regs: Option<usize>,
    mispredict_interval: Option<u64>,
) {
    let mut config = match config_path {
        Some(path) => {
            let text = fs::read_to_string(&path).unwrap_or_else(|e| {
                eprintln!("error: cannot read config '{}': {}", path, e);
                process::exit(1);
            });
            serde_json::from_str::<Config>(&text).unwrap_or_else(|e| {
                eprintln!("error: invalid config '{}': {}", path, e);
                process::exit(1);
            })
        }
        None => Config::default(),
    };
    if let Some(n) = phys_regs {
        config.rename.num_physical_registers = n;
    }
    if let Some(interval) = mispredict_interval {
        config.pipeline.mispredict_interval = interval;
    }

    // The config flag raises the core crate to debug; RUST_LOG covers the rest.
    let mut logger = env_logger::Builder::from_default_env();
    if config.general.trace_renames {
        logger.filter_module("oosim_core", log::LevelFilter::Debug);
    }
    logger.init();

    let mut engine = ReplayEngine::new(&config).unwrap_or_else(|e| {
        eprintln!("error: {}", e);
        process::exit(1);
    });

    println!(
        "[*] Replay: {}  phys_regs={}  width={}  window={}  mispredict_interval={}",
        trace,
        config.rename.num_physical_registers,
        config.pipeline.width,
        config.pipeline.window_size,
        config.pipeline.mispredict_interval
    );

    let mut reader = open_trace(&trace, record_format(cloudsuite));
    if let Err(e) = engine.run(&mut reader) {
        eprintln!("\n[!] FATAL: {}", e);
        engine.stats().print();
        process::exit(1);
    }
    engine.stats().print();
}

/// Prints one summary line per record, in the trace reader's layout.
fn cmd_dump(trace: String, cloudsuite: bool, limit: u64) {
    let mut reader = open_trace(&trace, record_format(cloudsuite));
    let stdout = io::stdout();
    let mut out = stdout.lock();
    let mut count: u64 = 0;

    loop {
        let record = match reader.next_record() {
            Ok(Some(record)) => record,
            Ok(None) => break,
            Err(e) => {
                eprintln!("warning: {}", e);
                break;
            }
        };
        count += 1;

        let join_regs = |regs: &[u8]| {
            regs.iter()
                .map(|r| r.to_string())
                .collect::<Vec<_>>()
                .join(",")
        };
        let join_addrs = |addrs: &[u64]| {
            addrs
                .iter()
                .map(|a| format!("{:#x}", a))
                .collect::<Vec<_>>()
                .join(",")
        };

        let mut line = format!(
            "{:8}: PC={:#x}  BR={}  TAKEN={}  DEST_REGS=[{}]  SRC_REGS=[{}]  DEST_MEM=[{}]  SRC_MEM=[{}]",
            count,
            record.ip,
            record.is_branch as u8,
            record.branch_taken as u8,
            join_regs(&record.destination_registers),
            join_regs(&record.source_registers),
            join_addrs(&record.destination_memory),
            join_addrs(&record.source_memory),
        );
        if let Some(asid) = record.asid {
            line.push_str(&format!("  ASID={},{}", asid[0], asid[1]));
        }
        if writeln!(out, "{}", line).is_err() {
            // Broken pipe (e.g. piped to head); not an error.
            return;
        }

        if limit != 0 && count >= limit {
            break;
        }
    }
    eprintln!("Read {} records.", count);
}

/// Writes a synthetic stride-loop trace.
fn cmd_gen(output: String, iterations: usize) {
    let file = File::create(&output).unwrap_or_else(|e| {
        eprintln!("error: cannot create '{}': {}", output, e);
        process::exit(1);
    });
    let mut writer = TraceWriter::new(BufWriter::new(file), TraceFormat::Standard);

    for record in synth::stride_loop(iterations) {
        if let Err(e) = writer.write_record(&record) {
            eprintln!("error: write failed: {}", e);
            process::exit(1);
        }
    }
    if let Err(e) = writer.flush() {
        eprintln!("error: flush failed: {}", e);
        process::exit(1);
    }
    println!(
        "[*] Wrote {} records ({} iterations) to {}",
        writer.records_written(),
        iterations,
        output
    );
}
