//! Memory-controller trace replay CLI.
//!
//! This binary replays a memory trace through one controller. It performs:
//! 1. **Setup:** Loads the controller and technology configurations and builds the oracle.
//! 2. **Replay:** Runs the trace in bound/weave phases and drains the device.
//! 3. **Report:** Appends a snapshot to the controller's statistics log and prints a summary
//!    (or the full statistics tree as JSON).

use std::path::PathBuf;
use std::process;

use clap::Parser;
use serde::Serialize;
use tracing_subscriber::EnvFilter;

use wavemem_core::config::{ControllerConfig, OracleConfig, SimContextConfig};
use wavemem_core::sim::{PhaseSummary, SimContext, Simulator, read_trace};
use wavemem_core::stats::AggregateStat;

#[derive(Parser, Debug)]
#[command(
    name = "wavemem",
    author,
    version,
    about = "Replay a memory trace through the memory-controller timing model",
    long_about = "Replay a memory trace through the memory-controller timing model.\n\nTrace lines are `cycle TYPE 0xaddr [src]` with TYPE one of GETS, GETX, PUTS, PUTX, R, W.\n\nExamples:\n  wavemem --config ctrl.json --trace app.trace\n  wavemem --config ctrl.json --tech pcm.json --trace app.trace --json\n\nSet RUST_LOG=wavemem_core=debug for per-request logging."
)]
struct Cli {
    /// Controller configuration (JSON).
    #[arg(short, long)]
    config: PathBuf,

    /// Technology configuration (JSON); defaults to the controller's `tech_ini`.
    #[arg(short, long)]
    tech: Option<PathBuf>,

    /// Memory trace to replay.
    #[arg(long)]
    trace: PathBuf,

    /// Directory receiving the statistics log and memory trace.
    #[arg(short, long, default_value = ".")]
    output_dir: PathBuf,

    /// Cache line size in bytes.
    #[arg(long, default_value_t = 64)]
    line_size: u32,

    /// Bound/weave phase length in cycles.
    #[arg(long, default_value_t = 1000)]
    phase_length: u64,

    /// Time clean evictions as if a DRAM cache sat in front of memory.
    #[arg(long)]
    dram_cache: bool,

    /// Print the statistics tree as JSON instead of a text summary.
    #[arg(long)]
    json: bool,
}

#[derive(Serialize)]
struct Report<'a> {
    requests: u64,
    completed: u64,
    phases: u64,
    final_cycle: u64,
    stats: &'a AggregateStat,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    if let Err(e) = run(&cli) {
        eprintln!("\n[!] FATAL: {e}");
        process::exit(1);
    }
}

/// Loads everything, replays the trace and reports.
fn run(cli: &Cli) -> wavemem_core::Result<()> {
    let ctrl_config = ControllerConfig::from_file(&cli.config)?;
    let oracle_config = match &cli.tech {
        Some(path) => OracleConfig::from_file(path)?,
        None => ctrl_config.load_oracle_config()?,
    };
    let ctx = SimContext::new(&SimContextConfig {
        output_dir: cli.output_dir.clone(),
        line_size: cli.line_size,
        has_dram_cache: cli.dram_cache,
        phase_length: cli.phase_length,
    })?;

    let trace = read_trace(&cli.trace)?;
    let mut sim = Simulator::new(ctx);
    let id = sim.add_controller(&ctrl_config, &oracle_config)?;
    let summary = sim.run_phases(id, &trace)?;
    sim.print_stats()?;

    let stats = sim.stats();
    if cli.json {
        let report = Report {
            requests: summary.requests,
            completed: summary.completed,
            phases: summary.phases,
            final_cycle: summary.final_cycle,
            stats: &stats,
        };
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_summary(&summary, &stats, sim.controller(id)?.stats_path().display());
    }
    Ok(())
}

fn print_summary(summary: &PhaseSummary, stats: &AggregateStat, log: impl std::fmt::Display) {
    println!(
        "[*] {} requests, {} completed in {} phases, final cycle {}",
        summary.requests, summary.completed, summary.phases, summary.final_cycle
    );
    println!("[*] statistics log: {log}");
    println!();
    print!("{stats}");
}
