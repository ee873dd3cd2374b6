//! Command-line entry point

use std::io::{self, Write};
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use crate::config::{OutputFormat, RawRunConfig, RunConfig, RunMode};
use crate::coordinator::{MultiCoreCoordinator, SweepMode};
use crate::cpu_type::CpuInfo;
use crate::display::{write_cpu_info, write_json, write_multi_core_report, write_result};
use crate::monitor::FrequencyMonitor;
use crate::probe::CpuFreqProbe;
use crate::runner::{HostRunner, RunnerSettings};
use crate::util::affinity::{CoreAffinity, LinuxAffinity};

/// Measure how sustained instruction workloads change the clock of a pinned core
#[derive(Parser, Debug)]
#[command(name = "cpu-freq-bench", version, about)]
#[command(after_help = "Example: cpu-freq-bench --instr=avx256 --time=10 --core=3")]
pub struct Cli {
	#[command(subcommand)]
	pub command: Option<Commands>,

	#[command(flatten)]
	pub run: RunArgs,

	/// List available CPU features and exit
	#[arg(long)]
	pub list: bool,

	/// Verbose logging on stderr
	#[arg(short, long, global = true)]
	pub verbose: bool,
}

#[derive(Args, Debug, Clone)]
pub struct RunArgs {
	/// Instruction set type (avx128, avx256, avx512, amx, basic_add)
	#[arg(long, default_value = "avx256")]
	pub instr: String,

	/// Duration of the benchmark in seconds
	#[arg(long, default_value_t = 5, allow_negative_numbers = true)]
	pub time: i64,

	/// CPU core to run the benchmark on (single mode)
	#[arg(long, default_value_t = 0, allow_negative_numbers = true)]
	pub core: i64,

	/// Run on one core, or on all cores in parallel or in sequence
	#[arg(long, value_enum, default_value_t = RunMode::Single)]
	pub mode: RunMode,

	/// Also record every core's frequency during a multi-core run
	#[arg(long)]
	pub sample_all: bool,

	/// Leave unavailable (0 MHz) readings out of min/max/average
	#[arg(long)]
	pub exclude_unavailable: bool,

	/// Report format
	#[arg(long, value_enum, default_value_t = OutputFormat::Human)]
	pub format: OutputFormat,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
	/// List available CPU features (same as --list)
	List {
		#[arg(long, value_enum, default_value_t = OutputFormat::Human)]
		format: OutputFormat,
	},
	/// Print all-core frequencies as CSV rows on stdout
	Monitor {
		/// Milliseconds between rows
		#[arg(long, default_value_t = crate::constants::MONITOR_INTERVAL_MS)]
		interval_ms: u64,

		/// Stop after this many rows (runs until interrupted otherwise)
		#[arg(long)]
		samples: Option<u64>,
	},
}

/// Installs the stderr log subscriber; `RUST_LOG` overrides the default level
pub fn init_logging(verbose: bool) {
	let default = if verbose { "cpu_freq_bench=debug" } else { "cpu_freq_bench=info" };
	let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

	let _ = tracing_subscriber::fmt()
		.with_env_filter(filter)
		.with_writer(io::stderr)
		.with_target(false)
		.try_init();
}

pub fn run() -> anyhow::Result<()> {
	run_with_cli(Cli::parse())
}

pub fn run_with_cli(cli: Cli) -> anyhow::Result<()> {
	init_logging(cli.verbose);

	match cli.command {
		Some(Commands::List { format }) => list_features(format),
		Some(Commands::Monitor { interval_ms, samples }) => monitor(interval_ms, samples),
		None if cli.list => list_features(cli.run.format),
		None => run_benchmark(&cli.run),
	}
}

fn list_features(format: OutputFormat) -> anyhow::Result<()> {
	let runner = HostRunner::host();
	let info = CpuInfo::gather(runner.probe(), runner.features(), runner.affinity(), runner.table());

	let mut out = io::stdout().lock();
	match format {
		OutputFormat::Human => write_cpu_info(&mut out, &info)?,
		OutputFormat::Json => write_json(&mut out, &info)?,
	}
	Ok(())
}

fn monitor(interval_ms: u64, samples: Option<u64>) -> anyhow::Result<()> {
	if interval_ms == 0 {
		anyhow::bail!(crate::error::BenchError::invalid("monitor interval must be greater than 0"));
	}

	let probe = CpuFreqProbe::new();
	let monitor = FrequencyMonitor::new(&probe, LinuxAffinity.core_count())
		.with_interval(Duration::from_millis(interval_ms));

	monitor.run(&mut io::stdout().lock(), samples)?;
	Ok(())
}

fn run_benchmark(args: &RunArgs) -> anyhow::Result<()> {
	let affinity = LinuxAffinity;
	let config = RunConfig::validate(
		&RawRunConfig {
			instr: &args.instr,
			duration_secs: args.time,
			core_id: args.core,
			mode: args.mode,
			sample_all_cores: args.sample_all,
			exclude_unavailable: args.exclude_unavailable,
			format: args.format,
		},
		affinity.core_count(),
	)?;

	let runner = HostRunner::host().with_settings(RunnerSettings {
		zero_policy: config.zero_policy,
		..RunnerSettings::default()
	});

	let stdout = io::stdout();
	let mut out = stdout.lock();

	if config.format == OutputFormat::Human {
		let info = CpuInfo::gather(runner.probe(), runner.features(), runner.affinity(), runner.table());
		write_cpu_info(&mut out, &info)?;
	}

	let sweep = match config.mode {
		RunMode::Single => {
			let result = runner.run(config.kind, config.core_id, config.duration)?;
			match config.format {
				OutputFormat::Human => write_result(&mut out, &result)?,
				OutputFormat::Json => write_json(&mut out, &result)?,
			}
			return Ok(());
		},
		RunMode::Parallel => SweepMode::Parallel,
		RunMode::Sequential => SweepMode::Sequential,
	};

	// JSON keeps stdout clean, so progress moves to stderr
	let mut stderr = io::stderr();
	let progress: &mut dyn Write = match config.format {
		OutputFormat::Human => &mut out,
		OutputFormat::Json => &mut stderr,
	};

	let report = MultiCoreCoordinator::new(&runner)
		.sample_all_cores(config.sample_all_cores)
		.run(config.kind, config.duration, sweep, progress)?;

	match config.format {
		OutputFormat::Human => write_multi_core_report(&mut out, &report)?,
		OutputFormat::Json => write_json(&mut out, &report)?,
	}
	Ok(())
}
