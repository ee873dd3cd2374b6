use std::collections::BTreeMap;
use std::io::{self, Write};
use std::panic;
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;
use std::time::Duration;

use serde::Serialize;
use tracing::{info, warn};

use crate::display::{write_core_finished, write_core_started};
use crate::error::BenchError;
use crate::feature::FeatureDetector;
use crate::instruction::InstructionSetKind;
use crate::probe::FrequencyProbe;
use crate::result::{AllCoreSample, BenchmarkResult, RunStatus};
use crate::runner::BenchmarkRunner;
use crate::sampler::{FrequencySampler, StopToken};
use crate::util::affinity::CoreAffinity;

/// How the cores of a sweep are scheduled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SweepMode {
	Parallel,
	Sequential,
}

/// Progress messages from per-core threads to the collector
#[derive(Debug)]
pub enum CoreEvent {
	Started { core_id: usize },
	Finished(BenchmarkResult),
}

/// Outcome of a sweep over every core, ordered by core ID
#[derive(Debug, Clone, Serialize)]
pub struct MultiCoreReport {
	pub kind: InstructionSetKind,
	#[serde(skip)]
	pub duration: Duration,
	pub mode: SweepMode,
	pub results: BTreeMap<usize, BenchmarkResult>,
	/// Cross-core timeline, display only, empty unless requested
	pub all_core_samples: Vec<AllCoreSample>,
}

impl MultiCoreReport {
	pub fn failed_cores(&self) -> Vec<usize> {
		self.results
			.values()
			.filter(|result| !result.success())
			.map(|result| result.core_id)
			.collect()
	}
}

/// Runs the same benchmark on every core the affinity layer reports
pub struct MultiCoreCoordinator<'r, P, F, A> {
	runner: &'r BenchmarkRunner<P, F, A>,
	sample_all_cores: bool,
}

impl<'r, P: FrequencyProbe, F: FeatureDetector, A: CoreAffinity> MultiCoreCoordinator<'r, P, F, A> {
	pub fn new(runner: &'r BenchmarkRunner<P, F, A>) -> Self {
		Self {
			runner,
			sample_all_cores: false,
		}
	}

	/// Adds a sampler over all cores that runs for the whole sweep
	pub fn sample_all_cores(mut self, enabled: bool) -> Self {
		self.sample_all_cores = enabled;
		self
	}

	/// Runs `kind` for `duration` on every core
	///
	/// Each core runs on its own thread, so pinning never affects the caller.
	/// Progress lines go to `progress` as cores start and finish. A core that
	/// cannot be pinned ends up in the report with [`RunStatus::PinFailed`].
	///
	/// # Errors
	///
	/// [`BenchError::InvalidConfiguration`] for a duration no run can reach,
	/// checked before any thread starts, and [`BenchError::Output`] for
	/// failures writing to `progress`. Otherwise the sweep always completes.
	pub fn run(
		&self,
		kind: InstructionSetKind,
		duration: Duration,
		mode: SweepMode,
		progress: &mut dyn Write,
	) -> Result<MultiCoreReport, BenchError> {
		self.runner.check_duration(duration)?;

		let core_count = self.runner.affinity().core_count();
		let sampler = FrequencySampler::new(self.runner.settings().sampling_interval);
		let sweep_done = StopToken::new();

		match mode {
			SweepMode::Parallel => info!(cores = core_count, "running {kind} on all cores in parallel"),
			SweepMode::Sequential => match sequential_wall_time(duration, core_count) {
				Some(total) => warn!(
					cores = core_count,
					"running {kind} on each core in turn, this takes about {total:?}"
				),
				None => warn!(cores = core_count, "running {kind} on each core in turn"),
			},
		}

		let (tx, rx) = mpsc::channel::<CoreEvent>();

		let (results, all_core_samples, write_result) = thread::scope(|s| {
			let _sweep_guard = sweep_done.stop_on_drop();
			let cross_core = self
				.sample_all_cores
				.then(|| s.spawn(|| sampler.sample_all(self.runner.probe(), core_count, &sweep_done)));

			match mode {
				SweepMode::Parallel => {
					for core_id in 0..core_count {
						let tx = tx.clone();
						s.spawn(move || run_core(self.runner, kind, core_id, duration, &tx));
					}
				},
				SweepMode::Sequential => {
					let tx = tx.clone();
					s.spawn(move || {
						for core_id in 0..core_count {
							// A fresh thread per core keeps each pinning isolated
							thread::scope(|inner| {
								inner.spawn(|| run_core(self.runner, kind, core_id, duration, &tx));
							});
						}
					});
				},
			}
			drop(tx);

			let (results, write_result) = collect(rx, progress);
			sweep_done.stop();

			let all_core_samples = match cross_core.map(|handle| handle.join()) {
				Some(Ok(samples)) => samples,
				Some(Err(payload)) => {
					warn!("all-core sampler panicked");
					panic::resume_unwind(payload)
				},
				None => Vec::new(),
			};
			(results, all_core_samples, write_result)
		});

		write_result?;

		Ok(MultiCoreReport {
			kind,
			duration,
			mode,
			results,
			all_core_samples,
		})
	}
}

fn run_core<P: FrequencyProbe, F: FeatureDetector, A: CoreAffinity>(
	runner: &BenchmarkRunner<P, F, A>,
	kind: InstructionSetKind,
	core_id: usize,
	duration: Duration,
	events: &Sender<CoreEvent>,
) {
	let _ = events.send(CoreEvent::Started { core_id });

	let result = match runner.run(kind, core_id, duration) {
		Ok(result) => result,
		Err(err) => {
			warn!(core_id, "{err}");
			BenchmarkResult::skipped(core_id, kind, duration, failure_status(&err))
		},
	};

	let _ = events.send(CoreEvent::Finished(result));
}

fn failure_status(err: &BenchError) -> RunStatus {
	match err {
		BenchError::PinFailure(_) => RunStatus::PinFailed(err.to_string()),
		BenchError::UnsupportedInstructionSet { .. } => RunStatus::Unsupported,
		BenchError::NoSamplesCollected { .. } => RunStatus::NoSamples,
		BenchError::InvalidConfiguration(_) | BenchError::Output(_) => RunStatus::Failed(err.to_string()),
	}
}

/// Total time of a sequential sweep, `None` when it overflows
fn sequential_wall_time(duration: Duration, core_count: usize) -> Option<Duration> {
	u32::try_from(core_count)
		.ok()
		.and_then(|cores| duration.checked_mul(cores))
}

/// Drains events until every sender is gone
///
/// A failed write stops further output but never stops the draining, so
/// per-core threads are not left blocked.
fn collect(rx: Receiver<CoreEvent>, out: &mut dyn Write) -> (BTreeMap<usize, BenchmarkResult>, io::Result<()>) {
	let mut results = BTreeMap::new();
	let mut write_result = Ok(());

	for event in rx {
		if write_result.is_ok() {
			write_result = match &event {
				CoreEvent::Started { core_id } => write_core_started(out, *core_id),
				CoreEvent::Finished(result) => write_core_finished(out, result),
			};
		}

		if let CoreEvent::Finished(result) = event {
			results.insert(result.core_id, result);
		}
	}

	(results, write_result)
}
