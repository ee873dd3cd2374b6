use std::panic;
use std::thread;
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use crate::constants::{ITERATIONS_PER_BATCH, SAMPLING_INTERVAL_MS, WARMUP_MS};
use crate::error::BenchError;
use crate::feature::{FeatureDetector, HostFeatures};
use crate::instruction::InstructionSetKind;
use crate::probe::{CpuFreqProbe, FrequencyProbe};
use crate::result::{BenchmarkResult, RunStatus, ZeroReadingPolicy};
use crate::sampler::{FrequencySampler, StopToken};
use crate::util::affinity::{CoreAffinity, LinuxAffinity};
use crate::workload::{ResolvedWorkload, WorkloadTable};

/// Tunables of a single measurement
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RunnerSettings {
	/// Iterations per workload call; bounds how far a run overshoots its deadline
	pub batch_size: u64,
	pub sampling_interval: Duration,
	/// Pause between starting the sampler and starting the workload
	pub warmup: Duration,
	pub zero_policy: ZeroReadingPolicy,
}

impl Default for RunnerSettings {
	fn default() -> Self {
		Self {
			batch_size: ITERATIONS_PER_BATCH,
			sampling_interval: Duration::from_millis(SAMPLING_INTERVAL_MS),
			warmup: Duration::from_millis(WARMUP_MS),
			zero_policy: ZeroReadingPolicy::default(),
		}
	}
}

/// Drives one core with a workload while a sampler thread watches its frequency
#[derive(Debug)]
pub struct BenchmarkRunner<P, F, A> {
	probe: P,
	features: F,
	affinity: A,
	table: WorkloadTable,
	settings: RunnerSettings,
}

/// Runner wired to the real host
pub type HostRunner = BenchmarkRunner<CpuFreqProbe, HostFeatures, LinuxAffinity>;

impl HostRunner {
	pub fn host() -> Self {
		BenchmarkRunner::new(CpuFreqProbe::new(), HostFeatures::detect(), LinuxAffinity)
	}
}

impl<P: FrequencyProbe, F: FeatureDetector, A: CoreAffinity> BenchmarkRunner<P, F, A> {
	pub fn new(probe: P, features: F, affinity: A) -> Self {
		Self {
			probe,
			features,
			affinity,
			table: WorkloadTable::new(),
			settings: RunnerSettings::default(),
		}
	}

	pub fn with_settings(mut self, settings: RunnerSettings) -> Self {
		self.settings = settings;
		self
	}

	pub fn settings(&self) -> &RunnerSettings {
		&self.settings
	}

	pub fn probe(&self) -> &P {
		&self.probe
	}

	pub fn features(&self) -> &F {
		&self.features
	}

	pub fn affinity(&self) -> &A {
		&self.affinity
	}

	pub fn table(&self) -> &WorkloadTable {
		&self.table
	}

	/// Measures `core_id` under `kind` for `duration`
	///
	/// The calling thread is pinned to `core_id` and stays pinned afterwards.
	/// An unsupported instruction set is not an error: the result comes back
	/// with [`RunStatus::Unsupported`] and nothing is pinned or sampled.
	///
	/// A panic in the sampler or the probe is re-raised on the calling thread.
	///
	/// # Errors
	///
	/// [`BenchError::InvalidConfiguration`] if the run would end past what
	/// [`Instant`] can represent, [`BenchError::PinFailure`] if the thread
	/// cannot be bound to the core.
	pub fn run(
		&self,
		kind: InstructionSetKind,
		core_id: usize,
		duration: Duration,
	) -> Result<BenchmarkResult, BenchError> {
		self.check_duration(duration)?;

		let workload = match self.table.require(kind, &self.features) {
			Ok(workload) => workload,
			Err(err) => {
				warn!(core_id, "{err}, skipping this benchmark");
				return Ok(BenchmarkResult::skipped(core_id, kind, duration, RunStatus::Unsupported));
			},
		};

		self.affinity.pin_current(core_id)?;

		info!(
			core_id,
			variant = workload.variant(),
			"running {} benchmark for {:?}",
			workload.kind(),
			duration
		);

		let stop = StopToken::new();
		let sampler = FrequencySampler::new(self.settings.sampling_interval);

		let samples = thread::scope(|s| {
			let _stop_guard = stop.stop_on_drop();
			let handle = s.spawn(|| sampler.sample_core(&self.probe, core_id, &stop));

			thread::sleep(self.settings.warmup);
			let batches = self.drive(workload, duration);
			stop.stop();

			debug!(core_id, batches, "workload finished");
			match handle.join() {
				Ok(samples) => samples,
				Err(payload) => {
					warn!(core_id, "frequency sampler panicked");
					panic::resume_unwind(payload)
				},
			}
		});

		let result = BenchmarkResult::measured(
			core_id,
			workload.kind(),
			workload.variant(),
			duration,
			samples,
			self.settings.zero_policy,
		);

		if !result.success() {
			warn!(core_id, "{}", BenchError::NoSamplesCollected { core_id });
		}

		Ok(result)
	}

	/// Fails when warm-up plus `duration` from now does not fit in an [`Instant`]
	pub(crate) fn check_duration(&self, duration: Duration) -> Result<(), BenchError> {
		duration
			.checked_add(self.settings.warmup)
			.and_then(|total| Instant::now().checked_add(total))
			.map(|_| ())
			.ok_or_else(|| BenchError::invalid(format!("duration {duration:?} is too long")))
	}

	/// Executes batches until the deadline passes, returns the batch count
	fn drive(&self, workload: ResolvedWorkload, duration: Duration) -> u64 {
		// range checked by `check_duration` before the run started
		let Some(deadline) = Instant::now().checked_add(duration) else {
			return 0;
		};
		let mut batches = 0;

		while Instant::now() < deadline {
			workload.execute(self.settings.batch_size);
			batches += 1;
		}

		batches
	}
}
