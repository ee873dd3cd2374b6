use std::time::Duration;

use serde::{Serialize, Serializer};

use crate::instruction::InstructionSetKind;

fn as_millis<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
	serializer.serialize_f64(duration.as_secs_f64() * 1000.0)
}

/// One frequency reading, timed from the start of sampling
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FrequencySample {
	#[serde(rename = "offset_ms", serialize_with = "as_millis")]
	pub offset: Duration,
	/// 0.0 when the frequency could not be read
	pub mhz: f64,
}

impl FrequencySample {
	pub fn is_unavailable(&self) -> bool {
		self.mhz == 0.0
	}
}

/// Frequencies of every core read in the same tick
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AllCoreSample {
	#[serde(rename = "offset_ms", serialize_with = "as_millis")]
	pub offset: Duration,
	pub mhz: Vec<f64>,
}

/// How "unavailable" readings take part in the statistics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ZeroReadingPolicy {
	/// Zero readings count like any other value
	#[default]
	Include,
	/// Zero readings are dropped before reduction; the raw samples keep them
	Exclude,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FrequencyStats {
	pub min_mhz: f64,
	pub max_mhz: f64,
	pub mean_mhz: f64,
	/// Number of readings the statistics were computed from
	pub count: usize,
}

impl FrequencyStats {
	/// Reduces readings to min/max/mean, `None` when nothing is left to reduce
	pub fn from_samples(samples: &[FrequencySample], policy: ZeroReadingPolicy) -> Option<Self> {
		let values: Vec<f64> = samples
			.iter()
			.filter(|s| policy == ZeroReadingPolicy::Include || !s.is_unavailable())
			.map(|s| s.mhz)
			.collect();

		if values.is_empty() {
			return None;
		}

		let min_mhz = values.iter().copied().fold(f64::INFINITY, f64::min);
		let max_mhz = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
		// Clamped so rounding never puts the mean outside [min, max]
		let mean_mhz = crate::util::mean(&values).clamp(min_mhz, max_mhz);

		Some(Self {
			min_mhz,
			max_mhz,
			mean_mhz,
			count: values.len(),
		})
	}
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "reason", rename_all = "snake_case")]
pub enum RunStatus {
	Completed,
	Unsupported,
	NoSamples,
	PinFailed(String),
	/// The run could not start for any other reason
	Failed(String),
}

impl RunStatus {
	pub fn as_str(&self) -> &'static str {
		match self {
			RunStatus::Completed => "completed",
			RunStatus::Unsupported => "unsupported",
			RunStatus::NoSamples => "no samples",
			RunStatus::PinFailed(_) => "pin failed",
			RunStatus::Failed(_) => "failed",
		}
	}
}

/// Outcome of one (core, instruction set, duration) run
///
/// Statistics are only present for successful runs.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BenchmarkResult {
	pub core_id: usize,
	pub kind: InstructionSetKind,
	/// Routine used, which differs from the kind's primary one after a fallback
	pub variant: Option<&'static str>,
	#[serde(rename = "duration_ms", serialize_with = "as_millis")]
	pub duration: Duration,
	#[serde(flatten)]
	pub status: RunStatus,
	samples: Vec<FrequencySample>,
	stats: Option<FrequencyStats>,
}

impl BenchmarkResult {
	pub(crate) fn measured(
		core_id: usize,
		kind: InstructionSetKind,
		variant: &'static str,
		duration: Duration,
		samples: Vec<FrequencySample>,
		policy: ZeroReadingPolicy,
	) -> Self {
		let stats = FrequencyStats::from_samples(&samples, policy);
		let status = if stats.is_some() {
			RunStatus::Completed
		} else {
			RunStatus::NoSamples
		};

		Self {
			core_id,
			kind,
			variant: Some(variant),
			duration,
			status,
			samples,
			stats,
		}
	}

	/// A run that never started: nothing sampled, nothing reduced
	pub(crate) fn skipped(core_id: usize, kind: InstructionSetKind, duration: Duration, status: RunStatus) -> Self {
		Self {
			core_id,
			kind,
			variant: None,
			duration,
			status,
			samples: Vec::new(),
			stats: None,
		}
	}

	pub fn success(&self) -> bool {
		self.stats.is_some()
	}

	pub fn stats(&self) -> Option<&FrequencyStats> {
		self.stats.as_ref()
	}

	/// Readings in the order they were taken
	pub fn samples(&self) -> &[FrequencySample] {
		&self.samples
	}

	/// Offset between the first and the last reading
	pub fn sampling_span(&self) -> Duration {
		match (self.samples.first(), self.samples.last()) {
			(Some(first), Some(last)) => last.offset.saturating_sub(first.offset),
			_ => Duration::ZERO,
		}
	}
}
