//! Run configuration, validated before anything is pinned or started

use std::time::Duration;

use clap::ValueEnum;
use serde::Serialize;

use crate::constants::MAX_DURATION_SECS;
use crate::error::BenchError;
use crate::instruction::InstructionSetKind;
use crate::result::ZeroReadingPolicy;

/// Which cores a run covers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum RunMode {
	/// Only the core selected with `--core`
	#[default]
	Single,
	/// Every core at the same time
	Parallel,
	/// Every core, one after another
	Sequential,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
	#[default]
	Human,
	Json,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RunConfig {
	pub kind: InstructionSetKind,
	pub duration: Duration,
	pub core_id: usize,
	pub mode: RunMode,
	/// Also record every core's frequency while a multi-core run is going
	pub sample_all_cores: bool,
	pub zero_policy: ZeroReadingPolicy,
	pub format: OutputFormat,
}

/// Raw values as they arrive from the command line
#[derive(Debug, Clone)]
pub struct RawRunConfig<'a> {
	pub instr: &'a str,
	pub duration_secs: i64,
	pub core_id: i64,
	pub mode: RunMode,
	pub sample_all_cores: bool,
	pub exclude_unavailable: bool,
	pub format: OutputFormat,
}

impl RunConfig {
	/// Validates raw values against a host with `core_count` cores
	///
	/// # Errors
	///
	/// [`BenchError::InvalidConfiguration`] for a duration outside
	/// `1..=MAX_DURATION_SECS`, a core outside `0..core_count` or an unknown
	/// instruction set.
	pub fn validate(raw: &RawRunConfig<'_>, core_count: usize) -> Result<Self, BenchError> {
		if raw.duration_secs <= 0 {
			return Err(BenchError::invalid("duration must be greater than 0"));
		}
		if raw.duration_secs > MAX_DURATION_SECS {
			return Err(BenchError::invalid(format!(
				"duration must be at most {MAX_DURATION_SECS} seconds"
			)));
		}

		let max_core = core_count.saturating_sub(1);
		let core_id = usize::try_from(raw.core_id)
			.ok()
			.filter(|&id| id < core_count)
			.ok_or_else(|| BenchError::invalid(format!("core ID must be between 0 and {max_core}")))?;

		let kind = raw.instr.parse::<InstructionSetKind>()?;

		if raw.sample_all_cores && raw.mode == RunMode::Single {
			tracing::debug!("all-core sampling only applies to parallel and sequential runs");
		}

		Ok(Self {
			kind,
			duration: Duration::from_secs(raw.duration_secs.unsigned_abs()),
			core_id,
			mode: raw.mode,
			sample_all_cores: raw.sample_all_cores,
			zero_policy: if raw.exclude_unavailable {
				ZeroReadingPolicy::Exclude
			} else {
				ZeroReadingPolicy::Include
			},
			format: raw.format,
		})
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn raw(instr: &str, duration_secs: i64, core_id: i64) -> RawRunConfig<'_> {
		RawRunConfig {
			instr,
			duration_secs,
			core_id,
			mode: RunMode::Single,
			sample_all_cores: false,
			exclude_unavailable: false,
			format: OutputFormat::Human,
		}
	}

	#[test]
	fn accepts_a_valid_run() {
		let config = RunConfig::validate(&raw("avx2", 10, 3), 4).unwrap();
		assert_eq!(config.kind, InstructionSetKind::Width256);
		assert_eq!(config.duration, Duration::from_secs(10));
		assert_eq!(config.core_id, 3);
		assert_eq!(config.zero_policy, ZeroReadingPolicy::Include);
	}

	#[test]
	fn rejects_non_positive_durations() {
		for secs in [0, -1, -30] {
			let err = RunConfig::validate(&raw("basic", secs, 0), 4).unwrap_err();
			assert_eq!(err.to_string(), "invalid configuration: duration must be greater than 0");
		}
	}

	#[test]
	fn rejects_durations_past_the_limit() {
		let config = RunConfig::validate(&raw("basic", MAX_DURATION_SECS, 0), 4).unwrap();
		assert_eq!(config.duration, Duration::from_secs(86_400));

		for secs in [MAX_DURATION_SECS + 1, i64::MAX] {
			let err = RunConfig::validate(&raw("basic", secs, 0), 4).unwrap_err();
			assert_eq!(err.to_string(), "invalid configuration: duration must be at most 86400 seconds");
		}
	}

	#[test]
	fn rejects_cores_out_of_range() {
		for core in [-1, 4, 100] {
			let err = RunConfig::validate(&raw("basic", 1, core), 4).unwrap_err();
			assert_eq!(err.to_string(), "invalid configuration: core ID must be between 0 and 3");
		}
	}

	#[test]
	fn rejects_unknown_instruction_sets() {
		let err = RunConfig::validate(&raw("mmx", 1, 0), 4).unwrap_err();
		assert!(matches!(err, BenchError::InvalidConfiguration(_)));
	}

	#[test]
	fn exclude_flag_selects_filtering() {
		let mut raw = raw("amx", 1, 0);
		raw.exclude_unavailable = true;
		let config = RunConfig::validate(&raw, 1).unwrap();
		assert_eq!(config.zero_policy, ZeroReadingPolicy::Exclude);
	}
}
