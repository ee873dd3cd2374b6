use std::io::{self, Write};

use serde::Serialize;

use crate::constants::MAX_TIMELINE_ROWS;
use crate::coordinator::{MultiCoreReport, SweepMode};
use crate::cpu_type::CpuInfo;
use crate::result::{AllCoreSample, BenchmarkResult, FrequencySample, RunStatus};
use crate::util::mean;

fn yes_no(value: bool) -> &'static str {
	if value { "Yes" } else { "No" }
}

fn mhz_or_unavailable(mhz: f64) -> String {
	if mhz > 0.0 {
		format!("{mhz:.0} MHz")
	} else {
		"unavailable".to_string()
	}
}

/// Prints the host summary and the instruction-set support table
pub fn write_cpu_info(out: &mut dyn Write, info: &CpuInfo) -> io::Result<()> {
	writeln!(out, "CPU Information:")?;
	writeln!(out, "  Vendor: {:?}", info.vendor)?;
	writeln!(out, "  Model: {}", info.model)?;
	writeln!(out, "  Cores: {}", info.cores)?;
	if let Some(base) = info.base_frequency_mhz {
		writeln!(out, "  Base frequency: {base:.0} MHz")?;
	}

	writeln!(out, "  Instruction Set Support:")?;
	for (feature, present) in &info.support.features {
		writeln!(out, "    {:<8} {}", format!("{}:", feature.as_str()), yes_no(*present))?;
	}

	writeln!(out, "  Benchmarks:")?;
	for (kind, supported) in &info.support.instruction_sets {
		writeln!(
			out,
			"    {:<11} {:<10} {}",
			kind.cli_name(),
			format!("({})", kind.name()),
			if *supported { "available" } else { "not supported" }
		)?;
	}

	writeln!(
		out,
		"  Current frequency of core 0: {}",
		mhz_or_unavailable(info.core0_frequency_mhz)
	)?;
	writeln!(out)
}

/// Prints the statistics and timeline of a single-core run
pub fn write_result(out: &mut dyn Write, result: &BenchmarkResult) -> io::Result<()> {
	let Some(stats) = result.stats() else {
		match &result.status {
			RunStatus::Unsupported => {
				writeln!(out, "The CPU does not support {} instructions.", result.kind)?;
				writeln!(out, "Skipping this benchmark.")?;
			},
			RunStatus::PinFailed(reason) | RunStatus::Failed(reason) => {
				writeln!(out, "Benchmark did not run: {reason}")?
			},
			_ => writeln!(out, "No frequency measurements were taken!")?,
		}
		return Ok(());
	};

	writeln!(out)?;
	writeln!(out, "Benchmark Results:")?;
	writeln!(out, "  Instruction Set: {}", result.kind)?;
	if let Some(variant) = result.variant {
		writeln!(out, "  Variant: {variant}")?;
	}
	writeln!(out, "  Core: {}", result.core_id)?;
	writeln!(out, "  Duration: {} seconds", result.duration.as_secs())?;
	writeln!(out, "  Frequency Statistics:")?;
	writeln!(out, "    Minimum: {:.2} MHz", stats.min_mhz)?;
	writeln!(out, "    Maximum: {:.2} MHz", stats.max_mhz)?;
	writeln!(out, "    Average: {:.2} MHz", stats.mean_mhz)?;

	let unavailable = result.samples().iter().filter(|s| s.is_unavailable()).count();
	if unavailable > 0 {
		writeln!(
			out,
			"    ({unavailable} of {} readings were unavailable)",
			result.samples().len()
		)?;
	}

	writeln!(out)?;
	writeln!(out, "  Frequency Timeline:")?;
	for sample in timeline(result.samples()) {
		writeln!(out, "    {:>6.0}ms: {:.2} MHz", sample.offset.as_secs_f64() * 1000.0, sample.mhz)?;
	}

	Ok(())
}

/// Picks about [`MAX_TIMELINE_ROWS`] evenly spaced samples, always keeping the last
pub fn timeline(samples: &[FrequencySample]) -> Vec<&FrequencySample> {
	if samples.len() <= MAX_TIMELINE_ROWS {
		return samples.iter().collect();
	}

	let step = samples.len().div_ceil(MAX_TIMELINE_ROWS);
	let mut rows: Vec<_> = samples.iter().step_by(step).collect();
	if (samples.len() - 1) % step != 0 {
		rows.extend(samples.last());
	}
	rows
}

pub fn write_core_started(out: &mut dyn Write, core_id: usize) -> io::Result<()> {
	writeln!(out, "Core {core_id}: started")?;
	out.flush()
}

pub fn write_core_finished(out: &mut dyn Write, result: &BenchmarkResult) -> io::Result<()> {
	match result.stats() {
		Some(stats) => writeln!(
			out,
			"Core {}: done, avg {:.0} MHz over {} samples",
			result.core_id,
			stats.mean_mhz,
			result.samples().len()
		)?,
		None => writeln!(out, "Core {}: {}", result.core_id, result.status.as_str())?,
	}
	out.flush()
}

/// Prints the per-core table of a sweep, ascending by core ID
pub fn write_multi_core_report(out: &mut dyn Write, report: &MultiCoreReport) -> io::Result<()> {
	let mode = match report.mode {
		SweepMode::Parallel => "parallel",
		SweepMode::Sequential => "sequential",
	};

	writeln!(out)?;
	writeln!(
		out,
		"Benchmark Results ({}, {} seconds per core, {mode}):",
		report.kind,
		report.duration.as_secs()
	)?;
	writeln!(out, "  {:<6} {:>10} {:>10} {:>10} {:>8}  Status", "Core", "Min", "Max", "Avg", "Samples")?;

	for result in report.results.values() {
		match result.stats() {
			Some(stats) => writeln!(
				out,
				"  {:<6} {:>10.2} {:>10.2} {:>10.2} {:>8}  {}",
				result.core_id,
				stats.min_mhz,
				stats.max_mhz,
				stats.mean_mhz,
				result.samples().len(),
				result.status.as_str()
			)?,
			None => writeln!(
				out,
				"  {:<6} {:>10} {:>10} {:>10} {:>8}  {}",
				result.core_id,
				"-",
				"-",
				"-",
				result.samples().len(),
				status_detail(&result.status)
			)?,
		}
	}

	let failed = report.failed_cores();
	if !failed.is_empty() {
		writeln!(out, "  {} of {} cores produced no statistics", failed.len(), report.results.len())?;
	}

	if !report.all_core_samples.is_empty() {
		write_all_core_timeline(out, &report.all_core_samples)?;
	}

	Ok(())
}

fn status_detail(status: &RunStatus) -> String {
	match status {
		RunStatus::PinFailed(reason) | RunStatus::Failed(reason) => format!("{}: {reason}", status.as_str()),
		other => other.as_str().to_string(),
	}
}

fn write_all_core_timeline(out: &mut dyn Write, samples: &[AllCoreSample]) -> io::Result<()> {
	writeln!(out)?;
	writeln!(out, "  All-Core Frequency Timeline (MHz):")?;

	let step = samples.len().div_ceil(MAX_TIMELINE_ROWS).max(1);
	for tick in samples.iter().step_by(step) {
		let cores: Vec<String> = tick.mhz.iter().map(|mhz| format!("{mhz:.0}")).collect();
		writeln!(
			out,
			"    {:>6.0}ms: avg {:>7.1} | {}",
			tick.offset.as_secs_f64() * 1000.0,
			mean(&tick.mhz),
			cores.join(" ")
		)?;
	}

	Ok(())
}

/// Writes any report as pretty JSON followed by a newline
pub fn write_json<T: Serialize + ?Sized>(out: &mut dyn Write, value: &T) -> io::Result<()> {
	serde_json::to_writer_pretty(&mut *out, value)?;
	writeln!(out)
}

#[cfg(test)]
mod tests {
	use std::collections::BTreeMap;
	use std::time::Duration;

	use super::*;
	use crate::instruction::InstructionSetKind;
	use crate::result::ZeroReadingPolicy;

	fn samples(count: usize) -> Vec<FrequencySample> {
		(0..count)
			.map(|i| FrequencySample {
				offset: Duration::from_millis(i as u64 * 100),
				mhz: 3000.0 + i as f64,
			})
			.collect()
	}

	fn measured(core_id: usize, count: usize) -> BenchmarkResult {
		BenchmarkResult::measured(
			core_id,
			InstructionSetKind::Width256,
			"AVX2 256-bit",
			Duration::from_secs(2),
			samples(count),
			ZeroReadingPolicy::Include,
		)
	}

	fn render(f: impl FnOnce(&mut dyn Write) -> io::Result<()>) -> String {
		let mut buf = Vec::new();
		f(&mut buf).unwrap();
		String::from_utf8(buf).unwrap()
	}

	#[test]
	fn short_timelines_are_shown_whole() {
		let all = samples(20);
		assert_eq!(timeline(&all).len(), 20);
	}

	#[test]
	fn long_timelines_are_thinned_and_keep_the_last() {
		let all = samples(123);
		let rows = timeline(&all);
		assert!(rows.len() <= MAX_TIMELINE_ROWS + 2);
		assert_eq!(rows.first().unwrap().offset, Duration::ZERO);
		assert_eq!(rows.last().unwrap().offset, all.last().unwrap().offset);

		let exact = samples(100);
		let rows = timeline(&exact);
		assert_eq!(rows.len(), 51);
	}

	#[test]
	fn result_block_shows_statistics() {
		let text = render(|out| write_result(out, &measured(3, 5)));
		assert!(text.contains("Instruction Set: AVX256"));
		assert!(text.contains("Core: 3"));
		assert!(text.contains("Minimum: 3000.00 MHz"));
		assert!(text.contains("Maximum: 3004.00 MHz"));
		assert!(text.contains("Average: 3002.00 MHz"));
		assert!(text.contains("400ms: 3004.00 MHz"));
	}

	#[test]
	fn unsupported_result_has_no_statistics() {
		let result = BenchmarkResult::skipped(
			0,
			InstructionSetKind::Width512,
			Duration::from_secs(1),
			RunStatus::Unsupported,
		);
		let text = render(|out| write_result(out, &result));
		assert!(text.contains("does not support AVX512"));
		assert!(!text.contains("Minimum"));
	}

	#[test]
	fn sweep_table_is_ordered_by_core() {
		let mut results = BTreeMap::new();
		results.insert(1, measured(1, 3));
		results.insert(
			0,
			BenchmarkResult::skipped(
				0,
				InstructionSetKind::Width256,
				Duration::from_secs(2),
				RunStatus::PinFailed("failed to pin thread to core 0".into()),
			),
		);
		let report = MultiCoreReport {
			kind: InstructionSetKind::Width256,
			duration: Duration::from_secs(2),
			mode: SweepMode::Parallel,
			results,
			all_core_samples: Vec::new(),
		};

		let text = render(|out| write_multi_core_report(out, &report));
		let core0 = text.find("  0 ").unwrap();
		let core1 = text.find("  1 ").unwrap();
		assert!(core0 < core1);
		assert!(text.contains("pin failed: failed to pin thread to core 0"));
		assert!(text.contains("1 of 2 cores produced no statistics"));
	}

	#[test]
	fn json_report_is_parseable() {
		let text = render(|out| write_json(out, &measured(0, 2)));
		let value: serde_json::Value = serde_json::from_str(&text).unwrap();
		assert_eq!(value["core_id"], 0);
		assert_eq!(value["kind"], "width256");
		assert_eq!(value["status"], "completed");
		assert_eq!(value["samples"].as_array().unwrap().len(), 2);
		assert_eq!(value["stats"]["count"], 2);
	}
}
