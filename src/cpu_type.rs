use std::fs;

use serde::Serialize;

use crate::constants::{BUS_CLOCK_MHZ, INTEL_PLATFORM_INFO_MSR, PROC_CPUINFO};
use crate::feature::{FeatureDetector, FeatureSupport};
use crate::probe::FrequencyProbe;
use crate::util::affinity::CoreAffinity;
use crate::util::msr::read_msr;
use crate::workload::WorkloadTable;

/// Represents CPU manufacturer types that can be detected
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum CpuType {
	/// Intel CPU architecture
	Intel,
	/// AMD CPU architecture
	Amd,
	/// Any other CPU architecture not explicitly supported
	Unsupported,
}

impl CpuType {
	/// Picks the vendor out of the text of /proc/cpuinfo
	pub fn from_cpuinfo(cpuinfo: &str) -> Self {
		if cpuinfo.contains("GenuineIntel") {
			CpuType::Intel
		} else if cpuinfo.contains("AuthenticAMD") {
			CpuType::Amd
		} else {
			CpuType::Unsupported
		}
	}
}

/// Detects the CPU manufacturer by reading /proc/cpuinfo
pub fn detect_cpu_type() -> CpuType {
	CpuType::from_cpuinfo(&fs::read_to_string(PROC_CPUINFO).unwrap_or_default())
}

/// Returns the first `model name` entry of /proc/cpuinfo text
pub fn model_name(cpuinfo: &str) -> Option<String> {
	cpuinfo
		.lines()
		.filter(|line| line.starts_with("model name"))
		.find_map(|line| line.split_once(':'))
		.map(|(_, name)| name.trim().to_string())
		.filter(|name| !name.is_empty())
}

/// Reads the non-turbo base frequency from MSR_PLATFORM_INFO
///
/// Only meaningful on Intel. Needs the `msr` kernel module and root.
pub fn base_frequency_mhz(cpu_type: CpuType) -> Option<f64> {
	if cpu_type != CpuType::Intel {
		return None;
	}

	let value = read_msr(INTEL_PLATFORM_INFO_MSR, 0).ok()?;
	let ratio = (value >> 8) & 0xFF;
	(ratio > 0).then(|| ratio as f64 * BUS_CLOCK_MHZ)
}

/// Host summary printed before a run and by `--list`
#[derive(Debug, Clone, Serialize)]
pub struct CpuInfo {
	pub vendor: CpuType,
	pub model: String,
	pub cores: usize,
	pub support: FeatureSupport,
	pub base_frequency_mhz: Option<f64>,
	pub core0_frequency_mhz: f64,
}

impl CpuInfo {
	pub fn gather(
		probe: &dyn FrequencyProbe,
		detector: &dyn FeatureDetector,
		affinity: &dyn CoreAffinity,
		table: &WorkloadTable,
	) -> Self {
		let cpuinfo = fs::read_to_string(PROC_CPUINFO).unwrap_or_default();
		let vendor = CpuType::from_cpuinfo(&cpuinfo);

		Self {
			vendor,
			model: model_name(&cpuinfo).unwrap_or_else(|| "Unknown".to_string()),
			cores: affinity.core_count(),
			support: FeatureSupport::detect(detector, table),
			base_frequency_mhz: base_frequency_mhz(vendor),
			core0_frequency_mhz: probe.read_mhz(0),
		}
	}
}
