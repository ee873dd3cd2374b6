use std::fs;
use std::path::PathBuf;

use crate::constants::{BUS_CLOCK_MHZ, INTEL_PERF_STATUS_MSR, PROC_CPUINFO, SYS_CPU_DIR};
use crate::cpu_type::{CpuType, detect_cpu_type};
use crate::util::khz_to_mhz;
use crate::util::msr::read_msr;

/// Reads the current clock frequency of one core
///
/// A reading of exactly 0.0 means the frequency could not be determined.
pub trait FrequencyProbe: Sync {
	fn read_mhz(&self, core_id: usize) -> f64;
}

/// Frequency readback through the kernel's cpuinfo and cpufreq interfaces
///
/// Sources, first non-zero wins:
/// 1. the `cpu MHz` line of the core's block in /proc/cpuinfo
/// 2. `cpu<N>/cpufreq/scaling_cur_freq` in sysfs
/// 3. the current ratio in IA32_PERF_STATUS, Intel only
#[derive(Debug, Clone)]
pub struct CpuFreqProbe {
	cpuinfo_path: PathBuf,
	sys_cpu_dir: PathBuf,
	use_msr: bool,
}

impl Default for CpuFreqProbe {
	fn default() -> Self {
		Self::new()
	}
}

impl CpuFreqProbe {
	pub fn new() -> Self {
		Self {
			cpuinfo_path: PathBuf::from(PROC_CPUINFO),
			sys_cpu_dir: PathBuf::from(SYS_CPU_DIR),
			use_msr: detect_cpu_type() == CpuType::Intel,
		}
	}

	/// Probe rooted at alternative paths, with the MSR source disabled
	pub fn with_paths(cpuinfo_path: impl Into<PathBuf>, sys_cpu_dir: impl Into<PathBuf>) -> Self {
		Self {
			cpuinfo_path: cpuinfo_path.into(),
			sys_cpu_dir: sys_cpu_dir.into(),
			use_msr: false,
		}
	}

	fn from_cpuinfo(&self, core_id: usize) -> Option<f64> {
		let cpuinfo = fs::read_to_string(&self.cpuinfo_path).ok()?;
		cpuinfo_mhz(&cpuinfo, core_id)
	}

	fn from_cpufreq(&self, core_id: usize) -> Option<f64> {
		let path = self
			.sys_cpu_dir
			.join(format!("cpu{core_id}"))
			.join("cpufreq/scaling_cur_freq");
		let khz = fs::read_to_string(path).ok()?.trim().parse::<u64>().ok()?;
		Some(khz_to_mhz(khz))
	}

	fn from_msr(&self, core_id: usize) -> Option<f64> {
		if !self.use_msr {
			return None;
		}
		let value = read_msr(INTEL_PERF_STATUS_MSR, core_id).ok()?;
		Some(((value >> 8) & 0xFF) as f64 * BUS_CLOCK_MHZ)
	}
}

impl FrequencyProbe for CpuFreqProbe {
	fn read_mhz(&self, core_id: usize) -> f64 {
		[Self::from_cpuinfo, Self::from_cpufreq, Self::from_msr]
			.iter()
			.filter_map(|source| source(self, core_id))
			.find(|&mhz| mhz > 0.0)
			.unwrap_or(0.0)
	}
}

/// Finds the `cpu MHz` value inside the `processor : <core_id>` block
pub fn cpuinfo_mhz(cpuinfo: &str, core_id: usize) -> Option<f64> {
	let mut current = None;

	for line in cpuinfo.lines() {
		let Some((key, value)) = line.split_once(':') else {
			continue;
		};
		match key.trim() {
			"processor" => current = value.trim().parse::<usize>().ok(),
			"cpu MHz" if current == Some(core_id) => return value.trim().parse::<f64>().ok(),
			_ => {},
		}
	}

	None
}

#[cfg(test)]
mod tests {
	use super::*;

	const CPUINFO: &str = "processor\t: 0\nvendor_id\t: GenuineIntel\ncpu MHz\t\t: 3400.125\n\n\
	                       processor\t: 1\nvendor_id\t: GenuineIntel\ncpu MHz\t\t: 800.000\n\n\
	                       processor\t: 2\nvendor_id\t: GenuineIntel\n\n";

	#[test]
	fn picks_the_matching_processor_block() {
		assert_eq!(cpuinfo_mhz(CPUINFO, 0), Some(3400.125));
		assert_eq!(cpuinfo_mhz(CPUINFO, 1), Some(800.0));
		assert_eq!(cpuinfo_mhz(CPUINFO, 2), None);
		assert_eq!(cpuinfo_mhz(CPUINFO, 9), None);
	}

	fn fake_host(cpufreq_khz: &[(usize, &str)]) -> tempfile::TempDir {
		let dir = tempfile::tempdir().unwrap();
		fs::write(dir.path().join("cpuinfo"), CPUINFO).unwrap();
		for (cpu, khz) in cpufreq_khz {
			let cpufreq = dir.path().join(format!("cpu/cpu{cpu}/cpufreq"));
			fs::create_dir_all(&cpufreq).unwrap();
			fs::write(cpufreq.join("scaling_cur_freq"), khz).unwrap();
		}
		dir
	}

	#[test]
	fn cpuinfo_wins_over_cpufreq() {
		let dir = fake_host(&[(0, "1200000\n")]);
		let probe = CpuFreqProbe::with_paths(dir.path().join("cpuinfo"), dir.path().join("cpu"));
		assert_eq!(probe.read_mhz(0), 3400.125);
	}

	#[test]
	fn falls_back_to_cpufreq() {
		let dir = fake_host(&[(2, "2100000\n")]);
		let probe = CpuFreqProbe::with_paths(dir.path().join("cpuinfo"), dir.path().join("cpu"));
		assert_eq!(probe.read_mhz(2), 2100.0);
	}

	#[test]
	fn unavailable_reads_zero() {
		let dir = fake_host(&[(3, "garbage")]);
		let probe = CpuFreqProbe::with_paths(dir.path().join("cpuinfo"), dir.path().join("cpu"));
		assert_eq!(probe.read_mhz(3), 0.0);

		let probe = CpuFreqProbe::with_paths(dir.path().join("missing"), dir.path().join("missing"));
		assert_eq!(probe.read_mhz(0), 0.0);
	}
}
