use std::collections::HashSet;
use std::fs;

use serde::Serialize;

use crate::constants::PROC_CPUINFO;
use crate::instruction::InstructionSetKind;
use crate::workload::WorkloadTable;

/// CPU capabilities the workloads depend on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum CpuFeature {
	Sse,
	Sse2,
	Avx,
	Avx2,
	Avx512f,
	/// AMX tile or BF16 support
	Amx,
}

impl CpuFeature {
	pub const ALL: [CpuFeature; 6] = [
		CpuFeature::Sse,
		CpuFeature::Sse2,
		CpuFeature::Avx,
		CpuFeature::Avx2,
		CpuFeature::Avx512f,
		CpuFeature::Amx,
	];

	pub fn as_str(&self) -> &'static str {
		match self {
			CpuFeature::Sse => "SSE",
			CpuFeature::Sse2 => "SSE2",
			CpuFeature::Avx => "AVX",
			CpuFeature::Avx2 => "AVX2",
			CpuFeature::Avx512f => "AVX512F",
			CpuFeature::Amx => "AMX",
		}
	}
}

/// Answers whether the host can execute a class of instructions
pub trait FeatureDetector: Sync {
	fn has_feature(&self, feature: CpuFeature) -> bool;
}

/// Feature detection for the running host
///
/// SIMD levels come from CPUID through `is_x86_feature_detected!`. AMX is
/// taken from the kernel's `flags` line since the kernel must also enable
/// tile state before the instructions are usable.
#[derive(Debug, Clone, Default)]
pub struct HostFeatures {
	flags: HashSet<String>,
}

impl HostFeatures {
	pub fn detect() -> Self {
		let cpuinfo = fs::read_to_string(PROC_CPUINFO).unwrap_or_default();
		Self {
			flags: cpuinfo_flags(&cpuinfo),
		}
	}

	fn has_flag(&self, flag: &str) -> bool {
		self.flags.contains(flag)
	}
}

impl FeatureDetector for HostFeatures {
	#[cfg(target_arch = "x86_64")]
	fn has_feature(&self, feature: CpuFeature) -> bool {
		match feature {
			CpuFeature::Sse => is_x86_feature_detected!("sse"),
			CpuFeature::Sse2 => is_x86_feature_detected!("sse2"),
			CpuFeature::Avx => is_x86_feature_detected!("avx"),
			CpuFeature::Avx2 => is_x86_feature_detected!("avx2"),
			CpuFeature::Avx512f => is_x86_feature_detected!("avx512f"),
			CpuFeature::Amx => self.has_flag("amx_tile") || self.has_flag("amx_bf16"),
		}
	}

	#[cfg(not(target_arch = "x86_64"))]
	fn has_feature(&self, feature: CpuFeature) -> bool {
		match feature {
			CpuFeature::Amx => self.has_flag("amx_tile") || self.has_flag("amx_bf16"),
			_ => false,
		}
	}
}

/// Collects the tokens of the first `flags` line of /proc/cpuinfo text
///
/// Tokens are matched whole, so `avx` never matches `avx2`.
pub fn cpuinfo_flags(cpuinfo: &str) -> HashSet<String> {
	cpuinfo
		.lines()
		.filter(|line| line.starts_with("flags"))
		.find_map(|line| line.split_once(':'))
		.map(|(_, flags)| flags.split_whitespace().map(str::to_string).collect())
		.unwrap_or_default()
}

/// Supported instruction sets, as shown by `--list`
#[derive(Debug, Clone, Serialize)]
pub struct FeatureSupport {
	pub features: Vec<(CpuFeature, bool)>,
	pub instruction_sets: Vec<(InstructionSetKind, bool)>,
}

impl FeatureSupport {
	pub fn detect(detector: &dyn FeatureDetector, table: &WorkloadTable) -> Self {
		Self {
			features: CpuFeature::ALL.iter().map(|&f| (f, detector.has_feature(f))).collect(),
			instruction_sets: InstructionSetKind::ALL
				.iter()
				.map(|&kind| (kind, table.supports(kind, detector)))
				.collect(),
		}
	}
}
