pub mod scalar;
#[cfg(target_arch = "x86_64")]
pub mod simd;

use std::collections::BTreeMap;
use std::fmt::Debug;

use crate::error::BenchError;
use crate::feature::{CpuFeature, FeatureDetector};
use crate::instruction::InstructionSetKind;

/// Routine signature shared by every workload: run the chain `iterations` times
pub type Routine = unsafe fn(u64);

/// One way of executing an instruction-set kind
///
/// `requires` is what the detector must report before the routine is chosen.
/// `fallback` is tried, one tier down, when it does not.
pub struct WorkloadSpec {
	pub variant: &'static str,
	pub requires: Option<CpuFeature>,
	pub fallback: Option<&'static WorkloadSpec>,
	routine: Routine,
	/// Checks the real CPU; a routine is never handed out unless this holds
	cpu_can_run: fn() -> bool,
}

impl Debug for WorkloadSpec {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("WorkloadSpec")
			.field("variant", &self.variant)
			.field("requires", &self.requires)
			.field("fallback", &self.fallback.map(|spec| spec.variant))
			.finish()
	}
}

impl WorkloadSpec {
	fn usable(&'static self, detector: &dyn FeatureDetector) -> Option<&'static WorkloadSpec> {
		let reported = self.requires.is_none_or(|feature| detector.has_feature(feature));
		if reported && (self.cpu_can_run)() {
			Some(self)
		} else {
			self.fallback.and_then(|spec| spec.usable(detector))
		}
	}
}

fn always() -> bool {
	true
}

static SCALAR_ADD: WorkloadSpec = WorkloadSpec {
	variant: "integer add",
	requires: None,
	fallback: None,
	routine: scalar::scalar_add,
	cpu_can_run: always,
};

static MATRIX_PLACEHOLDER: WorkloadSpec = WorkloadSpec {
	variant: "scalar stand-in",
	requires: Some(CpuFeature::Amx),
	fallback: None,
	routine: scalar::matrix_placeholder,
	cpu_can_run: always,
};

#[cfg(target_arch = "x86_64")]
mod x86 {
	use super::{WorkloadSpec, simd};
	use crate::feature::CpuFeature;

	fn has_sse2() -> bool {
		is_x86_feature_detected!("sse2")
	}

	fn has_avx() -> bool {
		is_x86_feature_detected!("avx")
	}

	fn has_avx2() -> bool {
		is_x86_feature_detected!("avx2")
	}

	fn has_avx512f() -> bool {
		is_x86_feature_detected!("avx512f")
	}

	pub static SSE2_SCALAR: WorkloadSpec = WorkloadSpec {
		variant: "SSE2 scalar",
		requires: Some(CpuFeature::Sse2),
		fallback: None,
		routine: simd::sse2_scalar,
		cpu_can_run: has_sse2,
	};

	pub static AVX128: WorkloadSpec = WorkloadSpec {
		variant: "AVX 128-bit",
		requires: Some(CpuFeature::Avx),
		fallback: Some(&SSE2_SCALAR),
		routine: simd::avx128,
		cpu_can_run: has_avx,
	};

	pub static AVX256: WorkloadSpec = WorkloadSpec {
		variant: "AVX2 256-bit",
		requires: Some(CpuFeature::Avx2),
		fallback: None,
		routine: simd::avx256,
		cpu_can_run: has_avx2,
	};

	pub static AVX512: WorkloadSpec = WorkloadSpec {
		variant: "AVX-512F 512-bit",
		requires: Some(CpuFeature::Avx512f),
		fallback: None,
		routine: simd::avx512,
		cpu_can_run: has_avx512f,
	};
}

/// Maps each instruction-set kind to its preferred workload
#[derive(Debug, Clone)]
pub struct WorkloadTable {
	entries: BTreeMap<InstructionSetKind, &'static WorkloadSpec>,
}

impl Default for WorkloadTable {
	fn default() -> Self {
		Self::new()
	}
}

impl WorkloadTable {
	/// Builds the table for the compilation target
	pub fn new() -> Self {
		let mut entries = BTreeMap::new();
		entries.insert(InstructionSetKind::ScalarAdd, &SCALAR_ADD);
		entries.insert(InstructionSetKind::MatrixPlaceholder, &MATRIX_PLACEHOLDER);

		#[cfg(target_arch = "x86_64")]
		{
			entries.insert(InstructionSetKind::Width128, &x86::AVX128);
			entries.insert(InstructionSetKind::Width256, &x86::AVX256);
			entries.insert(InstructionSetKind::Width512, &x86::AVX512);
		}

		Self { entries }
	}

	/// Picks the routine for `kind`, walking down the fallback chain
	///
	/// Returns `None` when neither the primary nor any fallback can run here.
	pub fn resolve(&self, kind: InstructionSetKind, detector: &dyn FeatureDetector) -> Option<ResolvedWorkload> {
		let spec = self.entries.get(&kind)?.usable(detector)?;
		Some(ResolvedWorkload { kind, spec })
	}

	/// Like [`resolve`](Self::resolve) but with an error naming the kind
	pub fn require(
		&self,
		kind: InstructionSetKind,
		detector: &dyn FeatureDetector,
	) -> Result<ResolvedWorkload, BenchError> {
		self.resolve(kind, detector)
			.ok_or(BenchError::UnsupportedInstructionSet { kind })
	}

	pub fn supports(&self, kind: InstructionSetKind, detector: &dyn FeatureDetector) -> bool {
		self.resolve(kind, detector).is_some()
	}
}

/// A workload whose capability checks have passed
#[derive(Debug, Clone, Copy)]
pub struct ResolvedWorkload {
	kind: InstructionSetKind,
	spec: &'static WorkloadSpec,
}

impl ResolvedWorkload {
	pub fn kind(&self) -> InstructionSetKind {
		self.kind
	}

	/// Name of the routine actually chosen, e.g. "SSE2 scalar" for a 128-bit fallback
	pub fn variant(&self) -> &'static str {
		self.spec.variant
	}

	/// Runs one batch of `iterations` chain repetitions
	#[inline]
	pub fn execute(&self, iterations: u64) {
		// SAFETY: only constructed by `WorkloadTable::resolve` after `cpu_can_run` held.
		unsafe { (self.spec.routine)(iterations) }
	}
}
