use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use crate::error::BenchError;

/// Instruction-width families that can be benchmarked
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum InstructionSetKind {
	/// General-purpose register integer adds
	ScalarAdd,
	/// 128-bit SIMD (AVX encoded, SSE2 scalar fallback)
	Width128,
	/// 256-bit SIMD (AVX2)
	Width256,
	/// 512-bit SIMD (AVX-512F)
	Width512,
	/// Scalar stand-in for the AMX matrix unit
	MatrixPlaceholder,
}

impl InstructionSetKind {
	pub const ALL: [InstructionSetKind; 5] = [
		InstructionSetKind::Width128,
		InstructionSetKind::Width256,
		InstructionSetKind::Width512,
		InstructionSetKind::MatrixPlaceholder,
		InstructionSetKind::ScalarAdd,
	];

	/// Returns the name shown in reports
	pub fn name(&self) -> &'static str {
		match self {
			InstructionSetKind::ScalarAdd => "Basic ADD",
			InstructionSetKind::Width128 => "AVX128/SSE",
			InstructionSetKind::Width256 => "AVX256",
			InstructionSetKind::Width512 => "AVX512",
			InstructionSetKind::MatrixPlaceholder => "AMX",
		}
	}

	/// Returns the canonical command-line spelling
	pub fn cli_name(&self) -> &'static str {
		match self {
			InstructionSetKind::ScalarAdd => "basic_add",
			InstructionSetKind::Width128 => "avx128",
			InstructionSetKind::Width256 => "avx256",
			InstructionSetKind::Width512 => "avx512",
			InstructionSetKind::MatrixPlaceholder => "amx",
		}
	}

	fn options() -> String {
		Self::ALL.iter().map(|k| k.cli_name()).collect::<Vec<_>>().join(", ")
	}
}

impl fmt::Display for InstructionSetKind {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.name())
	}
}

impl FromStr for InstructionSetKind {
	type Err = BenchError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s.trim().to_lowercase().as_str() {
			"avx128" | "sse" | "128" => Ok(InstructionSetKind::Width128),
			"avx256" | "avx2" | "256" => Ok(InstructionSetKind::Width256),
			"avx512" | "512" => Ok(InstructionSetKind::Width512),
			"amx" => Ok(InstructionSetKind::MatrixPlaceholder),
			"basic_add" | "add" | "basic" => Ok(InstructionSetKind::ScalarAdd),
			_ => Err(BenchError::invalid(format!(
				"unknown instruction set: {s} (available options: {})",
				Self::options()
			))),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn accepts_every_alias_case_insensitively() {
		let cases = [
			("AVX128", InstructionSetKind::Width128),
			("sse", InstructionSetKind::Width128),
			("128", InstructionSetKind::Width128),
			("Avx2", InstructionSetKind::Width256),
			("256", InstructionSetKind::Width256),
			("avx512", InstructionSetKind::Width512),
			("512", InstructionSetKind::Width512),
			("AMX", InstructionSetKind::MatrixPlaceholder),
			("basic_add", InstructionSetKind::ScalarAdd),
			("add", InstructionSetKind::ScalarAdd),
			("basic", InstructionSetKind::ScalarAdd),
		];

		for (input, expected) in cases {
			assert_eq!(input.parse::<InstructionSetKind>().unwrap(), expected, "{input}");
		}
	}

	#[test]
	fn unknown_name_lists_the_options() {
		let err = "avx1024".parse::<InstructionSetKind>().unwrap_err();
		let message = err.to_string();
		assert!(matches!(err, BenchError::InvalidConfiguration(_)));
		assert!(message.contains("avx1024"));
		assert!(message.contains("avx128, avx256, avx512, amx, basic_add"));
	}

	#[test]
	fn canonical_names_parse_back() {
		for kind in InstructionSetKind::ALL {
			assert_eq!(kind.cli_name().parse::<InstructionSetKind>().unwrap(), kind);
		}
	}
}
