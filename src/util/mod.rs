pub mod affinity;
pub mod msr;

/// Converts a cpufreq reading in kHz to MHz
pub fn khz_to_mhz(khz: u64) -> f64 {
	khz as f64 / 1000.0
}

/// Arithmetic mean, 0.0 for an empty slice
pub fn mean(values: &[f64]) -> f64 {
	if values.is_empty() {
		return 0.0;
	}
	values.iter().sum::<f64>() / values.len() as f64
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn khz_conversion() {
		assert_eq!(khz_to_mhz(3_400_000), 3400.0);
		assert_eq!(khz_to_mhz(0), 0.0);
	}

	#[test]
	fn mean_of_empty_is_zero() {
		assert_eq!(mean(&[]), 0.0);
		assert_eq!(mean(&[1000.0, 2000.0, 0.0]), 1000.0);
	}
}
