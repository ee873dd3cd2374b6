use msru::{Accessor, Msr};
use std::io;

/// Reads a value from a Model-Specific Register (MSR)
///
/// # Arguments
///
/// * `msr_address` - The address of the MSR to read
/// * `cpu_id` - The CPU ID to read the MSR from
///
/// # Returns
///
/// The value read from the MSR, or an io::Error if the read fails
pub fn read_msr(msr_address: u32, cpu_id: usize) -> io::Result<u64> {
	let cpu = u16::try_from(cpu_id).map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "cpu id out of range"))?;
	Msr::new(msr_address, cpu).map_err(io::Error::other)?.read().map_err(io::Error::other)
}
