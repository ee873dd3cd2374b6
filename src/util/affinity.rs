use std::io;

use crate::error::PinError;

/// Core discovery and thread pinning
pub trait CoreAffinity: Sync {
	/// Number of logical cores that can be targeted (IDs `0..core_count()`)
	///
	/// This is the span of core IDs, not the number the process may use: a
	/// core outside the affinity mask is still in range and fails to pin.
	fn core_count(&self) -> usize;

	/// Binds the calling thread to `core_id`
	fn pin_current(&self, core_id: usize) -> Result<(), PinError>;
}

/// Affinity through the Linux scheduler
#[derive(Debug, Clone, Copy, Default)]
pub struct LinuxAffinity;

impl CoreAffinity for LinuxAffinity {
	fn core_count(&self) -> usize {
		online_cpus().unwrap_or_else(num_cpus::get)
	}

	#[cfg(target_os = "linux")]
	fn pin_current(&self, core_id: usize) -> Result<(), PinError> {
		if core_id >= libc::CPU_SETSIZE as usize {
			return Err(PinError {
				core_id,
				source: io::Error::from_raw_os_error(libc::EINVAL),
			});
		}

		// SAFETY: the set is zero-initialised before use and pid 0 targets the calling thread.
		let result = unsafe {
			let mut cpuset: libc::cpu_set_t = std::mem::zeroed();
			libc::CPU_ZERO(&mut cpuset);
			libc::CPU_SET(core_id, &mut cpuset);
			libc::sched_setaffinity(0, std::mem::size_of::<libc::cpu_set_t>(), &cpuset)
		};

		if result == 0 {
			tracing::debug!(core_id, "pinned thread");
			Ok(())
		} else {
			Err(PinError {
				core_id,
				source: io::Error::last_os_error(),
			})
		}
	}

	#[cfg(not(target_os = "linux"))]
	fn pin_current(&self, core_id: usize) -> Result<(), PinError> {
		Err(PinError {
			core_id,
			source: io::Error::new(io::ErrorKind::Unsupported, "thread pinning requires Linux"),
		})
	}
}

/// Online logical CPUs, independent of this process's affinity mask or cgroup quota
///
/// Widened to the highest allowed core ID when offline CPUs leave holes.
#[cfg(target_os = "linux")]
fn online_cpus() -> Option<usize> {
	// SAFETY: sysconf has no preconditions.
	let count = unsafe { libc::sysconf(libc::_SC_NPROCESSORS_ONLN) };
	let online = usize::try_from(count).ok().filter(|&count| count > 0)?;
	let span = allowed_cores()
		.ok()
		.and_then(|cores| cores.last().map(|&core| core + 1))
		.unwrap_or(0);
	Some(online.max(span))
}

#[cfg(not(target_os = "linux"))]
fn online_cpus() -> Option<usize> {
	None
}

/// Cores the calling thread is currently allowed to run on
#[cfg(target_os = "linux")]
pub fn allowed_cores() -> io::Result<Vec<usize>> {
	// SAFETY: the set is zero-initialised and only read after a successful call.
	unsafe {
		let mut cpuset: libc::cpu_set_t = std::mem::zeroed();
		if libc::sched_getaffinity(0, std::mem::size_of::<libc::cpu_set_t>(), &mut cpuset) != 0 {
			return Err(io::Error::last_os_error());
		}

		Ok((0..libc::CPU_SETSIZE as usize)
			.filter(|&cpu| libc::CPU_ISSET(cpu, &cpuset))
			.collect())
	}
}

#[cfg(test)]
#[cfg(target_os = "linux")]
mod tests {
	use std::thread;

	use super::*;

	#[test]
	fn pins_to_an_allowed_core() {
		let core = allowed_cores().unwrap()[0];

		thread::spawn(move || {
			LinuxAffinity.pin_current(core).unwrap();
			assert_eq!(allowed_cores().unwrap(), vec![core]);
		})
		.join()
		.unwrap();
	}

	#[test]
	fn out_of_range_core_is_rejected() {
		let err = thread::spawn(|| LinuxAffinity.pin_current(usize::MAX).unwrap_err())
			.join()
			.unwrap();
		assert_eq!(err.core_id, usize::MAX);
	}

	#[test]
	fn core_count_is_positive() {
		assert!(LinuxAffinity.core_count() >= 1);
	}

	#[test]
	fn core_count_covers_every_allowed_core() {
		let count = LinuxAffinity.core_count();
		let allowed = allowed_cores().unwrap();
		assert!(allowed.iter().all(|&core| core < count), "{allowed:?} vs {count}");
		assert!(count >= allowed.len());
	}

	#[test]
	fn core_count_ignores_a_narrowed_mask() {
		let full = LinuxAffinity.core_count();
		let core = allowed_cores().unwrap()[0];

		let narrowed = thread::spawn(move || {
			LinuxAffinity.pin_current(core).unwrap();
			LinuxAffinity.core_count()
		})
		.join()
		.unwrap();
		assert_eq!(narrowed, full);
	}
}
