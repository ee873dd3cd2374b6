use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use crate::constants::SAMPLING_INTERVAL_MS;
use crate::probe::FrequencyProbe;
use crate::result::{AllCoreSample, FrequencySample};

/// Cancellation token shared by one run's workload driver and its sampler
///
/// Starts running, moves to stopped once and stays there.
#[derive(Debug, Clone, Default)]
pub struct StopToken {
	stopped: Arc<AtomicBool>,
}

impl StopToken {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn stop(&self) {
		self.stopped.store(true, Ordering::Release);
	}

	pub fn is_stopped(&self) -> bool {
		self.stopped.load(Ordering::Acquire)
	}

	/// Stops the token when the returned guard goes out of scope, unwinding included
	pub fn stop_on_drop(&self) -> StopGuard<'_> {
		StopGuard(self)
	}
}

pub struct StopGuard<'a>(&'a StopToken);

impl Drop for StopGuard<'_> {
	fn drop(&mut self) {
		self.0.stop();
	}
}

/// Reads frequencies on a fixed interval until told to stop
#[derive(Debug, Clone, Copy)]
pub struct FrequencySampler {
	interval: Duration,
}

impl Default for FrequencySampler {
	fn default() -> Self {
		Self::new(Duration::from_millis(SAMPLING_INTERVAL_MS))
	}
}

impl FrequencySampler {
	pub fn new(interval: Duration) -> Self {
		Self { interval }
	}

	/// Samples `core_id` until `stop` fires
	///
	/// Returns an empty sequence if the token was already stopped.
	pub fn sample_core(&self, probe: &dyn FrequencyProbe, core_id: usize, stop: &StopToken) -> Vec<FrequencySample> {
		let samples = self.collect(stop, || probe.read_mhz(core_id), |offset, mhz| FrequencySample { offset, mhz });
		tracing::debug!(core_id, samples = samples.len(), "sampler finished");
		samples
	}

	/// Samples cores `0..core_count` together on every tick
	pub fn sample_all(&self, probe: &dyn FrequencyProbe, core_count: usize, stop: &StopToken) -> Vec<AllCoreSample> {
		self.collect(
			stop,
			|| read_all_cores(probe, core_count),
			|offset, mhz| AllCoreSample { offset, mhz },
		)
	}

	fn collect<T, S>(&self, stop: &StopToken, mut read: impl FnMut() -> T, into: impl Fn(Duration, T) -> S) -> Vec<S> {
		let start = Instant::now();
		let mut samples = Vec::new();

		while !stop.is_stopped() {
			let value = read();
			samples.push(into(start.elapsed(), value));
			thread::sleep(self.interval);
		}

		samples
	}
}

/// One reading per core, in core order
pub fn read_all_cores(probe: &dyn FrequencyProbe, core_count: usize) -> Vec<f64> {
	(0..core_count).map(|core| probe.read_mhz(core)).collect()
}

#[cfg(test)]
mod tests {
	use std::panic::{self, AssertUnwindSafe};
	use std::sync::atomic::AtomicUsize;

	use super::*;

	struct Stepping(AtomicUsize);

	impl FrequencyProbe for Stepping {
		fn read_mhz(&self, core_id: usize) -> f64 {
			let n = self.0.fetch_add(1, Ordering::Relaxed);
			1000.0 * (core_id + 1) as f64 + n as f64
		}
	}

	#[test]
	fn stopped_token_yields_nothing() {
		let stop = StopToken::new();
		stop.stop();

		let probe = Stepping(AtomicUsize::new(0));
		let samples = FrequencySampler::new(Duration::from_millis(5)).sample_core(&probe, 0, &stop);
		assert!(samples.is_empty());
		assert_eq!(probe.0.load(Ordering::Relaxed), 0);
	}

	#[test]
	fn token_stays_stopped() {
		let stop = StopToken::new();
		let observer = stop.clone();
		assert!(!observer.is_stopped());
		stop.stop();
		stop.stop();
		assert!(observer.is_stopped());
	}

	#[test]
	fn guard_ends_sampling_when_the_driver_panics() {
		let stop = StopToken::new();
		let probe = Stepping(AtomicUsize::new(0));
		let sampler = FrequencySampler::new(Duration::from_millis(5));

		let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
			thread::scope(|s| {
				let _guard = stop.stop_on_drop();
				s.spawn(|| sampler.sample_core(&probe, 0, &stop));
				thread::sleep(Duration::from_millis(20));
				panic!("workload failed");
			})
		}));

		assert!(outcome.is_err());
		assert!(stop.is_stopped());
		assert!(probe.0.load(Ordering::Relaxed) > 0);
	}

	#[test]
	fn samples_are_time_ordered_until_stopped() {
		let stop = StopToken::new();
		let probe = Stepping(AtomicUsize::new(0));
		let sampler = FrequencySampler::new(Duration::from_millis(10));

		let samples = thread::scope(|s| {
			let handle = s.spawn(|| sampler.sample_core(&probe, 1, &stop));
			thread::sleep(Duration::from_millis(105));
			stop.stop();
			handle.join().unwrap()
		});

		assert!(samples.len() >= 3, "only {} samples", samples.len());
		assert!(samples.windows(2).all(|w| w[0].offset < w[1].offset));
		assert!(samples.windows(2).all(|w| w[0].mhz < w[1].mhz));
		assert_eq!(samples[0].mhz, 2000.0);
	}

	#[test]
	fn all_core_ticks_read_every_core() {
		let stop = StopToken::new();
		let probe = Stepping(AtomicUsize::new(0));
		let sampler = FrequencySampler::new(Duration::from_millis(10));

		let ticks = thread::scope(|s| {
			let handle = s.spawn(|| sampler.sample_all(&probe, 3, &stop));
			thread::sleep(Duration::from_millis(50));
			stop.stop();
			handle.join().unwrap()
		});

		assert!(!ticks.is_empty());
		assert!(ticks.iter().all(|tick| tick.mhz.len() == 3));
		assert_eq!(ticks[0].mhz, vec![1000.0, 2001.0, 3002.0]);
	}
}
