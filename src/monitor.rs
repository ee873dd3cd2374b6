use std::io::{self, Write};
use std::thread;
use std::time::Duration;

use chrono::Local;

use crate::constants::MONITOR_INTERVAL_MS;
use crate::probe::FrequencyProbe;
use crate::sampler::read_all_cores;
use crate::util::mean;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Records the frequency of every core as CSV rows
///
/// Rows are `Timestamp,CPU0,...,CPUn-1,Average`. Unreadable cores appear as 0
/// and still count towards the average.
pub struct FrequencyMonitor<'p> {
	probe: &'p dyn FrequencyProbe,
	core_count: usize,
	interval: Duration,
}

impl<'p> FrequencyMonitor<'p> {
	pub fn new(probe: &'p dyn FrequencyProbe, core_count: usize) -> Self {
		Self {
			probe,
			core_count,
			interval: Duration::from_millis(MONITOR_INTERVAL_MS),
		}
	}

	pub fn with_interval(mut self, interval: Duration) -> Self {
		self.interval = interval;
		self
	}

	pub fn write_header(&self, out: &mut dyn Write) -> io::Result<()> {
		let cores: Vec<String> = (0..self.core_count).map(|core| format!("CPU{core}")).collect();
		writeln!(out, "Timestamp,{},Average", cores.join(","))
	}

	/// Reads every core once and writes the row
	pub fn write_row(&self, out: &mut dyn Write) -> io::Result<f64> {
		let timestamp = Local::now().format(TIMESTAMP_FORMAT).to_string();
		let frequencies = read_all_cores(self.probe, self.core_count);
		let average = mean(&frequencies);

		let cells: Vec<String> = frequencies.iter().map(|mhz| format!("{mhz:.3}")).collect();
		writeln!(out, "{timestamp},{},{average:.2}", cells.join(","))?;
		out.flush()?;

		Ok(average)
	}

	/// Writes the header and then `samples` rows, or rows forever with `None`
	///
	/// A closed pipe on the output ends monitoring without an error.
	pub fn run(&self, out: &mut dyn Write, samples: Option<u64>) -> io::Result<()> {
		tracing::info!(
			cores = self.core_count,
			"recording CPU frequencies every {:?}",
			self.interval
		);

		let result = self.record(out, samples);
		match result {
			Err(e) if e.kind() == io::ErrorKind::BrokenPipe => Ok(()),
			other => other,
		}
	}

	fn record(&self, out: &mut dyn Write, samples: Option<u64>) -> io::Result<()> {
		self.write_header(out)?;

		let mut written = 0;
		loop {
			let average = self.write_row(out)?;
			tracing::debug!(average, "monitor row written");

			written += 1;
			if samples.is_some_and(|limit| written >= limit) {
				return Ok(());
			}
			thread::sleep(self.interval);
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	struct PerCore;

	impl FrequencyProbe for PerCore {
		fn read_mhz(&self, core_id: usize) -> f64 {
			if core_id == 2 { 0.0 } else { 1000.0 * (core_id + 1) as f64 }
		}
	}

	#[test]
	fn writes_header_and_rows() {
		let monitor = FrequencyMonitor::new(&PerCore, 3).with_interval(Duration::from_millis(1));
		let mut out = Vec::new();
		monitor.run(&mut out, Some(2)).unwrap();

		let text = String::from_utf8(out).unwrap();
		let lines: Vec<&str> = text.lines().collect();
		assert_eq!(lines.len(), 3);
		assert_eq!(lines[0], "Timestamp,CPU0,CPU1,CPU2,Average");

		let cells: Vec<&str> = lines[1].split(',').collect();
		assert_eq!(cells.len(), 5);
		assert_eq!(cells[0].len(), "2026-01-01 00:00:00".len());
		assert_eq!(&cells[1..], ["1000.000", "2000.000", "0.000", "1000.00"]);
	}

	struct ClosedPipe;

	impl Write for ClosedPipe {
		fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
			Err(io::Error::from(io::ErrorKind::BrokenPipe))
		}

		fn flush(&mut self) -> io::Result<()> {
			Ok(())
		}
	}

	#[test]
	fn closed_pipe_ends_quietly() {
		let monitor = FrequencyMonitor::new(&PerCore, 1);
		assert!(monitor.run(&mut ClosedPipe, None).is_ok());
	}
}
