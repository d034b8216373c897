// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

//! Time sources.
//!
//! - [`monotonic_nanos`]: nanosecond monotonic timestamp for deadlines
//! - [`epoch`]: wall-clock time for reports
//! - [`cycles`]: cheap counter for coarse elapsed-time sampling

use std::{
	fmt,
	sync::OnceLock,
	time::{Instant, SystemTime, UNIX_EPOCH},
};

fn anchor() -> Instant {
	static ANCHOR: OnceLock<Instant> = OnceLock::new();
	*ANCHOR.get_or_init(Instant::now)
}

/// Nanoseconds elapsed on the monotonic clock since the first call in this
/// process.
#[inline]
pub fn monotonic_nanos() -> u64 {
	anchor().elapsed().as_nanos() as u64
}

/// Wall-clock time with millisecond precision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DateTime {
	pub seconds: u64,
	pub millis: u32,
}

impl DateTime {
	pub fn as_millis(&self) -> u64 {
		self.seconds * 1000 + self.millis as u64
	}
}

impl fmt::Display for DateTime {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}.{:03}", self.seconds, self.millis)
	}
}

/// Current wall-clock time relative to the Unix epoch.
pub fn epoch() -> DateTime {
	let since = SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default();
	DateTime {
		seconds: since.as_secs(),
		millis: since.subsec_millis(),
	}
}

/// A cycle count for coarse elapsed-time sampling.
///
/// Reads the time-stamp counter on x86/x86_64. Other targets fall back to
/// [`monotonic_nanos`]. Only differences between two readings on the same
/// thread are meaningful.
#[inline]
pub fn cycles() -> u64 {
	cfg_if::cfg_if! {
		if #[cfg(target_arch = "x86_64")] {
			// SAFETY: rdtsc is available on every x86_64 CPU.
			unsafe { std::arch::x86_64::_rdtsc() }
		} else if #[cfg(target_arch = "x86")] {
			// SAFETY: rdtsc is available on every CPU this target supports.
			unsafe { std::arch::x86::_rdtsc() }
		} else {
			monotonic_nanos()
		}
	}
}

#[cfg(test)]
mod tests {
	use std::{thread, time::Duration};

	use super::*;

	#[test]
	fn test_monotonic_advances() {
		let a = monotonic_nanos();
		thread::sleep(Duration::from_millis(2));
		let b = monotonic_nanos();
		assert!(b >= a + 2_000_000, "{a} -> {b}");
	}

	#[test]
	fn test_epoch_is_after_2020() {
		let now = epoch();
		assert!(now.seconds > 1_577_836_800);
		assert!(now.millis < 1000);
		assert_eq!(now.as_millis() / 1000, now.seconds);
	}

	#[test]
	fn test_cycles_advance() {
		let a = cycles();
		thread::sleep(Duration::from_millis(1));
		let b = cycles();
		assert_ne!(a, b);
	}

	#[test]
	fn test_datetime_display() {
		let t = DateTime {
			seconds: 12,
			millis: 7,
		};
		assert_eq!(t.to_string(), "12.007");
	}
}
