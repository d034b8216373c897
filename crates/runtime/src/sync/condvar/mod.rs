// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

//! Condvar synchronization primitive.

use std::time::{Duration, Instant};

use crate::sync::mutex::MutexGuard;

/// Result of a timed wait on a condition variable.
///
/// A timeout is an ordinary outcome, not an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitTimeoutResult {
	timed_out: bool,
}

impl WaitTimeoutResult {
	/// Returns whether the wait timed out.
	#[inline]
	pub fn timed_out(&self) -> bool {
		self.timed_out
	}
}

/// A condition variable for coordinating threads.
#[derive(Debug, Default)]
pub struct Condvar {
	inner: parking_lot::Condvar,
}

impl Condvar {
	/// Creates a new condition variable.
	#[inline]
	pub fn new() -> Self {
		Self {
			inner: parking_lot::Condvar::new(),
		}
	}

	/// Blocks the current thread until notified.
	#[inline]
	pub fn wait<'a, T>(&self, guard: &mut MutexGuard<'a, T>) {
		self.inner.wait(&mut guard.inner);
	}

	/// Blocks the current thread until notified or the timeout expires.
	#[inline]
	pub fn wait_for<'a, T>(&self, guard: &mut MutexGuard<'a, T>, timeout: Duration) -> WaitTimeoutResult {
		let timed_out = self.inner.wait_for(&mut guard.inner, timeout).timed_out();
		WaitTimeoutResult {
			timed_out,
		}
	}

	/// Blocks the current thread until notified or the monotonic deadline
	/// passes.
	#[inline]
	pub fn wait_until<'a, T>(&self, guard: &mut MutexGuard<'a, T>, deadline: Instant) -> WaitTimeoutResult {
		let timed_out = self.inner.wait_until(&mut guard.inner, deadline).timed_out();
		WaitTimeoutResult {
			timed_out,
		}
	}

	/// Wakes up one blocked thread.
	#[inline]
	pub fn notify_one(&self) {
		self.inner.notify_one();
	}

	/// Wakes up all blocked threads.
	#[inline]
	pub fn notify_all(&self) {
		self.inner.notify_all();
	}
}

#[cfg(test)]
mod tests {
	use std::{sync::Arc, thread};

	use super::*;
	use crate::sync::Mutex;

	#[test]
	fn test_wait_for_times_out_without_error() {
		let mutex = Mutex::new(());
		let condvar = Condvar::new();
		let mut guard = mutex.lock();

		let start = Instant::now();
		let result = condvar.wait_for(&mut guard, Duration::from_millis(20));
		assert!(result.timed_out());
		assert!(start.elapsed() >= Duration::from_millis(20));
	}

	#[test]
	fn test_notify_wakes_waiter() {
		let pair = Arc::new((Mutex::new(false), Condvar::new()));
		let pair_clone = pair.clone();

		let handle = thread::spawn(move || {
			let (lock, condvar) = &*pair_clone;
			*lock.lock() = true;
			condvar.notify_one();
		});

		let (lock, condvar) = &*pair;
		let mut ready = lock.lock();
		while !*ready {
			let result = condvar.wait_until(&mut ready, Instant::now() + Duration::from_secs(5));
			assert!(!result.timed_out() || *ready);
		}
		drop(ready);
		handle.join().unwrap();
	}
}
