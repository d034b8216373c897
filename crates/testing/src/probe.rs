// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

//! Observation helpers shared between a test thread and actors running on
//! worker threads.

use std::{
	sync::{
		Arc,
		atomic::{AtomicUsize, Ordering},
	},
	time::Duration,
};

use tessera_runtime::{atomic::AtomicCounter, sync::Mutex};

use crate::util::wait::{DEFAULT_POLL_INTERVAL, wait_for_condition};

/// Ordered log of observed events, cheap to clone into actors.
#[derive(Debug)]
pub struct Recorder<T> {
	events: Arc<Mutex<Vec<T>>>,
}

impl<T> Clone for Recorder<T> {
	fn clone(&self) -> Self {
		Self {
			events: self.events.clone(),
		}
	}
}

impl<T> Default for Recorder<T> {
	fn default() -> Self {
		Self {
			events: Arc::new(Mutex::new(Vec::new())),
		}
	}
}

impl<T: Clone> Recorder<T> {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn record(&self, event: T) {
		self.events.lock().push(event);
	}

	pub fn snapshot(&self) -> Vec<T> {
		self.events.lock().clone()
	}

	pub fn len(&self) -> usize {
		self.events.lock().len()
	}

	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}

	/// Blocks until at least `count` events were recorded, then returns them.
	///
	/// # Panics
	/// Panics if `timeout` passes first.
	pub fn wait_for_len(&self, count: usize, timeout: Duration) -> Vec<T> {
		wait_for_condition(|| self.len() >= count, timeout, DEFAULT_POLL_INTERVAL, "recorder did not fill up");
		self.snapshot()
	}
}

/// Counts threads inside a critical region and remembers the maximum.
///
/// Anything above one means two threads were inside at the same time.
#[derive(Debug, Clone, Default)]
pub struct ExclusionProbe {
	inner: Arc<ProbeInner>,
}

#[derive(Debug, Default)]
struct ProbeInner {
	inside: AtomicCounter,
	max: AtomicUsize,
	entries: AtomicUsize,
}

impl ExclusionProbe {
	pub fn new() -> Self {
		Self::default()
	}

	/// Enter the region; leaving is dropping the guard.
	pub fn enter(&self) -> ExclusionGuard<'_> {
		let now = self.inner.inside.add_and_fetch(1);
		self.inner.max.fetch_max(now, Ordering::SeqCst);
		self.inner.entries.fetch_add(1, Ordering::SeqCst);
		ExclusionGuard {
			probe: self,
		}
	}

	/// Highest number of threads ever inside at once.
	pub fn max_observed(&self) -> usize {
		self.inner.max.load(Ordering::SeqCst)
	}

	pub fn entries(&self) -> usize {
		self.inner.entries.load(Ordering::SeqCst)
	}
}

pub struct ExclusionGuard<'a> {
	probe: &'a ExclusionProbe,
}

impl Drop for ExclusionGuard<'_> {
	fn drop(&mut self) {
		self.probe.inner.inside.sub_and_fetch(1);
	}
}

#[cfg(test)]
mod tests {
	use std::{sync::Barrier, thread};

	use super::*;

	#[test]
	fn test_recorder_keeps_order() {
		let recorder = Recorder::new();
		let clone = recorder.clone();
		thread::spawn(move || {
			for i in 0..3 {
				clone.record(i);
			}
		});
		assert_eq!(recorder.wait_for_len(3, Duration::from_secs(5)), vec![0, 1, 2]);
	}

	#[test]
	fn test_probe_sequential_entries() {
		let probe = ExclusionProbe::new();
		for _ in 0..3 {
			let _guard = probe.enter();
		}
		assert_eq!(probe.max_observed(), 1);
		assert_eq!(probe.entries(), 3);
	}

	#[test]
	fn test_probe_detects_overlap() {
		let probe = ExclusionProbe::new();
		let barrier = Arc::new(Barrier::new(2));

		let handles: Vec<_> = (0..2)
			.map(|_| {
				let probe = probe.clone();
				let barrier = barrier.clone();
				thread::spawn(move || {
					let _guard = probe.enter();
					barrier.wait();
				})
			})
			.collect();
		for handle in handles {
			handle.join().unwrap();
		}

		assert_eq!(probe.max_observed(), 2);
	}
}
