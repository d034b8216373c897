// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

//! Word-sized atomic counter.

use std::sync::atomic::{AtomicUsize, Ordering};

/// A machine-word counter with fetch-style arithmetic.
#[derive(Debug, Default)]
pub struct AtomicCounter {
	value: AtomicUsize,
}

impl AtomicCounter {
	pub const fn new(value: usize) -> Self {
		Self {
			value: AtomicUsize::new(value),
		}
	}

	/// Adds `delta` and returns the new value.
	#[inline]
	pub fn add_and_fetch(&self, delta: usize) -> usize {
		self.value.fetch_add(delta, Ordering::AcqRel).wrapping_add(delta)
	}

	/// Subtracts `delta` and returns the new value.
	#[inline]
	pub fn sub_and_fetch(&self, delta: usize) -> usize {
		self.value.fetch_sub(delta, Ordering::AcqRel).wrapping_sub(delta)
	}

	/// Stores `new` if the current value is `current`. Returns whether the
	/// swap happened.
	#[inline]
	pub fn compare_and_swap(&self, current: usize, new: usize) -> bool {
		self.value.compare_exchange(current, new, Ordering::AcqRel, Ordering::Acquire).is_ok()
	}

	#[inline]
	pub fn get(&self) -> usize {
		self.value.load(Ordering::Acquire)
	}
}
