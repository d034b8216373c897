// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

//! Wake primitive for an idle thread.
//!
//! A [`Parker`] is owned by the sleeping side and shared with every producer.
//! A notification delivered while nobody is parked is remembered, so a
//! producer that posts work and then calls [`Parker::unpark`] can never be
//! missed by a consumer that checked its queue just before parking.

use std::{
	sync::atomic::{AtomicBool, Ordering},
	time::Instant,
};

use crate::sync::{Condvar, Mutex};

/// Why [`Parker::park`] returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Wake {
	Notified,
	TimedOut,
}

#[derive(Debug, Default)]
pub struct Parker {
	notified: AtomicBool,
	lock: Mutex<()>,
	condvar: Condvar,
}

impl Parker {
	pub fn new() -> Self {
		Self::default()
	}

	/// Blocks until [`unpark`](Self::unpark) is called or `deadline` passes.
	///
	/// With no deadline the wait is indefinite. A pending notification is
	/// consumed and returns immediately.
	pub fn park(&self, deadline: Option<Instant>) -> Wake {
		if self.notified.swap(false, Ordering::AcqRel) {
			return Wake::Notified;
		}

		let mut guard = self.lock.lock();
		loop {
			if self.notified.swap(false, Ordering::AcqRel) {
				return Wake::Notified;
			}
			match deadline {
				None => self.condvar.wait(&mut guard),
				Some(deadline) => {
					if self.condvar.wait_until(&mut guard, deadline).timed_out() {
						return if self.notified.swap(false, Ordering::AcqRel) {
							Wake::Notified
						} else {
							Wake::TimedOut
						};
					}
				}
			}
		}
	}

	/// Wakes the parked thread, or makes its next `park` return immediately.
	pub fn unpark(&self) {
		if !self.notified.swap(true, Ordering::AcqRel) {
			let _guard = self.lock.lock();
			self.condvar.notify_one();
		}
	}
}
