// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

//! Dynamically created thread-local slots.
//!
//! `thread_local!` needs a static per slot. A [`TlsKey`] is created at run
//! time instead, so each engine can own its own slot. Key ids are never
//! reused: values left behind by a dropped key can no longer be reached.

use std::{
	cell::RefCell,
	collections::HashMap,
	sync::atomic::{AtomicU64, Ordering},
};

static NEXT_KEY: AtomicU64 = AtomicU64::new(1);

thread_local! {
	static SLOTS: RefCell<HashMap<u64, usize>> = RefCell::new(HashMap::new());
}

/// A key addressing one word-sized value per thread.
#[derive(Debug)]
pub struct TlsKey {
	id: u64,
}

impl TlsKey {
	pub fn new() -> Self {
		Self {
			id: NEXT_KEY.fetch_add(1, Ordering::Relaxed),
		}
	}

	/// Value stored by the calling thread, if any.
	pub fn get(&self) -> Option<usize> {
		SLOTS.with(|slots| slots.borrow().get(&self.id).copied())
	}

	pub fn set(&self, value: usize) {
		SLOTS.with(|slots| {
			slots.borrow_mut().insert(self.id, value);
		});
	}

	/// Remove the calling thread's value.
	pub fn clear(&self) -> Option<usize> {
		SLOTS.with(|slots| slots.borrow_mut().remove(&self.id))
	}
}

impl Default for TlsKey {
	fn default() -> Self {
		Self::new()
	}
}

impl Drop for TlsKey {
	fn drop(&mut self) {
		// Other threads' values are unreachable once the key is gone; only
		// the dropping thread's entry can be reclaimed eagerly.
		let _ = SLOTS.try_with(|slots| slots.borrow_mut().remove(&self.id));
	}
}
