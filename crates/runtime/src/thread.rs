// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

//! Thread lifecycle.
//!
//! Threads are named and may carry an explicit stack size, which is rounded
//! up to a whole number of pages before it reaches the OS.

use std::{
	sync::OnceLock,
	thread::{self, JoinHandle, ThreadId},
	time::Duration,
};

use tracing::trace;

use crate::error::{Result, RuntimeError};

/// Configuration for a new OS thread.
#[derive(Debug, Clone, Default)]
pub struct ThreadBuilder {
	name: Option<String>,
	stack_size: Option<usize>,
}

impl ThreadBuilder {
	pub fn new() -> Self {
		Self::default()
	}

	/// Set the thread name.
	pub fn name(mut self, name: impl Into<String>) -> Self {
		self.name = Some(name.into());
		self
	}

	/// Set the stack size in bytes. 0 keeps the platform default.
	pub fn stack_size(mut self, bytes: usize) -> Self {
		self.stack_size = (bytes > 0).then(|| round_to_page(bytes));
		self
	}

	/// Spawn the thread running `entry`.
	pub fn spawn<F, T>(self, entry: F) -> Result<Thread<T>>
	where
		F: FnOnce() -> T + Send + 'static,
		T: Send + 'static,
	{
		let name = self.name.unwrap_or_else(|| "tessera".to_string());

		let mut builder = thread::Builder::new().name(name.clone());
		if let Some(bytes) = self.stack_size {
			builder = builder.stack_size(bytes);
		}

		let handle = builder.spawn(entry).map_err(|source| RuntimeError::Spawn {
			name: name.clone(),
			source,
		})?;
		trace!(thread = %name, stack_size = ?self.stack_size, "spawned thread");

		Ok(Thread {
			name,
			handle,
		})
	}
}

/// Handle to a spawned thread.
#[derive(Debug)]
pub struct Thread<T> {
	name: String,
	handle: JoinHandle<T>,
}

impl<T> Thread<T> {
	pub fn name(&self) -> &str {
		&self.name
	}

	pub fn id(&self) -> ThreadId {
		self.handle.thread().id()
	}

	pub fn is_finished(&self) -> bool {
		self.handle.is_finished()
	}

	/// Wait for the thread to exit. `Err` carries the panic payload if the
	/// thread unwound.
	pub fn join(self) -> thread::Result<T> {
		self.handle.join()
	}
}

/// Identity of the calling thread. Compare with `==`.
#[inline]
pub fn current() -> ThreadId {
	thread::current().id()
}

/// Whether two thread identities name the same thread.
#[inline]
pub fn same(a: ThreadId, b: ThreadId) -> bool {
	a == b
}

/// Give up the rest of the time slice.
#[inline]
pub fn yield_now() {
	thread::yield_now();
}

pub fn sleep(delay: Duration) {
	thread::sleep(delay);
}

/// System memory page size in bytes.
pub fn page_size() -> usize {
	static PAGE_SIZE: OnceLock<usize> = OnceLock::new();
	*PAGE_SIZE.get_or_init(|| {
		cfg_if::cfg_if! {
			if #[cfg(unix)] {
				// SAFETY: sysconf has no preconditions.
				let size = unsafe { libc::sysconf(libc::_SC_PAGESIZE) };
				if size > 0 { size as usize } else { 4096 }
			} else {
				4096
			}
		}
	})
}

fn round_to_page(bytes: usize) -> usize {
	let page = page_size();
	bytes.div_ceil(page).saturating_mul(page)
}

#[cfg(test)]
mod tests {
	use std::sync::mpsc;

	use super::*;

	#[test]
	fn test_spawn_named_thread() {
		let thread = ThreadBuilder::new().name("tessera-test").spawn(|| thread::current().name().map(String::from)).unwrap();
		assert_eq!(thread.name(), "tessera-test");
		assert_eq!(thread.join().unwrap().as_deref(), Some("tessera-test"));
	}

	#[test]
	fn test_stack_size_rounds_up_to_page() {
		let page = page_size();
		assert!(page.is_power_of_two());
		assert_eq!(round_to_page(1), page);
		assert_eq!(round_to_page(page), page);
		assert_eq!(round_to_page(page + 1), 2 * page);
	}

	#[test]
	fn test_thread_identity() {
		let (tx, rx) = mpsc::channel();
		let thread = ThreadBuilder::new()
			.stack_size(256 * 1024)
			.spawn(move || {
				tx.send(current()).unwrap();
			})
			.unwrap();

		let spawned_id = thread.id();
		thread.join().unwrap();
		let reported = rx.recv().unwrap();

		assert!(same(reported, spawned_id));
		assert!(!same(reported, current()));
	}
}
