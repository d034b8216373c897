// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2025 ReifyDB

//! Mutex synchronization primitives.
//!
//! Thin wrappers over `parking_lot`. Unlocking is releasing the guard, and a
//! mutex cannot be destroyed while a guard borrows it, so the "destroy a locked
//! mutex" programmer error of a C-style API cannot be expressed.

use std::ops::{Deref, DerefMut};

/// Outcome of [`Mutex::try_lock`].
pub enum TryLock<G> {
	/// The lock was free and is now held through the guard.
	Acquired(G),
	/// Another owner holds the lock.
	Busy,
}

impl<G> TryLock<G> {
	/// Returns the guard if the lock was acquired.
	pub fn acquired(self) -> Option<G> {
		match self {
			TryLock::Acquired(guard) => Some(guard),
			TryLock::Busy => None,
		}
	}

	pub fn is_busy(&self) -> bool {
		matches!(self, TryLock::Busy)
	}
}

/// A mutual exclusion primitive for protecting shared data.
#[derive(Debug, Default)]
pub struct Mutex<T> {
	inner: parking_lot::Mutex<T>,
}

impl<T> Mutex<T> {
	/// Creates a new mutex.
	pub fn new(value: T) -> Self {
		Self {
			inner: parking_lot::Mutex::new(value),
		}
	}

	/// Acquires the mutex, blocking the current thread until it is free.
	#[inline]
	pub fn lock(&self) -> MutexGuard<'_, T> {
		MutexGuard {
			inner: self.inner.lock(),
		}
	}

	/// Attempts to acquire the mutex without blocking.
	#[inline]
	pub fn try_lock(&self) -> TryLock<MutexGuard<'_, T>> {
		match self.inner.try_lock() {
			Some(inner) => TryLock::Acquired(MutexGuard {
				inner,
			}),
			None => TryLock::Busy,
		}
	}

	/// Consumes the mutex, returning the protected value.
	pub fn into_inner(self) -> T {
		self.inner.into_inner()
	}
}

/// A guard providing mutable access to the data protected by a [`Mutex`].
pub struct MutexGuard<'a, T> {
	pub(in crate::sync) inner: parking_lot::MutexGuard<'a, T>,
}

impl<'a, T> Deref for MutexGuard<'a, T> {
	type Target = T;

	fn deref(&self) -> &T {
		&self.inner
	}
}

impl<'a, T> DerefMut for MutexGuard<'a, T> {
	fn deref_mut(&mut self) -> &mut T {
		&mut self.inner
	}
}

/// A mutex that may be locked again by the thread already holding it.
///
/// Only shared access is handed out; pair it with a `Cell`/`RefCell` for
/// mutation.
#[derive(Debug, Default)]
pub struct ReentrantMutex<T> {
	inner: parking_lot::ReentrantMutex<T>,
}

impl<T> ReentrantMutex<T> {
	pub fn new(value: T) -> Self {
		Self {
			inner: parking_lot::ReentrantMutex::new(value),
		}
	}

	#[inline]
	pub fn lock(&self) -> parking_lot::ReentrantMutexGuard<'_, T> {
		self.inner.lock()
	}

	#[inline]
	pub fn try_lock(&self) -> TryLock<parking_lot::ReentrantMutexGuard<'_, T>> {
		match self.inner.try_lock() {
			Some(guard) => TryLock::Acquired(guard),
			None => TryLock::Busy,
		}
	}
}

#[cfg(test)]
mod tests {
	use std::{cell::Cell, sync::Arc, thread};

	use super::*;

	#[test]
	fn test_try_lock_reports_busy() {
		let mutex = Mutex::new(1);
		let guard = mutex.lock();
		assert!(mutex.try_lock().is_busy());
		drop(guard);

		let mut guard = mutex.try_lock().acquired().unwrap();
		*guard += 1;
		drop(guard);
		assert_eq!(mutex.into_inner(), 2);
	}

	#[test]
	fn test_lock_across_threads() {
		let mutex = Arc::new(Mutex::new(0u32));
		let handles: Vec<_> = (0..4)
			.map(|_| {
				let mutex = mutex.clone();
				thread::spawn(move || {
					for _ in 0..1000 {
						*mutex.lock() += 1;
					}
				})
			})
			.collect();
		for handle in handles {
			handle.join().unwrap();
		}
		assert_eq!(*mutex.lock(), 4000);
	}

	#[test]
	fn test_reentrant_lock_twice() {
		let mutex = ReentrantMutex::new(Cell::new(0));
		let outer = mutex.lock();
		outer.set(1);
		{
			let inner = mutex.try_lock().acquired().unwrap();
			inner.set(inner.get() + 1);
		}
		assert_eq!(outer.get(), 2);
	}
}
